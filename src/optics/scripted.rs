//! Deterministic stand-ins for a camera and a screen.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bitvec::prelude::*;

use super::{CaptureDevice, DisplaySurface, LumaFrame, Luminance};
use crate::error::CaptureError;

pub const HIGH_LEVEL: u8 = 230;
pub const LOW_LEVEL: u8 = 20;

const SCRIPTED_FRAME_SIZE: (usize, usize) = (160, 120);

enum ScriptStep {
    Level(u8),
    Dropped,
    Disconnect,
}

/// Plays back a fixed list of brightness levels as uniform gray frames.
/// Once the script is used up every read is a transient failure.
pub struct ScriptedCapture {
    script: VecDeque<ScriptStep>,
    available: bool,
    closed: Arc<AtomicBool>,
}

impl ScriptedCapture {
    pub fn new<I: IntoIterator<Item = u8>>(levels: I) -> Self {
        Self {
            script: levels.into_iter().map(ScriptStep::Level).collect(),
            available: true,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new([])
        }
    }

    pub fn then_levels<I: IntoIterator<Item = u8>>(mut self, levels: I) -> Self {
        self.script.extend(levels.into_iter().map(ScriptStep::Level));
        self
    }

    pub fn then_dropped(mut self, count: usize) -> Self {
        self.script.extend((0..count).map(|_| ScriptStep::Dropped));
        self
    }

    pub fn then_disconnect(mut self) -> Self {
        self.script.push_back(ScriptStep::Disconnect);
        self
    }

    /// Observes whether `close` was called after the device moved elsewhere.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }
}

impl CaptureDevice for ScriptedCapture {
    fn open(&mut self) -> Result<(), CaptureError> {
        if !self.available {
            return Err(CaptureError::DeviceUnavailable(
                "scripted device offline".to_string(),
            ));
        }
        Ok(())
    }

    fn read_frame(&mut self) -> Result<LumaFrame, CaptureError> {
        let (width, height) = SCRIPTED_FRAME_SIZE;
        match self.script.pop_front() {
            Some(ScriptStep::Level(level)) => Ok(LumaFrame::uniform(width, height, level)),
            Some(ScriptStep::Disconnect) => {
                Err(CaptureError::Disconnected("script ended".to_string()))
            }
            Some(ScriptStep::Dropped) | None => Err(CaptureError::Transient),
        }
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Brightness levels that the debouncer turns back into exactly `bits`.
///
/// Each bit is held for `frames_per_bit` frames and followed by one frame of
/// the opposite level, short enough to be discarded, so that repeated bits
/// still produce a transition. `frames_per_bit` has to reach the sampler's
/// stable frame count.
pub fn script_for_bits(bits: &BitSlice<u8, Msb0>, frames_per_bit: usize) -> Vec<u8> {
    let level = |bit: bool| if bit { HIGH_LEVEL } else { LOW_LEVEL };

    bits.iter()
        .by_vals()
        .flat_map(|bit| {
            std::iter::repeat(level(bit))
                .take(frames_per_bit)
                .chain(std::iter::once(level(!bit)))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    Opened,
    State(Luminance),
    Closed,
}

/// Display that only remembers what it was told to show, and when.
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    trace: Arc<Mutex<Vec<(Instant, DisplayEvent)>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.timed_events().into_iter().map(|(_, event)| event).collect()
    }

    pub fn timed_events(&self) -> Vec<(Instant, DisplayEvent)> {
        match self.trace.lock() {
            Ok(trace) => trace.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Driven states only, in order.
    pub fn states(&self) -> Vec<Luminance> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DisplayEvent::State(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: DisplayEvent) {
        let mut trace = match self.trace.lock() {
            Ok(trace) => trace,
            Err(poisoned) => poisoned.into_inner(),
        };
        trace.push((Instant::now(), event));
    }
}

impl DisplaySurface for RecordingDisplay {
    fn open(&mut self) {
        self.record(DisplayEvent::Opened);
    }

    fn set_state(&mut self, state: Luminance) {
        self.record(DisplayEvent::State(state));
    }

    fn close(&mut self) {
        self.record(DisplayEvent::Closed);
    }
}
