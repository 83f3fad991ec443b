use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::lock;
use crate::codec;
use crate::error::LinkError;
use crate::optics::{DisplaySurface, Luminance, StatusSink};
use crate::session::SessionState;

pub const MIN_BIT_DURATION_MS: u64 = 50;
pub const MAX_BIT_DURATION_MS: u64 = 1000;
pub const DEFAULT_BIT_DURATION_MS: u64 = 100;
pub const MAX_MESSAGE_CHARS: usize = 500;

pub fn validate_message(message: &str) -> Result<(), LinkError> {
    if message.is_empty() {
        return Err(LinkError::EmptyMessage);
    }

    let length = message.chars().count();
    if length > MAX_MESSAGE_CHARS {
        return Err(LinkError::MessageTooLong {
            length,
            max: MAX_MESSAGE_CHARS,
        });
    }

    Ok(())
}

pub fn validate_bit_duration(bit_duration_ms: u64) -> Result<Duration, LinkError> {
    if !(MIN_BIT_DURATION_MS..=MAX_BIT_DURATION_MS).contains(&bit_duration_ms) {
        return Err(LinkError::InvalidBitDuration(bit_duration_ms));
    }
    Ok(Duration::from_millis(bit_duration_ms))
}

/// Time the frame itself occupies on screen, without the trailing guard.
pub fn estimate_duration(message: &str, bit_duration: Duration) -> Duration {
    bit_duration * codec::frame_length(message) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitOutcome {
    Completed { bits: usize },
    Cancelled { bits_sent: usize },
    /// Another transmission was running, nothing was sent.
    Busy,
}

/// Drives a display through the frame of a message, one luminance state per
/// bit.
pub struct Transmitter<D> {
    display: Mutex<D>,
    state: SessionState,
}

impl<D: DisplaySurface> Transmitter<D> {
    pub fn new(display: D) -> Self {
        Self {
            display: Mutex::new(display),
            state: SessionState::new(),
        }
    }

    /// Blocks for the whole transmission. Call `stop` from another thread to
    /// cancel; it takes effect at the next bit boundary.
    pub fn send(
        &self,
        message: &str,
        bit_duration_ms: u64,
        sink: &dyn StatusSink,
    ) -> Result<TransmitOutcome, LinkError> {
        validate_message(message)?;
        let bit_duration = validate_bit_duration(bit_duration_ms)?;

        if !self.state.try_start() {
            warn!("Transmission already in progress, ignoring send");
            return Ok(TransmitOutcome::Busy);
        }
        let _session = SessionGuard(&self.state);

        sink.log("Encoding message...");
        let frame = codec::encode(message);
        let total_bits = frame.len();

        sink.log(&format!(
            "Encoded {} characters into {} bits",
            message.chars().count(),
            total_bits
        ));
        sink.log(&format!(
            "Estimated transmission time: {:.1} seconds",
            estimate_duration(message, bit_duration).as_secs_f32()
        ));

        let mut display = lock(&self.display);
        let mut surface = OpenSurface::new(&mut *display);

        sink.log("Starting transmission...");
        info!("Transmitting {} bits at {:?} per bit", total_bits, bit_duration);

        let started = Instant::now();
        let mut bits_sent = 0;

        for (index, bit) in frame.iter().by_vals().enumerate() {
            if !self.state.is_active() {
                break;
            }

            surface.set_state(Luminance::from(bit));
            sink.progress((index + 1) as f32 / total_bits as f32 * 100.0);

            sleep_until(started + bit_duration * (index as u32 + 1));
            bits_sent = index + 1;
        }

        surface.set_state(Luminance::Low);
        std::thread::sleep(bit_duration);

        if bits_sent == total_bits {
            sink.log("Transmission sequence completed");
            Ok(TransmitOutcome::Completed { bits: total_bits })
        } else {
            info!("Transmission cancelled after {} of {} bits", bits_sent, total_bits);
            sink.log(&format!(
                "Transmission cancelled after {} of {} bits",
                bits_sent, total_bits
            ));
            Ok(TransmitOutcome::Cancelled { bits_sent })
        }
    }

    /// Returns false if no transmission was running.
    pub fn stop(&self) -> bool {
        self.state.request_stop()
    }

    pub fn is_transmitting(&self) -> bool {
        !self.state.is_idle()
    }
}

fn sleep_until(deadline: Instant) {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if !remaining.is_zero() {
        std::thread::sleep(remaining);
    }
}

struct SessionGuard<'a>(&'a SessionState);

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Display held open for one transmission, closed again on drop.
struct OpenSurface<'a, D: DisplaySurface> {
    display: &'a mut D,
}

impl<'a, D: DisplaySurface> OpenSurface<'a, D> {
    fn new(display: &'a mut D) -> Self {
        display.open();
        Self { display }
    }

    fn set_state(&mut self, state: Luminance) {
        self.display.set_state(state);
    }
}

impl<D: DisplaySurface> Drop for OpenSurface<'_, D> {
    fn drop(&mut self) {
        self.display.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optics::scripted::{DisplayEvent, RecordingDisplay};
    use crate::optics::StatusEvent;
    use crossbeam_channel::unbounded;
    use std::sync::Arc;

    const TEST_BIT_DURATION_MS: u64 = MIN_BIT_DURATION_MS;

    #[test]
    fn test_validate_bit_duration() {
        assert_eq!(validate_bit_duration(49), Err(LinkError::InvalidBitDuration(49)));
        assert_eq!(validate_bit_duration(1001), Err(LinkError::InvalidBitDuration(1001)));
        assert_eq!(validate_bit_duration(50), Ok(Duration::from_millis(50)));
        assert_eq!(validate_bit_duration(1000), Ok(Duration::from_millis(1000)));
    }

    #[test]
    fn test_validate_message() {
        assert_eq!(validate_message(""), Err(LinkError::EmptyMessage));
        assert!(validate_message(&"光".repeat(MAX_MESSAGE_CHARS)).is_ok());
        assert_eq!(
            validate_message(&"a".repeat(MAX_MESSAGE_CHARS + 1)),
            Err(LinkError::MessageTooLong {
                length: 501,
                max: MAX_MESSAGE_CHARS
            })
        );
    }

    #[test]
    fn test_estimate_duration() {
        assert_eq!(
            estimate_duration("Hi", Duration::from_millis(100)),
            Duration::from_millis(4800)
        );
    }

    #[test]
    fn test_send_drives_frame_bits() {
        let display = RecordingDisplay::new();
        let transmitter = Transmitter::new(display.clone());
        let (sender, events) = unbounded::<StatusEvent>();

        let outcome = transmitter.send("A", TEST_BIT_DURATION_MS, &sender).unwrap();
        assert_eq!(outcome, TransmitOutcome::Completed { bits: 32 });
        assert!(!transmitter.is_transmitting());

        let expected = codec::encode("A")
            .iter()
            .by_vals()
            .map(Luminance::from)
            .chain(std::iter::once(Luminance::Low))
            .collect::<Vec<_>>();
        assert_eq!(display.states(), expected);

        let trace = display.events();
        assert_eq!(trace.first(), Some(&DisplayEvent::Opened));
        assert_eq!(trace.last(), Some(&DisplayEvent::Closed));

        let progress = events
            .try_iter()
            .filter_map(|event| match event {
                StatusEvent::Progress(percent) => Some(percent),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(progress.len(), 32);
        assert_eq!(progress[15], 50.0);
        assert_eq!(progress.last(), Some(&100.0));
    }

    #[test]
    fn test_send_holds_each_bit() {
        let display = RecordingDisplay::new();
        let transmitter = Transmitter::new(display.clone());

        transmitter.send("A", TEST_BIT_DURATION_MS, &()).unwrap();

        let times = display
            .timed_events()
            .into_iter()
            .filter(|(_, event)| matches!(event, DisplayEvent::State(_)))
            .map(|(time, _)| time)
            .collect::<Vec<_>>();

        // First bit to low guard is 32 bit periods, less the slack between
        // the start instant and the first state change.
        let bit_duration = Duration::from_millis(TEST_BIT_DURATION_MS);
        assert_eq!(times.len(), 33);
        let total = *times.last().unwrap() - times[0];
        assert!(total >= bit_duration * 31);
        assert!(times.windows(2).all(|pair| pair[1] > pair[0]));
    }

    #[test]
    fn test_send_rejects_invalid_input() {
        let display = RecordingDisplay::new();
        let transmitter = Transmitter::new(display.clone());

        assert_eq!(
            transmitter.send("Hi", 20, &()),
            Err(LinkError::InvalidBitDuration(20))
        );
        assert_eq!(transmitter.send("", 100, &()), Err(LinkError::EmptyMessage));
        assert!(display.events().is_empty());
        assert!(!transmitter.is_transmitting());
    }

    #[test]
    fn test_stop_cancels_between_bits() {
        let display = RecordingDisplay::new();
        let transmitter = Arc::new(Transmitter::new(display.clone()));

        let worker = {
            let transmitter = transmitter.clone();
            std::thread::spawn(move || transmitter.send("Hello", TEST_BIT_DURATION_MS, &()))
        };

        while display.states().len() < 3 {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(transmitter.is_transmitting());
        assert_eq!(
            transmitter.send("again", TEST_BIT_DURATION_MS, &()),
            Ok(TransmitOutcome::Busy)
        );
        assert!(transmitter.stop());

        let outcome = worker.join().unwrap().unwrap();
        let bits_sent = match outcome {
            TransmitOutcome::Cancelled { bits_sent } => bits_sent,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert!(bits_sent >= 3 && bits_sent < codec::frame_length("Hello"));

        // Every started bit is held to completion, then the low guard.
        let states = display.states();
        assert_eq!(states.len(), bits_sent + 1);
        assert_eq!(states.last(), Some(&Luminance::Low));
        assert_eq!(display.events().last(), Some(&DisplayEvent::Closed));
        assert!(!transmitter.is_transmitting());
        assert!(!transmitter.stop());
    }
}
