use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionPhase {
    Idle = 0,
    Active = 1,
    Stopping = 2,
}

impl SessionPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionPhase::Active,
            2 => SessionPhase::Stopping,
            _ => SessionPhase::Idle,
        }
    }
}

/// Lifecycle of one transmit or receive session, shared between the
/// background loop and whoever starts or stops it.
///
/// Only `Idle -> Active` admits a session, so two concurrent starts cannot
/// both win.
#[derive(Debug)]
pub struct SessionState {
    phase: AtomicU8,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(SessionPhase::Idle as u8),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn try_start(&self) -> bool {
        self.transition(SessionPhase::Idle, SessionPhase::Active)
    }

    /// Asks a running loop to wind down. Returns false if nothing was active.
    pub fn request_stop(&self) -> bool {
        self.transition(SessionPhase::Active, SessionPhase::Stopping)
    }

    pub fn finish(&self) {
        self.phase.store(SessionPhase::Idle as u8, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.phase() == SessionPhase::Active
    }

    pub fn is_idle(&self) -> bool {
        self.phase() == SessionPhase::Idle
    }

    fn transition(&self, from: SessionPhase, to: SessionPhase) -> bool {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
