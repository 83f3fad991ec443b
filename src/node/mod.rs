use std::sync::{Mutex, MutexGuard};

mod frame_assembler;
pub use frame_assembler::{FrameAssembler, BUFFER_CAPACITY};

mod receiver;
pub use receiver::Receiver;

mod sampler;
pub use sampler::{Debouncer, Observation, SamplerConfig, SignalSampler};
pub use sampler::{BRIGHTNESS_THRESHOLD, REGION_HALF_WIDTH, STABLE_FRAMES_NEEDED};

mod sender;
pub use sender::{estimate_duration, validate_bit_duration, validate_message};
pub use sender::{TransmitOutcome, Transmitter};
pub use sender::{DEFAULT_BIT_DURATION_MS, MAX_BIT_DURATION_MS, MAX_MESSAGE_CHARS, MIN_BIT_DURATION_MS};

const PREVIEW_CHARS: usize = 50;

// A panicking capability must not wedge the link for later sessions.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// First characters of a message for log lines.
pub fn preview(message: &str) -> String {
    let mut chars = message.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
