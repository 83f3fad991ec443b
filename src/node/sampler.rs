use std::time::Duration;

use super::BUFFER_CAPACITY;
use crate::optics::{center_brightness, LumaFrame};

pub const BRIGHTNESS_THRESHOLD: f32 = 128.0;
pub const STABLE_FRAMES_NEEDED: usize = 3;
pub const REGION_HALF_WIDTH: usize = 50;
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(10);
pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Receive-side policy. Nothing here is calibrated at runtime, the defaults
/// assume a bright screen patch filling the center of a ~30 fps camera.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub threshold: f32,
    pub stable_frames: usize,
    pub region_half_width: usize,
    pub sample_interval: Duration,
    pub stop_timeout: Duration,
    pub buffer_capacity: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            threshold: BRIGHTNESS_THRESHOLD,
            stable_frames: STABLE_FRAMES_NEEDED,
            region_half_width: REGION_HALF_WIDTH,
            sample_interval: SAMPLE_INTERVAL,
            stop_timeout: STOP_TIMEOUT,
            buffer_capacity: BUFFER_CAPACITY,
        }
    }
}

impl SamplerConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_stable_frames(mut self, stable_frames: usize) -> Self {
        self.stable_frames = stable_frames;
        self
    }

    pub fn with_region_half_width(mut self, half_width: usize) -> Self {
        self.region_half_width = half_width;
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn classify(&self, brightness: f32) -> bool {
        brightness > self.threshold
    }
}

/// Confirms a level only once it has been seen for `stable_frames`
/// consecutive observations and then changes.
///
/// A run shorter than that is dropped. A run of any length longer than that
/// still yields a single bit.
pub struct Debouncer {
    stable_frames: usize,
    candidate: Option<(bool, usize)>,
}

impl Debouncer {
    pub fn new(stable_frames: usize) -> Self {
        Self {
            stable_frames,
            candidate: None,
        }
    }

    pub fn update(&mut self, observed: bool) -> Option<bool> {
        match self.candidate {
            None => {
                self.candidate = Some((observed, 1));
                None
            }
            Some((value, run)) if value == observed => {
                self.candidate = Some((value, run.saturating_add(1)));
                None
            }
            Some((value, run)) => {
                self.candidate = Some((observed, 1));
                (run >= self.stable_frames).then_some(value)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub brightness: f32,
    pub level: bool,
    pub bit: Option<bool>,
}

/// Frame in, maybe a recovered bit out.
pub struct SignalSampler {
    config: SamplerConfig,
    debouncer: Debouncer,
}

impl SignalSampler {
    pub fn new(config: SamplerConfig) -> Self {
        let debouncer = Debouncer::new(config.stable_frames);
        Self { config, debouncer }
    }

    pub fn observe(&mut self, frame: &LumaFrame) -> Observation {
        let brightness = center_brightness(frame, self.config.region_half_width);
        self.observe_brightness(brightness)
    }

    pub fn observe_brightness(&mut self, brightness: f32) -> Observation {
        let level = self.config.classify(brightness);
        Observation {
            brightness,
            level,
            bit: self.debouncer.update(level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debounce_all(observations: &[bool]) -> Vec<bool> {
        let mut debouncer = Debouncer::new(STABLE_FRAMES_NEEDED);
        observations
            .iter()
            .filter_map(|&level| debouncer.update(level))
            .collect()
    }

    // Reference: every run that is followed by a change and is long enough.
    fn expected_bits(observations: &[bool]) -> Vec<bool> {
        let mut runs: Vec<(bool, usize)> = Vec::new();
        for &level in observations {
            match runs.last_mut() {
                Some((value, run)) if *value == level => *run += 1,
                _ => runs.push((level, 1)),
            }
        }
        runs.pop();
        runs.into_iter()
            .filter(|&(_, run)| run >= STABLE_FRAMES_NEEDED)
            .map(|(value, _)| value)
            .collect()
    }

    #[test]
    fn test_debounce_basic() {
        let (h, l) = (true, false);
        assert_eq!(debounce_all(&[h, h, h, l]), vec![h]);
        assert_eq!(debounce_all(&[h, h, l, l, l, h]), vec![l]);
        assert_eq!(debounce_all(&[h, h, h, h, h, h]), Vec::<bool>::new());
        assert_eq!(debounce_all(&[l, l, l, l, h, l, l, l, h, h, h, l]), vec![l, l, h]);
    }

    #[test]
    fn test_debounce_law_random() {
        const TEST_OBSERVATIONS: usize = 2000;

        for _ in 0..50 {
            // Sticky random walk so runs of every length show up.
            let mut level = false;
            let observations = (0..TEST_OBSERVATIONS)
                .map(|_| {
                    if rand::random::<u8>() % 3 == 0 {
                        level = !level;
                    }
                    level
                })
                .collect::<Vec<_>>();

            assert_eq!(debounce_all(&observations), expected_bits(&observations));
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let config = SamplerConfig::default();
        assert!(!config.classify(128.0));
        assert!(config.classify(128.5));
        assert!(!config.classify(0.0));
    }

    #[test]
    fn test_sampler_observe() {
        let mut sampler = SignalSampler::new(SamplerConfig::default());
        let bright = LumaFrame::uniform(640, 480, 250);
        let dark = LumaFrame::uniform(640, 480, 10);

        for _ in 0..3 {
            let observation = sampler.observe(&bright);
            assert!(observation.level);
            assert_eq!(observation.bit, None);
        }

        let observation = sampler.observe(&dark);
        assert_eq!(observation.brightness, 10.0);
        assert!(!observation.level);
        assert_eq!(observation.bit, Some(true));
    }

    #[test]
    fn test_custom_stable_frames() {
        let config = SamplerConfig::default().with_stable_frames(5);
        let mut sampler = SignalSampler::new(config);

        let bits = [200.0, 200.0, 200.0, 200.0, 0.0, 0.0, 0.0, 0.0, 0.0, 200.0]
            .into_iter()
            .filter_map(|brightness| sampler.observe_brightness(brightness).bit)
            .collect::<Vec<_>>();

        assert_eq!(bits, vec![false]);
    }
}
