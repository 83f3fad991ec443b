use crossbeam_channel::Sender as ChannelSender;

/// Fire-and-forget status reporting towards whatever front end is attached.
pub trait StatusSink: Send + Sync {
    fn log(&self, text: &str);
    fn progress(&self, percent: f32);
    fn detection_info(&self, text: &str);
}

impl StatusSink for () {
    fn log(&self, _: &str) {}
    fn progress(&self, _: f32) {}
    fn detection_info(&self, _: &str) {}
}

/// Routes status through the crate logger.
pub struct LogSink;

impl StatusSink for LogSink {
    fn log(&self, text: &str) {
        info!("{}", text);
    }

    fn progress(&self, percent: f32) {
        debug!("Progress: {:.1}%", percent);
    }

    fn detection_info(&self, text: &str) {
        debug!("{}", text);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    Log(String),
    Progress(f32),
    DetectionInfo(String),
}

// Meant for an unbounded channel. A hung-up front end is ignored.
impl StatusSink for ChannelSender<StatusEvent> {
    fn log(&self, text: &str) {
        let _ = self.send(StatusEvent::Log(text.to_string()));
    }

    fn progress(&self, percent: f32) {
        let _ = self.send(StatusEvent::Progress(percent));
    }

    fn detection_info(&self, text: &str) {
        let _ = self.send(StatusEvent::DetectionInfo(text.to_string()));
    }
}
