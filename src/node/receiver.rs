use crossbeam_channel::{bounded, unbounded, RecvTimeoutError, TryRecvError};
use crossbeam_channel::{Receiver as ChannelReceiver, Sender as ChannelSender};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use super::{lock, preview, FrameAssembler, SamplerConfig, SignalSampler};
use crate::error::{CaptureError, LinkError};
use crate::optics::{CaptureDevice, StatusSink};
use crate::session::SessionState;

struct SamplingWorker {
    handle: JoinHandle<()>,
    finished: ChannelReceiver<()>,
    session: Arc<SessionState>,
}

/// Watches a capture device and turns brightness changes back into
/// messages.
///
/// Sampling runs on its own thread between `start` and `stop`. That thread
/// owns the device and closes it on the way out. Decoded messages queue up
/// on a channel until taken with `recv`.
pub struct Receiver<C: CaptureDevice + 'static> {
    config: SamplerConfig,
    state: Arc<SessionState>,
    message_sender: ChannelSender<String>,
    message_receiver: ChannelReceiver<String>,
    // Held across the whole of `start` and `stop`.
    worker: Mutex<Option<SamplingWorker>>,
    _capture: PhantomData<fn(C)>,
}

impl<C: CaptureDevice + 'static> Default for Receiver<C> {
    fn default() -> Self {
        Self::new(SamplerConfig::default())
    }
}

impl<C: CaptureDevice + 'static> Receiver<C> {
    pub fn new(config: SamplerConfig) -> Self {
        let (message_sender, message_receiver) = unbounded();

        Self {
            config,
            state: Arc::new(SessionState::new()),
            message_sender,
            message_receiver,
            worker: Mutex::new(None),
            _capture: PhantomData,
        }
    }

    pub fn start<S: StatusSink + 'static>(&self, mut capture: C, sink: S) -> Result<(), LinkError> {
        let mut worker = lock(&self.worker);

        if !self.state.try_start() {
            warn!("Receive session already active, ignoring start");
            return Err(LinkError::SessionBusy);
        }

        if let Err(err) = capture.open() {
            error!("Could not open capture device: {}", err);
            sink.log(&format!("Camera error: {}", err));
            self.state.finish();
            return Err(err.into());
        }

        // Per-session stop token. A loop left over from an earlier session
        // that timed out on stop still sees its own token as stopped.
        let session = Arc::new(SessionState::new());
        session.try_start();

        let (finished_sender, finished) = bounded(1);
        let context = SamplingContext {
            config: self.config.clone(),
            session: session.clone(),
            receiver: self.state.clone(),
            messages: self.message_sender.clone(),
        };

        sink.log("Camera started, listening for optical signals...");
        let handle = std::thread::spawn(move || {
            context.run(OpenCapture(capture), &sink);
            let _ = finished_sender.send(());
        });

        *worker = Some(SamplingWorker {
            handle,
            finished,
            session,
        });
        info!("Receive session started");

        Ok(())
    }

    /// Ends the session, waiting at most `stop_timeout` for the sampling
    /// loop. A loop stuck in a frame read is left behind; it closes the
    /// device as soon as that read returns.
    pub fn stop(&self) {
        let mut worker = lock(&self.worker);

        if !self.state.request_stop() {
            return;
        }

        if let Some(worker) = worker.take() {
            worker.session.request_stop();

            match worker.finished.recv_timeout(self.config.stop_timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    let _ = worker.handle.join();
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        "Sampling loop still running after {:?}, capture closes when its read returns",
                        self.config.stop_timeout
                    );
                }
            }
        }

        self.state.finish();
        info!("Capture stopped");
    }

    pub fn is_receiving(&self) -> bool {
        !self.state.is_idle()
    }

    pub fn recv(&self) -> Option<String> {
        self.message_receiver.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<String> {
        self.message_receiver.recv_timeout(timeout).ok()
    }

    pub fn try_recv(&self) -> Option<String> {
        match self.message_receiver.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl<C: CaptureDevice + 'static> Drop for Receiver<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Opened device owned by the sampling loop, closed on drop.
struct OpenCapture<C: CaptureDevice>(C);

impl<C: CaptureDevice> Drop for OpenCapture<C> {
    fn drop(&mut self) {
        self.0.close();
        debug!("Capture device closed");
    }
}

struct SamplingContext {
    config: SamplerConfig,
    session: Arc<SessionState>,
    receiver: Arc<SessionState>,
    messages: ChannelSender<String>,
}

impl SamplingContext {
    fn run<C: CaptureDevice>(self, mut capture: OpenCapture<C>, sink: &dyn StatusSink) {
        let mut sampler = SignalSampler::new(self.config.clone());
        let mut assembler = FrameAssembler::new(self.config.buffer_capacity);

        while self.session.is_active() {
            let frame = capture.0.read_frame();
            if !self.session.is_active() {
                break;
            }

            match frame {
                Ok(frame) => {
                    let observation = sampler.observe(&frame);

                    if let Some(bit) = observation.bit {
                        assembler.append(bit);
                        sink.detection_info(&format!(
                            "Bits received: {} | Current: {} | Brightness: {:.1}",
                            assembler.len(),
                            bit as u8,
                            observation.brightness
                        ));

                        if let Some(message) = assembler.extract() {
                            self.deliver(message, sink);
                        }
                    }
                }
                Err(CaptureError::Transient) => {}
                Err(err) => {
                    error!("Receive session aborted: {}", err);
                    sink.detection_info(&format!("Error: {}", err));
                    self.abort(capture);
                    return;
                }
            }

            std::thread::sleep(self.config.sample_interval);
        }
    }

    fn deliver(&self, message: String, sink: &dyn StatusSink) {
        info!("Message received: {} bytes", message.len());
        sink.log(&format!("Message received: '{}'", preview(&message)));
        let _ = self.messages.send(message);
    }

    // A failed device ends the receiver's session from inside the loop,
    // unless `stop` already claimed this session. The device is closed
    // before the receiver reads as idle.
    fn abort<C: CaptureDevice>(&self, capture: OpenCapture<C>) {
        drop(capture);
        if self.session.request_stop() && self.receiver.request_stop() {
            self.receiver.finish();
        }
    }
}
