use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::channel::FrameChannel;
use crate::error::VcamError;
use crate::filter::traits::{PinInfo, SampleSink, StreamPin};

use super::cursor::SampleCursor;
use super::format::{BufferRequirements, PinCategory, PinDirection, VideoFormat};
use super::worker::StreamWorker;

/// The device's single output stream endpoint.
///
/// Holds the negotiated format and connected peer, and owns the streaming
/// worker. The worker exists exactly while the owning filter is `Running`
/// and a peer is connected; every mutation below re-establishes that
/// conjunction through `sync_worker`.
pub struct StreamEndpoint {
    channel_name: String,
    channel_dir: Option<PathBuf>,
    channel: Option<Arc<FrameChannel>>,
    preferred: Option<VideoFormat>,
    negotiated: Option<VideoFormat>,
    peer: Option<Arc<dyn SampleSink>>,
    worker: Option<StreamWorker>,
    run_origin: Option<Duration>,
}

impl StreamEndpoint {
    pub fn new(channel_name: String, channel_dir: Option<PathBuf>) -> Self {
        Self {
            channel_name,
            channel_dir,
            channel: None,
            preferred: None,
            negotiated: None,
            peer: None,
            worker: None,
            run_origin: None,
        }
    }

    pub fn info(&self) -> PinInfo {
        PinInfo {
            name: "capture-out".to_string(),
            direction: PinDirection::Output,
            category: PinCategory::Capture,
        }
    }

    /// Whether the streaming thread currently exists.
    pub fn is_streaming(&self) -> bool {
        self.worker.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.peer.is_some()
    }

    /// Called by the owning filter on state transitions: `Some(origin)`
    /// while `Running`, `None` otherwise.
    pub(crate) fn set_run_origin(&mut self, origin: Option<Duration>) {
        self.run_origin = origin;
        self.sync_worker();
    }

    /// Start or stop the worker so that it runs iff the filter is running
    /// and a connection is negotiated. Stopping joins the thread before
    /// returning.
    fn sync_worker(&mut self) {
        let desired = self.run_origin.is_some() && self.negotiated.is_some() && self.peer.is_some();

        if !desired {
            if let Some(worker) = self.worker.take() {
                worker.stop();
            }
            return;
        }

        if self.worker.is_some() {
            // run() repeated while already streaming: idempotent.
            return;
        }

        let (Some(format), Some(origin), Some(peer)) =
            (self.negotiated, self.run_origin, self.peer.as_ref().map(Arc::clone))
        else {
            return;
        };

        if self.channel.is_none() {
            self.channel = self.open_channel();
        }

        let cursor = SampleCursor::new(format, self.channel.clone(), origin);
        self.worker = StreamWorker::start(cursor, peer);
    }

    /// Attach to the shared frame segment. Failure is absorbed: the stream
    /// must still run (serving the diagnostic pattern) because hosts treat
    /// a failing capture pin as fatal to the whole session.
    fn open_channel(&self) -> Option<Arc<FrameChannel>> {
        let opened = match &self.channel_dir {
            Some(dir) => FrameChannel::open_or_create_in(dir, &self.channel_name),
            None => FrameChannel::open_or_create(&self.channel_name),
        };

        match opened {
            Ok(channel) => Some(Arc::new(channel)),
            Err(e) => {
                warn!(
                    channel = %self.channel_name,
                    error = %e,
                    "frame channel unavailable, serving diagnostic pattern"
                );
                None
            }
        }
    }

    /// The device's full candidate set, independent of any `set_format`
    /// restriction.
    fn candidates(&self) -> Vec<VideoFormat> {
        vec![VideoFormat::canonical()]
    }
}

impl StreamPin for StreamEndpoint {
    fn enumerate_formats(&self) -> Vec<VideoFormat> {
        // set_format narrows enumeration to the host's preselected format
        match self.preferred {
            Some(f) => vec![f],
            None => self.candidates(),
        }
    }

    fn connect(
        &mut self,
        peer: Arc<dyn SampleSink>,
        requested: VideoFormat,
    ) -> Result<BufferRequirements, VcamError> {
        if self.peer.is_some() {
            return Err(VcamError::AlreadyConnected);
        }
        if !self.enumerate_formats().contains(&requested) {
            return Err(VcamError::FormatRejected { requested });
        }

        info!(format = %requested, "stream endpoint connected");
        self.negotiated = Some(requested);
        self.peer = Some(peer);
        self.sync_worker(); // deferred run() starts streaming now
        Ok(BufferRequirements::for_format(&requested))
    }

    fn disconnect(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
        // detach from the segment; the last detacher reclaims it
        self.channel = None;
        if self.peer.take().is_some() {
            info!("stream endpoint disconnected");
        }
        self.negotiated = None;
    }

    fn set_format(&mut self, format: VideoFormat) -> Result<(), VcamError> {
        if !self.candidates().contains(&format) {
            return Err(VcamError::FormatRejected { requested: format });
        }
        match self.negotiated {
            Some(current) if current != format => {
                Err(VcamError::FormatRejected { requested: format })
            }
            Some(_) => Ok(()),
            None => {
                self.preferred = Some(format);
                Ok(())
            }
        }
    }

    fn get_format(&self) -> Option<VideoFormat> {
        self.negotiated
    }

    fn buffer_requirements(&self) -> Result<BufferRequirements, VcamError> {
        self.negotiated
            .map(|f| BufferRequirements::for_format(&f))
            .ok_or(VcamError::NotConnected)
    }

    fn query_direction(&self) -> PinDirection {
        PinDirection::Output
    }

    fn query_category(&self) -> PinCategory {
        PinCategory::Capture
    }
}

impl Drop for StreamEndpoint {
    fn drop(&mut self) {
        self.disconnect();
    }
}
