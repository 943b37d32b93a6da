use std::sync::Arc;
use std::time::Duration;

use super::state::LifecycleState;
use crate::error::VcamError;
use crate::pin::format::{BufferRequirements, PinCategory, PinDirection, VideoFormat};

/// Timing attached to one delivered sample.
///
/// `start`/`stop` are media times on the timeline whose origin is the
/// `start_time` the host passed to `run`. They come from the sample index
/// and the negotiated interval, never from the wall clock, so consecutive
/// samples tile the timeline exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleTiming {
    pub start: Duration,
    pub stop: Duration,
    pub frame_index: u64,
    /// Every sample from this device is a sync point (each frame is
    /// independently decodable).
    pub sync_point: bool,
}

/// The host's consuming endpoint: where filled samples are handed over.
///
/// Implemented by the host framework (or a test harness); called from the
/// endpoint's streaming thread, never from host graph-management calls.
pub trait SampleSink: Send + Sync {
    fn deliver(&self, payload: &[u8], timing: SampleTiming);
}

/// Identification of one stream endpoint as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinInfo {
    pub name: String,
    pub direction: PinDirection,
    pub category: PinCategory,
}

/// Device-level plugin contract, exactly the operations the host's media
/// framework drives. The host, not this crate, chooses the call sequence,
/// so the surface is implemented literally: no extra conveniences, no
/// omitted queries.
pub trait VideoFilter {
    /// Halt streaming if running and enter `Stopped`. Always succeeds.
    fn stop(&mut self);

    /// Suspend frame delivery but keep connection and negotiated format
    /// intact. From `Stopped`, enters `Paused` without starting streaming.
    fn pause(&mut self);

    /// Enter `Running` with `start_time` as the timeline origin. Starts the
    /// streaming thread if a peer is connected and a format negotiated;
    /// otherwise the thread start is deferred until a connection completes.
    fn run(&mut self, start_time: Duration);

    /// Synchronous state read for hosts that poll rather than subscribe.
    fn query_state(&self, timeout: Duration) -> LifecycleState;

    /// Always exactly one endpoint: this device exposes a single output pin.
    fn enumerate_pins(&self) -> Vec<PinInfo>;

    fn join_graph(&mut self, graph_name: &str);

    fn leave_graph(&mut self);
}

/// Pin-level plugin contract: negotiation and connection management, plus
/// the query surface hosts probe before treating a pin as a camera.
pub trait StreamPin {
    /// The fixed set of formats this device can produce.
    fn enumerate_formats(&self) -> Vec<VideoFormat>;

    /// Accept a connection from `peer` using `requested`, or refuse with
    /// `FormatRejected`. On success the returned requirements tell the
    /// host's allocator what to provide.
    fn connect(
        &mut self,
        peer: Arc<dyn SampleSink>,
        requested: VideoFormat,
    ) -> Result<BufferRequirements, VcamError>;

    /// Stop streaming if running and clear negotiated format and peer.
    /// No sample delivery occurs after this returns.
    fn disconnect(&mut self);

    /// Preselect a format for a later connection. Rejected while connected
    /// unless it matches the negotiated format.
    fn set_format(&mut self, format: VideoFormat) -> Result<(), VcamError>;

    /// Negotiated format, or `None` while unconnected.
    fn get_format(&self) -> Option<VideoFormat>;

    /// Buffer allocation for the negotiated format; `NotConnected` before
    /// negotiation.
    fn buffer_requirements(&self) -> Result<BufferRequirements, VcamError>;

    fn query_direction(&self) -> PinDirection;

    /// The vendor capture-category property. Several hosts refuse a pin as
    /// a camera unless this answers `Capture`.
    fn query_category(&self) -> PinCategory;
}
