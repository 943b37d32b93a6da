use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::pin::StreamEndpoint;
use crate::registry::descriptor::DeviceDescriptor;
use crate::server::UsageGuard;

use super::state::LifecycleState;
use super::traits::{PinInfo, VideoFilter};

/// The plugin's top-level handle: one per host-process load.
///
/// Owns exactly one stream endpoint and drives its worker through the
/// three-state lifecycle. Holds a server usage guard so the lifecycle
/// manager's active count tracks instance lifetime exactly.
pub struct FilterInstance {
    descriptor: DeviceDescriptor,
    state: LifecycleState,
    graph: Option<String>,
    pin: StreamEndpoint,
    _usage: UsageGuard,
}

impl FilterInstance {
    pub(crate) fn new(
        descriptor: DeviceDescriptor,
        channel_dir: Option<PathBuf>,
        usage: UsageGuard,
    ) -> Self {
        let pin = StreamEndpoint::new(descriptor.channel_name(), channel_dir);
        Self {
            descriptor,
            state: LifecycleState::Stopped,
            graph: None,
            pin,
            _usage: usage,
        }
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn graph(&self) -> Option<&str> {
        self.graph.as_deref()
    }

    /// The single output endpoint, for pin-level host calls.
    pub fn pin(&self) -> &StreamEndpoint {
        &self.pin
    }

    pub fn pin_mut(&mut self) -> &mut StreamEndpoint {
        &mut self.pin
    }
}

// Manual: the endpoint holds a `dyn SampleSink` peer, so derive is out.
impl fmt::Debug for FilterInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterInstance")
            .field("descriptor", &self.descriptor)
            .field("state", &self.state)
            .field("graph", &self.graph)
            .field("streaming", &self.pin.is_streaming())
            .finish_non_exhaustive()
    }
}

impl VideoFilter for FilterInstance {
    fn stop(&mut self) {
        self.state = LifecycleState::Stopped;
        self.pin.set_run_origin(None);
        debug!(state = self.state.name(), "filter transition");
    }

    fn pause(&mut self) {
        self.state = LifecycleState::Paused;
        // delivery stops, connection and negotiated format stay intact
        self.pin.set_run_origin(None);
        debug!(state = self.state.name(), "filter transition");
    }

    fn run(&mut self, start_time: Duration) {
        self.state = LifecycleState::Running;
        self.pin.set_run_origin(Some(start_time));
        debug!(
            state = self.state.name(),
            streaming = self.pin.is_streaming(),
            "filter transition"
        );
    }

    fn query_state(&self, _timeout: Duration) -> LifecycleState {
        // state reads never block; the timeout exists for hosts whose
        // contract allows an in-flight transition to stall the answer
        self.state
    }

    fn enumerate_pins(&self) -> Vec<PinInfo> {
        vec![self.pin.info()]
    }

    fn join_graph(&mut self, graph_name: &str) {
        self.graph = Some(graph_name.to_string());
    }

    fn leave_graph(&mut self) {
        self.graph = None;
    }
}
