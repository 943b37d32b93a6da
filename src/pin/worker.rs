use crossbeam_channel::{bounded, select, tick, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error};

use crate::filter::traits::SampleSink;

use super::cursor::SampleCursor;

/// The per-connection streaming thread.
///
/// Owned by the endpoint, never by the host: the host only observes sample
/// delivery and controls the thread indirectly through the filter's state
/// machine. `stop` signals and joins, so once it returns no further
/// delivery can occur.
pub struct StreamWorker {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl StreamWorker {
    /// Spawn the thread; it ticks at the cursor's negotiated interval,
    /// fills the next sample and hands it to the sink.
    pub fn start(mut cursor: SampleCursor, sink: Arc<dyn SampleSink>) -> Option<Self> {
        let interval = cursor.format().frame_interval;
        let buffer_size = cursor.format().buffer_size();
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let spawned = std::thread::Builder::new()
            .name("vcam-stream".to_string())
            .spawn(move || {
                debug!(interval_ms = interval.as_millis() as u64, "streaming thread started");
                let ticker = tick(interval);
                let mut buf = vec![0u8; buffer_size];

                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            let timing = cursor.fill_next(&mut buf);
                            sink.deliver(&buf, timing);
                        }
                    }
                }
                debug!(samples = cursor.frame_index(), "streaming thread stopped");
            });

        match spawned {
            Ok(handle) => Some(Self {
                stop_tx,
                handle: Some(handle),
            }),
            Err(e) => {
                error!(error = %e, "failed to spawn streaming thread");
                None
            }
        }
    }

    /// Signal the thread and join it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StreamWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
