use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

use crate::channel::{FrameChannel, PixelBuffer};
use crate::error::VcamError;

/// The only seam into the external capture/effects pipeline.
///
/// Must never block; returning a stale or placeholder frame at any time is
/// allowed and expected.
pub trait FrameProducer: Send {
    fn latest_frame(&mut self) -> PixelBuffer;
}

/// Producer-side publish loop: pulls the latest frame from the pipeline and
/// pushes it into the shared channel, write-and-forget. The pump neither
/// knows nor cares how many readers exist.
pub struct FramePump {
    channel: FrameChannel,
    producer: Box<dyn FrameProducer>,
}

impl FramePump {
    pub fn new(channel: FrameChannel, producer: Box<dyn FrameProducer>) -> Self {
        Self { channel, producer }
    }

    pub fn channel(&self) -> &FrameChannel {
        &self.channel
    }

    /// Publish one frame, stamped with the current wall-clock time.
    pub fn publish_once(&mut self) -> Result<u64, VcamError> {
        let frame = self.producer.latest_frame();
        let timestamp_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);

        let seq = self.channel.publish(&frame, timestamp_nanos)?;
        trace!(sequence = seq, width = frame.width, height = frame.height, "published frame");
        Ok(seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::PixelFormat;
    use tempfile::tempdir;

    struct SolidColor(u8);

    impl FrameProducer for SolidColor {
        fn latest_frame(&mut self) -> PixelBuffer {
            let mut frame = PixelBuffer::black(32, 24, PixelFormat::Bgr24);
            frame.data.fill(self.0);
            frame
        }
    }

    #[test]
    fn test_pump_publishes_sequentially() {
        let dir = tempdir().unwrap();
        let channel = FrameChannel::open_or_create_in(dir.path(), "pump0").unwrap();
        let mut pump = FramePump::new(channel, Box::new(SolidColor(0x42)));

        assert_eq!(pump.publish_once().unwrap(), 1);
        assert_eq!(pump.publish_once().unwrap(), 2);

        let slot = pump.channel().try_read(0).unwrap();
        assert_eq!(slot.sequence, 2);
        assert!(slot.payload.iter().all(|&b| b == 0x42));
    }
}
