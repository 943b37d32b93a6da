use std::sync::Arc;
use std::time::Duration;

use crate::channel::{row_stride, FrameChannel, FrameSlot};
use crate::filter::traits::SampleTiming;

use super::format::VideoFormat;
use super::pattern;

/// Sequential sample producer for one connection.
///
/// Owned by the streaming thread; `fill_next` is therefore strictly
/// sequential, which is what makes sample indices and timestamps
/// monotonic by construction.
///
/// Frame policy per call: a fresh frame from the channel is blitted and
/// cached; a stale read repeats the cache; with no channel (or nothing ever
/// published) the diagnostic pattern is served, so the host always sees a
/// valid stream once a format is negotiated.
pub struct SampleCursor {
    format: VideoFormat,
    channel: Option<Arc<FrameChannel>>,
    start_time: Duration,
    last_sequence: u64,
    frame_index: u64,
    cached: Option<Vec<u8>>,
}

impl SampleCursor {
    pub fn new(
        format: VideoFormat,
        channel: Option<Arc<FrameChannel>>,
        start_time: Duration,
    ) -> Self {
        Self {
            format,
            channel,
            start_time,
            last_sequence: 0,
            frame_index: 0,
            cached: None,
        }
    }

    pub fn format(&self) -> &VideoFormat {
        &self.format
    }

    /// Sequence of the last fresh frame observed, 0 if none yet.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Produce the next sample into `buf` and return its timing.
    ///
    /// `buf` must be `format.buffer_size()` bytes. Timing is pure index
    /// arithmetic: `start = start_time + index * interval`, exactly, whether
    /// the frame was fresh, repeated or synthetic.
    pub fn fill_next(&mut self, buf: &mut [u8]) -> SampleTiming {
        debug_assert_eq!(buf.len(), self.format.buffer_size());

        let fresh = self
            .channel
            .as_ref()
            .and_then(|c| c.try_read(self.last_sequence));

        match fresh {
            Some(slot) => {
                self.last_sequence = slot.sequence;
                blit_frame(&slot, &self.format, buf);
                self.cached = Some(buf.to_vec());
            }
            None => match &self.cached {
                Some(cached) => buf.copy_from_slice(cached),
                None => pattern::fill_diagnostic(buf, &self.format, self.frame_index),
            },
        }

        let index = self.frame_index;
        self.frame_index += 1;

        let interval_nanos = self.format.frame_interval.as_nanos() as u64;
        let start = self.start_time + Duration::from_nanos(interval_nanos * index);
        SampleTiming {
            start,
            stop: start + self.format.frame_interval,
            frame_index: index,
            sync_point: true,
        }
    }
}

/// Copy a published frame into a buffer laid out for `format`.
///
/// Both sides are bottom-up, so their bottom rows align at offset zero.
/// Dimension mismatches are handled by clipping: the overlapping region is
/// copied, the rest stays black. Producers normally publish the negotiated
/// size, in which case this is a straight copy.
fn blit_frame(slot: &FrameSlot, format: &VideoFormat, buf: &mut [u8]) {
    let dst_stride = row_stride(format.width, format.pixel_format);
    let src_stride = row_stride(slot.width, slot.format);

    if slot.width == format.width
        && slot.height == format.height
        && slot.payload.len() == buf.len()
    {
        buf.copy_from_slice(&slot.payload);
        return;
    }

    buf.fill(0);
    let rows = slot.height.min(format.height) as usize;
    let row_bytes = src_stride.min(dst_stride);

    for row in 0..rows {
        let src = row * src_stride;
        let dst = row * dst_stride;
        if src + row_bytes > slot.payload.len() {
            break;
        }
        buf[dst..dst + row_bytes].copy_from_slice(&slot.payload[src..src + row_bytes]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{PixelBuffer, PixelFormat};
    use tempfile::tempdir;

    fn small_format() -> VideoFormat {
        VideoFormat {
            width: 64,
            height: 48,
            ..VideoFormat::canonical()
        }
    }

    #[test]
    fn test_no_channel_serves_pattern() {
        let format = small_format();
        let mut cursor = SampleCursor::new(format, None, Duration::ZERO);
        let mut buf = vec![0u8; format.buffer_size()];

        let timing = cursor.fill_next(&mut buf);
        assert_eq!(timing.frame_index, 0);
        assert!(timing.sync_point);

        let mut expected = vec![0u8; format.buffer_size()];
        pattern::fill_diagnostic(&mut expected, &format, 0);
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_timing_is_exact_index_arithmetic() {
        let format = small_format();
        let origin = Duration::from_millis(500);
        let mut cursor = SampleCursor::new(format, None, origin);
        let mut buf = vec![0u8; format.buffer_size()];

        let mut previous = cursor.fill_next(&mut buf);
        assert_eq!(previous.start, origin);
        for _ in 0..10 {
            let timing = cursor.fill_next(&mut buf);
            assert_eq!(timing.start, previous.start + format.frame_interval);
            assert_eq!(timing.stop, timing.start + format.frame_interval);
            previous = timing;
        }
    }

    #[test]
    fn test_fresh_then_repeat() {
        let dir = tempdir().unwrap();
        let format = small_format();
        let channel = Arc::new(FrameChannel::open_or_create_in(dir.path(), "cursor0").unwrap());

        let mut frame = PixelBuffer::black(format.width, format.height, PixelFormat::Bgr24);
        frame.data.iter_mut().for_each(|b| *b = 0xAB);
        channel.publish(&frame, 1_000).unwrap();

        let mut cursor = SampleCursor::new(format, Some(channel), Duration::ZERO);
        let mut buf = vec![0u8; format.buffer_size()];

        cursor.fill_next(&mut buf);
        assert_eq!(cursor.last_sequence(), 1);
        assert!(buf.iter().all(|&b| b == 0xAB));

        // no new publish: repeat the cached frame, sequence unchanged
        buf.fill(0);
        cursor.fill_next(&mut buf);
        assert_eq!(cursor.last_sequence(), 1);
        assert!(buf.iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_blit_clips_smaller_source() {
        let format = small_format();
        let slot = FrameSlot {
            sequence: 1,
            timestamp_nanos: 0,
            width: 16,
            height: 8,
            format: PixelFormat::Bgr24,
            payload: vec![0xFF; crate::channel::payload_size(16, 8, PixelFormat::Bgr24)],
        };

        let mut buf = vec![0u8; format.buffer_size()];
        blit_frame(&slot, &format, &mut buf);

        let dst_stride = row_stride(format.width, format.pixel_format);
        // bottom row carries the source pixels
        assert_eq!(buf[0], 0xFF);
        // area beyond the source height stays black
        assert_eq!(buf[9 * dst_stride], 0);
    }
}
