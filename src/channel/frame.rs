use serde::{Deserialize, Serialize};

/// Largest frame any producer may publish; the shared segment is sized for it.
pub const MAX_WIDTH: u32 = 1920;
pub const MAX_HEIGHT: u32 = 1080;

/// Pixel layout of frame payloads.
///
/// Only packed 24-bit BGR is carried on the wire; the enum exists so the
/// header's format tag stays self-describing if more layouts are ever added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 24-bit packed blue-green-red, rows bottom-to-top, stride padded to 4 bytes.
    Bgr24,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgr24 => 3,
        }
    }

    /// Wire tag written into the segment header.
    pub fn to_wire(self) -> u32 {
        match self {
            PixelFormat::Bgr24 => 1,
        }
    }

    pub fn from_wire(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(PixelFormat::Bgr24),
            _ => None,
        }
    }
}

/// Row stride in bytes for a given width: pixels packed at 3 bytes each,
/// padded up to 4-byte alignment as the canonical bottom-up format requires.
pub fn row_stride(width: u32, format: PixelFormat) -> usize {
    (width as usize * format.bytes_per_pixel() + 3) & !3
}

/// Total payload size for one frame.
pub fn payload_size(width: u32, height: u32, format: PixelFormat) -> usize {
    row_stride(width, format) * height as usize
}

/// Payload area the shared segment reserves (one maximum-size frame).
pub const fn max_payload_size() -> usize {
    // 1920 * 3 is already 4-byte aligned
    (MAX_WIDTH as usize * 3) * MAX_HEIGHT as usize
}

/// One frame of pixel data as handed around in-process.
///
/// `data` holds `payload_size(width, height, format)` bytes, rows stored
/// bottom-to-top.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a zeroed (black) frame.
    pub fn black(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            data: vec![0u8; payload_size(width, height, format)],
        }
    }

    pub fn payload_len(&self) -> usize {
        self.data.len()
    }

    /// Byte offset of the start of a row, counted from the top of the image.
    /// Rows are stored bottom-up, so visual row 0 lives at the end.
    pub fn row_offset(&self, visual_row: u32) -> usize {
        let stride = row_stride(self.width, self.format);
        (self.height - 1 - visual_row) as usize * stride
    }
}

/// Snapshot of the shared slot as returned by `FrameChannel::try_read`.
#[derive(Debug, Clone)]
pub struct FrameSlot {
    pub sequence: u64,
    pub timestamp_nanos: i64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub payload: Vec<u8>,
}
