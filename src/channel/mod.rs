pub mod frame;
pub mod shared;

pub use frame::{
    max_payload_size, payload_size, row_stride, FrameSlot, PixelBuffer, PixelFormat, MAX_HEIGHT,
    MAX_WIDTH,
};
pub use shared::{FrameChannel, HEADER_LEN};
