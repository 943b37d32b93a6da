use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::channel::{payload_size, PixelFormat};

/// A concrete video format: dimensions, pixel layout and nominal frame
/// interval. Used both as an enumerated candidate and, once a connection is
/// accepted, as the negotiated format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub frame_interval: Duration,
}

impl VideoFormat {
    /// The single canonical candidate this device produces.
    pub fn canonical() -> Self {
        Self {
            width: 1280,
            height: 720,
            pixel_format: PixelFormat::Bgr24,
            frame_interval: Duration::from_nanos(1_000_000_000 / 30),
        }
    }

    /// Sample buffer size the host's allocator must provide.
    pub fn buffer_size(&self) -> usize {
        payload_size(self.width, self.height, self.pixel_format)
    }

    pub fn frames_per_second(&self) -> f64 {
        1.0 / self.frame_interval.as_secs_f64()
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {:?} @{:.0}fps",
            self.width,
            self.height,
            self.pixel_format,
            self.frames_per_second()
        )
    }
}

/// Buffer allocation the host must satisfy before streaming starts.
///
/// One buffer is enough: samples are produced into a scratch buffer per
/// delivery, so the device never needs multi-buffering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRequirements {
    pub byte_size: usize,
    pub buffer_count: u32,
}

impl BufferRequirements {
    pub fn for_format(format: &VideoFormat) -> Self {
        Self {
            byte_size: format.buffer_size(),
            buffer_count: 1,
        }
    }
}

/// Data flow direction of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinDirection {
    Input,
    Output,
}

/// Vendor property hosts query to confirm the pin is a capture source;
/// several hosts refuse to treat a pin as a camera without this answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinCategory {
    Capture,
}
