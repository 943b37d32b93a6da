pub mod cursor;
pub mod endpoint;
pub mod format;
pub mod pattern;
pub mod worker;

pub use cursor::SampleCursor;
pub use endpoint::StreamEndpoint;
pub use format::{BufferRequirements, PinCategory, PinDirection, VideoFormat};
