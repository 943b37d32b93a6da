pub mod instance;
pub mod state;
pub mod traits;

pub use instance::FilterInstance;
pub use state::LifecycleState;
pub use traits::{PinInfo, SampleSink, SampleTiming, StreamPin, VideoFilter};
