pub mod broker;
pub mod descriptor;
pub mod directory;

pub use broker::DeviceBroker;
pub use descriptor::{DeviceCategory, DeviceDescriptor, RegistrationRecord, ThreadingCapability};
pub use directory::RegistrationDirectory;
