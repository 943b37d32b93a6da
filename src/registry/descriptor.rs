use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Device category tag written into the registration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceCategory {
    #[serde(rename = "video-input-device")]
    VideoInputDevice,
}

/// Threading capability the server declares to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadingCapability {
    #[serde(rename = "both")]
    Both,
}

/// Identity of one virtual capture device. Immutable once published;
/// created at install time, read by the broker and the server at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub identity: Uuid,
    pub display_name: String,
    pub category: DeviceCategory,
}

impl DeviceDescriptor {
    pub fn new(identity: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            identity,
            display_name: display_name.into(),
            category: DeviceCategory::VideoInputDevice,
        }
    }

    /// Name of the shared frame channel segment all instances of this
    /// device attach to, in any host process.
    pub fn channel_name(&self) -> String {
        format!("vcam-{}", self.identity.simple())
    }
}

/// Persisted mapping from a descriptor to the server's loadable location.
///
/// Created and removed only by explicit install/uninstall; never mutated
/// while a filter instance is alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub descriptor: DeviceDescriptor,
    pub server_location: PathBuf,
    pub threading_capability: ThreadingCapability,
}
