use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

use crate::error::VcamError;
use crate::filter::FilterInstance;
use crate::server::ServerLifecycle;

use super::descriptor::DeviceDescriptor;
use super::directory::RegistrationDirectory;

/// In-process stand-in for the OS device broker: resolves a registered
/// identity to a live filter instance.
///
/// A real broker loads the server module from the record's
/// `server_location` inside the host process; here the server is linked in,
/// which is exactly what `vcam status` needs for a hard end-to-end
/// verification: "registered but not instantiable" is a failure, not a
/// partial success requiring a host restart.
pub struct DeviceBroker {
    directory: RegistrationDirectory,
    channel_dir: Option<PathBuf>,
}

impl DeviceBroker {
    pub fn new(directory: RegistrationDirectory) -> Self {
        Self {
            directory,
            channel_dir: None,
        }
    }

    /// Route instantiated devices' frame segments into `dir`; tests use
    /// this for isolation.
    pub fn with_channel_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.channel_dir = Some(dir.into());
        self
    }

    /// Descriptors of every registered device.
    pub fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, VcamError> {
        Ok(self
            .directory
            .list()?
            .into_iter()
            .map(|r| r.descriptor)
            .collect())
    }

    /// Look the identity up and construct a filter instance through the
    /// server lifecycle manager, the same path a host load takes.
    pub fn instantiate(&self, identity: Uuid) -> Result<FilterInstance, VcamError> {
        let record = self.directory.lookup(identity)?;
        debug!(
            identity = %identity,
            server = %record.server_location.display(),
            "instantiating registered device"
        );

        let mut server = ServerLifecycle::new(record.descriptor);
        if let Some(dir) = &self.channel_dir {
            server = server.with_channel_dir(dir.clone());
        }
        server.create_instance(identity)
    }
}
