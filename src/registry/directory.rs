use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use super::descriptor::{DeviceDescriptor, RegistrationRecord, ThreadingCapability};
use crate::error::VcamError;

/// On-disk registration directory the device broker enumerates.
///
/// One JSON record per registered device, keyed by identity. The canonical
/// root is a system location that requires elevation to modify; tests point
/// the directory at a scratch dir instead.
pub struct RegistrationDirectory {
    root: PathBuf,
}

impl RegistrationDirectory {
    /// Directory rooted at the platform's system-wide registration location.
    pub fn system() -> Self {
        Self::at(default_system_root())
    }

    /// Directory rooted at an explicit path.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the registration record for `descriptor`. Idempotent: an
    /// existing record for the same identity is replaced.
    ///
    /// The record is written to a temp file in the same directory and
    /// renamed into place, so a failure part-way leaves nothing behind.
    /// A permission failure surfaces as `PrivilegeRequired`.
    pub fn install(
        &self,
        descriptor: DeviceDescriptor,
        server_location: PathBuf,
    ) -> Result<RegistrationRecord, VcamError> {
        let record = RegistrationRecord {
            descriptor,
            server_location,
            threading_capability: ThreadingCapability::Both,
        };

        fs::create_dir_all(&self.root).map_err(|e| self.map_io(e))?;

        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;

        let final_path = self.record_path(record.descriptor.identity);
        let tmp_path = self
            .root
            .join(format!(".{}.json.tmp", record.descriptor.identity.simple()));

        fs::write(&tmp_path, json).map_err(|e| self.map_io(e))?;
        if let Err(e) = fs::rename(&tmp_path, &final_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.map_io(e));
        }

        info!(
            identity = %record.descriptor.identity,
            name = %record.descriptor.display_name,
            path = %final_path.display(),
            "installed registration record"
        );
        Ok(record)
    }

    /// Remove the record for `identity`. Idempotent: removing an identity
    /// that was never installed succeeds.
    pub fn uninstall(&self, identity: Uuid) -> Result<(), VcamError> {
        let path = self.record_path(identity);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(identity = %identity, "removed registration record");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.map_io(e)),
        }
    }

    /// Load the record for `identity`, or `NotRegistered`.
    pub fn lookup(&self, identity: Uuid) -> Result<RegistrationRecord, VcamError> {
        let path = self.record_path(identity);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(VcamError::NotRegistered(identity))
            }
            Err(e) => return Err(VcamError::Io(e)),
        };

        serde_json::from_str(&json).map_err(|source| VcamError::MalformedRecord { path, source })
    }

    /// All readable records under the root. Unparseable files are skipped,
    /// matching how a broker tolerates foreign entries in a shared namespace.
    pub fn list(&self) -> Result<Vec<RegistrationRecord>, VcamError> {
        let mut records = Vec::new();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(VcamError::Io(e)),
        };

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Ok(json) = fs::read_to_string(&path) {
                if let Ok(record) = serde_json::from_str::<RegistrationRecord>(&json) {
                    records.push(record);
                }
            }
        }

        Ok(records)
    }

    fn record_path(&self, identity: Uuid) -> PathBuf {
        self.root.join(format!("{}.json", identity.simple()))
    }

    fn map_io(&self, e: std::io::Error) -> VcamError {
        if e.kind() == ErrorKind::PermissionDenied {
            VcamError::PrivilegeRequired {
                path: self.root.clone(),
            }
        } else {
            VcamError::Io(e)
        }
    }
}

#[cfg(unix)]
fn default_system_root() -> PathBuf {
    PathBuf::from("/usr/local/share/vcam/devices")
}

#[cfg(not(unix))]
fn default_system_root() -> PathBuf {
    PathBuf::from(std::env::var_os("ProgramData").unwrap_or_else(|| "C:\\ProgramData".into()))
        .join("vcam")
        .join("devices")
}
