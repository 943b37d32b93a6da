use std::path::PathBuf;
use thiserror::Error;

use crate::pin::format::VideoFormat;

/// Errors surfaced across the plugin's public seams.
///
/// A stale frame is deliberately not in here: `FrameChannel::try_read`
/// returning no new data is steady-state behavior and is modeled as `None`.
#[derive(Debug, Error)]
pub enum VcamError {
    /// Registration attempted without elevation. Surfaced immediately,
    /// never retried automatically.
    #[error("elevated privileges required to modify the registration directory at {}", path.display())]
    PrivilegeRequired { path: PathBuf },

    /// Host requested a format outside the enumerated candidate set.
    #[error("requested format {requested} is not among the enumerated candidates")]
    FormatRejected { requested: VideoFormat },

    /// Shared-memory segment could not be created or mapped. The endpoint
    /// absorbs this at runtime by serving the diagnostic pattern.
    #[error("frame channel '{name}' unavailable: {source}")]
    ChannelUnavailable {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The broker asked this server for an identity it does not implement.
    #[error("server does not implement device identity {requested} (serves {served})")]
    UnsupportedIdentity {
        requested: uuid::Uuid,
        served: uuid::Uuid,
    },

    /// No registration record exists for the identity.
    #[error("no registration record for device identity {0}")]
    NotRegistered(uuid::Uuid),

    /// A pin operation that requires a negotiated connection was called
    /// while the pin was unconnected.
    #[error("stream endpoint is not connected")]
    NotConnected,

    /// A second connect was attempted while a peer is already connected;
    /// a stream endpoint has at most one peer at a time.
    #[error("stream endpoint already has a connected peer")]
    AlreadyConnected,

    #[error("registration record at {} is malformed: {source}", path.display())]
    MalformedRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VcamError>;
