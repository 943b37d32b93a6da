use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::VcamError;
use crate::filter::FilterInstance;
use crate::registry::descriptor::DeviceDescriptor;

/// Reference-counted factory answering the broker's "create an instance of
/// device X" requests inside whichever host process loaded the server.
///
/// The host may keep the module mapped across several create/destroy
/// cycles, so the server never assumes it owns its own lifetime: it only
/// reports "may unload" while no instance and no explicit lock is alive.
pub struct ServerLifecycle {
    descriptor: DeviceDescriptor,
    usage: Arc<AtomicUsize>,
    channel_dir: Option<PathBuf>,
}

impl ServerLifecycle {
    pub fn new(descriptor: DeviceDescriptor) -> Self {
        Self {
            descriptor,
            usage: Arc::new(AtomicUsize::new(0)),
            channel_dir: None,
        }
    }

    /// Route the frame channel segments of all instances into `dir` instead
    /// of the default shared location. Tests use this for isolation.
    pub fn with_channel_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.channel_dir = Some(dir.into());
        self
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// Construct a new filter instance for `identity`.
    ///
    /// Fails synchronously with `UnsupportedIdentity` when the identity is
    /// not the one this server serves. The instance starts `Stopped` with an
    /// unconnected stream endpoint.
    pub fn create_instance(&self, identity: Uuid) -> Result<FilterInstance, VcamError> {
        if identity != self.descriptor.identity {
            return Err(VcamError::UnsupportedIdentity {
                requested: identity,
                served: self.descriptor.identity,
            });
        }

        let guard = UsageGuard::acquire(&self.usage);
        debug!(identity = %identity, active = self.active_count(), "created filter instance");
        Ok(FilterInstance::new(
            self.descriptor.clone(),
            self.channel_dir.clone(),
            guard,
        ))
    }

    /// Explicit server lock; the returned guard releases on drop.
    pub fn lock(&self) -> UsageGuard {
        UsageGuard::acquire(&self.usage)
    }

    /// Live instances plus outstanding explicit locks.
    pub fn active_count(&self) -> usize {
        self.usage.load(Ordering::Acquire)
    }

    /// Whether the host may safely unload the server module.
    pub fn can_unload(&self) -> bool {
        self.active_count() == 0
    }
}

/// Ownership-tracked usage handle. Construction increments the server's
/// shared counter, drop decrements it exactly once; there is no manual
/// release path to double-free or leak.
pub struct UsageGuard {
    usage: Arc<AtomicUsize>,
}

impl UsageGuard {
    fn acquire(usage: &Arc<AtomicUsize>) -> Self {
        usage.fetch_add(1, Ordering::AcqRel);
        Self {
            usage: Arc::clone(usage),
        }
    }
}

impl Drop for UsageGuard {
    fn drop(&mut self) {
        self.usage.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ServerLifecycle {
        ServerLifecycle::new(DeviceDescriptor::new(Uuid::new_v4(), "Test Camera"))
    }

    #[test]
    fn test_lock_guard_balances_counter() {
        let server = server();
        assert!(server.can_unload());

        let a = server.lock();
        let b = server.lock();
        assert_eq!(server.active_count(), 2);

        drop(a);
        assert_eq!(server.active_count(), 1);
        drop(b);
        assert!(server.can_unload());
    }

    #[test]
    fn test_unsupported_identity_rejected() {
        let server = server();
        let err = server.create_instance(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, VcamError::UnsupportedIdentity { .. }));
        // a failed create leaves no usage behind
        assert!(server.can_unload());
    }
}
