use tempfile::tempdir;
use uuid::Uuid;

use vcam::error::VcamError;
use vcam::filter::LifecycleState;
use vcam::filter::VideoFilter;
use vcam::registry::DeviceDescriptor;
use vcam::server::ServerLifecycle;

fn server_for(identity: Uuid, dir: &std::path::Path) -> ServerLifecycle {
    ServerLifecycle::new(DeviceDescriptor::new(identity, "Test Camera")).with_channel_dir(dir)
}

#[test]
fn test_instance_count_tracks_creates_and_drops() {
    let dir = tempdir().unwrap();
    let identity = Uuid::new_v4();
    let server = server_for(identity, dir.path());

    assert_eq!(server.active_count(), 0);
    assert!(server.can_unload());

    let a = server.create_instance(identity).unwrap();
    assert_eq!(server.active_count(), 1);
    let b = server.create_instance(identity).unwrap();
    assert_eq!(server.active_count(), 2);
    assert!(!server.can_unload());

    drop(a);
    assert_eq!(server.active_count(), 1);
    drop(b);
    assert_eq!(server.active_count(), 0);
    assert!(server.can_unload());
}

#[test]
fn test_explicit_locks_block_unload() {
    let dir = tempdir().unwrap();
    let identity = Uuid::new_v4();
    let server = server_for(identity, dir.path());

    let lock = server.lock();
    assert!(!server.can_unload());

    let instance = server.create_instance(identity).unwrap();
    drop(lock);
    assert!(!server.can_unload(), "live instance still pins the server");

    drop(instance);
    assert!(server.can_unload());
}

#[test]
fn test_unsupported_identity_fails_synchronously() {
    let dir = tempdir().unwrap();
    let served = Uuid::new_v4();
    let server = server_for(served, dir.path());

    let other = Uuid::new_v4();
    match server.create_instance(other) {
        Err(VcamError::UnsupportedIdentity { requested, served: s }) => {
            assert_eq!(requested, other);
            assert_eq!(s, served);
        }
        other => panic!("expected UnsupportedIdentity, got {other:?}"),
    }
    assert!(server.can_unload());
}

#[test]
fn test_new_instance_starts_stopped_and_unconnected() {
    let dir = tempdir().unwrap();
    let identity = Uuid::new_v4();
    let server = server_for(identity, dir.path());

    let instance = server.create_instance(identity).unwrap();
    assert_eq!(
        instance.query_state(std::time::Duration::ZERO),
        LifecycleState::Stopped
    );
    assert!(!instance.pin().is_connected());
    assert!(!instance.pin().is_streaming());
}

#[test]
fn test_instance_drop_mid_stream_releases_usage() {
    use std::sync::Arc;
    use vcam::filter::{SampleSink, SampleTiming, StreamPin};
    use vcam::pin::VideoFormat;

    struct NullSink;
    impl SampleSink for NullSink {
        fn deliver(&self, _payload: &[u8], _timing: SampleTiming) {}
    }

    let dir = tempdir().unwrap();
    let identity = Uuid::new_v4();
    let server = server_for(identity, dir.path());

    let mut instance = server.create_instance(identity).unwrap();
    instance
        .pin_mut()
        .connect(Arc::new(NullSink), VideoFormat::canonical())
        .unwrap();
    instance.run(std::time::Duration::ZERO);
    assert!(instance.pin().is_streaming());

    // dropping a running instance joins its worker and releases the count
    drop(instance);
    assert_eq!(server.active_count(), 0);
}
