use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use uuid::Uuid;

use vcam::error::VcamError;
use vcam::filter::{SampleSink, SampleTiming, StreamPin};
use vcam::pin::{PinCategory, PinDirection, VideoFormat};
use vcam::registry::DeviceDescriptor;
use vcam::server::ServerLifecycle;

struct NullSink;

impl SampleSink for NullSink {
    fn deliver(&self, _payload: &[u8], _timing: SampleTiming) {}
}

fn make_instance(dir: &std::path::Path) -> vcam::filter::FilterInstance {
    let identity = Uuid::new_v4();
    let server = ServerLifecycle::new(DeviceDescriptor::new(identity, "Test Camera"))
        .with_channel_dir(dir);
    server.create_instance(identity).unwrap()
}

fn bogus_format() -> VideoFormat {
    VideoFormat {
        width: 640,
        height: 480,
        ..VideoFormat::canonical()
    }
}

#[test]
fn test_connect_succeeds_iff_format_enumerated() {
    let dir = tempdir().unwrap();
    let mut filter = make_instance(dir.path());
    let pin = filter.pin_mut();

    let candidates = pin.enumerate_formats();
    assert_eq!(candidates, vec![VideoFormat::canonical()]);

    let err = pin.connect(Arc::new(NullSink), bogus_format()).unwrap_err();
    assert!(matches!(err, VcamError::FormatRejected { .. }));
    assert!(!pin.is_connected());
    assert_eq!(pin.get_format(), None);

    pin.connect(Arc::new(NullSink), VideoFormat::canonical())
        .unwrap();
    assert!(pin.is_connected());
}

#[test]
fn test_get_format_exact_after_connect_unset_after_disconnect() {
    let dir = tempdir().unwrap();
    let mut filter = make_instance(dir.path());
    let pin = filter.pin_mut();
    let format = VideoFormat::canonical();

    assert_eq!(pin.get_format(), None);

    pin.connect(Arc::new(NullSink), format).unwrap();
    assert_eq!(pin.get_format(), Some(format));

    pin.disconnect();
    assert_eq!(pin.get_format(), None);
    assert!(!pin.is_connected());
}

#[test]
fn test_buffer_requirements_match_negotiated_format() {
    let dir = tempdir().unwrap();
    let mut filter = make_instance(dir.path());
    let pin = filter.pin_mut();
    let format = VideoFormat::canonical();

    assert!(matches!(
        pin.buffer_requirements(),
        Err(VcamError::NotConnected)
    ));

    let reqs = pin.connect(Arc::new(NullSink), format).unwrap();
    assert_eq!(reqs.byte_size, format.buffer_size());
    assert_eq!(reqs.buffer_count, 1);
    assert_eq!(pin.buffer_requirements().unwrap(), reqs);
}

#[test]
fn test_second_connect_refused() {
    let dir = tempdir().unwrap();
    let mut filter = make_instance(dir.path());
    let pin = filter.pin_mut();

    pin.connect(Arc::new(NullSink), VideoFormat::canonical())
        .unwrap();
    let err = pin
        .connect(Arc::new(NullSink), VideoFormat::canonical())
        .unwrap_err();
    assert!(matches!(err, VcamError::AlreadyConnected));
    // the existing connection is untouched
    assert!(pin.is_connected());
}

#[test]
fn test_disconnect_is_idempotent() {
    let dir = tempdir().unwrap();
    let mut filter = make_instance(dir.path());
    let pin = filter.pin_mut();

    pin.disconnect();
    pin.connect(Arc::new(NullSink), VideoFormat::canonical())
        .unwrap();
    pin.disconnect();
    pin.disconnect();
    assert!(!pin.is_connected());
}

#[test]
fn test_set_format_narrows_enumeration() {
    let dir = tempdir().unwrap();
    let mut filter = make_instance(dir.path());
    let pin = filter.pin_mut();
    let format = VideoFormat::canonical();

    assert!(matches!(
        pin.set_format(bogus_format()),
        Err(VcamError::FormatRejected { .. })
    ));

    pin.set_format(format).unwrap();
    assert_eq!(pin.enumerate_formats(), vec![format]);
}

#[test]
fn test_set_format_while_connected_only_accepts_negotiated() {
    let dir = tempdir().unwrap();
    let mut filter = make_instance(dir.path());
    let pin = filter.pin_mut();
    let format = VideoFormat::canonical();

    pin.connect(Arc::new(NullSink), format).unwrap();
    pin.set_format(format).unwrap();
    assert!(matches!(
        pin.set_format(bogus_format()),
        Err(VcamError::FormatRejected { .. })
    ));
}

#[test]
fn test_capture_category_and_direction_queries() {
    let dir = tempdir().unwrap();
    let filter = make_instance(dir.path());

    // hosts probe these before treating the pin as a camera
    assert_eq!(filter.pin().query_direction(), PinDirection::Output);
    assert_eq!(filter.pin().query_category(), PinCategory::Capture);
}

#[test]
fn test_query_state_is_nonblocking_read() {
    use vcam::filter::{LifecycleState, VideoFilter};

    let dir = tempdir().unwrap();
    let filter = make_instance(dir.path());
    assert_eq!(
        filter.query_state(Duration::from_millis(100)),
        LifecycleState::Stopped
    );
}
