use super::*;
use crate::config::{BowlwatchConfig, CameraConfig, CameraSource};
use crate::error::BowlwatchError;
use crate::frame::FrameFormat;

fn create_test_camera_config(source: CameraSource, directory: &str) -> CameraConfig {
    CameraConfig {
        source,
        directory: directory.to_string(),
        ..BowlwatchConfig::default().camera
    }
}

#[tokio::test]
async fn test_mock_source_follows_script() {
    let mut source = MockFrameSource::new()
        .then_frame()
        .then_missing()
        .then_failure("sensor timeout");

    assert!(source.is_open());
    assert!(source.read().await.unwrap().is_some());
    assert!(source.read().await.unwrap().is_none());
    assert!(matches!(
        source.read().await,
        Err(crate::error::CameraError::CaptureStream { .. })
    ));
    assert!(!source.is_open());
    assert_eq!(source.reads(), 3);
}

#[tokio::test]
async fn test_mock_source_release() {
    let mut source = MockFrameSource::with_frames(2);
    source.release().await;

    assert!(!source.is_open());
    assert!(matches!(
        source.read().await,
        Err(crate::error::CameraError::Closed)
    ));
}

#[tokio::test]
async fn test_directory_source_replays_in_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("002.png"), [0x89, b'P', b'N', b'G']).unwrap();
    std::fs::write(dir.path().join("001.jpg"), [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"not a frame").unwrap();

    let mut source = DirectoryFrameSource::open(dir.path()).await.unwrap();
    assert_eq!(source.remaining(), 2);

    let first = source.read().await.unwrap().unwrap();
    assert_eq!(first.format, FrameFormat::Jpeg);
    assert_eq!(first.id, 1);

    let second = source.read().await.unwrap().unwrap();
    assert_eq!(second.format, FrameFormat::Png);

    assert!(!source.is_open());
    assert!(source.read().await.unwrap().is_none());
}

#[tokio::test]
async fn test_directory_source_missing_directory() {
    let result = DirectoryFrameSource::open("/nonexistent/bowlwatch/frames").await;

    assert!(matches!(
        result,
        Err(crate::error::CameraError::DeviceOpen { .. })
    ));
}

#[tokio::test]
async fn test_builder_requires_config() {
    let result = FrameSourceBuilder::new().build().await;

    match result {
        Err(BowlwatchError::System { message }) => {
            assert!(message.contains("Camera configuration must be specified"));
        }
        _ => panic!("Expected system error for missing configuration"),
    }
}

#[tokio::test]
async fn test_builder_directory_source() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bowl.jpg"), [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();

    let config = create_test_camera_config(
        CameraSource::Directory,
        dir.path().to_str().unwrap(),
    );
    let source = FrameSourceBuilder::new().config(config).build().await.unwrap();

    assert_eq!(source.name(), "directory");
    assert!(source.is_open());
}

#[cfg(all(feature = "camera", target_os = "linux"))]
#[test]
fn test_pipeline_strings() {
    let v4l2 = create_test_camera_config(CameraSource::V4l2, "");
    let desc = GStreamerCamera::build_pipeline_string(&v4l2).unwrap();
    assert!(desc.starts_with("v4l2src device=/dev/video0"));
    assert!(desc.contains("image/jpeg,width=640,height=480"));
    assert!(desc.contains("max-buffers=1 drop=true"));

    let libcamera = create_test_camera_config(CameraSource::Libcamera, "");
    let desc = GStreamerCamera::build_pipeline_string(&libcamera).unwrap();
    assert!(desc.starts_with("libcamerasrc"));
    assert!(desc.contains("jpegenc"));

    let directory = create_test_camera_config(CameraSource::Directory, "./frames");
    assert!(GStreamerCamera::build_pipeline_string(&directory).is_err());
}
