//! Integration tests for the replay driver with filesystem backends.

use std::path::Path;

use photobooth::{build_controller, replay, Ffmpeg, JournalEntry, ReplayPlan};
use photobooth_core::{
    BoothConfig, Error, EventRef, ImageTag, PhotoFilter, SessionEvent, TemplateRef,
};

fn write_photos(dir: &Path, count: usize) -> Vec<std::path::PathBuf> {
    (1..=count)
        .map(|n| {
            let path = dir.join(format!("IMG_{n:04}.jpg"));
            std::fs::write(&path, b"jpeg").unwrap();
            path
        })
        .collect()
}

fn config(output: &Path) -> BoothConfig {
    let mut config = BoothConfig::default();
    config.session.output_directory = output.to_path_buf();
    config.animation.timeout_secs = 1;
    config
}

fn plan(photos: Vec<std::path::PathBuf>, total_photos: u32) -> ReplayPlan {
    ReplayPlan {
        photos,
        event: EventRef::new("evt-1", "Open House"),
        template: TemplateRef::new("tpl-strip", "2x6", 2.0, 6.0),
        total_photos,
        filter: PhotoFilter::None,
        composed: None,
        print: None,
        wait_auto_clear: false,
    }
}

#[tokio::test]
async fn test_replay_without_encoder_still_completes() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw");
    std::fs::create_dir(&raw).unwrap();
    let output = dir.path().join("out");

    let (controller, store) = build_controller(
        config(&output),
        Ffmpeg::new(dir.path().join("missing-ffmpeg")),
    );
    let mut plan = plan(write_photos(&raw, 2), 2);
    plan.filter = PhotoFilter::Sepia;
    plan.composed = Some(output.join("strip.jpg"));
    plan.print = Some(output.join("strip_sheet.jpg"));

    let report = replay(controller, plan).await.unwrap();

    let snapshot = report.snapshot.expect("completion snapshot");
    assert_eq!(snapshot.photos_captured, 2);
    assert!(snapshot.is_strip_format);
    // The filter could not run, so the stored originals are kept
    for path in &snapshot.captured_photo_paths {
        assert!(path.starts_with(output.join("photos").join("evt-1")));
        assert!(path.exists());
    }
    assert!(report.animation.is_none());

    let names: Vec<&str> = report.events.iter().map(SessionEvent::name).collect();
    assert_eq!(
        names,
        vec![
            "session_started",
            "photo_processed",
            "photo_processed",
            "session_completed",
            "session_cleared"
        ]
    );

    let entries = store.entries().await.unwrap();
    let composed: Vec<ImageTag> = entries
        .iter()
        .filter_map(|entry| match entry {
            JournalEntry::Composed { tag, .. } => Some(*tag),
            _ => None,
        })
        .collect();
    assert_eq!(composed, vec![ImageTag::Strip, ImageTag::PrintDuplicate]);
    assert_eq!(
        entries
            .iter()
            .filter(|entry| matches!(entry, JournalEntry::Photo { .. }))
            .count(),
        2
    );
    assert!(!entries
        .iter()
        .any(|entry| matches!(entry, JournalEntry::Animation { .. })));
}

#[tokio::test]
async fn test_replay_with_too_few_photos_completes_early() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw");
    std::fs::create_dir(&raw).unwrap();
    let output = dir.path().join("out");

    let (controller, _store) = build_controller(
        config(&output),
        Ffmpeg::new(dir.path().join("missing-ffmpeg")),
    );

    let report = replay(controller, plan(write_photos(&raw, 1), 4))
        .await
        .unwrap();

    let snapshot = report.snapshot.expect("completion snapshot");
    assert_eq!(snapshot.photos_captured, 1);
    assert_eq!(snapshot.total_photos, 4);
    assert!(!report
        .events
        .iter()
        .any(|event| matches!(event, SessionEvent::PhotoProcessed { is_complete: true, .. })));
}

#[tokio::test]
async fn test_replay_propagates_missing_capture() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out");
    let (controller, _store) = build_controller(config(&output), Ffmpeg::default());

    let result = replay(
        controller,
        plan(vec![dir.path().join("vanished.jpg")], 1),
    )
    .await;

    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::CaptureFailed(message)) if message.contains("vanished.jpg")
    ));
}

#[tokio::test]
async fn test_replay_does_not_wait_out_animation_timeout_when_encoders_fail() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw");
    std::fs::create_dir(&raw).unwrap();
    let output = dir.path().join("out");
    let mut config = config(&output);
    config.animation.timeout_secs = 60;

    let (controller, _store) =
        build_controller(config, Ffmpeg::new(dir.path().join("missing-ffmpeg")));

    let started = std::time::Instant::now();
    let report = replay(controller, plan(write_photos(&raw, 2), 2))
        .await
        .unwrap();

    assert!(
        started.elapsed() < std::time::Duration::from_secs(10),
        "replay took {:?}",
        started.elapsed()
    );
    assert!(report.animation.is_none());
    assert_eq!(report.snapshot.expect("completion snapshot").photos_captured, 2);
}
