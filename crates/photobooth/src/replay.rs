//! Replaying a directory of captures through one session.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use photobooth_core::{
    AnimationReady, BoothConfig, Error, EventRef, PhotoFilter, RawCapture, SessionEvent,
    SessionSnapshot, TemplateRef,
};
use photobooth_session::{
    Collaborators, SessionHandle, SessionLifecycleController, SessionRuntime,
};

use crate::backends::{FileCaptureProcessor, JsonlSessionStore};
use crate::ffmpeg::{Ffmpeg, FfmpegEncoder, FfmpegFilterBackend};

/// Extra time granted past a configured timeout before giving up on an event.
const EVENT_GRACE: Duration = Duration::from_secs(2);

/// How often to ask whether the animation job is still running.
const JOB_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Journal file name inside the output directory.
pub const JOURNAL_FILE: &str = "sessions.jsonl";

/// What to replay.
#[derive(Debug, Clone)]
pub struct ReplayPlan {
    /// Photos in capture order
    pub photos: Vec<PathBuf>,
    /// Event the session belongs to
    pub event: EventRef,
    /// Template the session is composed onto
    pub template: TemplateRef,
    /// Photos required
    pub total_photos: u32,
    /// Filter applied after the last capture
    pub filter: PhotoFilter,
    /// Composed display image
    pub composed: Option<PathBuf>,
    /// Separate print image
    pub print: Option<PathBuf>,
    /// Wait for auto-clear instead of clearing right away
    pub wait_auto_clear: bool,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    /// Snapshot handed out on completion
    pub snapshot: Option<SessionSnapshot>,
    /// Animation attached to the session, if any
    pub animation: Option<AnimationReady>,
    /// Every lifecycle event observed, in order
    pub events: Vec<SessionEvent>,
}

/// Sorted image files in `dir`.
pub fn collect_photos(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;

    let mut photos = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
            .unwrap_or(false);
        if is_image && path.is_file() {
            photos.push(path);
        }
    }
    photos.sort();
    Ok(photos)
}

/// Controller wired to filesystem and ffmpeg collaborators.
///
/// Photos land in `<output>/photos/<event>/`, the journal in
/// `<output>/sessions.jsonl`.
pub fn build_controller(
    config: BoothConfig,
    ffmpeg: Ffmpeg,
) -> (SessionLifecycleController, Arc<JsonlSessionStore>) {
    let output = config.session.output_directory.clone();
    let store = Arc::new(JsonlSessionStore::new(output.join(JOURNAL_FILE)));

    if config.beauty.enabled {
        warn!("Beauty mode enabled but no retouch backend is available, skipping");
    }

    let collaborators = Collaborators {
        capture: Arc::new(FileCaptureProcessor::new(output.join("photos"))),
        store: store.clone(),
        filter: Arc::new(FfmpegFilterBackend::new(ffmpeg.clone())),
        encoder: Arc::new(FfmpegEncoder::new(ffmpeg)),
        beauty: None,
    };
    (SessionLifecycleController::new(config, collaborators), store)
}

/// Run `plan` through `controller` on a session runtime.
pub async fn replay(
    controller: SessionLifecycleController,
    plan: ReplayPlan,
) -> anyhow::Result<ReplayReport> {
    let config = controller.config().clone();
    let (handle, task) = SessionRuntime::spawn(controller);
    let mut events = handle.subscribe();
    let mut report = ReplayReport::default();

    handle
        .start(plan.event, plan.template, plan.total_photos)
        .await?;
    if plan.filter != PhotoFilter::None {
        handle.select_filter(plan.filter).await?;
    }

    let mut captured = 0;
    for photo in plan.photos.iter().take(plan.total_photos as usize) {
        let progress = handle.process_captured(RawCapture::new(photo)).await?;
        captured = progress.index;
    }
    if captured < plan.total_photos {
        warn!(
            "Only {} of {} photos available, completing early",
            captured, plan.total_photos
        );
    }

    // The pipeline only runs once every required photo is in
    let expects_animation =
        config.animation.enabled && captured >= 2 && captured == plan.total_photos;
    if expects_animation {
        let limit = Duration::from_secs(config.animation.timeout_secs) + EVENT_GRACE;
        report.animation =
            wait_for_animation(&handle, &mut events, &mut report.events, limit).await?;
        if report.animation.is_none() {
            warn!("No animation produced for this session");
        }
    }

    if let Some(display) = plan.composed {
        handle.set_composed_images(display, plan.print).await?;
    }

    report.snapshot = handle.complete().await?;

    if plan.wait_auto_clear && config.auto_clear.enabled {
        let limit = Duration::from_secs(config.auto_clear.timeout_secs) + EVENT_GRACE;
        info!("Waiting up to {}s for auto-clear", limit.as_secs());
        wait_for(&mut events, &mut report.events, limit, |event| {
            matches!(event, SessionEvent::SessionCleared)
        })
        .await;
    } else {
        handle.clear().await?;
    }

    handle.shutdown().await;
    task.await.context("session runtime panicked")?;

    while let Ok(event) = events.try_recv() {
        record(&mut report.events, event);
    }
    Ok(report)
}

/// Record events until one matches `done` or `limit` elapses.
async fn wait_for<F>(
    events: &mut broadcast::Receiver<SessionEvent>,
    seen: &mut Vec<SessionEvent>,
    limit: Duration,
    done: F,
) -> Option<SessionEvent>
where
    F: Fn(&SessionEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Ok(event)) => {
                let matched = done(&event);
                record(seen, event.clone());
                if matched {
                    return Some(event);
                }
            }
            Ok(Err(RecvError::Lagged(skipped))) => {
                warn!("Event log skipped {} events", skipped);
            }
            Ok(Err(RecvError::Closed)) => return None,
            Err(_) => {
                warn!("Timed out after {}s waiting for event", limit.as_secs());
                return None;
            }
        }
    }
}

/// Record events until the animation arrives or its job ends without one.
async fn wait_for_animation(
    handle: &SessionHandle,
    events: &mut broadcast::Receiver<SessionEvent>,
    seen: &mut Vec<SessionEvent>,
    limit: Duration,
) -> anyhow::Result<Option<AnimationReady>> {
    let deadline = tokio::time::Instant::now() + limit;
    let mut poll = tokio::time::interval(JOB_POLL_INTERVAL);
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    if let Some(ready) = take_animation(seen, event) {
                        return Ok(Some(ready));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event log skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return Ok(None),
            },
            _ = poll.tick() => {
                if !handle.animation_pending().await? {
                    // The job's result, if any, is already on the bus
                    while let Ok(event) = events.try_recv() {
                        if let Some(ready) = take_animation(seen, event) {
                            return Ok(Some(ready));
                        }
                    }
                    debug!("Animation job finished without a result");
                    return Ok(None);
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                warn!("Timed out after {}s waiting for animation", limit.as_secs());
                return Ok(None);
            }
        }
    }
}

fn take_animation(seen: &mut Vec<SessionEvent>, event: SessionEvent) -> Option<AnimationReady> {
    let ready = match &event {
        SessionEvent::AnimationReady(ready) => Some(ready.clone()),
        _ => None,
    };
    record(seen, event);
    ready
}

/// One line describing a failed replay for the booth operator.
///
/// Errors an attendee could act on keep their message; internal failures are
/// reported generically with the full cause chain.
pub fn operator_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<Error>() {
        Some(session_err) if session_err.is_user_visible() => session_err.to_string(),
        _ => format!("Session failed: {:#}", err),
    }
}

fn record(seen: &mut Vec<SessionEvent>, event: SessionEvent) {
    match serde_json::to_string(&event) {
        Ok(json) => info!(event = event.name(), "{}", json),
        Err(e) => warn!("Failed to serialize {} event: {}", event.name(), e),
    }
    seen.push(event);
}
