//! Session lifecycle orchestration.
//!
//! The controller owns the one in-progress session and sequences everything
//! around it: capture, the post-session pipeline, composed images, completion,
//! auto-clear and reset. All methods take `&mut self`, so transitions happen
//! one at a time; the only work leaving the caller's task is the background
//! animation job, whose result comes back over a channel and is applied only
//! if it still belongs to the current session.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use photobooth_core::{
    AnimationEncoder, AnimationReady, BeautyProcessor, BoothConfig, CaptureProcessor, Error,
    EventRef, FilterBackend, PhotoFilter, RawCapture, Result, SessionEvent, SessionId,
    SessionSnapshot, SessionState, SessionStore, TemplateRef,
};
use photobooth_media::{AnimationGenerator, AnimationJob, FilterApplicator};

use crate::bus::EventBus;
use crate::sequencer::{CaptureSequencer, PhotoProgress};
use crate::timer::{AutoClearTimer, TimerTick};
use crate::tracker::DualPathImageTracker;

/// Minimum number of photos for a looping animation.
const MIN_ANIMATION_FRAMES: usize = 2;

/// External collaborators the controller drives.
#[derive(Clone)]
pub struct Collaborators {
    /// Capture post-processing
    pub capture: Arc<dyn CaptureProcessor>,
    /// Persistence
    pub store: Arc<dyn SessionStore>,
    /// Per-photo filters
    pub filter: Arc<dyn FilterBackend>,
    /// Animation encoders
    pub encoder: Arc<dyn AnimationEncoder>,
    /// Optional cosmetic retouch
    pub beauty: Option<Arc<dyn BeautyProcessor>>,
}

/// Lifecycle phase of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session
    Idle,
    /// Capturing photos
    Active,
    /// All photos captured; waiting for composition, completion or reset
    AwaitingFinalize,
}

/// Orchestrates one capture session at a time.
pub struct SessionLifecycleController {
    config: BoothConfig,
    state: SessionState,
    bus: EventBus,
    store: Arc<dyn SessionStore>,
    sequencer: CaptureSequencer,
    filters: FilterApplicator,
    animations: Arc<AnimationGenerator>,
    tracker: DualPathImageTracker,
    timer: AutoClearTimer,
    animation_tx: mpsc::UnboundedSender<AnimationReady>,
    animation_rx: mpsc::UnboundedReceiver<AnimationReady>,
    animation_task: Option<JoinHandle<()>>,
}

impl SessionLifecycleController {
    /// Create a controller with its own event bus.
    pub fn new(config: BoothConfig, collaborators: Collaborators) -> Self {
        Self::with_bus(config, collaborators, EventBus::default())
    }

    /// Create a controller emitting on an existing bus.
    pub fn with_bus(config: BoothConfig, collaborators: Collaborators, bus: EventBus) -> Self {
        let Collaborators {
            capture,
            store,
            filter,
            encoder,
            beauty,
        } = collaborators;

        let sequencer =
            CaptureSequencer::new(capture, beauty, config.beauty.clone(), Arc::clone(&store));
        let filters = FilterApplicator::new(filter, config.filters.enabled);
        let animations = Arc::new(AnimationGenerator::new(
            encoder,
            Arc::clone(&store),
            Duration::from_secs(config.animation.timeout_secs),
        ));
        let tracker = DualPathImageTracker::new(Arc::clone(&store));
        let timer = AutoClearTimer::new(&config.auto_clear);
        let (animation_tx, animation_rx) = mpsc::unbounded_channel();

        Self {
            config,
            state: SessionState::default(),
            bus,
            store,
            sequencer,
            filters,
            animations,
            tracker,
            timer,
            animation_tx,
            animation_rx,
            animation_task: None,
        }
    }

    /// Register a lifecycle event subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    /// The event bus this controller emits on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Current session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Configuration in use.
    pub fn config(&self) -> &BoothConfig {
        &self.config
    }

    /// Auto-clear timer.
    pub fn timer(&self) -> &AutoClearTimer {
        &self.timer
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        if !self.state.is_active {
            SessionPhase::Idle
        } else if self.state.is_complete() {
            SessionPhase::AwaitingFinalize
        } else {
            SessionPhase::Active
        }
    }

    /// Start a new session.
    ///
    /// Fails with [`Error::AlreadyActive`] without touching the running session.
    pub async fn start(
        &mut self,
        event: EventRef,
        template: TemplateRef,
        total_photos: u32,
    ) -> Result<SessionId> {
        if self.state.is_active {
            return Err(self.fail("start", Error::AlreadyActive));
        }
        if total_photos == 0 {
            return Err(self.fail(
                "start",
                Error::InvalidInput("total_photos must be > 0".to_string()),
            ));
        }

        let session_id = match self.store.create_session(&event.id, &template.id).await {
            Ok(id) => id,
            Err(e) => {
                let id = SessionId::generate();
                warn!("Failed to register session, using local id {}: {}", id, e);
                id
            }
        };

        let is_strip_format = template.is_strip_format(
            self.config.template.strip_ratio,
            self.config.template.strip_tolerance,
        );

        self.timer.stop();
        self.state = SessionState {
            session_id: Some(session_id.clone()),
            event: Some(event.clone()),
            template: Some(template.clone()),
            is_strip_format,
            total_required: total_photos,
            is_active: true,
            started_at: Some(Utc::now()),
            ..SessionState::default()
        };

        info!(
            "Session started: id={}, event={}, template={}, photos={}, strip={}",
            session_id, event.id, template.id, total_photos, is_strip_format
        );
        self.bus.emit(SessionEvent::SessionStarted {
            session_id: session_id.clone(),
            event,
            template,
            total_photos,
        });

        Ok(session_id)
    }

    /// Choose the filter the post-session pipeline applies.
    pub fn select_filter(&mut self, filter: PhotoFilter) -> Result<()> {
        if !self.state.is_active {
            return Err(self.fail("select_filter", Error::NoActiveSession));
        }
        debug!("Filter selected: {}", filter);
        self.state.selected_filter = filter;
        Ok(())
    }

    /// Accept one capture.
    ///
    /// The last required capture triggers the post-session pipeline, which
    /// returns as soon as background animation work is scheduled.
    pub async fn process_captured(&mut self, capture: RawCapture) -> Result<PhotoProgress> {
        let progress = match self.sequencer.process(&mut self.state, &capture).await {
            Ok(progress) => progress,
            Err(e) => return Err(self.fail("process_captured", e)),
        };

        self.bus.emit(SessionEvent::PhotoProcessed {
            session_id: progress.session_id.clone(),
            photo_path: progress.photo_path.clone(),
            index: progress.index,
            total_photos: progress.total,
            is_complete: progress.is_complete,
        });

        if progress.is_complete && !self.state.pipeline_triggered {
            self.run_post_session_pipeline().await;
        }

        Ok(progress)
    }

    /// Record the composed display image and, optionally, a separate print image.
    pub async fn set_composed_images(
        &mut self,
        display: PathBuf,
        print: Option<PathBuf>,
    ) -> Result<()> {
        if let Err(e) = self.tracker.set(&mut self.state, display, print).await {
            return Err(self.fail("set_composed_images", e));
        }
        Ok(())
    }

    /// Image to send to the printer.
    pub fn print_path(&self) -> Option<&Path> {
        DualPathImageTracker::print_path(&self.state)
    }

    /// Complete the session and start the auto-clear countdown.
    ///
    /// Returns the snapshot handed to subscribers, or `None` when no session is
    /// active. The live session is kept for composition and upload.
    pub fn complete(&mut self) -> Result<Option<SessionSnapshot>> {
        if !self.state.is_active {
            debug!("Complete requested with no active session");
            return Ok(None);
        }

        self.state.completed_at = Some(Utc::now());
        let Some(snapshot) = self.state.snapshot() else {
            return Err(self.fail("complete", Error::NoActiveSession));
        };

        info!(
            "Session completed: id={}, photos={}/{}",
            snapshot.session_id, snapshot.photos_captured, snapshot.total_photos
        );
        self.bus
            .emit(SessionEvent::SessionCompleted(Box::new(snapshot.clone())));
        self.timer.start();

        Ok(Some(snapshot))
    }

    /// Abandon the session without a completion snapshot.
    ///
    /// Captured paths stay readable through [`state`](Self::state) until the
    /// next start or clear.
    pub fn cancel(&mut self) {
        if !self.state.is_active {
            debug!("Cancel requested with no active session");
            return;
        }

        self.timer.stop();
        let session_id = self.state.session_id.take();
        self.state.is_active = false;
        self.state.current_index = 0;
        self.state.total_required = 0;
        self.state.pipeline_triggered = false;

        if let Some(session_id) = session_id {
            info!("Session cancelled: id={}", session_id);
            self.bus.emit(SessionEvent::SessionCancelled { session_id });
        }
    }

    /// Reset every session field. Idempotent.
    ///
    /// An in-flight animation job keeps running; its result will no longer
    /// match the current session and is dropped.
    pub fn clear(&mut self) {
        self.timer.stop();
        if let Some(session_id) = &self.state.session_id {
            info!("Clearing session: id={}", session_id);
        }
        self.state.reset();
        self.bus.emit(SessionEvent::SessionCleared);
    }

    /// Feed one auto-clear tick. Returns true if the session was cleared.
    pub fn tick(&mut self) -> bool {
        match self.timer.tick() {
            TimerTick::Expired => {
                self.bus.emit(SessionEvent::AutoClearTimerExpired);
                self.clear();
                true
            }
            TimerTick::Counting { remaining_secs, .. } => {
                debug!("Auto-clear in {}s", remaining_secs);
                false
            }
            TimerTick::Idle => false,
        }
    }

    /// Wait for the next background animation result.
    ///
    /// Cancel-safe; pair with [`handle_animation_ready`](Self::handle_animation_ready).
    pub async fn recv_animation(&mut self) -> Option<AnimationReady> {
        self.animation_rx.recv().await
    }

    /// Apply every animation result already delivered, without waiting.
    pub fn drain_animation_results(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(ready) = self.animation_rx.try_recv() {
            if self.handle_animation_ready(ready) {
                applied += 1;
            }
        }
        applied
    }

    /// Whether the most recent animation job is still running.
    ///
    /// Results already delivered are applied first, so once this returns false
    /// the job's `AnimationReady`, if any, has been emitted.
    pub fn animation_pending(&mut self) -> bool {
        self.drain_animation_results();
        self.animation_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Attach a finished animation if it belongs to the current session.
    ///
    /// Results for a superseded session are dropped and logged. Returns whether
    /// the result was applied.
    pub fn handle_animation_ready(&mut self, ready: AnimationReady) -> bool {
        if !self.state.is_current(&ready.session_id) {
            warn!(
                "Dropping animation {} for superseded session {}",
                ready.animation_path.display(),
                ready.session_id
            );
            return false;
        }

        self.state.animation_path = Some(ready.animation_path.clone());
        self.bus.emit(SessionEvent::AnimationReady(ready));
        true
    }

    /// Abort an in-flight animation job. Called when the owner shuts down.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.animation_task.take() {
            if !task.is_finished() {
                info!("Aborting in-flight animation job");
                task.abort();
            }
        }
    }

    async fn run_post_session_pipeline(&mut self) {
        self.state.pipeline_triggered = true;
        let Some(session_id) = self.state.session_id.clone() else {
            return;
        };
        info!("Running post-session pipeline: session={}", session_id);

        let filter = self.state.selected_filter;
        if self.filters.is_active_for(filter) {
            let filtered = self
                .filters
                .apply(&self.state.captured_photo_paths, filter)
                .await;
            self.state.captured_photo_paths = filtered;
        }

        if !self.config.animation.enabled {
            debug!("Animation disabled, skipping");
            return;
        }
        if self.state.captured_photo_paths.len() < MIN_ANIMATION_FRAMES {
            debug!(
                "Only {} photos, skipping animation",
                self.state.captured_photo_paths.len()
            );
            return;
        }

        let job = AnimationJob::from_settings(
            session_id,
            self.state.captured_photo_paths.clone(),
            self.config.session.output_directory.clone(),
            &self.config.animation,
        );
        let handle = self.animations.spawn(job, self.animation_tx.clone());
        if let Some(previous) = self.animation_task.replace(handle) {
            if !previous.is_finished() {
                debug!("Previous animation job still running, detaching it");
            }
        }
    }

    /// Log, emit `SessionError` and hand the error back for returning.
    fn fail(&self, operation: &str, err: Error) -> Error {
        error!("Session operation '{}' failed: {}", operation, err);
        self.bus.emit(SessionEvent::SessionError {
            error: err.to_string(),
            operation: operation.to_string(),
        });
        err
    }
}

impl Drop for SessionLifecycleController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
