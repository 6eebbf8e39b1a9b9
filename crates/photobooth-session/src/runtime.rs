//! Single coordinating task for a session controller.
//!
//! [`SessionRuntime::spawn`] moves the controller into one tokio task. That
//! task is the only place session state changes: caller commands, auto-clear
//! ticks and background animation results are all handled there, one at a
//! time.

use std::path::PathBuf;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use photobooth_core::{
    Error, EventRef, PhotoFilter, RawCapture, Result, SessionEvent, SessionId, SessionSnapshot,
    SessionState, TemplateRef,
};

use crate::bus::EventBus;
use crate::controller::SessionLifecycleController;
use crate::sequencer::PhotoProgress;
use crate::timer::TICK_INTERVAL;

/// Pending commands buffered before callers wait.
const COMMAND_BUFFER: usize = 32;

enum Command {
    Start {
        event: EventRef,
        template: TemplateRef,
        total_photos: u32,
        reply: oneshot::Sender<Result<SessionId>>,
    },
    ProcessCaptured {
        capture: RawCapture,
        reply: oneshot::Sender<Result<PhotoProgress>>,
    },
    SelectFilter {
        filter: PhotoFilter,
        reply: oneshot::Sender<Result<()>>,
    },
    SetComposedImages {
        display: PathBuf,
        print: Option<PathBuf>,
        reply: oneshot::Sender<Result<()>>,
    },
    Complete {
        reply: oneshot::Sender<Result<Option<SessionSnapshot>>>,
    },
    Cancel {
        reply: oneshot::Sender<()>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },
    State {
        reply: oneshot::Sender<SessionState>,
    },
    AnimationPending {
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// Spawns the coordinating task.
pub struct SessionRuntime;

impl SessionRuntime {
    /// Move `controller` into a new task and return a handle to drive it.
    ///
    /// The task runs until [`SessionHandle::shutdown`] is called or every handle
    /// is dropped.
    pub fn spawn(controller: SessionLifecycleController) -> (SessionHandle, JoinHandle<()>) {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let bus = controller.bus().clone();
        let task = tokio::spawn(run(controller, receiver));
        (SessionHandle { commands, bus }, task)
    }
}

async fn run(mut controller: SessionLifecycleController, mut commands: mpsc::Receiver<Command>) {
    let mut ticker = interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    info!("Session runtime started");
    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("All session handles dropped");
                    break;
                };
                let restarts_timer = matches!(command, Command::Complete { .. });
                if !dispatch(&mut controller, command).await {
                    break;
                }
                if restarts_timer {
                    // Count whole seconds from the completion, not from the last tick
                    ticker.reset();
                }
            }
            _ = ticker.tick() => {
                controller.tick();
            }
            Some(ready) = controller.recv_animation() => {
                controller.handle_animation_ready(ready);
            }
        }
    }

    controller.shutdown();
    info!("Session runtime stopped");
}

/// Apply one command. Returns false when the runtime should stop.
async fn dispatch(controller: &mut SessionLifecycleController, command: Command) -> bool {
    // A dropped reply receiver only means the caller stopped waiting
    match command {
        Command::Start {
            event,
            template,
            total_photos,
            reply,
        } => {
            let _ = reply.send(controller.start(event, template, total_photos).await);
        }
        Command::ProcessCaptured { capture, reply } => {
            let _ = reply.send(controller.process_captured(capture).await);
        }
        Command::SelectFilter { filter, reply } => {
            let _ = reply.send(controller.select_filter(filter));
        }
        Command::SetComposedImages {
            display,
            print,
            reply,
        } => {
            let _ = reply.send(controller.set_composed_images(display, print).await);
        }
        Command::Complete { reply } => {
            let _ = reply.send(controller.complete());
        }
        Command::Cancel { reply } => {
            controller.cancel();
            let _ = reply.send(());
        }
        Command::Clear { reply } => {
            controller.clear();
            let _ = reply.send(());
        }
        Command::State { reply } => {
            let _ = reply.send(controller.state().clone());
        }
        Command::AnimationPending { reply } => {
            let _ = reply.send(controller.animation_pending());
        }
        Command::Shutdown => return false,
    }
    true
}

/// Cloneable client for a running session controller.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    bus: EventBus,
}

impl SessionHandle {
    /// Register a lifecycle event subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    /// Start a new session.
    pub async fn start(
        &self,
        event: EventRef,
        template: TemplateRef,
        total_photos: u32,
    ) -> Result<SessionId> {
        self.request(|reply| Command::Start {
            event,
            template,
            total_photos,
            reply,
        })
        .await?
    }

    /// Submit one capture.
    pub async fn process_captured(&self, capture: RawCapture) -> Result<PhotoProgress> {
        self.request(|reply| Command::ProcessCaptured { capture, reply })
            .await?
    }

    /// Choose the filter applied after the last capture.
    pub async fn select_filter(&self, filter: PhotoFilter) -> Result<()> {
        self.request(|reply| Command::SelectFilter { filter, reply })
            .await?
    }

    /// Record the composed display image and optional print image.
    pub async fn set_composed_images(
        &self,
        display: PathBuf,
        print: Option<PathBuf>,
    ) -> Result<()> {
        self.request(|reply| Command::SetComposedImages {
            display,
            print,
            reply,
        })
        .await?
    }

    /// Complete the session.
    pub async fn complete(&self) -> Result<Option<SessionSnapshot>> {
        self.request(|reply| Command::Complete { reply }).await?
    }

    /// Abandon the session.
    pub async fn cancel(&self) -> Result<()> {
        self.request(|reply| Command::Cancel { reply }).await
    }

    /// Reset all session state.
    pub async fn clear(&self) -> Result<()> {
        self.request(|reply| Command::Clear { reply }).await
    }

    /// Copy of the current session state.
    pub async fn state(&self) -> Result<SessionState> {
        self.request(|reply| Command::State { reply }).await
    }

    /// Whether the latest animation job is still running.
    ///
    /// Once this returns false, any `AnimationReady` for the job is already on
    /// the event bus.
    pub async fn animation_pending(&self) -> Result<bool> {
        self.request(|reply| Command::AnimationPending { reply })
            .await
    }

    /// Stop the coordinating task, aborting any in-flight animation job.
    pub async fn shutdown(&self) {
        if self.commands.send(Command::Shutdown).await.is_err() {
            debug!("Session runtime already stopped");
        }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| runtime_stopped())?;
        response.await.map_err(|_| runtime_stopped())
    }
}

fn runtime_stopped() -> Error {
    Error::Other("session runtime stopped".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use photobooth_core::testing::{
        CopyFilterBackend, EncoderBehavior, MockCaptureProcessor, MockEncoder, RecordingStore,
    };
    use photobooth_core::BoothConfig;
    use tokio::time::Instant;

    use crate::controller::Collaborators;

    fn spawn_runtime(
        timeout_secs: u64,
        output: &std::path::Path,
    ) -> (SessionHandle, JoinHandle<()>) {
        spawn_runtime_with(
            timeout_secs,
            output,
            MockEncoder::new(EncoderBehavior::ReturnEmpty, EncoderBehavior::Succeed),
        )
    }

    fn spawn_runtime_with(
        timeout_secs: u64,
        output: &std::path::Path,
        encoder: MockEncoder,
    ) -> (SessionHandle, JoinHandle<()>) {
        let mut config = BoothConfig::default();
        config.auto_clear.timeout_secs = timeout_secs;
        config.session.output_directory = output.to_path_buf();
        let collaborators = Collaborators {
            capture: Arc::new(MockCaptureProcessor::new()),
            store: Arc::new(RecordingStore::new()),
            filter: Arc::new(CopyFilterBackend::new()),
            encoder: Arc::new(encoder),
            beauty: None,
        };
        SessionRuntime::spawn(SessionLifecycleController::new(config, collaborators))
    }

    async fn next_event(rx: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(600), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("bus closed")
    }

    fn template() -> TemplateRef {
        TemplateRef::new("t1", "Sheet", 6.0, 4.0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_clear_fires_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, task) = spawn_runtime(5, dir.path());
        let mut rx = handle.subscribe();

        handle
            .start(EventRef::new("e1", "Gala"), template(), 1)
            .await
            .unwrap();
        let photo = dir.path().join("1.jpg");
        std::fs::write(&photo, b"jpeg").unwrap();
        handle.process_captured(RawCapture::new(photo)).await.unwrap();
        handle.complete().await.unwrap();
        let completed_at = Instant::now();

        loop {
            if next_event(&mut rx).await == SessionEvent::AutoClearTimerExpired {
                break;
            }
        }
        assert_eq!(next_event(&mut rx).await, SessionEvent::SessionCleared);
        assert!(completed_at.elapsed() >= Duration::from_secs(5));
        assert!(completed_at.elapsed() < Duration::from_secs(6));

        let state = handle.state().await.unwrap();
        assert_eq!(state, SessionState::default());

        handle.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_complete_restarts_countdown() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, task) = spawn_runtime(5, dir.path());
        let mut rx = handle.subscribe();

        handle
            .start(EventRef::new("e1", "Gala"), template(), 1)
            .await
            .unwrap();
        handle.complete().await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        handle.complete().await.unwrap();
        let restarted_at = Instant::now();

        let mut expirations = 0;
        loop {
            match next_event(&mut rx).await {
                SessionEvent::AutoClearTimerExpired => expirations += 1,
                SessionEvent::SessionCleared => break,
                _ => {}
            }
        }
        assert_eq!(expirations, 1);
        assert!(restarted_at.elapsed() >= Duration::from_secs(5));

        handle.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_animation_ready_delivered_through_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, task) = spawn_runtime(60, &dir.path().join("output"));
        let mut rx = handle.subscribe();

        handle
            .start(EventRef::new("e1", "Gala"), template(), 2)
            .await
            .unwrap();
        for n in 1..=2 {
            let photo = dir.path().join(format!("{n}.jpg"));
            std::fs::write(&photo, b"jpeg").unwrap();
            handle.process_captured(RawCapture::new(photo)).await.unwrap();
        }

        let ready = loop {
            if let SessionEvent::AnimationReady(ready) = next_event(&mut rx).await {
                break ready;
            }
        };
        assert_eq!(ready.session_id, SessionId::new("session-1"));
        assert_eq!(ready.animation_path.extension().unwrap(), "gif");

        let state = handle.state().await.unwrap();
        assert_eq!(state.animation_path, Some(ready.animation_path));

        handle.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_animation_job_is_not_pending() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, task) = spawn_runtime_with(
            60,
            &dir.path().join("output"),
            MockEncoder::new(EncoderBehavior::Fail, EncoderBehavior::Fail),
        );
        let mut rx = handle.subscribe();
        assert!(!handle.animation_pending().await.unwrap());

        handle
            .start(EventRef::new("e1", "Gala"), template(), 2)
            .await
            .unwrap();
        for n in 1..=2 {
            let photo = dir.path().join(format!("{n}.jpg"));
            std::fs::write(&photo, b"jpeg").unwrap();
            handle.process_captured(RawCapture::new(photo)).await.unwrap();
        }

        let started = Instant::now();
        while handle.animation_pending().await.unwrap() {
            assert!(started.elapsed() < Duration::from_secs(5));
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event);
        }
        assert!(!seen
            .iter()
            .any(|event| matches!(event, SessionEvent::AnimationReady(_))));
        assert_eq!(handle.state().await.unwrap().animation_path, None);

        handle.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_errors_returned_to_caller() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, task) = spawn_runtime(60, dir.path());

        let result = handle
            .process_captured(RawCapture::new(dir.path().join("1.jpg")))
            .await;
        assert!(matches!(result, Err(Error::NoActiveSession)));

        handle
            .start(EventRef::new("e1", "Gala"), template(), 2)
            .await
            .unwrap();
        let again = handle
            .start(EventRef::new("e1", "Gala"), template(), 2)
            .await;
        assert!(matches!(again, Err(Error::AlreadyActive)));

        handle.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_after_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, task) = spawn_runtime(60, dir.path());
        handle.shutdown().await;
        task.await.unwrap();

        let result = handle.clear().await;
        assert!(matches!(result, Err(Error::Other(_))));
    }
}
