//! Playback dispatcher
//!
//! Turns Play/Stop commands into player process launches and kills while
//! keeping at most one player alive.
//!
//! Every command takes the state mutex for its whole check-act-update cycle,
//! so two concurrent plays are serialized: the second one observes the
//! session started by the first and preempts it. Finished players are reaped
//! lazily at the start of each command and on status queries; there is no
//! background reaper.

mod process;
mod session;

pub use process::{PlayerCommand, ProcessHandle, Termination, DEFAULT_STOP_ARG};
pub use session::PlaybackSession;

use crate::activity_log::{ActivityAction, ActivityLog, ActivityRecord};
use crate::config::{DispatchTiming, DispatcherConfig};
use crate::error::{DispatchError, Error, Result};
use aa_common::api::{SessionState, StatusResponse, TriggerResponse};
use aa_common::events::{DispatchEvent, EventBus};
use aa_common::{
    ConfigDocument, ConfigStore, DuckLevelResolver, DuckPercent, PathValidator, ValidationError,
    BUTTON_COUNT,
};
use chrono::Utc;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Mutable dispatcher state, only touched under the dispatcher mutex
#[derive(Debug, Default)]
struct DispatcherState {
    session: Option<PlaybackSession>,
}

/// Validated play request, ready to launch
struct PlayRequest {
    slot: Option<usize>,
    label: String,
    file: PathBuf,
    duck: DuckPercent,
}

/// Result of a successful Play
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    pub session_id: Uuid,
    pub slot: Option<usize>,
    pub label: String,
    pub file: PathBuf,
    pub duck: DuckPercent,
    pub process_id: u32,
    /// Pid of the session this play preempted
    pub preempted: Option<u32>,
    /// Player already exited successfully during the startup probe
    pub finished: bool,
}

impl PlayOutcome {
    pub fn to_response(&self) -> TriggerResponse {
        let mut response = TriggerResponse::ok(format!("Triggered: {}", self.label))
            .with_label(self.label.clone())
            .with_file(self.file.display().to_string())
            .with_duck(self.duck)
            .with_process_id(self.process_id);
        if let Some(slot) = self.slot {
            response = response.with_slot(slot);
        }
        response
    }
}

/// Result of a successful Stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was playing
    Idle,
    /// The active session was ended
    Stopped {
        session_id: Uuid,
        slot: Option<usize>,
        label: String,
        process_id: u32,
        termination: Termination,
    },
}

impl StopOutcome {
    pub fn to_response(&self) -> TriggerResponse {
        match self {
            StopOutcome::Idle => TriggerResponse::ok("Nothing playing"),
            StopOutcome::Stopped {
                slot,
                label,
                process_id,
                ..
            } => {
                let mut response = TriggerResponse::ok(format!("Stopped: {}", label))
                    .with_label(label.clone())
                    .with_process_id(*process_id);
                if let Some(slot) = slot {
                    response = response.with_slot(*slot);
                }
                response
            }
        }
    }
}

/// Single-session playback state machine
pub struct PlaybackDispatcher {
    store: ConfigStore,
    validator: PathValidator,
    player: PlayerCommand,
    timing: DispatchTiming,
    log: ActivityLog,
    events: EventBus,
    state: Mutex<DispatcherState>,
    /// Published phase, readable without waiting for an in-flight command
    phase: RwLock<SessionState>,
}

impl PlaybackDispatcher {
    pub fn new(config: DispatcherConfig, events: EventBus) -> Self {
        let log = match config.activity_log {
            Some(path) => ActivityLog::new(path),
            None => ActivityLog::disabled(),
        };

        info!(
            media_root = %config.media_root.display(),
            config_file = %config.config_file.display(),
            player = %config.player.program().display(),
            "Creating playback dispatcher"
        );

        Self {
            store: ConfigStore::new(config.config_file),
            validator: PathValidator::new(config.media_root),
            player: config.player,
            timing: config.timing,
            log,
            events,
            state: Mutex::new(DispatcherState::default()),
            phase: RwLock::new(SessionState::Idle),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Play the clip bound to button `slot`, preempting any active session
    pub async fn play(&self, slot: i64) -> Result<PlayOutcome> {
        let mut state = self.state.lock().await;
        self.reap(&mut state).await;

        let request = match self
            .run_blocking(move |store, validator| slot_request(store, validator, slot))
            .await
            .and_then(|r| r.map_err(Error::from))
        {
            Ok(request) => request,
            Err(e) => {
                let slot = usize::try_from(slot).ok().filter(|s| *s < BUTTON_COUNT);
                return Err(self.fail(slot, e));
            }
        };

        let slot = request.slot;
        self.launch(&mut state, request)
            .await
            .map_err(|e| self.fail(slot, e.into()))
    }

    /// Play an arbitrary clip from the media root, preempting any active session
    ///
    /// The duck level falls back to the document default when `duck` is `None`.
    pub async fn play_file(&self, file_ref: &str, duck: Option<i64>) -> Result<PlayOutcome> {
        let mut state = self.state.lock().await;
        self.reap(&mut state).await;

        let file_ref = file_ref.trim().to_string();
        let request = match self
            .run_blocking(move |store, validator| -> std::result::Result<_, ValidationError> {
                let file = validator.resolve(&file_ref)?;
                let doc = store.load();
                Ok(PlayRequest {
                    slot: None,
                    label: file_ref,
                    file,
                    duck: DuckLevelResolver::resolve(duck, i64::from(doc.default_duck)),
                })
            })
            .await
            .and_then(|r| r.map_err(Error::from))
        {
            Ok(request) => request,
            Err(e) => return Err(self.fail(None, e)),
        };

        self.launch(&mut state, request)
            .await
            .map_err(|e| self.fail(None, e.into()))
    }

    /// Stop the active session; a no-op when nothing is playing
    pub async fn stop(&self) -> Result<StopOutcome> {
        let mut state = self.state.lock().await;
        self.reap(&mut state).await;

        let Some(session) = state.session.take() else {
            debug!("Stop requested while idle");
            return Ok(StopOutcome::Idle);
        };

        let session_id = session.id;
        let slot = session.slot;
        let label = session.label.clone();
        let process_id = session.pid();

        self.set_phase(SessionState::Stopping).await;
        let result = self.end_session(session, ActivityAction::Stop).await;
        self.set_phase(SessionState::Idle).await;

        match result {
            Ok(termination) => Ok(StopOutcome::Stopped {
                session_id,
                slot,
                label,
                process_id,
                termination,
            }),
            Err(e) => Err(self.fail(slot, e.into())),
        }
    }

    /// Current status, reaping a player that finished on its own
    pub async fn status(&self) -> StatusResponse {
        let mut state = self.state.lock().await;
        self.reap(&mut state).await;
        match &state.session {
            Some(session) => session.status(SessionState::Playing),
            None => StatusResponse::idle(),
        }
    }

    /// Published phase without waiting for an in-flight command
    ///
    /// May report `Playing` for a player that has already finished.
    pub async fn current_state(&self) -> SessionState {
        *self.phase.read().await
    }

    /// Current announcement document (defaults when missing or corrupt)
    pub async fn load_config(&self) -> Result<ConfigDocument> {
        self.run_blocking(|store, _| store.load()).await
    }

    /// Normalize and persist an announcement document
    pub async fn save_config(&self, doc: ConfigDocument) -> Result<ConfigDocument> {
        self.run_blocking(move |store, _| store.save(&doc))
            .await?
            .map_err(Error::from)
    }

    /// Stop any active session before the process exits
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        self.reap(&mut state).await;

        if let Some(session) = state.session.take() {
            info!("Stopping active announcement (pid {}) for shutdown", session.pid());
            self.set_phase(SessionState::Stopping).await;
            if let Err(e) = self.end_session(session, ActivityAction::Stop).await {
                warn!("Shutdown stop reported an error: {}", e);
            }
            self.set_phase(SessionState::Idle).await;
        }
    }

    /// Run config and media-root I/O on the blocking pool
    async fn run_blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&ConfigStore, &PathValidator) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        let validator = self.validator.clone();
        tokio::task::spawn_blocking(move || work(&store, &validator))
            .await
            .map_err(|e| Error::Task(e.to_string()))
    }

    async fn launch(
        &self,
        state: &mut DispatcherState,
        request: PlayRequest,
    ) -> std::result::Result<PlayOutcome, DispatchError> {
        let mut preempted = None;
        if let Some(previous) = state.session.take() {
            let pid = previous.pid();
            info!("Preempting announcement (pid {}) for a newer trigger", pid);
            self.set_phase(SessionState::Stopping).await;
            if let Err(e) = self.end_session(previous, ActivityAction::Preempt).await {
                // Dropping the handle still kills the process
                warn!("Preemption of pid {} reported an error: {}", pid, e);
            }
            preempted = Some(pid);
        }

        self.set_phase(SessionState::Starting).await;

        let mark = self.log.mark();
        let (stdout, stderr) = self.log.child_stdio();
        let mut command = self.player.play_command(&request.file, request.duck);
        command.stdout(stdout).stderr(stderr);

        let mut handle = match ProcessHandle::spawn(command) {
            Ok(handle) => handle,
            Err(source) => {
                self.set_phase(SessionState::Idle).await;
                return Err(DispatchError::Spawn {
                    program: self.player.program().to_path_buf(),
                    source,
                });
            }
        };

        let pid = handle.pid();
        let probe = handle.wait_for_exit(self.timing.startup_probe).await;
        let session = PlaybackSession::new(
            request.slot,
            request.label,
            request.file,
            request.duck,
            handle,
        );
        let outcome = PlayOutcome {
            session_id: session.id,
            slot: session.slot,
            label: session.label.clone(),
            file: session.file.clone(),
            duck: session.duck,
            process_id: pid,
            preempted,
            finished: false,
        };

        match probe {
            Ok(Some(status)) if !status.success() => {
                self.set_phase(SessionState::Idle).await;
                return Err(DispatchError::PlayerExited {
                    code: status.code(),
                    output: self.log.tail_since(mark),
                });
            }
            Ok(Some(status)) => {
                debug!("Player (pid {}) finished within the startup probe", pid);
                self.record_started(&session);
                self.record_finished(&session, status);
                self.set_phase(SessionState::Idle).await;
                return Ok(PlayOutcome {
                    finished: true,
                    ..outcome
                });
            }
            Ok(None) => {}
            Err(e) => warn!("Could not probe player (pid {}): {}", pid, e),
        }

        self.record_started(&session);
        state.session = Some(session);
        self.set_phase(SessionState::Playing).await;
        Ok(outcome)
    }

    /// Drop the session if its player has exited on its own
    async fn reap(&self, state: &mut DispatcherState) {
        let exit = match state.session.as_mut() {
            None => return,
            Some(session) => match session.handle.try_exit() {
                Ok(exit) => exit,
                Err(e) => {
                    warn!("Could not poll player (pid {}): {}", session.pid(), e);
                    None
                }
            },
        };

        if let Some(status) = exit {
            if let Some(session) = state.session.take() {
                self.record_finished(&session, status);
            }
            self.set_phase(SessionState::Idle).await;
        }
    }

    /// Ask the player to stop, then make sure the process is gone
    ///
    /// The process is always terminated, even when the stop invocation fails;
    /// the stop failure is still reported.
    async fn end_session(
        &self,
        mut session: PlaybackSession,
        action: ActivityAction,
    ) -> std::result::Result<Termination, DispatchError> {
        let pid = session.pid();
        let stop_result = self.run_stop_command().await;
        if let Err(e) = &stop_result {
            warn!("Stop command for pid {} failed: {}", pid, e);
        }

        let termination = session
            .handle
            .terminate(self.timing.stop_grace)
            .await
            .map_err(|source| DispatchError::Terminate { pid, source });

        let exit_code = match &termination {
            Ok(Termination::Exited(status)) => status.code(),
            _ => None,
        };
        let mut record = ActivityRecord::new(action)
            .slot(session.slot)
            .file(&session.file)
            .duck(session.duck)
            .process_id(pid)
            .exit_code(exit_code);
        if matches!(termination, Ok(Termination::Killed)) {
            record = record.message("killed after grace period");
        }
        self.log.record(&record);

        let timestamp = Utc::now();
        self.events.emit_lossy(match action {
            ActivityAction::Preempt => DispatchEvent::AnnouncementPreempted {
                session_id: session.id,
                slot: session.slot,
                process_id: pid,
                timestamp,
            },
            _ => DispatchEvent::AnnouncementStopped {
                session_id: session.id,
                slot: session.slot,
                process_id: pid,
                timestamp,
            },
        });

        let termination = termination?;
        stop_result?;
        Ok(termination)
    }

    /// Run `player <stop_arg>`, bounded by the stop timeout
    async fn run_stop_command(&self) -> std::result::Result<(), DispatchError> {
        let mut command = self.player.stop_command();
        command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(DispatchError::StopSpawn)?;
        let output =
            match tokio::time::timeout(self.timing.stop_timeout, child.wait_with_output()).await {
                Ok(output) => output.map_err(DispatchError::StopSpawn)?,
                Err(_) => return Err(DispatchError::StopTimedOut(self.timing.stop_timeout)),
            };

        self.log.append_output(&output.stdout);
        self.log.append_output(&output.stderr);

        if output.status.success() {
            return Ok(());
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(DispatchError::StopFailed {
            code: output.status.code(),
            output: text.trim().to_string(),
        })
    }

    fn record_started(&self, session: &PlaybackSession) {
        self.log.record(
            &ActivityRecord::new(ActivityAction::Play)
                .slot(session.slot)
                .file(&session.file)
                .duck(session.duck)
                .process_id(session.pid()),
        );
        self.events.emit_lossy(DispatchEvent::AnnouncementStarted {
            session_id: session.id,
            slot: session.slot,
            label: session.label.clone(),
            file: session.file.display().to_string(),
            duck: session.duck,
            process_id: session.pid(),
            timestamp: Utc::now(),
        });
    }

    fn record_finished(&self, session: &PlaybackSession, status: ExitStatus) {
        self.log.record(
            &ActivityRecord::new(ActivityAction::Finished)
                .slot(session.slot)
                .file(&session.file)
                .process_id(session.pid())
                .exit_code(status.code()),
        );
        self.events.emit_lossy(DispatchEvent::AnnouncementFinished {
            session_id: session.id,
            slot: session.slot,
            process_id: session.pid(),
            exit_code: status.code(),
            timestamp: Utc::now(),
        });
    }

    /// Log and publish a failed command, handing the error back
    fn fail(&self, slot: Option<usize>, error: Error) -> Error {
        let message = error.to_string();
        self.log.record(
            &ActivityRecord::new(ActivityAction::Failed)
                .slot(slot)
                .error(error.code(), message.clone()),
        );
        self.events.emit_lossy(DispatchEvent::AnnouncementFailed {
            slot,
            error: error.code().to_string(),
            message,
            timestamp: Utc::now(),
        });
        error
    }

    async fn set_phase(&self, phase: SessionState) {
        *self.phase.write().await = phase;
    }
}

fn slot_request(
    store: &ConfigStore,
    validator: &PathValidator,
    slot: i64,
) -> std::result::Result<PlayRequest, ValidationError> {
    let index = usize::try_from(slot)
        .ok()
        .filter(|s| *s < BUTTON_COUNT)
        .ok_or(ValidationError::InvalidSlot(slot))?;

    let doc = store.load();
    let button = doc
        .button(index)
        .ok_or(ValidationError::InvalidSlot(slot))?;
    let file = validator.resolve(&button.file_ref)?;

    Ok(PlayRequest {
        slot: Some(index),
        label: button.label.clone(),
        file,
        duck: doc.effective_duck(index),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dispatcher(dir: &TempDir) -> PlaybackDispatcher {
        let media_root = dir.path().join("media");
        std::fs::create_dir_all(&media_root).unwrap();
        PlaybackDispatcher::new(
            DispatcherConfig {
                media_root,
                config_file: dir.path().join("aa.json"),
                activity_log: Some(dir.path().join("aa.log")),
                player: PlayerCommand::new("/nonexistent/aa_play.sh"),
                timing: DispatchTiming::default(),
            },
            EventBus::new(16),
        )
    }

    #[test]
    fn test_play_outcome_response() {
        let outcome = PlayOutcome {
            session_id: Uuid::new_v4(),
            slot: Some(2),
            label: "Lost child".to_string(),
            file: PathBuf::from("/media/music/siren.wav"),
            duck: 10,
            process_id: 4242,
            preempted: None,
            finished: false,
        };
        let response = outcome.to_response();
        assert!(response.ok);
        assert_eq!(response.message, "Triggered: Lost child");
        assert_eq!(response.slot, Some(2));
        assert_eq!(response.duck, Some(10));
        assert_eq!(response.process_id, Some(4242));
    }

    #[test]
    fn test_idle_stop_response() {
        let response = StopOutcome::Idle.to_response();
        assert!(response.ok);
        assert!(response.error.is_none());
        assert!(response.process_id.is_none());
    }

    #[tokio::test]
    async fn test_out_of_range_slots_rejected() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&dir);
        for slot in [-1, 6, i64::MAX] {
            let err = dispatcher.play(slot).await.unwrap_err();
            assert!(matches!(err, Error::Validation(ValidationError::InvalidSlot(s)) if s == slot));
        }
        assert_eq!(dispatcher.current_state().await, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_failures_are_published() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&dir);
        let mut rx = dispatcher.events().subscribe();

        dispatcher.play(0).await.unwrap_err();

        match rx.recv().await.unwrap() {
            DispatchEvent::AnnouncementFailed { slot, error, .. } => {
                assert_eq!(slot, Some(0));
                assert_eq!(error, "NoFileAssigned");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
