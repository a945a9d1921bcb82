//! `SessionActor`: owner of the update session state machine

use std::sync::Arc;

use chrono::Utc;
use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::ActorStopReason;
use kameo::message::{Context, Message};
use kameo::prelude::*;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use skyup_api::SessionEvent;
use skyup_backend::DeviceBackend;

use crate::actor::attempt::Attempt;
use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::gate::BandwidthGate;
use crate::lang::{Language, Texts};
use crate::message::{
    AttemptStatus, CompleteAttempt, DeviceAccepted, GetSession, ReportProgress, SessionSnapshot,
    SetInstallerUpdate, StartAttempt,
};
use crate::resource::ResourceTable;
use crate::session::{SessionFailure, UpdateSession};
use crate::state::SessionState;

/// Arguments for spawning a `SessionActor`
pub struct SessionActorArgs {
    pub config: SessionConfig,
    /// Validated bundle URL table
    pub table: Arc<ResourceTable>,
    pub gate: BandwidthGate,
    pub backend: Arc<dyn DeviceBackend>,
    pub language: Language,
    /// Render event sender
    pub event_tx: broadcast::Sender<SessionEvent>,
}

/// Single-session update orchestrator
///
/// Only one attempt runs at a time. Reports from an attempt are tagged with its
/// number and dropped once a newer attempt has started. A new attempt waits for
/// the transfers of the previous one to settle before it touches the device.
pub struct SessionActor {
    config: SessionConfig,
    table: Arc<ResourceTable>,
    gate: BandwidthGate,
    backend: Arc<dyn DeviceBackend>,
    texts: &'static Texts,
    state: SessionState,
    session: UpdateSession,
    attempt: u64,
    installer_update: bool,
    /// Closes once every task of the latest attempt has ended
    settled: Option<mpsc::Receiver<()>>,
    event_tx: broadcast::Sender<SessionEvent>,
    myself: WeakActorRef<Self>,
}

impl SessionActor {
    fn is_current(&self, attempt: u64) -> bool {
        if attempt == self.attempt {
            return true;
        }
        debug!(attempt, current = self.attempt, "dropping report from stale attempt");
        false
    }

    /// Transition to a new state with validation and event emission
    fn transition_to(&mut self, new_state: SessionState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(new_state) {
            return Err(CoreError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }

        let old_state = self.state;
        self.state = new_state;

        info!(
            attempt = self.attempt,
            from = %old_state,
            to = %new_state,
            "state transition"
        );

        let _ = self.event_tx.send(SessionEvent::StateChanged {
            attempt: self.attempt,
            from: old_state.to_string(),
            to: new_state.to_string(),
        });

        Ok(())
    }

    /// Enter a terminal state; loading is cleared even if the transition is rejected
    fn finish(&mut self, target: SessionState) {
        if let Err(e) = self.transition_to(target) {
            error!(attempt = self.attempt, error = %e, "forcing terminal state");
            self.state = target;
        }
    }

    fn fail_with_error(&mut self, err: &CoreError) {
        let target = if self.state == SessionState::DeviceCheckPending {
            SessionState::DeviceCheckFailed
        } else {
            SessionState::DownloadFailed
        };

        let class = err.class();
        let message = self.texts.error_message(class).to_string();
        self.session.fail(SessionFailure {
            class,
            message: message.clone(),
            cause: err.to_string(),
        });

        error!(
            attempt = self.attempt,
            state = %self.state,
            class = %class,
            error = %err,
            "update attempt failed"
        );

        self.finish(target);
        let _ = self.event_tx.send(SessionEvent::AttemptFailed {
            attempt: self.attempt,
            class: class.to_string(),
            message,
            at: Utc::now(),
        });
    }

    fn succeed(&mut self) {
        self.session.succeed(self.texts.success);
        info!(attempt = self.attempt, "update attempt succeeded");

        self.finish(SessionState::Succeeded);
        let _ = self.event_tx.send(SessionEvent::AttemptSucceeded {
            attempt: self.attempt,
            message: self.texts.success.to_string(),
            at: Utc::now(),
        });
    }
}

impl Actor for SessionActor {
    type Args = SessionActorArgs;
    type Error = CoreError;

    async fn on_start(args: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        info!(id = %actor_ref.id(), language = ?args.language, "SessionActor starting");

        Ok(Self {
            config: args.config,
            table: args.table,
            gate: args.gate,
            backend: args.backend,
            texts: args.language.texts(),
            state: SessionState::Idle,
            session: UpdateSession::default(),
            attempt: 0,
            installer_update: false,
            settled: None,
            event_tx: args.event_tx,
            myself: actor_ref.downgrade(),
        })
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        info!(state = %self.state, reason = ?reason, "SessionActor stopping");
        Ok(())
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<StartAttempt> for SessionActor {
    type Reply = Result<AttemptStatus, CoreError>;

    async fn handle(
        &mut self,
        _msg: StartAttempt,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        if self.session.loading {
            debug!(attempt = self.attempt, "attempt already running, ignoring request");
            return Ok(AttemptStatus::AlreadyRunning);
        }

        let session_ref = self
            .myself
            .upgrade()
            .ok_or_else(|| CoreError::ActorError("session actor is stopping".to_string()))?;

        if self.state.is_terminal() {
            self.transition_to(SessionState::Idle)?;
        }

        self.attempt += 1;
        self.session.begin();
        self.transition_to(SessionState::DeviceCheckPending)?;

        let (settle, settled) = mpsc::channel(1);
        let previous = self.settled.replace(settled);

        let attempt = Attempt {
            id: self.attempt,
            config: self.config.clone(),
            table: Arc::clone(&self.table),
            gate: self.gate,
            backend: Arc::clone(&self.backend),
            fetch_app_installer: self.installer_update,
            session: session_ref,
            previous,
            settle,
        };
        tokio::spawn(attempt.run());

        Ok(AttemptStatus::Started {
            attempt: self.attempt,
        })
    }
}

impl Message<SetInstallerUpdate> for SessionActor {
    type Reply = ();

    async fn handle(
        &mut self,
        msg: SetInstallerUpdate,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        debug!(available = msg.available, "installer update flag set");
        self.installer_update = msg.available;
    }
}

impl Message<GetSession> for SessionActor {
    type Reply = SessionSnapshot;

    async fn handle(
        &mut self,
        _msg: GetSession,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        SessionSnapshot {
            attempt: self.attempt,
            state: self.state,
            session: self.session.clone(),
            installer_update: self.installer_update,
        }
    }
}

impl Message<DeviceAccepted> for SessionActor {
    type Reply = ();

    async fn handle(
        &mut self,
        msg: DeviceAccepted,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        if !self.is_current(msg.attempt) {
            return;
        }

        let _ = self.event_tx.send(SessionEvent::DeviceDetected {
            attempt: msg.attempt,
            device_name: msg.device.device_name.clone(),
            software_version: msg.device.software_version.clone(),
        });
        self.session.device = Some(msg.device);

        if let Err(e) = self.transition_to(SessionState::DownloadPending) {
            warn!(attempt = msg.attempt, error = %e, "device accepted in unexpected state");
        }
    }
}

impl Message<ReportProgress> for SessionActor {
    type Reply = ();

    async fn handle(
        &mut self,
        msg: ReportProgress,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        if !self.is_current(msg.attempt) || !self.session.loading {
            return;
        }

        let _ = self.event_tx.send(SessionEvent::TransferProgress {
            attempt: msg.attempt,
            resource: msg.kind.to_string(),
            download_percent: msg.transfer.download_percent(),
            install_percent: msg.transfer.install_percent(),
            current_file: msg.transfer.current_file.clone(),
        });
        self.session.transfers.set(msg.kind, msg.transfer);
    }
}

impl Message<CompleteAttempt> for SessionActor {
    type Reply = ();

    async fn handle(
        &mut self,
        msg: CompleteAttempt,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        if !self.is_current(msg.attempt) || !self.session.loading {
            return;
        }

        match msg.outcome {
            Ok(()) => self.succeed(),
            Err(e) => self.fail_with_error(&e),
        }
    }
}
