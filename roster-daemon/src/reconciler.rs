//! Target registry reconciler.
//!
//! One loop owns two independent timers: the refresh timer re-reads every
//! peer record from the store and keeps the healthy ones, the registration
//! timer re-publishes this node's own record. Each timer is rearmed for a
//! full interval after its handler returns, whether the handler failed or not.
//!
//! All shared state (`peers`, `registered`) sits behind one `RwLock`. Store
//! calls run with the write lock held, so readers see either the old or the
//! new peer list and registration never interleaves with a refresh.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::time::Instant;

use roster_core::{
    health, CommitMessage, Config, NodeName, PeerRecord, RegistrationFile, RegistryStore,
};

use crate::error::ReconcileError;

/// Identity and schedule for one reconciler. No field has a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// DNS name used for self-registration.
    pub name: NodeName,
    /// How often the peer list is re-read from the store.
    pub refresh_interval: Duration,
    /// How long a record may go without an update before it is dropped.
    pub unhealthy_threshold: Duration,
    /// How often this node re-publishes its own record.
    pub registration_interval: Duration,
}

impl From<&Config> for ReconcilerConfig {
    fn from(config: &Config) -> Self {
        Self {
            name: config.name.clone(),
            refresh_interval: config.refresh_interval,
            unhealthy_threshold: config.unhealthy_threshold,
            registration_interval: config.registration_interval,
        }
    }
}

/// Read side exposed to consumers of the peer list.
#[async_trait]
pub trait TargetManager: Send + Sync {
    /// Drive the reconcile loop until cancelled or shut down.
    async fn reconcile(&self, cancel: broadcast::Receiver<()>) -> Result<(), ReconcileError>;
    /// Current healthy peer snapshot.
    async fn get_targets(&self) -> Vec<PeerRecord>;
    async fn is_registered(&self) -> bool;
    /// Request loop termination.
    async fn shutdown(&self) -> Result<(), ReconcileError>;
}

#[derive(Debug, Default)]
struct ReconcilerState {
    peers: Vec<PeerRecord>,
    registered: bool,
    // Set by `shutdown`; no store call is made afterwards.
    stopped: bool,
}

pub struct Reconciler {
    store: Arc<dyn RegistryStore>,
    config: ReconcilerConfig,
    state: RwLock<ReconcilerState>,
    done_tx: mpsc::Sender<()>,
    // Taken by the first `run`; `None` afterwards.
    done_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RegistryStore>, config: ReconcilerConfig) -> Self {
        let (done_tx, done_rx) = mpsc::channel(1);
        Self {
            store,
            config,
            state: RwLock::new(ReconcilerState::default()),
            done_tx,
            done_rx: Mutex::new(Some(done_rx)),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run the reconcile loop until `cancel` fires or [`shutdown`](Self::shutdown)
    /// is called.
    ///
    /// A message on `cancel`, or all of its senders being dropped, triggers a
    /// best-effort shutdown before returning. The loop runs at most once per
    /// instance; later calls return [`ReconcileError::AlreadyStarted`].
    pub async fn run(&self, mut cancel: broadcast::Receiver<()>) -> Result<(), ReconcileError> {
        let mut done_rx = self
            .done_rx
            .lock()
            .await
            .take()
            .ok_or(ReconcileError::AlreadyStarted)?;

        tracing::debug!(name = %self.config.name, "starting target reconciler");

        let refresh = tokio::time::sleep(self.config.refresh_interval);
        let registration = tokio::time::sleep(self.config.registration_interval);
        tokio::pin!(refresh);
        tokio::pin!(registration);

        loop {
            tokio::select! {
                biased;
                _ = cancel.recv() => {
                    tracing::warn!(name = %self.config.name, "reconciler cancelled, shutting down");
                    if let Err(err) = self.shutdown().await {
                        tracing::error!(error = %err, "failed to shut down gracefully");
                    }
                    break;
                }
                _ = done_rx.recv() => {
                    tracing::info!(name = %self.config.name, "ending reconcile loop");
                    break;
                }
                _ = &mut refresh => {
                    if let Err(err) = self.refresh_targets(Utc::now()).await {
                        tracing::error!(error = %err, "failed to refresh global targets");
                    }
                    refresh.as_mut().reset(Instant::now() + self.config.refresh_interval);
                }
                _ = &mut registration => {
                    if let Err(err) = self.update_registration(Utc::now()).await {
                        tracing::error!(error = %err, "failed to update registration");
                    }
                    registration
                        .as_mut()
                        .reset(Instant::now() + self.config.registration_interval);
                }
            }
        }

        Ok(())
    }

    /// Publish this node's record stamped with `now`.
    ///
    /// The first success is a create; every later call is an update. A failed
    /// create leaves the node unregistered so the next attempt creates again.
    /// After [`shutdown`](Self::shutdown) this returns without calling the store.
    pub async fn update_registration(&self, now: DateTime<Utc>) -> Result<(), ReconcileError> {
        let mut state = self.state.write().await;
        if state.stopped {
            tracing::debug!(name = %self.config.name, "skipping registration after shutdown");
            return Ok(());
        }

        if state.registered {
            let file = RegistrationFile::for_node(
                &self.config.name,
                CommitMessage::UpdatedRegistration,
                now,
            );
            self.store.update_file(&file).await?;
            tracing::debug!(name = %self.config.name, "updated registration");
            return Ok(());
        }

        let file =
            RegistrationFile::for_node(&self.config.name, CommitMessage::InitialRegistration, now);
        self.store.create_file(&file).await?;
        state.registered = true;
        tracing::info!(name = %self.config.name, "registered as global target");
        Ok(())
    }

    /// Replace the peer list with the store's records that are healthy at `now`.
    ///
    /// On any store failure the previous list is kept untouched. After
    /// [`shutdown`](Self::shutdown) this returns without calling the store.
    pub async fn refresh_targets(&self, now: DateTime<Utc>) -> Result<(), ReconcileError> {
        let mut state = self.state.write().await;
        if state.stopped {
            tracing::debug!("skipping target refresh after shutdown");
            return Ok(());
        }
        let records = self.store.fetch_files().await?;
        let fetched = records.len();
        state.peers = health::filter_healthy(records, now, self.config.unhealthy_threshold);
        tracing::debug!(
            fetched,
            healthy = state.peers.len(),
            "updated global targets"
        );
        Ok(())
    }

    pub async fn get_targets(&self) -> Vec<PeerRecord> {
        self.state.read().await.peers.clone()
    }

    pub async fn is_registered(&self) -> bool {
        self.state.read().await.registered
    }

    /// Mark this node unregistered and stop the loop.
    ///
    /// Registration and refresh calls still queued on the state lock become
    /// no-ops. The store record is left in place and ages out on its own. Calling
    /// this more than once, or after the loop has exited, is a no-op.
    pub async fn shutdown(&self) -> Result<(), ReconcileError> {
        tracing::debug!(name = %self.config.name, "shutting down target reconciler");
        let mut state = self.state.write().await;
        state.registered = false;
        state.stopped = true;
        match self.done_tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Closed(())) => {
                tracing::debug!("reconcile loop already stopped");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TargetManager for Reconciler {
    async fn reconcile(&self, cancel: broadcast::Receiver<()>) -> Result<(), ReconcileError> {
        self.run(cancel).await
    }

    async fn get_targets(&self) -> Vec<PeerRecord> {
        Reconciler::get_targets(self).await
    }

    async fn is_registered(&self) -> bool {
        Reconciler::is_registered(self).await
    }

    async fn shutdown(&self) -> Result<(), ReconcileError> {
        Reconciler::shutdown(self).await
    }
}
