//! Scripted chat SDK double.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use confab_session::{
    ChatClient, ClientError, Credentials, RecoveryKey, RoomId, RoomSummary, SessionInfo,
};
use tokio::sync::{Semaphore, watch};

/// A [`ChatClient`] whose every result is scripted.
///
/// Results are consumed queue-first; an empty queue yields a sensible
/// success. `pause` makes subsequent operations block until `resolve` grants
/// them a permit, which is how tests arrange for a completion to arrive
/// after a coordinator was stopped.
pub struct ScriptedClient {
    has_session: AtomicBool,
    login_results: Mutex<VecDeque<Result<SessionInfo, ClientError>>>,
    restore_results: Mutex<VecDeque<Result<SessionInfo, ClientError>>>,
    backup_results: Mutex<VecDeque<Result<RecoveryKey, ClientError>>>,
    sign_out_results: Mutex<VecDeque<Result<(), ClientError>>>,
    login_calls: AtomicUsize,
    backup_calls: AtomicUsize,
    rooms: watch::Sender<Vec<RoomSummary>>,
    paused: AtomicBool,
    gate: Semaphore,
}

impl ScriptedClient {
    /// A client with no persisted session and all-success defaults.
    pub fn new() -> Self {
        Self {
            has_session: AtomicBool::new(false),
            login_results: Mutex::new(VecDeque::new()),
            restore_results: Mutex::new(VecDeque::new()),
            backup_results: Mutex::new(VecDeque::new()),
            sign_out_results: Mutex::new(VecDeque::new()),
            login_calls: AtomicUsize::new(0),
            backup_calls: AtomicUsize::new(0),
            rooms: watch::Sender::new(Vec::new()),
            paused: AtomicBool::new(false),
            gate: Semaphore::new(0),
        }
    }

    /// The session every unscripted login/restore returns.
    pub fn default_session() -> SessionInfo {
        SessionInfo { user_id: "@alice:example.org".into(), device_id: "HARNESS".into() }
    }

    /// Pretend a session is (or is not) persisted on the device.
    pub fn set_has_session(&self, value: bool) {
        self.has_session.store(value, Ordering::SeqCst);
    }

    /// Queue the next login result.
    pub fn queue_login(&self, result: Result<SessionInfo, ClientError>) {
        lock(&self.login_results).push_back(result);
    }

    /// Queue the next restore result.
    pub fn queue_restore(&self, result: Result<SessionInfo, ClientError>) {
        lock(&self.restore_results).push_back(result);
    }

    /// Queue the next backup-creation result.
    pub fn queue_backup(&self, result: Result<RecoveryKey, ClientError>) {
        lock(&self.backup_results).push_back(result);
    }

    /// Queue the next sign-out result.
    pub fn queue_sign_out(&self, result: Result<(), ClientError>) {
        lock(&self.sign_out_results).push_back(result);
    }

    /// Make subsequent operations block until [`resolve`](Self::resolve).
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Let `count` paused operations proceed.
    pub fn resolve(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// Number of login calls made so far.
    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    /// Number of backup-creation calls made so far.
    pub fn backup_calls(&self) -> usize {
        self.backup_calls.load(Ordering::SeqCst)
    }

    /// Publish a new room list to every subscriber.
    pub fn push_rooms(&self, rooms: Vec<RoomSummary>) {
        self.rooms.send_replace(rooms);
    }

    /// A room summary with the given id and name.
    pub fn summary(id: &str, name: &str) -> RoomSummary {
        RoomSummary { id: RoomId::from(id), name: name.to_owned(), has_unread: false }
    }

    async fn checkpoint(&self) {
        if self.paused.load(Ordering::SeqCst) {
            // Consume one permit per paused operation.
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl ChatClient for ScriptedClient {
    fn has_session(&self) -> bool {
        self.has_session.load(Ordering::SeqCst)
    }

    async fn login(&self, _credentials: Credentials) -> Result<SessionInfo, ClientError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.checkpoint().await;
        lock(&self.login_results).pop_front().unwrap_or_else(|| Ok(Self::default_session()))
    }

    async fn restore_session(&self) -> Result<SessionInfo, ClientError> {
        self.checkpoint().await;
        lock(&self.restore_results).pop_front().unwrap_or_else(|| {
            if self.has_session() {
                Ok(Self::default_session())
            } else {
                Err(ClientError::NoSessionToRestore)
            }
        })
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        self.checkpoint().await;
        lock(&self.sign_out_results).pop_front().unwrap_or_else(|| Ok(()))
    }

    async fn enable_backup(&self) -> Result<RecoveryKey, ClientError> {
        self.backup_calls.fetch_add(1, Ordering::SeqCst);
        self.checkpoint().await;
        lock(&self.backup_results)
            .pop_front()
            .unwrap_or_else(|| Ok(RecoveryKey::new("EsTk 1234 5678 9abc")))
    }

    fn room_summaries(&self) -> Vec<RoomSummary> {
        self.rooms.borrow().clone()
    }

    fn subscribe_rooms(&self) -> watch::Receiver<Vec<RoomSummary>> {
        self.rooms.subscribe()
    }
}
