use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::RwLock;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::info;

use crate::{
    error::{Conflict, SimError, SimResult},
    models::ChannelId,
};

use super::Bomb;

/// A live bomb. Commands lock it for their whole duration.
pub type SharedBomb = Arc<Mutex<Bomb>>;

/// Lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Started(ChannelId),
    Ended(ChannelId),
    DrainStarted,
    Drained,
}

/// Every live bomb, keyed by channel, plus shutdown (drain) state.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    sessions: RwLock<HashMap<ChannelId, SharedBomb>>,
    /// Registered sessions plus ended ones whose [`Retirement`] is still alive.
    tracked: AtomicUsize,
    draining: AtomicBool,
    drained_fired: AtomicBool,
    drained: watch::Sender<bool>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Inner {
    fn emit(&self, event: RegistryEvent) {
        // nobody listening is fine
        let _ = self.events.send(event);
    }

    fn check_drained(&self) {
        if !self.draining.load(Ordering::SeqCst) || self.tracked.load(Ordering::SeqCst) != 0 {
            return;
        }
        if self.drained_fired.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("All bombs finished, registry drained");
        self.drained.send_replace(true);
        self.emit(RegistryEvent::Drained);
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Empty registry, not draining.
    pub fn new() -> Self {
        let (drained, _) = watch::channel(false);
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                sessions: RwLock::new(HashMap::new()),
                tracked: AtomicUsize::new(0),
                draining: AtomicBool::new(false),
                drained_fired: AtomicBool::new(false),
                drained,
                events,
            }),
        }
    }

    /// Register `bomb` for its channel. Exactly one of several racing starts wins.
    pub fn start(&self, bomb: Bomb) -> SimResult<SharedBomb> {
        let channel = bomb.channel().clone();
        let shared = {
            let mut sessions = self.inner.sessions.write();
            if sessions.contains_key(&channel) {
                return Err(Conflict::AlreadyRunning.into());
            }
            if self.inner.draining.load(Ordering::SeqCst) {
                return Err(SimError::DrainRejected);
            }
            let shared = Arc::new(Mutex::new(bomb));
            sessions.insert(channel.clone(), shared.clone());
            self.inner.tracked.fetch_add(1, Ordering::SeqCst);
            shared
        };
        info!(channel = %channel, "Bomb registered");
        self.inner.emit(RegistryEvent::Started(channel));
        Ok(shared)
    }

    /// Early rejection before any modules are generated; [`Self::start`] re-checks.
    pub fn ensure_can_start(&self, channel: &ChannelId) -> SimResult<()> {
        if self.inner.sessions.read().contains_key(channel) {
            return Err(Conflict::AlreadyRunning.into());
        }
        if self.is_draining() {
            return Err(SimError::DrainRejected);
        }
        Ok(())
    }

    /// The live bomb of `channel`, if any.
    pub fn lookup(&self, channel: &ChannelId) -> Option<SharedBomb> {
        self.inner.sessions.read().get(channel).cloned()
    }

    /// Deregister the bomb of `channel`. It stays tracked for drain purposes until the
    /// returned guard is dropped.
    pub fn end(&self, channel: &ChannelId) -> Option<Retirement> {
        let removed = self.inner.sessions.write().remove(channel);
        removed.map(|_| {
            info!(channel = %channel, "Bomb deregistered");
            self.inner.emit(RegistryEvent::Ended(channel.clone()));
            Retirement {
                inner: self.inner.clone(),
                channel: channel.clone(),
            }
        })
    }

    /// Refuse new bombs from now on. Returns the channels that still have one.
    pub fn enter_drain_mode(&self) -> Vec<ChannelId> {
        let (channels, first) = {
            let sessions = self.inner.sessions.write();
            let first = !self.inner.draining.swap(true, Ordering::SeqCst);
            let mut channels: Vec<ChannelId> = sessions.keys().cloned().collect();
            channels.sort();
            (channels, first)
        };
        if first {
            info!(remaining = channels.len(), "Entering shutdown mode");
            self.inner.emit(RegistryEvent::DrainStarted);
        }
        self.inner.check_drained();
        channels
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    pub fn is_drained(&self) -> bool {
        *self.inner.drained.borrow()
    }

    /// Resolves once draining has started and the last bomb is gone.
    pub async fn wait_drained(&self) {
        let mut rx = self.inner.drained.subscribe();
        // the sender lives as long as `self`, so this can't fail
        let _ = rx.wait_for(|drained| *drained).await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.events.subscribe()
    }

    /// Number of registered bombs.
    pub fn len(&self) -> usize {
        self.inner.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered bombs, ordered by channel.
    pub fn sessions(&self) -> Vec<(ChannelId, SharedBomb)> {
        let mut sessions: Vec<_> = self
            .inner
            .sessions
            .read()
            .iter()
            .map(|(channel, bomb)| (channel.clone(), bomb.clone()))
            .collect();
        sessions.sort_by(|a, b| a.0.cmp(&b.0));
        sessions
    }
}

/// Keeps an ended bomb counted until its log has been exported.
#[must_use = "dropping the guard immediately retires the bomb"]
pub struct Retirement {
    inner: Arc<Inner>,
    channel: ChannelId,
}

impl Retirement {
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }
}

impl Drop for Retirement {
    fn drop(&mut self) {
        self.inner.tracked.fetch_sub(1, Ordering::SeqCst);
        self.inner.check_drained();
    }
}
