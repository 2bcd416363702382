//! Per-channel FIFO delivery of inbound messages.
//!
//! Each channel gets its own worker task. Commands of one channel run strictly in
//! arrival order; different channels never wait for each other.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::anyhow;
use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error};

use crate::{
    models::{ChannelId, Inbound},
    router::Router,
};

struct Worker {
    id: u64,
    queue: mpsc::UnboundedSender<Inbound>,
    handle: JoinHandle<()>,
}

type Workers = Arc<Mutex<HashMap<ChannelId, Worker>>>;

/// Feeds inbound messages to the [`Router`], one worker per channel.
///
/// A worker only lives while its channel has queued messages, so the map holds at
/// most one entry per busy channel.
pub struct Dispatcher {
    router: Arc<Router>,
    workers: Workers,
    next_id: AtomicU64,
}

impl Dispatcher {
    /// Dispatcher with no channel workers yet.
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            workers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// The router every message ends up in.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Number of channels with a running worker.
    pub fn active_channels(&self) -> usize {
        self.workers.lock().len()
    }

    /// Queue `inbound` behind earlier messages of the same channel.
    pub fn submit(&self, inbound: Inbound) {
        let mut workers = self.workers.lock();
        let inbound = match workers.get(&inbound.channel) {
            Some(worker) => match worker.queue.send(inbound) {
                Ok(()) => return,
                Err(mpsc::error::SendError(inbound)) => inbound,
            },
            None => inbound,
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let channel = inbound.channel.clone();
        let (queue, rx) = mpsc::unbounded_channel();
        // rx is still held here
        let _ = queue.send(inbound);
        let handle = tokio::spawn(run_worker(
            self.router.clone(),
            self.workers.clone(),
            channel.clone(),
            id,
            rx,
        ));
        debug!(channel = %channel, "Channel worker started");
        workers.insert(channel, Worker { id, queue, handle });
    }

    /// Stop accepting messages and wait until everything queued has been handled.
    pub async fn close(&self) {
        let workers: Vec<Worker> = self.workers.lock().drain().map(|(_, w)| w).collect();
        for Worker { queue, handle, .. } in workers {
            drop(queue);
            if let Err(err) = handle.await {
                error!(?err, "Channel worker crashed");
            }
        }
    }
}

/// Handle queued messages until the queue is empty, then deregister.
///
/// The emptiness check and the removal happen under the map lock, the same lock
/// [`Dispatcher::submit`] sends under, so no message is stranded.
async fn run_worker(
    router: Arc<Router>,
    workers: Workers,
    channel: ChannelId,
    id: u64,
    mut rx: mpsc::UnboundedReceiver<Inbound>,
) {
    loop {
        let inbound = match rx.try_recv() {
            Ok(inbound) => inbound,
            Err(_) => {
                let mut workers = workers.lock();
                match rx.try_recv() {
                    Ok(inbound) => inbound,
                    Err(_) => {
                        if workers.get(&channel).map_or(false, |w| w.id == id) {
                            workers.remove(&channel);
                        }
                        break;
                    }
                }
            }
        };

        // a panicking command must not take the channel down with it
        let task = tokio::spawn({
            let router = router.clone();
            let inbound = inbound.clone();
            async move { router.handle(inbound).await }
        });
        if let Err(err) = task.await {
            error!(channel = %channel, text = %inbound.text, ?err, "Command handler crashed");
            router
                .report_fault(&inbound, anyhow!("command handler crashed: {err}"))
                .await;
        }
    }
    debug!(channel = %channel, "Channel worker stopped");
}
