//! Single-writer actor: the only task that touches the DAO.
//!
//! Any number of [`DaoHandle`] clones submit entries over a bounded channel;
//! the actor applies them one at a time in arrival order and answers each on
//! its own oneshot. Dropping every handle stops the actor, which hands the
//! node back through its join handle.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use trustdao_types::Clock;

use crate::command::LogEntry;
use crate::node::{DaoNode, Reply};
use crate::NodeError;

struct Request {
    entry: LogEntry,
    reply: oneshot::Sender<Reply>,
}

#[derive(Clone)]
pub struct DaoHandle {
    tx: mpsc::Sender<Request>,
}

impl DaoHandle {
    /// Queue an entry and wait for its reply.
    pub async fn submit(&self, entry: LogEntry) -> Result<Reply, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request { entry, reply })
            .await
            .map_err(|_| NodeError::ActorStopped)?;
        rx.await.map_err(|_| NodeError::ActorStopped)
    }
}

/// Spawn the actor on the current runtime.
pub fn spawn_actor<K>(node: DaoNode<K>, queue_depth: usize) -> (DaoHandle, JoinHandle<DaoNode<K>>)
where
    K: Clock + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Request>(queue_depth.max(1));
    let task = tokio::spawn(async move {
        let mut node = node;
        while let Some(Request { entry, reply }) = rx.recv().await {
            let result = node.apply(entry);
            if reply.send(result).is_err() {
                tracing::debug!("submitter went away before the reply");
            }
        }
        tracing::info!(applied = node.applied(), rejected = node.rejected(), "DAO actor stopped");
        node
    });
    (DaoHandle { tx }, task)
}
