use super::{parse_active_connections, NodeStatus, StatusStore};
use crate::drain::DrainState;
use act_zero::{Actor, ActorResult, Addr, Produces};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Debug, Default)]
struct Record {
    status: Option<DrainState>,
    active_connections: Option<String>,
    history: Vec<DrainState>,
}

/// In-process status store.
///
/// Clones share their records, so a handle kept outside the actor can play the role of the
/// connection tracking agent and observe status writes.
#[derive(Clone, Debug, Default)]
pub struct MemoryStatusStore {
    records: Arc<Mutex<HashMap<String, Record>>>,
}

impl MemoryStatusStore {
    pub fn set_active_connections(&self, node_id: &str, raw: impl Into<String>) {
        self.records()
            .entry(node_id.to_owned())
            .or_default()
            .active_connections = Some(raw.into());
    }

    pub fn status(&self, node_id: &str) -> Option<DrainState> {
        self.records().get(node_id).and_then(|r| r.status)
    }

    /// Every status written for the node, oldest first.
    pub fn status_history(&self, node_id: &str) -> Vec<DrainState> {
        self.records()
            .get(node_id)
            .map(|r| r.history.clone())
            .unwrap_or_default()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, Record>> {
        // a panicking writer can't leave a record half updated
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Actor for MemoryStatusStore {
    async fn started(&mut self, _addr: Addr<Self>) -> ActorResult<()>
    where
        Self: Sized,
    {
        info!("Started MemoryStatusStore");

        Produces::ok(())
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn get_status(&mut self, node_id: String) -> ActorResult<NodeStatus> {
        let status = self
            .records()
            .get(&node_id)
            .map(|r| NodeStatus {
                status: r.status,
                active_connections: r
                    .active_connections
                    .as_deref()
                    .and_then(parse_active_connections),
            })
            .unwrap_or_default();

        Produces::ok(status)
    }

    async fn set_status(&mut self, node_id: String, status: DrainState) -> ActorResult<()> {
        info!("Updating status of node {} {}", node_id, status);

        let mut records = self.records();
        let record = records.entry(node_id).or_default();
        record.status = Some(status);
        record.history.push(status);

        Produces::ok(())
    }
}
