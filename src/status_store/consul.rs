use super::{parse_active_connections, NodeStatus, StatusStore};
use crate::actor::{handle_error, Error};
use crate::consul::kv::{KVPair, KV};
use crate::consul::Client as ConsulClient;
use crate::drain::DrainState;
use act_zero::{Actor, ActorError, ActorResult, Addr, Produces};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::str::FromStr;
use tracing::{info, warn};

const STATUS_KEY: &str = "status";
const ACTIVE_CONNECTIONS_KEY: &str = "active_connections";

/// Status store on top of the Consul KV store.
///
/// A node's record lives below `<key_prefix>/<node_id>/` with one key per attribute.
pub struct ConsulStatusStore {
    consul: ConsulClient,
    key_prefix: String,
}

impl ConsulStatusStore {
    pub fn new(consul: ConsulClient, key_prefix: String) -> Self {
        Self {
            consul,
            key_prefix: key_prefix.trim_matches('/').to_owned(),
        }
    }

    fn node_prefix(&self, node_id: &str) -> Result<String> {
        if node_id.is_empty() || node_id.contains('/') {
            return Err(anyhow!("Node id {:?} is not usable as key segment", node_id));
        }

        Ok(if self.key_prefix.is_empty() {
            format!("{}/", node_id)
        } else {
            format!("{}/{}/", self.key_prefix, node_id)
        })
    }

    async fn read_node_status(&self, node_id: &str) -> Result<NodeStatus> {
        let prefix = self.node_prefix(node_id)?;
        let pairs = self.consul.list(&prefix).await?;

        node_status_from_pairs(&prefix, &pairs)
    }

    async fn write_node_status(&self, node_id: &str, status: DrainState) -> Result<()> {
        let key = format!("{}{}", self.node_prefix(node_id)?, STATUS_KEY);
        let stored = self.consul.put(&key, status.to_string()).await?;

        if !stored {
            return Err(anyhow!("Consul refused to store {}", key));
        }

        Ok(())
    }
}

#[async_trait]
impl Actor for ConsulStatusStore {
    #[tracing::instrument(
        name = "ConsulStatusStore::started",
        skip(self, _addr),
        fields(key_prefix = %self.key_prefix)
    )]
    async fn started(&mut self, _addr: Addr<Self>) -> ActorResult<()>
    where
        Self: Sized,
    {
        info!("Started");

        Produces::ok(())
    }

    async fn error(&mut self, error: ActorError) -> bool {
        handle_error(error)
    }
}

#[async_trait]
impl StatusStore for ConsulStatusStore {
    #[tracing::instrument(
        name = "ConsulStatusStore::get_status",
        skip(self),
        fields(key_prefix = %self.key_prefix)
    )]
    async fn get_status(&mut self, node_id: String) -> ActorResult<NodeStatus> {
        let status = self
            .read_node_status(&node_id)
            .await
            .map_err(Error::from)?;

        Produces::ok(status)
    }

    #[tracing::instrument(
        name = "ConsulStatusStore::set_status",
        skip(self),
        fields(key_prefix = %self.key_prefix)
    )]
    async fn set_status(&mut self, node_id: String, status: DrainState) -> ActorResult<()> {
        info!("Updating status of node {} {}", node_id, status);

        self.write_node_status(&node_id, status)
            .await
            .map_err(Error::from)?;

        Produces::ok(())
    }
}

fn node_status_from_pairs(prefix: &str, pairs: &[KVPair]) -> Result<NodeStatus> {
    let mut node_status = NodeStatus::default();

    for pair in pairs {
        let attribute = match pair.Key.strip_prefix(prefix) {
            Some(attribute) => attribute,
            None => continue,
        };

        match attribute {
            STATUS_KEY => {
                node_status.status = pair.decoded_value()?.and_then(|v| {
                    DrainState::from_str(v.trim())
                        .map_err(|e| warn!(key = pair.Key.as_str(), "Ignoring unknown status: {}", e))
                        .ok()
                })
            }
            ACTIVE_CONNECTIONS_KEY => {
                // an undecodable count is treated like a missing one
                node_status.active_connections = match pair.decoded_value() {
                    Ok(value) => value.as_deref().and_then(parse_active_connections),
                    Err(e) => {
                        warn!(key = pair.Key.as_str(), "Ignoring active connections: {:?}", e);
                        None
                    }
                }
            }
            _ => (),
        }
    }

    Ok(node_status)
}
