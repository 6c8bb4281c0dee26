mod consul;
mod file;
mod memory;

use act_zero::runtimes::tokio::spawn_actor;
use act_zero::{upcast, Actor, ActorResult, Addr};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::drain::DrainState;
use crate::AppConfig;

pub use self::consul::ConsulStatusStore;
pub use file::FileStatusStore;
pub use memory::MemoryStatusStore;

/// Drain record of a node.
///
/// `active_connections` is maintained by an external connection tracking agent; `None` means
/// the value is missing or not a non-negative integer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub status: Option<DrainState>,
    pub active_connections: Option<u64>,
}

#[async_trait]
pub trait StatusStore: Actor {
    async fn get_status(&mut self, node_id: String) -> ActorResult<NodeStatus>;

    /// Upserts the status of a node, leaving `active_connections` untouched.
    async fn set_status(&mut self, node_id: String, status: DrainState) -> ActorResult<()>;
}

pub fn parse_active_connections(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

pub fn build_from_config(config: AppConfig) -> anyhow::Result<Addr<dyn StatusStore>> {
    Ok(match &config.status_store {
        config::StatusStore::Memory => upcast!(spawn_actor(MemoryStatusStore::default())),
        config::StatusStore::File { path } => upcast!(spawn_actor(FileStatusStore::new(path))),
        config::StatusStore::Consul {
            address,
            key_prefix,
            datacenter,
            token,
            request_timeout,
        } => {
            let mut builder = crate::consul::Config::builder()
                .address(address.clone())
                .request_timeout(*request_timeout);

            if let Some(datacenter) = datacenter {
                builder = builder.datacenter(datacenter.clone());
            }

            if let Some(token) = token {
                builder = builder.token(token.clone());
            }

            let client = crate::consul::Client::new(builder.build()?)?;

            upcast!(spawn_actor(ConsulStatusStore::new(
                client,
                key_prefix.clone()
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_connections_parsing() {
        assert_eq!(Some(0), parse_active_connections("0"));
        assert_eq!(Some(0), parse_active_connections(" 00\n"));
        assert_eq!(Some(12), parse_active_connections("12"));
        assert_eq!(None, parse_active_connections("-1"));
        assert_eq!(None, parse_active_connections("n/a"));
        assert_eq!(None, parse_active_connections(""));
        assert_eq!(None, parse_active_connections("0.0"));
    }
}
