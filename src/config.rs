use crate::{AppConfig, RetryPolicy};
use anyhow::Context;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default)]
    pub drain: Drain,
    pub status_store: StatusStore,
    pub action_executor: ActionExecutor,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Drain {
    #[serde(with = "humantime_serde")]
    pub max_drain_duration: Duration,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Upper bound of a whole invocation, after which the drain is cancelled.
    #[serde(with = "humantime_serde")]
    pub invocation_timeout: Option<Duration>,
    pub deregistration: Deregistration,
    pub force_close_on_timeout: bool,
    pub store_retry: RetryPolicy,
}

impl Default for Drain {
    fn default() -> Self {
        Self {
            max_drain_duration: Duration::from_secs(7200),
            poll_interval: Duration::from_secs(30),
            invocation_timeout: None,
            deregistration: Deregistration::default(),
            force_close_on_timeout: false,
            store_retry: RetryPolicy::default(),
        }
    }
}

/// When the node gets removed from its routing target group.
#[derive(Copy, Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Deregistration {
    Never,
    OnStart,
    BeforeStop,
}

impl Default for Deregistration {
    fn default() -> Self {
        Deregistration::Never
    }
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StatusStore {
    Memory,
    File {
        path: String,
    },
    Consul {
        address: String,
        key_prefix: String,
        #[serde(default)]
        datacenter: Option<String>,
        #[serde(default)]
        token: Option<String>,
        #[serde(with = "humantime_serde", default = "default_consul_timeout")]
        request_timeout: Duration,
    },
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionExecutor {
    Mock,
    Http {
        address: String,
        api_token: String,
        #[serde(default = "default_force_close_path")]
        force_close_path: String,
        #[serde(with = "humantime_serde", default = "default_http_timeout")]
        request_timeout: Duration,
    },
}

fn default_consul_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_force_close_path() -> String {
    "/admin/force-close".to_owned()
}

pub fn load_config() -> anyhow::Result<AppConfig> {
    let config_path = get_config_path()?;
    let file = File::open(&config_path)
        .with_context(|| format!("Failed to open config file {}", &config_path))?;

    let mut config: Config = serde_yaml::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse config file {}", &config_path))?;

    apply_max_drain_secs(&mut config.drain, std::env::var("MAX_DRAIN_SECS").ok())?;

    Ok(Arc::new(config))
}

fn get_config_path() -> anyhow::Result<String> {
    use std::env;
    use tracing::info;

    env::var("APP_CONFIG").or_else(|e| {
        info!(
            error = format!("{:?}", e).as_str(),
            "Missing or invalid APP_CONFIG env var, fallback to config.yml"
        );
        Ok("config.yml".to_string())
    })
}

fn apply_max_drain_secs(drain: &mut Drain, value: Option<String>) -> anyhow::Result<()> {
    if let Some(value) = value {
        let secs: u64 = value
            .trim()
            .parse()
            .with_context(|| format!("Invalid MAX_DRAIN_SECS value {:?}", value))?;

        drain.max_drain_duration = Duration::from_secs(secs);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_drain_defaults() -> anyhow::Result<()> {
        let config: Config = serde_yaml::from_str(
            r#"
status_store:
  type: memory
action_executor:
  type: mock
"#,
        )?;

        assert_eq!(Drain::default(), config.drain);
        assert_eq!(Duration::from_secs(7200), config.drain.max_drain_duration);
        assert_eq!(Deregistration::Never, config.drain.deregistration);

        Ok(())
    }

    #[test]
    fn test_full_config() -> anyhow::Result<()> {
        let config: Config = serde_yaml::from_str(
            r#"
drain:
  max_drain_duration: 1h
  poll_interval: 10s
  invocation_timeout: 15m
  deregistration: before_stop
  force_close_on_timeout: true
  store_retry:
    max_attempts: 5
    base_delay: 100ms
status_store:
  type: consul
  address: http://127.0.0.1:8500
  key_prefix: drain/nodes
action_executor:
  type: http
  address: https://workloads.internal
  api_token: secret
"#,
        )?;

        assert_eq!(Duration::from_secs(3600), config.drain.max_drain_duration);
        assert_eq!(Duration::from_secs(10), config.drain.poll_interval);
        assert_eq!(Some(Duration::from_secs(900)), config.drain.invocation_timeout);
        assert_eq!(Deregistration::BeforeStop, config.drain.deregistration);
        assert!(config.drain.force_close_on_timeout);
        assert_eq!(5, config.drain.store_retry.max_attempts);
        assert_eq!(Duration::from_millis(100), config.drain.store_retry.base_delay);
        assert_eq!(Duration::from_secs(5), config.drain.store_retry.max_delay);

        match config.status_store {
            StatusStore::Consul {
                key_prefix,
                datacenter,
                request_timeout,
                ..
            } => {
                assert_eq!("drain/nodes", key_prefix);
                assert_eq!(None, datacenter);
                assert_eq!(Duration::from_secs(10), request_timeout);
            }
            other => panic!("unexpected status store {:?}", other),
        }

        match config.action_executor {
            ActionExecutor::Http {
                force_close_path,
                request_timeout,
                ..
            } => {
                assert_eq!("/admin/force-close", force_close_path);
                assert_eq!(Duration::from_secs(30), request_timeout);
            }
            other => panic!("unexpected action executor {:?}", other),
        }

        Ok(())
    }

    #[test]
    fn test_max_drain_secs_override() -> anyhow::Result<()> {
        let mut drain = Drain::default();

        apply_max_drain_secs(&mut drain, None)?;
        assert_eq!(Duration::from_secs(7200), drain.max_drain_duration);

        apply_max_drain_secs(&mut drain, Some("600".into()))?;
        assert_eq!(Duration::from_secs(600), drain.max_drain_duration);

        assert!(apply_max_drain_secs(&mut drain, Some("ten".into())).is_err());
        assert_eq!(Duration::from_secs(600), drain.max_drain_duration);

        Ok(())
    }
}
