use super::{parse_active_connections, NodeStatus, StatusStore};
use crate::actor::{handle_error, Error};
use crate::drain::DrainState;
use crate::utils::path_append;
use act_zero::{Actor, ActorError, ActorResult, Addr, Produces};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Status store keeping one YAML document per node in a directory.
pub struct FileStatusStore {
    directory_path: PathBuf,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct StatusRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_connections: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl FileStatusStore {
    pub fn new(directory_path: impl AsRef<Path>) -> Self {
        Self {
            directory_path: directory_path.as_ref().into(),
        }
    }

    fn record_path(&self, node_id: &str) -> anyhow::Result<PathBuf> {
        if node_id.is_empty() || node_id.starts_with('.') || node_id.contains(std::path::is_separator)
        {
            return Err(anyhow!("Node id {:?} is not usable as file name", node_id));
        }

        Ok(path_append(self.directory_path.join(node_id), ".yml"))
    }
}

#[async_trait]
impl Actor for FileStatusStore {
    #[tracing::instrument(
        name = "FileStatusStore::started",
        skip(self, _addr),
        fields(path = %self.directory_path.display())
    )]
    async fn started(&mut self, _addr: Addr<Self>) -> ActorResult<()>
    where
        Self: Sized,
    {
        if !self.directory_path.is_dir() {
            return Err(Error::fatal(anyhow!(
                "Status directory {} does not exist",
                self.directory_path.display()
            ))
            .into());
        }

        info!("Started");

        Produces::ok(())
    }

    async fn error(&mut self, error: ActorError) -> bool {
        handle_error(error)
    }
}

impl fmt::Display for FileStatusStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FileStatusStore ({})",
            self.directory_path.to_string_lossy()
        )
    }
}

impl fmt::Debug for FileStatusStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[async_trait]
impl StatusStore for FileStatusStore {
    #[tracing::instrument(
        name = "FileStatusStore::get_status",
        skip(self),
        fields(path = %self.directory_path.display())
    )]
    async fn get_status(&mut self, node_id: String) -> ActorResult<NodeStatus> {
        let path = self.record_path(&node_id).map_err(Error::from)?;
        let record = blocking(move || read_record(&path))
            .await
            .map_err(Error::from)?;

        Produces::ok(record.map(NodeStatus::from).unwrap_or_default())
    }

    #[tracing::instrument(
        name = "FileStatusStore::set_status",
        skip(self),
        fields(path = %self.directory_path.display())
    )]
    async fn set_status(&mut self, node_id: String, status: DrainState) -> ActorResult<()> {
        info!("Updating status of node {} {}", node_id, status);

        let path = self.record_path(&node_id).map_err(Error::from)?;
        blocking(move || {
            let mut record = read_record(&path)?.unwrap_or_default();
            record.status = Some(status.to_string());
            record.status_updated_at = Some(Utc::now());

            write_record(&path, &record)
        })
        .await
        .map_err(Error::from)?;

        Produces::ok(())
    }
}

impl From<StatusRecord> for NodeStatus {
    fn from(record: StatusRecord) -> Self {
        let status = record.status.as_deref().and_then(|s| {
            DrainState::from_str(s)
                .map_err(|e| warn!(status = s, "Ignoring unknown status: {}", e))
                .ok()
        });

        let active_connections = match record.active_connections {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => parse_active_connections(&s),
            _ => None,
        };

        NodeStatus {
            status,
            active_connections,
        }
    }
}

async fn blocking<T: Send + 'static>(
    f: impl FnOnce() -> anyhow::Result<T> + Send + 'static,
) -> anyhow::Result<T> {
    tokio::task::spawn_blocking(f)
        .await
        .context("Status file task panicked")?
}

fn read_record(path: &Path) -> anyhow::Result<Option<StatusRecord>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open {}", path.display()));
        }
    };

    let record = serde_yaml::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(Some(record))
}

fn write_record(path: &Path, record: &StatusRecord) -> anyhow::Result<()> {
    // readers must never observe a half written document
    let tmp_path = path_append(path, ".tmp");

    let file = File::create(&tmp_path)
        .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_yaml::to_writer(&mut writer, record)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;

    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use act_zero::call;
    use act_zero::runtimes::tokio::spawn_actor;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[tokio::test]
    async fn test_set_status_creates_missing_record() -> TestResult {
        let dir = tempfile::tempdir()?;
        let addr = spawn_actor(FileStatusStore::new(dir.path()));

        call!(addr.set_status("n1".to_owned(), DrainState::Draining)).await?;

        let status = call!(addr.get_status("n1".to_owned())).await?;
        assert_eq!(Some(DrainState::Draining), status.status);
        assert_eq!(None, status.active_connections);

        Ok(())
    }

    #[tokio::test]
    async fn test_set_status_preserves_agent_fields() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("n1.yml");
        std::fs::write(&path, "active_connections: 7\nagent: conntrack\n")?;

        let addr = spawn_actor(FileStatusStore::new(dir.path()));
        call!(addr.set_status("n1".to_owned(), DrainState::StoppedForce)).await?;

        let status = call!(addr.get_status("n1".to_owned())).await?;
        assert_eq!(Some(DrainState::StoppedForce), status.status);
        assert_eq!(Some(7), status.active_connections);

        let content = std::fs::read_to_string(&path)?;
        assert!(content.contains("agent: conntrack"));
        assert!(content.contains("status: STOPPED_FORCE"));

        Ok(())
    }

    #[tokio::test]
    async fn test_string_and_garbage_counts() -> TestResult {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("n1.yml"), "active_connections: \"0\"\n")?;
        std::fs::write(dir.path().join("n2.yml"), "active_connections: lots\n")?;

        let addr = spawn_actor(FileStatusStore::new(dir.path()));

        let n1 = call!(addr.get_status("n1".to_owned())).await?;
        assert_eq!(Some(0), n1.active_connections);

        let n2 = call!(addr.get_status("n2".to_owned())).await?;
        assert_eq!(None, n2.active_connections);

        Ok(())
    }

    #[tokio::test]
    async fn test_node_id_must_be_a_plain_file_name() -> TestResult {
        let dir = tempfile::tempdir()?;
        let addr = spawn_actor(FileStatusStore::new(dir.path()));

        let result = call!(addr.get_status("../etc/passwd".to_owned())).await;
        assert!(result.is_err());

        // a failed call doesn't stop the store
        let status = call!(addr.get_status("n1".to_owned())).await?;
        assert_eq!(NodeStatus::default(), status);

        Ok(())
    }
}
