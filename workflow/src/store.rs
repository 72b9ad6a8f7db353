use crate::analytics::Analytics;
use crate::codec;
use crate::flow::Flow;
use crate::layout::FlowLayout;
use anyhow::Context;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::warn;

/// Persists flows as one text file each, plus an analytics sidecar.
#[derive(Debug, Clone)]
pub struct FlowStore {
    layout: FlowLayout,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnalyticsRecord {
    flow_name: String,
    updated_at: DateTime<Utc>,
    analytics: Analytics,
}

impl FlowStore {
    pub fn new(layout: FlowLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FlowLayout {
        &self.layout
    }

    pub fn list(&self) -> anyhow::Result<Vec<String>> {
        self.layout.list_flows()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.layout.flow_file(name).is_file()
    }

    pub fn save(&self, flow: &Flow) -> anyhow::Result<PathBuf> {
        let text = codec::encode(flow)
            .with_context(|| format!("failed to encode flow {}", flow.name()))?;
        let path = self.layout.flow_file(flow.name());
        write_atomic(&path, text.as_bytes())?;
        debug!(
            flow = flow.name(),
            created_at = %flow.created_at(),
            path = %path.display(),
            "saved flow"
        );
        Ok(path)
    }

    /// Loads a stored flow with its recorded analytics. `Ok(None)` when no flow
    /// with that name is stored.
    pub fn load(&self, name: &str) -> anyhow::Result<Option<Flow>> {
        let path = self.layout.flow_file(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read flow {}", path.display()));
            }
        };
        let mut flow = codec::decode(&text)
            .with_context(|| format!("failed to decode flow {}", path.display()))?;

        if let Some(analytics) = self.load_analytics(name)? {
            if !flow.restore_analytics(analytics) {
                warn!(
                    flow = name,
                    "recorded analytics do not match the flow capacity, starting fresh"
                );
            }
        }
        Ok(Some(flow))
    }

    pub fn save_analytics(&self, flow: &Flow) -> anyhow::Result<()> {
        let record = AnalyticsRecord {
            flow_name: flow.name().to_string(),
            updated_at: Utc::now(),
            analytics: flow.analytics().clone(),
        };
        let data = serde_json::to_vec_pretty(&record)?;
        write_atomic(&self.layout.analytics_file(flow.name()), &data)
    }

    fn load_analytics(&self, name: &str) -> anyhow::Result<Option<Analytics>> {
        let path = self.layout.analytics_file(name);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read analytics {}", path.display()));
            }
        };
        match serde_json::from_str::<AnalyticsRecord>(&data) {
            Ok(record) => Ok(Some(record.analytics)),
            Err(err) => {
                warn!(
                    flow = name,
                    path = %path.display(),
                    error = %err,
                    "recorded analytics are unreadable, starting fresh"
                );
                Ok(None)
            }
        }
    }

    /// Removes a flow and its analytics. Returns whether the flow existed.
    pub fn delete(&self, name: &str) -> anyhow::Result<bool> {
        let existed = remove_if_present(&self.layout.flow_file(name))?;
        remove_if_present(&self.layout.analytics_file(name))?;
        Ok(existed)
    }
}

fn remove_if_present(path: &Path) -> anyhow::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("failed to delete {}", path.display())),
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp_path = tmp_path(path);
    fs::write(&tmp_path, data)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed to persist {}", path.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let mut file_name = path
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    file_name.push(".tmp");
    tmp.set_file_name(file_name);
    tmp
}
