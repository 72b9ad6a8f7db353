use crate::layout::FlowLayout;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

pub const CONFIG_FILE_NAME: &str = "procflow.toml";
const DEFAULT_WRAP_WIDTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlowConfig {
    /// Directory holding one `<flow-name>.txt` per flow.
    pub flows_dir: PathBuf,
    /// Directory steps read from and write to.
    pub files_dir: PathBuf,
    pub wrap_width: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            flows_dir: PathBuf::from("flows"),
            files_dir: PathBuf::from("files"),
            wrap_width: DEFAULT_WRAP_WIDTH,
        }
    }
}

impl FlowConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let config: FlowConfig = match ext.as_str() {
            "yml" | "yaml" => serde_yaml::from_str(&contents).context("parse procflow config")?,
            "toml" | "tml" => toml::from_str(&contents).context("parse procflow config")?,
            _ => serde_yaml::from_str(&contents)
                .or_else(|_| toml::from_str(&contents))
                .context("parse procflow config (yaml or toml)")?,
        };
        if config.wrap_width == 0 {
            anyhow::bail!("wrap_width must be at least 1");
        }
        Ok(config)
    }

    /// Loads `<root>/procflow.toml` when present.
    pub fn discover(root: &Path) -> anyhow::Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn layout(&self, root: &Path) -> FlowLayout {
        FlowLayout::with_dirs(resolve(root, &self.flows_dir), resolve(root, &self.files_dir))
    }
}

fn resolve(root: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        root.join(dir)
    }
}
