use crate::error::FlowError;
use anyhow::Context;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

const FLOW_EXTENSION: &str = "txt";
const ANALYTICS_SUFFIX: &str = ".analytics.json";

#[derive(Debug, Clone)]
pub struct FlowLayout {
    flows_dir: PathBuf,
    files_dir: PathBuf,
}

impl FlowLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            flows_dir: root.join("flows"),
            files_dir: root.join("files"),
        }
    }

    pub fn with_dirs(flows_dir: PathBuf, files_dir: PathBuf) -> Self {
        Self {
            flows_dir,
            files_dir,
        }
    }

    pub fn flows_dir(&self) -> &Path {
        &self.flows_dir
    }

    /// Flat namespace for files created or read by steps.
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    pub fn ensure_dirs(&self) -> anyhow::Result<()> {
        for dir in [&self.flows_dir, &self.files_dir] {
            fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn flow_file(&self, name: &str) -> PathBuf {
        self.flows_dir
            .join(format!("{}.{FLOW_EXTENSION}", sanitize(name)))
    }

    pub fn analytics_file(&self, name: &str) -> PathBuf {
        self.flows_dir
            .join(format!("{}{ANALYTICS_SUFFIX}", sanitize(name)))
    }

    /// Resolves a file read or written by a step. Names that would leave the
    /// files directory are rejected.
    pub fn step_file(&self, file_name: &str) -> Result<PathBuf, FlowError> {
        let path = self.files_dir.join(file_name);
        let flat = !file_name.is_empty()
            && !file_name.contains(['/', '\\'])
            && file_name != "."
            && file_name != "..";
        if !flat {
            return Err(FlowError::io(
                path,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "step file names must not contain path components",
                ),
            ));
        }
        Ok(path)
    }

    pub fn list_flows(&self) -> anyhow::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.flows_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to list {}", self.flows_dir.display()));
            }
        };
        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("failed to list {}", self.flows_dir.display()))?
                .path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(FLOW_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | ' ' => c,
            _ => '_',
        })
        .collect()
}
