use std::path::PathBuf;

use anyhow::Context;

use crate::metadata::{METADATA_FILE_NAME, SyncInput};

pub const TOKEN_ENV: &str = "GPTSCRIPT_GRAPH_MICROSOFT_COM_BEARER_TOKEN";
pub const WORKSPACE_ENV: &str = "GPTSCRIPT_WORKSPACE_DIR";
pub const GRAPH_BASE_URL_ENV: &str = "SHARESYNC_GRAPH_BASE_URL";

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub workspace_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub token: Option<String>,
    pub graph_base_url: Option<String>,
}

impl SyncConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let workspace_dir = match non_empty(lookup(WORKSPACE_ENV)) {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().context("current directory is unavailable")?,
        };
        let metadata_path = workspace_dir.join(METADATA_FILE_NAME);

        Ok(Self {
            workspace_dir,
            metadata_path,
            token: non_empty(lookup(TOKEN_ENV)),
            graph_base_url: non_empty(lookup(GRAPH_BASE_URL_ENV)),
        })
    }

    /// Where files are mirrored: the document's override, else the workspace.
    ///
    /// A relative override is taken relative to the workspace.
    pub fn output_dir(&self, input: &SyncInput) -> PathBuf {
        match input.output_dir() {
            Some(dir) => self.workspace_dir.join(dir),
            None => self.workspace_dir.clone(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn metadata_lives_in_workspace() {
        let config = SyncConfig::from_lookup(lookup(&[
            (WORKSPACE_ENV, "/work"),
            (TOKEN_ENV, "secret"),
        ]))
        .unwrap();

        assert_eq!(config.workspace_dir, PathBuf::from("/work"));
        assert_eq!(config.metadata_path, PathBuf::from("/work/.metadata.json"));
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.graph_base_url, None);
    }

    #[test]
    fn empty_values_are_ignored() {
        let config = SyncConfig::from_lookup(lookup(&[
            (WORKSPACE_ENV, ""),
            (TOKEN_ENV, "  "),
        ]))
        .unwrap();

        assert_eq!(config.workspace_dir, std::env::current_dir().unwrap());
        assert_eq!(config.token, None);
    }

    #[test]
    fn output_dir_override_wins() {
        let config = SyncConfig::from_lookup(lookup(&[(WORKSPACE_ENV, "/work")])).unwrap();
        let mut input = SyncInput::default();
        assert_eq!(config.output_dir(&input), PathBuf::from("/work"));

        input.output_dir = "/mirror".into();
        assert_eq!(config.output_dir(&input), PathBuf::from("/mirror"));

        input.output_dir = "mirror".into();
        assert_eq!(config.output_dir(&input), PathBuf::from("/work/mirror"));
    }
}
