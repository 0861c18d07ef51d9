use sharesync_core::{DriveItem, GraphClient, GraphError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("item {0} has no owning drive id")]
    MissingDrive(String),
    #[error("{0}")]
    Other(String),
}

/// A node of the remote tree as seen during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNode {
    pub id: String,
    pub name: String,
    /// Addressable prefix and readable path separated by `:`, e.g. `/drive/root:/Docs`.
    pub parent_path: Option<String>,
    pub drive_id: Option<String>,
    pub is_folder: bool,
    pub last_modified: Option<String>,
    pub web_url: Option<String>,
    /// Shallow references; expand them before looking at their own children.
    pub children: Vec<RemoteNode>,
}

impl RemoteNode {
    pub fn last_modified_stamp(&self) -> &str {
        self.last_modified.as_deref().unwrap_or_default()
    }
}

impl From<DriveItem> for RemoteNode {
    fn from(item: DriveItem) -> Self {
        let is_folder = !item.is_file();
        let (parent_path, drive_id) = match item.parent_reference {
            Some(reference) => (reference.path, reference.drive_id),
            None => (None, None),
        };
        Self {
            id: item.id,
            name: item.name,
            parent_path,
            drive_id,
            is_folder,
            last_modified: item.last_modified_date_time,
            web_url: item.web_url,
            children: item.children.into_iter().map(RemoteNode::from).collect(),
        }
    }
}

/// Read access to the remote tree, as needed by the reconciliation engine.
#[allow(async_fn_in_trait)]
pub trait RemoteTree {
    /// Resolves an entry-point reference with its children expanded one level.
    async fn resolve_entry_point(&self, reference: &str) -> Result<RemoteNode, RemoteError>;

    /// Re-fetches `node` with its children expanded one level.
    async fn expand_children(&self, node: &RemoteNode) -> Result<RemoteNode, RemoteError>;

    async fn fetch_content(&self, node: &RemoteNode) -> Result<Vec<u8>, RemoteError>;
}

impl RemoteTree for GraphClient {
    async fn resolve_entry_point(&self, reference: &str) -> Result<RemoteNode, RemoteError> {
        Ok(self.get_shared_drive_item(reference).await?.into())
    }

    async fn expand_children(&self, node: &RemoteNode) -> Result<RemoteNode, RemoteError> {
        let drive_id = owning_drive(node)?;
        Ok(self.get_drive_item(drive_id, &node.id).await?.into())
    }

    async fn fetch_content(&self, node: &RemoteNode) -> Result<Vec<u8>, RemoteError> {
        let drive_id = owning_drive(node)?;
        Ok(self.download_content(drive_id, &node.id).await?)
    }
}

fn owning_drive(node: &RemoteNode) -> Result<&str, RemoteError> {
    node.drive_id
        .as_deref()
        .ok_or_else(|| RemoteError::MissingDrive(node.id.clone()))
}
