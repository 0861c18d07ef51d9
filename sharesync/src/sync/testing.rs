use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use super::remote::{RemoteError, RemoteNode, RemoteTree};

const DRIVE_ID: &str = "drive-test";
const DRIVE_ROOT: &str = "/drive/root:";

/// In-memory remote tree; nodes sit at `/drive/root:<path>`.
#[derive(Default)]
pub(crate) struct MemoryTree {
    nodes: RefCell<BTreeMap<String, RemoteNode>>,
    paths: RefCell<BTreeMap<String, String>>,
    children: RefCell<BTreeMap<String, Vec<String>>>,
    content: RefCell<BTreeMap<String, Vec<u8>>>,
    shares: RefCell<BTreeMap<String, String>>,
    failing: RefCell<BTreeSet<String>>,
    failing_content: RefCell<BTreeSet<String>>,
    fetches: RefCell<Vec<String>>,
}

impl MemoryTree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_folder(&self, id: &str, name: &str, parent: Option<&str>) {
        self.insert(id, name, parent, true, None);
    }

    pub(crate) fn add_file(
        &self,
        id: &str,
        name: &str,
        parent: Option<&str>,
        modified: &str,
        data: &[u8],
    ) {
        self.insert(id, name, parent, false, Some(modified.to_string()));
        self.content.borrow_mut().insert(id.into(), data.to_vec());
    }

    pub(crate) fn share(&self, reference: &str, id: &str) {
        self.shares.borrow_mut().insert(reference.into(), id.into());
    }

    pub(crate) fn remove(&self, id: &str) {
        self.nodes.borrow_mut().remove(id);
        for children in self.children.borrow_mut().values_mut() {
            children.retain(|child| child != id);
        }
    }

    pub(crate) fn touch(&self, id: &str, modified: &str, data: &[u8]) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(id) {
            node.last_modified = Some(modified.into());
        }
        self.content.borrow_mut().insert(id.into(), data.to_vec());
    }

    pub(crate) fn fail_on(&self, id: &str) {
        self.failing.borrow_mut().insert(id.into());
    }

    pub(crate) fn fail_content_on(&self, id: &str) {
        self.failing_content.borrow_mut().insert(id.into());
    }

    pub(crate) fn heal(&self, id: &str) {
        self.failing.borrow_mut().remove(id);
        self.failing_content.borrow_mut().remove(id);
    }

    /// Ids whose content was fetched, in order.
    pub(crate) fn fetches(&self) -> Vec<String> {
        self.fetches.borrow().clone()
    }

    pub(crate) fn clear_fetches(&self) {
        self.fetches.borrow_mut().clear();
    }

    fn insert(
        &self,
        id: &str,
        name: &str,
        parent: Option<&str>,
        is_folder: bool,
        last_modified: Option<String>,
    ) {
        let parent_readable = parent
            .and_then(|parent| self.paths.borrow().get(parent).cloned())
            .unwrap_or_default();
        self.paths
            .borrow_mut()
            .insert(id.into(), format!("{parent_readable}/{name}"));
        self.nodes.borrow_mut().insert(
            id.into(),
            RemoteNode {
                id: id.into(),
                name: name.into(),
                parent_path: Some(format!("{DRIVE_ROOT}{parent_readable}")),
                drive_id: Some(DRIVE_ID.into()),
                is_folder,
                last_modified,
                web_url: Some(format!("https://onedrive.example/{id}")),
                children: Vec::new(),
            },
        );
        if let Some(parent) = parent {
            self.children
                .borrow_mut()
                .entry(parent.into())
                .or_default()
                .push(id.into());
        }
    }

    fn expanded(&self, id: &str) -> Result<RemoteNode, RemoteError> {
        if self.failing.borrow().contains(id) {
            return Err(RemoteError::Other(format!("injected failure for {id}")));
        }
        let nodes = self.nodes.borrow();
        let mut node = nodes
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::Other(format!("no such item {id}")))?;
        node.children = self
            .children
            .borrow()
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|child| nodes.get(child).cloned())
            .collect();
        Ok(node)
    }
}

impl RemoteTree for MemoryTree {
    async fn resolve_entry_point(&self, reference: &str) -> Result<RemoteNode, RemoteError> {
        let id = self
            .shares
            .borrow()
            .get(reference)
            .cloned()
            .ok_or_else(|| RemoteError::Other(format!("unknown share {reference}")))?;
        self.expanded(&id)
    }

    async fn expand_children(&self, node: &RemoteNode) -> Result<RemoteNode, RemoteError> {
        self.expanded(&node.id)
    }

    async fn fetch_content(&self, node: &RemoteNode) -> Result<Vec<u8>, RemoteError> {
        if self.failing_content.borrow().contains(&node.id) {
            return Err(RemoteError::Other(format!("injected failure for {}", node.id)));
        }
        self.fetches.borrow_mut().push(node.id.clone());
        self.content
            .borrow()
            .get(&node.id)
            .cloned()
            .ok_or_else(|| RemoteError::Other(format!("no content for {}", node.id)))
    }
}
