use thiserror::Error;

use super::remote::{RemoteError, RemoteNode, RemoteTree};

/// Folder hierarchies are acyclic; the limit only guards against malformed data.
pub const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("remote fetch failed: {0}")]
    Remote(#[from] RemoteError),
    #[error("remote tree is deeper than {limit} levels below {id}")]
    TooDeep { id: String, limit: usize },
}

/// Expands `node` recursively and returns every file beneath it.
///
/// A file node yields itself. Any failing expansion aborts the whole walk.
pub async fn flatten<R: RemoteTree>(
    remote: &R,
    node: &RemoteNode,
) -> Result<Vec<RemoteNode>, FlattenError> {
    let mut leaves = Vec::new();
    collect_leaves(remote, node, 0, &mut leaves).await?;
    Ok(leaves)
}

async fn collect_leaves<R: RemoteTree>(
    remote: &R,
    node: &RemoteNode,
    depth: usize,
    leaves: &mut Vec<RemoteNode>,
) -> Result<(), FlattenError> {
    if !node.is_folder {
        leaves.push(node.clone());
        return Ok(());
    }
    if depth >= MAX_TREE_DEPTH {
        return Err(FlattenError::TooDeep {
            id: node.id.clone(),
            limit: MAX_TREE_DEPTH,
        });
    }
    for child in &node.children {
        let expanded = remote.expand_children(child).await?;
        Box::pin(collect_leaves(remote, &expanded, depth + 1, leaves)).await?;
    }
    Ok(())
}
