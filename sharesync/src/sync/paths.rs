use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use super::remote::RemoteNode;

const PATH_DELIMITER: char = ':';

#[derive(Debug, Error)]
pub enum PathError {
    #[error("remote path is empty")]
    Empty,
    #[error("remote path contains unsupported component: {0}")]
    UnsupportedComponent(String),
}

/// Readable remote path of `node`, e.g. `/Docs/report.pdf`.
///
/// Returns an empty string when the parent path carries no `:` delimiter.
pub fn full_path(node: &RemoteNode) -> String {
    let Some((_, readable)) = node
        .parent_path
        .as_deref()
        .and_then(|parent| parent.split_once(PATH_DELIMITER))
    else {
        return String::new();
    };
    let readable = readable.trim_end_matches('/');
    if node.name.is_empty() {
        return readable.to_string();
    }
    format!("{readable}/{}", node.name)
}

/// Directory portion of an entry point's full path; stripped from its descendants.
pub fn root_prefix(entry: &RemoteNode) -> String {
    let full = full_path(entry);
    match full.rfind('/') {
        Some(0) => "/".to_string(),
        Some(index) => full[..index].to_string(),
        None => String::new(),
    }
}

/// Path of a leaf relative to its entry point's root, without a leading `/`.
pub fn relative_path(leaf: &RemoteNode, root: &str) -> String {
    let full = full_path(leaf);
    if full.is_empty() {
        return leaf.name.clone();
    }
    full.strip_prefix(root)
        .unwrap_or(&full)
        .trim_start_matches('/')
        .to_string()
}

/// Maps a relative remote path under `output_dir`.
pub fn destination_path(output_dir: &Path, relative: &str) -> Result<PathBuf, PathError> {
    if relative.trim_matches('/').is_empty() {
        return Err(PathError::Empty);
    }

    let mut out = output_dir.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::CurDir => continue,
            Component::ParentDir | Component::Prefix(_) => {
                return Err(PathError::UnsupportedComponent(relative.to_string()));
            }
        }
    }
    Ok(out)
}

/// First segment of a relative path; the unit of folder bookkeeping.
pub fn top_level_folder(relative: &str) -> &str {
    relative
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
}

/// Whether `name` is a single plain path component that can be joined safely.
pub fn is_plain_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, parent_path: Option<&str>) -> RemoteNode {
        RemoteNode {
            id: name.into(),
            name: name.into(),
            parent_path: parent_path.map(str::to_string),
            drive_id: None,
            is_folder: false,
            last_modified: None,
            web_url: None,
            children: Vec::new(),
        }
    }

    #[test]
    fn full_path_strips_addressable_prefix() {
        assert_eq!(full_path(&node("B", Some("/drive/root:/A"))), "/A/B");
        assert_eq!(full_path(&node("B", Some("/drive/root:"))), "/B");
        assert_eq!(
            full_path(&node("d.txt", Some("/drives/x/root:/A/B/C"))),
            "/A/B/C/d.txt"
        );
    }

    #[test]
    fn unparseable_parent_path_resolves_to_empty() {
        assert_eq!(full_path(&node("B", Some("/drive/root"))), "");
        assert_eq!(full_path(&node("B", None)), "");
        assert_eq!(root_prefix(&node("B", None)), "");
    }

    #[test]
    fn root_prefix_is_directory_of_entry_point() {
        assert_eq!(root_prefix(&node("B", Some("/drive/root:/A"))), "/A");
        assert_eq!(root_prefix(&node("B", Some("/drive/root:"))), "/");
    }

    #[test]
    fn relative_path_strips_entry_point_root() {
        let entry = node("B", Some("/drive/root:/A"));
        let leaf = node("d.txt", Some("/drive/root:/A/B/C"));
        let root = root_prefix(&entry);

        let relative = relative_path(&leaf, &root);

        assert_eq!(relative, "B/C/d.txt");
        assert_eq!(top_level_folder(&relative), "B");
    }

    #[test]
    fn relative_path_falls_back_to_name_for_unparseable_leaf() {
        assert_eq!(relative_path(&node("d.txt", None), "/A"), "d.txt");
    }

    #[test]
    fn maps_relative_path_under_output_dir() {
        let root = PathBuf::from("/out");
        let mapped = destination_path(&root, "B/C/d.txt").unwrap();
        assert_eq!(mapped, PathBuf::from("/out/B/C/d.txt"));
    }

    #[test]
    fn rejects_parent_dir_and_empty_paths() {
        let root = PathBuf::from("/out");
        assert!(matches!(
            destination_path(&root, "../secret"),
            Err(PathError::UnsupportedComponent(_))
        ));
        assert!(matches!(destination_path(&root, "/"), Err(PathError::Empty)));
    }

    #[test]
    fn plain_component_check() {
        assert!(is_plain_component("Docs"));
        assert!(!is_plain_component("Docs/Inner"));
        assert!(!is_plain_component(".."));
        assert!(!is_plain_component(""));
        assert!(!is_plain_component("/"));
    }
}
