mod client;
mod share;

pub use client::{DriveItem, FileFacet, FolderFacet, GraphClient, GraphError, ItemReference};
pub use share::encode_sharing_url;
