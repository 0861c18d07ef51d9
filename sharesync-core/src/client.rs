use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::share::encode_sharing_url;

const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com";
const API_VERSION: &str = "v1.0";

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot carry path segments: {0}")]
    InvalidBaseUrl(String),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

#[derive(Clone)]
pub struct GraphClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl GraphClient {
    pub fn new(token: impl Into<String>) -> Result<Self, GraphError> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, GraphError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(GraphError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            token: token.into(),
        })
    }

    /// Resolves a sharing link to its drive item with one level of children.
    pub async fn get_shared_drive_item(&self, link: &str) -> Result<DriveItem, GraphError> {
        let share_id = encode_sharing_url(link);
        let mut url = self.endpoint(&["shares", &share_id, "driveItem"])?;
        url.query_pairs_mut().append_pair("$expand", "children");
        self.get_json(url).await
    }

    /// Fetches a drive item with one level of children.
    pub async fn get_drive_item(
        &self,
        drive_id: &str,
        item_id: &str,
    ) -> Result<DriveItem, GraphError> {
        let mut url = self.endpoint(&["drives", drive_id, "items", item_id])?;
        url.query_pairs_mut().append_pair("$expand", "children");
        self.get_json(url).await
    }

    pub async fn download_content(
        &self,
        drive_id: &str,
        item_id: &str,
    ) -> Result<Vec<u8>, GraphError> {
        let url = self.endpoint(&["drives", drive_id, "items", item_id, "content"])?;
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    fn auth_header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GraphError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GraphError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(API_VERSION)
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, GraphError> {
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GraphError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(GraphError::Api { status, body })
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub last_modified_date_time: Option<String>,
    #[serde(default)]
    pub parent_reference: Option<ItemReference>,
    #[serde(default)]
    pub file: Option<FileFacet>,
    #[serde(default)]
    pub folder: Option<FolderFacet>,
    #[serde(default)]
    pub children: Vec<DriveItem>,
}

impl DriveItem {
    pub fn is_file(&self) -> bool {
        self.file.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReference {
    #[serde(default)]
    pub drive_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    #[serde(default)]
    pub child_count: Option<u64>,
}
