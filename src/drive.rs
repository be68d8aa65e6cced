//! Narrow Google Drive client consumed by the archive
//!
//! Only three operations exist: drain a folder listing, create a folder, and
//! upload named bytes. Token acquisition and refresh are handled here and
//! nowhere else; the rest of the crate sees the [`RemoteStore`] trait.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::DrivePreferences;
use crate::error::ShooterError;

pub const FOLDER_MIMETYPE: &str = "application/vnd.google-apps.folder";

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const API_BASE: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Slack subtracted from `expires_in` so a token is never used at the edge
/// of its lifetime.
const TOKEN_EXPIRY_SLACK: u64 = 60;

/// A remote file or folder as the store reports it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Every non-trashed folder directly under `parent_id`. Pagination is
    /// drained before returning.
    async fn list_folders(&self, parent_id: &str) -> Result<Vec<RemoteEntry>, ShooterError>;

    async fn create_folder(
        &self,
        name: &str,
        parent_ids: &[String],
    ) -> Result<RemoteEntry, ShooterError>;

    async fn upload_file(
        &self,
        content: Vec<u8>,
        filename: &str,
        mimetype: &str,
        parent_ids: &[String],
        description: &str,
    ) -> Result<RemoteEntry, ShooterError>;
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Drive v3 client authenticating via OAuth refresh-token exchange.
pub struct DriveClient {
    http: reqwest::Client,
    credentials: DrivePreferences,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    files: Vec<RemoteEntry>,
    next_page_token: Option<String>,
}

impl DriveClient {
    pub fn new(credentials: DrivePreferences) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, ShooterError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        debug!("exchanging refresh token for a new access token");
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ShooterError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        let access_token = token.access_token.clone();
        let lifetime = token.expires_in.saturating_sub(TOKEN_EXPIRY_SLACK);
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        Ok(access_token)
    }
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn list_folders(&self, parent_id: &str) -> Result<Vec<RemoteEntry>, ShooterError> {
        let token = self.access_token().await?;
        let query = format!(
            r#"mimeType="{FOLDER_MIMETYPE}" and trashed != true and "{parent_id}" in parents"#
        );
        debug!("listing folders with query `{query}`");

        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{API_BASE}/files"))
                .bearer_auth(&token)
                .query(&[
                    ("q", query.as_str()),
                    ("spaces", "drive"),
                    ("fields", "nextPageToken,files(id,name)"),
                ]);
            if let Some(ref page) = page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let page: ListResponse = request
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            entries.extend(page.files);
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(entries)
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_ids: &[String],
    ) -> Result<RemoteEntry, ShooterError> {
        let token = self.access_token().await?;
        let body = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIMETYPE,
            "parents": parent_ids,
        });

        let entry = self
            .http
            .post(format!("{API_BASE}/files"))
            .bearer_auth(&token)
            .query(&[("fields", "id,name")])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(entry)
    }

    async fn upload_file(
        &self,
        content: Vec<u8>,
        filename: &str,
        mimetype: &str,
        parent_ids: &[String],
        description: &str,
    ) -> Result<RemoteEntry, ShooterError> {
        let token = self.access_token().await?;

        // Metadata first, then the bytes against the created file id.
        let body = serde_json::json!({
            "name": filename,
            "mimeType": mimetype,
            "parents": parent_ids,
            "description": description,
        });

        let created: RemoteEntry = self
            .http
            .post(format!("{API_BASE}/files"))
            .bearer_auth(&token)
            .query(&[("fields", "id,name")])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let stored = self
            .http
            .patch(format!("{UPLOAD_BASE}/files/{}", created.id))
            .bearer_auth(&token)
            .query(&[("uploadType", "media"), ("fields", "id,name")])
            .header(reqwest::header::CONTENT_TYPE, mimetype)
            .body(content)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(stored)
    }
}
