//! Access token resolution from settings or the bootstrapped credentials file

use crate::constants::CREDENTIALS_FILE;
use crate::error::{Result, SyncError};
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Contents of credentials.json as written by the one-time auth flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry as a millisecond epoch
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now_millis)
    }

    /// Exchange the refresh token for a new short-lived access token
    pub async fn refresh(&mut self, api_url: &str, app_key: &str, app_secret: &str) -> Result<()> {
        let refresh_token = self
            .refresh_token
            .clone()
            .ok_or_else(|| SyncError::Credentials("no refresh token stored".into()))?;

        let url = format!("{}/oauth2/token", api_url.trim_end_matches('/'));
        let response = reqwest::Client::new()
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", app_key),
                ("client_secret", app_secret),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        // Renew ten seconds early, matching the auth flow
        self.expires_at = Some(chrono::Utc::now().timestamp_millis() + token.expires_in * 1000 - 10_000);
        self.access_token = token.access_token;
        Ok(())
    }
}

/// Resolve the token to use for this session.
///
/// An explicit `access_token` in settings wins. Otherwise credentials.json in
/// the data dir is used, refreshed once if it has expired and the app key and
/// secret are configured.
pub async fn resolve_access_token(settings: &Settings, data_dir: &Path) -> Result<String> {
    if let Some(token) = settings.access_token.as_ref().filter(|t| !t.trim().is_empty()) {
        debug!("Using access token from settings");
        return Ok(token.trim().to_string());
    }

    let path = data_dir.join(CREDENTIALS_FILE);
    let mut creds = Credentials::load(&path).map_err(|e| {
        SyncError::Credentials(format!("{} could not be read: {}", path.display(), e))
    })?;

    if creds.is_expired(chrono::Utc::now().timestamp_millis()) {
        match (settings.app_key.as_deref(), settings.app_secret.as_deref()) {
            (Some(key), Some(secret)) => {
                creds.refresh(&settings.api_base_url, key, secret).await?;
                creds.save(&path)?;
                info!("Access token refreshed");
            }
            _ => warn!("Access token expired and no app key/secret configured to refresh it"),
        }
    }

    Ok(creds.access_token)
}
