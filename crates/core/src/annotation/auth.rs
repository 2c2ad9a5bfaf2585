use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::{ConfigError, DetectionServiceError};

pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ACCESS_TOKEN_ENV: &str = "SHOTSPLIT_ACCESS_TOKEN";

/// Supplies bearer tokens for the annotation service.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, DetectionServiceError>;
}

/// A token handed in from outside, e.g. via `SHOTSPLIT_ACCESS_TOKEN`.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Read the token from the environment, if set and non-empty.
    pub fn from_env() -> Option<Self> {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(|t| Self::new(t.trim()))
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, DetectionServiceError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub kind: String,
    pub project_id: String,
    pub client_email: String,
}

/// Service-account key file, exchanged for tokens through `gcloud`.
#[derive(Debug, Clone)]
pub struct ServiceAccountCredentials {
    path: PathBuf,
    key: ServiceAccountKey,
    gcloud: PathBuf,
}

impl ServiceAccountCredentials {
    /// Load and validate the key file at `path`.
    pub fn load(path: &Path, gcloud: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidCredentials {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let key = parse_key(&content).map_err(invalid)?;

        Ok(Self {
            path: path.to_path_buf(),
            key,
            gcloud: gcloud.into(),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    pub fn project_id(&self) -> &str {
        &self.key.project_id
    }
}

/// Pick the token source for a run: an explicit token wins over the key file.
pub fn resolve_token_source(
    credentials_path: Option<&Path>,
    gcloud: &Path,
) -> Result<Arc<dyn TokenSource>, ConfigError> {
    if let Some(token) = StaticToken::from_env() {
        return Ok(Arc::new(token));
    }
    let path = credentials_path.ok_or_else(|| ConfigError::MissingCredentials {
        env_var: CREDENTIALS_ENV.to_string(),
    })?;
    Ok(Arc::new(ServiceAccountCredentials::load(path, gcloud)?))
}

fn parse_key(content: &str) -> Result<ServiceAccountKey, String> {
    let key: ServiceAccountKey = serde_json::from_str(content).map_err(|e| e.to_string())?;
    if key.kind != "service_account" {
        return Err(format!("expected type \"service_account\", got {:?}", key.kind));
    }
    if key.client_email.trim().is_empty() {
        return Err("client_email is empty".to_string());
    }
    Ok(key)
}

#[async_trait]
impl TokenSource for ServiceAccountCredentials {
    async fn access_token(&self) -> Result<String, DetectionServiceError> {
        let output = Command::new(&self.gcloud)
            .arg("auth")
            .arg("application-default")
            .arg("print-access-token")
            .env(CREDENTIALS_ENV, &self.path)
            .output()
            .await
            .map_err(|e| DetectionServiceError::Auth {
                reason: format!("could not run {}: {e}", self.gcloud.display()),
            })?;

        if !output.status.success() {
            return Err(DetectionServiceError::Auth {
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(DetectionServiceError::Auth {
                reason: format!("no token issued for {}", self.client_email()),
            });
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = r#"{
        "type": "service_account",
        "project_id": "demo-project",
        "private_key_id": "abc",
        "client_email": "splitter@demo-project.iam.gserviceaccount.com"
    }"#;

    #[test]
    fn loads_service_account_key() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("key.json");
        std::fs::write(&path, KEY).unwrap();

        let creds = ServiceAccountCredentials::load(&path, "gcloud").unwrap();
        assert_eq!(creds.project_id(), "demo-project");
        assert_eq!(
            creds.client_email(),
            "splitter@demo-project.iam.gserviceaccount.com"
        );
    }

    #[test]
    fn rejects_non_service_account_keys() {
        let err = parse_key(r#"{"type": "authorized_user", "project_id": "p", "client_email": "e"}"#)
            .unwrap_err();
        assert!(err.contains("service_account"));
        assert!(parse_key("not json").is_err());
    }

    #[test]
    fn missing_key_file_is_a_config_error() {
        let err = ServiceAccountCredentials::load(Path::new("/nonexistent/key.json"), "gcloud")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCredentials { .. }));
    }

    #[tokio::test]
    async fn static_token_is_returned_verbatim() {
        let token = StaticToken::new("ya29.token");
        assert_eq!(token.access_token().await.unwrap(), "ya29.token");
    }
}
