//! Minimal authenticated client for pushing saved artifacts to a model hub.
//!
//! The wire protocol is deliberately thin: create the remote repository,
//! then upload every file of the artifact directory under it. Transient
//! failures propagate to the caller; there are no retries at this layer.

use std::path::Path;

pub const ENDPOINT_ENV: &str = "BLITHE_HUB_ENDPOINT";
pub const TOKEN_ENV: &str = "BLITHE_HUB_TOKEN";

const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("hub token not set; export {TOKEN_ENV} to push")]
    MissingToken,
    #[error("hub request for '{path}' failed with status {status}")]
    Status { path: String, status: u16 },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Authenticated hub client. Endpoint and token come from the environment.
pub struct HubClient {
    endpoint: String,
    token: String,
    client: reqwest::blocking::Client,
}

impl HubClient {
    pub fn from_env() -> Result<Self, HubError> {
        let endpoint =
            std::env::var(ENDPOINT_ENV).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let token = std::env::var(TOKEN_ENV).map_err(|_| HubError::MissingToken)?;
        Ok(Self::new(endpoint, token))
    }

    #[must_use]
    pub fn new(endpoint: String, token: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Upload every file of `artifact_dir` under `repo_name`, creating the
    /// repository with the requested visibility first.
    pub fn push(&self, repo_name: &str, artifact_dir: &Path, private: bool) -> Result<(), HubError> {
        self.create_repo(repo_name, private)?;

        for entry in std::fs::read_dir(artifact_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            self.upload_file(repo_name, &name, &entry.path())?;
        }

        Ok(())
    }

    fn create_repo(&self, repo_name: &str, private: bool) -> Result<(), HubError> {
        let url = format!("{}/api/repos/create", self.endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "name": repo_name,
                "private": private,
                "type": "model",
            }))
            .send()?;

        let status = response.status();
        // 409: the repository already exists, which is fine for a re-push.
        if !status.is_success() && status.as_u16() != 409 {
            return Err(HubError::Status {
                path: url,
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    fn upload_file(&self, repo_name: &str, name: &str, path: &Path) -> Result<(), HubError> {
        let url = format!(
            "{}/api/models/{repo_name}/upload/main/{name}",
            self.endpoint
        );
        tracing::info!("uploading {name} to {repo_name}");

        let bytes = std::fs::read(path)?;
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .body(bytes)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(HubError::Status {
                path: url,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
