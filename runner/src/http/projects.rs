//! Project API client

use platform_api::{ProjectUpdate, RemoteProject};
use reqwest::Method;

use crate::errors::RunnerError;
use crate::http::client::PlatformClient;

impl PlatformClient {
    /// Fetch the configured project
    pub async fn get_project(&self) -> Result<RemoteProject, RunnerError> {
        let path = self.project_path();
        self.request::<RemoteProject, ()>(Method::GET, &path, None, "Failed to fetch project")
            .await
    }

    /// Apply a partial update and return the project as stored remotely
    pub async fn update_project(&self, update: &ProjectUpdate) -> Result<RemoteProject, RunnerError> {
        let path = self.project_path();
        self.request(Method::PATCH, &path, Some(update), "Failed to update project")
            .await
    }
}
