use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use shared::{
    domain::SectionId,
    error::ApiError,
    protocol::{AddToSectionRequest, AddToSectionResponse, RemoveFromSectionForm},
};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Result, RosterError};

/// The four calls the roster page makes against the host application.
#[async_trait]
pub trait RosterBackend: Send + Sync {
    async fn fetch_member_fragment(&self, section_id: SectionId) -> Result<String>;
    async fn fetch_candidate_fragment(&self, section_id: SectionId) -> Result<String>;
    async fn remove_from_section(&self, form: &RemoveFromSectionForm) -> Result<()>;
    async fn add_to_section(&self, request: &AddToSectionRequest) -> Result<AddToSectionResponse>;
}

/// Endpoint layout of the section management tool, relative to its mount point.
#[derive(Debug, Clone)]
pub struct RosterEndpoints {
    base: Url,
}

impl RosterEndpoints {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn member_list(&self, section_id: SectionId) -> Result<Url> {
        Ok(self.base.join(&format!("section_user_list/{}", section_id.0))?)
    }

    pub fn candidate_list(&self, section_id: SectionId) -> Result<Url> {
        Ok(self.base.join(&format!("sections/{}/classlist", section_id.0))?)
    }

    pub fn remove_from_section(&self) -> Result<Url> {
        Ok(self.base.join("remove_from_section")?)
    }

    pub fn add_to_section(&self) -> Result<Url> {
        Ok(self.base.join("add_to_section")?)
    }
}

pub struct HttpRosterBackend {
    http: Client,
    endpoints: RosterEndpoints,
}

impl HttpRosterBackend {
    pub fn new(endpoints: RosterEndpoints, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(RosterError::ClientBuild)?;
        Ok(Self { http, endpoints })
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        debug!(endpoint = %url, "roster: GET");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| request_error(&url, source))?;
        let response = ensure_success(&url, response).await?;
        response
            .text()
            .await
            .map_err(|source| request_error(&url, source))
    }
}

fn request_error(url: &Url, source: reqwest::Error) -> RosterError {
    warn!(endpoint = %url, error = %source, "roster: request failed");
    RosterError::Request {
        endpoint: url.to_string(),
        source,
    }
}

async fn ensure_success(url: &Url, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let source = ApiError::from_body(status.as_u16(), &body);
    warn!(
        endpoint = %url,
        status = status.as_u16(),
        message = %source.message,
        "roster: request rejected"
    );
    Err(RosterError::Rejected {
        endpoint: url.to_string(),
        source,
    })
}

#[async_trait]
impl RosterBackend for HttpRosterBackend {
    async fn fetch_member_fragment(&self, section_id: SectionId) -> Result<String> {
        self.get_text(self.endpoints.member_list(section_id)?).await
    }

    async fn fetch_candidate_fragment(&self, section_id: SectionId) -> Result<String> {
        self.get_text(self.endpoints.candidate_list(section_id)?)
            .await
    }

    async fn remove_from_section(&self, form: &RemoveFromSectionForm) -> Result<()> {
        let url = self.endpoints.remove_from_section()?;
        debug!(
            endpoint = %url,
            user_section_id = form.user_section_id.0,
            section_id = form.section_id.0,
            "roster: POST remove"
        );
        let response = self
            .http
            .post(url.clone())
            .form(form)
            .send()
            .await
            .map_err(|source| request_error(&url, source))?;
        ensure_success(&url, response).await?;
        Ok(())
    }

    async fn add_to_section(&self, request: &AddToSectionRequest) -> Result<AddToSectionResponse> {
        let url = self.endpoints.add_to_section()?;
        debug!(
            endpoint = %url,
            section_id = request.section_id.0,
            batch = request.users_to_add.len(),
            "roster: POST add"
        );
        let response = self
            .http
            .post(url.clone())
            .json(request)
            .send()
            .await
            .map_err(|source| request_error(&url, source))?;
        let response = ensure_success(&url, response).await?;
        let body = response
            .text()
            .await
            .map_err(|source| request_error(&url, source))?;
        serde_json::from_str(&body).map_err(|err| RosterError::InvalidResponse {
            endpoint: url.to_string(),
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
