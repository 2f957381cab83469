use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::client::ApiClient;
use crate::error::ApiError;
use crate::sources::FetchToken;

const APPLICATIONS: &str = "/applications";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Applied,
    Interviewing,
    Offer,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Interviewing => "interviewing",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// A job application. Every field is optional so the same type serves
/// create and partial update payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Application {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ApplicationsListResponse {
    pub applications: Vec<Application>,
    pub count: usize,
}

/// Filters for listing applications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationQuery {
    pub user_id: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub limit: Option<u32>,
}

impl ApplicationQuery {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self { user_id: Some(user_id.into()), ..Default::default() }
    }

    pub fn status(mut self, status: ApplicationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(user_id) = &self.user_id {
            pairs.push(("user_id", user_id.clone()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_owned()));
        }
        if let Some(job_title) = &self.job_title {
            pairs.push(("job_title", job_title.clone()));
        }
        if let Some(company) = &self.company {
            pairs.push(("company", company.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

impl<S: FetchToken> ApiClient<S> {
    pub async fn list_applications(&self, query: &ApplicationQuery) -> Result<ApplicationsListResponse, ApiError> {
        let response = self
            .request_with_query(Method::GET, APPLICATIONS, &query.pairs(), None)
            .await?;
        Ok(response.unwrap_or_default())
    }

    pub async fn get_application(&self, id: &str) -> Result<Application, ApiError> {
        self.request_some(Method::GET, &format!("{}/{}", APPLICATIONS, id), None).await
    }

    pub async fn create_application(&self, data: &Application) -> Result<Application, ApiError> {
        let body = serde_json::to_value(data)?;
        self.request_some(Method::POST, APPLICATIONS, Some(&body)).await
    }

    /// PATCH with only the fields set on `data`.
    pub async fn update_application(&self, id: &str, data: &Application) -> Result<Application, ApiError> {
        let body = serde_json::to_value(data)?;
        self.request_some(Method::PATCH, &format!("{}/{}", APPLICATIONS, id), Some(&body)).await
    }

    pub async fn delete_application(&self, id: &str) -> Result<(), ApiError> {
        self.request::<Value>(Method::DELETE, &format!("{}/{}", APPLICATIONS, id), None)
            .await
            .map(|_| ())
    }
}
