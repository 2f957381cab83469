use http::{header, Method};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::api::client::ApiClient;
use crate::error::ApiError;
use crate::sources::FetchToken;

const RESUMES: &str = "/resumes";
const UPLOAD_URL: &str = "/resumes/upload-url";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resume {
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    pub s3_key: String,
    pub upload_status: UploadStatus,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Pre-signed upload target issued by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadUrl {
    pub presigned_url: String,
    pub resume_id: String,
}

impl<S: FetchToken> ApiClient<S> {
    pub async fn list_resumes(&self) -> Result<Vec<Resume>, ApiError> {
        Ok(self.request(Method::GET, RESUMES, None).await?.unwrap_or_default())
    }

    pub async fn get_resume(&self, id: &str) -> Result<Resume, ApiError> {
        self.request_some(Method::GET, &format!("{}/{}", RESUMES, id), None).await
    }

    /// Only the file name of a resume can be changed.
    pub async fn rename_resume(&self, id: &str, file_name: &str) -> Result<Resume, ApiError> {
        let body = json!({ "file_name": file_name });
        self.request_some(Method::PATCH, &format!("{}/{}", RESUMES, id), Some(&body)).await
    }

    /// Creates a pending resume and returns where to upload its bytes.
    pub async fn request_upload_url(&self, file_name: &str, content_type: &str) -> Result<UploadUrl, ApiError> {
        let body = json!({ "file_name": file_name, "content_type": content_type });
        self.request_some(Method::POST, UPLOAD_URL, Some(&body)).await
    }

    /// Marks an uploaded resume as completed.
    pub async fn confirm_upload(&self, resume_id: &str) -> Result<Resume, ApiError> {
        let body = json!({ "resume_id": resume_id });
        self.request_some(Method::POST, RESUMES, Some(&body)).await
    }

    /// Request a pre-signed URL, PUT the file to it, then confirm.
    ///
    /// The PUT goes straight to object storage and carries no bearer token.
    pub async fn upload_resume(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Resume, ApiError> {
        let target = self.request_upload_url(file_name, content_type).await?;
        info!(resume_id = %target.resume_id, file_name, "uploading resume");

        let response = self
            .http()
            .put(&target.presigned_url)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        self.confirm_upload(&target.resume_id).await
    }
}
