//! Typed client for the applications/resumes REST gateway.

pub mod applications;
pub mod client;
pub mod resumes;

pub use applications::{Application, ApplicationQuery, ApplicationStatus, ApplicationsListResponse};
pub use client::ApiClient;
pub use resumes::{Resume, UploadStatus, UploadUrl};
