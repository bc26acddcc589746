//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{Attachment, FileInfo, Page};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreatePageParams {
    pub name: String,
    pub content: String,
    pub last_modified_utc: OffsetDateTime,
    pub attachments: Vec<Attachment>,
}

/// Page records. Every call runs against its own store session.
#[async_trait]
pub trait PagesRepo: Send + Sync {
    /// All pages ordered by name.
    async fn list_pages(&self) -> Result<Vec<Page>, RepoError>;

    /// Case-insensitive lookup by stored name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Page>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Page>, RepoError>;

    async fn create_page(&self, params: CreatePageParams) -> Result<Page, RepoError>;

    /// Overwrite the record with `page.id`. Returns `false` when no such record exists.
    async fn update_page(&self, page: &Page) -> Result<bool, RepoError>;

    async fn delete_page(&self, id: i64) -> Result<bool, RepoError>;
}

#[derive(Debug, Clone)]
pub struct StoreFileParams {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    pub uploaded_utc: OffsetDateTime,
    pub data: Bytes,
}

/// Blob storage keyed by file id.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(&self, params: StoreFileParams) -> Result<FileInfo, RepoError>;

    async fn find(&self, id: &str) -> Result<Option<FileInfo>, RepoError>;

    async fn download(&self, id: &str) -> Result<Option<Bytes>, RepoError>;

    /// Returns `false` when no blob is stored under `id`.
    async fn delete(&self, id: &str) -> Result<bool, RepoError>;
}
