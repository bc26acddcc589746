use thiserror::Error;

use crate::application::repos::RepoError;
use crate::domain::entities::Page;
use crate::domain::error::ValidationErrors;

#[derive(Debug, Error)]
pub enum WikiError {
    #[error("page `{id}` not found")]
    PageNotFound { id: i64 },
    #[error("page `{id}` is the home page and cannot be deleted")]
    HomePageProtected { id: i64 },
    #[error("page `{id}` could not be deleted")]
    PageNotDeleted { id: i64 },
    #[error("file `{file_id}` could not be deleted from storage")]
    BlobNotDeleted { file_id: String },
    #[error("page `{id}` was not updated")]
    PageNotUpdated { id: i64 },
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl WikiError {
    /// Expected refusals that carry no underlying fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::PageNotFound { .. }
                | Self::HomePageProtected { .. }
                | Self::BlobNotDeleted { .. }
                | Self::Validation(_)
        )
    }
}

/// Failure of `delete_attachment`, carrying the page as it was last read
/// when it could be resolved.
#[derive(Debug, Error)]
#[error("attachment could not be deleted")]
pub struct DeleteAttachmentFailure {
    pub page: Option<Page>,
    #[source]
    pub error: WikiError,
}

impl DeleteAttachmentFailure {
    pub(crate) fn new(page: Option<Page>, error: impl Into<WikiError>) -> Self {
        Self {
            page,
            error: error.into(),
        }
    }
}
