//! Page edit form input and its validation rules.

use bytes::Bytes;

use crate::domain::entities::{HOME_PAGE_NAME, is_home_page_name};
use crate::domain::error::ValidationErrors;

pub const FIELD_NAME: &str = "Name";
pub const FIELD_CONTENT: &str = "Content";
pub const FIELD_ATTACHMENT: &str = "Attachment";

pub const NAME_REQUIRED: &str = "Name is required";
pub const CONTENT_REQUIRED: &str = "Content is required";
pub const HOME_PAGE_RENAME: &str =
    "You cannot modify home page name. Please keep it home-page";

/// A file submitted alongside a page edit.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub mime_type: String,
    pub data: Bytes,
}

/// A create-or-update request for a page. `id` is `None` for new pages.
#[derive(Debug, Clone, Default)]
pub struct PageInput {
    pub id: Option<i64>,
    pub name: String,
    pub content: String,
    pub attachment: Option<UploadedFile>,
}

impl PageInput {
    /// Field checks that need no store access.
    ///
    /// `route_page_name` is the page the form was posted to; a form posted
    /// to the home page must keep the home page name.
    pub fn validate(&self, route_page_name: Option<&str>) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.name.trim().is_empty() {
            errors.push(FIELD_NAME, NAME_REQUIRED);
        } else if route_page_name.is_some_and(is_home_page_name)
            && !self.name.trim().eq_ignore_ascii_case(HOME_PAGE_NAME)
        {
            errors.push(FIELD_NAME, HOME_PAGE_RENAME);
        }

        if self.content.trim().is_empty() {
            errors.push(FIELD_CONTENT, CONTENT_REQUIRED);
        }

        errors.into_result()
    }
}
