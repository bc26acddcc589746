//! Domain entities mirrored from persistent storage.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Reserved name of the page seeded at startup and served at `/`.
pub const HOME_PAGE_NAME: &str = "home-page";

/// Reference from a page to a blob held in the file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_id: String,
    pub file_name: String,
    pub mime_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified_utc: OffsetDateTime,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn matches(&self, file_id: &str) -> bool {
        self.file_id.eq_ignore_ascii_case(file_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub id: i64,
    pub name: String,
    pub content: String,
    pub last_modified_utc: OffsetDateTime,
    pub attachments: Vec<Attachment>,
}

impl Page {
    pub fn is_home_page(&self) -> bool {
        is_home_page_name(&self.name)
    }

    pub fn find_attachment(&self, file_id: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|entry| entry.matches(file_id))
    }

    /// Copy of this page carrying new name, content and timestamp, with
    /// `added` appended to the existing attachment list.
    #[must_use]
    pub fn revised(
        &self,
        name: String,
        content: String,
        now: OffsetDateTime,
        added: Option<Attachment>,
    ) -> Self {
        let mut attachments = self.attachments.clone();
        attachments.extend(added);
        Self {
            id: self.id,
            name,
            content,
            last_modified_utc: now,
            attachments,
        }
    }

    /// Copy of this page with every attachment matching `file_id` removed.
    /// Other fields, including the modification time, are left untouched.
    #[must_use]
    pub fn without_attachment(&self, file_id: &str) -> Self {
        let mut next = self.clone();
        next.attachments.retain(|entry| !entry.matches(file_id));
        next
    }
}

pub fn is_home_page_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(HOME_PAGE_NAME)
}

/// Metadata recorded for a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub checksum: String,
    pub uploaded_utc: OffsetDateTime,
}

/// Blob metadata together with its bytes.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub info: FileInfo,
    pub data: Bytes,
}
