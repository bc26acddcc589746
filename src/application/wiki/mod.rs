//! Page repository: the only component that touches the page and blob stores.
//!
//! Reads of the full page list go through the injected [`PageListCache`];
//! every successful mutation of the page set removes the cached list.
//! Expected refusals (not found, protected home page, validation) and store
//! failures are all returned as [`WikiError`] values and logged here, with
//! the operation name and the id involved.

mod error;
mod input;

pub use error::{DeleteAttachmentFailure, WikiError};
pub use input::{
    CONTENT_REQUIRED, FIELD_ATTACHMENT, FIELD_CONTENT, FIELD_NAME, HOME_PAGE_RENAME,
    NAME_REQUIRED, PageInput, UploadedFile,
};

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::repos::{
    CreatePageParams, FileStore, PagesRepo, RepoError, StoreFileParams,
};
use crate::cache::{CacheConfig, PAGE_LIST_KEY, PageListCache};
use crate::domain::entities::{
    Attachment, HOME_PAGE_NAME, Page, StoredFile, is_home_page_name,
};
use crate::domain::error::ValidationErrors;
use crate::domain::slug::{normalize_page_name, to_kebab_case};

const SOURCE: &str = "application::wiki";

pub const DEFAULT_HOME_PAGE_CONTENT: &str = "# Welcome\n\n\
This is the home page of your wiki. Use **Edit** to change it, or type a title \
into the *New page* box to start a new page.";

#[derive(Clone)]
pub struct WikiService {
    pages: Arc<dyn PagesRepo>,
    files: Arc<dyn FileStore>,
    cache: Arc<dyn PageListCache>,
    page_list_ttl: Duration,
}

impl WikiService {
    pub fn new(
        pages: Arc<dyn PagesRepo>,
        files: Arc<dyn FileStore>,
        cache: Arc<dyn PageListCache>,
        config: CacheConfig,
    ) -> Self {
        Self {
            pages,
            files,
            cache,
            page_list_ttl: config.page_list_ttl,
        }
    }

    /// All pages ordered by name, served from the cache while it is fresh.
    pub async fn list_all_pages(&self) -> Result<Vec<Page>, WikiError> {
        if let Some(pages) = self.cache.get() {
            counter!("wiki_page_list_cache_hit_total").increment(1);
            return Ok(pages);
        }
        counter!("wiki_page_list_cache_miss_total").increment(1);

        let pages = self.pages.list_pages().await.map_err(|err| {
            error!(
                target = SOURCE,
                op = "list_all_pages",
                error = %err,
                "failed to list pages"
            );
            WikiError::from(err)
        })?;

        self.cache.set(pages.clone(), self.page_list_ttl);
        Ok(pages)
    }

    /// Case-insensitive lookup. The name is normalised the same way a save
    /// normalises it, so `My Trip` finds `my-trip`.
    pub async fn get_page(&self, name: &str) -> Result<Option<Page>, WikiError> {
        let normalized = normalize_page_name(name);
        if normalized.is_empty() {
            return Ok(None);
        }

        self.pages.find_by_name(&normalized).await.map_err(|err| {
            error!(
                target = SOURCE,
                op = "get_page",
                page_name = %normalized,
                error = %err,
                "failed to load page"
            );
            WikiError::from(err)
        })
    }

    pub async fn get_page_by_id(&self, id: i64) -> Result<Option<Page>, WikiError> {
        self.pages.find_by_id(id).await.map_err(|err| {
            error!(
                target = SOURCE,
                op = "get_page_by_id",
                page_id = id,
                error = %err,
                "failed to load page"
            );
            WikiError::from(err)
        })
    }

    /// Whether a page exists for a free-form title, kebab-casing it first.
    pub async fn page_exists(&self, title: &str) -> Result<bool, WikiError> {
        let name = to_kebab_case(title);
        if name.is_empty() {
            return Ok(false);
        }
        Ok(self.get_page(&name).await?.is_some())
    }

    /// Create the home page with starter content unless it already exists.
    pub async fn ensure_home_page(&self) -> Result<Page, WikiError> {
        if let Some(page) = self.get_page(HOME_PAGE_NAME).await? {
            return Ok(page);
        }

        let input = PageInput {
            id: None,
            name: HOME_PAGE_NAME.to_string(),
            content: DEFAULT_HOME_PAGE_CONTENT.to_string(),
            attachment: None,
        };
        let page = self.save_page(&input).await?;
        info!(target = SOURCE, page_id = page.id, "home page created");
        Ok(page)
    }

    /// Create or update a page, storing an optional attachment first.
    ///
    /// All checks run before the store is touched. If the attachment upload
    /// succeeds but the page write fails, the blob stays behind unreferenced.
    pub async fn save_page(&self, input: &PageInput) -> Result<Page, WikiError> {
        input.validate(None)?;
        let name = normalize_page_name(&input.name);
        if name.is_empty() {
            return Err(ValidationErrors::single(FIELD_NAME, NAME_REQUIRED).into());
        }

        let existing = match input.id {
            Some(id) => self.load_for_save(id).await?,
            None => None,
        };

        if let Some(page) = &existing
            && page.is_home_page()
            && !is_home_page_name(&name)
        {
            warn!(
                target = SOURCE,
                op = "save_page",
                page_id = page.id,
                requested_name = %name,
                "refusing to rename home page"
            );
            return Err(ValidationErrors::single(FIELD_NAME, HOME_PAGE_RENAME).into());
        }

        self.ensure_name_available(&name, existing.as_ref().map(|page| page.id))
            .await?;

        let now = OffsetDateTime::now_utc();
        let attachment = match &input.attachment {
            Some(file) => Some(self.store_attachment(&name, file, now).await?),
            None => None,
        };

        let saved = match existing {
            Some(page) => {
                let revised = page.revised(name, input.content.clone(), now, attachment);
                self.write_existing(revised).await?
            }
            None => {
                let params = CreatePageParams {
                    name,
                    content: input.content.clone(),
                    last_modified_utc: now,
                    attachments: attachment.into_iter().collect(),
                };
                self.write_new(params).await?
            }
        };

        self.invalidate_page_list();
        info!(
            target = SOURCE,
            op = "save_page",
            page_id = saved.id,
            page_name = %saved.name,
            attachments = saved.attachments.len(),
            "page saved"
        );
        Ok(saved)
    }

    /// Delete a page and every blob it references, blobs first.
    ///
    /// Not atomic: if the record delete fails after blobs were removed, the
    /// blobs are not restored.
    pub async fn delete_page(&self, id: i64, home_page_name: &str) -> Result<(), WikiError> {
        let page = match self.pages.find_by_id(id).await {
            Ok(Some(page)) => page,
            Ok(None) => {
                warn!(target = SOURCE, op = "delete_page", page_id = id, "page not found");
                return Err(WikiError::PageNotFound { id });
            }
            Err(err) => return Err(self.log_repo_failure("delete_page", id, err)),
        };

        if page.name.eq_ignore_ascii_case(home_page_name) {
            warn!(
                target = SOURCE,
                op = "delete_page",
                page_id = id,
                "refusing to delete home page"
            );
            return Err(WikiError::HomePageProtected { id });
        }

        for attachment in &page.attachments {
            match self.files.delete(&attachment.file_id).await {
                Ok(true) => {}
                Ok(false) => warn!(
                    target = SOURCE,
                    op = "delete_page",
                    page_id = id,
                    file_id = %attachment.file_id,
                    "attachment blob already missing"
                ),
                Err(err) => return Err(self.log_repo_failure("delete_page", id, err)),
            }
        }

        match self.pages.delete_page(id).await {
            Ok(true) => {}
            Ok(false) => {
                error!(
                    target = SOURCE,
                    op = "delete_page",
                    page_id = id,
                    blobs_deleted = page.attachments.len(),
                    "page record vanished after its blobs were deleted"
                );
                return Err(WikiError::PageNotDeleted { id });
            }
            Err(err) => return Err(self.log_repo_failure("delete_page", id, err)),
        }

        self.invalidate_page_list();
        info!(
            target = SOURCE,
            op = "delete_page",
            page_id = id,
            page_name = %page.name,
            "page deleted"
        );
        Ok(())
    }

    /// Remove one attachment: the blob first, then the page's reference.
    /// Only attachments listed on the page itself are touched.
    ///
    /// If the blob is gone but the page update fails, the returned failure
    /// carries the page as stored, which still lists the attachment.
    pub async fn delete_attachment(
        &self,
        page_id: i64,
        file_id: &str,
    ) -> Result<Page, DeleteAttachmentFailure> {
        let page = match self.pages.find_by_id(page_id).await {
            Ok(Some(page)) => page,
            Ok(None) => {
                warn!(
                    target = SOURCE,
                    op = "delete_attachment",
                    page_id,
                    file_id,
                    "page not found"
                );
                return Err(DeleteAttachmentFailure::new(
                    None,
                    WikiError::PageNotFound { id: page_id },
                ));
            }
            Err(err) => {
                let err = self.log_repo_failure("delete_attachment", page_id, err);
                return Err(DeleteAttachmentFailure::new(None, err));
            }
        };

        if page.find_attachment(file_id).is_none() {
            warn!(
                target = SOURCE,
                op = "delete_attachment",
                page_id,
                file_id,
                "attachment not listed on page"
            );
            let err = WikiError::BlobNotDeleted {
                file_id: file_id.to_string(),
            };
            return Err(DeleteAttachmentFailure::new(Some(page), err));
        }

        match self.files.delete(file_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    target = SOURCE,
                    op = "delete_attachment",
                    page_id,
                    file_id,
                    "blob could not be deleted"
                );
                let err = WikiError::BlobNotDeleted {
                    file_id: file_id.to_string(),
                };
                return Err(DeleteAttachmentFailure::new(Some(page), err));
            }
            Err(err) => {
                let err = self.log_repo_failure("delete_attachment", page_id, err);
                return Err(DeleteAttachmentFailure::new(Some(page), err));
            }
        }

        let updated = page.without_attachment(file_id);
        match self.pages.update_page(&updated).await {
            Ok(true) => {
                self.invalidate_page_list();
                info!(
                    target = SOURCE,
                    op = "delete_attachment",
                    page_id,
                    file_id,
                    "attachment deleted"
                );
                Ok(updated)
            }
            Ok(false) => {
                error!(
                    target = SOURCE,
                    op = "delete_attachment",
                    page_id,
                    file_id,
                    "blob deleted but page record was not updated"
                );
                Err(DeleteAttachmentFailure::new(
                    Some(page),
                    WikiError::PageNotUpdated { id: page_id },
                ))
            }
            Err(err) => {
                let err = self.log_repo_failure("delete_attachment", page_id, err);
                Err(DeleteAttachmentFailure::new(Some(page), err))
            }
        }
    }

    /// Blob metadata and bytes, or `None` when nothing is stored under `file_id`.
    pub async fn get_file(&self, file_id: &str) -> Result<Option<StoredFile>, WikiError> {
        let lookup = async {
            let Some(info) = self.files.find(file_id).await? else {
                return Ok(None);
            };
            let data = self.files.download(file_id).await?;
            Ok::<_, RepoError>(data.map(|data| StoredFile { info, data }))
        };

        lookup.await.map_err(|err| {
            error!(
                target = SOURCE,
                op = "get_file",
                file_id,
                error = %err,
                "failed to read file"
            );
            WikiError::from(err)
        })
    }

    async fn load_for_save(&self, id: i64) -> Result<Option<Page>, WikiError> {
        self.pages
            .find_by_id(id)
            .await
            .map_err(|err| self.log_repo_failure("save_page", id, err))
    }

    async fn ensure_name_available(
        &self,
        name: &str,
        own_id: Option<i64>,
    ) -> Result<(), WikiError> {
        let holder = self.pages.find_by_name(name).await.map_err(|err| {
            error!(
                target = SOURCE,
                op = "save_page",
                page_name = %name,
                error = %err,
                "failed to check page name"
            );
            WikiError::from(err)
        })?;

        match holder {
            Some(other) if Some(other.id) != own_id => {
                warn!(
                    target = SOURCE,
                    op = "save_page",
                    page_name = %name,
                    holder_id = other.id,
                    "page name already taken"
                );
                Err(name_taken(name))
            }
            _ => Ok(()),
        }
    }

    async fn store_attachment(
        &self,
        page_name: &str,
        file: &UploadedFile,
        now: OffsetDateTime,
    ) -> Result<Attachment, WikiError> {
        if file.data.is_empty() {
            return Err(ValidationErrors::single(
                FIELD_ATTACHMENT,
                format!("{} is empty", file.filename),
            )
            .into());
        }

        let params = StoreFileParams {
            id: Uuid::new_v4().to_string(),
            filename: file.filename.clone(),
            mime_type: file.mime_type.clone(),
            uploaded_utc: now,
            data: file.data.clone(),
        };

        let info = self.files.upload(params).await.map_err(|err| {
            error!(
                target = SOURCE,
                op = "save_page",
                page_name,
                file_name = %file.filename,
                error = %err,
                "failed to store attachment"
            );
            WikiError::from(err)
        })?;

        Ok(Attachment {
            file_id: info.id,
            file_name: info.filename,
            mime_type: info.mime_type,
            last_modified_utc: now,
        })
    }

    async fn write_existing(&self, page: Page) -> Result<Page, WikiError> {
        match self.pages.update_page(&page).await {
            Ok(true) => Ok(page),
            Ok(false) => {
                warn!(
                    target = SOURCE,
                    op = "save_page",
                    page_id = page.id,
                    "page disappeared before update"
                );
                Err(WikiError::PageNotUpdated { id: page.id })
            }
            Err(RepoError::Duplicate { .. }) => {
                warn!(
                    target = SOURCE,
                    op = "save_page",
                    page_id = page.id,
                    page_name = %page.name,
                    "page name taken before update"
                );
                Err(name_taken(&page.name))
            }
            Err(err) => Err(self.log_repo_failure("save_page", page.id, err)),
        }
    }

    async fn write_new(&self, params: CreatePageParams) -> Result<Page, WikiError> {
        let name = params.name.clone();
        self.pages.create_page(params).await.map_err(|err| {
            error!(
                target = SOURCE,
                op = "save_page",
                page_name = %name,
                error = %err,
                "failed to create page"
            );
            match err {
                RepoError::Duplicate { .. } => name_taken(&name),
                other => WikiError::from(other),
            }
        })
    }

    fn invalidate_page_list(&self) {
        self.cache.remove();
        counter!("wiki_page_list_cache_invalidate_total").increment(1);
        debug!(target = SOURCE, key = PAGE_LIST_KEY, "page list invalidated");
    }

    fn log_repo_failure(&self, op: &'static str, page_id: i64, err: RepoError) -> WikiError {
        error!(
            target = SOURCE,
            op,
            page_id,
            error = %err,
            "store operation failed"
        );
        WikiError::from(err)
    }
}

fn name_taken(name: &str) -> WikiError {
    ValidationErrors::single(FIELD_NAME, format!("A page named {name} already exists")).into()
}
