use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{CreatePageParams, PagesRepo, RepoError},
    domain::entities::{Attachment, Page},
};

use super::{SqliteRepositories, map_sqlx_error};

const LIST_PAGES: &str = "SELECT id, name, content, last_modified_utc, attachments \
     FROM pages ORDER BY name COLLATE NOCASE ASC, id ASC";

const FIND_BY_NAME: &str = "SELECT id, name, content, last_modified_utc, attachments \
     FROM pages WHERE name = ?1 COLLATE NOCASE ORDER BY id ASC LIMIT 1";

const FIND_BY_ID: &str = "SELECT id, name, content, last_modified_utc, attachments \
     FROM pages WHERE id = ?1";

#[derive(sqlx::FromRow)]
struct PageRow {
    id: i64,
    name: String,
    content: String,
    last_modified_utc: OffsetDateTime,
    attachments: String,
}

impl TryFrom<PageRow> for Page {
    type Error = RepoError;

    fn try_from(row: PageRow) -> Result<Self, Self::Error> {
        let attachments: Vec<Attachment> =
            serde_json::from_str(&row.attachments).map_err(|err| RepoError::Integrity {
                message: format!("page `{}` has unreadable attachments: {err}", row.id),
            })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            content: row.content,
            last_modified_utc: row.last_modified_utc,
            attachments,
        })
    }
}

fn encode_attachments(attachments: &[Attachment]) -> Result<String, RepoError> {
    serde_json::to_string(attachments).map_err(|err| RepoError::InvalidInput {
        message: format!("attachments cannot be encoded: {err}"),
    })
}

#[async_trait]
impl PagesRepo for SqliteRepositories {
    async fn list_pages(&self) -> Result<Vec<Page>, RepoError> {
        let mut conn = self.session().await?;
        let rows = sqlx::query_as::<_, PageRow>(LIST_PAGES)
            .fetch_all(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(Page::try_from).collect()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Page>, RepoError> {
        let mut conn = self.session().await?;
        let row = sqlx::query_as::<_, PageRow>(FIND_BY_NAME)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        row.map(Page::try_from).transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Page>, RepoError> {
        let mut conn = self.session().await?;
        let row = sqlx::query_as::<_, PageRow>(FIND_BY_ID)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        row.map(Page::try_from).transpose()
    }

    async fn create_page(&self, params: CreatePageParams) -> Result<Page, RepoError> {
        let attachments = encode_attachments(&params.attachments)?;
        let mut conn = self.session().await?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO pages (name, content, last_modified_utc, attachments)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id
            "#,
        )
        .bind(&params.name)
        .bind(&params.content)
        .bind(params.last_modified_utc)
        .bind(attachments)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

        Ok(Page {
            id,
            name: params.name,
            content: params.content,
            last_modified_utc: params.last_modified_utc,
            attachments: params.attachments,
        })
    }

    async fn update_page(&self, page: &Page) -> Result<bool, RepoError> {
        let attachments = encode_attachments(&page.attachments)?;
        let mut conn = self.session().await?;

        let result = sqlx::query(
            r#"
            UPDATE pages
            SET name = ?1, content = ?2, last_modified_utc = ?3, attachments = ?4
            WHERE id = ?5
            "#,
        )
        .bind(&page.name)
        .bind(&page.content)
        .bind(page.last_modified_utc)
        .bind(attachments)
        .bind(page.id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_page(&self, id: i64) -> Result<bool, RepoError> {
        let mut conn = self.session().await?;
        let result = sqlx::query("DELETE FROM pages WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
