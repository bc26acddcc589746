use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::{
    application::repos::{FileStore, RepoError, StoreFileParams},
    domain::entities::FileInfo,
};

use super::{SqliteRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct FileRow {
    id: String,
    filename: String,
    mime_type: String,
    size_bytes: i64,
    checksum: String,
    uploaded_utc: OffsetDateTime,
}

impl From<FileRow> for FileInfo {
    fn from(row: FileRow) -> Self {
        Self {
            id: row.id,
            filename: row.filename,
            mime_type: row.mime_type,
            size_bytes: row.size_bytes,
            checksum: row.checksum,
            uploaded_utc: row.uploaded_utc,
        }
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let bytes: &[u8] = &digest;
    hex::encode(bytes)
}

#[async_trait]
impl FileStore for SqliteRepositories {
    async fn upload(&self, params: StoreFileParams) -> Result<FileInfo, RepoError> {
        if params.data.is_empty() {
            return Err(RepoError::InvalidInput {
                message: "uploaded file is empty".to_string(),
            });
        }

        let size_bytes = i64::try_from(params.data.len()).map_err(|_| RepoError::InvalidInput {
            message: "uploaded file size exceeds supported range".to_string(),
        })?;
        let info = FileInfo {
            id: params.id,
            filename: params.filename,
            mime_type: params.mime_type,
            size_bytes,
            checksum: sha256_hex(&params.data),
            uploaded_utc: params.uploaded_utc,
        };

        let mut conn = self.session().await?;
        sqlx::query(
            r#"
            INSERT INTO files (id, filename, mime_type, size_bytes, checksum, uploaded_utc, data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&info.id)
        .bind(&info.filename)
        .bind(&info.mime_type)
        .bind(info.size_bytes)
        .bind(&info.checksum)
        .bind(info.uploaded_utc)
        .bind(params.data.as_ref())
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

        Ok(info)
    }

    async fn find(&self, id: &str) -> Result<Option<FileInfo>, RepoError> {
        let mut conn = self.session().await?;
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT id, filename, mime_type, size_bytes, checksum, uploaded_utc
            FROM files
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(FileInfo::from))
    }

    async fn download(&self, id: &str) -> Result<Option<Bytes>, RepoError> {
        let mut conn = self.session().await?;
        let data = sqlx::query_scalar::<_, Vec<u8>>("SELECT data FROM files WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        Ok(data.map(Bytes::from))
    }

    async fn delete(&self, id: &str) -> Result<bool, RepoError> {
        let mut conn = self.session().await?;
        let result = sqlx::query("DELETE FROM files WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
