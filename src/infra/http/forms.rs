//! Multipart parsing for the page editor form.

use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use thiserror::Error;
use tracing::error;

use crate::application::wiki::{PageInput, UploadedFile};

const SOURCE: &str = "infra::http::forms";
const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum FormError {
    #[error("request body exceeds the configured limit")]
    TooLarge,
    #[error("malformed multipart payload: {0}")]
    Malformed(String),
    #[error("`Id` is not a number: {0}")]
    InvalidId(String),
}

impl FormError {
    pub fn status(&self) -> StatusCode {
        match self {
            FormError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            FormError::Malformed(_) | FormError::InvalidId(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Read `Id`, `Name`, `Content` and `Attachment` from the editor form.
///
/// A file part with an empty filename is treated as "no file chosen".
pub async fn read_page_input(multipart: &mut Multipart) -> Result<PageInput, FormError> {
    let mut input = PageInput::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                let status = err.status();
                error!(
                    target = SOURCE,
                    status = status.as_u16(),
                    error = %err,
                    "failed to read multipart field"
                );
                return Err(if status == StatusCode::PAYLOAD_TOO_LARGE {
                    FormError::TooLarge
                } else {
                    FormError::Malformed(err.to_string())
                });
            }
        };

        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "Id" => {
                let value = read_text(field).await?;
                let value = value.trim();
                if !value.is_empty() {
                    let id = value
                        .parse::<i64>()
                        .map_err(|_| FormError::InvalidId(value.to_string()))?;
                    input.id = Some(id);
                }
            }
            "Name" => input.name = read_text(field).await?,
            "Content" => input.content = read_text(field).await?,
            "Attachment" => {
                let filename = field
                    .file_name()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string);
                let Some(filename) = filename else {
                    continue;
                };

                let mime_type = field
                    .content_type()
                    .map(|mime| mime.to_string())
                    .filter(|mime| !mime.is_empty() && mime != FALLBACK_MIME)
                    .or_else(|| {
                        mime_guess::from_path(&filename)
                            .first()
                            .map(|mime| mime.essence_str().to_string())
                    })
                    .unwrap_or_else(|| FALLBACK_MIME.to_string());

                let data = field.bytes().await.map_err(|err| {
                    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        FormError::TooLarge
                    } else {
                        FormError::Malformed(err.to_string())
                    }
                })?;

                input.attachment = Some(UploadedFile {
                    filename,
                    mime_type,
                    data,
                });
            }
            _ => {}
        }
    }

    Ok(input)
}

async fn read_text(field: axum_extra::extract::multipart::Field) -> Result<String, FormError> {
    field.text().await.map_err(|err| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            FormError::TooLarge
        } else {
            FormError::Malformed(err.to_string())
        }
    })
}
