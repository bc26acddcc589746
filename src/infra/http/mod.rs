mod forms;
mod middleware;
mod wiki;

pub use forms::{FormError, read_page_input};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use wiki::{HttpState, build_router};

use crate::application::error::{ErrorReport, GENERIC_FAILURE_MESSAGE, HttpError};
use crate::application::repos::RepoError;
use crate::application::wiki::WikiError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlx::Error as SqlxError;

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Map a repository error to a response that keeps store details out of the body.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::Duplicate { constraint } => {
            HttpError::new(source, StatusCode::CONFLICT, "Duplicate record", constraint)
        }
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::InvalidInput { message } => {
            HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        RepoError::Integrity { message } => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            GENERIC_FAILURE_MESSAGE,
            message,
        ),
        RepoError::Timeout => HttpError::new(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
            "database timeout",
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            GENERIC_FAILURE_MESSAGE,
            message,
        ),
    }
}

pub fn wiki_error_to_http(source: &'static str, err: WikiError) -> HttpError {
    match err {
        WikiError::Repo(repo) => repo_error_to_http(source, repo),
        WikiError::PageNotFound { .. } => {
            HttpError::from_error(source, StatusCode::NOT_FOUND, "Resource not found", &err)
        }
        WikiError::Validation(_) | WikiError::HomePageProtected { .. } => HttpError::from_error(
            source,
            StatusCode::BAD_REQUEST,
            "Request could not be processed",
            &err,
        ),
        other => HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            GENERIC_FAILURE_MESSAGE,
            &other,
        ),
    }
}
