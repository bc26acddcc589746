use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Form, Path, Query, State,
        rejection::FormRejection,
    },
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::Multipart;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        render::renderer,
        tagging::TopicClassifier,
        wiki::{PageInput, WikiError, WikiService},
    },
    domain::{
        entities::{HOME_PAGE_NAME, Page},
        error::ValidationErrors,
        slug::{display_title, to_kebab_case},
    },
    infra::db::SqliteRepositories,
    presentation::views::{
        EditTemplate, EditorView, ErrorPageView, ErrorTemplate, LayoutContext, PageTemplate,
        PageView, SidePanelView, render_not_found_response, render_template_response,
    },
};

use super::{
    db_health_response,
    forms::read_page_input,
    middleware::{log_responses, set_request_context},
    wiki_error_to_http,
};

const SOURCE: &str = "infra::http::wiki";

#[derive(Clone)]
pub struct HttpState {
    pub wiki: Arc<WikiService>,
    pub db: Arc<SqliteRepositories>,
    pub classifier: Option<Arc<dyn TopicClassifier>>,
    pub upload_limit_bytes: usize,
}

pub fn build_router(state: HttpState) -> Router {
    let upload_limit = state.upload_limit_bytes;

    Router::new()
        .route("/", get(home))
        .route("/new-page", get(new_page))
        .route("/edit", get(edit_page))
        .route("/attachment", get(download_attachment))
        .route("/check-page-exists", get(check_page_exists))
        .route("/delete-page", post(delete_page))
        .route("/delete-attachment", post(delete_attachment))
        .route("/get-tags", post(get_tags))
        .route("/_health/db", get(db_health))
        .route("/{page_name}", get(show_page).post(save_page))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageNameQuery {
    #[serde(rename = "pageName")]
    page_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileIdQuery {
    #[serde(rename = "fileId")]
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct DeletePageForm {
    #[serde(rename = "Id")]
    id: i64,
}

#[derive(Debug, Deserialize)]
struct DeleteAttachmentForm {
    #[serde(rename = "Id")]
    file_id: String,
    #[serde(rename = "PageId")]
    page_id: i64,
}

async fn home(State(state): State<HttpState>) -> Response {
    match state.wiki.get_page(HOME_PAGE_NAME).await {
        Ok(Some(page)) => render_page(&state, &page).await,
        Ok(None) => Redirect::to(&format!("/{HOME_PAGE_NAME}")).into_response(),
        Err(err) => failure_response(&state, "infra::http::wiki::home", err).await,
    }
}

async fn new_page(Query(query): Query<PageNameQuery>) -> Redirect {
    let name = to_kebab_case(&query.page_name);
    if name.is_empty() {
        Redirect::to("/")
    } else {
        Redirect::to(&format!("/{name}"))
    }
}

async fn edit_page(State(state): State<HttpState>, Query(query): Query<PageNameQuery>) -> Response {
    let side_panel = match side_panel(&state, true).await {
        Ok(panel) => panel,
        Err(response) => return response,
    };

    match state.wiki.get_page(&query.page_name).await {
        Ok(Some(page)) => {
            let view = LayoutContext::new(
                format!("Edit {}", display_title(&page.name)),
                side_panel,
                EditorView::for_page(&page),
            );
            render_template_response(EditTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(side_panel),
        Err(err) => failure_response(&state, "infra::http::wiki::edit_page", err).await,
    }
}

async fn show_page(State(state): State<HttpState>, Path(page_name): Path<String>) -> Response {
    match state.wiki.get_page(&page_name).await {
        Ok(Some(page)) => render_page(&state, &page).await,
        Ok(None) => {
            let side_panel = match side_panel(&state, true).await {
                Ok(panel) => panel,
                Err(response) => return response,
            };
            let view = LayoutContext::new(
                display_title(&page_name),
                side_panel,
                EditorView::for_new(&page_name),
            );
            render_template_response(EditTemplate { view }, StatusCode::OK)
        }
        Err(err) => failure_response(&state, "infra::http::wiki::show_page", err).await,
    }
}

async fn save_page(
    State(state): State<HttpState>,
    Path(page_name): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let input = match read_page_input(&mut multipart).await {
        Ok(input) => input,
        Err(err) => {
            let status = err.status();
            let public = if status == StatusCode::PAYLOAD_TOO_LARGE {
                "Upload is too large"
            } else {
                "Request could not be processed"
            };
            return HttpError::from_error("infra::http::wiki::save_page", status, public, &err)
                .into_response();
        }
    };

    if let Err(errors) = input.validate(Some(&page_name)) {
        return rejected_form(&state, &page_name, &input, &errors).await;
    }

    match state.wiki.save_page(&input).await {
        Ok(page) => Redirect::to(&format!("/{}", page.name)).into_response(),
        Err(WikiError::Validation(errors)) => {
            rejected_form(&state, &page_name, &input, &errors).await
        }
        Err(err) => failure_response(&state, "infra::http::wiki::save_page", err).await,
    }
}

async fn delete_page(
    State(state): State<HttpState>,
    form: Result<Form<DeletePageForm>, FormRejection>,
) -> Redirect {
    let Ok(Form(form)) = form else {
        warn!(target = SOURCE, op = "delete_page", "malformed delete form");
        return Redirect::to("/");
    };

    if let Err(err) = state.wiki.delete_page(form.id, HOME_PAGE_NAME).await
        && err.is_rejection()
    {
        info!(
            target = SOURCE,
            op = "delete_page",
            page_id = form.id,
            reason = %err,
            "delete refused"
        );
    }
    Redirect::to("/")
}

async fn delete_attachment(
    State(state): State<HttpState>,
    form: Result<Form<DeleteAttachmentForm>, FormRejection>,
) -> Redirect {
    let Ok(Form(form)) = form else {
        warn!(target = SOURCE, op = "delete_attachment", "malformed delete form");
        return Redirect::to("/");
    };

    let page = match state
        .wiki
        .delete_attachment(form.page_id, &form.file_id)
        .await
    {
        Ok(page) => Some(page),
        Err(failure) => failure.page,
    };

    match page {
        Some(page) => Redirect::to(&format!("/{}", page.name)),
        None => Redirect::to("/"),
    }
}

async fn download_attachment(
    State(state): State<HttpState>,
    Query(query): Query<FileIdQuery>,
) -> Response {
    if query.file_id.trim().is_empty() {
        return not_found("infra::http::wiki::download_attachment");
    }

    match state.wiki.get_file(&query.file_id).await {
        Ok(Some(file)) => {
            let content_type = HeaderValue::from_str(&file.info.mime_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
            let length = file.data.len();
            let mut response = file.data.into_response();
            let headers = response.headers_mut();
            headers.insert(CONTENT_TYPE, content_type);
            headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
            response
        }
        Ok(None) => not_found("infra::http::wiki::download_attachment"),
        Err(err) => wiki_error_to_http("infra::http::wiki::download_attachment", err)
            .into_response(),
    }
}

async fn check_page_exists(
    State(state): State<HttpState>,
    Query(query): Query<PageNameQuery>,
) -> Response {
    match state.wiki.page_exists(&query.page_name).await {
        Ok(exists) => Json(json!({ "exists": exists })).into_response(),
        Err(err) => {
            wiki_error_to_http("infra::http::wiki::check_page_exists", err).into_response()
        }
    }
}

async fn get_tags(State(state): State<HttpState>, body: Bytes) -> Response {
    let Some(classifier) = state.classifier.as_ref() else {
        return HttpError::new(
            "infra::http::wiki::get_tags",
            StatusCode::SERVICE_UNAVAILABLE,
            "Tagging is not configured",
            "no classifier api key configured",
        )
        .into_response();
    };

    match classifier.classify(body).await {
        Ok(answer) => Json(answer).into_response(),
        Err(err) => HttpError::from_error(
            "infra::http::wiki::get_tags",
            StatusCode::BAD_GATEWAY,
            "Tagging service failed",
            &err,
        )
        .into_response(),
    }
}

async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

async fn render_page(state: &HttpState, page: &Page) -> Response {
    let side_panel = match side_panel(state, false).await {
        Ok(panel) => panel,
        Err(response) => return response,
    };

    let body_html = renderer().render(&page.content);
    let view = LayoutContext::new(
        display_title(&page.name),
        side_panel,
        PageView::new(page, body_html),
    );
    render_template_response(PageTemplate { view }, StatusCode::OK)
}

async fn rejected_form(
    state: &HttpState,
    page_name: &str,
    input: &PageInput,
    errors: &ValidationErrors,
) -> Response {
    let side_panel = match side_panel(state, true).await {
        Ok(panel) => panel,
        Err(response) => return response,
    };

    let existing = match input.id {
        Some(id) => state.wiki.get_page_by_id(id).await.ok().flatten(),
        None => None,
    };

    let title = if input.name.trim().is_empty() {
        display_title(page_name)
    } else {
        display_title(&input.name)
    };
    let view = LayoutContext::new(
        title,
        side_panel,
        EditorView::rejected(page_name, input, existing.as_ref(), errors),
    );
    let mut response = render_template_response(EditTemplate { view }, StatusCode::BAD_REQUEST);
    ErrorReport::from_error(
        "infra::http::wiki::save_page",
        StatusCode::BAD_REQUEST,
        errors,
    )
    .attach(&mut response);
    response
}

async fn side_panel(state: &HttpState, copyable: bool) -> Result<SidePanelView, Response> {
    match state.wiki.list_all_pages().await {
        Ok(pages) => Ok(SidePanelView::from_pages(&pages, copyable)),
        Err(err) => Err(error_page(
            SidePanelView::default(),
            "infra::http::wiki::side_panel",
            &err,
        )),
    }
}

async fn failure_response(state: &HttpState, source: &'static str, err: WikiError) -> Response {
    let side_panel = state
        .wiki
        .list_all_pages()
        .await
        .map(|pages| SidePanelView::from_pages(&pages, false))
        .unwrap_or_default();
    error_page(side_panel, source, &err)
}

fn error_page(
    side_panel: SidePanelView,
    source: &'static str,
    err: &dyn std::error::Error,
) -> Response {
    let view = LayoutContext::new("Error", side_panel, ErrorPageView::failure());
    let mut response =
        render_template_response(ErrorTemplate { view }, StatusCode::INTERNAL_SERVER_ERROR);
    ErrorReport::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, err).attach(&mut response);
    response
}

fn not_found(source: &'static str) -> Response {
    HttpError::new(
        source,
        StatusCode::NOT_FOUND,
        "Resource not found",
        "no file stored under the requested id",
    )
    .into_response()
}
