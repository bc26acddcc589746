#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{Request, Response};
use bytes::Bytes;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use wiki::application::repos::{CreatePageParams, FileStore, PagesRepo, RepoError};
use wiki::application::tagging::TopicClassifier;
use wiki::application::wiki::{PageInput, UploadedFile, WikiService};
use wiki::cache::CacheConfig;
use wiki::domain::entities::Page;
use wiki::infra::db::SqliteRepositories;
use wiki::infra::http::{HttpState, build_router};

/// Delegates to the SQLite store and counts full page-list queries.
/// Individual calls can be switched to fail.
pub struct CountingPages {
    inner: Arc<SqliteRepositories>,
    list_calls: AtomicUsize,
    list_fails: AtomicBool,
    update_conflicts: AtomicBool,
}

pub const STORE_OUTAGE: &str = "disk image is malformed at page 42";

impl CountingPages {
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// `list_pages` answers with a persistence error carrying [`STORE_OUTAGE`].
    pub fn fail_list(&self) {
        self.list_fails.store(true, Ordering::SeqCst);
    }

    /// `update_page` answers as if the unique name index rejected the row.
    pub fn conflict_on_update(&self) {
        self.update_conflicts.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PagesRepo for CountingPages {
    async fn list_pages(&self) -> Result<Vec<Page>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence(STORE_OUTAGE.to_string()));
        }
        self.inner.list_pages().await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Page>, RepoError> {
        self.inner.find_by_name(name).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Page>, RepoError> {
        self.inner.find_by_id(id).await
    }

    async fn create_page(&self, params: CreatePageParams) -> Result<Page, RepoError> {
        self.inner.create_page(params).await
    }

    async fn update_page(&self, page: &Page) -> Result<bool, RepoError> {
        if self.update_conflicts.load(Ordering::SeqCst) {
            return Err(RepoError::Duplicate {
                constraint: "pages_name_nocase_idx".to_string(),
            });
        }
        self.inner.update_page(page).await
    }

    async fn delete_page(&self, id: i64) -> Result<bool, RepoError> {
        self.inner.delete_page(id).await
    }
}

pub struct TestWiki {
    _dir: TempDir,
    pub repos: Arc<SqliteRepositories>,
    pub pages: Arc<CountingPages>,
    pub wiki: Arc<WikiService>,
}

pub async fn test_wiki() -> TestWiki {
    test_wiki_with_cache(CacheConfig::default()).await
}

pub async fn test_wiki_with_cache(cache: CacheConfig) -> TestWiki {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("wiki.db").display());
    let pool = SqliteRepositories::connect(&url, 4)
        .await
        .expect("open sqlite store");
    SqliteRepositories::run_migrations(&pool)
        .await
        .expect("run migrations");
    let repos = Arc::new(SqliteRepositories::new(pool));

    let pages = Arc::new(CountingPages {
        inner: repos.clone(),
        list_calls: AtomicUsize::new(0),
        list_fails: AtomicBool::new(false),
        update_conflicts: AtomicBool::new(false),
    });
    let pages_repo: Arc<dyn PagesRepo> = pages.clone();
    let files: Arc<dyn FileStore> = repos.clone();
    let wiki = Arc::new(WikiService::new(pages_repo, files, cache.build(), cache));

    TestWiki {
        _dir: dir,
        repos,
        pages,
        wiki,
    }
}

pub fn new_page(name: &str, content: &str) -> PageInput {
    PageInput {
        id: None,
        name: name.to_string(),
        content: content.to_string(),
        attachment: None,
    }
}

pub fn upload(filename: &str, mime_type: &str, data: &'static [u8]) -> UploadedFile {
    UploadedFile {
        filename: filename.to_string(),
        mime_type: mime_type.to_string(),
        data: Bytes::from_static(data),
    }
}

pub const DEFAULT_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

pub fn router(
    t: &TestWiki,
    classifier: Option<Arc<dyn TopicClassifier>>,
    upload_limit_bytes: usize,
) -> Router {
    build_router(HttpState {
        wiki: t.wiki.clone(),
        db: t.repos.clone(),
        classifier,
        upload_limit_bytes,
    })
}

pub const BOUNDARY: &str = "wiki-test-boundary";

/// Hand-built `multipart/form-data` body: text fields then an optional file.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, mime, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"Attachment\"; filename=\"{filename}\"\r\nContent-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

pub fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub async fn send(router: Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.expect("router is infallible")
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}
