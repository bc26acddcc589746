//! Page repository behaviour against a real SQLite file.

mod common;

use std::time::Duration;

use bytes::Bytes;

use common::{new_page, test_wiki, test_wiki_with_cache, upload};
use wiki::application::repos::FileStore;
use wiki::application::wiki::{
    FIELD_ATTACHMENT, FIELD_NAME, HOME_PAGE_RENAME, PageInput, WikiError,
};
use wiki::cache::CacheConfig;
use wiki::domain::entities::HOME_PAGE_NAME;

#[tokio::test]
async fn lookup_ignores_case() {
    let t = test_wiki().await;
    let saved = t
        .wiki
        .save_page(&new_page("Road Notes", "text"))
        .await
        .expect("save");

    let lower = t.wiki.get_page(&saved.name).await.expect("lookup");
    let upper = t
        .wiki
        .get_page(&saved.name.to_uppercase())
        .await
        .expect("lookup");

    assert_eq!(lower.expect("found").id, saved.id);
    assert_eq!(upper.expect("found").id, saved.id);
}

#[tokio::test]
async fn content_round_trips_unsanitized() {
    let t = test_wiki().await;
    let content = "# Title\n\n<script>alert(1)</script>\n\n  trailing  \r\n";
    let saved = t
        .wiki
        .save_page(&new_page("raw", content))
        .await
        .expect("save");

    let loaded = t.wiki.get_page("raw").await.expect("lookup").expect("found");
    assert_eq!(loaded.content, content);
    assert_eq!(saved.content, content);
}

#[tokio::test]
async fn new_page_name_is_normalised() {
    let t = test_wiki().await;
    let saved = t
        .wiki
        .save_page(&new_page("My Trip", "# Hello"))
        .await
        .expect("save");

    assert_eq!(saved.name, "my-trip");
    assert_eq!(saved.content, "# Hello");

    let found = t.wiki.get_page("My Trip").await.expect("lookup").expect("found");
    assert_eq!(found.id, saved.id);
}

#[tokio::test]
async fn page_list_is_ordered_by_name() {
    let t = test_wiki().await;
    for name in ["zebra", "apple", "Mango"] {
        t.wiki.save_page(&new_page(name, "x")).await.expect("save");
    }

    let names: Vec<_> = t
        .wiki
        .list_all_pages()
        .await
        .expect("list")
        .into_iter()
        .map(|page| page.name)
        .collect();
    assert_eq!(names, ["apple", "mango", "zebra"]);
}

#[tokio::test]
async fn empty_store_lists_nothing() {
    let t = test_wiki().await;
    assert!(t.wiki.list_all_pages().await.expect("list").is_empty());
}

#[tokio::test]
async fn page_list_is_served_from_cache_until_a_write() {
    let t = test_wiki().await;
    t.wiki.save_page(&new_page("one", "x")).await.expect("save");

    let first = t.wiki.list_all_pages().await.expect("list");
    let second = t.wiki.list_all_pages().await.expect("list");
    assert_eq!(first, second);
    assert_eq!(t.pages.list_calls(), 1);

    t.wiki.save_page(&new_page("two", "y")).await.expect("save");
    let third = t.wiki.list_all_pages().await.expect("list");
    assert_eq!(third.len(), 2);
    assert_eq!(t.pages.list_calls(), 2);
}

#[tokio::test]
async fn delete_and_attachment_removal_invalidate_the_list() {
    let t = test_wiki().await;
    let input = PageInput {
        attachment: Some(upload("a.txt", "text/plain", b"abc")),
        ..new_page("doomed", "x")
    };
    let page = t.wiki.save_page(&input).await.expect("save");
    let file_id = page.attachments[0].file_id.clone();

    t.wiki.list_all_pages().await.expect("list");
    t.wiki
        .delete_attachment(page.id, &file_id)
        .await
        .expect("delete attachment");
    t.wiki.list_all_pages().await.expect("list");
    assert_eq!(t.pages.list_calls(), 2);

    t.wiki
        .delete_page(page.id, HOME_PAGE_NAME)
        .await
        .expect("delete page");
    assert!(t.wiki.list_all_pages().await.expect("list").is_empty());
    assert_eq!(t.pages.list_calls(), 3);
}

#[tokio::test]
async fn disabled_cache_queries_every_time() {
    let t = test_wiki_with_cache(CacheConfig {
        enabled: false,
        page_list_ttl: Duration::from_secs(60),
    })
    .await;

    t.wiki.list_all_pages().await.expect("list");
    t.wiki.list_all_pages().await.expect("list");
    assert_eq!(t.pages.list_calls(), 2);
}

#[tokio::test]
async fn home_page_cannot_be_deleted() {
    let t = test_wiki().await;
    let home = t.wiki.ensure_home_page().await.expect("home page");

    let err = t
        .wiki
        .delete_page(home.id, HOME_PAGE_NAME)
        .await
        .expect_err("protected");
    assert!(matches!(err, WikiError::HomePageProtected { id } if id == home.id));

    let still_there = t
        .wiki
        .get_page(HOME_PAGE_NAME)
        .await
        .expect("lookup")
        .expect("home page");
    assert_eq!(still_there.id, home.id);
    assert_eq!(still_there.content, home.content);
}

#[tokio::test]
async fn ensure_home_page_is_idempotent() {
    let t = test_wiki().await;
    let first = t.wiki.ensure_home_page().await.expect("create");
    let second = t.wiki.ensure_home_page().await.expect("existing");
    assert_eq!(first.id, second.id);
    assert_eq!(t.wiki.list_all_pages().await.expect("list").len(), 1);
}

#[tokio::test]
async fn deleting_a_page_removes_its_blobs() {
    let t = test_wiki().await;
    let created = t
        .wiki
        .save_page(&PageInput {
            attachment: Some(upload("one.txt", "text/plain", b"1")),
            ..new_page("holder", "x")
        })
        .await
        .expect("save");
    let updated = t
        .wiki
        .save_page(&PageInput {
            id: Some(created.id),
            attachment: Some(upload("two.txt", "text/plain", b"2")),
            ..new_page("holder", "x")
        })
        .await
        .expect("second upload");
    assert_eq!(updated.attachments.len(), 2);

    t.wiki
        .delete_page(created.id, HOME_PAGE_NAME)
        .await
        .expect("delete");

    for attachment in &updated.attachments {
        assert!(
            t.wiki
                .get_file(&attachment.file_id)
                .await
                .expect("lookup")
                .is_none()
        );
    }
    assert!(t.wiki.get_page("holder").await.expect("lookup").is_none());
}

#[tokio::test]
async fn deleting_a_missing_page_is_rejected() {
    let t = test_wiki().await;
    let err = t
        .wiki
        .delete_page(404, HOME_PAGE_NAME)
        .await
        .expect_err("missing");
    assert!(matches!(err, WikiError::PageNotFound { id: 404 }));
    assert!(err.is_rejection());
}

#[tokio::test]
async fn unknown_attachment_leaves_page_untouched() {
    let t = test_wiki().await;
    let page = t
        .wiki
        .save_page(&PageInput {
            attachment: Some(upload("keep.txt", "text/plain", b"keep")),
            ..new_page("keeper", "x")
        })
        .await
        .expect("save");

    let failure = t
        .wiki
        .delete_attachment(page.id, "no-such-file")
        .await
        .expect_err("unknown file");
    assert!(matches!(failure.error, WikiError::BlobNotDeleted { .. }));
    assert_eq!(failure.page.as_ref().map(|p| p.attachments.len()), Some(1));

    let reloaded = t
        .wiki
        .get_page_by_id(page.id)
        .await
        .expect("lookup")
        .expect("page");
    let ids = |p: &wiki::domain::entities::Page| {
        p.attachments
            .iter()
            .map(|a| a.file_id.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&reloaded), ids(&page));
}

#[tokio::test]
async fn attachment_delete_on_missing_page_has_no_page() {
    let t = test_wiki().await;
    let failure = t
        .wiki
        .delete_attachment(77, "whatever")
        .await
        .expect_err("missing page");
    assert!(failure.page.is_none());
    assert!(matches!(failure.error, WikiError::PageNotFound { id: 77 }));
}

#[tokio::test]
async fn attachment_id_matches_case_insensitively() {
    let t = test_wiki().await;
    let page = t
        .wiki
        .save_page(&PageInput {
            attachment: Some(upload("x.bin", "application/octet-stream", b"x")),
            ..new_page("case", "x")
        })
        .await
        .expect("save");
    let file_id = page.attachments[0].file_id.to_uppercase();

    let updated = t
        .wiki
        .delete_attachment(page.id, &file_id)
        .await
        .expect("delete");
    assert!(updated.attachments.is_empty());
}

#[tokio::test]
async fn uploaded_image_is_returned_intact() {
    let t = test_wiki().await;
    let bytes: &'static [u8] = b"\x89PNG\r\n\x1a\nfake-image";
    let page = t
        .wiki
        .save_page(&PageInput {
            attachment: Some(upload("photo.png", "image/png", bytes)),
            ..new_page("gallery", "pictures")
        })
        .await
        .expect("save");

    let attachment = &page.attachments[0];
    assert_eq!(attachment.file_name, "photo.png");
    assert!(attachment.is_image());

    let file = t
        .wiki
        .get_file(&attachment.file_id)
        .await
        .expect("lookup")
        .expect("stored");
    assert_eq!(file.data, Bytes::from_static(bytes));
    assert_eq!(file.info.mime_type, "image/png");
    assert_eq!(file.info.size_bytes, bytes.len() as i64);
}

#[tokio::test]
async fn attachments_are_appended_in_order() {
    let t = test_wiki().await;
    let page = t
        .wiki
        .save_page(&PageInput {
            attachment: Some(upload("a.txt", "text/plain", b"a")),
            ..new_page("ordered", "x")
        })
        .await
        .expect("save");
    let page = t
        .wiki
        .save_page(&PageInput {
            id: Some(page.id),
            attachment: Some(upload("a.txt", "text/plain", b"a2")),
            ..new_page("ordered", "edited")
        })
        .await
        .expect("update");

    let names: Vec<_> = page.attachments.iter().map(|a| a.file_name.as_str()).collect();
    assert_eq!(names, ["a.txt", "a.txt"]);
    assert_ne!(page.attachments[0].file_id, page.attachments[1].file_id);
    assert_eq!(page.content, "edited");
}

#[tokio::test]
async fn empty_upload_is_a_validation_failure() {
    let t = test_wiki().await;
    let err = t
        .wiki
        .save_page(&PageInput {
            attachment: Some(upload("empty.txt", "text/plain", b"")),
            ..new_page("blank-file", "x")
        })
        .await
        .expect_err("empty upload");

    let errors = match err {
        WikiError::Validation(errors) => errors,
        other => panic!("expected validation error, got {other:?}"),
    };
    assert_eq!(errors.messages_for(FIELD_ATTACHMENT).len(), 1);
    assert!(t.wiki.get_page("blank-file").await.expect("lookup").is_none());
}

#[tokio::test]
async fn renaming_the_home_page_is_rejected() {
    let t = test_wiki().await;
    let home = t.wiki.ensure_home_page().await.expect("home page");

    let err = t
        .wiki
        .save_page(&PageInput {
            id: Some(home.id),
            ..new_page("about", "new content")
        })
        .await
        .expect_err("rename");

    let errors = match err {
        WikiError::Validation(errors) => errors,
        other => panic!("expected validation error, got {other:?}"),
    };
    assert_eq!(errors.messages_for(FIELD_NAME), [HOME_PAGE_RENAME]);

    let home_after = t
        .wiki
        .get_page_by_id(home.id)
        .await
        .expect("lookup")
        .expect("home page");
    assert_eq!(home_after.name, HOME_PAGE_NAME);
    assert_eq!(home_after.content, home.content);
}

#[tokio::test]
async fn names_are_unique_regardless_of_case() {
    let t = test_wiki().await;
    t.wiki.save_page(&new_page("Recipes", "x")).await.expect("save");

    let err = t
        .wiki
        .save_page(&new_page("RECIPES", "y"))
        .await
        .expect_err("duplicate");
    assert!(matches!(err, WikiError::Validation(_)));
    assert_eq!(t.wiki.list_all_pages().await.expect("list").len(), 1);
}

#[tokio::test]
async fn unknown_id_creates_a_new_page() {
    let t = test_wiki().await;
    let saved = t
        .wiki
        .save_page(&PageInput {
            id: Some(9_999),
            ..new_page("fresh", "x")
        })
        .await
        .expect("save");
    assert_ne!(saved.id, 9_999);
    assert!(t.wiki.get_page_by_id(saved.id).await.expect("lookup").is_some());
}

#[tokio::test]
async fn page_exists_kebab_cases_the_title() {
    let t = test_wiki().await;
    t.wiki
        .save_page(&new_page("travel-plans", "x"))
        .await
        .expect("save");

    assert!(t.wiki.page_exists("TravelPlans").await.expect("exists"));
    assert!(t.wiki.page_exists("Travel Plans").await.expect("exists"));
    assert!(!t.wiki.page_exists("Work Plans").await.expect("exists"));
    assert!(!t.wiki.page_exists("   ").await.expect("exists"));
}

#[tokio::test]
async fn blob_store_rejects_empty_uploads_and_reports_checksums() {
    use time::OffsetDateTime;
    use wiki::application::repos::{RepoError, StoreFileParams};

    let t = test_wiki().await;
    let err = t
        .repos
        .upload(StoreFileParams {
            id: "empty".to_string(),
            filename: "e.txt".to_string(),
            mime_type: "text/plain".to_string(),
            uploaded_utc: OffsetDateTime::now_utc(),
            data: Bytes::new(),
        })
        .await
        .expect_err("empty");
    assert!(matches!(err, RepoError::InvalidInput { .. }));

    let info = t
        .repos
        .upload(StoreFileParams {
            id: "abc-file".to_string(),
            filename: "abc.txt".to_string(),
            mime_type: "text/plain".to_string(),
            uploaded_utc: OffsetDateTime::now_utc(),
            data: Bytes::from_static(b"abc"),
        })
        .await
        .expect("upload");
    assert_eq!(
        info.checksum,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert!(t.repos.delete("abc-file").await.expect("delete"));
    assert!(!t.repos.delete("abc-file").await.expect("delete again"));
}

#[tokio::test]
async fn attachment_of_another_page_is_not_deleted() {
    let t = test_wiki().await;
    let alpha = t
        .wiki
        .save_page(&new_page("alpha", "x"))
        .await
        .expect("save alpha");
    let beta = t
        .wiki
        .save_page(&PageInput {
            attachment: Some(upload("beta.txt", "text/plain", b"beta")),
            ..new_page("beta", "y")
        })
        .await
        .expect("save beta");
    let file_id = beta.attachments[0].file_id.clone();

    let failure = t
        .wiki
        .delete_attachment(alpha.id, &file_id)
        .await
        .expect_err("not alpha's attachment");
    assert!(matches!(failure.error, WikiError::BlobNotDeleted { .. }));
    assert_eq!(failure.page.as_ref().map(|p| p.id), Some(alpha.id));

    assert!(t.wiki.get_file(&file_id).await.expect("lookup").is_some());
    let beta_after = t
        .wiki
        .get_page_by_id(beta.id)
        .await
        .expect("lookup")
        .expect("beta");
    assert_eq!(beta_after.attachments.len(), 1);
}

#[tokio::test]
async fn name_conflict_during_update_is_a_name_error() {
    let t = test_wiki().await;
    let page = t
        .wiki
        .save_page(&new_page("drafts", "x"))
        .await
        .expect("save");
    t.pages.conflict_on_update();

    let err = t
        .wiki
        .save_page(&PageInput {
            id: Some(page.id),
            ..new_page("notes", "y")
        })
        .await
        .expect_err("conflict");

    let errors = match err {
        WikiError::Validation(errors) => errors,
        other => panic!("expected validation error, got {other:?}"),
    };
    assert_eq!(
        errors.messages_for(FIELD_NAME),
        ["A page named notes already exists"]
    );
}
