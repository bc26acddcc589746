use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use crate::application::error::{ErrorReport, GENERIC_FAILURE_MESSAGE, HttpError};
use crate::application::wiki::{FIELD_ATTACHMENT, FIELD_CONTENT, FIELD_NAME, PageInput};
use crate::domain::entities::{Attachment, Page, is_home_page_name};
use crate::domain::error::ValidationErrors;
use crate::domain::slug::display_title;

const DISPLAY_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day], [year]");

const WIKIPEDIA_BASE: &str = "https://en.wikipedia.org/wiki/";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(side_panel: SidePanelView) -> Response {
    let view = LayoutContext::new("Not found", side_panel, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Human date used throughout the UI, e.g. `March 01, 2024`.
pub fn format_display_date(timestamp: OffsetDateTime) -> String {
    timestamp
        .date()
        .format(DISPLAY_DATE_FORMAT)
        .unwrap_or_else(|_| timestamp.date().to_string())
}

pub struct LayoutContext<T> {
    pub title: String,
    pub side_panel: SidePanelView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(title: impl Into<String>, side_panel: SidePanelView, content: T) -> Self {
        Self {
            title: title.into(),
            side_panel,
            content,
        }
    }
}

/// Page list shown beside every page. On edit screens each entry is a
/// copyable markdown link instead of a plain link.
#[derive(Clone, Default)]
pub struct SidePanelView {
    pub pages: Vec<PageLinkView>,
    pub copyable: bool,
}

impl SidePanelView {
    pub fn from_pages(pages: &[Page], copyable: bool) -> Self {
        Self {
            pages: pages.iter().map(PageLinkView::from_page).collect(),
            copyable,
        }
    }
}

#[derive(Clone)]
pub struct PageLinkView {
    pub title: String,
    pub href: String,
    pub markdown_link: String,
}

impl PageLinkView {
    fn from_page(page: &Page) -> Self {
        let title = display_title(&page.name);
        let href = format!("/{}", page.name);
        Self {
            markdown_link: format!("[{title}]({href})"),
            title,
            href,
        }
    }
}

#[derive(Clone)]
pub struct AttachmentView {
    pub file_id: String,
    pub file_name: String,
    pub href: String,
    pub markdown_link: String,
    pub is_image: bool,
    pub modal_id: String,
}

impl AttachmentView {
    fn from_attachment(attachment: &Attachment) -> Self {
        let href = format!("/attachment?fileId={}", attachment.file_id);
        Self {
            file_id: attachment.file_id.clone(),
            file_name: attachment.file_name.clone(),
            markdown_link: format!("[{}]({href})", attachment.file_name),
            href,
            is_image: attachment.is_image(),
            modal_id: format!("attachment-{}", attachment.file_id),
        }
    }

    fn list(attachments: &[Attachment]) -> Vec<Self> {
        attachments.iter().map(Self::from_attachment).collect()
    }
}

pub struct PageView {
    pub name: String,
    pub body_html: String,
    pub attachments: Vec<AttachmentView>,
    pub last_modified: String,
    pub edit_href: String,
    pub wikipedia_href: Option<String>,
}

impl PageView {
    /// `body_html` must already be sanitised.
    pub fn new(page: &Page, body_html: String) -> Self {
        let wikipedia_href = (!page.is_home_page())
            .then(|| format!("{WIKIPEDIA_BASE}{}", page.name.replace('-', "%20")));
        Self {
            name: page.name.clone(),
            body_html,
            attachments: AttachmentView::list(&page.attachments),
            last_modified: format_display_date(page.last_modified_utc),
            edit_href: format!("/edit?pageName={}", page.name),
            wikipedia_href,
        }
    }
}

/// The create/edit form, optionally carrying field errors from a rejected save.
pub struct EditorView {
    pub action: String,
    pub id: Option<i64>,
    pub name: String,
    pub content: String,
    pub attachments: Vec<AttachmentView>,
    pub can_delete: bool,
    pub name_errors: Vec<String>,
    pub content_errors: Vec<String>,
    pub attachment_errors: Vec<String>,
}

impl EditorView {
    pub fn for_page(page: &Page) -> Self {
        Self {
            action: format!("/{}", page.name),
            id: Some(page.id),
            name: page.name.clone(),
            content: page.content.clone(),
            attachments: AttachmentView::list(&page.attachments),
            can_delete: !page.is_home_page(),
            name_errors: Vec::new(),
            content_errors: Vec::new(),
            attachment_errors: Vec::new(),
        }
    }

    pub fn for_new(page_name: &str) -> Self {
        Self {
            action: format!("/{page_name}"),
            id: None,
            name: page_name.to_string(),
            content: String::new(),
            attachments: Vec::new(),
            can_delete: false,
            name_errors: Vec::new(),
            content_errors: Vec::new(),
            attachment_errors: Vec::new(),
        }
    }

    /// Redisplay submitted input. `existing` supplies the attachment list
    /// when the input targets a stored page.
    pub fn rejected(
        route_page_name: &str,
        input: &PageInput,
        existing: Option<&Page>,
        errors: &ValidationErrors,
    ) -> Self {
        Self {
            action: format!("/{route_page_name}"),
            id: input.id,
            name: input.name.clone(),
            content: input.content.clone(),
            attachments: existing
                .map(|page| AttachmentView::list(&page.attachments))
                .unwrap_or_default(),
            can_delete: existing.is_some_and(|page| !page.is_home_page()),
            name_errors: errors.messages_for(FIELD_NAME),
            content_errors: errors.messages_for(FIELD_CONTENT),
            attachment_errors: errors.messages_for(FIELD_ATTACHMENT),
        }
    }

    pub fn is_home_page(&self) -> bool {
        is_home_page_name(&self.name)
    }
}

pub struct ErrorPageView {
    pub heading: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            heading: "Page not found".to_string(),
            message: "Nothing is stored at this address.".to_string(),
        }
    }

    pub fn failure() -> Self {
        Self {
            heading: "Error".to_string(),
            message: GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub view: LayoutContext<PageView>,
}

#[derive(Template)]
#[template(path = "edit.html")]
pub struct EditTemplate {
    pub view: LayoutContext<EditorView>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn page(name: &str) -> Page {
        Page {
            id: 3,
            name: name.to_string(),
            content: "# Body".to_string(),
            last_modified_utc: datetime!(2024-03-01 10:00 UTC),
            attachments: vec![
                Attachment {
                    file_id: "f1".to_string(),
                    file_name: "photo.png".to_string(),
                    mime_type: "image/png".to_string(),
                    last_modified_utc: datetime!(2024-03-01 10:00 UTC),
                },
                Attachment {
                    file_id: "f2".to_string(),
                    file_name: "notes.pdf".to_string(),
                    mime_type: "application/pdf".to_string(),
                    last_modified_utc: datetime!(2024-03-01 10:00 UTC),
                },
            ],
        }
    }

    #[test]
    fn display_date_uses_long_month() {
        assert_eq!(
            format_display_date(datetime!(2024-03-01 10:00 UTC)),
            "March 01, 2024"
        );
    }

    #[test]
    fn page_view_links_wikipedia_except_for_home() {
        let view = PageView::new(&page("road-to-rome"), String::new());
        assert_eq!(
            view.wikipedia_href.as_deref(),
            Some("https://en.wikipedia.org/wiki/road%20to%20rome")
        );

        let home = PageView::new(&page("home-page"), String::new());
        assert!(home.wikipedia_href.is_none());
    }

    #[test]
    fn attachments_render_as_markdown_links() {
        let view = PageView::new(&page("trip"), String::new());
        assert_eq!(view.attachments[0].markdown_link, "[photo.png](/attachment?fileId=f1)");
        assert!(view.attachments[0].is_image);
        assert!(!view.attachments[1].is_image);
    }

    #[test]
    fn side_panel_offers_title_case_links() {
        let panel = SidePanelView::from_pages(&[page("my-trip")], true);
        assert_eq!(panel.pages[0].markdown_link, "[My Trip](/my-trip)");
    }

    #[test]
    fn editor_hides_delete_for_home_page() {
        assert!(!EditorView::for_page(&page("home-page")).can_delete);
        assert!(EditorView::for_page(&page("trip")).can_delete);
    }

    #[test]
    fn rejected_editor_groups_messages_by_field() {
        let mut errors = ValidationErrors::new();
        errors.push(FIELD_NAME, "Name is required");
        errors.push(FIELD_CONTENT, "Content is required");
        let input = PageInput::default();

        let view = EditorView::rejected("draft", &input, None, &errors);
        assert_eq!(view.action, "/draft");
        assert_eq!(view.name_errors, ["Name is required"]);
        assert_eq!(view.content_errors, ["Content is required"]);
        assert!(view.attachment_errors.is_empty());
    }

    #[test]
    fn page_template_escapes_names_and_keeps_body_html() {
        let page = page("trip");
        let view = LayoutContext::new(
            "Trip",
            SidePanelView::default(),
            PageView::new(&page, "<p>safe</p>".to_string()),
        );
        let html = PageTemplate { view }.render().expect("render");
        assert!(html.contains("<p>safe</p>"));
        assert!(html.contains("March 01, 2024"));
        assert!(html.contains("/edit?pageName=trip"));
    }

    #[test]
    fn failure_page_uses_the_generic_message() {
        let view = LayoutContext::new("Error", SidePanelView::default(), ErrorPageView::failure());
        let html = ErrorTemplate { view }.render().expect("render");
        assert!(html.contains(GENERIC_FAILURE_MESSAGE));
    }
}
