//! Client for the university schedule portal.
//!
//! The portal has no API of its own; its pages call three endpoints that
//! must be hit in order within one cookie session:
//!
//! 1. `GET  /?alias=<n>` - landing page with the department selector
//! 2. `POST plugins/AutoRasp/SearchGroup.php` - `FakultetId` → group `<option>`s
//! 3. `POST plugins/AutoRasp/GroupLessonList.php` - `GroupId`, `WeekNum` → JSON lesson list
//!
//! Requests carry the header set of a browser XHR; the portal rejects
//! requests that look scripted.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::Form;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

use super::error::FetchError;
use super::group_schedule::{decode_lesson_list, merge_slot_records};
use super::source::GroupScheduleSource;
use crate::config::PortalSettings;
use crate::models::Lesson;

static DEPARTMENT_LABEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("label[for='ChangeFakultet']").expect("valid selector"));
static OPTION: Lazy<Selector> = Lazy::new(|| Selector::parse("option").expect("valid selector"));

/// Display name → portal id, as read from an HTML `<select>`.
pub type OptionMap = HashMap<String, String>;

/// Fetches group schedules from the portal.
///
/// Every [`fetch`](GroupScheduleSource::fetch) runs in a fresh cookie
/// session, so concurrent fetches do not share portal state.
#[derive(Debug, Clone)]
pub struct PortalClient {
    settings: PortalSettings,
}

impl PortalClient {
    pub fn new(settings: PortalSettings) -> Self {
        Self { settings }
    }

    fn browser_headers(&self) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("ru-RU,ru;q=0.8,en-US;q=0.5,en;q=0.3"),
        );
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        headers.insert(header::ORIGIN, header_value(&self.settings.origin())?);
        headers.insert(header::REFERER, header_value(&self.settings.landing_url())?);
        headers.insert(
            HeaderName::from_static("sec-fetch-dest"),
            HeaderValue::from_static("empty"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-mode"),
            HeaderValue::from_static("cors"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-site"),
            HeaderValue::from_static("same-origin"),
        );
        headers.insert(HeaderName::from_static("priority"), HeaderValue::from_static("u=0"));
        Ok(headers)
    }

    /// Build the HTTP client of one portal session.
    fn session(&self) -> Result<Client, FetchError> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .user_agent(self.settings.user_agent.clone())
            .default_headers(self.browser_headers()?);

        if let Some(timeout) = self.settings.request_timeout() {
            builder = builder.timeout(timeout);
        }

        builder.build().map_err(|source| FetchError::Http {
            url: self.settings.base_url.clone(),
            source,
        })
    }

    async fn fetch_departments(&self, client: &Client) -> Result<OptionMap, FetchError> {
        let url = self.settings.landing_url();
        let body = send_text(client.get(&url), &url).await?;
        Ok(parse_department_options(&body))
    }

    async fn fetch_groups(
        &self,
        client: &Client,
        department_id: &str,
    ) -> Result<OptionMap, FetchError> {
        let url = self.settings.search_group_url();
        let form = Form::new().text("FakultetId", department_id.to_string());
        let body = send_text(client.post(&url).multipart(form), &url).await?;
        Ok(parse_group_options(&body))
    }

    async fn fetch_lesson_list(
        &self,
        client: &Client,
        group_id: &str,
        week_start: &str,
    ) -> Result<String, FetchError> {
        let url = self.settings.lesson_list_url();
        let mut form = Form::new().text("GroupId", group_id.to_string());
        if !week_start.is_empty() {
            form = form.text("WeekNum", week_start.to_string());
        }
        send_text(client.post(&url).multipart(form), &url).await
    }
}

#[async_trait]
impl GroupScheduleSource for PortalClient {
    async fn fetch(
        &self,
        department: &str,
        group: &str,
        week_start: &str,
    ) -> Result<Vec<Lesson>, FetchError> {
        let client = self.session()?;

        let departments = self.fetch_departments(&client).await?;
        let department_id = departments
            .get(department)
            .ok_or_else(|| FetchError::DepartmentNotFound(department.to_string()))?;

        let groups = self.fetch_groups(&client, department_id).await?;
        let group_id = groups.get(group).ok_or_else(|| FetchError::GroupNotFound {
            department: department.to_string(),
            group: group.to_string(),
        })?;

        let body = self.fetch_lesson_list(&client, group_id, week_start).await?;
        let records = decode_lesson_list(&body)?;
        let record_count = records.len();
        let lessons = merge_slot_records(records);

        log::debug!(
            "Fetched {} records ({} lessons) for {} / {}",
            record_count,
            lessons.len(),
            department,
            group
        );

        Ok(lessons)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, FetchError> {
    HeaderValue::from_str(value)
        .map_err(|e| FetchError::InvalidConfig(format!("bad header value '{}': {}", value, e)))
}

async fn send_text(request: reqwest::RequestBuilder, url: &str) -> Result<String, FetchError> {
    let http_error = |source| FetchError::Http {
        url: url.to_string(),
        source,
    };

    request
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(http_error)?
        .text()
        .await
        .map_err(http_error)
}

/// Department options of the landing page.
///
/// The selector is the element right after the `ChangeFakultet` label.
pub fn parse_department_options(html: &str) -> OptionMap {
    let document = Html::parse_document(html);
    let mut options = OptionMap::new();

    for label in document.select(&DEPARTMENT_LABEL) {
        let Some(select) = label.next_siblings().find_map(ElementRef::wrap) else {
            continue;
        };
        collect_options(select.select(&OPTION), &mut options);
    }

    options
}

/// Every `<option>` of a group search response.
pub fn parse_group_options(html: &str) -> OptionMap {
    let document = Html::parse_document(html);
    let mut options = OptionMap::new();
    collect_options(document.select(&OPTION), &mut options);
    options
}

fn collect_options<'a>(elements: impl Iterator<Item = ElementRef<'a>>, into: &mut OptionMap) {
    for option in elements {
        let text = option.text().collect::<String>().trim().to_string();
        let value = option.value().attr("value").unwrap_or_default().trim();
        if !text.is_empty() && !value.is_empty() {
            into.insert(text, value.to_string());
        }
    }
}
