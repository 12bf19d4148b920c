//! Detail-page extraction from the embedded `data-page` JSON payload.
//!
//! Directory detail pages are server-rendered with the whole page state in a
//! `data-page` attribute. Only payloads of the detail page component that
//! carry a `props.company` object produce a record.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::models::Record;

/// Component name of a company detail page.
pub const DETAIL_COMPONENT: &str = "ShowPage";

/// Attribute value, tolerating backslash-escaped quotes inside the blob.
static DATA_PAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-page="([^"]*(?:\\.[^"]*)*)""#).expect("data-page pattern"));

/// The `<body>...</body>` span of `html`; the whole input when there is no body tag.
pub fn isolate_body(html: &str) -> &str {
    let start = html.find("<body").unwrap_or(0);
    let end = html[start..]
        .find("</body>")
        .map(|i| start + i + "</body>".len())
        .unwrap_or(html.len());
    &html[start..end]
}

/// Decode HTML character references in `raw` with the HTML5 parser.
///
/// The text is parsed as RCDATA (textarea content), where references are
/// decoded but markup is not interpreted.
pub fn decode_entities(raw: &str) -> String {
    let fragment = Html::parse_fragment(&format!("<textarea>{}</textarea>", raw));
    let Ok(selector) = Selector::parse("textarea") else {
        return raw.to_string();
    };
    fragment
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_else(|| raw.to_string())
}

/// Extract the company on one rendered detail page.
///
/// `directory_url` is the base used to build the record's detail link from
/// the company slug. Anything unexpected yields `None`.
pub fn extract_company(html: &str, page_url: &str, directory_url: &str) -> Option<Record> {
    let body = isolate_body(html);
    let Some(captures) = DATA_PAGE.captures(body) else {
        info!("No data-page attribute found in {}", page_url);
        return None;
    };

    let payload = decode_entities(&captures[1]);
    let data: Value = match serde_json::from_str(&payload) {
        Ok(data) => data,
        Err(e) => {
            warn!("JSON decode error from {}: {}", page_url, e);
            return None;
        }
    };

    let component = data.get("component").and_then(Value::as_str).unwrap_or_default();
    if !component.contains(DETAIL_COMPONENT) {
        debug!("Skipping {}: component {:?} is not a detail page", page_url, component);
        return None;
    }

    let company = data.get("props")?.get("company")?.as_object()?;
    record_from_company(company, directory_url)
}

/// Map a `company` JSON object to a record. Requires a non-blank `name`.
pub fn record_from_company(company: &Map<String, Value>, directory_url: &str) -> Option<Record> {
    let field = move |key: &str| {
        company
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let name = field("name")?;
    let website = field("website").map(str::to_string);
    let description = field("one_liner")
        .or_else(|| field("long_description"))
        .map(str::to_string);
    let primary_source_url =
        field("slug").map(|slug| format!("{}/{}", directory_url.trim_end_matches('/'), slug));

    Some(Record {
        name: name.to_string(),
        website,
        description,
        primary_source_url,
        secondary_source_url: None,
        corroborated: false,
    })
}
