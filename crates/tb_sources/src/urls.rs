//! URL and text normalization shared by the feed and search adapters.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;
use url::Url;

lazy_static! {
    static ref URL_PATTERN: Regex = Regex::new(concat!(
        r"(?i)^https?://",
        r"(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+[A-Z]{2,6}\.?|",
        r"localhost|",
        r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})",
        r"(?::\d+)?",
        r"(?:/?|[/?]\S+)$",
    ))
    .expect("static URL pattern");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("static whitespace pattern");
}

const HOMEPAGE_PATHS: [&str; 4] = ["index.html", "index.php", "home", "main"];

/// Returns the trimmed url if it looks like a real http(s) link, otherwise an empty string.
pub fn validate_and_clean_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() || !(url.starts_with("http://") || url.starts_with("https://")) {
        return String::new();
    }
    if !URL_PATTERN.is_match(url) {
        return String::new();
    }
    url.to_string()
}

/// Why a url looks like a site front page rather than an article, if it does.
pub fn homepage_reason(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path().trim_matches('/');
    if path.is_empty() {
        return Some("root path".to_string());
    }
    if path.chars().count() < 5 {
        return Some(format!("path too short: '{}'", path));
    }
    if HOMEPAGE_PATHS.contains(&path.to_lowercase().as_str()) {
        return Some(format!("homepage path: '{}'", path));
    }
    None
}

pub fn is_homepage_url(url: &str) -> bool {
    homepage_reason(url).is_some()
}

/// Unwraps Google's `/url?q=<target>&...` redirect links; other links pass through.
pub fn unwrap_google_redirect(href: &str) -> String {
    if !href.contains("/url?") {
        return href.to_string();
    }
    let absolute = if href.starts_with('/') {
        format!("https://www.google.com{}", href)
    } else {
        href.to_string()
    };
    Url::parse(&absolute)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "q" || k == "url")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_else(|| href.to_string())
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Drops markup from feed descriptions (Google News wraps them in `<a>`/`<font>`).
pub fn strip_html(text: &str) -> String {
    if !text.contains('<') {
        return collapse_whitespace(text);
    }
    let fragment = Html::parse_fragment(text);
    let joined = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&joined)
}
