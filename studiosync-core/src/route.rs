//! Project route parsing
//!
//! Project pages live at `/projects/<app>/<channelId>/<action>` (with `/p/`
//! accepted as a legacy alias for `/projects/`). Older browsers sometimes
//! produce hash-based variants of these URLs, so the hash fragment is folded
//! back into the path before segmenting.
//!
//! Example paths:
//! - `/projects/applab`
//! - `/projects/playlab/1u53pypr8szdgtrgig5lig`
//! - `/projects/artist/vyvo-bqagq-cyb7dbpabnq/edit`

use regex::Regex;

use crate::cipher::decode_channel_id;

/// Query marker that indicates a no-source embed with an obfuscated
/// channel id.
pub const NO_SOURCE_PARAM: &str = "nosource";

/// Pattern used by [`project_url`] to extract the project root URL.
const PROJECT_URL_PATTERN: &str = r"^(.*/projects/\w+/[\w\d-]+)/.*";

/// A page URL split into path, query and hash, with param helpers.
///
/// The full href is kept so that rewrites (`/view` to `/edit` and back) can
/// operate on the original string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUrl {
    href: String,
}

impl PageUrl {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    /// Replace the whole URL, e.g. after a soft history rewrite.
    pub fn set_href(&mut self, href: impl Into<String>) {
        self.href = href.into();
    }

    /// Path component, without scheme/host, query or hash.
    pub fn path(&self) -> &str {
        let rest = self.strip_origin();
        let end = rest.find(['?', '#']).unwrap_or(rest.len());
        &rest[..end]
    }

    /// Query string without the leading `?`, or an empty string. A `?`
    /// inside the hash fragment is not a query.
    pub fn query(&self) -> &str {
        let rest = self.strip_origin();
        let hash = rest.find('#').unwrap_or(rest.len());
        match rest[..hash].find('?') {
            Some(i) => &rest[i + 1..hash],
            None => "",
        }
    }

    /// Hash fragment without the leading `#`, or an empty string.
    pub fn hash(&self) -> &str {
        let rest = self.strip_origin();
        match rest.find('#') {
            Some(i) => &rest[i + 1..],
            None => "",
        }
    }

    pub fn has_query_param(&self, name: &str) -> bool {
        self.query_param(name).is_some()
    }

    /// Value of the first `name=value` pair in the query string. A bare
    /// `name` (no `=`) yields an empty value.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query().split('&').find_map(|pair| {
            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (k, v),
                None => (pair, ""),
            };
            (key == name).then_some(value)
        })
    }

    fn strip_origin(&self) -> &str {
        match self.href.find("://") {
            Some(scheme_end) => {
                let after = &self.href[scheme_end + 3..];
                match after.find('/') {
                    Some(path_start) => &after[path_start..],
                    None => "",
                }
            }
            None => &self.href,
        }
    }
}

/// Action segment of a project route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectAction {
    Edit,
    View,
    Other(String),
}

impl ProjectAction {
    fn parse(segment: &str) -> Self {
        match segment {
            "edit" => ProjectAction::Edit,
            "view" => ProjectAction::View,
            other => ProjectAction::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProjectAction::Edit => "edit",
            ProjectAction::View => "view",
            ProjectAction::Other(s) => s,
        }
    }
}

/// A parsed project route.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectRoute {
    pub app_name: Option<String>,
    pub channel_id: Option<String>,
    pub action: Option<ProjectAction>,
}

/// Result of parsing a page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// A `/p/` or `/projects/` page.
    Project(ProjectRoute),
    /// Anything else.
    Other,
}

impl Route {
    /// Parse the page URL into a route.
    ///
    /// A hash fragment is treated as an extension of the path (the `#` is
    /// replaced with `/`) before segmenting. When the query string carries
    /// the no-source marker, the channel id is decoded through the embed
    /// cipher so the rest of the module always sees the real id.
    pub fn parse(url: &PageUrl) -> Route {
        let mut pathname = url.path().to_string();
        let hash = url.hash();
        if !hash.is_empty() {
            pathname.push('/');
            pathname.push_str(hash);
        }

        let tokens: Vec<&str> = pathname.split('/').collect();
        match tokens.get(1) {
            Some(&"p") | Some(&"projects") => {}
            _ => return Route::Other,
        }

        let channel_id = tokens.get(3).filter(|s| !s.is_empty()).map(|id| {
            if url.has_query_param(NO_SOURCE_PARAM) {
                decode_channel_id(id)
            } else {
                (*id).to_string()
            }
        });

        Route::Project(ProjectRoute {
            app_name: tokens.get(2).filter(|s| !s.is_empty()).map(|s| s.to_string()),
            channel_id,
            action: tokens
                .get(4)
                .filter(|s| !s.is_empty())
                .map(|s| ProjectAction::parse(s)),
        })
    }

    pub fn as_project(&self) -> Option<&ProjectRoute> {
        match self {
            Route::Project(route) => Some(route),
            Route::Other => None,
        }
    }
}

/// Absolute URL to the root of the current project, without a trailing slash.
///
/// Hash fragments are removed but query strings are retained. If provided,
/// `fragment` is inserted between the project root and the query string, e.g.
/// `project_url(href, "/edit")`.
pub fn project_url(href: &str, fragment: &str) -> String {
    let pattern = Regex::new(PROJECT_URL_PATTERN).unwrap();
    let mut url = match pattern.captures(href) {
        Some(captures) => captures[1].to_string(),
        // Not a project URL; fall back to the page URL as-is.
        None => href.to_string(),
    };
    if let Some(hash_index) = url.find('#') {
        url.truncate(hash_index);
    }
    let mut query_string = String::new();
    if let Some(query_index) = url.find('?') {
        query_string = url[query_index..].to_string();
        url.truncate(query_index);
    }
    if fragment.starts_with('/') {
        while url.ends_with('/') {
            url.pop();
        }
    }
    format!("{url}{fragment}{query_string}")
}

/// URL of the app's project-creation page: the first path segments up to and
/// including the app name, e.g. `/projects/applab`.
pub fn creation_url(url: &PageUrl) -> String {
    url.path()
        .split('/')
        .take(3)
        .collect::<Vec<_>>()
        .join("/")
}
