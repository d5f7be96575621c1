//! URL template resolution.
//!
//! Templates are absolute URLs whose path segments and query values may be
//! `:name` placeholders:
//!
//! | Template | Params | Result |
//! |----------|--------|--------|
//! | `https://api.com/v1/:resource/:id/` | `resource=foos, id=78` | `https://api.com/v1/foos/78/` |
//! | `https://api.com/v1?res=:resource&id=:id` | `resource=foos, id=78` | `https://api.com/v1?res=foos&id=78` |
//! | `https://api.com/:missing` | none | `https://api.com/:missing` |
//!
//! Placeholders with no matching parameter are left as-is. Everything that is
//! not a placeholder (scheme, host, port, other segments, other query pairs,
//! fragment) is preserved.

use crate::error::{FetchError, Result};
use crate::types::RouteParams;
use url::{form_urlencoded, Url};

/// Substitute route parameters into a URL template.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] when the template is not an absolute URL.
/// Use [`absolutize`] first for relative templates.
///
/// # Examples
///
/// ```
/// use router_fetch::protocol::resolve;
/// use router_fetch::RouteParams;
///
/// let params = RouteParams::from([("id".to_string(), "5".to_string())]);
/// assert_eq!(resolve("https://x/:id", &params).unwrap(), "https://x/5");
/// ```
pub fn resolve(template: &str, params: &RouteParams) -> Result<String> {
    let mut url = Url::parse(template).map_err(|source| FetchError::InvalidUrl {
        url: template.to_string(),
        source,
    })?;

    let path = url.path_segments().map(|segments| {
        segments
            .map(|segment| substitute(segment, params).unwrap_or(segment))
            .collect::<Vec<_>>()
            .join("/")
    });
    if let Some(path) = path {
        url.set_path(&format!("/{}", path));
    }

    if let Some(query) = url.query().and_then(|q| substitute_query(q, params)) {
        url.set_query(Some(&query));
    }

    Ok(url.to_string())
}

/// Join a relative template onto a base URL.
///
/// Absolute templates are returned unchanged whether or not a base is given.
/// Placeholders survive the join untouched, so the result can be passed to
/// [`resolve`].
pub fn absolutize(base: Option<&str>, template: &str) -> Result<String> {
    let invalid = |source| FetchError::InvalidUrl {
        url: template.to_string(),
        source,
    };

    match (Url::parse(template), base) {
        (Ok(_), _) => Ok(template.to_string()),
        (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => {
            let base = Url::parse(base).map_err(|source| FetchError::InvalidUrl {
                url: base.to_string(),
                source,
            })?;
            base.join(template).map(String::from).map_err(invalid)
        }
        (Err(source), _) => Err(invalid(source)),
    }
}

fn substitute<'a>(token: &str, params: &'a RouteParams) -> Option<&'a str> {
    token
        .strip_prefix(':')
        .and_then(|name| params.get(name))
        .map(String::as_str)
}

/// Rewrites placeholder values in a raw query string. Returns `None` when no
/// value was substituted so the original query is kept byte for byte.
fn substitute_query(query: &str, params: &RouteParams) -> Option<String> {
    let mut changed = false;
    let pairs: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => match substitute(value, params) {
                Some(param) => {
                    changed = true;
                    let encoded: String = form_urlencoded::byte_serialize(param.as_bytes()).collect();
                    format!("{}={}", key, encoded)
                }
                None => pair.to_string(),
            },
            None => pair.to_string(),
        })
        .collect();

    changed.then(|| pairs.join("&"))
}
