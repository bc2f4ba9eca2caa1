//! Whitelist checks for values that are going to be spliced into a raw
//! `{{{...}}}` slot.
//!
//! These helpers never clean a value: it is either accepted unchanged or
//! replaced by the caller's fallback.

use url::Url;

use crate::support::str::has_unsafe_attr_char;

/// Site-relative prefix of locally served assets.
pub const ASSET_PREFIX: &str = "/assets/";

/// Accept `raw` as an image source, or return `fallback`.
///
/// `raw` is trimmed first. It is accepted when it is a local asset path
/// (`/assets/...`) or a well-formed absolute `http`/`https` URL with a host.
/// Values carrying quotes, angle brackets, whitespace or control characters
/// are never accepted, and neither are asset paths with `..` segments.
///
/// ```
/// use minimustache::safe::image_url;
///
/// assert_eq!(image_url(" /assets/logo.png ", "/assets/none.png"), "/assets/logo.png");
/// assert_eq!(image_url("javascript:alert(1)", "/assets/none.png"), "/assets/none.png");
/// ```
pub fn image_url(raw: &str, fallback: &str) -> String {
    let candidate = raw.trim();
    if candidate.is_empty() || has_unsafe_attr_char(candidate) {
        return fallback.to_owned();
    }

    if candidate.starts_with(ASSET_PREFIX) {
        if candidate.split('/').any(|seg| seg == "..") {
            return fallback.to_owned();
        }
        return candidate.to_owned();
    }

    if is_absolute_http_url(candidate) {
        candidate.to_owned()
    } else {
        fallback.to_owned()
    }
}

fn is_absolute_http_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().map(|h| !h.is_empty()).unwrap_or(false)
        }
        Err(_) => false,
    }
}
