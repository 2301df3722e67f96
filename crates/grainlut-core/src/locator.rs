//! Locator strings ⇄ filesystem paths.
//!
//! Callers hand the pipeline opaque locators: either a `file://` URI or a
//! bare filesystem path. Output locators are always `file://` URIs.

use std::path::{Path, PathBuf};

use crate::raster::ImageLoadError;

const FILE_SCHEME: &str = "file://";

/// Resolve a locator to a local path.
pub fn resolve(locator: &str) -> Result<PathBuf, ImageLoadError> {
    if let Some(rest) = locator.strip_prefix(FILE_SCHEME) {
        // `file://localhost/tmp/x` and `file:///tmp/x` are both local.
        let rest = rest.strip_prefix("localhost").unwrap_or(rest);
        let decoded = urlencoding::decode(rest)
            .map_err(|_| ImageLoadError::UnsupportedLocator(locator.to_string()))?;
        return Ok(PathBuf::from(decoded.into_owned()));
    }

    if has_scheme(locator) {
        return Err(ImageLoadError::UnsupportedLocator(locator.to_string()));
    }
    if locator.is_empty() {
        return Err(ImageLoadError::UnsupportedLocator(String::new()));
    }
    Ok(PathBuf::from(locator))
}

/// Render a path as a `file://` URI, percent-encoding each segment.
///
/// Relative paths are made absolute against the working directory first.
pub fn to_file_uri(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let raw = absolute.to_string_lossy();
    let encoded: Vec<String> = raw
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{FILE_SCHEME}{}", encoded.join("/"))
}

/// `scheme:` per RFC 3986, excluding single-letter Windows drive prefixes.
fn has_scheme(locator: &str) -> bool {
    let Some((scheme, _)) = locator.split_once(':') else {
        return false;
    };
    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
