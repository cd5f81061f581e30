//! Conversion between filesystem paths and `file://` URIs.

use crate::error::{CodeintelError, Result};
use crate::lsp::protocol::Url;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// Lexically normalize a path: drop `.`, resolve `..` against preceding
/// components. The filesystem is not consulted.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let ends_normal = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if ends_normal {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Convert an absolute path to `file:///<slash-normalized path>`.
///
/// Backslashes become forward slashes so Windows paths map to
/// `file:///C:/...`. Bytes outside the URI path character set are
/// percent-encoded.
pub fn path_to_uri(path: &Path) -> String {
    let cleaned = clean_path(path);
    let slashed = cleaned.to_string_lossy().replace('\\', "/");
    let trimmed = slashed.trim_start_matches('/');
    format!("file:///{}", percent_encode(trimmed))
}

/// Convert a `file://` URI back to a path with platform separators.
pub fn uri_to_path(uri: &str) -> PathBuf {
    let rest = uri.strip_prefix("file://").unwrap_or(uri);
    let decoded = percent_decode(rest);

    let body = decoded.trim_start_matches('/');
    let is_drive = body.len() >= 2
        && body.as_bytes()[0].is_ascii_alphabetic()
        && body.as_bytes()[1] == b':';
    let path = if is_drive {
        body.to_string()
    } else {
        format!("/{}", body)
    };

    if MAIN_SEPARATOR == '/' {
        PathBuf::from(path)
    } else {
        PathBuf::from(path.replace('/', &MAIN_SEPARATOR.to_string()))
    }
}

/// Build an [`Url`] for an absolute path.
pub fn path_to_url(path: &Path) -> Result<Url> {
    let uri = path_to_uri(path);
    Url::parse(&uri).map_err(|e| CodeintelError::InvalidUri(format!("{}: {}", uri, e)))
}

/// Path for a `file` URL.
pub fn url_to_path(url: &Url) -> PathBuf {
    uri_to_path(url.as_str())
}

fn is_path_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'.' | b'_' | b'~' | b'/' | b':' | b'@' | b'!' | b'$' | b'&' | b'\''
                | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'='
        )
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_path_byte(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
