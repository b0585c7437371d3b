//! Lexical path helpers shared by discovery and the registry.
//!
//! Paths are handled as `/`-separated strings so the same rules apply to
//! local paths and remote object keys.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` components and resolve `..`
/// against preceding components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Make a local path absolute against the current directory and normalize it.
pub fn absolute_path(path: &str) -> std::io::Result<String> {
    let path = Path::new(path);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(normalize_path(&absolute).to_string_lossy().into_owned())
}

/// Split a `protocol://path` URL. Plain paths and `file://` URLs are local.
pub fn split_protocol(url: &str) -> (&str, &str) {
    match url.split_once("://") {
        Some(("file", rest)) => ("file", rest),
        Some((protocol, rest))
            if !protocol.is_empty()
                && protocol
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
        {
            (protocol, rest)
        }
        _ => ("file", url),
    }
}

/// Whether `child` lies strictly inside `parent`, by whole components.
///
/// `/a/bc` is not inside `/a/b`, and a path is not inside itself.
pub fn isin(child: &str, parent: &str) -> bool {
    let child = child.trim_end_matches('/');
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        return child.starts_with('/') && child.len() > 1;
    }
    child.len() > parent.len()
        && child.starts_with(parent)
        && child.as_bytes()[parent.len()] == b'/'
}

/// Whether any component of the path starts with `.`.
pub fn is_hidden(path: &str) -> bool {
    path.split('/')
        .any(|component| component.starts_with('.') && component != ".")
}

/// Remove any trailing `/**` (repeated, with optional trailing slashes).
///
/// `dir/**`, `dir/**/**` and `dir/**/` all mean `dir` because directories
/// are always expanded recursively. Returns the stripped path and whether
/// anything was removed.
pub fn strip_recursive_suffix(path: &str) -> (String, bool) {
    let mut current = path.trim_end_matches('/');
    let mut stripped = false;
    while let Some(rest) = current.strip_suffix("**") {
        let rest_trimmed = rest.trim_end_matches('/');
        if rest_trimmed.len() == rest.len() {
            // `**` not preceded by a separator, e.g. `dir**`.
            break;
        }
        current = rest_trimmed;
        stripped = true;
    }
    if stripped && current.is_empty() {
        return ("/".to_string(), true);
    }
    (current.to_string(), stripped)
}

/// Split a path into stem and extension (including the dot).
///
/// Only the file name is considered, and leading dots do not start an
/// extension: `a/b.tar.gz` gives `("a/b.tar", ".gz")`.
pub fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let name = &path[name_start..];
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => {
            let split = name_start + idx;
            (&path[..split], &path[split..])
        }
        _ => (path, ""),
    }
}
