//! Canonical path algebra.
//!
//! Every path handled by the resolver and graph builder is a canonical
//! string path: absolute, forward-slash separated, with directories ending
//! in `/` and files never doing so. Conversion to and from the platform
//! representation happens only at the transport boundary.

use std::path::{Path, PathBuf};

/// Whether a specifier is written relative to the importing file.
#[must_use]
pub fn is_relative(spec: &str) -> bool {
    spec.starts_with("./") || spec.starts_with("../")
}

/// Whether a specifier is an absolute path (`/...` or a drive-rooted `c:/...`).
#[must_use]
pub fn is_absolute(spec: &str) -> bool {
    if spec.starts_with('/') {
        return true;
    }
    spec.split('/').next().is_some_and(|first| first.ends_with(':') && first.len() > 1)
}

/// Collapse `.`, `..` and duplicate separators, preserving the
/// trailing-slash directory marker.
#[must_use]
pub fn normalize(path: &str) -> String {
    let trailing =
        path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..") || path == "." || path == "..";
    let absolute = path.starts_with('/');

    let mut root: Option<&str> = None;
    let mut parts: Vec<&str> = Vec::new();

    for (i, seg) in path.split('/').enumerate() {
        if i == 0 && seg.ends_with(':') && seg.len() > 1 {
            root = Some(seg);
            continue;
        }
        match seg {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute && root.is_none() {
                    parts.push("..");
                }
            }
            seg => parts.push(seg),
        }
    }

    let mut out = String::new();
    if let Some(root) = root {
        out.push_str(root);
        out.push('/');
    } else if absolute {
        out.push('/');
    }
    out.push_str(&parts.join("/"));
    if trailing && !out.ends_with('/') {
        out.push('/');
    }
    if out.is_empty() {
        out.push_str("./");
    }
    out
}

/// Resolve `target` against the directory `base`.
///
/// An absolute `target` ignores `base`; anything else (including plain
/// names like `index`) is joined onto it.
#[must_use]
pub fn resolve(base: &str, target: &str) -> String {
    if is_absolute(target) {
        return normalize(target);
    }
    normalize(&format!("{base}/{target}"))
}

/// The directory containing `path`, with a trailing slash.
///
/// A path that is already a directory is its own dirname; this lets
/// callers hand either a file or a directory to the resolver.
#[must_use]
pub fn dirname(path: &str) -> String {
    let n = normalize(path);
    if n.ends_with('/') {
        return n;
    }
    match n.rfind('/') {
        Some(i) => n[..=i].to_string(),
        None => "./".to_string(),
    }
}

/// The extension of the final component, dot included, or `""`.
#[must_use]
pub fn extname(path: &str) -> &str {
    if path.ends_with('/') {
        return "";
    }
    let file = &path[path.rfind('/').map_or(0, |i| i + 1)..];
    match file.rfind('.') {
        Some(i) if i > 0 => &file[i..],
        _ => "",
    }
}

/// Express `to` relative to the directory `from`. Both must be absolute.
#[must_use]
pub fn relative(from: &str, to: &str) -> String {
    let from = normalize(&format!("{from}/"));
    let to = normalize(to);

    let from_parts: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to_parts: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = String::new();
    for _ in common..from_parts.len() {
        out.push_str("../");
    }
    out.push_str(&to_parts[common..].join("/"));
    if to.ends_with('/') && !out.is_empty() && !out.ends_with('/') {
        out.push('/');
    }
    if out.is_empty() {
        out.push_str("./");
    }
    out
}

/// Canonical path from a platform path.
#[must_use]
pub fn from_system(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    normalize(&raw)
}

/// Platform path from a canonical path.
#[must_use]
pub fn to_system(path: &str) -> PathBuf {
    PathBuf::from(path)
}
