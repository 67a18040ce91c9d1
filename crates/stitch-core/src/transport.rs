//! Content and manifest fetching.
//!
//! The resolver and graph builder never touch storage directly; they go
//! through a [`Transport`]. Fetches are memoized per absolute canonical
//! path, failures included, which makes repeated existence probes cheap.
//! Caches are instance state, scoped to the transport, never ambient.

use crate::manifest::Manifest;
use crate::paths;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Raw fetch failure: an undistinguished existence/IO error, reclassified
/// by the consuming layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub path: String,
    pub message: String,
}

impl TransportError {
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Storage seam consumed by the resolver and the graph builder.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Fetch raw content at a canonical path.
    async fn fetch(&self, path: &str) -> Result<Rc<str>, TransportError>;

    /// Fetch and parse the manifest at a canonical path.
    async fn fetch_manifest(&self, path: &str) -> Result<Rc<Manifest>, TransportError>;
}

fn parse_manifest(path: &str, text: &str) -> Result<Rc<Manifest>, TransportError> {
    Manifest::parse(text)
        .map(Rc::new)
        .map_err(|e| TransportError::new(path, e.to_string()))
}

/// Filesystem transport backed by `tokio::fs`.
#[derive(Default)]
pub struct FsTransport {
    content: RefCell<FxHashMap<String, Result<Rc<str>, TransportError>>>,
    manifests: RefCell<FxHashMap<String, Result<Rc<Manifest>, TransportError>>>,
}

impl FsTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for FsTransport {
    async fn fetch(&self, path: &str) -> Result<Rc<str>, TransportError> {
        if let Some(hit) = self.content.borrow().get(path) {
            return hit.clone();
        }
        let result = match tokio::fs::read_to_string(paths::to_system(path)).await {
            Ok(text) => Ok(Rc::from(text)),
            Err(e) => Err(TransportError::new(path, e.to_string())),
        };
        self.content
            .borrow_mut()
            .insert(path.to_string(), result.clone());
        result
    }

    async fn fetch_manifest(&self, path: &str) -> Result<Rc<Manifest>, TransportError> {
        if let Some(hit) = self.manifests.borrow().get(path) {
            return hit.clone();
        }
        let result = match self.fetch(path).await {
            Ok(text) => parse_manifest(path, &text),
            Err(e) => Err(e),
        };
        self.manifests
            .borrow_mut()
            .insert(path.to_string(), result.clone());
        result
    }
}

/// In-memory transport: a fixed map of canonical path to content.
///
/// Used by tests and by embedders that assemble virtual file trees.
#[derive(Default)]
pub struct MemoryTransport {
    files: FxHashMap<String, String>,
    manifests: RefCell<FxHashMap<String, Result<Rc<Manifest>, TransportError>>>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, builder style.
    #[must_use]
    pub fn file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

impl Transport for MemoryTransport {
    async fn fetch(&self, path: &str) -> Result<Rc<str>, TransportError> {
        match self.files.get(path) {
            Some(content) => Ok(Rc::from(content.as_str())),
            None => Err(TransportError::new(path, "no such file")),
        }
    }

    async fn fetch_manifest(&self, path: &str) -> Result<Rc<Manifest>, TransportError> {
        if let Some(hit) = self.manifests.borrow().get(path) {
            return hit.clone();
        }
        let result = match self.fetch(path).await {
            Ok(text) => parse_manifest(path, &text),
            Err(e) => Err(e),
        };
        self.manifests
            .borrow_mut()
            .insert(path.to_string(), result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_fetch_hits_and_misses() {
        let transport = MemoryTransport::new().file("/a.js", "module.exports = 1");
        assert_eq!(&*transport.fetch("/a.js").await.unwrap(), "module.exports = 1");
        assert!(transport.fetch("/missing.js").await.is_err());
    }

    #[tokio::test]
    async fn memory_manifest_is_parsed_and_memoized() {
        let transport =
            MemoryTransport::new().file("/pkg/package.json", r#"{"name": "pkg", "main": "./x.js"}"#);
        let first = transport.fetch_manifest("/pkg/package.json").await.unwrap();
        let second = transport.fetch_manifest("/pkg/package.json").await.unwrap();
        assert_eq!(first.name.as_deref(), Some("pkg"));
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn invalid_manifest_is_a_fetch_failure() {
        let transport = MemoryTransport::new().file("/pkg/package.json", "not json");
        assert!(transport.fetch_manifest("/pkg/package.json").await.is_err());
    }
}
