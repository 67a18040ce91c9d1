//! Syntax artifacts and import sites.
//!
//! A content handler turns raw module content into an [`Artifact`]; the
//! transform chain consumes and returns artifacts; the trailing
//! dependency pass fills in the [`DependencyTarget`] of every import
//! site. The artifact, not generated code, is what the module record
//! carries — emission is a downstream concern.

use serde::Serialize;

/// What a content handler produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Text,
    Script,
    Json,
}

/// Parsed module content plus its discovered import sites.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub source: String,
    pub imports: Vec<ImportSite>,
}

impl Artifact {
    #[must_use]
    pub fn new(kind: ArtifactKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            imports: Vec::new(),
        }
    }
}

/// How a dependency was requested at its import site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    /// `require("...")` — the dependency is loaded into the graph.
    Require,
    /// `require.resolve("...")` — only the resolved uid is wanted.
    Resolve,
}

/// One import site, as written, plus its resolved target once the
/// dependency pass has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSite {
    pub specifier: String,
    pub kind: ImportKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<DependencyTarget>,
}

impl ImportSite {
    #[must_use]
    pub fn new(specifier: impl Into<String>, kind: ImportKind, line: Option<u32>) -> Self {
        Self {
            specifier: specifier.into(),
            kind,
            line,
            target: None,
        }
    }
}

/// What an import site resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DependencyTarget {
    /// A module in the graph, by uid.
    Module(String),
    /// A host-supplied builtin, passed through untouched.
    Builtin(String),
    /// Explicitly disabled by an override map.
    Unavailable,
}
