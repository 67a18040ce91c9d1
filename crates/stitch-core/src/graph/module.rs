//! Per-module records and their state machine.

use crate::artifact::Artifact;
use serde::Serialize;

/// Lifecycle of a module record.
///
/// `Placeholder` exists from the moment a module is first requested,
/// before any content has been fetched; a dependency cycle reaching the
/// module again sees the placeholder and stops. `Ready` and `Failed` are
/// terminal and never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleState {
    Placeholder,
    Fetching,
    Parsing,
    Transforming,
    Ready,
    Failed,
}

impl ModuleState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// One module in the graph, keyed by uid (path relative to the build
/// root).
#[derive(Debug, Clone, Serialize)]
pub struct ModuleRecord {
    pub uid: String,
    pub path: String,
    pub state: ModuleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

impl ModuleRecord {
    #[must_use]
    pub fn placeholder(uid: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            path: path.into(),
            state: ModuleState::Placeholder,
            artifact: None,
        }
    }

    /// Move to `next` unless the record already reached a terminal state.
    pub fn advance(&mut self, next: ModuleState) {
        if !self.state.is_terminal() {
            self.state = next;
        }
    }
}

/// One discovered on-storage copy of a package, by root-relative path.
#[derive(Debug, Clone)]
pub struct PackageInstance {
    pub version: String,
    pub path: String,
}
