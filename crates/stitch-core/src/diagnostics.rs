//! Structured build diagnostics.
//!
//! Messages are collected into two groups, errors and warnings, as the
//! graph is built. Rendering is left to the caller; the CLI prints them,
//! embedders may serialize them.

use serde::Serialize;
use std::cell::{Ref, RefCell};

/// One structured diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            source: None,
            line: None,
            column: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_position(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

/// Diagnostic sink grouped by category.
#[derive(Debug, Default)]
pub struct Messages {
    errors: RefCell<Vec<Diagnostic>>,
    warnings: RefCell<Vec<Diagnostic>>,
}

impl Messages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&self, diagnostic: Diagnostic) {
        self.errors.borrow_mut().push(diagnostic);
    }

    pub fn warn(&self, diagnostic: Diagnostic) {
        self.warnings.borrow_mut().push(diagnostic);
    }

    #[must_use]
    pub fn errors(&self) -> Ref<'_, Vec<Diagnostic>> {
        self.errors.borrow()
    }

    #[must_use]
    pub fn warnings(&self) -> Ref<'_, Vec<Diagnostic>> {
        self.warnings.borrow()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.borrow().is_empty() && self.warnings.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_are_separate() {
        let messages = Messages::new();
        messages.error(Diagnostic::new("ResolveError", "unable to resolve `x`").with_source("src/a.js"));
        messages.warn(Diagnostic::new("pkg", "duplicate v1.0.0 found"));
        assert_eq!(messages.errors().len(), 1);
        assert_eq!(messages.warnings().len(), 1);
        assert_eq!(messages.errors()[0].source.as_deref(), Some("src/a.js"));
    }
}
