use thiserror::Error;

/// Fatal error taxonomy for resolution and graph construction.
///
/// Every variant is `Clone` (string-carried sources) so transports can
/// memoize failed fetches alongside successful ones. A fatal error aborts
/// the whole build; there is no partial graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unable to resolve `{specifier}` from {from}")]
    NotFound { specifier: String, from: String },

    #[error("unable to read {path}: {message}")]
    Transport { path: String, message: String },

    #[error("unable to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("transform `{pass}` failed for {path}: {message}")]
    Transform {
        path: String,
        pass: String,
        message: String,
    },
}

impl Error {
    #[must_use]
    pub fn not_found(specifier: impl Into<String>, from: impl Into<String>) -> Self {
        Self::NotFound {
            specifier: specifier.into(),
            from: from.into(),
        }
    }
}
