//! Artifact transform chain.
//!
//! Passes run in registration order between parsing and the dependency
//! pass, each consuming the previous artifact and producing the next.
//! A pass may rewrite source, add or drop import sites, or change the
//! artifact kind. The core registers none by default.

use crate::artifact::Artifact;
use crate::error::Error;
use futures::future::LocalBoxFuture;

/// One step of the transform chain.
pub trait TransformPass {
    /// Stable name, used in diagnostics when the pass fails.
    fn name(&self) -> &str;

    fn transform<'a>(
        &'a self,
        path: &'a str,
        artifact: Artifact,
    ) -> LocalBoxFuture<'a, Result<Artifact, Error>>;
}
