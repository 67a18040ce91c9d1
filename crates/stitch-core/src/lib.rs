#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::return_self_not_must_use)]

pub mod artifact;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod handlers;
pub mod manifest;
pub mod paths;
pub mod resolver;
pub mod sequence;
pub mod transform;
pub mod transport;

pub use artifact::{Artifact, ArtifactKind, DependencyTarget, ImportKind, ImportSite};
pub use diagnostics::{Diagnostic, Messages};
pub use error::Error;
pub use graph::{BuildOutput, GraphBuilder, GraphOptions, ModuleRecord, ModuleState};
pub use handlers::{ContentHandler, JsonHandler, ScriptHandler, TextHandler};
pub use manifest::{Manifest, Override, OverrideMap};
pub use resolver::{is_builtin, Resolution, Resolver, ResolverOptions, HOST_BUILTINS};
pub use transform::TransformPass;
pub use transport::{FsTransport, MemoryTransport, Transport, TransportError};
