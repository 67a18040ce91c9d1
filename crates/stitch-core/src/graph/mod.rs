//! Cycle-safe, deduplicated module graph construction.
//!
//! The builder walks the dependency graph from an entry specifier:
//! resolve, fetch, parse, transform, then recurse into the discovered
//! import sites. A module is registered in the graph synchronously when
//! first requested, before its content is fetched, so a dependency cycle
//! reaching it again gets its uid back immediately instead of recursing.
//! Diagnostics accumulate on the side; a fatal error aborts the build
//! with the diagnostics explaining it already recorded.

mod module;

pub use module::{ModuleRecord, ModuleState};

use crate::artifact::DependencyTarget;
use crate::diagnostics::{Diagnostic, Messages};
use crate::error::Error;
use crate::handlers::{ContentHandler, JsonHandler, ScriptHandler, TextHandler};
use crate::paths;
use crate::resolver::{Resolution, Resolver, ResolverOptions};
use crate::sequence;
use crate::transform::TransformPass;
use crate::transport::Transport;
use futures::future::LocalBoxFuture;
use module::PackageInstance;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Graph construction options.
#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Build root; uids are paths relative to it.
    pub root: String,
    /// Restricted target: manifest override maps apply.
    pub restricted: bool,
    /// Dependency directory name searched at every ancestor.
    pub dep_dir: String,
    /// Fallback package location searched last.
    pub default_path: Option<String>,
    /// Extensions probed during resolution, in priority order.
    pub extensions: Vec<String>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            root: "/".to_string(),
            restricted: true,
            dep_dir: "node_modules".to_string(),
            default_path: None,
            extensions: vec![".js".to_string()],
        }
    }
}

/// A finished build: the entry's target plus every module reached.
#[derive(Debug, Serialize)]
pub struct BuildOutput {
    pub entry: DependencyTarget,
    pub modules: FxHashMap<String, ModuleRecord>,
}

/// Builds a module graph over a [`Transport`].
///
/// Single-consumer: methods take `&self` and interior state is guarded
/// by `RefCell`, never held across an await.
pub struct GraphBuilder<T> {
    root: String,
    transport: Rc<T>,
    resolver: Resolver<T>,
    messages: Messages,
    handlers: FxHashMap<String, Box<dyn ContentHandler>>,
    fallback: Box<dyn ContentHandler>,
    transforms: Vec<Box<dyn TransformPass>>,
    modules: RefCell<FxHashMap<String, ModuleRecord>>,
    packages: RefCell<FxHashMap<String, Vec<PackageInstance>>>,
    parse_cache: RefCell<FxHashMap<String, String>>,
}

impl<T: Transport> GraphBuilder<T> {
    #[must_use]
    pub fn new(transport: Rc<T>, options: GraphOptions) -> Self {
        let normalized = paths::normalize(&options.root);
        let root = if normalized.ends_with('/') {
            normalized
        } else {
            format!("{normalized}/")
        };

        let resolver = Resolver::new(
            Rc::clone(&transport),
            ResolverOptions {
                restricted: options.restricted,
                dep_dir: options.dep_dir,
                default_path: options.default_path,
                extensions: options.extensions,
            },
        );

        let mut handlers: FxHashMap<String, Box<dyn ContentHandler>> = FxHashMap::default();
        handlers.insert("js".to_string(), Box::new(ScriptHandler));
        handlers.insert("json".to_string(), Box::new(JsonHandler));
        handlers.insert("txt".to_string(), Box::new(TextHandler));

        Self {
            root,
            transport,
            resolver,
            messages: Messages::new(),
            handlers,
            fallback: Box::new(TextHandler),
            transforms: Vec::new(),
            modules: RefCell::new(FxHashMap::default()),
            packages: RefCell::new(FxHashMap::default()),
            parse_cache: RefCell::new(FxHashMap::default()),
        }
    }

    /// Register a content handler for an extension (no leading dot),
    /// replacing any previous handler for it.
    #[must_use]
    pub fn with_handler(mut self, extension: impl Into<String>, handler: Box<dyn ContentHandler>) -> Self {
        self.handlers.insert(extension.into(), handler);
        self
    }

    /// Append a transform pass; passes run in registration order.
    #[must_use]
    pub fn with_transform(mut self, pass: Box<dyn TransformPass>) -> Self {
        self.transforms.push(pass);
        self
    }

    #[must_use]
    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Build the graph from an entry specifier resolved against the root.
    pub async fn build(&self, specifier: &str) -> Result<BuildOutput, Error> {
        tracing::debug!(specifier, root = %self.root, "building module graph");
        let entry = self.require(&self.root, specifier).await?;
        let modules = self.modules.borrow().clone();
        tracing::debug!(modules = modules.len(), "graph complete");
        Ok(BuildOutput { entry, modules })
    }

    /// Resolve a specifier, recording a diagnostic on failure.
    pub async fn resolve(&self, from: &str, specifier: &str) -> Result<Resolution, Error> {
        match self.resolver.resolve(from, specifier).await {
            Ok(resolution) => Ok(resolution),
            Err(error) => {
                self.messages.error(
                    Diagnostic::new("ResolveError", format!("unable to resolve `{specifier}`"))
                        .with_source(self.uid_of(from)),
                );
                Err(error)
            }
        }
    }

    /// Resolve a specifier and pull the result into the graph. Builtins
    /// and disabled specifiers become markers without touching storage.
    pub async fn require(&self, from: &str, specifier: &str) -> Result<DependencyTarget, Error> {
        match self.resolve(from, specifier).await? {
            Resolution::Builtin(name) => Ok(DependencyTarget::Builtin(name)),
            Resolution::Unavailable => Ok(DependencyTarget::Unavailable),
            Resolution::Path(path) => {
                self.analyze(&path).await;
                let uid = self.include(&path).await?;
                Ok(DependencyTarget::Module(uid))
            }
        }
    }

    /// Ensure the module at a canonical path is in the graph and return
    /// its uid.
    ///
    /// The check-and-insert below is synchronous, so by the time anything
    /// yields the placeholder is visible to every other include of the
    /// same path. That is the cycle breaker.
    pub async fn include(&self, path: &str) -> Result<String, Error> {
        let uid = self.uid_of(path);
        {
            let mut modules = self.modules.borrow_mut();
            if modules.contains_key(&uid) {
                return Ok(uid);
            }
            modules.insert(uid.clone(), ModuleRecord::placeholder(&uid, path));
        }
        tracing::debug!(uid, "including module");

        self.set_state(&uid, ModuleState::Fetching);
        let content = match self.transport.fetch(path).await {
            Ok(content) => content,
            Err(error) => {
                self.messages.error(
                    Diagnostic::new("TransportError", format!("unable to read `{uid}`"))
                        .with_source(&uid),
                );
                self.set_state(&uid, ModuleState::Failed);
                return Err(Error::Transport {
                    path: path.to_string(),
                    message: error.message,
                });
            }
        };
        self.parse(path, &content).await
    }

    /// Parse already-fetched content into the graph: handler, transform
    /// chain, then the dependency pass over the discovered import sites.
    /// Completed parses are cached per canonical path.
    pub fn parse<'a>(
        &'a self,
        path: &'a str,
        content: &'a str,
    ) -> LocalBoxFuture<'a, Result<String, Error>> {
        Box::pin(async move {
            if let Some(uid) = self.parse_cache.borrow().get(path) {
                return Ok(uid.clone());
            }
            let uid = self.uid_of(path);
            {
                let mut modules = self.modules.borrow_mut();
                modules
                    .entry(uid.clone())
                    .or_insert_with(|| ModuleRecord::placeholder(&uid, path));
            }

            self.set_state(&uid, ModuleState::Parsing);
            let handler = self.handler_for(path);
            let artifact = match handler.handle(&uid, content).await {
                Ok(artifact) => artifact,
                Err(error) => {
                    let message = match &error {
                        Error::Parse { message, .. } => message.clone(),
                        other => other.to_string(),
                    };
                    self.messages
                        .error(Diagnostic::new("ParseError", message).with_source(&uid));
                    self.set_state(&uid, ModuleState::Failed);
                    return Err(error);
                }
            };

            self.set_state(&uid, ModuleState::Transforming);
            let uid_str: &str = &uid;
            let transformed = sequence::reduce(self.transforms.iter(), artifact, |acc, pass| {
                async move {
                    pass.transform(uid_str, acc).await.map_err(|error| match error {
                        transform @ Error::Transform { .. } => transform,
                        other => Error::Transform {
                            path: uid_str.to_string(),
                            pass: pass.name().to_string(),
                            message: other.to_string(),
                        },
                    })
                }
            })
            .await;
            let mut artifact = match transformed {
                Ok(artifact) => artifact,
                Err(error) => {
                    self.messages
                        .error(Diagnostic::new("TransformError", error.to_string()).with_source(&uid));
                    self.set_state(&uid, ModuleState::Failed);
                    return Err(error);
                }
            };

            let specs: Vec<String> = artifact
                .imports
                .iter()
                .map(|site| site.specifier.clone())
                .collect();
            let targets = match sequence::every(specs, |spec| async move {
                self.require(path, &spec).await
            })
            .await
            {
                Ok(targets) => targets,
                Err(error) => {
                    self.set_state(&uid, ModuleState::Failed);
                    return Err(error);
                }
            };
            for (site, target) in artifact.imports.iter_mut().zip(targets) {
                site.target = Some(target);
            }

            {
                let mut modules = self.modules.borrow_mut();
                if let Some(record) = modules.get_mut(&uid) {
                    record.artifact = Some(artifact);
                    record.advance(ModuleState::Ready);
                }
            }
            self.parse_cache
                .borrow_mut()
                .insert(path.to_string(), uid.clone());
            Ok(uid)
        })
    }

    /// Record which package a resolved path belongs to and warn when the
    /// same package name is found at more than one location. The first
    /// instance is warned about retroactively when the second turns up;
    /// after that, each new distinct location gets one warning.
    async fn analyze(&self, path: &str) {
        let Ok(root) = self.resolver.find_root(path).await else {
            return;
        };
        let Ok(manifest) = self
            .transport
            .fetch_manifest(&format!("{root}package.json"))
            .await
        else {
            return;
        };
        let Some(name) = manifest.name.clone() else {
            return;
        };
        let version = manifest.version.clone().unwrap_or_default();
        let location = self.uid_of(&root);

        let mut packages = self.packages.borrow_mut();
        let instances = packages.entry(name.clone()).or_default();
        if instances.iter().any(|instance| instance.path == location) {
            return;
        }
        instances.push(PackageInstance {
            version: version.clone(),
            path: location.clone(),
        });
        if instances.len() > 1 {
            if instances.len() == 2 {
                let first = &instances[0];
                self.messages.warn(
                    Diagnostic::new(&name, format!("duplicate v{} found", first.version))
                        .with_source(&first.path),
                );
            }
            self.messages.warn(
                Diagnostic::new(&name, format!("duplicate v{version} found"))
                    .with_source(&location),
            );
            tracing::warn!(package = %name, %version, "duplicate package instance");
        }
    }

    fn uid_of(&self, path: &str) -> String {
        paths::relative(&self.root, path)
    }

    fn handler_for(&self, path: &str) -> &dyn ContentHandler {
        let extension = paths::extname(path);
        self.handlers
            .get(extension.trim_start_matches('.'))
            .map_or(&*self.fallback, |handler| &**handler)
    }

    fn set_state(&self, uid: &str, state: ModuleState) {
        if let Some(record) = self.modules.borrow_mut().get_mut(uid) {
            record.advance(state);
        }
    }
}
