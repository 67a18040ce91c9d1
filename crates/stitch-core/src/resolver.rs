//! Hierarchical, manifest-aware specifier resolution.
//!
//! Maps `(from, specifier)` to exactly one of: a canonical path, a
//! host-builtin marker, or the "not available" sentinel. Relative and
//! absolute specifiers go through file/directory loading with extension
//! probing; bare specifiers walk the ancestor dependency directories;
//! in restricted mode the result is additionally run through manifest
//! override maps, which may disable a specifier or redirect it (builtins
//! included, so a manifest can shim `util` with a concrete file).
//!
//! The resolver caches nothing itself; callers own caching.

use crate::error::Error;
use crate::manifest::{Manifest, Override, OverrideMap};
use crate::paths;
use crate::sequence;
use crate::transport::{Transport, TransportError};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

/// Module names supplied by the host execution environment rather than
/// resolved from files.
pub const HOST_BUILTINS: &[&str] = &[
    "_debugger", "_linklist", "assert", "buffer", "child_process", "console", "constants",
    "crypto", "cluster", "dgram", "dns", "domain", "events", "freelist", "fs", "http", "https",
    "module", "net", "os", "path", "punycode", "querystring", "readline", "repl", "stream",
    "_stream_readable", "_stream_writable", "_stream_duplex", "_stream_transform",
    "_stream_passthrough", "string_decoder", "sys", "timers", "tls", "tty", "url", "util", "vm",
    "zlib",
];

/// Whether a specifier names a host builtin.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    HOST_BUILTINS.contains(&name)
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A canonical file path.
    Path(String),
    /// A host builtin, passed through as a marker.
    Builtin(String),
    /// Explicitly disabled by an override map.
    Unavailable,
}

/// Resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Restricted target: apply manifest override maps and route
    /// builtins through them instead of passing them straight through.
    pub restricted: bool,
    /// Name of the dependency directory searched at every ancestor.
    pub dep_dir: String,
    /// Fallback package location searched after the filesystem root.
    pub default_path: Option<String>,
    /// Extensions probed when a specifier names no existing file,
    /// in priority order.
    pub extensions: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            restricted: true,
            dep_dir: "node_modules".to_string(),
            default_path: None,
            extensions: vec![".js".to_string()],
        }
    }
}

/// Hierarchical path/package resolver over a [`Transport`].
pub struct Resolver<T> {
    transport: Rc<T>,
    restricted: bool,
    dep_dir: String,
    default_path: Option<String>,
    extensions: Vec<String>,
}

impl<T: Transport> Resolver<T> {
    #[must_use]
    pub fn new(transport: Rc<T>, options: ResolverOptions) -> Self {
        Self {
            transport,
            restricted: options.restricted,
            dep_dir: options.dep_dir,
            default_path: options
                .default_path
                .map(|p| paths::normalize(&format!("{p}/"))),
            extensions: options.extensions,
        }
    }

    /// Resolve `specifier` as written at an import site in `from`.
    ///
    /// `from` may be a file or a directory; resolution starts from its
    /// directory. Any failure along the way collapses into `NotFound`
    /// for the original specifier.
    pub async fn resolve(&self, from: &str, specifier: &str) -> Result<Resolution, Error> {
        let from_dir = paths::dirname(from);
        match self.resolve_from_dir(&from_dir, specifier).await {
            Ok(resolution) => {
                tracing::debug!(specifier, from, ?resolution, "resolved");
                Ok(resolution)
            }
            Err(error) => {
                tracing::debug!(specifier, from, %error, "resolution failed");
                Err(Error::not_found(specifier, from))
            }
        }
    }

    /// Nearest ancestor directory of `path` holding a manifest.
    ///
    /// Per-candidate read failures mean "no manifest here"; the search
    /// failing everywhere is a `NotFound`.
    pub async fn find_root(&self, path: &str) -> Result<String, Error> {
        let start = paths::dirname(path);
        let dirs = self.candidate_dirs(&start);
        let found = sequence::find(dirs, |dir| async move {
            self.transport.fetch(&format!("{dir}package.json")).await?;
            Ok::<_, TransportError>(dir)
        })
        .await;
        match found {
            Ok(Some(dir)) => Ok(dir),
            _ => Err(Error::not_found(path, start)),
        }
    }

    fn resolve_from_dir<'a>(
        &'a self,
        dir: &'a str,
        specifier: &'a str,
    ) -> LocalBoxFuture<'a, Result<Resolution, Error>> {
        Box::pin(async move {
            if is_builtin(specifier) {
                if !self.restricted {
                    return Ok(Resolution::Builtin(specifier.to_string()));
                }
                let dirs = self.candidate_dirs(dir);
                return self.route(dirs, Resolution::Builtin(specifier.to_string())).await;
            }

            let resolved = Resolution::Path(self.resolve_plain(dir, specifier).await?);
            if self.restricted {
                self.route_from(dir, resolved).await
            } else {
                Ok(resolved)
            }
        })
    }

    /// Base resolution, no override rewriting.
    async fn resolve_plain(&self, dir: &str, specifier: &str) -> Result<String, Error> {
        if paths::is_relative(specifier) {
            self.load(paths::resolve(dir, specifier)).await
        } else if paths::is_absolute(specifier) {
            self.load(paths::normalize(specifier)).await
        } else {
            self.resolve_package(dir, specifier).await
        }
    }

    /// Resolve a path as a file, falling back to a directory.
    fn load<'a>(&'a self, path: String) -> LocalBoxFuture<'a, Result<String, Error>> {
        Box::pin(async move {
            if !path.ends_with('/') {
                if let Ok(found) = self.try_file(&path).await {
                    return Ok(found);
                }
            }
            let dir = if path.ends_with('/') {
                path
            } else {
                format!("{path}/")
            };
            self.try_directory(dir).await
        })
    }

    /// Probe a file name against the extension list. The literal name is
    /// only tried when it already carries an extension.
    async fn try_file(&self, path: &str) -> Result<String, Error> {
        let mut candidates: Vec<&str> = Vec::new();
        if !paths::extname(path).is_empty() {
            candidates.push("");
        }
        candidates.extend(self.extensions.iter().map(String::as_str));

        let found = sequence::find(candidates, |ext| {
            let full = format!("{path}{ext}");
            async move {
                self.transport.fetch(&full).await?;
                Ok::<_, TransportError>(full)
            }
        })
        .await;
        match found {
            Ok(Some(full)) => Ok(full),
            _ => Err(Error::not_found(path, paths::dirname(path))),
        }
    }

    /// Resolve a directory through its manifest's effective main entry.
    /// Manifest absence is tolerated; the main then defaults to `index`.
    ///
    /// Only an explicitly named main gets the full file-then-directory
    /// attempt. The defaulted `index` is probed as a file only: recursing
    /// the directory attempt for it would walk `index/index/...` without
    /// end on paths that do not exist.
    async fn try_directory(&self, dir: String) -> Result<String, Error> {
        let manifest = match self.transport.fetch_manifest(&format!("{dir}package.json")).await {
            Ok(manifest) => manifest,
            Err(_) => Rc::new(Manifest::default()),
        };
        let target = paths::resolve(&dir, manifest.effective_main());
        // A main of "." or "./" would recurse into the same directory forever.
        if target == dir {
            return Err(Error::not_found(&dir, &dir));
        }
        if manifest.has_entry() {
            self.load(target).await
        } else {
            self.try_file(&target).await
        }
    }

    /// Bare package resolution: walk the ancestor dependency directories
    /// for the first existing package manifest, then load the remainder
    /// against that package's directory.
    async fn resolve_package(&self, dir: &str, specifier: &str) -> Result<String, Error> {
        let (name, rest) = split_package(specifier);
        let dep_dir = &self.dep_dir;

        let dirs = self.candidate_dirs(dir);
        let found = sequence::find(dirs, |base| async move {
            let manifest_path = format!("{base}{dep_dir}/{name}/package.json");
            self.transport.fetch(&manifest_path).await?;
            Ok::<_, TransportError>(format!("{base}{dep_dir}/{name}/"))
        })
        .await;

        let package_dir = match found {
            Ok(Some(package_dir)) => package_dir,
            _ => return Err(Error::not_found(specifier, dir)),
        };
        match rest {
            Some(rest) => self.load(paths::resolve(&package_dir, rest)).await,
            None => self.load(package_dir).await,
        }
    }

    /// Override rewriting for a canonical target: search the requesting
    /// file's ancestors with the target's own package root first.
    async fn route_from(&self, from_dir: &str, target: Resolution) -> Result<Resolution, Error> {
        let mut dirs = self.candidate_dirs(from_dir);
        if let Resolution::Path(path) = &target {
            let root = self.find_root(path).await?;
            if dirs.first() != Some(&root) {
                dirs.insert(0, root);
            }
        }
        self.route(dirs, target).await
    }

    /// First manifest whose override map matches the target decides; no
    /// match anywhere leaves the target unchanged.
    async fn route(&self, dirs: Vec<String>, target: Resolution) -> Result<Resolution, Error> {
        for dir in dirs {
            let Ok(manifest) = self.transport.fetch_manifest(&format!("{dir}package.json")).await
            else {
                continue;
            };
            let Some(map) = manifest.overrides() else {
                continue;
            };
            if let Some(rerouted) = self.apply_overrides(&dir, map, &target).await? {
                return Ok(rerouted);
            }
        }
        Ok(target)
    }

    /// Test every key of one override map against the target, in the
    /// manifest's own key order. Keys are resolved like any specifier
    /// (builtin names compared directly); a key that fails base
    /// resolution fails the whole resolution.
    async fn apply_overrides(
        &self,
        dir: &str,
        map: &OverrideMap,
        target: &Resolution,
    ) -> Result<Option<Resolution>, Error> {
        for (key, rule) in map.iter() {
            let matched = if is_builtin(key) {
                matches!(target, Resolution::Builtin(name) if name.as_str() == key)
            } else {
                let candidate = self.resolve_plain(dir, key).await?;
                matches!(target, Resolution::Path(path) if *path == candidate)
            };
            if !matched {
                continue;
            }
            return match rule {
                Override::Disabled => Ok(Some(Resolution::Unavailable)),
                // The replacement goes through the full alias-aware
                // pipeline again, so redirects chain.
                Override::Redirect(spec) => self.resolve_from_dir(dir, spec).await.map(Some),
            };
        }
        Ok(None)
    }

    /// Ordered candidate directories: every ancestor of `dir` (itself
    /// included, directories named as the dependency directory skipped),
    /// the root, then the configured fallback location last.
    fn candidate_dirs(&self, dir: &str) -> Vec<String> {
        let trimmed = dir.trim_start_matches('/').trim_end_matches('/');
        let parts: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };

        let mut out = Vec::new();
        for i in (1..=parts.len()).rev() {
            if parts[i - 1] == self.dep_dir {
                continue;
            }
            out.push(format!("/{}/", parts[..i].join("/")));
        }
        out.push("/".to_string());
        if let Some(default_path) = &self.default_path {
            out.push(default_path.clone());
        }
        out
    }
}

fn split_package(specifier: &str) -> (&str, Option<&str>) {
    let split_at = if specifier.starts_with('@') {
        specifier.match_indices('/').nth(1).map(|(i, _)| i)
    } else {
        specifier.find('/')
    };
    match split_at {
        Some(i) => (&specifier[..i], Some(&specifier[i + 1..])),
        None => (specifier, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn fixture() -> MemoryTransport {
        MemoryTransport::new()
            .file("/app/package.json", r#"{"name": "app", "version": "1.0.0"}"#)
            .file("/app/src/main.js", "")
            .file("/app/src/util.js", "")
            .file("/app/src/widgets/index.js", "")
            .file(
                "/app/node_modules/left-pad/package.json",
                r#"{"name": "left-pad", "version": "1.3.0", "main": "./lib/index.js"}"#,
            )
            .file("/app/node_modules/left-pad/lib/index.js", "")
    }

    fn resolver(transport: MemoryTransport, restricted: bool) -> Resolver<MemoryTransport> {
        Resolver::new(
            Rc::new(transport),
            ResolverOptions {
                restricted,
                ..ResolverOptions::default()
            },
        )
    }

    #[tokio::test]
    async fn relative_with_extension_probing() {
        let r = resolver(fixture(), false);
        let resolved = r.resolve("/app/src/main.js", "./util").await.unwrap();
        assert_eq!(resolved, Resolution::Path("/app/src/util.js".to_string()));
    }

    #[tokio::test]
    async fn relative_with_literal_extension() {
        let r = resolver(fixture(), false);
        let resolved = r.resolve("/app/src/main.js", "./util.js").await.unwrap();
        assert_eq!(resolved, Resolution::Path("/app/src/util.js".to_string()));
    }

    #[tokio::test]
    async fn directory_falls_back_to_index() {
        let r = resolver(fixture(), false);
        let resolved = r.resolve("/app/src/main.js", "./widgets").await.unwrap();
        assert_eq!(
            resolved,
            Resolution::Path("/app/src/widgets/index.js".to_string())
        );
    }

    #[tokio::test]
    async fn bare_package_uses_manifest_main() {
        let r = resolver(fixture(), false);
        let resolved = r.resolve("/app/src/main.js", "left-pad").await.unwrap();
        assert_eq!(
            resolved,
            Resolution::Path("/app/node_modules/left-pad/lib/index.js".to_string())
        );
    }

    #[tokio::test]
    async fn package_subpath() {
        let r = resolver(fixture(), false);
        let resolved = r
            .resolve("/app/src/main.js", "left-pad/lib/index")
            .await
            .unwrap();
        assert_eq!(
            resolved,
            Resolution::Path("/app/node_modules/left-pad/lib/index.js".to_string())
        );
    }

    #[tokio::test]
    async fn builtin_passes_through_unrestricted() {
        let r = resolver(fixture(), false);
        let resolved = r.resolve("/app/src/main.js", "fs").await.unwrap();
        assert_eq!(resolved, Resolution::Builtin("fs".to_string()));
    }

    #[tokio::test]
    async fn missing_specifier_is_not_found() {
        let r = resolver(fixture(), false);
        let err = r.resolve("/app/src/main.js", "./missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { specifier, .. } if specifier == "./missing"));
    }

    #[tokio::test]
    async fn missing_directory_chain_terminates_as_not_found() {
        // Without a manifest the directory attempt probes only an index
        // file; it must not descend into missing/index/index/... forever.
        let r = resolver(fixture(), false);
        for specifier in ["./missing", "../nowhere/deep", "/app/absent/also-absent"] {
            let err = r.resolve("/app/src/main.js", specifier).await.unwrap_err();
            assert!(matches!(err, Error::NotFound { .. }), "{specifier}");
        }
    }

    #[tokio::test]
    async fn explicit_main_may_name_a_directory() {
        let transport = fixture()
            .file(
                "/app/node_modules/wide/package.json",
                r#"{"name": "wide", "main": "./lib"}"#,
            )
            .file("/app/node_modules/wide/lib/index.js", "");
        let r = resolver(transport, false);
        let resolved = r.resolve("/app/src/main.js", "wide").await.unwrap();
        assert_eq!(
            resolved,
            Resolution::Path("/app/node_modules/wide/lib/index.js".to_string())
        );
    }

    #[tokio::test]
    async fn resolution_is_deterministic() {
        let r = resolver(fixture(), false);
        let first = r.resolve("/app/src/main.js", "left-pad").await.unwrap();
        let second = r.resolve("/app/src/main.js", "left-pad").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn default_path_is_searched_last() {
        let transport = fixture()
            .file(
                "/fallback/node_modules/extra/package.json",
                r#"{"name": "extra"}"#,
            )
            .file("/fallback/node_modules/extra/index.js", "");
        let r = Resolver::new(
            Rc::new(transport),
            ResolverOptions {
                restricted: false,
                default_path: Some("/fallback".to_string()),
                ..ResolverOptions::default()
            },
        );
        let resolved = r.resolve("/app/src/main.js", "extra").await.unwrap();
        assert_eq!(
            resolved,
            Resolution::Path("/fallback/node_modules/extra/index.js".to_string())
        );
    }

    #[tokio::test]
    async fn find_root_returns_owning_package() {
        let r = resolver(fixture(), false);
        let root = r
            .find_root("/app/node_modules/left-pad/lib/index.js")
            .await
            .unwrap();
        assert_eq!(root, "/app/node_modules/left-pad/");
    }

    #[tokio::test]
    async fn override_disables_builtin() {
        let transport = fixture().file(
            "/app/package.json",
            r#"{"name": "app", "browser": {"fs": false}}"#,
        );
        let r = resolver(transport, true);
        let resolved = r.resolve("/app/src/main.js", "fs").await.unwrap();
        assert_eq!(resolved, Resolution::Unavailable);
    }

    #[tokio::test]
    async fn override_redirects_file() {
        let transport = fixture()
            .file(
                "/app/package.json",
                r#"{"name": "app", "browser": {"./src/util.js": "./src/util-browser.js"}}"#,
            )
            .file("/app/src/util-browser.js", "");
        let r = resolver(transport, true);
        let resolved = r.resolve("/app/src/main.js", "./util").await.unwrap();
        assert_eq!(
            resolved,
            Resolution::Path("/app/src/util-browser.js".to_string())
        );
    }

    #[tokio::test]
    async fn override_shims_builtin_with_file() {
        let transport = fixture()
            .file(
                "/app/package.json",
                r#"{"name": "app", "browser": {"util": "./src/util-shim.js"}}"#,
            )
            .file("/app/src/util-shim.js", "");
        let r = resolver(transport, true);
        let resolved = r.resolve("/app/src/main.js", "util").await.unwrap();
        assert_eq!(
            resolved,
            Resolution::Path("/app/src/util-shim.js".to_string())
        );
    }

    #[tokio::test]
    async fn package_override_applies_to_its_own_importers() {
        // The target's owning package root is searched first, so a
        // package can disable a specifier for files importing it.
        let transport = fixture()
            .file(
                "/app/node_modules/iso/package.json",
                r#"{"name": "iso", "version": "2.0.0", "browser": {"./server.js": false}}"#,
            )
            .file("/app/node_modules/iso/index.js", "")
            .file("/app/node_modules/iso/server.js", "");
        let r = resolver(transport, true);
        let resolved = r
            .resolve("/app/node_modules/iso/index.js", "./server.js")
            .await
            .unwrap();
        assert_eq!(resolved, Resolution::Unavailable);
    }

    #[tokio::test]
    async fn override_match_follows_manifest_key_order() {
        // Both keys resolve to the same target; the first entry in the
        // manifest wins, not the alphabetically first.
        let transport = fixture()
            .file(
                "/app/package.json",
                r#"{"name": "app", "browser": {"./src/util.js": false, "./src/util": "./src/util-browser.js"}}"#,
            )
            .file("/app/src/util-browser.js", "");
        let r = resolver(transport, true);
        let resolved = r.resolve("/app/src/main.js", "./util").await.unwrap();
        assert_eq!(resolved, Resolution::Unavailable);
    }

    #[tokio::test]
    async fn unmatched_overrides_leave_target_unchanged() {
        let transport = fixture().file(
            "/app/package.json",
            r#"{"name": "app", "browser": {"fs": false}}"#,
        );
        let r = resolver(transport, true);
        let resolved = r.resolve("/app/src/main.js", "./util").await.unwrap();
        assert_eq!(resolved, Resolution::Path("/app/src/util.js".to_string()));
    }

    #[test]
    fn split_package_handles_scopes() {
        assert_eq!(split_package("pkg"), ("pkg", None));
        assert_eq!(split_package("pkg/sub/path"), ("pkg", Some("sub/path")));
        assert_eq!(split_package("@scope/pkg"), ("@scope/pkg", None));
        assert_eq!(split_package("@scope/pkg/sub"), ("@scope/pkg", Some("sub")));
    }
}
