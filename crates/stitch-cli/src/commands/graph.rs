//! `stitch graph` command implementation.
//!
//! Builds the module graph for an entry specifier and prints it, either
//! human-readable or as one stable JSON document on stdout.

use miette::{miette, IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;
use stitch_core::{
    paths, DependencyTarget, Diagnostic, FsTransport, GraphBuilder, GraphOptions, ModuleRecord,
};

/// Graph command action.
#[derive(Debug, Clone)]
pub struct GraphAction {
    /// Entry specifier, resolved against the root.
    pub entry: String,
    /// Build root directory.
    pub root: PathBuf,
    /// Apply manifest override maps (false targets the host runtime).
    pub restricted: bool,
    /// Dependency directory name.
    pub dep_dir: String,
    /// Fallback package location searched last.
    pub default_path: Option<PathBuf>,
    /// Extensions probed during resolution.
    pub extensions: Vec<String>,
}

/// JSON output for the graph command.
#[derive(Serialize)]
struct GraphResultJson {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<DependencyTarget>,
    modules: Vec<ModuleRecord>,
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    duration_ms: u64,
}

/// Run the graph command.
pub async fn run(action: GraphAction, json: bool) -> Result<()> {
    let start = Instant::now();

    let root = paths::from_system(&action.root);
    let transport = Rc::new(FsTransport::new());
    let graph = GraphBuilder::new(
        transport,
        GraphOptions {
            root,
            restricted: action.restricted,
            dep_dir: action.dep_dir,
            default_path: action.default_path.as_deref().map(paths::from_system),
            extensions: action.extensions,
        },
    );

    let outcome = graph.build(&action.entry).await;
    let duration_ms = start.elapsed().as_millis() as u64;
    let errors: Vec<Diagnostic> = graph.messages().errors().clone();
    let warnings: Vec<Diagnostic> = graph.messages().warnings().clone();

    match outcome {
        Ok(output) => {
            let mut modules: Vec<ModuleRecord> = output.modules.into_values().collect();
            modules.sort_by(|a, b| a.uid.cmp(&b.uid));

            if json {
                let result = GraphResultJson {
                    ok: true,
                    entry: Some(output.entry),
                    modules,
                    errors,
                    warnings,
                    duration_ms,
                };
                println!("{}", serde_json::to_string(&result).into_diagnostic()?);
            } else {
                println!(
                    "graph: {} module(s) from `{}` ({duration_ms}ms)",
                    modules.len(),
                    action.entry
                );
                for module in &modules {
                    println!("  {}", module.uid);
                }
                for warning in &warnings {
                    match &warning.source {
                        Some(source) => {
                            eprintln!("  warning: {}: {} ({source})", warning.id, warning.message);
                        }
                        None => eprintln!("  warning: {}: {}", warning.id, warning.message),
                    }
                }
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let result = GraphResultJson {
                    ok: false,
                    entry: None,
                    modules: Vec::new(),
                    errors,
                    warnings,
                    duration_ms,
                };
                println!("{}", serde_json::to_string(&result).into_diagnostic()?);
                std::process::exit(1);
            }
            for diagnostic in &errors {
                match &diagnostic.source {
                    Some(source) => {
                        eprintln!("error: {}: {} ({source})", diagnostic.id, diagnostic.message);
                    }
                    None => eprintln!("error: {}: {}", diagnostic.id, diagnostic.message),
                }
            }
            Err(miette!("{e}"))
        }
    }
}
