//! Content handlers: raw text in, [`Artifact`] out.
//!
//! Handlers are keyed by file extension on the graph builder; the path a
//! handler receives is the module's uid, used only for error context.
//! The script handler performs a lexical scan for `require("...")` and
//! `require.resolve("...")` call sites with literal arguments; it does
//! not evaluate anything and keeps every call site, duplicates included.

use crate::artifact::{Artifact, ArtifactKind, ImportKind, ImportSite};
use crate::error::Error;
use futures::future::LocalBoxFuture;
use futures::FutureExt;

/// Turns fetched content into an artifact.
pub trait ContentHandler {
    fn handle<'a>(&'a self, path: &'a str, content: &'a str)
        -> LocalBoxFuture<'a, Result<Artifact, Error>>;
}

/// Opaque text: carried as-is, no imports.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextHandler;

impl ContentHandler for TextHandler {
    fn handle<'a>(
        &'a self,
        _path: &'a str,
        content: &'a str,
    ) -> LocalBoxFuture<'a, Result<Artifact, Error>> {
        async move { Ok(Artifact::new(ArtifactKind::Text, content)) }.boxed_local()
    }
}

/// JSON data: validated, carried as source text, no imports.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonHandler;

impl ContentHandler for JsonHandler {
    fn handle<'a>(
        &'a self,
        path: &'a str,
        content: &'a str,
    ) -> LocalBoxFuture<'a, Result<Artifact, Error>> {
        async move {
            serde_json::from_str::<serde_json::Value>(content).map_err(|e| Error::Parse {
                path: path.to_string(),
                message: e.to_string(),
            })?;
            Ok(Artifact::new(ArtifactKind::Json, content))
        }
        .boxed_local()
    }
}

/// Script source: scanned for import sites.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptHandler;

impl ContentHandler for ScriptHandler {
    fn handle<'a>(
        &'a self,
        _path: &'a str,
        content: &'a str,
    ) -> LocalBoxFuture<'a, Result<Artifact, Error>> {
        async move {
            let mut artifact = Artifact::new(ArtifactKind::Script, content);
            artifact.imports = scan_imports(content);
            Ok(artifact)
        }
        .boxed_local()
    }
}

/// Lexical scan for `require` call sites with a single string-literal
/// argument. Comments and string literals are skipped, so a mention in
/// either never counts.
fn scan_imports(source: &str) -> Vec<ImportSite> {
    let chars: Vec<char> = source.chars().collect();
    let mut imports = Vec::new();
    let mut line: u32 = 1;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\n' => {
                line += 1;
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() {
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            quote @ ('"' | '\'' | '`') => {
                i = skip_string(&chars, i, quote, &mut line);
            }
            'r' if is_word_start(&chars, i) && matches_word(&chars, i, "require") => {
                let after = i + "require".len();
                if let Some((site, next)) = match_call(&chars, after, line) {
                    imports.push(site);
                    i = next;
                } else {
                    i = after;
                }
            }
            _ => {
                i += 1;
            }
        }
    }
    imports
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_word_start(chars: &[char], i: usize) -> bool {
    i == 0 || (!is_ident_char(chars[i - 1]) && chars[i - 1] != '.')
}

fn matches_word(chars: &[char], i: usize, word: &str) -> bool {
    let end = i + word.len();
    if end > chars.len() || !chars[i..end].iter().copied().eq(word.chars()) {
        return false;
    }
    !chars.get(end).is_some_and(|c| is_ident_char(*c))
}

/// Parse the remainder of a call site after the `require` keyword:
/// optional `.resolve`, then `( "literal" )`. Returns the import site
/// and the index just past the closing parenthesis.
fn match_call(chars: &[char], mut i: usize, line: u32) -> Option<(ImportSite, usize)> {
    i = skip_inline_space(chars, i);
    let kind = if chars.get(i) == Some(&'.') {
        let after_dot = skip_inline_space(chars, i + 1);
        if !matches_word(chars, after_dot, "resolve") {
            return None;
        }
        i = skip_inline_space(chars, after_dot + "resolve".len());
        ImportKind::Resolve
    } else {
        ImportKind::Require
    };

    if chars.get(i) != Some(&'(') {
        return None;
    }
    i = skip_inline_space(chars, i + 1);
    let quote = *chars.get(i)?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    i += 1;
    let start = i;
    while i < chars.len() && chars[i] != quote {
        if chars[i] == '\\' || chars[i] == '\n' {
            return None;
        }
        i += 1;
    }
    if i >= chars.len() {
        return None;
    }
    let specifier: String = chars[start..i].iter().collect();
    i = skip_inline_space(chars, i + 1);
    if chars.get(i) != Some(&')') {
        return None;
    }
    Some((ImportSite::new(specifier, kind, Some(line)), i + 1))
}

fn skip_inline_space(chars: &[char], mut i: usize) -> usize {
    while chars.get(i).is_some_and(|c| *c == ' ' || *c == '\t') {
        i += 1;
    }
    i
}

fn skip_string(chars: &[char], mut i: usize, quote: char, line: &mut u32) -> usize {
    i += 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '\n' => {
                *line += 1;
                i += 1;
            }
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    i
}
