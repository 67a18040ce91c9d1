//! Package manifest model.
//!
//! A manifest (`package.json`) describes a directory: its `name`,
//! `version`, `main` entry, and an optional `browser` override field used
//! by the restricted build target. The override field is either a string
//! (whole-package entry redirect) or a map from specifier-or-builtin-name
//! to `false` (disable) or a replacement specifier.

use serde::de::{self, Deserializer, MapAccess};
use serde::Deserialize;
use std::fmt;

/// Parsed manifest metadata. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub main: Option<String>,
    #[serde(default)]
    pub browser: Option<BrowserField>,
}

/// The `browser` field, in either of its two shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BrowserField {
    Entry(String),
    Map(OverrideMap),
}

/// One override-map entry: disable the matched specifier, or redirect it
/// to a replacement specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Override {
    Disabled,
    Redirect(String),
}

impl<'de> Deserialize<'de> for Override {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Specifier(String),
            Toggle(bool),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Specifier(spec) => Ok(Override::Redirect(spec)),
            Raw::Toggle(false) => Ok(Override::Disabled),
            Raw::Toggle(true) => Err(de::Error::custom("override value `true` has no meaning")),
        }
    }
}

/// Override entries in the manifest's own key order. Matching walks the
/// entries front to back, so the first matching key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideMap(Vec<(String, Override)>);

impl OverrideMap {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Override)> {
        self.0.iter().map(|(key, rule)| (key.as_str(), rule))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Override> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, rule)| rule)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for OverrideMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = OverrideMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of specifier overrides")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry()? {
                    entries.push(entry);
                }
                Ok(OverrideMap(entries))
            }
        }

        deserializer.deserialize_map(Visitor)
    }
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The directory's effective entry: a string-valued override field
    /// redirects the whole package, else `main`, defaulting to `"index"`.
    #[must_use]
    pub fn effective_main(&self) -> &str {
        if let Some(BrowserField::Entry(entry)) = &self.browser {
            return entry;
        }
        self.main.as_deref().unwrap_or("index")
    }

    /// Whether the manifest names an entry explicitly rather than
    /// falling back to the `index` default.
    #[must_use]
    pub fn has_entry(&self) -> bool {
        self.main.is_some() || matches!(&self.browser, Some(BrowserField::Entry(_)))
    }

    /// The override map, when the field carries one.
    #[must_use]
    pub fn overrides(&self) -> Option<&OverrideMap> {
        match &self.browser {
            Some(BrowserField::Map(map)) => Some(map),
            _ => None,
        }
    }
}
