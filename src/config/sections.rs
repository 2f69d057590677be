// src/config/sections.rs

use serde_yaml::Value;
use std::collections::BTreeMap;

/// Every section as it appears on disk: scalars are read back as their
/// source text, so `0x1F` stays `0x1F` instead of becoming `31`.
type RawFile = BTreeMap<String, Option<BTreeMap<String, Option<String>>>>;

/// Section → key → value view of a config file, normalised before typing.
///
/// Section and key names are lower-cased so lookups are case-insensitive.
/// Null and empty values are dropped, and one layer of legacy single quotes
/// is removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    inner: BTreeMap<String, BTreeMap<String, String>>,
}

impl Sections {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        let raw: Option<RawFile> = serde_yaml::from_str(text)?;
        let mut inner = BTreeMap::new();

        for (name, body) in raw.unwrap_or_default() {
            let entries: BTreeMap<String, String> = body
                .unwrap_or_default()
                .into_iter()
                .filter_map(|(key, value)| {
                    let value = unquote(&value?).to_string();
                    (!value.is_empty()).then(|| (key.to_lowercase(), value))
                })
                .collect();
            inner
                .entry(name.to_lowercase())
                .or_insert_with(BTreeMap::new)
                .extend(entries);
        }

        Ok(Self { inner })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// YAML tree of plain strings, ready for `serde_yaml::from_value`.
    pub fn to_value(&self) -> Result<Value, serde_yaml::Error> {
        serde_yaml::to_value(&self.inner)
    }
}

fn unquote(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}
