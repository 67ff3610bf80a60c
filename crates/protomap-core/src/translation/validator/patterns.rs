//! Compiled regular expression cache
//!
//! Mapping tables carry regexes in two places: field `pattern` constraints and
//! `string_transform` replace operations. Both are compiled once when the table
//! is loaded and looked up here at conversion time.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use crate::{Error, Result};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

/// Default `flags` of a replace operation
pub const DEFAULT_REPLACE_FLAGS: &str = "g";

/// Regexes keyed by pattern and flags
#[derive(Debug, Clone, Default)]
pub struct PatternCache {
    compiled: HashMap<(String, String), Regex>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and store `pattern`, failing with a configuration error when it is invalid
    pub fn insert(&mut self, pattern: &str, flags: &str) -> Result<()> {
        let key = (pattern.to_string(), normalize_flags(flags));
        if !self.compiled.contains_key(&key) {
            let regex = compile(pattern, flags)?;
            self.compiled.insert(key, regex);
        }
        Ok(())
    }

    /// Compiled regex for `pattern`, compiling it when it was not seen at load
    pub fn get(&self, pattern: &str, flags: &str) -> Result<Regex> {
        let key = (pattern.to_string(), normalize_flags(flags));
        match self.compiled.get(&key) {
            Some(regex) => Ok(regex.clone()),
            None => compile(pattern, flags),
        }
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

/// Whether a flag string requests replacing every match
pub fn is_global(flags: &str) -> bool {
    flags.contains('g')
}

fn normalize_flags(flags: &str) -> String {
    let mut chars: Vec<char> = flags.chars().filter(|c| *c != 'g').collect();
    chars.sort_unstable();
    chars.dedup();
    chars.into_iter().collect()
}

/// Build a regex honoring the `i`, `m` and `s` flags
///
/// `g` is interpreted by the caller and `u` is implied; anything else is rejected.
fn compile(pattern: &str, flags: &str) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'g' | 'u' => {}
            other => {
                return Err(Error::configuration(format!(
                    "Unsupported regex flag '{}' in flags '{}' for pattern '{}'",
                    other, flags, pattern
                )))
            }
        }
    }
    builder.build().map_err(|e| Error::Configuration {
        message: format!("Invalid regex pattern '{}'", pattern),
        source: Some(e.into()),
    })
}
