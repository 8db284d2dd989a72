//! Loading template sources by logical name.
use std::collections::HashMap;

use crate::{error::Error, Result};

/// Trait for types that map a logical template name to source text.
pub trait Loader {
    /// Load the source for `name`, yielding the text and the
    /// canonical name to cache and report errors under.
    fn load(&self, name: &str) -> Result<(String, String)>;
}

/// Loader over an in-memory map of sources.
#[derive(Default)]
pub struct MemoryLoader {
    sources: HashMap<String, String>,
}

impl MemoryLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a template source under a logical name.
    pub fn insert(&mut self, name: &str, source: &str) {
        self.sources
            .insert(name.to_string(), source.to_string());
    }
}

impl Loader for MemoryLoader {
    fn load(&self, name: &str) -> Result<(String, String)> {
        match self.sources.get(name) {
            Some(source) => Ok((source.clone(), name.to_string())),
            None => Err(Error::TemplateNotFound(name.to_string())),
        }
    }
}

/// Resolve a logical include path against the canonical name of the
/// template requesting it.
///
/// A leading `/` makes the path absolute; otherwise it is joined to
/// the directory part of `current`. `.` and `..` segments normalize
/// away and empty segments are dropped.
pub fn resolve(current: &str, path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if !path.starts_with('/') {
        if let Some(idx) = current.rfind('/') {
            for segment in current[..idx].split('/') {
                push_segment(&mut parts, segment);
            }
        }
    }
    for segment in path.split('/') {
        push_segment(&mut parts, segment);
    }
    parts.join("/")
}

fn push_segment<'a>(parts: &mut Vec<&'a str>, segment: &'a str) {
    match segment {
        "" | "." => {}
        ".." => {
            parts.pop();
        }
        _ => parts.push(segment),
    }
}
