//! Knowledge base flattening
//!
//! Two flattenings exist. [`flatten`] feeds the lexical index: mappings are
//! recursed, everything else (lists included) becomes one line paired with
//! its original value. [`prompt_lines`] feeds the generative prompt: lists
//! and records are recursed as well, so every scalar gets its own line.

use super::types::{KbMap, KbValue, Scalar};

/// Flattened corpus with parallel text lines and original values.
///
/// `lines[i]` is always the rendering of `values[i]`.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    lines: Vec<String>,
    values: Vec<KbValue>,
}

impl Corpus {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn values(&self) -> &[KbValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<(&str, &KbValue)> {
        Some((self.lines.get(index)?.as_str(), self.values.get(index)?))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn push(&mut self, path: &str, value: &KbValue) {
        self.lines.push(format!("{}: {}", path, value));
        self.values.push(value.clone());
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Flatten a knowledge base for indexing
pub fn flatten(root: &KbMap) -> Corpus {
    let mut corpus = Corpus::default();
    walk(root, "", &mut corpus);
    corpus
}

fn walk(map: &KbMap, prefix: &str, corpus: &mut Corpus) {
    for (key, value) in map {
        let path = join_path(prefix, key);
        match value {
            KbValue::Mapping(inner) => walk(inner, &path, corpus),
            leaf => corpus.push(&path, leaf),
        }
    }
}

/// Flatten a knowledge base into prompt lines.
///
/// Mappings and records recurse by key, lists by position, nulls are
/// dropped.
pub fn prompt_lines(root: &KbMap) -> Vec<String> {
    let mut lines = Vec::new();
    for (key, value) in root {
        prompt_walk(value, key, &mut lines);
    }
    lines
}

fn prompt_walk(value: &KbValue, path: &str, lines: &mut Vec<String>) {
    match value {
        KbValue::Mapping(map) | KbValue::Record(map) => {
            for (key, inner) in map {
                prompt_walk(inner, &join_path(path, key), lines);
            }
        }
        KbValue::List(items) => {
            for (i, inner) in items.iter().enumerate() {
                prompt_walk(inner, &join_path(path, &i.to_string()), lines);
            }
        }
        KbValue::Scalar(Scalar::Null) => {}
        KbValue::Scalar(scalar) => lines.push(format!("{}: {}", path, scalar)),
    }
}
