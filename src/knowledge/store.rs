//! Knowledge base store with atomic snapshot reloads
//!
//! The builtin knowledge base is compiled into the binary. A JSON file named
//! in the configuration replaces it. Every (re)load builds a complete
//! [`KnowledgeSnapshot`] (KB + corpus + index) before swapping it in, so
//! readers never see a half-built index.

use super::flatten::{flatten, Corpus};
use super::types::{KbMap, KbValue};
use crate::error::{Error, Result};
use crate::retrieval::LexicalIndex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

const BUILTIN_KB: &str = include_str!("../../data/knowledge_base.json");

/// Immutable nested knowledge base
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    root: KbMap,
}

impl KnowledgeBase {
    pub fn new(root: KbMap) -> Self {
        Self { root }
    }

    /// The knowledge base shipped with the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_KB)
    }

    /// Parse a JSON document whose top level is an object
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        match KbValue::from_json(value) {
            KbValue::Mapping(root) => Ok(Self { root }),
            _ => Err(Error::Knowledge(
                "knowledge base must be a JSON object at the top level".to_string(),
            )),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn root(&self) -> &KbMap {
        &self.root
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.root
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// A knowledge base together with its flattened corpus and fitted index
#[derive(Debug)]
pub struct KnowledgeSnapshot {
    kb: KnowledgeBase,
    corpus: Corpus,
    index: LexicalIndex,
    built_at: i64,
}

impl KnowledgeSnapshot {
    /// Flatten and index a knowledge base
    pub fn build(kb: KnowledgeBase) -> Result<Self> {
        let corpus = flatten(kb.root());
        let index = LexicalIndex::build(corpus.lines())?;
        Ok(Self {
            kb,
            corpus,
            index,
            built_at: chrono::Utc::now().timestamp_millis(),
        })
    }

    pub fn kb(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn index(&self) -> &LexicalIndex {
        &self.index
    }

    pub fn built_at(&self) -> i64 {
        self.built_at
    }
}

/// Holder of the live knowledge snapshot
pub struct KnowledgeStore {
    source: Option<PathBuf>,
    current: RwLock<Arc<KnowledgeSnapshot>>,
}

impl KnowledgeStore {
    /// Load from `source`, or the builtin knowledge base when `None`
    pub fn load(source: Option<PathBuf>) -> Result<Self> {
        let snapshot = Self::build_snapshot(source.as_deref())?;
        tracing::info!(
            lines = snapshot.corpus().len(),
            vocabulary = snapshot.index().vocabulary_len(),
            "Knowledge base loaded"
        );
        Ok(Self {
            source,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Wrap an already-built knowledge base (no reload source)
    pub fn from_kb(kb: KnowledgeBase) -> Result<Self> {
        Ok(Self {
            source: None,
            current: RwLock::new(Arc::new(KnowledgeSnapshot::build(kb)?)),
        })
    }

    fn build_snapshot(source: Option<&Path>) -> Result<KnowledgeSnapshot> {
        let kb = match source {
            Some(path) => KnowledgeBase::from_path(path).map_err(|e| {
                Error::Knowledge(format!("failed to load {}: {}", path.display(), e))
            })?,
            None => KnowledgeBase::builtin()?,
        };
        KnowledgeSnapshot::build(kb)
    }

    /// Current snapshot; stays valid even if a reload happens meanwhile
    pub async fn snapshot(&self) -> Arc<KnowledgeSnapshot> {
        self.current.read().await.clone()
    }

    /// Rebuild from the source and swap. On failure the old snapshot stays.
    pub async fn reload(&self) -> Result<Arc<KnowledgeSnapshot>> {
        let snapshot = Arc::new(Self::build_snapshot(self.source.as_deref())?);
        *self.current.write().await = snapshot.clone();
        tracing::info!(lines = snapshot.corpus().len(), "Knowledge base reloaded");
        Ok(snapshot)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
