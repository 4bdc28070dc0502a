//! Generative language model access and the fallback chain built on it

mod client;
mod fallback;

pub use client::{Candidate, DisabledGenerator, Generator, HttpGenerator};
pub use fallback::{
    build_prompt, substring_search, GenerationFallback, GenerationOutcome, NO_ANSWER,
};

#[cfg(test)]
pub(crate) use fallback::tests::FakeGenerator;

use crate::config::LlmConfig;
use crate::error::Result;
use std::sync::Arc;

/// Pick the generator the configuration asks for
pub fn generator_from_config(config: &LlmConfig) -> Result<Arc<dyn Generator>> {
    if config.enabled {
        Ok(Arc::new(HttpGenerator::new(config)?))
    } else {
        tracing::info!("Generative endpoint disabled; misses use substring search only");
        Ok(Arc::new(DisabledGenerator))
    }
}
