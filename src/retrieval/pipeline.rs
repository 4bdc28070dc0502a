//! Retrieval pipeline: lexical match, then generation fallback

use crate::config::DEFAULT_THRESHOLD;
use crate::error::{Error, Result};
use crate::knowledge::{KbValue, KnowledgeStore};
use crate::llm::{GenerationFallback, GenerationOutcome};
use serde::Serialize;
use std::sync::Arc;

/// Tagged pipeline result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Answer {
    /// Lexical match against the knowledge base
    Direct {
        value: KbValue,
        line: String,
        score: f64,
    },
    /// Text from the generative endpoint
    Generated { text: String },
    /// Substring match or the no-answer sentinel
    Fallback { text: String },
}

impl Answer {
    /// Displayable rendering of the answer
    pub fn text(&self) -> String {
        match self {
            Self::Direct { value, .. } => value.to_string(),
            Self::Generated { text } | Self::Fallback { text } => text.clone(),
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::Generated { .. } => "generated",
            Self::Fallback { .. } => "fallback",
        }
    }
}

impl From<GenerationOutcome> for Answer {
    fn from(outcome: GenerationOutcome) -> Self {
        match outcome {
            GenerationOutcome::Generated(text) => Self::Generated { text },
            GenerationOutcome::Fallback(text) => Self::Fallback { text },
        }
    }
}

/// Query answering over the live knowledge snapshot
pub struct RetrievalPipeline {
    knowledge: Arc<KnowledgeStore>,
    fallback: GenerationFallback,
    threshold: f64,
}

impl RetrievalPipeline {
    pub fn new(knowledge: Arc<KnowledgeStore>, fallback: GenerationFallback) -> Self {
        Self {
            knowledge,
            fallback,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Override the similarity a match must exceed
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeStore> {
        &self.knowledge
    }

    /// Answer a user query
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        if query.trim().is_empty() {
            return Err(Error::InvalidQuery("query must not be empty".to_string()));
        }

        let snapshot = self.knowledge.snapshot().await;
        let hit = snapshot.index().query(query);

        if hit.score > self.threshold {
            if let Some((line, value)) = snapshot.corpus().get(hit.index) {
                tracing::debug!(score = hit.score, line, "Direct knowledge base hit");
                return Ok(Answer::Direct {
                    value: value.clone(),
                    line: line.to_string(),
                    score: hit.score,
                });
            }
        }

        tracing::debug!(
            score = hit.score,
            threshold = self.threshold,
            "No confident lexical match, delegating to {}",
            self.fallback.generator_name()
        );
        Ok(self.fallback.generate(query, snapshot.kb()).await.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeBase;
    use crate::llm::{FakeGenerator, NO_ANSWER};

    fn pipeline(generator: FakeGenerator) -> RetrievalPipeline {
        let store = KnowledgeStore::from_kb(KnowledgeBase::builtin().unwrap()).unwrap();
        RetrievalPipeline::new(
            Arc::new(store),
            GenerationFallback::new(Arc::new(generator)),
        )
    }

    #[tokio::test]
    async fn test_exam_fee_is_direct_hit() {
        let answer = pipeline(FakeGenerator::failing())
            .answer("exam fee")
            .await
            .unwrap();
        match answer {
            Answer::Direct { value, line, score } => {
                assert_eq!(value, KbValue::from(1200));
                assert_eq!(line, "FEE_STRUCTURE.Exam_Fee_Sem: 1200");
                assert!(score > 0.3);
            }
            other => panic!("expected direct hit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exact_line_scores_one() {
        let answer = pipeline(FakeGenerator::failing())
            .answer("EVENTS.Hackathon.mode: Offline")
            .await
            .unwrap();
        let Answer::Direct { value, score, .. } = answer else {
            panic!("expected direct hit");
        };
        assert_eq!(value, KbValue::from("Offline"));
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_list_values_come_back_whole() {
        let p = pipeline(FakeGenerator::failing());
        let snapshot = p.knowledge().snapshot().await;
        let line = snapshot
            .corpus()
            .lines()
            .iter()
            .find(|l| l.starts_with("STAFF_DETAILS.Teaching:"))
            .unwrap()
            .clone();

        let Answer::Direct { value, .. } = p.answer(&line).await.unwrap() else {
            panic!("expected direct hit");
        };
        assert!(matches!(value, KbValue::List(ref rows) if rows.len() == 3));
    }

    #[tokio::test]
    async fn test_no_overlap_uses_generator() {
        let answer = pipeline(FakeGenerator::replying("Paris."))
            .answer("what is the capital of France")
            .await
            .unwrap();
        assert_eq!(
            answer,
            Answer::Generated {
                text: "Paris.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_no_overlap_with_failed_generator_returns_sentinel() {
        let answer = pipeline(FakeGenerator::failing())
            .answer("what is the capital of France")
            .await
            .unwrap();
        assert_eq!(answer.source(), "fallback");
        assert_eq!(answer.text(), NO_ANSWER);
    }

    #[tokio::test]
    async fn test_weak_match_uses_substring_fallback() {
        // Scores about 0.2 against the long staff listings
        let answer = pipeline(FakeGenerator::failing())
            .answer("teaching staff")
            .await
            .unwrap();
        assert_eq!(answer.source(), "fallback");
        assert_eq!(answer.text(), NO_ANSWER);

        let answer = pipeline(FakeGenerator::failing())
            .answer("SARANYA")
            .await
            .unwrap();
        assert_eq!(
            answer,
            Answer::Fallback {
                text: "STAFF_DETAILS.Non_Teaching.0.name: Ms.K.SARANYA Kumari".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_threshold_override() {
        let answer = pipeline(FakeGenerator::failing())
            .with_threshold(0.99)
            .answer("exam fee")
            .await
            .unwrap();
        // Below the raised bar; the substring "exam fee" is not in any line
        assert_eq!(answer.text(), NO_ANSWER);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let p = pipeline(FakeGenerator::failing());
        assert!(matches!(p.answer("").await, Err(Error::InvalidQuery(_))));
        assert!(matches!(p.answer("  \t").await, Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn test_answer_serialization() {
        let answer = Answer::Direct {
            value: KbValue::from(1200),
            line: "FEE_STRUCTURE.Exam_Fee_Sem: 1200".to_string(),
            score: 0.73,
        };
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["source"], "direct");
        assert_eq!(json["value"], 1200);
    }
}
