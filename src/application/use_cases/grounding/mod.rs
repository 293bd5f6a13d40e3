//! In-process retrieval corpora used to ground model prompts.
//!
//! Each uploaded document becomes its own corpus; the compliance guidelines
//! corpus is registered once at startup. Retrieval is keyword-only (BM25).

pub mod bm25;
pub mod chunking;

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::GroundingExcerpt;
use crate::shared::token_counter::TokenCounter;
use bm25::Bm25Index;
use chunking::{ChunkConfig, ChunkEngine};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Instant;

pub const COMPLIANCE_CORPUS_ID: &str = "compliance-guidelines";

const BUILTIN_GUIDELINES: &str =
    include_str!("../../../../resources/compliance_guidelines.md");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingConfig {
    pub max_chunk_size: usize,
    pub top_k: usize,
    pub max_context_tokens: usize,
    pub guidelines_path: Option<PathBuf>,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: ChunkConfig::default().max_chunk_size,
            top_k: 4,
            max_context_tokens: 3000,
            guidelines_path: None,
        }
    }
}

struct Corpus {
    chunks: Vec<String>,
    index: Bm25Index,
    touched_at: Instant,
}

pub struct CorpusRegistry {
    config: GroundingConfig,
    engine: ChunkEngine,
    corpora: RwLock<HashMap<String, Corpus>>,
}

impl CorpusRegistry {
    pub fn new(config: GroundingConfig) -> Self {
        let engine = ChunkEngine::new(ChunkConfig {
            max_chunk_size: config.max_chunk_size,
        });
        Self {
            config,
            engine,
            corpora: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with the compliance guidelines corpus already loaded, either
    /// from `guidelines_path` or from the bundled copy.
    pub fn with_guidelines(config: GroundingConfig) -> Result<Self> {
        let guidelines = match &config.guidelines_path {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                AppError::ConfigError(format!(
                    "Failed to read compliance guidelines {}: {}",
                    path.display(),
                    e
                ))
            })?,
            None => BUILTIN_GUIDELINES.to_string(),
        };

        let registry = Self::new(config);
        registry.register(COMPLIANCE_CORPUS_ID, &guidelines);
        Ok(registry)
    }

    /// Corpus id derived from a document digest, stable across re-uploads.
    pub fn corpus_id_for_digest(digest: &str) -> String {
        let prefix: String = digest.chars().take(12).collect();
        format!("corpus-{}", prefix)
    }

    /// Registers the corpus for a document once; a repeat upload only marks
    /// the existing corpus as recently used.
    pub fn register_document(&self, digest: &str, text: &str) -> String {
        let corpus_id = Self::corpus_id_for_digest(digest);
        let known = {
            let mut corpora = self.corpora.write().unwrap_or_else(|p| p.into_inner());
            match corpora.get_mut(&corpus_id) {
                Some(corpus) => {
                    corpus.touched_at = Instant::now();
                    true
                }
                None => false,
            }
        };
        if !known {
            self.register(&corpus_id, text);
        }
        corpus_id
    }

    /// Replaces any corpus already registered under `corpus_id`.
    pub fn register(&self, corpus_id: &str, text: &str) -> usize {
        let chunks = self.engine.chunk_text(text);
        let index = Bm25Index::from_chunks(&chunks);
        let count = chunks.len();

        let mut corpora = self.corpora.write().unwrap_or_else(|p| p.into_inner());
        corpora.insert(
            corpus_id.to_string(),
            Corpus {
                chunks,
                index,
                touched_at: Instant::now(),
            },
        );
        tracing::debug!(corpus_id, chunks = count, "Registered grounding corpus");
        count
    }

    pub fn contains(&self, corpus_id: &str) -> bool {
        self.corpora
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .contains_key(corpus_id)
    }

    /// Drops document corpora that are not in `live` and were last used
    /// before `cutoff`. The compliance guidelines are always kept.
    pub fn retain_documents(&self, live: &HashSet<String>, cutoff: Instant) -> usize {
        let mut corpora = self.corpora.write().unwrap_or_else(|p| p.into_inner());
        let before = corpora.len();
        corpora.retain(|corpus_id, corpus| {
            corpus_id == COMPLIANCE_CORPUS_ID
                || live.contains(corpus_id)
                || corpus.touched_at >= cutoff
        });
        before - corpora.len()
    }

    /// Top-scoring chunks per corpus, in corpus order, trimmed to the
    /// configured token budget. Unknown corpora contribute nothing.
    pub fn retrieve(&self, corpus_ids: &[&str], query: &str) -> Vec<GroundingExcerpt> {
        let corpora = self.corpora.read().unwrap_or_else(|p| p.into_inner());
        let mut excerpts = Vec::new();

        for corpus_id in corpus_ids {
            let Some(corpus) = corpora.get(*corpus_id) else {
                tracing::warn!(corpus_id, "Unknown grounding corpus, skipping");
                continue;
            };

            let mut scored: Vec<(usize, f32)> = corpus
                .index
                .score_all(query)
                .into_iter()
                .enumerate()
                .filter(|(_, score)| *score > 0.0)
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

            for (position, score) in scored.into_iter().take(self.config.top_k) {
                excerpts.push(GroundingExcerpt {
                    corpus_id: corpus_id.to_string(),
                    content: corpus.chunks[position].clone(),
                    score,
                });
            }
        }

        self.fit_budget(excerpts)
    }

    fn fit_budget(&self, excerpts: Vec<GroundingExcerpt>) -> Vec<GroundingExcerpt> {
        let mut remaining = self.config.max_context_tokens;
        let mut kept = Vec::with_capacity(excerpts.len());

        for mut excerpt in excerpts {
            if remaining == 0 {
                break;
            }
            let tokens = TokenCounter::estimate_tokens(&excerpt.content);
            if tokens > remaining {
                excerpt.content = TokenCounter::truncate_to_budget(&excerpt.content, remaining);
                remaining = 0;
            } else {
                remaining -= tokens;
            }
            kept.push(excerpt);
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CorpusRegistry {
        CorpusRegistry::new(GroundingConfig {
            max_chunk_size: 80,
            top_k: 2,
            max_context_tokens: 500,
            guidelines_path: None,
        })
    }

    #[test]
    fn test_builtin_guidelines_cover_every_standard() {
        let registry = CorpusRegistry::with_guidelines(GroundingConfig::default()).unwrap();
        assert!(registry.contains(COMPLIANCE_CORPUS_ID));

        for query in ["FDA audit trail", "IEC 62304", "ISO 13485", "GDPR personal data"] {
            let excerpts = registry.retrieve(&[COMPLIANCE_CORPUS_ID], query);
            assert!(!excerpts.is_empty(), "no guideline excerpt for {}", query);
        }
    }

    #[test]
    fn test_document_corpus_id_comes_from_digest() {
        let registry = registry();
        let id = registry.register_document("abcdef0123456789ffff", "Login must be secure.");
        assert_eq!(id, "corpus-abcdef012345");
        assert!(registry.contains(&id));
    }

    #[test]
    fn test_retrieve_ranks_matching_chunks_first() {
        let registry = registry();
        registry.register(
            "doc",
            "The user must log in with two factors.\n\n\
             Vitals are refreshed every minute.\n\n\
             Sessions expire after fifteen minutes of inactivity.",
        );

        let excerpts = registry.retrieve(&["doc"], "log in factors");
        assert_eq!(excerpts.len(), 1);
        assert_eq!(excerpts[0].corpus_id, "doc");
        assert!(excerpts[0].content.contains("two factors"));
    }

    #[test]
    fn test_unknown_corpus_is_ignored() {
        let registry = registry();
        registry.register("doc", "Patient records are encrypted at rest.");
        let excerpts = registry.retrieve(&["missing", "doc"], "encrypted records");
        assert_eq!(excerpts.len(), 1);
        assert_eq!(excerpts[0].corpus_id, "doc");
    }

    #[test]
    fn test_excerpts_respect_token_budget() {
        let registry = CorpusRegistry::new(GroundingConfig {
            max_chunk_size: 400,
            top_k: 4,
            max_context_tokens: 20,
            guidelines_path: None,
        });
        let text = format!("alarm {}", "alarm threshold ".repeat(20));
        registry.register("doc", &text);

        let excerpts = registry.retrieve(&["doc"], "alarm");
        assert_eq!(excerpts.len(), 1);
        assert!(excerpts[0].content.ends_with("[... truncated ...]"));
    }

    #[test]
    fn test_retain_documents_drops_unreferenced_corpora() {
        let registry = CorpusRegistry::with_guidelines(GroundingConfig::default()).unwrap();
        let kept = registry.register_document("aaaaaaaaaaaaaaaa", "Alarms sound on low oxygen.");
        let dropped = registry.register_document("bbbbbbbbbbbbbbbb", "Reports export as PDF.");
        let cutoff = Instant::now();
        let fresh = registry.register_document("cccccccccccccccc", "Nurses sign off each dose.");

        let live: HashSet<String> = [kept.clone()].into_iter().collect();
        let removed = registry.retain_documents(&live, cutoff);

        assert_eq!(removed, 1);
        assert!(registry.contains(&kept));
        assert!(!registry.contains(&dropped));
        assert!(registry.contains(&fresh));
        assert!(registry.contains(COMPLIANCE_CORPUS_ID));
    }

    #[test]
    fn test_repeat_upload_refreshes_corpus() {
        let registry = registry();
        let id = registry.register_document("dddddddddddddddd", "Doses are double checked.");
        let cutoff = Instant::now();
        registry.register_document("dddddddddddddddd", "Doses are double checked.");

        assert_eq!(registry.retain_documents(&HashSet::new(), cutoff), 0);
        assert!(registry.contains(&id));
    }

    #[test]
    fn test_missing_guidelines_file_is_config_error() {
        let result = CorpusRegistry::with_guidelines(GroundingConfig {
            guidelines_path: Some(PathBuf::from("/nonexistent/guidelines.md")),
            ..GroundingConfig::default()
        });
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
