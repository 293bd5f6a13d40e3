use std::collections::{HashMap, HashSet};

/// BM25 scoring parameters
const BM25_K1: f32 = 1.2; // Term frequency saturation
const BM25_B: f32 = 0.75; // Length normalization

/// Keyword scorer over a fixed set of chunks; term statistics are computed once.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    chunk_terms: Vec<HashMap<String, usize>>,
    chunk_lengths: Vec<usize>,
    doc_frequencies: HashMap<String, usize>,
    avg_doc_len: f32,
}

impl Bm25Index {
    pub fn from_chunks(chunks: &[String]) -> Self {
        let mut doc_frequencies: HashMap<String, usize> = HashMap::new();
        let mut chunk_terms = Vec::with_capacity(chunks.len());
        let mut chunk_lengths = Vec::with_capacity(chunks.len());
        let mut total_length = 0usize;

        for chunk in chunks {
            let tokens = tokenize(chunk);
            let unique_tokens: HashSet<&String> = tokens.iter().collect();
            for token in unique_tokens {
                *doc_frequencies.entry(token.clone()).or_insert(0) += 1;
            }

            let mut term_freqs: HashMap<String, usize> = HashMap::new();
            for token in &tokens {
                *term_freqs.entry(token.clone()).or_insert(0) += 1;
            }

            total_length += tokens.len();
            chunk_lengths.push(tokens.len());
            chunk_terms.push(term_freqs);
        }

        let avg_doc_len = if chunks.is_empty() || total_length == 0 {
            1.0
        } else {
            total_length as f32 / chunks.len() as f32
        };

        Self {
            chunk_terms,
            chunk_lengths,
            doc_frequencies,
            avg_doc_len,
        }
    }

    /// Score of every chunk against `query`, by chunk index.
    pub fn score_all(&self, query: &str) -> Vec<f32> {
        let query_terms: HashSet<String> = tokenize(query).into_iter().collect();
        let total_docs = self.chunk_terms.len() as f32;

        self.chunk_terms
            .iter()
            .zip(&self.chunk_lengths)
            .map(|(term_freqs, &doc_len)| {
                let mut score = 0.0f32;
                for term in &query_terms {
                    let tf = *term_freqs.get(term).unwrap_or(&0) as f32;
                    let df = *self.doc_frequencies.get(term).unwrap_or(&0) as f32;
                    if tf > 0.0 && df > 0.0 {
                        let idf = ((total_docs - df + 0.5) / (df + 0.5) + 1.0).ln();
                        let tf_component = (tf * (BM25_K1 + 1.0))
                            / (tf
                                + BM25_K1
                                    * (1.0 - BM25_B
                                        + BM25_B * (doc_len as f32 / self.avg_doc_len)));
                        score += idf * tf_component;
                    }
                }
                score
            })
            .collect()
    }
}

/// Lowercased alphanumeric terms; very short tokens carry no signal.
/// Digits are kept so standard numbers like 62304 match.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.len() > 2)
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_chunk_scores_highest() {
        let chunks = vec![
            "Audit trail entries must be time stamped.".to_string(),
            "Passwords must be hashed and salted.".to_string(),
            "The dashboard shows patient vitals.".to_string(),
        ];
        let index = Bm25Index::from_chunks(&chunks);
        let scores = index.score_all("password hashing for login");

        assert_eq!(scores.len(), 3);
        // "passwords" != "password"; only exact terms count
        assert_eq!(scores[1], 0.0);

        let scores = index.score_all("passwords salted");
        assert!(scores[1] > 0.0);
        assert_eq!(scores[0], 0.0);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn test_numeric_terms_are_indexed() {
        let chunks = vec![
            "IEC 62304 software lifecycle".to_string(),
            "ISO 13485 quality system".to_string(),
        ];
        let index = Bm25Index::from_chunks(&chunks);
        let scores = index.score_all("62304");
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn test_empty_index_scores_nothing() {
        let index = Bm25Index::from_chunks(&[]);
        assert!(index.score_all("anything").is_empty());
    }
}
