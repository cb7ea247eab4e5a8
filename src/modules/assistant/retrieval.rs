// Lexical retrieval over the service-information corpus.
//
// The corpus is split into overlapping character windows and ranked by term
// overlap with the query. Good enough for short service descriptions without
// dragging an embedding model into the build.

use tracing::info;

pub const CHUNK_SIZE: usize = 1000;
pub const CHUNK_OVERLAP: usize = 20;
pub const DEFAULT_TOP_K: usize = 2;

pub struct CorpusIndex {
    chunks: Vec<String>,
}

impl CorpusIndex {
    pub fn empty() -> Self {
        Self { chunks: Vec::new() }
    }

    pub fn from_text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let step = CHUNK_SIZE.saturating_sub(CHUNK_OVERLAP).max(1);

        let mut start = 0;
        while start < chars.len() {
            let end = (start + CHUNK_SIZE).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            let trimmed = chunk.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
            if end == chars.len() {
                break;
            }
            start += step;
        }

        info!(chunks = chunks.len(), "corpus indexed");
        Self { chunks }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Top `k` chunks by term overlap with the query, best first. Chunks
    /// sharing no terms with the query are never returned.
    pub fn search(&self, query: &str, k: usize) -> Vec<String> {
        let terms: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|term| term.len() > 2)
            .map(|term| term.to_lowercase())
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &String)> = self
            .chunks
            .iter()
            .map(|chunk| {
                let haystack = chunk.to_lowercase();
                let score = terms
                    .iter()
                    .filter(|term| haystack.contains(term.as_str()))
                    .count();
                (score, chunk)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(k)
            .map(|(_, chunk)| chunk.clone())
            .collect()
    }
}

#[cfg(test)]
mod corpus_index_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_rank_chunks_by_term_overlap() {
        let index = CorpusIndex {
            chunks: vec![
                "Our counseling services are free for youth under 25.".into(),
                "Parking is available behind the building.".into(),
                "Group counseling sessions run every Thursday evening.".into(),
            ],
        };
        let results = index.search("what counseling sessions do you offer", 2);
        assert_eq!(results.len(), 2);
        assert!(results[0].contains("Group counseling sessions"));
        assert!(results.iter().all(|chunk| chunk.contains("counseling")));
    }

    #[rstest]
    fn it_should_return_nothing_for_unrelated_queries() {
        let index = CorpusIndex {
            chunks: vec!["Our counseling services are free.".into()],
        };
        assert!(index.search("spaceship launch schedule", 2).is_empty());
        assert!(index.search("a an of", 2).is_empty());
    }

    #[rstest]
    fn it_should_split_long_text_into_overlapping_chunks() {
        let text = "word ".repeat(600);
        let index = CorpusIndex::from_text(&text);
        assert!(index.chunks.len() > 1);
        assert!(index.chunks.iter().all(|chunk| chunk.len() <= CHUNK_SIZE));
    }

    #[rstest]
    fn it_should_index_nothing_from_blank_text() {
        let index = CorpusIndex::from_text("   \n  ");
        assert!(index.is_empty());
    }
}
