//! Term-overlap search over a directory of clinic documents.
//!
//! Stands in for an embedding index: files are split into overlapping
//! character windows and each chunk is scored by the share of distinct
//! query terms it contains.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use psychbot_chat::{Passage, VectorIndex};
use psychbot_core::error::Result;
use psychbot_core::text::normalize;

pub const CHUNK_CHARS: usize = 500;
pub const CHUNK_OVERLAP: usize = 50;

/// Shortest word treated as a search term.
const MIN_TERM_CHARS: usize = 3;

struct Chunk {
    text: String,
    terms: HashSet<String>,
}

#[derive(Default)]
pub struct CorpusIndex {
    chunks: Vec<Chunk>,
}

impl CorpusIndex {
    /// Load every `.txt` and `.md` file directly under `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && matches!(
                        p.extension().and_then(|e| e.to_str()),
                        Some("txt") | Some("md")
                    )
            })
            .collect();
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            documents.push(std::fs::read_to_string(path)?);
        }
        let index = Self::from_documents(&documents);
        tracing::info!(
            dir = %dir.display(),
            files = paths.len(),
            chunks = index.len(),
            "Clinic corpus loaded"
        );
        Ok(index)
    }

    pub fn from_documents<S: AsRef<str>>(documents: &[S]) -> Self {
        let chunks = documents
            .iter()
            .flat_map(|doc| split_chunks(doc.as_ref(), CHUNK_CHARS, CHUNK_OVERLAP))
            .map(|text| Chunk {
                terms: terms(&text),
                text,
            })
            .collect();
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn rank(&self, query: &str, k: usize) -> Vec<Passage> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<Passage> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let shared = query_terms.intersection(&chunk.terms).count();
                (shared > 0).then(|| {
                    Passage::new(chunk.text.clone(), shared as f32 / query_terms.len() as f32)
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }
}

#[async_trait]
impl VectorIndex for CorpusIndex {
    async fn search(&self, query: &str, k: usize) -> Vec<Passage> {
        self.rank(query, k)
    }
}

fn terms(text: &str) -> HashSet<String> {
    normalize(text)
        .split(' ')
        .filter(|w| w.chars().count() >= MIN_TERM_CHARS)
        .map(str::to_string)
        .collect()
}

/// Overlapping windows of at most `size` characters.
fn split_chunks(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.trim().chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
