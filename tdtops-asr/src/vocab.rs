//! SentencePiece vocabulary and transcript assembly.

use crate::error::VocabError;
use crate::types::TokenDuration;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// SentencePiece word-boundary marker (U+2581).
pub const WORD_BOUNDARY: char = '▁';

/// File name preferred when searching a model directory.
pub const VOCAB_FILE: &str = "vocab.txt";

/// Vocabulary size of the Parakeet TDT models.
pub const EXPECTED_VOCAB_SIZE: usize = 1024;

/// Ordered subword pieces; a piece's index is its token id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    pieces: Vec<String>,
}

impl Vocabulary {
    pub fn new(pieces: Vec<String>) -> Self {
        Self { pieces }
    }

    /// Load a vocabulary file with one piece per line.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, VocabError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|source| VocabError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let vocab: Self = content.lines().collect();

        if vocab.is_empty() {
            return Err(VocabError::Empty(path.to_path_buf()));
        }

        tracing::debug!(path = %path.display(), size = vocab.len(), "loaded vocabulary");

        Ok(vocab)
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Reserved blank label, one past the last piece.
    pub fn blank_id(&self) -> usize {
        self.pieces.len()
    }

    pub fn piece(&self, id: usize) -> Option<&str> {
        self.pieces.get(id).map(String::as_str)
    }

    /// Piece text with the word-boundary marker rendered as a space.
    pub fn token_text(&self, id: usize) -> Option<String> {
        self.piece(id).map(|p| p.replace(WORD_BOUNDARY, " "))
    }

    /// Warn when the size differs from what the model expects.
    ///
    /// Returns whether the sizes match.
    pub fn check_size(&self, expected: usize) -> bool {
        let matches = self.len() == expected;

        if !matches {
            tracing::warn!(
                size = self.len(),
                expected,
                "vocabulary size differs from expected"
            );
        }

        matches
    }

    /// Assemble token ids into text.
    ///
    /// Ids outside the vocabulary are dropped. Pieces are concatenated,
    /// each word-boundary marker becomes a space, and the result is trimmed.
    pub fn assemble(&self, ids: &[usize]) -> String {
        let mut text = String::new();

        for &id in ids {
            match self.piece(id) {
                Some(piece) => text.push_str(piece),
                None => tracing::warn!(id, size = self.len(), "dropping out-of-range token"),
            }
        }

        text.replace(WORD_BOUNDARY, " ").trim().to_string()
    }

    /// Assemble decoder output into text.
    pub fn assemble_tokens(&self, tokens: &[TokenDuration]) -> String {
        let ids: Vec<usize> = tokens.iter().map(|td| td.token_id).collect();
        self.assemble(&ids)
    }
}

impl<S: Into<String>> FromIterator<S> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Search `dir` recursively for a vocabulary file.
///
/// An exact [`VOCAB_FILE`] wins, nearest first. Otherwise the first `.txt`
/// file whose name mentions `vocab` is returned.
pub fn find_vocab(dir: impl AsRef<Path>) -> Result<PathBuf, VocabError> {
    let dir = dir.as_ref();

    let candidates: Vec<PathBuf> = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_vocab_candidate(path))
        .collect();

    let exact = candidates
        .iter()
        .filter(|path| path.file_name().is_some_and(|name| name == VOCAB_FILE))
        .min_by_key(|path| path.components().count());

    exact
        .or_else(|| candidates.first())
        .cloned()
        .ok_or_else(|| VocabError::NotFound(dir.to_path_buf()))
}

fn is_vocab_candidate(path: &Path) -> bool {
    let is_txt = path.extension().is_some_and(|ext| ext == "txt");
    let mentions_vocab = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.to_lowercase().contains("vocab"));

    is_txt && mentions_vocab
}
