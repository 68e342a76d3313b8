use std::path::Path;

use clap::ValueEnum;
use rust_tokenizers::tokenizer::{SentencePieceTokenizer, Tokenizer};

use crate::error::Error;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    /// surface subword strings
    Piece,
    /// decimal token ids
    Id,
}

/// Maps a text line to subword pieces or their vocabulary ids.
pub(crate) trait Segmenter {
    fn pieces(&self, line: &str) -> Vec<String>;
    fn ids(&self, line: &str) -> Vec<i64>;
}

pub(crate) struct SpmSegmenter {
    tokenizer: SentencePieceTokenizer,
}

impl SpmSegmenter {
    pub(crate) fn load(path: &Path) -> Result<Self, Error> {
        let tokenizer = SentencePieceTokenizer::from_file(path, false)?;
        Ok(Self { tokenizer })
    }
}

impl Segmenter for SpmSegmenter {
    fn pieces(&self, line: &str) -> Vec<String> {
        self.tokenizer.tokenize(line)
    }

    fn ids(&self, line: &str) -> Vec<i64> {
        let pieces = self.tokenizer.tokenize(line);
        self.tokenizer.convert_tokens_to_ids(&pieces)
    }
}

/// Inclusive token-count bounds; an unset side never filters.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct LenBounds {
    pub(crate) min: Option<usize>,
    pub(crate) max: Option<usize>,
}

impl LenBounds {
    fn accepts(&self, len: usize) -> bool {
        self.min.map_or(true, |min| len >= min) && self.max.map_or(true, |max| len <= max)
    }
}

/// One encoded row: a column per input file plus the row-level flags.
/// A `None` column failed the length filter.
#[derive(Debug)]
pub(crate) struct RowOutcome {
    pub(crate) columns: Vec<Option<String>>,
    pub(crate) filtered: bool,
    pub(crate) empty: bool,
}

pub(crate) struct RowEncoder<S> {
    segmenter: S,
    format: OutputFormat,
    bounds: LenBounds,
}

impl<S: Segmenter> RowEncoder<S> {
    pub(crate) fn new(segmenter: S, format: OutputFormat, bounds: LenBounds) -> Self {
        Self {
            segmenter,
            format,
            bounds,
        }
    }

    fn encode_line(&self, line: &str) -> Vec<String> {
        match self.format {
            OutputFormat::Piece => self.segmenter.pieces(line),
            OutputFormat::Id => self
                .segmenter
                .ids(line)
                .iter()
                .map(|id| id.to_string())
                .collect(),
        }
    }

    /// Pure per-row step: trim, mark empties, tokenize, length-filter.
    /// Empty columns are never length-filtered.
    pub(crate) fn encode_row(&self, lines: &[String]) -> RowOutcome {
        let mut columns = Vec::with_capacity(lines.len());
        let mut filtered = false;
        let mut empty = false;

        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                empty = true;
                columns.push(Some(String::new()));
                continue;
            }
            let tokens = self.encode_line(line);
            if self.bounds.accepts(tokens.len()) {
                columns.push(Some(tokens.join(" ")));
            } else {
                filtered = true;
                columns.push(None);
            }
        }

        RowOutcome {
            columns,
            filtered,
            empty,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Segmenter;

    /// Whitespace "model" with a fixed vocabulary, standing in for a real
    /// sentencepiece file in tests.
    pub(crate) struct WordSegmenter {
        vocab: Vec<&'static str>,
    }

    impl WordSegmenter {
        pub(crate) fn new() -> Self {
            Self {
                vocab: vec!["<unk>", "hello", "world", "a", "b", "c"],
            }
        }

        pub(crate) fn token(&self, id: i64) -> &'static str {
            self.vocab[id as usize]
        }
    }

    impl Segmenter for WordSegmenter {
        fn pieces(&self, line: &str) -> Vec<String> {
            line.split_whitespace().map(str::to_owned).collect()
        }

        fn ids(&self, line: &str) -> Vec<i64> {
            self.pieces(line)
                .iter()
                .map(|piece| {
                    self.vocab
                        .iter()
                        .position(|v| v == piece)
                        .unwrap_or(0) as i64
                })
                .collect()
        }
    }
}
