//! Recursive boundary-preferring text chunker.
//!
//! Splits ticket descriptions into overlapping fragments of at most
//! `max_chars` characters. Short texts (up to `split_threshold` characters)
//! are returned unchanged as a single fragment.
//!
//! # Algorithm
//!
//! 1. Try separators from coarsest to finest: paragraph (`\n\n`), line
//!    (`\n`), word (` `), then single characters.
//! 2. Split on the first separator present in the text, keeping the
//!    separator attached to the end of the preceding piece so pieces stay
//!    contiguous. Pieces still longer than `max_chars` are split again with
//!    the next finer separator.
//! 3. Greedily merge consecutive pieces into windows of at most `max_chars`.
//!    When a window is flushed, the shortest run of its trailing pieces
//!    covering at least `overlap_chars` characters is carried into the next
//!    window, as long as it still leaves room for the incoming piece.
//!
//! Every fragment is an exact slice of the input, so fragments never change
//! order and the original text can be rebuilt from the [`Span`]s.
//!
//! # Example
//!
//! ```rust
//! use ticket_harness::chunk::{split_text, ChunkParams};
//!
//! let fragments = split_text("Printer on floor 3 is offline.", &ChunkParams::default());
//! assert_eq!(fragments, vec!["Printer on floor 3 is offline.".to_string()]);
//! ```

use std::collections::VecDeque;

use crate::config::ChunkingConfig;

/// Separators tried in order. The empty separator means "split into chars".
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Chunking limits, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    /// Maximum characters per fragment.
    pub max_chars: usize,
    /// Characters of trailing context repeated at the start of the next fragment.
    pub overlap_chars: usize,
    /// Texts at or below this length are never split.
    pub split_threshold: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            max_chars: 200,
            overlap_chars: 20,
            split_threshold: 200,
        }
    }
}

impl From<&ChunkingConfig> for ChunkParams {
    fn from(cfg: &ChunkingConfig) -> Self {
        Self {
            max_chars: cfg.max_chars,
            overlap_chars: cfg.overlap_chars,
            split_threshold: cfg.split_threshold,
        }
    }
}

/// Byte range of one fragment within the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

/// Split `text` into fragments, returning owned strings.
///
/// Returns an empty vector for empty input; otherwise at least one fragment.
pub fn split_text(text: &str, params: &ChunkParams) -> Vec<String> {
    split_spans(text, params)
        .into_iter()
        .map(|span| text[span.start..span.end].to_string())
        .collect()
}

/// Split `text` into fragment byte ranges.
///
/// # Guarantees
///
/// - No fragment exceeds `max_chars` characters (when `text` is longer
///   than `split_threshold`).
/// - Spans are ordered, the first starts at 0, the last ends at
///   `text.len()`, and each span starts no later than the previous one ends.
/// - No span is empty.
pub fn split_spans(text: &str, params: &ChunkParams) -> Vec<Span> {
    if text.is_empty() {
        return Vec::new();
    }

    let max_chars = params.max_chars.max(1);
    if text.chars().count() <= params.split_threshold {
        return vec![Span {
            start: 0,
            end: text.len(),
        }];
    }

    let mut pieces = Vec::new();
    collect_pieces(text, 0, SEPARATORS, max_chars, &mut pieces);
    merge_pieces(&pieces, max_chars, params.overlap_chars)
}

/// Recursively break `segment` into contiguous pieces of at most
/// `max_chars` characters.
fn collect_pieces(
    segment: &str,
    offset: usize,
    separators: &[&str],
    max_chars: usize,
    out: &mut Vec<Piece>,
) {
    let chars = segment.chars().count();
    if chars <= max_chars {
        out.push(Piece {
            start: offset,
            end: offset + segment.len(),
            chars,
        });
        return;
    }

    let (sep, finer) = match separators
        .iter()
        .position(|s| s.is_empty() || segment.contains(*s))
    {
        Some(i) => (separators[i], &separators[i + 1..]),
        None => ("", &[][..]),
    };

    if sep.is_empty() {
        for (i, c) in segment.char_indices() {
            out.push(Piece {
                start: offset + i,
                end: offset + i + c.len_utf8(),
                chars: 1,
            });
        }
        return;
    }

    let mut local = 0;
    for part in segment.split_inclusive(sep) {
        let part_offset = offset + local;
        local += part.len();
        collect_pieces(part, part_offset, finer, max_chars, out);
    }
}

/// Merge pieces into windows of at most `max_chars`, carrying at least
/// `overlap_chars` of trailing pieces into each following window when the
/// next piece leaves room for them.
fn merge_pieces(pieces: &[Piece], max_chars: usize, overlap_chars: usize) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut window: VecDeque<Piece> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        if total + piece.chars > max_chars && !window.is_empty() {
            spans.push(window_span(&window));
            while let Some(front) = window.front() {
                let keeps_overlap = total - front.chars >= overlap_chars;
                if !keeps_overlap && total + piece.chars <= max_chars {
                    break;
                }
                total -= front.chars;
                window.pop_front();
            }
        }
        window.push_back(*piece);
        total += piece.chars;
    }

    if !window.is_empty() {
        spans.push(window_span(&window));
    }

    spans
}

fn window_span(window: &VecDeque<Piece>) -> Span {
    let start = window.front().map(|p| p.start).unwrap_or(0);
    let end = window.back().map(|p| p.end).unwrap_or(start);
    Span { start, end }
}
