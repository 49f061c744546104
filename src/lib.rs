//! # SLP Recompress - Grammar-to-Grammar Compression
//!
//! Works on straight-line programs (SLPs): context-free grammars in which
//! every non-terminal has exactly one rule and the grammar derives exactly
//! one string. Everything here operates on the grammar directly, without
//! decompressing it first.
//!
//! - **Extraction**: pull any window `[start, end)` of the represented string
//!   out as a new closed grammar, touching only the rules that straddle the
//!   window boundaries.
//! - **Recompression**: a RePair variant whose bigram frequencies are taken
//!   from the grammar itself, weighting every pair inside a rule by the number
//!   of distinct contexts (`vocc`) that reference that rule.
//!
//! ## Example
//!
//! ```
//! use slp_recompress::{decompress, Grammar, Recompressor};
//!
//! let grammar = Grammar::from_bytes(b"abracadabra abracadabra");
//!
//! // Random access without expanding the whole string
//! let excerpt = grammar.excerpt(12, 16).unwrap();
//! assert_eq!(decompress(&excerpt).unwrap(), b"abra");
//!
//! // Grammar-level RePair
//! let result = Recompressor::new(grammar).run();
//! assert_eq!(decompress(&result.grammar).unwrap(), b"abracadabra abracadabra");
//! println!("replaced {} bigrams", result.stats.bigrams_replaced);
//! ```
//!
//! ## Logging
//!
//! Rewrites are reported through `tracing`: `debug` for structural changes,
//! `info` for replaced bigrams and the final fixed point, `warn` when cached
//! lengths are recomputed on an inconsistent grammar. Install a subscriber to
//! see them, or pass `()` as observer to silence a run.

mod decompress;
mod error;
mod extract;
mod grammar;
pub mod metadata;
mod recompress;
mod rle_rule;
mod rule;
mod symbol;
pub mod text_format;
mod trace;

#[cfg(test)]
mod tests;

pub use decompress::{decompress, GrammarIter};
pub use error::GrammarError;
pub use extract::extract_excerpt;
pub use grammar::{Grammar, GrammarStats};
pub use metadata::{Context, Metadata, RuleMetadata};
pub use recompress::{
    bigram_frequencies, recompress, RecompressConfig, RecompressStats, Recompressed, Recompressor,
    RoundOutcome,
};
pub use rle_rule::{Block, CompressedGrammar, CompressedRule};
pub use rule::Rule;
pub use symbol::{Bigram, RuleId, Symbol, FIRST_RULE_ID};
pub use text_format::FormatError;
pub use trace::{RecompressObserver, TracingObserver};
