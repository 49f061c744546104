//! Line-based text encoding of binary grammars.
//!
//! ```text
//! R256:97,98
//! R257:256,256
//! SEQ:257,99
//! ```
//!
//! Symbols are written in their integer encoding: values below 256 are
//! bytes, anything larger names a rule. Rule lines may come in any order and
//! blank lines are ignored. Exactly one `SEQ:` line is required; its list may
//! be empty.

use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::symbol::{RuleId, Symbol};
use ahash::AHashSet as HashSet;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("no SEQ line")]
    MissingSequence,

    /// A second `SEQ:` line at `line`.
    #[error("line {0}: duplicate SEQ line")]
    DuplicateSequence(usize),

    /// Rule `id` defined again at `line`.
    #[error("line {line}: rule R{id} is already defined")]
    DuplicateRule { line: usize, id: RuleId },

    /// Only binary rules can be written; see [`Grammar::binarize`].
    #[error("rule R{0} is not binary")]
    NonBinaryRule(RuleId),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn malformed(line: usize, reason: impl Into<String>) -> FormatError {
    FormatError::Malformed {
        line,
        reason: reason.into(),
    }
}

fn parse_symbol(token: &str, line: usize) -> Result<Symbol, FormatError> {
    token
        .trim()
        .parse::<u32>()
        .map(Symbol::from_raw)
        .map_err(|e| malformed(line, format!("bad symbol {token:?}: {e}")))
}

/// Parses a grammar and checks that it is closed and acyclic, that no rule
/// id repeats and that the expanded length fits in `usize`.
pub fn parse(input: &str) -> Result<Grammar, FormatError> {
    let mut rules: Vec<(RuleId, Vec<Symbol>)> = Vec::new();
    let mut seen: HashSet<RuleId> = HashSet::default();
    let mut sequence: Option<Vec<Symbol>> = None;

    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let text = raw.trim();
        if text.is_empty() {
            continue;
        }

        let (head, body) = text
            .split_once(':')
            .ok_or_else(|| malformed(line, "expected `R<id>:` or `SEQ:`"))?;

        if head == "SEQ" {
            if sequence.is_some() {
                return Err(FormatError::DuplicateSequence(line));
            }
            let symbols = if body.trim().is_empty() {
                Vec::new()
            } else {
                body.split(',')
                    .map(|token| parse_symbol(token, line))
                    .collect::<Result<Vec<_>, _>>()?
            };
            sequence = Some(symbols);
            continue;
        }

        let id = head
            .strip_prefix('R')
            .and_then(|id| id.parse::<RuleId>().ok())
            .ok_or_else(|| malformed(line, format!("bad rule head {head:?}")))?;
        if !seen.insert(id) {
            return Err(FormatError::DuplicateRule { line, id });
        }
        let rhs = body
            .split(',')
            .map(|token| parse_symbol(token, line))
            .collect::<Result<Vec<_>, _>>()?;
        if rhs.len() != 2 {
            return Err(malformed(
                line,
                format!("rule R{id} has {} symbols, expected 2", rhs.len()),
            ));
        }
        rules.push((id, rhs));
    }

    let sequence = sequence.ok_or(FormatError::MissingSequence)?;
    Ok(Grammar::from_parts(rules, sequence)?)
}

/// Writes `grammar`, rules in ascending id order followed by the sequence.
pub fn write<W: io::Write>(grammar: &Grammar, mut out: W) -> Result<(), FormatError> {
    for (id, rule) in grammar.rules() {
        let (left, right) = rule.as_pair().ok_or(FormatError::NonBinaryRule(id))?;
        writeln!(out, "R{id}:{},{}", left.raw(), right.raw())?;
    }

    let sequence: Vec<String> = grammar.sequence().iter().map(|s| s.raw().to_string()).collect();
    writeln!(out, "SEQ:{}", sequence.join(","))?;
    Ok(())
}

pub fn to_string(grammar: &Grammar) -> Result<String, FormatError> {
    let mut buf = Vec::new();
    write(grammar, &mut buf)?;
    // Only ASCII digits, letters and punctuation are written.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
