//! Random access into a grammar without expanding it.
//!
//! The extractor walks only the rules that straddle the window boundaries.
//! Symbols that lie wholly inside the window are taken over as they are,
//! together with every rule they reach, so the excerpt is a closed grammar
//! of its own.

use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::rule::Rule;
use crate::symbol::{RuleId, Symbol};
use std::collections::BTreeMap;

/// Returns a grammar whose expansion is exactly `[start, end)` of the
/// expansion of `grammar`.
///
/// Requires `start < end <= total_length`. A grammar whose expansion is
/// longer than `usize::MAX` is rejected with [`GrammarError::LengthOverflow`].
pub fn extract_excerpt(grammar: &Grammar, start: usize, end: usize) -> Result<Grammar, GrammarError> {
    let total = grammar.total_length()?;
    if start >= end || end > total {
        return Err(GrammarError::InvalidRange { start, end, total });
    }

    let mut excerpt = Excerpt {
        source: grammar,
        rules: BTreeMap::new(),
        sequence: Vec::new(),
    };

    let mut offset = 0;
    for &symbol in grammar.sequence() {
        if offset >= end {
            break;
        }
        let length = grammar.symbol_length(symbol)?;
        let span_end = offset.checked_add(length).ok_or(GrammarError::LengthOverflow)?;
        if span_end > start {
            let from = start.saturating_sub(offset);
            let to = end.min(span_end) - offset;
            excerpt.descend(symbol, length, from, to)?;
        }
        offset = span_end;
    }

    Ok(Grammar {
        rules: excerpt.rules,
        sequence: excerpt.sequence,
    })
}

impl Grammar {
    /// See [`extract_excerpt`].
    pub fn excerpt(&self, start: usize, end: usize) -> Result<Grammar, GrammarError> {
        extract_excerpt(self, start, end)
    }
}

struct Excerpt<'a> {
    source: &'a Grammar,
    rules: BTreeMap<RuleId, Rule>,
    sequence: Vec<Symbol>,
}

impl Excerpt<'_> {
    /// Emits the part `[from, to)` of `symbol`'s expansion, where `length`
    /// is the full expanded length of `symbol`.
    fn descend(&mut self, symbol: Symbol, length: usize, from: usize, to: usize) -> Result<(), GrammarError> {
        debug_assert!(from < to && to <= length);

        let id = match symbol {
            _ if from == 0 && to == length => return self.take_whole(symbol),
            Symbol::Terminal(_) => unreachable!("a terminal is always covered whole"),
            Symbol::NonTerminal(id) => id,
        };

        let source = self.source;
        let rule = source.rule(id).ok_or(GrammarError::MissingRule(id))?;
        let mut offset = 0;
        for &child in rule.rhs() {
            if offset >= to {
                break;
            }
            let child_length = source.symbol_length(child)?;
            let child_end = offset.checked_add(child_length).ok_or(GrammarError::LengthOverflow)?;
            if child_end > from {
                let child_from = from.saturating_sub(offset);
                let child_to = to.min(child_end) - offset;
                self.descend(child, child_length, child_from, child_to)?;
            }
            offset = child_end;
        }
        Ok(())
    }

    /// Appends `symbol` to the excerpt sequence and copies its rule closure.
    fn take_whole(&mut self, symbol: Symbol) -> Result<(), GrammarError> {
        self.sequence.push(symbol);

        let source = self.source;
        let mut stack: Vec<RuleId> = symbol.rule_id().into_iter().collect();
        while let Some(id) = stack.pop() {
            if self.rules.contains_key(&id) {
                continue;
            }
            let rule = source.rule(id).ok_or(GrammarError::MissingRule(id))?;
            stack.extend(rule.children().filter(|child| !self.rules.contains_key(child)));
            self.rules.insert(id, rule.clone());
        }
        Ok(())
    }
}
