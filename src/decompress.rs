//! Full expansion of a grammar into the bytes it represents.
//!
//! Cost is proportional to the expanded length, which may be exponentially
//! larger than the grammar. Use [`extract_excerpt`](crate::extract_excerpt)
//! when only part of the string is needed.

use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::symbol::Symbol;
use std::iter::FusedIterator;
use std::slice;

/// Iterator that expands a grammar byte by byte.
///
/// Keeps one cursor per open rule on a stack, so its memory is bounded by
/// the grammar height rather than the string length. Yields a single
/// [`GrammarError::MissingRule`] and then stops if a non-terminal has no rule.
pub struct GrammarIter<'a> {
    grammar: &'a Grammar,
    stack: Vec<slice::Iter<'a, Symbol>>,
}

impl<'a> GrammarIter<'a> {
    pub(crate) fn new(grammar: &'a Grammar, symbols: &'a [Symbol]) -> Self {
        Self {
            grammar,
            stack: vec![symbols.iter()],
        }
    }
}

impl Iterator for GrammarIter<'_> {
    type Item = Result<u8, GrammarError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cursor = self.stack.last_mut()?;
            match cursor.next() {
                None => {
                    self.stack.pop();
                }
                Some(&Symbol::Terminal(byte)) => return Some(Ok(byte)),
                Some(&Symbol::NonTerminal(id)) => match self.grammar.rule(id) {
                    Some(rule) => self.stack.push(rule.rhs().iter()),
                    None => {
                        self.stack.clear();
                        return Some(Err(GrammarError::MissingRule(id)));
                    }
                },
            }
        }
    }
}

impl FusedIterator for GrammarIter<'_> {}

impl Grammar {
    /// Returns an iterator over the expanded string.
    pub fn iter(&self) -> GrammarIter<'_> {
        GrammarIter::new(self, &self.sequence)
    }

    /// Returns an iterator over the expansion of a single symbol.
    pub fn expand<'a>(&'a self, symbol: &'a Symbol) -> GrammarIter<'a> {
        GrammarIter::new(self, slice::from_ref(symbol))
    }
}

impl<'a> IntoIterator for &'a Grammar {
    type Item = Result<u8, GrammarError>;
    type IntoIter = GrammarIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Expands the whole grammar.
///
/// Top-level symbols are expanded in order, each rule left to right.
pub fn decompress(grammar: &Grammar) -> Result<Vec<u8>, GrammarError> {
    let mut output = Vec::with_capacity(grammar.total_length().unwrap_or(0));
    for byte in grammar.iter() {
        output.push(byte?);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(byte: u8) -> Symbol {
        Symbol::Terminal(byte)
    }

    fn n(id: u32) -> Symbol {
        Symbol::NonTerminal(id)
    }

    #[test]
    fn test_empty() {
        let grammar = Grammar::default();
        assert_eq!(decompress(&grammar).unwrap(), b"");
        assert_eq!(grammar.iter().count(), 0);
    }

    #[test]
    fn test_terminals_only() {
        let grammar = Grammar::new(vec![t(b'x'), t(b'y')]);
        assert_eq!(decompress(&grammar).unwrap(), b"xy");
    }

    #[test]
    fn test_left_before_right() {
        let mut grammar = Grammar::new(vec![n(257), t(b'!')]);
        grammar.insert_rule(256, vec![t(b'a'), t(b'b')]).unwrap();
        grammar.insert_rule(257, vec![n(256), t(b'c')]).unwrap();
        assert_eq!(decompress(&grammar).unwrap(), b"abc!");
    }

    #[test]
    fn test_missing_rule() {
        let grammar = Grammar::new(vec![t(b'a'), n(400), t(b'b')]);
        assert_eq!(decompress(&grammar), Err(GrammarError::MissingRule(400)));

        let mut iter = grammar.iter();
        assert_eq!(iter.next(), Some(Ok(b'a')));
        assert_eq!(iter.next(), Some(Err(GrammarError::MissingRule(400))));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_expand_symbol() {
        let grammar = Grammar::from_bytes(b"abcd");
        let expanded: Result<Vec<u8>, _> = grammar.expand(&n(256)).collect();
        assert_eq!(expanded.unwrap(), b"ab");
    }

    #[test]
    fn test_expand_borrowed_symbols() {
        let grammar = Grammar::from_bytes(b"abcdefgh");
        let children: Vec<Symbol> = grammar.rule(260).unwrap().rhs().to_vec();
        let mut iters: Vec<GrammarIter<'_>> = children.iter().map(|symbol| grammar.expand(symbol)).collect();
        let right: Vec<u8> = iters.pop().unwrap().map(Result::unwrap).collect();
        let left: Vec<u8> = iters.pop().unwrap().map(Result::unwrap).collect();
        assert_eq!(left, b"ab");
        assert_eq!(right, b"cd");
    }

    #[test]
    fn test_into_iterator() {
        let grammar = Grammar::from_bytes(b"hello");
        let mut collected = Vec::new();
        for byte in &grammar {
            collected.push(byte.unwrap());
        }
        assert_eq!(collected, b"hello");
    }

    #[test]
    fn test_deep_grammar() {
        // 2^20 bytes from a 19-rule chain.
        let mut grammar = Grammar::new(vec![]);
        grammar.insert_rule(256, vec![t(b'a'), t(b'a')]).unwrap();
        for id in 257..275 {
            grammar.insert_rule(id, vec![n(id - 1), n(id - 1)]).unwrap();
        }
        grammar.set_sequence(vec![n(274), n(274)]);
        let output = decompress(&grammar).unwrap();
        assert_eq!(output.len(), 1 << 20);
        assert!(output.iter().all(|&b| b == b'a'));
    }
}
