use crate::error::GrammarError;
use crate::rle_rule::CompressedRule;
use crate::rule::Rule;
use crate::symbol::{RuleId, Symbol, FIRST_RULE_ID};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use std::collections::BTreeMap;

/// A straight-line program: a rule table plus the top-level sequence whose
/// concatenated expansion is the represented string.
///
/// Rules are kept in an ordered table keyed by id, so every pass that walks
/// the table sees the same order on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grammar {
    pub(crate) rules: BTreeMap<RuleId, Rule>,
    pub(crate) sequence: Vec<Symbol>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

impl Grammar {
    /// Creates a grammar with an empty rule table.
    ///
    /// The sequence may only contain terminals until the referenced rules
    /// are inserted.
    pub fn new(sequence: Vec<Symbol>) -> Self {
        Self {
            rules: BTreeMap::new(),
            sequence,
        }
    }

    /// Builds a grammar from rules given in any order.
    ///
    /// Checks closedness, acyclicity and unique ids, then computes every
    /// cached length.
    pub fn from_parts<I>(rules: I, sequence: Vec<Symbol>) -> Result<Self, GrammarError>
    where
        I: IntoIterator<Item = (RuleId, Vec<Symbol>)>,
    {
        let mut table = BTreeMap::new();
        for (id, rhs) in rules {
            if id < FIRST_RULE_ID {
                return Err(GrammarError::ReservedRuleId(id));
            }
            if rhs.is_empty() {
                return Err(GrammarError::EmptyRule(id));
            }
            if table.insert(id, Rule::new(rhs, 0)).is_some() {
                return Err(GrammarError::DuplicateRule(id));
            }
        }

        let mut grammar = Self {
            rules: table,
            sequence,
        };
        grammar.validate()?;
        crate::metadata::try_recompute_lengths(&mut grammar)?;
        Ok(grammar)
    }

    /// Builds a balanced binary grammar for `bytes`.
    ///
    /// Symbols are paired level by level; identical pairs on a level share
    /// one rule. An odd symbol at the end of a level is carried up as is.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut grammar = Self::default();
        let mut level: Vec<Symbol> = bytes.iter().map(|&b| Symbol::Terminal(b)).collect();
        let mut pairs: HashMap<(Symbol, Symbol), RuleId> = HashMap::default();

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for chunk in level.chunks(2) {
                match *chunk {
                    [left, right] => {
                        let id = match pairs.get(&(left, right)) {
                            Some(&id) => id,
                            None => {
                                let id = grammar.add_rule(vec![left, right]);
                                pairs.insert((left, right), id);
                                id
                            }
                        };
                        next.push(Symbol::NonTerminal(id));
                    }
                    [single] => next.push(single),
                    _ => unreachable!("chunks(2) yields one or two symbols"),
                }
            }
            level = next;
        }

        grammar.sequence = level;
        grammar
    }

    /// Inserts or replaces rule `id`.
    ///
    /// Every non-terminal on `rhs` must already have a rule, and the new rule
    /// must not be reachable from its own children. Fails with
    /// [`GrammarError::LengthOverflow`] if any expanded length would no
    /// longer fit in `usize`; the grammar is then left unchanged.
    pub fn insert_rule(&mut self, id: RuleId, rhs: Vec<Symbol>) -> Result<(), GrammarError> {
        if id < FIRST_RULE_ID {
            return Err(GrammarError::ReservedRuleId(id));
        }
        if rhs.is_empty() {
            return Err(GrammarError::EmptyRule(id));
        }

        let replacing = self.rules.contains_key(&id);
        let mut length = 0;
        for &symbol in &rhs {
            if let Symbol::NonTerminal(child) = symbol {
                if child == id || (replacing && self.reaches(child, id)) {
                    return Err(GrammarError::CyclicRule(id));
                }
            }
            length = self
                .symbol_length(symbol)?
                .checked_add(length)
                .ok_or(GrammarError::LengthOverflow)?;
        }

        let previous = self.rules.insert(id, Rule::new(rhs, length));
        if let Some(old) = previous.filter(|old| old.length != length) {
            // Ancestors may no longer fit; keep the old rule if so.
            if let Err(e) = crate::metadata::try_recompute_lengths(self) {
                self.rules.insert(id, old);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Appends a rule under a fresh id. Children are expected to exist.
    pub(crate) fn add_rule(&mut self, rhs: Vec<Symbol>) -> RuleId {
        let id = self.next_rule_id();
        let length = rhs
            .iter()
            .fold(0usize, |total, &s| total.saturating_add(self.cached_length(s)));
        self.rules.insert(id, Rule::new(rhs, length));
        id
    }

    pub(crate) fn remove_rule(&mut self, id: RuleId) -> Option<Rule> {
        self.rules.remove(&id)
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    /// Iterates over the rules in ascending id order.
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> + '_ {
        self.rules.iter().map(|(&id, rule)| (id, rule))
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.rules.keys().copied()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn contains_rule(&self, id: RuleId) -> bool {
        self.rules.contains_key(&id)
    }

    pub fn sequence(&self) -> &[Symbol] {
        &self.sequence
    }

    pub fn set_sequence(&mut self, sequence: Vec<Symbol>) {
        self.sequence = sequence;
    }

    /// Expanded length of a single symbol.
    pub fn symbol_length(&self, symbol: Symbol) -> Result<usize, GrammarError> {
        match symbol {
            Symbol::Terminal(_) => Ok(1),
            Symbol::NonTerminal(id) => self
                .rules
                .get(&id)
                .map(|rule| rule.length)
                .ok_or(GrammarError::MissingRule(id)),
        }
    }

    /// Same as [`symbol_length`](Self::symbol_length) for a grammar already
    /// known to be closed. A missing rule counts as length 1.
    pub(crate) fn cached_length(&self, symbol: Symbol) -> usize {
        match symbol {
            Symbol::Terminal(_) => 1,
            Symbol::NonTerminal(id) => self.rules.get(&id).map_or(1, |rule| rule.length),
        }
    }

    /// Length of the fully expanded string.
    pub fn total_length(&self) -> Result<usize, GrammarError> {
        self.sequence.iter().try_fold(0usize, |total, &symbol| {
            total
                .checked_add(self.symbol_length(symbol)?)
                .ok_or(GrammarError::LengthOverflow)
        })
    }

    /// The id a newly allocated rule receives: one past the largest id in use.
    pub fn next_rule_id(&self) -> RuleId {
        self.rules
            .keys()
            .next_back()
            .map_or(FIRST_RULE_ID, |&max| max + 1)
    }

    /// Recomputes every cached rule length. See
    /// [`metadata::recompute_lengths`](crate::metadata::recompute_lengths).
    pub fn recompute_lengths(&mut self) {
        crate::metadata::recompute_lengths(self);
    }

    /// Checks that the grammar is closed and acyclic.
    pub fn validate(&self) -> Result<(), GrammarError> {
        for &symbol in &self.sequence {
            if let Symbol::NonTerminal(id) = symbol {
                if !self.rules.contains_key(&id) {
                    return Err(GrammarError::MissingRule(id));
                }
            }
        }
        self.topological_order().map(|_| ())
    }

    /// Rule ids ordered so that every rule follows all of its children.
    pub(crate) fn topological_order(&self) -> Result<Vec<RuleId>, GrammarError> {
        let mut marks: HashMap<RuleId, Mark> = HashMap::with_capacity(self.rules.len());
        let mut order = Vec::with_capacity(self.rules.len());

        for &root in self.rules.keys() {
            if marks.contains_key(&root) {
                continue;
            }
            marks.insert(root, Mark::Active);
            let mut stack: Vec<(RuleId, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let (id, index) = *frame;
                let rhs = &self.rules[&id].rhs;

                let Some(&symbol) = rhs.get(index) else {
                    marks.insert(id, Mark::Done);
                    order.push(id);
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                let Symbol::NonTerminal(child) = symbol else {
                    continue;
                };
                if !self.rules.contains_key(&child) {
                    return Err(GrammarError::MissingRule(child));
                }
                match marks.get(&child) {
                    Some(Mark::Active) => return Err(GrammarError::CyclicRule(child)),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(child, Mark::Active);
                        stack.push((child, 0));
                    }
                }
            }
        }

        Ok(order)
    }

    /// Longest chain of rule references below the sequence; a grammar whose
    /// sequence holds only terminals has height 0.
    pub fn height(&self) -> Result<usize, GrammarError> {
        let mut heights: HashMap<RuleId, usize> = HashMap::with_capacity(self.rules.len());
        for id in self.topological_order()? {
            let height = self.rules[&id]
                .children()
                .map(|child| heights[&child])
                .max()
                .unwrap_or(0)
                + 1;
            heights.insert(id, height);
        }

        let mut max = 0;
        for &symbol in &self.sequence {
            if let Symbol::NonTerminal(id) = symbol {
                let height = heights.get(&id).ok_or(GrammarError::MissingRule(id))?;
                max = max.max(*height);
            }
        }
        Ok(max)
    }

    /// Whether `target` is reachable from `from` (inclusive).
    fn reaches(&self, from: RuleId, target: RuleId) -> bool {
        let mut seen = HashSet::default();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(rule) = self.rules.get(&id) {
                stack.extend(rule.children());
            }
        }
        false
    }

    /// Ids of every rule reachable from the top sequence.
    pub(crate) fn reachable(&self) -> HashSet<RuleId> {
        let mut visited = HashSet::with_capacity(self.rules.len());
        let mut stack: Vec<RuleId> = self.sequence.iter().filter_map(|s| s.rule_id()).collect();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(rule) = self.rules.get(&id) {
                stack.extend(rule.children().filter(|child| !visited.contains(child)));
            }
        }
        visited
    }

    /// Deletes every rule not reachable from the top sequence.
    ///
    /// Returns the number of rules removed. Running it twice removes nothing
    /// the second time.
    pub fn prune_unreachable(&mut self) -> usize {
        let reachable = self.reachable();
        let before = self.rules.len();
        self.rules.retain(|id, _| reachable.contains(id));
        before - self.rules.len()
    }

    /// Rewrites the grammar into binary rules.
    ///
    /// Unit rules are inlined into their users; longer right-hand sides are
    /// folded from the left into fresh rules. The expansion is unchanged.
    /// Returns the number of rules added.
    pub fn binarize(&mut self) -> usize {
        let units: HashMap<RuleId, Symbol> = self
            .rules
            .iter()
            .filter(|(_, rule)| rule.rhs.len() == 1)
            .map(|(&id, rule)| (id, rule.rhs[0]))
            .collect();

        if !units.is_empty() {
            let resolve = |mut symbol: Symbol| {
                while let Some(&target) = symbol.rule_id().and_then(|id| units.get(&id)) {
                    symbol = target;
                }
                symbol
            };
            for rule in self.rules.values_mut() {
                for symbol in rule.rhs.iter_mut() {
                    *symbol = resolve(*symbol);
                }
            }
            for symbol in self.sequence.iter_mut() {
                *symbol = resolve(*symbol);
            }
            self.rules.retain(|id, _| !units.contains_key(id));
        }

        let long: Vec<(RuleId, Vec<Symbol>)> = self
            .rules
            .iter()
            .filter(|(_, rule)| rule.rhs.len() > 2)
            .map(|(&id, rule)| (id, rule.rhs.clone()))
            .collect();

        let mut added = 0;
        for (id, rhs) in long {
            let last = rhs[rhs.len() - 1];
            let mut acc = rhs[0];
            for &symbol in &rhs[1..rhs.len() - 1] {
                acc = Symbol::NonTerminal(self.add_rule(vec![acc, symbol]));
                added += 1;
            }
            if let Some(rule) = self.rules.get_mut(&id) {
                rule.rhs = vec![acc, last];
            }
        }
        added
    }

    /// Total size of the run-length encoded view of all rules.
    pub fn compact_size(&self) -> usize {
        self.rules
            .values()
            .map(|rule| CompressedRule::from_list(&rule.rhs).size())
            .sum()
    }

    pub fn stats(&self) -> GrammarStats {
        GrammarStats {
            rules: self.rules.len(),
            rhs_symbols: self.rules.values().map(|rule| rule.rhs.len()).sum(),
            sequence_len: self.sequence.len(),
            expanded_len: self
                .sequence
                .iter()
                .fold(0usize, |total, &s| total.saturating_add(self.cached_length(s))),
            compact_size: self.compact_size(),
        }
    }
}

/// Size figures for a grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrammarStats {
    /// Number of rules
    pub rules: usize,
    /// Symbols over all right-hand sides
    pub rhs_symbols: usize,
    /// Symbols in the top sequence
    pub sequence_len: usize,
    /// Length of the expanded string
    pub expanded_len: usize,
    /// Sum of the compact (border + run-length) rule sizes
    pub compact_size: usize,
}

impl GrammarStats {
    /// Grammar symbols as a percentage of the expanded length.
    ///
    /// Lower is better. 100% means no compression.
    pub fn compression_ratio(&self) -> f64 {
        if self.expanded_len == 0 {
            0.0
        } else {
            ((self.rhs_symbols + self.sequence_len) as f64 / self.expanded_len as f64) * 100.0
        }
    }
}
