use crate::score::ScoreBreakdown;
use crate::span::Span;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// A target or source word. Shared between all phrases it occurs in.
pub type Word = Arc<str>;

pub fn word(s: &str) -> Word {
    Arc::from(s)
}

/// A sequence of words.
pub fn words(s: &str) -> Vec<Word> {
    s.split_whitespace().map(word).collect()
}

/// A symbol on the target side of a synchronous rule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetSymbol {
    Terminal(Word),
    /// `NonTerminal(i)` is replaced by the output of the `i`th antecedent,
    /// where antecedents are numbered in source order.
    NonTerminal(usize),
}

impl TargetSymbol {
    pub fn is_terminal(&self) -> bool {
        match *self {
            TargetSymbol::Terminal(_) => true,
            TargetSymbol::NonTerminal(_) => false,
        }
    }
}

impl Display for TargetSymbol {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            TargetSymbol::Terminal(ref w) => write!(f, "{}", w),
            TargetSymbol::NonTerminal(i) => write!(f, "[X,{}]", i),
        }
    }
}

/// The target side of a grammar rule together with everything that can be
/// scored without knowing where the rule is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPhrase {
    pub lhs: Option<Word>,
    pub symbols: Vec<TargetSymbol>,
    /// Pairs `(target symbol position, source offset)`; offsets are relative
    /// to the start of the span the rule is applied to.
    pub alignment: Vec<(usize, usize)>,
    /// Dense scores read from the rule table.
    pub rule_scores: Vec<f64>,
    /// Scores of the isolation phase; empty until the phrase is scored.
    pub scores: ScoreBreakdown,
    /// Estimated future score contributions of the isolation phase.
    pub future: ScoreBreakdown,
}

impl TargetPhrase {
    pub fn new(symbols: Vec<TargetSymbol>) -> Self {
        TargetPhrase {
            lhs: None,
            symbols,
            alignment: Vec::new(),
            rule_scores: Vec::new(),
            scores: ScoreBreakdown::default(),
            future: ScoreBreakdown::default(),
        }
    }

    /// Reads a template like `"the [X,0] of [X,1]"`.
    pub fn parse(template: &str) -> Self {
        let symbols = template
            .split_whitespace()
            .map(|token| {
                if token.starts_with("[X,") && token.ends_with(']') {
                    if let Ok(i) = token[3..token.len() - 1].parse() {
                        return TargetSymbol::NonTerminal(i);
                    }
                }
                TargetSymbol::Terminal(word(token))
            })
            .collect();
        TargetPhrase::new(symbols)
    }

    pub fn with_rule_scores(mut self, scores: Vec<f64>) -> Self {
        self.rule_scores = scores;
        self
    }

    pub fn with_alignment(mut self, alignment: Vec<(usize, usize)>) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn arity(&self) -> usize {
        self.symbols.iter().filter(|s| !s.is_terminal()).count()
    }

    pub fn num_terminals(&self) -> usize {
        self.symbols.iter().filter(|s| s.is_terminal()).count()
    }

    pub fn terminals(&self) -> impl Iterator<Item = (usize, &Word)> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match *s {
                TargetSymbol::Terminal(ref w) => Some((i, w)),
                TargetSymbol::NonTerminal(_) => None,
            })
    }

    /// The source offset aligned to the symbol at `position`, if any.
    pub fn aligned_source(&self, position: usize) -> Option<usize> {
        self.alignment
            .iter()
            .find(|&&(t, _)| t == position)
            .map(|&(_, s)| s)
    }
}

impl Display for TargetPhrase {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let mut first = true;
        for symbol in &self.symbols {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", symbol)?;
            first = false;
        }
        Ok(())
    }
}

/// The input sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    words: Vec<Word>,
}

impl Sentence {
    pub fn new(words: Vec<Word>) -> Self {
        Sentence { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn get(&self, position: usize) -> Option<&Word> {
        self.words.get(position)
    }

    pub fn slice(&self, span: Span) -> &[Word] {
        &self.words[span.start..span.end]
    }
}

impl<'a> From<&'a str> for Sentence {
    fn from(s: &'a str) -> Self {
        Sentence::new(words(s))
    }
}

/// A grammar rule instantiated over a span: the target template, the spans
/// covered by its nonterminals (in source order) and the scores of the
/// isolation and source-context phases.
#[derive(Debug, Clone)]
pub struct RuleApplication {
    pub target: Arc<TargetPhrase>,
    pub span: Span,
    pub nonterminal_spans: Vec<Span>,
    pub source_terminals: usize,
    pub scores: ScoreBreakdown,
}

impl RuleApplication {
    pub fn arity(&self) -> usize {
        self.nonterminal_spans.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_template() {
        let phrase = TargetPhrase::parse("the [X,1] of [X,0]");
        assert_eq!(phrase.arity(), 2);
        assert_eq!(phrase.num_terminals(), 2);
        assert_eq!(phrase.symbols[1], TargetSymbol::NonTerminal(1));
        assert_eq!(
            phrase.terminals().map(|(i, w)| (i, w.to_string())).collect::<Vec<_>>(),
            vec![(0, "the".to_string()), (2, "of".to_string())]
        );
        assert_eq!(format!("{}", phrase), "the [X,1] of [X,0]");
    }

    #[test]
    fn alignment_lookup() {
        let phrase = TargetPhrase::parse("a b").with_alignment(vec![(1, 0)]);
        assert_eq!(phrase.aligned_source(1), Some(0));
        assert_eq!(phrase.aligned_source(0), None);
    }
}
