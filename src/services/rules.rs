//! Ordered first-match rule chains.
//!
//! Stage classification and advice synthesis are both written as a list of
//! `(predicate, builder)` pairs evaluated in priority order. The first rule
//! whose predicate holds produces the result; the mandatory fallback runs when
//! none does.

/// A named predicate/builder pair over some input.
pub struct Rule<I, O> {
    pub name: &'static str,
    pub when: fn(&I) -> bool,
    pub then: fn(&I) -> O,
}

/// Result of walking a chain: the rule that fired and what it built.
#[derive(Debug, Clone, PartialEq)]
pub struct Matched<O> {
    pub rule: &'static str,
    pub output: O,
}

/// Name reported when the fallback fires.
pub const FALLBACK: &str = "fallback";

/// Evaluate `rules` in order, falling back to `otherwise` when nothing matches.
pub fn first_match<I, O>(rules: &[Rule<I, O>], input: &I, otherwise: fn(&I) -> O) -> Matched<O> {
    rules
        .iter()
        .find(|rule| (rule.when)(input))
        .map(|rule| Matched {
            rule: rule.name,
            output: (rule.then)(input),
        })
        .unwrap_or_else(|| Matched {
            rule: FALLBACK,
            output: otherwise(input),
        })
}
