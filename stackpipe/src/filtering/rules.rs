//! Allow/deny rule-groups
//!
//! A condition is a typed regex:
//!
//! - `SYM <regex>` matches the display name
//! - `EXEC <regex>` matches the module path
//! - `ANY <regex>` matches either
//!
//! A rule-group is a conjunction of conditions; a frame matches a rule set if
//! it satisfies at least one group. Regexes are unanchored searches.

use regex::Regex;

use crate::domain::FilterError;
use crate::symbolization::ResolvedFrame;

/// One typed predicate of a rule-group.
#[derive(Debug, Clone)]
pub enum Condition {
    Symbol(Regex),
    Module(Regex),
    Either(Regex),
}

impl Condition {
    /// Parse `"<SYM|EXEC|ANY> <regex>"`.
    ///
    /// # Errors
    /// Returns an error for an unknown prefix, a missing regex, or a regex that
    /// does not compile
    pub fn parse(condition: &str) -> Result<Self, FilterError> {
        let (kind, pattern) = condition
            .split_once(' ')
            .filter(|(_, pattern)| !pattern.is_empty())
            .ok_or_else(|| FilterError::InvalidCondition(condition.to_string()))?;

        let regex = Regex::new(pattern).map_err(|source| FilterError::InvalidRegex {
            condition: condition.to_string(),
            source,
        })?;

        match kind {
            "SYM" => Ok(Condition::Symbol(regex)),
            "EXEC" => Ok(Condition::Module(regex)),
            "ANY" => Ok(Condition::Either(regex)),
            _ => Err(FilterError::InvalidCondition(condition.to_string())),
        }
    }

    #[must_use]
    pub fn matches(&self, frame: &ResolvedFrame) -> bool {
        match self {
            Condition::Symbol(re) => re.is_match(&frame.name),
            Condition::Module(re) => re.is_match(&frame.module),
            Condition::Either(re) => re.is_match(&frame.name) || re.is_match(&frame.module),
        }
    }
}

/// Conjunction of conditions
#[derive(Debug, Clone)]
pub struct RuleGroup {
    conditions: Vec<Condition>,
}

impl RuleGroup {
    /// # Errors
    /// Returns an error if any condition is invalid
    pub fn parse<S: AsRef<str>>(conditions: &[S]) -> Result<Self, FilterError> {
        let conditions =
            conditions.iter().map(|c| Condition::parse(c.as_ref())).collect::<Result<_, _>>()?;
        Ok(Self { conditions })
    }

    #[must_use]
    pub fn matches(&self, frame: &ResolvedFrame) -> bool {
        self.conditions.iter().all(|condition| condition.matches(frame))
    }
}

/// Disjunction of rule-groups
#[derive(Debug, Clone)]
pub struct RuleSet {
    groups: Vec<RuleGroup>,
}

impl RuleSet {
    /// # Errors
    /// Returns an error if any condition is invalid
    pub fn parse<S: AsRef<str>>(groups: &[Vec<S>]) -> Result<Self, FilterError> {
        let groups = groups.iter().map(|g| RuleGroup::parse(g)).collect::<Result<_, _>>()?;
        Ok(Self { groups })
    }

    #[must_use]
    pub fn matches(&self, frame: &ResolvedFrame) -> bool {
        self.groups.iter().any(|group| group.matches(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str, module: &str) -> ResolvedFrame {
        ResolvedFrame::new(name, module, "0x0")
    }

    #[test]
    fn test_condition_kinds() {
        let sym = Condition::parse("SYM ^foo").unwrap();
        let exec = Condition::parse("EXEC libc").unwrap();
        let any = Condition::parse("ANY bar").unwrap();

        assert!(sym.matches(&frame("foo::run", "/bin/x")));
        assert!(!sym.matches(&frame("run", "/bin/foo")));
        assert!(exec.matches(&frame("malloc", "/usr/lib/libc.so.6")));
        assert!(!exec.matches(&frame("libc_start", "/bin/x")));
        assert!(any.matches(&frame("bar", "")));
        assert!(any.matches(&frame("x", "/opt/bar/lib.so")));
        assert!(!any.matches(&frame("x", "/opt/y")));
    }

    #[test]
    fn test_regex_is_a_search() {
        let sym = Condition::parse("SYM oo").unwrap();
        assert!(sym.matches(&frame("foo", "")));
    }

    #[test]
    fn test_regex_may_contain_spaces() {
        let sym = Condition::parse("SYM LazyCompile:\\*fib /tmp").unwrap();
        assert!(sym.matches(&frame("LazyCompile:*fib /tmp/fib.js:1", "")));
    }

    #[test]
    fn test_invalid_conditions() {
        assert!(matches!(Condition::parse("SYM"), Err(FilterError::InvalidCondition(_))));
        assert!(matches!(Condition::parse("SYM "), Err(FilterError::InvalidCondition(_))));
        assert!(matches!(Condition::parse("FUNC foo"), Err(FilterError::InvalidCondition(_))));
        assert!(matches!(Condition::parse("SYM ("), Err(FilterError::InvalidRegex { .. })));
    }

    #[test]
    fn test_group_is_conjunction_set_is_disjunction() {
        let set = RuleSet::parse(&[vec!["SYM ^foo", "EXEC libfoo"], vec!["SYM ^bar$"]]).unwrap();

        assert!(set.matches(&frame("foo", "/lib/libfoo.so")));
        assert!(!set.matches(&frame("foo", "/lib/libc.so")));
        assert!(set.matches(&frame("bar", "/lib/libc.so")));
        assert!(!set.matches(&frame("barn", "/lib/libc.so")));
    }

    #[test]
    fn test_empty_group_matches_everything() {
        let set = RuleSet::parse::<&str>(&[vec![]]).unwrap();
        assert!(set.matches(&frame("anything", "")));

        let none = RuleSet::parse::<&str>(&[]).unwrap();
        assert!(!none.matches(&frame("anything", "")));
    }
}
