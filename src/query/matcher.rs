//! Value comparison of a single predicate

use regex::Regex;

use super::ast::QueryType;
use crate::errors::{RegistryError, RegistryResult};

/// Wraps a pattern so it must match the whole input
pub fn anchored(pattern: &str) -> String {
    format!(r"\A(?:{})\z", pattern)
}

/// Compiled comparison of a predicate value
#[derive(Debug, Clone)]
pub enum ValueMatcher {
    Exact(String),
    Pattern(Regex),
}

impl ValueMatcher {
    pub fn compile(query_type: QueryType, value: &str) -> RegistryResult<Self> {
        match query_type {
            QueryType::Match => Ok(Self::Exact(value.to_string())),
            QueryType::Regex => Regex::new(&anchored(value))
                .map(Self::Pattern)
                .map_err(|e| RegistryError::invalid_pattern(value, e)),
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(value) => value == candidate,
            Self::Pattern(regex) => regex.is_match(candidate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let matcher = ValueMatcher::compile(QueryType::Match, "Motor").unwrap();
        assert!(matcher.matches("Motor"));
        assert!(!matcher.matches("motor"));
        assert!(!matcher.matches("Motor2"));
    }

    #[test]
    fn test_regex_is_anchored() {
        let matcher = ValueMatcher::compile(QueryType::Regex, "mo.*r").unwrap();
        assert!(matcher.matches("motor"));
        assert!(!matcher.matches("a motor"));
        assert!(!matcher.matches("motors"));
    }

    #[test]
    fn test_alternation_stays_anchored() {
        let matcher = ValueMatcher::compile(QueryType::Regex, "a|b").unwrap();
        assert!(matcher.matches("a"));
        assert!(!matcher.matches("ab"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = ValueMatcher::compile(QueryType::Regex, "(").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidQuery(_)));
    }
}
