use std::fmt;

use crate::foundation::error::{IngestError, IngestResult};

/// How a [`ChannelSelector`] pattern is interpreted.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SelectorMode {
    /// Comma/whitespace separated terms, each matched as a subsequence.
    #[default]
    Fuzzy,
    /// A single regular expression.
    Regex,
}

/// Filter that picks (and orders) channels by name.
///
/// Every accepted name gets a match rank; callers order accepted channels by
/// `(rank, original index)`. In fuzzy mode the rank is the index of the first
/// term that matches, so `"B,G,R"` reorders an RGB image into BGR. Regex
/// matches all share rank 0 and therefore keep their original order.
#[derive(Clone, Debug, Default)]
pub struct ChannelSelector {
    pattern: String,
    mode: SelectorMode,
    regex: Option<regex::Regex>,
}

impl ChannelSelector {
    /// Selector that accepts every channel.
    pub fn all() -> Self {
        Self::default()
    }

    /// Fuzzy selector. Fuzzy patterns cannot be malformed.
    pub fn fuzzy(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: SelectorMode::Fuzzy,
            regex: None,
        }
    }

    /// Regex selector; fails if `pattern` does not compile.
    pub fn regex(pattern: impl Into<String>) -> IngestResult<Self> {
        let pattern = pattern.into();
        let regex = if pattern.is_empty() {
            None
        } else {
            Some(
                regex::Regex::new(&pattern)
                    .map_err(|e| IngestError::selector(format!("invalid regex '{pattern}': {e}")))?,
            )
        };
        Ok(Self {
            pattern,
            mode: SelectorMode::Regex,
            regex,
        })
    }

    /// Build a selector of the given mode.
    pub fn new(pattern: impl Into<String>, mode: SelectorMode) -> IngestResult<Self> {
        match mode {
            SelectorMode::Fuzzy => Ok(Self::fuzzy(pattern)),
            SelectorMode::Regex => Self::regex(pattern),
        }
    }

    /// The raw pattern text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Interpretation of the pattern.
    pub fn mode(&self) -> SelectorMode {
        self.mode
    }

    /// An empty selector accepts everything and imposes no order.
    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    /// Rank of `name` under this selector, or `None` if it is rejected.
    pub fn match_rank(&self, name: &str) -> Option<usize> {
        match (&self.mode, &self.regex) {
            (SelectorMode::Regex, Some(re)) => re.is_match(name).then_some(0),
            (SelectorMode::Regex, None) => Some(0),
            (SelectorMode::Fuzzy, _) => matches_fuzzy(name, &self.pattern),
        }
    }

    /// Whether `name` is accepted.
    pub fn matches(&self, name: &str) -> bool {
        self.match_rank(name).is_some()
    }

    /// Same mode, different pattern.
    pub fn with_pattern(&self, pattern: impl Into<String>) -> IngestResult<Self> {
        Self::new(pattern, self.mode)
    }
}

impl fmt::Display for ChannelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Fuzzy-match `text` against the comma/whitespace separated terms of `pattern`.
///
/// Returns the index of the first matching term. A term matches when its
/// characters appear in `text` in order (not necessarily adjacent). Terms
/// containing an uppercase letter match case-sensitively, all-lowercase terms
/// ignore case. An empty pattern matches everything with rank 0.
pub fn matches_fuzzy(text: &str, pattern: &str) -> Option<usize> {
    let mut terms = pattern
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .peekable();

    if terms.peek().is_none() {
        return Some(0);
    }

    terms
        .enumerate()
        .find(|(_, term)| is_subsequence(term, text))
        .map(|(idx, _)| idx)
}

fn is_subsequence(term: &str, text: &str) -> bool {
    let case_sensitive = term.chars().any(char::is_uppercase);
    let mut hay = text.chars();
    term.chars().all(|needle| {
        hay.any(|c| {
            if case_sensitive {
                c == needle
            } else {
                c.to_lowercase().eq(needle.to_lowercase())
            }
        })
    })
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/selector.rs"]
mod tests;
