//! Description and category rule tables.
//!
//! A rule is a `(pattern, replacement)` pair. Patterns match as
//! case-insensitive substrings of a record's original description. Tables are
//! ordered: when several rules match, the one furthest down the table wins.

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub pattern: String,
    pub replacement: String,
    needle: String,
}

impl Rule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self {
            needle: pattern.to_lowercase(),
            pattern,
            replacement: replacement.into(),
        }
    }

    /// `lowered` must already be lowercase.
    fn matches_lowered(&self, lowered: &str) -> bool {
        lowered.contains(&self.needle)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matches_lowered(&text.to_lowercase())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Replacement of the last rule in table order matching `text`.
    pub fn last_match(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches_lowered(&lowered))
            .map(|rule| rule.replacement.as_str())
    }
}

impl FromIterator<(String, String)> for RuleTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(p, r)| Rule::new(p, r)).collect())
    }
}

/// Both rule tables, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    pub description: RuleTable,
    pub category: RuleTable,
}

impl RuleBook {
    pub fn new(description: RuleTable, category: RuleTable) -> Self {
        Self {
            description,
            category,
        }
    }
}
