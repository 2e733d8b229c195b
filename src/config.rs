//! Tunables for a console session and its discovery pass.

use crate::history::DEFAULT_HISTORY_CAPACITY;
use regex::{Regex, RegexBuilder};

/// Settings for one console session.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Maximum number of lines kept in history.
    pub history_capacity: usize,
    pub discovery: DiscoveryConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            discovery: DiscoveryConfig::default(),
        }
    }
}

/// Settings for the discovery scanner.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Types processed between two yields, on top of the yield after each module.
    pub batch_size: usize,
    pub filter: ModuleFilter,
    pub warnings: WarningPolicy,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            filter: ModuleFilter::default(),
            warnings: WarningPolicy::default(),
        }
    }
}

/// Name heuristics for modules that never carry console entries.
///
/// Three kinds of rule, all case-insensitive:
/// - crate roots match the name itself or anything under `root::`;
/// - prefixes match the start of the name;
/// - substrings match anywhere.
#[derive(Debug, Clone)]
pub struct ModuleFilter {
    crates: Vec<String>,
    prefixes: Vec<String>,
    substrings: Vec<String>,
}

impl ModuleFilter {
    /// A filter that excludes nothing.
    pub fn none() -> Self {
        Self {
            crates: Vec::new(),
            prefixes: Vec::new(),
            substrings: Vec::new(),
        }
    }

    pub fn exclude_crate(mut self, root: impl Into<String>) -> Self {
        self.crates.push(root.into());
        self
    }

    pub fn exclude_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn exclude_substring(mut self, substring: impl Into<String>) -> Self {
        self.substrings.push(substring.into());
        self
    }

    /// Compile every rule into one regex; `None` when there are no rules.
    pub fn compile(&self) -> Result<Option<Regex>, regex::Error> {
        let alternation = |items: &[String]| {
            items
                .iter()
                .map(|item| regex::escape(item))
                .collect::<Vec<_>>()
                .join("|")
        };

        let mut branches = Vec::new();
        if !self.crates.is_empty() {
            branches.push(format!("^(?:{})(?:$|::)", alternation(&self.crates)));
        }
        if !self.prefixes.is_empty() {
            branches.push(format!("^(?:{})", alternation(&self.prefixes)));
        }
        if !self.substrings.is_empty() {
            branches.push(format!("(?:{})", alternation(&self.substrings)));
        }
        if branches.is_empty() {
            return Ok(None);
        }

        RegexBuilder::new(&branches.join("|"))
            .case_insensitive(true)
            .build()
            .map(Some)
    }
}

impl Default for ModuleFilter {
    /// Standard library, compiler support and test tooling.
    fn default() -> Self {
        ["std", "core", "alloc", "proc_macro", "test"]
            .into_iter()
            .fold(ModuleFilter::none(), |filter, root| filter.exclude_crate(root))
            .exclude_substring("criterion")
            .exclude_substring("proptest")
            .exclude_substring("rstest")
    }
}

/// Whether to warn about annotated members whose target instance is gone.
#[derive(Debug, Clone)]
pub struct WarningPolicy {
    enabled: bool,
    suppress: Option<Regex>,
}

impl WarningPolicy {
    pub fn silent() -> Self {
        Self {
            enabled: false,
            suppress: None,
        }
    }

    /// Warn, except for types whose name matches `pattern`.
    pub fn suppressing(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            enabled: true,
            suppress: Some(Regex::new(pattern)?),
        })
    }

    pub fn should_warn(&self, type_name: &str) -> bool {
        self.enabled
            && !self
                .suppress
                .as_ref()
                .is_some_and(|re| re.is_match(type_name))
    }
}

impl Default for WarningPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            suppress: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_excludes_std_family_only() {
        let re = ModuleFilter::default().compile().unwrap().unwrap();
        assert!(re.is_match("std"));
        assert!(re.is_match("core::fmt"));
        assert!(re.is_match("my_game::benches::Criterion"));
        assert!(!re.is_match("stdx"));
        assert!(!re.is_match("game::player"));
    }

    #[test]
    fn test_prefix_and_escaping() {
        let re = ModuleFilter::none()
            .exclude_prefix("engine.")
            .compile()
            .unwrap()
            .unwrap();
        assert!(re.is_match("Engine.Render"));
        assert!(!re.is_match("engineXrender"));
    }

    #[test]
    fn test_empty_filter_compiles_to_none() {
        assert!(ModuleFilter::none().compile().unwrap().is_none());
    }

    #[test]
    fn test_warning_policy() {
        assert!(WarningPolicy::default().should_warn("Player"));
        assert!(!WarningPolicy::silent().should_warn("Player"));

        let policy = WarningPolicy::suppressing("ExampleConsoleCommands").unwrap();
        assert!(!policy.should_warn("demo::ExampleConsoleCommands"));
        assert!(policy.should_warn("demo::Player"));
        assert!(WarningPolicy::suppressing("(").is_err());
    }
}
