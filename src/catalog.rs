//! Name-keyed storage of every known command and variable.

use crate::command::CommandEntry;
use crate::variable::VariableEntry;
use std::collections::BTreeMap;

/// Commands and variables, both keyed by lower-cased name.
///
/// Registration replaces silently: the last entry registered under a name wins.
#[derive(Debug, Default)]
pub struct Catalog {
    commands: BTreeMap<String, CommandEntry>,
    variables: BTreeMap<String, VariableEntry>,
}

/// Entries of one category, in name order.
pub type Group<'a, T> = (&'a str, Vec<&'a T>);

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the entry that was replaced, if any.
    pub fn register_command(&mut self, entry: CommandEntry) -> Option<CommandEntry> {
        self.commands.insert(entry.name.to_lowercase(), entry)
    }

    /// Insert or replace; returns the entry that was replaced, if any.
    pub fn register_variable(&mut self, entry: VariableEntry) -> Option<VariableEntry> {
        self.variables.insert(entry.name.to_lowercase(), entry)
    }

    /// Look up a command by name, ignoring case.
    pub fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(&name.to_lowercase())
    }

    /// Look up a variable by name, ignoring case.
    pub fn variable(&self, name: &str) -> Option<&VariableEntry> {
        self.variables.get(&name.to_lowercase())
    }

    /// Lower-cased command names starting with `prefix`, sorted.
    pub fn matching_commands(&self, prefix: &str) -> Vec<String> {
        matching(&self.commands, prefix)
    }

    /// Lower-cased variable names starting with `prefix`, sorted.
    pub fn matching_variables(&self, prefix: &str) -> Vec<String> {
        matching(&self.variables, prefix)
    }

    pub fn commands_by_category(&self) -> Vec<Group<'_, CommandEntry>> {
        group(&self.commands, |c| c.category.as_str())
    }

    pub fn variables_by_category(&self) -> Vec<Group<'_, VariableEntry>> {
        group(&self.variables, |v| v.category.as_str())
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.variables.clear();
    }
}

fn matching<T>(map: &BTreeMap<String, T>, prefix: &str) -> Vec<String> {
    let prefix = prefix.to_lowercase();
    // Keys are sorted, so everything with the prefix is one contiguous run.
    map.range(prefix.clone()..)
        .take_while(|(key, _)| key.starts_with(&prefix))
        .map(|(key, _)| key.clone())
        .collect()
}

fn group<'a, T>(map: &'a BTreeMap<String, T>, category: impl Fn(&'a T) -> &'a str) -> Vec<Group<'a, T>> {
    let mut groups: BTreeMap<&'a str, Vec<&'a T>> = BTreeMap::new();
    // Iterating in key order keeps each group sorted by name.
    for entry in map.values() {
        groups.entry(category(entry)).or_default().push(entry);
    }
    groups.into_iter().collect()
}
