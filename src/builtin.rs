use crate::catalog::Catalog;
use crate::history::HistoryBuffer;

/// Commands the engine registers itself, before any discovery runs.
///
/// They take no arguments. A later registration under the same name replaces
/// them like any other command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Help,
    Clear,
    Quit,
    History,
}

impl Builtin {
    pub const ALL: [Builtin; 4] = [Builtin::Help, Builtin::Clear, Builtin::Quit, Builtin::History];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Help => "help",
            Builtin::Clear => "clear",
            Builtin::Quit => "quit",
            Builtin::History => "history",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Builtin::Help => "Show all available commands",
            Builtin::Clear => "Clear console output",
            Builtin::Quit => "Quit application",
            Builtin::History => "Show command history",
        }
    }
}

/// `help` output: commands then variables, grouped by category.
pub(crate) fn help_lines(catalog: &Catalog) -> Vec<String> {
    let mut lines = vec!["Available Commands:".to_string()];
    for (category, commands) in catalog.commands_by_category() {
        lines.push(format!("\n[{}]", category));
        for cmd in commands {
            lines.push(format!("  {} - {}", cmd.name, cmd.description));
        }
    }

    lines.push("\nAvailable Variables:".to_string());
    for (category, variables) in catalog.variables_by_category() {
        lines.push(format!("\n[{}]", category));
        for var in variables {
            let read_only = if var.is_read_only() { " (read-only)" } else { "" };
            lines.push(format!("  {}{} - {}", var.name, read_only, var.description));
        }
    }
    lines
}

/// `history` output, numbered from 1.
pub(crate) fn history_lines(history: &HistoryBuffer) -> Vec<String> {
    let mut lines = vec!["Command History:".to_string()];
    lines.extend(
        history
            .entries()
            .enumerate()
            .map(|(i, line)| format!("  {}: {}", i + 1, line)),
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandEntry;
    use crate::variable::{Accessor, VariableEntry};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_help_groups_and_marks_read_only() {
        let mut catalog = Catalog::new();
        for builtin in Builtin::ALL {
            catalog.register_command(CommandEntry::builtin(builtin));
        }
        catalog.register_command(
            CommandEntry::function("heal", |_: f32| {})
                .with_description("Heal player by amount")
                .with_category("Player"),
        );
        let fps = Arc::new(Mutex::new(60.0f32));
        catalog.register_variable(
            VariableEntry::new("currentFPS", Accessor::field(&fps))
                .with_description("Current frames per second")
                .with_category("System")
                .read_only(true),
        );

        let lines = help_lines(&catalog);
        assert_eq!(
            lines,
            vec![
                "Available Commands:",
                "\n[Built-in]",
                "  clear - Clear console output",
                "  help - Show all available commands",
                "  history - Show command history",
                "  quit - Quit application",
                "\n[Player]",
                "  heal - Heal player by amount",
                "\nAvailable Variables:",
                "\n[System]",
                "  currentFPS (read-only) - Current frames per second",
            ]
        );
    }

    #[test]
    fn test_history_is_one_based() {
        let mut history = HistoryBuffer::default();
        history.push("heal 5");
        history.push("history");
        assert_eq!(
            history_lines(&history),
            vec!["Command History:", "  1: heal 5", "  2: history"]
        );
    }
}
