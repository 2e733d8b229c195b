mod demo;

use argh::FromArgs;
use dev_console::config::WarningPolicy;
use dev_console::discovery::Step;
use dev_console::{CLEAR_SENTINEL, Console, ConsoleConfig, ConsoleSink, Severity, Suggestion};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

/// Interactive developer console over a small demo world.
#[derive(FromArgs)]
struct Args {
    /// number of lines kept in the console history
    #[argh(option)]
    history_capacity: Option<usize>,

    /// types scanned between two discovery yields
    #[argh(option)]
    batch_size: Option<usize>,

    /// do not warn about commands whose target no longer exists
    #[argh(switch)]
    no_warnings: bool,

    /// regex of type names exempt from missing-target warnings
    #[argh(option, default = "String::from(\"ExampleConsoleCommands\")")]
    suppress: String,
}

impl Args {
    fn config(&self) -> anyhow::Result<ConsoleConfig> {
        let mut config = ConsoleConfig::default();
        if let Some(capacity) = self.history_capacity {
            config.history_capacity = capacity;
        }
        if let Some(batch_size) = self.batch_size {
            config.discovery.batch_size = batch_size;
        }
        config.discovery.warnings = if self.no_warnings {
            WarningPolicy::silent()
        } else {
            WarningPolicy::suppressing(&self.suppress)?
        };
        Ok(config)
    }
}

/// Prints console output to the terminal.
struct TerminalSink;

impl ConsoleSink for TerminalSink {
    fn log_message(&mut self, text: &str, severity: Severity) {
        match severity {
            _ if text == CLEAR_SENTINEL => print!("\x1B[2J\x1B[1;1H"),
            Severity::Info => println!("{}", text),
            Severity::Warning => println!("warning: {}", text),
            Severity::Error => println!("error: {}", text),
        }
    }
}

/// Completes the first word from the console's suggestions.
#[derive(Default)]
struct ConsoleHelper {
    suggestions: Vec<Suggestion>,
}

impl ConsoleHelper {
    fn refresh(&mut self, console: &Console) {
        self.suggestions = console.suggestions("", usize::MAX);
    }
}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        if prefix.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        let prefix = prefix.to_lowercase();
        let candidates = self
            .suggestions
            .iter()
            .filter(|s| s.name.to_lowercase().starts_with(&prefix))
            .map(|s| Pair {
                display: format!("{} - {}", s.usage, s.description),
                replacement: s.name.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;
}

impl Highlighter for ConsoleHelper {}

impl Validator for ConsoleHelper {}

impl Helper for ConsoleHelper {}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Args = argh::from_env();

    let world = demo::World::new();
    let mut console = Console::with_sinks(args.config()?, vec![Box::new(TerminalSink)]);
    console.start_discovery(world.modules())?;
    while let Some(Step::Yielded) = console.poll_discovery() {}

    let mut rl: Editor<ConsoleHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ConsoleHelper::default()));

    while !console.should_exit() {
        if let Some(helper) = rl.helper_mut() {
            helper.refresh(&console);
        }
        match rl.readline("> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                console.execute(&line);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    console.teardown();
    Ok(())
}
