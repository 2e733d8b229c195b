use crate::builtin::{Builtin, help_lines, history_lines};
use crate::catalog::Catalog;
use crate::command::{BUILTIN_CATEGORY, Callable, CommandEntry};
use crate::config::ConsoleConfig;
use crate::discovery::{ConsoleModule, DiscoveryTask, Step};
use crate::error::{CoercionError, ConsoleError};
use crate::history::HistoryBuffer;
use crate::parser::{split_assignment, tokenize, unquote};
use crate::sink::{CLEAR_SENTINEL, ConsoleSink, Severity};
use crate::value::{Value, coerce};
use crate::variable::VariableEntry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Summary passed to [`ConsoleSink::command_executed`] after a successful command.
pub const SUCCESS_SUMMARY: &str = "Command executed successfully";

const INIT_MESSAGE: &str = "Console initialized. Type 'help' for available commands.";

/// What [`Console::execute`] did with a line.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Blank input.
    Nothing,
    VariableRead { name: String, value: Value },
    VariableSet { name: String, value: Value },
    CommandRan { command: String, output: Option<String> },
    Failed(ConsoleError),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Command,
    Variable,
}

/// One autocomplete candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub name: String,
    pub kind: SuggestionKind,
    pub description: String,
    /// e.g. `teleport <float> <float> <float>` or `timeScale = <float>`.
    pub usage: String,
}

/// The developer console: catalog, history and dispatch for one session.
///
/// Everything runs on the thread that owns the console. Discovery fills the
/// catalog in the background of the host's loop (see [`Console::poll_discovery`]);
/// [`Console::execute`] never waits for it and only sees entries that are
/// already registered.
///
/// ```
/// use dev_console::{CommandEntry, Console, ConsoleConfig, Outcome};
///
/// let mut console = Console::new(ConsoleConfig::default());
/// console
///     .register_command(CommandEntry::function("add", |a: i64, b: i64| (a + b).to_string()))
///     .unwrap();
///
/// let outcome = console.execute("add 2 40");
/// assert_eq!(
///     outcome,
///     Outcome::CommandRan { command: "add".to_string(), output: Some("42".to_string()) }
/// );
/// assert!(console.execute("add 2").is_failure());
/// ```
pub struct Console {
    config: ConsoleConfig,
    catalog: Arc<RwLock<Catalog>>,
    session: Arc<AtomicBool>,
    history: HistoryBuffer,
    sinks: Vec<Box<dyn ConsoleSink>>,
    discovery: Option<DiscoveryTask>,
    should_exit: bool,
}

impl Console {
    /// Create a console with no sinks and start its first session.
    pub fn new(config: ConsoleConfig) -> Self {
        Self::with_sinks(config, Vec::new())
    }

    /// Create a console and start its first session, reporting to `sinks`.
    pub fn with_sinks(config: ConsoleConfig, sinks: Vec<Box<dyn ConsoleSink>>) -> Self {
        let mut console = Self {
            history: HistoryBuffer::new(config.history_capacity),
            config,
            catalog: Arc::new(RwLock::new(Catalog::new())),
            session: Arc::new(AtomicBool::new(false)),
            sinks,
            discovery: None,
            should_exit: false,
        };
        console.begin_session();
        console
    }

    /// Also report to `sink` from now on.
    pub fn add_sink(&mut self, sink: Box<dyn ConsoleSink>) {
        self.sinks.push(sink);
    }

    /// The configuration the console was created with.
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Start a fresh session: empty history, built-ins only. Ends the current
    /// session first if there is one.
    pub fn begin_session(&mut self) {
        if self.is_active() {
            self.teardown();
        }
        self.catalog = Arc::new(RwLock::new(Catalog::new()));
        self.session = Arc::new(AtomicBool::new(true));
        self.history = HistoryBuffer::new(self.config.history_capacity);
        self.should_exit = false;

        {
            let mut catalog = self.catalog_mut();
            for builtin in Builtin::ALL {
                catalog.register_command(CommandEntry::builtin(builtin));
            }
        }
        log::debug!("console session started");
        self.emit(INIT_MESSAGE, Severity::Info);
    }

    /// End the session. Pending discovery is abandoned and registration is
    /// refused until [`Console::begin_session`].
    pub fn teardown(&mut self) {
        // The flag goes first: discovery re-checks it under the write lock.
        self.session.store(false, Ordering::Release);
        self.discovery = None;
        self.catalog_mut().clear();
        self.history.clear();
        log::debug!("console session ended");
    }

    /// Whether a session is running, i.e. registration is accepted.
    pub fn is_active(&self) -> bool {
        self.session.load(Ordering::Acquire)
    }

    /// Register a command directly. Without a category it lands in `Built-in`.
    pub fn register_command(&self, entry: CommandEntry) -> Result<Option<CommandEntry>, ConsoleError> {
        self.ensure_active()?;
        let entry = entry.or_category(BUILTIN_CATEGORY);
        Ok(self.catalog_mut().register_command(entry))
    }

    /// Register a variable directly, replacing any with the same name.
    pub fn register_variable(&self, entry: VariableEntry) -> Result<Option<VariableEntry>, ConsoleError> {
        self.ensure_active()?;
        Ok(self.catalog_mut().register_variable(entry))
    }

    /// Queue a discovery pass over `modules`, driven by [`Console::poll_discovery`].
    /// Replaces any pass still in progress.
    pub fn start_discovery(&mut self, modules: Vec<Box<dyn ConsoleModule>>) -> Result<(), ConsoleError> {
        self.discovery = Some(self.discovery_task(modules)?);
        Ok(())
    }

    /// A discovery pass the host drives itself, e.g. from another thread.
    ///
    /// Its messages are not forwarded automatically; drain them with
    /// [`DiscoveryTask::take_events`] and hand them to [`Console::log_message`].
    pub fn discovery_task(&self, modules: Vec<Box<dyn ConsoleModule>>) -> Result<DiscoveryTask, ConsoleError> {
        self.ensure_active()?;
        DiscoveryTask::new(
            Arc::downgrade(&self.catalog),
            self.session.clone(),
            modules,
            &self.config.discovery,
        )
    }

    /// Advance the queued discovery pass by one step; `None` when there is none.
    pub fn poll_discovery(&mut self) -> Option<Step> {
        let task = self.discovery.as_mut()?;
        let step = task.step();
        let events = task.take_events();
        if step != Step::Yielded {
            self.discovery = None;
        }
        for event in events {
            self.emit(&event.text, event.severity);
        }
        Some(step)
    }

    /// Send a message to every sink.
    pub fn log_message(&mut self, text: &str, severity: Severity) {
        self.emit(text, severity);
    }

    /// Parse and run one input line.
    ///
    /// Errors are logged at [`Severity::Error`] and returned in
    /// [`Outcome::Failed`]; this never panics on bad input.
    pub fn execute(&mut self, line: &str) -> Outcome {
        let line = line.trim();
        if line.is_empty() {
            return Outcome::Nothing;
        }
        self.history.push(line);

        let result = match split_assignment(line) {
            Some((name, raw)) => self.assign(name.trim(), raw.trim()),
            None => self.dispatch(line),
        };
        result.unwrap_or_else(|err| {
            self.emit(&err.to_string(), Severity::Error);
            Outcome::Failed(err)
        })
    }

    /// Set once `quit` ran; the host decides when to actually stop.
    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    /// Lines executed in this session, oldest first.
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Recall the previous line; empty when there is no history.
    pub fn previous_history(&mut self) -> String {
        self.history.previous().to_string()
    }

    /// Recall the next line; empty when there is no history.
    pub fn next_history(&mut self) -> String {
        self.history.next().to_string()
    }

    /// Lower-cased command names starting with `prefix`, case-insensitively, sorted.
    pub fn matching_commands(&self, prefix: &str) -> Vec<String> {
        self.catalog().matching_commands(prefix)
    }

    /// Lower-cased variable names starting with `prefix`, case-insensitively, sorted.
    pub fn matching_variables(&self, prefix: &str) -> Vec<String> {
        self.catalog().matching_variables(prefix)
    }

    /// A copy of the command registered under `name`, in any casing.
    pub fn command_info(&self, name: &str) -> Option<CommandEntry> {
        self.catalog().command(name).cloned()
    }

    /// A copy of the variable registered under `name`, in any casing.
    pub fn variable_info(&self, name: &str) -> Option<VariableEntry> {
        self.catalog().variable(name).cloned()
    }

    /// Up to `limit / 2` commands followed by up to `limit / 2` variables
    /// whose names start with `prefix`.
    pub fn suggestions(&self, prefix: &str, limit: usize) -> Vec<Suggestion> {
        let per_kind = limit / 2;
        let catalog = self.catalog();

        let commands = catalog
            .matching_commands(prefix)
            .into_iter()
            .filter_map(|key| catalog.command(&key))
            .take(per_kind)
            .map(|cmd| Suggestion {
                name: cmd.name.clone(),
                kind: SuggestionKind::Command,
                description: cmd.description.clone(),
                usage: cmd.usage(),
            });
        let variables = catalog
            .matching_variables(prefix)
            .into_iter()
            .filter_map(|key| catalog.variable(&key))
            .take(per_kind)
            .map(|var| Suggestion {
                name: var.name.clone(),
                kind: SuggestionKind::Variable,
                description: var.description.clone(),
                usage: format!("{} = <{}>", var.name, var.kind()),
            });
        commands.chain(variables).collect()
    }

    fn assign(&mut self, name: &str, raw: &str) -> Result<Outcome, ConsoleError> {
        let entry = self
            .variable_info(name)
            .ok_or_else(|| ConsoleError::UnknownVariable(name.to_lowercase()))?;
        if entry.is_read_only() {
            return Err(ConsoleError::ReadOnlyVariable(entry.name));
        }

        let coerced = coerce(&unquote(raw), entry.kind())?;
        let accessor = entry.accessor();
        // Echo what the storage holds now; a setter may have adjusted it.
        let value = accessor
            .set(&coerced)
            .and_then(|()| accessor.get())
            .map_err(|err| variable_error(&entry.name, err))?;

        self.emit(&format!("{} = {}", entry.name, value), Severity::Info);
        Ok(Outcome::VariableSet {
            name: entry.name,
            value,
        })
    }

    fn dispatch(&mut self, line: &str) -> Result<Outcome, ConsoleError> {
        let tokens = tokenize(line);
        let Some((first, args)) = tokens.split_first() else {
            return Ok(Outcome::Nothing);
        };

        if args.is_empty() {
            if let Some(var) = self.variable_info(first) {
                let value = var
                    .accessor()
                    .get()
                    .map_err(|err| variable_error(&var.name, err))?;
                self.emit(&format!("{} = {}", var.name, value), Severity::Info);
                return Ok(Outcome::VariableRead {
                    name: var.name,
                    value,
                });
            }
        }

        let entry = self
            .command_info(first)
            .ok_or_else(|| ConsoleError::UnknownCommand(first.to_lowercase()))?;
        let params = entry.params();
        if args.len() != params.len() {
            return Err(ConsoleError::ArityMismatch {
                command: entry.name.clone(),
                expected: params.len(),
                actual: args.len(),
            });
        }
        let values = args
            .iter()
            .zip(params)
            .map(|(raw, kind)| coerce(raw, *kind))
            .collect::<Result<Vec<_>, _>>()?;

        // `entry` is our own clone; no catalog lock is held from here on.
        let output = match entry.callable() {
            Callable::Builtin(builtin) => {
                self.run_builtin(*builtin);
                None
            }
            Callable::Bound(handler) => handler(&values).map_err(|err| invocation_error(&entry.name, err))?,
        };

        if let Some(text) = &output {
            self.emit(text, Severity::Info);
        }
        for sink in &mut self.sinks {
            sink.command_executed(line, SUCCESS_SUMMARY);
        }
        Ok(Outcome::CommandRan {
            command: entry.name,
            output,
        })
    }

    fn run_builtin(&mut self, builtin: Builtin) {
        let lines = match builtin {
            Builtin::Help => help_lines(&self.catalog()),
            Builtin::History => history_lines(&self.history),
            Builtin::Clear => {
                self.emit(CLEAR_SENTINEL, Severity::Info);
                return;
            }
            Builtin::Quit => {
                self.emit("Quitting application...", Severity::Info);
                self.should_exit = true;
                return;
            }
        };
        for line in lines {
            self.emit(&line, Severity::Info);
        }
    }

    fn emit(&mut self, text: &str, severity: Severity) {
        for sink in &mut self.sinks {
            sink.log_message(text, severity);
        }
    }

    fn ensure_active(&self) -> Result<(), ConsoleError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ConsoleError::SessionEnded)
        }
    }

    fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn catalog_mut(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn invocation_error(command: &str, err: anyhow::Error) -> ConsoleError {
    match err.downcast_ref::<CoercionError>() {
        Some(coercion) => ConsoleError::Coercion(coercion.clone()),
        None => ConsoleError::Invocation {
            command: command.to_string(),
            message: format!("{:#}", err),
        },
    }
}

fn variable_error(name: &str, err: anyhow::Error) -> ConsoleError {
    match err.downcast_ref::<CoercionError>() {
        Some(coercion) => ConsoleError::Coercion(coercion.clone()),
        None => ConsoleError::VariableAccess {
            name: name.to_string(),
            message: format!("{:#}", err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{CommandAttr, StaticModule, TypeDescriptor, VariableAttr};
    use crate::sink::{MemorySink, Transcript};
    use crate::value::Vec3;
    use crate::variable::Accessor;
    use anyhow::anyhow;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Mutex;

    fn console() -> (Console, Rc<RefCell<Transcript>>) {
        let (sink, handle) = MemorySink::with_handle();
        let console = Console::with_sinks(ConsoleConfig::default(), vec![Box::new(sink)]);
        (console, handle)
    }

    /// Registers `spawnEnemy <string> <float> <float> <float>` recording every call.
    fn spawn_recorder(console: &Console) -> Arc<Mutex<Vec<(String, Vec3)>>> {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        console
            .register_command(
                CommandEntry::function("spawnEnemy", move |kind: String, x: f32, y: f32, z: f32| {
                    sink.lock().unwrap().push((kind, Vec3::new(x, y, z)));
                })
                .with_category("Debug"),
            )
            .unwrap();
        calls
    }

    #[test]
    fn test_session_start() {
        let (console, handle) = console();
        assert_eq!(handle.borrow().texts(), vec![INIT_MESSAGE]);
        assert_eq!(console.matching_commands(""), vec!["clear", "help", "history", "quit"]);
        assert!(console.is_active());
    }

    #[test]
    fn test_blank_input_is_a_no_op() {
        let (mut console, handle) = console();
        assert_eq!(console.execute(""), Outcome::Nothing);
        assert_eq!(console.execute("   "), Outcome::Nothing);
        assert!(console.history().is_empty());
        assert_eq!(handle.borrow().messages.len(), 1);
        assert!(handle.borrow().executed.is_empty());
    }

    #[test]
    fn test_invokes_once_with_coerced_arguments() {
        let (mut console, handle) = console();
        let calls = spawn_recorder(&console);

        let outcome = console.execute("spawnEnemy \"Big Orc\" 1 2.5 -3");
        assert_eq!(
            outcome,
            Outcome::CommandRan {
                command: "spawnEnemy".to_string(),
                output: None
            }
        );
        assert_eq!(
            *calls.lock().unwrap(),
            vec![("Big Orc".to_string(), Vec3::new(1.0, 2.5, -3.0))]
        );
        assert_eq!(
            handle.borrow().executed,
            vec![(
                "spawnEnemy \"Big Orc\" 1 2.5 -3".to_string(),
                SUCCESS_SUMMARY.to_string()
            )]
        );
    }

    #[test]
    fn test_command_names_are_case_insensitive() {
        let (mut console, _) = console();
        let calls = spawn_recorder(&console);
        assert!(!console.execute("SPAWNENEMY orc 0 0 0").is_failure());
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_arity_mismatch_does_not_invoke() {
        let (mut console, handle) = console();
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        console
            .register_command(CommandEntry::function("giveItem", move |_: String, _: i32| {
                *counter.lock().unwrap() += 1;
            }))
            .unwrap();

        for (line, actual) in [("giveItem sword", 1), ("giveItem sword 2 3", 3)] {
            assert_eq!(
                console.execute(line),
                Outcome::Failed(ConsoleError::ArityMismatch {
                    command: "giveItem".to_string(),
                    expected: 2,
                    actual,
                })
            );
        }
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(
            handle.borrow().errors(),
            vec![
                "Command 'giveItem' expects 2 parameters, got 1",
                "Command 'giveItem' expects 2 parameters, got 3"
            ]
        );
        assert!(handle.borrow().executed.is_empty());
    }

    #[test]
    fn test_coercion_failure_aborts_before_invoking() {
        let (mut console, handle) = console();
        let calls = spawn_recorder(&console);
        assert_eq!(
            console.execute("spawnEnemy orc 1 abc 3"),
            Outcome::Failed(CoercionError::new("float", "abc").into())
        );
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(handle.borrow().errors(), vec!["cannot convert 'abc' to float"]);
    }

    #[test]
    fn test_narrowing_failure_is_a_coercion_error() {
        let (mut console, _) = console();
        console
            .register_command(CommandEntry::function("setLevel", |_: i32| {}))
            .unwrap();
        let outcome = console.execute("setLevel 99999999999");
        assert!(matches!(outcome, Outcome::Failed(ConsoleError::Coercion(_))));
    }

    #[test]
    fn test_invocation_failure_is_reported() {
        let (mut console, handle) = console();
        console
            .register_command(CommandEntry::function("loadGame", |slot: String| -> anyhow::Result<()> {
                Err(anyhow!("Save file not found: {}", slot))
            }))
            .unwrap();

        assert_eq!(
            console.execute("loadGame slot1"),
            Outcome::Failed(ConsoleError::Invocation {
                command: "loadGame".to_string(),
                message: "Save file not found: slot1".to_string(),
            })
        );
        assert_eq!(
            handle.borrow().errors(),
            vec!["Error executing command 'loadGame': Save file not found: slot1"]
        );
    }

    #[test]
    fn test_dropped_target_fails_at_call_time() {
        struct Player {
            health: f32,
        }
        let (mut console, _) = console();
        let player = Arc::new(Mutex::new(Player { health: 50.0 }));
        console
            .register_command(CommandEntry::method("heal", &player, |p: &mut Player, amount: f32| {
                p.health += amount;
            }))
            .unwrap();

        assert!(!console.execute("heal 10").is_failure());
        assert_eq!(player.lock().unwrap().health, 60.0);

        drop(player);
        let Outcome::Failed(ConsoleError::Invocation { message, .. }) = console.execute("heal 10") else {
            panic!("expected an invocation error");
        };
        assert!(message.contains("no longer exists"));
    }

    #[test]
    fn test_command_output_is_logged() {
        let (mut console, handle) = console();
        console
            .register_command(CommandEntry::function("ping", || "pong".to_string()))
            .unwrap();
        console.execute("ping");
        assert_eq!(handle.borrow().texts().last(), Some(&"pong"));
    }

    #[test]
    fn test_unknown_command() {
        let (mut console, handle) = console();
        assert_eq!(
            console.execute("Fly high"),
            Outcome::Failed(ConsoleError::UnknownCommand("fly".to_string()))
        );
        assert_eq!(handle.borrow().errors(), vec!["Unknown command: fly"]);
        assert_eq!(console.history().len(), 1);
    }

    #[test]
    fn test_assignment_round_trip() {
        let (mut console, handle) = console();
        let scale = Arc::new(Mutex::new(1.0f32));
        console
            .register_variable(VariableEntry::new("timeScale", Accessor::field(&scale)))
            .unwrap();

        assert_eq!(
            console.execute("timescale = 0.5"),
            Outcome::VariableSet {
                name: "timeScale".to_string(),
                value: Value::Float(0.5)
            }
        );
        assert_eq!(*scale.lock().unwrap(), 0.5);
        assert_eq!(
            console.execute("timeScale"),
            Outcome::VariableRead {
                name: "timeScale".to_string(),
                value: Value::Float(0.5)
            }
        );
        assert_eq!(handle.borrow().texts()[1..], ["timeScale = 0.5", "timeScale = 0.5"]);
        assert!(handle.borrow().executed.is_empty());
    }

    #[test]
    fn test_f32_assignment_echoes_stored_value() {
        let (mut console, handle) = console();
        let scale = Arc::new(Mutex::new(1.0f32));
        console
            .register_variable(VariableEntry::new("timeScale", Accessor::field(&scale)))
            .unwrap();

        assert_eq!(
            console.execute("timeScale = 0.1"),
            Outcome::VariableSet {
                name: "timeScale".to_string(),
                value: Value::Float(0.1)
            }
        );
        assert_eq!(*scale.lock().unwrap(), 0.1f32);
        assert_eq!(
            console.execute("timeScale"),
            Outcome::VariableRead {
                name: "timeScale".to_string(),
                value: Value::Float(0.1)
            }
        );
        assert_eq!(handle.borrow().texts()[1..], ["timeScale = 0.1", "timeScale = 0.1"]);
    }

    #[test]
    fn test_assignment_echoes_what_the_setter_kept() {
        let (mut console, handle) = console();
        let volume = Arc::new(Mutex::new(0i64));
        let (read, write) = (volume.clone(), volume.clone());
        console
            .register_variable(VariableEntry::new(
                "volume",
                Accessor::property_with_setter(
                    move || *read.lock().unwrap(),
                    move |v: i64| *write.lock().unwrap() = v.clamp(0, 10),
                ),
            ))
            .unwrap();

        assert_eq!(
            console.execute("volume = 42"),
            Outcome::VariableSet {
                name: "volume".to_string(),
                value: Value::Int(10)
            }
        );
        assert_eq!(handle.borrow().texts().last(), Some(&"volume = 10"));
    }

    #[test]
    fn test_assignment_unquotes_and_keeps_spaces() {
        let (mut console, _) = console();
        let name = Arc::new(Mutex::new(String::new()));
        console
            .register_variable(VariableEntry::new("playerName", Accessor::field(&name)))
            .unwrap();
        console.execute("playerName = \"Sir Lancelot\"");
        assert_eq!(*name.lock().unwrap(), "Sir Lancelot");
        console.execute("playerName=a=b");
        assert_eq!(*name.lock().unwrap(), "a=b");
    }

    #[test]
    fn test_escaped_quote_keeps_equals_inside_argument() {
        let (mut console, _) = console();
        console
            .register_command(CommandEntry::function("say", |text: String| text))
            .unwrap();
        assert_eq!(
            console.execute(r#"say "x\\"=y""#),
            Outcome::CommandRan {
                command: "say".to_string(),
                output: Some(r#"x\"=y"#.to_string())
            }
        );
    }

    #[test]
    fn test_assignment_failures_leave_value_unchanged() {
        let (mut console, _) = console();
        let fps = Arc::new(Mutex::new(60i32));
        let ping = Arc::new(Mutex::new(0i32));
        console
            .register_variable(VariableEntry::new("currentFPS", Accessor::field(&fps)).read_only(true))
            .unwrap();
        console
            .register_variable(VariableEntry::new("simNetPing", Accessor::field(&ping)))
            .unwrap();

        assert_eq!(
            console.execute("currentFPS = 144"),
            Outcome::Failed(ConsoleError::ReadOnlyVariable("currentFPS".to_string()))
        );
        assert_eq!(*fps.lock().unwrap(), 60);

        assert_eq!(
            console.execute("simNetPing = fast"),
            Outcome::Failed(CoercionError::new("integer", "fast").into())
        );
        assert_eq!(*ping.lock().unwrap(), 0);

        assert_eq!(
            console.execute("a=1"),
            Outcome::Failed(ConsoleError::UnknownVariable("a".to_string()))
        );
    }

    #[test]
    fn test_variable_with_dead_target() {
        struct Settings {
            volume: f32,
        }
        let (mut console, _) = console();
        let settings = Arc::new(Mutex::new(Settings { volume: 1.0 }));
        console
            .register_variable(VariableEntry::new(
                "volume",
                Accessor::instance_field(&settings, |s| s.volume, |s, v| s.volume = v),
            ))
            .unwrap();
        drop(settings);
        assert!(matches!(
            console.execute("volume"),
            Outcome::Failed(ConsoleError::VariableAccess { .. })
        ));
    }

    #[test]
    fn test_history_records_every_non_blank_line() {
        let (mut console, _) = console();
        console.execute("bogus");
        console.execute("bogus");
        console.execute("help");
        assert_eq!(console.history().len(), 2);

        assert_eq!(console.previous_history(), "help");
        assert_eq!(console.previous_history(), "bogus");
        assert_eq!(console.previous_history(), "bogus");
        assert_eq!(console.next_history(), "help");
        assert_eq!(console.next_history(), "help");
    }

    #[test]
    fn test_history_capacity_from_config() {
        let config = ConsoleConfig {
            history_capacity: 2,
            ..ConsoleConfig::default()
        };
        let mut console = Console::new(config);
        for line in ["one", "two", "three"] {
            console.execute(line);
        }
        assert_eq!(console.history().entries().collect::<Vec<_>>(), vec!["two", "three"]);
    }

    #[test]
    fn test_builtin_help_and_history() {
        let (mut console, handle) = console();
        console.execute("help");
        assert!(handle.borrow().texts().contains(&"  quit - Quit application"));

        console.execute("history");
        let transcript = handle.borrow();
        let texts = transcript.texts();
        assert_eq!(texts[texts.len() - 3..], ["Command History:", "  1: help", "  2: history"]);
        assert_eq!(transcript.executed.len(), 2);
    }

    #[test]
    fn test_builtin_clear_and_quit() {
        let (mut console, handle) = console();
        console.execute("help");
        console.execute("clear");
        assert!(handle.borrow().messages.is_empty());
        assert_eq!(handle.borrow().clears, 1);

        assert!(!console.should_exit());
        console.execute("quit");
        assert!(console.should_exit());
        assert_eq!(handle.borrow().texts(), vec!["Quitting application..."]);
    }

    #[test]
    fn test_registration_overrides_builtin() {
        let (mut console, _) = console();
        console
            .register_command(CommandEntry::function("help", || "custom help".to_string()))
            .unwrap();
        assert_eq!(
            console.execute("help"),
            Outcome::CommandRan {
                command: "help".to_string(),
                output: Some("custom help".to_string())
            }
        );
        assert_eq!(console.command_info("help").unwrap().category, BUILTIN_CATEGORY);
    }

    #[test]
    fn test_suggestions_split_limit_between_kinds() {
        let (console, _) = console();
        let scale = Arc::new(Mutex::new(1.0f32));
        console
            .register_command(CommandEntry::function("teleport", |_: f32, _: f32, _: f32| {}).with_description("Teleport"))
            .unwrap();
        console
            .register_command(CommandEntry::function("timestamp", || {}))
            .unwrap();
        console
            .register_variable(VariableEntry::new("timeScale", Accessor::field(&scale)))
            .unwrap();

        let all = console.suggestions("t", 10);
        assert_eq!(
            all.iter().map(|s| s.usage.as_str()).collect::<Vec<_>>(),
            vec!["teleport <float> <float> <float>", "timestamp", "timeScale = <float>"]
        );
        assert_eq!(all[0].description, "Teleport");
        assert_eq!(all[2].kind, SuggestionKind::Variable);

        let few = console.suggestions("t", 2);
        assert_eq!(few.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["teleport", "timeScale"]);
    }

    #[test]
    fn test_query_surface() {
        let (console, _) = console();
        spawn_recorder(&console);
        assert_eq!(console.command_info("SpawnEnemy").unwrap().params().len(), 4);
        assert!(console.variable_info("spawnEnemy").is_none());
        assert_eq!(console.matching_commands("h"), vec!["help", "history"]);
        assert!(console.matching_variables("").is_empty());
    }

    #[test]
    fn test_discovery_is_polled_and_reported() {
        let (mut console, handle) = console();
        let scale = Arc::new(Mutex::new(1.0f32));
        let module = StaticModule::new("game::world").with_type(
            TypeDescriptor::new("World")
                .command(CommandAttr::new("spawnBoss", "Spawn the boss").category("Debug"), CommandEntry::function("spawnBoss", || {}))
                .variable(VariableAttr::new("timeScale", "Game speed"), Accessor::field(&scale)),
        );
        console.start_discovery(vec![Box::new(module)]).unwrap();

        // Nothing is visible before the task has run.
        assert!(console.execute("spawnBoss").is_failure());

        let mut steps = 0;
        while let Some(step) = console.poll_discovery() {
            steps += 1;
            if step != Step::Yielded {
                break;
            }
        }
        assert!(steps >= 2);
        assert!(console.poll_discovery().is_none());
        assert!(!console.execute("spawnBoss").is_failure());
        assert_eq!(console.command_info("spawnBoss").unwrap().category, "Debug");

        let transcript = handle.borrow();
        let texts = transcript.texts();
        assert!(texts.contains(&"Scanning 1 modules for console commands..."));
        assert!(texts.iter().any(|t| t.starts_with("Console scan complete! Found 1 commands and 1 variables")));
    }

    #[test]
    fn test_teardown_abandons_discovery_and_refuses_registration() {
        let (mut console, _) = console();
        let module = StaticModule::new("game::world").with_type(
            TypeDescriptor::new("World").command(CommandAttr::new("spawnBoss", ""), CommandEntry::function("spawnBoss", || {})),
        );
        let mut task = console.discovery_task(vec![Box::new(module)]).unwrap();

        console.teardown();
        assert!(!console.is_active());
        assert_eq!(task.run(), Step::Abandoned);
        assert_eq!(
            console.register_command(CommandEntry::function("late", || {})).unwrap_err(),
            ConsoleError::SessionEnded
        );
        assert!(console.discovery_task(Vec::new()).is_err());

        console.begin_session();
        assert!(console.command_info("spawnBoss").is_none());
        assert!(console.command_info("help").is_some());
        assert!(console.register_command(CommandEntry::function("late", || {})).is_ok());
    }

    #[test]
    fn test_discovery_from_another_thread() {
        let (console, _) = console();
        let module = StaticModule::new("game::world").with_type(
            TypeDescriptor::new("World").command(CommandAttr::new("spawnBoss", ""), CommandEntry::function("spawnBoss", || {})),
        );
        let mut task = console.discovery_task(vec![Box::new(module)]).unwrap();
        let step = std::thread::spawn(move || task.run()).join().unwrap();

        assert!(matches!(step, Step::Finished(_)));
        assert!(console.command_info("spawnBoss").is_some());
    }
}
