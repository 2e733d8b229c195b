//! An embeddable developer console.
//!
//! Hosts register named commands and variables, either one at a time or by
//! handing feature modules to a cooperative discovery pass, and then feed raw
//! input lines to [`Console::execute`]. The console parses each line, coerces
//! the arguments to the declared parameter kinds and calls the bound closure,
//! or reads and writes a variable. Results and errors go out through
//! [`ConsoleSink`]s; nothing is ever thrown back at the host.
//!
//! The public modules [`value`], [`parser`], [`discovery`] and [`config`]
//! expose the pieces for hosts that want to build their own front end.

mod builtin;
mod catalog;
mod command;
pub mod config;
mod console;
pub mod discovery;
mod error;
mod history;
pub mod parser;
mod sink;
pub mod value;
mod variable;

pub use builtin::Builtin;
pub use catalog::{Catalog, Group};
pub use command::{BUILTIN_CATEGORY, Callable, CommandEntry, DEFAULT_CATEGORY, Handler, IntoHandler, IntoMethod, IntoOutput};
pub use config::{ConsoleConfig, DiscoveryConfig};

/// The console itself and what it reports back.
///
/// See [`Console`] for the high-level API and an example.
pub use console::{Console, Outcome, SUCCESS_SUMMARY, Suggestion, SuggestionKind};
pub use error::{CoercionError, ConsoleError};
pub use history::{DEFAULT_HISTORY_CAPACITY, HistoryBuffer};
pub use sink::{CLEAR_SENTINEL, ConsoleSink, LogSink, MemorySink, Severity, Transcript};
pub use value::{ParamKind, Value, Vec3};
pub use variable::{Accessor, DEFAULT_VARIABLE_CATEGORY, StorageKind, VariableEntry};
