//! An interpreter for line-oriented visual-novel scripts.
//!
//! A script is a list of lines, each one a command (`alice+show smile`), a
//! message (`alice:Hello, there`), a label (`#chapter1`), a `//` comment or
//! nothing at all. [`parse`] turns the text into a [`Program`]; an
//! [`Interpreter`] walks the program once from a start position, calling the
//! [`Handler`] registered for each command name and reporting failing
//! statements without stopping.
//!
//! The public modules [`builtin`], [`command`] and [`config`] expose the traits
//! and types for implementing your own commands and configuring a run.

pub mod builtin;
pub mod command;
pub mod config;
mod error;
mod interpreter;
pub mod io_adapters;
mod lexer;
mod program;
pub mod repl;

pub use command::{CancelToken, CommandResult, Handler};
pub use config::Config;
pub use error::{ArgumentError, Failure, RuntimeError, ScriptError, SyntaxError, SyntaxErrorKind};
/// The interpreter and the summary of one run.
///
/// See [`Interpreter`] for the high-level API and an example.
pub use interpreter::{Interpreter, RunReport};
pub use lexer::{DEFAULT_ECHO_COMMAND, parse, parse_with_echo};
pub use program::{Program, Statement};
