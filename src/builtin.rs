use crate::command::{CancelToken, CommandResult, Handler};
use crate::error::RuntimeError;
use argh::{EarlyExit, FromArgs};
use std::io::Write;
use std::marker::PhantomData;
use std::thread;
use std::time::{Duration, Instant};

const WAIT_SLICE: Duration = Duration::from_millis(10);

/// Commands shipped with the crate.
///
/// Builtins are parsed from the statement arguments with the [`argh`] crate
/// (`FromArgs`), so `+wait 250` and `+echo -n hi` behave like small command
/// lines. Dialogue goes through [`Say`] instead, which never parses flags.
pub trait BuiltinCommand: Sized + FromArgs {
    /// Command name the builtin is registered under, e.g. "echo".
    fn name() -> &'static str;

    /// Executes the command for one statement.
    fn execute(self, sprite_tag: &str, out: &mut dyn Write, cancel: &CancelToken) -> CommandResult;
}

/// Handler that parses the arguments into `T` and runs it.
pub(crate) struct Builtin<T> {
    out: Box<dyn Write>,
    cancel: CancelToken,
    _phantom: PhantomData<T>,
}

impl<T> Builtin<T> {
    pub(crate) fn new(out: Box<dyn Write>, cancel: CancelToken) -> Self {
        Self {
            out,
            cancel,
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand> Handler for Builtin<T> {
    fn invoke(&mut self, sprite_tag: &str, args: &[String]) -> CommandResult {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match T::from_args(&[T::name()], &args) {
            Ok(cmd) => cmd.execute(sprite_tag, &mut self.out, &self.cancel),
            Err(EarlyExit { output, status }) => match status {
                Ok(()) => {
                    self.out.write_all(output.as_bytes())?;
                    Ok(None)
                }
                Err(()) => Err(RuntimeError::new(output.trim_end()).into()),
            },
        }
    }
}

/// Dialogue printer behind `:` message lines.
///
/// Message text is free-form, so unlike the argh-parsed builtins the
/// arguments are taken verbatim: `alice:--help` says "--help".
pub struct Say {
    out: Box<dyn Write>,
}

impl Say {
    pub const NAME: &'static str = "say";

    pub fn new(out: impl Write + 'static) -> Self {
        Self { out: Box::new(out) }
    }
}

impl Handler for Say {
    fn invoke(&mut self, sprite_tag: &str, args: &[String]) -> CommandResult {
        let line = args.join(" ");
        if sprite_tag.is_empty() {
            writeln!(self.out, "{}", line)?;
        } else {
            writeln!(self.out, "{}: {}", sprite_tag, line)?;
        }
        Ok(Some(line))
    }
}

#[derive(FromArgs)]
/// write the arguments to the output, separated by spaces.
/// by default, a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, _sprite_tag: &str, out: &mut dyn Write, _cancel: &CancelToken) -> CommandResult {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(out, "{}", s)?;
        } else {
            writeln!(out, "{}", s)?;
        }
        out.flush()?;
        Ok(None)
    }
}

#[derive(FromArgs)]
/// Pause the script.
pub struct Wait {
    #[argh(positional)]
    /// how long to pause, in milliseconds.
    pub millis: u64,
}

impl BuiltinCommand for Wait {
    fn name() -> &'static str {
        "wait"
    }

    fn execute(self, _sprite_tag: &str, out: &mut dyn Write, cancel: &CancelToken) -> CommandResult {
        out.flush()?;
        let deadline = Instant::now() + Duration::from_millis(self.millis);
        // sleep in slices so a cancel from another thread cuts the pause short
        while !cancel.is_cancelled() {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            thread::sleep(left.min(WAIT_SLICE));
        }
        Ok(None)
    }
}

#[derive(FromArgs)]
/// Stop the running script after this statement.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _sprite_tag: &str, _out: &mut dyn Write, cancel: &CancelToken) -> CommandResult {
        cancel.cancel();
        Ok(None)
    }
}
