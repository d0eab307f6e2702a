use crate::builtin::{Builtin, BuiltinCommand, Echo, Exit, Say, Wait};
use crate::command::{Action, CancelToken, CommandResult, Handler};
use crate::config::Config;
use crate::error::{ArgumentError, Failure, RuntimeError, ScriptError};
use crate::lexer;
use crate::program::Program;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

/// What happened during one pass over a program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Index the pass started at.
    pub start: usize,
    /// Statements dispatched, failed ones included.
    pub executed: usize,
    /// Values returned by handlers, with the index of their statement.
    pub results: Vec<(usize, String)>,
    /// Statements that failed. Each one was reported and skipped.
    pub failures: Vec<Failure>,
    /// Set when the pass stopped early on a [`CancelToken`].
    pub cancelled: bool,
}

impl RunReport {
    /// True when every dispatched statement succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Sequential interpreter for parsed scripts.
///
/// The interpreter owns a [`Program`] and a registry mapping command names to
/// [`Handler`]s. Every run is a single forward pass from a start index to the
/// end of the statements; a failing statement is reported to the output sink
/// and the pass moves on.
///
/// A handler panic is reported like any other internal error. While a
/// handler runs, the process panic hook stays quiet for that thread, so the
/// panic shows up once, in the report sink.
///
/// Example
/// ```
/// use novel_script::{Interpreter, parse};
/// let program = parse("#start\nalice:hello\n+shake 3").unwrap();
/// let mut novel = Interpreter::new(program).with_output(std::io::sink());
/// novel.register_command("say", |sprite, args| Ok(Some(format!("{sprite}: {}", args.join(" ")))));
/// let report = novel.call("start");
/// assert_eq!(report.results, vec![(0, "alice: hello".to_string())]);
/// assert_eq!(report.failures.len(), 1); // no handler for "shake"
/// ```
pub struct Interpreter {
    program: Program,
    commands: HashMap<String, Box<dyn Handler>>,
    output: Box<dyn Write>,
    config: Config,
    cancel: CancelToken,
}

impl Interpreter {
    /// Create an interpreter for `program` with an empty registry, default
    /// configuration and reports going to standard error.
    pub fn new(program: Program) -> Self {
        Self {
            program,
            commands: HashMap::new(),
            output: Box::new(std::io::stderr()),
            config: Config::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Replace the configuration used by later runs.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Send failure reports to `output` instead of standard error.
    pub fn with_output(mut self, output: impl Write + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The program [`Interpreter::call`] runs.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Replace the owned program, keeping the registry.
    pub fn load(&mut self, program: Program) {
        self.program = program;
    }

    /// Token handlers can use to stop the current run.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Register a command that may return a value. Replaces any handler
    /// already registered under `name`.
    pub fn register_command<F>(&mut self, name: impl Into<String>, command: F)
    where
        F: FnMut(&str, &[String]) -> CommandResult + 'static,
    {
        self.register_handler(name, command);
    }

    /// Register a command that returns nothing.
    pub fn register_action<F>(&mut self, name: impl Into<String>, action: F)
    where
        F: FnMut(&str, &[String]) -> anyhow::Result<()> + 'static,
    {
        self.register_handler(name, Action(action));
    }

    /// Register any [`Handler`] implementation.
    pub fn register_handler(&mut self, name: impl Into<String>, handler: impl Handler + 'static) {
        self.commands.insert(name.into(), Box::new(handler));
    }

    /// Register the builtin `T` under its own name, writing to `out`.
    pub fn register_builtin<T>(&mut self, out: impl Write + 'static)
    where
        T: BuiltinCommand + 'static,
    {
        let builtin = Builtin::<T>::new(Box::new(out), self.cancel.clone());
        self.register_handler(T::name(), builtin);
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Run the owned program from `label`.
    ///
    /// An unknown label is not an error: the whole program runs from the
    /// first statement.
    pub fn call(&mut self, label: &str) -> RunReport {
        let start = self.program.label(label).unwrap_or(0);
        let Interpreter {
            program,
            commands,
            output,
            config,
            cancel,
        } = self;
        execute(program, start, commands, &mut **output, cancel, config.show_trace)
    }

    /// Parse `code` and run it from the first statement.
    ///
    /// The parsed program is run with this interpreter's registry; it does not
    /// replace the owned program.
    pub fn run(&mut self, code: &str) -> Result<RunReport, ScriptError> {
        let program = lexer::parse_with_echo(code, &self.config.echo_command)?;
        Ok(self.execute(&program, 0))
    }

    /// Parse `code` and run it from `label`, failing before any statement
    /// executes if the label is not declared.
    pub fn run_from(&mut self, code: &str, label: &str) -> Result<RunReport, ScriptError> {
        let program = lexer::parse_with_echo(code, &self.config.echo_command)?;
        let start = program
            .label(label)
            .ok_or_else(|| ArgumentError::UnknownLabel(label.to_string()))?;
        Ok(self.execute(&program, start))
    }

    fn execute(&mut self, program: &Program, start: usize) -> RunReport {
        execute(
            program,
            start,
            &mut self.commands,
            &mut *self.output,
            &self.cancel,
            self.config.show_trace,
        )
    }
}

impl Default for Interpreter {
    /// An interpreter with an empty program and the stock builtins
    /// `say`, `echo`, `wait` and `exit` writing to standard output.
    fn default() -> Self {
        let mut interpreter = Self::new(Program::default());
        interpreter.register_handler(Say::NAME, Say::new(std::io::stdout()));
        interpreter.register_builtin::<Echo>(std::io::stdout());
        interpreter.register_builtin::<Wait>(std::io::stdout());
        interpreter.register_builtin::<Exit>(std::io::stdout());
        interpreter
    }
}

/// The execution loop shared by every entry point.
fn execute(
    program: &Program,
    start: usize,
    commands: &mut HashMap<String, Box<dyn Handler>>,
    output: &mut dyn Write,
    cancel: &CancelToken,
    show_trace: bool,
) -> RunReport {
    let mut report = RunReport {
        start,
        ..RunReport::default()
    };
    cancel.reset();

    for (index, statement) in program.statements().iter().enumerate().skip(start) {
        if cancel.is_cancelled() {
            // reporting must never abort a run
            let _ = writeln!(output, "cancelled at statement {}", index);
            report.cancelled = true;
            break;
        }
        report.executed += 1;

        let name = statement.command_name();
        let Some(handler) = commands.get_mut(name) else {
            fail(
                output,
                &mut report,
                Failure::CommandNotFound {
                    index,
                    name: name.to_string(),
                },
            );
            continue;
        };

        let outcome = dispatch(|| handler.invoke(statement.sprite_tag(), statement.arguments()));

        let failure = match outcome {
            Ok(Ok(Some(value))) => {
                report.results.push((index, value));
                continue;
            }
            Ok(Ok(None)) => continue,
            Ok(Err(err)) => match err.downcast_ref::<RuntimeError>() {
                Some(_) => Failure::Handler {
                    index,
                    name: name.to_string(),
                    message: format!("{:#}", err),
                },
                None => Failure::Internal {
                    index,
                    name: name.to_string(),
                    detail: if show_trace {
                        format!("{:?}", err)
                    } else {
                        format!("{:#}", err)
                    },
                },
            },
            Err(payload) => {
                let mut detail = format!("panicked: {}", panic_message(payload.as_ref()));
                let site = PANIC_SITE.with(RefCell::take);
                if show_trace && let Some(site) = site {
                    detail.push('\n');
                    detail.push_str(&site);
                }
                Failure::Internal {
                    index,
                    name: name.to_string(),
                    detail,
                }
            }
        };
        fail(output, &mut report, failure);
    }

    let _ = output.flush();
    report
}

thread_local! {
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
    static PANIC_SITE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HANDLER_PANIC_HOOK: Once = Once::new();

/// Wraps the process panic hook once. Panics raised on a thread that is
/// inside [`dispatch`] only record where they happened; every other panic
/// goes to the previous hook.
fn install_panic_hook() {
    HANDLER_PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if DISPATCHING.with(Cell::get) {
                let location = info
                    .location()
                    .map(|l| format!("at {}:{}:{}", l.file(), l.line(), l.column()))
                    .unwrap_or_else(|| "at unknown location".to_string());
                let site = format!("{}\n{}", location, Backtrace::force_capture());
                PANIC_SITE.with(|s| *s.borrow_mut() = Some(site));
            } else {
                previous(info);
            }
        }));
    });
}

/// Runs one handler call, turning a panic into `Err(payload)`.
fn dispatch<F>(call: F) -> std::thread::Result<CommandResult>
where
    F: FnOnce() -> CommandResult,
{
    install_panic_hook();
    PANIC_SITE.with(|s| s.borrow_mut().take());
    let outer = DISPATCHING.with(|d| d.replace(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(call));
    DISPATCHING.with(|d| d.set(outer));
    outcome
}

fn fail(output: &mut dyn Write, report: &mut RunReport, failure: Failure) {
    let _ = writeln!(output, "{}", failure);
    report.failures.push(failure);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
