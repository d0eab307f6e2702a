//! Line-buffering console around an [`Interpreter`].
//!
//! Input lines are collected until `.eof`, then the whole buffer runs as one
//! script.

use crate::interpreter::Interpreter;
use crate::lexer;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;

const BANNER: &str = concat!("Novel Script REPL ", env!("CARGO_PKG_VERSION"));
const HELP: &str = ".quit: Terminate this REPL.\n\
.eof: Finish writing and run soon.\n\
.undo: Undo previous line of the buffer.\n\
.dump: Show the buffer as parsed statements.";

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Quit,
    Eof,
    Undo,
    Dump,
    /// Script text to buffer.
    Line(String),
}

impl ConsoleCommand {
    /// Console commands are case-insensitive; anything else is script text.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            ".quit" => ConsoleCommand::Quit,
            ".eof" => ConsoleCommand::Eof,
            ".undo" => ConsoleCommand::Undo,
            ".dump" => ConsoleCommand::Dump,
            _ => ConsoleCommand::Line(input.to_string()),
        }
    }
}

/// Script lines typed so far.
#[derive(Debug, Default)]
pub struct LineBuffer {
    lines: Vec<String>,
}

impl LineBuffer {
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Drops the most recent line.
    pub fn undo(&mut self) -> Option<String> {
        self.lines.pop()
    }

    /// Buffered text joined with newlines, without clearing.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Buffered text, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        let text = self.text();
        self.lines.clear();
        text
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Whether the console keeps reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive front-end: buffers lines and runs them on `.eof`.
pub struct Console {
    interpreter: Interpreter,
    buffer: LineBuffer,
}

impl Console {
    pub fn new(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            buffer: LineBuffer::default(),
        }
    }

    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    /// Applies one line of input, writing console messages to `out`.
    pub fn handle(&mut self, input: &str, out: &mut dyn Write) -> anyhow::Result<Flow> {
        match ConsoleCommand::parse(input) {
            ConsoleCommand::Quit => {
                writeln!(out, "see you.")?;
                return Ok(Flow::Quit);
            }
            ConsoleCommand::Undo => {
                if self.buffer.undo().is_none() {
                    writeln!(out, "no text in buffer.")?;
                }
            }
            ConsoleCommand::Eof => {
                let script = self.buffer.take();
                match self.interpreter.run(&script) {
                    Ok(report) if !report.failures.is_empty() => {
                        writeln!(
                            out,
                            "{} of {} statements failed.",
                            report.failures.len(),
                            report.executed
                        )?;
                    }
                    Ok(_) => {}
                    Err(e) => writeln!(out, "{}", e)?,
                }
            }
            ConsoleCommand::Dump => {
                let echo = &self.interpreter.config().echo_command;
                match lexer::parse_with_echo(&self.buffer.text(), echo) {
                    Ok(program) => write!(out, "{}", program)?,
                    Err(e) => writeln!(out, "{}", e)?,
                }
            }
            ConsoleCommand::Line(line) => self.buffer.push(line),
        }
        Ok(Flow::Continue)
    }

    /// Reads lines from the terminal until `.quit`, Ctrl-C or Ctrl-D.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new()?;
        let mut stdout = std::io::stdout();

        writeln!(stdout, "{}\n------------", BANNER)?;
        writeln!(stdout, "{}", HELP)?;

        loop {
            let prompt = self.interpreter.config().prompt.clone();
            match rl.readline(&prompt) {
                Ok(line) => {
                    rl.add_history_entry(line.as_str())?;
                    if self.handle(&line, &mut stdout)? == Flow::Quit {
                        break;
                    }
                    stdout.flush()?;
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    writeln!(stdout, "see you.")?;
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::MemWriter;
    use crate::program::Program;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn console() -> (Console, Rc<RefCell<Vec<String>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let mut interpreter = Interpreter::new(Program::default()).with_output(MemWriter::new());
        interpreter.register_action("say", move |sprite, args| {
            log.borrow_mut().push(format!("{}:{}", sprite, args.join(",")));
            Ok(())
        });
        (Console::new(interpreter), seen)
    }

    fn feed(console: &mut Console, lines: &[&str]) -> (String, Flow) {
        let mut out = Vec::new();
        let mut flow = Flow::Continue;
        for line in lines {
            flow = console.handle(line, &mut out).unwrap();
        }
        (String::from_utf8(out).unwrap(), flow)
    }

    #[test]
    fn test_console_command_parsing() {
        assert_eq!(ConsoleCommand::parse(".QUIT"), ConsoleCommand::Quit);
        assert_eq!(ConsoleCommand::parse(" .eof "), ConsoleCommand::Eof);
        assert_eq!(ConsoleCommand::parse(".Undo"), ConsoleCommand::Undo);
        assert_eq!(ConsoleCommand::parse(".dump"), ConsoleCommand::Dump);
        assert_eq!(
            ConsoleCommand::parse("alice:hi"),
            ConsoleCommand::Line("alice:hi".to_string())
        );
    }

    #[test]
    fn test_line_buffer() {
        let mut buffer = LineBuffer::default();
        buffer.push("+a");
        buffer.push("+b");
        assert_eq!(buffer.undo().as_deref(), Some("+b"));
        buffer.push("+c");
        assert_eq!(buffer.text(), "+a\n+c");
        assert_eq!(buffer.take(), "+a\n+c");
        assert!(buffer.is_empty());
        assert_eq!(buffer.undo(), None);
    }

    #[test]
    fn test_eof_runs_buffer_once() {
        let (mut console, seen) = console();
        let (out, flow) = feed(&mut console, &["alice:one", "bob:two", ".undo", ":three", ".eof"]);

        assert_eq!(flow, Flow::Continue);
        assert_eq!(out, "");
        assert_eq!(*seen.borrow(), vec!["alice:one", ":three"]);
        assert!(console.buffer().is_empty());
    }

    #[test]
    fn test_undo_on_empty_buffer() {
        let (mut console, _) = console();
        let (out, _) = feed(&mut console, &[".undo"]);
        assert_eq!(out, "no text in buffer.\n");
    }

    #[test]
    fn test_eof_reports_errors() {
        let (mut console, seen) = console();

        let (out, _) = feed(&mut console, &["+a \"open", ".eof"]);
        assert_eq!(out, "syntax error at 1:9: unterminated quoted argument\n");

        let (out, _) = feed(&mut console, &["+nope", ":ok", ".eof"]);
        assert_eq!(out, "1 of 2 statements failed.\n");
        assert_eq!(*seen.borrow(), vec![":ok"]);
    }

    #[test]
    fn test_dump_and_quit() {
        let (mut console, _) = console();
        let (out, flow) = feed(&mut console, &["#intro", "alice:hi", ".dump", ".quit"]);
        assert_eq!(out, "#intro\nalice+say \"hi\"\nsee you.\n");
        assert_eq!(flow, Flow::Quit);
        assert_eq!(console.buffer().len(), 2);
    }
}
