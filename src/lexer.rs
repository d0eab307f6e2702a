//! Line-oriented scanner that turns script text into a [`Program`].
//!
//! Every line is scanned on its own by a small finite state machine. The
//! state is reset at the start of each line, so a malformed line never leaks
//! into the next one.

use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::program::{Program, Statement};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Echo command used for `:` message lines unless configured otherwise.
pub const DEFAULT_ECHO_COMMAND: &str = "say";

const COMMAND_PREFIX: char = '+';
const MESSAGE_PREFIX: char = ':';
const LABEL_PREFIX: char = '#';
const COMMAND_SEPARATOR: char = ' ';
const ARGUMENT_SEPARATOR: char = ',';
const QUOTE: char = '"';
const ESCAPE: char = '\\';
const COMMENT: char = '/';

/// Where in a line the scanner currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanState {
    SpriteTag,
    Prefix,
    CommandName,
    Arguments,
    LabelName,
}

/// Side effect of consuming one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Ignore the character.
    Skip,
    /// Stop scanning the line (`//` comment).
    EndOfLine,
    /// Append the character to the buffer.
    Push(char),
    /// The buffer is the sprite tag. The character is scanned again as a prefix.
    CloseSpriteTag,
    BeginCommand,
    BeginMessage,
    BeginLabel,
    /// Append the character, close the buffer as the command name and consume
    /// the separator that follows.
    CloseCommandName(char),
    /// Append the decoded character and consume the escaped one.
    Escape(char),
    ToggleQuote,
    CloseArgument,
}

fn is_blank(ch: char) -> bool {
    ch.is_whitespace() || ch.is_control()
}

fn is_prefix(ch: char) -> bool {
    matches!(ch, COMMAND_PREFIX | MESSAGE_PREFIX | LABEL_PREFIX)
}

/// Pure transition function of the line scanner.
///
/// `quoted` tells whether the scanner is inside a quoted argument and `next`
/// is the character after `ch` on the same line, if any.
pub(crate) fn transition(
    state: ScanState,
    quoted: bool,
    ch: char,
    next: Option<char>,
) -> Result<(ScanState, Action), SyntaxErrorKind> {
    if !quoted && is_blank(ch) {
        return Ok((state, Action::Skip));
    }
    if !quoted && ch == COMMENT && next == Some(COMMENT) {
        return Ok((state, Action::EndOfLine));
    }

    let step = match state {
        ScanState::SpriteTag if is_prefix(ch) => (ScanState::Prefix, Action::CloseSpriteTag),
        ScanState::SpriteTag => (ScanState::SpriteTag, Action::Push(ch)),

        ScanState::Prefix => match ch {
            COMMAND_PREFIX => (ScanState::CommandName, Action::BeginCommand),
            MESSAGE_PREFIX => (ScanState::Arguments, Action::BeginMessage),
            LABEL_PREFIX => (ScanState::LabelName, Action::BeginLabel),
            other => return Err(SyntaxErrorKind::InvalidPrefix(other)),
        },

        ScanState::CommandName if next == Some(COMMAND_SEPARATOR) => {
            (ScanState::Arguments, Action::CloseCommandName(ch))
        }
        ScanState::CommandName => (ScanState::CommandName, Action::Push(ch)),

        ScanState::Arguments => match ch {
            ESCAPE => {
                let decoded = match next {
                    Some('n') => '\n',
                    Some(QUOTE) => QUOTE,
                    Some(ESCAPE) => ESCAPE,
                    other => return Err(SyntaxErrorKind::InvalidEscape(other)),
                };
                (ScanState::Arguments, Action::Escape(decoded))
            }
            QUOTE => (ScanState::Arguments, Action::ToggleQuote),
            ARGUMENT_SEPARATOR if !quoted => (ScanState::Arguments, Action::CloseArgument),
            c => (ScanState::Arguments, Action::Push(c)),
        },

        ScanState::LabelName => (ScanState::LabelName, Action::Push(ch)),
    };
    Ok(step)
}

/// Result of scanning a single line.
#[derive(Debug, PartialEq)]
enum Line {
    Statement(Statement),
    Label { name: String, column: usize },
    Empty,
}

/// Per-line scanning state.
struct LineScanner<'a> {
    echo_command: &'a str,
    line: usize,
    state: ScanState,
    quoted: bool,
    buffer: String,
    /// Set once the current argument has content, even if that content is an
    /// empty quoted string.
    arg_started: bool,
    /// Column of the first character buffered before any prefix.
    tag_column: Option<usize>,
    marker_column: usize,
    sprite_tag: String,
    command_name: String,
    arguments: Vec<String>,
}

impl<'a> LineScanner<'a> {
    fn new(echo_command: &'a str, line: usize) -> Self {
        LineScanner {
            echo_command,
            line,
            state: ScanState::SpriteTag,
            quoted: false,
            buffer: String::new(),
            arg_started: false,
            tag_column: None,
            marker_column: 0,
            sprite_tag: String::new(),
            command_name: String::new(),
            arguments: Vec::new(),
        }
    }

    fn error(&self, kind: SyntaxErrorKind, column: usize) -> SyntaxError {
        SyntaxError::new(kind, self.line, column)
    }

    /// Runs the state machine over `text` and flushes whatever is left.
    fn scan(mut self, text: &str) -> Result<Line, SyntaxError> {
        let chars: Vec<char> = text.chars().collect();
        let mut pos = 0;

        while let Some(&ch) = chars.get(pos) {
            let column = pos + 1;
            let next = chars.get(pos + 1).copied();
            let (state, action) = transition(self.state, self.quoted, ch, next)
                .map_err(|kind| self.error(kind, column))?;
            self.state = state;

            match action {
                Action::Skip => {}
                Action::EndOfLine => break,
                Action::Push(c) => {
                    match state {
                        ScanState::SpriteTag => {
                            self.tag_column.get_or_insert(column);
                        }
                        ScanState::Arguments => self.arg_started = true,
                        _ => {}
                    }
                    self.buffer.push(c);
                }
                Action::CloseSpriteTag => {
                    self.sprite_tag = std::mem::take(&mut self.buffer);
                    self.tag_column = None;
                    // the prefix itself is handled in the Prefix state
                    continue;
                }
                Action::BeginCommand | Action::BeginLabel => self.marker_column = column,
                Action::BeginMessage => {
                    self.marker_column = column;
                    self.command_name = self.echo_command.to_string();
                }
                Action::CloseCommandName(c) => {
                    self.buffer.push(c);
                    self.command_name = std::mem::take(&mut self.buffer);
                    pos += 1;
                }
                Action::Escape(c) => {
                    self.buffer.push(c);
                    self.arg_started = true;
                    pos += 1;
                }
                Action::ToggleQuote => {
                    self.quoted = !self.quoted;
                    self.arg_started = true;
                }
                Action::CloseArgument => {
                    self.arguments.push(std::mem::take(&mut self.buffer));
                    self.arg_started = false;
                }
            }
            pos += 1;
        }

        if self.quoted {
            return Err(self.error(SyntaxErrorKind::UnterminatedQuote, chars.len() + 1));
        }
        self.finish()
    }

    /// End-of-line flush of the buffer.
    fn finish(mut self) -> Result<Line, SyntaxError> {
        let buffer = std::mem::take(&mut self.buffer);
        match self.state {
            ScanState::LabelName if !buffer.is_empty() => {
                return Ok(Line::Label {
                    name: buffer,
                    column: self.marker_column,
                });
            }
            ScanState::LabelName => return Ok(Line::Empty),
            ScanState::SpriteTag => {
                if let Some(column) = self.tag_column {
                    return Err(self.error(SyntaxErrorKind::MissingPrefix, column));
                }
            }
            ScanState::CommandName => {
                if !buffer.is_empty() {
                    self.command_name = buffer;
                }
            }
            ScanState::Arguments => {
                if !buffer.is_empty() || self.arg_started {
                    self.arguments.push(buffer);
                }
            }
            ScanState::Prefix => {}
        }

        if self.command_name.is_empty() {
            return Ok(Line::Empty);
        }
        Ok(Line::Statement(Statement::new(
            self.sprite_tag,
            self.command_name,
            self.arguments,
        )))
    }
}

/// Splits on `\r\n`, `\r` and `\n` alike.
fn split_lines(source: &str) -> Vec<String> {
    source
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::to_owned)
        .collect()
}

/// Parses a script, using `say` for message lines.
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    parse_with_echo(source, DEFAULT_ECHO_COMMAND)
}

/// Parses a script, using `echo_command` as the command name of `:` message
/// lines.
///
/// Labels point at the index the next statement will get, so a label on the
/// last line points one past the end. Blank, comment and label lines never
/// take a statement slot.
pub fn parse_with_echo(source: &str, echo_command: &str) -> Result<Program, SyntaxError> {
    let mut statements = Vec::new();
    let mut labels = BTreeMap::new();

    for (n, text) in split_lines(source).iter().enumerate() {
        let line = n + 1;
        match LineScanner::new(echo_command, line).scan(text)? {
            Line::Statement(statement) => statements.push(statement),
            Line::Label { name, column } => match labels.entry(name) {
                Entry::Vacant(slot) => {
                    slot.insert(statements.len());
                }
                Entry::Occupied(slot) => {
                    let kind = SyntaxErrorKind::DuplicateLabel(slot.key().clone());
                    return Err(SyntaxError::new(kind, line, column));
                }
            },
            Line::Empty => {}
        }
    }

    Ok(Program::new(labels, statements))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(statement: &Statement) -> Vec<&str> {
        statement.arguments().iter().map(String::as_str).collect()
    }

    fn syntax_error(source: &str) -> SyntaxError {
        match parse(source) {
            Ok(program) => panic!("expected a syntax error, got {:?}", program),
            Err(e) => e,
        }
    }

    #[test]
    fn test_command_with_quoted_argument() {
        let program = parse(r#"A+cmd x, "y, z", w"#).unwrap();
        assert_eq!(program.len(), 1);

        let s = &program.statements()[0];
        assert_eq!(s.sprite_tag(), "A");
        assert_eq!(s.command_name(), "cmd");
        assert_eq!(args(s), vec!["x", "y, z", "w"]);
    }

    #[test]
    fn test_message_line_uses_echo_command_and_drops_unquoted_spaces() {
        let program = parse(":hello, world").unwrap();
        let s = &program.statements()[0];
        assert_eq!(s.sprite_tag(), "");
        assert_eq!(s.command_name(), "say");
        assert_eq!(args(s), vec!["hello", "world"]);

        let program = parse(r#"bob:"hello, ", " world""#).unwrap();
        let s = &program.statements()[0];
        assert_eq!(s.sprite_tag(), "bob");
        assert_eq!(args(s), vec!["hello, ", " world"]);
    }

    #[test]
    fn test_custom_echo_command() {
        let program = parse_with_echo(":hi", "print").unwrap();
        assert_eq!(program.statements()[0].command_name(), "print");
    }

    #[test]
    fn test_command_without_arguments() {
        let program = parse("+clear\nhero+hide").unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program.statements()[0].command_name(), "clear");
        assert!(program.statements()[0].arguments().is_empty());
        assert_eq!(program.statements()[1].sprite_tag(), "hero");
        assert_eq!(program.statements()[1].command_name(), "hide");
    }

    #[test]
    fn test_command_name_needs_a_space_separator() {
        // a tab is skipped like any other blank, so the name runs on
        let program = parse("+wait\t10").unwrap();
        let s = &program.statements()[0];
        assert_eq!(s.command_name(), "wait10");
        assert!(s.arguments().is_empty());

        let program = parse("+wait   10 ,20").unwrap();
        let s = &program.statements()[0];
        assert_eq!(s.command_name(), "wait");
        assert_eq!(args(s), vec!["10", "20"]);
    }

    #[test]
    fn test_escape_sequences() {
        let program = parse(r#"+show a\nb, "q\"uote", back\\slash"#).unwrap();
        assert_eq!(
            args(&program.statements()[0]),
            vec!["a\nb", "q\"uote", "back\\slash"]
        );
    }

    #[test]
    fn test_empty_and_trailing_arguments() {
        let program = parse("+f a,,b,").unwrap();
        assert_eq!(args(&program.statements()[0]), vec!["a", "", "b"]);

        let program = parse(r#"+f """#).unwrap();
        assert_eq!(args(&program.statements()[0]), vec![""]);
    }

    #[test]
    fn test_comments_blank_lines_and_labels_take_no_slot() {
        let source = "// intro\n\n   \n#start\n+a 1 // trailing\n// gap\n#next\n:hi\n#end";
        let program = parse(source).unwrap();

        assert_eq!(program.len(), 2);
        assert_eq!(args(&program.statements()[0]), vec!["1"]);
        assert_eq!(program.label("start"), Some(0));
        assert_eq!(program.label("next"), Some(1));
        assert_eq!(program.label("end"), Some(2));
    }

    #[test]
    fn test_comment_marker_inside_quotes_is_text() {
        let program = parse(r#"+open "http://example.com""#).unwrap();
        assert_eq!(args(&program.statements()[0]), vec!["http://example.com"]);
    }

    #[test]
    fn test_label_name_drops_blanks() {
        let program = parse("# chapter one\n+a").unwrap();
        assert_eq!(program.label("chapterone"), Some(0));
    }

    #[test]
    fn test_all_newline_conventions() {
        let program = parse("+a\r\n+b\r+c\n+d").unwrap();
        let names: Vec<&str> = program
            .statements()
            .iter()
            .map(|s| s.command_name())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_invalid_escape_is_reported_at_backslash() {
        let err = syntax_error("+a 1\n\n+show x\\t");
        assert_eq!(err.kind, SyntaxErrorKind::InvalidEscape(Some('t')));
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 8);

        let err = syntax_error("+show x\\");
        assert_eq!(err.kind, SyntaxErrorKind::InvalidEscape(None));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = syntax_error("+ok\n+show \"never closed");
        assert_eq!(err.kind, SyntaxErrorKind::UnterminatedQuote);
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 20);
    }

    #[test]
    fn test_text_without_prefix() {
        let err = syntax_error("+ok\n  hello");
        assert_eq!(err.kind, SyntaxErrorKind::MissingPrefix);
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 3);
    }

    #[test]
    fn test_duplicate_label() {
        let err = syntax_error("#a\n+x\n#a");
        assert_eq!(err.kind, SyntaxErrorKind::DuplicateLabel("a".to_string()));
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 1);
    }

    #[test]
    fn test_transition_rules() {
        use Action::*;
        use ScanState::*;

        assert_eq!(transition(SpriteTag, false, ' ', None), Ok((SpriteTag, Skip)));
        assert_eq!(transition(Arguments, true, ' ', None), Ok((Arguments, Push(' '))));
        assert_eq!(transition(Arguments, false, '/', Some('/')), Ok((Arguments, EndOfLine)));
        assert_eq!(transition(SpriteTag, false, '+', None), Ok((Prefix, CloseSpriteTag)));
        assert_eq!(transition(Prefix, false, ':', None), Ok((Arguments, BeginMessage)));
        assert_eq!(
            transition(Prefix, false, 'x', None),
            Err(SyntaxErrorKind::InvalidPrefix('x'))
        );
        assert_eq!(
            transition(CommandName, false, 'd', Some(' ')),
            Ok((Arguments, CloseCommandName('d')))
        );
        assert_eq!(transition(Arguments, true, ',', None), Ok((Arguments, Push(','))));
        assert_eq!(transition(Arguments, false, ',', None), Ok((Arguments, CloseArgument)));
        assert_eq!(transition(LabelName, false, ',', None), Ok((LabelName, Push(','))));
    }

    #[test]
    fn test_canonical_form_parses_back_to_the_same_program() {
        let scripts = [
            "",
            "#only",
            r#"A+cmd x, "y, z", w"#,
            ":hello, world\nbob: \"  spaced  \", \"a\\nb\"",
            "#start\n+bg forest\n// comment\n#mid\nalice+show \"q\\\"\", back\\\\slash\n+wait\n#end",
            "+f a,,b\n+g \"\"\n#x\n#y\n+h \"http://a\"",
            "x/+a/ \"v\"\n+a:b#c 1",
        ];

        for script in scripts {
            let program = parse(script).unwrap();
            let printed = program.to_string();
            let reparsed = parse(&printed)
                .unwrap_or_else(|e| panic!("{} while reparsing {:?}", e, printed));
            assert_eq!(reparsed, program, "script {:?} printed as {:?}", script, printed);
        }
    }
}
