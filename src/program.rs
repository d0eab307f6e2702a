//! Parsed form of a script: the statements to execute and the labels that
//! point into them.

use std::collections::BTreeMap;
use std::fmt;

/// One executable unit of a script.
///
/// A statement is created once by the parser and never changes afterwards.
/// The sprite tag may be empty (a global command); the command name never is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sprite_tag: String,
    command_name: String,
    arguments: Vec<String>,
}

impl Statement {
    pub(crate) fn new(sprite_tag: String, command_name: String, arguments: Vec<String>) -> Self {
        debug_assert!(!command_name.is_empty());
        Self {
            sprite_tag,
            command_name,
            arguments,
        }
    }

    /// Tag of the sprite the statement targets, or `""` for global commands.
    pub fn sprite_tag(&self) -> &str {
        &self.sprite_tag
    }

    /// Name used to look up the handler.
    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    /// Arguments in source order.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

impl fmt::Display for Statement {
    /// Writes the statement as a `+` command line that parses back to itself.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.sprite_tag, self.command_name)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            write_quoted(f, arg)?;
        }
        Ok(())
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, arg: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in arg.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

/// A whole parsed script.
///
/// Built atomically by [`crate::parse`]; immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    labels: BTreeMap<String, usize>,
    statements: Vec<Statement>,
}

impl Program {
    pub(crate) fn new(labels: BTreeMap<String, usize>, statements: Vec<Statement>) -> Self {
        Self { labels, statements }
    }

    /// All statements in execution order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Label name to statement index.
    ///
    /// An index may equal `statements().len()` when the label is the last thing
    /// in the script; running from it executes nothing.
    pub fn labels(&self) -> &BTreeMap<String, usize> {
        &self.labels
    }

    /// Index the label points at, if declared.
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl fmt::Display for Program {
    /// Canonical script text: every label on its own line right before the
    /// statement it indexes, every statement in `+` form with quoted arguments.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels: Vec<(usize, &str)> = self
            .labels
            .iter()
            .map(|(name, &index)| (index, name.as_str()))
            .collect();
        labels.sort();

        let mut pending = labels.into_iter().peekable();
        for (index, statement) in self.statements.iter().enumerate() {
            while let Some((_, name)) = pending.next_if(|(at, _)| *at <= index) {
                writeln!(f, "#{}", name)?;
            }
            writeln!(f, "{}", statement)?;
        }
        for (_, name) in pending {
            writeln!(f, "#{}", name)?;
        }
        Ok(())
    }
}
