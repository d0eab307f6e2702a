use crate::lexer::DEFAULT_ECHO_COMMAND;
use std::collections::HashMap;
use std::env as stdenv;

/// Environment variable overriding [`Config::echo_command`].
pub const ECHO_COMMAND_VAR: &str = "NOVEL_ECHO_COMMAND";
/// Environment variable overriding [`Config::prompt`].
pub const PROMPT_VAR: &str = "NOVEL_PROMPT";
/// Environment variable overriding [`Config::show_trace`].
pub const TRACE_VAR: &str = "NOVEL_TRACE";

/// Runtime settings shared by the interpreter and the console.
///
/// Fields are public; the binary overlays its command-line flags on top of
/// whatever [`Config::from_env`] found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Command name substituted for `:` message lines.
    pub echo_command: String,
    /// Prompt printed by the console for every input line.
    pub prompt: String,
    /// Whether internal-error reports include the captured backtrace.
    pub show_trace: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            echo_command: DEFAULT_ECHO_COMMAND.to_string(),
            prompt: "> ".to_string(),
            show_trace: true,
        }
    }
}

impl Config {
    /// Defaults overlaid with the `NOVEL_*` variables of the current process.
    pub fn from_env() -> Self {
        Self::from_vars(stdenv::vars())
    }

    /// Defaults overlaid with the given variables. Unknown keys are ignored,
    /// an empty echo command is ignored too.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let mut config = Self::default();

        if let Some(echo) = vars.get(ECHO_COMMAND_VAR).filter(|v| !v.trim().is_empty()) {
            config.echo_command = echo.trim().to_string();
        }
        if let Some(prompt) = vars.get(PROMPT_VAR) {
            config.prompt = prompt.clone();
        }
        if let Some(trace) = vars.get(TRACE_VAR) {
            config.show_trace = !matches!(
                trace.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
        config
    }
}
