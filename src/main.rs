use anyhow::Context;
use argh::FromArgs;
use novel_script::repl::Console;
use novel_script::{Config, Interpreter, ScriptError};
use std::fs;
use std::process::ExitCode;

#[derive(FromArgs)]
/// Run a novel script, or start an interactive console when no script is given.
struct Args {
    #[argh(positional)]
    /// script file to run.
    script: Option<String>,

    #[argh(option, short = 'l')]
    /// label to start from; the run fails if the script does not declare it.
    label: Option<String>,

    #[argh(option)]
    /// command name used for `:` message lines (default: say).
    echo: Option<String>,

    #[argh(option)]
    /// console prompt.
    prompt: Option<String>,
}

impl Args {
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(echo) = &self.echo {
            config.echo_command = echo.clone();
        }
        if let Some(prompt) = &self.prompt {
            config.prompt = prompt.clone();
        }
        config
    }
}

fn run_script(interpreter: &mut Interpreter, path: &str, label: Option<&str>) -> anyhow::Result<bool> {
    let code = fs::read_to_string(path).with_context(|| format!("can't read {}", path))?;
    let result = match label {
        Some(label) => interpreter.run_from(&code, label),
        None => interpreter.run(&code),
    };
    match result {
        Ok(report) => Ok(report.failures.is_empty()),
        Err(ScriptError::Syntax(e)) => Err(anyhow::Error::new(e).context(path.to_string())),
        Err(e) => Err(e.into()),
    }
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();
    let mut interpreter = Interpreter::default().with_config(args.config());

    let outcome = match &args.script {
        Some(path) => run_script(&mut interpreter, path, args.label.as_deref()),
        None => Console::new(interpreter).repl().map(|()| true),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
