use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What a handler hands back for one statement.
///
/// `Ok(None)` is the usual "nothing to report". Return a
/// [`RuntimeError`](crate::RuntimeError) for expected failures; anything
/// else is reported as an internal error.
pub type CommandResult = anyhow::Result<Option<String>>;

/// Implementation of one command name.
///
/// A blanket implementation exists for closures taking the sprite tag and the
/// statement arguments, so most hosts register plain closures.
pub trait Handler {
    /// Runs the command for one statement.
    fn invoke(&mut self, sprite_tag: &str, args: &[String]) -> CommandResult;
}

impl<F> Handler for F
where
    F: FnMut(&str, &[String]) -> CommandResult,
{
    fn invoke(&mut self, sprite_tag: &str, args: &[String]) -> CommandResult {
        self(sprite_tag, args)
    }
}

/// Adapts a handler that never produces a value.
pub(crate) struct Action<F>(pub(crate) F);

impl<F> Handler for Action<F>
where
    F: FnMut(&str, &[String]) -> anyhow::Result<()>,
{
    fn invoke(&mut self, sprite_tag: &str, args: &[String]) -> CommandResult {
        (self.0)(sprite_tag, args)?;
        Ok(None)
    }
}

/// Cooperative stop flag shared between an interpreter and its handlers.
///
/// The interpreter checks it before every statement. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the running script to stop before its next statement.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_a_handler() {
        let mut greet = |sprite: &str, args: &[String]| -> CommandResult {
            Ok(Some(format!("{} greets {}", sprite, args.join(" "))))
        };
        let out = greet.invoke("alice", &["bob".to_string()]).unwrap();
        assert_eq!(out.as_deref(), Some("alice greets bob"));
    }

    #[test]
    fn test_action_returns_nothing() {
        let mut seen = Vec::new();
        {
            let mut action = Action(|_: &str, args: &[String]| -> anyhow::Result<()> {
                seen.extend(args.iter().cloned());
                Ok(())
            });
            assert_eq!(action.invoke("", &["x".to_string()]).unwrap(), None);
        }
        assert_eq!(seen, vec!["x".to_string()]);
    }

    #[test]
    fn test_cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());

        clone.cancel();
        assert!(token.is_cancelled());

        token.reset();
        assert!(!clone.is_cancelled());
    }
}
