//! Command registry
//!
//! Maps command names to handlers. Lookup is case-insensitive and total:
//! an unknown name resolves to the default handler instead of failing, so a
//! protocol request can never surface an unhandled dispatch error.

use std::collections::HashMap;
use std::sync::Arc;

use stage_protocol::tokens;

/// A command handler, executed on the owner thread only
pub trait CommandHandler: Send + Sync {
    /// Execute the command with its percent-decoded argument
    fn execute(&self, argument: &str) -> String;
}

impl<F> CommandHandler for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn execute(&self, argument: &str) -> String {
        self(argument)
    }
}

/// Case-insensitive name-to-handler map with a default fallback
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn CommandHandler>>,
    default: Arc<dyn CommandHandler>,
}

impl CommandRegistry {
    /// Create an empty registry whose default handler answers
    /// `error:unknown_command`
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            default: Arc::new(|_: &str| tokens::ERROR_UNKNOWN_COMMAND.to_string()),
        }
    }

    /// Register a handler under a name; the name is stored lower-cased
    pub fn register(&mut self, name: &str, handler: impl CommandHandler + 'static) {
        self.commands.insert(name.to_lowercase(), Arc::new(handler));
    }

    /// Resolve a name to its handler; never fails
    pub fn resolve(&self, name: &str) -> Arc<dyn CommandHandler> {
        self.commands
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default))
    }

    /// Dispatch a command by name.
    ///
    /// An empty or blank name answers `error:empty_command`; everything else
    /// goes through `resolve`.
    pub fn dispatch(&self, command: &str, argument: &str) -> String {
        if command.trim().is_empty() {
            return tokens::ERROR_EMPTY_COMMAND.to_string();
        }
        self.resolve(command).execute(argument)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_echo() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register("start", |arg: &str| format!("echo:{}", arg));
        registry
    }

    #[test]
    fn test_resolution_is_case_insensitive() {
        let registry = registry_with_echo();
        assert_eq!(registry.dispatch("START", "1"), "echo:1");
        assert_eq!(registry.dispatch("start", "1"), "echo:1");
        assert_eq!(registry.dispatch("StArT", "1"), "echo:1");
    }

    #[test]
    fn test_registration_is_case_insensitive() {
        let mut registry = CommandRegistry::new();
        registry.register("STOP", |_: &str| "stopped".to_string());
        assert_eq!(registry.dispatch("stop", ""), "stopped");
    }

    #[test]
    fn test_unknown_command_hits_default_handler() {
        let registry = registry_with_echo();
        assert_eq!(
            registry.dispatch("frobnicate", ""),
            tokens::ERROR_UNKNOWN_COMMAND
        );
    }

    #[test]
    fn test_empty_command() {
        let registry = registry_with_echo();
        assert_eq!(registry.dispatch("", ""), tokens::ERROR_EMPTY_COMMAND);
        assert_eq!(registry.dispatch("   ", ""), tokens::ERROR_EMPTY_COMMAND);
    }
}
