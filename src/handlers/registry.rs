use std::collections::BTreeMap;
use std::sync::Arc;

use super::commands::{HelpCommand, StartCommand, StatsCommand};
use super::traits::CommandHandler;
use crate::store::UserStore;
use crate::telegram::ChatApi;

/// Registry mapping command names (without the leading slash) to handlers
#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: BTreeMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        let name = name.into().trim_start_matches('/').to_lowercase();
        self.handlers.insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered commands with their descriptions, sorted by name
    pub fn commands(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.handlers
            .iter()
            .map(|(name, handler)| (name.as_str(), handler.description()))
    }

    /// Registry with `/start`, `/help` and `/stats`
    pub fn with_defaults(chat: Arc<dyn ChatApi>, store: Arc<dyn UserStore>) -> Self {
        let mut registry = Self::new();
        registry.register("start", Arc::new(StartCommand::new(chat.clone(), store.clone())));
        registry.register("help", Arc::new(HelpCommand::new(chat.clone())));
        registry.register("stats", Arc::new(StatsCommand::new(chat, store)));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::RecordingChat;
    use crate::store::FjallUserStore;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_registered() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(FjallUserStore::open(temp.path(), 10).unwrap());
        let registry = CommandRegistry::with_defaults(Arc::new(RecordingChat::default()), store);

        assert!(registry.has_command("start"));
        assert!(registry.has_command("help"));
        assert!(registry.has_command("stats"));
        assert!(!registry.has_command("download"));

        let names: Vec<_> = registry.commands().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["help", "start", "stats"]);
    }

    #[test]
    fn test_register_normalizes_name() {
        let mut registry = CommandRegistry::new();
        registry.register("/Help", Arc::new(HelpCommand::new(Arc::new(RecordingChat::default()))));
        assert!(registry.get("help").is_some());
    }
}
