use crate::config::SourcePaths;
use crate::models::AgentType;

use super::{
    ClaudeCodeLoader, CodexLoader, CursorLoader, DatabaseLoader, GeminiLoader, IncrementalLoader,
    SessionLoader,
};

/// Ordered set of loaders, at most one per [`AgentType`]
///
/// Registration order is iteration order. Registering a second loader for a
/// type replaces the first in its original position.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: Vec<Box<dyn SessionLoader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with one loader per supported source, rooted at `paths`
    pub fn with_default_loaders(paths: &SourcePaths) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ClaudeCodeLoader::new(&paths.claude_dir)));
        registry.register(Box::new(CodexLoader::new(&paths.codex_dir)));
        registry.register(Box::new(CursorLoader::new(&paths.cursor_user_dir)));
        registry.register(Box::new(GeminiLoader::new(&paths.gemini_dir)));
        registry
    }

    pub fn register(&mut self, loader: Box<dyn SessionLoader>) {
        let agent = loader.agent_type();
        match self.loaders.iter_mut().find(|existing| existing.agent_type() == agent) {
            Some(slot) => *slot = loader,
            None => self.loaders.push(loader),
        }
    }

    /// Drop every loader whose type `keep` rejects
    pub fn retain(&mut self, keep: impl Fn(AgentType) -> bool) {
        self.loaders.retain(|loader| keep(loader.agent_type()));
    }

    pub fn get_all(&self) -> Vec<&dyn SessionLoader> {
        self.loaders.iter().map(|l| l.as_ref()).collect()
    }

    /// Loaders whose source data is present, in registration order
    pub fn get_available(&self) -> Vec<&dyn SessionLoader> {
        self.loaders.iter().map(|l| l.as_ref()).filter(|l| l.is_available()).collect()
    }

    pub fn get_by_type(&self, agent: AgentType) -> Option<&dyn SessionLoader> {
        self.loaders.iter().map(|l| l.as_ref()).find(|l| l.agent_type() == agent)
    }

    pub fn incremental(&self) -> impl Iterator<Item = &dyn IncrementalLoader> + '_ {
        self.loaders.iter().filter_map(|l| l.as_incremental())
    }

    pub fn database_backed(&self) -> impl Iterator<Item = &dyn DatabaseLoader> + '_ {
        self.loaders.iter().filter_map(|l| l.as_database())
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}
