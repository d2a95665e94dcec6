use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::MockRegistry;
use crate::Node;
use crate::RegistryError;

/// Builds a [`MockRegistry`] whose `get` answers from a fixed key table.
///
/// Keys that were not registered answer with
/// [`RegistryError::KeyNotFound`]. Every requested key is recorded and can
/// be inspected through [`RegistryBuilder::requested`].
#[derive(Default)]
pub struct RegistryBuilder {
    answers: HashMap<String, Result<Node, RegistryError>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf(
        mut self,
        key: &str,
        value: &str,
    ) -> Self {
        self.answers.insert(key.to_string(), Ok(Node::leaf(key, value)));
        self
    }

    /// Directory whose children are leaves `(key, value)`
    pub fn dir(
        mut self,
        key: &str,
        children: &[(&str, &str)],
    ) -> Self {
        let nodes = children.iter().map(|(k, v)| Node::leaf(*k, *v)).collect();
        self.answers.insert(key.to_string(), Ok(Node::dir(key, nodes)));
        self
    }

    /// Directory whose children are directories
    pub fn dir_of_dirs(
        mut self,
        key: &str,
        children: &[&str],
    ) -> Self {
        let nodes = children.iter().map(|k| Node::dir(*k, vec![])).collect();
        self.answers.insert(key.to_string(), Ok(Node::dir(key, nodes)));
        self
    }

    pub fn fail(
        mut self,
        key: &str,
        error: RegistryError,
    ) -> Self {
        self.answers.insert(key.to_string(), Err(error));
        self
    }

    /// Keys requested so far, in call order
    pub fn requested(&self) -> Arc<Mutex<Vec<String>>> {
        self.requested.clone()
    }

    pub fn build(self) -> Arc<MockRegistry> {
        Arc::new(self.into_mock())
    }

    pub fn into_mock(self) -> MockRegistry {
        let answers = self.answers;
        let requested = self.requested;

        let mut registry = MockRegistry::new();
        registry.expect_get().returning(move |key| {
            requested.lock().unwrap().push(key.to_string());
            answers.get(key).cloned().unwrap_or_else(|| {
                Err(RegistryError::KeyNotFound {
                    key: key.to_string(),
                })
            })
        });
        registry
    }
}
