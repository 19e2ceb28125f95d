//! Ordered producer chains.

use std::sync::Arc;

use super::traits::Producer;

/// A primary producer and its fallbacks, tried in order.
pub struct ProducerChain<V> {
    primary: Arc<dyn Producer<V>>,
    fallbacks: Vec<Arc<dyn Producer<V>>>,
}

impl<V> Clone for ProducerChain<V> {
    fn clone(&self) -> Self {
        Self {
            primary: Arc::clone(&self.primary),
            fallbacks: self.fallbacks.clone(),
        }
    }
}

impl<V> ProducerChain<V> {
    pub fn new(primary: Arc<dyn Producer<V>>) -> Self {
        Self {
            primary,
            fallbacks: Vec::new(),
        }
    }

    /// Append a fallback after the ones already registered.
    pub fn with_fallback(mut self, fallback: Arc<dyn Producer<V>>) -> Self {
        self.fallbacks.push(fallback);
        self
    }

    pub fn primary(&self) -> &Arc<dyn Producer<V>> {
        &self.primary
    }

    pub fn fallbacks(&self) -> &[Arc<dyn Producer<V>>] {
        &self.fallbacks
    }

    /// Producer names in the order they are tried.
    pub fn names(&self) -> Vec<String> {
        std::iter::once(&self.primary)
            .chain(self.fallbacks.iter())
            .map(|p| p.name().to_string())
            .collect()
    }
}
