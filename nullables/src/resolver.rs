//! Nullable ENS resolver: a scripted name table.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use splitter_rpc::{ChainError, EnsResolver};

#[derive(Default)]
struct ResolverState {
    names: HashMap<String, Address>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    lookups: Vec<String>,
}

/// An in-memory ENS resolver.
///
/// Names are matched case-insensitively. Unknown names resolve to `None`;
/// names marked with [`NullResolver::fail`] return a transport error.
#[derive(Default)]
pub struct NullResolver {
    state: Mutex<ResolverState>,
}

impl NullResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ResolverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `name` → `address` (also answers reverse lookups of `address`).
    pub fn register(&self, name: &str, address: Address) {
        self.state().names.insert(name.to_lowercase(), address);
    }

    /// Make lookups of `name` fail with a transport error.
    pub fn fail(&self, name: &str) {
        self.state().failing.insert(name.to_lowercase());
    }

    /// Delay the answer for `name`, to interleave concurrent lookups.
    pub fn delay(&self, name: &str, delay: Duration) {
        self.state().delays.insert(name.to_lowercase(), delay);
    }

    /// Every forward lookup made so far, in call order.
    pub fn lookups(&self) -> Vec<String> {
        self.state().lookups.clone()
    }
}

#[async_trait]
impl EnsResolver for NullResolver {
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>, ChainError> {
        let key = name.trim().to_lowercase();
        let delay = {
            let mut state = self.state();
            state.lookups.push(key.clone());
            state.delays.get(&key).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if state.failing.contains(&key) {
            return Err(ChainError::Transport(format!("lookup of {key} failed")));
        }
        Ok(state.names.get(&key).copied())
    }

    async fn lookup_address(&self, address: Address) -> Result<Option<String>, ChainError> {
        let state = self.state();
        let mut names: Vec<&String> = state
            .names
            .iter()
            .filter(|(_, a)| **a == address)
            .map(|(name, _)| name)
            .collect();
        names.sort();
        Ok(names.first().map(|name| (*name).clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_registered_names_case_insensitively() {
        let resolver = NullResolver::new();
        let alice = Address::from([1u8; 20]);
        resolver.register("alice.eth", alice);

        assert_eq!(resolver.resolve_name("Alice.ETH").await.unwrap(), Some(alice));
        assert_eq!(resolver.resolve_name("bob.eth").await.unwrap(), None);
        assert_eq!(
            resolver.lookup_address(alice).await.unwrap().as_deref(),
            Some("alice.eth")
        );
    }

    #[tokio::test]
    async fn failing_names_error() {
        let resolver = NullResolver::new();
        resolver.fail("broken.eth");
        assert!(resolver.resolve_name("broken.eth").await.is_err());
        assert_eq!(resolver.lookups(), vec!["broken.eth".to_string()]);
    }
}
