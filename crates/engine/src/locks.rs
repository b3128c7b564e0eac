// In crates/engine/src/locks.rs

use core_types::Symbol;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per symbol, created on first use.
///
/// Holding the guard serializes order submission for that symbol while other
/// symbols proceed in parallel.
#[derive(Debug, Default)]
pub struct SymbolLocks {
    locks: Mutex<HashMap<Symbol, Arc<AsyncMutex<()>>>>,
}

impl SymbolLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, symbol: &Symbol) -> OwnedMutexGuard<()> {
        let key = Symbol(symbol.0.to_uppercase());
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }
}
