use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tally_core::CounterpartyId;
use uuid::Uuid;

/// Serialization key for one guarded entity.
///
/// Variant order is the lock acquisition order: counterparties first, then
/// products, then the main account, so concurrent writers always climb the
/// same ladder and cannot deadlock.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum LockKey {
    Customer(Uuid),
    Supplier(Uuid),
    Product(Uuid),
    MainAccount,
}

impl From<CounterpartyId> for LockKey {
    fn from(value: CounterpartyId) -> Self {
        match value {
            CounterpartyId::Customer(id) => LockKey::Customer(id.into()),
            CounterpartyId::Supplier(id) => LockKey::Supplier(id.into()),
        }
    }
}

/// Registry handing out one mutex per entity.
///
/// Writers hold their entity locks across resolve-compute-append so the
/// read-then-write balance pattern cannot interleave for the same entity.
#[derive(Clone, Debug, Default)]
pub struct LockRegistry {
    cells: Arc<Mutex<HashMap<LockKey, Arc<Mutex<()>>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: LockKey) -> Arc<Mutex<()>> {
        let mut cells = self
            .cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cells.entry(key).or_default())
    }

    /// Run `f` while holding every requested lock, acquired in key order.
    pub fn with_locks<T>(&self, mut keys: Vec<LockKey>, f: impl FnOnce() -> T) -> T {
        keys.sort();
        keys.dedup();
        let cells: Vec<Arc<Mutex<()>>> = keys.into_iter().map(|key| self.cell(key)).collect();
        let _guards: Vec<_> = cells
            .iter()
            .map(|cell| cell.lock().unwrap_or_else(PoisonError::into_inner))
            .collect();
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn lock_order_puts_main_account_last() {
        let mut keys = vec![
            LockKey::MainAccount,
            LockKey::Product(Uuid::nil()),
            LockKey::Customer(Uuid::nil()),
        ];
        keys.sort();
        assert_eq!(keys.last(), Some(&LockKey::MainAccount));
        assert_eq!(keys.first(), Some(&LockKey::Customer(Uuid::nil())));
    }

    #[test]
    fn same_key_serializes_critical_sections() {
        let registry = LockRegistry::new();
        let counter = Arc::new(Mutex::new(0u32));
        let key = LockKey::Customer(Uuid::new_v4());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    registry.with_locks(vec![key], || {
                        let mut guard = counter.lock().unwrap();
                        *guard += 1;
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*counter.lock().unwrap(), 8);
    }

    #[test]
    fn duplicate_keys_do_not_self_deadlock() {
        let registry = LockRegistry::new();
        let key = LockKey::Product(Uuid::new_v4());
        let ran = registry.with_locks(vec![key, key], || true);
        assert!(ran);
    }
}
