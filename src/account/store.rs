use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::core_types::{Funds, Quantity};

use super::error::AccountError;

/// Reference capacity before `lookup` starts refusing new names.
const MAX_ACCOUNTS: usize = 4096;

#[derive(Debug, Default)]
struct AccountInner {
    balance: Funds,
    inventory: Quantity,
}

/// A single trader's cash balance and share inventory.
///
/// All mutation happens under this account's own lock; no operation here ever
/// needs to hold any other account's lock or the store's lock at the same time.
#[derive(Debug, Default)]
pub struct Account {
    inner: Mutex<AccountInner>,
}

impl Account {
    pub fn increase_balance(&self, amount: Funds) -> Result<(), AccountError> {
        let mut inner = self.inner.lock().unwrap();
        inner.balance = inner
            .balance
            .checked_add(amount)
            .ok_or(AccountError::Overflow { amount })?;
        Ok(())
    }

    /// Atomically decrease the balance by `amount`, or leave it untouched and
    /// report how much was available.
    pub fn decrease_balance(&self, amount: Funds) -> Result<(), AccountError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.balance < amount {
            return Err(AccountError::InsufficientBalance {
                have: inner.balance,
                need: amount,
            });
        }
        inner.balance -= amount;
        Ok(())
    }

    pub fn increase_inventory(&self, amount: Quantity) -> Result<(), AccountError> {
        let mut inner = self.inner.lock().unwrap();
        inner.inventory = inner
            .inventory
            .checked_add(amount)
            .ok_or(AccountError::Overflow { amount })?;
        Ok(())
    }

    pub fn decrease_inventory(&self, amount: Quantity) -> Result<(), AccountError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.inventory < amount {
            return Err(AccountError::InsufficientInventory {
                have: inner.inventory,
                need: amount,
            });
        }
        inner.inventory -= amount;
        Ok(())
    }

    /// Atomic read of both fields together.
    pub fn snapshot(&self) -> (Funds, Quantity) {
        let inner = self.inner.lock().unwrap();
        (inner.balance, inner.inventory)
    }
}

/// Process-wide name → account map.
///
/// Names are kept as raw bytes, not `String`: the identity key is an arbitrary
/// non-empty byte string, and decoding it through UTF-8 first (lossily or
/// otherwise) would collapse distinct non-UTF-8 names onto the same account.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: Mutex<FxHashMap<Box<[u8]>, Arc<Account>>>,
}

impl AccountStore {
    pub fn new() -> AccountStore {
        AccountStore::default()
    }

    /// Idempotent: returns the existing account for `name`, creating a fresh
    /// zero-balance one on first lookup.
    pub fn lookup(&self, name: &[u8]) -> Result<Arc<Account>, AccountError> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get(name) {
            return Ok(Arc::clone(account));
        }
        if accounts.len() >= MAX_ACCOUNTS {
            return Err(AccountError::CapacityExhausted);
        }
        let account = Arc::new(Account::default());
        accounts.insert(Box::from(name), Arc::clone(&account));
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_then_withdraw() {
        let acc = Account::default();
        acc.increase_balance(1000).unwrap();
        acc.decrease_balance(400).unwrap();
        assert_eq!(acc.snapshot(), (600, 0));
    }

    #[test]
    fn withdraw_more_than_balance_fails_and_leaves_untouched() {
        let acc = Account::default();
        acc.increase_balance(600).unwrap();
        let err = acc.decrease_balance(700).unwrap_err();
        assert_eq!(
            err,
            AccountError::InsufficientBalance {
                have: 600,
                need: 700
            }
        );
        assert_eq!(acc.snapshot(), (600, 0));
    }

    #[test]
    fn escrow_then_release() {
        let acc = Account::default();
        acc.increase_inventory(50).unwrap();
        acc.decrease_inventory(20).unwrap();
        assert_eq!(acc.snapshot(), (0, 30));
    }

    #[test]
    fn release_more_than_inventory_fails_and_leaves_untouched() {
        let acc = Account::default();
        acc.increase_inventory(30).unwrap();
        let err = acc.decrease_inventory(40).unwrap_err();
        assert_eq!(
            err,
            AccountError::InsufficientInventory { have: 30, need: 40 }
        );
        assert_eq!(acc.snapshot(), (0, 30));
    }

    #[test]
    fn balance_overflow_is_rejected() {
        let acc = Account::default();
        acc.increase_balance(u32::MAX).unwrap();
        assert!(acc.increase_balance(1).is_err());
        assert_eq!(acc.snapshot(), (u32::MAX, 0));
    }

    #[test]
    fn lookup_is_idempotent_per_name() {
        let store = AccountStore::new();
        let a1 = store.lookup(b"alice").unwrap();
        a1.increase_balance(100).unwrap();
        let a2 = store.lookup(b"alice").unwrap();
        assert_eq!(a2.snapshot(), (100, 0));
        assert!(Arc::ptr_eq(&a1, &a2));
    }

    #[test]
    fn lookup_distinguishes_names() {
        let store = AccountStore::new();
        let alice = store.lookup(b"alice").unwrap();
        let bob = store.lookup(b"bob").unwrap();
        alice.increase_balance(5).unwrap();
        assert_eq!(bob.snapshot(), (0, 0));
    }

    #[test]
    fn lookup_distinguishes_non_utf8_names() {
        let store = AccountStore::new();
        let a = store.lookup(&[0xFF, 0x01]).unwrap();
        let b = store.lookup(&[0xFF, 0x02]).unwrap();
        a.increase_balance(5).unwrap();
        assert_eq!(b.snapshot(), (0, 0));
    }
}
