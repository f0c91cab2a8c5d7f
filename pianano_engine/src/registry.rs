//! The monitored-address registry: the single source of truth for "has this address been paid
//! since monitoring started".
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use log::*;

use crate::feed::FeedHandle;

/// Tracks every address the matcher may currently match against, with a paid flag per address.
///
/// Entries accumulate for the process lifetime; addresses are re-armed with [`reset`], never
/// removed, since another client may still be polling one. Only the payment flow sets the flag
/// and only the monitoring-start path clears it; status reads never mutate.
///
/// [`reset`]: AddressRegistry::reset
#[derive(Debug, Clone)]
pub struct AddressRegistry {
    inner: Arc<RwLock<HashMap<String, bool>>>,
    feed: FeedHandle,
}

impl AddressRegistry {
    pub fn new(feed: FeedHandle) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), feed }
    }

    /// Idempotent: starts monitoring `address` if it is not already tracked. A fresh entry also
    /// subscribes the feed to the address; an existing entry is left exactly as it is, paid flag
    /// included.
    pub fn ensure(&self, address: &str) {
        let mut map = self.write();
        if !map.contains_key(address) {
            map.insert(address.to_string(), false);
            drop(map);
            debug!("👁️ Now monitoring {address}");
            self.feed.subscribe(address);
        }
    }

    /// Marks `address` as paid. Returns whether the address was being monitored; `false` means
    /// the event is not ours and must be ignored. Re-marking a paid address is a no-op that
    /// still returns `true`.
    pub fn mark_paid(&self, address: &str) -> bool {
        match self.write().get_mut(address) {
            Some(paid) => {
                *paid = true;
                true
            },
            None => false,
        }
    }

    /// Unknown addresses are simply unpaid; this never errors.
    pub fn is_paid(&self, address: &str) -> bool {
        self.read().get(address).copied().unwrap_or(false)
    }

    /// Re-arms `address` for a fresh play: the paid flag is cleared (the entry is created if
    /// needed) and the feed subscription is re-issued.
    pub fn reset(&self, address: &str) {
        self.write().insert(address.to_string(), false);
        debug!("👁️ Monitoring (re)armed for {address}");
        self.feed.subscribe(address);
    }

    /// Snapshot of every monitored address, for re-subscribing after a feed reconnect.
    pub fn addresses(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, bool>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, bool>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feed::{test_handle, FeedCommand};

    #[test]
    fn unknown_addresses_are_unpaid() {
        let (feed, _cmds) = test_handle();
        let registry = AddressRegistry::new(feed);
        assert!(!registry.is_paid("nano_unknown"));
        assert!(!registry.mark_paid("nano_unknown"));
        assert!(registry.is_empty());
    }

    #[test]
    fn ensure_is_idempotent_and_subscribes_once() {
        let (feed, mut cmds) = test_handle();
        let registry = AddressRegistry::new(feed);
        registry.ensure("nano_a");
        registry.ensure("nano_a");
        assert_eq!(registry.len(), 1);
        assert_eq!(cmds.try_recv(), Ok(FeedCommand::Subscribe("nano_a".to_string())));
        assert!(cmds.try_recv().is_err());
    }

    #[test]
    fn ensure_does_not_clear_the_paid_flag() {
        let (feed, _cmds) = test_handle();
        let registry = AddressRegistry::new(feed);
        registry.ensure("nano_a");
        assert!(registry.mark_paid("nano_a"));
        registry.ensure("nano_a");
        assert!(registry.is_paid("nano_a"));
    }

    #[test]
    fn mark_paid_sticks_until_reset() {
        let (feed, _cmds) = test_handle();
        let registry = AddressRegistry::new(feed);
        registry.ensure("nano_a");
        assert!(!registry.is_paid("nano_a"));
        assert!(registry.mark_paid("nano_a"));
        assert!(registry.is_paid("nano_a"));
        assert!(registry.mark_paid("nano_a"), "re-marking is a harmless no-op");
        registry.reset("nano_a");
        assert!(!registry.is_paid("nano_a"));
    }

    #[test]
    fn reset_creates_and_subscribes() {
        let (feed, mut cmds) = test_handle();
        let registry = AddressRegistry::new(feed);
        registry.reset("nano_b");
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_paid("nano_b"));
        assert_eq!(cmds.try_recv(), Ok(FeedCommand::Subscribe("nano_b".to_string())));
    }

    #[test]
    fn addresses_snapshots_every_entry() {
        let (feed, _cmds) = test_handle();
        let registry = AddressRegistry::new(feed);
        registry.ensure("nano_a");
        registry.ensure("nano_b");
        let mut addresses = registry.addresses();
        addresses.sort();
        assert_eq!(addresses, vec!["nano_a".to_string(), "nano_b".to_string()]);
    }
}
