use std::collections::HashSet;
use std::sync::RwLock;

/// Shared set of client IPs the defending side considers blocked.
/// Membership is the only semantic; there is no per-entry TTL. Eviction is
/// global and time-triggered (see the eviction ticker in `floodsim`).
#[derive(Default)]
pub struct BlacklistStore {
    ips: RwLock<HashSet<String>>,
}

impl BlacklistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the IP was not already present.
    pub fn add(&self, ip: &str) -> bool {
        self.ips.write().unwrap().insert(ip.to_string())
    }

    /// Returns true if the IP was present.
    pub fn remove(&self, ip: &str) -> bool {
        self.ips.write().unwrap().remove(ip)
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.ips.read().unwrap().contains(ip)
    }

    /// Drops every entry, returning how many were evicted.
    pub fn clear(&self) -> usize {
        let mut ips = self.ips.write().unwrap();
        let evicted = ips.len();
        ips.clear();
        evicted
    }

    pub fn len(&self) -> usize {
        self.ips.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_are_idempotent() {
        let blacklist = BlacklistStore::new();
        assert!(blacklist.add("192.168.1.7"));
        assert!(!blacklist.add("192.168.1.7"));
        assert!(blacklist.contains("192.168.1.7"));

        assert!(blacklist.remove("192.168.1.7"));
        assert!(!blacklist.remove("192.168.1.7"));
        assert!(!blacklist.contains("192.168.1.7"));
    }

    #[test]
    fn clear_evicts_everything() {
        let blacklist = BlacklistStore::new();
        blacklist.add("10.0.0.1");
        blacklist.add("10.0.0.2");
        assert_eq!(blacklist.clear(), 2);
        assert!(blacklist.is_empty());
        assert_eq!(blacklist.clear(), 0);
    }
}
