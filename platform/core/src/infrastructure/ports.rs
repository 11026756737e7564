// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared tracker of host ports handed out to containers.

use parking_lot::Mutex;
use std::collections::BTreeSet;

/// Hands out free host ports, scanning upward from a preferred value.
///
/// The used-port set is shared between all deployments; two concurrent
/// reservations never return the same port. No upper bound is enforced;
/// callers are responsible for sane ranges.
#[derive(Debug, Default)]
pub struct PortAllocator {
    used: Mutex<BTreeSet<u16>>,
}

impl PortAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starting at `preferred`, reserve and return the next unused port.
    pub fn reserve(&self, preferred: u16) -> u16 {
        let mut used = self.used.lock();
        let mut port = preferred;
        while used.contains(&port) {
            port += 1;
        }
        used.insert(port);
        port
    }

    /// Release the given ports. Ports not currently held are ignored.
    pub fn release<I: IntoIterator<Item = u16>>(&self, ports: I) {
        let mut used = self.used.lock();
        for port in ports {
            used.remove(&port);
        }
    }

    pub fn snapshot(&self) -> BTreeSet<u16> {
        self.used.lock().clone()
    }

    pub fn restore(&self, ports: BTreeSet<u16>) {
        *self.used.lock() = ports;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn scans_upward_from_preferred() {
        let allocator = PortAllocator::new();
        assert_eq!(allocator.reserve(8082), 8082);
        assert_eq!(allocator.reserve(8082), 8083);
        assert_eq!(allocator.reserve(8888), 8888);
        assert_eq!(allocator.reserve(8082), 8084);
    }

    #[test]
    fn release_is_noop_for_unknown_ports() {
        let allocator = PortAllocator::new();
        allocator.release([9999]);
        assert_eq!(allocator.reserve(9999), 9999);
        allocator.release([9999]);
        assert_eq!(allocator.reserve(9999), 9999);
    }

    #[test]
    fn concurrent_reservations_are_disjoint() {
        let allocator = Arc::new(PortAllocator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let allocator = allocator.clone();
                std::thread::spawn(move || {
                    (0..50).map(|_| allocator.reserve(20000)).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for port in handle.join().unwrap() {
                assert!(seen.insert(port), "port {port} handed out twice");
            }
        }
        assert_eq!(seen.len(), 400);
    }
}
