// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Registry of connected peer platforms.

use crate::domain::platform::{PeerConnection, PlatformInfo};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;

/// Connected peers in registration order, plus the set of in-flight
/// connection handshakes.
///
/// Read-mostly: routing takes a snapshot of the URLs and tolerates a peer
/// disappearing mid-scan. The pending set breaks the mutual-registration
/// recursion: the initiator marks the peer pending before calling out, so
/// the peer's symmetric callback returns immediately instead of connecting
/// back a second time.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<Vec<PeerConnection>>,
    pending: Mutex<HashSet<String>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, base_url: &str) -> bool {
        self.peers.read().iter().any(|p| p.base_url == base_url)
    }

    /// Record a peer. Returns false when it was already connected.
    pub fn insert(&self, peer: PeerConnection) -> bool {
        let mut peers = self.peers.write();
        if peers.iter().any(|p| p.base_url == peer.base_url) {
            return false;
        }
        peers.push(peer);
        true
    }

    pub fn remove(&self, base_url: &str) -> bool {
        let mut peers = self.peers.write();
        let before = peers.len();
        peers.retain(|p| p.base_url != base_url);
        peers.len() < before
    }

    /// Peer base URLs in registration order.
    pub fn urls(&self) -> Vec<String> {
        self.peers.read().iter().map(|p| p.base_url.clone()).collect()
    }

    pub fn list(&self) -> Vec<PeerConnection> {
        self.peers.read().clone()
    }

    pub fn update_info(&self, base_url: &str, info: PlatformInfo) -> bool {
        let mut peers = self.peers.write();
        match peers.iter_mut().find(|p| p.base_url == base_url) {
            Some(peer) => {
                peer.info = info;
                true
            }
            None => false,
        }
    }

    /// Mark a handshake with `base_url` as in flight. Returns false when one
    /// already is, meaning the caller is on the receiving end of it.
    pub fn begin_handshake(&self, base_url: &str) -> bool {
        self.pending.lock().insert(base_url.to_string())
    }

    pub fn end_handshake(&self, base_url: &str) {
        self.pending.lock().remove(base_url);
    }

    pub fn restore(&self, peers: Vec<PeerConnection>) {
        *self.peers.write() = peers;
    }
}
