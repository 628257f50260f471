//! Receive-side reordering and duplicate suppression.
//!
//! [`RecvState`] implements the receiver half of the protocol:
//!
//! - Frames whose nonce was already seen are replays of a single datagram
//!   and are rejected before any sequence processing.
//! - The **expected** segment is delivered immediately, followed by any
//!   buffered successors it unblocks.
//! - Segments from the future are parked in a reorder buffer keyed by
//!   sequence number.
//! - Segments from the past (retransmissions of delivered data) produce no
//!   output but still deserve a refreshed cumulative ack.
//!
//! After every accepted frame the caller sends one cumulative ack carrying
//! [`ack_value`] — the highest sequence delivered contiguously so far.
//!
//! This module only manages state; all socket I/O is the caller's
//! responsibility.
//!
//! [`ack_value`]: RecvState::ack_value

use std::collections::{BTreeMap, HashSet};

/// Receive-side state for one transfer.
#[derive(Debug)]
pub struct RecvState {
    /// Next in-order sequence number.  Everything below it has been emitted.
    expected: u16,

    /// Out-of-order payloads parked until the gap before them fills.
    /// Every key is strictly greater than `expected`.
    reorder: BTreeMap<u16, Vec<u8>>,

    /// Nonces of frames already accepted; replays are rejected.
    nonces: HashSet<u16>,

    /// Next nonce to stamp on an outgoing ack frame.
    tx_nonce: u16,
}

impl Default for RecvState {
    fn default() -> Self {
        Self::new()
    }
}

impl RecvState {
    pub fn new() -> Self {
        Self {
            expected: 1,
            reorder: BTreeMap::new(),
            nonces: HashSet::new(),
            tx_nonce: 0,
        }
    }

    /// Record a frame nonce.  Returns `false` when the nonce was seen
    /// before, in which case the frame is a duplicate datagram and must be
    /// dropped without further processing.
    pub fn register_nonce(&mut self, nonce: u16) -> bool {
        self.nonces.insert(nonce)
    }

    /// Process a deduplicated segment and return the bytes now deliverable
    /// in order (possibly empty).
    pub fn on_segment(&mut self, seq: u16, payload: Vec<u8>) -> Vec<u8> {
        if seq == self.expected {
            let mut out = payload;
            self.expected = self.expected.wrapping_add(1);
            // Drain every buffered successor the new segment unblocked.
            while let Some(parked) = self.reorder.remove(&self.expected) {
                out.extend_from_slice(&parked);
                self.expected = self.expected.wrapping_add(1);
            }
            out
        } else if seq > self.expected {
            // Overwrites are benign: a duplicate of a parked segment carries
            // identical bytes by construction.
            self.reorder.insert(seq, payload);
            Vec::new()
        } else {
            // Already delivered; the refreshed ack is all the sender needs.
            Vec::new()
        }
    }

    /// Cumulative ack value: the highest sequence delivered in order, or 0
    /// before any segment has been delivered.
    pub fn ack_value(&self) -> u16 {
        self.expected - 1
    }

    /// Number of segments parked out of order.
    pub fn buffered(&self) -> usize {
        self.reorder.len()
    }

    /// Draw the nonce for the next outgoing ack.
    pub fn next_nonce(&mut self) -> u16 {
        let nonce = self.tx_nonce;
        self.tx_nonce = self.tx_nonce.wrapping_add(1);
        nonce
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
