//! Send-side sliding-window state machine.
//!
//! [`SendState`] tracks every segment that has been transmitted but not yet
//! retired by a cumulative ack, together with the bookkeeping the control
//! loop needs for retransmission and RTT sampling.
//!
//! # Protocol contract
//!
//! - Segments are numbered from 1, one sequence number per segment.
//! - Acks are **cumulative**: an ack for `s` retires every segment with
//!   sequence ≤ `s` and moves the window base to `s + 1`.
//! - A non-advancing ack counts toward the fast-retransmit trigger; the
//!   third consecutive one asks the caller to resend the base segment.
//! - Send times feed the RTT estimator.  A segment's send time is cleared
//!   whenever it is retransmitted, so acks for retransmitted segments never
//!   produce a sample (Karn's rule).
//! - Every outgoing datagram draws a fresh nonce from [`next_nonce`];
//!   received ack nonces are remembered so replayed acks are inert.
//!
//! This module only manages state; all socket I/O is the caller's
//! responsibility.
//!
//! [`next_nonce`]: SendState::next_nonce

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Static ceiling on in-flight segments, regardless of the congestion window.
pub const MAX_WINDOW: u16 = 500;

/// Consecutive non-advancing acks that trigger a fast retransmit.
pub const DUP_ACK_THRESHOLD: u32 = 3;

// ---------------------------------------------------------------------------
// AckOutcome
// ---------------------------------------------------------------------------

/// What a processed ack did to the window.
#[derive(Debug)]
pub enum AckOutcome {
    /// The window base advanced.  `sample` is present only when the acked
    /// segment was never retransmitted since its original send.
    Advanced {
        /// Number of segments retired by this ack.
        retired: usize,
        /// Round-trip sample for the acked segment, when usable.
        sample: Option<Duration>,
    },
    /// Non-advancing ack; duplicate accounting was bumped.
    Duplicate,
    /// Third consecutive non-advancing ack: the caller must retransmit this
    /// segment immediately.
    FastRetransmit { seq: u16, payload: Vec<u8> },
    /// Replayed nonce, ack for an unsent sequence, or stale ack with nothing
    /// in flight.  No state changed.
    Ignored,
}

// ---------------------------------------------------------------------------
// SendState
// ---------------------------------------------------------------------------

/// Send-side state for one transfer.
///
/// # Sequence-number layout
///
/// ```text
///     base              next_seq
///      │                   │
///  ────┼───────────────────┼──────────────────▶ seq space
///      │ ◀── in flight ──▶ │ ◀── unsent ────▶
/// ```
#[derive(Debug)]
pub struct SendState {
    /// Lowest unacknowledged sequence number (left window edge).
    base: u16,

    /// Sequence number to assign to the next new segment.
    next_seq: u16,

    /// Payload of every in-flight segment, keyed by sequence number.
    window: BTreeMap<u16, Vec<u8>>,

    /// Most recent transmission time per segment, for RTT sampling.
    /// Retransmission removes the entry so the sample pool stays clean.
    sent_times: HashMap<u16, Instant>,

    /// Consecutive non-advancing acks seen since the last advance.
    dup_count: u32,

    /// Nonces of acks already processed; replays are ignored.
    ack_nonces: HashSet<u16>,

    /// Next nonce to stamp on an outgoing data frame.
    tx_nonce: u16,

    /// Timer anchor: the most recent event that restarted the
    /// retransmission clock (new send, advancing ack, or timeout sweep).
    last_transmit: Instant,

    /// True once the input stream is exhausted.
    eof: bool,
}

impl SendState {
    pub fn new(now: Instant) -> Self {
        Self {
            base: 1,
            next_seq: 1,
            window: BTreeMap::new(),
            sent_times: HashMap::new(),
            dup_count: 0,
            ack_nonces: HashSet::new(),
            tx_nonce: 0,
            last_transmit: now,
            eof: false,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Sequence number the next admitted segment will carry.
    pub fn next_seq(&self) -> u16 {
        self.next_seq
    }

    /// Number of segments currently awaiting acknowledgement.
    pub fn in_flight(&self) -> usize {
        self.window.len()
    }

    /// `true` when at least one segment is awaiting acknowledgement.
    pub fn has_unacked(&self) -> bool {
        !self.window.is_empty()
    }

    /// `true` once the input stream has been exhausted.
    pub fn eof(&self) -> bool {
        self.eof
    }

    /// Record that the input stream is exhausted.
    pub fn mark_eof(&mut self) {
        self.eof = true;
    }

    /// `true` when every admitted segment has been acknowledged and no more
    /// input will arrive — the transfer is done.
    pub fn is_complete(&self) -> bool {
        self.eof && self.window.is_empty()
    }

    /// Current anchor of the retransmission timer.
    pub fn last_transmit(&self) -> Instant {
        self.last_transmit
    }

    /// `true` when a new segment may enter under both the static cap and the
    /// congestion window.
    pub fn can_admit(&self, cwnd: u32) -> bool {
        (self.window.len() as u32) < cwnd.min(u32::from(MAX_WINDOW))
    }

    /// Draw the nonce for the next outgoing datagram.
    ///
    /// Called once per transmission, including retransmissions — the peer
    /// suppresses duplicates by nonce, so a resent segment must not reuse
    /// the nonce of its previous copy.
    pub fn next_nonce(&mut self) -> u16 {
        let nonce = self.tx_nonce;
        self.tx_nonce = self.tx_nonce.wrapping_add(1);
        nonce
    }

    // -----------------------------------------------------------------------
    // State transitions
    // -----------------------------------------------------------------------

    /// Place a just-transmitted new segment into the window.
    ///
    /// Advances `next_seq`, stamps the send time, and restarts the
    /// retransmission clock.  Returns the sequence number the segment was
    /// assigned (equal to [`next_seq`] before the call).
    ///
    /// [`next_seq`]: SendState::next_seq
    pub fn record_new(&mut self, payload: Vec<u8>, now: Instant) -> u16 {
        let seq = self.next_seq;
        self.window.insert(seq, payload);
        self.sent_times.insert(seq, now);
        self.next_seq = self.next_seq.wrapping_add(1);
        self.last_transmit = now;
        seq
    }

    /// Process one decoded ack carrying cumulative sequence `acked`.
    pub fn on_ack(&mut self, nonce: u16, acked: u16, now: Instant) -> AckOutcome {
        if !self.ack_nonces.insert(nonce) {
            return AckOutcome::Ignored;
        }
        // An ack at or beyond next_seq names a segment never sent; only
        // corruption that slipped past the check byte produces one.
        if acked >= self.next_seq {
            return AckOutcome::Ignored;
        }

        if acked >= self.base {
            let mut retired = 0usize;
            while let Some((&seq, _)) = self.window.first_key_value() {
                if seq > acked {
                    break;
                }
                self.window.pop_first();
                retired += 1;
            }
            let sample = self
                .sent_times
                .remove(&acked)
                .map(|sent| now.duration_since(sent));
            self.sent_times.retain(|&seq, _| seq > acked);
            self.base = acked.wrapping_add(1);
            self.dup_count = 0;
            self.last_transmit = now;
            return AckOutcome::Advanced { retired, sample };
        }

        // Stale ack.  With nothing in flight there is nothing to recover.
        if self.window.is_empty() {
            return AckOutcome::Ignored;
        }

        self.dup_count += 1;
        if self.dup_count >= DUP_ACK_THRESHOLD {
            self.dup_count = 0;
            self.sent_times.remove(&self.base);
            if let Some(payload) = self.window.get(&self.base) {
                return AckOutcome::FastRetransmit {
                    seq: self.base,
                    payload: payload.clone(),
                };
            }
        }
        AckOutcome::Duplicate
    }

    /// Begin a timeout recovery sweep.
    ///
    /// Returns every unacknowledged segment, oldest first, for the caller to
    /// retransmit.  Their send times are cleared so the retransmissions do
    /// not contaminate the RTT estimator, and the retransmission clock is
    /// restarted.
    pub fn on_timeout(&mut self, now: Instant) -> Vec<(u16, Vec<u8>)> {
        self.sent_times.clear();
        self.last_transmit = now;
        self.window
            .iter()
            .map(|(&seq, payload)| (seq, payload.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
