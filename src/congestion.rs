//! Congestion-window control: slow start, congestion avoidance, and the
//! multiplicative adjustments for fast retransmit and timeout.
//!
//! The window is measured in segments.  Growth is applied on **every**
//! processed ack, advancing or not.  In slow start each ack adds a full
//! segment; in avoidance an accumulator adds one segment per `cwnd` acks
//! (roughly one per round trip).
//!
//! Loss signals:
//! - **Fast retransmit** (triple duplicate ack): `ssthresh := cwnd / 2`,
//!   `cwnd := ssthresh + 3`.
//! - **Timeout**: `ssthresh := cwnd / 2`, `cwnd := 1`, back to slow start.

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const INITIAL_CWND: u32 = 1;
const INITIAL_SSTHRESH: u32 = 100;

/// Segments added to the halved threshold after a fast retransmit, one per
/// duplicate ack known to have left the network.
const FAST_RECOVERY_INFLATION: u32 = 3;

// ---------------------------------------------------------------------------
// CongestionController
// ---------------------------------------------------------------------------

/// Growth phase implied by the current `cwnd` / `ssthresh` relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Exponential growth: one segment per ack.
    SlowStart,
    /// Linear growth: one segment per window of acks.
    CongestionAvoidance,
}

#[derive(Debug)]
pub struct CongestionController {
    cwnd: u32,
    ssthresh: u32,
    /// Acks accumulated toward the next linear increment.
    avoid_acc: u32,
}

impl Default for CongestionController {
    fn default() -> Self {
        Self::new()
    }
}

impl CongestionController {
    pub fn new() -> Self {
        Self {
            cwnd: INITIAL_CWND,
            ssthresh: INITIAL_SSTHRESH,
            avoid_acc: 0,
        }
    }

    /// Current congestion window, in segments.
    pub fn window(&self) -> u32 {
        self.cwnd
    }

    /// Current slow-start threshold, in segments.
    pub fn ssthresh(&self) -> u32 {
        self.ssthresh
    }

    pub fn phase(&self) -> Phase {
        if self.cwnd < self.ssthresh {
            Phase::SlowStart
        } else {
            Phase::CongestionAvoidance
        }
    }

    /// Grow the window for one processed ack.
    pub fn on_ack(&mut self) {
        match self.phase() {
            Phase::SlowStart => self.cwnd += 1,
            Phase::CongestionAvoidance => {
                self.avoid_acc += 1;
                if self.avoid_acc >= self.cwnd {
                    self.avoid_acc -= self.cwnd;
                    self.cwnd += 1;
                }
            }
        }
    }

    /// Apply the fast-retransmit adjustment.
    pub fn on_fast_retransmit(&mut self) {
        self.ssthresh = self.cwnd / 2;
        self.cwnd = self.ssthresh + FAST_RECOVERY_INFLATION;
    }

    /// Collapse to slow start after a retransmission timeout.
    pub fn on_timeout(&mut self) {
        self.ssthresh = self.cwnd / 2;
        self.cwnd = INITIAL_CWND;
        self.avoid_acc = 0;
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_slow_start() {
        let cc = CongestionController::new();
        assert_eq!(cc.window(), 1);
        assert_eq!(cc.ssthresh(), 100);
        assert_eq!(cc.phase(), Phase::SlowStart);
    }

    #[test]
    fn slow_start_adds_one_per_ack() {
        let mut cc = CongestionController::new();
        for _ in 0..10 {
            cc.on_ack();
        }
        assert_eq!(cc.window(), 11);
        assert_eq!(cc.phase(), Phase::SlowStart);
    }

    #[test]
    fn reaching_threshold_enters_avoidance() {
        let mut cc = CongestionController::new();
        for _ in 0..99 {
            cc.on_ack();
        }
        assert_eq!(cc.window(), 100);
        assert_eq!(cc.phase(), Phase::CongestionAvoidance);
    }

    #[test]
    fn avoidance_adds_one_per_window_of_acks() {
        let mut cc = CongestionController::new();
        // Drop the threshold so we enter avoidance with a small window.
        cc.on_ack(); // cwnd 2
        cc.on_ack(); // cwnd 3
        cc.on_ack(); // cwnd 4
        cc.on_timeout(); // ssthresh 2, cwnd 1
        cc.on_ack(); // cwnd 2 == ssthresh → avoidance from here

        assert_eq!(cc.phase(), Phase::CongestionAvoidance);
        cc.on_ack();
        assert_eq!(cc.window(), 2); // 1 of 2 acks accumulated
        cc.on_ack();
        assert_eq!(cc.window(), 3); // second ack completes the window
        // Now 3 acks are needed for the next increment.
        cc.on_ack();
        cc.on_ack();
        assert_eq!(cc.window(), 3);
        cc.on_ack();
        assert_eq!(cc.window(), 4);
    }

    #[test]
    fn timeout_collapses_to_one() {
        let mut cc = CongestionController::new();
        for _ in 0..19 {
            cc.on_ack();
        }
        assert_eq!(cc.window(), 20);

        cc.on_timeout();
        assert_eq!(cc.window(), 1);
        assert_eq!(cc.ssthresh(), 10);
        assert_eq!(cc.phase(), Phase::SlowStart);
    }

    #[test]
    fn fast_retransmit_halves_and_inflates() {
        let mut cc = CongestionController::new();
        for _ in 0..9 {
            cc.on_ack();
        }
        assert_eq!(cc.window(), 10);

        cc.on_fast_retransmit();
        assert_eq!(cc.ssthresh(), 5);
        assert_eq!(cc.window(), 8);
        assert_eq!(cc.phase(), Phase::CongestionAvoidance);
    }

    #[test]
    fn repeated_timeouts_keep_halving_threshold() {
        let mut cc = CongestionController::new();
        for _ in 0..39 {
            cc.on_ack();
        }
        assert_eq!(cc.window(), 40);

        cc.on_timeout();
        assert_eq!(cc.ssthresh(), 20);
        cc.on_timeout();
        // cwnd was 1, so the threshold floors out.
        assert_eq!(cc.ssthresh(), 0);
        assert_eq!(cc.window(), 1);
        assert_eq!(cc.phase(), Phase::CongestionAvoidance);
    }
}
