//! The sender and receiver control loops.
//!
//! Each endpoint is one cooperative task.  [`run_sender`] multiplexes three
//! concerns with `tokio::select!`:
//!
//! 1. **Admission** — while the window has room under both the static cap
//!    and the congestion window, read the next input chunk and ship it.
//! 2. **Ack processing** — retire acknowledged segments, feed the RTT
//!    estimator, grow the congestion window, and fire fast retransmits.
//! 3. **Timer** — when the oldest outstanding data has gone unanswered past
//!    the retransmission deadline, collapse the congestion window and
//!    resend everything still in flight.
//!
//! [`run_receiver`] blocks on socket readability, reorders and deduplicates
//! inbound segments, emits in-order bytes, and answers every valid frame
//! with a cumulative ack.  It never exits on its own; its parent terminates
//! it once the sender reports completion.

use std::net::SocketAddr;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{self, Instant as TokioInstant};

use crate::congestion::CongestionController;
use crate::frame::{self, FrameError, MAX_DATAGRAM, MAX_PAYLOAD};
use crate::receiver::RecvState;
use crate::sender::{AckOutcome, SendState};
use crate::socket::Socket;
use crate::timer::RttEstimator;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Fatal endpoint failures.
///
/// Everything recoverable from the wire (corruption, duplication, loss,
/// foreign senders) is absorbed inside the loops; what escapes here is a
/// local I/O failure or a frame the deployment cannot carry.
#[derive(Debug)]
pub enum TransferError {
    /// Socket or standard-stream I/O error.
    Io(std::io::Error),
    /// Frame encoding failed (an incompressible segment outgrew the
    /// datagram ceiling).
    Frame(FrameError),
}

impl std::fmt::Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Frame(e) => write!(f, "frame error: {e}"),
        }
    }
}

impl std::error::Error for TransferError {}

impl From<std::io::Error> for TransferError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<FrameError> for TransferError {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Sender loop
// ---------------------------------------------------------------------------

/// Stream `input` to `peer` until it is exhausted and fully acknowledged.
pub async fn run_sender<R>(
    socket: Socket,
    peer: SocketAddr,
    mut input: R,
) -> Result<(), TransferError>
where
    R: AsyncRead + Unpin,
{
    let mut send = SendState::new(Instant::now());
    let mut cc = CongestionController::new();
    let mut rtt = RttEstimator::new();

    let mut chunk = vec![0u8; MAX_PAYLOAD];
    let mut dgram = [0u8; MAX_DATAGRAM];

    log::info!("[send] streaming to {peer}");

    loop {
        if send.is_complete() {
            log::info!(
                "[send] transfer complete, {} segment(s) delivered",
                send.next_seq() - 1
            );
            return Ok(());
        }

        let deadline = TokioInstant::from_std(send.last_transmit() + rtt.timeout());

        tokio::select! {
            // ── Branch 1: admit a new segment ────────────────────────────
            // Only eligible while input remains and the window has room.
            read = input.read(&mut chunk), if !send.eof() && send.can_admit(cc.window()) => {
                let n = read?;
                if n == 0 {
                    send.mark_eof();
                    log::debug!("[send] input exhausted, {} segment(s) total", send.next_seq() - 1);
                    continue;
                }
                let seq = send.next_seq();
                let nonce = send.next_nonce();
                let datagram = frame::encode_data(nonce, seq, &chunk[..n])?;
                socket.send_to(&datagram, peer).await?;
                send.record_new(chunk[..n].to_vec(), Instant::now());
                log::debug!(
                    "[send] → DATA seq={seq} len={n} in_flight={} cwnd={}",
                    send.in_flight(),
                    cc.window()
                );
            }

            // ── Branch 2: inbound ack ────────────────────────────────────
            result = socket.recv_from(&mut dgram) => {
                let (n, addr) = result?;
                if addr != peer {
                    log::warn!("[send] ignoring datagram from unexpected source {addr}");
                    continue;
                }
                let (nonce, acked) = match frame::decode_ack(&dgram[..n]) {
                    Ok(ack) => ack,
                    Err(e) => {
                        log::debug!("[send] dropping bad ack: {e}");
                        continue;
                    }
                };
                match send.on_ack(nonce, acked, Instant::now()) {
                    AckOutcome::Advanced { retired, sample } => {
                        if let Some(sample) = sample {
                            rtt.record_sample(sample);
                        }
                        cc.on_ack();
                        log::debug!(
                            "[send] ← ACK {acked} retired={retired} cwnd={} rto={:?}",
                            cc.window(),
                            rtt.rto()
                        );
                    }
                    AckOutcome::Duplicate => {
                        cc.on_ack();
                    }
                    AckOutcome::FastRetransmit { seq, payload } => {
                        let nonce = send.next_nonce();
                        let datagram = frame::encode_data(nonce, seq, &payload)?;
                        socket.send_to(&datagram, peer).await?;
                        cc.on_fast_retransmit();
                        log::debug!(
                            "[send] fast retransmit seq={seq} cwnd={} ssthresh={}",
                            cc.window(),
                            cc.ssthresh()
                        );
                    }
                    AckOutcome::Ignored => {}
                }
            }

            // ── Branch 3: retransmission timeout ─────────────────────────
            _ = time::sleep_until(deadline), if send.has_unacked() => {
                cc.on_timeout();
                let resend = send.on_timeout(Instant::now());
                log::debug!(
                    "[send] timeout — retransmitting {} segment(s), cwnd={} ssthresh={}",
                    resend.len(),
                    cc.window(),
                    cc.ssthresh()
                );
                for (seq, payload) in resend {
                    let nonce = send.next_nonce();
                    let datagram = frame::encode_data(nonce, seq, &payload)?;
                    socket.send_to(&datagram, peer).await?;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Receiver loop
// ---------------------------------------------------------------------------

/// Deliver the peer's stream to `output`, acking every valid frame.
///
/// The peer address is latched from the first datagram that decodes; later
/// traffic from anywhere else is ignored with a warning.  This function
/// only returns on a fatal local error — shutdown comes from outside.
pub async fn run_receiver<W>(socket: Socket, mut output: W) -> Result<(), TransferError>
where
    W: AsyncWrite + Unpin,
{
    let mut state = RecvState::new();
    let mut peer: Option<SocketAddr> = None;
    let mut dgram = [0u8; MAX_DATAGRAM];

    loop {
        let (n, addr) = socket.recv_from(&mut dgram).await?;
        if let Some(peer) = peer {
            if addr != peer {
                log::warn!("[recv] ignoring datagram from unexpected source {addr}");
                continue;
            }
        }

        let (nonce, seq, payload) = match frame::decode_data(&dgram[..n]) {
            Ok(parts) => parts,
            Err(e) => {
                log::debug!("[recv] dropping bad frame: {e}");
                continue;
            }
        };
        if peer.is_none() {
            log::info!("[recv] peer latched: {addr}");
            peer = Some(addr);
        }
        if !state.register_nonce(nonce) {
            log::debug!("[recv] duplicate datagram nonce={nonce} seq={seq}");
            continue;
        }

        let len = payload.len();
        let ready = state.on_segment(seq, payload);
        if !ready.is_empty() {
            output.write_all(&ready).await?;
            output.flush().await?;
        }

        let ack = frame::encode_ack(state.next_nonce(), state.ack_value());
        socket.send_to(&ack, addr).await?;
        log::debug!(
            "[recv] ← DATA seq={seq} len={len} delivered={} buffered={}; → ACK {}",
            ready.len(),
            state.buffered(),
            state.ack_value()
        );
    }
}
