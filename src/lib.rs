//! `rdt-over-udp` — a reliable, ordered byte stream over an unreliable
//! datagram link.
//!
//! # Architecture
//!
//! ```text
//!  stdin ──▶ ┌──────────┐   data frames   ┌──────────┐ ──▶ stdout
//!            │  Sender  │────────────────▶│ Receiver │
//!            └────┬─────┘                 └─────┬────┘
//!                 │         cumulative          │
//!                 │◀────────── ACKs ────────────┘
//!                 │
//!  ┌──────────────▼───────────────────┐
//!  │          endpoint loops          │
//!  │ (select over input/socket/timer) │
//!  └──────────────┬───────────────────┘
//!                 │ raw UDP datagrams (≤ 1500 bytes)
//!  ┌──────────────▼──┐
//!  │     Socket      │  (thin async wrapper around tokio UdpSocket)
//!  └─────────────────┘
//! ```
//!
//! The link may drop, duplicate, reorder, delay, or corrupt datagrams; the
//! two endpoints cooperate to deliver the sender's input byte-for-byte and
//! in order to the receiver's output.
//!
//! Each module has a single responsibility:
//! - [`frame`]      — wire format (MD5 tag, zlib body, ack layout)
//! - [`socket`]     — async UDP socket abstraction
//! - [`sender`]     — send-side sliding window and retransmit bookkeeping
//! - [`receiver`]   — receive-side reordering and duplicate suppression
//! - [`congestion`] — slow start / congestion avoidance window control
//! - [`timer`]      — adaptive round-trip-time estimation
//! - [`endpoint`]   — the sender and receiver control loops

pub mod congestion;
pub mod endpoint;
pub mod frame;
pub mod receiver;
pub mod sender;
pub mod socket;
pub mod timer;
