//! Shared test support: a fault-injecting datagram relay and a transfer
//! driver that runs both endpoints over loopback.
//!
//! Real networks drop, duplicate, reorder, and corrupt packets.  The
//! integration tests put a [`Relay`] between the two endpoints and drive
//! its fault model from a seeded RNG so failures are reproducible.  The
//! sender aims at the relay's ingress address; the relay forwards toward
//! the receiver and routes acks back to wherever the sender's datagrams
//! came from.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::AsyncReadExt;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use rdt_over_udp::endpoint::{run_receiver, run_sender};
use rdt_over_udp::socket::Socket;

// ---------------------------------------------------------------------------
// Fault model
// ---------------------------------------------------------------------------

/// Fault model applied independently to every datagram, both directions.
///
/// All rates are probabilities in `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// Probability that a datagram is silently dropped.
    pub drop_rate: f64,
    /// Probability that a datagram is delivered twice.
    pub duplicate_rate: f64,
    /// Probability that one byte of a datagram is flipped.
    pub corrupt_rate: f64,
    /// Probability that a data-direction datagram is held back and released
    /// after its successor (adjacent swap).
    pub reorder_rate: f64,
    /// RNG seed, for reproducible runs.
    pub seed: u64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        // Transparent pass-through.
        Self {
            drop_rate: 0.0,
            duplicate_rate: 0.0,
            corrupt_rate: 0.0,
            reorder_rate: 0.0,
            seed: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Handle to a running relay task.
pub struct Relay {
    /// Address the sender should use as its peer.
    pub addr: SocketAddr,
    /// Data-direction datagrams that arrived from the sender, before faults.
    /// Equals the sender's transmission count.
    pub ingress_seen: Arc<AtomicUsize>,
    /// Datagrams forwarded toward the receiver, after faults (duplicates
    /// included, drops excluded).
    pub forwarded_data: Arc<AtomicUsize>,
}

/// Spawn a relay in front of `receiver_addr` and return its handle.
pub async fn spawn_relay(receiver_addr: SocketAddr, cfg: FaultConfig) -> Relay {
    let ingress = UdpSocket::bind("127.0.0.1:0").await.expect("bind ingress");
    let egress = UdpSocket::bind("127.0.0.1:0").await.expect("bind egress");
    let addr = ingress.local_addr().expect("ingress addr");

    let ingress_seen = Arc::new(AtomicUsize::new(0));
    let forwarded_data = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&ingress_seen);
    let forwarded = Arc::clone(&forwarded_data);

    tokio::spawn(async move {
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mut sender_addr: Option<SocketAddr> = None;
        let mut held: Option<Vec<u8>> = None;
        let mut to_recv = [0u8; 2048];
        let mut to_send = [0u8; 2048];

        loop {
            tokio::select! {
                // Data direction: sender → receiver.
                result = ingress.recv_from(&mut to_recv) => {
                    let Ok((n, from)) = result else { break };
                    seen.fetch_add(1, Ordering::SeqCst);
                    sender_addr = Some(from);

                    let mut out = Vec::new();
                    for frame in mangle(&to_recv[..n], &cfg, &mut rng) {
                        if held.is_none() && rng.gen_bool(cfg.reorder_rate) {
                            held = Some(frame);
                        } else {
                            out.push(frame);
                            if let Some(earlier) = held.take() {
                                out.push(earlier);
                            }
                        }
                    }
                    for frame in out {
                        if egress.send_to(&frame, receiver_addr).await.is_ok() {
                            forwarded.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
                // Ack direction: receiver → sender.
                result = egress.recv_from(&mut to_send) => {
                    let Ok((n, _)) = result else { break };
                    if let Some(dst) = sender_addr {
                        for frame in mangle(&to_send[..n], &cfg, &mut rng) {
                            let _ = ingress.send_to(&frame, dst).await;
                        }
                    }
                }
            }
        }
    });

    Relay {
        addr,
        ingress_seen,
        forwarded_data,
    }
}

/// Apply the stateless faults to one datagram: zero, one, or two copies out.
fn mangle(frame: &[u8], cfg: &FaultConfig, rng: &mut StdRng) -> Vec<Vec<u8>> {
    if rng.gen_bool(cfg.drop_rate) {
        return Vec::new();
    }
    let mut frame = frame.to_vec();
    if rng.gen_bool(cfg.corrupt_rate) {
        let idx = rng.gen_range(0..frame.len());
        frame[idx] ^= 0x20;
    }
    if rng.gen_bool(cfg.duplicate_rate) {
        return vec![frame.clone(), frame];
    }
    vec![frame]
}

// ---------------------------------------------------------------------------
// Transfer driver
// ---------------------------------------------------------------------------

/// Bind a socket on an OS-assigned loopback port.
pub async fn ephemeral() -> Socket {
    Socket::bind("127.0.0.1:0".parse().unwrap())
        .await
        .expect("bind failed")
}

/// Run a complete transfer of `input` through a relay configured with
/// `cfg`.  Returns the bytes the receiver emitted and the relay handle for
/// datagram accounting.
///
/// Panics if the sender does not finish successfully within `limit`, if
/// the receiver fails to emit the full stream, or if it emits anything
/// beyond it.
pub async fn run_transfer(input: Vec<u8>, cfg: FaultConfig, limit: Duration) -> (Vec<u8>, Relay) {
    let recv_socket = ephemeral().await;
    let relay = spawn_relay(recv_socket.local_addr, cfg).await;

    let (out_wr, mut out_rd) = tokio::io::duplex(1 << 20);
    let recv_task = tokio::spawn(run_receiver(recv_socket, out_wr));

    let send_socket = ephemeral().await;
    let peer = relay.addr;
    let expected_len = input.len();
    let send_task = tokio::spawn(async move { run_sender(send_socket, peer, Cursor::new(input)).await });

    timeout(limit, send_task)
        .await
        .expect("sender timed out")
        .expect("sender task panicked")
        .expect("sender failed");

    let mut output = vec![0u8; expected_len];
    if expected_len > 0 {
        timeout(Duration::from_secs(5), out_rd.read_exact(&mut output))
            .await
            .expect("receiver output timed out")
            .expect("receiver output closed early");
    }

    // The stream must end exactly here: nothing further may be emitted.
    let mut probe = [0u8; 1];
    match timeout(Duration::from_millis(200), out_rd.read(&mut probe)).await {
        Err(_elapsed) => {}
        Ok(Ok(0)) => {}
        Ok(Ok(n)) => panic!("receiver emitted {n} extra byte(s)"),
        Ok(Err(e)) => panic!("probe read failed: {e}"),
    }

    recv_task.abort();
    (output, relay)
}

/// Deterministic text-like input: compresses the way real streams do, so
/// every frame stays under the datagram ceiling.
pub fn text_stream(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let c = rng.gen_range(0..27u8);
            if c == 26 {
                b' '
            } else {
                b'a' + c
            }
        })
        .collect()
}
