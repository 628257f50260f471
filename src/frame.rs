//! Wire-format definitions for protocol frames.
//!
//! Every datagram on the link is one of two frames:
//!
//! - **Data frame** (sender → receiver): a 10-byte integrity tag (the MD5
//!   prefix of the body) followed by a zlib-compressed body of
//!   `nonce (u16 BE) || seq (u16 BE) || payload`.
//! - **Ack frame** (receiver → sender): 5 uncompressed bytes,
//!   `nonce (u16 BE) || check || seq (u16 BE)`, where `check` is
//!   `(seq_hi + seq_lo + 1) mod 256`.
//!
//! No I/O happens here — this is pure data transformation.  Decode failures
//! are returned as [`FrameError`] values so callers can discard bad frames
//! silently; nothing in this module panics on wire input.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of the integrity tag: the first 10 bytes of the body's MD5 digest.
pub const TAG_LEN: usize = 10;

/// On-wire size of an ack frame.
pub const ACK_LEN: usize = 5;

/// Ceiling on any single datagram placed on the wire.
pub const MAX_DATAGRAM: usize = 1500;

/// Maximum payload carried by one data frame, before compression.
pub const MAX_PAYLOAD: usize = 2500;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can arise when building or parsing a frame.
#[derive(Debug)]
pub enum FrameError {
    /// Datagram (or decompressed body) shorter than the fixed header fields.
    Truncated,
    /// The 10-byte tag does not match the MD5 digest of the body.
    TagMismatch,
    /// The body is not a valid zlib stream.
    Corrupt,
    /// An ack datagram whose length is not [`ACK_LEN`].
    BadLength,
    /// An ack whose check byte does not match its sequence bytes.
    ChecksumFailed,
    /// An encoded data frame would exceed [`MAX_DATAGRAM`] bytes.
    Oversize(usize),
    /// I/O error surfaced by the compressor.
    Io(std::io::Error),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated => write!(f, "frame too short"),
            Self::TagMismatch => write!(f, "integrity tag mismatch"),
            Self::Corrupt => write!(f, "body failed to decompress"),
            Self::BadLength => write!(f, "ack frame has wrong length"),
            Self::ChecksumFailed => write!(f, "ack check byte mismatch"),
            Self::Oversize(n) => {
                write!(f, "encoded frame is {n} bytes (limit {MAX_DATAGRAM})")
            }
            Self::Io(e) => write!(f, "compression I/O error: {e}"),
        }
    }
}

impl std::error::Error for FrameError {}

// ---------------------------------------------------------------------------
// Data frames
// ---------------------------------------------------------------------------

/// Encode one data segment into an on-wire datagram.
///
/// The body `nonce || seq || payload` is zlib-compressed at the default
/// level and prefixed with the first [`TAG_LEN`] bytes of its MD5 digest.
///
/// Returns [`FrameError::Oversize`] when the result would not fit in a
/// single datagram; payloads within [`MAX_PAYLOAD`] compress under the
/// limit for text-like streams, so an oversize frame indicates input the
/// deployment was not sized for and is treated as fatal by callers.
pub fn encode_data(nonce: u16, seq: u16, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    debug_assert!(
        payload.len() <= MAX_PAYLOAD,
        "payload of {} bytes exceeds the {} byte segment cap",
        payload.len(),
        MAX_PAYLOAD
    );

    let mut body = Vec::with_capacity(4 + payload.len());
    body.extend_from_slice(&nonce.to_be_bytes());
    body.extend_from_slice(&seq.to_be_bytes());
    body.extend_from_slice(payload);

    let mut encoder = ZlibEncoder::new(Vec::with_capacity(body.len()), Compression::default());
    encoder.write_all(&body).map_err(FrameError::Io)?;
    let compressed = encoder.finish().map_err(FrameError::Io)?;

    let digest = md5::compute(&compressed);
    let mut frame = Vec::with_capacity(TAG_LEN + compressed.len());
    frame.extend_from_slice(&digest.0[..TAG_LEN]);
    frame.extend_from_slice(&compressed);

    if frame.len() > MAX_DATAGRAM {
        return Err(FrameError::Oversize(frame.len()));
    }
    Ok(frame)
}

/// Parse an on-wire datagram into `(nonce, seq, payload)`.
///
/// Verifies the MD5 prefix tag before decompressing; any failure means the
/// datagram was mangled in transit and the caller should drop it silently.
pub fn decode_data(datagram: &[u8]) -> Result<(u16, u16, Vec<u8>), FrameError> {
    if datagram.len() <= TAG_LEN {
        return Err(FrameError::Truncated);
    }
    let (tag, body) = datagram.split_at(TAG_LEN);

    let digest = md5::compute(body);
    if tag != &digest.0[..TAG_LEN] {
        return Err(FrameError::TagMismatch);
    }

    let mut plain = Vec::new();
    ZlibDecoder::new(body)
        .read_to_end(&mut plain)
        .map_err(|_| FrameError::Corrupt)?;

    if plain.len() < 4 {
        return Err(FrameError::Truncated);
    }
    let nonce = u16::from_be_bytes([plain[0], plain[1]]);
    let seq = u16::from_be_bytes([plain[2], plain[3]]);
    Ok((nonce, seq, plain[4..].to_vec()))
}

// ---------------------------------------------------------------------------
// Ack frames
// ---------------------------------------------------------------------------

/// Encode a cumulative ack for sequence `seq` into its 5-byte wire form.
pub fn encode_ack(nonce: u16, seq: u16) -> [u8; ACK_LEN] {
    let [nonce_hi, nonce_lo] = nonce.to_be_bytes();
    let [seq_hi, seq_lo] = seq.to_be_bytes();
    let check = seq_hi.wrapping_add(seq_lo).wrapping_add(1);
    [nonce_hi, nonce_lo, check, seq_hi, seq_lo]
}

/// Parse an ack datagram into `(nonce, seq)`.
///
/// The check byte catches single-bit flips in the sequence field; replay
/// suppression by nonce is the caller's concern.
pub fn decode_ack(datagram: &[u8]) -> Result<(u16, u16), FrameError> {
    if datagram.len() != ACK_LEN {
        return Err(FrameError::BadLength);
    }
    let nonce = u16::from_be_bytes([datagram[0], datagram[1]]);
    let expected = datagram[3].wrapping_add(datagram[4]).wrapping_add(1);
    if datagram[2] != expected {
        return Err(FrameError::ChecksumFailed);
    }
    let seq = u16::from_be_bytes([datagram[3], datagram[4]]);
    Ok((nonce, seq))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
