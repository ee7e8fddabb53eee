//! Codec for the container runtime's multiplexed attach stream.
//!
//! An exec attach carries stdout and stderr interleaved as frames. Each
//! frame starts with an 8-byte header: byte 0 is the stream kind (`1`
//! stdout, `2` stderr), bytes 1–3 are reserved, bytes 4–7 are a big-endian
//! u32 payload length, followed by that many payload bytes.
//!
//! [`demultiplex`] is pure and total: malformed tails degrade to shorter
//! output instead of errors, since a killed process can truncate the stream
//! at any byte.

/// Stream kind carried in byte 0 of a frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn byte(self) -> u8 {
        match self {
            StreamKind::Stdout => 1,
            StreamKind::Stderr => 2,
        }
    }
}

const HEADER_LEN: usize = 8;

/// Appends one framed payload to `buf`.
///
/// Used by the docker driver to keep its exec output on the wire framing,
/// and by tests to script streams.
pub fn encode_frame(buf: &mut Vec<u8>, kind: StreamKind, payload: &[u8]) {
    let mut header = [0u8; HEADER_LEN];
    header[0] = kind.byte();
    header[4..8].copy_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(&header);
    buf.extend_from_slice(payload);
}

/// Splits a multiplexed byte sequence into `(stdout, stderr)`.
///
/// A trailing partial header (fewer than 8 bytes) is discarded. A frame
/// whose declared length exceeds the remaining buffer terminates parsing.
/// Frames with an unknown stream kind are skipped, payload included.
pub fn demultiplex(buf: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut offset = 0;

    while buf.len() - offset >= HEADER_LEN {
        let kind = buf[offset];
        let declared = u32::from_be_bytes([
            buf[offset + 4],
            buf[offset + 5],
            buf[offset + 6],
            buf[offset + 7],
        ]) as usize;
        offset += HEADER_LEN;

        if declared > buf.len() - offset {
            break;
        }

        let payload = &buf[offset..offset + declared];
        match kind {
            1 => stdout.extend_from_slice(payload),
            2 => stderr.extend_from_slice(payload),
            _ => {}
        }
        offset += declared;
    }

    (stdout, stderr)
}
