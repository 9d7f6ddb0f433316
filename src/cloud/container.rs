//! Canonical linear-PCM container codec (spec.md §6).
//!
//! A 44-byte RIFF/WAVE/fmt /data header followed by interleaved
//! little-endian int16 samples. Manual byte-level encode/decode in the
//! style of the teacher's `protocol.rs` (explicit `TryFrom<u8>`/literal
//! tag matching rather than reaching for a general container library),
//! since this is a fixed wire format, not a file-format surface; `hound`
//! remains in the dependency graph for test-fixture WAV I/O but is not
//! used for the wire encode/decode path itself so the exact byte layout
//! spec.md §6 mandates is guaranteed.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContainerError {
    #[error("container too short: {0} bytes")]
    TooShort(usize),
    #[error("missing RIFF tag")]
    MissingRiff,
    #[error("missing WAVE tag")]
    MissingWave,
    #[error("missing data chunk")]
    MissingData,
    #[error("odd-length PCM payload")]
    OddLength,
}

const HEADER_LEN: usize = 44;

/// Encodes interleaved 16-bit PCM into the canonical 44-byte-header
/// container (spec.md §6 exact byte layout).
pub fn encode(pcm: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let data_size = (pcm.len() * 2) as u32;
    let byte_rate = sample_rate * channels as u32 * 2;
    let block_align = channels * 2;
    let file_size = 36 + data_size;

    let mut out = Vec::with_capacity(HEADER_LEN + pcm.len() * 2);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&file_size.to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());

    for sample in pcm {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

/// Decoded container contents.
pub struct Decoded {
    pub pcm: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Decodes a container, accepting arbitrary well-formed chunk sequences:
/// unknown chunks between `fmt ` and `data` are skipped, 2-byte aligned
/// (spec.md §6).
pub fn decode(bytes: &[u8]) -> Result<Decoded, ContainerError> {
    if bytes.len() < 12 {
        return Err(ContainerError::TooShort(bytes.len()));
    }
    if &bytes[0..4] != b"RIFF" {
        return Err(ContainerError::MissingRiff);
    }
    if &bytes[8..12] != b"WAVE" {
        return Err(ContainerError::MissingWave);
    }

    let mut sample_rate = 0u32;
    let mut channels = 0u16;
    let mut data: Option<&[u8]> = None;

    let mut pos = 12usize;
    while pos + 8 <= bytes.len() {
        let tag = &bytes[pos..pos + 4];
        let chunk_size = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap()) as usize;
        let body_start = pos + 8;
        let body_end = (body_start + chunk_size).min(bytes.len());
        let body = &bytes[body_start..body_end];

        match tag {
            b"fmt " if body.len() >= 16 => {
                channels = u16::from_le_bytes(body[2..4].try_into().unwrap());
                sample_rate = u32::from_le_bytes(body[4..8].try_into().unwrap());
            }
            b"data" => {
                data = Some(body);
            }
            _ => {}
        }

        // Chunks are 2-byte aligned; skip a pad byte if chunk_size is odd.
        pos = body_start + chunk_size + (chunk_size % 2);
    }

    let data = data.ok_or(ContainerError::MissingData)?;
    if data.len() % 2 != 0 {
        return Err(ContainerError::OddLength);
    }

    let pcm = data
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();

    Ok(Decoded {
        pcm,
        sample_rate,
        channels: channels.max(1),
    })
}
