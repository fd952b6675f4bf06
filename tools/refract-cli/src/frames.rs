//! Reading and writing frame files.

use anyhow::{anyhow, bail, Context};
use clap::ValueEnum;
use refract_protocol::{decode_records, encode_records, Frame, FrameBatch};
use rkyv::AlignedVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Validated zero-copy archive of a frame batch
    Archive,
    /// Concatenated binary records (id, then encoded frame)
    Records,
    /// One `id<TAB>canonical frame` line per frame
    Text,
    /// The frame batch as JSON
    Json,
}

pub fn encode(frames: Vec<Frame>, format: Format) -> anyhow::Result<Vec<u8>> {
    match format {
        Format::Archive => {
            let batch = FrameBatch::new(frames);
            let bytes = rkyv::to_bytes::<_, 256>(&batch).map_err(|e| anyhow!("failed to archive frames: {e}"))?;
            Ok(bytes.into_vec())
        }
        Format::Records => Ok(encode_records(&frames)?),
        Format::Text => {
            let mut out = String::new();
            for frame in &frames {
                out.push_str(&format!("{}\t{}\n", frame.id, frame));
            }
            Ok(out.into_bytes())
        }
        Format::Json => Ok(serde_json::to_vec_pretty(&FrameBatch::new(frames))?),
    }
}

fn checked(batch: FrameBatch) -> anyhow::Result<Vec<Frame>> {
    if batch.version != FrameBatch::CURRENT_VERSION {
        bail!(
            "frame batch version {} is not supported (expected {})",
            batch.version,
            FrameBatch::CURRENT_VERSION
        );
    }
    Ok(batch.frames)
}

/// Reads an archive when `bytes` validates as one, then tries a JSON
/// batch, and falls back to a record stream.
pub fn decode(bytes: &[u8]) -> anyhow::Result<Vec<Frame>> {
    let mut aligned = AlignedVec::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);
    if let Ok(batch) = rkyv::from_bytes::<FrameBatch>(&aligned) {
        return checked(batch);
    }
    if bytes.first() == Some(&b'{') {
        if let Ok(batch) = serde_json::from_slice::<FrameBatch>(bytes) {
            return checked(batch);
        }
    }
    decode_records(bytes).context("input is neither a frame archive nor a record stream")
}
