//! Framed binary encoding of chunk records.
//!
//! Each record is one frame:
//! `[len:4 BE][compression:1][crc32:4 BE][body:N]`, with `len = 5 + N`.
//! The body (after decompression) is
//! `[version:1][pos:3x i32 BE][size:3x u32 BE][biome:1][count:4 BE][blocks: count x u16 BE]`.
//!
//! The log has no header or record count. A reader that hits end-of-stream
//! exactly on a frame boundary gets `Ok(None)`; anything else is an error.

use std::io::{ErrorKind, Read, Write};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::chunk::ChunkRecord;
use crate::coords::{Biome, BlockType, ChunkPos};
use crate::layout::MAX_BLOCKS_PER_CHUNK;

pub const FORMAT_VERSION: u8 = 1;

const FRAME_PREFIX: usize = 4;
const FRAME_OVERHEAD: usize = 1 + 4;
const BODY_HEADER: usize = 1 + 12 + 12 + 1 + 4;
const MAX_BODY: usize = BODY_HEADER + MAX_BLOCKS_PER_CHUNK as usize * 2;
// Worst-case zlib expansion is a few bytes per 16K block; leave generous headroom.
const MAX_FRAME_LEN: usize = FRAME_OVERHEAD + MAX_BODY + MAX_BODY / 64 + 1024;

/// Body compression, codes shared with region-file conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Zlib,
    None,
}

impl Compression {
    pub fn code(self) -> u8 {
        match self {
            Compression::Zlib => 2,
            Compression::None => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            2 => Some(Compression::Zlib),
            3 => Some(Compression::None),
            _ => None,
        }
    }
}

impl FromStr for Compression {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zlib" => Ok(Compression::Zlib),
            "none" => Ok(Compression::None),
            other => Err(anyhow!("unknown compression {:?} (expected zlib or none)", other)),
        }
    }
}

fn encode_body(record: &ChunkRecord) -> Vec<u8> {
    let blocks = record.blocks();
    let mut body = Vec::with_capacity(BODY_HEADER + blocks.len() * 2);
    body.push(FORMAT_VERSION);
    for v in [record.pos.x, record.pos.y, record.pos.z] {
        body.extend_from_slice(&v.to_be_bytes());
    }
    for v in record.size() {
        body.extend_from_slice(&v.to_be_bytes());
    }
    body.push(record.biome.to_u8());
    body.extend_from_slice(&(blocks.len() as u32).to_be_bytes());
    for block in blocks {
        body.extend_from_slice(&block.0.to_be_bytes());
    }
    body
}

fn be_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn decode_body(body: &[u8]) -> Result<ChunkRecord> {
    if body.len() < BODY_HEADER {
        bail!("record body too short ({} bytes)", body.len());
    }
    if body[0] != FORMAT_VERSION {
        bail!("unsupported record version {} (expected {})", body[0], FORMAT_VERSION);
    }
    let pos = ChunkPos::new(
        be_u32(body, 1) as i32,
        be_u32(body, 5) as i32,
        be_u32(body, 9) as i32,
    );
    let size = [be_u32(body, 13), be_u32(body, 17), be_u32(body, 21)];
    let biome = Biome::from_u8(body[25]).ok_or_else(|| anyhow!("unknown biome tag {}", body[25]))?;
    let count = be_u32(body, 26) as usize;

    let data = &body[BODY_HEADER..];
    if data.len() != count * 2 {
        bail!(
            "chunk {} declares {} blocks but body holds {} bytes",
            pos,
            count,
            data.len()
        );
    }
    let blocks = data
        .chunks_exact(2)
        .map(|b| BlockType(u16::from_be_bytes([b[0], b[1]])))
        .collect();
    ChunkRecord::from_parts(pos, size, biome, blocks)
}

/// Encode one record as a complete frame.
pub fn encode_record(record: &ChunkRecord, compression: Compression) -> Result<Vec<u8>> {
    let body = encode_body(record);
    let stored = match compression {
        Compression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&body).context("Failed to compress chunk")?;
            encoder.finish().context("Failed to finish compression")?
        }
        Compression::None => body,
    };

    let mut frame = Vec::with_capacity(FRAME_PREFIX + FRAME_OVERHEAD + stored.len());
    let total_len = (FRAME_OVERHEAD + stored.len()) as u32;
    frame.extend_from_slice(&total_len.to_be_bytes());
    frame.push(compression.code());
    frame.extend_from_slice(&crc32fast::hash(&stored).to_be_bytes());
    frame.extend_from_slice(&stored);
    Ok(frame)
}

/// Encode and write one record, returning the number of bytes written.
pub fn write_record<W: Write>(out: &mut W, record: &ChunkRecord, compression: Compression) -> Result<usize> {
    let frame = encode_record(record, compression)?;
    out.write_all(&frame)
        .with_context(|| format!("Failed to write chunk {}", record.pos))?;
    Ok(frame.len())
}

/// Fill `buf` completely, or report how many bytes arrived before end-of-stream.
fn read_full<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("Failed to read chunk frame"),
        }
    }
    Ok(filled)
}

/// Read the next record, returning the record and the frame size in bytes.
///
/// `Ok(None)` means clean end-of-stream at a frame boundary.
pub fn read_record_sized<R: Read>(input: &mut R) -> Result<Option<(ChunkRecord, usize)>> {
    let mut prefix = [0u8; FRAME_PREFIX];
    match read_full(input, &mut prefix)? {
        0 => return Ok(None),
        FRAME_PREFIX => {}
        n => bail!("truncated frame: {} of {} length bytes", n, FRAME_PREFIX),
    }
    let len = u32::from_be_bytes(prefix) as usize;
    if !(FRAME_OVERHEAD..=MAX_FRAME_LEN).contains(&len) {
        bail!("invalid frame length {}", len);
    }

    let mut frame = vec![0u8; len];
    let got = read_full(input, &mut frame)?;
    if got != len {
        bail!("truncated frame: {} of {} bytes", got, len);
    }

    let compression = Compression::from_code(frame[0])
        .ok_or_else(|| anyhow!("unknown compression type {}", frame[0]))?;
    let checksum = be_u32(&frame, 1);
    let stored = &frame[FRAME_OVERHEAD..];
    if crc32fast::hash(stored) != checksum {
        bail!("frame checksum mismatch");
    }

    let record = match compression {
        Compression::Zlib => {
            let mut body = Vec::new();
            ZlibDecoder::new(stored)
                .take(MAX_BODY as u64 + 1)
                .read_to_end(&mut body)
                .context("Failed to decompress chunk")?;
            if body.len() > MAX_BODY {
                bail!("decompressed record exceeds {} bytes", MAX_BODY);
            }
            decode_body(&body)?
        }
        Compression::None => decode_body(stored)?,
    };
    Ok(Some((record, FRAME_PREFIX + len)))
}

/// Read the next record. `Ok(None)` means clean end-of-stream.
pub fn read_record<R: Read>(input: &mut R) -> Result<Option<ChunkRecord>> {
    Ok(read_record_sized(input)?.map(|(record, _)| record))
}
