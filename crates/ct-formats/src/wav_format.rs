//! WAV encoding and decoding for PCM audio.

use std::io::{Cursor, ErrorKind, Write};

use binrw::io::NoSeek;
use binrw::{binrw, BinRead, BinWrite};
use ct_engine::Frame;
use ct_ir::Sample;

use crate::FormatError;

/// Size of the canonical header written by [`write_wav`].
pub const WAV_HEADER_LEN: usize = 44;

const PCM_FORMAT: u16 = 1;
const OUT_CHANNELS: u16 = 2;
const OUT_BITS: u16 = 16;
const OUT_BLOCK_ALIGN: u16 = OUT_CHANNELS * (OUT_BITS / 8);
const FMT_CHUNK_LEN: u32 = 16;
const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

#[binrw]
#[brw(little, magic = b"RIFF")]
#[derive(Debug, Clone, Copy)]
struct RiffHeader {
    size: u32,
    form: [u8; 4],
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy)]
struct ChunkHeader {
    id: [u8; 4],
    size: u32,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy)]
struct FmtChunk {
    format: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

fn from_binrw(err: binrw::Error) -> FormatError {
    match err {
        binrw::Error::Io(err) if err.kind() == ErrorKind::UnexpectedEof => FormatError::UnexpectedEof,
        binrw::Error::Io(err) => FormatError::Io(err),
        _ => FormatError::InvalidHeader,
    }
}

// --- Writing ---

/// Write `frames` as a canonical 44-byte-header, 16-bit stereo PCM WAV.
pub fn write_wav(w: &mut impl Write, frames: &[Frame], sample_rate: u32) -> Result<(), FormatError> {
    let data_size = frames
        .len()
        .checked_mul(OUT_BLOCK_ALIGN as usize)
        .and_then(|bytes| u32::try_from(bytes).ok())
        .filter(|bytes| *bytes <= u32::MAX - 36)
        .ok_or(FormatError::TooLong { frames: frames.len() })?;

    let mut out = NoSeek::new(w);
    RiffHeader {
        size: 36 + data_size,
        form: *b"WAVE",
    }
    .write_le(&mut out)
    .map_err(from_binrw)?;
    ChunkHeader {
        id: *b"fmt ",
        size: FMT_CHUNK_LEN,
    }
    .write_le(&mut out)
    .map_err(from_binrw)?;
    FmtChunk {
        format: PCM_FORMAT,
        channels: OUT_CHANNELS,
        sample_rate,
        byte_rate: sample_rate * OUT_BLOCK_ALIGN as u32,
        block_align: OUT_BLOCK_ALIGN,
        bits_per_sample: OUT_BITS,
    }
    .write_le(&mut out)
    .map_err(from_binrw)?;
    ChunkHeader {
        id: *b"data",
        size: data_size,
    }
    .write_le(&mut out)
    .map_err(from_binrw)?;

    for frame in frames {
        out.write_all(&frame.to_le_bytes())?;
    }
    Ok(())
}

/// Encode `frames` into an in-memory WAV file.
pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Result<Vec<u8>, FormatError> {
    let mut buf = Vec::with_capacity(WAV_HEADER_LEN + frames.len() * OUT_BLOCK_ALIGN as usize);
    write_wav(&mut buf, frames, sample_rate)?;
    Ok(buf)
}

// --- Reading ---

/// Load a WAV file from raw bytes into a mono Sample. Stereo files are
/// averaged to mono; 8-bit data is widened to 16 bits.
pub fn load_wav(data: &[u8], name: &str) -> Result<Sample, FormatError> {
    let layout = parse_header(data)?;
    let end = layout.data_offset.saturating_add(layout.data_size).min(data.len());
    let raw = &data[layout.data_offset.min(end)..end];
    let pcm = match (layout.fmt.bits_per_sample, layout.fmt.channels) {
        (8, 1) => raw.iter().map(|&b| widen_8bit(b)).collect(),
        (8, 2) => raw
            .chunks_exact(2)
            .map(|c| average(widen_8bit(c[0]), widen_8bit(c[1])))
            .collect(),
        (16, 1) => raw.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]])).collect(),
        (16, 2) => raw
            .chunks_exact(4)
            .map(|c| average(i16::from_le_bytes([c[0], c[1]]), i16::from_le_bytes([c[2], c[3]])))
            .collect(),
        _ => return Err(unsupported(&layout.fmt)),
    };
    Ok(Sample::from_frames(name, pcm, layout.fmt.sample_rate))
}

struct WavLayout {
    fmt: FmtChunk,
    data_offset: usize,
    data_size: usize,
}

fn parse_header(data: &[u8]) -> Result<WavLayout, FormatError> {
    if data.len() < WAV_HEADER_LEN {
        return Err(FormatError::UnexpectedEof);
    }
    let mut cursor = Cursor::new(data);
    let riff = RiffHeader::read_le(&mut cursor).map_err(|_| FormatError::InvalidHeader)?;
    if riff.form != *b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }

    let mut pos = RIFF_HEADER_LEN;
    let mut fmt: Option<FmtChunk> = None;
    let mut data_chunk: Option<(usize, usize)> = None;

    while pos + CHUNK_HEADER_LEN <= data.len() {
        cursor.set_position(pos as u64);
        let chunk = ChunkHeader::read_le(&mut cursor).map_err(from_binrw)?;
        let body = pos + CHUNK_HEADER_LEN;
        let size = chunk.size as usize;

        match &chunk.id {
            b"fmt " if size >= FMT_CHUNK_LEN as usize => {
                fmt = Some(FmtChunk::read_le(&mut cursor).map_err(from_binrw)?);
            }
            b"data" => data_chunk = Some((body, size)),
            _ => {}
        }

        // Chunks are word aligned
        pos = body.saturating_add(size);
        if pos % 2 != 0 {
            pos += 1;
        }
    }

    let fmt = fmt.ok_or(FormatError::InvalidHeader)?;
    let (data_offset, data_size) = data_chunk.ok_or(FormatError::InvalidHeader)?;
    if fmt.format != PCM_FORMAT || !matches!(fmt.bits_per_sample, 8 | 16) || !(1..=2).contains(&fmt.channels) {
        return Err(unsupported(&fmt));
    }
    Ok(WavLayout {
        fmt,
        data_offset,
        data_size,
    })
}

fn unsupported(fmt: &FmtChunk) -> FormatError {
    FormatError::Unsupported {
        format: fmt.format,
        channels: fmt.channels,
        bits: fmt.bits_per_sample,
    }
}

/// 8-bit WAV is unsigned with 128 as the centre.
fn widen_8bit(b: u8) -> i16 {
    (b as i16 - 128) * 256
}

fn average(a: i16, b: i16) -> i16 {
    ((a as i32 + b as i32) / 2) as i16
}
