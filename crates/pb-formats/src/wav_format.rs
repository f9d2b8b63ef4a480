//! WAV encoding and decoding for 16-bit PCM audio.

use crate::FormatError;
use pb_engine::Frame;
use pb_ir::SampleBuffer;
use std::io::Write;
use std::path::Path;

// --- Writing ---

/// Write `frames` as 16-bit stereo PCM.
pub fn write_wav(w: &mut impl Write, frames: &[Frame], sample_rate: u32) -> std::io::Result<()> {
    let num_channels: u16 = 2;
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let data_size = frames.len() as u32 * block_align as u32;

    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")?;

    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&PCM_FORMAT.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())?;

    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for frame in frames {
        w.write_all(&frame.left.to_le_bytes())?;
        w.write_all(&frame.right.to_le_bytes())?;
    }
    Ok(())
}

pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(44 + frames.len() * 4);
    // Writing into a Vec only fails on allocation failure, which aborts.
    let _ = write_wav(&mut buf, frames, sample_rate);
    buf
}

// --- Reading ---

const PCM_FORMAT: u16 = 1;

/// Decode a 16-bit PCM WAV into a pad buffer. Stereo is averaged to mono.
///
/// The file's sample rate is not checked; pads always play at the native
/// rate.
pub fn load_wav(data: &[u8], name: &str) -> Result<SampleBuffer, FormatError> {
    let header = parse_header(data)?;
    let end = (header.data_offset + header.data_size).min(data.len());
    let raw = &data[header.data_offset..end];

    let samples = match header.num_channels {
        1 => raw
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect(),
        _ => raw
            .chunks_exact(4)
            .map(|c| {
                let l = i16::from_le_bytes([c[0], c[1]]) as i32;
                let r = i16::from_le_bytes([c[2], c[3]]) as i32;
                ((l + r) / 2) as i16
            })
            .collect(),
    };
    Ok(SampleBuffer::new(name, samples))
}

/// Read and decode a WAV file, naming the buffer after the file stem.
pub fn load_wav_file(path: impl AsRef<Path>) -> Result<SampleBuffer, FormatError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sample");
    load_wav(&bytes, name)
}

struct WavHeader {
    num_channels: u16,
    data_offset: usize,
    data_size: usize,
}

fn parse_header(data: &[u8]) -> Result<WavHeader, FormatError> {
    if data.len() < 12 {
        return Err(FormatError::UnexpectedEof);
    }
    if &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }

    let mut pos = 12;
    let mut fmt: Option<(u16, u16)> = None;
    let mut data_chunk: Option<(usize, usize)> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32_le(data, pos + 4) as usize;

        if chunk_id == b"fmt " {
            if chunk_size < 16 || pos + 24 > data.len() {
                return Err(FormatError::UnexpectedEof);
            }
            if read_u16_le(data, pos + 8) != PCM_FORMAT {
                return Err(FormatError::UnsupportedFormat("compressed or float data"));
            }
            let channels = read_u16_le(data, pos + 10);
            let bits = read_u16_le(data, pos + 22);
            fmt = Some((channels, bits));
        } else if chunk_id == b"data" {
            data_chunk = Some((pos + 8, chunk_size));
        }

        pos = pos.saturating_add(8 + chunk_size);
        if pos % 2 != 0 {
            pos += 1;
        }
    }

    let (num_channels, bits_per_sample) = fmt.ok_or(FormatError::InvalidHeader)?;
    let (data_offset, data_size) = data_chunk.ok_or(FormatError::UnexpectedEof)?;

    if bits_per_sample != 16 {
        return Err(FormatError::UnsupportedFormat("bit depth other than 16"));
    }
    if !(1..=2).contains(&num_channels) {
        return Err(FormatError::UnsupportedFormat("more than two channels"));
    }

    Ok(WavHeader {
        num_channels,
        data_offset,
        data_size,
    })
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}
