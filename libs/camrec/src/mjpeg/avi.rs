// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! AVI 1.0 (RIFF) container holding a single MJPEG video stream.
//!
//! Layout:
//!
//! ```text
//! RIFF 'AVI '
//!   LIST 'hdrl'
//!     avih                      main header
//!     LIST 'strl'
//!       strh 'vids' 'MJPG'      stream header
//!       strf                    BITMAPINFOHEADER
//!   LIST 'movi'
//!     00dc <jpeg> ...           one chunk per frame, padded to even length
//!   idx1                        one 16-byte entry per frame
//! ```
//!
//! Headers are written with placeholder counts on open and rewritten in
//! place by [`AviWriter::finish`].

use std::io::{Seek, SeekFrom, Write};

use crate::core::{RecorderError, Result};

const AVIF_HASINDEX: u32 = 0x10;
const AVIIF_KEYFRAME: u32 = 0x10;

/// Offset of the `'movi'` FourCC; `idx1` offsets are relative to it.
const MOVI_TAG_OFFSET: u64 = 220;
/// Bytes before the first frame chunk.
pub const HEADER_LEN: u64 = 224;
/// Chunk header: FourCC + size.
pub const CHUNK_HEADER_LEN: u64 = 8;
/// One `idx1` entry.
pub const INDEX_ENTRY_LEN: u64 = 16;

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    offset: u32,
    size: u32,
}

/// Streaming AVI writer over any seekable sink.
pub struct AviWriter<W: Write + Seek> {
    inner: W,
    frame_rate: f64,
    width: u32,
    height: u32,
    index: Vec<IndexEntry>,
    movi_bytes: u64,
    max_chunk: u32,
}

impl<W: Write + Seek> AviWriter<W> {
    /// Start a new container. `frame_rate` must be positive.
    pub fn new(mut inner: W, frame_rate: f64) -> Result<Self> {
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(RecorderError::Encoding(format!(
                "invalid frame rate {}",
                frame_rate
            )));
        }
        inner.seek(SeekFrom::Start(0))?;
        let mut writer = Self {
            inner,
            frame_rate,
            width: 0,
            height: 0,
            index: Vec::new(),
            movi_bytes: 0,
            max_chunk: 0,
        };
        writer.write_headers()?;
        Ok(writer)
    }

    /// Frame geometry recorded in the headers.
    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn frame_count(&self) -> usize {
        self.index.len()
    }

    /// Current file length without the trailing index.
    pub fn len(&self) -> u64 {
        HEADER_LEN + self.movi_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// File length after appending a `payload_len` frame and finishing.
    pub fn projected_len(&self, payload_len: usize) -> u64 {
        let frames = self.index.len() as u64 + 1;
        self.len() + chunk_len(payload_len) + CHUNK_HEADER_LEN + frames * INDEX_ENTRY_LEN
    }

    /// Append one JPEG image as a keyframe chunk.
    pub fn write_frame(&mut self, jpeg: &[u8]) -> Result<()> {
        let size = u32::try_from(jpeg.len())
            .map_err(|_| RecorderError::Encoding("frame exceeds 4 GiB".into()))?;
        let offset = u32::try_from(self.len() - MOVI_TAG_OFFSET)
            .map_err(|_| RecorderError::Encoding("AVI file exceeds 4 GiB".into()))?;

        self.inner.write_all(b"00dc")?;
        self.inner.write_all(&size.to_le_bytes())?;
        self.inner.write_all(jpeg)?;
        if jpeg.len() % 2 == 1 {
            self.inner.write_all(&[0])?;
        }

        self.index.push(IndexEntry { offset, size });
        self.movi_bytes += chunk_len(jpeg.len());
        self.max_chunk = self.max_chunk.max(size);
        Ok(())
    }

    /// Write the index, patch the headers and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        let index_len = self.index.len() as u64 * INDEX_ENTRY_LEN;
        let mut idx = Vec::with_capacity((CHUNK_HEADER_LEN + index_len) as usize);
        idx.extend_from_slice(b"idx1");
        put_u32(&mut idx, riff_u32(index_len)?);
        for entry in &self.index {
            idx.extend_from_slice(b"00dc");
            put_u32(&mut idx, AVIIF_KEYFRAME);
            put_u32(&mut idx, entry.offset);
            put_u32(&mut idx, entry.size);
        }
        self.inner.seek(SeekFrom::Start(self.len()))?;
        self.inner.write_all(&idx)?;

        let total = self.len() + CHUNK_HEADER_LEN + index_len;
        self.inner.seek(SeekFrom::Start(0))?;
        self.write_headers_with(riff_u32(total - 8)?)?;
        self.inner.seek(SeekFrom::End(0))?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn write_headers(&mut self) -> Result<()> {
        // RIFF size is patched on finish.
        self.write_headers_with(0)
    }

    fn write_headers_with(&mut self, riff_size: u32) -> Result<()> {
        let frames = self.index.len() as u32;
        let (scale, rate) = rate_fraction(self.frame_rate);
        let micros_per_frame = (1_000_000.0 / self.frame_rate).round() as u32;
        let max_bytes_per_sec = (self.max_chunk as f64 * self.frame_rate).ceil() as u32;

        let mut h = Vec::with_capacity(HEADER_LEN as usize);
        h.extend_from_slice(b"RIFF");
        put_u32(&mut h, riff_size);
        h.extend_from_slice(b"AVI ");

        h.extend_from_slice(b"LIST");
        put_u32(&mut h, 192);
        h.extend_from_slice(b"hdrl");

        h.extend_from_slice(b"avih");
        put_u32(&mut h, 56);
        put_u32(&mut h, micros_per_frame);
        put_u32(&mut h, max_bytes_per_sec);
        put_u32(&mut h, 0); // padding granularity
        put_u32(&mut h, AVIF_HASINDEX);
        put_u32(&mut h, frames);
        put_u32(&mut h, 0); // initial frames
        put_u32(&mut h, 1); // streams
        put_u32(&mut h, self.max_chunk);
        put_u32(&mut h, self.width);
        put_u32(&mut h, self.height);
        h.extend_from_slice(&[0u8; 16]);

        h.extend_from_slice(b"LIST");
        put_u32(&mut h, 116);
        h.extend_from_slice(b"strl");

        h.extend_from_slice(b"strh");
        put_u32(&mut h, 56);
        h.extend_from_slice(b"vids");
        h.extend_from_slice(b"MJPG");
        put_u32(&mut h, 0); // flags
        put_u16(&mut h, 0); // priority
        put_u16(&mut h, 0); // language
        put_u32(&mut h, 0); // initial frames
        put_u32(&mut h, scale);
        put_u32(&mut h, rate);
        put_u32(&mut h, 0); // start
        put_u32(&mut h, frames);
        put_u32(&mut h, self.max_chunk);
        put_u32(&mut h, u32::MAX); // quality: driver default
        put_u32(&mut h, 0); // sample size
        put_u16(&mut h, 0);
        put_u16(&mut h, 0);
        put_u16(&mut h, self.width.min(u16::MAX as u32) as u16);
        put_u16(&mut h, self.height.min(u16::MAX as u32) as u16);

        h.extend_from_slice(b"strf");
        put_u32(&mut h, 40);
        put_u32(&mut h, 40);
        put_u32(&mut h, self.width);
        put_u32(&mut h, self.height);
        put_u16(&mut h, 1); // planes
        put_u16(&mut h, 24); // bit count
        h.extend_from_slice(b"MJPG");
        put_u32(&mut h, self.width.saturating_mul(self.height).saturating_mul(3));
        h.extend_from_slice(&[0u8; 16]);

        h.extend_from_slice(b"LIST");
        put_u32(&mut h, riff_u32(4 + self.movi_bytes)?);
        h.extend_from_slice(b"movi");

        debug_assert_eq!(h.len() as u64, HEADER_LEN);
        self.inner.write_all(&h)?;
        Ok(())
    }
}

/// Bytes a frame chunk occupies, header and pad byte included.
fn chunk_len(payload_len: usize) -> u64 {
    CHUNK_HEADER_LEN + payload_len as u64 + (payload_len as u64 % 2)
}

/// `dwScale`/`dwRate` pair for a frame rate, millihertz precision.
fn rate_fraction(frame_rate: f64) -> (u32, u32) {
    let rate = (frame_rate * 1000.0).round().max(1.0) as u32;
    (1000, rate)
}

fn riff_u32(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| RecorderError::Encoding("AVI file exceeds 4 GiB".into()))
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    /// Minimal reader for what this writer produces.
    pub(crate) struct ParsedAvi {
        pub riff_size: u32,
        pub total_frames: u32,
        pub width: u32,
        pub height: u32,
        pub rate: u32,
        pub scale: u32,
        pub chunks: Vec<Vec<u8>>,
        pub index: Vec<(u32, u32)>,
    }

    pub(crate) fn parse(bytes: &[u8]) -> ParsedAvi {
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"AVI ");
        assert_eq!(&bytes[12..16], b"LIST");
        assert_eq!(&bytes[20..24], b"hdrl");
        assert_eq!(&bytes[24..28], b"avih");
        assert_eq!(&bytes[100..104], b"strh");
        assert_eq!(&bytes[108..112], b"vids");
        assert_eq!(&bytes[112..116], b"MJPG");
        assert_eq!(&bytes[164..168], b"strf");
        assert_eq!(&bytes[212..216], b"LIST");
        assert_eq!(&bytes[220..224], b"movi");

        let movi_end = 220 + u32_at(bytes, 216) as usize;
        let mut chunks = Vec::new();
        let mut at = 224;
        while at < movi_end {
            assert_eq!(&bytes[at..at + 4], b"00dc");
            let size = u32_at(bytes, at + 4) as usize;
            chunks.push(bytes[at + 8..at + 8 + size].to_vec());
            at += 8 + size + size % 2;
        }

        assert_eq!(&bytes[at..at + 4], b"idx1");
        let entries = u32_at(bytes, at + 4) as usize / 16;
        let index = (0..entries)
            .map(|i| {
                let e = at + 8 + i * 16;
                assert_eq!(&bytes[e..e + 4], b"00dc");
                assert_eq!(u32_at(bytes, e + 4), AVIIF_KEYFRAME);
                (u32_at(bytes, e + 8), u32_at(bytes, e + 12))
            })
            .collect();

        ParsedAvi {
            riff_size: u32_at(bytes, 4),
            total_frames: u32_at(bytes, 48),
            width: u32_at(bytes, 64),
            height: u32_at(bytes, 68),
            scale: u32_at(bytes, 128),
            rate: u32_at(bytes, 132),
            chunks,
            index,
        }
    }

    #[test]
    fn test_empty_container_is_well_formed() {
        let writer = AviWriter::new(Cursor::new(Vec::new()), 30.0).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert_eq!(bytes.len() as u64, HEADER_LEN + CHUNK_HEADER_LEN);
        let avi = parse(&bytes);
        assert_eq!(avi.riff_size as usize, bytes.len() - 8);
        assert_eq!(avi.total_frames, 0);
        assert!(avi.chunks.is_empty());
    }

    #[test]
    fn test_frames_chunks_and_index_agree() {
        let mut writer = AviWriter::new(Cursor::new(Vec::new()), 29.97).unwrap();
        writer.set_dimensions(720, 540);
        writer.write_frame(&[1, 2, 3]).unwrap();
        writer.write_frame(&[4, 5, 6, 7]).unwrap();
        assert_eq!(writer.frame_count(), 2);

        let expected_len = writer.len() + CHUNK_HEADER_LEN + 2 * INDEX_ENTRY_LEN;
        let bytes = writer.finish().unwrap().into_inner();
        assert_eq!(bytes.len() as u64, expected_len);

        let avi = parse(&bytes);
        assert_eq!(avi.riff_size as usize, bytes.len() - 8);
        assert_eq!(avi.total_frames, 2);
        assert_eq!((avi.width, avi.height), (720, 540));
        assert_eq!((avi.scale, avi.rate), (1000, 29970));
        assert_eq!(avi.chunks, vec![vec![1, 2, 3], vec![4, 5, 6, 7]]);
        // Odd chunk is padded, so the second starts 12 bytes after the first.
        assert_eq!(avi.index, vec![(4, 3), (16, 4)]);
    }

    #[test]
    fn test_projected_len_matches_finished_size() {
        let mut writer = AviWriter::new(Cursor::new(Vec::new()), 10.0).unwrap();
        writer.write_frame(&[0; 101]).unwrap();
        let projected = writer.projected_len(55);
        writer.write_frame(&[0; 55]).unwrap();

        let bytes = writer.finish().unwrap().into_inner();
        assert_eq!(bytes.len() as u64, projected);
    }

    #[test]
    fn test_rejects_bad_frame_rate() {
        assert!(AviWriter::new(Cursor::new(Vec::new()), 0.0).is_err());
        assert!(AviWriter::new(Cursor::new(Vec::new()), f64::NAN).is_err());
    }
}
