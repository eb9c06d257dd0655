// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::PixelFormat;

/// Frame as delivered by the device, still owned by its acquisition queue.
///
/// Rows are `stride` bytes apart; the buffer holds
/// `height + y_padding` rows, each carrying `x_padding` trailing pixels
/// beyond the logical width.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// Device-assigned sequence number, used to match releases.
    pub frame_id: u64,
    /// Monotonic timestamp in nanoseconds.
    pub timestamp_ns: i64,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub x_padding: u32,
    pub y_padding: u32,
    /// Bytes per row including padding. Zero for compressed formats.
    pub stride: usize,
    pub data: Vec<u8>,
    /// Transfer lost or corrupted part of the image.
    pub incomplete: bool,
}

impl RawFrame {
    /// Packed frame without padding.
    pub fn packed(
        frame_id: u64,
        format: PixelFormat,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> Self {
        let stride = format
            .bytes_per_pixel()
            .map(|bpp| width as usize * bpp)
            .unwrap_or(0);
        Self {
            frame_id,
            timestamp_ns: 0,
            format,
            width,
            height,
            x_padding: 0,
            y_padding: 0,
            stride,
            data,
            incomplete: false,
        }
    }

    pub fn with_padding(mut self, x_padding: u32, y_padding: u32) -> Self {
        self.x_padding = x_padding;
        self.y_padding = y_padding;
        if let Some(bpp) = self.format.bytes_per_pixel() {
            self.stride = (self.width + x_padding) as usize * bpp;
        }
        self
    }

    pub fn with_timestamp(mut self, timestamp_ns: i64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    pub fn mark_incomplete(mut self) -> Self {
        self.incomplete = true;
        self
    }

    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    /// Bytes a complete buffer must hold, `None` for compressed formats.
    pub fn expected_len(&self) -> Option<usize> {
        self.format.bytes_per_pixel()?;
        Some(self.stride * (self.height + self.y_padding) as usize)
    }
}

/// Deep copy of a frame converted to BGR8.
///
/// Keeps the source padding so the preview can wrap the buffer with the
/// padded stride, the same way the device laid it out.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedFrame {
    pub frame_id: u64,
    pub timestamp_ns: i64,
    pub width: u32,
    pub height: u32,
    pub x_padding: u32,
    pub y_padding: u32,
    /// Bytes per row: `(width + x_padding) * 3`.
    pub stride: usize,
    pub data: Vec<u8>,
}

impl ConvertedFrame {
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Zero-filled BGR8 frame with the given geometry.
    pub fn blank(frame_id: u64, width: u32, height: u32, x_padding: u32, y_padding: u32) -> Self {
        let stride = (width + x_padding) as usize * Self::BYTES_PER_PIXEL;
        Self {
            frame_id,
            timestamp_ns: 0,
            width,
            height,
            x_padding,
            y_padding,
            stride,
            data: vec![0; stride * (height + y_padding) as usize],
        }
    }

    pub fn format(&self) -> PixelFormat {
        PixelFormat::Bgr8
    }

    pub fn padded_width(&self) -> u32 {
        self.width + self.x_padding
    }

    pub fn padded_height(&self) -> u32 {
        self.height + self.y_padding
    }

    /// Logical pixels of row `y`, padding excluded.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * Self::BYTES_PER_PIXEL]
    }

    pub(crate) fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.width as usize * Self::BYTES_PER_PIXEL;
        &mut self.data[start..start + len]
    }

    /// `[b, g, r]` at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = y as usize * self.stride + x as usize * Self::BYTES_PER_PIXEL;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Tightly packed RGB8 copy of the logical image, as JPEG encoders expect.
    pub fn to_rgb_packed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for bgr in self.row(y).chunks_exact(3) {
                out.extend_from_slice(&[bgr[2], bgr[1], bgr[0]]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_stride() {
        let frame = RawFrame::packed(1, PixelFormat::Mono8, 4, 2, vec![0; 12]).with_padding(2, 0);
        assert_eq!(frame.stride, 6);
        assert_eq!(frame.expected_len(), Some(12));

        let mjpeg = RawFrame::packed(2, PixelFormat::Mjpeg, 4, 2, vec![0xFF, 0xD8]);
        assert_eq!(mjpeg.stride, 0);
        assert_eq!(mjpeg.expected_len(), None);
    }

    #[test]
    fn test_rgb_packing_skips_padding() {
        let mut frame = ConvertedFrame::blank(0, 2, 1, 1, 1);
        assert_eq!(frame.stride, 9);
        assert_eq!(frame.data.len(), 18);

        frame.row_mut(0).copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        frame.data[6] = 99; // padding pixel
        assert_eq!(frame.to_rgb_packed(), vec![3, 2, 1, 6, 5, 4]);
        assert_eq!(frame.pixel(1, 0), [4, 5, 6]);
    }
}
