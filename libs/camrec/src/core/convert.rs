// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Pixel conversion to BGR8.
//!
//! Every supported camera format is turned into a padded BGR8 buffer that
//! both the preview window and the MJPEG writer consume. Bayer data is
//! demosaiced with bilinear interpolation over the 3x3 neighbourhood.

use image::ImageFormat;

use crate::core::{ConvertedFrame, PixelFormat, RawFrame, RecorderError, Result};

/// Convert `raw` into a freshly allocated BGR8 frame.
pub fn convert_to_bgr8(raw: &RawFrame) -> Result<ConvertedFrame> {
    if raw.format == PixelFormat::Mjpeg {
        return decode_mjpeg(raw);
    }

    let expected = raw.expected_len().ok_or_else(|| {
        RecorderError::Conversion(format!("unsupported pixel format {}", raw.format))
    })?;
    let row_len = raw.width as usize * raw.format.bytes_per_pixel().unwrap_or(1);
    if raw.stride < row_len {
        return Err(RecorderError::Conversion(format!(
            "frame {} stride {} is shorter than a {} byte row",
            raw.frame_id, raw.stride, row_len
        )));
    }
    if raw.data.len() < expected {
        return Err(RecorderError::Conversion(format!(
            "frame {} holds {} bytes, {}x{} {} needs {}",
            raw.frame_id,
            raw.data.len(),
            raw.width,
            raw.height,
            raw.format,
            expected
        )));
    }

    let mut out = ConvertedFrame::blank(
        raw.frame_id,
        raw.width,
        raw.height,
        raw.x_padding,
        raw.y_padding,
    );
    out.timestamp_ns = raw.timestamp_ns;

    match raw.format {
        PixelFormat::Bgr8 => copy_rows(raw, &mut out, |px| [px[0], px[1], px[2]]),
        PixelFormat::Rgb8 => copy_rows(raw, &mut out, |px| [px[2], px[1], px[0]]),
        PixelFormat::Mono8 => copy_rows(raw, &mut out, |px| [px[0], px[0], px[0]]),
        PixelFormat::Yuyv422 => yuyv_to_bgr(raw, &mut out),
        format if format.is_bayer() => demosaic_bilinear(raw, &mut out),
        other => {
            return Err(RecorderError::Conversion(format!(
                "unsupported pixel format {}",
                other
            )));
        }
    }

    Ok(out)
}

fn copy_rows(raw: &RawFrame, out: &mut ConvertedFrame, map: impl Fn(&[u8]) -> [u8; 3]) {
    let bpp = raw.format.bytes_per_pixel().unwrap_or(1);
    for y in 0..raw.height {
        let src = &raw.data[y as usize * raw.stride..][..raw.width as usize * bpp];
        for (dst, px) in out.row_mut(y).chunks_exact_mut(3).zip(src.chunks_exact(bpp)) {
            dst.copy_from_slice(&map(px));
        }
    }
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// BT.601 full-range YCbCr to BGR, fixed point (x1024).
fn ycbcr_to_bgr(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as i32;
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    let r = y + ((1436 * v) >> 10);
    let g = y - ((352 * u + 731 * v) >> 10);
    let b = y + ((1815 * u) >> 10);
    [clamp_u8(b), clamp_u8(g), clamp_u8(r)]
}

fn yuyv_to_bgr(raw: &RawFrame, out: &mut ConvertedFrame) {
    for y in 0..raw.height {
        let row = &raw.data[y as usize * raw.stride..][..raw.stride];
        let dst = out.row_mut(y);
        for x in 0..raw.width as usize {
            let pair = (x / 2) * 4;
            let luma = row[x * 2];
            let (u, v) = if pair + 3 < row.len() {
                (row[pair + 1], row[pair + 3])
            } else {
                (128, 128)
            };
            dst[x * 3..x * 3 + 3].copy_from_slice(&ycbcr_to_bgr(luma, u, v));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// Index in a BGR triple.
    fn bgr_index(self) -> usize {
        match self {
            Channel::Blue => 0,
            Channel::Green => 1,
            Channel::Red => 2,
        }
    }
}

/// Colour filter at `(x, y)` for the given mosaic.
fn cfa_channel(format: PixelFormat, x: u32, y: u32) -> Channel {
    let (even_row, odd_row) = match format {
        PixelFormat::BayerRg8 => ([Channel::Red, Channel::Green], [Channel::Green, Channel::Blue]),
        PixelFormat::BayerBg8 => ([Channel::Blue, Channel::Green], [Channel::Green, Channel::Red]),
        PixelFormat::BayerGr8 => ([Channel::Green, Channel::Red], [Channel::Blue, Channel::Green]),
        _ => ([Channel::Green, Channel::Blue], [Channel::Red, Channel::Green]),
    };
    let row = if y % 2 == 0 { even_row } else { odd_row };
    row[(x % 2) as usize]
}

fn demosaic_bilinear(raw: &RawFrame, out: &mut ConvertedFrame) {
    let (w, h) = (raw.width as i64, raw.height as i64);
    let sample = |x: i64, y: i64| raw.data[y as usize * raw.stride + x as usize] as u32;

    for y in 0..h {
        let dst = out.row_mut(y as u32);
        for x in 0..w {
            let own = cfa_channel(raw.format, x as u32, y as u32);
            let mut sums = [0u32; 3];
            let mut counts = [0u32; 3];

            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    let channel = cfa_channel(raw.format, nx as u32, ny as u32);
                    if channel == own && (dx, dy) != (0, 0) {
                        continue;
                    }
                    sums[channel.bgr_index()] += sample(nx, ny);
                    counts[channel.bgr_index()] += 1;
                }
            }

            let px = &mut dst[x as usize * 3..x as usize * 3 + 3];
            for c in 0..3 {
                px[c] = if c == own.bgr_index() {
                    sample(x, y) as u8
                } else if counts[c] > 0 {
                    ((sums[c] + counts[c] / 2) / counts[c]) as u8
                } else {
                    0
                };
            }
        }
    }
}

fn decode_mjpeg(raw: &RawFrame) -> Result<ConvertedFrame> {
    let decoded = image::load_from_memory_with_format(&raw.data, ImageFormat::Jpeg)
        .map_err(|e| {
            RecorderError::Conversion(format!("frame {}: JPEG decode failed: {}", raw.frame_id, e))
        })?
        .to_rgb8();

    let (width, height) = decoded.dimensions();
    let mut out = ConvertedFrame::blank(raw.frame_id, width, height, 0, 0);
    out.timestamp_ns = raw.timestamp_ns;
    for (dst, rgb) in out.data.chunks_exact_mut(3).zip(decoded.as_raw().chunks_exact(3)) {
        dst.copy_from_slice(&[rgb[2], rgb[1], rgb[0]]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_with_padding() {
        // 2x2 image, one padding column, one padding row.
        let data = vec![10, 20, 0, 30, 40, 0, 0, 0, 0];
        let raw = RawFrame::packed(7, PixelFormat::Mono8, 2, 2, data).with_padding(1, 1);

        let out = convert_to_bgr8(&raw).unwrap();
        assert_eq!(out.frame_id, 7);
        assert_eq!(out.stride, 9);
        assert_eq!(out.padded_height(), 3);
        assert_eq!(out.pixel(0, 0), [10, 10, 10]);
        assert_eq!(out.pixel(1, 1), [40, 40, 40]);
    }

    #[test]
    fn test_rgb_is_swapped() {
        let raw = RawFrame::packed(0, PixelFormat::Rgb8, 1, 1, vec![255, 128, 0]);
        let out = convert_to_bgr8(&raw).unwrap();
        assert_eq!(out.pixel(0, 0), [0, 128, 255]);
    }

    #[test]
    fn test_yuyv_grey_stays_grey() {
        let raw = RawFrame::packed(0, PixelFormat::Yuyv422, 2, 1, vec![100, 128, 200, 128]);
        let out = convert_to_bgr8(&raw).unwrap();
        assert_eq!(out.pixel(0, 0), [100, 100, 100]);
        assert_eq!(out.pixel(1, 0), [200, 200, 200]);
    }

    #[test]
    fn test_bayer_uniform_red_field() {
        // RGGB mosaic where only the red sites are lit.
        let (w, h) = (4u32, 4u32);
        let mut data = vec![0u8; (w * h) as usize];
        for y in (0..h).step_by(2) {
            for x in (0..w).step_by(2) {
                data[(y * w + x) as usize] = 200;
            }
        }
        let raw = RawFrame::packed(0, PixelFormat::BayerRg8, w, h, data);
        let out = convert_to_bgr8(&raw).unwrap();

        for y in 0..h {
            for x in 0..w {
                let [b, g, r] = out.pixel(x, y);
                assert_eq!((b, g), (0, 0), "pixel ({}, {})", x, y);
                assert_eq!(r, 200, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_bayer_patterns_place_channels() {
        assert_eq!(cfa_channel(PixelFormat::BayerRg8, 0, 0), Channel::Red);
        assert_eq!(cfa_channel(PixelFormat::BayerBg8, 0, 0), Channel::Blue);
        assert_eq!(cfa_channel(PixelFormat::BayerGr8, 1, 0), Channel::Red);
        assert_eq!(cfa_channel(PixelFormat::BayerGb8, 0, 1), Channel::Red);
        assert_eq!(cfa_channel(PixelFormat::BayerGb8, 1, 1), Channel::Green);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let raw = RawFrame::packed(3, PixelFormat::Bgr8, 4, 4, vec![0; 10]);
        assert!(matches!(
            convert_to_bgr8(&raw),
            Err(RecorderError::Conversion(_))
        ));
    }

    #[test]
    fn test_stride_shorter_than_row_is_rejected() {
        for format in [PixelFormat::Mono8, PixelFormat::Yuyv422, PixelFormat::BayerRg8] {
            let mut raw = RawFrame::packed(5, format, 4, 2, vec![0; 4]);
            raw.stride = 2;
            assert!(
                matches!(convert_to_bgr8(&raw), Err(RecorderError::Conversion(_))),
                "{}",
                format
            );
        }
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let raw = RawFrame::packed(3, PixelFormat::Unknown, 4, 4, vec![0; 64]);
        assert!(convert_to_bgr8(&raw).is_err());
    }

    #[test]
    fn test_mjpeg_decodes() {
        use image::codecs::jpeg::JpegEncoder;
        use image::ExtendedColorType;

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, 95)
            .encode(&[128u8; 8 * 8 * 3], 8, 8, ExtendedColorType::Rgb8)
            .unwrap();

        let raw = RawFrame::packed(9, PixelFormat::Mjpeg, 8, 8, jpeg);
        let out = convert_to_bgr8(&raw).unwrap();
        assert_eq!((out.width, out.height), (8, 8));
        let [b, g, r] = out.pixel(4, 4);
        for c in [b, g, r] {
            assert!((c as i32 - 128).abs() <= 3, "channel {}", c);
        }
    }
}
