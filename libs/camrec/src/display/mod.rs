// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Frame preview.

#[cfg(feature = "preview")]
mod window;

#[cfg(feature = "preview")]
pub use window::PreviewWindow;

use std::time::Duration;

use crate::core::{ConvertedFrame, KeyPress, PreviewDisplay, Result};

/// Display that shows nothing and never reports a key.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    frames_shown: u64,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

impl PreviewDisplay for HeadlessDisplay {
    fn show(&mut self, _frame: &ConvertedFrame) -> Result<()> {
        self.frames_shown += 1;
        Ok(())
    }

    fn wait_key(&mut self, _timeout: Duration) -> Result<Option<KeyPress>> {
        Ok(None)
    }
}

/// Pack the visible region of a BGR8 frame as `0x00RRGGBB` words.
pub fn bgr_to_xrgb(frame: &ConvertedFrame) -> Vec<u32> {
    let mut out = Vec::with_capacity(frame.width as usize * frame.height as usize);
    for y in 0..frame.height {
        out.extend(
            frame
                .row(y)
                .chunks_exact(3)
                .map(|bgr| (u32::from(bgr[2]) << 16) | (u32::from(bgr[1]) << 8) | u32::from(bgr[0])),
        );
    }
    out
}

/// Nearest-neighbor scale of a packed `src_w` x `src_h` image into `dst`.
pub fn scale_nearest(src: &[u32], src_w: u32, src_h: u32, dst: &mut [u32], dst_w: u32, dst_h: u32) {
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return;
    }
    for y in 0..dst_h {
        let sy = (y as u64 * src_h as u64 / dst_h as u64) as usize;
        let src_row = &src[sy * src_w as usize..(sy + 1) * src_w as usize];
        let dst_row = &mut dst[y as usize * dst_w as usize..(y as usize + 1) * dst_w as usize];
        for (x, px) in dst_row.iter_mut().enumerate() {
            let sx = (x as u64 * src_w as u64 / dst_w as u64) as usize;
            *px = src_row[sx];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xrgb_packing_ignores_padding() {
        let mut frame = ConvertedFrame::blank(0, 2, 1, 2, 1);
        frame.data[..6].copy_from_slice(&[0x10, 0x20, 0x30, 0x01, 0x02, 0x03]);
        frame.data[6..9].copy_from_slice(&[0xFF, 0xFF, 0xFF]);

        assert_eq!(bgr_to_xrgb(&frame), vec![0x0030_2010, 0x0003_0201]);
    }

    #[test]
    fn test_scale_nearest_doubles() {
        let src = [1, 2, 3, 4];
        let mut dst = [0u32; 16];
        scale_nearest(&src, 2, 2, &mut dst, 4, 4);
        assert_eq!(
            dst,
            [1, 1, 2, 2, 1, 1, 2, 2, 3, 3, 4, 4, 3, 3, 4, 4]
        );
    }

    #[test]
    fn test_headless_never_reports_keys() {
        let mut display = HeadlessDisplay::new();
        display.show(&ConvertedFrame::blank(0, 4, 4, 0, 0)).unwrap();
        assert_eq!(display.wait_key(Duration::from_millis(1)).unwrap(), None);
        assert_eq!(display.frames_shown(), 1);
    }
}
