// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Pixel format for camera frame buffers.
//!
//! Enum values ARE the V4L2 FourCC codes, so conversion to and from the
//! driver is a cast.

/// Pixel layout of a raw or converted frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum PixelFormat {
    // ===========================================
    // Packed RGB (24 bits per pixel)
    // ===========================================
    /// 24-bit BGR, 8 bits/channel. V4L2_PIX_FMT_BGR24 = 'BGR3'
    #[default]
    Bgr8 = 0x33524742,
    /// 24-bit RGB, 8 bits/channel. V4L2_PIX_FMT_RGB24 = 'RGB3'
    Rgb8 = 0x33424752,

    // ===========================================
    // Raw sensor data (8 bits per pixel)
    // ===========================================
    /// 8-bit grayscale. V4L2_PIX_FMT_GREY = 'GREY'
    Mono8 = 0x59455247,
    /// Bayer RGGB. V4L2_PIX_FMT_SRGGB8 = 'RGGB'
    BayerRg8 = 0x42474752,
    /// Bayer BGGR. V4L2_PIX_FMT_SBGGR8 = 'BA81'
    BayerBg8 = 0x31384142,
    /// Bayer GBRG. V4L2_PIX_FMT_SGBRG8 = 'GBRG'
    BayerGb8 = 0x47524247,
    /// Bayer GRBG. V4L2_PIX_FMT_SGRBG8 = 'GRBG'
    BayerGr8 = 0x47425247,

    // ===========================================
    // YUV
    // ===========================================
    /// YUYV packed YUV 4:2:2. V4L2_PIX_FMT_YUYV = 'YUYV'
    Yuyv422 = 0x56595559,

    // ===========================================
    // Compressed
    // ===========================================
    /// Motion-JPEG, one JPEG image per frame. V4L2_PIX_FMT_MJPEG = 'MJPG'
    Mjpeg = 0x47504A4D,

    /// Unknown or unsupported format.
    Unknown = 0x00000000,
}

impl PixelFormat {
    /// Raw FourCC value, little-endian as V4L2 stores it.
    #[inline]
    pub const fn fourcc(&self) -> u32 {
        *self as u32
    }

    /// FourCC as the four ASCII bytes the driver uses.
    pub const fn fourcc_bytes(&self) -> [u8; 4] {
        self.fourcc().to_le_bytes()
    }

    /// Create from a FourCC value.
    pub fn from_fourcc(code: u32) -> Self {
        match code {
            0x33524742 => Self::Bgr8,
            0x33424752 => Self::Rgb8,
            0x59455247 => Self::Mono8,
            0x42474752 => Self::BayerRg8,
            0x31384142 => Self::BayerBg8,
            0x47524247 => Self::BayerGb8,
            0x47425247 => Self::BayerGr8,
            0x56595559 => Self::Yuyv422,
            0x47504A4D => Self::Mjpeg,
            _ => Self::Unknown,
        }
    }

    pub fn from_fourcc_bytes(bytes: [u8; 4]) -> Self {
        Self::from_fourcc(u32::from_le_bytes(bytes))
    }

    pub const fn is_bayer(&self) -> bool {
        matches!(
            self,
            Self::BayerRg8 | Self::BayerBg8 | Self::BayerGb8 | Self::BayerGr8
        )
    }

    pub const fn is_compressed(&self) -> bool {
        matches!(self, Self::Mjpeg)
    }

    /// Bytes per pixel for packed formats, `None` for compressed or unknown.
    pub const fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            Self::Bgr8 | Self::Rgb8 => Some(3),
            Self::Yuyv422 => Some(2),
            Self::Mono8 | Self::BayerRg8 | Self::BayerBg8 | Self::BayerGb8 | Self::BayerGr8 => {
                Some(1)
            }
            Self::Mjpeg | Self::Unknown => None,
        }
    }

    /// FourCC string representation for logs.
    pub fn fourcc_string(&self) -> String {
        self.fourcc_bytes()
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '?' })
            .collect()
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fourcc_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_matches_driver_codes() {
        assert_eq!(&PixelFormat::Yuyv422.fourcc_bytes(), b"YUYV");
        assert_eq!(&PixelFormat::Mjpeg.fourcc_bytes(), b"MJPG");
        assert_eq!(&PixelFormat::Mono8.fourcc_bytes(), b"GREY");
        assert_eq!(&PixelFormat::BayerBg8.fourcc_bytes(), b"BA81");
        assert_eq!(&PixelFormat::Bgr8.fourcc_bytes(), b"BGR3");
        assert_eq!(PixelFormat::from_fourcc_bytes(*b"RGGB"), PixelFormat::BayerRg8);
        assert_eq!(PixelFormat::from_fourcc_bytes(*b"H264"), PixelFormat::Unknown);
    }

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(PixelFormat::Bgr8.bytes_per_pixel(), Some(3));
        assert_eq!(PixelFormat::Yuyv422.bytes_per_pixel(), Some(2));
        assert_eq!(PixelFormat::BayerGr8.bytes_per_pixel(), Some(1));
        assert_eq!(PixelFormat::Mjpeg.bytes_per_pixel(), None);
        assert!(PixelFormat::Mjpeg.is_compressed());
        assert!(PixelFormat::BayerGb8.is_bayer());
        assert!(!PixelFormat::Mono8.is_bayer());
    }
}
