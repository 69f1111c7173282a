//! Pixel format descriptions.
//!
//! A `PixelFormat` describes how a surface packs one pixel: the total bit
//! count and the bit mask of each channel. Color-key compares mask the
//! packed value to the channel bits, so padding bytes never affect keying.

/// Bit depth and channel masks for a surface's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    /// Bits per packed pixel (16 or 32 in this crate).
    pub bits_per_pixel: u32,
    /// Red channel bitmask.
    pub r_mask: u32,
    /// Green channel bitmask.
    pub g_mask: u32,
    /// Blue channel bitmask.
    pub b_mask: u32,
    /// Alpha channel bitmask (0 for no alpha).
    pub a_mask: u32,
}

impl PixelFormat {
    /// 32-bit packed RGB, no alpha interpretation (X8R8G8B8).
    pub fn rgb32() -> Self {
        Self {
            bits_per_pixel: 32,
            r_mask: 0xFF0000,
            g_mask: 0x00FF00,
            b_mask: 0x0000FF,
            a_mask: 0,
        }
    }

    /// 16-bit R5G6B5.
    pub fn r5g6b5() -> Self {
        Self {
            bits_per_pixel: 16,
            r_mask: 0xF800,
            g_mask: 0x07E0,
            b_mask: 0x001F,
            a_mask: 0,
        }
    }

    /// Bytes needed to store one pixel.
    pub fn bytes_per_pixel(&self) -> u32 {
        (self.bits_per_pixel + 7) / 8
    }

    /// Check whether this format has an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.a_mask != 0
    }

    /// Union of all channel masks. Bits outside it are padding (the X
    /// byte of X8R8G8B8) and never participate in color-key compares.
    pub fn channel_mask(&self) -> u32 {
        self.r_mask | self.g_mask | self.b_mask | self.a_mask
    }

    /// Formats are family-compatible when they pack pixels identically.
    /// Attachment requires this; blits between differing families are
    /// rejected before touching any buffer.
    pub fn same_family(&self, other: &PixelFormat) -> bool {
        self == other
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::rgb32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(PixelFormat::rgb32().bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::r5g6b5().bytes_per_pixel(), 2);
    }

    #[test]
    fn test_alpha_detection() {
        assert!(!PixelFormat::rgb32().has_alpha());
        let mut fmt = PixelFormat::rgb32();
        fmt.a_mask = 0xFF000000;
        assert!(fmt.has_alpha());
    }

    #[test]
    fn test_channel_mask_excludes_padding() {
        assert_eq!(PixelFormat::rgb32().channel_mask(), 0x00FFFFFF);
        assert_eq!(PixelFormat::r5g6b5().channel_mask(), 0xFFFF);
    }

    #[test]
    fn test_family_compatibility() {
        assert!(PixelFormat::rgb32().same_family(&PixelFormat::rgb32()));
        assert!(!PixelFormat::rgb32().same_family(&PixelFormat::r5g6b5()));
    }
}
