//! Block transfer between surfaces with color-key filtering.
//!
//! Key resolution is the delicate part. Four key sources interact: the
//! source surface's stored src-blt key, the source surface's stored
//! dest-blt key, and the two override keys in the effects parameter.
//! Non-override flags read the stored keys, and the dest key for a
//! dest-keyed blit is read from the SOURCE surface's dest-blt field, not
//! the destination's. Callers depend on that lookup path; do not route it
//! through the destination.
//!
//! All validation happens before the first byte moves: any rejected call
//! leaves the destination buffer byte-for-byte unchanged.

use log::{trace, warn};

use crate::error::{Result, SurfaceError};
use crate::surface::caps::{ColorKey, ColorKeyKind};
use crate::surface::surface::SurfaceHandle;

/// Rectangular pixel region, top-left inclusive, extent in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn fits(&self, surface_width: u32, surface_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).map_or(false, |r| r <= surface_width)
            && self.y.checked_add(self.height).map_or(false, |b| b <= surface_height)
    }
}

/// Which color-key filters a blit applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlitFlags {
    /// Filter by the source surface's stored src-blt key.
    pub key_src: bool,
    /// Filter by the src key in the effects parameter instead.
    pub key_src_override: bool,
    /// Filter by the stored dest-blt key (read from the source surface).
    pub key_dest: bool,
    /// Filter by the dest key in the effects parameter instead.
    pub key_dest_override: bool,
}

impl BlitFlags {
    pub const NONE: BlitFlags = BlitFlags {
        key_src: false,
        key_src_override: false,
        key_dest: false,
        key_dest_override: false,
    };

    pub fn key_src() -> Self {
        Self {
            key_src: true,
            ..Default::default()
        }
    }

    pub fn key_src_override() -> Self {
        Self {
            key_src_override: true,
            ..Default::default()
        }
    }

    pub fn key_dest() -> Self {
        Self {
            key_dest: true,
            ..Default::default()
        }
    }

    pub fn key_dest_override() -> Self {
        Self {
            key_dest_override: true,
            ..Default::default()
        }
    }

    pub fn and(mut self, other: BlitFlags) -> Self {
        self.key_src |= other.key_src;
        self.key_src_override |= other.key_src_override;
        self.key_dest |= other.key_dest;
        self.key_dest_override |= other.key_dest_override;
        self
    }
}

/// Effects parameter carrying the override color keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlitFx {
    pub src_key: Option<ColorKey>,
    pub dest_key: Option<ColorKey>,
}

/// Resolve the active source and destination keys from flags, stored
/// surface keys, and the effects parameter. Pure; no buffer is touched.
fn resolve_keys(
    src: &SurfaceHandle,
    flags: BlitFlags,
    fx: Option<&BlitFx>,
) -> Result<(Option<ColorKey>, Option<ColorKey>)> {
    if flags.key_src && flags.key_src_override {
        return Err(SurfaceError::InvalidParameter(
            "KEYSRC and KEYSRCOVERRIDE are mutually exclusive",
        ));
    }
    if flags.key_dest && flags.key_dest_override {
        return Err(SurfaceError::InvalidParameter(
            "KEYDEST and KEYDESTOVERRIDE are mutually exclusive",
        ));
    }

    let src_key = if flags.key_src {
        Some(
            src.identity
                .stored_key(ColorKeyKind::SrcBlt)
                .ok_or(SurfaceError::InvalidParameter(
                    "KEYSRC with no src-blt key stored on the source",
                ))?,
        )
    } else if flags.key_src_override {
        let fx = fx.ok_or(SurfaceError::InvalidParameter(
            "KEYSRCOVERRIDE requires an effects parameter",
        ))?;
        Some(fx.src_key.ok_or(SurfaceError::InvalidParameter(
            "KEYSRCOVERRIDE with no src key in effects",
        ))?)
    } else {
        None
    };

    // Stored dest key comes from the SOURCE surface. Intentional; see
    // the module docs.
    let dest_key = if flags.key_dest {
        Some(
            src.identity
                .stored_key(ColorKeyKind::DestBlt)
                .ok_or(SurfaceError::InvalidParameter(
                    "KEYDEST with no dest-blt key stored on the source",
                ))?,
        )
    } else if flags.key_dest_override {
        let fx = fx.ok_or(SurfaceError::InvalidParameter(
            "KEYDESTOVERRIDE requires an effects parameter",
        ))?;
        Some(fx.dest_key.ok_or(SurfaceError::InvalidParameter(
            "KEYDESTOVERRIDE with no dest key in effects",
        ))?)
    } else {
        None
    };

    Ok((src_key, dest_key))
}

/// Copy a rectangle of pixels from `src` to `dst`, filtered by the
/// resolved color keys. `None` rects select the whole surface. Source and
/// destination regions must match in size (no stretching) and the pixel
/// formats must be of the same family.
pub fn blit(
    dst: &SurfaceHandle,
    dst_rect: Option<Rect>,
    src: &SurfaceHandle,
    src_rect: Option<Rect>,
    flags: BlitFlags,
    fx: Option<&BlitFx>,
) -> Result<()> {
    let (src_key, dest_key) = resolve_keys(src, flags, fx).map_err(|e| {
        warn!("blit rejected: {}", e);
        e
    })?;

    let dst_report = dst.describe();
    let src_report = src.describe();
    if !dst_report.pixel_format.same_family(&src_report.pixel_format) {
        return Err(SurfaceError::Unsupported("format conversion blit"));
    }

    let dst_rect = dst_rect.unwrap_or(Rect::new(0, 0, dst_report.width, dst_report.height));
    let src_rect = src_rect.unwrap_or(Rect::new(0, 0, src_report.width, src_report.height));
    if !dst_rect.fits(dst_report.width, dst_report.height)
        || !src_rect.fits(src_report.width, src_report.height)
    {
        return Err(SurfaceError::InvalidParameter("blit rect out of bounds"));
    }
    if dst_rect.width != src_rect.width || dst_rect.height != src_rect.height {
        return Err(SurfaceError::Unsupported("stretching blit"));
    }

    trace!(
        "blit {}x{} region, src key {:?}, dest key {:?}",
        src_rect.width,
        src_rect.height,
        src_key,
        dest_key
    );

    // Key compares mask the packed value to the format's channel bits:
    // padding bits (the X byte of X8R8G8B8) never defeat a key match.
    // Copies still move every stored bit.
    let src_mask = src_report.pixel_format.channel_mask();
    let dst_mask = dst_report.pixel_format.channel_mask();

    // Scoped locks bracket all buffer access; a surface blitted onto
    // itself fails here with SurfaceBusy rather than aliasing the buffer.
    let src_guard = src.lock()?;
    let mut dst_guard = dst.lock()?;

    for row in 0..src_rect.height {
        let src_row_base = (src_rect.y + row) * src_report.width + src_rect.x;
        let dst_row_base = (dst_rect.y + row) * dst_report.width + dst_rect.x;
        for col in 0..src_rect.width {
            let src_idx = (src_row_base + col) as usize;
            let dst_idx = (dst_row_base + col) as usize;

            let pixel = src_guard.read_packed(src_idx);
            if let Some(key) = src_key {
                if key.matches(pixel & src_mask) {
                    continue;
                }
            }
            if let Some(key) = dest_key {
                if !key.matches(dst_guard.read_packed(dst_idx) & dst_mask) {
                    continue;
                }
            }
            dst_guard.write_packed(dst_idx, pixel);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceHandle, InterfaceVersion};
    use crate::surface::caps::SurfaceDesc;

    fn pair(width: u32, height: u32) -> (DeviceHandle, SurfaceHandle, SurfaceHandle) {
        let dev = DeviceHandle::create(InterfaceVersion::V1).unwrap();
        let src = dev.create_surface(&SurfaceDesc::sized(width, height)).unwrap();
        let dst = dev.create_surface(&SurfaceDesc::sized(width, height)).unwrap();
        (dev, src, dst)
    }

    fn write_pixels(surface: &SurfaceHandle, values: &[u32]) {
        let mut guard = surface.lock().unwrap();
        for (i, v) in values.iter().enumerate() {
            guard.write_packed(i, *v);
        }
    }

    fn read_pixels(surface: &SurfaceHandle, count: usize) -> Vec<u32> {
        let guard = surface.lock().unwrap();
        (0..count).map(|i| guard.read_packed(i)).collect()
    }

    #[test]
    fn test_unkeyed_blit_copies_everything() {
        let (dev, src, dst) = pair(4, 1);
        write_pixels(&src, &[1, 2, 3, 4]);
        write_pixels(&dst, &[9, 9, 9, 9]);
        blit(&dst, None, &src, None, BlitFlags::NONE, None).unwrap();
        assert_eq!(read_pixels(&dst, 4), vec![1, 2, 3, 4]);
        src.release();
        dst.release();
        dev.release();
    }

    #[test]
    fn test_conflicting_flags_leave_destination_untouched() {
        let (dev, src, dst) = pair(2, 1);
        write_pixels(&src, &[1, 2]);
        write_pixels(&dst, &[7, 7]);
        let fx = BlitFx {
            src_key: Some(ColorKey::single(1)),
            dest_key: Some(ColorKey::single(7)),
        };

        let flags = BlitFlags::key_src().and(BlitFlags::key_src_override());
        assert!(matches!(
            blit(&dst, None, &src, None, flags, Some(&fx)),
            Err(SurfaceError::InvalidParameter(_))
        ));
        let flags = BlitFlags::key_dest().and(BlitFlags::key_dest_override());
        assert!(matches!(
            blit(&dst, None, &src, None, flags, Some(&fx)),
            Err(SurfaceError::InvalidParameter(_))
        ));
        assert_eq!(read_pixels(&dst, 2), vec![7, 7]);

        src.release();
        dst.release();
        dev.release();
    }

    #[test]
    fn test_override_without_fx_fails() {
        let (dev, src, dst) = pair(2, 1);
        write_pixels(&dst, &[7, 7]);
        for flags in [BlitFlags::key_src_override(), BlitFlags::key_dest_override()] {
            assert!(matches!(
                blit(&dst, None, &src, None, flags, None),
                Err(SurfaceError::InvalidParameter(_))
            ));
        }
        assert_eq!(read_pixels(&dst, 2), vec![7, 7]);
        src.release();
        dst.release();
        dev.release();
    }

    #[test]
    fn test_missing_stored_key_fails() {
        let (dev, src, dst) = pair(2, 1);
        write_pixels(&dst, &[7, 7]);
        assert!(matches!(
            blit(&dst, None, &src, None, BlitFlags::key_src(), None),
            Err(SurfaceError::InvalidParameter(_))
        ));
        assert!(matches!(
            blit(&dst, None, &src, None, BlitFlags::key_dest(), None),
            Err(SurfaceError::InvalidParameter(_))
        ));
        assert_eq!(read_pixels(&dst, 2), vec![7, 7]);
        src.release();
        dst.release();
        dev.release();
    }

    #[test]
    fn test_rect_bounds_and_stretch_rejected() {
        let (dev, src, dst) = pair(4, 4);
        assert!(matches!(
            blit(&dst, Some(Rect::new(2, 2, 4, 4)), &src, None, BlitFlags::NONE, None),
            Err(SurfaceError::InvalidParameter(_))
        ));
        assert!(matches!(
            blit(
                &dst,
                Some(Rect::new(0, 0, 2, 2)),
                &src,
                Some(Rect::new(0, 0, 4, 4)),
                BlitFlags::NONE,
                None
            ),
            Err(SurfaceError::Unsupported(_))
        ));
        src.release();
        dst.release();
        dev.release();
    }

    #[test]
    fn test_sub_rect_copy() {
        let (dev, src, dst) = pair(4, 2);
        write_pixels(&src, &[1, 2, 3, 4, 5, 6, 7, 8]);
        write_pixels(&dst, &[0; 8]);
        blit(
            &dst,
            Some(Rect::new(2, 0, 2, 2)),
            &src,
            Some(Rect::new(0, 0, 2, 2)),
            BlitFlags::NONE,
            None,
        )
        .unwrap();
        assert_eq!(read_pixels(&dst, 8), vec![0, 0, 1, 2, 0, 0, 5, 6]);
        src.release();
        dst.release();
        dev.release();
    }

    #[test]
    fn test_self_blit_fails_busy() {
        let (dev, src, dst) = pair(2, 1);
        assert_eq!(
            blit(&src, None, &src, None, BlitFlags::NONE, None).err(),
            Some(SurfaceError::SurfaceBusy)
        );
        src.release();
        dst.release();
        dev.release();
    }
}
