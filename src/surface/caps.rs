//! Capability flags, creation descriptors, and the creation validator.
//!
//! Creation goes through `validate` before anything is allocated: a
//! rejected descriptor has no side effects. Checks run in a fixed order
//! (cube faces before the cube flag, the cube flag before geometry,
//! geometry before color keys), so a descriptor broken in several ways
//! always reports the same error.

use crate::error::{Result, SurfaceError};
use crate::surface::format::PixelFormat;

/// Which descriptor fields are meaningful for this creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DescFields {
    pub caps: bool,
    pub width: bool,
    pub height: bool,
    pub pixel_format: bool,
    pub mip_count: bool,
    pub ck_src_blt: bool,
    pub ck_dest_blt: bool,
    pub back_buffer_count: bool,
}

/// Primary capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceCaps {
    pub texture: bool,
    pub complex: bool,
    pub mipmap: bool,
    pub primary: bool,
    pub flip: bool,
    pub system_memory: bool,
    pub offscreen_plain: bool,
}

impl SurfaceCaps {
    /// True when every flag set in `filter` is also set here. Used by
    /// attached-surface lookups and match-scoped enumeration.
    pub fn contains(&self, filter: &SurfaceCaps) -> bool {
        (!filter.texture || self.texture)
            && (!filter.complex || self.complex)
            && (!filter.mipmap || self.mipmap)
            && (!filter.primary || self.primary)
            && (!filter.flip || self.flip)
            && (!filter.system_memory || self.system_memory)
            && (!filter.offscreen_plain || self.offscreen_plain)
    }
}

/// One of the six directional cube-map faces.
///
/// The discriminant order matters: a cube map's creation root is the
/// lowest requested face, and sibling faces enumerate highest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CubeFace {
    PositiveX = 0,
    NegativeX = 1,
    PositiveY = 2,
    NegativeY = 3,
    PositiveZ = 4,
    NegativeZ = 5,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];
}

/// Requested cube-face set (one flag per face).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CubeFaces {
    pub positive_x: bool,
    pub negative_x: bool,
    pub positive_y: bool,
    pub negative_y: bool,
    pub positive_z: bool,
    pub negative_z: bool,
}

impl CubeFaces {
    pub fn all() -> Self {
        Self {
            positive_x: true,
            negative_x: true,
            positive_y: true,
            negative_y: true,
            positive_z: true,
            negative_z: true,
        }
    }

    pub fn only(face: CubeFace) -> Self {
        let mut faces = Self::default();
        faces.set(face, true);
        faces
    }

    pub fn get(&self, face: CubeFace) -> bool {
        match face {
            CubeFace::PositiveX => self.positive_x,
            CubeFace::NegativeX => self.negative_x,
            CubeFace::PositiveY => self.positive_y,
            CubeFace::NegativeY => self.negative_y,
            CubeFace::PositiveZ => self.positive_z,
            CubeFace::NegativeZ => self.negative_z,
        }
    }

    pub fn set(&mut self, face: CubeFace, value: bool) {
        match face {
            CubeFace::PositiveX => self.positive_x = value,
            CubeFace::NegativeX => self.negative_x = value,
            CubeFace::PositiveY => self.positive_y = value,
            CubeFace::NegativeY => self.negative_y = value,
            CubeFace::PositiveZ => self.positive_z = value,
            CubeFace::NegativeZ => self.negative_z = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        CubeFace::ALL.iter().all(|f| !self.get(*f))
    }

    pub fn count(&self) -> usize {
        CubeFace::ALL.iter().filter(|f| self.get(**f)).count()
    }

    /// Lowest-ordered requested face; becomes the creation root.
    pub fn lowest(&self) -> Option<CubeFace> {
        CubeFace::ALL.iter().copied().find(|f| self.get(*f))
    }

    /// Requested faces other than `root`, highest-first. This is the
    /// attachment order of sibling faces on the cube-map root.
    pub fn siblings_of(&self, root: CubeFace) -> Vec<CubeFace> {
        CubeFace::ALL
            .iter()
            .rev()
            .copied()
            .filter(|f| *f != root && self.get(*f))
            .collect()
    }
}

/// Extended capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtCaps {
    pub cubemap: bool,
    /// Set on every non-root level of a mip chain.
    pub mipmap_sublevel: bool,
    pub faces: CubeFaces,
}

/// An inclusive value range marking pixels as transparent or writable
/// during a blit. Equality of low and high selects a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorKey {
    pub low: u32,
    pub high: u32,
}

impl ColorKey {
    pub fn single(value: u32) -> Self {
        Self {
            low: value,
            high: value,
        }
    }

    pub fn matches(&self, pixel: u32) -> bool {
        pixel >= self.low && pixel <= self.high
    }
}

/// Which stored color key a get/set operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorKeyKind {
    SrcBlt,
    DestBlt,
}

/// Surface creation descriptor. Fields are meaningful only when the
/// corresponding `DescFields` flag is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceDesc {
    pub fields: DescFields,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub caps: SurfaceCaps,
    pub ext_caps: ExtCaps,
    pub mip_count: u32,
    pub ck_src_blt: Option<ColorKey>,
    pub ck_dest_blt: Option<ColorKey>,
    pub back_buffer_count: u32,
}

impl SurfaceDesc {
    /// Plain width/height descriptor, the minimal valid request.
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            fields: DescFields {
                width: true,
                height: true,
                ..Default::default()
            },
            width,
            height,
            ..Default::default()
        }
    }
}

/// Check a creation descriptor for consistency. Runs entirely before any
/// allocation; failure mutates nothing.
pub fn validate(desc: &SurfaceDesc) -> Result<()> {
    // Face bits name a cube-map slot; without the cube flag they are
    // meaningless caps, not bad parameters.
    if !desc.ext_caps.faces.is_empty() && !desc.ext_caps.cubemap {
        return Err(SurfaceError::InvalidCaps("cube face flags without CUBEMAP"));
    }
    if desc.ext_caps.cubemap && desc.ext_caps.faces.is_empty() {
        return Err(SurfaceError::InvalidParameter(
            "CUBEMAP requested with no face flags",
        ));
    }
    if desc.caps.mipmap && !(desc.fields.width && desc.fields.height) {
        return Err(SurfaceError::InvalidParameter(
            "MIPMAP requires explicit width and height",
        ));
    }
    if desc.fields.ck_src_blt {
        match desc.ck_src_blt {
            Some(key) if key.low <= key.high => {}
            Some(_) => {
                return Err(SurfaceError::InvalidParameter(
                    "source color key range has low > high",
                ))
            }
            None => {
                return Err(SurfaceError::InvalidParameter(
                    "CKSRCBLT field flag without a key",
                ))
            }
        }
    }
    if desc.fields.ck_dest_blt {
        match desc.ck_dest_blt {
            Some(key) if key.low <= key.high => {}
            Some(_) => {
                return Err(SurfaceError::InvalidParameter(
                    "destination color key range has low > high",
                ))
            }
            None => {
                return Err(SurfaceError::InvalidParameter(
                    "CKDESTBLT field flag without a key",
                ))
            }
        }
    }
    if desc.caps.flip {
        if !desc.caps.complex {
            return Err(SurfaceError::InvalidCaps("FLIP requires COMPLEX"));
        }
        if !desc.fields.back_buffer_count || desc.back_buffer_count == 0 {
            return Err(SurfaceError::InvalidParameter(
                "FLIP requires a back-buffer count of at least 1",
            ));
        }
    }
    if (desc.fields.width && desc.width == 0) || (desc.fields.height && desc.height == 0) {
        return Err(SurfaceError::InvalidParameter("zero surface dimension"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture_desc(width: u32, height: u32) -> SurfaceDesc {
        let mut desc = SurfaceDesc::sized(width, height);
        desc.fields.caps = true;
        desc.caps.texture = true;
        desc
    }

    #[test]
    fn test_face_without_cubemap_is_invalid_caps() {
        let mut desc = texture_desc(128, 128);
        desc.ext_caps.faces = CubeFaces::all();
        assert!(matches!(
            validate(&desc),
            Err(SurfaceError::InvalidCaps(_))
        ));

        desc.ext_caps.faces = CubeFaces::only(CubeFace::PositiveX);
        assert!(matches!(
            validate(&desc),
            Err(SurfaceError::InvalidCaps(_))
        ));
    }

    #[test]
    fn test_cubemap_without_faces_is_invalid_parameter() {
        let mut desc = texture_desc(128, 128);
        desc.ext_caps.cubemap = true;
        assert!(matches!(
            validate(&desc),
            Err(SurfaceError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_mipmap_needs_geometry() {
        let mut desc = SurfaceDesc::default();
        desc.fields.caps = true;
        desc.caps.texture = true;
        desc.caps.mipmap = true;
        assert!(matches!(
            validate(&desc),
            Err(SurfaceError::InvalidParameter(_))
        ));

        let mut desc = texture_desc(128, 32);
        desc.caps.mipmap = true;
        assert!(validate(&desc).is_ok());
    }

    #[test]
    fn test_color_key_range_order() {
        let mut desc = texture_desc(16, 16);
        desc.fields.ck_src_blt = true;
        desc.ck_src_blt = Some(ColorKey { low: 5, high: 3 });
        assert!(matches!(
            validate(&desc),
            Err(SurfaceError::InvalidParameter(_))
        ));

        // Equality selects a single-value key.
        desc.ck_src_blt = Some(ColorKey::single(0xFF00FF));
        assert!(validate(&desc).is_ok());
    }

    #[test]
    fn test_flip_rules() {
        let mut desc = SurfaceDesc::default();
        desc.fields.caps = true;
        desc.caps.primary = true;
        desc.caps.flip = true;
        assert!(matches!(validate(&desc), Err(SurfaceError::InvalidCaps(_))));

        desc.caps.complex = true;
        assert!(matches!(
            validate(&desc),
            Err(SurfaceError::InvalidParameter(_))
        ));

        desc.fields.back_buffer_count = true;
        desc.back_buffer_count = 2;
        assert!(validate(&desc).is_ok());
    }

    #[test]
    fn test_face_ordering_helpers() {
        let all = CubeFaces::all();
        assert_eq!(all.lowest(), Some(CubeFace::PositiveX));
        assert_eq!(
            all.siblings_of(CubeFace::PositiveX),
            vec![
                CubeFace::NegativeZ,
                CubeFace::PositiveZ,
                CubeFace::NegativeY,
                CubeFace::PositiveY,
                CubeFace::NegativeX,
            ]
        );

        let one = CubeFaces::only(CubeFace::NegativeY);
        assert_eq!(one.lowest(), Some(CubeFace::NegativeY));
        assert!(one.siblings_of(CubeFace::NegativeY).is_empty());
        assert_eq!(one.count(), 1);
    }

    #[test]
    fn test_caps_contains() {
        let full = SurfaceCaps {
            texture: true,
            complex: true,
            mipmap: true,
            ..Default::default()
        };
        let filter = SurfaceCaps {
            texture: true,
            mipmap: true,
            ..Default::default()
        };
        assert!(full.contains(&filter));
        assert!(!filter.contains(&full));
    }
}
