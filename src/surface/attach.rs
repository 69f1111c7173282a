//! Attachment edges and manual-attach validation.
//!
//! Surfaces form a directed graph built once, acyclically, at creation
//! time: mip chains, cube-map face sets, and flip chains. The only
//! runtime mutation is the manual attach path, which admits exactly the
//! edges a creation-time mip chain would have produced; everything else
//! is a `CannotAttach` rejection with no mutation.

use crate::error::{Result, SurfaceError};
use crate::surface::caps::SurfaceCaps;
use crate::surface::format::PixelFormat;

/// Relation kind carried by an attachment edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Next level of a mipmap chain (half-size successor).
    MipSuccessor,
    /// Sibling face of a cube map, attached to the creation root.
    CubeFace,
    /// Next buffer of a flip chain, front to back.
    FlipSuccessor,
}

/// The slice of surface state that attach validation looks at.
#[derive(Debug, Clone, Copy)]
pub struct AttachPoint {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub caps: SurfaceCaps,
    /// Whether the surface already holds a mip-successor out-edge.
    pub has_mip_successor: bool,
}

/// Validate a manual attach of `child` under `parent`.
///
/// Requirements (all from the reference behavior): same pixel format
/// family, both textures, the child flagged MIPMAP, child dimensions
/// exactly max(1, parent/2) on both axes, and no existing successor on
/// the parent. A 16x16 plain texture therefore never attaches to any
/// level of a 128x128 chain, in either direction.
pub fn validate_mip_attach(parent: &AttachPoint, child: &AttachPoint) -> Result<()> {
    if !parent.pixel_format.same_family(&child.pixel_format) {
        return Err(SurfaceError::CannotAttach("pixel format mismatch"));
    }
    if !parent.caps.texture || !child.caps.texture {
        return Err(SurfaceError::CannotAttach(
            "mip attachment requires textures",
        ));
    }
    if !child.caps.mipmap {
        return Err(SurfaceError::CannotAttach(
            "attached surface is not a mip level",
        ));
    }
    let want_w = (parent.width / 2).max(1);
    let want_h = (parent.height / 2).max(1);
    if child.width != want_w || child.height != want_h {
        return Err(SurfaceError::CannotAttach(
            "attached surface is not half the parent size",
        ));
    }
    if parent.has_mip_successor {
        return Err(SurfaceError::CannotAttach(
            "parent already has a mip successor",
        ));
    }
    Ok(())
}
