//! Mipmap chain planning.
//!
//! Three creation shapes exist:
//! - COMPLEX + MIPMAP + explicit count: exactly that many levels; the
//!   count is authoritative over geometry, so levels past the point where
//!   both dimensions reach 1 stay flat at 1x1.
//! - COMPLEX + MIPMAP with no count: an automatic chain from the base size
//!   down to where the SMALLER dimension reaches 1, i.e.
//!   floor(log2(min(w, h))) + 1 levels.
//! - MIPMAP without COMPLEX: a single level, any count field ignored.

/// Dimensions of one planned mip level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
}

/// Length of an automatic chain for a base size. Governed by the smaller
/// dimension: (128,32) -> 6, (32,64) -> 6, (128,128) -> 8.
pub fn auto_chain_length(width: u32, height: u32) -> u32 {
    let mut dim = width.min(height).max(1);
    let mut levels = 1;
    while dim > 1 {
        dim /= 2;
        levels += 1;
    }
    levels
}

fn halve(dim: u32) -> u32 {
    (dim / 2).max(1)
}

/// Plan the levels of a mip chain.
///
/// `requested` carries the explicit level count when the creation
/// descriptor supplied one. `complex` is the COMPLEX capability; without
/// it the surface is a single detached level.
pub fn plan_chain(width: u32, height: u32, requested: Option<u32>, complex: bool) -> Vec<MipLevel> {
    let count = if !complex {
        1
    } else {
        match requested {
            Some(count) => count.max(1),
            None => auto_chain_length(width, height),
        }
    };

    let mut levels = Vec::with_capacity(count as usize);
    let mut w = width;
    let mut h = height;
    for i in 0..count {
        if i > 0 {
            w = halve(w);
            h = halve(h);
        }
        levels.push(MipLevel {
            width: w,
            height: h,
        });
    }
    levels
}
