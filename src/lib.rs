//! In-memory 2D drawing-surface subsystem.
//!
//! Surfaces are created through a device, carry capability flags and a
//! packed-RGB pixel buffer, and form attachment graphs (mip chains, cube
//! maps, flip chains). Every object is exposed through versioned facades
//! with independent explicit reference counts.

pub mod blit;
pub mod device;
pub mod error;
pub mod surface;

pub use blit::{blit, BlitFlags, BlitFx, Rect};
pub use device::{DeviceHandle, InterfaceVersion, DISPLAY_HEIGHT, DISPLAY_WIDTH};
pub use error::{Result, SurfaceError};
pub use surface::{
    ColorKey, ColorKeyKind, CubeFace, CubeFaces, EnumAction, EnumScope, PixelFormat, SurfaceCaps,
    SurfaceDesc, SurfaceHandle,
};
