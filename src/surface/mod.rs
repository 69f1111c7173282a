//! Surface objects and the graphs they form.
//!
//! Key concepts:
//! - `caps`: capability flags, creation descriptors, and their validation
//! - `format`: packed RGB pixel formats
//! - `store`: the locked pixel buffer behind every surface
//! - `mipmap`: chain length planning
//! - `attach`: attachment edges and manual-attach rules
//! - `surface`: the identity/facade aggregation core and `SurfaceHandle`
//! - `enumerate`: attached-surface and device-wide enumeration iterators

pub mod attach;
pub mod caps;
pub mod enumerate;
pub mod format;
pub mod mipmap;
pub mod store;
#[allow(clippy::module_inception)]
pub mod surface;

pub use attach::{validate_mip_attach, AttachPoint, AttachmentKind};
pub use caps::{
    validate, ColorKey, ColorKeyKind, CubeFace, CubeFaces, DescFields, ExtCaps, SurfaceCaps,
    SurfaceDesc,
};
pub use enumerate::{AttachedSurfaces, EnumAction, EnumScope, ExistingSurfaces};
pub use format::PixelFormat;
pub use mipmap::{auto_chain_length, plan_chain, MipLevel};
pub use store::{LockGuard, SurfaceStore};
pub use surface::{SurfaceFacade, SurfaceHandle, SurfaceInfo, SurfaceReport};
