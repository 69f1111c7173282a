//! Device identity, per-version device facades, and the surface factory.
//!
//! A device is the creation context for surfaces. Like surfaces, one
//! logical device is a single `DeviceIdentity` exposed through any number
//! of per-version `DeviceFacade`s with independent counters: querying a
//! version that was never requested before creates its facade, and
//! re-querying returns the same facade with its own counter bumped.
//!
//! The factory path runs the capability validator first, then builds the
//! full object graph (mip chain, cube-map face set, or flip chain) before
//! wrapping the root in a facade matching the requesting version.

use log::debug;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use crate::error::{Result, SurfaceError};
use crate::surface::attach::AttachmentKind;
use crate::surface::caps::{self, ColorKey, CubeFaces, ExtCaps, SurfaceCaps, SurfaceDesc};
use crate::surface::enumerate::{EnumAction, EnumScope, ExistingSurfaces};
use crate::surface::format::PixelFormat;
use crate::surface::mipmap::{plan_chain, MipLevel};
use crate::surface::surface::{handle_on, SurfaceHandle, SurfaceIdentity, SurfaceInfo};

/// Display-mode stand-in used when a primary surface omits dimensions.
pub const DISPLAY_WIDTH: u32 = 640;
pub const DISPLAY_HEIGHT: u32 = 480;

/// Published interface versions. Devices expose 1, 2, 4 and 7; surfaces
/// additionally expose 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceVersion {
    V1,
    V2,
    V3,
    V4,
    V7,
}

impl InterfaceVersion {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(InterfaceVersion::V1),
            2 => Some(InterfaceVersion::V2),
            3 => Some(InterfaceVersion::V3),
            4 => Some(InterfaceVersion::V4),
            7 => Some(InterfaceVersion::V7),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> u32 {
        match self {
            InterfaceVersion::V1 => 1,
            InterfaceVersion::V2 => 2,
            InterfaceVersion::V3 => 3,
            InterfaceVersion::V4 => 4,
            InterfaceVersion::V7 => 7,
        }
    }

    /// Versions a device object exposes.
    pub fn device_supported(&self) -> bool {
        !matches!(self, InterfaceVersion::V3)
    }
}

/// One interface version's view of a device, with its own counter.
#[derive(Debug)]
pub struct DeviceFacade {
    version: InterfaceVersion,
    refs: AtomicU32,
}

/// The aggregation core behind all facades of one logical device.
pub(crate) struct DeviceIdentity {
    facades: Mutex<Vec<Arc<DeviceFacade>>>,
    /// Every surface ever created through this device, weakly held; the
    /// attachment graph and caller handles own the strong references.
    surfaces: Mutex<Vec<Weak<SurfaceIdentity>>>,
}

impl DeviceIdentity {
    fn facade_for(&self, version: InterfaceVersion) -> Arc<DeviceFacade> {
        let mut facades = self.facades.lock();
        if let Some(existing) = facades.iter().find(|f| f.version == version) {
            return Arc::clone(existing);
        }
        let facade = Arc::new(DeviceFacade {
            version,
            refs: AtomicU32::new(0),
        });
        facades.push(Arc::clone(&facade));
        facade
    }

    fn register(&self, surface: &Arc<SurfaceIdentity>) {
        self.surfaces.lock().push(Arc::downgrade(surface));
    }

    fn live_surfaces(&self) -> Vec<Arc<SurfaceIdentity>> {
        let mut list = self.surfaces.lock();
        list.retain(|weak| weak.strong_count() > 0);
        list.iter().filter_map(|weak| weak.upgrade()).collect()
    }
}

/// Hand out a handle on `device` through the facade for `version`,
/// incrementing that facade's counter by exactly one.
pub(crate) fn handle_for_version(
    device: &Arc<DeviceIdentity>,
    version: InterfaceVersion,
) -> DeviceHandle {
    let facade = device.facade_for(version);
    facade.refs.fetch_add(1, Ordering::SeqCst);
    DeviceHandle {
        identity: Arc::clone(device),
        facade,
    }
}

/// A caller-owned reference to one device facade. Same explicit reference
/// discipline as `SurfaceHandle`: release exactly once per handle.
pub struct DeviceHandle {
    identity: Arc<DeviceIdentity>,
    facade: Arc<DeviceFacade>,
}

impl DeviceHandle {
    /// Create a fresh logical device through the given interface version.
    pub fn create(version: InterfaceVersion) -> Result<DeviceHandle> {
        if !version.device_supported() {
            return Err(SurfaceError::NoInterface(version.as_raw()));
        }
        let identity = Arc::new(DeviceIdentity {
            facades: Mutex::new(Vec::new()),
            surfaces: Mutex::new(Vec::new()),
        });
        debug!("created device via {:?}", version);
        Ok(handle_for_version(&identity, version))
    }

    pub fn version(&self) -> InterfaceVersion {
        self.facade.version
    }

    /// Current counter of this handle's facade only.
    pub fn ref_count(&self) -> u32 {
        self.facade.refs.load(Ordering::SeqCst)
    }

    /// Take an additional reference on this facade.
    pub fn add_ref(&self) -> DeviceHandle {
        self.facade.refs.fetch_add(1, Ordering::SeqCst);
        DeviceHandle {
            identity: Arc::clone(&self.identity),
            facade: Arc::clone(&self.facade),
        }
    }

    /// Give up this reference; returns the facade's remaining count.
    pub fn release(self) -> u32 {
        let prev = self.facade.refs.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "facade counter underflow");
        prev.saturating_sub(1)
    }

    /// Two handles view the same facade (same device, same version).
    pub fn same_facade(&self, other: &DeviceHandle) -> bool {
        Arc::ptr_eq(&self.facade, &other.facade)
    }

    /// Request another interface version of this device. The facade is
    /// created on first request; its counter always goes up by one.
    pub fn query_interface(&self, version: InterfaceVersion) -> Result<DeviceHandle> {
        if !version.device_supported() {
            return Err(SurfaceError::NoInterface(version.as_raw()));
        }
        Ok(handle_for_version(&self.identity, version))
    }

    /// `query_interface` addressed by raw version number.
    pub fn query_interface_raw(&self, raw: u32) -> Result<DeviceHandle> {
        if raw == 0 {
            return Err(SurfaceError::InvalidParameter("null interface id"));
        }
        let version = InterfaceVersion::from_raw(raw).ok_or(SurfaceError::NoInterface(raw))?;
        self.query_interface(version)
    }

    /// Create a surface (and its attachment graph) from a descriptor.
    /// Validation happens entirely before any allocation; the returned
    /// handle speaks this device facade's version and owns one reference.
    pub fn create_surface(&self, desc: &SurfaceDesc) -> Result<SurfaceHandle> {
        caps::validate(desc)?;

        // A descriptor without a caps field names an offscreen plain
        // surface.
        let caps = if desc.fields.caps {
            desc.caps
        } else {
            SurfaceCaps {
                offscreen_plain: true,
                ..Default::default()
            }
        };
        let (width, height) = if desc.fields.width && desc.fields.height {
            (desc.width, desc.height)
        } else if caps.primary {
            (DISPLAY_WIDTH, DISPLAY_HEIGHT)
        } else {
            return Err(SurfaceError::InvalidParameter(
                "surface dimensions are required",
            ));
        };
        let format = if desc.fields.pixel_format {
            desc.pixel_format
        } else {
            PixelFormat::rgb32()
        };

        let version = self.facade.version;
        let root = if desc.ext_caps.cubemap {
            self.build_cubemap(desc, width, height, format, caps, version)
        } else if caps.flip {
            self.build_flip_chain(desc, width, height, format, caps, version)
        } else {
            let levels = self.plan_levels(desc, width, height, caps);
            let ids = self.make_levels(
                &levels,
                format,
                caps,
                desc.ext_caps,
                desc.ck_src_blt,
                desc.ck_dest_blt,
                0,
                version,
            );
            link_mip_chain(&ids);
            Arc::clone(&ids[0])
        };

        debug!(
            "created {}x{} surface via {:?} (mip levels: {})",
            width, height, version, root.info.mip_count
        );
        Ok(handle_on(&root, version))
    }

    fn plan_levels(
        &self,
        desc: &SurfaceDesc,
        width: u32,
        height: u32,
        caps: SurfaceCaps,
    ) -> Vec<MipLevel> {
        if caps.mipmap {
            let requested = desc.fields.mip_count.then_some(desc.mip_count);
            plan_chain(width, height, requested, caps.complex)
        } else {
            vec![MipLevel { width, height }]
        }
    }

    /// Build one mip chain's identities without linking them. Index 0 is
    /// the chain root; only it carries the descriptor's color keys.
    #[allow(clippy::too_many_arguments)]
    fn make_levels(
        &self,
        levels: &[MipLevel],
        format: PixelFormat,
        caps: SurfaceCaps,
        base_ext: ExtCaps,
        ck_src_blt: Option<ColorKey>,
        ck_dest_blt: Option<ColorKey>,
        back_buffer_count: u32,
        version: InterfaceVersion,
    ) -> Vec<Arc<SurfaceIdentity>> {
        let total = levels.len() as u32;
        levels
            .iter()
            .enumerate()
            .map(|(i, level)| {
                let mut ext = base_ext;
                if i > 0 {
                    ext.mipmap_sublevel = true;
                }
                let info = SurfaceInfo {
                    width: level.width,
                    height: level.height,
                    pixel_format: format,
                    caps,
                    ext_caps: ext,
                    mip_count: if caps.mipmap { total - i as u32 } else { 0 },
                    back_buffer_count,
                };
                let (src_key, dest_key) = if i == 0 {
                    (ck_src_blt, ck_dest_blt)
                } else {
                    (None, None)
                };
                let identity = SurfaceIdentity::new(
                    info,
                    Arc::downgrade(&self.identity),
                    version,
                    src_key,
                    dest_key,
                );
                self.identity.register(&identity);
                identity
            })
            .collect()
    }

    /// Cube map: the root object is the face with the lowest face order;
    /// the remaining requested faces hang off it as siblings (highest face
    /// first), and the root's own mip successor is attached last.
    fn build_cubemap(
        &self,
        desc: &SurfaceDesc,
        width: u32,
        height: u32,
        format: PixelFormat,
        caps: SurfaceCaps,
        version: InterfaceVersion,
    ) -> Arc<SurfaceIdentity> {
        let faces = desc.ext_caps.faces;
        let root_face = faces.lowest().expect("validator guarantees a face");
        let levels = self.plan_levels(desc, width, height, caps);

        let face_ext = |face| ExtCaps {
            cubemap: true,
            mipmap_sublevel: false,
            faces: CubeFaces::only(face),
        };

        let root_ids = self.make_levels(
            &levels,
            format,
            caps,
            face_ext(root_face),
            desc.ck_src_blt,
            desc.ck_dest_blt,
            0,
            version,
        );
        let root = Arc::clone(&root_ids[0]);

        for face in faces.siblings_of(root_face) {
            let ids =
                self.make_levels(&levels, format, caps, face_ext(face), None, None, 0, version);
            link_mip_chain(&ids);
            root.attach_child(AttachmentKind::CubeFace, &ids[0]);
        }
        // The root's own chain links after the sibling faces so that
        // enumeration yields faces first, mip successor last.
        link_mip_chain(&root_ids);
        root
    }

    /// Flip chain: a front buffer owning N back buffers linked front to
    /// back with flip-successor edges.
    fn build_flip_chain(
        &self,
        desc: &SurfaceDesc,
        width: u32,
        height: u32,
        format: PixelFormat,
        caps: SurfaceCaps,
        version: InterfaceVersion,
    ) -> Arc<SurfaceIdentity> {
        let single = [MipLevel { width, height }];
        let root_ids = self.make_levels(
            &single,
            format,
            caps,
            desc.ext_caps,
            desc.ck_src_blt,
            desc.ck_dest_blt,
            desc.back_buffer_count,
            version,
        );
        let root = Arc::clone(&root_ids[0]);

        let back_caps = SurfaceCaps {
            primary: false,
            complex: false,
            ..caps
        };
        let mut front = Arc::clone(&root);
        for _ in 0..desc.back_buffer_count {
            let ids = self.make_levels(
                &single,
                format,
                back_caps,
                desc.ext_caps,
                None,
                None,
                0,
                version,
            );
            front.attach_child(AttachmentKind::FlipSuccessor, &ids[0]);
            front = Arc::clone(&ids[0]);
        }
        root
    }

    /// Lazy iterator over the existing surfaces of this device. Scope and
    /// filter semantics follow `EnumScope`; each yielded handle carries a
    /// new reference the consumer must release.
    pub fn existing_surfaces(
        &self,
        scope: EnumScope,
        filter: Option<&SurfaceDesc>,
    ) -> Result<ExistingSurfaces> {
        ExistingSurfaces::new(
            self.identity.live_surfaces(),
            scope,
            filter,
            self.facade.version,
        )
    }

    /// Callback form of `existing_surfaces`; stops early on
    /// `EnumAction::Stop`. The callback owns each handle it receives.
    pub fn enum_surfaces_with<F>(
        &self,
        scope: EnumScope,
        filter: Option<&SurfaceDesc>,
        mut callback: F,
    ) -> Result<()>
    where
        F: FnMut(SurfaceHandle) -> EnumAction,
    {
        for surface in self.existing_surfaces(scope, filter)? {
            if callback(surface) == EnumAction::Stop {
                break;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("version", &self.facade.version)
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// Link a built chain with mip-successor edges, parent to child.
fn link_mip_chain(ids: &[Arc<SurfaceIdentity>]) {
    for pair in ids.windows(2) {
        pair[0].attach_child(AttachmentKind::MipSuccessor, &pair[1]);
    }
}
