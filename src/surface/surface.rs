//! Surface objects: the aggregation core and its per-version facades.
//!
//! One `SurfaceIdentity` exists per created surface. It owns the pixel
//! store, the stored color keys, and the attachment out-edges. Callers
//! never see the identity directly; they hold `SurfaceHandle`s, each bound
//! to one per-version `SurfaceFacade` whose reference counter is
//! independent of every sibling facade's. The identity is torn down when
//! the sum of all facade counters reaches zero and no parent surface holds
//! an edge to it; teardown releases the out-edges, which cascades down
//! chains whose levels have no references of their own.

use log::{debug, trace};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use crate::device::{handle_for_version, DeviceHandle, DeviceIdentity, InterfaceVersion};
use crate::error::{Result, SurfaceError};
use crate::surface::attach::{validate_mip_attach, AttachPoint, AttachmentKind};
use crate::surface::caps::{ColorKey, ColorKeyKind, ExtCaps, SurfaceCaps};
use crate::surface::enumerate::{AttachedSurfaces, EnumAction};
use crate::surface::format::PixelFormat;
use crate::surface::store::{LockGuard, SurfaceStore};

/// Immutable description fixed at creation time.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceInfo {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub caps: SurfaceCaps,
    pub ext_caps: ExtCaps,
    /// Levels in the chain from this surface down, inclusive. Zero for
    /// surfaces without the MIPMAP capability.
    pub mip_count: u32,
    pub back_buffer_count: u32,
}

/// Snapshot returned by `SurfaceHandle::describe`.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceReport {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub caps: SurfaceCaps,
    pub ext_caps: ExtCaps,
    pub mip_count: u32,
    pub back_buffer_count: u32,
    pub ck_src_blt: Option<ColorKey>,
    pub ck_dest_blt: Option<ColorKey>,
}

#[derive(Debug, Default)]
struct StoredKeys {
    src_blt: Option<ColorKey>,
    dest_blt: Option<ColorKey>,
}

/// Directed out-edge of the attachment graph. The edge owns the child:
/// a chain stays alive as long as its root does.
pub(crate) struct Attachment {
    pub(crate) kind: AttachmentKind,
    pub(crate) child: Arc<SurfaceIdentity>,
}

/// One interface version's view of a surface, with its own counter.
#[derive(Debug)]
pub struct SurfaceFacade {
    version: InterfaceVersion,
    refs: AtomicU32,
}

/// The aggregation core behind all facades of one surface.
pub(crate) struct SurfaceIdentity {
    pub(crate) info: SurfaceInfo,
    pub(crate) store: SurfaceStore,
    keys: Mutex<StoredKeys>,
    pub(crate) attachments: Mutex<Vec<Attachment>>,
    facades: Mutex<Vec<Arc<SurfaceFacade>>>,
    /// Number of parent edges currently pointing at this surface.
    structural: AtomicU32,
    destroyed: AtomicBool,
    pub(crate) device: Weak<DeviceIdentity>,
    pub(crate) created_via: InterfaceVersion,
}

impl SurfaceIdentity {
    pub(crate) fn new(
        info: SurfaceInfo,
        device: Weak<DeviceIdentity>,
        created_via: InterfaceVersion,
        ck_src_blt: Option<ColorKey>,
        ck_dest_blt: Option<ColorKey>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store: SurfaceStore::new(info.width, info.height, info.pixel_format),
            info,
            keys: Mutex::new(StoredKeys {
                src_blt: ck_src_blt,
                dest_blt: ck_dest_blt,
            }),
            attachments: Mutex::new(Vec::new()),
            facades: Mutex::new(Vec::new()),
            structural: AtomicU32::new(0),
            destroyed: AtomicBool::new(false),
            device,
            created_via,
        })
    }

    /// Sum of every facade's counter.
    fn facade_total(&self) -> u32 {
        self.facades
            .lock()
            .iter()
            .map(|f| f.refs.load(Ordering::SeqCst))
            .sum()
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Get or create the facade for `version` without touching its counter.
    fn facade_for(&self, version: InterfaceVersion) -> Arc<SurfaceFacade> {
        let mut facades = self.facades.lock();
        if let Some(existing) = facades.iter().find(|f| f.version == version) {
            return Arc::clone(existing);
        }
        let facade = Arc::new(SurfaceFacade {
            version,
            refs: AtomicU32::new(0),
        });
        facades.push(Arc::clone(&facade));
        facade
    }

    /// Link `child` under `self`. Creation-time graph building and the
    /// validated manual-attach path both end up here.
    pub(crate) fn attach_child(&self, kind: AttachmentKind, child: &Arc<SurfaceIdentity>) {
        child.structural.fetch_add(1, Ordering::SeqCst);
        self.attachments.lock().push(Attachment {
            kind,
            child: Arc::clone(child),
        });
    }

    pub(crate) fn attach_point(&self) -> AttachPoint {
        let has_mip_successor = self
            .attachments
            .lock()
            .iter()
            .any(|a| a.kind == AttachmentKind::MipSuccessor);
        AttachPoint {
            width: self.info.width,
            height: self.info.height,
            pixel_format: self.info.pixel_format,
            caps: self.info.caps,
            has_mip_successor,
        }
    }

    pub(crate) fn stored_key(&self, kind: ColorKeyKind) -> Option<ColorKey> {
        let keys = self.keys.lock();
        match kind {
            ColorKeyKind::SrcBlt => keys.src_blt,
            ColorKeyKind::DestBlt => keys.dest_blt,
        }
    }

    /// Snapshot of the direct children, in attachment order.
    pub(crate) fn children(&self) -> Vec<Arc<SurfaceIdentity>> {
        self.attachments
            .lock()
            .iter()
            .map(|a| Arc::clone(&a.child))
            .collect()
    }

    /// Tear the surface down if nothing references it: all facade counters
    /// zero and no parent edge. Releases out-edges, cascading to children
    /// that are themselves unreferenced.
    pub(crate) fn maybe_destroy(self: &Arc<Self>) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        if self.facade_total() != 0 || self.structural.load(Ordering::SeqCst) != 0 {
            return;
        }
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(
            "destroying {}x{} surface and releasing its attachments",
            self.info.width, self.info.height
        );
        let edges = std::mem::take(&mut *self.attachments.lock());
        self.store.discard();
        for edge in edges {
            edge.child.structural.fetch_sub(1, Ordering::SeqCst);
            edge.child.maybe_destroy();
        }
    }
}

/// Hand out a handle on `identity` through the facade for `version`,
/// incrementing that facade's counter by exactly one.
pub(crate) fn handle_on(identity: &Arc<SurfaceIdentity>, version: InterfaceVersion) -> SurfaceHandle {
    let facade = identity.facade_for(version);
    facade.refs.fetch_add(1, Ordering::SeqCst);
    SurfaceHandle {
        identity: Arc::clone(identity),
        facade,
    }
}

/// A caller-owned reference to one surface facade.
///
/// Handles carry explicit reference semantics: every handle obtained from
/// creation, `query_interface`, `attached_surface`, or enumeration owns
/// one count on its facade and must be passed to `release` exactly once.
/// Dropping a handle without releasing leaks the logical reference.
pub struct SurfaceHandle {
    pub(crate) identity: Arc<SurfaceIdentity>,
    facade: Arc<SurfaceFacade>,
}

impl SurfaceHandle {
    /// Interface version this handle speaks.
    pub fn version(&self) -> InterfaceVersion {
        self.facade.version
    }

    /// Current counter of this handle's facade. Sibling facades are not
    /// included.
    pub fn ref_count(&self) -> u32 {
        self.facade.refs.load(Ordering::SeqCst)
    }

    /// Take an additional reference on this facade, returning a new handle.
    pub fn add_ref(&self) -> SurfaceHandle {
        self.facade.refs.fetch_add(1, Ordering::SeqCst);
        SurfaceHandle {
            identity: Arc::clone(&self.identity),
            facade: Arc::clone(&self.facade),
        }
    }

    /// Give up this reference. Returns the facade's remaining count. When
    /// every facade of the identity reaches zero and no parent edge holds
    /// the surface, the identity is destroyed.
    pub fn release(self) -> u32 {
        let prev = self.facade.refs.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "facade counter underflow");
        self.identity.maybe_destroy();
        prev.saturating_sub(1)
    }

    /// Two handles view the same facade (same identity, same version).
    pub fn same_facade(&self, other: &SurfaceHandle) -> bool {
        Arc::ptr_eq(&self.facade, &other.facade)
    }

    /// Two handles view the same underlying surface, any version.
    pub fn same_surface(&self, other: &SurfaceHandle) -> bool {
        Arc::ptr_eq(&self.identity, &other.identity)
    }

    /// Request another interface version of this surface. The matching
    /// facade is created on first request; its counter is always
    /// incremented by exactly one.
    pub fn query_interface(&self, version: InterfaceVersion) -> SurfaceHandle {
        trace!("surface query_interface -> {:?}", version);
        handle_on(&self.identity, version)
    }

    /// `query_interface` addressed by raw version number: 0 is a malformed
    /// request, unknown numbers name no interface.
    pub fn query_interface_raw(&self, raw: u32) -> Result<SurfaceHandle> {
        if raw == 0 {
            return Err(SurfaceError::InvalidParameter("null interface id"));
        }
        let version =
            InterfaceVersion::from_raw(raw).ok_or(SurfaceError::NoInterface(raw))?;
        Ok(self.query_interface(version))
    }

    /// Describe the surface: fixed creation-time attributes plus the
    /// current color keys.
    pub fn describe(&self) -> SurfaceReport {
        let info = &self.identity.info;
        SurfaceReport {
            width: info.width,
            height: info.height,
            pixel_format: info.pixel_format,
            caps: info.caps,
            ext_caps: info.ext_caps,
            mip_count: info.mip_count,
            back_buffer_count: info.back_buffer_count,
            ck_src_blt: self.identity.stored_key(ColorKeyKind::SrcBlt),
            ck_dest_blt: self.identity.stored_key(ColorKeyKind::DestBlt),
        }
    }

    /// Acquire exclusive scoped access to the pixel buffer.
    pub fn lock(&self) -> Result<LockGuard<'_>> {
        self.identity.store.lock()
    }

    /// Read a stored blit color key.
    pub fn color_key(&self, kind: ColorKeyKind) -> Result<ColorKey> {
        self.identity
            .stored_key(kind)
            .ok_or(SurfaceError::NotFound("no color key of that kind is set"))
    }

    /// Store or clear a blit color key. A key with low > high is rejected.
    pub fn set_color_key(&self, kind: ColorKeyKind, key: Option<ColorKey>) -> Result<()> {
        if let Some(key) = key {
            if key.low > key.high {
                return Err(SurfaceError::InvalidParameter(
                    "color key range has low > high",
                ));
            }
        }
        let mut keys = self.identity.keys.lock();
        match kind {
            ColorKeyKind::SrcBlt => keys.src_blt = key,
            ColorKeyKind::DestBlt => keys.dest_blt = key,
        }
        Ok(())
    }

    /// First direct child whose caps contain every flag set in `filter`.
    /// The returned handle carries a new reference owned by the caller.
    pub fn attached_surface(&self, filter: &SurfaceCaps) -> Result<SurfaceHandle> {
        let children = self.identity.children();
        children
            .iter()
            .find(|c| c.info.caps.contains(filter))
            .map(|c| handle_on(c, self.facade.version))
            .ok_or(SurfaceError::NotFound("no attached surface matches"))
    }

    /// Iterate the direct children in attachment order. Each yielded
    /// handle carries a new reference the consumer owns.
    pub fn enum_attached(&self) -> AttachedSurfaces {
        AttachedSurfaces::new(self.identity.children(), self.facade.version)
    }

    /// Callback form of `enum_attached`; stops on `EnumAction::Stop`.
    /// The callback owns each handle it receives.
    pub fn enum_attached_with<F>(&self, mut callback: F)
    where
        F: FnMut(SurfaceHandle) -> EnumAction,
    {
        for child in self.enum_attached() {
            if callback(child) == EnumAction::Stop {
                break;
            }
        }
    }

    /// Manually attach `child` as this surface's mip successor. Fails with
    /// `CannotAttach` (mutating nothing) unless the pair forms a valid
    /// half-size texture relation. The graph stays acyclic: attaching a
    /// surface to itself, or to anything its own subtree already reaches,
    /// is rejected. The half-size rule alone would admit both at 1x1,
    /// where halving is a fixed point.
    pub fn add_attached_surface(&self, child: &SurfaceHandle) -> Result<()> {
        if Arc::ptr_eq(&self.identity, &child.identity) {
            return Err(SurfaceError::CannotAttach(
                "surface cannot attach to itself",
            ));
        }
        if reaches(&child.identity, &self.identity) {
            return Err(SurfaceError::CannotAttach(
                "attachment would create a cycle",
            ));
        }
        validate_mip_attach(
            &self.identity.attach_point(),
            &child.identity.attach_point(),
        )?;
        self.identity
            .attach_child(AttachmentKind::MipSuccessor, &child.identity);
        Ok(())
    }

    /// The device facade of the version this surface was created through.
    /// That facade's counter is incremented by exactly one; sibling
    /// version counters are untouched, whichever surface version asks.
    pub fn owning_device(&self) -> Result<DeviceHandle> {
        let device = self
            .identity
            .device
            .upgrade()
            .ok_or(SurfaceError::NotFound("owning device is gone"))?;
        Ok(handle_for_version(&device, self.identity.created_via))
    }
}

/// Whether `target` is reachable from `from` along attachment out-edges.
/// The graph is acyclic, so the walk terminates.
fn reaches(from: &Arc<SurfaceIdentity>, target: &Arc<SurfaceIdentity>) -> bool {
    if Arc::ptr_eq(from, target) {
        return true;
    }
    from.children().iter().any(|child| reaches(child, target))
}

impl std::fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceHandle")
            .field("version", &self.facade.version)
            .field("refs", &self.ref_count())
            .field("width", &self.identity.info.width)
            .field("height", &self.identity.info.height)
            .finish()
    }
}
