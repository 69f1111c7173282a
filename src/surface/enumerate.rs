//! Enumeration iterators.
//!
//! Both enumeration surfaces (attached children of one surface, and the
//! device-wide existing-surface walk) are pull-style: lazy, finite,
//! non-restartable, each element delivered exactly once per call, and each
//! yielded handle carries one new reference the consumer owns and must
//! release.

use std::sync::Arc;

use crate::device::InterfaceVersion;
use crate::error::{Result, SurfaceError};
use crate::surface::caps::SurfaceDesc;
use crate::surface::surface::{handle_on, SurfaceHandle, SurfaceIdentity};

/// Decision a consumer returns from an enumeration callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumAction {
    Continue,
    Stop,
}

/// Scope of a device-wide surface enumeration.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumScope {
    /// Walk surfaces that currently exist.
    pub does_exist: bool,
    /// Walk surfaces the backend could create (not implemented here).
    pub can_be_created: bool,
    /// Yield every surface, ignoring the descriptor filter.
    pub all: bool,
    /// Yield only surfaces matching the descriptor filter.
    pub matching: bool,
}

impl EnumScope {
    /// DOESEXIST | ALL: every live surface, no filtering.
    pub fn existing_all() -> Self {
        Self {
            does_exist: true,
            all: true,
            ..Default::default()
        }
    }

    /// DOESEXIST | MATCH: live surfaces passing the descriptor filter.
    pub fn existing_matching() -> Self {
        Self {
            does_exist: true,
            matching: true,
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.can_be_created {
            return Err(SurfaceError::Unsupported(
                "can-be-created enumeration needs a hardware backend",
            ));
        }
        if !self.does_exist {
            return Err(SurfaceError::InvalidParameter(
                "enumeration scope selects nothing",
            ));
        }
        if self.all == self.matching {
            return Err(SurfaceError::InvalidParameter(
                "enumeration scope must pick exactly one of ALL or MATCH",
            ));
        }
        Ok(())
    }
}

/// Iterator over the direct children of one surface, in attachment order.
pub struct AttachedSurfaces {
    children: Vec<Arc<SurfaceIdentity>>,
    version: InterfaceVersion,
    next: usize,
}

impl AttachedSurfaces {
    pub(crate) fn new(children: Vec<Arc<SurfaceIdentity>>, version: InterfaceVersion) -> Self {
        Self {
            children,
            version,
            next: 0,
        }
    }
}

impl Iterator for AttachedSurfaces {
    type Item = SurfaceHandle;

    fn next(&mut self) -> Option<SurfaceHandle> {
        let child = self.children.get(self.next)?;
        self.next += 1;
        Some(handle_on(child, self.version))
    }
}

/// Does a live surface match an enumeration descriptor filter? Only the
/// fields flagged present in the filter participate.
fn matches_filter(identity: &SurfaceIdentity, filter: &SurfaceDesc) -> bool {
    let info = &identity.info;
    if filter.fields.caps && !info.caps.contains(&filter.caps) {
        return false;
    }
    if filter.fields.width && info.width != filter.width {
        return false;
    }
    if filter.fields.height && info.height != filter.height {
        return false;
    }
    if filter.fields.pixel_format && !info.pixel_format.same_family(&filter.pixel_format) {
        return false;
    }
    if filter.fields.mip_count && info.mip_count != filter.mip_count {
        return false;
    }
    true
}

/// Iterator over every existing (not yet destroyed) surface of a device.
pub struct ExistingSurfaces {
    surfaces: Vec<Arc<SurfaceIdentity>>,
    version: InterfaceVersion,
    next: usize,
}

impl ExistingSurfaces {
    pub(crate) fn new(
        candidates: Vec<Arc<SurfaceIdentity>>,
        scope: EnumScope,
        filter: Option<&SurfaceDesc>,
        version: InterfaceVersion,
    ) -> Result<Self> {
        scope.validate()?;
        if scope.matching && filter.is_none() {
            return Err(SurfaceError::InvalidParameter(
                "matching enumeration needs a descriptor filter",
            ));
        }
        let surfaces = candidates
            .into_iter()
            .filter(|identity| !identity.is_destroyed())
            .filter(|identity| {
                if scope.all {
                    true
                } else {
                    matches_filter(identity, filter.expect("checked above"))
                }
            })
            .collect();
        Ok(Self {
            surfaces,
            version,
            next: 0,
        })
    }
}

impl Iterator for ExistingSurfaces {
    type Item = SurfaceHandle;

    fn next(&mut self) -> Option<SurfaceHandle> {
        let identity = self.surfaces.get(self.next)?;
        self.next += 1;
        Some(handle_on(identity, self.version))
    }
}
