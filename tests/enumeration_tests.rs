//! Integration tests for device-wide surface enumeration: scopes,
//! descriptor filters, callback early exit, and reference handling.

use dsurf::{
    DeviceHandle, EnumAction, EnumScope, InterfaceVersion, SurfaceCaps, SurfaceDesc, SurfaceError,
};

fn device_with_three_surfaces() -> (DeviceHandle, Vec<dsurf::SurfaceHandle>) {
    let dev = DeviceHandle::create(InterfaceVersion::V4).unwrap();
    let mut handles = Vec::new();
    for (w, h) in [(64, 64), (64, 32), (16, 16)] {
        handles.push(dev.create_surface(&SurfaceDesc::sized(w, h)).unwrap());
    }
    (dev, handles)
}

#[test]
fn existing_all_yields_every_live_surface() {
    let (dev, handles) = device_with_three_surfaces();

    let mut seen = 0;
    for surface in dev
        .existing_surfaces(EnumScope::existing_all(), None)
        .unwrap()
    {
        assert_eq!(surface.version(), InterfaceVersion::V4);
        seen += 1;
        surface.release();
    }
    assert_eq!(seen, 3);

    for handle in handles {
        handle.release();
    }
    dev.release();
}

#[test]
fn matching_scope_applies_the_descriptor_filter() {
    let (dev, handles) = device_with_three_surfaces();

    let mut filter = SurfaceDesc::default();
    filter.fields.width = true;
    filter.width = 64;

    let mut dims = Vec::new();
    for surface in dev
        .existing_surfaces(EnumScope::existing_matching(), Some(&filter))
        .unwrap()
    {
        let report = surface.describe();
        dims.push((report.width, report.height));
        surface.release();
    }
    dims.sort_unstable();
    assert_eq!(dims, vec![(64, 32), (64, 64)]);

    for handle in handles {
        handle.release();
    }
    dev.release();
}

#[test]
fn caps_filter_selects_by_capability() {
    let dev = DeviceHandle::create(InterfaceVersion::V1).unwrap();
    let plain = dev.create_surface(&SurfaceDesc::sized(32, 32)).unwrap();

    let mut tex_desc = SurfaceDesc::sized(32, 32);
    tex_desc.fields.caps = true;
    tex_desc.caps.texture = true;
    let texture = dev.create_surface(&tex_desc).unwrap();

    let mut filter = SurfaceDesc::default();
    filter.fields.caps = true;
    filter.caps = SurfaceCaps {
        texture: true,
        ..Default::default()
    };

    let mut seen = 0;
    for surface in dev
        .existing_surfaces(EnumScope::existing_matching(), Some(&filter))
        .unwrap()
    {
        assert!(surface.describe().caps.texture);
        assert!(surface.same_surface(&texture));
        seen += 1;
        surface.release();
    }
    assert_eq!(seen, 1);

    plain.release();
    texture.release();
    dev.release();
}

#[test]
fn callback_stop_ends_the_walk_early() {
    let (dev, handles) = device_with_three_surfaces();

    let mut seen = 0;
    dev.enum_surfaces_with(EnumScope::existing_all(), None, |surface| {
        seen += 1;
        surface.release();
        if seen == 2 {
            EnumAction::Stop
        } else {
            EnumAction::Continue
        }
    })
    .unwrap();
    assert_eq!(seen, 2);

    for handle in handles {
        handle.release();
    }
    dev.release();
}

#[test]
fn invalid_scopes_are_rejected() {
    let (dev, handles) = device_with_three_surfaces();

    assert!(matches!(
        dev.existing_surfaces(EnumScope::default(), None),
        Err(SurfaceError::InvalidParameter(_))
    ));

    let canbe = EnumScope {
        can_be_created: true,
        all: true,
        ..Default::default()
    };
    assert!(matches!(
        dev.existing_surfaces(canbe, None),
        Err(SurfaceError::Unsupported(_))
    ));

    // MATCH without a filter descriptor has nothing to match against.
    assert!(matches!(
        dev.existing_surfaces(EnumScope::existing_matching(), None),
        Err(SurfaceError::InvalidParameter(_))
    ));

    for handle in handles {
        handle.release();
    }
    dev.release();
}

#[test]
fn released_surfaces_stop_appearing() {
    let (dev, mut handles) = device_with_three_surfaces();

    handles.pop().unwrap().release();
    let count = dev
        .existing_surfaces(EnumScope::existing_all(), None)
        .unwrap()
        .map(|s| s.release())
        .count();
    assert_eq!(count, 2);

    for handle in handles {
        handle.release();
    }
    let count = dev
        .existing_surfaces(EnumScope::existing_all(), None)
        .unwrap()
        .map(|s| s.release())
        .count();
    assert_eq!(count, 0);
    dev.release();
}
