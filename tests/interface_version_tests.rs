//! Integration tests for versioned facades: independent reference counts
//! per version, and the owning-device lookup returning the creation-time
//! device facade.

use dsurf::{DeviceHandle, InterfaceVersion, SurfaceDesc, SurfaceError};

#[test]
fn surface_facade_counters_stay_independent_across_versions() {
    let dev = DeviceHandle::create(InterfaceVersion::V1).unwrap();
    let s1 = dev.create_surface(&SurfaceDesc::sized(16, 16)).unwrap();
    assert_eq!(s1.version(), InterfaceVersion::V1);
    assert_eq!(s1.ref_count(), 1);

    let s2 = s1.query_interface(InterfaceVersion::V2);
    let s3 = s1.query_interface(InterfaceVersion::V3);
    let s7 = s3.query_interface(InterfaceVersion::V7);
    assert!(s1.same_surface(&s7));
    assert_eq!(s1.ref_count(), 1);
    assert_eq!(s2.ref_count(), 1);
    assert_eq!(s3.ref_count(), 1);
    assert_eq!(s7.ref_count(), 1);

    // Re-querying an already-materialized version bumps only that counter.
    let s2_again = s7.query_interface(InterfaceVersion::V2);
    assert!(s2_again.same_facade(&s2));
    assert_eq!(s2.ref_count(), 2);
    assert_eq!(s1.ref_count(), 1);
    assert_eq!(s7.ref_count(), 1);

    assert_eq!(s2_again.release(), 1);
    assert_eq!(s2.release(), 0);
    assert_eq!(s3.release(), 0);
    assert_eq!(s7.release(), 0);
    assert_eq!(s1.release(), 0);
    dev.release();
}

#[test]
fn owning_device_returns_the_creation_version_facade() {
    for version in [
        InterfaceVersion::V1,
        InterfaceVersion::V2,
        InterfaceVersion::V4,
        InterfaceVersion::V7,
    ] {
        let dev = DeviceHandle::create(version).unwrap();
        let surface = dev.create_surface(&SurfaceDesc::sized(8, 8)).unwrap();

        // Ask through a different surface version; the answer still names
        // the device version the surface was created through.
        let s7 = surface.query_interface(InterfaceVersion::V7);
        let owner = s7.owning_device().unwrap();
        assert_eq!(owner.version(), version);
        assert!(owner.same_facade(&dev));
        assert_eq!(dev.ref_count(), 2);

        owner.release();
        assert_eq!(dev.ref_count(), 1);
        s7.release();
        surface.release();
        dev.release();
    }
}

#[test]
fn owning_device_bumps_only_the_creation_version_counter() {
    let dev1 = DeviceHandle::create(InterfaceVersion::V1).unwrap();
    let dev4 = dev1.query_interface(InterfaceVersion::V4).unwrap();
    let dev7 = dev1.query_interface(InterfaceVersion::V7).unwrap();

    let surface = dev4.create_surface(&SurfaceDesc::sized(8, 8)).unwrap();
    assert_eq!(dev1.ref_count(), 1);
    assert_eq!(dev4.ref_count(), 1);
    assert_eq!(dev7.ref_count(), 1);

    let owner = surface.owning_device().unwrap();
    assert_eq!(owner.version(), InterfaceVersion::V4);
    assert_eq!(dev4.ref_count(), 2);
    assert_eq!(dev1.ref_count(), 1);
    assert_eq!(dev7.ref_count(), 1);

    owner.release();
    surface.release();
    dev7.release();
    dev4.release();
    dev1.release();
}

#[test]
fn device_raw_interface_queries() {
    let dev = DeviceHandle::create(InterfaceVersion::V2).unwrap();

    assert!(matches!(
        dev.query_interface_raw(0),
        Err(SurfaceError::InvalidParameter(_))
    ));
    assert_eq!(
        dev.query_interface_raw(5).err(),
        Some(SurfaceError::NoInterface(5))
    );
    // Version 3 exists only for surfaces.
    assert_eq!(
        dev.query_interface_raw(3).err(),
        Some(SurfaceError::NoInterface(3))
    );

    let dev7 = dev.query_interface_raw(7).unwrap();
    assert_eq!(dev7.version(), InterfaceVersion::V7);
    dev7.release();
    dev.release();
}

#[test]
fn surface_version_three_is_reachable_from_surfaces_only() {
    let dev = DeviceHandle::create(InterfaceVersion::V7).unwrap();
    let surface = dev.create_surface(&SurfaceDesc::sized(8, 8)).unwrap();

    let s3 = surface.query_interface_raw(3).unwrap();
    assert_eq!(s3.version(), InterfaceVersion::V3);
    assert_eq!(s3.ref_count(), 1);
    assert_eq!(surface.ref_count(), 1);

    s3.release();
    surface.release();
    dev.release();
}
