//! Pixel buffer storage and the scoped lock contract.
//!
//! A `SurfaceStore` owns the raw bytes behind one surface. Pixel data is
//! visible and mutable only inside a lock/unlock bracket: `lock` hands out
//! a guard with exclusive access, and a second lock before the guard drops
//! fails with `SurfaceBusy`.

use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Result, SurfaceError};
use crate::surface::format::PixelFormat;

/// Raw pixel buffer with an exclusive lock contract.
#[derive(Debug)]
pub struct SurfaceStore {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Mutex<Vec<u8>>,
    locked: AtomicBool,
}

impl SurfaceStore {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let bytes = (width as usize) * (height as usize) * format.bytes_per_pixel() as usize;
        Self {
            width,
            height,
            format,
            pixels: Mutex::new(vec![0; bytes]),
            locked: AtomicBool::new(false),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes in one row of pixels.
    pub fn pitch(&self) -> u32 {
        self.width * self.format.bytes_per_pixel()
    }

    /// Acquire exclusive scoped access to the pixel buffer. Fails with
    /// `SurfaceBusy` while another guard is outstanding.
    pub fn lock(&self) -> Result<LockGuard<'_>> {
        if self.locked.swap(true, Ordering::AcqRel) {
            return Err(SurfaceError::SurfaceBusy);
        }
        Ok(LockGuard {
            store: self,
            data: self.pixels.lock(),
        })
    }

    /// Drop the backing storage. Called on identity teardown; the buffer
    /// must not be locked at that point.
    pub(crate) fn discard(&self) {
        let mut data = self.pixels.lock();
        data.clear();
        data.shrink_to_fit();
    }
}

/// Exclusive access window onto a store's pixels. Unlock happens on drop.
pub struct LockGuard<'a> {
    store: &'a SurfaceStore,
    data: MutexGuard<'a, Vec<u8>>,
}

impl LockGuard<'_> {
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn offset(&self, index: usize) -> usize {
        index * self.store.format.bytes_per_pixel() as usize
    }

    /// Read the packed pixel value at a linear pixel index. Values narrower
    /// than 32 bits are zero-extended.
    pub fn read_packed(&self, index: usize) -> u32 {
        let bpp = self.store.format.bytes_per_pixel() as usize;
        let off = self.offset(index);
        let mut value = 0u32;
        for i in 0..bpp {
            value |= (self.data[off + i] as u32) << (8 * i);
        }
        value
    }

    /// Write a packed pixel value at a linear pixel index, little-endian.
    pub fn write_packed(&mut self, index: usize, value: u32) {
        let bpp = self.store.format.bytes_per_pixel() as usize;
        let off = self.offset(index);
        for i in 0..bpp {
            self.data[off + i] = (value >> (8 * i)) as u8;
        }
    }

    /// Fill every pixel with one packed value.
    pub fn fill(&mut self, value: u32) {
        let count = (self.store.width as usize) * (self.store.height as usize);
        for i in 0..count {
            self.write_packed(i, value);
        }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.store.locked.store(false, Ordering::Release);
    }
}
