use std::num::NonZero;
use std::ops::{Deref, DerefMut};
use std::os::fd::AsFd;
use std::ptr::NonNull;

use nix::libc::c_void;
use nix::sys::mman::{mmap, msync, munmap, MapFlags, MsFlags, ProtFlags};

use crate::error::Result;

/// A shared read/write view of a file descriptor, unmapped on drop.
#[derive(Debug)]
pub(crate) struct MappedView {
    ptr: NonNull<c_void>,
    len: NonZero<usize>,
}

impl MappedView {
    pub fn new<F: AsFd>(fd: &F, len: NonZero<usize>) -> Result<Self> {
        let ptr = unsafe {
            mmap(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                fd,
                0,
            )?
        };
        Ok(MappedView { ptr, len })
    }

    pub fn flush(&self) -> Result<()> {
        unsafe { msync(self.ptr, self.len.get(), MsFlags::MS_SYNC)? };
        Ok(())
    }
}

impl Drop for MappedView {
    fn drop(&mut self) {
        if let Err(err) = unsafe { munmap(self.ptr, self.len.get()) } {
            tracing::warn!(%err, len = self.len.get(), "munmap failed");
        }
    }
}

impl Deref for MappedView {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr() as *const u8, self.len.get()) }
    }
}

impl DerefMut for MappedView {
    fn deref_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr() as *mut u8, self.len.get()) }
    }
}
