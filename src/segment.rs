use std::num::NonZero;
use std::ops::Range;
use std::os::fd::{AsRawFd, OwnedFd};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::libc::off_t;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::{fstat, Mode};
use nix::unistd::ftruncate;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::mapping::MappedView;

/// A named POSIX shared memory segment mapped into this process.
///
/// A fresh segment is not mapped: `size()` is zero, reads come back empty and
/// writes are dropped. [`create`](Self::create) and [`open`](Self::open) map
/// it, [`close`](Self::close) (or drop) unmaps it again.
///
/// Range operations clamp to the mapped extent but reject an `offset` past
/// the end. Single-byte operations never fail: out of range reads are `None`
/// and out of range writes are ignored.
#[derive(Debug, Default)]
pub struct SharedSegment {
    inner: Option<Mapped>,
}

#[derive(Debug)]
struct Mapped {
    // Unmapped before the descriptor is closed.
    view: MappedView,
    _fd: OwnedFd,
    name: String,
    owner: bool,
}

impl SharedSegment {
    pub fn new() -> Self {
        SharedSegment { inner: None }
    }

    /// Creates a segment of exactly `size` zeroed bytes under `name`.
    ///
    /// If the name is already taken the existing object is mapped and
    /// zeroed instead, provided it holds at least `size` bytes. Only a name
    /// this call created is unlinked again when the segment closes.
    pub fn create(&mut self, name: &str, size: usize) -> Result<()> {
        let (len, flen) = check_args(name, size)?;
        self.close();

        let name = prepend_slash(name);
        let (fd, owner) = match shm_open(
            name.as_str(),
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
        ) {
            Ok(fd) => (fd, true),
            Err(Errno::EEXIST) => (open_existing(&name, flen)?, false),
            Err(err) => return Err(err.into()),
        };
        let guard = owner.then(|| UnlinkGuard::new(&name));
        if owner {
            ftruncate(&fd, flen)?;
        }
        let mut view = MappedView::new(&fd, len)?;
        view.fill(0);
        // Consume the whole Option so the borrow of `name` ends here.
        if let Some(guard) = { guard } {
            guard.disarm();
        }

        debug!(name = %name, size, owner, "created segment");
        self.inner = Some(Mapped {
            view,
            _fd: fd,
            name,
            owner,
        });
        Ok(())
    }

    /// Maps the first `size` bytes of an existing segment. Content is left
    /// as it is.
    pub fn open(&mut self, name: &str, size: usize) -> Result<()> {
        let (len, flen) = check_args(name, size)?;
        self.close();

        let name = prepend_slash(name);
        let fd = open_existing(&name, flen)?;
        let view = MappedView::new(&fd, len)?;

        debug!(name = %name, size, "opened segment");
        self.inner = Some(Mapped {
            view,
            _fd: fd,
            name,
            owner: false,
        });
        Ok(())
    }

    /// Unmaps the segment. Calling this when nothing is mapped does nothing.
    pub fn close(&mut self) {
        let Some(mapped) = self.inner.take() else {
            return;
        };
        let Mapped {
            view,
            _fd: fd,
            name,
            owner,
        } = mapped;
        drop(view);
        drop(fd);
        if owner {
            // Ignore ENOENT in case somebody already unlinked it.
            match shm_unlink(name.as_str()) {
                Ok(()) | Err(Errno::ENOENT) => (),
                Err(err) => warn!(name = %name, %err, "shm_unlink failed"),
            }
        }
        debug!(name = %name, "closed segment");
    }

    /// Removes a named segment, e.g. one left behind by a crashed process.
    /// Processes that still map it keep their view.
    pub fn unlink(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("name cannot be empty"));
        }
        shm_unlink(prepend_slash(name).as_str())?;
        Ok(())
    }

    pub fn is_mapped(&self) -> bool {
        self.inner.is_some()
    }

    /// Mapped length in bytes, zero when not mapped.
    pub fn size(&self) -> usize {
        self.inner.as_ref().map_or(0, |m| m.view.len())
    }

    /// Name of the mapped segment, with its leading slash.
    pub fn name(&self) -> Option<&str> {
        self.inner.as_ref().map(|m| m.name.as_str())
    }

    /// True if this segment created the mapped object.
    pub fn is_owner(&self) -> bool {
        self.inner.as_ref().is_some_and(|m| m.owner)
    }

    /// Reads up to `length` bytes starting at `offset`.
    ///
    /// The result is truncated at the end of the segment, so `offset ==
    /// size()` yields nothing. An `offset` beyond `size()` is an error.
    pub fn read_range(&self, offset: usize, length: usize) -> Result<Vec<u8>> {
        let range = self.clamp(offset, length)?;
        Ok(self.bytes()[range].to_vec())
    }

    /// Like [`read_range`](Self::read_range) but copies into `buf`,
    /// returning how many bytes were copied.
    pub fn read_into(&self, offset: usize, buf: &mut [u8]) -> Result<usize> {
        let range = self.clamp(offset, buf.len())?;
        let n = range.len();
        buf[..n].copy_from_slice(&self.bytes()[range]);
        Ok(n)
    }

    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.bytes().get(offset).copied()
    }

    /// Writes as much of `data` as fits at `offset` and returns the count.
    pub fn write_range(&mut self, offset: usize, data: &[u8]) -> Result<usize> {
        let range = self.clamp(offset, data.len())?;
        let n = range.len();
        if let Some(mapped) = &mut self.inner {
            mapped.view[range].copy_from_slice(&data[..n]);
        }
        Ok(n)
    }

    pub fn write_byte(&mut self, offset: usize, value: u8) {
        if let Some(b) = self.inner.as_mut().and_then(|m| m.view.get_mut(offset)) {
            *b = value;
        }
    }

    /// Synchronously flushes the view with `msync`.
    pub fn flush(&self) -> Result<()> {
        match &self.inner {
            Some(mapped) => mapped.view.flush(),
            None => Ok(()),
        }
    }

    fn bytes(&self) -> &[u8] {
        match &self.inner {
            Some(mapped) => &mapped.view[..],
            None => &[],
        }
    }

    fn clamp(&self, offset: usize, length: usize) -> Result<Range<usize>> {
        let size = self.size();
        if size == 0 {
            return Ok(0..0);
        }
        if offset > size {
            return Err(Error::InvalidArgument("offset is out of range"));
        }
        Ok(offset..offset + length.min(size - offset))
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        self.close();
    }
}

fn check_args(name: &str, size: usize) -> Result<(NonZero<usize>, off_t)> {
    if name.is_empty() {
        return Err(Error::InvalidArgument("name cannot be empty"));
    }
    let len = NonZero::new(size).ok_or(Error::InvalidArgument("size cannot be zero"))?;
    let flen = off_t::try_from(size).map_err(|_| Error::InvalidArgument("size is too large"))?;
    Ok((len, flen))
}

/// Opens an existing object that holds at least `flen` bytes.
fn open_existing(name: &str, flen: off_t) -> Result<OwnedFd> {
    let fd = shm_open(name, OFlag::O_RDWR, Mode::empty())?;
    let statbuf = fstat(fd.as_raw_fd())?;
    // Pages past the end of the object would fault on access.
    if statbuf.st_size < flen {
        debug!(name, wanted = flen, actual = statbuf.st_size, "segment too small");
        return Err(Error::platform(Errno::EINVAL));
    }
    Ok(fd)
}

fn prepend_slash(name: &str) -> String {
    if name.starts_with('/') {
        String::from(name)
    } else {
        String::from("/") + name
    }
}

/// Unlinks a freshly created name unless the creation went through.
struct UnlinkGuard<'a> {
    name: &'a str,
    armed: bool,
}

impl<'a> UnlinkGuard<'a> {
    fn new(name: &'a str) -> Self {
        UnlinkGuard { name, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for UnlinkGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            match shm_unlink(self.name) {
                Ok(()) | Err(Errno::ENOENT) => (),
                Err(err) => warn!(name = self.name, %err, "shm_unlink failed"),
            }
        }
    }
}
