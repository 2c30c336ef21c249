//! Physical memory mapping for MMIO access
//!
//! Maps a device's register window out of `/dev/mem` (or any file that
//! supports `mmap`) and performs volatile accesses on it.
//!
//! # Safety
//!
//! Accessing physical memory is inherently unsafe and requires root privileges.
//! Every access is bounds-checked against the requested window; alignment
//! decides whether a transfer is done as one wide access or byte by byte.

use crate::error::{DevicetreeError, Result};
use std::path::Path;

/// A mapped region of physical memory
#[cfg(unix)]
pub struct PhysMap {
    /// Pointer to the first byte of the requested window
    ptr: *mut u8,
    /// Size of the requested window
    len: usize,
    /// Page offset of `ptr` inside the mapping
    page_offset: usize,
    /// Size of the whole (page-rounded) mapping
    map_size: usize,
    /// Physical address (for error reporting)
    phys_addr: u64,
}

#[cfg(unix)]
impl PhysMap {
    /// Map `size` bytes of physical memory starting at `phys_addr`
    ///
    /// `mem` is normally `/dev/mem`. It is opened with `O_SYNC` for uncached
    /// access.
    pub fn new(mem: &Path, phys_addr: u64, size: usize) -> Result<Self> {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;
        use std::os::unix::io::AsRawFd;

        let map_err = |source| DevicetreeError::MemoryMap {
            address: phys_addr,
            size,
            source,
        };

        // Calculate page-aligned address and offset
        let page_mask = page_size() - 1;
        let page_offset = (phys_addr as usize) & page_mask;
        let aligned_addr = phys_addr & !(page_mask as u64);
        let map_size = size
            .checked_add(page_offset)
            .and_then(|n| n.checked_add(page_mask))
            .map(|n| n & !page_mask)
            .ok_or_else(|| {
                map_err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "window size overflows the address space",
                ))
            })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(mem)
            .map_err(map_err)?;

        let offset = libc::off_t::try_from(aligned_addr).map_err(|_| {
            map_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "address does not fit in off_t",
            ))
        })?;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                offset,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(map_err(std::io::Error::last_os_error()));
        }

        log::debug!(
            "Mapped {:#x} bytes at {:#x} from {}",
            size,
            phys_addr,
            mem.display()
        );

        Ok(Self {
            ptr: unsafe { (ptr as *mut u8).add(page_offset) },
            len: size,
            page_offset,
            map_size,
            phys_addr,
        })
    }

    /// Read `buf.len()` bytes at `offset` into `buf` (host byte order)
    pub fn read(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        self.check(offset, buf.len())?;
        match buf.len() {
            1 => buf[0] = self.read8(offset),
            2 if self.is_aligned(offset, 2) => {
                buf.copy_from_slice(&self.read16(offset).to_ne_bytes())
            }
            4 if self.is_aligned(offset, 4) => {
                buf.copy_from_slice(&self.read32(offset).to_ne_bytes())
            }
            8 if self.is_aligned(offset, 8) => {
                buf.copy_from_slice(&self.read64(offset).to_ne_bytes())
            }
            _ => {
                for (i, byte) in buf.iter_mut().enumerate() {
                    *byte = self.read8(offset + i);
                }
            }
        }
        Ok(())
    }

    /// Write `data` at `offset` (host byte order)
    pub fn write(&self, offset: usize, data: &[u8]) -> Result<()> {
        self.check(offset, data.len())?;
        match *data {
            [b] => self.write8(offset, b),
            [b0, b1] if self.is_aligned(offset, 2) => {
                self.write16(offset, u16::from_ne_bytes([b0, b1]))
            }
            [b0, b1, b2, b3] if self.is_aligned(offset, 4) => {
                self.write32(offset, u32::from_ne_bytes([b0, b1, b2, b3]))
            }
            [b0, b1, b2, b3, b4, b5, b6, b7] if self.is_aligned(offset, 8) => self.write64(
                offset,
                u64::from_ne_bytes([b0, b1, b2, b3, b4, b5, b6, b7]),
            ),
            _ => {
                for (i, &byte) in data.iter().enumerate() {
                    self.write8(offset + i, byte);
                }
            }
        }
        Ok(())
    }

    fn check(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(DevicetreeError::OutOfWindow {
                offset,
                len,
                size: self.len,
            }),
        }
    }

    fn is_aligned(&self, offset: usize, width: usize) -> bool {
        (self.ptr as usize + offset) % width == 0
    }

    #[inline]
    fn read8(&self, offset: usize) -> u8 {
        unsafe { core::ptr::read_volatile(self.ptr.add(offset)) }
    }

    #[inline]
    fn read16(&self, offset: usize) -> u16 {
        unsafe { core::ptr::read_volatile(self.ptr.add(offset) as *const u16) }
    }

    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        unsafe { core::ptr::read_volatile(self.ptr.add(offset) as *const u32) }
    }

    #[inline]
    fn read64(&self, offset: usize) -> u64 {
        unsafe { core::ptr::read_volatile(self.ptr.add(offset) as *const u64) }
    }

    #[inline]
    fn write8(&self, offset: usize, value: u8) {
        unsafe { core::ptr::write_volatile(self.ptr.add(offset), value) }
    }

    #[inline]
    fn write16(&self, offset: usize, value: u16) {
        unsafe { core::ptr::write_volatile(self.ptr.add(offset) as *mut u16, value) }
    }

    #[inline]
    fn write32(&self, offset: usize, value: u32) {
        unsafe { core::ptr::write_volatile(self.ptr.add(offset) as *mut u32, value) }
    }

    #[inline]
    fn write64(&self, offset: usize, value: u64) {
        unsafe { core::ptr::write_volatile(self.ptr.add(offset) as *mut u64, value) }
    }

    /// Get the physical address of this mapping
    pub fn phys_addr(&self) -> u64 {
        self.phys_addr
    }

    /// Get the size of the mapped window
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-sized window
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(unix)]
impl Drop for PhysMap {
    fn drop(&mut self) {
        log::trace!("Unmapping {:#x}", self.phys_addr);
        unsafe {
            let base = self.ptr.sub(self.page_offset);
            libc::munmap(base as *mut libc::c_void, self.map_size);
        }
    }
}

#[cfg(unix)]
fn page_size() -> usize {
    match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        n if n > 0 => n as usize,
        _ => 4096,
    }
}

// Stub for non-Unix platforms
#[cfg(not(unix))]
pub struct PhysMap {
    _private: (),
}

#[cfg(not(unix))]
impl PhysMap {
    pub fn new(_mem: &Path, _phys_addr: u64, _size: usize) -> Result<Self> {
        Err(DevicetreeError::NotSupported(
            "Physical memory mapping only supported on Unix",
        ))
    }

    pub fn read(&self, _offset: usize, _buf: &mut [u8]) -> Result<()> {
        Err(DevicetreeError::NotSupported("Physical memory access"))
    }

    pub fn write(&self, _offset: usize, _data: &[u8]) -> Result<()> {
        Err(DevicetreeError::NotSupported("Physical memory access"))
    }

    pub fn phys_addr(&self) -> u64 {
        0
    }

    pub fn len(&self) -> usize {
        0
    }

    pub fn is_empty(&self) -> bool {
        true
    }
}
