// Shared memory backend for Linux
// Named segments live under /dev/shm and are mapped with mmap(MAP_SHARED)

use std::fmt::Debug;
use std::io;

/// Which side of the mailbox owns the segment's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Created the segment; unlinks its name on drop.
    Creator,
    /// Opened an existing segment; only unmaps on drop.
    Attacher,
}

/// Shared memory backend trait for cross-process memory mapping
pub trait SharedMemoryBackend: Send + Sync + Debug {
    /// Get a pointer to the mapped memory region
    fn as_ptr(&self) -> *mut u8;

    /// Get the size of the mapped region in bytes
    fn size(&self) -> usize;

    /// Get the underlying file descriptor
    fn raw_handle(&self) -> RawHandle;

    /// Whether this mapping created the segment or attached to it
    fn role(&self) -> Role;
}

/// Platform-specific handle type
#[derive(Debug, Clone, Copy)]
pub enum RawHandle {
    /// Unix file descriptor (Linux)
    Fd(i32),
}

fn validate_name(name: &str) -> io::Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\0') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid shared memory name: {:?}", name),
        ));
    }
    Ok(())
}

/// Path of a named segment under /dev/shm.
pub fn segment_path(name: &str) -> String {
    format!("/dev/shm/{}", name)
}

/// Create a new named shared memory region with the specified size.
///
/// An existing segment with the same name (left behind by a crashed worker)
/// is truncated and reused. The returned mapping is zero-filled.
///
/// # Arguments
/// * `size` - Size of the shared memory region in bytes
/// * `name` - Name of the region, known to both processes
#[cfg(target_os = "linux")]
pub fn create_shared_memory(size: usize, name: &str) -> io::Result<Box<dyn SharedMemoryBackend>> {
    validate_name(name)?;
    Ok(Box::new(LinuxSharedMemory::create(size, name)?))
}

/// Attach to an existing shared memory region
///
/// # Arguments
/// * `name` - Name of the shared memory region to attach to
/// * `size` - Expected minimum size of the region
#[cfg(target_os = "linux")]
pub fn attach_shared_memory(name: &str, size: usize) -> io::Result<Box<dyn SharedMemoryBackend>> {
    validate_name(name)?;
    Ok(Box::new(LinuxSharedMemory::attach(name, size)?))
}

#[cfg(not(target_os = "linux"))]
pub fn create_shared_memory(_size: usize, name: &str) -> io::Result<Box<dyn SharedMemoryBackend>> {
    validate_name(name)?;
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Shared memory only supported on Linux",
    ))
}

#[cfg(not(target_os = "linux"))]
pub fn attach_shared_memory(name: &str, _size: usize) -> io::Result<Box<dyn SharedMemoryBackend>> {
    validate_name(name)?;
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Shared memory only supported on Linux",
    ))
}

#[cfg(target_os = "linux")]
pub use linux::LinuxSharedMemory;

#[cfg(target_os = "linux")]
mod linux {
    use super::{segment_path, RawHandle, Role, SharedMemoryBackend};
    use std::fs::OpenOptions;
    use std::io;
    use std::os::fd::{AsRawFd, IntoRawFd};
    use std::os::unix::fs::OpenOptionsExt;
    use std::ptr::{self, NonNull};

    #[derive(Debug)]
    pub struct LinuxSharedMemory {
        ptr: NonNull<u8>,
        size: usize,
        fd: i32,
        path: String,
        role: Role,
    }

    unsafe impl Send for LinuxSharedMemory {}
    unsafe impl Sync for LinuxSharedMemory {}

    impl LinuxSharedMemory {
        /// Create (or truncate) a region under /dev/shm
        pub fn create(size: usize, name: &str) -> io::Result<Self> {
            let path = segment_path(name);

            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)
                .map_err(|e| {
                    io::Error::new(
                        e.kind(),
                        format!("Failed to create shared memory file at {}: {}", path, e),
                    )
                })?;

            // Truncation to zero then growth guarantees zero-filled pages
            file.set_len(size as u64)?;

            let fd = file.into_raw_fd();
            let ptr = match unsafe { map(fd, size) } {
                Ok(ptr) => ptr,
                Err(e) => {
                    unsafe { libc::close(fd) };
                    let _ = std::fs::remove_file(&path);
                    return Err(e);
                }
            };

            Ok(Self {
                ptr,
                size,
                fd,
                path,
                role: Role::Creator,
            })
        }

        /// Open and map an existing region under /dev/shm
        pub fn attach(name: &str, expected_size: usize) -> io::Result<Self> {
            let path = segment_path(name);
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .map_err(|e| {
                    io::Error::new(
                        e.kind(),
                        format!("Failed to open shared memory at {}: {}", path, e),
                    )
                })?;

            let actual_size = file.metadata()?.len() as usize;
            if actual_size < expected_size {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Shared memory size too small: expected at least {} bytes, got {}",
                        expected_size, actual_size
                    ),
                ));
            }

            let ptr = unsafe { map(file.as_raw_fd(), actual_size)? };

            Ok(Self {
                ptr,
                size: actual_size,
                fd: file.into_raw_fd(),
                path,
                role: Role::Attacher,
            })
        }
    }

    /// mmap returns page-aligned memory, which satisfies every layout alignment we use.
    unsafe fn map(fd: i32, size: usize) -> io::Result<NonNull<u8>> {
        let ptr = libc::mmap(
            ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            0,
        );

        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        NonNull::new(ptr as *mut u8)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned null"))
    }

    impl Drop for LinuxSharedMemory {
        fn drop(&mut self) {
            unsafe {
                libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size);
                libc::close(self.fd);
            }
            if self.role == Role::Creator {
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }

    impl SharedMemoryBackend for LinuxSharedMemory {
        fn as_ptr(&self) -> *mut u8 {
            self.ptr.as_ptr()
        }

        fn size(&self) -> usize {
            self.size
        }

        fn raw_handle(&self) -> RawHandle {
            RawHandle::Fd(self.fd)
        }

        fn role(&self) -> Role {
            self.role
        }
    }
}
