use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use tracing::debug;

use super::layout::{MailboxLayout, MAILBOX_MAGIC, MAILBOX_VERSION};
use crate::error::{MailboxError, Result};
use crate::Core::SharedMemory::{
    attach_shared_memory, create_shared_memory, Role, SharedMemoryBackend,
};

/// Handle to one mailbox segment.
///
/// Both the worker and the requester hold one of these; which side created
/// the segment is recorded in [`Mailbox::role`]. Only the creator removes the
/// segment name when dropped.
pub struct Mailbox {
    shm: Box<dyn SharedMemoryBackend>,
    pub(crate) layout: *mut MailboxLayout,
    name: String,
}

// The layout is only touched through atomics or under flag-granted ownership
unsafe impl Send for Mailbox {}
unsafe impl Sync for Mailbox {}

impl Mailbox {
    /// Create the named segment and initialize every field.
    ///
    /// The magic word is published last, with release ordering, so an
    /// attacher that observes it also observes the zeroed fields.
    pub fn create(name: &str) -> Result<Self> {
        let shm =
            create_shared_memory(MailboxLayout::SIZE, name).map_err(|e| map_name_err(e, name))?;
        let layout = shm.as_ptr() as *mut MailboxLayout;

        if (layout as usize) % std::mem::align_of::<MailboxLayout>() != 0 {
            return Err(MailboxError::ProtocolViolation(
                "Shared memory not properly aligned".to_string(),
            ));
        }

        unsafe {
            std::ptr::write_bytes(layout as *mut u8, 0, MailboxLayout::SIZE);
            (*layout).version = MAILBOX_VERSION;
            (*layout).magic.store(MAILBOX_MAGIC, Ordering::Release);
        }

        debug!(name, size = MailboxLayout::SIZE, "Mailbox created");
        Ok(Self {
            shm,
            layout,
            name: name.to_string(),
        })
    }

    /// Attach to a segment created by another process.
    ///
    /// Waits up to `timeout` for the segment to appear at its full size and
    /// for its creator to publish the magic word.
    pub fn attach(name: &str, timeout: Duration) -> Result<Self> {
        let start = Instant::now();

        let shm = loop {
            match attach_shared_memory(name, MailboxLayout::SIZE) {
                Ok(shm) => break shm,
                // Not created yet, or created but not yet sized
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::NotFound | std::io::ErrorKind::InvalidData
                    ) && start.elapsed() < timeout =>
                {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    return Err(MailboxError::SegmentTooSmall {
                        expected: MailboxLayout::SIZE,
                        actual: segment_len(name),
                    })
                }
                Err(e) => return Err(map_name_err(e, name)),
            }
        };

        let layout = shm.as_ptr() as *mut MailboxLayout;
        loop {
            if unsafe { (*layout).magic.load(Ordering::Acquire) } == MAILBOX_MAGIC {
                break;
            }
            if start.elapsed() >= timeout {
                return Err(MailboxError::NotInitialized(name.to_string()));
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        let found = unsafe { (*layout).version };
        if found != MAILBOX_VERSION {
            return Err(MailboxError::VersionMismatch {
                expected: MAILBOX_VERSION,
                found,
            });
        }

        debug!(name, "Mailbox attached");
        Ok(Self {
            shm,
            layout,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.shm.role()
    }

    /// Size of the mapping, at least `MailboxLayout::SIZE`.
    pub fn mapped_size(&self) -> usize {
        self.shm.size()
    }

    /// Raw pointer to the mapped layout.
    pub fn layout_ptr(&self) -> *const MailboxLayout {
        self.layout
    }
}

fn map_name_err(e: std::io::Error, name: &str) -> MailboxError {
    if e.kind() == std::io::ErrorKind::InvalidInput {
        MailboxError::InvalidName(name.to_string())
    } else {
        MailboxError::Io(e)
    }
}

fn segment_len(name: &str) -> usize {
    std::fs::metadata(crate::Core::SharedMemory::segment_path(name))
        .map(|m| m.len() as usize)
        .unwrap_or(0)
}
