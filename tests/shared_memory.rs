// Shared memory backend tests for Linux
// Run with: cargo test --test shared_memory -- --nocapture

mod common;

#[cfg(target_os = "linux")]
mod linux_tests {
    use super::common::unique_name;
    use shm_mailbox::Core::SharedMemory::segment_path;
    use shm_mailbox::Core::{attach_shared_memory, create_shared_memory, RawHandle, Role};
    use std::path::Path;

    #[test]
    fn test_create_shared_memory() {
        let name = unique_name("create");
        let size = 4096;
        let shm = create_shared_memory(size, &name).unwrap();

        assert_eq!(shm.size(), size);
        assert!(!shm.as_ptr().is_null());
        assert_eq!(shm.role(), Role::Creator);
        assert!(Path::new(&segment_path(&name)).exists());

        unsafe {
            let slice = std::slice::from_raw_parts_mut(shm.as_ptr(), size);
            slice[0] = 0x42;
            assert_eq!(slice[0], 0x42);
        }
    }

    #[test]
    fn test_attach_sees_creator_writes() {
        let name = unique_name("attach");
        let creator = create_shared_memory(8192, &name).unwrap();
        let attacher = attach_shared_memory(&name, 8192).unwrap();

        assert_eq!(attacher.role(), Role::Attacher);
        assert_eq!(attacher.size(), 8192);

        unsafe {
            let written = std::slice::from_raw_parts_mut(creator.as_ptr(), 8192);
            for (i, byte) in written.iter_mut().enumerate().take(100) {
                *byte = (i % 256) as u8;
            }

            // Two mappings of the same segment, at different addresses
            let read = std::slice::from_raw_parts(attacher.as_ptr(), 8192);
            for (i, byte) in read.iter().enumerate().take(100) {
                assert_eq!(*byte, (i % 256) as u8);
            }
        }
    }

    #[test]
    fn test_only_creator_unlinks() {
        let name = unique_name("unlink");
        let path = segment_path(&name);
        let creator = create_shared_memory(4096, &name).unwrap();

        let attacher = attach_shared_memory(&name, 4096).unwrap();
        drop(attacher);
        assert!(Path::new(&path).exists(), "Attacher must not remove the segment");

        drop(creator);
        assert!(!Path::new(&path).exists(), "Creator removes the segment on drop");
    }

    #[test]
    fn test_raw_handle() {
        let shm = create_shared_memory(4096, &unique_name("handle")).unwrap();
        match shm.raw_handle() {
            RawHandle::Fd(fd) => assert!(fd > 0, "File descriptor should be positive"),
        }
    }

    #[test]
    fn test_attach_missing_segment() {
        let err = attach_shared_memory(&unique_name("missing"), 4096).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_attach_too_small() {
        let name = unique_name("small");
        let _creator = create_shared_memory(1024, &name).unwrap();
        let err = attach_shared_memory(&name, 4096).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "a/b", "/leading"] {
            let err = create_shared_memory(4096, name).unwrap_err();
            assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput, "name {:?}", name);
        }
    }

    #[test]
    fn test_mmap_zero_initialized() {
        let name = unique_name("zero");
        let size = 1024;
        let shm = create_shared_memory(size, &name).unwrap();

        unsafe {
            let slice = std::slice::from_raw_parts(shm.as_ptr(), size);
            assert!(slice.iter().all(|b| *b == 0), "Mmap'd memory should be zero-initialized");
        }
    }

    #[test]
    fn test_create_reuses_stale_segment() {
        let name = unique_name("stale");
        let path = segment_path(&name);
        std::fs::write(&path, vec![0xAAu8; 64]).unwrap();

        let shm = create_shared_memory(4096, &name).unwrap();
        unsafe {
            let slice = std::slice::from_raw_parts(shm.as_ptr(), 4096);
            assert!(slice.iter().all(|b| *b == 0), "Stale contents must be discarded");
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod non_linux_tests {
    use shm_mailbox::Core::{attach_shared_memory, create_shared_memory};

    #[test]
    fn test_unsupported_platform() {
        let err = create_shared_memory(4096, "test").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);

        let err = attach_shared_memory("test", 4096).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
    }
}
