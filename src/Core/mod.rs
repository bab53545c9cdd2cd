pub mod SharedMemory;
pub mod liveness;
pub mod pacing;

pub use SharedMemory::{
    attach_shared_memory, create_shared_memory, RawHandle, Role, SharedMemoryBackend,
};
pub use liveness::{Liveness, LivenessMonitor, ParentProbe, ParentStatus, ProcessProbe};
pub use pacing::PollPolicy;
