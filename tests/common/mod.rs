// Helpers shared by the integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use shm_mailbox::Core::{ParentProbe, ParentStatus};
use shm_mailbox::{MailboxError, Result};

/// Unique segment name so tests can run in parallel.
pub fn unique_name(tag: &str) -> String {
    format!("mbx_test_{}_{}_{:x}", tag, std::process::id(), fastrand::u64(..))
}

/// Probe that replays a script, then repeats `fallback` forever.
#[derive(Debug, Clone)]
pub struct ScriptedProbe {
    script: Arc<Mutex<VecDeque<Result<ParentStatus>>>>,
    fallback: ParentStatus,
    pub calls: Arc<Mutex<usize>>,
}

impl ScriptedProbe {
    pub fn new(script: Vec<Result<ParentStatus>>, fallback: ParentStatus) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            fallback,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn always(status: ParentStatus) -> Self {
        Self::new(Vec::new(), status)
    }

    pub fn failing_then(failures: usize, fallback: ParentStatus) -> Self {
        let script = (0..failures)
            .map(|i| Err(MailboxError::LivenessQuery(format!("scripted failure {}", i))))
            .collect();
        Self::new(script, fallback)
    }
}

impl ParentProbe for ScriptedProbe {
    fn probe(&self) -> Result<ParentStatus> {
        *self.calls.lock() += 1;
        self.script.lock().pop_front().unwrap_or(Ok(self.fallback))
    }
}
