//! Parent-process liveness.
//!
//! The worker is useless once the process that drives it is gone, so the poll
//! loop asks a [`ParentProbe`] every so often whether the parent still runs.
//! A probe that cannot answer is not treated as a death: the failure is logged
//! and the worker keeps serving.

use std::fmt::Debug;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{MailboxError, Result};

/// Repeated probe failures are logged at warn level once per this many.
const FAILURE_LOG_EVERY: u64 = 1000;

/// What a probe found out about the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentStatus {
    /// The process exists and has not exited.
    Running,
    /// The process identifier still resolves, but the process has exited.
    Exited,
    /// The process identifier no longer resolves to any process.
    Vanished,
}

/// Source of truth for the parent's status.
pub trait ParentProbe: Send + Debug {
    fn probe(&self) -> Result<ParentStatus>;
}

/// Probes a real process by identifier.
#[derive(Debug, Clone, Copy)]
pub struct ProcessProbe {
    pid: u32,
}

impl ProcessProbe {
    pub fn new(pid: u32) -> Self {
        Self { pid }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

#[cfg(target_os = "linux")]
impl ParentProbe for ProcessProbe {
    fn probe(&self) -> Result<ParentStatus> {
        // No process can carry an identifier outside pid_t
        let pid = match libc::pid_t::try_from(self.pid) {
            Ok(pid) if pid > 0 => pid,
            _ => return Ok(ParentStatus::Vanished),
        };

        // Signal 0 only checks that the identifier resolves
        if unsafe { libc::kill(pid, 0) } != 0 {
            let err = std::io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::ESRCH) => return Ok(ParentStatus::Vanished),
                // Exists, owned by someone else
                Some(libc::EPERM) => {}
                _ => return Err(MailboxError::LivenessQuery(err.to_string())),
            }
        }

        let path = format!("/proc/{}/stat", self.pid);
        let stat = match std::fs::read_to_string(&path) {
            Ok(stat) => stat,
            // Reaped between the two calls
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ParentStatus::Vanished)
            }
            Err(e) => return Err(MailboxError::LivenessQuery(format!("{}: {}", path, e))),
        };

        match parse_stat_state(&stat) {
            Some('Z') | Some('X') | Some('x') => Ok(ParentStatus::Exited),
            Some(_) => Ok(ParentStatus::Running),
            None => Err(MailboxError::LivenessQuery(format!(
                "{}: unrecognized contents",
                path
            ))),
        }
    }
}

#[cfg(not(target_os = "linux"))]
impl ParentProbe for ProcessProbe {
    fn probe(&self) -> Result<ParentStatus> {
        Err(MailboxError::LivenessQuery(
            "process probing only supported on Linux".to_string(),
        ))
    }
}

/// Extract the state letter from `/proc/<pid>/stat`.
///
/// The command name is wrapped in parentheses and may itself contain spaces
/// or parentheses, so the state is the first field after the last `)`.
pub fn parse_stat_state(stat: &str) -> Option<char> {
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().next()?.chars().next()
}

/// Outcome of one liveness check as seen by the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    ParentExited,
    ParentVanished,
}

/// Rate-limited wrapper around a probe.
#[derive(Debug)]
pub struct LivenessMonitor {
    probe: Box<dyn ParentProbe>,
    interval: Duration,
    last_check: Option<Instant>,
    query_failures: u64,
}

impl LivenessMonitor {
    pub fn new(probe: Box<dyn ParentProbe>, interval: Duration) -> Self {
        Self {
            probe,
            interval,
            last_check: None,
            query_failures: 0,
        }
    }

    /// Probe the parent if the interval has elapsed since the last probe.
    pub fn check(&mut self) -> Liveness {
        let now = Instant::now();
        if let Some(last) = self.last_check {
            if now.duration_since(last) < self.interval {
                return Liveness::Alive;
            }
        }
        self.last_check = Some(now);

        match self.probe.probe() {
            Ok(ParentStatus::Running) => Liveness::Alive,
            Ok(ParentStatus::Exited) => {
                info!("Parent process has exited");
                Liveness::ParentExited
            }
            Ok(ParentStatus::Vanished) => {
                info!("Parent process not found");
                Liveness::ParentVanished
            }
            Err(e) => {
                self.query_failures += 1;
                if self.query_failures == 1 || self.query_failures % FAILURE_LOG_EVERY == 0 {
                    warn!(failures = self.query_failures, "{}", e);
                } else {
                    debug!(failures = self.query_failures, "{}", e);
                }
                Liveness::Alive
            }
        }
    }

    /// Number of probe errors seen so far.
    pub fn query_failures(&self) -> u64 {
        self.query_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_state_after_last_paren() {
        assert_eq!(parse_stat_state("42 (sleep) S 1 42 42"), Some('S'));
        assert_eq!(parse_stat_state("42 (a) b) Z 1 42"), Some('Z'));
        assert_eq!(parse_stat_state("garbage"), None);
        assert_eq!(parse_stat_state("42 (x)"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn own_process_is_running() {
        let probe = ProcessProbe::new(std::process::id());
        assert_eq!(probe.probe().unwrap(), ParentStatus::Running);
    }
}
