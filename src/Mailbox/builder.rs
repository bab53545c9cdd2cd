use std::time::Duration;

use super::layout::DEFAULT_MAILBOX_NAME;
use super::region::Mailbox;
use super::{Requester, Worker};
use crate::error::Result;
use crate::handler::{CapabilityTable, CommandHandler};
use crate::Core::liveness::{LivenessMonitor, ParentProbe, ProcessProbe};
use crate::Core::pacing::PollPolicy;

/// Configures and creates the worker side of a mailbox.
pub struct WorkerBuilder {
    name: String,
    policy: PollPolicy,
    liveness_interval: Duration,
    probe: Option<Box<dyn ParentProbe>>,
    handler: Option<Box<dyn CommandHandler>>,
    diagnostics: bool,
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self {
            name: DEFAULT_MAILBOX_NAME.to_string(),
            policy: PollPolicy::Yield,
            liveness_interval: Duration::ZERO, // check every iteration
            probe: None,
            handler: None,
            diagnostics: false,
        }
    }
}

impl WorkerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Minimum time between two parent probes.
    pub fn with_liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }

    /// Watch the process with this identifier.
    pub fn with_parent_pid(mut self, pid: u32) -> Self {
        self.probe = Some(Box::new(ProcessProbe::new(pid)));
        self
    }

    /// Watch the parent through a custom probe.
    pub fn with_probe(mut self, probe: Box<dyn ParentProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_handler<H: CommandHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Log every received request at debug level.
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Create the segment and return a worker ready to [`run`](Worker::run).
    ///
    /// Without a probe the worker watches the process that spawned it.
    /// Without a handler it answers the diagnostic commands only.
    pub fn build(self) -> Result<Worker> {
        let mailbox = Mailbox::create(&self.name)?;
        let probe = self
            .probe
            .unwrap_or_else(|| Box::new(ProcessProbe::new(std::os::unix::process::parent_id())));
        let handler = self
            .handler
            .unwrap_or_else(|| Box::new(CapabilityTable::with_diagnostics()));
        let monitor = LivenessMonitor::new(probe, self.liveness_interval);
        Ok(Worker::new(
            mailbox,
            handler,
            monitor,
            self.policy,
            self.diagnostics,
        ))
    }
}

/// Configures and attaches the requester side of a mailbox.
pub struct RequesterBuilder {
    name: String,
    timeout: Duration,
    attach_timeout: Duration,
}

impl Default for RequesterBuilder {
    fn default() -> Self {
        Self {
            name: DEFAULT_MAILBOX_NAME.to_string(),
            timeout: Duration::from_secs(5),
            attach_timeout: Duration::from_secs(5),
        }
    }
}

impl RequesterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Upper bound for one call, from waiting for the mailbox to the response.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How long to wait for the worker to create and initialize the segment.
    pub fn with_attach_timeout(mut self, timeout: Duration) -> Self {
        self.attach_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Requester> {
        let mailbox = Mailbox::attach(&self.name, self.attach_timeout)?;
        Ok(Requester::new(mailbox, self.timeout))
    }
}
