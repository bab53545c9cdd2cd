use std::time::Duration;

/// How a polling loop waits between two looks at the mailbox.
///
/// Nothing here blocks on the other process: every variant returns after a
/// bounded pause and the caller polls again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPolicy {
    /// Busy spin with a CPU hint. Lowest latency, monopolizes a core.
    Spin,
    /// Give up the rest of the scheduler quantum.
    #[default]
    Yield,
    /// Sleep for a fixed interval.
    Sleep(Duration),
}

impl PollPolicy {
    /// Map a poll interval to a policy: zero means yield only.
    pub fn from_interval(interval: Duration) -> Self {
        if interval.is_zero() {
            PollPolicy::Yield
        } else {
            PollPolicy::Sleep(interval)
        }
    }

    #[inline]
    pub fn pause(&self) {
        match self {
            PollPolicy::Spin => std::hint::spin_loop(),
            PollPolicy::Yield => std::thread::yield_now(),
            PollPolicy::Sleep(interval) => std::thread::sleep(*interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_yields() {
        assert_eq!(PollPolicy::from_interval(Duration::ZERO), PollPolicy::Yield);
        assert_eq!(
            PollPolicy::from_interval(Duration::from_micros(250)),
            PollPolicy::Sleep(Duration::from_micros(250))
        );
    }
}
