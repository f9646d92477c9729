use std::time::Duration;

/// How the profile queue is drained: the size of each group taken off the
/// queue and the pause before the next group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainPolicy {
    /// Up to `size` requests run concurrently, then pause.
    Batch { size: usize, delay: Duration },
    /// One request at a time, pausing between each.
    Serial { delay: Duration },
}

impl DrainPolicy {
    pub fn group_size(&self) -> usize {
        match self {
            DrainPolicy::Batch { size, .. } => (*size).max(1),
            DrainPolicy::Serial { .. } => 1,
        }
    }

    pub fn delay(&self) -> Duration {
        match self {
            DrainPolicy::Batch { delay, .. } | DrainPolicy::Serial { delay } => *delay,
        }
    }
}
