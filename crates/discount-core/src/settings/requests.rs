//! Latest-request-wins tracking for resource lookups.

/// Identifies one resource lookup issued by the settings form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

/// Outcome of committing a lookup result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Commit {
    /// The result was written to the form.
    Applied,

    /// A newer lookup was issued, or the form changed, so the result was dropped.
    Stale,
}

/// Issues monotonically increasing request ids and remembers the latest one.
///
/// Only a result carrying the latest id may be committed.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a lookup, superseding every earlier one.
    pub fn begin(&mut self) -> RequestId {
        self.latest += 1;
        RequestId(self.latest)
    }

    /// Supersedes every in-flight lookup without starting a new one.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }

    pub fn is_current(&self, request: RequestId) -> bool {
        request.0 == self.latest
    }
}
