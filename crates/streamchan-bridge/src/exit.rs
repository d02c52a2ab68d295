use crate::fault::Fault;

/// Why a bridge loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    /// The stream ended (EOF on read, peer gone on write).
    EndOfStream,
    /// The shutdown signal fired.
    Shutdown,
    /// The channel counterpart went away: every receiver of a reader's
    /// delivery channel, or every sender of a writer's channel, was dropped.
    Disconnected,
    /// Too many faults in a row for the retry policy.
    FaultLimit,
    /// The stream is corrupt or failed permanently.
    Fatal,
}

/// Report returned by a bridge when its loop finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exit {
    pub reason: ExitReason,
    /// Values delivered (reader) or written (writer).
    pub transferred: u64,
    /// Faults recorded over the loop's lifetime.
    pub faults: u64,
    pub last_fault: Option<Fault>,
}

impl Exit {
    /// True if the loop stopped for a reason other than a fault.
    pub fn is_clean(&self) -> bool {
        matches!(
            self.reason,
            ExitReason::EndOfStream | ExitReason::Shutdown | ExitReason::Disconnected
        )
    }
}
