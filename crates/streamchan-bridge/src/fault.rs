use std::fmt;
use std::time::Duration;

use streamchan_codec::{CodecError, ErrorKind};
use tokio::sync::mpsc;
use tracing::warn;

use crate::exit::{Exit, ExitReason};
use crate::retry::RetryPolicy;

/// Which side of a bridge hit a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Stream to channel.
    Read,
    /// Channel to stream.
    Write,
}

/// A non-terminal error observed by a bridge loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub direction: Direction,
    pub kind: ErrorKind,
    pub message: String,
    /// Faults in a row including this one.
    pub consecutive: u32,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {:?} fault #{}: {}",
            self.direction, self.kind, self.consecutive, self.message
        )
    }
}

/// Receives every fault a bridge records.
pub type FaultObserver = mpsc::UnboundedSender<Fault>;

/// What a loop should do after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Drop the current value and carry on.
    Skip,
    /// Wait, then retry the same operation.
    Retry(Duration),
    /// Leave the loop.
    Stop(ExitReason),
}

/// Per-loop fault bookkeeping shared by readers and writers.
pub(crate) struct FaultTracker {
    direction: Direction,
    policy: RetryPolicy,
    observer: Option<FaultObserver>,
    consecutive: u32,
    retrying: u32,
    total: u64,
    last: Option<Fault>,
}

impl FaultTracker {
    pub(crate) fn new(
        direction: Direction,
        policy: RetryPolicy,
        observer: Option<FaultObserver>,
    ) -> Self {
        Self {
            direction,
            policy,
            observer,
            consecutive: 0,
            retrying: 0,
            total: 0,
            last: None,
        }
    }

    /// Decide how to continue after `err`, recording it unless it is a clean
    /// end of stream.
    ///
    /// Only transient I/O faults count toward the policy's limit. A packet
    /// that fails to encode or decode still crossed the stream, so it is
    /// skipped no matter how many came before it.
    pub(crate) fn classify(&mut self, err: CodecError) -> Action {
        if err.is_end_of_stream() {
            return Action::Stop(ExitReason::EndOfStream);
        }
        self.record(&err);

        let local = err.is_packet_local()
            || (self.direction == Direction::Write
                && matches!(err, CodecError::PayloadTooLarge { .. }));

        if local {
            self.retrying = 0;
            Action::Skip
        } else if !err.is_transient() {
            Action::Stop(ExitReason::Fatal)
        } else {
            self.retrying = self.retrying.saturating_add(1);
            if self.policy.allows(self.retrying) {
                Action::Retry(self.policy.delay_for(self.retrying))
            } else {
                Action::Stop(ExitReason::FaultLimit)
            }
        }
    }

    /// A transfer went through.
    pub(crate) fn reset(&mut self) {
        self.consecutive = 0;
        self.retrying = 0;
    }

    pub(crate) fn into_exit(self, reason: ExitReason, transferred: u64) -> Exit {
        Exit {
            reason,
            transferred,
            faults: self.total,
            last_fault: self.last,
        }
    }

    fn record(&mut self, err: &CodecError) {
        self.consecutive = self.consecutive.saturating_add(1);
        self.total = self.total.saturating_add(1);

        let fault = Fault {
            direction: self.direction,
            kind: err.kind(),
            message: err.to_string(),
            consecutive: self.consecutive,
        };
        warn!(
            direction = ?fault.direction,
            kind = ?fault.kind,
            consecutive = fault.consecutive,
            "{}",
            fault.message
        );

        if let Some(observer) = &self.observer {
            if observer.send(fault.clone()).is_err() {
                self.observer = None;
            }
        }
        self.last = Some(fault);
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn io_err(kind: io::ErrorKind) -> CodecError {
        CodecError::Io(io::Error::from(kind))
    }

    #[test]
    fn end_of_stream_is_not_a_fault() {
        let mut tracker = FaultTracker::new(Direction::Read, RetryPolicy::never(), None);
        assert_eq!(
            tracker.classify(CodecError::EndOfStream),
            Action::Stop(ExitReason::EndOfStream)
        );
        assert_eq!(
            tracker.classify(io_err(io::ErrorKind::BrokenPipe)),
            Action::Stop(ExitReason::EndOfStream)
        );
        let exit = tracker.into_exit(ExitReason::EndOfStream, 0);
        assert_eq!(exit.faults, 0);
        assert!(exit.last_fault.is_none());
    }

    #[test]
    fn packet_faults_never_hit_the_limit() {
        let mut tracker = FaultTracker::new(Direction::Read, RetryPolicy::never(), None);

        for name in ["a", "b", "c"] {
            assert_eq!(tracker.classify(CodecError::UnknownType(name.into())), Action::Skip);
        }
        let exit = tracker.into_exit(ExitReason::EndOfStream, 0);
        assert_eq!(exit.faults, 3);
        assert_eq!(exit.last_fault.expect("last fault").consecutive, 3);
    }

    #[test]
    fn transient_faults_stop_at_the_limit() {
        let policy = RetryPolicy::immediate().with_max_consecutive_faults(Some(2));
        let mut tracker = FaultTracker::new(Direction::Read, policy, None);

        let timed_out = || io_err(io::ErrorKind::TimedOut);
        assert_eq!(tracker.classify(timed_out()), Action::Retry(Duration::ZERO));
        assert_eq!(tracker.classify(timed_out()), Action::Retry(Duration::ZERO));
        assert_eq!(
            tracker.classify(timed_out()),
            Action::Stop(ExitReason::FaultLimit)
        );
    }

    #[test]
    fn skipped_packet_restarts_the_retry_streak() {
        let policy = RetryPolicy::immediate().with_max_consecutive_faults(Some(1));
        let mut tracker = FaultTracker::new(Direction::Read, policy, None);

        let timed_out = || io_err(io::ErrorKind::TimedOut);
        assert_eq!(tracker.classify(timed_out()), Action::Retry(Duration::ZERO));
        assert_eq!(tracker.classify(CodecError::UnknownType("x".into())), Action::Skip);
        assert_eq!(tracker.classify(timed_out()), Action::Retry(Duration::ZERO));
    }

    #[test]
    fn reset_clears_consecutive_count() {
        let policy = RetryPolicy::immediate().with_max_consecutive_faults(Some(1));
        let mut tracker = FaultTracker::new(Direction::Write, policy, None);

        let timed_out = || io_err(io::ErrorKind::TimedOut);
        assert_eq!(tracker.classify(timed_out()), Action::Retry(Duration::ZERO));
        tracker.reset();
        assert_eq!(tracker.classify(timed_out()), Action::Retry(Duration::ZERO));
        assert_eq!(tracker.classify(CodecError::UnregisteredType("B")), Action::Skip);

        let exit = tracker.into_exit(ExitReason::Shutdown, 1);
        assert_eq!(exit.faults, 3);
        assert_eq!(exit.last_fault.unwrap().kind, ErrorKind::Encode);
    }

    #[test]
    fn transient_io_retries_with_backoff() {
        let mut tracker = FaultTracker::new(Direction::Read, RetryPolicy::default(), None);
        assert_eq!(
            tracker.classify(io_err(io::ErrorKind::TimedOut)),
            Action::Retry(Duration::from_millis(10))
        );
        assert_eq!(
            tracker.classify(io_err(io::ErrorKind::Interrupted)),
            Action::Retry(Duration::from_millis(20))
        );
    }

    #[test]
    fn corruption_and_hard_io_are_fatal() {
        let mut tracker = FaultTracker::new(Direction::Read, RetryPolicy::immediate(), None);
        assert_eq!(
            tracker.classify(CodecError::InvalidMagic),
            Action::Stop(ExitReason::Fatal)
        );
        assert_eq!(
            tracker.classify(CodecError::Truncated { buffered: 3 }),
            Action::Stop(ExitReason::Fatal)
        );
        assert_eq!(
            tracker.classify(io_err(io::ErrorKind::PermissionDenied)),
            Action::Stop(ExitReason::Fatal)
        );
    }

    #[test]
    fn oversized_packet_only_skipped_when_writing() {
        let oversized = || CodecError::PayloadTooLarge { size: 10, max: 1 };

        let mut reader = FaultTracker::new(Direction::Read, RetryPolicy::default(), None);
        assert_eq!(reader.classify(oversized()), Action::Stop(ExitReason::Fatal));

        let mut writer = FaultTracker::new(Direction::Write, RetryPolicy::default(), None);
        assert_eq!(writer.classify(oversized()), Action::Skip);
    }

    #[test]
    fn observer_receives_faults() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tracker = FaultTracker::new(Direction::Write, RetryPolicy::default(), Some(tx));

        tracker.classify(CodecError::UnregisteredType("Cat"));
        let fault = rx.try_recv().unwrap();
        assert_eq!(fault.direction, Direction::Write);
        assert_eq!(fault.kind, ErrorKind::Encode);
        assert_eq!(fault.consecutive, 1);
        assert!(fault.message.contains("Cat"));
    }

    #[test]
    fn dropped_observer_is_tolerated() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut tracker = FaultTracker::new(Direction::Read, RetryPolicy::default(), Some(tx));
        assert_eq!(tracker.classify(CodecError::UnknownType("x".into())), Action::Skip);
        assert_eq!(tracker.classify(CodecError::UnknownType("y".into())), Action::Skip);
    }
}
