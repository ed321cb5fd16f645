/// The contract-level error taxonomy surfaced to terminal callbacks.
///
/// Intentionally thin: subsystem-specific detail (which domain failed, the
/// underlying `anyhow`/I/O cause) travels alongside as a `source` on the
/// crate's internal `WorkerError`, not through this contract type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A domain worker reported a failure it could not recover from.
    Generic,
}

/// The terminal status delivered to exactly one callback per accepted
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Every selected domain completed successfully.
    Ok,
    /// The request's deadline elapsed before completion.
    Timeout,
    /// The request was cancelled (by the caller or by engine teardown)
    /// before completion.
    Interrupted,
    /// A domain worker reported an error.
    Error(ErrorKind),
}

impl Status {
    /// Total order used to pick a single aggregate status when more than one
    /// domain sub-task of the same request reports an outcome:
    /// `Error > Timeout > Interrupted > Ok`.
    fn rank(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::Interrupted => 1,
            Status::Timeout => 2,
            Status::Error(_) => 3,
        }
    }

    /// Merges an incoming status into the current aggregate, keeping
    /// whichever ranks higher per [`Status::rank`]. Ties (equal rank) keep
    /// the existing (first-arrival) status.
    pub fn merge(self, incoming: Status) -> Status {
        if incoming.rank() > self.rank() {
            incoming
        } else {
            self
        }
    }

    /// Whether this status represents overall success.
    pub fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_outranks_everything() {
        let err = Status::Error(ErrorKind::Generic);
        assert_eq!(Status::Ok.merge(err), err);
        assert_eq!(Status::Timeout.merge(err), err);
        assert_eq!(Status::Interrupted.merge(err), err);
        assert_eq!(err.merge(Status::Ok), err);
    }

    #[test]
    fn timeout_outranks_interrupted_and_ok() {
        assert_eq!(Status::Ok.merge(Status::Timeout), Status::Timeout);
        assert_eq!(Status::Interrupted.merge(Status::Timeout), Status::Timeout);
        assert_eq!(Status::Timeout.merge(Status::Ok), Status::Timeout);
    }

    #[test]
    fn ok_never_overrides_a_recorded_failure() {
        assert_eq!(Status::Interrupted.merge(Status::Ok), Status::Interrupted);
    }

    #[test]
    fn ties_keep_first_arrival() {
        let first = Status::Error(ErrorKind::Generic);
        let second = Status::Error(ErrorKind::Generic);
        assert_eq!(first.merge(second), first);
    }
}
