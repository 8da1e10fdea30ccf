use crate::error::Error;

/// Something that can check a subject and describe why it failed.
///
/// This is the one capability every check in this crate provides: the
/// group range check, the match check and the round trip check all
/// implement it.
pub trait Assertion<T: ?Sized> {
    /// Check the given subject.
    fn assert(&self, subject: &T) -> CheckResult;
}

/// Which pattern instance a check was run against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    /// The pattern as it was compiled or given.
    Normal,
    /// The new pattern instance produced by serializing the normal pattern
    /// and deserializing the result.
    Rehydrated,
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Stage::Normal => write!(f, "normal"),
            Stage::Rehydrated => write!(f, "serialized and deserialized"),
        }
    }
}

/// The outcome of a single check.
///
/// A check either passes or fails with a [`Failure`] describing what went
/// wrong. Failures are values. Checks never panic to report them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CheckResult {
    failure: Option<Failure>,
}

impl CheckResult {
    /// A passing result.
    pub fn pass() -> CheckResult {
        CheckResult { failure: None }
    }

    /// A failing result for the reason given.
    pub fn fail(failure: Failure) -> CheckResult {
        CheckResult { failure: Some(failure) }
    }

    /// Returns true if and only if the check passed.
    pub fn is_pass(&self) -> bool {
        self.failure.is_none()
    }

    /// Returns the reason the check failed, if it did.
    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Consumes this result and returns the reason the check failed, if it
    /// did.
    pub fn into_failure(self) -> Option<Failure> {
        self.failure
    }

    /// A human readable description of this result. This is empty for a
    /// passing result.
    pub fn description(&self) -> String {
        match self.failure {
            None => String::new(),
            Some(ref failure) => failure.to_string(),
        }
    }
}

impl core::fmt::Display for CheckResult {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self.failure {
            None => write!(f, "ok"),
            Some(ref failure) => write!(f, "{}", failure),
        }
    }
}

/// Describes why a check failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Failure {
    /// The pattern could not be compiled. Nothing else was checked.
    Compile {
        /// The error reported by the engine.
        err: Error,
    },
    /// The pattern found no match in the haystack.
    NoMatch,
    /// The pattern has a different number of capturing groups than the
    /// number of expected captures. Group `0` is never counted.
    CaptureCount {
        /// The number of capturing groups in the pattern.
        got: usize,
        /// The number of expected captures.
        expected: usize,
        /// The pattern instance that was checked.
        stage: Stage,
    },
    /// The text of capturing group `index + 1` differs from the expected
    /// capture at `index`.
    Capture {
        /// The position of the expected capture.
        index: usize,
        /// The text the group matched, or `None` if it did not participate
        /// in the match.
        got: Option<String>,
        /// The expected text, or `None` if the group should not have
        /// participated in the match.
        expected: Option<String>,
        /// The pattern instance that was checked.
        stage: Stage,
    },
    /// A group's offsets differ from the expected `[start, end)`.
    GroupRange {
        /// The group that was checked.
        index: usize,
        /// The expected starting offset.
        start: usize,
        /// The expected ending offset.
        end: usize,
    },
    /// Serializing the pattern or deserializing its bytes failed.
    Serialization {
        /// The error along with its chain of causes, on one line.
        message: String,
        /// The rendered error report. This includes a backtrace when one
        /// was captured.
        trace: String,
    },
    /// The pattern passed its check, but the pattern rebuilt from its
    /// serialized form failed the very same check.
    Regression {
        /// Why the rebuilt pattern failed.
        cause: Box<Failure>,
    },
}

impl Failure {
    /// Builds a serialization failure from the error that caused it.
    pub(crate) fn serialization(err: &anyhow::Error) -> Failure {
        Failure::Serialization {
            message: format!("{:#}", err),
            trace: format!("{:?}", err),
        }
    }
}

impl core::fmt::Display for Failure {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Failure::Compile { ref err } => write!(
                f,
                "failed to compile pattern {:?}: {}",
                err.pattern(),
                err,
            ),
            Failure::NoMatch => write!(f, "No match."),
            Failure::CaptureCount { got, expected, stage } => write!(
                f,
                "Group count mismatches: was {} should be {}. ({})",
                got, expected, stage,
            ),
            Failure::Capture { index, ref got, ref expected, stage } => {
                write!(
                    f,
                    "Capture {} mismatch: was {} should be {}. ({})",
                    index,
                    Text(got.as_deref()),
                    Text(expected.as_deref()),
                    stage,
                )
            }
            Failure::GroupRange { index, start, end } => {
                write!(f, "Group {} was not [{},{})", index, start, end)
            }
            Failure::Serialization { ref message, ref trace } => {
                write!(
                    f,
                    "failed to serialize or deserialize pattern: {}",
                    message,
                )?;
                if !trace.is_empty() {
                    write!(f, "\n{}", trace)?;
                }
                Ok(())
            }
            Failure::Regression { ref cause } => write!(
                f,
                "regression after serialization round trip: {}",
                cause,
            ),
        }
    }
}

/// Renders capture text, or a marker for a group that didn't participate.
pub(crate) struct Text<'a>(pub(crate) Option<&'a str>);

impl<'a> core::fmt::Display for Text<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self.0 {
            None => write!(f, "<unmatched>"),
            Some(text) => write!(f, "{:?}", text),
        }
    }
}
