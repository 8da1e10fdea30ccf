/// An error that occurs when a pattern fails to compile.
///
/// This carries the pattern exactly as it was given (before any escaping
/// implied by [`PatternFlag::Literal`](crate::PatternFlag::Literal)) along
/// with a human readable message from the regex engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    pattern: String,
    msg: String,
}

impl Error {
    /// Create a new compile error for the given pattern.
    ///
    /// This is public so that implementations of [`Pattern`](crate::Pattern)
    /// outside of this crate can report their own compile errors.
    pub fn new(pattern: &str, msg: impl ToString) -> Error {
        Error { pattern: pattern.to_string(), msg: msg.to_string() }
    }

    /// The pattern that failed to compile.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.msg)
    }
}
