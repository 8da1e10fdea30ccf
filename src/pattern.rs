use crate::{
    error::Error,
    flags::{ExecFlags, PatternFlags},
};

/// A compiled regex pattern, as seen by the harness.
///
/// This is the entire interface the harness needs from a regex engine:
/// compile a pattern, search a haystack with it and convert it to and from
/// bytes. [`RegexPattern`](crate::RegexPattern) implements it on top of
/// `regex-automata`, but any engine can be checked by implementing this
/// trait (and [`Matcher`]) for it.
///
/// Implementations must be deterministic: compiling the same pattern with
/// the same flags and searching the same haystack must always report the
/// same matches.
pub trait Pattern: Sized {
    /// The type of a search in progress over one haystack.
    type Matcher<'h>: Matcher
    where
        Self: 'h;

    /// Compile the given pattern with the given compile time options.
    fn compile(pattern: &str, flags: PatternFlags) -> Result<Self, Error>;

    /// The pattern this was compiled from, as it was given to `compile`.
    fn as_str(&self) -> &str;

    /// The compile time options this pattern was compiled with.
    fn flags(&self) -> PatternFlags;

    /// Create a matcher that searches `haystack` with the given execution
    /// time options. No search happens until [`Matcher::find`] is called.
    fn matcher<'h>(
        &'h self,
        haystack: &'h str,
        flags: ExecFlags,
    ) -> Self::Matcher<'h>;

    /// Serialize this pattern to an opaque sequence of bytes.
    ///
    /// The bytes need only be understood by [`Pattern::from_bytes`] of the
    /// same implementation.
    fn to_bytes(&self) -> anyhow::Result<Vec<u8>>;

    /// Deserialize a new pattern from bytes produced by
    /// [`Pattern::to_bytes`]. Corrupt or incompatible data must produce an
    /// error and never a panic.
    fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self>;
}

/// A search over a single haystack.
///
/// Group indices follow the usual convention: group `0` is the overall match
/// and explicit capturing groups are numbered from `1` in the order of their
/// opening parenthesis. All offsets are byte offsets into the haystack, with
/// the start inclusive and the end exclusive.
pub trait Matcher {
    /// Find the next match. The first call reports the leftmost match. Each
    /// subsequent call reports the next non-overlapping match. Returns false
    /// when there are no more matches.
    fn find(&mut self) -> bool;

    /// The number of explicit capturing groups in the pattern. Group `0` is
    /// not counted. This does not depend on whether a match was found.
    fn group_count(&self) -> usize;

    /// The text matched by the given group in the most recent match.
    ///
    /// This returns `None` when there is no current match, when the group
    /// did not participate in the match or when the index is out of bounds.
    fn group(&self, index: usize) -> Option<&str>;

    /// The starting offset of the given group in the most recent match.
    fn start(&self, index: usize) -> Option<usize>;

    /// The ending offset of the given group in the most recent match.
    fn end(&self, index: usize) -> Option<usize>;
}
