/*!
Checks that a pattern matches a haystack and captures what it should.
*/

use crate::{
    check::{CheckResult, Failure, Stage},
    error::Error,
    flags::{ExecFlags, PatternFlags},
    pattern::{Matcher, Pattern},
};

/// The pattern a check runs against.
///
/// This is either a pattern that still needs to be compiled, along with its
/// compile time options, or a pattern that was compiled by the caller.
#[derive(Clone, Debug)]
pub enum PatternSpec<P> {
    /// A pattern that is compiled anew every time a check runs.
    Source {
        /// The pattern as written.
        pattern: String,
        /// The options to compile the pattern with.
        flags: PatternFlags,
    },
    /// An already compiled pattern. It is only ever borrowed by a check.
    Compiled(P),
}

impl<P: Pattern> PatternSpec<P> {
    /// A pattern to compile with the given compile time options.
    pub fn source(pattern: &str, flags: PatternFlags) -> PatternSpec<P> {
        PatternSpec::Source { pattern: pattern.to_string(), flags }
    }

    /// A pattern that has already been compiled.
    pub fn compiled(pattern: P) -> PatternSpec<P> {
        PatternSpec::Compiled(pattern)
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        match *self {
            PatternSpec::Source { ref pattern, .. } => pattern,
            PatternSpec::Compiled(ref re) => re.as_str(),
        }
    }

    /// Resolves this spec to a compiled pattern and runs `f` with it.
    ///
    /// A `Source` is compiled for the duration of the call only, so every
    /// call works with its own pattern instance.
    pub(crate) fn with_pattern<T>(
        &self,
        f: impl FnOnce(&P) -> T,
    ) -> Result<T, Error> {
        match *self {
            PatternSpec::Source { ref pattern, flags } => {
                let re = P::compile(pattern, flags)?;
                Ok(f(&re))
            }
            PatternSpec::Compiled(ref re) => Ok(f(re)),
        }
    }
}

/// The text expected for a single capturing group.
///
/// A capture is either the exact text the group must match, or a marker
/// saying that the group must not participate in the match at all. The
/// latter is how optional groups such as the second one in `(a)|(b)` are
/// checked.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Capture(Option<String>);

impl Capture {
    /// The group must match exactly this text.
    pub fn text(text: impl Into<String>) -> Capture {
        Capture(Some(text.into()))
    }

    /// The group must not participate in the match.
    pub fn unmatched() -> Capture {
        Capture(None)
    }

    /// The expected text, or `None` if the group must not participate.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<'a> From<&'a str> for Capture {
    fn from(text: &'a str) -> Capture {
        Capture::text(text)
    }
}

impl From<String> for Capture {
    fn from(text: String) -> Capture {
        Capture::text(text)
    }
}

impl<'a> From<Option<&'a str>> for Capture {
    fn from(text: Option<&'a str>) -> Capture {
        Capture(text.map(|t| t.to_string()))
    }
}

impl From<Option<String>> for Capture {
    fn from(text: Option<String>) -> Capture {
        Capture(text)
    }
}

/// Check that the pattern matches the haystack and, if `captures` is given,
/// that the leftmost match captures exactly that.
///
/// `captures[i]` is compared with capturing group `i + 1`. The number of
/// expected captures must equal the number of capturing groups in the
/// pattern, not counting group `0`.
///
/// A pattern that fails to compile fails the check with
/// [`Failure::Compile`]. Nothing else is attempted in that case.
pub fn check<P: Pattern>(
    pattern: &PatternSpec<P>,
    exec_flags: ExecFlags,
    captures: Option<&[Capture]>,
    haystack: &str,
) -> CheckResult {
    log::debug!("checking {:?} against {:?}", pattern.as_str(), haystack);
    pattern
        .with_pattern(|re| {
            check_pattern(re, exec_flags, captures, haystack, Stage::Normal)
        })
        .unwrap_or_else(|err| CheckResult::fail(Failure::Compile { err }))
}

/// Run the match check against a compiled pattern. `stage` is attached to
/// any capture failure so that its description says which pattern instance
/// failed.
pub(crate) fn check_pattern<P: Pattern>(
    re: &P,
    exec_flags: ExecFlags,
    captures: Option<&[Capture]>,
    haystack: &str,
    stage: Stage,
) -> CheckResult {
    let mut m = re.matcher(haystack, exec_flags);
    if !m.find() {
        log::trace!("{:?} ({}): no match", re.as_str(), stage);
        return CheckResult::fail(Failure::NoMatch);
    }
    let captures = match captures {
        None => return CheckResult::pass(),
        Some(captures) => captures,
    };
    let got = m.group_count();
    if got != captures.len() {
        return CheckResult::fail(Failure::CaptureCount {
            got,
            expected: captures.len(),
            stage,
        });
    }
    for (index, expected) in captures.iter().enumerate() {
        let got = m.group(index + 1);
        if got != expected.as_str() {
            log::trace!(
                "{:?} ({}): group {} mismatch",
                re.as_str(),
                stage,
                index + 1,
            );
            return CheckResult::fail(Failure::Capture {
                index,
                got: got.map(|s| s.to_string()),
                expected: expected.as_str().map(|s| s.to_string()),
                stage,
            });
        }
    }
    CheckResult::pass()
}

#[cfg(test)]
mod tests {
    use crate::{
        engine::RegexPattern,
        flags::{ExecFlag, PatternFlag},
    };

    use super::*;

    fn source(pattern: &str) -> PatternSpec<RegexPattern> {
        PatternSpec::source(pattern, PatternFlags::empty())
    }

    fn caps(texts: &[&str]) -> Vec<Capture> {
        texts.iter().map(|&t| Capture::from(t)).collect()
    }

    #[test]
    fn match_without_captures() {
        let result = check(&source("(a)(b)"), ExecFlags::empty(), None, "ab");
        assert!(result.is_pass(), "{}", result);
    }

    #[test]
    fn no_match() {
        let result = check(&source("x+"), ExecFlags::empty(), None, "yyy");
        assert_eq!(Some(&Failure::NoMatch), result.failure());
        assert_eq!("No match.", result.description());
    }

    #[test]
    fn captures_match() {
        let expected = caps(&["42"]);
        let result = check(
            &source(r"(\d+)"),
            ExecFlags::empty(),
            Some(&expected),
            "answer=42",
        );
        assert!(result.is_pass(), "{}", result);
    }

    #[test]
    fn capture_count_mismatch() {
        let expected = caps(&["a", "b"]);
        let result =
            check(&source("(a)b"), ExecFlags::empty(), Some(&expected), "ab");
        assert_eq!(
            Some(&Failure::CaptureCount {
                got: 1,
                expected: 2,
                stage: Stage::Normal
            }),
            result.failure(),
        );
        assert_eq!(
            "Group count mismatches: was 1 should be 2. (normal)",
            result.description(),
        );
    }

    #[test]
    fn capture_count_checked_before_content() {
        // Even an empty expectation must agree on the number of groups.
        let result = check(&source("(a)"), ExecFlags::empty(), Some(&[]), "a");
        assert_eq!(
            Some(&Failure::CaptureCount {
                got: 1,
                expected: 0,
                stage: Stage::Normal
            }),
            result.failure(),
        );
    }

    #[test]
    fn no_groups_and_no_captures() {
        let result = check(&source("a"), ExecFlags::empty(), Some(&[]), "ba");
        assert!(result.is_pass(), "{}", result);
        let result = check(&source("a"), ExecFlags::empty(), None, "ba");
        assert!(result.is_pass(), "{}", result);
    }

    #[test]
    fn capture_mismatch_reports_first() {
        let expected = caps(&["a", "x", "y"]);
        let result = check(
            &source("(a)(b)(c)"),
            ExecFlags::empty(),
            Some(&expected),
            "zabc",
        );
        assert_eq!(
            "Capture 1 mismatch: was \"b\" should be \"x\". (normal)",
            result.description(),
        );
    }

    #[test]
    fn unmatched_capture() {
        let expected = vec![Capture::unmatched(), Capture::text("b")];
        let result = check(
            &source("(a)|(b)"),
            ExecFlags::empty(),
            Some(&expected),
            "b",
        );
        assert!(result.is_pass(), "{}", result);

        let expected = vec![Capture::text("a"), Capture::text("b")];
        let result = check(
            &source("(a)|(b)"),
            ExecFlags::empty(),
            Some(&expected),
            "b",
        );
        assert_eq!(
            "Capture 0 mismatch: was <unmatched> should be \"a\". (normal)",
            result.description(),
        );

        let expected = vec![Capture::unmatched(), Capture::unmatched()];
        let result = check(
            &source("(a)|(b)"),
            ExecFlags::empty(),
            Some(&expected),
            "a",
        );
        assert_eq!(
            "Capture 0 mismatch: was \"a\" should be <unmatched>. (normal)",
            result.description(),
        );
    }

    #[test]
    fn compile_error_aborts() {
        let result = check(&source("(a"), ExecFlags::empty(), None, "a");
        match result.failure() {
            Some(&Failure::Compile { ref err }) => {
                assert_eq!("(a", err.pattern());
            }
            got => panic!("expected compile failure, got {:?}", got),
        }
        assert!(result
            .description()
            .starts_with("failed to compile pattern \"(a\": "));
    }

    #[test]
    fn compiled_pattern_with_exec_flags() {
        let re = RegexPattern::compile("b", PatternFlags::empty()).unwrap();
        let spec = PatternSpec::compiled(re);
        assert!(check(&spec, ExecFlags::empty(), None, "ab").is_pass());
        let result = check(&spec, ExecFlag::Anchored.into(), None, "ab");
        assert_eq!(Some(&Failure::NoMatch), result.failure());
    }

    #[test]
    fn source_with_pattern_flags() {
        let spec = PatternSpec::<RegexPattern>::source(
            "HELLO",
            PatternFlag::CaseInsensitive.into(),
        );
        assert!(check(&spec, ExecFlags::empty(), None, "hello").is_pass());
        assert!(!check(&source("HELLO"), ExecFlags::empty(), None, "hello")
            .is_pass());
    }

    #[test]
    fn idempotent() {
        let spec = source(r"(\w+)@(\w+)");
        let expected = caps(&["me", "there"]);
        let first =
            check(&spec, ExecFlags::empty(), Some(&expected), "to: me@here");
        let second =
            check(&spec, ExecFlags::empty(), Some(&expected), "to: me@here");
        assert!(!first.is_pass());
        assert_eq!(first, second);
        assert_eq!(first.description(), second.description());
    }
}
