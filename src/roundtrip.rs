/*!
Checks that a pattern behaves the same after a serialization round trip.

A round trip check first runs the ordinary match check against the pattern.
If that passes, the pattern is serialized and a new pattern is deserialized
from the bytes. The new pattern must then pass the very same check. Errors
while converting to or from bytes, and differences in behavior afterwards,
are reported as distinct kinds of failure so that a defective serializer is
never mistaken for a pattern that simply doesn't match.
*/

use crate::{
    check::{CheckResult, Failure, Stage},
    flags::ExecFlags,
    matching::{self, Capture, PatternSpec},
    pattern::Pattern,
};

/// Check that the pattern matches the haystack with the expected captures,
/// both as given and after a serialization round trip.
///
/// A failure of the ordinary check is returned unchanged. Failing to
/// serialize or deserialize the pattern yields [`Failure::Serialization`].
/// A rehydrated pattern that fails the check yields [`Failure::Regression`]
/// wrapping the reason it failed.
pub fn verify<P: Pattern>(
    pattern: &PatternSpec<P>,
    exec_flags: ExecFlags,
    captures: Option<&[Capture]>,
    haystack: &str,
) -> CheckResult {
    log::debug!(
        "verifying {:?} against {:?} with a round trip",
        pattern.as_str(),
        haystack,
    );
    pattern
        .with_pattern(|re| verify_pattern(re, exec_flags, captures, haystack))
        .unwrap_or_else(|err| CheckResult::fail(Failure::Compile { err }))
}

/// Run the round trip check against a compiled pattern.
pub(crate) fn verify_pattern<P: Pattern>(
    re: &P,
    exec_flags: ExecFlags,
    captures: Option<&[Capture]>,
    haystack: &str,
) -> CheckResult {
    let normal = matching::check_pattern(
        re,
        exec_flags,
        captures,
        haystack,
        Stage::Normal,
    );
    if !normal.is_pass() {
        return normal;
    }
    let rehydrated = match rehydrate(re) {
        Ok(rehydrated) => rehydrated,
        Err(err) => {
            log::debug!("round trip of {:?} failed: {:#}", re.as_str(), err);
            return CheckResult::fail(Failure::serialization(&err));
        }
    };
    let result = matching::check_pattern(
        &rehydrated,
        exec_flags,
        captures,
        haystack,
        Stage::Rehydrated,
    );
    match result.into_failure() {
        None => CheckResult::pass(),
        Some(cause) => {
            log::trace!("{:?} regressed: {}", re.as_str(), cause);
            CheckResult::fail(Failure::Regression { cause: Box::new(cause) })
        }
    }
}

/// Serialize the given pattern and deserialize a new, independent pattern
/// from the result.
pub fn rehydrate<P: Pattern>(re: &P) -> anyhow::Result<P> {
    let bytes = re.to_bytes()?;
    log::debug!("serialized {:?} to {} bytes", re.as_str(), bytes.len());
    P::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use crate::{
        engine::{RegexMatcher, RegexPattern},
        error::Error,
        flags::{PatternFlag, PatternFlags},
    };

    use super::*;

    /// Forgets its compile time options when serialized.
    struct Amnesiac(RegexPattern);

    /// Can't be serialized at all.
    struct Unserializable(RegexPattern);

    /// Produces bytes that can't be read back.
    struct Corrupting(RegexPattern);

    macro_rules! delegate {
        ($name:ident) => {
            fn compile(
                pattern: &str,
                flags: PatternFlags,
            ) -> Result<$name, Error> {
                RegexPattern::compile(pattern, flags).map($name)
            }

            fn as_str(&self) -> &str {
                self.0.as_str()
            }

            fn flags(&self) -> PatternFlags {
                self.0.flags()
            }

            fn matcher<'h>(
                &'h self,
                haystack: &'h str,
                flags: ExecFlags,
            ) -> RegexMatcher<'h> {
                self.0.matcher(haystack, flags)
            }
        };
    }

    impl Pattern for Amnesiac {
        type Matcher<'h> = RegexMatcher<'h>;

        delegate!(Amnesiac);

        fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
            RegexPattern::new(self.0.as_str())?.to_bytes()
        }

        fn from_bytes(bytes: &[u8]) -> anyhow::Result<Amnesiac> {
            RegexPattern::from_bytes(bytes).map(Amnesiac)
        }
    }

    impl Pattern for Unserializable {
        type Matcher<'h> = RegexMatcher<'h>;

        delegate!(Unserializable);

        fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("serialization is not supported")
        }

        fn from_bytes(bytes: &[u8]) -> anyhow::Result<Unserializable> {
            RegexPattern::from_bytes(bytes).map(Unserializable)
        }
    }

    impl Pattern for Corrupting {
        type Matcher<'h> = RegexMatcher<'h>;

        delegate!(Corrupting);

        fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
            let mut bytes = self.0.to_bytes()?;
            bytes.truncate(bytes.len() / 2);
            Ok(bytes)
        }

        fn from_bytes(bytes: &[u8]) -> anyhow::Result<Corrupting> {
            RegexPattern::from_bytes(bytes).map(Corrupting)
        }
    }

    fn source(pattern: &str) -> PatternSpec<RegexPattern> {
        PatternSpec::source(pattern, PatternFlags::empty())
    }

    #[test]
    fn passes() {
        let expected = vec![Capture::text("42")];
        let result = verify(
            &source(r"(\d+)"),
            ExecFlags::empty(),
            Some(&expected),
            "answer=42",
        );
        assert!(result.is_pass(), "{}", result);
    }

    #[test]
    fn normal_failure_unchanged() {
        let result = verify(&source("x+"), ExecFlags::empty(), None, "yyy");
        assert_eq!(Some(&Failure::NoMatch), result.failure());

        let expected = vec![Capture::text("a"), Capture::text("b")];
        let result = verify(
            &source("(a)b"),
            ExecFlags::empty(),
            Some(&expected),
            "ab",
        );
        assert_eq!(
            Some(&Failure::CaptureCount {
                got: 1,
                expected: 2,
                stage: Stage::Normal
            }),
            result.failure(),
        );

        let result = verify(&source("(a"), ExecFlags::empty(), None, "a");
        assert!(matches!(result.failure(), Some(&Failure::Compile { .. })));
    }

    #[test]
    fn behavior_drift_is_regression() {
        let spec = PatternSpec::<Amnesiac>::source(
            "ABC",
            PatternFlag::CaseInsensitive.into(),
        );
        assert!(matching::check(&spec, ExecFlags::empty(), None, "abc")
            .is_pass());

        let result = verify(&spec, ExecFlags::empty(), None, "abc");
        assert_eq!(
            Some(&Failure::Regression { cause: Box::new(Failure::NoMatch) }),
            result.failure(),
        );
        assert_eq!(
            "regression after serialization round trip: No match.",
            result.description(),
        );
    }

    #[test]
    fn capture_drift_names_stage() {
        let spec = PatternSpec::<Amnesiac>::source(
            "(B)",
            PatternFlag::CaseInsensitive.into(),
        );
        let expected = vec![Capture::text("b")];
        let result = verify(&spec, ExecFlags::empty(), Some(&expected), "bB");
        assert_eq!(
            "regression after serialization round trip: \
             Capture 0 mismatch: was \"B\" should be \"b\". \
             (serialized and deserialized)",
            result.description(),
        );
    }

    #[test]
    fn encode_error_is_serialization() {
        let spec = PatternSpec::<Unserializable>::source(
            "a",
            PatternFlags::empty(),
        );
        let result = verify(&spec, ExecFlags::empty(), None, "a");
        match result.failure() {
            Some(&Failure::Serialization { ref message, ref trace }) => {
                assert_eq!("serialization is not supported", message);
                assert!(trace.contains("serialization is not supported"));
            }
            got => panic!("expected serialization failure, got {:?}", got),
        }
        assert!(result.description().starts_with(
            "failed to serialize or deserialize pattern: \
             serialization is not supported"
        ));
    }

    #[test]
    fn decode_error_is_serialization() {
        let spec =
            PatternSpec::<Corrupting>::source("abc", PatternFlags::empty());
        let result = verify(&spec, ExecFlags::empty(), None, "abc");
        match result.failure() {
            Some(&Failure::Serialization { ref message, .. }) => {
                assert!(
                    message.starts_with("failed to deserialize pattern: "),
                    "{}",
                    message,
                );
            }
            got => panic!("expected serialization failure, got {:?}", got),
        }
    }

    #[test]
    fn defective_serializer_without_match_is_plain() {
        // The ordinary check runs first, so a serializer is never blamed
        // for a pattern that doesn't match in the first place.
        let spec =
            PatternSpec::<Unserializable>::source("z", PatternFlags::empty());
        let result = verify(&spec, ExecFlags::empty(), None, "a");
        assert_eq!(Some(&Failure::NoMatch), result.failure());
    }

    #[test]
    fn rehydrate_is_independent() {
        let re = RegexPattern::compile(
            "a.c",
            PatternFlag::DotMatchesNewLine.into(),
        )
        .unwrap();
        let got = rehydrate(&re).unwrap();
        assert_eq!(re.as_str(), got.as_str());
        assert_eq!(re.flags(), got.flags());
        drop(re);
        assert!(verify(
            &PatternSpec::compiled(got),
            ExecFlags::empty(),
            None,
            "a\nc",
        )
        .is_pass());
    }

    #[test]
    fn idempotent() {
        let spec = PatternSpec::<Amnesiac>::source(
            "X",
            PatternFlag::CaseInsensitive.into(),
        );
        let first = verify(&spec, ExecFlags::empty(), None, "x");
        let second = verify(&spec, ExecFlags::empty(), None, "x");
        assert!(!first.is_pass());
        assert_eq!(first, second);
    }
}
