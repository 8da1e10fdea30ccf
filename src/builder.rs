use crate::{
    check::{Assertion, CheckResult, Failure, Text},
    flags::{ExecFlags, PatternFlags},
    group::GroupRange,
    matching::{self, Capture, PatternSpec},
    pattern::{Matcher, Pattern},
    roundtrip,
};

/// Returns a check that `pattern` matches, with no options and no expected
/// captures.
///
/// # Example
///
/// ```
/// use regex_roundtrip::{matches, RegexPattern};
///
/// let m = matches::<RegexPattern>(r"\d+");
/// assert!(m.verify("abc 123").is_pass());
/// assert_eq!("No match.", m.verify("abc").description());
/// ```
pub fn matches<P: Pattern>(pattern: &str) -> Matches<P> {
    Matches::new(pattern)
}

/// Returns a check that `pattern`, compiled with the given options, matches.
///
/// # Example
///
/// ```
/// use regex_roundtrip::{matches_with, PatternFlag, RegexPattern};
///
/// let m = matches_with::<RegexPattern>(
///     r"(\w+)@(\w+)",
///     PatternFlag::CaseInsensitive.into(),
/// )
/// .captures(["me", "HERE"]);
/// assert!(m.verify("mail me@HERE").is_pass());
/// ```
pub fn matches_with<P: Pattern>(
    pattern: &str,
    flags: PatternFlags,
) -> Matches<P> {
    Matches::with_flags(pattern, flags)
}

/// Returns a check that an already compiled pattern matches when searched
/// with the given execution time options.
pub fn matches_compiled<P: Pattern>(
    pattern: P,
    exec_flags: ExecFlags,
) -> Matches<P> {
    Matches::compiled(pattern, exec_flags)
}

/// A configured check that a pattern matches a haystack.
///
/// A `Matches` is built once and can then be run against any number of
/// haystacks. It is usually built with [`matches`], [`matches_with`],
/// [`matches_compiled`] or a [`Builder`].
///
/// As an [`Assertion`], it runs the full round trip check, i.e.,
/// [`Matches::verify`].
#[derive(Clone, Debug)]
pub struct Matches<P> {
    pattern: PatternSpec<P>,
    exec_flags: ExecFlags,
    captures: Option<Vec<Capture>>,
}

impl<P: Pattern> Matches<P> {
    /// A check for the given pattern compiled with no options.
    pub fn new(pattern: &str) -> Matches<P> {
        Matches::with_flags(pattern, PatternFlags::empty())
    }

    /// A check for the given pattern compiled with the given options.
    pub fn with_flags(pattern: &str, flags: PatternFlags) -> Matches<P> {
        Matches::from_spec(PatternSpec::source(pattern, flags))
    }

    /// A check for an already compiled pattern, searched with the given
    /// execution time options.
    pub fn compiled(pattern: P, exec_flags: ExecFlags) -> Matches<P> {
        Matches::from_spec(PatternSpec::compiled(pattern))
            .exec_flags(exec_flags)
    }

    fn from_spec(pattern: PatternSpec<P>) -> Matches<P> {
        Matches { pattern, exec_flags: ExecFlags::empty(), captures: None }
    }

    /// Set the execution time options used for every search.
    pub fn exec_flags(mut self, flags: ExecFlags) -> Matches<P> {
        self.exec_flags = flags;
        self
    }

    /// Expect the leftmost match to capture exactly these texts, one for
    /// each capturing group of the pattern, in order.
    ///
    /// Anything that converts into a [`Capture`] works, so `Option<&str>`
    /// items can express groups that must not participate in the match.
    pub fn captures<I>(mut self, captures: I) -> Matches<P>
    where
        I: IntoIterator,
        I::Item: Into<Capture>,
    {
        self.captures = Some(captures.into_iter().map(Into::into).collect());
        self
    }

    /// The pattern this check runs.
    pub fn pattern(&self) -> &PatternSpec<P> {
        &self.pattern
    }

    /// The execution time options used for every search.
    pub fn get_exec_flags(&self) -> ExecFlags {
        self.exec_flags
    }

    /// The expected captures, if any were given.
    pub fn expected_captures(&self) -> Option<&[Capture]> {
        self.captures.as_deref()
    }

    /// Run the match check against the given haystack.
    pub fn check(&self, haystack: &str) -> CheckResult {
        matching::check(
            &self.pattern,
            self.exec_flags,
            self.expected_captures(),
            haystack,
        )
    }

    /// Run the match check against the given haystack, both with the pattern
    /// and with a copy of it that went through a serialization round trip.
    pub fn verify(&self, haystack: &str) -> CheckResult {
        roundtrip::verify(
            &self.pattern,
            self.exec_flags,
            self.expected_captures(),
            haystack,
        )
    }

    /// Check the offsets of groups in the leftmost match of the pattern.
    ///
    /// Expected captures are not consulted. The first failing range is
    /// reported, and a haystack without any match fails with
    /// [`Failure::NoMatch`].
    pub fn check_groups(
        &self,
        haystack: &str,
        groups: &[GroupRange],
    ) -> CheckResult {
        let result = self.pattern.with_pattern(|re| {
            let mut m = re.matcher(haystack, self.exec_flags);
            if !m.find() {
                return CheckResult::fail(Failure::NoMatch);
            }
            groups
                .iter()
                .map(|group| group.assert(&m))
                .find(|result| !result.is_pass())
                .unwrap_or_else(CheckResult::pass)
        });
        result
            .unwrap_or_else(|err| CheckResult::fail(Failure::Compile { err }))
    }
}

impl<P: Pattern> Assertion<str> for Matches<P> {
    fn assert(&self, haystack: &str) -> CheckResult {
        self.verify(haystack)
    }
}

impl<P: Pattern> core::fmt::Display for Matches<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "matches {}", self.pattern.as_str())?;
        if let Some(ref captures) = self.captures {
            write!(f, ", groups=[")?;
            for capture in captures {
                write!(f, " {}", Text(capture.as_str()))?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// A builder for configuring a [`Matches`] check from optional parts.
///
/// Exactly one of a pattern source or a compiled pattern must be given.
/// Pattern flags only apply to a pattern source. Any other combination is
/// rejected by [`Builder::build`].
#[derive(Clone, Debug)]
pub struct Builder<P> {
    pattern: Option<String>,
    pattern_flags: Option<PatternFlags>,
    compiled: Option<P>,
    exec_flags: ExecFlags,
    captures: Option<Vec<Capture>>,
}

impl<P: Pattern> Default for Builder<P> {
    fn default() -> Builder<P> {
        Builder::new()
    }
}

impl<P: Pattern> Builder<P> {
    /// Create a new builder with nothing set.
    pub fn new() -> Builder<P> {
        Builder {
            pattern: None,
            pattern_flags: None,
            compiled: None,
            exec_flags: ExecFlags::empty(),
            captures: None,
        }
    }

    /// Build the check, or report why the configuration is unusable.
    pub fn build(self) -> Result<Matches<P>, ConfigError> {
        let spec = match (self.pattern, self.compiled) {
            (None, None) => return Err(ConfigError::missing_pattern()),
            (Some(_), Some(_)) => {
                return Err(ConfigError::conflicting_patterns())
            }
            (Some(pattern), None) => PatternSpec::source(
                &pattern,
                self.pattern_flags.unwrap_or_default(),
            ),
            (None, Some(compiled)) => {
                if self.pattern_flags.is_some() {
                    return Err(ConfigError::flags_with_compiled());
                }
                PatternSpec::compiled(compiled)
            }
        };
        let mut m = Matches::from_spec(spec).exec_flags(self.exec_flags);
        m.captures = self.captures;
        Ok(m)
    }

    /// The pattern to compile.
    pub fn pattern(mut self, pattern: &str) -> Builder<P> {
        self.pattern = Some(pattern.to_string());
        self
    }

    /// The compile time options for the pattern set with
    /// [`Builder::pattern`].
    pub fn pattern_flags(mut self, flags: PatternFlags) -> Builder<P> {
        self.pattern_flags = Some(flags);
        self
    }

    /// An already compiled pattern to use instead of a pattern source.
    pub fn compiled(mut self, pattern: P) -> Builder<P> {
        self.compiled = Some(pattern);
        self
    }

    /// The execution time options used for every search.
    pub fn exec_flags(mut self, flags: ExecFlags) -> Builder<P> {
        self.exec_flags = flags;
        self
    }

    /// The expected captures. See [`Matches::captures`].
    pub fn captures<I>(mut self, captures: I) -> Builder<P>
    where
        I: IntoIterator,
        I::Item: Into<Capture>,
    {
        self.captures = Some(captures.into_iter().map(Into::into).collect());
        self
    }
}

/// An error that occurs when a [`Builder`] is given an unusable combination
/// of options.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigError {
    kind: ConfigErrorKind,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum ConfigErrorKind {
    MissingPattern,
    ConflictingPatterns,
    FlagsWithCompiled,
}

impl ConfigError {
    fn missing_pattern() -> ConfigError {
        ConfigError { kind: ConfigErrorKind::MissingPattern }
    }

    fn conflicting_patterns() -> ConfigError {
        ConfigError { kind: ConfigErrorKind::ConflictingPatterns }
    }

    fn flags_with_compiled() -> ConfigError {
        ConfigError { kind: ConfigErrorKind::FlagsWithCompiled }
    }
}

impl std::error::Error for ConfigError {}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self.kind {
            ConfigErrorKind::MissingPattern => write!(
                f,
                "either a pattern or a compiled pattern must be given",
            ),
            ConfigErrorKind::ConflictingPatterns => write!(
                f,
                "a pattern and a compiled pattern cannot both be given",
            ),
            ConfigErrorKind::FlagsWithCompiled => write!(
                f,
                "pattern flags cannot be given for a compiled pattern",
            ),
        }
    }
}
