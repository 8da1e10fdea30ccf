/*!
An implementation of [`Pattern`] backed by `regex-automata`'s meta regex
engine.

This is the engine the harness checks by default. Its compile time options
map onto `regex-automata`'s syntax configuration, its execution time options
map onto the configuration of an [`Input`], and its serialized form is
described in the [`wire`](crate::wire) module.
*/

use std::borrow::Cow;

use {
    anyhow::Context,
    regex_automata::{
        meta,
        util::{captures::Captures, iter::Searcher, syntax},
        Anchored, Input, PatternID,
    },
};

use crate::{
    error::Error,
    flags::{ExecFlag, ExecFlags, PatternFlag, PatternFlags},
    pattern::{Matcher, Pattern},
    wire::{self, DeserializeError},
};

/// The label written at the start of every serialized pattern.
const LABEL: &str = "rust-regex-roundtrip-pattern";

/// The current version of the serialized format.
const VERSION: u32 = 1;

/// A compiled pattern that can be serialized and deserialized.
///
/// Besides the compiled regex, this keeps the pattern and flags it was
/// compiled from. Those two things are all that is serialized. Deserializing
/// compiles them again, which always yields a new, independent regex.
#[derive(Clone, Debug)]
pub struct RegexPattern {
    pattern: String,
    flags: PatternFlags,
    re: meta::Regex,
}

impl RegexPattern {
    /// Compile the given pattern with no compile time options.
    pub fn new(pattern: &str) -> Result<RegexPattern, Error> {
        RegexPattern::compile(pattern, PatternFlags::empty())
    }

    /// Returns the underlying `regex-automata` regex.
    pub fn regex(&self) -> &meta::Regex {
        &self.re
    }

    /// Decodes the pattern and its flags from the wire format.
    fn decode(
        bytes: &[u8],
    ) -> Result<(&str, PatternFlags), DeserializeError> {
        let mut nr = 0;
        nr += wire::read_label(&bytes[nr..], LABEL)?;
        nr += wire::read_endianness_check(&bytes[nr..])?;
        nr += wire::read_version(&bytes[nr..], VERSION)?;
        let (bits, n) = wire::try_read_u32(&bytes[nr..], "pattern flags")?;
        nr += n;
        let flags = PatternFlags::from_bits(bits)
            .ok_or_else(|| DeserializeError::invalid_flags(bits))?;
        let (pattern, n) = wire::read_str(&bytes[nr..], "pattern")?;
        nr += n;
        wire::check_exhausted(&bytes[nr..])?;
        Ok((pattern, flags))
    }
}

impl Pattern for RegexPattern {
    type Matcher<'h> = RegexMatcher<'h>;

    fn compile(
        pattern: &str,
        flags: PatternFlags,
    ) -> Result<RegexPattern, Error> {
        let literal = flags.contains(PatternFlag::Literal);
        let source = if literal {
            Cow::Owned(regex_syntax::escape(pattern))
        } else {
            Cow::Borrowed(pattern)
        };
        // `escape` leaves whitespace alone, so it must stay significant.
        let ignore_whitespace =
            !literal && flags.contains(PatternFlag::IgnoreWhitespace);
        let syntax = syntax::Config::new()
            .case_insensitive(flags.contains(PatternFlag::CaseInsensitive))
            .multi_line(flags.contains(PatternFlag::MultiLine))
            .dot_matches_new_line(
                flags.contains(PatternFlag::DotMatchesNewLine),
            )
            .crlf(flags.contains(PatternFlag::Crlf))
            .swap_greed(flags.contains(PatternFlag::SwapGreed))
            .ignore_whitespace(ignore_whitespace)
            .unicode(!flags.contains(PatternFlag::Ascii));
        let re = meta::Regex::builder()
            .syntax(syntax)
            .build(&source)
            .map_err(|err| match err.syntax_error() {
                Some(syntax_err) => Error::new(pattern, syntax_err),
                None => Error::new(pattern, err),
            })?;
        log::trace!("compiled {:?} with flags {:?}", pattern, flags);
        Ok(RegexPattern { pattern: pattern.to_string(), flags, re })
    }

    fn as_str(&self) -> &str {
        &self.pattern
    }

    fn flags(&self) -> PatternFlags {
        self.flags
    }

    fn matcher<'h>(
        &'h self,
        haystack: &'h str,
        flags: ExecFlags,
    ) -> RegexMatcher<'h> {
        let mut input = Input::new(haystack)
            .earliest(flags.contains(ExecFlag::Earliest));
        if flags.contains(ExecFlag::Anchored) {
            input.set_anchored(Anchored::Yes);
        }
        RegexMatcher {
            re: &self.re,
            haystack,
            searcher: Searcher::new(input),
            caps: self.re.create_captures(),
        }
    }

    fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let mut buf = vec![];
        wire::write_label(LABEL, &mut buf);
        wire::write_endianness_check(&mut buf);
        wire::write_version(VERSION, &mut buf);
        wire::write_u32(self.flags.bits(), &mut buf);
        wire::write_str(&self.pattern, "pattern", &mut buf)
            .with_context(|| {
                format!("failed to serialize pattern {:?}", self.pattern)
            })?;
        Ok(buf)
    }

    fn from_bytes(bytes: &[u8]) -> anyhow::Result<RegexPattern> {
        let (pattern, flags) = RegexPattern::decode(bytes)
            .context("failed to deserialize pattern")?;
        let re = RegexPattern::compile(pattern, flags).with_context(|| {
            format!("failed to recompile deserialized pattern {:?}", pattern)
        })?;
        Ok(re)
    }
}

/// A search in progress over one haystack with a [`RegexPattern`].
#[derive(Debug)]
pub struct RegexMatcher<'h> {
    re: &'h meta::Regex,
    haystack: &'h str,
    searcher: Searcher<'h>,
    caps: Captures,
}

impl<'h> Matcher for RegexMatcher<'h> {
    fn find(&mut self) -> bool {
        let (re, caps) = (self.re, &mut self.caps);
        // The searcher takes care of empty matches that would otherwise
        // overlap with the end of the previous match.
        let m = self.searcher.advance(|input| {
            re.search_captures(input, caps);
            Ok(caps.get_match())
        });
        m.is_some()
    }

    fn group_count(&self) -> usize {
        self.re.group_info().group_len(PatternID::ZERO).saturating_sub(1)
    }

    fn group(&self, index: usize) -> Option<&str> {
        let span = self.caps.get_group(index)?;
        self.haystack.get(span.range())
    }

    fn start(&self, index: usize) -> Option<usize> {
        self.caps.get_group(index).map(|sp| sp.start)
    }

    fn end(&self, index: usize) -> Option<usize> {
        self.caps.get_group(index).map(|sp| sp.end)
    }
}
