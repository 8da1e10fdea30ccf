/*!
A crate for checking that regex patterns match what they should, both as
compiled and after a serialization round trip.

A regex engine that can serialize its compiled patterns must guarantee that
a deserialized pattern behaves exactly like the one it came from. This crate
provides the checks for that guarantee:

* The match check runs a pattern against a haystack and compares the
capturing groups of the leftmost match with the expected captures. See
[`matching::check`].
* The round trip check runs the match check, serializes the pattern,
deserializes a new pattern from the bytes and runs the same match check
again. A failure after the round trip is reported as a
[`Failure::Regression`], and a failure to convert to or from bytes as a
[`Failure::Serialization`], so that a defective serializer is never confused
with a pattern that simply doesn't match. See [`roundtrip::verify`].
* The group range check compares the offsets of a single group in a match.
See [`GroupRange`].

Checks never panic to report a failure. They return a [`CheckResult`] with a
human readable description of what went wrong.

The engine under test is abstracted by the [`Pattern`] and [`Matcher`]
traits. [`RegexPattern`] implements them on top of `regex-automata`'s meta
regex engine, with the serialized format described in [`wire`].

# Example

```
use regex_roundtrip::{matches, Assertion, RegexPattern};

let m = matches::<RegexPattern>(r"(\d+)").captures(["42"]);
assert!(m.check("answer=42").is_pass());
assert!(m.assert("answer=42").is_pass());

let m = matches::<RegexPattern>("(a)b").captures(["a", "b"]);
assert_eq!(
    "Group count mismatches: was 1 should be 2. (normal)",
    m.verify("ab").description(),
);
```

# Test suites

Checks can also be described in TOML files and run in bulk by a
[`TestRunner`]. See the [`suite`] module for the format.

```
use regex_roundtrip::{RegexPattern, RegexTests, TestRunner};

let mut tests = RegexTests::new();
tests.load_slice("doc", br#"
[[test]]
name = "digits"
regex = '(\d+)'
haystack = "answer=42"
captures = ["42"]
"#)?;
TestRunner::new()?.test_iter::<RegexPattern, _, _>(tests.iter()).assert();
# Ok::<(), regex_roundtrip::anyhow::Error>(())
```

# Logging

This crate emits records through the `log` facade. Nothing is printed unless
the final binary installs a logger.
*/

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

/// For convenience, `anyhow::Error` is used to represent serialization and
/// test suite errors in this crate.
///
/// For this reason, `anyhow` is a public dependency and is re-exported here.
pub extern crate anyhow;

pub use crate::{
    builder::{
        matches, matches_compiled, matches_with, Builder, ConfigError,
        Matches,
    },
    check::{Assertion, CheckResult, Failure, Stage},
    engine::{RegexMatcher, RegexPattern},
    error::Error,
    flags::{
        ExecFlag, ExecFlags, Flag, FlagSet, FlagSetIter, PatternFlag,
        PatternFlags,
    },
    group::GroupRange,
    matching::{Capture, PatternSpec},
    pattern::{Matcher, Pattern},
    runner::TestRunner,
    suite::{RegexTest, RegexTests, RegexTestsIter},
};

mod builder;
mod check;
mod engine;
mod error;
mod flags;
mod group;
pub mod matching;
mod pattern;
pub mod roundtrip;
mod runner;
pub mod suite;
pub mod wire;
