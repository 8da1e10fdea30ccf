/*!
Defines round trip tests in a TOML format.

A test suite is made up of zero or more TOML files. Each file contains zero
or more tests, where each test is defined as a table via `[[test]]`.

Each test has the following fields:

* `name` - A name for the test. It must be unique within its file. When
absent, tests are numbered starting at `1`. A test's [`RegexTest::full_name`]
is `{group_name}/{name}`, where the group name is the file stem (the file
name without the `.toml` suffix).
* `regex` - The pattern to test.
* `haystack` - The text to search.
* `captures` - An optional list with one entry for each capturing group in
the pattern, not counting group `0`. Each entry is either the text the group
should capture in the leftmost match, or `[]` for a group that should not
participate in the match.
* `groups` - An optional list of `[start, end]` spans for groups `0`, `1` and
so on. Each span is checked against the offsets of the corresponding group
in the leftmost match. A `[]` entry skips that group.
* `matches` - Whether the pattern is expected to match the haystack at all.
It defaults to `true`. When `false`, neither `captures` nor `groups` may be
given.
* `compiles` - Whether the pattern is expected to compile. It defaults to
`true`. When `false`, compiling the pattern must fail and nothing else is
checked.
* `pattern-flags` - An optional list of compile time options, e.g.,
`["case-insensitive", "multi-line"]`. See
[`PatternFlag`](crate::PatternFlag) for every option.
* `exec-flags` - An optional list of execution time options, e.g.,
`["anchored"]`. See [`ExecFlag`](crate::ExecFlag) for every option.
* `unescape` - When enabled, escape sequences like `\n` or `\xFF` in the
haystack are unescaped. The unescaped haystack must still be valid UTF-8.
*/

use std::{collections::HashSet, fs, path::Path};

use {
    anyhow::{bail, Context, Result},
    bstr::ByteVec,
    serde::Deserialize,
};

use crate::{
    builder::Matches,
    flags::{ExecFlags, PatternFlags},
    group::GroupRange,
    matching::Capture,
    pattern::Pattern,
};

/// A collection of round trip tests.
#[derive(Clone, Debug, Deserialize)]
pub struct RegexTests {
    /// 'default' permits an empty TOML file.
    #[serde(default, rename = "test")]
    tests: Vec<RegexTest>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl RegexTests {
    /// Create a new empty collection of tests.
    pub fn new() -> RegexTests {
        RegexTests { tests: vec![], seen: HashSet::new() }
    }

    /// Loads all of the tests in the given TOML file. The group name assigned
    /// to each test is the stem of the file name. For example, if one loads
    /// `foo/bar.toml`, then the group name for each test will be `bar`.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let data = fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let group_name = path
            .file_stem()
            .with_context(|| {
                format!("failed to get file name of {}", path.display())
            })?
            .to_str()
            .with_context(|| {
                format!("invalid UTF-8 found in {}", path.display())
            })?;
        self.load_slice(group_name, &data)
            .with_context(|| format!("error loading {}", path.display()))?;
        Ok(())
    }

    /// Load all of the TOML encoded tests in `data` into this collection.
    /// The given group name is assigned to all loaded tests.
    pub fn load_slice(&mut self, group_name: &str, data: &[u8]) -> Result<()> {
        let data = std::str::from_utf8(data).with_context(|| {
            format!("data in {} is not valid UTF-8", group_name)
        })?;
        let mut index = 1;
        let mut tests: RegexTests =
            toml::from_str(data).with_context(|| {
                format!("error decoding TOML for '{}'", group_name)
            })?;
        for t in &mut tests.tests {
            t.group = group_name.to_string();
            if t.name.is_empty() {
                t.name = format!("{}", index);
                index += 1;
            }
            t.full_name = format!("{}/{}", t.group, t.name);
            if t.unescape {
                let unescaped = Vec::unescape_bytes(&t.haystack);
                t.haystack = String::from_utf8(unescaped).with_context(|| {
                    format!(
                        "unescaped haystack of '{}' is not valid UTF-8",
                        t.full_name,
                    )
                })?;
            }
            if !t.matches && (t.captures.is_some() || t.groups.is_some()) {
                bail!(
                    "test '{}' expects no match but lists captures or groups",
                    t.full_name,
                );
            }
            for span in t.groups.iter().flatten() {
                if let MaybeSpan::Some([start, end]) = *span {
                    anyhow::ensure!(
                        start <= end,
                        "span [{}, {}] in '{}' ends before it starts",
                        start,
                        end,
                        t.full_name,
                    );
                }
            }
            if self.seen.contains(t.full_name()) {
                bail!("found duplicate tests for name '{}'", t.full_name());
            }
            self.seen.insert(t.full_name().to_string());
        }
        self.tests.extend(tests.tests);
        log::debug!(
            "loaded tests from '{}', {} tests in total",
            group_name,
            self.tests.len(),
        );
        Ok(())
    }

    /// Return an iterator over all tests that have been loaded. The order of
    /// the iterator corresponds to the order in which the tests were loaded.
    ///
    /// This is useful to pass to
    /// [`TestRunner::test_iter`](crate::TestRunner::test_iter).
    pub fn iter(&self) -> RegexTestsIter {
        RegexTestsIter(self.tests.iter())
    }
}

impl Default for RegexTests {
    fn default() -> RegexTests {
        RegexTests::new()
    }
}

/// A round trip test describes a pattern, a haystack and what the leftmost
/// match of the pattern in the haystack should look like.
///
/// Each `RegexTest` represents a single `[[test]]` table in a TOML test file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexTest {
    #[serde(skip)]
    group: String,
    #[serde(default)]
    name: String,
    #[serde(skip)]
    full_name: String,
    regex: String,
    haystack: String,
    captures: Option<Vec<MaybeCapture>>,
    groups: Option<Vec<MaybeSpan>>,
    #[serde(default = "default_true")]
    matches: bool,
    #[serde(default = "default_true")]
    compiles: bool,
    #[serde(default, rename = "pattern-flags")]
    pattern_flags: PatternFlags,
    #[serde(default, rename = "exec-flags")]
    exec_flags: ExecFlags,
    #[serde(default)]
    unescape: bool,
}

impl RegexTest {
    /// Return the group name of this test.
    ///
    /// When using [`RegexTests::load`], the group name corresponds to the
    /// file stem. Otherwise, it is whatever is given to
    /// [`RegexTests::load_slice`].
    pub fn group(&self) -> &str {
        &self.group
    }

    /// The name of this test, as given in its `[[test]]` block.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full name of this test, which is formed by joining the group
    /// name and the test name with a `/`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The pattern to test.
    pub fn regex(&self) -> &str {
        &self.regex
    }

    /// The text to search, after unescaping if that was requested.
    pub fn haystack(&self) -> &str {
        &self.haystack
    }

    /// The captures expected in the leftmost match, if any were given.
    pub fn captures(&self) -> Option<Vec<Capture>> {
        let captures = self.captures.as_ref()?;
        let captures = captures.iter().cloned();
        Some(captures.map(MaybeCapture::into_capture).collect())
    }

    /// The group offsets expected in the leftmost match. Groups given as
    /// `[]` are left out.
    pub fn groups(&self) -> Vec<GroupRange> {
        let spans = match self.groups {
            None => return vec![],
            Some(ref spans) => spans,
        };
        spans
            .iter()
            .enumerate()
            .filter_map(|(index, span)| match *span {
                MaybeSpan::None(_) => None,
                MaybeSpan::Some([start, end]) => {
                    Some(GroupRange::new(index, start, end))
                }
            })
            .collect()
    }

    /// Returns true if the pattern is expected to match the haystack.
    pub fn matches(&self) -> bool {
        self.matches
    }

    /// Returns true if the pattern is expected to compile.
    pub fn compiles(&self) -> bool {
        self.compiles
    }

    /// The compile time options for the pattern.
    pub fn pattern_flags(&self) -> PatternFlags {
        self.pattern_flags
    }

    /// The execution time options for every search.
    pub fn exec_flags(&self) -> ExecFlags {
        self.exec_flags
    }

    /// Returns the check described by this test for an already compiled
    /// pattern.
    pub fn to_matches<P: Pattern>(&self, pattern: P) -> Matches<P> {
        let m = Matches::compiled(pattern, self.exec_flags);
        match self.captures() {
            None => m,
            Some(captures) => m.captures(captures),
        }
    }
}

/// An iterator over round trip tests.
///
/// This iterator is created by the [`RegexTests::iter`] method.
#[derive(Debug)]
pub struct RegexTestsIter<'a>(std::slice::Iter<'a, RegexTest>);

impl<'a> Iterator for RegexTestsIter<'a> {
    type Item = &'a RegexTest;

    fn next(&mut self) -> Option<&'a RegexTest> {
        self.0.next()
    }
}

/// A single expected capture in TOML. Text is a plain string and a group
/// that must not participate is `[]`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
enum MaybeCapture {
    None([String; 0]),
    Some(String),
}

impl MaybeCapture {
    fn into_capture(self) -> Capture {
        match self {
            MaybeCapture::None(_) => Capture::unmatched(),
            MaybeCapture::Some(text) => Capture::text(text),
        }
    }
}

/// A group's span in TOML, or `[]` when the group isn't checked.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
enum MaybeSpan {
    None([usize; 0]),
    Some([usize; 2]),
}

/// A function to set some boolean fields to a default of 'true'. We use a
/// function so that we can hand a path to it to Serde.
fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use crate::flags::{ExecFlag, PatternFlag};

    use super::*;

    fn load(data: &str) -> Result<RegexTests> {
        let mut tests = RegexTests::new();
        tests.load_slice("test", data.as_bytes())?;
        Ok(tests)
    }

    #[test]
    fn err_no_regex() {
        let data = r#"
[[test]]
name = "foo"
haystack = "abc"
"#;
        assert!(load(data).is_err());
    }

    #[test]
    fn err_unknown_field() {
        let data = r#"
[[test]]
name = "foo"
regex = "a"
haystack = "abc"
something = 0
"#;
        assert!(load(data).is_err());
    }

    #[test]
    fn err_unknown_flag() {
        let data = r#"
[[test]]
regex = "a"
haystack = "abc"
pattern-flags = ["upside-down"]
"#;
        assert!(load(data).is_err());
    }

    #[test]
    fn err_duplicate_name() {
        let data = r#"
[[test]]
name = "foo"
regex = "a"
haystack = "a"

[[test]]
name = "foo"
regex = "b"
haystack = "b"
"#;
        let err = load(data).unwrap_err();
        assert!(err.to_string().contains("test/foo"), "{}", err);
    }

    #[test]
    fn err_captures_without_match() {
        let data = r#"
[[test]]
regex = "(a)"
haystack = "b"
captures = ["a"]
matches = false
"#;
        assert!(load(data).is_err());
    }

    #[test]
    fn err_backwards_span() {
        let data = r#"
[[test]]
regex = "(a)"
haystack = "a"
groups = [[1, 0]]
"#;
        assert!(load(data).is_err());
    }

    #[test]
    fn err_invalid_utf8_after_unescape() {
        let data = r#"
[[test]]
regex = "a"
haystack = 'a\xFF'
unescape = true
"#;
        assert!(load(data).is_err());
    }

    #[test]
    fn load_defaults() {
        let data = r#"
[[test]]
regex = "a+"
haystack = "xaa"

[[test]]
regex = "b"
haystack = "b"
"#;
        let tests = load(data).unwrap();
        let all: Vec<&RegexTest> = tests.iter().collect();
        assert_eq!(2, all.len());

        let t0 = all[0];
        assert_eq!("test", t0.group());
        assert_eq!("1", t0.name());
        assert_eq!("test/1", t0.full_name());
        assert_eq!("a+", t0.regex());
        assert_eq!("xaa", t0.haystack());
        assert_eq!(None, t0.captures());
        assert!(t0.groups().is_empty());
        assert!(t0.matches());
        assert!(t0.compiles());
        assert!(t0.pattern_flags().is_empty());
        assert!(t0.exec_flags().is_empty());
        assert_eq!("test/2", all[1].full_name());
    }

    #[test]
    fn load_everything() {
        let data = r#"
[[test]]
name = "foo"
regex = '(a)|(b)(c)?'
haystack = 'x\nb'
captures = [[], "b", []]
groups = [[2, 3], [], [2, 3]]
pattern-flags = ["case-insensitive", "ascii"]
exec-flags = ["earliest"]
unescape = true
"#;
        let tests = load(data).unwrap();
        let t0 = tests.iter().next().unwrap();
        assert_eq!("test/foo", t0.full_name());
        assert_eq!("x\nb", t0.haystack());
        assert_eq!(
            Some(vec![
                Capture::unmatched(),
                Capture::text("b"),
                Capture::unmatched(),
            ]),
            t0.captures(),
        );
        assert_eq!(
            vec![GroupRange::new(0, 2, 3), GroupRange::new(2, 2, 3)],
            t0.groups(),
        );
        let expected: PatternFlags =
            [PatternFlag::Ascii, PatternFlag::CaseInsensitive]
                .into_iter()
                .collect();
        assert_eq!(expected, t0.pattern_flags());
        assert_eq!(ExecFlags::from(ExecFlag::Earliest), t0.exec_flags());
    }

    #[test]
    fn load_no_match_or_compile() {
        let data = r#"
[[test]]
regex = "x+"
haystack = "yyy"
matches = false

[[test]]
regex = "(a"
haystack = "a"
compiles = false
"#;
        let tests = load(data).unwrap();
        let all: Vec<&RegexTest> = tests.iter().collect();
        assert!(!all[0].matches());
        assert!(all[0].compiles());
        assert!(!all[1].compiles());
    }

    #[test]
    fn empty_file() {
        assert_eq!(0, load("").unwrap().iter().count());
    }
}
