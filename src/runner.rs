use std::borrow::Borrow;

use {
    anyhow::Result,
    bstr::{BString, ByteSlice, ByteVec},
};

use crate::{
    check::{CheckResult, Failure},
    pattern::Pattern,
    suite::RegexTest,
};

const ENV_REGEX_TEST: &str = "REGEX_ROUNDTRIP_TEST";
const ENV_REGEX_TEST_VERBOSE: &str = "REGEX_ROUNDTRIP_TEST_VERBOSE";

/// A runner for executing round trip tests.
///
/// This runner is intended to be used within a Rust unit test, marked with
/// the `#[test]` attribute.
///
/// Typical usage corresponds to calling [`TestRunner::test_iter`] on an
/// iterator of [`RegexTest`]s, and then calling `assert` once done. If any
/// tests failed, then `assert` will panic with an error message containing
/// all test failures. `assert` must be called before the test completes.
///
/// Every test that is expected to match runs the full round trip check, so
/// each pattern is exercised both as compiled and after being serialized and
/// deserialized. Panics in the engine are caught and recorded as failures,
/// so one misbehaving test doesn't prevent the others from running.
///
/// # Skipping tests
///
/// If the `REGEX_ROUNDTRIP_TEST` environment variable is set, then it may
/// contain a comma separated list of substrings. Each substring corresponds
/// to a whitelisted item, unless it starts with a `-`, in which case it
/// corresponds to a blacklisted item.
///
/// If there are any whitelist items, then a test's full name must contain at
/// least one of the whitelist substrings in order to be run, and does not
/// contain and blacklist substrings. If there are no whitelist substrings,
/// then a test is run only when it does not match any blacklist substrings.
///
/// The last substring that a test name matches takes precedent.
///
/// Whitelist and blacklist substrings are matched on the full name of each
/// test, which typically looks like `group_name/test_name`.
#[derive(Debug)]
pub struct TestRunner {
    include: Vec<IncludePattern>,
    results: RegexTestResults,
}

impl TestRunner {
    /// Create a new runner for executing tests.
    ///
    /// This returns an error if there was a problem reading the
    /// `REGEX_ROUNDTRIP_TEST` environment variable, which may be set to
    /// include or exclude tests. See the docs on `TestRunner` for its format.
    pub fn new() -> Result<TestRunner> {
        let mut runner =
            TestRunner { include: vec![], results: RegexTestResults::new() };
        for substring in read_env(ENV_REGEX_TEST)?.split(',') {
            let substring = substring.trim();
            if substring.is_empty() {
                continue;
            }
            match substring.strip_prefix('-') {
                Some(substring) => runner.blacklist(substring),
                None => runner.whitelist(substring),
            };
        }
        Ok(runner)
    }

    /// Assert that all tests run have either passed or have been skipped.
    ///
    /// If any tests have failed, then a panic occurs with a report of all
    /// failures.
    ///
    /// If `REGEX_ROUNDTRIP_TEST_VERBOSE` is set to `1`, then a longer report
    /// of tests that passed, failed or skipped is printed.
    pub fn assert(&mut self) {
        self.results.assert();
    }

    /// Whitelist the given substring.
    ///
    /// Whitelist and blacklist rules are only applied when
    /// [`TestRunner::test_iter`] is called.
    pub fn whitelist(&mut self, substring: &str) -> &mut TestRunner {
        self.include.push(IncludePattern {
            blacklist: false,
            substring: BString::from(substring),
        });
        self
    }

    /// Whitelist the given iterator substrings.
    pub fn whitelist_iter<I, S>(&mut self, substrings: I) -> &mut TestRunner
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for substring in substrings {
            self.whitelist(substring.as_ref());
        }
        self
    }

    /// Blacklist the given substring.
    ///
    /// A blacklisted test is never run, unless a whitelisted substring added
    /// after the blacklisted substring matches it.
    pub fn blacklist(&mut self, substring: &str) -> &mut TestRunner {
        self.include.push(IncludePattern {
            blacklist: true,
            substring: BString::from(substring),
        });
        self
    }

    /// Blacklist the given iterator substrings.
    pub fn blacklist_iter<I, S>(&mut self, substrings: I) -> &mut TestRunner
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for substring in substrings {
            self.blacklist(substring.as_ref());
        }
        self
    }

    /// Run all of the given tests against the pattern implementation `P`.
    ///
    /// Note that if there are test failures, this merely _collects_ them.
    /// Use [`TestRunner::assert`] to fail the current test by panicking if
    /// there any failures.
    ///
    /// Typically, one provides
    /// [`RegexTests::iter`](crate::RegexTests::iter) as the iterator of
    /// `RegexTest` values.
    pub fn test_iter<P, I, T>(&mut self, it: I) -> &mut TestRunner
    where
        P: Pattern,
        I: IntoIterator<Item = T>,
        T: Borrow<RegexTest>,
    {
        for test in it {
            let test = test.borrow();
            if self.should_skip(test) {
                self.results.skip(test);
                continue;
            }
            self.test::<P>(test);
        }
        self
    }

    /// Run a single test against the pattern implementation `P`.
    ///
    /// This records the result of running the test in this runner. This does
    /// not fail the test immediately if the given test fails. Instead, this
    /// is only done when the `assert` method is called.
    ///
    /// Note that using this method bypasses any whitelist or blacklist
    /// applied to this runner.
    pub fn test<P: Pattern>(&mut self, test: &RegexTest) -> &mut TestRunner {
        log::debug!("running {}", test.full_name());
        let compile = || P::compile(test.regex(), test.pattern_flags());
        let compiled = match safe(compile) {
            Err(msg) => {
                self.results.fail(
                    test,
                    RegexTestFailureKind::UnexpectedPanicCompile(msg),
                );
                return self;
            }
            Ok(Ok(compiled)) => compiled,
            Ok(Err(err)) => {
                if !test.compiles() {
                    self.results.pass(test);
                } else {
                    let result = CheckResult::fail(Failure::Compile { err });
                    self.results
                        .fail(test, RegexTestFailureKind::Check { result });
                }
                return self;
            }
        };
        if !test.compiles() {
            self.results.fail(test, RegexTestFailureKind::NoCompileError);
            return self;
        }
        let m = test.to_matches(compiled);
        let result = match safe(|| m.verify(test.haystack())) {
            Ok(result) => result,
            Err(msg) => {
                self.results.fail(
                    test,
                    RegexTestFailureKind::UnexpectedPanicSearch(msg),
                );
                return self;
            }
        };
        if !test.matches() {
            if result.failure() == Some(&Failure::NoMatch) {
                self.results.pass(test);
            } else if result.is_pass() {
                self.results.fail(test, RegexTestFailureKind::UnexpectedMatch);
            } else {
                self.results
                    .fail(test, RegexTestFailureKind::Check { result });
            }
            return self;
        }
        if !result.is_pass() {
            self.results.fail(test, RegexTestFailureKind::Check { result });
            return self;
        }
        let groups = test.groups();
        if !groups.is_empty() {
            match safe(|| m.check_groups(test.haystack(), &groups)) {
                Ok(result) if !result.is_pass() => {
                    self.results
                        .fail(test, RegexTestFailureKind::Check { result });
                    return self;
                }
                Ok(_) => {}
                Err(msg) => {
                    self.results.fail(
                        test,
                        RegexTestFailureKind::UnexpectedPanicSearch(msg),
                    );
                    return self;
                }
            }
        }
        self.results.pass(test);
        self
    }

    /// Return true if and only if the given test should be skipped.
    fn should_skip(&self, test: &RegexTest) -> bool {
        if self.include.is_empty() {
            return false;
        }

        // If we don't have any whitelist patterns, then the test will be run
        // unless it is blacklisted. Otherwise, if there are whitelist
        // patterns, then the test must match at least one of them.
        let mut skip = self.include.iter().any(|pat| !pat.blacklist);
        for pat in &self.include {
            if test.full_name().as_bytes().contains_str(&pat.substring) {
                skip = pat.blacklist;
            }
        }
        skip
    }

    /// The number of tests that passed, were skipped and failed, in that
    /// order.
    pub fn counts(&self) -> (usize, usize, usize) {
        let r = &self.results;
        (r.pass.len(), r.skip.len(), r.fail.len())
    }
}

#[derive(Debug)]
struct IncludePattern {
    blacklist: bool,
    substring: BString,
}

/// A collection of test results, corresponding to passed, skipped and failed
/// tests.
#[derive(Debug)]
struct RegexTestResults {
    pass: Vec<RegexTestResult>,
    fail: Vec<RegexTestFailure>,
    skip: Vec<RegexTestResult>,
}

/// A test that passed or skipped.
#[derive(Debug)]
struct RegexTestResult {
    test: RegexTest,
}

/// A test that failed along with the reason why.
#[derive(Debug)]
struct RegexTestFailure {
    test: RegexTest,
    kind: RegexTestFailureKind,
}

/// Describes the nature of the failed test.
#[derive(Debug)]
enum RegexTestFailureKind {
    /// The round trip check, or the check of group offsets, failed. This
    /// includes a pattern that was expected to compile but didn't.
    Check { result: CheckResult },
    /// The test expected no match, but the pattern matched.
    UnexpectedMatch,
    /// The test expected the pattern to fail to compile, but it compiled
    /// successfully.
    NoCompileError,
    /// While compiling, a panic occurred. If possible, the panic message
    /// is captured.
    UnexpectedPanicCompile(String),
    /// While searching, a panic occurred. If possible, the panic message
    /// is captured.
    UnexpectedPanicSearch(String),
}

impl RegexTestResults {
    fn new() -> RegexTestResults {
        RegexTestResults { pass: vec![], fail: vec![], skip: vec![] }
    }

    fn pass(&mut self, test: &RegexTest) {
        log::trace!("pass: {}", test.full_name());
        self.pass.push(RegexTestResult { test: test.clone() });
    }

    fn fail(&mut self, test: &RegexTest, kind: RegexTestFailureKind) {
        log::trace!("FAIL: {}", test.full_name());
        self.fail.push(RegexTestFailure { test: test.clone(), kind });
    }

    fn skip(&mut self, test: &RegexTest) {
        log::trace!("skip: {}", test.full_name());
        self.skip.push(RegexTestResult { test: test.clone() });
    }

    fn assert(&self) {
        if read_env(ENV_REGEX_TEST_VERBOSE).map_or(false, |s| s == "1") {
            self.verbose();
        }
        if self.fail.is_empty() {
            return;
        }
        let failures = self
            .fail
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<String>>()
            .join("\n\n");
        panic!(
            "found {} failures:\n{}\n{}\n{}\n\n\
             Set the REGEX_ROUNDTRIP_TEST environment variable to filter \n\
             tests, e.g., REGEX_ROUNDTRIP_TEST=foo,-foo2 runs every test \n\
             whose name contains foo but not foo2\n\n",
            self.fail.len(),
            "~".repeat(79),
            failures.trim(),
            "~".repeat(79),
        )
    }

    fn verbose(&self) {
        println!("{}", "~".repeat(79));
        for t in &self.skip {
            println!("skip: {}", t.test.full_name());
        }
        for t in &self.pass {
            println!("pass: {}", t.test.full_name());
        }
        for t in &self.fail {
            println!("FAIL: {}", t.test.full_name());
        }
        println!(
            "\npassed: {}, skipped: {}, failed: {}",
            self.pass.len(),
            self.skip.len(),
            self.fail.len()
        );
        println!("{}", "~".repeat(79));
    }
}

impl std::fmt::Display for RegexTestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: {}\n\
             pattern:     {:?}\n\
             flags:       {:?} {:?}\n\
             haystack:    {:?}",
            self.test.full_name(),
            self.kind,
            self.test.regex(),
            self.test.pattern_flags(),
            self.test.exec_flags(),
            self.test.haystack().as_bytes().as_bstr(),
        )
    }
}

impl std::fmt::Display for RegexTestFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            RegexTestFailureKind::Check { ref result } => {
                write!(f, "{}", result)
            }
            RegexTestFailureKind::UnexpectedMatch => {
                write!(f, "expected no match, but found a match")
            }
            RegexTestFailureKind::NoCompileError => {
                write!(f, "expected regex to NOT compile, but it did")
            }
            RegexTestFailureKind::UnexpectedPanicCompile(ref msg) => {
                write!(f, "got unexpected panic while compiling:\n{}", msg)
            }
            RegexTestFailureKind::UnexpectedPanicSearch(ref msg) => {
                write!(f, "got unexpected panic while searching:\n{}", msg)
            }
        }
    }
}

/// Read the environment variable given. If it doesn't exist, then return an
/// empty string. Otherwise, check that it is valid UTF-8. If it isn't, return
/// a useful error message.
fn read_env(var: &str) -> Result<String> {
    let val = match std::env::var_os(var) {
        None => return Ok("".to_string()),
        Some(val) => val,
    };
    let val = val.into_string().map_err(|os| {
        anyhow::anyhow!(
            "invalid UTF-8 in env var {}={:?}",
            var,
            Vec::from_os_str_lossy(&os)
        )
    })?;
    Ok(val)
}

/// Runs the given closure such that any panics are caught and converted into
/// errors. If the panic'd value could not be converted to a known error type,
/// then a generic string error message is used.
fn safe<T, F>(fun: F) -> Result<T, String>
where
    F: FnOnce() -> T,
{
    use std::panic;

    panic::catch_unwind(panic::AssertUnwindSafe(fun)).map_err(|any_err| {
        // panic and assert produce &str or String
        if let Some(&s) = any_err.downcast_ref::<&str>() {
            s.to_owned()
        } else if let Some(s) = any_err.downcast_ref::<String>() {
            s.to_owned()
        } else {
            "UNABLE TO SHOW RESULT OF PANIC.".to_owned()
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::{engine::RegexPattern, suite::RegexTests};

    use super::*;

    fn load(data: &str) -> RegexTests {
        let mut tests = RegexTests::new();
        tests.load_slice("unit", data.as_bytes()).unwrap();
        tests
    }

    fn runner() -> TestRunner {
        TestRunner { include: vec![], results: RegexTestResults::new() }
    }

    #[test]
    fn passing_tests() {
        let tests = load(
            r#"
[[test]]
name = "captures"
regex = '(\d+)'
haystack = "answer=42"
captures = ["42"]
groups = [[7, 9], [7, 9]]

[[test]]
name = "no-match"
regex = 'x+'
haystack = "yyy"
matches = false

[[test]]
name = "bad"
regex = '(a'
haystack = "a"
compiles = false
"#,
        );
        let mut r = runner();
        r.test_iter::<RegexPattern, _, _>(tests.iter());
        assert_eq!((3, 0, 0), r.counts());
        r.assert();
    }

    #[test]
    fn failing_tests() {
        let tests = load(
            r#"
[[test]]
name = "count"
regex = '(a)b'
haystack = "ab"
captures = ["a", "b"]

[[test]]
name = "unexpected"
regex = 'y'
haystack = "yyy"
matches = false

[[test]]
name = "compiles"
regex = 'a'
haystack = "a"
compiles = false

[[test]]
name = "broken"
regex = '(a'
haystack = "a"

[[test]]
name = "offsets"
regex = '(a)(b)'
haystack = "ab"
groups = [[], [0, 2]]
"#,
        );
        let mut r = runner();
        r.test_iter::<RegexPattern, _, _>(tests.iter());
        assert_eq!((0, 0, 5), r.counts());

        let reports: Vec<String> =
            r.results.fail.iter().map(|f| f.to_string()).collect();
        assert!(reports[0].starts_with(
            "unit/count: Group count mismatches: was 1 should be 2. (normal)"
        ));
        assert!(reports[1].contains("expected no match, but found a match"));
        assert!(reports[2].contains("expected regex to NOT compile"));
        assert!(reports[3].contains("failed to compile pattern \"(a\""));
        assert!(reports[4].contains("Group 1 was not [0,2)"));
        assert!(reports[4].contains("haystack:    \"ab\""));
    }

    #[test]
    #[should_panic(expected = "found 1 failures")]
    fn assert_panics() {
        let tests = load(
            r#"
[[test]]
regex = 'x+'
haystack = "yyy"
"#,
        );
        runner().test_iter::<RegexPattern, _, _>(tests.iter()).assert();
    }

    #[test]
    fn filters() {
        let tests = load(
            r#"
[[test]]
name = "foo"
regex = 'a'
haystack = "a"

[[test]]
name = "foo2"
regex = 'a'
haystack = "a"

[[test]]
name = "bar"
regex = 'a'
haystack = "a"
"#,
        );
        let mut r = runner();
        r.whitelist("foo").blacklist("foo2");
        r.test_iter::<RegexPattern, _, _>(tests.iter());
        assert_eq!((1, 2, 0), r.counts());

        let mut r = runner();
        r.blacklist_iter(["bar"]);
        r.test_iter::<RegexPattern, _, _>(tests.iter());
        assert_eq!((2, 1, 0), r.counts());

        let mut r = runner();
        r.whitelist_iter(["bar", "foo2"]);
        r.test_iter::<RegexPattern, _, _>(tests.iter());
        assert_eq!((2, 1, 0), r.counts());
    }

    #[test]
    fn safe_catches_panics() {
        assert_eq!(Ok(5), safe(|| 5));
        let got = safe(|| -> i32 { panic!("boom") });
        assert_eq!(Err("boom".to_string()), got);
        let got = safe(|| -> i32 { panic!("{} {}", "big", "boom") });
        assert_eq!(Err("big boom".to_string()), got);
    }
}
