use crate::{
    check::{Assertion, CheckResult, Failure},
    pattern::Matcher,
};

/// Checks that one group of the current match spans exactly
/// `[start, end)`.
///
/// This check is not part of the match check. It is run explicitly against a
/// matcher that has already found a match, e.g., via
/// [`Matches::check_groups`](crate::Matches::check_groups). A matcher without
/// a current match, or a group that did not participate, simply fails the
/// check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GroupRange {
    index: usize,
    start: usize,
    end: usize,
}

impl GroupRange {
    /// Expect group `index` to span `[start, end)`.
    pub fn new(index: usize, start: usize, end: usize) -> GroupRange {
        GroupRange { index, start, end }
    }

    /// The group this check looks at.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The expected starting offset.
    pub fn start(&self) -> usize {
        self.start
    }

    /// The expected ending offset.
    pub fn end(&self) -> usize {
        self.end
    }
}

impl<M: Matcher + ?Sized> Assertion<M> for GroupRange {
    fn assert(&self, m: &M) -> CheckResult {
        if m.start(self.index) == Some(self.start)
            && m.end(self.index) == Some(self.end)
        {
            return CheckResult::pass();
        }
        CheckResult::fail(Failure::GroupRange {
            index: self.index,
            start: self.start,
            end: self.end,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{engine::RegexPattern, flags::ExecFlags, pattern::Pattern};

    use super::*;

    #[test]
    fn two_groups() {
        let re = RegexPattern::new("(a)(b)").unwrap();
        let mut m = re.matcher("ab", ExecFlags::empty());
        assert!(m.find());
        assert!(GroupRange::new(0, 0, 2).assert(&m).is_pass());
        assert!(GroupRange::new(1, 0, 1).assert(&m).is_pass());
        assert!(GroupRange::new(2, 1, 2).assert(&m).is_pass());

        let result = GroupRange::new(2, 1, 3).assert(&m);
        assert_eq!("Group 2 was not [1,3)", result.description());
        let result = GroupRange::new(1, 1, 1).assert(&m);
        assert_eq!("Group 1 was not [1,1)", result.description());
    }

    #[test]
    fn missing_group_fails() {
        let re = RegexPattern::new("(a)|(b)").unwrap();
        let mut m = re.matcher("b", ExecFlags::empty());
        assert!(m.find());
        assert!(!GroupRange::new(1, 0, 0).assert(&m).is_pass());
        assert!(!GroupRange::new(9, 0, 1).assert(&m).is_pass());
    }

    #[test]
    fn no_match_fails() {
        let re = RegexPattern::new("z").unwrap();
        let mut m = re.matcher("ab", ExecFlags::empty());
        assert!(!m.find());
        let result = GroupRange::new(0, 0, 0).assert(&m);
        assert_eq!("Group 0 was not [0,0)", result.description());
    }

    #[test]
    fn works_with_dyn_matcher() {
        let re = RegexPattern::new(r"(\d+)-(\d+)").unwrap();
        let mut m = re.matcher("tel: 555-1234", ExecFlags::empty());
        assert!(m.find());
        let m: &dyn Matcher = &m;
        assert!(GroupRange::new(0, 5, 13).assert(m).is_pass());
        assert!(GroupRange::new(2, 9, 13).assert(m).is_pass());
    }
}
