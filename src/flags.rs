/*!
Option sets that control how a pattern is compiled and how it is executed.

Both kinds of options are small enumerations, so a set of them is
represented as a bit set. Two sets are equal when they contain the same
options, regardless of the order in which those options were inserted.
*/

use core::{fmt::Debug, hash::Hash, marker::PhantomData};

use serde::{Deserialize, Deserializer};

/// A set of compile time options.
pub type PatternFlags = FlagSet<PatternFlag>;

/// A set of execution time options.
pub type ExecFlags = FlagSet<ExecFlag>;

/// A single option that can be stored in a [`FlagSet`].
///
/// Every option has a small integer representation that must be unique
/// among the options of its kind and less than `32`.
pub trait Flag: Copy + Debug + Eq + Hash + 'static {
    /// Every option of this kind, ordered by representation.
    const ALL: &'static [Self];

    /// Returns the integer representation of this option.
    fn as_repr(self) -> u8;

    /// Returns the option corresponding to the given representation, if
    /// one exists.
    fn from_repr(repr: u8) -> Option<Self>;

    /// A short human readable name, as spelled in TOML test files.
    fn name(self) -> &'static str;
}

/// Options that change how a pattern is compiled.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum PatternFlag {
    /// Letters match both their upper and lower case forms.
    CaseInsensitive = 0,
    /// `^` and `$` match at the beginning and end of lines.
    MultiLine = 1,
    /// `.` also matches `\n`.
    DotMatchesNewLine = 2,
    /// `\r\n` is treated as a line terminator by multi-line anchors.
    Crlf = 3,
    /// Swaps the meaning of greedy and lazy repetition operators.
    SwapGreed = 4,
    /// Whitespace in the pattern is ignored and `#` starts a comment.
    IgnoreWhitespace = 5,
    /// The pattern is matched literally. Every meta character is escaped
    /// before compilation.
    Literal = 6,
    /// Unicode mode is disabled. Classes like `\w` only match ASCII.
    ///
    /// Haystacks are always UTF-8, so a pattern that could match an invalid
    /// UTF-8 sequence in this mode fails to compile. This includes `.`,
    /// `\W`, `\S` and negated classes like `[^a]`.
    Ascii = 7,
}

impl Flag for PatternFlag {
    const ALL: &'static [PatternFlag] = &[
        PatternFlag::CaseInsensitive,
        PatternFlag::MultiLine,
        PatternFlag::DotMatchesNewLine,
        PatternFlag::Crlf,
        PatternFlag::SwapGreed,
        PatternFlag::IgnoreWhitespace,
        PatternFlag::Literal,
        PatternFlag::Ascii,
    ];

    fn as_repr(self) -> u8 {
        self as u8
    }

    fn from_repr(repr: u8) -> Option<PatternFlag> {
        PatternFlag::ALL.get(usize::from(repr)).copied()
    }

    fn name(self) -> &'static str {
        match self {
            PatternFlag::CaseInsensitive => "case-insensitive",
            PatternFlag::MultiLine => "multi-line",
            PatternFlag::DotMatchesNewLine => "dot-matches-new-line",
            PatternFlag::Crlf => "crlf",
            PatternFlag::SwapGreed => "swap-greed",
            PatternFlag::IgnoreWhitespace => "ignore-whitespace",
            PatternFlag::Literal => "literal",
            PatternFlag::Ascii => "ascii",
        }
    }
}

/// Options that change how a compiled pattern searches a haystack.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ExecFlag {
    /// A match must begin where the search begins.
    ///
    /// This is not the same as putting `^` at the start of the pattern.
    /// When a matcher is asked for successive matches, each one must
    /// start exactly where the previous one ended.
    Anchored = 0,
    /// Report a match as soon as it is seen instead of continuing to look
    /// for its leftmost-first end.
    Earliest = 1,
}

impl Flag for ExecFlag {
    const ALL: &'static [ExecFlag] =
        &[ExecFlag::Anchored, ExecFlag::Earliest];

    fn as_repr(self) -> u8 {
        self as u8
    }

    fn from_repr(repr: u8) -> Option<ExecFlag> {
        ExecFlag::ALL.get(usize::from(repr)).copied()
    }

    fn name(self) -> &'static str {
        match self {
            ExecFlag::Anchored => "anchored",
            ExecFlag::Earliest => "earliest",
        }
    }
}

/// An immutable-by-value set of options.
///
/// Sets are `Copy`, so "modifying" a set produces a new value. Equality and
/// hashing are defined by the options present and nothing else.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct FlagSet<F> {
    bits: u32,
    kind: PhantomData<F>,
}

impl<F: Flag> FlagSet<F> {
    /// Create an empty set of options.
    pub fn empty() -> FlagSet<F> {
        FlagSet { bits: 0, kind: PhantomData }
    }

    /// Create a set containing every option of this kind.
    pub fn full() -> FlagSet<F> {
        F::ALL.iter().copied().collect()
    }

    /// Create a set containing just the option given.
    pub fn singleton(flag: F) -> FlagSet<F> {
        let mut set = FlagSet::empty();
        set.insert(flag);
        set
    }

    /// Returns the total number of options in this set.
    pub fn len(&self) -> usize {
        // OK because the count never exceeds 32.
        usize::try_from(self.bits.count_ones()).unwrap()
    }

    /// Returns true if and only if this set is empty.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Insert the given option into this set. If it is already present, then
    /// this is a no-op.
    pub fn insert(&mut self, flag: F) {
        self.bits |= 1 << flag.as_repr();
    }

    /// Remove the given option from this set. If it wasn't present, then this
    /// is a no-op.
    pub fn remove(&mut self, flag: F) {
        self.bits &= !(1 << flag.as_repr());
    }

    /// Returns true if and only if the given option is in this set.
    pub fn contains(&self, flag: F) -> bool {
        self.bits & (1 << flag.as_repr()) != 0
    }

    /// Returns a new set that contains every option in `self` and `other`.
    pub fn union(self, other: FlagSet<F>) -> FlagSet<F> {
        FlagSet { bits: self.bits | other.bits, kind: PhantomData }
    }

    /// Returns an iterator over the options in this set, ordered by their
    /// representation.
    pub fn iter(self) -> FlagSetIter<F> {
        FlagSetIter { set: self }
    }

    /// The raw bits of this set, for serialization.
    pub(crate) fn bits(&self) -> u32 {
        self.bits
    }

    /// Rebuilds a set from its raw bits. This returns `None` if any bit does
    /// not correspond to an option of this kind.
    pub(crate) fn from_bits(bits: u32) -> Option<FlagSet<F>> {
        let set = FlagSet { bits, kind: PhantomData };
        if set.iter().count() != set.len() {
            return None;
        }
        Some(set)
    }
}

impl<F: Flag> Default for FlagSet<F> {
    fn default() -> FlagSet<F> {
        FlagSet::empty()
    }
}

impl<F: Flag> Debug for FlagSet<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_set().entries(self.iter().map(|flag| flag.name())).finish()
    }
}

impl<F: Flag> From<F> for FlagSet<F> {
    fn from(flag: F) -> FlagSet<F> {
        FlagSet::singleton(flag)
    }
}

impl<F: Flag> FromIterator<F> for FlagSet<F> {
    fn from_iter<I: IntoIterator<Item = F>>(it: I) -> FlagSet<F> {
        let mut set = FlagSet::empty();
        set.extend(it);
        set
    }
}

impl<F: Flag> Extend<F> for FlagSet<F> {
    fn extend<I: IntoIterator<Item = F>>(&mut self, it: I) {
        for flag in it {
            self.insert(flag);
        }
    }
}

impl<F: Flag> IntoIterator for FlagSet<F> {
    type Item = F;
    type IntoIter = FlagSetIter<F>;

    fn into_iter(self) -> FlagSetIter<F> {
        self.iter()
    }
}

/// Sets are spelled as a list of option names in TOML, e.g.,
/// `["case-insensitive", "multi-line"]`.
impl<'de, F: Flag + Deserialize<'de>> Deserialize<'de> for FlagSet<F> {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<FlagSet<F>, D::Error> {
        let flags = Vec::<F>::deserialize(deserializer)?;
        Ok(flags.into_iter().collect())
    }
}

/// An iterator over all options in a [`FlagSet`].
///
/// This iterator is created by [`FlagSet::iter`].
#[derive(Clone)]
pub struct FlagSetIter<F> {
    set: FlagSet<F>,
}

impl<F: Flag> Debug for FlagSetIter<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("FlagSetIter").field("set", &self.set).finish()
    }
}

impl<F: Flag> Iterator for FlagSetIter<F> {
    type Item = F;

    fn next(&mut self) -> Option<F> {
        if self.set.is_empty() {
            return None;
        }
        // OK because trailing_zeros is at most 31 for a non-empty set.
        let repr = u8::try_from(self.set.bits.trailing_zeros()).unwrap();
        let flag = F::from_repr(repr)?;
        self.set.remove(flag);
        Some(flag)
    }
}
