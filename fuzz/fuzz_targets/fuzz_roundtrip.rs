#![no_main]

use {
    libfuzzer_sys::{fuzz_target, Corpus},
    regex_roundtrip::{
        matches_with, Capture, ExecFlags, Matcher, Pattern, PatternFlags,
        RegexPattern,
    },
    regex_syntax::ast::Ast,
};

#[derive(Eq, PartialEq, arbitrary::Arbitrary)]
struct FuzzData {
    ast: Ast,
    haystack: String,
    flags: u8,
}

impl std::fmt::Debug for FuzzData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut builder = f.debug_struct("FuzzData");
        builder.field("ast", &format!("{}", self.ast));
        builder.field("haystack", &self.haystack);
        builder.field("flags", &self.flags());
        builder.finish()
    }
}

impl FuzzData {
    fn flags(&self) -> PatternFlags {
        use regex_roundtrip::{Flag, PatternFlag};

        PatternFlag::ALL
            .iter()
            .copied()
            .filter(|f| self.flags & (1 << f.as_repr()) != 0)
            .collect()
    }
}

fuzz_target!(|data: FuzzData| -> Corpus { do_fuzz(data) });

fn do_fuzz(data: FuzzData) -> Corpus {
    let _ = env_logger::try_init();

    let pattern = format!("{}", data.ast);
    let Ok(re) = RegexPattern::compile(&pattern, data.flags()) else {
        return Corpus::Reject;
    };
    let mut m = re.matcher(&data.haystack, ExecFlags::empty());
    if !m.find() {
        return Corpus::Reject;
    }
    let captures: Vec<Capture> =
        (1..=m.group_count()).map(|i| Capture::from(m.group(i))).collect();
    drop(m);

    // Whatever the engine reports must hold for the pattern as compiled and
    // for the pattern rebuilt from its serialized form.
    let check = matches_with::<RegexPattern>(&pattern, data.flags())
        .captures(captures);
    let result = check.check(&data.haystack);
    assert!(result.is_pass(), "{}: {}", check, result);
    let result = check.verify(&data.haystack);
    assert!(result.is_pass(), "{}: {}", check, result);
    Corpus::Keep
}
