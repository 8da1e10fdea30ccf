#![no_main]

use {
    libfuzzer_sys::{fuzz_target, Corpus},
    regex_roundtrip::{ExecFlags, Matcher, Pattern, RegexPattern},
};

fuzz_target!(|data: &[u8]| -> Corpus {
    run(data).map_or(Corpus::Reject, |_| Corpus::Keep)
});

fn run(given_data: &[u8]) -> Option<()> {
    let _ = env_logger::try_init();

    if given_data.len() < 2 {
        return None;
    }
    let haystack_len = usize::from(given_data[0]);
    let haystack = given_data.get(1..1 + haystack_len)?;
    let haystack = std::str::from_utf8(haystack).ok()?;
    let given_pattern_bytes = given_data.get(1 + haystack_len..)?;

    // The preamble is a fixed sequence of bytes, so the fuzzer is helped
    // along by always getting it right. Everything after it is fuzzed.
    let label = "rust-regex-roundtrip-pattern\x00\x00\x00\x00";
    assert_eq!(0, label.len() % 4);
    let mut bytes: Vec<u8> = vec![];
    bytes.extend(label.as_bytes());
    bytes.extend(0xFEFFu32.to_le_bytes());
    bytes.extend(1u32.to_le_bytes());
    bytes.extend(given_pattern_bytes);
    // This is the real test: no input given to from_bytes may result in a
    // panic, and whatever it produces must be searchable.
    let re = RegexPattern::from_bytes(&bytes).ok()?;
    let mut m = re.matcher(haystack, ExecFlags::empty());
    while m.find() {}
    Some(())
}
