#![no_main]

use bookwright::transform::{demote_headings, merge_documents};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(fragment) = std::str::from_utf8(data) {
        let demoted = demote_headings(fragment);
        let merged = merge_documents("Title", &[fragment]);
        assert!(merged.starts_with("# Title\n"));
        assert!(merged.ends_with(demoted.as_str()));
    }
});
