#![no_main]

use bookwright::transform::{EntityTable, substitute};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // First line is treated as a definitions file, the rest as a document
    let (definitions, document) = input.split_once('\n').unwrap_or((input, ""));
    let (table, _rejected) = EntityTable::parse(definitions);
    let result = substitute(document, &table);
    for name in &result.unknown {
        assert!(table.get(name).is_none());
    }
});
