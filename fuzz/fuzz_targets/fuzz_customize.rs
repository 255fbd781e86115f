#![no_main]

use bookwright::config::{PatternRule, StyleDefinition, StylesConfig};
use bookwright::transform::{Segment, StyleRuleSet, customize, segments};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // `pattern \0 replacement \0 document`
    let mut parts = input.splitn(3, '\0');
    let (Some(pattern), Some(replacement), Some(document)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return;
    };

    let mut config = StylesConfig::default();
    config.styles.insert(
        "fuzz".to_string(),
        StyleDefinition {
            patterns: vec![PatternRule {
                pattern: pattern.to_string(),
                replacement: replacement.to_string(),
            }],
        },
    );
    let (rules, _rejected) = StyleRuleSet::compile(&config);
    let _ = customize(document, &rules);

    let rebuilt: String = segments(document)
        .into_iter()
        .map(|segment| match segment {
            Segment::Plain(text) | Segment::Fenced(text) => text,
        })
        .collect();
    assert_eq!(rebuilt, document);
});
