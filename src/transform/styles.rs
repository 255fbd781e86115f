//! Style customization.
//!
//! Applies every configured regex rewrite, in declaration order, to the
//! plain parts of a document. Runs of lines between a `:::` opening line
//! and a line that is exactly `:::` are emitted untouched.

use std::path::Path;

use regex::{Regex, RegexBuilder};

use crate::config::schema::{PatternRule, StylesConfig};
use crate::error::{BookwrightError, StageError};
use crate::observability::Reporter;

use super::{StageOutcome, output_path_for, read_stage_input, write_stage_output};

const FENCE: &str = ":::";

// ============================================================================
// Rules
// ============================================================================

/// A compiled rewrite rule.
#[derive(Debug, Clone)]
pub struct StyleRule {
    style: String,
    regex: Regex,
    replacement: String,
}

impl StyleRule {
    /// Style this rule was declared under.
    #[must_use]
    pub fn style(&self) -> &str {
        &self.style
    }

    /// Source text of the pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Replaces every match in `text`; `None` when nothing matched.
    fn rewrite(&self, text: &str) -> Option<String> {
        match self.regex.replace_all(text, self.replacement.as_str()) {
            std::borrow::Cow::Borrowed(_) => None,
            std::borrow::Cow::Owned(rewritten) => Some(rewritten),
        }
    }
}

/// Compiles one configured rule.
///
/// Patterns are compiled in multi-line mode so `^` and `$` match at every
/// embedded newline. The replacement uses backslash group references
/// (`\1`, `\g<name>`); a reference to a group the pattern does not define
/// is rejected here rather than silently expanding to nothing. A rule with
/// an empty replacement is disabled.
///
/// # Errors
///
/// Returns [`StageError::InvalidStylePattern`] if the pattern or the
/// replacement is empty, the pattern does not compile, or the replacement
/// holds a bad escape or names an unknown group.
pub fn compile_rule(style: &str, rule: &PatternRule) -> Result<StyleRule, StageError> {
    let invalid = |message: String| StageError::InvalidStylePattern {
        style: style.to_string(),
        pattern: rule.pattern.clone(),
        message,
    };

    if rule.pattern.is_empty() {
        return Err(invalid("empty pattern".to_string()));
    }
    if rule.replacement.is_empty() {
        return Err(invalid("empty replacement".to_string()));
    }

    let regex = RegexBuilder::new(&rule.pattern)
        .multi_line(true)
        .build()
        .map_err(|e| invalid(e.to_string()))?;

    let translated = translate_replacement(&rule.replacement).map_err(invalid)?;
    for group in &translated.groups {
        let known = match group {
            GroupRef::Index(index) => *index < regex.captures_len(),
            GroupRef::Name(name) => regex.capture_names().flatten().any(|n| n == name.as_str()),
        };
        if !known {
            return Err(invalid(format!("replacement refers to unknown group {group}")));
        }
    }

    Ok(StyleRule {
        style: style.to_string(),
        regex,
        replacement: translated.template,
    })
}

/// Every compiled rule of a styles file, flattened in declaration order.
#[derive(Debug, Clone, Default)]
pub struct StyleRuleSet {
    rules: Vec<StyleRule>,
}

impl StyleRuleSet {
    /// Compiles every rule; rules that fail are returned alongside the set
    /// and left out of it.
    #[must_use]
    pub fn compile(config: &StylesConfig) -> (Self, Vec<StageError>) {
        let mut rules = Vec::new();
        let mut rejected = Vec::new();

        for (style, definition) in &config.styles {
            for rule in &definition.patterns {
                match compile_rule(style, rule) {
                    Ok(compiled) => rules.push(compiled),
                    Err(e) => rejected.push(e),
                }
            }
        }

        (Self { rules }, rejected)
    }

    /// Number of usable rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no rule survived compilation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The compiled rules, in application order.
    #[must_use]
    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    /// Applies every rule in sequence; each rule sees the previous output.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        let mut current = text.to_string();
        for rule in &self.rules {
            if let Some(rewritten) = rule.rewrite(&current) {
                current = rewritten;
            }
        }
        current
    }
}

// ============================================================================
// Replacement Templates
// ============================================================================

/// A capture group referenced from a replacement template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GroupRef {
    Index(usize),
    Name(String),
}

impl std::fmt::Display for GroupRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Name(name) => write!(f, "'{name}'"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Translated {
    template: String,
    groups: Vec<GroupRef>,
}

/// Rewrites a backslash-style template into `regex` expansion syntax.
///
/// `\1`..`\99` and `\g<..>` become `${..}`, `\\` and the control escapes
/// (`\n`, `\t`, `\r`, `\a`, `\b`, `\f`, `\v`) become the characters they
/// name, and `$` is escaped. A backslash before any other ASCII letter, a
/// malformed `\g<..>` or a trailing backslash is an error; before anything
/// else the backslash is kept.
fn translate_replacement(template: &str) -> Result<Translated, String> {
    let mut out = String::with_capacity(template.len());
    let mut groups = Vec::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => match chars.peek().copied() {
                Some(first @ '1'..='9') => {
                    chars.next();
                    let mut digits = String::from(first);
                    if let Some(second) = chars.next_if(char::is_ascii_digit) {
                        digits.push(second);
                    }
                    push_group(&mut out, &mut groups, &digits);
                }
                Some('g') => {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    match read_group_name(&mut lookahead) {
                        Some(name) => {
                            chars = lookahead;
                            push_group(&mut out, &mut groups, &name);
                        }
                        None => {
                            return Err("bad group reference \\g in replacement".to_string());
                        }
                    }
                }
                Some(escaped @ ('\\' | 'n' | 't' | 'r' | 'a' | 'b' | 'f' | 'v')) => {
                    chars.next();
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        'a' => '\u{7}',
                        'b' => '\u{8}',
                        'f' => '\u{c}',
                        'v' => '\u{b}',
                        _ => '\\',
                    });
                }
                Some(letter) if letter.is_ascii_alphabetic() => {
                    return Err(format!("bad escape \\{letter} in replacement"));
                }
                Some(_) => out.push('\\'),
                None => return Err("trailing backslash in replacement".to_string()),
            },
            _ => out.push(c),
        }
    }

    Ok(Translated {
        template: out,
        groups,
    })
}

fn read_group_name(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<String> {
    if chars.next()? != '<' {
        return None;
    }
    let mut name = String::new();
    for c in chars.by_ref() {
        if c == '>' {
            let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
            return valid.then_some(name);
        }
        name.push(c);
    }
    None
}

fn push_group(out: &mut String, groups: &mut Vec<GroupRef>, reference: &str) {
    out.push_str("${");
    out.push_str(reference);
    out.push('}');
    groups.push(reference.parse::<usize>().map_or_else(
        |_| GroupRef::Name(reference.to_string()),
        GroupRef::Index,
    ));
}

// ============================================================================
// Fence Segmentation
// ============================================================================

/// A run of document text, classified by fence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text outside any fence block; subject to rewriting.
    Plain(&'a str),
    /// A fence block including its delimiter lines; emitted verbatim.
    Fenced(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Outside,
    Inside,
}

/// Splits `text` into alternating plain and fenced segments.
///
/// Concatenating the segments reproduces `text` exactly. A fence that is
/// never closed runs to the end of the document.
#[must_use]
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut state = FenceState::Outside;
    let mut start = 0;
    let mut offset = 0;

    for line in line_spans(text) {
        let end = offset + line.len();
        let trimmed = line.trim();

        match state {
            FenceState::Outside if trimmed.starts_with(FENCE) => {
                if start < offset {
                    out.push(Segment::Plain(&text[start..offset]));
                }
                start = offset;
                state = FenceState::Inside;
            }
            FenceState::Inside if trimmed == FENCE => {
                out.push(Segment::Fenced(&text[start..end]));
                start = end;
                state = FenceState::Outside;
            }
            _ => {}
        }

        offset = end;
    }

    if start < text.len() {
        let rest = &text[start..];
        out.push(match state {
            FenceState::Outside => Segment::Plain(rest),
            FenceState::Inside => Segment::Fenced(rest),
        });
    }

    out
}

/// Splits after each `\n`, `\r\n` or lone `\r`, keeping the terminators.
fn line_spans(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let end = match bytes[i] {
            b'\n' => i + 1,
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => i + 2,
            b'\r' => i + 1,
            _ => {
                i += 1;
                continue;
            }
        };
        lines.push(&text[start..end]);
        start = end;
        i = end;
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// Applies `rules` to every plain segment of `text`.
#[must_use]
pub fn customize(text: &str, rules: &StyleRuleSet) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment {
            Segment::Plain(plain) => out.push_str(&rules.apply(plain)),
            Segment::Fenced(fenced) => out.push_str(fenced),
        }
    }
    out
}

/// Customizes one file into `output_dir`, keeping its file name.
///
/// # Errors
///
/// Returns an I/O error if the file exists but cannot be read, or the
/// output cannot be written. A missing input is reported and skipped.
pub fn customize_file(
    input: &Path,
    output_dir: &Path,
    rules: &StyleRuleSet,
    reporter: &dyn Reporter,
) -> Result<StageOutcome, BookwrightError> {
    let Some(text) = read_stage_input(input)? else {
        let skipped = StageError::InputFileMissing {
            path: input.to_path_buf(),
        };
        reporter.warn(&skipped.to_string());
        return Ok(StageOutcome::Skipped(skipped));
    };

    let output = output_path_for(input, output_dir);
    write_stage_output(&output, &customize(&text, rules))?;
    reporter.info(&format!(
        "Customized {} -> {}",
        input.display(),
        output.display()
    ));

    Ok(StageOutcome::Written(output))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StyleDefinition;
    use crate::observability::{RecordingReporter, ReportLevel};
    use proptest::prelude::*;

    fn rule(pattern: &str, replacement: &str) -> PatternRule {
        PatternRule {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        }
    }

    fn rule_set(rules: &[(&str, &str)]) -> StyleRuleSet {
        let mut config = StylesConfig::default();
        config.styles.insert(
            "test".to_string(),
            StyleDefinition {
                patterns: rules.iter().map(|(p, r)| rule(p, r)).collect(),
            },
        );
        let (set, rejected) = StyleRuleSet::compile(&config);
        assert!(rejected.is_empty(), "{rejected:?}");
        set
    }

    #[test]
    fn rules_compose_in_order() {
        let set = rule_set(&[("a", "b"), ("b", "c")]);
        assert_eq!(set.apply("ab"), "cc");
    }

    #[test]
    fn anchors_match_each_line() {
        let set = rule_set(&[("^-", "*")]);
        assert_eq!(set.apply("- one\n- two\n"), "* one\n* two\n");
    }

    #[test]
    fn numbered_and_named_groups() {
        let set = rule_set(&[(r"(\w+)=(?P<v>\d+)", r"\g<v>:\1")]);
        assert_eq!(set.apply("x=1 y=22"), "1:x 22:y");
    }

    #[test]
    fn dollar_in_replacement_is_literal() {
        let set = rule_set(&[("EUR", "$1 and \\$")]);
        assert_eq!(set.apply("EUR"), "$1 and \\$");
    }

    #[test]
    fn replacement_escapes() {
        let set = rule_set(&[("x", r"a\nb\\c\td")]);
        assert_eq!(set.apply("x"), "a\nb\\c\td");
    }

    #[test]
    fn empty_replacement_disables_rule() {
        let err = compile_rule("deco", &rule("a", "")).unwrap_err();
        assert!(err.to_string().contains("empty replacement"));

        let mut config = StylesConfig::default();
        config.styles.insert(
            "deco".to_string(),
            StyleDefinition {
                patterns: vec![rule("a", ""), rule("b", "B")],
            },
        );
        let (set, rejected) = StyleRuleSet::compile(&config);
        assert_eq!(rejected.len(), 1);
        assert_eq!(set.apply("banana"), "Banana");
    }

    #[test]
    fn translate_two_digit_group() {
        let translated = translate_replacement(r"\12\g<name>").unwrap();
        assert_eq!(translated.template, "${12}${name}");
        assert_eq!(
            translated.groups,
            vec![GroupRef::Index(12), GroupRef::Name("name".to_string())]
        );
    }

    #[test]
    fn translate_rejects_bad_escapes() {
        assert!(translate_replacement(r"\g<oops").is_err());
        assert!(translate_replacement(r"\gname").is_err());
        assert!(translate_replacement(r"\q").is_err());
        assert!(translate_replacement("end\\").is_err());
        assert_eq!(translate_replacement(r"\&\.").unwrap().template, r"\&\.");
        assert_eq!(translate_replacement(r"\a\f").unwrap().template, "\u{7}\u{c}");

        let err = compile_rule("deco", &rule("x", r"\q")).unwrap_err();
        assert!(matches!(err, StageError::InvalidStylePattern { .. }));
        assert!(err.to_string().contains(r"bad escape \q"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = compile_rule("deco", &rule("(unclosed", "x")).unwrap_err();
        assert!(matches!(err, StageError::InvalidStylePattern { .. }));
        assert!(err.to_string().contains("style 'deco'"));
    }

    #[test]
    fn unknown_group_is_rejected() {
        assert!(compile_rule("deco", &rule("(a)", r"\2")).is_err());
        assert!(compile_rule("deco", &rule("(a)", r"\g<missing>")).is_err());
        assert!(compile_rule("deco", &rule("(a)", r"\1\g<0>")).is_ok());
    }

    #[test]
    fn bad_rules_are_skipped_and_others_kept() {
        let mut config = StylesConfig::default();
        config.styles.insert(
            "mixed".to_string(),
            StyleDefinition {
                patterns: vec![rule("(", "x"), rule("", "x"), rule("a", "b")],
            },
        );
        let (set, rejected) = StyleRuleSet::compile(&config);
        assert_eq!(set.len(), 1);
        assert_eq!(rejected.len(), 2);
        assert_eq!(set.rules()[0].style(), "mixed");
        assert_eq!(set.rules()[0].pattern(), "a");
    }

    #[test]
    fn segments_split_on_fences() {
        let text = "a\n::: include x\nb\n:::\nc\n";
        assert_eq!(
            segments(text),
            vec![
                Segment::Plain("a\n"),
                Segment::Fenced("::: include x\nb\n:::\n"),
                Segment::Plain("c\n"),
            ]
        );
    }

    #[test]
    fn nested_opener_is_content() {
        let text = ":::\n::: inner\n:::\nafter";
        assert_eq!(
            segments(text),
            vec![
                Segment::Fenced(":::\n::: inner\n:::\n"),
                Segment::Plain("after"),
            ]
        );
    }

    #[test]
    fn unclosed_fence_runs_to_end() {
        let set = rule_set(&[("x", "y")]);
        assert_eq!(customize("x\n::: raw\nx\n", &set), "y\n::: raw\nx\n");
    }

    #[test]
    fn indented_fences_are_recognized() {
        let set = rule_set(&[("x", "y")]);
        assert_eq!(
            customize("x\n  :::  \nx\n  :::\r\nx\r\n", &set),
            "y\n  :::  \nx\n  :::\r\ny\r\n"
        );
    }

    #[test]
    fn carriage_return_lines_delimit_fences() {
        let set = rule_set(&[("x", "y")]);
        assert_eq!(customize("x\r:::\rx\r:::\r", &set), "y\r:::\rx\r:::\r");
        assert_eq!(
            segments("a\r::: raw\r\nb\r:::\rc"),
            vec![
                Segment::Plain("a\r"),
                Segment::Fenced("::: raw\r\nb\r:::\r"),
                Segment::Plain("c"),
            ]
        );
    }

    #[test]
    fn plain_segment_is_rewritten_as_one_block() {
        let set = rule_set(&[("a\nb", "joined")]);
        assert_eq!(customize("a\nb\n", &set), "joined\n");
    }

    #[test]
    fn customize_file_keeps_name() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("volume-001.md");
        std::fs::write(&input, "colour\n").unwrap();
        let out_dir = dir.path().join("custom");

        let reporter = RecordingReporter::new();
        let set = rule_set(&[("colour", "color")]);
        let outcome = customize_file(&input, &out_dir, &set, &reporter).unwrap();

        let written = out_dir.join("volume-001.md");
        assert_eq!(outcome, StageOutcome::Written(written.clone()));
        assert_eq!(std::fs::read_to_string(written).unwrap(), "color\n");
    }

    #[test]
    fn customize_file_skips_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = RecordingReporter::new();
        let outcome = customize_file(
            &dir.path().join("absent.md"),
            dir.path(),
            &StyleRuleSet::default(),
            &reporter,
        )
        .unwrap();

        assert!(matches!(
            outcome,
            StageOutcome::Skipped(StageError::InputFileMissing { .. })
        ));
        assert_eq!(reporter.messages(ReportLevel::Warn).len(), 1);
    }

    fn lines(max: usize) -> impl Strategy<Value = String> {
        proptest::collection::vec("[a-c ]{0,8}", 0..max).prop_map(|lines| {
            lines.into_iter().map(|l| format!("{l}\n")).collect()
        })
    }

    proptest! {
        #[test]
        fn without_fences_equals_whole_text_rewrite(text in "[a-c \n]{0,64}") {
            let set = rule_set(&[("a", "bb"), ("^b", "c"), ("c$", "C")]);
            prop_assert_eq!(customize(&text, &set), set.apply(&text));
        }

        #[test]
        fn fenced_content_is_untouched(
            before in lines(4),
            inner in lines(4),
            after in lines(4),
        ) {
            let set = rule_set(&[("a", "b"), ("b$", "B")]);
            let fenced = format!("::: include\n{inner}:::\n");
            let text = format!("{before}{fenced}{after}");

            let expected = format!("{}{fenced}{}", set.apply(&before), set.apply(&after));
            prop_assert_eq!(customize(&text, &set), expected);
        }

        #[test]
        fn segments_reassemble(text in "[a: \r\n]{0,64}") {
            let joined: String = segments(&text)
                .into_iter()
                .map(|s| match s {
                    Segment::Plain(t) | Segment::Fenced(t) => t,
                })
                .collect();
            prop_assert_eq!(joined, text);
        }
    }
}
