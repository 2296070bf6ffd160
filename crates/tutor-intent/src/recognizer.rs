//! Pattern-based intent recognizer.
//!
//! Classifies a spoken or typed command into an [`IntentKind`] and extracts
//! the entities that intent needs. Rules are evaluated in declaration order
//! and the first pattern that fires wins, so the table below is the whole
//! dispatch policy.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use tutor_core::types::{
    Difficulty, Entities, Intent, IntentKind, DIFFICULTY, FILENAME, TARGET_LANGUAGE, TARGET_PAGE,
    TARGET_PARAGRAPH,
};

/// Spoken numerals accepted wherever a page or paragraph number is expected.
/// Longer words come first so `seventeen` is not read as `seven`.
const NUMBER_WORDS: &[(&str, usize)] = &[
    ("seventeen", 17),
    ("thirteen", 13),
    ("fourteen", 14),
    ("eighteen", 18),
    ("nineteen", 19),
    ("fifteen", 15),
    ("sixteen", 16),
    ("twelve", 12),
    ("eleven", 11),
    ("twenty", 20),
    ("three", 3),
    ("seven", 7),
    ("eight", 8),
    ("four", 4),
    ("five", 5),
    ("nine", 9),
    ("one", 1),
    ("two", 2),
    ("six", 6),
    ("ten", 10),
];

/// `(\d+|one|two|...)`. Only the spoken words need a trailing word
/// boundary, so ordinals like "3rd" still match on their digits.
fn numeral() -> String {
    let words: Vec<&str> = NUMBER_WORDS.iter().map(|(w, _)| *w).collect();
    format!(r"(\d+|(?:{})\b)", words.join("|"))
}

/// Rule table in evaluation order.
fn rule_table() -> Vec<(IntentKind, Vec<String>)> {
    let n = numeral();
    let owned = |pats: &[&str]| -> Vec<String> { pats.iter().map(|p| p.to_string()).collect() };

    vec![
        (
            IntentKind::Summarize,
            owned(&[r"\bsummari[sz]e", r"\bsummary of\b", r"\bwhat is the summary\b"]),
        ),
        (
            IntentKind::Explain,
            owned(&[
                r"\bexplain",
                r"\bwhat is\b",
                r"\bwhat does\b",
                r"\bdefine\b",
                r"\bdescribe\b",
                r"\btell me about\b",
                r"\bmeaning of\b",
            ]),
        ),
        (
            IntentKind::Translate,
            owned(&[
                r"\btranslate",
                r"\btranslation\b",
                r"\bchange language\b",
                r"\bspeak in\b",
                r"\bconvert to\b",
            ]),
        ),
        (
            IntentKind::Quiz,
            owned(&[r"\bquiz", r"\bquestion", r"\btest me\b", r"\bask me\b"]),
        ),
        (
            IntentKind::NavigateNext,
            owned(&[r"\bnext page\b", r"\bgo to next\b", r"\bnext\b"]),
        ),
        (
            IntentKind::NavigatePrev,
            owned(&[
                r"\bprevious page\b",
                r"\bgo to previous\b",
                r"\bback\b",
                r"\bprevious\b",
            ]),
        ),
        (
            IntentKind::NavigatePage,
            vec![
                format!(r"\bgo to page {}", n),
                format!(r"\bread page {}", n),
                format!(r"\bpage {}", n),
            ],
        ),
        (
            IntentKind::ReadParagraph,
            vec![
                format!(r"\bread paragraph {}", n),
                format!(r"\bparagraph {}", n),
            ],
        ),
        (
            IntentKind::Repeat,
            owned(&[r"\brepeat", r"\bsay again\b", r"\bsay that again\b"]),
        ),
        (
            IntentKind::Stop,
            owned(&[r"\bstop\b", r"\bexit\b", r"\bquit\b", r"\bend session\b"]),
        ),
        (
            IntentKind::Help,
            owned(&[
                r"\bhelp\b",
                r"\bwhat can you do\b",
                r"\bcapabilities\b",
                r"\bcommands\b",
            ]),
        ),
        (
            IntentKind::OpenDocument,
            owned(&[r"^(?:open|load|switch to)\s+\S"]),
        ),
    ]
}

static LANGUAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:to|in|into)\s+(\w+)").expect("Invalid language regex"));

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:open|load|switch to|read)\s+(?:the\s+)?(.+)").expect("Invalid filename regex")
});

static PDF_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s.])pdf$").expect("Invalid pdf suffix regex"));

static HARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhard\b").expect("Invalid difficulty regex"));

static EASY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\beasy\b").expect("Invalid difficulty regex"));

/// One row of the dispatch table.
struct IntentRule {
    kind: IntentKind,
    patterns: Vec<Regex>,
}

/// Deterministic, case-insensitive command classifier.
///
/// Construct once and share by reference; recognition is a pure function of
/// the trimmed, lower-cased utterance.
pub struct IntentRecognizer {
    rules: Vec<IntentRule>,
}

impl IntentRecognizer {
    pub fn new() -> Self {
        let rules = rule_table()
            .into_iter()
            .map(|(kind, pats)| IntentRule {
                kind,
                patterns: pats
                    .iter()
                    .map(|p| Regex::new(p).expect("Invalid intent regex"))
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    /// Intent kinds in the order they are tried.
    pub fn kinds(&self) -> impl Iterator<Item = IntentKind> + '_ {
        self.rules.iter().map(|r| r.kind)
    }

    /// Classify `utterance` and extract the entities for the winning intent.
    pub fn recognize(&self, utterance: &str) -> Intent {
        let text = utterance.trim().to_lowercase();
        if text.is_empty() {
            return Intent::unknown();
        }

        for rule in &self.rules {
            for pattern in &rule.patterns {
                if let Some(caps) = pattern.captures(&text) {
                    let capture = caps.get(1).map(|m| m.as_str());
                    let entities = extract_entities(rule.kind, &text, capture);
                    debug!(
                        intent = %rule.kind,
                        pattern = pattern.as_str(),
                        entities = entities.len(),
                        "Intent recognized"
                    );
                    return Intent::new(rule.kind, entities);
                }
            }
        }

        debug!(utterance = %text, "No intent pattern matched");
        Intent::unknown()
    }
}

impl Default for IntentRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

// -- Private helpers --

fn extract_entities(kind: IntentKind, text: &str, capture: Option<&str>) -> Entities {
    let mut entities = Entities::new();
    match kind {
        IntentKind::NavigatePage => {
            if let Some(index) = capture.and_then(parse_ordinal) {
                entities.insert_number(TARGET_PAGE, index);
            }
        }
        IntentKind::ReadParagraph => {
            if let Some(index) = capture.and_then(parse_ordinal) {
                entities.insert_number(TARGET_PARAGRAPH, index);
            }
        }
        IntentKind::Translate => {
            let language = LANGUAGE_RE
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| capitalize(m.as_str()))
                .unwrap_or_else(|| "English".to_string());
            entities.insert_text(TARGET_LANGUAGE, language);
        }
        IntentKind::Quiz => {
            let difficulty = if HARD_RE.is_match(text) {
                Difficulty::Hard
            } else if EASY_RE.is_match(text) {
                Difficulty::Easy
            } else {
                Difficulty::Medium
            };
            entities.insert_text(DIFFICULTY, difficulty.as_str());
        }
        IntentKind::OpenDocument => {
            if let Some(name) = extract_filename(text) {
                entities.insert_text(FILENAME, name);
            }
        }
        _ => {}
    }
    entities
}

/// 1-indexed spoken number to a 0-indexed position. Zero, overflow, and
/// unknown words yield `None`.
fn parse_ordinal(raw: &str) -> Option<usize> {
    let n = match raw.parse::<usize>() {
        Ok(n) => n,
        Err(_) => NUMBER_WORDS
            .iter()
            .find(|(word, _)| *word == raw)
            .map(|(_, n)| *n)?,
    };
    n.checked_sub(1)
}

fn extract_filename(text: &str) -> Option<String> {
    let raw = FILENAME_RE.captures(text)?.get(1)?.as_str().trim();
    let name = PDF_SUFFIX_RE.replace(raw, "");
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec() -> IntentRecognizer {
        IntentRecognizer::new()
    }

    fn kind(text: &str) -> IntentKind {
        rec().recognize(text).kind
    }

    // =========================================================================
    // Intent classification
    // =========================================================================

    #[test]
    fn test_intent_summarize() {
        assert_eq!(kind("Summarize this page"), IntentKind::Summarize);
        assert_eq!(kind("give me a summary of the chapter"), IntentKind::Summarize);
        assert_eq!(kind("summarise it please"), IntentKind::Summarize);
    }

    #[test]
    fn test_summary_question_beats_explain() {
        // "what is the summary" also contains "what is", but SUMMARIZE is declared first.
        assert_eq!(kind("what is the summary"), IntentKind::Summarize);
    }

    #[test]
    fn test_intent_explain() {
        assert_eq!(kind("explain photosynthesis"), IntentKind::Explain);
        assert_eq!(kind("What is a mitochondrion?"), IntentKind::Explain);
        assert_eq!(kind("tell me about the light reactions"), IntentKind::Explain);
        assert_eq!(kind("define osmosis"), IntentKind::Explain);
    }

    #[test]
    fn test_intent_translate() {
        assert_eq!(kind("translate this to Tamil"), IntentKind::Translate);
        assert_eq!(kind("speak in hindi"), IntentKind::Translate);
        assert_eq!(kind("convert to french"), IntentKind::Translate);
    }

    #[test]
    fn test_intent_quiz() {
        assert_eq!(kind("quiz me"), IntentKind::Quiz);
        assert_eq!(kind("test me on this"), IntentKind::Quiz);
        assert_eq!(kind("ask me some questions"), IntentKind::Quiz);
    }

    #[test]
    fn test_intent_navigation() {
        assert_eq!(kind("next page"), IntentKind::NavigateNext);
        assert_eq!(kind("next"), IntentKind::NavigateNext);
        assert_eq!(kind("go back"), IntentKind::NavigatePrev);
        assert_eq!(kind("previous page please"), IntentKind::NavigatePrev);
        assert_eq!(kind("go to page 4"), IntentKind::NavigatePage);
    }

    #[test]
    fn test_word_boundaries_prevent_false_navigation() {
        assert_ne!(kind("give me context"), IntentKind::NavigateNext);
        assert_ne!(kind("any feedback"), IntentKind::NavigatePrev);
    }

    #[test]
    fn test_intent_read_paragraph() {
        let intent = rec().recognize("read paragraph 2");
        assert_eq!(intent.kind, IntentKind::ReadParagraph);
        assert_eq!(intent.entities.number(TARGET_PARAGRAPH), Some(1));
    }

    #[test]
    fn test_intent_repeat_stop_help() {
        assert_eq!(kind("repeat that"), IntentKind::Repeat);
        assert_eq!(kind("say again"), IntentKind::Repeat);
        assert_eq!(kind("stop"), IntentKind::Stop);
        assert_eq!(kind("quit now"), IntentKind::Stop);
        assert_eq!(kind("end session"), IntentKind::Stop);
        assert_eq!(kind("help"), IntentKind::Help);
        assert_eq!(kind("what can you do"), IntentKind::Help);
    }

    #[test]
    fn test_intent_open_document() {
        let intent = rec().recognize("open biology notes pdf");
        assert_eq!(intent.kind, IntentKind::OpenDocument);
        assert_eq!(intent.entities.text(FILENAME), Some("biology notes"));

        let intent = rec().recognize("Load the chemistry.pdf");
        assert_eq!(intent.kind, IntentKind::OpenDocument);
        assert_eq!(intent.entities.text(FILENAME), Some("chemistry"));

        let intent = rec().recognize("switch to history");
        assert_eq!(intent.entities.text(FILENAME), Some("history"));
    }

    #[test]
    fn test_open_document_keeps_inner_pdf_letters() {
        let intent = rec().recognize("open pdfs of physics");
        assert_eq!(intent.entities.text(FILENAME), Some("pdfs of physics"));
    }

    #[test]
    fn test_open_document_bare_pdf_has_no_filename() {
        let intent = rec().recognize("open pdf");
        assert_eq!(intent.kind, IntentKind::OpenDocument);
        assert!(!intent.entities.contains(FILENAME));
    }

    #[test]
    fn test_empty_and_whitespace_are_unknown() {
        for text in ["", "   ", "\n\t"] {
            let intent = rec().recognize(text);
            assert_eq!(intent.kind, IntentKind::Unknown);
            assert!(intent.entities.is_empty());
        }
    }

    #[test]
    fn test_no_match_is_unknown() {
        let intent = rec().recognize("bananas are yellow");
        assert_eq!(intent.kind, IntentKind::Unknown);
        assert!(intent.entities.is_empty());
    }

    #[test]
    fn test_case_and_padding_do_not_matter() {
        let a = rec().recognize("  GO TO PAGE 3  ");
        let b = rec().recognize("go to page 3");
        assert_eq!(a, b);
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    #[test]
    fn test_first_category_wins() {
        // Contains both a TRANSLATE and a NAVIGATE_PAGE trigger.
        assert_eq!(kind("translate page 2 to hindi"), IntentKind::Translate);
        // Contains both EXPLAIN and QUIZ triggers.
        assert_eq!(kind("explain this question"), IntentKind::Explain);
        // "next" is tried before "page N".
        assert_eq!(kind("next page 5"), IntentKind::NavigateNext);
    }

    #[test]
    fn test_declaration_order_is_fixed() {
        let kinds: Vec<IntentKind> = rec().kinds().collect();
        assert_eq!(
            kinds,
            vec![
                IntentKind::Summarize,
                IntentKind::Explain,
                IntentKind::Translate,
                IntentKind::Quiz,
                IntentKind::NavigateNext,
                IntentKind::NavigatePrev,
                IntentKind::NavigatePage,
                IntentKind::ReadParagraph,
                IntentKind::Repeat,
                IntentKind::Stop,
                IntentKind::Help,
                IntentKind::OpenDocument,
            ]
        );
    }

    #[test]
    fn test_recognition_is_deterministic() {
        let r = rec();
        let first = r.recognize("quiz me on something hard");
        for _ in 0..10 {
            assert_eq!(r.recognize("quiz me on something hard"), first);
        }
    }

    // =========================================================================
    // Entities
    // =========================================================================

    #[test]
    fn test_target_page_is_zero_indexed_for_all_numerals() {
        let r = rec();
        for n in 1..=250usize {
            let templates = ["go to page {}", "read page {}", "page {}", "please open page {} now"];
            for template in templates {
                let text = template.replace("{}", &n.to_string());
                let intent = r.recognize(&text);
                assert_eq!(intent.kind, IntentKind::NavigatePage, "{}", text);
                assert_eq!(intent.entities.number(TARGET_PAGE), Some(n - 1), "{}", text);
            }
        }
    }

    #[test]
    fn test_spoken_page_numbers() {
        let intent = rec().recognize("go to page three");
        assert_eq!(intent.entities.number(TARGET_PAGE), Some(2));
        let intent = rec().recognize("page seventeen");
        assert_eq!(intent.entities.number(TARGET_PAGE), Some(16));
        let intent = rec().recognize("paragraph one");
        assert_eq!(intent.entities.number(TARGET_PARAGRAPH), Some(0));
    }

    #[test]
    fn test_ordinal_suffix_keeps_number() {
        let intent = rec().recognize("go to page 3rd");
        assert_eq!(intent.kind, IntentKind::NavigatePage);
        assert_eq!(intent.entities.number(TARGET_PAGE), Some(2));
        let intent = rec().recognize("read paragraph 2nd");
        assert_eq!(intent.entities.number(TARGET_PARAGRAPH), Some(1));
    }

    #[test]
    fn test_page_zero_omits_entity() {
        let intent = rec().recognize("go to page 0");
        assert_eq!(intent.kind, IntentKind::NavigatePage);
        assert!(!intent.entities.contains(TARGET_PAGE));
    }

    #[test]
    fn test_overflowing_numeral_omits_entity() {
        let intent = rec().recognize("go to page 99999999999999999999999999");
        assert_eq!(intent.kind, IntentKind::NavigatePage);
        assert!(intent.entities.is_empty());
    }

    #[test]
    fn test_translate_language_extraction() {
        let intent = rec().recognize("translate this into tamil");
        assert_eq!(intent.entities.text(TARGET_LANGUAGE), Some("Tamil"));
        let intent = rec().recognize("speak in hindi");
        assert_eq!(intent.entities.text(TARGET_LANGUAGE), Some("Hindi"));
        let intent = rec().recognize("convert to Spanish");
        assert_eq!(intent.entities.text(TARGET_LANGUAGE), Some("Spanish"));
    }

    #[test]
    fn test_translate_defaults_to_english() {
        for text in ["translate", "translate this", "translation please", "change language"] {
            let intent = rec().recognize(text);
            assert_eq!(intent.kind, IntentKind::Translate, "{}", text);
            assert_eq!(
                intent.entities.text(TARGET_LANGUAGE),
                Some("English"),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_quiz_difficulty() {
        let d = |t: &str| rec().recognize(t).entities.difficulty();
        assert_eq!(d("give me a hard quiz"), Difficulty::Hard);
        assert_eq!(d("an easy quiz please"), Difficulty::Easy);
        assert_eq!(d("quiz me"), Difficulty::Medium);
        assert_eq!(
            rec().recognize("quiz me").entities.text(DIFFICULTY),
            Some("medium")
        );
    }

    #[test]
    fn test_other_intents_carry_no_entities() {
        for text in ["next", "back", "repeat", "stop", "help", "summarize", "explain this"] {
            assert!(rec().recognize(text).entities.is_empty(), "{}", text);
        }
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("tamil"), "Tamil");
        assert_eq!(capitalize(""), "");
    }
}
