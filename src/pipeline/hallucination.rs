//! Hallucination cleaning for speech-to-text output.
//!
//! On silence or noise the model tends to emit bracketed non-speech markers
//! ("(音楽)", "(applause)") and stock end-of-video phrases. Two pattern
//! classes handle this:
//!
//! - strip patterns are removed from inside otherwise-valid text;
//! - full patterns, checked after stripping, mean nothing meaningful was
//!   said and the whole segment is discarded.
//!
//! Cleaning runs per segment as well as on the whole text, so a mixed
//! transcript keeps its genuine segments while dropping the hallucinated
//! ones.

use once_cell::sync::Lazy;
use regex::Regex;

static STRIP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Bracketed non-speech markers, ASCII and fullwidth brackets.
        r"[\(\[（【][^\)\]）】]*[\)\]）】]",
        // Stock end-of-video phrases the model emits on trailing silence.
        r"(?i)thank you for watching[.!]?",
        r"(?i)thanks for watching[.!]?",
        r"(?i)please subscribe[.!]?",
        r"ご視聴ありがとうございました[。.!]?",
        r"チャンネル登録お願いします[。.!]?",
        r"最後までご覧いただきありがとうございます[。.!]?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid strip pattern"))
    .collect()
});

static FULL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Nothing but whitespace, punctuation or symbols left.
        r"^[\s\p{P}\p{S}]*$",
        // A bare closing phrase with nothing else around it.
        r"(?i)^\s*(thank you|bye|goodbye|お疲れ様でした|ありがとうございました)\s*[。.!]?\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid full pattern"))
    .collect()
});

/// Clean one piece of model output. Returns the empty string when the text
/// is entirely hallucination.
pub fn clean_transcript(text: &str) -> String {
    let mut cleaned = text.to_string();
    for pattern in STRIP_PATTERNS.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }

    let cleaned = normalize_whitespace(&cleaned);

    if FULL_PATTERNS.iter().any(|p| p.is_match(&cleaned)) {
        return String::new();
    }

    cleaned
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_music_marker_is_discarded() {
        assert_eq!(clean_transcript("(音楽)"), "");
    }

    #[test]
    fn leading_marker_is_stripped_keeping_speech() {
        assert_eq!(clean_transcript("(music) hello there"), "hello there");
    }

    #[test]
    fn fullwidth_brackets_are_stripped() {
        assert_eq!(clean_transcript("【拍手】今日の予定です"), "今日の予定です");
    }

    #[test]
    fn stock_closing_phrase_alone_is_discarded() {
        assert_eq!(clean_transcript("ご視聴ありがとうございました"), "");
        assert_eq!(clean_transcript("Thanks for watching!"), "");
    }

    #[test]
    fn stock_phrase_inside_speech_is_stripped() {
        assert_eq!(
            clean_transcript("meeting notes done. Thanks for watching!"),
            "meeting notes done."
        );
    }

    #[test]
    fn punctuation_only_residue_is_discarded() {
        assert_eq!(clean_transcript("(applause) ..."), "");
        assert_eq!(clean_transcript("  。。  "), "");
    }

    #[test]
    fn genuine_speech_is_untouched() {
        assert_eq!(
            clean_transcript("tomorrow review the sync engine"),
            "tomorrow review the sync engine"
        );
    }

    #[test]
    fn whitespace_is_normalized_after_stripping() {
        assert_eq!(clean_transcript("hello   (noise)   world"), "hello world");
    }
}
