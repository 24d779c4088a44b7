//! Local heuristic fallback validation
//!
//! Renders a password-risk verdict with zero network access, for use when
//! the breach corpus cannot be consulted (open breaker, negative-cache
//! hit, exhausted retries, cancellation). Deliberately conservative: it
//! prefers flagging weak-looking passwords over silently approving them.
//!
//! The numeric thresholds are an empirically tuned table, not derived
//! values. Treat `ScoringTable` as the one place to adjust them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Known-weak password fragments, leetspeak variants, brand names, and
/// date-looking patterns. Substring matches, case-insensitive.
static COMMON_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)p[a@4]ssw[o0]rd",
        r"(?i)qwerty",
        r"(?i)letme[i1]n",
        r"(?i)welcome",
        r"(?i)admin",
        r"(?i)abc123",
        r"(?i)12345",
        r"(?i)iloveyou",
        r"(?i)dragon|monkey|master|shadow|football|baseball|superman|batman",
        r"(?i)google|facebook|amazon|netflix|samsung",
        // Year fragments read as date-based passwords
        r"(19|20)\d{2}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid common pattern"))
    .collect()
});

/// Short dictionary of common words (all at least 4 characters) matched
/// as substrings, case-insensitive
const COMMON_WORDS: &[&str] = &[
    "love", "life", "hello", "secret", "summer", "winter", "spring", "sunshine", "princess",
    "flower", "happy", "money", "angel", "tiger", "soccer", "hockey", "pepper", "cookie", "banana",
    "orange", "purple", "silver", "house", "music", "computer", "internet", "freedom", "ninja",
];

/// Keyboard rows walked for adjacency runs; reverses are derived at match
/// time
const KEYBOARD_ROWS: &[&str] = &["qwertyuiop", "asdfghjkl", "zxcvbnm", "1234567890"];

const KEYBOARD_WINDOW: usize = 4;

/// Why the fallback verdict flagged a password, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    CommonPattern,
    VeryShort,
    CommonWord,
    KeyboardWalk,
    RepetitivePattern,
    LowEntropy,
    InsufficientCharSets,
    RequestCancelled,
}

impl FallbackReason {
    /// Stable snake_case name for log fields and UI payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommonPattern => "common_pattern",
            Self::VeryShort => "very_short",
            Self::CommonWord => "common_word",
            Self::KeyboardWalk => "keyboard_walk",
            Self::RepetitivePattern => "repetitive_pattern",
            Self::LowEntropy => "low_entropy",
            Self::InsufficientCharSets => "insufficient_char_sets",
            Self::RequestCancelled => "request_cancelled",
        }
    }
}

/// Verdict produced without consulting the breach corpus
#[derive(Debug, Clone, Serialize)]
pub struct FallbackVerdict {
    /// Heuristic equivalent of a corpus hit
    pub is_compromised: bool,

    /// Highest-priority condition that matched, if any
    pub reason: Option<FallbackReason>,

    /// Additive score; below `compromised_below` means compromised
    pub security_score: i32,

    /// Distinct characters divided by length
    pub entropy_ratio: f64,

    /// How many of {lowercase, uppercase, digit, symbol} are present
    pub charset_count: u32,
}

/// Empirically tuned scoring thresholds.
///
/// The values have no documented derivation; they are kept together here
/// so behavioral tuning never touches the matching logic.
#[derive(Debug, Clone)]
pub struct ScoringTable {
    pub length_bonus: &'static [(usize, i32)],
    pub charset_bonus: &'static [(u32, i32)],
    pub entropy_bonus_threshold: f64,
    pub entropy_bonus: i32,
    pub common_pattern_penalty: i32,
    pub very_short_penalty: i32,
    pub common_word_penalty: i32,
    pub keyboard_walk_penalty: i32,
    pub repetition_penalty: i32,
    pub low_entropy_penalty: i32,
    pub charset_penalty: i32,
    pub very_short_below: usize,
    pub low_entropy_below: f64,
    pub min_charsets: u32,
    pub compromised_below: i32,
}

impl Default for ScoringTable {
    fn default() -> Self {
        Self {
            length_bonus: &[(16, 3), (12, 2), (10, 1)],
            charset_bonus: &[(4, 2), (3, 1)],
            entropy_bonus_threshold: 0.6,
            entropy_bonus: 1,
            common_pattern_penalty: 3,
            very_short_penalty: 3,
            common_word_penalty: 2,
            keyboard_walk_penalty: 2,
            repetition_penalty: 2,
            low_entropy_penalty: 2,
            charset_penalty: 1,
            very_short_below: 8,
            low_entropy_below: 0.5,
            min_charsets: 3,
            compromised_below: 3,
        }
    }
}

/// Scored heuristic validator, independent of every network component
pub struct FallbackValidator {
    table: ScoringTable,
}

impl FallbackValidator {
    /// Create a validator with the default scoring table
    pub fn new() -> Self {
        Self {
            table: ScoringTable::default(),
        }
    }

    /// Create a validator with custom thresholds
    pub fn with_table(table: ScoringTable) -> Self {
        Self { table }
    }

    /// Evaluate a password locally.
    ///
    /// `is_compromised` when the score falls below the cutoff, or
    /// unconditionally for a common pattern or a very short password.
    pub fn evaluate(&self, password: &str) -> FallbackVerdict {
        let t = &self.table;
        let chars: Vec<char> = password.chars().collect();
        let length = chars.len();

        let entropy_ratio = entropy_ratio(&chars);
        let charset_count = charset_count(&chars);

        let common_pattern = has_common_pattern(password);
        let very_short = length < t.very_short_below;
        let common_word = contains_common_word(password);
        let keyboard_walk = has_keyboard_walk(password);
        let repetitive = has_repetitive_pattern(&chars);
        let low_entropy = entropy_ratio < t.low_entropy_below;
        let few_charsets = charset_count < t.min_charsets;

        let mut score = 0;
        for &(min_length, bonus) in t.length_bonus {
            if length >= min_length {
                score += bonus;
                break;
            }
        }
        for &(min_sets, bonus) in t.charset_bonus {
            if charset_count >= min_sets {
                score += bonus;
                break;
            }
        }
        if entropy_ratio >= t.entropy_bonus_threshold {
            score += t.entropy_bonus;
        }

        if common_pattern {
            score -= t.common_pattern_penalty;
        }
        if very_short {
            score -= t.very_short_penalty;
        }
        if common_word {
            score -= t.common_word_penalty;
        }
        if keyboard_walk {
            score -= t.keyboard_walk_penalty;
        }
        if repetitive {
            score -= t.repetition_penalty;
        }
        if low_entropy {
            score -= t.low_entropy_penalty;
        }
        if few_charsets {
            score -= t.charset_penalty;
        }

        // First matching condition in priority order names the verdict.
        let reason = [
            (common_pattern, FallbackReason::CommonPattern),
            (very_short, FallbackReason::VeryShort),
            (common_word, FallbackReason::CommonWord),
            (keyboard_walk, FallbackReason::KeyboardWalk),
            (repetitive, FallbackReason::RepetitivePattern),
            (low_entropy, FallbackReason::LowEntropy),
            (few_charsets, FallbackReason::InsufficientCharSets),
        ]
        .iter()
        .find(|(matched, _)| *matched)
        .map(|(_, reason)| *reason);

        FallbackVerdict {
            is_compromised: score < t.compromised_below || common_pattern || very_short,
            reason,
            security_score: score,
            entropy_ratio,
            charset_count,
        }
    }
}

impl Default for FallbackValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn has_common_pattern(password: &str) -> bool {
    COMMON_PATTERNS.iter().any(|re| re.is_match(password))
}

fn contains_common_word(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_WORDS.iter().any(|word| lowered.contains(word))
}

/// Check every 4-character window against keyboard-row runs, forward and
/// reversed
fn has_keyboard_walk(password: &str) -> bool {
    let lowered: Vec<char> = password.to_lowercase().chars().collect();
    if lowered.len() < KEYBOARD_WINDOW {
        return false;
    }

    lowered.windows(KEYBOARD_WINDOW).any(|window| {
        let gram: String = window.iter().collect();
        let reversed: String = window.iter().rev().collect();
        KEYBOARD_ROWS
            .iter()
            .any(|row| row.contains(&gram) || row.contains(&reversed))
    })
}

/// Check whether the whole string is one short unit repeated.
///
/// The regex crate has no backreferences, so this scans unit lengths up
/// to half the string instead of using `^(.+?)\1+$`.
fn has_repetitive_pattern(chars: &[char]) -> bool {
    let length = chars.len();
    for unit_len in 1..=length / 2 {
        if length % unit_len != 0 {
            continue;
        }
        let unit = &chars[..unit_len];
        if chars.chunks(unit_len).all(|chunk| chunk == unit) {
            return true;
        }
    }
    false
}

fn entropy_ratio(chars: &[char]) -> f64 {
    if chars.is_empty() {
        return 0.0;
    }
    let mut distinct: Vec<char> = chars.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    distinct.len() as f64 / chars.len() as f64
}

fn charset_count(chars: &[char]) -> u32 {
    let mut lower = false;
    let mut upper = false;
    let mut digit = false;
    let mut symbol = false;
    for &c in chars {
        if c.is_lowercase() {
            lower = true;
        } else if c.is_uppercase() {
            upper = true;
        } else if c.is_ascii_digit() {
            digit = true;
        } else {
            symbol = true;
        }
    }
    [lower, upper, digit, symbol].iter().filter(|&&b| b).count() as u32
}
