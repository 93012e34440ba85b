//! Keyword and pattern classification of a single inbound message.
//!
//! Everything here is pure: the same message (and name-on-record flag) always
//! classifies the same way.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Low mood only counts for short messages, measured in characters
pub const SHORT_MESSAGE_THRESHOLD: usize = 20;

const HAPPY_KEYWORDS: [&str; 16] = [
    "happy", "glad", "great", "good", "nice", "joy", "warm", "wonderful",
    "开心", "喜欢", "快乐", "高兴", "不错", "好", "幸福", "温暖",
];

const LOW_KEYWORDS: [&str; 16] = [
    "sigh", "tired", "annoyed", "sad", "exhausted", "hmm", "...", "upset",
    "嗯", "唉", "累", "烦", "难过", "伤心", "疲惫", "…",
];

const CLOSENESS_KEYWORDS: [&str; 10] = [
    "miss you", "missed you", "love you", "adore you",
    "想你", "爱你", "喜欢你", "我爱你", "想你啦", "想你了",
];

const DIVINATION_KEYWORDS: [&str; 19] = [
    "divination", "tell my fortune", "fortune", "tarot", "hexagram", "i ching", "read my cards",
    "占卜", "塔罗", "梅花易数", "算卦", "占卦", "卜卦", "轻占卜", "算一算", "占一卦",
    "会占卜吗", "会塔罗吗", "起卦",
];

// Checked before the positive list so "not accurate" never reads as praise
const NEGATIVE_FEEDBACK: [&str; 6] = [
    "not accurate", "inaccurate", "wasn't accurate", "way off", "不准", "不准确",
];

const POSITIVE_FEEDBACK: [&str; 5] = ["accurate", "spot on", "so true", "准", "说中了"];

static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bmy name is\s+([\p{L}\p{N}_'-]+)",
        r"(?i)\bi['’]m called\s+([\p{L}\p{N}_'-]+)",
        r"(?i)\bi am called\s+([\p{L}\p{N}_'-]+)",
        r"(?i)\bcall me\s+([\p{L}\p{N}_'-]+)",
        r"我叫(\w+)",
        r"可以叫我(\w+)",
        r"喊我(\w+)",
        r"名字是(\w+)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Neutral,
    Low,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
            Emotion::Low => "low",
        }
    }

    pub fn from_label(label: &str) -> Option<Emotion> {
        match label.trim().to_lowercase().as_str() {
            "happy" | "开心" => Some(Emotion::Happy),
            "neutral" | "steady" | "平稳" => Some(Emotion::Neutral),
            "low" | "sad" | "低落" => Some(Emotion::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Accurate,
    NotAccurate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedMessage {
    pub emotion: Emotion,
    pub close_mode: bool,
    pub divination_menu_triggered: bool,
    pub extracted_name: Option<String>,
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

pub fn classify(message: &str, has_name: bool) -> ClassifiedMessage {
    let lower = message.to_lowercase();
    ClassifiedMessage {
        emotion: detect_emotion(&lower),
        close_mode: contains_any(&lower, &CLOSENESS_KEYWORDS),
        divination_menu_triggered: contains_any(&lower, &DIVINATION_KEYWORDS),
        extracted_name: if has_name { None } else { extract_name(message) },
    }
}

pub fn detect_emotion(message: &str) -> Emotion {
    let lower = message.to_lowercase();
    if contains_any(&lower, &HAPPY_KEYWORDS) {
        Emotion::Happy
    } else if contains_any(&lower, &LOW_KEYWORDS)
        && lower.chars().count() < SHORT_MESSAGE_THRESHOLD
    {
        Emotion::Low
    } else {
        Emotion::Neutral
    }
}

/// First matching introduction pattern wins
pub fn extract_name(message: &str) -> Option<String> {
    NAME_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim_matches(|c| c == '\'' || c == '-').to_string())
            .filter(|name| !name.is_empty())
    })
}

pub fn detect_feedback(message: &str) -> Option<Feedback> {
    let lower = message.to_lowercase();
    if contains_any(&lower, &NEGATIVE_FEEDBACK) {
        Some(Feedback::NotAccurate)
    } else if contains_any(&lower, &POSITIVE_FEEDBACK) {
        Some(Feedback::Accurate)
    } else {
        None
    }
}
