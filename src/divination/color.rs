// Color + number projection game.

use super::DivinationParam;
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const COLOR_MEANINGS: [(&str, &str); 10] = [
    ("red", "passion, drive"),
    ("blue", "calm, reflection"),
    ("yellow", "brightness, hope"),
    ("green", "growth, healing"),
    ("purple", "intuition, inspiration"),
    ("pink", "tenderness, affection"),
    ("black", "the unknown, depth"),
    ("white", "purity, fresh starts"),
    ("orange", "vitality, creativity"),
    ("brown", "groundedness, stability"),
];

pub const NUMBER_MEANINGS: [&str; 10] = [
    "beginnings",
    "balance",
    "creation",
    "stability",
    "change",
    "care",
    "exploration",
    "strength",
    "completion",
    "fulfillment",
];

/// Synonym -> canonical color
static COLOR_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut aliases = HashMap::new();
    for (color, _) in COLOR_MEANINGS {
        aliases.insert(color, color);
    }
    let synonyms: [(&str, &[&str]); 10] = [
        ("red", &["crimson", "scarlet", "红", "红色"]),
        ("blue", &["navy", "azure", "蓝", "蓝色"]),
        ("yellow", &["gold", "golden", "黄", "黄色"]),
        ("green", &["emerald", "绿", "绿色"]),
        ("purple", &["violet", "lavender", "紫", "紫色"]),
        ("pink", &["rose", "粉", "粉色", "粉红"]),
        ("black", &["黑", "黑色"]),
        ("white", &["ivory", "白", "白色"]),
        ("orange", &["amber", "橙", "橙色"]),
        ("brown", &["tan", "棕", "棕色", "咖啡色"]),
    ];
    for (color, words) in synonyms {
        for word in words {
            aliases.insert(*word, color);
        }
    }
    aliases
});

/// Fold a color token onto its canonical name
pub fn canonical_color(token: &str) -> Option<&'static str> {
    let lower = token.trim().to_lowercase();
    let folded = lower
        .strip_suffix(" colour")
        .or_else(|| lower.strip_suffix(" color"))
        .unwrap_or(&lower)
        .trim();
    COLOR_ALIASES.get(folded).copied()
}

pub fn color_meaning(color: &str) -> Option<&'static str> {
    COLOR_MEANINGS
        .iter()
        .find(|(name, _)| *name == color)
        .map(|(_, meaning)| *meaning)
}

pub fn number_meaning(n: i64) -> Option<&'static str> {
    if !(1..=10).contains(&n) {
        return None;
    }
    NUMBER_MEANINGS.get((n - 1) as usize).copied()
}

pub fn interpret(color_token: &str, number: i64) -> Option<String> {
    let color = canonical_color(color_token)?;
    let color_meaning = color_meaning(color)?;
    let number_meaning = number_meaning(number)?;
    let main_trait = color_meaning.split(", ").next().unwrap_or(color_meaning);

    Some(format!(
        "{} is the color of {}, and {} is the number of {}. \
         Perhaps you are in a stage of \"{} within {}\".",
        capitalized(color),
        color_meaning,
        number,
        number_meaning,
        main_trait,
        number_meaning
    ))
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn reading(params: &[DivinationParam]) -> Option<String> {
    match params {
        [DivinationParam::Text(color), number] => interpret(color, number.as_number()?),
        _ => None,
    }
}
