// Plum-blossom style hexagram casting from two numbers.

use super::DivinationParam;
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub struct Trigram {
    pub name: &'static str,
    pub nature: &'static str,
    pub meaning: &'static str,
}

pub const TRIGRAMS: [Trigram; 8] = [
    Trigram { name: "Qian", nature: "Heaven", meaning: "open like the sky" },
    Trigram { name: "Dui", nature: "Lake", meaning: "joy, like rippling lake water" },
    Trigram { name: "Li", nature: "Fire", meaning: "warmth that lights the way" },
    Trigram { name: "Zhen", nature: "Thunder", meaning: "an awakening, the prelude to change" },
    Trigram { name: "Xun", nature: "Wind", meaning: "slipping in with the wind, slowly seeping through" },
    Trigram { name: "Kan", nature: "Water", meaning: "flowing, sometimes the path bends" },
    Trigram { name: "Gen", nature: "Mountain", meaning: "stop and take in the view" },
    Trigram { name: "Kun", nature: "Earth", meaning: "carrying and accepting" },
];

/// Sparse (upper, lower) table; pairs not listed fall back to the trigram meanings
static HEXAGRAMS: Lazy<HashMap<(u8, u8), &'static str>> = Lazy::new(|| {
    HashMap::from([
        ((1, 1), "Qian as Heaven: open like the sky, no need to hurry"),
        ((2, 2), "Kun as Earth: carrying and accepting, the earth is always gentle"),
        ((3, 3), "Zhen as Thunder: a moment of awakening, change is happening"),
        ((4, 4), "Xun as Wind: move with the wind, go with the flow"),
        ((5, 5), "Kan as Water: flowing water always finds a way out"),
        ((6, 6), "Li as Fire: the warmth inside you is lighting something up"),
        ((7, 7), "Gen as Mountain: pause for a while and look at the scenery"),
        ((8, 8), "Dui as Lake: joy rippling quietly in the heart"),
        ((1, 2), "Earth over Heaven, Tai: a peaceful time, things go smoothly"),
        ((2, 1), "Heaven over Earth, Pi: a temporary standstill, it will pass"),
        ((5, 3), "Water over Thunder, Zhun: beginnings are hard, like bamboo shoots after rain"),
        ((3, 5), "Thunder over Water, Jie: what troubled you is coming undone"),
        ((6, 4), "Fire over Wind, Ding: renewal, a fresh start"),
        ((4, 6), "Wind over Fire, Jia Ren: warm and close relationships"),
        ((7, 8), "Mountain over Lake, Sun: sometimes you need to let a little go"),
        ((8, 7), "Lake over Mountain, Xian: the feeling of hearts in tune"),
    ])
});

/// Wrap any integer into 1..=8 as `((n - 1) mod 8) + 1`, without overflow at the extremes
pub fn normalize(n: i64) -> u8 {
    ((n.rem_euclid(8) + 7) % 8 + 1) as u8
}

pub fn trigram(id: u8) -> &'static Trigram {
    &TRIGRAMS[usize::from(id.clamp(1, 8) - 1)]
}

/// Always produces a reading: a listed hexagram, or the two trigram meanings joined
pub fn cast(upper: i64, lower: i64) -> String {
    let (u, l) = (normalize(upper), normalize(lower));
    let (upper, lower) = (trigram(u), trigram(l));
    let header = format!(
        "Upper trigram {} ({}), lower trigram {} ({}).",
        upper.name, upper.nature, lower.name, lower.nature
    );

    match HEXAGRAMS.get(&(u, l)) {
        Some(hexagram) => format!("{} {}", header, hexagram),
        None => format!("{} {}, {}.", header, capitalize(upper.meaning), lower.meaning),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn reading(params: &[DivinationParam]) -> Option<String> {
    match params {
        [a, b] => Some(cast(a.as_number()?, b.as_number()?)),
        _ => None,
    }
}
