//! Divination mini-games
//!
//! Three pure table engines ([`tarot`], [`iching`], [`color`]) and the stateful
//! [`DivinationController`] that decides when a table reading is not enough and the
//! generative model should take over.

pub mod color;
pub mod controller;
pub mod iching;
pub mod tarot;

pub use controller::{DivinationController, DivinationOutcome};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivinationMethod {
    Tarot,
    Hexagram,
    ColorNumber,
}

/// Accepted spellings per method, longest first so prefix matching prefers the specific form
const METHOD_ALIASES: [(&str, DivinationMethod); 16] = [
    ("color_number", DivinationMethod::ColorNumber),
    ("color-number", DivinationMethod::ColorNumber),
    ("plum blossom", DivinationMethod::Hexagram),
    ("hexagram", DivinationMethod::Hexagram),
    ("i ching", DivinationMethod::Hexagram),
    ("iching", DivinationMethod::Hexagram),
    ("colour", DivinationMethod::ColorNumber),
    ("tarot", DivinationMethod::Tarot),
    ("color", DivinationMethod::ColorNumber),
    ("梅花易数", DivinationMethod::Hexagram),
    ("轻占卜", DivinationMethod::ColorNumber),
    ("塔罗牌", DivinationMethod::Tarot),
    ("易经", DivinationMethod::Hexagram),
    ("塔罗", DivinationMethod::Tarot),
    ("起卦", DivinationMethod::Hexagram),
    ("卜卦", DivinationMethod::Hexagram),
];

impl DivinationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DivinationMethod::Tarot => "tarot",
            DivinationMethod::Hexagram => "hexagram",
            DivinationMethod::ColorNumber => "color_number",
        }
    }

    /// Human-facing label used in prompts
    pub fn label(&self) -> &'static str {
        match self {
            DivinationMethod::Tarot => "Tarot",
            DivinationMethod::Hexagram => "Plum-blossom hexagram",
            DivinationMethod::ColorNumber => "Color reading",
        }
    }

    pub fn from_str(s: &str) -> Option<DivinationMethod> {
        let lower = s.trim().to_lowercase();
        METHOD_ALIASES
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map(|(_, method)| *method)
    }
}

/// One divination parameter: a number or a token such as a color
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DivinationParam {
    Number(i64),
    Text(String),
}

impl DivinationParam {
    /// Numeric value, accepting numeric strings such as `"7"`
    pub fn as_number(&self) -> Option<i64> {
        match self {
            DivinationParam::Number(n) => Some(*n),
            DivinationParam::Text(s) => s.trim().parse().ok(),
        }
    }

    fn from_token(token: &str) -> DivinationParam {
        match token.parse::<i64>() {
            Ok(n) => DivinationParam::Number(n),
            Err(_) => DivinationParam::Text(token.to_string()),
        }
    }
}

impl std::fmt::Display for DivinationParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DivinationParam::Number(n) => write!(f, "{}", n),
            DivinationParam::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivinationRequest {
    pub method: DivinationMethod,
    pub params: Vec<DivinationParam>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub emotion: Option<String>,
}

/// How negative feedback turns into future escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscalationPolicy {
    /// One sticky `api_triggered` flag per user, matched against `preferred_method`.
    /// Positive feedback clears it whatever method it was about.
    #[default]
    SharedFlag,
    /// Each method escalates independently via `escalated_methods`.
    PerMethod,
}

impl EscalationPolicy {
    pub fn from_str(s: &str) -> Option<EscalationPolicy> {
        match s.trim().to_lowercase().as_str() {
            "shared" | "shared_flag" => Some(EscalationPolicy::SharedFlag),
            "per_method" | "per-method" => Some(EscalationPolicy::PerMethod),
            _ => None,
        }
    }
}

/// Run the table engine for a method. `None` means the table has no entry.
pub fn table_reading(method: DivinationMethod, params: &[DivinationParam]) -> Option<String> {
    match method {
        DivinationMethod::Tarot => tarot::reading(params),
        DivinationMethod::Hexagram => iching::reading(params),
        DivinationMethod::ColorNumber => color::reading(params),
    }
}

/// Parse an inline chat invocation such as `tarot 3,7,18` or `color blue 7`.
/// A bare method name without parameters is not an invocation.
pub fn parse_invocation(message: &str) -> Option<DivinationRequest> {
    let lower = message.trim().to_lowercase();
    let (method, rest) = METHOD_ALIASES
        .iter()
        .find_map(|(alias, method)| lower.strip_prefix(alias).map(|rest| (*method, rest)))?;

    // "tarotsomething" is not an invocation, but "塔罗3 7 18" is
    if rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }

    let params: Vec<DivinationParam> = rest
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '，' | '、' | ':' | '：'))
        .filter(|token| !token.is_empty())
        .map(DivinationParam::from_token)
        .collect();

    let numbers = params.iter().filter(|p| p.as_number().is_some()).count();
    if numbers == 0 || params.len() - numbers > 1 || params.len() > 3 {
        return None;
    }

    Some(DivinationRequest {
        method,
        params,
        question: None,
        emotion: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use DivinationParam::{Number, Text};

    #[test]
    fn test_method_aliases() {
        assert_eq!(DivinationMethod::from_str("Tarot"), Some(DivinationMethod::Tarot));
        assert_eq!(DivinationMethod::from_str("梅花易数"), Some(DivinationMethod::Hexagram));
        assert_eq!(DivinationMethod::from_str(" i ching "), Some(DivinationMethod::Hexagram));
        assert_eq!(DivinationMethod::from_str("color_number"), Some(DivinationMethod::ColorNumber));
        assert_eq!(DivinationMethod::from_str("palmistry"), None);
    }

    #[test]
    fn test_aliases_are_ordered_longest_first() {
        let lengths: Vec<usize> = METHOD_ALIASES.iter().map(|(a, _)| a.chars().count()).collect();
        let mut sorted = lengths.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(lengths, sorted);
    }

    #[test]
    fn test_params_deserialize_untagged() {
        let params: Vec<DivinationParam> = serde_json::from_str(r#"["blue", 7, "3"]"#).unwrap();
        assert_eq!(params, vec![Text("blue".into()), Number(7), Text("3".into())]);
        assert_eq!(params[2].as_number(), Some(3));
    }

    #[test]
    fn test_method_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&DivinationMethod::ColorNumber).unwrap(), "\"color_number\"");
    }

    #[test]
    fn test_table_reading_dispatch() {
        assert!(table_reading(DivinationMethod::Tarot, &[Number(5)]).is_some());
        assert!(table_reading(DivinationMethod::Hexagram, &[Number(5), Number(3)]).is_some());
        assert!(table_reading(DivinationMethod::ColorNumber, &[Text("red".into()), Number(1)]).is_some());
        assert!(table_reading(DivinationMethod::Tarot, &[Text("red".into())]).is_none());
    }

    #[test]
    fn test_parse_invocation_forms() {
        let req = parse_invocation("tarot 3,7,18").unwrap();
        assert_eq!(req.method, DivinationMethod::Tarot);
        assert_eq!(req.params, vec![Number(3), Number(7), Number(18)]);

        let req = parse_invocation("Hexagram: 1 2").unwrap();
        assert_eq!(req.method, DivinationMethod::Hexagram);
        assert_eq!(req.params, vec![Number(1), Number(2)]);

        let req = parse_invocation("color blue 7").unwrap();
        assert_eq!(req.method, DivinationMethod::ColorNumber);
        assert_eq!(req.params, vec![Text("blue".into()), Number(7)]);

        let req = parse_invocation("塔罗 3，7，18").unwrap();
        assert_eq!(req.params.len(), 3);
    }

    #[test]
    fn test_parse_invocation_rejects_plain_mentions() {
        assert!(parse_invocation("tarot").is_none());
        assert!(parse_invocation("tarot cards are pretty").is_none());
        assert!(parse_invocation("tarotish 3").is_none());
        assert!(parse_invocation("can you do tarot 3 7 18").is_none());
        assert!(parse_invocation("color me happy, 5 times over").is_none());
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(EscalationPolicy::from_str("shared"), Some(EscalationPolicy::SharedFlag));
        assert_eq!(EscalationPolicy::from_str("PER_METHOD"), Some(EscalationPolicy::PerMethod));
        assert_eq!(EscalationPolicy::from_str("whatever"), None);
    }
}
