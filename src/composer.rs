//! Reply composition for one chat turn.
//!
//! Flow: load memory, resolve the local clock, classify the message, then either
//! answer with the divination menu, ask the generative model, or fall back to
//! scripted phrasing. Memory is written exactly once, after the reply is final.

use crate::classifier::{self, ClassifiedMessage, Emotion};
use crate::generative::SharedModel;
use crate::logging;
use crate::memory::{save_or_log, MemoryStore, UserMemory};
use crate::personality::{
    name_acknowledgement, ALONE_PHRASES, CLOSENESS_MARKER, CLOSE_MODE_REPLIES, DIVINATION_MENU,
    HAPPY_REPLIES, LOW_REPLIES, NEUTRAL_REPLIES, NUA_PERSONALITY,
};
use crate::session::Turn;
use crate::temporal::{self, LocaleHints, TimeContext};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Mutex;

/// Turns of recent conversation included in the generative prompt
pub const PROMPT_HISTORY: usize = 6;

const CHAT_MAX_TOKENS: u32 = 200;
const CLOSE_TEMPERATURE: f32 = 0.8;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const FILLER_PROBABILITY: f64 = 0.3;
const MAX_FALLBACK_PARTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyPath {
    Menu,
    Generative,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedReply {
    pub text: String,
    pub path: ReplyPath,
}

/// Everything the composer needs to know about one inbound message
pub struct ChatTurn<'a> {
    pub user_id: &'a str,
    pub message: &'a str,
    pub locale: LocaleHints<'a>,
    /// Prior turns, oldest first, not including `message`
    pub history: &'a [Turn],
    pub now: DateTime<Utc>,
}

pub struct Composer {
    model: Option<SharedModel>,
    rng: Mutex<StdRng>,
    default_offset: f64,
}

impl Composer {
    pub fn new(model: Option<SharedModel>, rng_seed: Option<u64>, default_offset: f64) -> Self {
        let rng = match rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            model,
            rng: Mutex::new(rng),
            default_offset,
        }
    }

    pub fn model(&self) -> Option<&SharedModel> {
        self.model.as_ref()
    }

    pub async fn compose(&self, store: &dyn MemoryStore, turn: ChatTurn<'_>) -> ComposedReply {
        let mut memory = store.load(turn.user_id);
        memory.update_locale(turn.locale.timezone, turn.locale.utc_offset);

        let time = temporal::resolve(turn.locale, turn.now, self.default_offset);
        let classified = classifier::classify(turn.message, memory.name.is_some());

        if classified.divination_menu_triggered {
            logging::log_routing(Some(turn.user_id), "Divination intent, sending menu");
            save_or_log(store, &memory);
            return ComposedReply {
                text: format!("{} {}", time.tag, DIVINATION_MENU),
                path: ReplyPath::Menu,
            };
        }

        if classified.close_mode {
            memory.close_mode_count += 1;
        }
        if let Some(name) = classified.extracted_name.as_deref() {
            if memory.remember_name(name) {
                logging::log_memory(Some(turn.user_id), &format!("Learned name: {}", name));
            }
        }

        if let Some(text) = self.generative_reply(&memory, &classified, &time, &turn).await {
            // last_seen stays untouched so the daily greeting still fires on a later fallback
            save_or_log(store, &memory);
            return ComposedReply { text, path: ReplyPath::Generative };
        }

        let text = self.fallback_reply(&mut memory, &classified, &time);
        save_or_log(store, &memory);
        ComposedReply { text, path: ReplyPath::Fallback }
    }

    async fn generative_reply(
        &self,
        memory: &UserMemory,
        classified: &ClassifiedMessage,
        time: &TimeContext,
        turn: &ChatTurn<'_>,
    ) -> Option<String> {
        let model = self.model.as_ref()?;
        let system_prompt = format!(
            "{}\n\n{}",
            NUA_PERSONALITY,
            context_block(memory, classified, time, turn.history)
        );
        let temperature = if classified.close_mode { CLOSE_TEMPERATURE } else { DEFAULT_TEMPERATURE };

        match model.complete(&system_prompt, turn.message, temperature, CHAT_MAX_TOKENS).await {
            Ok(reply) => {
                logging::log_routing(Some(turn.user_id), &format!("Generative reply via {}", model.name()));
                if classified.close_mode && !reply.starts_with(CLOSENESS_MARKER) {
                    Some(format!("{} {}", CLOSENESS_MARKER, reply))
                } else {
                    Some(reply)
                }
            }
            Err(e) => {
                logging::log_error(Some(turn.user_id), &format!("Generative reply failed, falling back: {}", e));
                None
            }
        }
    }

    fn fallback_reply(
        &self,
        memory: &mut UserMemory,
        classified: &ClassifiedMessage,
        time: &TimeContext,
    ) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let mut parts: Vec<String> = Vec::new();

        if memory.is_first_visit_on(time.date) {
            parts.push(match memory.name.as_deref() {
                Some(name) => format!("{} {}, {}.", time.tag, time.phrase, name),
                None => format!("{} {}.", time.tag, time.phrase),
            });
            memory.last_seen = Some(time.date);
        }

        if classified.close_mode {
            parts.push(pick(&mut *rng, &CLOSE_MODE_REPLIES));
        } else {
            let replies: &[&str] = match classified.emotion {
                Emotion::Happy => &HAPPY_REPLIES,
                Emotion::Neutral => &NEUTRAL_REPLIES,
                Emotion::Low => &LOW_REPLIES,
            };
            parts.push(pick(&mut *rng, replies));
            if rng.random_bool(FILLER_PROBABILITY) {
                parts.push(pick(&mut *rng, &ALONE_PHRASES));
            }
        }

        if let Some(name) = memory.name.as_deref().filter(|_| !memory.name_confirmed) {
            parts.insert(0, name_acknowledgement(name));
            memory.name_confirmed = true;
        }

        parts.truncate(MAX_FALLBACK_PARTS);
        parts.join(" ")
    }
}

fn pick(rng: &mut StdRng, phrases: &[&str]) -> String {
    phrases.choose(rng).copied().unwrap_or_default().to_string()
}

/// Per-turn state appended to the persona prompt
fn context_block(
    memory: &UserMemory,
    classified: &ClassifiedMessage,
    time: &TimeContext,
    history: &[Turn],
) -> String {
    let mut lines = vec![
        "## CURRENT STATE".to_string(),
        format!("- User's name: {}", memory.name.as_deref().unwrap_or("not recorded")),
        format!("- User's mood: {}", classified.emotion.as_str()),
        format!("- Local time: {} ({})", time.clock(), time.band.as_str()),
        format!(
            "- Closeness mode: {}",
            if classified.close_mode { "yes, speak more softly" } else { "no" }
        ),
    ];
    if let Some(method) = memory.divination.preferred_method {
        lines.push(format!("- Favorite divination: {}", method.label()));
    }
    if memory.close_mode_count > 0 {
        lines.push(format!("- Affectionate moments so far: {}", memory.close_mode_count));
    }

    let start = history.len().saturating_sub(PROMPT_HISTORY);
    if start < history.len() {
        lines.push(String::new());
        lines.push("## RECENT CONVERSATION".to_string());
        for turn in &history[start..] {
            lines.push(format!("{}: {}", turn.role.as_str(), turn.content));
        }
    }

    lines.push(String::new());
    lines.push("Reply in 1-3 short sentences.".to_string());
    lines.join("\n")
}
