use super::{table_reading, DivinationMethod, DivinationRequest, EscalationPolicy};
use crate::classifier::Emotion;
use crate::generative::GenerativeModel;
use crate::logging;
use crate::memory::{save_or_log, MemoryStore, UserMemory};
use crate::personality::{DEFLECTION, DIVINATION_SYSTEM_PROMPT};
use serde::{Deserialize, Serialize};

const DIVINATION_TEMPERATURE: f32 = 0.8;
const DIVINATION_MAX_TOKENS: u32 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivinationOutcome {
    pub text: String,
    pub is_generative: bool,
}

/// Table-first divination for one user, escalating to the generative model when the
/// table misses or the user's feedback history says the table is not good enough.
///
/// The user's record is loaded on construction and written back after each
/// [`handle`](Self::handle) or [`feedback`](Self::feedback).
pub struct DivinationController<'a> {
    user_id: String,
    memory: UserMemory,
    store: &'a dyn MemoryStore,
    model: Option<&'a dyn GenerativeModel>,
    policy: EscalationPolicy,
}

impl<'a> DivinationController<'a> {
    pub fn new(
        user_id: &str,
        store: &'a dyn MemoryStore,
        model: Option<&'a dyn GenerativeModel>,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            memory: store.load(user_id),
            store,
            model,
            policy,
        }
    }

    /// Whether the user's history alone forces the generative path for `method`
    pub fn is_escalated(&self, method: DivinationMethod) -> bool {
        let pref = &self.memory.divination;
        match self.policy {
            EscalationPolicy::SharedFlag => {
                pref.api_triggered && pref.preferred_method == Some(method)
            }
            EscalationPolicy::PerMethod => pref.escalated_methods.contains(&method),
        }
    }

    pub async fn handle(&mut self, request: &DivinationRequest) -> DivinationOutcome {
        let method = request.method;
        let rule_result = table_reading(method, &request.params);

        let mut need_api = false;
        if rule_result.is_none() {
            need_api = true;
            logging::log_divination(Some(&self.user_id), &format!(
                "No table entry for {} {:?}, escalating", method.as_str(), request.params
            ));
        }
        if self.is_escalated(method) {
            need_api = true;
            logging::log_divination(Some(&self.user_id), &format!(
                "Feedback history prefers generative {} readings", method.as_str()
            ));
        }

        self.memory.divination.last_method = Some(method);

        if need_api {
            if let Some(text) = self.generative_reading(request).await {
                let pref = &mut self.memory.divination;
                pref.api_triggered = true;
                pref.preferred_method = Some(method);
                if !pref.escalated_methods.contains(&method) {
                    pref.escalated_methods.push(method);
                }
                pref.count += 1;
                save_or_log(self.store, &self.memory);
                return DivinationOutcome { text, is_generative: true };
            }
        }

        self.memory.divination.count += 1;
        save_or_log(self.store, &self.memory);

        let text = rule_result
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| DEFLECTION.to_string());
        DivinationOutcome { text, is_generative: false }
    }

    async fn generative_reading(&self, request: &DivinationRequest) -> Option<String> {
        let model = self.model?;
        let prompt = divination_prompt(request);

        match model
            .complete(DIVINATION_SYSTEM_PROMPT, &prompt, DIVINATION_TEMPERATURE, DIVINATION_MAX_TOKENS)
            .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                logging::log_error(Some(&self.user_id), &format!(
                    "Generative divination failed, using table: {}", e
                ));
                None
            }
        }
    }

    /// Record the user's verdict on the last reading.
    ///
    /// The shared flag is about `preferred_method`; per-method escalation is about the
    /// method of the last reading.
    pub fn feedback(&mut self, accurate: bool) {
        let pref = &mut self.memory.divination;
        if pref.preferred_method.is_none() {
            pref.preferred_method = pref.last_method;
        }
        let target = match self.policy {
            EscalationPolicy::SharedFlag => pref.preferred_method,
            EscalationPolicy::PerMethod => pref.last_method.or(pref.preferred_method),
        };

        if accurate {
            pref.api_triggered = false;
            if let Some(method) = target {
                pref.escalated_methods.retain(|m| *m != method);
            }
            logging::log_divination(Some(&self.user_id), "Feedback: accurate, keeping table readings");
        } else {
            pref.api_triggered = true;
            if let Some(method) = target {
                if !pref.escalated_methods.contains(&method) {
                    pref.escalated_methods.push(method);
                }
            }
            logging::log_divination(Some(&self.user_id), "Feedback: not accurate, next reading goes generative");
        }

        save_or_log(self.store, &self.memory);
    }
}

fn divination_prompt(request: &DivinationRequest) -> String {
    let question = request
        .question
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or("no specific question");
    let params = request
        .params
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let emotion = request
        .emotion
        .as_deref()
        .and_then(Emotion::from_label)
        .unwrap_or(Emotion::Neutral);

    format!(
        "Method: {}\nUser question: {}\nUser numbers: [{}]\nCurrent mood: {}\n\n\
         Give a gentle, vivid reading in 1-3 sentences:",
        request.method.label(),
        question,
        params,
        emotion.as_str()
    )
}
