//! Response generation: prompt, call, retry, classify.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::client::{Completion, LanguageModel, SafetySettings};
use crate::error::LlmError;
use crate::prompt::{build_prompt, GenerationRequest};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};

pub const RATE_LIMIT_APOLOGY: &str =
    "I'm currently overwhelmed with requests. Please wait a moment and try again.";
pub const EMPTY_COMPLETION_MESSAGE: &str =
    "I couldn't generate a response. The content might be flagged or empty.";

/// How a generation call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// The model produced usable text.
    Complete,
    /// The call succeeded but nothing usable came back.
    Blocked,
    /// Every attempt was rate limited.
    RateLimited,
}

/// Text to present plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub status: GenerationStatus,
    /// Model calls made, including the successful one.
    pub attempts: u32,
}

impl Generation {
    pub fn is_complete(&self) -> bool {
        self.status == GenerationStatus::Complete
    }
}

/// Builds intent-specific prompts and runs them against a language model.
///
/// Rate-limited calls are retried under [`RetryPolicy`] and downgrade to a
/// fixed apology when attempts run out. Any other failure is returned at
/// once; use [`LlmError::user_message`] to present it.
pub struct ResponseGenerator {
    model: Arc<dyn LanguageModel>,
    sleeper: Arc<dyn Sleeper>,
    retry: RetryPolicy,
    safety: SafetySettings,
}

impl ResponseGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            sleeper: Arc::new(ThreadSleeper),
            retry: RetryPolicy::default(),
            safety: SafetySettings::relaxed(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_safety(mut self, safety: SafetySettings) -> Self {
        self.safety = safety;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Generate a response for `request`.
    pub fn generate(&self, request: &GenerationRequest) -> Result<Generation, LlmError> {
        let prompt = build_prompt(request);
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.model.complete(&prompt, &self.safety) {
                Ok(Completion::Text(text)) if !text.trim().is_empty() => {
                    info!(
                        model = self.model.name(),
                        intent = %request.intent,
                        attempts,
                        "Response generated"
                    );
                    return Ok(Generation {
                        text: text.trim().to_string(),
                        status: GenerationStatus::Complete,
                        attempts,
                    });
                }
                Ok(Completion::Text(_)) => {
                    warn!(intent = %request.intent, "Model returned blank text");
                    return Ok(Self::blocked(attempts));
                }
                Ok(Completion::Empty { finish_reason }) => {
                    warn!(
                        intent = %request.intent,
                        finish_reason = finish_reason.as_deref().unwrap_or("unknown"),
                        "Model returned no candidates"
                    );
                    return Ok(Self::blocked(attempts));
                }
                Err(e) if e.is_rate_limited() => {
                    if !self.retry.should_retry(attempts) {
                        error!(attempts, "Rate limit persisted after retries");
                        return Ok(Generation {
                            text: RATE_LIMIT_APOLOGY.to_string(),
                            status: GenerationStatus::RateLimited,
                            attempts,
                        });
                    }
                    // The service's Retry-After is a floor, never a cap.
                    let backoff = self.retry.delay_for(attempts - 1);
                    let delay = e.retry_after().map_or(backoff, |hint| hint.max(backoff));
                    warn!(
                        attempt = attempts,
                        max_attempts = self.retry.max_attempts,
                        delay_secs = delay.as_secs_f64(),
                        "Rate limited; backing off"
                    );
                    self.sleeper.sleep(delay);
                }
                Err(e) => {
                    error!(intent = %request.intent, error = %e, "Generation failed");
                    return Err(e);
                }
            }
        }
    }

    fn blocked(attempts: u32) -> Generation {
        Generation {
            text: EMPTY_COMPLETION_MESSAGE.to_string(),
            status: GenerationStatus::Blocked,
            attempts,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    /// Replays a fixed script of results and records every prompt.
    pub struct ScriptedModel {
        script: Mutex<VecDeque<Result<Completion, LlmError>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn new(script: Vec<Result<Completion, LlmError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl LanguageModel for ScriptedModel {
        fn complete(&self, prompt: &str, _safety: &SafetySettings) -> Result<Completion, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Transport("script exhausted".into())))
        }
    }

    #[derive(Default)]
    pub struct RecordingSleeper {
        pub waits: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn total(&self) -> Duration {
            self.waits.lock().unwrap().iter().sum()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    pub fn rate_limited() -> Result<Completion, LlmError> {
        Err(LlmError::RateLimited {
            message: "RESOURCE_EXHAUSTED".into(),
            retry_after: None,
        })
    }

    pub fn text(t: &str) -> Result<Completion, LlmError> {
        Ok(Completion::Text(t.to_string()))
    }
}
