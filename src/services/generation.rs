use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::services::error::PredictionError;

/// A single attempt against one model identifier. The HTTP client implements
/// this; tests substitute stubs to exercise the fallback chain.
#[async_trait]
pub(crate) trait ModelInvoker: Send + Sync {
    async fn invoke(&self, model: &str, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub(crate) struct GenerationOutcome {
    pub(crate) text: String,
    pub(crate) model: String,
}

#[derive(Debug, Clone)]
pub(crate) struct GenerationClient {
    client: Client,
    api_key: String,
    base_url: String,
    time_budget: Duration,
}

impl GenerationClient {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.gemini().request_timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(timeout)
            .build()
            .context("Failed to build Gemini HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.gemini().api_key.clone(),
            base_url: settings.gemini().base_url.trim_end_matches('/').to_string(),
            time_budget: Duration::from_secs(settings.gemini().time_budget_seconds),
        })
    }

    pub(crate) async fn generate(
        &self,
        prompt: &str,
        models: &[String],
    ) -> Result<GenerationOutcome, PredictionError> {
        generate_with(self, prompt, models, self.time_budget).await
    }
}

#[async_trait]
impl ModelInvoker for GenerationClient {
    async fn invoke(&self, model: &str, prompt: &str) -> Result<String> {
        let url =
            format!("{}/models/{}:generateContent?key={}", self.base_url, model, self.api_key);
        let payload = json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        let response =
            self.client.post(&url).json(&payload).send().await.context("Failed to call Gemini API")?;

        let status = response.status();
        let body: Value = response.json().await.context("Failed to read Gemini response body")?;

        if !status.is_success() {
            anyhow::bail!("Gemini API error (status {status}): {body}");
        }

        body.get("candidates")
            .and_then(|candidates| candidates.get(0))
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.get(0))
            .and_then(|part| part.get("text"))
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .context("Gemini response missing candidate text")
    }
}

/// Ordered fallback across candidate models: each is tried once, per-model
/// failures are logged and the next candidate attempted, the first success
/// wins. `budget` bounds the whole sequence; once exhausted the operation
/// fails with `Timeout` instead of trying further candidates. Deliberately no
/// backoff and no circuit breaking.
pub(crate) async fn generate_with(
    invoker: &(impl ModelInvoker + ?Sized),
    prompt: &str,
    models: &[String],
    budget: Duration,
) -> Result<GenerationOutcome, PredictionError> {
    let started = Instant::now();
    let mut last_error: Option<anyhow::Error> = None;

    for model in models {
        let elapsed = started.elapsed();
        let Some(remaining) = budget.checked_sub(elapsed) else {
            return Err(PredictionError::Timeout { elapsed_seconds: elapsed.as_secs_f64() });
        };

        match tokio::time::timeout(remaining, invoker.invoke(model, prompt)).await {
            Ok(Ok(text)) => {
                metrics::counter!(
                    "generation_attempts_total",
                    "model" => model.clone(),
                    "outcome" => "ok"
                )
                .increment(1);
                tracing::info!(
                    model = %model,
                    elapsed_seconds = started.elapsed().as_secs_f64(),
                    "Generation succeeded"
                );
                return Ok(GenerationOutcome { text, model: model.clone() });
            }
            Ok(Err(err)) => {
                metrics::counter!(
                    "generation_attempts_total",
                    "model" => model.clone(),
                    "outcome" => "error"
                )
                .increment(1);
                tracing::warn!(
                    model = %model,
                    error = %format!("{err:#}"),
                    "Model candidate failed; trying next"
                );
                last_error = Some(err);
            }
            Err(_) => {
                let elapsed = started.elapsed();
                metrics::counter!(
                    "generation_attempts_total",
                    "model" => model.clone(),
                    "outcome" => "timeout"
                )
                .increment(1);
                return Err(PredictionError::Timeout { elapsed_seconds: elapsed.as_secs_f64() });
            }
        }
    }

    let last_error = last_error
        .map(|err| format!("{err:#}"))
        .unwrap_or_else(|| "no candidate models configured".to_string());
    Err(PredictionError::AllModelsExhausted { last_error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct StubInvoker {
        calls: Mutex<Vec<String>>,
        failing: Vec<&'static str>,
        delay: Duration,
    }

    impl StubInvoker {
        fn failing(models: Vec<&'static str>) -> Self {
            Self { calls: Mutex::new(Vec::new()), failing: models, delay: Duration::ZERO }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl ModelInvoker for StubInvoker {
        async fn invoke(&self, model: &str, _prompt: &str) -> Result<String> {
            self.calls.lock().expect("calls lock").push(model.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.failing.contains(&model) {
                anyhow::bail!("quota exceeded for {model}");
            }
            Ok(format!("output from {model}"))
        }
    }

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[tokio::test]
    async fn first_success_wins_after_earlier_failures() {
        let invoker = StubInvoker::failing(vec!["model-a", "model-b"]);

        let outcome =
            generate_with(&invoker, "prompt", &models(&["model-a", "model-b", "model-c"]), Duration::from_secs(5))
                .await
                .expect("fallback success");

        assert_eq!(outcome.text, "output from model-c");
        assert_eq!(outcome.model, "model-c");
        assert_eq!(invoker.calls(), vec!["model-a", "model-b", "model-c"]);
    }

    #[tokio::test]
    async fn preferred_model_short_circuits_the_chain() {
        let invoker = StubInvoker::failing(vec![]);

        let outcome =
            generate_with(&invoker, "prompt", &models(&["model-a", "model-b"]), Duration::from_secs(5))
                .await
                .expect("first model success");

        assert_eq!(outcome.model, "model-a");
        assert_eq!(invoker.calls(), vec!["model-a"]);
    }

    #[tokio::test]
    async fn all_failures_surface_the_last_error() {
        let invoker = StubInvoker::failing(vec!["model-a"]);

        let err = generate_with(&invoker, "prompt", &models(&["model-a"]), Duration::from_secs(5))
            .await
            .expect_err("exhausted");

        match err {
            PredictionError::AllModelsExhausted { last_error } => {
                assert!(last_error.contains("quota exceeded for model-a"), "{last_error}");
            }
            other => panic!("expected AllModelsExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_model_list_is_exhausted_immediately() {
        let invoker = StubInvoker::failing(vec![]);

        let err = generate_with(&invoker, "prompt", &[], Duration::from_secs(5))
            .await
            .expect_err("no models");

        assert!(matches!(err, PredictionError::AllModelsExhausted { .. }));
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn budget_exhaustion_stops_the_chain_with_timeout() {
        let invoker = StubInvoker {
            calls: Mutex::new(Vec::new()),
            failing: vec!["model-a", "model-b"],
            delay: Duration::from_millis(50),
        };

        let err = generate_with(
            &invoker,
            "prompt",
            &models(&["model-a", "model-b", "model-c"]),
            Duration::from_millis(30),
        )
        .await
        .expect_err("budget exceeded");

        assert!(matches!(err, PredictionError::Timeout { .. }));
        // The chain stopped partway; model-c was never attempted.
        assert!(invoker.calls().len() < 3);
    }
}
