pub mod report;
pub mod scripted;
pub mod webhook;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;

use crate::{
    error::OpsError,
    flow::{Classifier, ConversationStep, StateTag},
    sink::{NullSink, SampleSink},
};

/// Raw outcome of delivering one user message to the chatbot.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub status: u16,
    pub body: String,
}

/// Delivery seam for the scripted conversation. The production implementation
/// is [`webhook::WebhookClient`]; tests and dry runs use
/// [`scripted::ScriptedTransport`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, from: &str, body: &str) -> Result<ChatResponse, OpsError>;

    /// Status code of the target's health endpoint.
    async fn health(&self) -> Result<u16, OpsError>;
}

/// Per-step record kept for the run report.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub message: String,
    pub expected: StateTag,
    pub actual: StateTag,
    pub http_ok: bool,
    pub latency_ms: u64,
    pub pass: bool,
}

/// Accumulated result of one simulated user's conversation.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub phone: String,
    pub steps_passed: u32,
    pub steps_failed: u32,
    pub total_latency_ms: u64,
    pub steps: Vec<StepOutcome>,
}

impl RunResult {
    pub fn all_passed(&self) -> bool {
        self.steps_failed == 0
    }
}

#[derive(Debug, Clone)]
pub struct VerifierSettings {
    /// A step whose round trip exceeds this is counted as failed even on HTTP 200.
    pub latency_ceiling: Duration,
    /// Uniform human-pacing delay between submissions; `None` disables pacing.
    pub think_time: Option<(Duration, Duration)>,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            latency_ceiling: Duration::from_millis(1500),
            think_time: Some((Duration::from_secs(1), Duration::from_secs(3))),
        }
    }
}

/// Drives the scripted conversation for one simulated user at a time and
/// classifies every response.
///
/// A run never aborts early: a failed step does not invalidate the remaining
/// ones, so state drift in one turn cannot mask classification data for the
/// turns after it.
pub struct Verifier {
    transport: Arc<dyn ChatTransport>,
    classifier: Classifier,
    flow: Vec<ConversationStep>,
    settings: VerifierSettings,
    sink: Arc<dyn SampleSink>,
}

impl Verifier {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        flow: Vec<ConversationStep>,
        classifier: Classifier,
    ) -> Self {
        Self {
            transport,
            classifier,
            flow,
            settings: VerifierSettings::default(),
            sink: Arc::new(NullSink),
        }
    }

    pub fn with_settings(mut self, settings: VerifierSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn SampleSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Health gate run once before any conversational traffic. A non-200
    /// answer is fatal for the whole test run: per-step failures against an
    /// unhealthy target would only be misleading.
    pub async fn preflight(&self) -> Result<(), OpsError> {
        let status = self.transport.health().await?;
        if status == 200 {
            Ok(())
        } else {
            Err(OpsError::UnhealthyTarget(status))
        }
    }

    /// Runs the full scripted conversation for one freshly minted simulated
    /// user and returns the complete per-step record.
    pub async fn run_user(&self) -> RunResult {
        let phone = synthetic_phone();
        let mut result = RunResult {
            phone: phone.clone(),
            steps_passed: 0,
            steps_failed: 0,
            total_latency_ms: 0,
            steps: Vec::with_capacity(self.flow.len()),
        };

        for (index, step) in self.flow.iter().enumerate() {
            let started = Instant::now();
            let response = self.transport.send_message(&phone, &step.message).await;
            let latency = started.elapsed();
            let latency_ms = latency.as_millis() as u64;

            let (http_ok, actual) = match response {
                Ok(resp) => {
                    let http_ok = resp.status == 200
                        && !resp.body.is_empty()
                        && latency <= self.settings.latency_ceiling;
                    (http_ok, self.classifier.classify(&resp.body))
                }
                Err(err) => {
                    tracing::warn!(step = index + 1, %phone, error = %err, "webhook call failed");
                    (false, StateTag::Error)
                }
            };

            let pass = http_ok && actual == step.expected;
            if pass {
                result.steps_passed += 1;
                tracing::info!(step = index + 1, %phone, state = %actual, "step passed");
            } else {
                result.steps_failed += 1;
                tracing::warn!(
                    step = index + 1,
                    %phone,
                    expected = %step.expected,
                    actual = %actual,
                    http_ok,
                    "step failed"
                );
            }

            self.sink.record_error(!http_ok);
            self.sink.record_latency(latency_ms as f64);

            result.total_latency_ms += latency_ms;
            result.steps.push(StepOutcome {
                index,
                message: step.message.clone(),
                expected: step.expected,
                actual,
                http_ok,
                latency_ms,
                pass,
            });

            if index + 1 < self.flow.len() {
                if let Some((low, high)) = self.settings.think_time {
                    tokio::time::sleep(uniform_delay(low, high)).await;
                }
            }
        }

        result
    }
}

/// Fresh `whatsapp:+39XXXXXXXXX` sender identity for one simulated user.
pub fn synthetic_phone() -> String {
    let number: u64 = rand::thread_rng().gen_range(100_000_000..1_000_000_000);
    format!("whatsapp:+39{number}")
}

fn uniform_delay(low: Duration, high: Duration) -> Duration {
    if high <= low {
        return low;
    }
    let millis = rand::thread_rng().gen_range(low.as_millis()..=high.as_millis());
    Duration::from_millis(millis as u64)
}

#[cfg(test)]
mod tests {
    use super::{scripted::ScriptedReply, scripted::ScriptedTransport, *};
    use crate::flow::{conversation_flow, Classifier};
    use crate::sink::InMemorySink;

    fn no_pacing() -> VerifierSettings {
        VerifierSettings {
            think_time: None,
            ..VerifierSettings::default()
        }
    }

    fn verifier_with(transport: Arc<ScriptedTransport>) -> Verifier {
        Verifier::new(transport, conversation_flow(), Classifier::sofia_default())
            .with_settings(no_pacing())
    }

    #[tokio::test]
    async fn clean_run_passes_all_seven_steps() {
        let transport = Arc::new(ScriptedTransport::echoing(
            &conversation_flow(),
            &Classifier::sofia_default(),
        ));
        let verifier = verifier_with(transport.clone());

        let result = verifier.run_user().await;
        assert_eq!(result.steps_passed, 7);
        assert_eq!(result.steps_failed, 0);
        assert!(result.all_passed());
        assert_eq!(result.steps.len(), 7);
        assert!(result.phone.starts_with("whatsapp:+39"));
        assert_eq!(transport.sent().len(), 7);
    }

    #[tokio::test]
    async fn mismatched_step_does_not_stop_the_run() {
        let classifier = Classifier::sofia_default();
        let flow = conversation_flow();
        let mut replies = ScriptedTransport::echo_replies(&flow, &classifier);
        // Step 3 drifts to an unrelated answer.
        replies[2] = ScriptedReply::Ok("Ti serve altro?".to_string());
        let transport = Arc::new(ScriptedTransport::new(replies));
        let verifier = verifier_with(transport.clone());

        let result = verifier.run_user().await;
        assert_eq!(result.steps.len(), 7);
        assert_eq!(result.steps_failed, 1);
        assert_eq!(result.steps_passed, 6);
        assert_eq!(result.steps[2].actual, StateTag::Unknown);
        assert!(result.steps[2].http_ok);
        assert!(!result.steps[2].pass);
        // All seven messages were still delivered.
        assert_eq!(transport.sent().len(), 7);
    }

    #[tokio::test]
    async fn transport_error_is_counted_as_error_state() {
        let classifier = Classifier::sofia_default();
        let flow = conversation_flow();
        let mut replies = ScriptedTransport::echo_replies(&flow, &classifier);
        replies[4] = ScriptedReply::Down;
        let transport = Arc::new(ScriptedTransport::new(replies));
        let verifier = verifier_with(transport);

        let result = verifier.run_user().await;
        assert_eq!(result.steps_failed, 1);
        assert_eq!(result.steps[4].actual, StateTag::Error);
        assert!(!result.steps[4].http_ok);
        assert_eq!(result.steps.len(), 7);
    }

    #[tokio::test]
    async fn non_200_and_empty_bodies_fail_validation() {
        let classifier = Classifier::sofia_default();
        let flow = conversation_flow();
        let mut replies = ScriptedTransport::echo_replies(&flow, &classifier);
        replies[0] = ScriptedReply::Http(500, "Come ti chiami?".to_string());
        replies[1] = ScriptedReply::Ok(String::new());
        let transport = Arc::new(ScriptedTransport::new(replies));
        let verifier = verifier_with(transport);

        let result = verifier.run_user().await;
        // Step 1: right state but bad status; step 2: empty body.
        assert!(!result.steps[0].http_ok);
        assert_eq!(result.steps[0].actual, StateTag::AskName);
        assert!(!result.steps[0].pass);
        assert!(!result.steps[1].http_ok);
        assert_eq!(result.steps_failed, 2);
    }

    #[tokio::test]
    async fn unhealthy_target_aborts_before_any_webhook_traffic() {
        let transport = Arc::new(
            ScriptedTransport::echoing(&conversation_flow(), &Classifier::sofia_default())
                .with_health(503),
        );
        let verifier = verifier_with(transport.clone());

        let err = verifier.preflight().await.unwrap_err();
        assert!(matches!(err, OpsError::UnhealthyTarget(503)));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn sink_receives_one_error_and_one_latency_sample_per_step() {
        let sink = Arc::new(InMemorySink::new());
        let transport = Arc::new(ScriptedTransport::echoing(
            &conversation_flow(),
            &Classifier::sofia_default(),
        ));
        let verifier = verifier_with(transport).with_sink(sink.clone());

        let result = verifier.run_user().await;
        assert!(result.all_passed());
        assert_eq!(sink.samples(), 7);
        assert_eq!(sink.error_rate(), 0.0);
    }

    #[test]
    fn synthetic_phones_are_well_formed() {
        for _ in 0..32 {
            let phone = synthetic_phone();
            let digits = phone.strip_prefix("whatsapp:+39").unwrap();
            assert_eq!(digits.len(), 9);
            assert!(digits.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
