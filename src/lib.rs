pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod flow;
pub mod sink;
pub mod verifier;

pub use config::{GateConfig, MetricsConfig, MetricsMode, SofiaConfig};
pub use error::OpsError;
pub use flow::{conversation_flow, load_flow, Classifier, ClassifierRule, ConversationStep, StateTag};
pub use sink::{InMemorySink, NullSink, Rate, SampleSink, Trend};
pub use verifier::{
    report::LoadReport, scripted::ScriptedReply, scripted::ScriptedTransport,
    webhook::WebhookClient, ChatResponse,
    ChatTransport, RunResult, StepOutcome, Verifier, VerifierSettings,
};
pub use dashboard::{
    client::MetricsClient, fetch_with_fallback, map_summary_to_dashboard, DashboardStats, Fetched,
    Provenance, SummaryMetrics,
};
