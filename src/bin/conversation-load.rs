use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::Parser;
use futures_util::{stream, StreamExt};
use sofia_ops::{
    conversation_flow, load_flow, ChatTransport, Classifier, InMemorySink, LoadReport,
    ScriptedTransport, SofiaConfig, Verifier, VerifierSettings, WebhookClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "conversation-load")]
#[command(about = "Drive the scripted Sofia conversation flow against a deployment")]
struct Args {
    /// Target base URL (defaults to $SOFIA_URL, then http://localhost:8000)
    #[arg(long)]
    target: Option<String>,

    /// Number of simulated users to run
    #[arg(long, default_value_t = 1)]
    users: usize,

    /// How many simulated users run in parallel
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Custom flow file (YAML sequence of {message, expected}) instead of the canonical one
    #[arg(long)]
    flow: Option<PathBuf>,

    /// Output path for JSONL per-user results
    #[arg(long)]
    out: Option<PathBuf>,

    /// Per-step latency ceiling in milliseconds
    #[arg(long, default_value_t = 1500)]
    latency_ceiling_ms: u64,

    /// Skip the 1-3s human-pacing delay between messages
    #[arg(long)]
    no_think_time: bool,

    /// Run against a canned in-process transport instead of a live target
    #[arg(long)]
    scripted: bool,

    /// Stop after the first simulated user with a failed step
    #[arg(long)]
    fail_fast: bool,
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn default_out_path() -> PathBuf {
    let ts = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    PathBuf::from(format!("load/runs/{ts}.jsonl"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let flow = match &args.flow {
        Some(path) => load_flow(path)?,
        None => conversation_flow(),
    };
    if flow.is_empty() {
        eprintln!("Flow has no steps.");
        std::process::exit(2);
    }

    let classifier = Classifier::sofia_default();
    let settings = VerifierSettings {
        latency_ceiling: Duration::from_millis(args.latency_ceiling_ms),
        think_time: if args.no_think_time || args.scripted {
            None
        } else {
            Some((Duration::from_secs(1), Duration::from_secs(3)))
        },
    };
    let sink = Arc::new(InMemorySink::new());

    // One live client is shared across users; scripted replays are per-user
    // so every conversation starts from the top of the script.
    let live: Option<Arc<dyn ChatTransport>> = if args.scripted {
        None
    } else {
        let config = match &args.target {
            Some(target) => SofiaConfig::new(target.clone()),
            None => SofiaConfig::from_env(),
        };
        Some(Arc::new(WebhookClient::from_config(config)?))
    };

    let make_verifier = || {
        let transport: Arc<dyn ChatTransport> = match &live {
            Some(client) => Arc::clone(client),
            None => Arc::new(ScriptedTransport::echoing(&flow, &classifier)),
        };
        Verifier::new(transport, flow.clone(), classifier.clone())
            .with_settings(settings.clone())
            .with_sink(sink.clone())
    };

    // Pre-flight gate: an unhealthy target aborts the whole run before any
    // conversational traffic.
    if let Err(err) = make_verifier().preflight().await {
        eprintln!("ABORT: {err}");
        std::process::exit(2);
    }

    let runs = if args.fail_fast {
        let mut runs = Vec::with_capacity(args.users);
        for _ in 0..args.users {
            let result = make_verifier().run_user().await;
            let stop = !result.all_passed();
            runs.push(result);
            if stop {
                eprintln!("Stopping after first failed user (--fail-fast).");
                break;
            }
        }
        runs
    } else {
        stream::iter((0..args.users).map(|_| {
            let verifier = make_verifier();
            async move { verifier.run_user().await }
        }))
        .buffer_unordered(args.concurrency.max(1))
        .collect::<Vec<_>>()
        .await
    };

    let out_path = args.out.unwrap_or_else(default_out_path);
    ensure_parent_dir(&out_path)?;
    let file = fs::File::create(&out_path)?;
    let mut writer = BufWriter::new(file);
    for run in &runs {
        serde_json::to_writer(&mut writer, run)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    let report = LoadReport::from_runs(&runs);
    println!(
        "Users: {}/{} passed, Steps: {} passed / {} failed, Output: {}",
        report.users_passed,
        report.users,
        report.steps_passed,
        report.steps_failed,
        out_path.display()
    );
    println!(
        "HttpErrorRate: {:.3}, AvgLatency: {:.0}ms, P95Latency: {:.0}ms",
        sink.error_rate(),
        sink.latency_avg(),
        sink.latency_percentile(95.0)
    );

    if report.all_passed() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
