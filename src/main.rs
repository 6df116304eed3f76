use std::collections::HashSet;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crisis_desk::automation::HandlerRegistry;
use crisis_desk::config::CrisisConfig;
use crisis_desk::crisis::{CrisisClassifier, CrisisTaxonomy, RawMessage};
use crisis_desk::error::ChannelError;
use crisis_desk::llm::{LlmConfig, create_provider};
use crisis_desk::notify::{LogNotifier, NotificationSender, SmtpConfig, SmtpNotifier};
use crisis_desk::pipeline::{CrisisPipeline, MessageSource, PipelineDeps, spawn_crisis_monitor};
use crisis_desk::state::CrisisState;

const USAGE: &str = "usage: crisis-desk [--check | --watch] [FILE]\n\
                     \n  FILE     JSON array of {id, subject, body, sender}; stdin when omitted or '-'\
                     \n  --check  classify only, no side effects\
                     \n  --watch  poll FILE every CRISIS_POLL_INTERVAL_SECS until Ctrl-C";

enum Mode {
    Process,
    Check,
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "Failed to install rustls crypto provider")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut mode = Mode::Process;
    let mut input: Option<String> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--check" => mode = Mode::Check,
            "--watch" => mode = Mode::Watch,
            "-h" | "--help" => {
                eprintln!("{USAGE}");
                return Ok(());
            }
            _ if input.is_none() => input = Some(arg),
            _ => return Err(USAGE.into()),
        }
    }

    let config = CrisisConfig::from_env()?;

    eprintln!("🚨 Crisis Desk v{}", env!("CARGO_PKG_VERSION"));

    // ── Classifier ──────────────────────────────────────────────────────
    let taxonomy = Arc::new(CrisisTaxonomy::standard());
    let classifier = match LlmConfig::from_env()? {
        Some(llm_config) => {
            let llm = create_provider(&llm_config)?;
            eprintln!("   Classifier: {} + keyword fallback", llm_config.model);
            CrisisClassifier::with_llm(llm, Arc::clone(&taxonomy), config.classifier_timeout)
        }
        None => {
            eprintln!("   Classifier: keyword rules (no LLM API key set)");
            CrisisClassifier::rules_only(Arc::clone(&taxonomy))
        }
    };

    // ── Notifications ───────────────────────────────────────────────────
    let notifier: Arc<dyn NotificationSender> = match SmtpConfig::from_env()? {
        Some(smtp) => {
            eprintln!("   Replies: SMTP via {}:{}", smtp.host, smtp.port);
            Arc::new(SmtpNotifier::new(smtp))
        }
        None => {
            eprintln!("   Replies: log only (CRISIS_SMTP_HOST not set)");
            Arc::new(LogNotifier)
        }
    };

    let pipeline = Arc::new(CrisisPipeline::new(
        config.clone(),
        PipelineDeps {
            state: Arc::new(CrisisState::new(&config)),
            taxonomy,
            classifier,
            registry: Arc::new(HandlerRegistry::with_builtins()),
            notifier,
        },
    ));

    match mode {
        Mode::Process => {
            let messages = read_batch(input.as_deref())?;
            let result = pipeline.process_full(&messages).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Mode::Check => {
            let messages = read_batch(input.as_deref())?;
            let outcome = pipeline.check_for_crisis(&messages).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Mode::Watch => {
            let path = match input.as_deref() {
                Some(p) if p != "-" => PathBuf::from(p),
                _ => return Err("--watch needs a FILE".into()),
            };
            let source = Arc::new(JsonFileSource::new(path));
            let (handle, shutdown) =
                spawn_crisis_monitor(Arc::clone(&pipeline), source, config.poll_interval);

            tokio::signal::ctrl_c().await?;
            shutdown.store(true, Ordering::Relaxed);
            handle.abort();

            let snapshot = pipeline.snapshot().await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    Ok(())
}

fn read_batch(path: Option<&str>) -> Result<Vec<RawMessage>, Box<dyn std::error::Error>> {
    let raw = match path {
        Some(p) if p != "-" => std::fs::read_to_string(p)?,
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    Ok(serde_json::from_str(&raw)?)
}

/// Re-reads a JSON batch file on every poll; ids marked read are hidden.
struct JsonFileSource {
    path: PathBuf,
    read: Mutex<HashSet<String>>,
}

impl JsonFileSource {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            read: Mutex::new(HashSet::new()),
        }
    }

    fn fetch_failed(&self, reason: impl std::fmt::Display) -> ChannelError {
        ChannelError::FetchFailed {
            name: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl MessageSource for JsonFileSource {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn fetch_unread(&self, limit: usize) -> Result<Vec<RawMessage>, ChannelError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.fetch_failed(e))?;
        let messages: Vec<RawMessage> =
            serde_json::from_str(&raw).map_err(|e| self.fetch_failed(e))?;

        let read = self.read.lock().await;
        Ok(messages
            .into_iter()
            .filter(|m| !read.contains(&m.id))
            .take(limit)
            .collect())
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), ChannelError> {
        self.read.lock().await.insert(message_id.to_string());
        Ok(())
    }
}
