use std::path::Path;
use std::sync::Arc;

use attestation_mailer::channels::{ImapInbox, SmtpMailer};
use attestation_mailer::config::AppConfig;
use attestation_mailer::document::{AttestationGenerator, PdfRenderer};
use attestation_mailer::error::Result;
use attestation_mailer::llm::create_provider;
use attestation_mailer::monitor::{InboxMonitor, IntervalScheduler, PollStats};
use attestation_mailer::pipeline::{
    FieldExtractor, MessagePipeline, PipelineDeps, ReplyDispatcher, ReplyTemplates,
};
use attestation_mailer::store::open_ledger;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "Failed to install rustls crypto provider")?;

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export EMAIL_IMAP_HOST=imap.example.com EMAIL_USERNAME=... EMAIL_PASSWORD=... LLM_API_KEY=...");
        std::process::exit(1);
    });

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("📨 Attestation Mailer v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Inbox: {}@{}:{}", config.email.username, config.email.imap_host, config.email.imap_port);
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Output: {}", config.attestation.output_dir.display());
    eprintln!("   Ledger: {} ({:?})", config.ledger.path.display(), config.ledger.backend);
    eprintln!("   Poll interval: {}s\n", config.email.poll_interval_secs);

    let totals = run(&config).await?;
    tracing::info!(
        polls = totals.polls,
        messages = totals.messages,
        replies_sent = totals.replies_sent,
        "Shut down"
    );
    Ok(())
}

/// Build the pipeline and poll until interrupted or the inbox fails.
async fn run(config: &AppConfig) -> Result<PollStats> {
    let pipeline = build_pipeline(config).await?;

    let scheduler = IntervalScheduler::new(config.poll_interval());
    let shutdown = scheduler.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current poll");
            shutdown.trigger();
        }
    });

    let mut monitor = InboxMonitor::new(ImapInbox::new(config.email.clone()), pipeline, scheduler);
    Ok(monitor.run().await?)
}

async fn build_pipeline(config: &AppConfig) -> Result<MessagePipeline> {
    let registry = config.attestation.registry()?;
    tracing::info!(types = %registry.names().collect::<Vec<_>>().join(", "), "Request types loaded");

    let llm = create_provider(&config.llm)?;
    let ledger = open_ledger(&config.ledger).await?;
    let mailer = Arc::new(SmtpMailer::new(config.email.clone()));

    Ok(MessagePipeline::new(PipelineDeps {
        registry,
        extractor: FieldExtractor::new(llm),
        generator: AttestationGenerator::new(
            &config.attestation.output_dir,
            &config.attestation.organization,
            Arc::new(PdfRenderer::default()),
        ),
        dispatcher: ReplyDispatcher::new(mailer, Arc::clone(&ledger)),
        ledger,
        replies: ReplyTemplates::new(&config.attestation.signature),
    }))
}

fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "attestation-mailer.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    guard
}
