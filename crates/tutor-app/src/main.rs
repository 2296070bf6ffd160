//! Tutor application binary - composition root.
//!
//! 1. Parse the command line and load configuration from TOML
//! 2. Install the tracing subscriber
//! 3. Run the selected command: the HTTP API, a console study session, or
//!    a one-off intent recognition

mod cli;

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tutor_api::state::AppState;
use tutor_core::config::{QuizFallback, TutorConfig};
use tutor_dialogue::{
    run_voice_session, ConsoleSpeaker, DialogueOrchestrator, Session, StdinListener,
};
use tutor_document::{load_document, PdfTextExtractor};
use tutor_intent::IntentRecognizer;
use tutor_llm::{GeminiClient, ResponseGenerator, RetryPolicy};
use tutor_storage::{Database, DocumentRepository};

use cli::{CliArgs, Command};

type AppResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = CliArgs::parse();

    // Config. Tracing is not up yet, so a load failure is reported after.
    let config_file = args.resolve_config_path();
    let loaded = if config_file.exists() {
        TutorConfig::load(&config_file).map(Some)
    } else {
        Ok(None)
    };
    let mut config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => TutorConfig::default(),
    };
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }

    // Tracing.
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.general.log_level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let path = config_file.display();
    match loaded {
        Ok(Some(_)) => tracing::info!(path = %path, "Configuration loaded"),
        Ok(None) => tracing::info!(path = %path, "No configuration file; using defaults"),
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Failed to load config; using defaults")
        }
    }
    config.validate()?;

    match args.command {
        Command::Serve { port } => {
            let port = cli::resolve_port(port, config.api.port);
            serve(config, port).await
        }
        Command::Chat { pdf } => {
            tokio::task::spawn_blocking(move || chat(config, &pdf)).await?
        }
        Command::Recognize { text } => {
            let intent = IntentRecognizer::new().recognize(&text);
            println!("{}", serde_json::to_string_pretty(&intent)?);
            Ok(())
        }
    }
}

/// Start the HTTP API.
async fn serve(config: TutorConfig, port: u16) -> AppResult<()> {
    tracing::info!("Starting tutor v{}", env!("CARGO_PKG_VERSION"));

    let db_path = config.general.database_path();
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // The Gemini client is blocking; build it off the async workers.
    let llm_config = config.llm.clone();
    let model = tokio::task::spawn_blocking(move || GeminiClient::from_config(&llm_config)).await??;
    tracing::info!(model = %config.llm.model, "Language model client ready");

    let extractor = Arc::new(PdfTextExtractor::new(config.document.chunk_size));
    let state = AppState::new(config, db, Arc::new(model), extractor);
    tutor_api::start_server(state, port).await?;

    tracing::info!("Tutor shut down");
    Ok(())
}

/// Load `pdf` and study it over stdin/stdout until the user stops.
fn chat(config: TutorConfig, pdf: &Path) -> AppResult<()> {
    let chunk_size = config.document.chunk_size;
    let extractor = PdfTextExtractor::new(chunk_size);
    let document = load_document(&extractor, pdf, chunk_size).map_err(|e| {
        tracing::error!(path = %pdf.display(), error = %e, "Failed to load document");
        e
    })?;

    let db = Arc::new(Database::new(&config.general.database_path())?);
    let documents = Arc::new(DocumentRepository::new(db));
    let filename = pdf
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document.pdf".to_string());
    let record = documents.save(&filename, &document)?;
    tracing::info!(doc_id = %record.id, pages = record.page_count, "Document stored");

    let retry = RetryPolicy::new(
        config.llm.max_attempts,
        Duration::from_secs(config.llm.base_delay_secs),
    );
    let model = Arc::new(GeminiClient::from_config(&config.llm)?);
    let generator = ResponseGenerator::new(model).with_retry_policy(retry);

    let mut dialogue = config.dialogue.clone();
    dialogue.quiz_fallback = QuizFallback::PassThrough;
    let orchestrator = DialogueOrchestrator::new(IntentRecognizer::new(), generator, dialogue)
        .with_catalog(documents);

    let mut session = Session::new(Arc::new(document)).with_document_id(record.id.to_string());
    let summary = run_voice_session(
        &orchestrator,
        &mut session,
        &ConsoleSpeaker::stdout(),
        &StdinListener::stdin(),
        Duration::from_secs(config.dialogue.listen_timeout_secs),
    )?;

    tracing::info!(turns = summary.turns, terminated = summary.terminated, "Chat finished");
    Ok(())
}
