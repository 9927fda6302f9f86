//! Command-line entry point for tutor-talk.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (`RUST_LOG`, default `info`).
//! 2. Parse arguments.
//! 3. Load [`AppConfig`] from `--config` or the platform settings file and
//!    apply environment overrides.
//! 4. Open the store: SQLite at the configured path, or an in-process
//!    [`MemoryStore`] with `--ephemeral`.
//! 5. Run the subcommand on a tokio runtime and print its response
//!    envelope as JSON. A failed operation exits with status 1.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use tutor_talk::{
    api::{found, respond, ApiResponse, CREATED, OK},
    config::{AppConfig, AppPaths, StorageBackend},
    llm::OpenAiClient,
    model::{Difficulty, ModuleBundle, QuizAnswer},
    pipeline::{stage_channel, AudioSynthesizer, ModuleGenerator},
    progress::ProgressTracker,
    quiz::{QuizEvaluator, QuizResults},
    storage::{LocalStorage, ObjectStorage, SupabaseStorage},
    store::{MemoryStore, ModuleFilter, ModuleStore, SqliteStore, StoreError},
    tts::ElevenLabsClient,
};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Generate narrated lessons with quizzes and track learners through them.
#[derive(Parser, Debug)]
#[command(name = "tutor-talk", version)]
struct Cli {
    /// Settings file to use instead of the platform default
    #[arg(long, global = true, env = "TUTOR_TALK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep everything in memory; nothing is written to the database
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate, store and narrate a new module
    Generate {
        title: String,
        /// Lesson language (defaults to generation.default_language)
        #[arg(long)]
        language: Option<String>,
        /// Skip narration even when it is enabled in the settings
        #[arg(long)]
        no_audio: bool,
    },

    /// Print a module with its sections and quizzes
    Show { module_id: String },

    /// List modules, newest first
    List {
        /// Include unpublished modules
        #[arg(long)]
        all: bool,
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        difficulty: Option<Difficulty>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Make a module visible in the public listing
    Publish {
        module_id: String,
        /// Hide it again instead
        #[arg(long)]
        unpublish: bool,
    },

    /// Grade answers to a quiz and record the result
    Evaluate {
        quiz_id: String,
        /// JSON file: a list of {question_id, user_response}
        #[arg(long, value_name = "FILE")]
        answers: PathBuf,
        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Show recorded quiz results for a user
    Results {
        #[arg(long, default_value = "local")]
        user: String,
        #[arg(long)]
        quiz: Option<String>,
    },

    /// Track a learner through a module
    Progress {
        #[command(subcommand)]
        action: ProgressCommand,
    },

    /// Manage the settings file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ProgressCommand {
    Start {
        module_id: String,
        #[arg(long, default_value = "local")]
        user: String,
    },
    Advance {
        progress_id: String,
        section_index: u32,
    },
    Complete {
        progress_id: String,
    },
    Show {
        progress_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective settings
    Show,
}

/// Accepts either a bare list or `{"answers": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnswerFile {
    List(Vec<QuizAnswer>),
    Wrapped { answers: Vec<QuizAnswer> },
}

impl AnswerFile {
    fn into_answers(self) -> Vec<QuizAnswer> {
        let answers = match self {
            AnswerFile::List(a) | AnswerFile::Wrapped { answers: a } => a,
        };
        answers
            .into_iter()
            .map(|a| QuizAnswer {
                is_correct: None,
                ..a
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn settings_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .unwrap_or_else(|| AppPaths::new().settings_file)
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let path = settings_path(cli);
    let mut config = AppConfig::load_from(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    config.apply_env_overrides();
    Ok(config)
}

fn open_store(cli: &Cli, config: &AppConfig) -> Result<Arc<dyn ModuleStore>> {
    if cli.ephemeral {
        log::info!("store: using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let path = config.database_path();
    let store = SqliteStore::open(&path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    log::info!("store: {}", path.display());
    Ok(Arc::new(store))
}

fn object_storage(config: &AppConfig) -> Result<Arc<dyn ObjectStorage>> {
    let storage: Arc<dyn ObjectStorage> = match config.storage.backend {
        StorageBackend::Local => {
            let storage = LocalStorage::new(config.storage_dir());
            log::info!("storage: local audio under {}", storage.root().display());
            Arc::new(storage)
        }
        StorageBackend::Supabase => {
            log::info!("storage: supabase bucket {}", config.storage.bucket);
            Arc::new(SupabaseStorage::from_config(&config.storage)?)
        }
    };
    Ok(storage)
}

async fn load_bundle(
    store: &dyn ModuleStore,
    module_id: &str,
) -> Result<Option<ModuleBundle>, StoreError> {
    let Some(module) = store.get_module(module_id).await? else {
        return Ok(None);
    };
    let sections = store.sections_for_module(module_id).await?;
    let quizzes = store.quizzes_for_module(module_id).await?;
    Ok(Some(ModuleBundle {
        module,
        sections,
        quizzes,
    }))
}

fn emit<T: Serialize>(response: ApiResponse<T>) -> Result<ExitCode> {
    println!("{}", response.to_json()?);
    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn generate(
    config: &AppConfig,
    store: Arc<dyn ModuleStore>,
    title: &str,
    language: Option<&str>,
    no_audio: bool,
) -> Result<ExitCode> {
    let llm = Arc::new(OpenAiClient::from_config(&config.llm));
    log::info!("pipeline: generating \"{title}\" with model {}", llm.model());
    let (stage_tx, mut stage_rx) = stage_channel();

    let watcher = tokio::spawn(async move {
        while stage_rx.changed().await.is_ok() {
            let label = stage_rx.borrow().label();
            log::info!("pipeline: {label}");
        }
    });

    let result = {
        let mut generator = ModuleGenerator::new(llm, store)
            .configured(config)
            .with_stage_updates(stage_tx);

        if config.generation.audio_enabled && !no_audio {
            let audio = AudioSynthesizer::new(
                Arc::new(ElevenLabsClient::from_config(&config.tts)),
                object_storage(config)?,
            )
            .with_concurrency(config.generation.audio_concurrency());
            generator = generator.with_audio(audio);
        }

        generator.generate_module(title, language).await
    };
    // The sender went away with the generator, so the watcher finishes.
    let _ = watcher.await;

    emit(respond(result, CREATED))
}

async fn evaluate(
    config: &AppConfig,
    store: Arc<dyn ModuleStore>,
    quiz_id: &str,
    answers_path: &Path,
    user: &str,
) -> Result<ExitCode> {
    let raw = std::fs::read_to_string(answers_path)
        .with_context(|| format!("failed to read {}", answers_path.display()))?;
    let answers = serde_json::from_str::<AnswerFile>(&raw)
        .with_context(|| format!("{} is not a valid answers file", answers_path.display()))?
        .into_answers();

    let llm = OpenAiClient::from_config(&config.llm);
    log::info!("quiz: grading {quiz_id} with model {}", llm.model());
    let evaluator = QuizEvaluator::new(Arc::new(llm));
    let results = QuizResults::new(store, evaluator);
    emit(respond(
        results.evaluate_and_record(user, quiz_id, &answers).await,
        OK,
    ))
}

async fn progress(store: Arc<dyn ModuleStore>, action: ProgressCommand) -> Result<ExitCode> {
    let tracker = ProgressTracker::new(store);
    match action {
        ProgressCommand::Start { module_id, user } => {
            emit(respond(tracker.start(&user, &module_id).await, CREATED))
        }
        ProgressCommand::Advance {
            progress_id,
            section_index,
        } => emit(respond(tracker.advance(&progress_id, section_index).await, OK)),
        ProgressCommand::Complete { progress_id } => {
            emit(respond(tracker.complete(&progress_id).await, OK))
        }
        ProgressCommand::Show { progress_id } => emit(respond(tracker.get(&progress_id).await, OK)),
    }
}

fn config_command(cli: &Cli, action: &ConfigCommand) -> Result<ExitCode> {
    let path = settings_path(cli);
    match action {
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            AppConfig::default().save_to(&path)?;
            println!("wrote {}", path.display());
        }
        ConfigCommand::Show => {
            let config = load_config(cli)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if let Command::Config { action } = &cli.command {
        return config_command(&cli, action);
    }

    let config = load_config(&cli)?;
    let store = open_store(&cli, &config)?;

    match cli.command {
        Command::Generate {
            title,
            language,
            no_audio,
        } => generate(&config, store, &title, language.as_deref(), no_audio).await,

        Command::Show { module_id } => match load_bundle(store.as_ref(), &module_id).await {
            Ok(bundle) => emit(found(bundle, "module")),
            Err(e) => emit(ApiResponse::<ModuleBundle>::from(e)),
        },

        Command::List {
            all,
            topic,
            difficulty,
            limit,
            offset,
        } => {
            let filter = ModuleFilter {
                published_only: !all,
                topic,
                difficulty,
                limit,
                offset,
            };
            emit(respond(store.list_modules(&filter).await, OK))
        }

        Command::Publish {
            module_id,
            unpublish,
        } => emit(respond(
            store.set_module_published(&module_id, !unpublish).await,
            OK,
        )),

        Command::Evaluate {
            quiz_id,
            answers,
            user,
        } => evaluate(&config, store, &quiz_id, &answers, &user).await,

        Command::Results { user, quiz } => {
            emit(respond(store.quiz_results(&user, quiz.as_deref()).await, OK))
        }

        Command::Progress { action } => progress(store, action).await,

        Command::Config { .. } => Ok(ExitCode::SUCCESS),
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(cli))
}
