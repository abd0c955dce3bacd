use std::fmt;
use std::path::PathBuf;

use lms_core::model::ModuleId;
use services::{ActiveModuleRequest, ApiError, AppServices, Clock, LmsConfig};
use storage::SqliteRepository;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod seed;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  lms migrate [--db <sqlite_url>] [--config <path>]");
    eprintln!("  lms seed    [--db <sqlite_url>] [--config <path>]");
    eprintln!("  lms demo    [--db <sqlite_url>] [--config <path>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://lms.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LMS_DB_URL, LMS_CONFIG, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Migrate,
    Seed,
    Demo,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "migrate" => Some(Self::Migrate),
            "seed" => Some(Self::Seed),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    db_url: Option<String>,
    config: Option<PathBuf>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(value);
                }
                "--config" => {
                    parsed.config = Some(PathBuf::from(require_value(args, "--config")?));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(parsed)
    }

    /// File config first, then env, then flags.
    fn into_config(self) -> Result<LmsConfig, Box<dyn std::error::Error>> {
        let mut config = LmsConfig::load(self.config.as_deref())?;
        if let Some(url) = self.db_url {
            config.database_url = url;
        }
        config.database_url = normalize_sqlite_url(config.database_url);
        Ok(config)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lms=info,services=info,storage=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let config = Args::parse(&mut argv)
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?
        .into_config()?;

    prepare_sqlite_file(&config.database_url)?;

    match cmd {
        Command::Migrate => {
            let repo = SqliteRepository::connect(&config.database_url).await?;
            repo.migrate().await?;
            let version = repo.schema_version().await?;
            info!(db = %config.database_url, version, "schema up to date");
            Ok(())
        }
        Command::Seed => {
            let services = AppServices::new_sqlite(&config, Clock::default()).await?;
            seed::seed_catalog(services.storage().catalog_writer.as_ref()).await?;
            info!(db = %config.database_url, "demo catalog seeded");
            Ok(())
        }
        Command::Demo => demo(&config).await,
    }
}

/// Reduce an API failure to what a client may see.
fn client_error(err: ApiError) -> Box<dyn std::error::Error> {
    err.public_message().into()
}

/// Walk one learner through a quiz and into the next course.
async fn demo(config: &LmsConfig) -> Result<(), Box<dyn std::error::Error>> {
    let services = AppServices::new_sqlite(config, Clock::default()).await?;
    seed::seed_catalog(services.storage().catalog_writer.as_ref()).await?;
    let token = services.auth().issue(seed::LEARNER, seed::LEARNER_EMAIL)?;
    let bearer = format!("Bearer {token}");
    let bearer = Some(bearer.as_str());
    let api = services.api();

    let attempt = api
        .start_attempt(bearer, seed::QUIZ)
        .await
        .map_err(client_error)?;
    println!("{}", serde_json::to_string_pretty(&attempt)?);

    for question in &attempt.questions {
        if let Some(option) = question.options.first() {
            let answered = api
                .set_answer(bearer, attempt.attempt_id, option.id)
                .await
                .map_err(client_error)?;
            println!("{}", serde_json::to_string_pretty(&answered)?);
        }
    }

    let ended = api
        .end_attempt(bearer, attempt.attempt_id)
        .await
        .map_err(client_error)?;
    println!("{}", serde_json::to_string_pretty(&ended)?);

    let moved = api
        .set_active_module(
            bearer,
            ActiveModuleRequest {
                course_id: Some(seed::FOLLOW_UP_COURSE),
                learning_path_id: Some(seed::TRACK),
                module_id: ModuleId::new(4),
                end: false,
            },
        )
        .await
        .map_err(client_error)?;
    println!("{}", serde_json::to_string_pretty(&moved)?);

    services.auth().revoke(&token);
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
