// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lingobatch::app_config::{Config, LogLevel};
use lingobatch::language_utils::language_codes_match;
use lingobatch::database::{DatabaseConnection, Repository};
use lingobatch::overnight::{OvernightOptions, OvernightRunner};
use lingobatch::providers::gemini::Gemini;
use lingobatch::rate_limit::KeyRing;
use lingobatch::translation::{BatchTranslator, TranslationRequest};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

fn level_filter(level: &LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate UI strings (default command)
    Translate(TranslateArgs),

    /// Run unattended bulk translation of the stored backlog
    Overnight(OvernightArgs),

    /// Show translation store statistics
    Stats(StatsArgs),

    /// Generate shell completions for lingobatch
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug, Default)]
struct TranslateArgs {
    /// Strings to translate (repeatable)
    #[arg(long = "text", value_name = "TEXT")]
    texts: Vec<String>,

    /// File with one string per line
    #[arg(long, conflicts_with = "texts")]
    file: Option<PathBuf>,

    /// Translate the stored backlog instead of explicit strings
    #[arg(long, conflicts_with_all = ["texts", "file"])]
    missing: bool,

    /// Maximum number of backlog strings to translate
    #[arg(long, requires = "missing")]
    limit: Option<u32>,

    /// Target language code (e.g., 'pt', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Source language code (e.g., 'en')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Strings per model request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Database file path
    #[arg(long = "db")]
    database: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct OvernightArgs {
    /// Target languages to process, comma separated
    #[arg(long, value_delimiter = ',', default_value = "pt")]
    languages: Vec<String>,

    /// Strings per model request
    #[arg(long, default_value_t = 15)]
    batch_size: usize,

    /// Cap on backlog strings per language
    #[arg(long)]
    max_translations: Option<u32>,

    /// Estimate the run without making any model calls
    #[arg(long)]
    dry_run: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Database file path
    #[arg(long = "db")]
    database: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct StatsArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Database file path
    #[arg(long = "db")]
    database: Option<PathBuf>,
}

/// LingoBatch - Rate-limited batch translation for web app i18n
///
/// Translates web application UI strings in bulk with the Gemini API
/// free tier, rotating across API keys and caching every result in a
/// local SQLite store.
#[derive(Parser, Debug)]
#[command(name = "lingobatch")]
#[command(version = "1.0.0")]
#[command(about = "Rate-limited batch translation for web app i18n")]
#[command(long_about = "LingoBatch translates web application UI strings in bulk while staying
inside the Gemini API free tier quotas.

EXAMPLES:
    lingobatch --text \"Save\" --text \"Cancel\" -t pt   # Translate two strings to Portuguese
    lingobatch --file strings.txt -t es                # Translate a file line by line
    lingobatch --missing -t fr --limit 100             # Drain up to 100 backlog strings
    lingobatch overnight --languages pt,es,fr          # Unattended run for three languages
    lingobatch overnight --dry-run                     # Estimate an overnight run
    lingobatch stats                                   # Show store coverage per language
    lingobatch completions bash > lingobatch.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file
    doesn't exist, a default one will be created automatically.

API KEYS:
    API keys are read from GEMINI_API_KEY, GEMINI_API_KEY_2,
    GEMINI_API_KEY_3 and GEMINI_API_KEY_4. Each key gets its own quota
    budget and the client rotates keys on quota errors.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// Logger writing colored lines to stderr and plain lines to the log file
struct CustomLogger {
    level: LevelFilter,
    log_file: parking_lot::Mutex<Option<File>>,
}

impl CustomLogger {
    fn new(level: LevelFilter, log_file: Option<File>) -> Self {
        CustomLogger {
            level,
            log_file: parking_lot::Mutex::new(log_file),
        }
    }

    fn init(level: LevelFilter, log_path: Option<&Path>) -> Result<(), SetLoggerError> {
        let log_file = log_path.and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

        let logger = Box::new(CustomLogger::new(level, log_file));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");

            let mut stderr = std::io::stderr();
            let color = Self::color_for_level(record.level());
            let _ = writeln!(stderr, "{}{} {}\x1B[0m", color, now, record.args());

            let mut log_file = self.log_file.lock();
            if let Some(file) = log_file.as_mut() {
                let _ = writeln!(
                    file,
                    "{} [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.args()
                );
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        let mut log_file = self.log_file.lock();
        if let Some(file) = log_file.as_mut() {
            let _ = file.flush();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "lingobatch", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        Some(Commands::Overnight(args)) => run_overnight(args).await,
        Some(Commands::Stats(args)) => run_stats(args).await,
        None => run_translate(cli.translate).await,
    }
}

/// Load the configuration, creating a default one if the file is missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?;
        Ok(config)
    } else {
        warn!(
            "Config file not found at '{}', creating default config.",
            config_path
        );

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        Ok(config)
    }
}

/// Initialize logging from the resolved config and optional CLI override
fn init_logging(config: &Config, cli_level: Option<CliLogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(cli_level) => level_filter(&cli_level.into()),
        None => level_filter(&config.log_level),
    };

    let log_path = if config.log_file.is_empty() {
        None
    } else {
        Some(PathBuf::from(&config.log_file))
    };

    CustomLogger::init(level, log_path.as_deref())
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))
}

/// Open the translation store configured in the config file
fn open_repository(config: &Config) -> Result<Repository> {
    let db = match &config.database_path {
        Some(path) => DatabaseConnection::new(path)?,
        None => DatabaseConnection::new_default()?,
    };
    Ok(Repository::new(db))
}

/// Build the batch translator from environment credentials
fn build_translator(config: &Config, repository: Repository) -> Result<BatchTranslator> {
    let keys = KeyRing::from_env()?;
    info!("Loaded {} API credential(s)", keys.len());

    let gemini = Gemini::new(
        keys,
        &config.translation.endpoint,
        &config.translation.model,
        config.translation.temperature,
        config.translation.max_output_tokens,
        config.translation.timeout_secs,
    )?;

    Ok(BatchTranslator::new(
        Arc::new(gemini),
        repository,
        config.clone(),
    ))
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let mut config = load_or_create_config(&args.config_path)?;

    if let Some(target) = &args.target_language {
        config.target_language = target.clone();
    }
    if let Some(source) = &args.source_language {
        config.source_language = source.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.translation.batch_size = batch_size;
    }
    if let Some(database) = &args.database {
        config.database_path = Some(database.clone());
    }

    config.validate().context("Configuration validation failed")?;
    init_logging(&config, args.log_level)?;

    let repository = open_repository(&config)?;
    let translator = build_translator(&config, repository.clone())?;

    // Resolve the strings to translate
    let texts: Vec<String> = if args.missing {
        let backlog = repository
            .find_untranslated(&config.source_language, &config.target_language, args.limit)
            .await?;
        info!(
            "Backlog for {}: {} untranslated strings",
            config.target_language,
            backlog.len()
        );
        backlog
    } else if let Some(file) = &args.file {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read input file: {:?}", file))?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    } else if !args.texts.is_empty() {
        args.texts.clone()
    } else {
        return Err(anyhow!(
            "Nothing to translate: pass --text, --file or --missing"
        ));
    };

    if texts.is_empty() {
        info!("Nothing to translate");
        return Ok(());
    }

    let requests: Vec<TranslationRequest> = texts
        .iter()
        .map(|text| {
            TranslationRequest::new(text.clone(), config.target_language.clone())
                .with_source_lang(config.source_language.clone())
                .with_category(config.translation.category.clone())
        })
        .collect();

    let outcome = translator.translate_batch(&requests).await?;

    // Emit results in input order
    if let Some(file) = &args.file {
        let output_path = translated_output_path(file, &config.target_language);
        let mut output = String::new();
        for text in &texts {
            output.push_str(outcome.translations.get(text).unwrap_or(text));
            output.push('\n');
        }
        std::fs::write(&output_path, output)
            .with_context(|| format!("Failed to write output file: {:?}", output_path))?;
        info!("Wrote translations to {:?}", output_path);
    } else {
        let mut stdout = std::io::stdout();
        for text in &texts {
            let translated = outcome.translations.get(text).map_or(text.as_str(), String::as_str);
            writeln!(stdout, "{}\t{}", text, translated)?;
        }
    }

    info!(
        "Done: {} cached, {} translated, {} failed, {} API calls",
        outcome.cache_hits,
        outcome.newly_translated(),
        outcome.failed.len(),
        outcome.api_calls
    );

    if !outcome.failed.is_empty() {
        warn!(
            "{} strings kept their source text: {}",
            outcome.failed.len(),
            outcome.failed.join(", ")
        );
    }

    Ok(())
}

/// Output path for file mode: strings.txt -> strings_pt.txt
fn translated_output_path(input: &Path, target_lang: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "translated".to_string());
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "txt".to_string());

    input.with_file_name(format!("{}_{}.{}", stem, target_lang, extension))
}

async fn run_overnight(args: OvernightArgs) -> Result<()> {
    let mut config = load_or_create_config(&args.config_path)?;
    if let Some(database) = &args.database {
        config.database_path = Some(database.clone());
    }
    config.translation.batch_size = args.batch_size;

    config.validate().context("Configuration validation failed")?;
    init_logging(&config, args.log_level)?;

    for lang in &args.languages {
        lingobatch::language_utils::validate_language_code(lang)?;
    }
    let mut languages = args.languages;
    languages.retain(|lang| {
        if language_codes_match(lang, &config.source_language) {
            warn!("Skipping {}: it is the source language", lang);
            return false;
        }
        true
    });

    let repository = open_repository(&config)?;
    let translator = build_translator(&config, repository)?;
    let runner = OvernightRunner::new(translator, config);

    let options = OvernightOptions {
        languages,
        batch_size: args.batch_size,
        max_translations: args.max_translations,
        dry_run: args.dry_run,
        ..OvernightOptions::default()
    };

    if !args.dry_run {
        runner.install_interrupt_handler();
    }
    runner.run(&options).await?;

    Ok(())
}

async fn run_stats(args: StatsArgs) -> Result<()> {
    let mut config = load_or_create_config(&args.config_path)?;
    if let Some(database) = &args.database {
        config.database_path = Some(database.clone());
    }
    init_logging(&config, None)?;

    let repository = open_repository(&config)?;
    let stats = repository.language_stats().await?;
    let db_stats = repository.database().stats()?;

    let mut stdout = std::io::stdout();
    writeln!(stdout, "Translation store: {}", db_stats)?;
    writeln!(stdout)?;
    writeln!(stdout, "{:<10} {:>12} {:>12}", "Language", "Translated", "Approved")?;
    for entry in stats {
        writeln!(
            stdout,
            "{:<10} {:>12} {:>12}",
            entry.target_lang, entry.translated, entry.approved
        )?;
    }

    Ok(())
}
