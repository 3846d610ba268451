use std::path::PathBuf;

use toxiscan::classify::{ClassificationResult, ClassifyRequest, HttpClassifier};
use toxiscan::cli::{Cli, Commands, ConfigAction};
use toxiscan::config::Config;
use toxiscan::error::{Result, ToxiscanError};
use toxiscan::page::PageDocument;
use toxiscan::pipeline::{CommentCandidate, DetectionPipeline};
use toxiscan::platform::Platform;
use toxiscan::settings::{AuthProvider, TokenAuthProvider};
use toxiscan::stats::StatsCollector;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan {
            file,
            platform,
            json,
        } => cmd_scan(cli.config, &file, platform, json)?,
        Commands::Batch {
            file,
            platform,
            json,
        } => cmd_batch(cli.config, &file, &platform, json)?,
        Commands::Config { action } => cmd_config(cli.config, action)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "toxiscan=debug" } else { "toxiscan=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_scan(
    config_path: Option<PathBuf>,
    file: &std::path::Path,
    platform: Option<String>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;

    let mut doc = PageDocument::load(file)?;
    if let Some(name) = &platform {
        let platform = Platform::from_name(name).ok_or_else(|| {
            ToxiscanError::Config(format!("Unknown platform '{name}'"))
        })?;
        // Re-home the snapshot so pipeline construction picks the override
        doc = rehost(doc, platform);
    }

    let classifier = HttpClassifier::from_config(&config.api)?;
    let doc = std::sync::Arc::new(std::sync::Mutex::new(doc));
    let mut pipeline =
        DetectionPipeline::new(std::sync::Arc::clone(&doc), classifier, config.pipeline_options());

    let mut settings = config.settings_for(pipeline.platform());
    let auth = TokenAuthProvider::new(config.api.token());
    settings.authenticated = auth.is_authenticated();

    let runtime = tokio::runtime::Runtime::new().map_err(|e| ToxiscanError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })?;
    let outcomes = runtime.block_on(pipeline.sweep_once(&settings));

    let mut stats = StatsCollector::new();
    for (_, outcome) in &outcomes {
        if let Ok(result) = outcome {
            stats.record_result(result);
        }
    }

    if json {
        print_scan_json(&outcomes)?;
    } else {
        print_scan_table(&outcomes);
        let counts = stats.counts();
        println!(
            "\n{} comments: {} flagged ({} hate), {} clean",
            counts.total(),
            counts.flagged(),
            counts.hate,
            counts.clean
        );
    }

    Ok(())
}

fn rehost(doc: PageDocument, platform: Platform) -> PageDocument {
    let mut snapshot = doc.to_snapshot();
    snapshot.host = match platform {
        Platform::Facebook => "www.facebook.com".to_string(),
        Platform::Youtube => "www.youtube.com".to_string(),
        Platform::Tiktok => "www.tiktok.com".to_string(),
        Platform::Generic | Platform::Unknown => "generic.invalid".to_string(),
    };
    PageDocument::from_snapshot(snapshot)
}

type ScanOutcome = (
    CommentCandidate,
    std::result::Result<ClassificationResult, toxiscan::classify::ClassificationError>,
);

fn print_scan_table(outcomes: &[ScanOutcome]) {
    println!("{:<24} {:<10} {:>6}  TEXT", "IDENTITY", "CATEGORY", "CONF");
    for (candidate, outcome) in outcomes {
        let preview: String = candidate.text.chars().take(48).collect();
        match outcome {
            Ok(result) => println!(
                "{:<24} {:<10} {:>6.2}  {}",
                truncate(&candidate.identity, 24),
                result.category.as_str(),
                result.confidence,
                preview
            ),
            Err(error) => println!(
                "{:<24} {:<10} {:>6}  {}",
                truncate(&candidate.identity, 24),
                format!("error:{}", error.kind()),
                "-",
                preview
            ),
        }
    }
}

fn print_scan_json(outcomes: &[ScanOutcome]) -> Result<()> {
    let entries: Vec<serde_json::Value> = outcomes
        .iter()
        .map(|(candidate, outcome)| match outcome {
            Ok(result) => serde_json::json!({
                "identity": candidate.identity,
                "text": candidate.text,
                "result": result,
            }),
            Err(error) => serde_json::json!({
                "identity": candidate.identity,
                "text": candidate.text,
                "error": { "kind": error.kind(), "message": error.to_string() },
            }),
        })
        .collect();

    let out = serde_json::to_string_pretty(&entries).map_err(|e| ToxiscanError::Json {
        source: e,
        context: "Failed to serialize scan results".to_string(),
    })?;
    println!("{out}");
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max - 1).chain(std::iter::once('…')).collect()
    }
}

fn cmd_batch(
    config_path: Option<PathBuf>,
    file: &std::path::Path,
    platform: &str,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let platform = Platform::from_name(platform)
        .ok_or_else(|| ToxiscanError::Config(format!("Unknown platform '{platform}'")))?;

    let content = std::fs::read_to_string(file).map_err(|e| ToxiscanError::Io {
        source: e,
        context: format!("Failed to read batch file: {:?}", file),
    })?;

    let min_len = config.detection.min_comment_length;
    let requests: Vec<ClassifyRequest> = content
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() >= min_len)
        .map(|line| ClassifyRequest::new(line, platform))
        .collect();

    if requests.is_empty() {
        println!("No comments of at least {min_len} characters in {file:?}");
        return Ok(());
    }

    tracing::info!("Submitting {} comments for bulk analysis", requests.len());

    let classifier = HttpClassifier::from_config(&config.api)?;
    let runtime = tokio::runtime::Runtime::new().map_err(|e| ToxiscanError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })?;
    let results = runtime.block_on(classifier.classify_batch(&requests))?;

    if json {
        let entries: Vec<serde_json::Value> = requests
            .iter()
            .zip(&results)
            .map(|(request, result)| {
                serde_json::json!({ "text": request.text, "result": result })
            })
            .collect();
        let out = serde_json::to_string_pretty(&entries).map_err(|e| ToxiscanError::Json {
            source: e,
            context: "Failed to serialize batch results".to_string(),
        })?;
        println!("{out}");
    } else {
        println!("{:<10} {:>6}  TEXT", "CATEGORY", "CONF");
        for (request, result) in requests.iter().zip(&results) {
            let preview: String = request.text.chars().take(60).collect();
            println!(
                "{:<10} {:>6.2}  {}",
                result.category.as_str(),
                result.confidence,
                preview
            );
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| ToxiscanError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = Config::default_path()?;

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ToxiscanError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
            println!("  Set the API token via the {} environment variable", config.api.api_key_env);
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'toxiscan config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        return Ok(config);
    }

    Config::load(&path)
}
