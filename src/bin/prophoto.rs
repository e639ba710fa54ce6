//! CLI for ProPhoto - professional headshots from casual photos.

use clap::{Args, Parser, Subcommand};
use prophoto::{
    Config, FileSelection, GeminiTransformer, ProPhotoError, Session, SessionStatus, Transformer,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prophoto")]
#[command(about = "Turn a casual photo into a professional headshot via Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a photo into a professional headshot
    Transform(TransformArgs),

    /// Verify that the API key is accepted
    Check,
}

#[derive(Args)]
struct TransformArgs {
    /// The photo to transform (JPG, PNG, WEBP)
    input: PathBuf,

    /// Directory to save the headshot into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Also save the uploaded photo next to the result
    #[arg(long)]
    save_original: bool,

    /// Give up on the request after this many seconds (default: wait indefinitely)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prophoto=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Transform(args) => transform(args, cli.json).await,
        Commands::Check => check(cli.json).await,
    }
}

fn status_line(status: SessionStatus) -> Option<&'static str> {
    match status {
        SessionStatus::Reading => Some("Reading your photo..."),
        SessionStatus::Generating => Some("Crafting your professional look..."),
        _ => None,
    }
}

async fn transform(args: TransformArgs, json_output: bool) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    let session = Session::new(GeminiTransformer::builder(config).build()?);

    let mut status_rx = session.subscribe();
    let progress = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = *status_rx.borrow_and_update();
            if let Some(line) = status_line(status) {
                eprintln!("{line}");
            }
        }
    });

    let outcome = tokio::select! {
        outcome = session.select_file(FileSelection::path(&args.input)) => outcome,
        _ = tokio::signal::ctrl_c() => {
            session.reset();
            Err(ProPhotoError::Cancelled)
        }
    };
    progress.abort();

    let snapshot = session.snapshot();
    let result = match (outcome, snapshot.result) {
        (Ok(()), Some(result)) => result,
        (Err(ProPhotoError::Cancelled), _) => anyhow::bail!("cancelled"),
        (Err(e), _) => {
            let message = snapshot
                .error
                .unwrap_or_else(|| e.user_message().to_string());
            if json_output {
                let report = serde_json::json!({
                    "success": false,
                    "status": snapshot.status,
                    "error": message,
                    "kind": e.kind(),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            anyhow::bail!(message);
        }
        (Ok(()), None) => anyhow::bail!("session finished without a result"),
    };

    std::fs::create_dir_all(&args.output_dir)?;
    let Some(saved) = session.download_result(&args.output_dir).await? else {
        anyhow::bail!("no result to save");
    };

    let original_path = if args.save_original {
        let extension = result
            .original()
            .media_type()
            .and_then(prophoto::ImageFormat::from_mime_type)
            .map(|f| f.extension())
            .unwrap_or("img");
        let path = args.output_dir.join(format!("original.{extension}"));
        std::fs::write(&path, result.original().decode()?)?;
        Some(path)
    } else {
        None
    };

    let transformed_size = result.transformed().decode()?.len();
    if json_output {
        let report = serde_json::json!({
            "success": true,
            "status": snapshot.status,
            "input": args.input.display().to_string(),
            "output": saved.display().to_string(),
            "original_output": original_path.as_ref().map(|p| p.display().to_string()),
            "size_bytes": transformed_size,
            "format": result.transformed_format().map(|f| f.extension()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Professional headshot: {} ({} bytes)",
            saved.display(),
            transformed_size
        );
        if let Some(path) = original_path {
            println!("Original: {}", path.display());
        }
    }

    Ok(())
}

async fn check(json_output: bool) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let model = config.model();
    let transformer = GeminiTransformer::builder(config).build()?;
    let outcome = transformer.health_check().await;

    if json_output {
        let report = serde_json::json!({
            "provider": transformer.name(),
            "model": model.as_str(),
            "ok": outcome.is_ok(),
            "error": outcome.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &outcome {
            Ok(()) => println!("✓ {} ({}) is reachable", transformer.name(), model),
            Err(e) => println!("✗ {} ({}): {}", transformer.name(), model, e),
        }
    }

    outcome.map_err(Into::into)
}
