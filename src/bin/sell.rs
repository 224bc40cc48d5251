use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use listing_flow::{
    config::AppConfig,
    models::item::{FieldValue, ItemField},
    models::storefront::Credentials,
    services::job_client::{Asset, HttpJobClient},
    workflow::{JobController, JobState},
};

/// Upload a video, review the extracted items and optionally publish them.
#[derive(Debug, Parser)]
#[command(name = "sell", version)]
struct Cli {
    /// Video to analyse
    video: PathBuf,

    /// Backend base URL (overrides BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,

    /// Edit an item before publishing, e.g. `0:estimated_price=25`
    #[arg(long = "set", value_name = "INDEX:FIELD=VALUE", value_parser = parse_edit)]
    edits: Vec<Edit>,

    /// Delete the item at INDEX; repeated deletes use the list as it is after the previous one
    #[arg(long = "delete", value_name = "INDEX")]
    deletes: Vec<usize>,

    /// Publish the items to the storefront under this email (password from SELL_PASSWORD)
    #[arg(long)]
    publish_email: Option<String>,
}

#[derive(Debug, Clone)]
struct Edit {
    index: usize,
    field: ItemField,
    value: FieldValue,
}

fn parse_edit(raw: &str) -> Result<Edit, String> {
    let (index, rest) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected INDEX:FIELD=VALUE, got {raw:?}"))?;
    let (field, value) = rest
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE after the index, got {rest:?}"))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid index {index:?}: {e}"))?;
    let field = field
        .trim()
        .parse::<ItemField>()
        .map_err(|_| format!("unknown field {field:?}"))?;
    let value = field.parse_value(value).map_err(|e| e.to_string())?;
    Ok(Edit {
        index,
        field,
        value,
    })
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env().expect("Failed to load configuration from environment");
    if let Some(url) = cli.backend_url.clone() {
        config.backend_url = url;
    }

    let bytes = match std::fs::read(&cli.video) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(path = %cli.video.display(), error = %e, "Cannot read video");
            return ExitCode::FAILURE;
        }
    };
    let filename = cli
        .video
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let asset = Asset::new(filename, bytes).with_content_type(content_type_for(&cli.video));

    let client = HttpJobClient::from_config(&config).expect("Failed to build HTTP client");
    let mut controller = JobController::new(Arc::new(client), config.poll_settings());

    if let Err(e) = controller.submit(asset).await {
        tracing::error!(error = %e, "Submission failed");
        return ExitCode::FAILURE;
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    while let JobState::Processing { .. } = controller.state() {
        tokio::select! {
            applied = controller.next_event() => {
                if !applied {
                    break;
                }
                if let JobState::Processing { job_id, progress } = controller.state() {
                    tracing::info!(job_id = %job_id, progress, "Processing");
                }
            }
            _ = &mut ctrl_c => {
                tracing::warn!("Interrupted, cancelling job");
                if let Err(e) = controller.cancel() {
                    tracing::error!(error = %e, "Cancel failed");
                }
            }
        }
    }

    if !matches!(controller.state(), JobState::Items { .. }) {
        let reason = controller.state().error().unwrap_or("Processing did not complete");
        tracing::error!(state = %controller.state().status(), reason, "Job did not produce items");
        return ExitCode::FAILURE;
    }

    for edit in &cli.edits {
        if let Err(e) = controller
            .update_field(edit.index, edit.field, edit.value.clone())
            .await
        {
            tracing::warn!(index = edit.index, field = %edit.field, error = %e, "Edit not applied");
        }
    }
    for &index in &cli.deletes {
        if let Err(e) = controller.delete_item(index).await {
            tracing::warn!(index, error = %e, "Delete not applied");
        }
    }

    if let Some(items) = controller.state().items() {
        tracing::info!(
            items = items.len(),
            total_estimated_value = items.total_estimated_value(),
            "Extracted items"
        );
        match serde_json::to_string_pretty(&items.to_vec()) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!(error = %e, "Cannot render items"),
        }
    }

    let Some(email) = cli.publish_email else {
        return ExitCode::SUCCESS;
    };
    let password = std::env::var("SELL_PASSWORD").unwrap_or_default();
    match controller.publish(Credentials::new(email, password)).await {
        Ok(storefront) => {
            tracing::info!(
                posted = storefront.posted_count,
                failed = storefront.failed_count,
                income = storefront.total_potential_income,
                "Storefront published"
            );
            match serde_json::to_string_pretty(&storefront) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::error!(error = %e, "Cannot render storefront"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(state = %controller.state().status(), error = %e, "Publish failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_edit() {
        let edit = parse_edit("2:estimated_price=25").unwrap();
        assert_eq!(edit.index, 2);
        assert_eq!(edit.field, ItemField::EstimatedPrice);
        assert_eq!(edit.value, FieldValue::Number(25.0));
    }

    #[test]
    fn keeps_text_after_first_equals() {
        let edit = parse_edit("0:name=Lamp = brass").unwrap();
        assert_eq!(edit.value, FieldValue::Text("Lamp = brass".to_string()));
    }

    #[test]
    fn rejects_malformed_edits() {
        assert!(parse_edit("estimated_price=25").is_err());
        assert!(parse_edit("x:name=Lamp").is_err());
        assert!(parse_edit("0:colour=red").is_err());
        assert!(parse_edit("0:confidence=high").is_err());
    }

    #[test]
    fn guesses_video_content_type() {
        assert_eq!(content_type_for(Path::new("room.MP4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("clip.bin")), "application/octet-stream");
    }
}
