//! Command-line client for whoisit.

mod api_client;

use anyhow::{Context, Result};
use api_client::{ApiClient, UploadImageRequest};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "whoisit")]
#[command(about = "Upload images and inspect the whoisit identity index")]
#[command(version)]
struct Cli {
    /// Server base URL
    #[arg(
        long,
        global = true,
        env = "WHOISIT_SERVER",
        default_value = "http://127.0.0.1:8080"
    )]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a JPEG or PNG image and print its public URL
    Upload {
        /// Image file to upload
        path: PathBuf,
        /// File name recorded with the upload (default: the path's file name)
        #[arg(long)]
        file_name: Option<String>,
    },
    /// Identity index commands
    Identity {
        #[command(subcommand)]
        command: IdentityCommands,
    },
    /// Upload record commands
    UploadRecord {
        #[command(subcommand)]
        command: UploadRecordCommands,
    },
    /// Check server health and version
    Health,
}

#[derive(Subcommand)]
enum IdentityCommands {
    /// Show one identity and the images it appears in
    Show {
        /// Identity ID assigned by the recognition service
        identity_id: String,
    },
    /// List identities ordered by ID
    List {
        /// Maximum number of identities to return
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Subcommand)]
enum UploadRecordCommands {
    /// Show the record written for an upload
    Show {
        /// Upload ID (the UUID part of the image key)
        upload_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Cli { server, command } = Cli::parse();
    let client = ApiClient::new(&server)?;

    match command {
        Commands::Upload { path, file_name } => handle_upload(&client, &path, file_name).await,
        Commands::Identity { command } => handle_identity_command(&client, command).await,
        Commands::UploadRecord { command } => handle_upload_record_command(&client, command).await,
        Commands::Health => {
            let health = client.health().await?;
            println!("Status: {}", health.status);
            println!("Version: {}", health.version);
            Ok(())
        }
    }
}

/// Map a file path to the extension the server accepts.
fn upload_extension(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .with_context(|| format!("{} has no file extension", path.display()))?;
    match ext.as_str() {
        "jpg" | "jpeg" => Ok("jpg"),
        "png" => Ok("png"),
        other => anyhow::bail!("unsupported image type '{other}': only jpg and png are accepted"),
    }
}

async fn handle_upload(client: &ApiClient, path: &Path, file_name: Option<String>) -> Result<()> {
    let extension = upload_extension(path)?;
    let file_name = match file_name {
        Some(name) => name,
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?,
    };
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    tracing::debug!(path = %path.display(), size = data.len(), "uploading image");

    let response = client
        .upload_image(&UploadImageRequest {
            image_base64: STANDARD.encode(&data),
            file_name,
            extension: extension.to_string(),
        })
        .await?;
    println!("{}", response.url);
    Ok(())
}

async fn handle_identity_command(client: &ApiClient, command: IdentityCommands) -> Result<()> {
    match command {
        IdentityCommands::Show { identity_id } => {
            let identity = client.get_identity(&identity_id).await?;
            println!("Identity ID: {}", identity.identity_id);
            println!(
                "Name: {}",
                identity.display_name.as_deref().unwrap_or("<unknown>")
            );
            println!("Created: {}", identity.created_at);
            println!("Updated: {}", identity.updated_at);
            println!("Images ({}):", identity.image_urls.len());
            for url in &identity.image_urls {
                println!("  {url}");
            }
        }
        IdentityCommands::List { limit } => {
            let identities = client.list_identities(limit).await?;
            if identities.is_empty() {
                println!("No identities found.");
            } else {
                println!("{:<16} {:<32} {:>7}  Updated", "ID", "Name", "Images");
                println!("{}", "-".repeat(84));
                for identity in identities {
                    println!(
                        "{:<16} {:<32} {:>7}  {}",
                        identity.identity_id,
                        identity.display_name.as_deref().unwrap_or("-"),
                        identity.image_count,
                        identity.updated_at
                    );
                }
            }
        }
    }
    Ok(())
}

async fn handle_upload_record_command(
    client: &ApiClient,
    command: UploadRecordCommands,
) -> Result<()> {
    match command {
        UploadRecordCommands::Show { upload_id } => {
            let record = client.get_upload(&upload_id).await?;
            println!("Upload ID: {}", record.upload_id);
            println!("File name: {}", record.file_name);
            println!("Extension: {}", record.extension);
            println!("URL: {}", record.url);
            println!("Created: {}", record.created_at);
        }
    }
    Ok(())
}
