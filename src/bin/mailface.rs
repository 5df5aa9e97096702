use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mailface::auth::{token_manager::TokenManager, token_store};
use mailface::config::{Config, Paths, load_config, load_config_from};
use mailface::faces::detector::SeetaDetector;
use mailface::gmail::GmailClient;
use mailface::gmail::client::DEFAULT_API_BASE;
use mailface::{download, export, faces, upload};

#[derive(Parser)]
#[command(name = "mailface")]
#[command(about = "Gmail image attachments -> cropped faces -> web form", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/mailface/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download image attachments and write image_meta.json
    Download {
        /// Gmail search, e.g. "from:someone@example.com has:attachment is:unread"
        #[arg(long)]
        query: Option<String>,
    },

    /// Summarize unread mail into email_images.xlsx
    ExportExcel {
        #[arg(long)]
        query: Option<String>,

        /// Remove the UNREAD label from exported messages (needs gmail.modify scope)
        #[arg(long)]
        mark_read: bool,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Crop faces out of downloaded images and write cropped_meta.json
    Crop {
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Submit cropped faces to the web form
    Upload {
        #[arg(long)]
        input: Option<PathBuf>,

        /// Run the browser with a visible window
        #[arg(long)]
        show_browser: bool,
    },

    /// Download, crop and upload in one go
    Run {
        #[arg(long)]
        query: Option<String>,

        #[arg(long)]
        show_browser: bool,
    },

    /// Store the OAuth client secret in keyring
    SetClientSecret {
        #[arg(long)]
        client_id: String,
    },
}

fn gmail_client(cfg: &Config) -> Result<GmailClient> {
    let token_mgr = TokenManager::from_config(cfg)?;
    let access = token_mgr.get_access_token()?;
    let base = cfg.gmail_api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
    Ok(GmailClient::with_base(base, access)?.max_messages(cfg.max_messages))
}

/// Cleared on Ctrl-C so the upload loop can stop between items.
fn interrupt_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;
    Ok(running)
}

fn load_cfg(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config_from(p),
        None => load_config(),
    }
    .map_err(|e| anyhow!("Configuration error: {e}"))
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let cfg_path = cli.config.as_deref();

    match cli.cmd {
        Command::SetClientSecret { client_id } => {
            eprintln!("Paste client secret (end with Ctrl-D):");
            let mut secret = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut secret)?;
            token_store::save_client_secret(&client_id, secret.trim())?;
            println!("Saved client secret for client_id {client_id}");
            Ok(())
        }

        Command::Download { query } => {
            let cfg = load_cfg(cfg_path)?;
            let paths = Paths::from_config(&cfg);
            let gmail = gmail_client(&cfg)?;
            let query = query.as_deref().unwrap_or(download::DEFAULT_QUERY);
            download::run_download(&gmail, query, &paths)?;
            Ok(())
        }

        Command::ExportExcel {
            query,
            mark_read,
            output,
        } => {
            let cfg = load_cfg(cfg_path)?;
            if mark_read && cfg.scope().ends_with("gmail.readonly") {
                return Err(anyhow!(
                    "--mark-read needs the gmail.modify scope; set scope in the config"
                ));
            }
            let paths = Paths::from_config(&cfg);
            let gmail = gmail_client(&cfg)?;
            let query = query.as_deref().unwrap_or(export::DEFAULT_QUERY);
            let output = output.unwrap_or(paths.excel);
            export::run_export(&gmail, query, &paths.download_dir, &output, mark_read)?;
            Ok(())
        }

        Command::Crop { input, output } => {
            let cfg = load_cfg(cfg_path)?;
            let mut paths = Paths::from_config(&cfg);
            if let Some(p) = input {
                paths.image_meta = p;
            }
            if let Some(p) = output {
                paths.cropped_meta = p;
            }
            let mut detector = SeetaDetector::from_config(&cfg.faces)?;
            faces::run_crop(&mut detector, &paths)?;
            Ok(())
        }

        Command::Upload {
            input,
            show_browser,
        } => {
            let cfg = load_cfg(cfg_path)?;
            let input = input.unwrap_or_else(|| Paths::from_config(&cfg).cropped_meta);
            let mut up = cfg.upload;
            up.headless &= !show_browser;
            let running = interrupt_flag()?;
            upload::run_upload(&up, &input, &running)?;
            Ok(())
        }

        Command::Run {
            query,
            show_browser,
        } => {
            let cfg = load_cfg(cfg_path)?;
            let paths = Paths::from_config(&cfg);
            let running = interrupt_flag()?;
            // load the model first so a bad path fails before any mail is touched
            let mut detector = SeetaDetector::from_config(&cfg.faces)?;

            let gmail = gmail_client(&cfg)?;
            let query = query.as_deref().unwrap_or(download::DEFAULT_QUERY);
            download::run_download(&gmail, query, &paths)?;

            faces::run_crop(&mut detector, &paths)?;

            let mut up = cfg.upload.clone();
            up.headless &= !show_browser;
            upload::run_upload(&up, &paths.cropped_meta, &running)?;
            Ok(())
        }
    }
}
