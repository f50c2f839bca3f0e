//! pado binary: register data and retrieve it through threshold tasks
//!
//! ```bash
//! pado --gateway http://127.0.0.1:3000 --key-file wallet.key submit-data --file notes.txt --price 100
//! pado --key-file wallet.key retrieve <data-id> --out notes.txt
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use pado_client::{ClientBuilder, DevSigner, PadoClient, RetrievalTicket, Signer};
use pado_core::constants::DATA_SHARING_TASK;
use pado_core::{ClientConfig, DataStatus, PaymentSymbol, PriceInfo};

#[derive(Parser, Debug)]
#[command(name = "pado")]
#[command(about = "Threshold data-sharing client")]
struct Args {
    /// Client config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gateway URL, overrides the config file
    #[arg(long, global = true)]
    gateway: Option<String>,

    /// Cipher sidecar URL, overrides the config file
    #[arg(long, global = true)]
    cipher: Option<String>,

    /// Wallet secret as hex
    #[arg(long, global = true, conflicts_with = "key_file")]
    key: Option<String>,

    /// File holding the wallet secret as hex
    #[arg(long, global = true)]
    key_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a devnet config file
    InitConfig {
        #[arg(long, default_value = "pado.json")]
        out: PathBuf,
    },

    /// Generate a development wallet key file
    NewWallet {
        #[arg(long, default_value = "wallet.key")]
        out: PathBuf,
    },

    /// Encrypt a file and register it
    SubmitData {
        #[arg(long)]
        file: PathBuf,

        /// Price in the token's smallest unit
        #[arg(long)]
        price: u64,

        #[arg(long, default_value = "wAR")]
        symbol: PaymentSymbol,

        /// Extra tag entries as key=value
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
    },

    /// List registered data
    ListData {
        #[arg(long, default_value = "Valid")]
        status: DataStatus,
    },

    /// Show one data record
    GetData { data_id: String },

    /// Pay for a retrieval task and save its ticket
    SubmitTask {
        data_id: String,

        /// Where to write the ticket; it holds the session private key
        #[arg(long, default_value = "ticket.json")]
        ticket_out: PathBuf,

        #[arg(long, default_value = DATA_SHARING_TASK)]
        task_type: String,
    },

    /// Wait for a ticket's task and decrypt the result
    GetResult {
        #[arg(long, default_value = "ticket.json")]
        ticket: PathBuf,

        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Output file, stdout if omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Submit a task and wait for the result in one go
    Retrieve {
        data_id: String,

        #[arg(long)]
        timeout_ms: Option<u64>,

        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long, default_value = DATA_SHARING_TASK)]
        task_type: String,
    },
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {:?}", s))
}

fn load_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &args.gateway {
        config.gateway_url = url.trim_end_matches('/').to_string();
    }
    if let Some(url) = &args.cipher {
        config = config.with_cipher_url(url.as_str());
    }
    Ok(config)
}

fn connect(args: &Args) -> anyhow::Result<PadoClient> {
    Ok(ClientBuilder::new(load_config(args)?).build()?)
}

fn load_wallet(args: &Args) -> anyhow::Result<DevSigner> {
    match (&args.key, &args.key_file) {
        (Some(key), _) => Ok(DevSigner::from_hex(key)?),
        (None, Some(path)) => DevSigner::load(path)
            .with_context(|| format!("loading wallet from {}", path.display())),
        (None, None) => anyhow::bail!("a wallet is required: pass --key or --key-file"),
    }
}

fn write_output(out: Option<&PathBuf>, data: &[u8]) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, data)?;
            tracing::info!(path = %path.display(), bytes = data.len(), "Wrote result");
        }
        None => std::io::stdout().write_all(data)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pado_client=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match &args.command {
        Command::InitConfig { out } => {
            let config = load_config(&args)?;
            config.save(out)?;
            println!("[OK] Wrote config to {}", out.display());
        }
        Command::NewWallet { out } => {
            let wallet = DevSigner::generate();
            std::fs::write(out, wallet.secret_hex())?;
            println!("[OK] Wallet {} written to {}", wallet.address(), out.display());
        }
        Command::SubmitData {
            file,
            price,
            symbol,
            tags,
        } => {
            let client = connect(&args)?;
            let wallet = load_wallet(&args)?;
            let data = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;

            let mut data_tag = Map::new();
            if let Some(name) = file.file_name() {
                data_tag.insert("filename".into(), Value::String(name.to_string_lossy().into_owned()));
            }
            for (key, value) in tags {
                data_tag.insert(key.clone(), Value::String(value.clone()));
            }

            let data_id = client
                .submit_data(&data, data_tag, PriceInfo::new(*symbol, *price), &wallet)
                .await?;
            println!("{}", data_id);
        }
        Command::ListData { status } => {
            let client = connect(&args)?;
            let records = client.list_data(*status).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::GetData { data_id } => {
            let client = connect(&args)?;
            let record = client.get_data(data_id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::SubmitTask {
            data_id,
            ticket_out,
            task_type,
        } => {
            let client = connect(&args)?;
            let wallet = load_wallet(&args)?;
            let ticket = client.submit_task(data_id, &wallet, task_type).await?;
            std::fs::write(ticket_out, serde_json::to_string_pretty(&ticket)?)?;
            println!(
                "[OK] Task {} submitted, paid {} {}; ticket saved to {}",
                ticket.task_id,
                ticket.fee,
                ticket.symbol,
                ticket_out.display()
            );
        }
        Command::GetResult {
            ticket,
            timeout_ms,
            out,
        } => {
            let contents = std::fs::read_to_string(ticket)
                .with_context(|| format!("reading ticket {}", ticket.display()))?;
            let ticket: RetrievalTicket = serde_json::from_str(&contents)?;
            let client = connect(&args)?;
            let data = client
                .get_result(&ticket, timeout_ms.map(Duration::from_millis))
                .await?;
            write_output(out.as_ref(), &data)?;
        }
        Command::Retrieve {
            data_id,
            timeout_ms,
            out,
            task_type,
        } => {
            let client = connect(&args)?;
            let wallet = load_wallet(&args)?;
            let data = client
                .retrieve(data_id, &wallet, task_type, timeout_ms.map(Duration::from_millis))
                .await?;
            write_output(out.as_ref(), &data)?;
        }
    }

    Ok(())
}
