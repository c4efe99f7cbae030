use anyhow::{bail, Context, Result};
use clap::Parser;
use eip712_path::config::{EngineConfig, Preset};
use eip712_path::eip712::{get_pre_image, stream_typed_data, Eip712PreImage, TypedData};
use eip712_path::error::{ErrorCode, ErrorReport};
use eip712_path::utils::logging;
use eip712_path::{log_info, Eip712Error};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

/// Hash EIP-712 typed data by streaming it through the path engine
#[derive(Debug, Parser)]
#[command(name = "eip712-path", version)]
struct Cli {
    /// Typed-data JSON document, `-` reads stdin
    #[arg(default_value = "-")]
    input: String,

    /// Print the digests as JSON
    #[arg(long)]
    json: bool,

    /// Log every traversal step to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Capacity limits (standard, constrained, relaxed)
    #[arg(long, default_value = "standard")]
    preset: Preset,

    /// Cross-check the streamed digests against the reference encoder
    #[arg(long)]
    verify: bool,
}

#[derive(Debug, Serialize)]
struct DigestReport {
    primary_type: String,
    domain_hash: String,
    message_hash: String,
    signing_hash: String,
}

impl DigestReport {
    fn new(primary_type: &str, pre_image: &Eip712PreImage) -> Self {
        Self {
            primary_type: primary_type.to_string(),
            domain_hash: format!("0x{}", hex::encode(pre_image.domain_separator)),
            message_hash: format!("0x{}", hex::encode(pre_image.struct_hash)),
            signing_hash: format!("0x{}", hex::encode(pre_image.final_hash)),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.verbose {
        logging::enable_debug();
    }

    match run(&cli) {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(out) => println!("{}", out),
                    Err(e) => {
                        eprintln!("error: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                println!("Primary type:   {}", report.primary_type);
                println!("Domain hash:    {}", report.domain_hash);
                println!("Message hash:   {}", report.message_hash);
                println!("Signing hash:   {}", report.signing_hash);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            if cli.json {
                let report = match e.downcast_ref::<Eip712Error>() {
                    Some(err) => ErrorReport::from(err),
                    None => ErrorReport {
                        code: ErrorCode::InvalidInput,
                        message: format!("{:#}", e),
                    },
                };
                if let Ok(out) = serde_json::to_string(&report) {
                    println!("{}", out);
                }
            } else {
                eprintln!("error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<DigestReport> {
    let payload = read_input(&cli.input)?;
    let config = EngineConfig::from_env(EngineConfig::with_preset(cli.preset))?;
    let typed_data = TypedData::from_json(&payload)?;

    let pre_image = stream_typed_data(&typed_data, config)?;
    if cli.verify {
        let reference = get_pre_image(&typed_data)?;
        if reference != pre_image {
            bail!(
                "streamed digest 0x{} differs from reference 0x{}",
                hex::encode(pre_image.final_hash),
                hex::encode(reference.final_hash)
            );
        }
        log_info!("cli", "reference digests match", primary_type = typed_data.primary_type);
    }

    Ok(DigestReport::new(&typed_data.primary_type, &pre_image))
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("reading typed data from stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(input).with_context(|| format!("reading {}", input))
    }
}
