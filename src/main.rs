use std::error::Error as StdError;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use bitcoin::script::ScriptBuf;
use bitcoin::secp256k1::PublicKey;
use clap::{Parser, Subcommand, ValueEnum};
use ripemd::Ripemd160;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::error;

use ln_commitment::logging::{self, LoggerConfig};
use ln_commitment::{
    build_htlc_script, build_to_local_script, classify_htlc_script, classify_scriptpubkey,
    commitment_locktime, commitment_sequence, compute_fees_for_amounts, obscure_commitment_number,
    obscured_factor, ChannelConfig, CommitmentKeys, FeatureBits, FeatureHandshake, HtlcKind,
    InitFeatures, SideKeys,
};

type CliResult<T> = std::result::Result<T, Box<dyn StdError>>;

// ============================================================================
// CLI DEFINITION
// ============================================================================

#[derive(Parser)]
#[command(name = "ln-commitment")]
#[command(version)]
#[command(about = "Build and inspect BOLT3 commitment transaction parts", long_about = None)]
struct Cli {
    /// Channel parameters in TOML; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level with line numbers unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the obscured commitment number and its sequence/locktime encoding
    Obscured {
        #[arg(long, help = "Funder payment basepoint (hex)")]
        open_basepoint: String,
        #[arg(long, help = "Fundee payment basepoint (hex)")]
        accept_basepoint: String,
        #[arg(short = 'n', long)]
        commitment_number: u64,
    },
    /// Compute commitment and second-stage fees as JSON
    Fees {
        #[arg(long, help = "Override the configured feerate")]
        feerate_per_kw: Option<u32>,
        #[arg(long = "htlc", value_parser = parse_htlc_amount, help = "offered:<sat> or received:<sat>")]
        htlcs: Vec<(HtlcKind, u64)>,
    },
    /// Build an HTLC witness script
    HtlcScript {
        #[arg(long, value_enum)]
        kind: KindArg,
        #[arg(long)]
        local_htlc_pubkey: String,
        #[arg(long)]
        remote_htlc_pubkey: String,
        #[arg(long)]
        revocation_pubkey: String,
        #[arg(long, help = "SHA256 payment hash (hex)")]
        payment_hash: String,
        #[arg(long, default_value_t = 0)]
        cltv_expiry: u32,
    },
    /// Build the to_local witness script and its P2WSH scriptPubKey
    ToLocalScript {
        #[arg(long)]
        revocation_pubkey: String,
        #[arg(long)]
        delayed_pubkey: String,
        #[arg(long, help = "Override the configured to_self_delay")]
        to_self_delay: Option<u16>,
    },
    /// Classify a scriptPubKey or HTLC witness script
    Classify {
        #[arg(help = "Script (hex)")]
        script: String,
    },
    /// Run the feature handshake against a peer's init bitmaps
    Features {
        #[arg(long, default_value = "")]
        global: String,
        #[arg(long, default_value = "")]
        local: String,
    },
    /// Calculate SHA256 hash of hex input
    Sha256 {
        #[arg(short = 'd', long, help = "Input to hash (hex)")]
        input: String,
    },
    /// Calculate RIPEMD160(SHA256()) hash of hex input
    Hash160 {
        #[arg(short = 'd', long, help = "Input to hash (hex)")]
        input: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Offered,
    Received,
}

impl From<KindArg> for HtlcKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Offered => HtlcKind::Offered,
            KindArg::Received => HtlcKind::Received,
        }
    }
}

fn parse_htlc_amount(s: &str) -> std::result::Result<(HtlcKind, u64), String> {
    let (kind, amount) = s
        .split_once(':')
        .ok_or_else(|| format!("expected <kind>:<sat>, got {s}"))?;
    let kind = match kind {
        "offered" => HtlcKind::Offered,
        "received" => HtlcKind::Received,
        other => return Err(format!("unknown htlc kind {other}")),
    };
    let amount = amount.parse::<u64>().map_err(|e| e.to_string())?;
    Ok((kind, amount))
}

fn parse_pubkey(s: &str) -> CliResult<PublicKey> {
    Ok(PublicKey::from_str(s)?)
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run(cli: Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => ChannelConfig::load(path)?,
        None => ChannelConfig::default(),
    };

    match cli.command {
        Commands::Obscured {
            open_basepoint,
            accept_basepoint,
            commitment_number,
        } => {
            let factor =
                obscured_factor(&parse_pubkey(&open_basepoint)?, &parse_pubkey(&accept_basepoint)?);
            let obscured = obscure_commitment_number(factor, commitment_number);
            let out = json!({
                "factor": format!("{factor:012x}"),
                "obscured_number": format!("{obscured:012x}"),
                "sequence": format!("{:08x}", commitment_sequence(obscured).0),
                "locktime": format!("{:08x}", commitment_locktime(obscured).to_consensus_u32()),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Fees {
            feerate_per_kw,
            htlcs,
        } => {
            let fee_info = compute_fees_for_amounts(
                feerate_per_kw.unwrap_or(config.feerate_per_kw),
                config.dust_limit_satoshi,
                htlcs,
                &config.fee_weights(),
            );
            println!("{}", serde_json::to_string_pretty(&fee_info)?);
        }
        Commands::HtlcScript {
            kind,
            local_htlc_pubkey,
            remote_htlc_pubkey,
            revocation_pubkey,
            payment_hash,
            cltv_expiry,
        } => {
            let revocation_pubkey = parse_pubkey(&revocation_pubkey)?;
            let remote_htlc_pubkey = parse_pubkey(&remote_htlc_pubkey)?;
            // Only the HTLC and revocation keys appear in HTLC scripts.
            let keys = CommitmentKeys::new(
                SideKeys {
                    htlc_pubkey: parse_pubkey(&local_htlc_pubkey)?,
                    revocation_pubkey,
                    delayed_pubkey: revocation_pubkey,
                },
                SideKeys {
                    htlc_pubkey: remote_htlc_pubkey,
                    revocation_pubkey: remote_htlc_pubkey,
                    delayed_pubkey: remote_htlc_pubkey,
                },
            );
            let mut hash = [0u8; 32];
            hex::decode_to_slice(&payment_hash, &mut hash)?;
            let script = build_htlc_script(kind.into(), &keys, &hash, cltv_expiry);
            println!("{}", hex::encode(script.as_bytes()));
        }
        Commands::ToLocalScript {
            revocation_pubkey,
            delayed_pubkey,
            to_self_delay,
        } => {
            let script = build_to_local_script(
                &parse_pubkey(&revocation_pubkey)?,
                &parse_pubkey(&delayed_pubkey)?,
                u32::from(to_self_delay.unwrap_or(config.to_self_delay)),
            );
            let out = json!({
                "witness_script": hex::encode(script.as_bytes()),
                "script_pubkey": hex::encode(script.to_p2wsh().as_bytes()),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Classify { script } => {
            let script = ScriptBuf::from_bytes(hex::decode(script)?);
            let out = if let Some(kind) = classify_htlc_script(&script) {
                json!({ "htlc": kind })
            } else if let Some((kind, hash)) = classify_scriptpubkey(&script) {
                json!({ "scriptpubkey": kind, "hash": hex::encode(hash) })
            } else {
                json!({ "unrecognized": true })
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Features { global, local } => {
            let peer = InitFeatures {
                global: FeatureBits::from_bytes(hex::decode(global)?),
                local: FeatureBits::from_bytes(hex::decode(local)?),
            };
            let mut handshake = FeatureHandshake::new(config.supported_features());
            handshake.start()?;
            let mut routing_sync = false;
            let result = handshake.recv_init(peer, |_, sync| routing_sync = sync);
            let out = json!({
                "state": handshake.state().as_str(),
                "initial_routing_sync": routing_sync,
                "error": result.err().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Sha256 { input } => {
            let data = hex::decode(input)?;
            let result = Sha256::digest(&data);
            println!("SHA256 Hash: {:x}", result);
        }
        Commands::Hash160 { input } => {
            let data = hex::decode(input)?;
            let sha_result = Sha256::digest(&data);
            let ripemd_result = Ripemd160::digest(sha_result);
            println!("RIPEMD160(SHA256()) Hash: {:x}", ripemd_result);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logger = LoggerConfig::default();
    if cli.verbose {
        logger = logger.with_default_directive("debug").with_line_numbers(true);
    }
    logging::init(logger);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            ExitCode::FAILURE
        }
    }
}
