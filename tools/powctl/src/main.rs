mod chain_file;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use consensus::retarget::gravity_well;
use consensus::{
    ChainNode, ConsensusParams, H256, Network, Target, WellWindow, calculate_next_work_required,
    check_proof_of_work, next_work_required,
};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "powctl", version, about = "Proof-of-work and retargeting tooling")]
struct Cli {
    /// Network whose deployed parameters apply.
    #[arg(long, env = "POW_NETWORK", default_value = "main", global = true)]
    network: Network,
    /// JSON parameter file overriding the network defaults.
    #[arg(long, env = "POW_PARAMS", global = true)]
    params: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a block hash against compact bits.
    #[command(name = "check-pow")]
    CheckPow {
        #[arg(long)]
        hash: String,
        #[arg(long)]
        bits: String,
    },
    /// Bits required of the block after the tip of a header file.
    #[command(name = "next-work")]
    NextWork {
        #[arg(long)]
        chain: PathBuf,
    },
    /// Fixed-window retarget of the tip of a header file.
    #[command(name = "legacy-retarget")]
    LegacyRetarget {
        #[arg(long)]
        chain: PathBuf,
        #[arg(long)]
        first_block_time: i64,
    },
    /// Gravity Well walk summary for the tip of a header file.
    #[command(name = "well-report")]
    WellReport {
        #[arg(long)]
        chain: PathBuf,
        #[arg(long)]
        spacing: Option<i64>,
        #[arg(long)]
        min_window: Option<u64>,
        #[arg(long)]
        max_window: Option<u64>,
    },
    #[command(name = "decode-compact")]
    DecodeCompact { bits: String },
    #[command(name = "encode-compact")]
    EncodeCompact { target: String },
}

#[derive(Serialize)]
struct DecodedOutput {
    bits: String,
    target: String,
    negative: bool,
    overflow: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();
    let params = load_params(cli.network, cli.params.as_deref())?;
    debug!(network = %cli.network, ?params, "consensus parameters");

    match cli.command {
        Commands::CheckPow { hash, bits } => cmd_check_pow(&hash, &bits, &params),
        Commands::NextWork { chain } => cmd_next_work(&chain, &params),
        Commands::LegacyRetarget {
            chain,
            first_block_time,
        } => cmd_legacy_retarget(&chain, first_block_time, &params),
        Commands::WellReport {
            chain,
            spacing,
            min_window,
            max_window,
        } => {
            let mut window = match spacing {
                Some(spacing) if spacing > 0 => WellWindow::from_spacing(spacing),
                Some(_) => bail!("spacing must be positive"),
                None => WellWindow::deployed(),
            };
            if let Some(min_window) = min_window {
                window.min_window = min_window;
            }
            if let Some(max_window) = max_window {
                window.max_window = max_window;
            }
            cmd_well_report(&chain, &window, &params)
        }
        Commands::DecodeCompact { bits } => cmd_decode_compact(&bits),
        Commands::EncodeCompact { target } => cmd_encode_compact(&target),
    }
}

fn load_params(network: Network, path: Option<&Path>) -> Result<ConsensusParams> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let params = ConsensusParams::from_json(&json)
                .with_context(|| format!("invalid parameter file {}", path.display()))?;
            info!(path = %path.display(), "loaded parameter override");
            Ok(params)
        }
        None => Ok(network.params()),
    }
}

/// Parses compact bits written as hex, with or without a `0x` prefix.
pub(crate) fn parse_bits(text: &str) -> Result<u32> {
    let digits = text.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    u32::from_str_radix(digits, 16).with_context(|| format!("invalid compact bits {text:?}"))
}

fn parse_hash(text: &str) -> Result<H256> {
    let target = Target::from_hex(text.trim()).context("block hash must be hex")?;
    Ok(H256::from(target.to_be_bytes()))
}

fn cmd_check_pow(hash: &str, bits: &str, params: &ConsensusParams) -> Result<()> {
    let hash = parse_hash(hash)?;
    let bits = parse_bits(bits)?;
    if !check_proof_of_work(&hash, bits, params) {
        bail!("proof of work rejected for bits {bits:#010x}");
    }
    println!("ok");
    Ok(())
}

fn cmd_next_work(chain: &Path, params: &ConsensusParams) -> Result<()> {
    let index = chain_file::load(chain)?;
    let tip = index.tip().context("header file holds no tip")?;
    let bits = next_work_required(&tip, params);
    info!(height = tip.height() + 1, bits = %format!("{bits:#010x}"), "next work required");
    println!("{bits:#010x}");
    Ok(())
}

fn cmd_legacy_retarget(chain: &Path, first_block_time: i64, params: &ConsensusParams) -> Result<()> {
    let index = chain_file::load(chain)?;
    let tip = index.tip().context("header file holds no tip")?;
    let bits = calculate_next_work_required(&tip, first_block_time, params);
    println!("{bits:#010x}");
    Ok(())
}

fn cmd_well_report(chain: &Path, window: &WellWindow, params: &ConsensusParams) -> Result<()> {
    let index = chain_file::load(chain)?;
    let tip = index.tip().context("header file holds no tip")?;
    let report = gravity_well::gravity_well_report(Some(&tip), window, params);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_decode_compact(bits: &str) -> Result<()> {
    let bits = parse_bits(bits)?;
    let decoded = Target::from_compact(bits);
    let output = DecodedOutput {
        bits: format!("{bits:#010x}"),
        target: decoded.target.to_string(),
        negative: decoded.negative,
        overflow: decoded.overflow,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_encode_compact(target: &str) -> Result<()> {
    let target = Target::from_hex(target).context("target must be hex")?;
    println!("{:#010x}", target.to_compact());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_accept_prefixed_and_bare_hex() {
        assert_eq!(parse_bits("0x1d00ffff").expect("prefixed"), 0x1d00_ffff);
        assert_eq!(parse_bits(" 1E0FFFF0 ").expect("bare"), 0x1e0f_fff0);
        assert!(parse_bits("0x1d00ffff00").is_err());
        assert!(parse_bits("nope").is_err());
    }

    #[test]
    fn genesis_hash_parses_in_display_order() {
        let genesis = Network::Main.genesis();
        let hash = parse_hash("000005195817cd43b068ee6dcd091109e937b4b5c322c6a2b23a93912e19bb76")
            .expect("hash");
        assert_eq!(hash, genesis.hash);
        assert!(check_proof_of_work(&hash, genesis.bits, &Network::Main.params()));
    }

    #[test]
    fn cli_parses_global_network() {
        let cli = Cli::try_parse_from([
            "powctl",
            "next-work",
            "--chain",
            "headers.json",
            "--network",
            "regtest",
        ])
        .expect("arguments");
        assert_eq!(cli.network, Network::Regtest);
        assert!(matches!(cli.command, Commands::NextWork { .. }));
    }

    #[test]
    fn parameter_override_is_validated() {
        let dir = std::env::temp_dir().join(format!("powctl-params-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let good = dir.join("good.json");
        let bad = dir.join("bad.json");
        let mut params = Network::Regtest.params();
        fs::write(&good, serde_json::to_string(&params).expect("json")).expect("write");
        params.pow_target_spacing = 0;
        fs::write(&bad, serde_json::to_string(&params).expect("json")).expect("write");

        let loaded = load_params(Network::Main, Some(good.as_path())).expect("valid override");
        assert_eq!(loaded, Network::Regtest.params());
        assert!(load_params(Network::Main, Some(bad.as_path())).is_err());
        assert_eq!(
            load_params(Network::Test, None).expect("defaults"),
            Network::Test.params()
        );
        let _ = fs::remove_dir_all(&dir);
    }
}
