use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use zkwire_prover::backend::{ProofBackend, StarkBackend};
use zkwire_prover::circuit::{compile, generate_assignment, Circuit};
use zkwire_prover::config::ProverConfig;
use zkwire_prover::gadgets::AccessStrategy;
use zkwire_prover::locator::BufferBinding;
use zkwire_prover::proof::{CircuitKind, ProofBundle};
use zkwire_prover::wire;
use zkwire_prover::witness::WitnessBuilder;

#[derive(Parser)]
#[command(author, version, about = "Zero-knowledge field proofs over TLV transaction bodies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the messages and fields of a hex-encoded buffer
    Inspect {
        /// Hex-encoded buffer
        tx: String,
    },
    /// Prove that the leading messages carry the given fields
    Prove(ProveArgs),
    /// Verify a proof bundle
    Verify {
        #[arg(long)]
        bundle: PathBuf,
        /// Verifier's STARK parameters (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ProveArgs {
    /// Hex-encoded buffer
    tx: String,
    /// Field key asserted in message i, given once per message (e.g. 0x1a)
    #[arg(long = "key", required = true, value_parser = parse_key)]
    keys: Vec<u8>,
    #[arg(long)]
    out: PathBuf,
    /// Prover configuration (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,
    #[arg(long, default_value_t = 4)]
    chunk_bits: usize,
    #[arg(long, value_enum, default_value_t = BindingArg::Private)]
    binding: BindingArg,
    /// Size the circuit for a longer buffer
    #[arg(long)]
    pad_to: Option<usize>,
    #[arg(long)]
    max_fields: Option<usize>,
    /// Use the single-field circuit (one key only)
    #[arg(long)]
    single: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Linear,
    Tree,
    Chunked,
    Merkle,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BindingArg {
    Private,
    Mirror,
    Commitment,
}

fn parse_key(s: &str) -> Result<u8, String> {
    let digits = s.trim_start_matches("0x");
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid field key {s:?}: {e}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect { tx } => inspect(&tx),
        Commands::Prove(args) => prove(args),
        Commands::Verify { bundle, config } => verify(bundle, config),
    }
}

fn load_config(path: Option<&Path>) -> Result<ProverConfig> {
    match path {
        Some(path) => ProverConfig::from_json_file(path),
        None => Ok(ProverConfig::default()),
    }
}

fn decode_hex(tx: &str) -> Result<Vec<u8>> {
    hex::decode(tx.trim().trim_start_matches("0x")).context("buffer is not valid hex")
}

fn inspect(tx: &str) -> Result<()> {
    let buffer = decode_hex(tx)?;
    let builder = WitnessBuilder::new(&buffer)?;
    println!("buffer: {} bytes, body {:?}", buffer.len(), builder.body());
    for (i, message) in builder.messages().iter().enumerate() {
        println!(
            "message {i} at {}: {}",
            message.body_offset,
            String::from_utf8_lossy(&message.type_url)
        );
        for field in builder.fields(i)? {
            let data = &buffer[field.data.clone()];
            let value = if field.is_len() {
                hex::encode(data)
            } else {
                format!("varint {}", wire::decode_varint(data)?.0)
            };
            println!(
                "  key {:#04x} (field {}) at +{}: {}",
                field.key,
                wire::field_number(field.key),
                field.offset - message.payload.start,
                value
            );
        }
    }
    Ok(())
}

fn prove(args: ProveArgs) -> Result<()> {
    let prover_config = load_config(args.config.as_deref())?;
    let buffer = decode_hex(&args.tx)?;

    let mut builder = WitnessBuilder::new(&buffer)?.binding(match args.binding {
        BindingArg::Private => BufferBinding::Private,
        BindingArg::Mirror => BufferBinding::PublicMirror,
        BindingArg::Commitment => BufferBinding::Commitment,
    });
    if let Some(strategy) = args.strategy {
        builder = builder.strategy(match strategy {
            StrategyArg::Linear => AccessStrategy::Linear,
            StrategyArg::Tree => AccessStrategy::BinaryTree,
            StrategyArg::Chunked => AccessStrategy::Chunked {
                chunk_bits: args.chunk_bits,
            },
            StrategyArg::Merkle => AccessStrategy::MerkleCommitted,
        });
    }
    if let Some(len) = args.pad_to {
        builder = builder.pad_to(len);
    }
    if let Some(n) = args.max_fields {
        builder = builder.max_fields(n);
    }

    let (kind, circuit, locator, buffer_public, claims) =
        if args.single {
            if args.keys.len() != 1 {
                bail!("--single takes exactly one --key");
            }
            let prepared = builder.field_circuit(args.keys[0])?;
            (
                CircuitKind::Field,
                Box::new(prepared.circuit) as Box<dyn Circuit>,
                prepared.config,
                prepared.buffer_public,
                prepared.claims,
            )
        } else {
            let prepared = builder.messages_circuit(&args.keys)?;
            (
                CircuitKind::Messages,
                Box::new(prepared.circuit) as Box<dyn Circuit>,
                prepared.config,
                prepared.buffer_public,
                prepared.claims,
            )
        };

    let backend = StarkBackend::new(prover_config.clone())?;
    let compiled = Arc::new(compile(circuit.as_ref())?);
    info!(
        variables = compiled.num_variables(),
        constraints = compiled.num_constraints(),
        strategy = ?locator.strategy,
        "compiled locator circuit"
    );
    let (pk, _vk) = backend.setup(Arc::clone(&compiled))?;
    let assignment = generate_assignment(circuit.as_ref())?;
    let proof = backend.prove(&compiled, &pk, &assignment)?;

    let bundle = ProofBundle {
        prover: prover_config,
        kind,
        locator,
        buffer: buffer_public,
        claims,
        proof,
    };
    bundle.save(&args.out)?;
    info!(out = %args.out.display(), "proof written");
    Ok(())
}

fn verify(path: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let verifier_config = load_config(config.as_deref())?;
    let bundle = ProofBundle::load(&path)?;
    let backend = StarkBackend::new(verifier_config)?;

    if !bundle.verify(&backend)? {
        warn!("proof rejected");
        bail!("proof does not verify");
    }
    for (i, claim) in bundle.claims.iter().enumerate() {
        info!(
            message = i,
            key = %format!("{:#04x}", claim.field_key),
            value = %hex::encode(&claim.value),
            "verified claim"
        );
    }
    println!("OK");
    Ok(())
}
