//! Thin CLI / benchmark harness wired to the privacy pool wallet core and
//! both proof backends. Every user-facing surface named in spec.md §1
//! (deposit UI, withdrawal UI, auction bidder, benchmark harness) is a
//! thin wrapper over the same `anonpool-core` API; this binary is the
//! reference wrapper and the place the benchmark harness lives.

mod chain_file;
mod persistence;

use std::path::PathBuf;
use std::time::Instant;

use anonpool_core::chain::ChainView;
use anonpool_core::config::PoolConfig;
use anonpool_core::field::Fq;
use anonpool_core::freshness::classify;
use anonpool_core::merkle::MerkleTree;
use anonpool_core::planner::{prepare_consolidation, prepare_transfer, prepare_withdraw};
use anonpool_core::proof::{CancellationToken, Orchestrator, ProofProducer, Witness, WitnessKind};
use anonpool_core::scanner::scan;
use anonpool_core::wallet::WalletState;
use anonpool_core::PoolError;
use anonpool_prover_local::LocalBackend;
use anonpool_prover_remote::RemoteBackend;
use clap::{Parser, Subcommand, ValueEnum};

use chain_file::FileChainView;

#[derive(Parser)]
#[command(name = "anonpool", about = "Privacy pool wallet CLI / benchmark harness")]
struct Cli {
    /// Path to the persisted wallet blob (created by `init` if missing).
    #[arg(long, default_value = "wallet.json")]
    wallet_file: PathBuf,

    /// Path to the JSON chain fixture standing in for a real RPC/indexer
    /// client (spec.md §1: the contract and its transport are external
    /// collaborators, not part of this engine).
    #[arg(long, default_value = "chain.json")]
    chain_file: PathBuf,

    /// Candidate-index scan margin (spec.md §9).
    #[arg(long, default_value_t = anonpool_core::config::DEFAULT_SCAN_MARGIN)]
    scan_margin: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a wallet from a signature over a fixed login prompt.
    Init {
        /// Raw bytes of the wallet signature, given as a UTF-8 string for
        /// convenience (a real caller would pass the actual signature bytes).
        signature: String,
    },
    /// Show available / pending / total balance.
    Balance,
    /// Derive the next note for `amount` and record it as pending.
    GenerateNote { amount: u128 },
    /// Sync wallet state against the chain fixture.
    Scan,
    /// Prepare and produce a withdraw proof for `amount` to `recipient`.
    Withdraw {
        amount: u128,
        /// Recipient as a decimal field element.
        recipient: String,
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Prepare and produce a transfer proof for `amount` to `output_commitment`.
    Transfer {
        amount: u128,
        /// Output commitment as a decimal field element.
        output_commitment: String,
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Consolidate several confirmed notes (by commitment) into one.
    Consolidate {
        /// Commitments as decimal field elements.
        commitments: Vec<String>,
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Export the wallet as a base64 backup envelope.
    Backup,
    /// Restore a wallet from a base64 backup envelope, overwriting `wallet_file`.
    Restore { envelope: String },
    /// Benchmark a single proof-generation call (spec.md §4.H: "the caller
    /// may request a cold start to measure it").
    BenchProve {
        #[command(flatten)]
        backend: BackendArgs,
        #[arg(long)]
        cold_start: bool,
    },
}

#[derive(clap::Args)]
struct BackendArgs {
    #[arg(long, value_enum, default_value_t = BackendKind::Local)]
    backend: BackendKind,
    /// Required when `--backend remote`.
    #[arg(long)]
    prover_url: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendKind {
    Local,
    Remote,
}

fn build_orchestrator(args: &BackendArgs) -> anyhow::Result<Orchestrator> {
    let producer: Box<dyn ProofProducer + Send + Sync> = match args.backend {
        BackendKind::Local => Box::new(LocalBackend::new()),
        BackendKind::Remote => {
            let url = args
                .prover_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("--prover-url is required for --backend remote"))?;
            Box::new(RemoteBackend::new(url)?)
        }
    };
    Ok(Orchestrator::new(producer))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = PoolConfig { scan_margin: cli.scan_margin, ..PoolConfig::new("0xpool", "http://localhost:8545", 1) };

    match cli.command {
        Command::Init { signature } => {
            let wallet = WalletState::from_signature(signature.as_bytes());
            persistence::save_wallet(&cli.wallet_file, &wallet)?;
            println!("wallet initialized at {}", cli.wallet_file.display());
        }
        Command::Balance => {
            let wallet = persistence::load_wallet(&cli.wallet_file)?;
            println!("available: {}", wallet.available());
            println!("pending:   {}", wallet.pending());
            println!("total:     {}", wallet.total());
        }
        Command::GenerateNote { amount } => {
            let mut wallet = persistence::load_wallet(&cli.wallet_file)?;
            let note = wallet.generate_note(amount)?;
            persistence::save_wallet(&cli.wallet_file, &wallet)?;
            println!("generated note, commitment = {}", note.commitment);
        }
        Command::Scan => {
            let (wallet, _tree, report) = sync_wallet(&cli, &config)?;
            persistence::save_wallet(&cli.wallet_file, &wallet)?;
            println!(
                "scanned {} events, {} newly confirmed, {} newly spent",
                report.events_seen,
                report.newly_confirmed.len(),
                report.newly_spent.len()
            );
        }
        Command::Withdraw { amount, recipient, backend } => {
            let (wallet, tree, _) = sync_wallet(&cli, &config)?;
            let recipient = parse_field(&recipient)?;
            let inputs = prepare_withdraw(&wallet, &tree, amount, recipient)?;
            let witness = Witness {
                input_note: inputs.input.clone(),
                merkle_path: inputs.merkle_proof.siblings.clone(),
                merkle_indices: inputs.merkle_proof.indices.clone(),
                merkle_root: inputs.root,
                kind: WitnessKind::Withdraw { amount: inputs.amount, recipient },
            };
            run_proof(&cli, &config, &witness, &backend)?;
            persistence::save_wallet(&cli.wallet_file, &wallet)?;
        }
        Command::Transfer { amount, output_commitment, backend } => {
            let (mut wallet, tree, _) = sync_wallet(&cli, &config)?;
            let output_commitment = parse_field(&output_commitment)?;
            let inputs = prepare_transfer(&mut wallet, &tree, amount, output_commitment)?;
            let (change_amount, change_commitment) = match &inputs.change {
                Some(c) => (c.amount, c.commitment),
                None => (0, Fq::from(0u64)),
            };
            let witness = Witness {
                input_note: inputs.input.clone(),
                merkle_path: inputs.merkle_proof.siblings.clone(),
                merkle_indices: inputs.merkle_proof.indices.clone(),
                merkle_root: inputs.root,
                kind: WitnessKind::Transfer { output_amount: amount, output_commitment, change_amount, change_commitment },
            };
            run_proof(&cli, &config, &witness, &backend)?;
            persistence::save_wallet(&cli.wallet_file, &wallet)?;
        }
        Command::Consolidate { commitments, backend } => {
            let (mut wallet, tree, _) = sync_wallet(&cli, &config)?;
            let commitments = commitments
                .iter()
                .map(|s| parse_field(s))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let inputs = prepare_consolidation(&mut wallet, &tree, &commitments)?;
            println!("consolidated {} notes into output commitment {}", inputs.inputs.len(), inputs.output.commitment);
            for leg in &inputs.inputs {
                let witness = Witness {
                    input_note: leg.note.clone(),
                    merkle_path: leg.merkle_proof.siblings.clone(),
                    merkle_indices: leg.merkle_proof.indices.clone(),
                    merkle_root: inputs.root,
                    kind: WitnessKind::Consolidate {
                        output_amount: inputs.output.amount,
                        output_commitment: inputs.output.commitment,
                    },
                };
                run_proof(&cli, &config, &witness, &backend)?;
            }
            persistence::save_wallet(&cli.wallet_file, &wallet)?;
        }
        Command::Backup => {
            let wallet = persistence::load_wallet(&cli.wallet_file)?;
            println!("{}", wallet.export_backup()?);
        }
        Command::Restore { envelope } => {
            let wallet = WalletState::import_backup(&envelope)?;
            persistence::save_wallet(&cli.wallet_file, &wallet)?;
            println!("wallet restored to {}", cli.wallet_file.display());
        }
        Command::BenchProve { backend, cold_start } => {
            let witness = benchmark_witness();
            let orchestrator = if cold_start {
                Orchestrator::new(Box::new(LocalBackend::with_cold_start()))
            } else {
                build_orchestrator(&backend)?
            };
            let token = CancellationToken::new();
            let start = Instant::now();
            let result = orchestrator.prove(&witness, &token)?;
            println!("wall clock: {:?}, backend-reported: {:?}", start.elapsed(), result.timing);
            println!("raw proof bytes: {}", result.raw_proof.len());
        }
    }

    Ok(())
}

/// Rebuild the local tree from scratch against the chain fixture and run a
/// full scan. The tree itself is never persisted to disk (spec.md §1
/// leaves the on-chain accumulator's transport out of scope); replaying
/// every event is idempotent (spec.md §5) and cheap at CLI scale.
fn sync_wallet(
    cli: &Cli,
    config: &PoolConfig,
) -> anyhow::Result<(WalletState, MerkleTree, anonpool_core::scanner::ScanReport)> {
    let mut wallet = persistence::load_wallet(&cli.wallet_file)?;
    wallet.last_scanned_block = 0;
    let mut tree = MerkleTree::new();
    let chain = FileChainView::load(&cli.chain_file)?;
    let report = scan(&mut wallet, &mut tree, &chain, config)?;
    Ok((wallet, tree, report))
}

fn run_proof(cli: &Cli, _config: &PoolConfig, witness: &Witness, backend: &BackendArgs) -> anyhow::Result<()> {
    let chain = FileChainView::load(&cli.chain_file)?;
    let status = chain.root_status(witness.merkle_root)?;
    let freshness = classify(status);
    println!("root freshness: {:?} ({})", freshness, freshness.message());

    // spec.md §4.I: a root that can no longer safely be submitted must be
    // regenerated against a fresher one, not proved-then-warned-about.
    if !freshness.may_submit() {
        return Err(PoolError::RootExpired.into());
    }

    let orchestrator = build_orchestrator(backend)?;
    let token = CancellationToken::new();
    let result = orchestrator.prove(witness, &token)?;

    println!("proof bytes: {}", hex::encode(&result.raw_proof));
    println!("public inputs: {:?}", result.public_inputs.iter().map(|f| f.to_string()).collect::<Vec<_>>());
    println!("timing: {:?}", result.timing);
    Ok(())
}

fn parse_field(s: &str) -> anyhow::Result<Fq> {
    Fq::from_dec_str(s).map_err(|_| anyhow::anyhow!("invalid field element: {s}"))
}

fn benchmark_witness() -> Witness {
    use anonpool_core::note::{commit, Note};
    let secret = Fq::from(1u64);
    let nullifier = Fq::from(2u64);
    let amount = 1u128;
    Witness {
        input_note: Note {
            secret,
            nullifier,
            amount,
            commitment: commit(secret, nullifier, amount),
            leaf_index: Some(0),
            timestamp: None,
        },
        merkle_path: vec![Fq::from(0u64); anonpool_core::merkle::DEPTH],
        merkle_indices: vec![0u8; anonpool_core::merkle::DEPTH],
        merkle_root: Fq::from(0u64),
        kind: WitnessKind::Withdraw { amount: 1, recipient: Fq::from(0u64) },
    }
}
