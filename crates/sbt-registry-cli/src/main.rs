//! SBT Registry CLI: the `sbtr` command.
//!
//! Manages a file-backed credential registry: publish requirement sets,
//! evaluate claims, certify and revoke principals, and inspect the
//! hash-chained audit log.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use sbt_registry::time::micros_to_rfc3339;
use sbt_registry::{
    query_audit, AuditEventKind, AuditQuery, AuditSink, CertificationState, Claims, ClassId,
    FileAuditLog, FileStore, PrincipalId, Registry, RegistryConfig, RegistryError,
    RequirementSet, RevocationReason,
};

// ── Directory helpers ─────────────────────────────────────────────────────────

fn default_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SBT_REGISTRY_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").map_err(|_| anyhow!("HOME not set; pass --dir"))?;
    Ok(PathBuf::from(home).join(".sbt-registry"))
}

fn records_dir(dir: &Path) -> PathBuf {
    dir.join("records")
}

fn audit_path(dir: &Path) -> PathBuf {
    dir.join("audit.jsonl")
}

fn config_path(dir: &Path) -> PathBuf {
    dir.join("config.json")
}

fn open_registry(dir: &Path) -> Result<Registry<FileStore>> {
    let config = RegistryConfig::load_or_default(config_path(dir))
        .context("failed to load registry config")?;
    let store = FileStore::new(records_dir(dir)).context("failed to open record store")?;
    let audit = FileAuditLog::open(audit_path(dir)).context("failed to open audit log")?;

    Registry::open(store, Arc::new(audit), config).with_context(|| {
        format!(
            "no registry at {} (run `sbtr init --issuer <principal>` first)",
            dir.display()
        )
    })
}

fn caller(as_principal: Option<&str>) -> Result<PrincipalId> {
    as_principal
        .map(PrincipalId::new)
        .or_else(|| std::env::var("SBT_PRINCIPAL").ok().map(PrincipalId::new))
        .ok_or_else(|| anyhow!("no caller identity; pass --as <principal> or set SBT_PRINCIPAL"))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read {what} file {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse {what} file {}", path.display()))
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// SBT Registry CLI: issue and verify non-transferable credentials.
#[derive(Parser, Debug)]
#[command(
    name = "sbtr",
    about = "SBT Registry CLI",
    version,
    long_about = "sbtr — SBT Registry CLI\n\nPublish requirement sets per credential class, evaluate claims,\ncertify and revoke principals, and inspect the audit log."
)]
struct Cli {
    /// Registry directory (default: $SBT_REGISTRY_DIR or ~/.sbt-registry)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Principal issuing the command (default: $SBT_PRINCIPAL)
    #[arg(long = "as", global = true)]
    as_principal: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new registry
    Init {
        /// Principal that becomes the issuer
        #[arg(long)]
        issuer: String,
    },

    /// Show the current issuer
    Issuer,

    /// Hand the issuer role to another principal
    TransferIssuer {
        /// The new issuer
        new_issuer: String,
    },

    /// Manage requirement sets
    Requirements {
        #[command(subcommand)]
        subcommand: RequirementsCommands,
    },

    /// Evaluate claims against the requirements of a class
    Evaluate {
        /// Credential class
        class: u64,

        /// JSON file mapping clause index to a typed value
        #[arg(long)]
        claims: PathBuf,
    },

    /// Certify a principal for a class
    Certify {
        principal: String,
        class: u64,

        /// Record that the external attestation was rejected
        #[arg(long)]
        rejected: bool,
    },

    /// Revoke a principal's certification for a class
    Revoke {
        principal: String,
        class: u64,

        /// Reason (expired, compromised, requirements_no_longer_met, manual, principal_request, or free text)
        #[arg(long)]
        reason: Option<String>,
    },

    /// Check whether a principal holds an active certification
    Verify { principal: String, class: u64 },

    /// Show the certification record of a principal
    Status { principal: String, class: u64 },

    /// List certification records of a class
    List { class: u64 },

    /// Inspect the audit log
    Audit {
        #[command(subcommand)]
        subcommand: AuditCommands,
    },
}

#[derive(Subcommand, Debug)]
enum RequirementsCommands {
    /// Replace the requirement set of a class from a JSON file
    Set {
        class: u64,

        /// JSON file holding the requirement set
        #[arg(long)]
        file: PathBuf,
    },

    /// Show the requirement set of a class
    Show { class: u64 },

    /// List classes with a requirement set
    List,
}

#[derive(Subcommand, Debug)]
enum AuditCommands {
    /// List audit entries
    List {
        /// Filter by event kind (requirements_changed, certified, revoked, issuer_transferred)
        #[arg(long)]
        kind: Option<String>,

        /// Filter by credential class
        #[arg(long)]
        class: Option<u64>,

        /// Filter by principal
        #[arg(long)]
        principal: Option<String>,

        /// Only entries with sequence >= N
        #[arg(long)]
        since: Option<u64>,

        /// Show at most N of the most recent entries
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Verify the audit hash chain
    Verify,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.verbose;

    let dir = match cli.dir {
        Some(dir) => Ok(dir),
        None => default_dir(),
    };
    let result =
        dir.and_then(|dir| run(&dir, cli.as_principal.as_deref(), cli.command, verbose));

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(dir: &Path, as_principal: Option<&str>, command: Commands, verbose: bool) -> Result<()> {
    log::debug!("registry directory {}", dir.display());
    match command {
        Commands::Init { issuer } => cmd_init(dir, &issuer, verbose),
        Commands::Issuer => cmd_issuer(dir),
        Commands::TransferIssuer { new_issuer } => {
            cmd_transfer_issuer(dir, &caller(as_principal)?, &new_issuer)
        }
        Commands::Requirements { subcommand } => match subcommand {
            RequirementsCommands::Set { class, file } => {
                cmd_requirements_set(dir, &caller(as_principal)?, class, &file, verbose)
            }
            RequirementsCommands::Show { class } => cmd_requirements_show(dir, class),
            RequirementsCommands::List => cmd_requirements_list(dir),
        },
        Commands::Evaluate { class, claims } => cmd_evaluate(dir, class, &claims, verbose),
        Commands::Certify {
            principal,
            class,
            rejected,
        } => cmd_certify(dir, &caller(as_principal)?, &principal, class, !rejected),
        Commands::Revoke {
            principal,
            class,
            reason,
        } => cmd_revoke(
            dir,
            &caller(as_principal)?,
            &principal,
            class,
            reason.as_deref(),
        ),
        Commands::Verify { principal, class } => cmd_verify(dir, &principal, class),
        Commands::Status { principal, class } => cmd_status(dir, &principal, class),
        Commands::List { class } => cmd_list(dir, class, verbose),
        Commands::Audit { subcommand } => match subcommand {
            AuditCommands::List {
                kind,
                class,
                principal,
                since,
                limit,
            } => cmd_audit_list(
                dir,
                kind.as_deref(),
                class,
                principal.as_deref(),
                since,
                limit,
                verbose,
            ),
            AuditCommands::Verify => cmd_audit_verify(dir),
        },
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `sbtr init --issuer PRINCIPAL`
fn cmd_init(dir: &Path, issuer: &str, verbose: bool) -> Result<()> {
    std::fs::create_dir_all(dir).context("failed to create registry directory")?;

    let config = RegistryConfig::load_or_default(config_path(dir))
        .context("failed to load registry config")?;
    let store = FileStore::new(records_dir(dir)).context("failed to create record store")?;
    let audit = FileAuditLog::open(audit_path(dir)).context("failed to open audit log")?;

    match Registry::initialize(PrincipalId::new(issuer), store, Arc::new(audit), config) {
        Ok(_) => {}
        Err(RegistryError::AlreadyInitialized) => {
            return Err(anyhow!(
                "registry already initialized at {}",
                dir.display()
            ));
        }
        Err(e) => return Err(e).context("failed to initialize registry"),
    }

    println!("Initialized registry");
    println!("  Issuer:    {issuer}");
    println!("  Directory: {}", dir.display());
    if verbose {
        println!("  Records:   {}", records_dir(dir).display());
        println!("  Audit log: {}", audit_path(dir).display());
    }
    Ok(())
}

/// `sbtr issuer`
fn cmd_issuer(dir: &Path) -> Result<()> {
    let registry = open_registry(dir)?;
    println!("{}", registry.issuer()?);
    Ok(())
}

/// `sbtr transfer-issuer NEW`
fn cmd_transfer_issuer(dir: &Path, caller: &PrincipalId, new_issuer: &str) -> Result<()> {
    let registry = open_registry(dir)?;
    registry
        .transfer_issuer(caller, PrincipalId::new(new_issuer))
        .context("issuer transfer failed")?;
    println!("Issuer transferred from {caller} to {new_issuer}");
    Ok(())
}

/// `sbtr requirements set CLASS --file FILE`
fn cmd_requirements_set(
    dir: &Path,
    caller: &PrincipalId,
    class: u64,
    file: &Path,
    verbose: bool,
) -> Result<()> {
    let requirements: RequirementSet = read_json(file, "requirements")?;
    let clauses = requirements.len();
    let relation = requirements.relation;

    let registry = open_registry(dir)?;
    registry
        .set_requirements(caller, ClassId(class), requirements)
        .context("failed to set requirements")?;

    println!("Set requirements for class {class}: {clauses} clause(s), relation {relation}");
    if verbose {
        print_requirements(&registry.get_requirements(ClassId(class))?);
    }
    Ok(())
}

/// `sbtr requirements show CLASS`
fn cmd_requirements_show(dir: &Path, class: u64) -> Result<()> {
    let registry = open_registry(dir)?;
    let requirements = registry.get_requirements(ClassId(class))?;
    println!(
        "Class {class} ({} clause(s), relation {}):",
        requirements.len(),
        requirements.relation
    );
    print_requirements(&requirements);
    Ok(())
}

fn print_requirements(requirements: &RequirementSet) {
    if requirements.is_empty() {
        println!("  (no clauses)");
        return;
    }
    println!("  {:<4} {:<24} {:<3} {:<24} TYPE", "IDX", "TITLE", "OP", "EXPECTED");
    println!("  {}", "-".repeat(70));
    for (i, clause) in requirements.clauses.iter().enumerate() {
        println!(
            "  {:<4} {:<24} {:<3} {:<24} {}",
            i,
            clause.metadata.title,
            clause.operator.symbol(),
            clause.expected.to_string(),
            clause.metadata.type_tag
        );
    }
}

/// `sbtr requirements list`
fn cmd_requirements_list(dir: &Path) -> Result<()> {
    let registry = open_registry(dir)?;
    let classes = registry.requirement_classes()?;
    if classes.is_empty() {
        println!("No requirement sets.");
        return Ok(());
    }
    for class in classes {
        let requirements = registry.get_requirements(class)?;
        println!(
            "  class {:<10} {} clause(s), relation {}",
            class,
            requirements.len(),
            requirements.relation
        );
    }
    Ok(())
}

/// `sbtr evaluate CLASS --claims FILE`
fn cmd_evaluate(dir: &Path, class: u64, claims_file: &Path, verbose: bool) -> Result<()> {
    let claims: Claims = read_json(claims_file, "claims")?;
    let registry = open_registry(dir)?;
    let evaluation = registry.evaluate_detailed(ClassId(class), &claims)?;

    println!(
        "Class {class}: {}",
        if evaluation.passed { "PASS" } else { "FAIL" }
    );
    if verbose || !evaluation.passed {
        for outcome in &evaluation.clauses {
            let status = match (outcome.passed, outcome.missing) {
                (true, _) => "pass",
                (false, true) => "missing",
                (false, false) => "fail",
            };
            println!("  clause {:<4} {status}", outcome.index);
        }
    }
    Ok(())
}

/// `sbtr certify PRINCIPAL CLASS [--rejected]`
fn cmd_certify(
    dir: &Path,
    caller: &PrincipalId,
    principal: &str,
    class: u64,
    attested: bool,
) -> Result<()> {
    let registry = open_registry(dir)?;
    let principal = PrincipalId::new(principal);
    registry
        .certify(caller, &principal, ClassId(class), attested)
        .context("certification failed")?;
    println!("Certified {principal} for class {class}");
    Ok(())
}

/// `sbtr revoke PRINCIPAL CLASS [--reason REASON]`
fn cmd_revoke(
    dir: &Path,
    caller: &PrincipalId,
    principal: &str,
    class: u64,
    reason: Option<&str>,
) -> Result<()> {
    let registry = open_registry(dir)?;
    let principal = PrincipalId::new(principal);
    let reason = reason
        .map(RevocationReason::parse)
        .unwrap_or(RevocationReason::ManualRevocation);
    registry
        .revoke_with_reason(caller, &principal, ClassId(class), reason.clone())
        .context("revocation failed")?;
    println!("Revoked {principal} for class {class} ({reason})");
    Ok(())
}

/// `sbtr verify PRINCIPAL CLASS`
fn cmd_verify(dir: &Path, principal: &str, class: u64) -> Result<()> {
    let registry = open_registry(dir)?;
    let verified = registry.is_verified(&PrincipalId::new(principal), ClassId(class));
    println!("{}", if verified { "verified" } else { "not verified" });
    Ok(())
}

/// `sbtr status PRINCIPAL CLASS`
fn cmd_status(dir: &Path, principal: &str, class: u64) -> Result<()> {
    let registry = open_registry(dir)?;
    let principal = PrincipalId::new(principal);
    let Some(record) = registry.certification(&principal, ClassId(class))? else {
        println!("{principal} / class {class}: {}", CertificationState::Absent);
        return Ok(());
    };

    println!("{principal} / class {class}: {}", record.state);
    println!("  Issued:      {}", micros_to_rfc3339(record.issued_at));
    println!("  Issue count: {}", record.issue_count);
    if let Some(revoked_at) = record.revoked_at {
        println!("  Revoked:     {}", micros_to_rfc3339(revoked_at));
    }
    if let Some(reason) = &record.revocation_reason {
        println!("  Reason:      {reason}");
    }
    Ok(())
}

/// `sbtr list CLASS`
fn cmd_list(dir: &Path, class: u64, verbose: bool) -> Result<()> {
    let registry = open_registry(dir)?;
    let records = registry.certifications(ClassId(class))?;
    if records.is_empty() {
        println!("No certifications for class {class}.");
        return Ok(());
    }

    println!("  {:<32} {:<8} ISSUED", "PRINCIPAL", "STATE");
    println!("  {}", "-".repeat(70));
    for record in &records {
        println!(
            "  {:<32} {:<8} {}",
            record.principal,
            record.state,
            micros_to_rfc3339(record.issued_at)
        );
        if verbose {
            if let Some(reason) = &record.revocation_reason {
                println!("    Reason: {reason}");
            }
        }
    }
    Ok(())
}

/// `sbtr audit list [--kind K] [--class C] [--principal P] [--since N] [--limit N]`
fn cmd_audit_list(
    dir: &Path,
    kind: Option<&str>,
    class: Option<u64>,
    principal: Option<&str>,
    since: Option<u64>,
    limit: usize,
    verbose: bool,
) -> Result<()> {
    let log = FileAuditLog::open(audit_path(dir)).context("failed to open audit log")?;
    let entries = log.entries()?;

    let mut query = AuditQuery::new().limit(limit);
    if let Some(kind) = kind {
        let kind = AuditEventKind::from_tag(kind)
            .ok_or_else(|| anyhow!("unknown event kind '{kind}'"))?;
        query = query.kind(kind);
    }
    if let Some(class) = class {
        query = query.class(ClassId(class));
    }
    if let Some(principal) = principal {
        query = query.principal(PrincipalId::new(principal));
    }
    if let Some(since) = since {
        query = query.since(since);
    }

    let hits = query_audit(&entries, &query);
    println!("Audit entries ({} shown, {} total):", hits.len(), entries.len());
    for entry in hits {
        println!(
            "  {:<6} {:<26} {}",
            entry.sequence,
            micros_to_rfc3339(entry.timestamp),
            entry.event.summary()
        );
        if verbose {
            println!("         id {}  hash {}", entry.id, entry.hash);
        }
    }
    Ok(())
}

/// `sbtr audit verify`
fn cmd_audit_verify(dir: &Path) -> Result<()> {
    match FileAuditLog::open(audit_path(dir)) {
        Ok(log) => {
            println!("Audit chain intact ({} entries)", log.len()?);
            Ok(())
        }
        Err(RegistryError::AuditChainBroken { sequence }) => {
            Err(anyhow!("audit chain broken at sequence {sequence}"))
        }
        Err(e) => Err(e).context("failed to read audit log"),
    }
}
