//! chest - encrypt or decrypt a secrets file with a sibling key file.
//!
//! Every command takes the key path, the secrets path and the cipher name,
//! each defaulting relative to the current directory. A failed command exits
//! with a non-zero status.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use chest_common::Error;
use chest_crypto::CipherTable;
use chest_vault::{
    default_secrets_path, RekeyOutcome, StatusReport, VaultConfig, VaultEngine, DEFAULT_CIPHER,
    DEFAULT_KEY_FILENAME, FORMAT_VERSION,
};

#[derive(Parser)]
#[command(name = "chest")]
#[command(about = "Securely encrypt or decrypt secrets stored in a file")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output; rely on the exit status.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct VaultArgs {
    /// Custom path to the chest key.
    #[arg(short, long, env = "CHEST_KEY")]
    key: Option<PathBuf>,

    /// Custom path to the secrets file.
    #[arg(short, long, env = "CHEST_SECRETS")]
    secrets: Option<PathBuf>,

    /// Custom cipher.
    #[arg(short, long, env = "CHEST_CIPHER", default_value = DEFAULT_CIPHER)]
    cipher: String,

    /// Format version written into and expected in the header.
    #[arg(long, env = "CHEST_FORMAT_VERSION", default_value = FORMAT_VERSION)]
    format_version: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a key file for encrypting.
    Create {
        #[command(flatten)]
        vault: VaultArgs,

        /// Overwrite an existing key. Anything locked with it becomes unreadable.
        #[arg(long)]
        force: bool,
    },

    /// Encrypt the secrets file.
    Lock {
        #[command(flatten)]
        vault: VaultArgs,
    },

    /// Decrypt the secrets file.
    Unlock {
        #[command(flatten)]
        vault: VaultArgs,
    },

    /// Regenerate the key, keeping the secrets file locked or unlocked as it was.
    Rekey {
        #[command(flatten)]
        vault: VaultArgs,
    },

    /// Show whether the secrets file is locked and whether the key is usable.
    Status {
        #[command(flatten)]
        vault: VaultArgs,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List supported ciphers.
    Ciphers {
        /// Print the table as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let quiet = cli.quiet;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;
    match cli.command {
        Commands::Create { vault, force } => cmd_create(&vault, force, quiet),
        Commands::Lock { vault } => cmd_lock(&vault, quiet),
        Commands::Unlock { vault } => cmd_unlock(&vault, quiet),
        Commands::Rekey { vault } => cmd_rekey(&vault, quiet),
        Commands::Status { vault, json } => cmd_status(&vault, json),
        Commands::Ciphers { json } => cmd_ciphers(json),
    }
}

/// Resolved paths and engine for one invocation.
struct Invocation {
    engine: VaultEngine,
    secrets: PathBuf,
}

fn resolve(args: &VaultArgs) -> Result<Invocation> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(resolve_in(&cwd, args))
}

fn resolve_in(cwd: &Path, args: &VaultArgs) -> Invocation {
    let key = args
        .key
        .clone()
        .unwrap_or_else(|| cwd.join(DEFAULT_KEY_FILENAME));
    let secrets = args
        .secrets
        .clone()
        .unwrap_or_else(|| default_secrets_path(cwd));
    debug!(key = %key.display(), secrets = %secrets.display(), cipher = %args.cipher, "Resolved paths");

    let config = VaultConfig::new(key, args.cipher.as_str(), args.format_version.as_str());
    Invocation {
        engine: VaultEngine::new(config),
        secrets,
    }
}

fn say(quiet: bool, message: &str) {
    if !quiet {
        println!("{message}");
    }
}

/// Create the key file.
fn cmd_create(args: &VaultArgs, force: bool, quiet: bool) -> Result<()> {
    let inv = resolve(args)?;
    inv.engine
        .create_key(force)
        .context("Failed to create chest key")?;
    say(quiet, "Chest key generated");
    Ok(())
}

/// Lock the secrets file.
fn cmd_lock(args: &VaultArgs, quiet: bool) -> Result<()> {
    let inv = resolve(args)?;
    inv.engine
        .lock(&inv.secrets)
        .context("Failed to lock chest")?;
    say(quiet, "Chest is locked");
    Ok(())
}

/// Unlock the secrets file.
fn cmd_unlock(args: &VaultArgs, quiet: bool) -> Result<()> {
    let inv = resolve(args)?;
    inv.engine
        .unlock(&inv.secrets)
        .context("Failed to unlock chest")?;
    say(quiet, "Chest is unlocked");
    Ok(())
}

/// Rotate the key.
fn cmd_rekey(args: &VaultArgs, quiet: bool) -> Result<()> {
    let inv = resolve(args)?;
    let outcome = inv
        .engine
        .rekey(&inv.secrets)
        .context("Failed to re-key chest")?;
    match outcome {
        RekeyOutcome::Relocked => say(quiet, "Chest key is re-keyed; chest is locked"),
        RekeyOutcome::LeftUnlocked => say(quiet, "Chest key is re-keyed; chest is unlocked"),
    }
    Ok(())
}

/// Report the state of both files.
fn cmd_status(args: &VaultArgs, json: bool) -> Result<()> {
    let inv = resolve(args)?;
    let report = inv
        .engine
        .status(&inv.secrets)
        .context("Failed to read chest status")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_status(&report));
    }

    if report.algorithm.is_none() {
        return Err(Error::UnknownCipher(report.cipher).into());
    }
    Ok(())
}

fn render_status(report: &StatusReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Chest Status:");
    let _ = writeln!(out, "  Secrets: {}", report.secrets_path.display());
    match report.state {
        Some(state) => {
            let _ = writeln!(out, "  State: {}", state);
        }
        None => {
            let _ = writeln!(out, "  State: missing");
        }
    }
    let _ = writeln!(out, "  Header: {}", report.header);
    if let Some(tag) = &report.foreign_header {
        let _ = writeln!(out, "  Foreign header: {}", tag);
    }
    let _ = writeln!(
        out,
        "  Cipher: {} ({})",
        report.cipher,
        report.algorithm.unwrap_or("unknown")
    );
    match report.required_key_length {
        Some(len) => {
            let _ = writeln!(out, "  Key length: {} bytes", len);
        }
        None => {
            let _ = writeln!(out, "  Key length: unknown");
        }
    }
    let _ = writeln!(out, "  Key: {}", report.key_path.display());
    let _ = writeln!(
        out,
        "  Key status: {}",
        match (report.key_present, report.key_length_valid) {
            (false, _) => "missing",
            (true, false) => "invalid length",
            (true, true) => "ok",
        }
    );
    out
}

/// Print the cipher table.
fn cmd_ciphers(json: bool) -> Result<()> {
    if json {
        let table: Vec<_> = CipherTable::global().iter().collect();
        println!("{}", serde_json::to_string_pretty(&table)?);
    } else {
        print!("{}", render_ciphers());
    }
    Ok(())
}

fn render_ciphers() -> String {
    let mut out = String::new();
    for descriptor in CipherTable::global().iter() {
        let _ = writeln!(
            out,
            "{:<12} {:<12} {} bytes",
            descriptor.name.as_str(),
            descriptor.algorithm.id(),
            descriptor.key_length
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_defaults() {
        let cli = parse(&["chest", "lock"]);
        let Commands::Lock { vault } = cli.command else {
            panic!("expected lock");
        };
        assert_eq!(vault.key, None);
        assert_eq!(vault.secrets, None);
        assert_eq!(vault.format_version, FORMAT_VERSION);
    }

    #[test]
    fn test_parse_options() {
        let cli = parse(&[
            "chest", "-q", "create", "-k", "/tmp/k", "-s", "/tmp/s", "-c", "AES_128_CTR", "--force",
        ]);
        assert!(cli.quiet);
        let Commands::Create { vault, force } = cli.command else {
            panic!("expected create");
        };
        assert!(force);
        assert_eq!(vault.key, Some(PathBuf::from("/tmp/k")));
        assert_eq!(vault.secrets, Some(PathBuf::from("/tmp/s")));
        assert_eq!(vault.cipher, "AES_128_CTR");
    }

    #[test]
    fn test_resolve_defaults_against_cwd() {
        let args = VaultArgs {
            key: None,
            secrets: None,
            cipher: DEFAULT_CIPHER.to_string(),
            format_version: FORMAT_VERSION.to_string(),
        };
        let inv = resolve_in(Path::new("/work"), &args);
        assert_eq!(inv.secrets, PathBuf::from("/work/.chest"));
        assert_eq!(
            inv.engine.config().key_path(),
            Path::new("/work/.chest_key")
        );
        assert_eq!(inv.engine.config().cipher(), "AES_256_CBC");
    }

    #[test]
    fn test_commands_end_to_end() {
        let temp = TempDir::new().unwrap();
        let key = temp.path().join("k");
        let secrets = temp.path().join("s");
        let path_args = |extra: &[&str]| {
            let mut argv = vec!["chest".to_string(), "-q".to_string()];
            argv.extend(extra.iter().map(|s| s.to_string()));
            argv.extend([
                "-k".to_string(),
                key.display().to_string(),
                "-s".to_string(),
                secrets.display().to_string(),
            ]);
            Cli::try_parse_from(argv).unwrap()
        };

        std::fs::write(&secrets, "CHEST CONTENT").unwrap();

        run(path_args(&["create"])).unwrap();
        assert!(run(path_args(&["create"])).is_err());
        run(path_args(&["lock"])).unwrap();
        assert!(run(path_args(&["lock"])).is_err());
        run(path_args(&["rekey"])).unwrap();
        run(path_args(&["status", "--json"])).unwrap();
        run(path_args(&["unlock"])).unwrap();
        assert!(run(path_args(&["unlock"])).is_err());

        assert_eq!(std::fs::read(&secrets).unwrap(), b"CHEST CONTENT");
    }

    #[test]
    fn test_ciphers_lists_whole_table() {
        run(parse(&["chest", "ciphers"])).unwrap();
        run(parse(&["chest", "ciphers", "--json"])).unwrap();

        let listing = render_ciphers();
        assert_eq!(listing.lines().count(), 15);
        assert!(listing.lines().any(|l| l.starts_with("AES_256 ") && l.contains("aes-256-cbc") && l.ends_with("32 bytes")));
        assert!(listing.lines().any(|l| l.starts_with("AES_192_OFB") && l.ends_with("24 bytes")));
    }

    #[test]
    fn test_status_text_output() {
        let temp = TempDir::new().unwrap();
        let key = temp.path().join("k");
        let secrets = temp.path().join("s");
        let args = VaultArgs {
            key: Some(key.clone()),
            secrets: Some(secrets.clone()),
            cipher: "AES_128_CTR".to_string(),
            format_version: FORMAT_VERSION.to_string(),
        };
        let inv = resolve_in(temp.path(), &args);

        let text = render_status(&inv.engine.status(&inv.secrets).unwrap());
        assert!(text.contains("  State: missing"));
        assert!(text.contains("  Cipher: AES_128_CTR (aes-128-ctr)"));
        assert!(text.contains("  Key length: 16 bytes"));
        assert!(text.contains("  Key status: missing"));

        std::fs::write(&secrets, "CHEST CONTENT").unwrap();
        inv.engine.create_key(false).unwrap();
        inv.engine.lock(&inv.secrets).unwrap();
        let text = render_status(&inv.engine.status(&inv.secrets).unwrap());
        assert!(text.contains("  State: locked"));
        assert!(text.contains("  Header: $CHEST:1.0.0:AES_128_CTR;"));
        assert!(text.contains("  Key status: ok"));
        assert!(!text.contains("Foreign header"));

        let other = resolve_in(
            temp.path(),
            &VaultArgs {
                cipher: "AES_128_CBC".to_string(),
                ..args
            },
        );
        let text = render_status(&other.engine.status(&other.secrets).unwrap());
        assert!(text.contains("  State: plaintext"));
        assert!(text.contains("  Foreign header: $CHEST:1.0.0:AES_128_CTR;"));
    }

    #[test]
    fn test_status_fails_for_unknown_cipher() {
        let temp = TempDir::new().unwrap();
        let key = temp.path().join("k").display().to_string();
        let secrets = temp.path().join("s").display().to_string();

        let err = run(parse(&[
            "chest", "-q", "status", "-k", key.as_str(), "-s", secrets.as_str(), "-c", "BLOWFISH",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("Invalid cipher: BLOWFISH"));

        run(parse(&["chest", "-q", "status", "-k", key.as_str(), "-s", secrets.as_str()])).unwrap();
    }

    #[test]
    fn test_rekey_under_other_cipher_fails() {
        let temp = TempDir::new().unwrap();
        let key = temp.path().join("k").display().to_string();
        let secrets = temp.path().join("s");
        let secrets_arg = secrets.display().to_string();
        std::fs::write(&secrets, "CHEST CONTENT").unwrap();

        let with = |cmd: &str, cipher: &str| {
            parse(&["chest", "-q", cmd, "-k", key.as_str(), "-s", secrets_arg.as_str(), "-c", cipher])
        };
        run(with("create", "AES_256_CTR")).unwrap();
        run(with("lock", "AES_256_CTR")).unwrap();
        let key_before = std::fs::read(&key).unwrap();

        assert!(run(with("rekey", "AES_256_CBC")).is_err());
        assert_eq!(std::fs::read(&key).unwrap(), key_before);

        run(with("unlock", "AES_256_CTR")).unwrap();
        assert_eq!(std::fs::read(&secrets).unwrap(), b"CHEST CONTENT");
    }
}
