//! pushsink CLI
//!
//! Manage Web Push subscriber keys and decrypt captured `aesgcm` push messages.

mod capture;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use config::Config;
use pushsink_crypto::vapid::unix_now;
use pushsink_crypto::{
    AssertionClaims, AssertionSigner, KeyMaterialBuilder, PushNotification, PushReceiver,
    PushSealer,
};

/// pushsink - receive and decrypt Web Push notifications
#[derive(Parser)]
#[command(name = "pushsink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path [default: <config dir>/pushsink/config.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a subscriber key pair and auth secret
    Keygen {
        /// Replace existing keys
        #[arg(long)]
        force: bool,
    },

    /// Print the public key and auth secret to register with a push provider
    Show,

    /// Store the application server's verification key
    SetServerKey {
        /// Base64url uncompressed P-256 public key
        #[arg(required = true)]
        key: String,
    },

    /// Authenticate and decrypt a captured push request
    Decrypt {
        /// File with one `Name: value` header per line
        #[arg(long)]
        headers: PathBuf,

        /// File with the raw request body
        #[arg(long)]
        body: PathBuf,
    },

    /// Encrypt a test message for the configured subscriber
    Seal {
        /// Message to encrypt
        #[arg(short, long)]
        message: String,

        /// Directory for `headers.txt` and `body.bin`
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Assertion lifetime in seconds
        #[arg(long, default_value_t = 3600)]
        ttl: u64,

        /// Assertion `sub` claim
        #[arg(long, default_value = "mailto:pushsink@localhost")]
        subject: String,

        /// Replace a configured server key with the test signer's key
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)?;

    // Initialize logging
    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Keygen { force } => generate_keys(config, &config_path, force),
        Commands::Show => show_keys(&config),
        Commands::SetServerKey { key } => set_server_key(config, &config_path, &key),
        Commands::Decrypt { headers, body } => decrypt(&config, &headers, &body),
        Commands::Seal {
            message,
            out_dir,
            ttl,
            subject,
            force,
        } => seal(
            config,
            &config_path,
            &SealOptions {
                message: &message,
                out_dir: &out_dir,
                ttl,
                subject: &subject,
                force,
            },
        ),
    }
}

/// Generate a new subscriber key pair and auth secret
fn generate_keys(mut config: Config, config_path: &Path, force: bool) -> anyhow::Result<()> {
    if config.keys.private_key.is_some() && !force {
        anyhow::bail!(
            "Keys already exist in {} (use --force to replace them)",
            config_path.display()
        );
    }

    let mut builder = KeyMaterialBuilder::new();
    builder.generate()?;
    config.keys.private_key = builder.subscriber().map(|k| k.export_private_scalar());
    config.keys.auth_secret = builder.auth_secret().map(|a| a.export());
    config.save(config_path)?;

    tracing::info!("Generated subscriber keys in {}", config_path.display());
    show_keys(&config)
}

/// Print the values a push provider needs for a subscription
fn show_keys(config: &Config) -> anyhow::Result<()> {
    let builder = config.subscriber_keys()?;
    if let Some(subscriber) = builder.subscriber() {
        println!("Public key:  {}", subscriber.export_public_key());
    }
    if let Some(auth) = builder.auth_secret() {
        println!("Auth secret: {}", auth.export());
    }
    match builder.verification_key() {
        Some(server) => println!("Server key:  {}", server.export()),
        None => println!("Server key:  (not set)"),
    }
    Ok(())
}

/// Import and store the application server key
fn set_server_key(mut config: Config, config_path: &Path, key: &str) -> anyhow::Result<()> {
    let mut builder = KeyMaterialBuilder::new();
    builder
        .import_verification_key(key.trim())
        .context("Server key must be a base64url uncompressed P-256 point")?;

    config.keys.server_key = builder.verification_key().map(|k| k.export());
    config.save(config_path)?;

    tracing::info!("Stored server key in {}", config_path.display());
    Ok(())
}

/// Run the receive pipeline on a captured request
fn decrypt(config: &Config, headers_path: &Path, body_path: &Path) -> anyhow::Result<()> {
    let keys = Arc::new(config.key_material()?);
    let receiver = PushReceiver::new(keys);

    let headers_text = fs::read_to_string(headers_path)
        .with_context(|| format!("reading {}", headers_path.display()))?;
    let headers = capture::parse_headers(&headers_text)?;
    let body = fs::read(body_path).with_context(|| format!("reading {}", body_path.display()))?;

    let push = receiver
        .receive(&headers, &body)
        .context("Push message rejected")?;

    if let Some(sub) = push.assertion.claims.subject() {
        tracing::info!("Message from {}", sub);
    }
    println!("{}", String::from_utf8_lossy(&push.plaintext));

    if let Ok(notification) = PushNotification::from_slice(&push.plaintext) {
        print_notification(&notification);
    }
    Ok(())
}

fn print_notification(notification: &PushNotification) {
    let fields = [
        ("Type", notification.notification_type.as_str()),
        ("Id", notification.notification_id.as_str()),
        ("Title", notification.title.as_str()),
        ("Body", notification.body.as_str()),
        ("Icon", notification.icon.as_str()),
        ("Locale", notification.preferred_locale.as_str()),
    ];
    for (name, value) in fields {
        if !value.is_empty() {
            println!("{name:>7}: {value}");
        }
    }
}

/// Arguments of the `seal` command
struct SealOptions<'a> {
    message: &'a str,
    out_dir: &'a Path,
    ttl: u64,
    subject: &'a str,
    force: bool,
}

/// Act as a test sender for the configured subscriber
fn seal(mut config: Config, config_path: &Path, opts: &SealOptions<'_>) -> anyhow::Result<()> {
    let builder = config.subscriber_keys()?;
    let (Some(subscriber), Some(auth)) = (builder.subscriber(), builder.auth_secret()) else {
        anyhow::bail!("No subscriber keys configured; run `pushsink keygen` first");
    };

    let signer = AssertionSigner::generate()?;
    let sealer = PushSealer::new(&subscriber.public_key_bytes(), auth.clone(), signer)?;

    // The receiver must trust this one-off signer
    config.replace_server_key(sealer.signer().verification_key().export(), opts.force)?;
    config.save(config_path)?;
    tracing::warn!(
        "Server key in {} now trusts a one-off test signer",
        config_path.display()
    );

    let claims = AssertionClaims::valid_for(unix_now(), Duration::from_secs(opts.ttl))
        .with_claim("sub", opts.subject);
    let sealed = sealer.seal(opts.message.as_bytes(), &claims)?;

    let out_dir = opts.out_dir;
    fs::create_dir_all(out_dir)?;
    let headers_path = out_dir.join("headers.txt");
    let body_path = out_dir.join("body.bin");
    fs::write(&headers_path, capture::render_headers(&sealed.headers))
        .with_context(|| format!("writing {}", headers_path.display()))?;
    fs::write(&body_path, &sealed.body)
        .with_context(|| format!("writing {}", body_path.display()))?;

    println!("Headers: {}", headers_path.display());
    println!("Body:    {}", body_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(dir: &Path) -> (Config, PathBuf) {
        let path = dir.join("config.toml");
        let mut builder = KeyMaterialBuilder::new();
        builder.generate().unwrap();
        let server = AssertionSigner::generate().unwrap();

        let mut config = Config::default();
        config.keys.private_key = builder.subscriber().map(|k| k.export_private_scalar());
        config.keys.auth_secret = builder.auth_secret().map(|a| a.export());
        config.keys.server_key = Some(server.verification_key().export());
        config.save(&path).unwrap();
        (config, path)
    }

    fn options(out_dir: &Path, force: bool) -> SealOptions<'_> {
        SealOptions {
            message: "hello",
            out_dir,
            ttl: 60,
            subject: "mailto:test@localhost",
            force,
        }
    }

    #[test]
    fn test_seal_keeps_existing_server_key() {
        let dir = tempfile::tempdir().unwrap();
        let (config, path) = configured(dir.path());
        let out = dir.path().join("out");

        let err = seal(config.clone(), &path, &options(&out, false)).unwrap_err();
        assert!(err.to_string().contains("--force"));

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.keys.server_key, config.keys.server_key);
        assert!(!out.join("body.bin").exists());
    }

    #[test]
    fn test_seal_with_force_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let (config, path) = configured(dir.path());
        let out = dir.path().join("out");

        seal(config.clone(), &path, &options(&out, true)).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_ne!(reloaded.keys.server_key, config.keys.server_key);

        let receiver = PushReceiver::new(Arc::new(reloaded.key_material().unwrap()));
        let headers =
            capture::parse_headers(&fs::read_to_string(out.join("headers.txt")).unwrap()).unwrap();
        let body = fs::read(out.join("body.bin")).unwrap();
        let push = receiver.receive(&headers, &body).unwrap();
        assert_eq!(push.plaintext, b"hello");
    }

    #[test]
    fn test_seal_without_server_key_needs_no_force() {
        let dir = tempfile::tempdir().unwrap();
        let (mut config, path) = configured(dir.path());
        config.keys.server_key = None;

        seal(config, &path, &options(&dir.path().join("out"), false)).unwrap();
        assert!(Config::load(&path).unwrap().keys.server_key.is_some());
    }
}
