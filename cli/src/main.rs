// pushgate — operator CLI for the push relay's publish crypto
//
// Generates channel keys, seals and opens messages, and checks request
// signatures the same way the relay does.

mod config;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use pushgate_core::auth::RequestAuthenticator;
use pushgate_core::{
    BodyCodec, BodyDecryptor, Capabilities, ChannelKey, DecodedBody, GateConfig, Message,
    MessageContent, MonotonicTimestamps, PublishRequest, SignerRole, TimestampSource, Token,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pushgate")]
#[command(about = "PushGate — publish-path crypto tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a 64-byte channel key
    Keygen,
    /// Build a message and seal it for delivery
    Seal {
        /// Channel key (base64)
        #[arg(short, long)]
        key: String,
        /// Message text
        #[arg(short, long)]
        text: Option<String>,
        /// Link to send instead of text
        #[arg(long)]
        link: Option<String>,
        /// Announce a file (only its base name is sent)
        #[arg(long, requires = "file_size")]
        file: Option<String>,
        #[arg(long)]
        file_size: Option<u64>,
        /// Announce an image thumbnail as WIDTHxHEIGHT
        #[arg(long, value_parser = parse_dimensions)]
        image: Option<(u32, u32)>,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        sound: String,
        #[arg(long, default_value_t = 0)]
        priority: i32,
        /// Envelope timestamp; must never repeat for this key
        #[arg(long)]
        timestamp: Option<u64>,
        #[arg(long, default_value = "cli")]
        node: String,
        #[arg(long, default_value = "cli")]
        channel: String,
        /// Strip node and channel from the message
        #[arg(long)]
        anonymous: bool,
    },
    /// Open a sealed envelope and print the message
    Open {
        /// Channel key (base64)
        #[arg(short, long)]
        key: String,
        /// Sealed envelope (base64)
        sealed: String,
    },
    /// Check a detached request signature the way the gate does.
    ///
    /// Size limit and encrypted-body marker come from the gate config.
    Verify {
        #[arg(short, long, value_enum, default_value_t = Role::User)]
        role: Role,
        /// Signature (base64)
        #[arg(short, long)]
        signature: String,
        /// Content type the body was sent with
        #[arg(long, default_value = "application/json")]
        content_type: String,
        /// Public key (base64)
        #[arg(short, long)]
        public_key: String,
        /// File holding the raw request body
        body: PathBuf,
    },
    /// Edit the gate config (relay settings, also read by `verify`)
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Role {
    User,
    Device,
}

impl From<Role> for SignerRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => SignerRole::User,
            Role::Device => SignerRole::Device,
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
    Reset,
    Path,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen => cmd_keygen(),
        Commands::Seal {
            key,
            text,
            link,
            file,
            file_size,
            image,
            title,
            sound,
            priority,
            timestamp,
            node,
            channel,
            anonymous,
        } => cmd_seal(SealArgs {
            key,
            text,
            link,
            file,
            file_size,
            image,
            title,
            sound,
            priority,
            timestamp,
            node,
            channel,
            anonymous,
        }),
        Commands::Open { key, sealed } => cmd_open(&key, &sealed),
        Commands::Verify {
            role,
            signature,
            content_type,
            public_key,
            body,
        } => cmd_verify(
            cli.config,
            role.into(),
            &signature,
            &content_type,
            &public_key,
            body,
        ),
        Commands::Config { action } => cmd_config(cli.config, action),
    }
}

fn cmd_keygen() -> Result<()> {
    let key = ChannelKey::generate();

    println!("{}", "Channel key generated".bold());
    println!("  {}", key.to_base64().as_str().bright_yellow());
    println!();
    println!("{}", "⚠️  Anyone holding this key can read the channel.".bright_red());

    Ok(())
}

struct SealArgs {
    key: String,
    text: Option<String>,
    link: Option<String>,
    file: Option<String>,
    file_size: Option<u64>,
    image: Option<(u32, u32)>,
    title: String,
    sound: String,
    priority: i32,
    timestamp: Option<u64>,
    node: String,
    channel: String,
    anonymous: bool,
}

fn cmd_seal(args: SealArgs) -> Result<()> {
    let key = ChannelKey::from_base64(&args.key).context("Invalid channel key")?;

    let token = Token {
        user_id: "cli".to_string(),
        node_id: args.node.into_bytes(),
        channel: args.channel.into_bytes(),
        expires_at: 0,
        capabilities: Capabilities::publisher(),
    };

    let mut message = Message::new(&token);
    if let Some(link) = args.link {
        let title = Some(args.title.as_str()).filter(|t| !t.is_empty());
        message.link_content(&link, title)?;
    } else if let Some(path) = args.file {
        message.file_content(&path, args.file_size.unwrap_or_default())?;
    } else if let Some((width, height)) = args.image {
        message.image_content(width, height)?;
    } else if let Some(text) = args.text {
        message.titled_text_content(&args.title, &text)?;
    } else {
        bail!("Nothing to send: pass --text, --link, --file or --image");
    }
    message.sound_name(&args.sound).priority(args.priority);
    if args.anonymous {
        message.disable_token();
    }

    message.encrypt_content(&key)?;

    let timestamp = args
        .timestamp
        .unwrap_or_else(|| MonotonicTimestamps::new().next_timestamp(&token.channel));
    let sealed = message.seal(&key, timestamp)?;

    println!("{} Message sealed", "✓".green());
    println!("  Timestamp: {}", timestamp.to_string().bright_cyan());
    println!("  Envelope:  {}", BASE64.encode(&sealed));

    Ok(())
}

fn cmd_open(key: &str, sealed: &str) -> Result<()> {
    let key = ChannelKey::from_base64(key).context("Invalid channel key")?;
    let sealed = BASE64
        .decode(sealed.trim())
        .context("Envelope is not valid base64")?;

    let (timestamp, mut message) = Message::open(&key, &sealed).context("Failed to open envelope")?;
    message
        .decrypt_content(&key)
        .context("Failed to open message content")?;

    println!("{}", "Message".bold());
    println!("  Timestamp: {}", timestamp);
    println!("  Node:      {}", display_id(message.sender()));
    println!("  Channel:   {}", display_id(message.channel()));
    if let Some(sound) = message.sound() {
        println!("  Sound:     {}", sound.name);
    }
    println!("  Priority:  {}", message.priority_level());

    match message.decode_content()? {
        Some(MessageContent::Text { text, title }) => {
            if let Some(title) = title {
                println!("  Title:     {}", title.bright_cyan());
            }
            println!("  Text:      {}", text);
        }
        Some(MessageContent::Link { url, title }) => {
            if let Some(title) = title {
                println!("  Title:     {}", title.bright_cyan());
            }
            println!("  Link:      {}", url.bright_blue());
        }
        Some(MessageContent::File { name, size }) => {
            println!("  File:      {} ({} bytes)", name, size);
        }
        Some(MessageContent::Image { width, height }) => {
            println!("  Image:     {}x{}", width, height);
        }
        None => println!("  {}", "(no content)".dimmed()),
    }

    Ok(())
}

fn display_id(id: &[u8]) -> String {
    if id.is_empty() {
        "(anonymous)".dimmed().to_string()
    } else {
        match std::str::from_utf8(id) {
            Ok(s) => s.to_string(),
            Err(_) => hex::encode(id),
        }
    }
}

/// Parse `WIDTHxHEIGHT`
fn parse_dimensions(raw: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {}", raw))?;
    let width = w.trim().parse().map_err(|_| format!("bad width: {}", w))?;
    let height = h.trim().parse().map_err(|_| format!("bad height: {}", h))?;
    Ok((width, height))
}

/// The CLI never holds transport keys, so marked bodies are not opened.
struct NoTransport;

impl BodyDecryptor for NoTransport {
    fn decrypt(&self, _body: &[u8]) -> Result<Vec<u8>> {
        bail!("transport keys are not available to the CLI")
    }
}

/// Run the gate's signature check for a body sent with `content_type`.
/// Returns whether the body was marked as transport-encrypted.
fn check_signature(
    gate: &GateConfig,
    role: SignerRole,
    signature: &str,
    content_type: &str,
    public_key: &str,
    raw: Vec<u8>,
) -> Result<bool> {
    if raw.len() > gate.max_body_size {
        bail!(
            "Body is {} bytes, over the configured limit of {}",
            raw.len(),
            gate.max_body_size
        );
    }

    let codec = BodyCodec::new(gate, Arc::new(NoTransport));
    let encrypted = codec.is_encrypted(content_type);

    let request = PublishRequest::new(content_type, raw.clone())
        .with_header(role.header_name(gate), signature.trim());
    // Signatures cover the wire bytes, so the raw body is enough either way
    let body = DecodedBody::plain(raw);

    if !RequestAuthenticator::new(gate).verify(role, &request, &body, public_key.trim()) {
        bail!("signature verification failed");
    }
    Ok(encrypted)
}

fn cmd_verify(
    config_path: Option<PathBuf>,
    role: SignerRole,
    signature: &str,
    content_type: &str,
    public_key: &str,
    body: PathBuf,
) -> Result<()> {
    let path = config::resolve(config_path.as_deref())?;
    let gate = config::load_or_create(&path)?;

    let raw = std::fs::read(&body)
        .with_context(|| format!("Failed to read body file {}", body.display()))?;
    let len = raw.len();

    match check_signature(&gate, role, signature, content_type, public_key, raw) {
        Ok(encrypted) => {
            println!("{} Valid {} signature ({} bytes)", "✓".green(), role, len);
            println!("  Header:    {}", role.header_name(&gate).bright_cyan());
            if encrypted {
                println!("  {}", "Body is transport-encrypted".dimmed());
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Signature rejected", "✗".red());
            Err(e)
        }
    }
}

fn cmd_config(path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    let path = config::resolve(path.as_deref())?;
    let mut gate = config::load_or_create(&path)?;

    match action {
        ConfigAction::Set { key, value } => {
            gate.set(&key, &value)?;
            gate.save_to(&path)?;
            println!("{} Set {} = {}", "✓".green(), key.bright_cyan(), value);
        }
        ConfigAction::Get { key } => match gate.get(&key) {
            Some(value) => println!("{}", value),
            None => bail!("Unknown config key: {}", key),
        },
        ConfigAction::List => {
            println!("{}", "Gate Configuration".bold());
            for (key, value) in gate.entries() {
                println!("  {:<26} {}", key.bright_cyan(), value);
            }
        }
        ConfigAction::Reset => {
            let defaults = GateConfig::default();
            defaults.save_to(&path)?;
            println!("{} Config reset to defaults", "✓".green());
        }
        ConfigAction::Path => println!("{}", path.display()),
    }

    Ok(())
}
