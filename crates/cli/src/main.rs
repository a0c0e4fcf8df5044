use clap::{Parser, Subcommand};
use lib::addr::ChatAddress;
use lib::client::{HttpTransport, Receiver, SendOutcome, Sender, Transport};
use lib::ui::{SinkHandler, TranscriptSink};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: PARLEY_CONFIG_PATH or ~/.parley/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the relay (service endpoints for send and long-poll receive).
    Relay {
        /// Config file path (default: PARLEY_CONFIG_PATH or ~/.parley/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Service port (default from config or 16161)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Join a channel: stream messages posted to it and send lines read from
    /// stdin. /clear clears the transcript, /exit quits.
    Chat {
        /// Config file path (default: PARLEY_CONFIG_PATH or ~/.parley/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Channel to join (default from config chat.channel)
        #[arg(long)]
        channel: Option<String>,

        /// User id shown to other participants (default from config chat.user)
        #[arg(long)]
        user: Option<String>,
    },

    /// Post a single message to a channel and exit.
    Send {
        /// Config file path (default: PARLEY_CONFIG_PATH or ~/.parley/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Channel to post to (default from config chat.channel)
        #[arg(long)]
        channel: Option<String>,

        /// User id the message is attributed to (default from config chat.user)
        #[arg(long)]
        user: Option<String>,

        /// Message text
        text: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("parley {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Relay { config, port }) => {
            if let Err(e) = run_relay(config, port).await {
                log::error!("relay failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config, channel, user }) => {
            if let Err(e) = run_chat(config, channel, user).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send { config, channel, user, text }) => {
            if let Err(e) = run_send(config, channel, user, text).await {
                log::error!("send failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_relay(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, _) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.relay.port = p;
    }
    log::info!("starting relay on {}:{}", config.relay.bind, config.relay.port);
    lib::relay::run_relay(config).await
}

/// Transcript sink over stdout: incoming messages are printed a line at a
/// time; clear wipes the terminal.
struct StdoutSink;

impl TranscriptSink for StdoutSink {
    fn append(&self, fragment: &str) {
        println!("{}", fragment);
    }

    fn clear(&self) {
        use std::io::Write;
        print!("\x1b[2J\x1b[H");
        let _ = std::io::stdout().flush();
    }
}

/// Resolve (channel, user) from flags and config defaults.
fn resolve_address(
    config: &lib::config::Config,
    channel: Option<String>,
    user: Option<String>,
) -> anyhow::Result<ChatAddress> {
    let channel = channel
        .or_else(|| config.chat.channel.clone())
        .ok_or_else(|| anyhow::anyhow!("no channel given (use --channel or set chat.channel)"))?;
    let user = user
        .or_else(|| config.chat.user.clone())
        .ok_or_else(|| anyhow::anyhow!("no user given (use --user or set chat.user)"))?;
    Ok(ChatAddress::new(channel, user)?)
}

async fn run_chat(
    config_path: Option<std::path::PathBuf>,
    channel: Option<String>,
    user: Option<String>,
) -> anyhow::Result<()> {
    use std::io;

    let (config, _) = lib::config::load_config(config_path)?;
    let addr = resolve_address(&config, channel, user)?;
    let service_url = lib::config::resolve_service_url(&config);
    let timeout = lib::config::resolve_request_timeout(&config.client);

    // Separate transport handles: the sender owns its own, and the receiver's
    // poll can stay pending without sharing state with sends.
    let send_transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&service_url, timeout)?);
    let poll_transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&service_url, timeout)?);

    let sink: Arc<dyn TranscriptSink> = Arc::new(StdoutSink);
    let receiver = Arc::new(Receiver::with_backoff(
        addr.clone(),
        poll_transport,
        lib::config::resolve_backoff(&config.client),
    ));
    let _poll_task = Arc::clone(&receiver).start(Arc::new(SinkHandler::new(Arc::clone(&sink))));
    let sender = Sender::new(addr, send_transport);

    println!(
        "joined {} as {} via {} (/exit to quit, /clear to clear)",
        sender.address().channel(),
        sender.address().user(),
        service_url
    );

    let stdin = io::stdin();
    loop {
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim_end_matches(['\r', '\n']);
        if input.trim().is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        if input.eq_ignore_ascii_case("/clear") {
            sink.clear();
            continue;
        }
        match sender.send(input).await {
            Ok(SendOutcome::Sent) => {}
            Ok(SendOutcome::Dropped) => eprintln!("send dropped: previous send still in flight"),
            Err(e) => eprintln!("send error: {}", e),
        }
    }

    receiver.stop();
    Ok(())
}

async fn run_send(
    config_path: Option<std::path::PathBuf>,
    channel: Option<String>,
    user: Option<String>,
    text: String,
) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let addr = resolve_address(&config, channel, user)?;
    let service_url = lib::config::resolve_service_url(&config);
    let timeout = lib::config::resolve_request_timeout(&config.client);

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&service_url, timeout)?);
    let sender = Sender::new(addr, transport);
    match sender.send(&text).await? {
        SendOutcome::Sent => println!("sent"),
        SendOutcome::Dropped => println!("dropped"),
    }
    Ok(())
}
