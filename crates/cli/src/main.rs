use std::{path::PathBuf, sync::Arc};

use {
    anyhow::{Context, Result},
    backchannel_common::ThreadMessenger,
    backchannel_config::BackchannelConfig,
    backchannel_daemon::Handler,
    backchannel_notify::{NotifyDelivery, parse_claude_hook, parse_codex_notify},
    backchannel_resume::{CliResumeRunner, ResumeRunner},
    backchannel_routes::RouteStore,
    backchannel_slack::{SlackMessenger, run_socket_mode},
    clap::{Parser, Subcommand, ValueEnum},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "backchannel",
    about = "Backchannel — Slack DM notifications and reply-resume bridge for CLI agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the reply-resume daemon (default when no subcommand is provided).
    Daemon,
    /// Forward an agent notify payload as a Slack DM notification.
    Notify {
        /// Which agent produced the payload.
        #[arg(long)]
        tool: ToolArg,
        /// Payload JSON. Codex passes it as a process argument; claude
        /// supplies it on stdin instead.
        payload: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ToolArg {
    Codex,
    Claude,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => run_daemon().await,
        Commands::Notify { tool, payload } => run_notify(tool, payload).await,
    }
}

fn load_required_config() -> Result<BackchannelConfig> {
    let path = backchannel_config::find_config_file()
        .context("no config file found; create ~/.config/backchannel/backchannel.toml")?;
    backchannel_config::load_config(&path)
}

async fn run_daemon() -> Result<()> {
    let config = load_required_config()?;
    config.validate_daemon()?;

    let routes = Arc::new(RouteStore::default_path()?);
    info!(routes = %routes.path().display(), "backchannel daemon starting");

    let messenger: Arc<dyn ThreadMessenger> =
        Arc::new(SlackMessenger::new(&config.slack.bot_token)?);
    let runner: Arc<dyn ResumeRunner> = Arc::new(CliResumeRunner);
    let handler = Arc::new(Handler::new(routes, messenger, runner));

    run_socket_mode(&config.slack.app_token, handler).await
}

async fn run_notify(tool: ToolArg, payload: Option<String>) -> Result<()> {
    let config = load_required_config()?;
    config.validate_notify()?;

    let input = match tool {
        ToolArg::Codex => {
            let raw = payload.context("codex notify requires the payload argument")?;
            let codex_home = resolve_codex_home(&config);
            parse_codex_notify(&raw, &codex_home)?
        },
        ToolArg::Claude => {
            let raw = read_stdin().await?;
            parse_claude_hook(&raw)?
        },
    };

    let Some(input) = input else {
        anyhow::bail!("payload is not a notification-worthy event");
    };
    if input.skip {
        warn!(
            reason = input.skip_reason.as_deref().unwrap_or("unknown"),
            "notification suppressed"
        );
        return Ok(());
    }

    let messenger: Arc<dyn ThreadMessenger> =
        Arc::new(SlackMessenger::new(&config.slack.bot_token)?);
    let routes = Arc::new(RouteStore::default_path()?);
    let delivery = NotifyDelivery::new(
        messenger,
        routes,
        config.destinations.dm.target_user_id.as_str(),
    );
    delivery.deliver(&input).await
}

/// Codex home directory: config override, then `$CODEX_HOME`, then `~/.codex`.
fn resolve_codex_home(config: &BackchannelConfig) -> PathBuf {
    if let Some(home) = &config.notify.codex_home {
        return home.clone();
    }
    if let Ok(value) = std::env::var("CODEX_HOME")
        && !value.is_empty()
    {
        return PathBuf::from(value);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".codex")
}

async fn read_stdin() -> Result<String> {
    use tokio::io::AsyncReadExt;
    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .context("failed to read hook payload from stdin")?;
    if raw.trim().is_empty() {
        anyhow::bail!("empty hook payload on stdin");
    }
    Ok(raw)
}
