use clap::Parser;
use todo_reminders::config::{Config, DaemonConfig, NotificationConfig};
use todo_reminders::daemon;
use todo_reminders::error::Result;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "todo-remindersd")]
#[command(about = "Todo reminder scheduling daemon")]
struct Cli {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    db: Option<String>,

    #[arg(long, env = "TODO_REMINDERS_TOKEN")]
    token: Option<String>,

    #[arg(long, default_value_t = false, help = "Log reminders instead of showing desktop notifications")]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,todo_reminders=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(db) = cli.db {
        config.database_path = Some(db);
    }
    let daemon_config = config.daemon.get_or_insert(DaemonConfig {
        host: None,
        port: None,
        token: None,
    });
    if cli.host.is_some() {
        daemon_config.host = cli.host;
    }
    if cli.port.is_some() {
        daemon_config.port = cli.port;
    }
    if cli.token.is_some() {
        daemon_config.token = cli.token;
    }
    if cli.headless {
        let notifications = config.notifications.get_or_insert(NotificationConfig {
            desktop: None,
            app_name: None,
        });
        notifications.desktop = Some(false);
    }

    daemon::run(&config).await
}
