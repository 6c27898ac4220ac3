//! Dirlink - directory login bridge
//!
//! Authenticates users against LDAP or Active Directory and keeps a local
//! user record in step with the directory.

mod logging;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dirlink_auth::LdapAuthProvider;
use dirlink_core::config::DirlinkConfig;
use dirlink_metadata::MemoryUserStore;
use dirlink_server::DirlinkServer;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "dirlink")]
#[command(author = "Dirlink Team")]
#[command(version = dirlink_core::VERSION)]
#[command(about = "LDAP and Active Directory login bridge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DIRLINK_CONFIG")]
    config: Option<String>,

    /// Bind address
    #[arg(long, env = "DIRLINK_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port number
    #[arg(short, long, env = "DIRLINK_PORT")]
    port: Option<u16>,

    /// Database URL
    #[arg(long, env = "DIRLINK_DATABASE_URL")]
    database_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DIRLINK_LOG_LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the login server
    Server,

    /// Show version information
    Version,

    /// Connect to the directory with the service account and report
    CheckLdap {
        /// Also look up this user by the unique attribute
        #[arg(short, long)]
        username: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DirlinkConfig::from_file(path)?,
        None => DirlinkConfig::from_env(),
    };

    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    logging::init(&config, cli.log_level.as_deref());
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Some(Commands::Version) => print_banner(),
        Some(Commands::CheckLdap { username }) => check_ldap(&config, username.as_deref()).await?,
        Some(Commands::Server) | None => {
            print_banner();
            run_server(config).await?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        r#"
     _ _      _ _       _
  __| (_)_ __| (_)_ __ | | __
 / _` | | '__| | | '_ \| |/ /
| (_| | | |  | | | | | |   <
 \__,_|_|_|  |_|_|_| |_|_|\_\

   Directory Login Bridge
   Version: {}
"#,
        dirlink_core::VERSION
    );
}

async fn run_server(config: DirlinkConfig) -> anyhow::Result<()> {
    info!("Starting Dirlink server...");
    info!("Database: {}", config.database.url);
    match config.ldap_settings() {
        Some(ldap) => info!("Directory: {} (base {})", ldap.url, ldap.search_base()),
        None => info!("Directory login disabled"),
    }

    DirlinkServer::new(config).run().await?;
    Ok(())
}

async fn check_ldap(config: &DirlinkConfig, username: Option<&str>) -> anyhow::Result<()> {
    let Some(settings) = config.ldap_settings() else {
        bail!("Directory login is not configured or not enabled");
    };

    // the probe never reconciles, so nothing is written to a store
    let provider = LdapAuthProvider::new(settings.clone(), Arc::new(MemoryUserStore::new()));

    provider
        .probe()
        .await
        .with_context(|| format!("Cannot bind to {}", settings.url))?;
    println!("Connected to {}", settings.url);
    if settings.bind_dn.is_empty() {
        println!("No service account configured, searches run anonymously");
    } else {
        println!("Service bind as {} succeeded", settings.bind_dn);
    }

    if let Some(username) = username {
        let attribute = provider.engine().unique().source().to_string();
        match provider.lookup(username).await.context("Search failed")? {
            Some(entry) => {
                println!("Found {}", entry.dn);
                let mut names: Vec<_> = entry.attributes.keys().collect();
                names.sort();
                for name in names {
                    println!("  {}: {}", name, entry.attributes[name].join(", "));
                }
            }
            None => println!("No entry with {}={} under {}", attribute, username, settings.search_base()),
        }
    }

    Ok(())
}
