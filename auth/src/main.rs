use std::sync::Arc;

use anyhow::{Context, Result};
use authd_auth::args::{AccountCommand, Cli, Commands, ServeArgs};
use authd_auth::config::Config;
use authd_auth::server::Pipeline;
use authd_auth::admin;
use authd_common::shutdown::shutdown_signal;
use authd_store::SqliteStore;
use clap::Parser;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    authd_common::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Account(account) => match account.command {
            AccountCommand::Create {
                username,
                email,
                config,
            } => admin::create(&config, &username, &email).await,
        },
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = Config::load(&args.config).context("loading config")?;
    let port = args.port.unwrap_or(config.listen_port);

    let store = Arc::new(
        SqliteStore::connect(&config.database_filename)
            .await
            .context("connecting to credential store")?,
    );

    let bind_addr = format!("{}:{}", args.bind, port);
    let pipeline = Pipeline::bind(&bind_addr, store)
        .await
        .with_context(|| format!("failed to bind UDP socket on {bind_addr}"))?;
    let local_addr = pipeline.local_addr()?;

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel_clone.cancel();
    });

    println!(
        "{}{}",
        "🔐 Auth service listening on ".green(),
        local_addr.to_string().green().dimmed(),
    );
    pipeline.run(cancel).await?;
    println!("{}", "🛑 Auth service shut down gracefully.".red());
    Ok(())
}
