use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "SRP login relay for game servers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Runs the UDP SRP handshake service.
    Serve(ServeArgs),
    /// Out-of-band account provisioning.
    Account(AccountArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Path to the INI config file. A missing file falls back to
    /// in-memory defaults.
    #[arg(short, long, env = "AUTHD_CONFIG", default_value = "authd.ini")]
    pub config: PathBuf,

    /// Overrides the UDP port read from the config file.
    #[arg(long, env = "AUTHD_PORT")]
    pub port: Option<u16>,

    /// Interface address to bind. The protocol has no notion of virtual
    /// hosting, so only the port is normally worth changing.
    #[arg(long, env = "AUTHD_BIND", default_value = "0.0.0.0")]
    pub bind: String,
}

#[derive(Args, Debug, Clone)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AccountCommand {
    /// Creates a user, prints a freshly generated password once.
    Create {
        username: String,
        email: String,

        #[arg(short, long, env = "AUTHD_CONFIG", default_value = "authd.ini")]
        config: PathBuf,
    },
}
