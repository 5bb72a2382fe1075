use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "admingate-backend", about = "Authentication and session backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run pending database migrations and exit
    Migrate,

    /// Create a superuser account (no password; signs in by magic link)
    SeedSuperuser {
        #[arg(long)]
        email: String,

        #[arg(long, default_value = "Superuser")]
        name: String,
    },

    /// Start the HTTP server (default when no command is given)
    Serve,
}
