use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "instadl")]
#[command(author, version, about = "Resolve Instagram posts to direct media URLs")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API (default)
    Serve {
        /// Host to bind to (overrides INSTADL_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides INSTADL_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Resolve one post URL and print the selected media URL
    Resolve {
        /// Instagram post or reel URL
        #[arg(required = true)]
        url: String,
    },

    /// Check that yt-dlp is reachable
    CheckTools,
}
