use clap::Parser;

/// ClickCrate Actions CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "clickcrate-actions",
    version,
    about = "Solana Actions endpoints for creating and selling ClickCrate merch"
)]
pub struct Cli {
    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Solana cluster to use (devnet or mainnet)
    #[arg(long)]
    pub network: Option<String>,

    /// Solana JSON-RPC URL
    #[arg(long)]
    pub rpc_url: Option<String>,
}
