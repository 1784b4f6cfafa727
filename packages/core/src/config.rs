use std::env;
use std::fmt;
use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;

use crate::cli::Cli;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_EMAIL_FROM: &str = "clickcrateofficial@gmail.com";
const DEFAULT_PRICE_API_URL: &str = "https://api.coingecko.com";
const DEFAULT_BLINK_BASE_URL: &str = "https://api.clickcrate.xyz/blink";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub solana_network: SolanaNetwork,
    pub solana_rpc_url: String,
    pub das_rpc_url: String,
    pub relay_wallet: Pubkey,
    pub clickcrate_api_url: String,
    pub clickcrate_api_key: String,
    pub mint_api_url: String,
    pub mint_api_key: String,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
    pub price_api_url: String,
    pub blink_base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolanaNetwork {
    Devnet,
    Mainnet,
}

impl SolanaNetwork {
    /// CAIP-2 chain id advertised in the `X-Blockchain-Ids` header.
    pub fn chain_id(&self) -> &'static str {
        match self {
            SolanaNetwork::Devnet => "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
            SolanaNetwork::Mainnet => "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolanaNetwork::Devnet => "devnet",
            SolanaNetwork::Mainnet => "mainnet",
        }
    }
}

impl FromStr for SolanaNetwork {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "devnet" => Ok(SolanaNetwork::Devnet),
            "mainnet" | "mainnet-beta" => Ok(SolanaNetwork::Mainnet),
            other => Err(format!("Invalid SOLANA_NETWORK: {}", other)),
        }
    }
}

impl fmt::Display for SolanaNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key/value source. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| format!("{} is required", key))
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| "PORT must be a valid port number".to_string())?,
            None => DEFAULT_PORT,
        };

        let solana_network = match lookup("SOLANA_NETWORK") {
            Some(raw) => raw.parse::<SolanaNetwork>()?,
            None => SolanaNetwork::Devnet,
        };

        let solana_rpc_url = required("SOLANA_RPC_URL")?;
        let das_rpc_url = lookup("DAS_RPC_URL").unwrap_or_else(|| solana_rpc_url.clone());

        let relay_wallet = Pubkey::from_str(&required("RELAY_WALLET_PUBKEY")?)
            .map_err(|_| "RELAY_WALLET_PUBKEY must be a valid public key".to_string())?;

        Ok(Self {
            port,
            solana_network,
            solana_rpc_url,
            das_rpc_url,
            relay_wallet,
            clickcrate_api_url: required("CLICKCRATE_API_URL")?,
            clickcrate_api_key: required("CLICKCRATE_API_KEY")?,
            mint_api_url: required("MINT_API_URL")?,
            mint_api_key: required("MINT_API_KEY")?,
            email_api_url: required("EMAIL_API_URL")?,
            email_api_key: required("EMAIL_API_KEY")?,
            email_from: lookup("EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
            price_api_url: lookup("PRICE_API_URL")
                .unwrap_or_else(|| DEFAULT_PRICE_API_URL.to_string()),
            blink_base_url: lookup("BLINK_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BLINK_BASE_URL.to_string()),
        })
    }

    /// Command-line flags win over the environment.
    pub fn with_overrides(mut self, cli: &Cli) -> Result<Self, String> {
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(network) = cli.network.as_deref() {
            self.solana_network = network.parse()?;
        }
        if let Some(rpc_url) = cli.rpc_url.as_ref() {
            self.solana_rpc_url = rpc_url.clone();
        }
        Ok(self)
    }
}
