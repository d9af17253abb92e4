use dotenv::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub sui_rpc_url: String,
    /// Deployed MediPay package id; only objects whose type tag carries it
    /// are considered for history assembly.
    pub package_id: String,
    pub rpc_timeout_secs: u64,
    pub lookup_timeout_secs: u64,
    pub max_concurrent_objects: usize,
    pub sent_tx_limit: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);
        let sui_rpc_url = env::var("SUI_RPC_URL")
            .unwrap_or_else(|_| "https://fullnode.mainnet.sui.io:443".to_string());
        let package_id = env::var("MEDIPAY_PACKAGE_ID").unwrap_or_default();
        let rpc_timeout_secs = env::var("RPC_TIMEOUT_SECS")
            .map(|v| v.parse().unwrap_or(30))
            .unwrap_or(30);
        let lookup_timeout_secs = env::var("LOOKUP_TIMEOUT_SECS")
            .map(|v| v.parse().unwrap_or(10))
            .unwrap_or(10);
        let max_concurrent_objects = env::var("MAX_CONCURRENT_OBJECTS")
            .map(|v| v.parse().unwrap_or_else(|_| num_cpus::get()))
            .unwrap_or_else(|_| num_cpus::get());
        let sent_tx_limit = env::var("SENT_TX_LIMIT")
            .map(|v| v.parse().unwrap_or(50))
            .unwrap_or(50);

        Self {
            server_host,
            server_port,
            sui_rpc_url,
            package_id,
            rpc_timeout_secs,
            lookup_timeout_secs,
            max_concurrent_objects,
            sent_tx_limit,
        }
    }
}
