//! Application configuration loaded from environment variables.
//!
//! Required: `HMAC_SECRET`
//! Optional: `AUTHORITY_KEYPAIR_PATH`, `ENTRANCE_FEE_LAMPORTS`, `INTERVAL_SECS`,
//!           `KEY_HASH`, `SUBSCRIPTION_ID`, `CALLBACK_COMPUTE_LIMIT`,
//!           `REQUEST_CONFIRMATIONS`, `HTTP_PORT`, `KEEPER_POLL_INTERVAL_MS`,
//!           `FULFILLMENT_DELAY_MS`, `FULFILLMENT_CONCURRENCY`,
//!           `TREASURY_FLOAT_LAMPORTS`, `PAYOUT_REJECT_LIST`, `STATE_PATH`

use anyhow::{Context, Result};
use raffle::state::RaffleConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_KEYPAIR_PATH: &str = "~/.config/solana/id.json";

/// Configuration for the raffle keeper service.
#[derive(Clone)]
pub struct AppConfig {
    /// Oracle authority. Only this key may deliver randomness to the raffle.
    pub authority_keypair: Arc<Keypair>,
    /// Secret key for HMAC-SHA256 randomness generation.
    pub hmac_secret: Vec<u8>,
    /// Engine parameters: fee, interval and oracle request settings.
    pub raffle: RaffleConfig,
    /// HTTP server port.
    pub http_port: u16,
    /// How often the keeper evaluates upkeep.
    pub keeper_poll_interval: Duration,
    /// Simulated oracle latency before a request is fulfilled.
    pub fulfillment_delay: Duration,
    /// Maximum concurrent fulfillment tasks.
    pub fulfillment_concurrency: usize,
    /// Lamports held by the treasury before any entry is paid in.
    pub treasury_float: u64,
    /// Recipients whose payouts are refused.
    pub payout_reject_list: Vec<Pubkey>,
    /// Snapshot file for round state across restarts.
    pub state_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let keypair_path = lookup("AUTHORITY_KEYPAIR_PATH")
            .unwrap_or_else(|| DEFAULT_KEYPAIR_PATH.into());
        let keypair_path = shellexpand::tilde(&keypair_path).to_string();
        let authority_keypair = read_keypair_file(&keypair_path)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("failed to read keypair from {keypair_path}"))?;

        let hmac_secret = lookup("HMAC_SECRET")
            .filter(|s| !s.is_empty())
            .context("HMAC_SECRET env var must be set")?
            .into_bytes();

        let mut raffle = RaffleConfig::new(
            parse_or(&lookup, "ENTRANCE_FEE_LAMPORTS", 10_000_000)?,
            parse_or(&lookup, "INTERVAL_SECS", 30)?,
        );
        if let Some(key_hash) = lookup("KEY_HASH") {
            raffle.key_hash = parse_key_hash(&key_hash)?;
        }
        raffle.subscription_id = parse_or(&lookup, "SUBSCRIPTION_ID", 0)?;
        raffle.callback_compute_limit = parse_or(
            &lookup,
            "CALLBACK_COMPUTE_LIMIT",
            RaffleConfig::DEFAULT_CALLBACK_COMPUTE_LIMIT,
        )?;
        raffle.request_confirmations = parse_or(
            &lookup,
            "REQUEST_CONFIRMATIONS",
            RaffleConfig::DEFAULT_REQUEST_CONFIRMATIONS,
        )?;
        raffle.validate().context("invalid raffle configuration")?;

        let payout_reject_list = lookup("PAYOUT_REJECT_LIST")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| {
                        Pubkey::from_str(s)
                            .with_context(|| format!("invalid pubkey in PAYOUT_REJECT_LIST: {s}"))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let fulfillment_concurrency = parse_or(&lookup, "FULFILLMENT_CONCURRENCY", 4)?;
        anyhow::ensure!(
            fulfillment_concurrency > 0,
            "FULFILLMENT_CONCURRENCY must be at least 1"
        );

        Ok(Self {
            authority_keypair: Arc::new(authority_keypair),
            hmac_secret,
            raffle,
            http_port: parse_or(&lookup, "HTTP_PORT", 8080)?,
            keeper_poll_interval: Duration::from_millis(
                parse_or(&lookup, "KEEPER_POLL_INTERVAL_MS", 1_000u64)?.max(1),
            ),
            fulfillment_delay: Duration::from_millis(parse_or(
                &lookup,
                "FULFILLMENT_DELAY_MS",
                2_000,
            )?),
            fulfillment_concurrency,
            treasury_float: parse_or(&lookup, "TREASURY_FLOAT_LAMPORTS", 0)?,
            payout_reject_list,
            state_path: lookup("STATE_PATH")
                .filter(|s| !s.is_empty())
                .map(|p| PathBuf::from(shellexpand::tilde(&p).to_string())),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("invalid {key}: {raw}")),
        None => Ok(default),
    }
}

/// Decode a base58 key hash into exactly 32 bytes.
fn parse_key_hash(encoded: &str) -> Result<[u8; 32]> {
    let bytes = bs58::decode(encoded.trim())
        .into_vec()
        .with_context(|| format!("KEY_HASH is not base58: {encoded}"))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("KEY_HASH must be 32 bytes, got {}", b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::{write_keypair_file, Signer};
    use std::collections::HashMap;

    fn keypair_file() -> (String, Keypair) {
        let keypair = Keypair::new();
        let path = std::env::temp_dir().join(format!(
            "raffle-keeper-{}-{}.json",
            std::process::id(),
            keypair.pubkey()
        ));
        write_keypair_file(&keypair, &path).unwrap();
        (path.display().to_string(), keypair)
    }

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let (path, _) = keypair_file();
        let mut vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        vars.entry("AUTHORITY_KEYPAIR_PATH".into()).or_insert(path);
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("HMAC_SECRET", "s3cret")]).unwrap();

        assert_eq!(config.hmac_secret, b"s3cret");
        assert_eq!(config.raffle.entrance_fee, 10_000_000);
        assert_eq!(config.raffle.interval, 30);
        assert_eq!(config.raffle.request_confirmations, 3);
        assert_eq!(config.raffle.callback_compute_limit, 500_000);
        assert_eq!(config.raffle.key_hash, [0u8; 32]);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.keeper_poll_interval, Duration::from_secs(1));
        assert_eq!(config.fulfillment_delay, Duration::from_secs(2));
        assert_eq!(config.fulfillment_concurrency, 4);
        assert_eq!(config.treasury_float, 0);
        assert!(config.payout_reject_list.is_empty());
        assert!(config.state_path.is_none());
    }

    #[test]
    fn requires_hmac_secret() {
        assert!(load(&[]).is_err());
        assert!(load(&[("HMAC_SECRET", "")]).is_err());
    }

    #[test]
    fn reads_overrides() {
        let rejected = Pubkey::new_from_array([9; 32]);
        let key_hash = bs58::encode([7u8; 32]).into_string();
        let rejected_str = rejected.to_string();
        let config = load(&[
            ("HMAC_SECRET", "x"),
            ("ENTRANCE_FEE_LAMPORTS", "250"),
            ("INTERVAL_SECS", "5"),
            ("KEY_HASH", &key_hash),
            ("SUBSCRIPTION_ID", "42"),
            ("FULFILLMENT_DELAY_MS", "0"),
            ("PAYOUT_REJECT_LIST", &format!(" {rejected_str} ,")),
            ("STATE_PATH", "/tmp/raffle.json"),
        ])
        .unwrap();

        assert_eq!(config.raffle.entrance_fee, 250);
        assert_eq!(config.raffle.interval, 5);
        assert_eq!(config.raffle.key_hash, [7u8; 32]);
        assert_eq!(config.raffle.subscription_id, 42);
        assert_eq!(config.fulfillment_delay, Duration::ZERO);
        assert_eq!(config.payout_reject_list, vec![rejected]);
        assert_eq!(config.state_path, Some(PathBuf::from("/tmp/raffle.json")));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load(&[("HMAC_SECRET", "x"), ("ENTRANCE_FEE_LAMPORTS", "0")]).is_err());
        assert!(load(&[("HMAC_SECRET", "x"), ("INTERVAL_SECS", "soon")]).is_err());
        assert!(load(&[("HMAC_SECRET", "x"), ("KEY_HASH", "abc")]).is_err());
        assert!(load(&[("HMAC_SECRET", "x"), ("PAYOUT_REJECT_LIST", "nope")]).is_err());
        assert!(load(&[("HMAC_SECRET", "x"), ("FULFILLMENT_CONCURRENCY", "0")]).is_err());
    }

    #[test]
    fn reads_authority_keypair() {
        let (path, keypair) = keypair_file();
        let config = load(&[("HMAC_SECRET", "x"), ("AUTHORITY_KEYPAIR_PATH", &path)]).unwrap();
        assert_eq!(config.authority_keypair.pubkey(), keypair.pubkey());
    }

    #[test]
    fn unreadable_keypair_is_an_error() {
        let err = load(&[
            ("HMAC_SECRET", "x"),
            ("AUTHORITY_KEYPAIR_PATH", "/nonexistent/raffle/id.json"),
        ])
        .err()
        .unwrap();
        assert!(format!("{err:#}").contains("/nonexistent/raffle/id.json"));
    }

    #[test]
    fn keypair_defaults_to_solana_cli_path() {
        let missing: HashMap<String, String> = HashMap::from([("HMAC_SECRET".into(), "x".into())]);
        let expected = shellexpand::tilde(DEFAULT_KEYPAIR_PATH).to_string();
        match AppConfig::from_lookup(|key| missing.get(key).cloned()) {
            Ok(config) => {
                let on_disk = read_keypair_file(&expected).unwrap();
                assert_eq!(config.authority_keypair.pubkey(), on_disk.pubkey());
            }
            Err(e) => assert!(format!("{e:#}").contains(&expected)),
        }
    }
}
