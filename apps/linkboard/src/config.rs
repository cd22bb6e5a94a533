use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use client_core::{keys::account_address_from_key_file, StoreConfig};
use shared::domain::{AccountAddress, Commitment, ProgramId};
use tracing::warn;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "linkboard.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Left blank, the client runs without a gateway.
    pub endpoint: Option<String>,
    pub program_id: String,
    pub list_account: Option<String>,
    pub list_account_key_path: Option<PathBuf>,
    pub wallet_key_path: Option<PathBuf>,
    pub trust_store_path: Option<PathBuf>,
    pub commitment: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: Some("http://127.0.0.1:8899".into()),
            program_id: "gif-program".into(),
            list_account: None,
            list_account_key_path: Some("./data/list_account.key".into()),
            wallet_key_path: Some("./data/wallet.key".into()),
            trust_store_path: Some("./data/trusted_connections.json".into()),
            commitment: Commitment::default().as_str().into(),
        }
    }
}

impl Settings {
    /// Resolves the values the list store needs. An explicit list account wins
    /// over the key file it would otherwise be derived from.
    pub fn store_config(&self) -> anyhow::Result<StoreConfig> {
        let endpoint = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                Url::parse(raw).with_context(|| format!("invalid endpoint url '{raw}'"))
            })
            .transpose()?;

        let program_id = self.program_id.trim();
        if program_id.is_empty() {
            return Err(anyhow!("program id must not be empty"));
        }

        let commitment = Commitment::parse(self.commitment.trim())
            .ok_or_else(|| anyhow!("unknown commitment level '{}'", self.commitment))?;

        let list_account = match (&self.list_account, &self.list_account_key_path) {
            (Some(account), _) if !account.trim().is_empty() => {
                AccountAddress::new(account.trim())
            }
            (_, Some(path)) => account_address_from_key_file(path).with_context(|| {
                format!("failed to derive list account from '{}'", path.display())
            })?,
            _ => return Err(anyhow!("no list account or list account key configured")),
        };

        Ok(StoreConfig {
            endpoint,
            program_id: ProgramId::new(program_id),
            list_account,
            commitment,
        })
    }
}

pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        warn!("config: ignoring unreadable settings file");
        return;
    };
    apply_values(settings, |key| file_cfg.get(key).cloned());
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    apply_values(settings, |key| lookup(&format!("APP__{}", key.to_uppercase())));
}

fn apply_values(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("endpoint") {
        settings.endpoint = Some(v);
    }
    if let Some(v) = lookup("program_id") {
        settings.program_id = v;
    }
    if let Some(v) = lookup("list_account") {
        settings.list_account = Some(v);
    }
    if let Some(v) = lookup("list_account_key_path") {
        settings.list_account_key_path = Some(v.into());
    }
    if let Some(v) = lookup("wallet_key_path") {
        settings.wallet_key_path = Some(v.into());
    }
    if let Some(v) = lookup("trust_store_path") {
        settings.trust_store_path = Some(v.into());
    }
    if let Some(v) = lookup("commitment") {
        settings.commitment = v;
    }
}
