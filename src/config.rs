use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const BASE_URL_VAR: &str = "PAM_BASE_URL";
pub const API_TOKEN_VAR: &str = "PAM_API_TOKEN";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("pamform"))
}

/// Provider settings as written in a file or a manifest's `[provider]` block.
///
/// Every field is optional; layers are merged before the result is checked.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderBlock {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
}

impl ProviderBlock {
    /// Overlay `other` on top of `self`.
    fn merge(self, other: Self) -> Self {
        Self {
            base_url: other.base_url.or(self.base_url),
            api_token: other.api_token.or(self.api_token),
        }
    }

    /// Load a provider file.
    ///
    /// With no explicit path the default file is optional; an explicit path
    /// must exist.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (PathBuf::from(shellexpand::tilde(path).as_ref()), true),
            None => (config_dir()?.join("provider.toml"), false),
        };

        if !path.exists() {
            if explicit {
                bail!("Provider config not found: {}", path.display());
            }
            log::debug!("No provider config at {}", path.display());
            return Ok(Self::default());
        }

        Self::read(&path)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let block: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid provider config: {}", path.display()))?;
        log::debug!("Loaded provider config from {}", path.display());
        Ok(block)
    }
}

// Token stays out of debug output.
impl fmt::Debug for ProviderBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBlock")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Tenant URL and credentials the client is built from.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_token: String,
}

impl ProviderConfig {
    /// Merge the provider file, the manifest block and the environment,
    /// later sources winning.
    pub fn load(config_path: Option<&str>, manifest: Option<&ProviderBlock>) -> Result<Self> {
        let file = ProviderBlock::load(config_path)?;
        Self::resolve(file, manifest.cloned(), |name| std::env::var(name).ok())
    }

    pub fn resolve(
        file: ProviderBlock,
        manifest: Option<ProviderBlock>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let from_env = ProviderBlock {
            base_url: env(BASE_URL_VAR),
            api_token: env(API_TOKEN_VAR),
        };
        let merged = file
            .merge(manifest.unwrap_or_default())
            .merge(from_env);

        let base_url = match merged.base_url.filter(|v| !v.trim().is_empty()) {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => bail!(
                "Tenant base URL is not configured: set {BASE_URL_VAR} or base_url in [provider]"
            ),
        };
        let api_token = match merged.api_token.filter(|v| !v.trim().is_empty()) {
            Some(token) => token,
            None => bail!(
                "API token is not configured: set {API_TOKEN_VAR} or api_token in [provider]"
            ),
        };

        Ok(Self {
            base_url,
            api_token,
        })
    }

    pub fn client(&self) -> pamclient::Client {
        pamclient::Client::new(&self.base_url, &self.api_token)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(url: Option<&str>, token: Option<&str>) -> ProviderBlock {
        ProviderBlock {
            base_url: url.map(String::from),
            api_token: token.map(String::from),
        }
    }

    #[test]
    fn test_later_layers_win() {
        let file = block(Some("https://file.example/"), Some("file-token"));
        let manifest = block(Some("https://manifest.example"), None);

        let config = ProviderConfig::resolve(file.clone(), Some(manifest.clone()), |_| None).unwrap();
        assert_eq!(config.base_url, "https://manifest.example");
        assert_eq!(config.api_token, "file-token");

        let config = ProviderConfig::resolve(file, Some(manifest), |name| {
            (name == API_TOKEN_VAR).then(|| "env-token".to_string())
        })
        .unwrap();
        assert_eq!(config.api_token, "env-token");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config =
            ProviderConfig::resolve(block(Some("https://t.example/api/"), Some("t")), None, |_| None)
                .unwrap();
        assert_eq!(config.base_url, "https://t.example/api");
    }

    #[test]
    fn test_missing_values_name_the_variable() {
        let err = ProviderConfig::resolve(block(None, Some("t")), None, |_| None).unwrap_err();
        assert!(err.to_string().contains(BASE_URL_VAR));

        let err =
            ProviderConfig::resolve(block(Some("https://t.example"), Some("  ")), None, |_| None)
                .unwrap_err();
        assert!(err.to_string().contains(API_TOKEN_VAR));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provider.toml");
        fs::write(&path, "base_url = \"https://t.example\"\napi_token = \"secret\"\n").unwrap();

        let block = ProviderBlock::load(path.to_str()).unwrap();
        assert_eq!(block.base_url.as_deref(), Some("https://t.example"));
        assert!(!format!("{block:?}").contains("secret"));

        let missing = dir.path().join("nope.toml");
        assert!(ProviderBlock::load(missing.to_str()).is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provider.toml");
        fs::write(&path, "base_uri = \"https://t.example\"\n").unwrap();
        assert!(ProviderBlock::load(path.to_str()).is_err());
    }
}
