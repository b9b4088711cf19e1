//! 볼트 설정
//!
//! 프로세스 전역 기본값 없이, 생성자에 명시적으로 넘기는 설정 구조체.
//! 환경 변수(`TOKEN_VAULT_*`)에서 읽을 수 있습니다.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{VaultError, VaultResult};

/// 기본 서비스 이름 (Secret Backend의 service, 저장 디렉토리 이름)
pub const DEFAULT_SERVICE_NAME: &str = "token-vault";
/// 기본 Key Registry 파일 이름
pub const DEFAULT_REGISTRY_FILE: &str = "auth_data.json";
/// 기본 refresh grant
pub const DEFAULT_GRANT_TYPE: &str = "refresh_token";
/// Identity Provider 요청 기본 타임아웃
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_SERVICE: &str = "TOKEN_VAULT_SERVICE";
const ENV_HOME: &str = "TOKEN_VAULT_HOME";
const ENV_REGISTRY_FILE: &str = "TOKEN_VAULT_REGISTRY_FILE";
const ENV_TOKEN_URL: &str = "TOKEN_VAULT_TOKEN_URL";
const ENV_CLIENT_ID: &str = "TOKEN_VAULT_CLIENT_ID";
const ENV_GRANT_TYPE: &str = "TOKEN_VAULT_GRANT_TYPE";
const ENV_REDIRECT_URI: &str = "TOKEN_VAULT_REDIRECT_URI";
const ENV_TIMEOUT_SECS: &str = "TOKEN_VAULT_TIMEOUT_SECS";

/// Token Manager 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    /// Secret Backend service 이름이자 저장 디렉토리 이름
    pub service_name: String,
    /// 저장 루트 강제 지정 (없으면 플랫폼 규칙으로 결정)
    pub storage_root: Option<PathBuf>,
    /// 저장 루트 안의 Key Registry 파일 이름
    pub registry_file: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            storage_root: None,
            registry_file: DEFAULT_REGISTRY_FILE.to_string(),
        }
    }
}

impl VaultConfig {
    /// 저장 루트를 지정한 설정 (테스트, 볼트 이전 시 사용)
    pub fn with_storage_root(root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: Some(root.into()),
            ..Self::default()
        }
    }

    /// 프로세스 환경 변수에서 설정 로드
    pub fn from_env() -> VaultResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 key → value 조회 함수로 설정 로드
    pub fn from_lookup<F>(lookup: F) -> VaultResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(service) = non_empty(lookup(ENV_SERVICE)) {
            config.service_name = service;
        }
        if let Some(home) = non_empty(lookup(ENV_HOME)) {
            config.storage_root = Some(PathBuf::from(home));
        }
        if let Some(file) = non_empty(lookup(ENV_REGISTRY_FILE)) {
            if file.contains('/') || file.contains('\\') {
                return Err(VaultError::Config(format!(
                    "{} must be a file name, got {:?}",
                    ENV_REGISTRY_FILE, file
                )));
            }
            config.registry_file = file;
        }

        Ok(config)
    }
}

/// OAuth2 토큰 엔드포인트 설정 (rotate 전용)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub token_url: Url,
    pub client_id: String,
    /// `refresh_token` 또는 ArcGIS 계열의 `exchange_refresh_token`
    pub grant_type: String,
    pub redirect_uri: Option<String>,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(token_url: Url, client_id: impl Into<String>) -> Self {
        Self {
            token_url,
            client_id: client_id.into(),
            grant_type: DEFAULT_GRANT_TYPE.to_string(),
            redirect_uri: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> VaultResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> VaultResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = non_empty(lookup(ENV_TOKEN_URL))
            .ok_or_else(|| VaultError::Config(format!("{} is not set", ENV_TOKEN_URL)))?;
        let token_url = Url::parse(&raw_url)
            .map_err(|e| VaultError::Config(format!("{} is invalid: {}", ENV_TOKEN_URL, e)))?;
        if token_url.scheme() != "https" && token_url.scheme() != "http" {
            return Err(VaultError::Config(format!(
                "{} must be an http(s) URL",
                ENV_TOKEN_URL
            )));
        }

        let client_id = non_empty(lookup(ENV_CLIENT_ID))
            .ok_or_else(|| VaultError::Config(format!("{} is not set", ENV_CLIENT_ID)))?;

        let mut config = Self::new(token_url, client_id);

        if let Some(grant_type) = non_empty(lookup(ENV_GRANT_TYPE)) {
            config.grant_type = grant_type;
        }
        config.redirect_uri = non_empty(lookup(ENV_REDIRECT_URI));
        if let Some(raw) = non_empty(lookup(ENV_TIMEOUT_SECS)) {
            let secs: u64 = raw.parse().map_err(|_| {
                VaultError::Config(format!("{} must be a number of seconds", ENV_TIMEOUT_SECS))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_vault_config_defaults() {
        let config = VaultConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, VaultConfig::default());
        assert_eq!(config.registry_file, "auth_data.json");
        assert!(config.storage_root.is_none());
    }

    #[test]
    fn test_vault_config_overrides() {
        let config = VaultConfig::from_lookup(lookup_from(&[
            ("TOKEN_VAULT_SERVICE", "arcgis"),
            ("TOKEN_VAULT_HOME", "/tmp/vault"),
            ("TOKEN_VAULT_REGISTRY_FILE", " keys.json "),
        ]))
        .unwrap();
        assert_eq!(config.service_name, "arcgis");
        assert_eq!(config.storage_root, Some(PathBuf::from("/tmp/vault")));
        assert_eq!(config.registry_file, "keys.json");
    }

    #[test]
    fn test_vault_config_rejects_registry_path() {
        let result = VaultConfig::from_lookup(lookup_from(&[(
            "TOKEN_VAULT_REGISTRY_FILE",
            "../elsewhere.json",
        )]));
        assert!(matches!(result, Err(VaultError::Config(_))));
    }

    #[test]
    fn test_provider_config_requires_url_and_client() {
        let missing = ProviderConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(missing, Err(VaultError::Config(_))));

        let bad_url = ProviderConfig::from_lookup(lookup_from(&[
            ("TOKEN_VAULT_TOKEN_URL", "not a url"),
            ("TOKEN_VAULT_CLIENT_ID", "abc"),
        ]));
        assert!(matches!(bad_url, Err(VaultError::Config(_))));
    }

    #[test]
    fn test_provider_config_from_lookup() {
        let config = ProviderConfig::from_lookup(lookup_from(&[
            (
                "TOKEN_VAULT_TOKEN_URL",
                "https://www.arcgis.com/sharing/rest/oauth2/token",
            ),
            ("TOKEN_VAULT_CLIENT_ID", "client-1"),
            ("TOKEN_VAULT_GRANT_TYPE", "exchange_refresh_token"),
            ("TOKEN_VAULT_REDIRECT_URI", "urn:ietf:wg:oauth:2.0:oob"),
            ("TOKEN_VAULT_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.client_id, "client-1");
        assert_eq!(config.grant_type, "exchange_refresh_token");
        assert_eq!(
            config.redirect_uri.as_deref(),
            Some("urn:ietf:wg:oauth:2.0:oob")
        );
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_provider_config_bad_timeout() {
        let result = ProviderConfig::from_lookup(lookup_from(&[
            ("TOKEN_VAULT_TOKEN_URL", "https://example.com/token"),
            ("TOKEN_VAULT_CLIENT_ID", "abc"),
            ("TOKEN_VAULT_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(result, Err(VaultError::Config(_))));
    }
}
