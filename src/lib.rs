//! token-vault - 로컬 토큰 볼트 라이브러리
//!
//! 2주 내외로 만료되는 OAuth2 bearer 토큰을 identity별로 보관하고 교체합니다.
//! 토큰은 identity별 키로 암호화되어 OS 시크릿 저장소에, 키는 로컬 JSON 파일에 따로 저장됩니다.

pub mod config;
pub mod error;
pub mod provider;
pub mod secrets;
pub mod storage;

pub use config::{ProviderConfig, VaultConfig};
pub use error::{ErrorReport, VaultError, VaultResult};
pub use provider::{IdentityProvider, OAuthRefreshProvider, RefreshedToken};
pub use secrets::{KeyringBackend, MemoryBackend, RotationReceipt, SecretBackend, TokenManager};
