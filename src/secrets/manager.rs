//! Token Manager - 키/암호문 쌍 관리
//!
//! - 키는 identity마다 새로 생성하여 Key Registry 파일에 저장
//! - 암호문은 Secret Backend에 (service, identity)로 저장
//! - 두 저장소는 항상 짝으로 쓰고 읽음 (키 먼저, 암호문 나중)
//!
//! 쓰기 순서 때문에 크래시 시 최악의 경우 짝 없는 키가 남으며, 이는 다음 store에서 덮어써집니다.
//! 프로세스 간 잠금은 없으므로 같은 identity를 여러 프로세스가 동시에 쓰면 안 됩니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::provider::IdentityProvider;
use crate::secrets::backend::{KeyringBackend, SecretBackend};
use crate::secrets::cipher::{self, KeyMaterial};
use crate::secrets::registry::KeyRegistry;
use crate::storage;

/// rotate 결과 (토큰 값은 포함하지 않음)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationReceipt {
    pub identity: String,
    pub issued_at: DateTime<Utc>,
    pub expires_in: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Token Manager
///
/// 생성 시 저장 루트를 결정하고 Key Registry를 디스크에서 다시 읽습니다.
pub struct TokenManager<B = KeyringBackend> {
    service_name: String,
    registry: KeyRegistry,
    backend: B,
}

impl TokenManager<KeyringBackend> {
    /// OS 키링을 Secret Backend로 사용하는 기본 구성
    ///
    /// 저장 규칙이 없는 플랫폼에서는 `UnsupportedPlatform`으로 실패합니다.
    pub fn open(config: VaultConfig) -> VaultResult<Self> {
        Self::with_backend(config, KeyringBackend::new())
    }
}

impl<B: SecretBackend> TokenManager<B> {
    pub fn with_backend(config: VaultConfig, backend: B) -> VaultResult<Self> {
        if config.service_name.trim().is_empty() {
            return Err(VaultError::Config(
                "service name must not be empty".to_string(),
            ));
        }

        let storage_root = storage::resolve(&config)?;
        let registry = KeyRegistry::load(storage_root.join(&config.registry_file))?;

        tracing::info!(
            service = %config.service_name,
            root = %storage_root.display(),
            identities = registry.len(),
            "token manager ready"
        );

        Ok(Self {
            service_name: config.service_name,
            registry,
            backend,
        })
    }

    /// Key Registry에 등록된 identity 목록
    pub fn identities(&self) -> Vec<String> {
        self.registry.identities()
    }

    /// 토큰 저장 (기존 자격 증명은 완전히 교체)
    ///
    /// 1. 새 키 생성 후 토큰 암호화
    /// 2. Key Registry에 키 저장 (이전 키는 무조건 덮어씀)
    /// 3. Secret Backend에 암호문 저장
    ///
    /// 2단계가 실패하면 메모리와 디스크 모두 이전 키가 유지됩니다.
    /// 3단계가 실패하면 registry를 이전 상태로 되돌려 기존 자격 증명을 계속 쓸 수 있게 합니다.
    pub fn store(&mut self, identity: &str, token: &str) -> VaultResult<()> {
        validate_identity(identity)?;

        let key = cipher::generate_key();
        let sealed = cipher::encrypt(&key, token.as_bytes())?;

        let previous = self.registry.get(identity).ok().map(str::to_string);
        self.registry.put(identity, key.encode())?;

        if let Err(err) = self.backend.set(&self.service_name, identity, &sealed) {
            self.roll_back(identity, previous);
            return Err(err);
        }

        tracing::info!(identity = %identity, "credential stored");
        Ok(())
    }

    /// 토큰 조회 (상태 변경 없음)
    ///
    /// - 암호문 없음: `CredentialNotFound`
    /// - 암호문은 있는데 키 없음 (저장소 비동기화): `UnknownIdentity`
    /// - 변조/손상: `DecryptionFailed`
    pub fn retrieve(&self, identity: &str) -> VaultResult<Zeroizing<String>> {
        validate_identity(identity)?;

        let sealed = self
            .backend
            .get(&self.service_name, identity)?
            .ok_or_else(|| VaultError::CredentialNotFound(identity.to_string()))?;

        let key = KeyMaterial::decode(self.registry.get(identity)?)?;
        let plaintext = cipher::decrypt(&key, &sealed)?;
        let token = std::str::from_utf8(&plaintext).map_err(|_| VaultError::DecryptionFailed)?;

        tracing::debug!(identity = %identity, "credential retrieved");
        Ok(Zeroizing::new(token.to_string()))
    }

    /// 토큰 교체
    ///
    /// 현재 토큰으로 Identity Provider에서 새 토큰을 받은 뒤 store 합니다.
    /// 새 토큰 저장이 끝나기 전까지 기존 토큰은 그대로 유지됩니다.
    pub fn rotate(
        &mut self,
        identity: &str,
        provider: &dyn IdentityProvider,
    ) -> VaultResult<RotationReceipt> {
        let current = self.retrieve(identity)?;

        let refreshed = provider.refresh(&current).map_err(|err| {
            tracing::warn!(identity = %identity, error = %err, "token refresh failed, keeping current credential");
            err
        })?;

        if refreshed.token.is_empty() {
            return Err(VaultError::ProviderUnavailable(
                "identity provider returned an empty token".to_string(),
            ));
        }

        self.store(identity, &refreshed.token)?;

        let receipt = RotationReceipt {
            identity: identity.to_string(),
            issued_at: refreshed.issued_at,
            expires_in: refreshed.expires_in,
            expires_at: refreshed.expires_at(),
        };

        tracing::info!(
            identity = %identity,
            expires_at = ?receipt.expires_at,
            "credential rotated"
        );
        Ok(receipt)
    }

    fn roll_back(&mut self, identity: &str, previous: Option<String>) {
        let result = match previous {
            Some(key) => self.registry.put(identity, key),
            None => self.registry.remove(identity).map(|_| ()),
        };

        if let Err(err) = result {
            tracing::warn!(
                identity = %identity,
                error = %err,
                "failed to restore key registry after backend write failure"
            );
        }
    }
}

fn validate_identity(identity: &str) -> VaultResult<()> {
    if identity.trim().is_empty() {
        return Err(VaultError::InvalidIdentity(identity.to_string()));
    }
    Ok(())
}
