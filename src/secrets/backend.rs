//! Secret Backend: (service, account) 로 주소 지정되는 불투명한 시크릿 저장소
//!
//! - `KeyringBackend`: OS 키체인/키링 (`keyring` crate)
//! - `MemoryBackend`: 테스트용 인메모리 저장소

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use keyring::{Entry, Error as KeyringError};

use crate::error::{VaultError, VaultResult};

/// 암호문 저장소 경계
///
/// 구현체는 이미 접근 제어된 저장소로 간주합니다. 실패는 `BackendUnavailable`로 보고합니다.
pub trait SecretBackend {
    fn set(&self, service: &str, account: &str, value: &str) -> VaultResult<()>;

    /// 값이 없으면 `Ok(None)`
    fn get(&self, service: &str, account: &str) -> VaultResult<Option<String>>;
}

impl<B: SecretBackend + ?Sized> SecretBackend for Box<B> {
    fn set(&self, service: &str, account: &str, value: &str) -> VaultResult<()> {
        (**self).set(service, account, value)
    }

    fn get(&self, service: &str, account: &str) -> VaultResult<Option<String>> {
        (**self).get(service, account)
    }
}

impl<B: SecretBackend + ?Sized> SecretBackend for Arc<B> {
    fn set(&self, service: &str, account: &str, value: &str) -> VaultResult<()> {
        (**self).set(service, account, value)
    }

    fn get(&self, service: &str, account: &str) -> VaultResult<Option<String>> {
        (**self).get(service, account)
    }
}

fn map_keyring_error(err: KeyringError) -> VaultError {
    VaultError::BackendUnavailable(err.to_string())
}

/// OS 시크릿 저장소 (macOS Keychain, Windows Credential Manager, Secret Service)
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringBackend;

impl KeyringBackend {
    pub fn new() -> Self {
        Self
    }
}

impl SecretBackend for KeyringBackend {
    fn set(&self, service: &str, account: &str, value: &str) -> VaultResult<()> {
        let entry = Entry::new(service, account).map_err(map_keyring_error)?;
        entry.set_password(value).map_err(map_keyring_error)
    }

    fn get(&self, service: &str, account: &str) -> VaultResult<Option<String>> {
        let entry = Entry::new(service, account).map_err(map_keyring_error)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(err) => Err(map_keyring_error(err)),
        }
    }
}

/// 인메모리 Secret Backend
///
/// 저장된 암호문을 직접 읽고 바꿀 수 있어 변조/비동기화 시나리오 테스트에 사용합니다.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<(String, String), String>>,
    fail_writes: Mutex<bool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 값을 직접 덮어쓰기
    pub fn insert_raw(&self, service: &str, account: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((service.to_string(), account.to_string()), value.to_string());
    }

    /// 저장된 값을 직접 읽기
    pub fn get_raw(&self, service: &str, account: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(service.to_string(), account.to_string()))
            .cloned()
    }

    /// true면 이후 `set`이 `BackendUnavailable`로 실패
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }
}

impl SecretBackend for MemoryBackend {
    fn set(&self, service: &str, account: &str, value: &str) -> VaultResult<()> {
        if *self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(VaultError::BackendUnavailable(
                "memory backend is rejecting writes".to_string(),
            ));
        }
        self.insert_raw(service, account, value);
        Ok(())
    }

    fn get(&self, service: &str, account: &str) -> VaultResult<Option<String>> {
        Ok(self.get_raw(service, account))
    }
}
