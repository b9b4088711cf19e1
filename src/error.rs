//! Token Vault Error Types
//!
//! 볼트 전역 에러 타입 정의

use serde::Serialize;
use thiserror::Error;

/// 볼트 에러
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Invalid identity: {0:?}")]
    InvalidIdentity(String),

    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    #[error("Decryption failed: ciphertext or key did not authenticate")]
    DecryptionFailed,

    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Secret backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Refresh denied: {0}")]
    RefreshDenied(String),

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VaultError {
    /// 호출자/스케줄러가 분기할 수 있는 고정 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::UnsupportedPlatform(_) => "UNSUPPORTED_PLATFORM",
            VaultError::InvalidIdentity(_) => "INVALID_IDENTITY",
            VaultError::UnknownIdentity(_) => "UNKNOWN_IDENTITY",
            VaultError::CredentialNotFound(_) => "CREDENTIAL_NOT_FOUND",
            VaultError::DecryptionFailed => "DECRYPTION_FAILED",
            VaultError::InvalidKeyMaterial(_) => "INVALID_KEY_MATERIAL",
            VaultError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            VaultError::RefreshDenied(_) => "REFRESH_DENIED",
            VaultError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            VaultError::Config(_) => "CONFIG_ERROR",
            VaultError::Io(_) => "IO_ERROR",
            VaultError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// CLI 출력용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
}

impl From<&VaultError> for ErrorReport {
    fn from(error: &VaultError) -> Self {
        ErrorReport {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// 볼트 결과 타입
pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_report_carries_code_and_message() {
        let err = VaultError::CredentialNotFound("bob".to_string());
        let report = ErrorReport::from(&err);
        assert_eq!(report.code, "CREDENTIAL_NOT_FOUND");
        assert_eq!(report.message, "Credential not found: bob");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["code"], "CREDENTIAL_NOT_FOUND");
    }

    #[test]
    fn test_decryption_and_absence_have_distinct_codes() {
        assert_ne!(
            VaultError::DecryptionFailed.code(),
            VaultError::CredentialNotFound("x".into()).code()
        );
    }
}
