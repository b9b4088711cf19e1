//! Identity Provider 경계 및 OAuth2 토큰 엔드포인트 구현
//!
//! rotate 시 현재 토큰을 새 토큰으로 교환합니다.
//! ArcGIS 계열 포털은 `grant_type=exchange_refresh_token`으로 2주짜리 refresh token을 재발급하고,
//! 거부 시 HTTP 200 + `{"error": {...}}` 본문을 돌려주므로 둘 다 처리합니다.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::config::ProviderConfig;
use crate::error::{VaultError, VaultResult};

/// Identity Provider가 발급한 교체 토큰
pub struct RefreshedToken {
    pub token: Zeroizing<String>,
    /// 유효 기간 (초)
    pub expires_in: Option<i64>,
    /// 발급 시점
    pub issued_at: DateTime<Utc>,
}

impl RefreshedToken {
    pub fn new(token: impl Into<String>, expires_in: Option<i64>) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
            expires_in,
            issued_at: Utc::now(),
        }
    }

    /// 만료 시점
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| self.issued_at.checked_add_signed(lifetime))
    }
}

impl std::fmt::Debug for RefreshedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshedToken")
            .field("token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// 토큰 교체 경계
pub trait IdentityProvider {
    /// 현재 토큰이 더 이상 받아들여지지 않으면 `RefreshDenied`
    fn refresh(&self, current_token: &str) -> VaultResult<RefreshedToken>;
}

/// 토큰 엔드포인트 응답 (RFC 6749 + ArcGIS 확장 필드)
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    refresh_token_expires_in: Option<i64>,
    error: Option<serde_json::Value>,
    error_description: Option<String>,
}

/// OAuth2 토큰 엔드포인트 기반 Identity Provider
pub struct OAuthRefreshProvider {
    config: ProviderConfig,
    client: reqwest::blocking::Client,
}

impl OAuthRefreshProvider {
    pub fn new(config: ProviderConfig) -> VaultResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                VaultError::ProviderUnavailable(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }
}

impl IdentityProvider for OAuthRefreshProvider {
    fn refresh(&self, current_token: &str) -> VaultResult<RefreshedToken> {
        let mut params = vec![
            ("grant_type", self.config.grant_type.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", current_token),
            ("f", "json"),
        ];
        if let Some(redirect_uri) = &self.config.redirect_uri {
            params.push(("redirect_uri", redirect_uri.as_str()));
        }

        tracing::debug!(url = %self.config.token_url, grant_type = %self.config.grant_type, "requesting token refresh");

        let response = self
            .client
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .map_err(|e| VaultError::ProviderUnavailable(format!("Token refresh failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = Zeroizing::new(response.text().map_err(|e| {
            VaultError::ProviderUnavailable(format!("Failed to read refresh response: {}", e))
        })?);

        interpret_response(status, &body, Utc::now())
    }
}

/// 토큰 엔드포인트 응답 해석
///
/// - 400/401/403, 또는 본문에 `error`가 있으면 `RefreshDenied`
/// - 그 외 비정상 상태나 파싱 불가 본문은 `ProviderUnavailable`
/// - 새 토큰은 `refresh_token` 우선, 없으면 `access_token`
fn interpret_response(status: u16, body: &str, now: DateTime<Utc>) -> VaultResult<RefreshedToken> {
    let parsed = serde_json::from_str::<TokenResponse>(body);

    if matches!(status, 400 | 401 | 403) {
        let reason = parsed
            .ok()
            .and_then(|r| describe_error(r.error.as_ref(), r.error_description.as_deref()))
            .unwrap_or_else(|| format!("token endpoint returned {}", status));
        return Err(VaultError::RefreshDenied(reason));
    }
    if !(200..300).contains(&status) {
        return Err(VaultError::ProviderUnavailable(format!(
            "token endpoint returned {}",
            status
        )));
    }

    let response = parsed.map_err(|e| {
        VaultError::ProviderUnavailable(format!("Failed to parse refresh response: {}", e))
    })?;

    if response.error.is_some() {
        let reason = describe_error(response.error.as_ref(), response.error_description.as_deref())
            .unwrap_or_else(|| "token endpoint reported an error".to_string());
        return Err(VaultError::RefreshDenied(reason));
    }

    let token = response
        .refresh_token
        .filter(|t| !t.is_empty())
        .or(response.access_token.filter(|t| !t.is_empty()))
        .ok_or_else(|| {
            VaultError::ProviderUnavailable("refresh response carried no token".to_string())
        })?;

    Ok(RefreshedToken {
        token: Zeroizing::new(token),
        expires_in: response.refresh_token_expires_in.or(response.expires_in),
        issued_at: now,
    })
}

fn describe_error(error: Option<&serde_json::Value>, description: Option<&str>) -> Option<String> {
    let base = match error? {
        serde_json::Value::String(code) => code.clone(),
        serde_json::Value::Object(fields) => fields
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| serde_json::Value::Object(fields.clone()).to_string()),
        other => other.to_string(),
    };

    Some(match description {
        Some(desc) if !desc.is_empty() => format!("{}: {}", base, desc),
        _ => base,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_refresh_token_grant_response() {
        let body = r#"{"access_token":"at","refresh_token":"rt-new","expires_in":1800,"refresh_token_expires_in":1209600}"#;
        let refreshed = interpret_response(200, body, now()).unwrap();
        assert_eq!(refreshed.token.as_str(), "rt-new");
        assert_eq!(refreshed.expires_in, Some(1_209_600));
        assert_eq!(
            refreshed.expires_at(),
            Some(now() + Duration::days(14))
        );
    }

    #[test]
    fn test_access_token_only_response() {
        let body = r#"{"access_token":"at-new","token_type":"bearer","expires_in":1800}"#;
        let refreshed = interpret_response(200, body, now()).unwrap();
        assert_eq!(refreshed.token.as_str(), "at-new");
        assert_eq!(refreshed.expires_in, Some(1800));
    }

    #[test]
    fn test_oauth_error_status_is_denied() {
        let body = r#"{"error":"invalid_grant","error_description":"refresh token expired"}"#;
        match interpret_response(400, body, now()) {
            Err(VaultError::RefreshDenied(reason)) => {
                assert_eq!(reason, "invalid_grant: refresh token expired")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_arcgis_error_body_is_denied() {
        let body = r#"{"error":{"code":498,"error":"invalid_request","message":"Invalid token.","details":[]}}"#;
        match interpret_response(200, body, now()) {
            Err(VaultError::RefreshDenied(reason)) => assert_eq!(reason, "Invalid token."),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unauthorized_without_body_is_denied() {
        assert!(matches!(
            interpret_response(401, "", now()),
            Err(VaultError::RefreshDenied(_))
        ));
    }

    #[test]
    fn test_server_error_is_unavailable() {
        assert!(matches!(
            interpret_response(503, "busy", now()),
            Err(VaultError::ProviderUnavailable(_))
        ));
    }

    #[test]
    fn test_missing_token_is_unavailable() {
        assert!(matches!(
            interpret_response(200, r#"{"expires_in":60}"#, now()),
            Err(VaultError::ProviderUnavailable(_))
        ));
        assert!(matches!(
            interpret_response(200, "<html>", now()),
            Err(VaultError::ProviderUnavailable(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let refreshed = RefreshedToken::new("secret-token", Some(60));
        let rendered = format!("{:?}", refreshed);
        assert!(!rendered.contains("secret-token"));
    }
}
