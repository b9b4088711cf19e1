//! 토큰 암호화/복호화
//!
//! 암호문 포맷 (v1, base64 인코딩 전):
//! - version: `0x01` (1 byte)
//! - nonce: 24 bytes (XChaCha20-Poly1305)
//! - ciphertext: AEAD 결과 (= 암호문 + 태그)
//!
//! AAD: version 바이트 (포맷 바인딩)

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::Rng;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{VaultError, VaultResult};

/// 암호문 포맷 버전
pub const FORMAT_VERSION: u8 = 0x01;

/// 키 길이 (256-bit)
pub const KEY_LEN: usize = 32;

/// Nonce 길이 (XChaCha20-Poly1305용 24 bytes)
pub const NONCE_LEN: usize = 24;

/// Poly1305 태그 길이
const TAG_LEN: usize = 16;

/// identity별 대칭키. drop 시 zeroize
#[derive(Clone)]
pub struct KeyMaterial {
    bytes: [u8; KEY_LEN],
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

impl KeyMaterial {
    /// Key Registry에 저장할 텍스트 표현 (base64)
    pub fn encode(&self) -> String {
        BASE64.encode(self.bytes)
    }

    /// Key Registry 텍스트에서 복원
    pub fn decode(encoded: &str) -> VaultResult<Self> {
        let mut bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| VaultError::InvalidKeyMaterial(e.to_string()))?;

        if bytes.len() != KEY_LEN {
            let len = bytes.len();
            bytes.zeroize();
            return Err(VaultError::InvalidKeyMaterial(format!(
                "expected {} bytes, got {}",
                KEY_LEN, len
            )));
        }

        let mut key = Self {
            bytes: [0u8; KEY_LEN],
        };
        key.bytes.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(key)
    }
}

/// 새 키 생성 (CSPRNG)
pub fn generate_key() -> KeyMaterial {
    let mut key = KeyMaterial {
        bytes: [0u8; KEY_LEN],
    };
    rand::thread_rng().fill(&mut key.bytes);
    key
}

/// 토큰 바이트를 암호화하여 저장용 텍스트로 반환
///
/// 호출마다 새 nonce를 사용하므로 같은 입력도 매번 다른 암호문이 됩니다.
pub fn encrypt(key: &KeyMaterial, plaintext: &[u8]) -> VaultResult<String> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill(&mut nonce);

    let cipher = XChaCha20Poly1305::new((&key.bytes).into());
    let aad = [FORMAT_VERSION];
    let sealed = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|_| VaultError::InvalidKeyMaterial("encryption failed".to_string()))?;

    let mut framed = Vec::with_capacity(1 + NONCE_LEN + sealed.len());
    framed.push(FORMAT_VERSION);
    framed.extend_from_slice(&nonce);
    framed.extend_from_slice(&sealed);

    Ok(BASE64.encode(framed))
}

/// 저장된 암호문을 복호화
///
/// 인코딩 오류, 잘린 입력, 알 수 없는 버전, 태그 불일치는 모두 `DecryptionFailed`.
pub fn decrypt(key: &KeyMaterial, ciphertext: &str) -> VaultResult<Zeroizing<Vec<u8>>> {
    let framed = BASE64
        .decode(ciphertext.trim())
        .map_err(|_| VaultError::DecryptionFailed)?;

    if framed.len() < 1 + NONCE_LEN + TAG_LEN || framed[0] != FORMAT_VERSION {
        return Err(VaultError::DecryptionFailed);
    }

    let (header, rest) = framed.split_at(1);
    let (nonce, sealed) = rest.split_at(NONCE_LEN);

    let cipher = XChaCha20Poly1305::new((&key.bytes).into());
    let plaintext = cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: sealed,
                aad: header,
            },
        )
        .map_err(|_| VaultError::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = generate_key();
        let sealed = encrypt(&key, b"tok-123").unwrap();
        let opened = decrypt(&key, &sealed).unwrap();
        assert_eq!(opened.as_slice(), b"tok-123");
    }

    #[test]
    fn test_ciphertext_is_randomized() {
        let key = generate_key();
        let a = encrypt(&key, b"same token").unwrap();
        let b = encrypt(&key, b"same token").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = generate_key();
        let key2 = generate_key();
        let sealed = encrypt(&key1, b"secret").unwrap();

        // 다른 키로 복호화 시도하면 실패해야 함
        assert!(matches!(
            decrypt(&key2, &sealed),
            Err(VaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_every_bit_flip_is_detected() {
        let key = generate_key();
        let sealed = encrypt(&key, b"tok").unwrap();
        let raw = BASE64.decode(&sealed).unwrap();

        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let result = decrypt(&key, &BASE64.encode(&tampered));
                assert!(
                    matches!(result, Err(VaultError::DecryptionFailed)),
                    "flip at byte {} bit {} was not detected",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_malformed_ciphertext_fails() {
        let key = generate_key();
        for input in ["", "not base64!!", "AQID"] {
            assert!(matches!(
                decrypt(&key, input),
                Err(VaultError::DecryptionFailed)
            ));
        }
    }

    #[test]
    fn test_key_material_encoding() {
        let key = generate_key();
        let encoded = key.encode();
        let decoded = KeyMaterial::decode(&encoded).unwrap();

        let sealed = encrypt(&key, b"x").unwrap();
        assert_eq!(decrypt(&decoded, &sealed).unwrap().as_slice(), b"x");

        assert_ne!(generate_key().encode(), encoded);
    }

    #[test]
    fn test_invalid_key_material() {
        assert!(matches!(
            KeyMaterial::decode("%%%"),
            Err(VaultError::InvalidKeyMaterial(_))
        ));
        assert!(matches!(
            KeyMaterial::decode(&BASE64.encode([0u8; 16])),
            Err(VaultError::InvalidKeyMaterial(_))
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = generate_key();
        assert_eq!(format!("{:?}", key), "KeyMaterial([REDACTED])");
    }
}
