//! 자격 증명 이중 저장소 모듈
//!
//! identity마다 새 대칭키를 만들어 키와 암호문을 서로 다른 곳에 둡니다.
//!
//! - 키: 저장 루트의 `auth_data.json` (Key Registry)
//! - 암호문: OS 시크릿 저장소 (Secret Backend), `(service, identity)`로 주소 지정
//! - 한쪽 저장소만 유출되어서는 평문 토큰을 얻을 수 없음

pub mod backend;
pub mod cipher;
pub mod manager;
pub mod registry;

pub use backend::{KeyringBackend, MemoryBackend, SecretBackend};
pub use manager::{RotationReceipt, TokenManager};
pub use registry::KeyRegistry;
