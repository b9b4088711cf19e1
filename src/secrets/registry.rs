//! Key Registry: identity → 키 텍스트 매핑
//!
//! 파일 포맷: 저장 루트의 `auth_data.json`, `{"<identity>": "<base64 key>"}` 형태의 평면 JSON.
//! 버전 필드는 없습니다.
//!
//! 파일이 손상되어 파싱할 수 없으면 빈 registry로 시작합니다.
//! 이 경우 기존 자격 증명은 모두 복구할 수 없게 되지만 볼트는 계속 사용할 수 있습니다.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{VaultError, VaultResult};
use crate::storage::write_private_file;

#[derive(Debug)]
pub struct KeyRegistry {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl KeyRegistry {
    /// registry 파일 로드
    ///
    /// - 파일 없음: 빈 registry
    /// - 파싱 실패: 빈 registry (경고 로그)
    /// - 그 외 IO 오류: 에러 반환
    pub fn load(path: impl Into<PathBuf>) -> VaultResult<Self> {
        let path = path.into();

        let entries = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "key registry is unreadable, starting empty; previously stored credentials cannot be decrypted"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "key registry loaded");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// identity의 키 텍스트 조회
    pub fn get(&self, identity: &str) -> VaultResult<&str> {
        self.entries
            .get(identity)
            .map(String::as_str)
            .ok_or_else(|| VaultError::UnknownIdentity(identity.to_string()))
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// 기존 항목을 덮어쓰고 전체 매핑을 파일에 저장
    ///
    /// 파일 저장이 실패하면 메모리의 매핑도 바뀌지 않습니다.
    pub fn put(&mut self, identity: &str, key_material: String) -> VaultResult<()> {
        let mut next = self.entries.clone();
        next.insert(identity.to_string(), key_material);
        self.commit(next)
    }

    /// 항목 삭제 후 저장. 삭제된 키 텍스트 반환
    pub fn remove(&mut self, identity: &str) -> VaultResult<Option<String>> {
        let mut next = self.entries.clone();
        let removed = next.remove(identity);
        if removed.is_some() {
            self.commit(next)?;
        }
        Ok(removed)
    }

    /// 등록된 identity 목록 (정렬됨)
    pub fn identities(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 새 매핑을 먼저 파일에 쓰고, 성공한 경우에만 메모리에 반영
    fn commit(&mut self, next: BTreeMap<String, String>) -> VaultResult<()> {
        let json = serde_json::to_vec(&next)?;
        write_private_file(&self.path, &json)?;
        self.entries = next;
        Ok(())
    }
}
