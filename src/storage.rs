//! 저장 루트 결정 및 파일 I/O 유틸
//!
//! - Windows: `%APPDATA%\<service>`
//! - macOS: `~/Library/Application Support/<service>`
//! - Linux: `$XDG_DATA_HOME/<service>` (기본 `~/.local/share/<service>`)
//!
//! 규칙이 없는 플랫폼에서는 현재 디렉토리 등으로 대체하지 않고 실패합니다.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};

/// 디렉토리 권한 (소유자 rwx)
pub const DIR_PERMISSIONS: u32 = 0o700;
/// 파일 권한 (소유자 rw)
pub const FILE_PERMISSIONS: u32 = 0o600;

/// 볼트 전용 저장 루트를 결정하고 생성 (멱등)
///
/// `storage_root`가 지정되어 있으면 플랫폼 판별을 건너뜁니다.
/// 소유자 전용 권한은 여기서 새로 만든 디렉토리에만 적용하고, 이미 있는 디렉토리의 권한은 건드리지 않습니다.
pub fn resolve(config: &VaultConfig) -> VaultResult<PathBuf> {
    let root = match &config.storage_root {
        Some(root) => root.clone(),
        None => {
            if config.service_name.trim().is_empty() {
                return Err(VaultError::Config(
                    "service name must not be empty".to_string(),
                ));
            }
            platform_data_dir()?.join(&config.service_name)
        }
    };

    if root.is_dir() {
        tracing::debug!(root = %root.display(), "using existing storage root");
    } else {
        create_secure_dir(&root)?;
        tracing::debug!(root = %root.display(), "storage root created");
    }
    Ok(root)
}

#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
fn platform_data_dir() -> VaultResult<PathBuf> {
    dirs::data_dir().ok_or_else(|| {
        VaultError::UnsupportedPlatform(format!(
            "no per-user data directory on this {} host",
            std::env::consts::OS
        ))
    })
}

#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
fn platform_data_dir() -> VaultResult<PathBuf> {
    Err(VaultError::UnsupportedPlatform(format!(
        "no storage convention defined for {}",
        std::env::consts::OS
    )))
}

/// 디렉토리 생성 (상위 포함) 후 소유자 전용 권한 적용
pub fn create_secure_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)?;
    set_permissions(path, DIR_PERMISSIONS)
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

/// 소유자 전용 파일 쓰기
///
/// 임시 파일에 쓰고 sync 후 rename 하므로, 원본은 이전 내용 또는 새 내용 중 하나입니다.
pub fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_PERMISSIONS);
    }

    let mut file = options.open(&tmp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    set_permissions(path, FILE_PERMISSIONS)
}
