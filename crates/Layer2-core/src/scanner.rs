//! Directory Scanner - 감시 디렉토리의 artifact 목록화
//!
//! 인식된 확장자를 가진 일반 파일만 반환한다. 순서는 보장하지 않는다.

use hotswap_foundation::{Error, HotSwapConfig, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, warn};

// ============================================================================
// ArtifactFingerprint - 변경 감지용 지문
// ============================================================================

/// artifact 변경 감지용 지문 (수정 시간 + 크기)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactFingerprint {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl ArtifactFingerprint {
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        }
    }
}

// ============================================================================
// Artifact - 발견된 artifact
// ============================================================================

/// 스캔으로 발견된 artifact
#[derive(Debug, Clone)]
pub struct Artifact {
    /// 전체 경로
    pub path: PathBuf,

    /// entry point 이름 (확장자 제거)
    pub name: String,

    /// 스캔 시점의 지문
    pub fingerprint: ArtifactFingerprint,
}

// ============================================================================
// 이름 규칙
// ============================================================================

/// 파일명에서 entry point 이름 도출
///
/// artifact 확장자를 제거한 뒤, 남은 이름이 소스 확장자로 끝나면 한 번 더 제거한다.
/// (`add.so` -> `add`, `add.rs.so` -> `add`)
pub fn entry_name(file_name: &str, extension: &str, source_extensions: &[String]) -> Option<String> {
    let stem = file_name.strip_suffix(extension)?.strip_suffix('.')?;

    let name = source_extensions
        .iter()
        .find_map(|src| stem.strip_suffix(src.as_str()).and_then(|s| s.strip_suffix('.')))
        .unwrap_or(stem);

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

// ============================================================================
// DirectoryScanner
// ============================================================================

/// 디렉토리 스캐너
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    dir: PathBuf,
    extension: String,
    source_extensions: Vec<String>,
}

impl DirectoryScanner {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
            source_extensions: Vec::new(),
        }
    }

    /// 설정에서 생성
    pub fn from_config(config: &HotSwapConfig) -> Self {
        Self {
            dir: config.watch_dir.clone(),
            extension: config.artifact_extension.clone(),
            source_extensions: config.source_extensions.clone(),
        }
    }

    /// 소스 확장자 지정
    pub fn with_source_extensions(mut self, exts: Vec<String>) -> Self {
        self.source_extensions = exts;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// 파일명으로 entry point 이름 도출
    pub fn name_for(&self, file_name: &str) -> Option<String> {
        entry_name(file_name, &self.extension, &self.source_extensions)
    }

    /// 현재 artifact 목록
    pub async fn scan(&self) -> Result<Vec<Artifact>> {
        let unreadable = |source: std::io::Error| Error::DirectoryUnreadable {
            path: self.dir.clone(),
            source,
        };

        let mut entries = fs::read_dir(&self.dir).await.map_err(unreadable)?;
        let mut artifacts = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
            let path = entry.path();

            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(name) = self.name_for(file_name) else {
                continue;
            };

            // symlink는 따라간다
            let metadata = match fs::metadata(&path).await {
                Ok(m) => m,
                Err(e) => {
                    warn!("Failed to stat artifact {}: {}", path.display(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            artifacts.push(Artifact {
                fingerprint: ArtifactFingerprint::from_metadata(&metadata),
                path,
                name,
            });
        }

        debug!("Scanned {}: {} artifacts", self.dir.display(), artifacts.len());
        Ok(artifacts)
    }
}
