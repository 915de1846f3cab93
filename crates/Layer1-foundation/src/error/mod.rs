//! Error types for HotSwap
//!
//! 모든 에러를 중앙에서 관리

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// HotSwap 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 디렉토리 스캔 관련
    // ========================================================================
    #[error("Directory unreadable: {} - {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ========================================================================
    // 모듈 로드 관련 (artifact 단위로 복구됨)
    // ========================================================================
    #[error("Failed to load module {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    #[error("Symbol '{symbol}' not found in {}", path.display())]
    SymbolNotFound { path: PathBuf, symbol: String },

    #[error("Invalid signature descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Signature rejected for '{name}': expected {expected}, got {actual}")]
    SignatureRejected {
        name: String,
        expected: String,
        actual: String,
    },

    // ========================================================================
    // 조회 관련
    // ========================================================================
    #[error("Module not found: {0}")]
    NotFound(String),

    // ========================================================================
    // 빌드 관련 (compile 호출자에게만 반환)
    // ========================================================================
    #[error("Build failed for {}: {message}", source_path.display())]
    Build { source_path: PathBuf, message: String },

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// artifact 하나에만 영향을 주는 에러인지 확인
    ///
    /// reload loop는 이 에러들을 로그로 남기고 다음 artifact로 넘어간다.
    pub fn is_per_artifact(&self) -> bool {
        matches!(
            self,
            Error::Load { .. }
                | Error::SymbolNotFound { .. }
                | Error::InvalidDescriptor(_)
                | Error::SignatureRejected { .. }
        )
    }

    /// 다음 tick에 재시도되는 에러인지 확인
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::DirectoryUnreadable { .. })
    }

    /// 로드 에러 생성 헬퍼
    pub fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Load {
            path: path.into(),
            message: message.into(),
        }
    }

    /// 심볼 미발견 에러 생성 헬퍼
    pub fn symbol_not_found(path: impl Into<PathBuf>, symbol: impl Into<String>) -> Self {
        Error::SymbolNotFound {
            path: path.into(),
            symbol: symbol.into(),
        }
    }

    /// 빌드 에러 생성 헬퍼
    pub fn build(source_path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Build {
            source_path: source_path.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
