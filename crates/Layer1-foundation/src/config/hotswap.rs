//! HotSwap Config - 통합 설정
//!
//! 감시 디렉토리, 폴링 주기, artifact 확장자, 빌드 도구 설정을 관리하는 HotSwapConfig

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// 설정 파일명
pub const HOTSWAP_CONFIG_FILE: &str = "hotswap.json";

/// shadow 디렉토리 기본 이름 (감시 디렉토리 하위)
pub const DEFAULT_SHADOW_DIR_NAME: &str = ".shadow";

// ============================================================================
// HotSwap Config (통합)
// ============================================================================

/// HotSwap 통합 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotSwapConfig {
    /// 감시할 모듈 디렉토리
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,

    /// 스캔 간격 (초)
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// 인식할 artifact 확장자 (점 없이)
    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,

    /// 이름에서 한 번 더 제거할 소스 확장자 (`add.rs.so` -> `add`)
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// 변경되지 않은 artifact는 다시 로드하지 않음 (미지정 시 true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_unchanged: Option<bool>,

    /// 로드 전에 artifact를 복사해 둘 디렉토리
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_dir: Option<PathBuf>,

    /// 외부 빌드 도구 설정
    #[serde(default)]
    pub compiler: CompilerConfig,
}

impl Default for HotSwapConfig {
    fn default() -> Self {
        Self {
            watch_dir: default_watch_dir(),
            interval_seconds: default_interval_seconds(),
            artifact_extension: default_artifact_extension(),
            source_extensions: default_source_extensions(),
            skip_unchanged: None,
            shadow_dir: None,
            compiler: CompilerConfig::default(),
        }
    }
}

impl HotSwapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// JSON 파일에서 로드
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HotSwapConfig = serde_json::from_str(&content)?;
        debug!("Loaded hotswap config from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// 디렉토리에서 hotswap.json을 찾아 로드, 없으면 기본값
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let file = dir.join(HOTSWAP_CONFIG_FILE);
        if file.exists() {
            Self::load_from_file(&file)
        } else {
            Ok(Self::default())
        }
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.interval_seconds == 0 {
            return Err(Error::Config("intervalSeconds must be greater than 0".into()));
        }
        if self.artifact_extension.is_empty() {
            return Err(Error::Config("artifactExtension must not be empty".into()));
        }
        if self.artifact_extension.starts_with('.') {
            return Err(Error::Config(format!(
                "artifactExtension must not start with a dot: {}",
                self.artifact_extension
            )));
        }
        if self.watch_dir.as_os_str().is_empty() {
            return Err(Error::Config("watchDir must not be empty".into()));
        }
        if let Some(shadow) = &self.shadow_dir {
            if self.watch_dir.starts_with(shadow) {
                return Err(Error::Config(format!(
                    "shadowDir must not be or contain watchDir: {}",
                    shadow.display()
                )));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// 스캔 간격
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// 변경 없는 artifact 건너뛰기 여부
    pub fn skips_unchanged(&self) -> bool {
        self.skip_unchanged.unwrap_or(true)
    }

    /// 실제 사용할 shadow 디렉토리
    pub fn resolved_shadow_dir(&self) -> PathBuf {
        self.shadow_dir
            .clone()
            .unwrap_or_else(|| self.watch_dir.join(DEFAULT_SHADOW_DIR_NAME))
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 기본값이 아닌 항목만 우선)
    pub fn merge(&mut self, other: HotSwapConfig) {
        if other.watch_dir != default_watch_dir() {
            self.watch_dir = other.watch_dir;
        }
        if other.interval_seconds != default_interval_seconds() {
            self.interval_seconds = other.interval_seconds;
        }
        if other.artifact_extension != default_artifact_extension() {
            self.artifact_extension = other.artifact_extension;
        }
        if other.source_extensions != default_source_extensions() {
            self.source_extensions = other.source_extensions;
        }
        if other.skip_unchanged.is_some() {
            self.skip_unchanged = other.skip_unchanged;
        }
        if other.shadow_dir.is_some() {
            self.shadow_dir = other.shadow_dir;
        }
        self.compiler.merge(other.compiler);
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn watch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.watch_dir = dir.into();
        self
    }

    pub fn interval_seconds(mut self, secs: u64) -> Self {
        self.interval_seconds = secs;
        self
    }

    pub fn artifact_extension(mut self, ext: impl Into<String>) -> Self {
        self.artifact_extension = ext.into();
        self
    }

    pub fn skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = Some(skip);
        self
    }

    pub fn shadow_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shadow_dir = Some(dir.into());
        self
    }
}

// ============================================================================
// Compiler Config
// ============================================================================

/// 외부 빌드 도구 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerConfig {
    /// 실행할 프로그램
    #[serde(default = "default_compiler_program")]
    pub program: String,

    /// `-o <output> <source>` 앞에 붙는 인자
    #[serde(default = "default_compiler_args")]
    pub args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: default_compiler_program(),
            args: default_compiler_args(),
        }
    }
}

impl CompilerConfig {
    fn merge(&mut self, other: CompilerConfig) {
        if other.program != default_compiler_program() {
            self.program = other.program;
        }
        if other.args != default_compiler_args() {
            self.args = other.args;
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn default_watch_dir() -> PathBuf {
    PathBuf::from("./plugins")
}

fn default_interval_seconds() -> u64 {
    2
}

fn default_artifact_extension() -> String {
    std::env::consts::DLL_EXTENSION.to_string()
}

fn default_source_extensions() -> Vec<String> {
    vec!["rs".to_string()]
}

fn default_compiler_program() -> String {
    "rustc".to_string()
}

fn default_compiler_args() -> Vec<String> {
    ["--edition", "2021", "--crate-type", "cdylib", "-O"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
