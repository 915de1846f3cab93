//! Module Compiler - 외부 빌드 도구 브릿지
//!
//! 소스 파일을 감시 디렉토리의 `<소스 파일명>.<artifact 확장자>`로 빌드한다.
//! (`add.rs` -> `add.rs.so`, 스캐너는 이를 `add`로 인식)
//!
//! reload loop와는 무관하며, 다음 tick이 artifact를 가져간다.

use async_trait::async_trait;
use hotswap_foundation::{CompilerConfig, Error, HotSwapConfig, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

// ============================================================================
// ModuleCompiler trait
// ============================================================================

/// 소스 -> 로드 가능한 artifact 빌드
#[async_trait]
pub trait ModuleCompiler: Send + Sync {
    /// 빌드 후 artifact 경로 반환 (실패 시 `Error::Build`)
    async fn compile(&self, source: &Path) -> Result<PathBuf>;
}

/// 소스에 대응하는 artifact 경로
pub fn artifact_path_for(source: &Path, output_dir: &Path, extension: &str) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::build(source, "source path has no file name"))?;

    Ok(output_dir.join(format!("{}.{}", file_name, extension)))
}

// ============================================================================
// RustcCompiler
// ============================================================================

/// 외부 컴파일러 실행기 (기본 `rustc`)
#[derive(Debug, Clone)]
pub struct RustcCompiler {
    program: String,
    args: Vec<String>,
    output_dir: PathBuf,
    extension: String,
}

impl RustcCompiler {
    pub fn new(config: &CompilerConfig, output_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            output_dir: output_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &HotSwapConfig) -> Self {
        Self::new(&config.compiler, &config.watch_dir, &config.artifact_extension)
    }

    /// PATH에서 프로그램을 찾을 수 있는지
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl ModuleCompiler for RustcCompiler {
    async fn compile(&self, source: &Path) -> Result<PathBuf> {
        if !source.is_file() {
            return Err(Error::build(source, "source file does not exist"));
        }

        let output = artifact_path_for(source, &self.output_dir, &self.extension)?;
        debug!("Compiling {} -> {}", source.display(), output.display());

        let result = Command::new(&self.program)
            .args(&self.args)
            .arg("-o")
            .arg(&output)
            .arg(source)
            .output()
            .await
            .map_err(|e| Error::build(source, format!("failed to run {}: {}", self.program, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::build(
                source,
                format!("{} exited with {}: {}", self.program, result.status, stderr.trim()),
            ));
        }

        info!("Compiled module: {}", output.display());
        Ok(output)
    }
}
