//! hotswap-core: Runtime Module Hot-Swap
//!
//! Layer2 - 감시 디렉토리의 동적 라이브러리를 주기적으로 다시 로드하는 런타임
//!
//! # 주요 모듈
//!
//! - `scanner`: 감시 디렉토리 열거 및 entry point 이름 추출
//! - `loader`: 동적 라이브러리 로드 (shadow 복사, scoped handle)
//! - `signature`: 시그니처 기술자와 first-writer-wins 검증
//! - `registry`: 이름 -> 현재 entry point 레지스트리 및 reload 이벤트
//! - `reload`: 백그라운드 reload loop
//! - `compiler`: 외부 빌드 도구 브릿지
//! - `swapper`: 통합 인터페이스 (HotSwapper)
//!
//! # 사용 예시
//!
//! ```ignore
//! use hotswap_core::{HotSwapConfig, HotSwapper};
//!
//! let mut swapper = HotSwapper::new(HotSwapConfig::load_from_dir(Path::new("."))?)?;
//! swapper.start().await?;
//!
//! // 소스 빌드 -> 다음 tick에 등록
//! swapper.compile(Path::new("src/add.rs")).await?;
//! swapper.scan_now().await?;
//!
//! let add = swapper.lookup("add")?;
//! let f: extern "C" fn(i64, i64) -> i64 = unsafe { add.cast() };
//! ```

pub mod compiler;
pub mod loader;
pub mod registry;
pub mod reload;
pub mod scanner;
pub mod signature;
pub mod swapper;

// Re-exports: Foundation
pub use hotswap_foundation::{CompilerConfig, Error, HotSwapConfig, Result};

// Re-exports: Facade
pub use swapper::HotSwapper;

// Re-exports: Compiler
pub use compiler::{ModuleCompiler, RustcCompiler};

// Re-exports: Loader
pub use loader::{EntryPoint, LoadedEntry, LoadedModule, ModuleLoader, NativeLoader};

// Re-exports: Signature
pub use signature::{Signature, SignatureValidator, Validation, ValueKind};

// Re-exports: Registry
pub use registry::{
    BatchSummary, ModuleInfo, ModuleRecord, ModuleRegistry, RegisterOutcome, RegistryStats,
    ReloadEvent,
};

// Re-exports: Reload
pub use reload::{LoopState, ReloadLoop};

// Re-exports: Scanner
pub use scanner::{Artifact, ArtifactFingerprint, DirectoryScanner};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
