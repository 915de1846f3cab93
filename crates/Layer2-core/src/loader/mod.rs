//! Module Loader - artifact 매핑 및 entry point 해석
//!
//! - `handle.rs` - EntryPoint / LoadedModule (scoped 핸들)
//! - `native.rs` - libloading 기반 NativeLoader

mod handle;
mod native;

pub use handle::{EntryPoint, LoadedModule};
pub use native::{is_shadow_file_name, signature_symbol, NativeLoader, SIGNATURE_SYMBOL_SUFFIX};

use crate::signature::Signature;
use hotswap_foundation::Result;
use std::path::Path;

/// 로드 결과: entry point 핸들 + 구조적 시그니처
#[derive(Debug, Clone)]
pub struct LoadedEntry {
    pub entry_point: EntryPoint,
    pub signature: Signature,
}

/// artifact 하나를 열어 `name` 심볼을 해석하는 로더
///
/// 블로킹 호출이다. reload loop는 blocking 스레드에서 호출한다.
pub trait ModuleLoader: Send + Sync {
    /// artifact를 매핑하고 entry point와 시그니처를 반환
    ///
    /// - 열 수 없으면 `Error::Load`
    /// - 심볼이 없으면 `Error::SymbolNotFound`
    fn load(&self, path: &Path, name: &str) -> Result<LoadedEntry>;
}
