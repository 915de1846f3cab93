//! Loaded module handles
//!
//! `LoadedModule`이 매핑된 라이브러리를 소유하고, `EntryPoint`는 주소와 함께
//! `Arc<LoadedModule>`을 들고 있어 마지막 핸들이 사라질 때 매핑이 해제된다.

use libloading::Library;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// LoadedModule - 매핑된 artifact
// ============================================================================

/// 프로세스에 매핑된 artifact 하나
///
/// Drop 시 라이브러리를 닫고 shadow 복사본을 삭제한다.
pub struct LoadedModule {
    library: Option<Library>,
    artifact_path: PathBuf,
    shadow_path: Option<PathBuf>,
    generation: u64,
}

impl LoadedModule {
    pub(crate) fn new(
        library: Library,
        artifact_path: PathBuf,
        shadow_path: Option<PathBuf>,
        generation: u64,
    ) -> Self {
        Self {
            library: Some(library),
            artifact_path,
            shadow_path,
            generation,
        }
    }

    pub(crate) fn library(&self) -> Option<&Library> {
        self.library.as_ref()
    }

    /// 원본 artifact 경로
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// 실제로 매핑된 shadow 복사본 경로
    pub fn shadow_path(&self) -> Option<&Path> {
        self.shadow_path.as_deref()
    }

    /// 로더가 부여한 세대 번호
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for LoadedModule {
    fn drop(&mut self) {
        if let Some(library) = self.library.take() {
            if let Err(e) = library.close() {
                warn!("Failed to unmap {}: {}", self.artifact_path.display(), e);
            }
        }
        if let Some(shadow) = self.shadow_path.take() {
            if let Err(e) = std::fs::remove_file(&shadow) {
                warn!("Failed to remove shadow copy {}: {}", shadow.display(), e);
            }
        }
        debug!(
            "Released module {} (generation {})",
            self.artifact_path.display(),
            self.generation
        );
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("artifact_path", &self.artifact_path)
            .field("shadow_path", &self.shadow_path)
            .field("generation", &self.generation)
            .finish()
    }
}

// ============================================================================
// EntryPoint - 불투명 entry point 핸들
// ============================================================================

/// 해석된 exported 심볼에 대한 불투명 핸들
///
/// 복제 비용이 싸다. 핸들이 살아있는 동안 소유 모듈의 매핑이 유지된다.
#[derive(Clone)]
pub struct EntryPoint {
    address: *const (),
    module: Option<Arc<LoadedModule>>,
}

// SAFETY: address는 읽기 전용 코드 영역을 가리키며, 매핑은 module Arc가 유지한다.
// LoadedModule은 생성 이후 변경되지 않는다.
unsafe impl Send for EntryPoint {}
unsafe impl Sync for EntryPoint {}

impl EntryPoint {
    pub(crate) fn new(address: *const (), module: Arc<LoadedModule>) -> Self {
        Self {
            address,
            module: Some(module),
        }
    }

    /// 프로세스 수명 동안 유효한 주소로 생성 (정적으로 링크된 함수 등)
    pub fn from_static(address: *const ()) -> Self {
        Self {
            address,
            module: None,
        }
    }

    /// 심볼 주소
    pub fn address(&self) -> *const () {
        self.address
    }

    /// 소유 모듈 (정적 entry point는 None)
    pub fn module(&self) -> Option<&Arc<LoadedModule>> {
        self.module.as_ref()
    }

    /// 같은 심볼을 가리키는지 확인
    pub fn same_symbol(&self, other: &EntryPoint) -> bool {
        std::ptr::eq(self.address, other.address)
    }

    /// 주소를 호출자가 지정한 함수 포인터 타입으로 재해석
    ///
    /// # Safety
    ///
    /// `F`는 포인터 크기의 함수 포인터 타입이어야 하며, 실제 export된 함수의
    /// ABI와 일치해야 한다. 반환된 값은 이 핸들보다 오래 사용하면 안 된다.
    pub unsafe fn cast<F: Copy>(&self) -> F {
        debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<*const ()>());
        std::mem::transmute_copy::<*const (), F>(&self.address)
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("address", &self.address)
            .field("generation", &self.module.as_ref().map(|m| m.generation()))
            .finish()
    }
}
