//! Native Module Loader
//!
//! `libloading`으로 동적 라이브러리 artifact를 매핑하고 entry point와
//! 시그니처 기술자를 해석한다.
//!
//! ## Artifact 규약
//!
//! - `<name>`: entry point (`extern "C"` 함수)
//! - `<name>_signature`: `extern "C" fn() -> *const c_char`, NUL 종료 기술자 반환
//!   (예: `v1:(i64,i64)->i64`)
//!
//! ## Shadow 복사
//!
//! 플랫폼 로더는 같은 경로의 라이브러리를 캐시하므로, 매 로드마다 artifact를
//! 고유한 이름으로 shadow 디렉토리에 복사한 뒤 연다. 원본을 덮어써도 이미
//! 매핑된 이미지는 영향을 받지 않는다.

use super::handle::{EntryPoint, LoadedModule};
use super::{LoadedEntry, ModuleLoader};
use crate::signature::Signature;
use hotswap_foundation::{Error, Result};
use libloading::Library;
use std::ffi::{c_char, CStr};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// 시그니처 기술자 심볼 접미사
pub const SIGNATURE_SYMBOL_SUFFIX: &str = "_signature";

/// 기술자 함수 타입
type SignatureFn = unsafe extern "C" fn() -> *const c_char;

/// 이름에 대응하는 기술자 심볼 이름
pub fn signature_symbol(name: &str) -> String {
    format!("{}{}", name, SIGNATURE_SYMBOL_SUFFIX)
}

/// shadow 복사본 파일명인지 확인 (`<name>-<pid>-<gen>[.<ext>]`)
pub fn is_shadow_file_name(file_name: &str) -> bool {
    let path = Path::new(file_name);
    let stem = match path.extension() {
        Some(_) => path.file_stem().and_then(|s| s.to_str()),
        None => Some(file_name),
    };
    let Some(stem) = stem else {
        return false;
    };

    let mut parts = stem.rsplitn(3, '-');
    let is_number = |s: Option<&str>| s.is_some_and(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()));

    is_number(parts.next()) && is_number(parts.next()) && parts.next().is_some_and(|name| !name.is_empty())
}

// ============================================================================
// NativeLoader
// ============================================================================

/// 동적 라이브러리 로더
pub struct NativeLoader {
    /// shadow 복사 디렉토리 (None이면 원본을 직접 연다)
    shadow_dir: Option<PathBuf>,

    /// 로드 세대 카운터
    generation: AtomicU64,
}

impl NativeLoader {
    /// 원본 경로를 직접 여는 로더
    pub fn new() -> Self {
        Self {
            shadow_dir: None,
            generation: AtomicU64::new(0),
        }
    }

    /// shadow 복사를 사용하는 로더
    pub fn with_shadow_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            shadow_dir: Some(dir.into()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn shadow_dir(&self) -> Option<&Path> {
        self.shadow_dir.as_deref()
    }

    /// shadow 디렉토리 생성 및 이전 실행의 잔여 shadow 복사본 정리
    ///
    /// shadow 이름 규칙(`<name>-<pid>-<gen>[.<ext>]`)에 맞는 파일만 삭제한다.
    pub fn prepare_shadow_dir(&self) -> Result<()> {
        let Some(dir) = &self.shadow_dir else {
            return Ok(());
        };

        std::fs::create_dir_all(dir)?;

        let mut removed = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_shadow = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_shadow_file_name);
            if is_shadow && path.is_file() {
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove stale shadow {}: {}", path.display(), e),
                }
            }
        }

        if removed > 0 {
            debug!("Removed {} stale shadow copies from {}", removed, dir.display());
        }
        Ok(())
    }

    /// 다음 세대 번호
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// artifact를 shadow 디렉토리로 복사
    fn shadow_copy(&self, dir: &Path, path: &Path, name: &str, generation: u64) -> Result<PathBuf> {
        let file_name = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}-{}-{}.{}", name, std::process::id(), generation, ext),
            None => format!("{}-{}-{}", name, std::process::id(), generation),
        };
        let shadow = dir.join(file_name);

        std::fs::copy(path, &shadow)
            .map_err(|e| Error::load(path, format!("shadow copy failed: {}", e)))?;
        Ok(shadow)
    }

    /// 라이브러리 열기
    fn open(&self, path: &Path, name: &str) -> Result<LoadedModule> {
        let generation = self.next_generation();

        let shadow = match &self.shadow_dir {
            Some(dir) => Some(self.shadow_copy(dir, path, name, generation)?),
            None => None,
        };
        let open_path = shadow.as_deref().unwrap_or(path);

        // SAFETY: 외부 코드를 매핑하며 초기화 루틴이 실행된다. artifact는
        // 감시 디렉토리에 배치된 신뢰된 빌드 산출물로 간주한다.
        match unsafe { Library::new(open_path) } {
            Ok(library) => Ok(LoadedModule::new(library, path.to_path_buf(), shadow, generation)),
            Err(e) => {
                if let Some(shadow) = &shadow {
                    let _ = std::fs::remove_file(shadow);
                }
                Err(Error::load(path, e.to_string()))
            }
        }
    }
}

impl Default for NativeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader for NativeLoader {
    fn load(&self, path: &Path, name: &str) -> Result<LoadedEntry> {
        let module = self.open(path, name)?;
        let library = module
            .library()
            .ok_or_else(|| Error::load(path, "library already closed"))?;

        // entry point 주소
        // SAFETY: 타입 *const ()로 조회하면 심볼 주소 자체를 얻는다.
        let address: *const () = unsafe {
            match library.get::<*const ()>(name.as_bytes()) {
                Ok(symbol) => *symbol,
                Err(_) => return Err(Error::symbol_not_found(path, name)),
            }
        };

        // 시그니처 기술자
        let descriptor_symbol = signature_symbol(name);
        // SAFETY: 규약상 기술자 함수는 인자 없이 정적 C 문자열을 반환한다.
        let descriptor = unsafe {
            let describe = match library.get::<SignatureFn>(descriptor_symbol.as_bytes()) {
                Ok(symbol) => symbol,
                Err(_) => return Err(Error::symbol_not_found(path, descriptor_symbol)),
            };
            let raw = describe();
            if raw.is_null() {
                return Err(Error::InvalidDescriptor(format!(
                    "{} returned a null descriptor",
                    descriptor_symbol
                )));
            }
            CStr::from_ptr(raw)
                .to_str()
                .map_err(|e| Error::InvalidDescriptor(format!("{}: {}", descriptor_symbol, e)))?
                .to_string()
        };
        let signature: Signature = descriptor.parse()?;

        debug!(
            "Resolved '{}' from {} with signature {}",
            name,
            path.display(),
            signature
        );

        Ok(LoadedEntry {
            entry_point: EntryPoint::new(address, Arc::new(module)),
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_signature_symbol() {
        assert_eq!(signature_symbol("add"), "add_signature");
    }

    #[test]
    fn test_load_corrupt_artifact_is_load_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.so");
        std::fs::write(&path, b"definitely not a shared object").unwrap();

        let loader = NativeLoader::new();
        let err = loader.load(&path, "broken").unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }

    #[test]
    fn test_failed_load_removes_shadow_copy() {
        let temp = TempDir::new().unwrap();
        let shadow = temp.path().join(".shadow");
        let path = temp.path().join("broken.so");
        std::fs::write(&path, b"garbage").unwrap();

        let loader = NativeLoader::with_shadow_dir(&shadow);
        loader.prepare_shadow_dir().unwrap();

        assert!(loader.load(&path, "broken").is_err());
        assert_eq!(std::fs::read_dir(&shadow).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_shadow_dir_clears_stale_files() {
        let temp = TempDir::new().unwrap();
        let shadow = temp.path().join(".shadow");
        std::fs::create_dir_all(&shadow).unwrap();
        std::fs::write(shadow.join("add-1-1.so"), b"stale").unwrap();

        let loader = NativeLoader::with_shadow_dir(&shadow);
        loader.prepare_shadow_dir().unwrap();

        assert!(shadow.exists());
        assert_eq!(std::fs::read_dir(&shadow).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_shadow_dir_keeps_foreign_files() {
        let temp = TempDir::new().unwrap();
        let shadow = temp.path().join(".shadow");
        std::fs::create_dir_all(&shadow).unwrap();
        std::fs::write(shadow.join("add-42-7.so"), b"stale").unwrap();
        std::fs::write(shadow.join("add.so"), b"artifact").unwrap();
        std::fs::write(shadow.join("notes.txt"), b"user file").unwrap();

        let loader = NativeLoader::with_shadow_dir(&shadow);
        loader.prepare_shadow_dir().unwrap();

        let mut left: Vec<String> = std::fs::read_dir(&shadow)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["add.so".to_string(), "notes.txt".to_string()]);
    }

    #[test]
    fn test_is_shadow_file_name() {
        assert!(is_shadow_file_name("add-123-1.so"));
        assert!(is_shadow_file_name("my-mod-123-45.dylib"));
        assert!(is_shadow_file_name("add-1-2"));

        assert!(!is_shadow_file_name("add.so"));
        assert!(!is_shadow_file_name("notes.txt"));
        assert!(!is_shadow_file_name("my-mod.so"));
        assert!(!is_shadow_file_name("-1-2.so"));
        assert!(!is_shadow_file_name("add-x-2.so"));
    }

    #[test]
    fn test_missing_artifact_is_load_error() {
        let temp = TempDir::new().unwrap();
        let loader = NativeLoader::with_shadow_dir(temp.path());

        let err = loader.load(&temp.path().join("gone.so"), "gone").unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }
}
