//! Module Registry - 이름 -> entry point 테이블
//!
//! 하나의 lock이 테이블, 시그니처 검증기, 카운터를 함께 보호한다.
//! 검증과 등록은 같은 쓰기 lock 안에서 수행되므로 원자적이다.

use super::events::ReloadEvent;
use super::record::{ModuleInfo, ModuleRecord};
use crate::loader::{EntryPoint, LoadedEntry};
use crate::signature::{Signature, SignatureValidator, Validation};
use hotswap_foundation::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// 이벤트 채널 용량
const EVENT_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// RegisterOutcome
// ============================================================================

/// 등록 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// 처음 등록됨
    Registered,
    /// 기존 항목의 entry point 교체
    Refreshed,
}

// ============================================================================
// RegistryStats
// ============================================================================

/// 레지스트리 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// 등록된 이름 수
    pub modules: usize,
    /// 신규 등록 누계
    pub registrations: u64,
    /// 호환 재로드 누계
    pub refreshes: u64,
    /// 거부 누계
    pub rejections: u64,
}

// ============================================================================
// ModuleRegistry
// ============================================================================

#[derive(Default)]
struct RegistryInner {
    records: HashMap<String, ModuleRecord>,
    validator: SignatureValidator,
    stats: RegistryStats,
}

/// 동기화된 모듈 레지스트리
///
/// 컴파일, 스캔, 스케줄링은 하지 않는다. 상태와 동기화만 담당.
pub struct ModuleRegistry {
    inner: RwLock<RegistryInner>,
    event_tx: broadcast::Sender<ReloadEvent>,
}

impl ModuleRegistry {
    /// 빈 레지스트리 생성
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: RwLock::new(RegistryInner::default()),
            event_tx,
        }
    }

    // ========================================================================
    // 등록
    // ========================================================================

    /// 로드된 entry point 등록
    ///
    /// 시그니처가 baseline과 다르면 `Error::SignatureRejected`를 반환하며 기존 항목은
    /// 그대로 남는다. 교체되거나 거부된 핸들은 lock을 놓은 뒤 drop된다.
    pub fn register(
        &self,
        name: impl Into<String>,
        entry: LoadedEntry,
        artifact_path: impl Into<PathBuf>,
    ) -> Result<RegisterOutcome> {
        let name = name.into();
        let artifact_path = artifact_path.into();
        let LoadedEntry {
            entry_point,
            signature,
        } = entry;

        let mut guard = self.inner.write();
        let inner = &mut *guard;

        if let Validation::Rejected { baseline } = inner.validator.validate(&name, &signature) {
            inner.stats.rejections += 1;
            drop(guard);
            drop(entry_point);

            warn!(
                "[hotswap] Rejected '{}': signature {} does not match baseline {}",
                name, signature, baseline
            );
            self.publish(ReloadEvent::Rejected {
                name: name.clone(),
                expected: baseline.clone(),
                actual: signature.clone(),
            });

            return Err(Error::SignatureRejected {
                name,
                expected: baseline.to_string(),
                actual: signature.to_string(),
            });
        }

        let (outcome, event, released) = match inner.records.get_mut(&name) {
            Some(record) => {
                let old = record.refresh(entry_point, artifact_path);
                inner.stats.refreshes += 1;
                let event = ReloadEvent::Refreshed {
                    name: name.clone(),
                    reload_count: record.reload_count,
                };
                (RegisterOutcome::Refreshed, event, Some(old))
            }
            None => {
                let record = ModuleRecord::new(&name, entry_point, signature.clone(), artifact_path);
                inner.records.insert(name.clone(), record);
                inner.stats.registrations += 1;
                inner.stats.modules = inner.records.len();
                let event = ReloadEvent::Registered {
                    name: name.clone(),
                    signature,
                };
                (RegisterOutcome::Registered, event, None)
            }
        };
        drop(guard);

        // 이전 매핑 해제는 lock 밖에서
        drop(released);

        match outcome {
            RegisterOutcome::Registered => info!("[hotswap] Registered: {}", name),
            RegisterOutcome::Refreshed => debug!("[hotswap] Refreshed: {}", name),
        }
        self.publish(event);

        Ok(outcome)
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 현재 등록된 entry point 조회
    pub fn lookup(&self, name: &str) -> Result<EntryPoint> {
        self.inner
            .read()
            .records
            .get(name)
            .map(|r| r.entry_point.clone())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// 레코드 전체 복사본 조회
    pub fn record(&self, name: &str) -> Option<ModuleRecord> {
        self.inner.read().records.get(name).cloned()
    }

    /// 메타데이터 조회
    pub fn info(&self, name: &str) -> Option<ModuleInfo> {
        self.inner.read().records.get(name).map(|r| r.info())
    }

    /// baseline 시그니처 조회
    pub fn signature_of(&self, name: &str) -> Option<Signature> {
        self.inner.read().validator.baseline(name).cloned()
    }

    /// 등록 여부
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().records.contains_key(name)
    }

    /// 등록된 이름 (정렬됨)
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().records.keys().cloned().collect();
        names.sort();
        names
    }

    /// 모든 메타데이터
    pub fn all_info(&self) -> Vec<ModuleInfo> {
        let mut infos: Vec<ModuleInfo> = self.inner.read().records.values().map(|r| r.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// 통계
    pub fn stats(&self) -> RegistryStats {
        self.inner.read().stats
    }

    // ========================================================================
    // 이벤트
    // ========================================================================

    /// 이벤트 구독
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.event_tx.subscribe()
    }

    /// 이벤트 발행 (구독자가 없으면 버려짐)
    pub(crate) fn publish(&self, event: ReloadEvent) {
        let _ = self.event_tx.send(event);
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::ValueKind;
    use std::sync::Arc;

    extern "C" fn add(a: i64, b: i64) -> i64 {
        a + b
    }

    extern "C" fn add_v2(a: i64, b: i64) -> i64 {
        b + a
    }

    extern "C" fn add3(a: i64, b: i64, c: i64) -> i64 {
        a + b + c
    }

    fn two_args() -> Signature {
        Signature::new([ValueKind::I64, ValueKind::I64], ValueKind::I64)
    }

    fn three_args() -> Signature {
        Signature::new([ValueKind::I64, ValueKind::I64, ValueKind::I64], ValueKind::I64)
    }

    fn entry(address: *const (), signature: Signature) -> LoadedEntry {
        LoadedEntry {
            entry_point: EntryPoint::from_static(address),
            signature,
        }
    }

    #[test]
    fn test_lookup_unknown_is_not_found() {
        let registry = ModuleRegistry::new();
        let err = registry.lookup("add").unwrap_err();
        assert!(matches!(err, Error::NotFound(ref n) if n == "add"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_then_lookup() {
        let registry = ModuleRegistry::new();
        let outcome = registry
            .register("add", entry(add as *const (), two_args()), "/m/add.so")
            .unwrap();
        assert_eq!(outcome, RegisterOutcome::Registered);

        let ep = registry.lookup("add").unwrap();
        let f: extern "C" fn(i64, i64) -> i64 = unsafe { ep.cast() };
        assert_eq!(f(20, 22), 42);
        assert_eq!(registry.signature_of("add"), Some(two_args()));
    }

    #[test]
    fn test_compatible_reload_refreshes() {
        let registry = ModuleRegistry::new();
        registry
            .register("add", entry(add as *const (), two_args()), "/m/add.so")
            .unwrap();
        let outcome = registry
            .register("add", entry(add_v2 as *const (), two_args()), "/m/add.so")
            .unwrap();
        assert_eq!(outcome, RegisterOutcome::Refreshed);

        let ep = registry.lookup("add").unwrap();
        assert!(ep.same_symbol(&EntryPoint::from_static(add_v2 as *const ())));

        let info = registry.info("add").unwrap();
        assert_eq!(info.reload_count, 1);

        let stats = registry.stats();
        assert_eq!(stats.modules, 1);
        assert_eq!(stats.registrations, 1);
        assert_eq!(stats.refreshes, 1);
    }

    #[test]
    fn test_incompatible_reload_rejected_and_original_kept() {
        let registry = ModuleRegistry::new();
        registry
            .register("add", entry(add as *const (), two_args()), "/m/add.so")
            .unwrap();

        let err = registry
            .register("add", entry(add3 as *const (), three_args()), "/m/add.so")
            .unwrap_err();
        assert!(matches!(err, Error::SignatureRejected { .. }));

        let ep = registry.lookup("add").unwrap();
        assert!(ep.same_symbol(&EntryPoint::from_static(add as *const ())));
        assert_eq!(registry.signature_of("add"), Some(two_args()));
        assert_eq!(registry.info("add").unwrap().reload_count, 0);
        assert_eq!(registry.stats().rejections, 1);
    }

    #[test]
    fn test_events_published() {
        let registry = ModuleRegistry::new();
        let mut rx = registry.subscribe();

        registry
            .register("add", entry(add as *const (), two_args()), "/m/add.so")
            .unwrap();
        let _ = registry.register("add", entry(add3 as *const (), three_args()), "/m/add.so");

        match rx.try_recv().unwrap() {
            ReloadEvent::Registered { name, signature } => {
                assert_eq!(name, "add");
                assert_eq!(signature, two_args());
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.try_recv().unwrap() {
            ReloadEvent::Rejected { name, expected, actual } => {
                assert_eq!(name, "add");
                assert_eq!(expected, two_args());
                assert_eq!(actual, three_args());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_names_sorted() {
        let registry = ModuleRegistry::new();
        registry
            .register("sub", entry(add as *const (), two_args()), "/m/sub.so")
            .unwrap();
        registry
            .register("add", entry(add as *const (), two_args()), "/m/add.so")
            .unwrap();

        assert_eq!(registry.names(), vec!["add".to_string(), "sub".to_string()]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("sub"));
    }

    #[test]
    fn test_concurrent_lookups_never_see_partial_records() {
        let registry = Arc::new(ModuleRegistry::new());

        let writer = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for i in 0..500 {
                    let address = if i % 2 == 0 { add as *const () } else { add_v2 as *const () };
                    registry.register("add", entry(address, two_args()), "/m/add.so").unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        if let Some(record) = registry.record("add") {
                            assert_eq!(record.signature, two_args());
                            let f: extern "C" fn(i64, i64) -> i64 = unsafe { record.entry_point.cast() };
                            assert_eq!(f(1, 2), 3);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(registry.info("add").unwrap().reload_count, 499);
    }
}
