//! Reload Loop - 주기적 스캔 및 load -> validate -> register
//!
//! 상태 머신: `Idle --tick--> Scanning --batch 완료--> Idle`
//!
//! artifact 하나의 실패는 batch를 멈추지 않는다. 디렉토리를 읽지 못하면 이번 tick만
//! 중단되고 다음 tick에 재시도한다.

use super::fingerprint::FingerprintCache;
use crate::loader::ModuleLoader;
use crate::registry::{BatchSummary, ModuleRegistry, RegisterOutcome, ReloadEvent};
use crate::scanner::{Artifact, DirectoryScanner};
use hotswap_foundation::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

// ============================================================================
// LoopState
// ============================================================================

/// reload loop 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// 다음 tick 대기
    Idle,
    /// batch 처리 중
    Scanning,
}

// ============================================================================
// ReloadLoop
// ============================================================================

/// 백그라운드 reload loop
pub struct ReloadLoop {
    registry: Arc<ModuleRegistry>,
    scanner: DirectoryScanner,
    loader: Arc<dyn ModuleLoader>,
    interval: Duration,
    skip_unchanged: bool,

    /// batch 직렬화 + 지문 캐시
    fingerprints: Mutex<FingerprintCache>,

    state: parking_lot::Mutex<LoopState>,
}

impl ReloadLoop {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        scanner: DirectoryScanner,
        loader: Arc<dyn ModuleLoader>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            scanner,
            loader,
            interval,
            skip_unchanged: true,
            fingerprints: Mutex::new(FingerprintCache::new()),
            state: parking_lot::Mutex::new(LoopState::Idle),
        }
    }

    /// 변경 없는 artifact 건너뛰기 설정
    pub fn with_skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }

    pub fn state(&self) -> LoopState {
        *self.state.lock()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn set_state(&self, state: LoopState) {
        *self.state.lock() = state;
    }

    // ========================================================================
    // Batch
    // ========================================================================

    /// batch 한 번 실행
    ///
    /// 동시에 호출되면 순서대로 실행된다.
    pub async fn run_batch(&self) -> Result<BatchSummary> {
        let mut cache = self.fingerprints.lock().await;

        self.set_state(LoopState::Scanning);
        let result = self.drain(&mut cache).await;
        self.set_state(LoopState::Idle);

        match &result {
            Ok(summary) => {
                if summary.changed() || summary.rejected + summary.failed > 0 {
                    info!(
                        "[hotswap] Batch: {} scanned, {} registered, {} refreshed, {} rejected, {} failed, {} skipped",
                        summary.scanned,
                        summary.registered,
                        summary.refreshed,
                        summary.rejected,
                        summary.failed,
                        summary.skipped
                    );
                } else {
                    debug!("[hotswap] Batch: {} scanned, nothing changed", summary.scanned);
                }
                self.registry.publish(ReloadEvent::BatchCompleted(*summary));
            }
            Err(e) => {
                warn!("[hotswap] Scan aborted: {}", e);
                self.registry.publish(ReloadEvent::ScanFailed {
                    path: self.scanner.dir().to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }

        result
    }

    async fn drain(&self, cache: &mut FingerprintCache) -> Result<BatchSummary> {
        let artifacts = self.scanner.scan().await?;
        cache.retain_present(&artifacts);

        let mut summary = BatchSummary::default();

        for artifact in &artifacts {
            summary.scanned += 1;

            if self.skip_unchanged && !cache.is_changed(artifact) {
                summary.skipped += 1;
                debug!("[hotswap] Unchanged, skipping {}", artifact.path.display());
                continue;
            }
            cache.record(artifact);

            match self.load_and_register(artifact).await {
                Ok(RegisterOutcome::Registered) => summary.registered += 1,
                Ok(RegisterOutcome::Refreshed) => summary.refreshed += 1,
                // 거부는 레지스트리가 로그/이벤트로 보고한다
                Err(Error::SignatureRejected { .. }) => summary.rejected += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!("[hotswap] Failed to load {}: {}", artifact.path.display(), e);
                    self.registry.publish(ReloadEvent::LoadFailed {
                        path: artifact.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(summary)
    }

    /// blocking 스레드에서 로드 후 등록
    ///
    /// 교체되거나 거부된 모듈의 매핑 해제(dlclose, shadow 삭제)도 같은 스레드에서
    /// 일어난다.
    async fn load_and_register(&self, artifact: &Artifact) -> Result<RegisterOutcome> {
        let loader = Arc::clone(&self.loader);
        let registry = Arc::clone(&self.registry);
        let path = artifact.path.clone();
        let name = artifact.name.clone();

        tokio::task::spawn_blocking(move || {
            let entry = loader.load(&path, &name)?;
            registry.register(&name, entry, &path)
        })
        .await
        .map_err(|e| Error::load(&artifact.path, format!("loader task failed: {}", e)))?
    }

    // ========================================================================
    // Background task
    // ========================================================================

    /// 백그라운드 태스크 시작
    ///
    /// 첫 tick은 즉시 실행된다. `shutdown`에 true가 전달되면 다음 tick을 기다리지
    /// 않고 종료하지만, 진행 중인 batch는 끝까지 실행된다.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                "[hotswap] Monitoring {} every {:?}",
                self.scanner.dir().display(),
                self.interval
            );

            loop {
                if *shutdown.borrow() {
                    break;
                }

                tokio::select! {
                    _ = timer.tick() => {}
                    changed = shutdown.changed() => {
                        // sender가 사라진 경우도 종료로 본다
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                }

                // 에러는 run_batch 안에서 보고됨
                let _ = self.run_batch().await;
            }

            info!("[hotswap] Reload loop stopped");
        })
    }
}
