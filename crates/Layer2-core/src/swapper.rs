//! HotSwapper - 통합 인터페이스
//!
//! 설정 하나로 Scanner, NativeLoader, ModuleRegistry, ReloadLoop, Compiler를
//! 묶어 제공합니다.
//!
//! ## 사용 예시
//! ```ignore
//! let mut swapper = HotSwapper::new(HotSwapConfig::default().watch_dir("./plugins"))?;
//! swapper.start().await?;
//!
//! let add = swapper.lookup("add")?;
//! let f: extern "C" fn(i64, i64) -> i64 = unsafe { add.cast() };
//! assert_eq!(f(2, 3), 5);
//!
//! swapper.shutdown().await;
//! ```

use crate::compiler::{ModuleCompiler, RustcCompiler};
use crate::loader::{EntryPoint, NativeLoader};
use crate::registry::{BatchSummary, ModuleInfo, ModuleRecord, ModuleRegistry, RegistryStats, ReloadEvent};
use crate::reload::{LoopState, ReloadLoop};
use crate::scanner::DirectoryScanner;
use hotswap_foundation::{Error, HotSwapConfig, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 실행 중인 백그라운드 루프
struct Running {
    reload: Arc<ReloadLoop>,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Hot-swap 통합 핸들
pub struct HotSwapper {
    config: HotSwapConfig,
    registry: Arc<ModuleRegistry>,
    compiler: Arc<dyn ModuleCompiler>,
    running: Option<Running>,
}

impl HotSwapper {
    /// 설정 검증 후 생성 (아직 루프는 시작하지 않음)
    pub fn new(config: HotSwapConfig) -> Result<Self> {
        config.validate()?;

        let compiler = Arc::new(RustcCompiler::from_config(&config));
        Ok(Self {
            config,
            registry: Arc::new(ModuleRegistry::new()),
            compiler,
            running: None,
        })
    }

    /// 다른 빌드 도구 사용
    pub fn with_compiler(mut self, compiler: Arc<dyn ModuleCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn config(&self) -> &HotSwapConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// 감시 디렉토리 생성 후 백그라운드 루프 시작
    ///
    /// 감시 디렉토리를 만들 수 없으면 시작에 실패한다. 이미 실행 중이면 아무것도
    /// 하지 않는다.
    pub async fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Ok(());
        }

        let watch_dir = &self.config.watch_dir;
        tokio::fs::create_dir_all(watch_dir)
            .await
            .map_err(|source| Error::DirectoryUnreadable {
                path: watch_dir.clone(),
                source,
            })?;

        let shadow_dir = self.config.resolved_shadow_dir();
        ensure_shadow_outside_watch(watch_dir, &shadow_dir).await?;

        let loader = NativeLoader::with_shadow_dir(shadow_dir);
        loader.prepare_shadow_dir()?;

        let reload = Arc::new(
            ReloadLoop::new(
                Arc::clone(&self.registry),
                DirectoryScanner::from_config(&self.config),
                Arc::new(loader),
                self.config.interval(),
            )
            .with_skip_unchanged(self.config.skips_unchanged()),
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = Arc::clone(&reload).spawn(stop_rx);

        info!("[hotswap] Started on {}", watch_dir.display());
        self.running = Some(Running {
            reload,
            stop_tx,
            handle,
        });
        Ok(())
    }

    /// 루프 중지 후 종료 대기
    ///
    /// 진행 중인 batch는 끝까지 실행된다. 등록된 모듈은 그대로 남는다.
    pub async fn shutdown(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.stop_tx.send(true);
        if let Err(e) = running.handle.await {
            warn!("[hotswap] Reload task ended abnormally: {}", e);
        }
        info!("[hotswap] Stopped");
    }

    /// 다음 tick을 기다리지 않고 batch 실행
    pub async fn scan_now(&self) -> Result<BatchSummary> {
        let running = self
            .running
            .as_ref()
            .ok_or_else(|| Error::Internal("hot swapper is not started".into()))?;
        running.reload.run_batch().await
    }

    pub fn state(&self) -> Option<LoopState> {
        self.running.as_ref().map(|r| r.reload.state())
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// 현재 entry point
    pub fn lookup(&self, name: &str) -> Result<EntryPoint> {
        self.registry.lookup(name)
    }

    pub fn record(&self, name: &str) -> Option<ModuleRecord> {
        self.registry.record(name)
    }

    pub fn info(&self, name: &str) -> Option<ModuleInfo> {
        self.registry.info(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.registry.subscribe()
    }

    // ========================================================================
    // Compiler
    // ========================================================================

    /// 소스를 빌드해 감시 디렉토리에 artifact 배치
    ///
    /// 등록은 다음 batch에서 이루어진다.
    pub async fn compile(&self, source: &Path) -> Result<PathBuf> {
        self.compiler.compile(source).await
    }
}

/// 실제 경로 기준으로 shadow 디렉토리가 감시 디렉토리와 같거나 상위인지 검사
///
/// 존재하지 않는 shadow 디렉토리는 이미 있는 감시 디렉토리를 포함할 수 없다.
async fn ensure_shadow_outside_watch(watch_dir: &Path, shadow_dir: &Path) -> Result<()> {
    let Ok(shadow) = tokio::fs::canonicalize(shadow_dir).await else {
        return Ok(());
    };
    let watch = tokio::fs::canonicalize(watch_dir).await?;

    if watch.starts_with(&shadow) {
        return Err(Error::Config(format!(
            "shadowDir must not be or contain watchDir: {}",
            shadow_dir.display()
        )));
    }
    Ok(())
}

impl Drop for HotSwapper {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.stop_tx.send(true);
        }
    }
}
