//! Hot reload 통합 테스트 - 실제 cdylib을 빌드해 교체/거부 흐름 검증
//!
//! `cargo test -p hotswap-core --test hot_reload -- --nocapture`
//!
//! rustc가 PATH에 없으면 건너뛴다.

use hotswap_core::{
    EntryPoint, Error, HotSwapConfig, HotSwapper, ModuleCompiler, ModuleLoader, NativeLoader,
    ReloadEvent, RustcCompiler,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

type BinaryFn = extern "C" fn(i64, i64) -> i64;

const ADD_V1: &str = r#"
#[no_mangle]
pub extern "C" fn add(a: i64, b: i64) -> i64 {
    a + b
}

#[no_mangle]
pub extern "C" fn add_signature() -> *const std::ffi::c_char {
    b"v1:(i64,i64)->i64\0".as_ptr() as *const std::ffi::c_char
}
"#;

const ADD_THREE_ARGS: &str = r#"
#[no_mangle]
pub extern "C" fn add(a: i64, b: i64, c: i64) -> i64 {
    a + b + c
}

#[no_mangle]
pub extern "C" fn add_signature() -> *const std::ffi::c_char {
    b"v1:(i64,i64,i64)->i64\0".as_ptr() as *const std::ffi::c_char
}
"#;

const ADD_TIMES: &str = r#"
#[no_mangle]
pub extern "C" fn add(a: i64, b: i64) -> i64 {
    a * b
}

#[no_mangle]
pub extern "C" fn add_signature() -> *const std::ffi::c_char {
    b"v1:( i64, i64 ) -> i64\0".as_ptr() as *const std::ffi::c_char
}
"#;

const ADD_WITHOUT_SIGNATURE: &str = r#"
#[no_mangle]
pub extern "C" fn add(a: i64, b: i64) -> i64 {
    a + b
}
"#;

const ADD_BAD_DESCRIPTOR: &str = r#"
#[no_mangle]
pub extern "C" fn add(a: i64, b: i64) -> i64 {
    a + b
}

#[no_mangle]
pub extern "C" fn add_signature() -> *const std::ffi::c_char {
    b"v1:(int)->i64\0".as_ptr() as *const std::ffi::c_char
}
"#;

const SUB_ONLY: &str = r#"
#[no_mangle]
pub extern "C" fn sub(a: i64, b: i64) -> i64 {
    a - b
}

#[no_mangle]
pub extern "C" fn add_signature() -> *const std::ffi::c_char {
    b"v1:(i64,i64)->i64\0".as_ptr() as *const std::ffi::c_char
}
"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn rustc_available() -> bool {
    if which::which("rustc").is_err() {
        println!("rustc not found on PATH, skipping");
        return false;
    }
    true
}

/// 버전별 디렉토리에 같은 파일명(add.rs)으로 소스 작성
fn write_source(root: &Path, version: &str, content: &str) -> PathBuf {
    let dir = root.join("src").join(version);
    std::fs::create_dir_all(&dir).expect("create source dir");
    let path = dir.join("add.rs");
    std::fs::write(&path, content).expect("write source");
    path
}

/// 현재 남아있는 shadow 복사본 수
fn shadow_copies(config: &HotSwapConfig) -> usize {
    std::fs::read_dir(config.resolved_shadow_dir())
        .expect("shadow dir")
        .count()
}

/// 케이스별 출력 디렉토리로 빌드
async fn build(root: &Path, case: &str, content: &str) -> PathBuf {
    let out = root.join(case).join("out");
    std::fs::create_dir_all(&out).expect("output dir");

    let config = HotSwapConfig::default().watch_dir(&out);
    RustcCompiler::from_config(&config)
        .compile(&write_source(root, case, content))
        .await
        .expect("compile")
}

fn call(entry: &EntryPoint, a: i64, b: i64) -> i64 {
    let f: BinaryFn = unsafe { entry.cast() };
    f(a, b)
}

/// 조건에 맞는 이벤트가 올 때까지 대기
async fn wait_for_event(
    rx: &mut broadcast::Receiver<ReloadEvent>,
    mut pred: impl FnMut(&ReloadEvent) -> bool,
) -> ReloadEvent {
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => break event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("event channel closed: {:?}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_compile_reload_reject_and_refresh() {
    init_tracing();
    if !rustc_available() {
        return;
    }

    let temp = TempDir::new().expect("tempdir");
    let config = HotSwapConfig::default()
        .watch_dir(temp.path().join("plugins"))
        .interval_seconds(1);

    let mut swapper = HotSwapper::new(config.clone()).expect("valid config");
    let mut rx = swapper.subscribe();
    swapper.start().await.expect("start failed");

    // 1. 최초 등록
    let artifact = swapper
        .compile(&write_source(temp.path(), "v1", ADD_V1))
        .await
        .expect("compile v1");
    println!("Built {}", artifact.display());

    swapper.scan_now().await.expect("scan v1");
    let original = swapper.lookup("add").expect("add registered");
    assert_eq!(call(&original, 2, 3), 5);
    assert_eq!(
        swapper.record("add").expect("record").signature.to_string(),
        "v1:(i64,i64)->i64"
    );

    // 2. 시그니처가 다른 구현은 거부되고 기존 entry point 유지
    swapper
        .compile(&write_source(temp.path(), "v2", ADD_THREE_ARGS))
        .await
        .expect("compile v2");
    swapper.scan_now().await.expect("scan v2");

    let rejected = wait_for_event(&mut rx, |e| matches!(e, ReloadEvent::Rejected { .. })).await;
    println!("Rejected: {:?}", rejected);
    if let ReloadEvent::Rejected { name, expected, actual } = rejected {
        assert_eq!(name, "add");
        assert_eq!(expected.arity(), 2);
        assert_eq!(actual.arity(), 3);
    }

    let current = swapper.lookup("add").expect("still registered");
    assert!(current.same_symbol(&original));
    assert_eq!(call(&current, 2, 3), 5);
    assert!(swapper.stats().rejections >= 1);

    // 거부된 매핑은 batch 안에서 해제된다
    assert_eq!(shadow_copies(&config), 1);

    // 3. 호환 구현은 교체되고, 이전 핸들은 계속 호출 가능
    swapper
        .compile(&write_source(temp.path(), "v3", ADD_TIMES))
        .await
        .expect("compile v3");
    swapper.scan_now().await.expect("scan v3");

    let refreshed = swapper.lookup("add").expect("refreshed");
    assert_eq!(call(&refreshed, 2, 3), 6);
    assert_eq!(call(&original, 2, 3), 5);
    assert!(swapper.info("add").expect("info").reload_count >= 1);

    // 이전 핸들이 모두 사라지면 이전 매핑도 해제된다
    assert_eq!(shadow_copies(&config), 2);
    drop(original);
    drop(current);
    assert_eq!(shadow_copies(&config), 1);

    swapper.shutdown().await;

    // 종료 후에도 등록된 모듈은 남는다
    assert_eq!(call(&swapper.lookup("add").expect("kept"), 4, 5), 20);
}

#[tokio::test]
async fn test_build_failure_is_reported() {
    init_tracing();
    if !rustc_available() {
        return;
    }

    let temp = TempDir::new().expect("tempdir");
    let config = HotSwapConfig::default().watch_dir(temp.path().join("plugins"));
    std::fs::create_dir_all(&config.watch_dir).expect("watch dir");

    let source = write_source(temp.path(), "broken", "this is not rust");
    let compiler = RustcCompiler::from_config(&config);
    assert!(compiler.is_available());

    let err = compiler
        .compile(&source)
        .await
        .expect_err("compile should fail");
    println!("Build error: {}", err);
    assert!(matches!(err, Error::Build { .. }));
}

#[tokio::test]
async fn test_native_loader_reports_missing_and_malformed_exports() {
    init_tracing();
    if !rustc_available() {
        return;
    }

    let temp = TempDir::new().expect("tempdir");
    let loader = NativeLoader::new();

    // 기술자 심볼 없음
    let artifact = build(temp.path(), "no_signature", ADD_WITHOUT_SIGNATURE).await;
    let err = loader.load(&artifact, "add").expect_err("missing descriptor");
    println!("No signature: {}", err);
    match err {
        Error::SymbolNotFound { symbol, .. } => assert_eq!(symbol, "add_signature"),
        other => panic!("unexpected error: {:?}", other),
    }

    // 해석할 수 없는 기술자
    let artifact = build(temp.path(), "bad_descriptor", ADD_BAD_DESCRIPTOR).await;
    let err = loader.load(&artifact, "add").expect_err("malformed descriptor");
    println!("Bad descriptor: {}", err);
    assert!(matches!(err, Error::InvalidDescriptor(_)));

    // entry point 심볼 없음
    let artifact = build(temp.path(), "no_entry", SUB_ONLY).await;
    let err = loader.load(&artifact, "add").expect_err("missing entry point");
    println!("No entry point: {}", err);
    match err {
        Error::SymbolNotFound { symbol, .. } => assert_eq!(symbol, "add"),
        other => panic!("unexpected error: {:?}", other),
    }
}
