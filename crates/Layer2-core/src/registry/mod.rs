//! # Module Registry
//!
//! 이름 -> 로드된 entry point + baseline 시그니처 테이블
//!
//! ## 설계 원칙
//!
//! 1. **Single Lock**: 테이블, 검증기, 카운터를 하나의 RwLock으로 보호
//! 2. **First-writer-wins**: 이름별 시그니처는 최초 등록 이후 불변
//! 3. **Event-driven**: 등록/교체/거부 시 ReloadEvent 발행
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  ModuleRegistry                      │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │  RwLock<RegistryInner>                         │  │
//! │  │   - records:   HashMap<String, ModuleRecord>   │  │
//! │  │   - validator: SignatureValidator (baseline)   │  │
//! │  │   - stats:     RegistryStats                   │  │
//! │  └────────────────────────────────────────────────┘  │
//! │                        │                             │
//! │            broadcast::Sender<ReloadEvent>            │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## 사용 예시
//!
//! ```ignore
//! let registry = ModuleRegistry::new();
//! registry.register("add", loaded, "/plugins/add.so")?;
//!
//! let add = registry.lookup("add")?;
//! let f: extern "C" fn(i64, i64) -> i64 = unsafe { add.cast() };
//! ```

mod events;
mod module_registry;
mod record;

pub use events::{BatchSummary, ReloadEvent};
pub use module_registry::{ModuleRegistry, RegisterOutcome, RegistryStats};
pub use record::{ModuleInfo, ModuleRecord};
