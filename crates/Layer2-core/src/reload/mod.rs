//! Reload - 백그라운드 스캔 루프
//!
//! - `reload_loop.rs` - ReloadLoop (Idle / Scanning 상태 머신)
//! - `fingerprint.rs` - 변경 없는 artifact 감지

mod fingerprint;
mod reload_loop;

pub use fingerprint::FingerprintCache;
pub use reload_loop::{LoopState, ReloadLoop};
