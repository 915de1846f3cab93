//! Config - 통합 설정 관리
//!
//! - `hotswap.rs` - HotSwapConfig 통합 설정

mod hotswap;

pub use hotswap::{CompilerConfig, HotSwapConfig, DEFAULT_SHADOW_DIR_NAME, HOTSWAP_CONFIG_FILE};
