//! # hotswap-foundation
//!
//! Foundation layer for HotSwap:
//! - Error: 에러 분류 (DirectoryUnreadable, Load, SymbolNotFound, SignatureRejected, ...)
//! - Config: 통합 설정 (HotSwapConfig, CompilerConfig)

pub mod config;
pub mod error;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{CompilerConfig, HotSwapConfig, DEFAULT_SHADOW_DIR_NAME, HOTSWAP_CONFIG_FILE};
