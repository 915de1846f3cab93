//! Signature - entry point 구조적 시그니처와 검증
//!
//! - `descriptor.rs` - Signature / ValueKind 및 텍스트 기술자 파싱
//! - `validator.rs` - 이름별 baseline 관리 (first-writer-wins)

mod descriptor;
mod validator;

pub use descriptor::{DescriptorError, Signature, ValueKind};
pub use validator::{SignatureValidator, Validation};
