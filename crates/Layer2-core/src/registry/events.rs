//! Reload Events - 진단 이벤트
//!
//! 로드 성공/실패, 거부 사유를 broadcast 채널로 전달한다.

use crate::signature::Signature;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// ReloadEvent
// ============================================================================

/// 레지스트리 / reload loop 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadEvent {
    /// 이름이 처음 등록됨
    Registered { name: String, signature: Signature },

    /// 호환 재로드로 entry point 교체됨
    Refreshed { name: String, reload_count: u32 },

    /// 시그니처 불일치로 거부됨 (기존 항목 유지)
    Rejected {
        name: String,
        expected: Signature,
        actual: Signature,
    },

    /// 로드 실패 (Load / SymbolNotFound / InvalidDescriptor)
    LoadFailed { path: PathBuf, reason: String },

    /// 디렉토리 스캔 실패 (이번 tick 중단)
    ScanFailed { path: PathBuf, reason: String },

    /// batch 완료
    BatchCompleted(BatchSummary),
}

impl ReloadEvent {
    /// 이벤트 대상 이름
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Registered { name, .. } => Some(name),
            Self::Refreshed { name, .. } => Some(name),
            Self::Rejected { name, .. } => Some(name),
            _ => None,
        }
    }

    /// 실패성 이벤트인지
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Rejected { .. } | Self::LoadFailed { .. } | Self::ScanFailed { .. }
        )
    }
}

// ============================================================================
// BatchSummary
// ============================================================================

/// batch 한 번의 결과 집계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// 스캔된 artifact 수
    pub scanned: usize,
    /// 새로 등록
    pub registered: usize,
    /// 호환 재로드
    pub refreshed: usize,
    /// 시그니처 거부
    pub rejected: usize,
    /// 로드 실패
    pub failed: usize,
    /// 변경 없음
    pub skipped: usize,
}

impl BatchSummary {
    /// 레지스트리가 변경되었는지
    pub fn changed(&self) -> bool {
        self.registered + self.refreshed > 0
    }
}
