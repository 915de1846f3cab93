//! Signature Validator - baseline 시그니처 관리
//!
//! 이름별로 처음 수락된 시그니처가 baseline이 되며 이후 절대 교체되지 않는다.

use super::descriptor::Signature;
use std::collections::HashMap;

// ============================================================================
// Validation - 검증 결과
// ============================================================================

/// 검증 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// 수락됨 (baseline 반환)
    Accepted {
        baseline: Signature,
        /// 이번 호출로 baseline이 새로 기록되었는지
        first: bool,
    },

    /// 거부됨 (기존 baseline 유지)
    Rejected { baseline: Signature },
}

impl Validation {
    /// 수락 여부
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// baseline 시그니처
    pub fn baseline(&self) -> &Signature {
        match self {
            Self::Accepted { baseline, .. } | Self::Rejected { baseline } => baseline,
        }
    }
}

// ============================================================================
// SignatureValidator
// ============================================================================

/// 이름별 baseline 시그니처 테이블
///
/// 동기화는 소유자(ModuleRegistry)의 lock이 담당한다.
#[derive(Debug, Default)]
pub struct SignatureValidator {
    baselines: HashMap<String, Signature>,
}

impl SignatureValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 후보 시그니처 검증
    ///
    /// baseline이 없으면 후보를 baseline으로 기록하고 수락한다 (first-writer-wins).
    pub fn validate(&mut self, name: &str, candidate: &Signature) -> Validation {
        match self.baselines.get(name) {
            Some(baseline) if baseline.is_compatible_with(candidate) => Validation::Accepted {
                baseline: baseline.clone(),
                first: false,
            },
            Some(baseline) => Validation::Rejected {
                baseline: baseline.clone(),
            },
            None => {
                self.baselines.insert(name.to_string(), candidate.clone());
                Validation::Accepted {
                    baseline: candidate.clone(),
                    first: true,
                }
            }
        }
    }

    /// 기록된 baseline 조회
    pub fn baseline(&self, name: &str) -> Option<&Signature> {
        self.baselines.get(name)
    }

    /// baseline 수
    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}
