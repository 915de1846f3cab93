//! Module Record - 레지스트리 항목 정의

use crate::loader::EntryPoint;
use crate::signature::Signature;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// ModuleRecord - 등록된 모듈
// ============================================================================

/// 이름 하나에 대한 등록 정보
///
/// `signature`는 최초 등록 이후 변경되지 않는다.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// 고유 이름
    pub name: String,

    /// 현재 entry point
    pub entry_point: EntryPoint,

    /// baseline 시그니처
    pub signature: Signature,

    /// 마지막 (재)등록 시간
    pub loaded_at: DateTime<Utc>,

    /// 최초 등록 시간
    pub first_loaded_at: DateTime<Utc>,

    /// 호환 재로드 횟수
    pub reload_count: u32,

    /// 원본 artifact 경로
    pub artifact_path: PathBuf,
}

impl ModuleRecord {
    pub fn new(
        name: impl Into<String>,
        entry_point: EntryPoint,
        signature: Signature,
        artifact_path: impl Into<PathBuf>,
    ) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            entry_point,
            signature,
            loaded_at: now,
            first_loaded_at: now,
            reload_count: 0,
            artifact_path: artifact_path.into(),
        }
    }

    /// entry point 교체 (시그니처 유지)
    ///
    /// 이전 entry point를 반환한다. 호출자가 lock 밖에서 drop하도록.
    pub fn refresh(&mut self, entry_point: EntryPoint, artifact_path: impl Into<PathBuf>) -> EntryPoint {
        self.loaded_at = Utc::now();
        self.reload_count += 1;
        self.artifact_path = artifact_path.into();
        std::mem::replace(&mut self.entry_point, entry_point)
    }

    /// 핸들 없는 메타데이터 뷰
    pub fn info(&self) -> ModuleInfo {
        ModuleInfo {
            name: self.name.clone(),
            signature: self.signature.clone(),
            loaded_at: self.loaded_at,
            first_loaded_at: self.first_loaded_at,
            reload_count: self.reload_count,
            artifact_path: self.artifact_path.clone(),
        }
    }
}

// ============================================================================
// ModuleInfo - 메타데이터 뷰
// ============================================================================

/// 등록 정보의 메타데이터 (entry point 제외)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub name: String,
    pub signature: Signature,
    pub loaded_at: DateTime<Utc>,
    pub first_loaded_at: DateTime<Utc>,
    pub reload_count: u32,
    pub artifact_path: PathBuf,
}
