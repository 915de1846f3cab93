//! Fingerprint Cache - 마지막 로드 시도 시점의 artifact 지문

use crate::scanner::{Artifact, ArtifactFingerprint};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// 경로별 마지막 시도 지문
///
/// 성공/실패와 무관하게 시도한 지문을 기록하므로, 거부된 artifact는 디스크에서
/// 바뀔 때까지 다시 로드되지 않는다.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    attempted: HashMap<PathBuf, ArtifactFingerprint>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 마지막 시도 이후 바뀌었는지 (처음 보는 경로는 바뀐 것으로 본다)
    pub fn is_changed(&self, artifact: &Artifact) -> bool {
        self.attempted.get(&artifact.path) != Some(&artifact.fingerprint)
    }

    /// 시도 기록
    pub fn record(&mut self, artifact: &Artifact) {
        self.attempted.insert(artifact.path.clone(), artifact.fingerprint);
    }

    /// 이번 목록에 없는 경로는 잊는다
    pub fn retain_present(&mut self, artifacts: &[Artifact]) {
        let present: HashSet<&Path> = artifacts.iter().map(|a| a.path.as_path()).collect();
        self.attempted.retain(|path, _| present.contains(path.as_path()));
    }

    pub fn len(&self) -> usize {
        self.attempted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(path: &str, len: u64) -> Artifact {
        Artifact {
            path: PathBuf::from(path),
            name: "add".into(),
            fingerprint: ArtifactFingerprint { modified: None, len },
        }
    }

    #[test]
    fn test_unseen_is_changed() {
        let cache = FingerprintCache::new();
        assert!(cache.is_changed(&artifact("/m/add.so", 1)));
    }

    #[test]
    fn test_recorded_is_unchanged_until_fingerprint_moves() {
        let mut cache = FingerprintCache::new();
        cache.record(&artifact("/m/add.so", 1));

        assert!(!cache.is_changed(&artifact("/m/add.so", 1)));
        assert!(cache.is_changed(&artifact("/m/add.so", 2)));
    }

    #[test]
    fn test_retain_present_forgets_removed() {
        let mut cache = FingerprintCache::new();
        cache.record(&artifact("/m/add.so", 1));
        cache.record(&artifact("/m/sub.so", 1));

        cache.retain_present(&[artifact("/m/sub.so", 1)]);

        assert_eq!(cache.len(), 1);
        assert!(cache.is_changed(&artifact("/m/add.so", 1)));
    }
}
