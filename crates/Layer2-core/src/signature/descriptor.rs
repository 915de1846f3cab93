//! Signature Descriptor - entry point 호출 형태 기술자
//!
//! 텍스트 형식: `v<version>:(<kind>,<kind>,...)-><kind>`
//!
//! ```text
//! v1:(i64,i64)->i64
//! v1:()->void
//! v2:(str, ptr) -> bool
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// ValueKind - 파라미터/반환 타입 태그
// ============================================================================

/// 파라미터/반환 값의 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// 불투명 포인터
    Ptr,
    /// NUL 종료 C 문자열
    Str,
}

impl ValueKind {
    /// 태그 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Ptr => "ptr",
            Self::Str => "str",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "void" => Self::Void,
            "bool" => Self::Bool,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "f32" => Self::F32,
            "f64" => Self::F64,
            "ptr" => Self::Ptr,
            "str" => Self::Str,
            other => return Err(DescriptorError::UnknownKind(other.to_string())),
        };
        Ok(kind)
    }
}

// ============================================================================
// DescriptorError - 파싱 에러
// ============================================================================

/// 기술자 파싱 에러
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("missing version prefix in '{0}'")]
    MissingVersion(String),

    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    #[error("malformed parameter list in '{0}'")]
    MalformedParams(String),

    #[error("missing return kind in '{0}'")]
    MissingReturn(String),

    #[error("unknown value kind '{0}'")]
    UnknownKind(String),

    #[error("'void' is only valid as a return kind")]
    VoidParameter,
}

impl From<DescriptorError> for hotswap_foundation::Error {
    fn from(e: DescriptorError) -> Self {
        hotswap_foundation::Error::InvalidDescriptor(e.to_string())
    }
}

// ============================================================================
// Signature - 구조적 시그니처
// ============================================================================

/// entry point의 구조적 시그니처
///
/// 값 비교만으로 호환성을 판단한다. 구현 내용이나 해시는 보지 않는다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// 기술자 형식 버전
    pub version: u32,

    /// 파라미터 종류 (순서 유지)
    pub params: Vec<ValueKind>,

    /// 반환 종류
    pub returns: ValueKind,
}

impl Signature {
    /// 현재 기술자 형식 버전
    pub const CURRENT_VERSION: u32 = 1;

    /// 현재 버전으로 시그니처 생성
    pub fn new(params: impl Into<Vec<ValueKind>>, returns: ValueKind) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            params: params.into(),
            returns,
        }
    }

    /// 버전 지정
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// 파라미터 수
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// 구조적으로 같은지 확인
    pub fn is_compatible_with(&self, other: &Signature) -> bool {
        self == other
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}:(", self.version)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ")->{}", self.returns)
    }
}

impl FromStr for Signature {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();

        let rest = compact
            .strip_prefix('v')
            .ok_or_else(|| DescriptorError::MissingVersion(s.to_string()))?;
        let (version, shape) = rest
            .split_once(':')
            .ok_or_else(|| DescriptorError::MissingVersion(s.to_string()))?;
        let version: u32 = version
            .parse()
            .map_err(|_| DescriptorError::InvalidVersion(version.to_string()))?;
        if version == 0 {
            return Err(DescriptorError::InvalidVersion(version.to_string()));
        }

        let shape = shape
            .strip_prefix('(')
            .ok_or_else(|| DescriptorError::MalformedParams(s.to_string()))?;
        let (params, returns) = shape
            .split_once(")->")
            .ok_or_else(|| DescriptorError::MalformedParams(s.to_string()))?;
        if params.contains('(') || params.contains(')') {
            return Err(DescriptorError::MalformedParams(s.to_string()));
        }
        if returns.is_empty() {
            return Err(DescriptorError::MissingReturn(s.to_string()));
        }

        let params = if params.is_empty() {
            Vec::new()
        } else {
            params
                .split(',')
                .map(|p| match p.parse::<ValueKind>()? {
                    ValueKind::Void => Err(DescriptorError::VoidParameter),
                    kind => Ok(kind),
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            version,
            params,
            returns: returns.parse()?,
        })
    }
}
