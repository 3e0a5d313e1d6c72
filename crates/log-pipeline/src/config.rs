//! 로그 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`PipelineSection`](prodlog_core::config::PipelineSection)을
//! 기반으로 버킷터 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use prodlog_core::config::ProdlogConfig;
//! use prodlog_pipeline::config::PipelineConfig;
//!
//! let core_config = ProdlogConfig::default();
//! let config = PipelineConfig::from_core(&core_config.pipeline);
//! let grep_config = PipelineConfig::for_grep(&core_config.pipeline);
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::LogPipelineError;

/// 가변 폭 타임스탬프 뒤 어디에서든 `host program[pid]: payload`를 찾는 패턴
static SYSLOG_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r" ([^ ]+) ([^ ]+)\[(\d+)\]: (.*)").expect("invalid syslog prefix regex")
});

/// 정확히 15자 타임스탬프(`Mar  7 00:00:20`) 바로 뒤의 접두어만 인정하는 패턴
static FIXED_WIDTH_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.{15} ([^ ]+) ([^ ]+)\[(\d+)\]: (.*)").expect("invalid fixed-width prefix regex")
});

/// 라인 접두어 패턴 변형
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinePattern {
    /// 타임스탬프 폭을 가정하지 않음 (반복 API 기본값)
    #[default]
    Syslog,
    /// 15자 고정 폭 타임스탬프 (grep 기본값)
    FixedWidth,
}

impl LinePattern {
    /// 이 변형의 컴파일된 정규식을 반환합니다.
    ///
    /// 캡처 그룹: 1 = host, 2 = program, 3 = pid, 4 = payload
    pub fn regex(self) -> &'static Regex {
        match self {
            Self::Syslog => &SYSLOG_PREFIX_RE,
            Self::FixedWidth => &FIXED_WIDTH_PREFIX_RE,
        }
    }
}

/// 버킷에 보관할 텍스트
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Retention {
    /// 접두어 뒤의 payload만 보관 (추출기 입력)
    #[default]
    Payload,
    /// 원본 라인 전체를 보관 (grep 재출력용)
    RawLine,
}

/// 로그 파이프라인 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 라인 접두어 패턴
    pub line_pattern: LinePattern,
    /// 버킷 보관 방식
    pub retention: Retention,
    /// 버킷팅 전에 버릴 프로그램명 목록
    pub ignored_programs: Vec<String>,
    /// 열린 버킷 수 경고 임계값
    pub max_open_buckets: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            line_pattern: LinePattern::Syslog,
            retention: Retention::Payload,
            ignored_programs: vec!["newsyslog".to_owned()],
            max_open_buckets: 1_000,
        }
    }
}

impl PipelineConfig {
    /// core의 `PipelineSection`에서 반복 API용 설정을 생성합니다.
    pub fn from_core(core: &prodlog_core::config::PipelineSection) -> Self {
        Self {
            ignored_programs: core.ignored_programs.clone(),
            max_open_buckets: core.max_open_buckets,
            ..Self::default()
        }
    }

    /// core의 `PipelineSection`에서 grep용 설정(고정 폭, 원본 라인 보관)을 생성합니다.
    pub fn for_grep(core: &prodlog_core::config::PipelineSection) -> Self {
        Self::from_core(core)
            .with_line_pattern(LinePattern::FixedWidth)
            .with_retention(Retention::RawLine)
    }

    /// 라인 접두어 패턴을 설정합니다.
    pub fn with_line_pattern(mut self, pattern: LinePattern) -> Self {
        self.line_pattern = pattern;
        self
    }

    /// 버킷 보관 방식을 설정합니다.
    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    /// 열린 버킷 수 경고 임계값을 설정합니다.
    pub fn with_max_open_buckets(mut self, max: usize) -> Self {
        self.max_open_buckets = max;
        self
    }

    /// 프로그램명이 무시 목록에 있는지 확인합니다.
    ///
    /// `newsyslog`는 설정과 관계없이 항상 무시됩니다.
    pub fn is_ignored_program(&self, program: &str) -> bool {
        program == "newsyslog" || self.ignored_programs.iter().any(|p| p == program)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.max_open_buckets == 0 {
            return Err(LogPipelineError::Config {
                field: "max_open_buckets".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if let Some(bad) = self
            .ignored_programs
            .iter()
            .find(|p| p.is_empty() || p.contains(char::is_whitespace))
        {
            return Err(LogPipelineError::Config {
                field: "ignored_programs".to_owned(),
                reason: format!("invalid program name '{bad}'"),
            });
        }

        Ok(())
    }
}
