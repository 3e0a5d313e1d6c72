//! 설정 관리 -- prodlog.toml 파싱 및 런타임 설정
//!
//! [`ProdlogConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//! 설정 파일은 선택 사항이며, 없으면 기본값으로 동작합니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`PRODLOG_PIPELINE_MAX_OPEN_BUCKETS=500` 형식)
//! 3. 설정 파일 (`prodlog.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), prodlog_core::error::ProdlogError> {
//! use prodlog_core::config::ProdlogConfig;
//!
//! // 파일이 없으면 기본값 + 환경변수 오버라이드
//! let config = ProdlogConfig::load_or_default("prodlog.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ProdlogConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ProdlogError};

/// prodlog 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProdlogConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 버킷팅/추출 파이프라인 설정
    #[serde(default)]
    pub pipeline: PipelineSection,
}

impl ProdlogConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ProdlogError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 파일이 있으면 [`load`](Self::load)와 같고, 없으면 기본값에 환경변수만 적용합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ProdlogError> {
        match Self::load(path.as_ref()).await {
            Err(ProdlogError::Config(ConfigError::FileNotFound { path })) => {
                tracing::debug!(path = %path, "config file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ProdlogError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProdlogError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ProdlogError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ProdlogError> {
        toml::from_str(toml_str).map_err(|e| {
            ProdlogError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `PRODLOG_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "PRODLOG_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PRODLOG_GENERAL_LOG_FORMAT");

        override_csv(
            &mut self.pipeline.ignored_programs,
            "PRODLOG_PIPELINE_IGNORED_PROGRAMS",
        );
        override_usize(
            &mut self.pipeline.max_open_buckets,
            "PRODLOG_PIPELINE_MAX_OPEN_BUCKETS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ProdlogError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.pipeline.max_open_buckets == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.max_open_buckets".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.pipeline.ignored_programs.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.ignored_programs".to_owned(),
                reason: "program names must not be empty".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 파이프라인 설정 섹션
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// 버킷팅 전에 버릴 프로그램명 목록
    pub ignored_programs: Vec<String>,
    /// 열린 버킷 수 경고 임계값 (초과 시 경고만 남기고 버리지 않음)
    pub max_open_buckets: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            ignored_programs: vec!["newsyslog".to_owned()],
            max_open_buckets: 1_000,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
