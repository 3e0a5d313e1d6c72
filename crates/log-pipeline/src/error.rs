//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 파이프라인 API 경계에서 거부되는 조건만 표현합니다.
//! 로그 내용의 이상(인식되지 않는 라인, 숫자 누락, 짝이 맞지 않는 컴포넌트 마커)은
//! 에러가 아니며 내부에서 흡수됩니다.
//! `From<LogPipelineError> for ProdlogError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use prodlog_core::error::{ConfigError, ProdlogError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 액션 이름이 `SomeController#action` 형태가 아님
    #[error("invalid action name {action}, expected something like SomeController#action")]
    InvalidAction {
        /// 변환 후의 액션 이름
        action: String,
    },

    /// 입력 파일을 읽을 수 없음 (없음, 일반 파일 아님, 권한 없음)
    #[error("unable to read {path}: {reason}")]
    UnreadableInput {
        /// 입력 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러 (출력 기록 등)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogPipelineError {
    /// 호출자가 넘긴 인자 자체가 거부된 경우인지 여부
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Self::InvalidAction { .. } | Self::UnreadableInput { .. })
    }
}

impl From<LogPipelineError> for ProdlogError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Io(e) => ProdlogError::Io(e),
            LogPipelineError::Config { field, reason } => {
                ProdlogError::Config(ConfigError::InvalidValue { field, reason })
            }
            other => ProdlogError::InvalidArgument(other.to_string()),
        }
    }
}
