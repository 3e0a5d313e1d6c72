#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`bucket`]: 라우팅 키별 버킷팅, 컴포넌트 중첩 추적, 완료/플러시
//! - [`extract`]: 닫힌 라인 그룹을 `LogEntry`로 변환하는 순서 있는 분류기
//! - [`normalize`]: 요청 경로 정규화
//! - [`stream`]: `BufRead` 위의 지연 반복 API
//! - [`grep`]: 액션 이름 필터와 원본 라인 출력
//! - [`report`]: 페이지별 집계
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입

pub mod bucket;
pub mod config;
pub mod error;
pub mod extract;
pub mod grep;
pub mod normalize;
pub mod report;
pub mod stream;

// --- 주요 타입 re-export ---

// 버킷팅
pub use bucket::{Bucketer, ClosedGroup};

// 설정
pub use config::{LinePattern, PipelineConfig, Retention};

// 에러
pub use error::LogPipelineError;

// 추출/정규화
pub use extract::{extract, extract_text};
pub use normalize::normalize_page;

// 반복 API
pub use stream::{ClosedGroups, LogEntries, iterate, iterate_path, iterate_path_with};

// grep
pub use grep::{ActionFilter, GrepMatches, grep, grep_matches, grep_with};

// 집계
pub use report::{PageReport, PageStats};
