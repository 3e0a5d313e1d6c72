//! 도메인 타입 -- 요청 요약 레코드와 라우팅 키
//!
//! 모든 크레이트가 공유하는 데이터 구조를 정의합니다.
//! 버킷터는 [`RoutingKey`]로 라인을 분배하고, 추출기는 닫힌 그룹을 [`LogEntry`]로 변환합니다.

use std::cmp::Ordering;
use std::fmt;
use std::iter;

use serde::{Deserialize, Serialize};

/// 라우팅 키
///
/// 한 라인이 어느 버킷에 속하는지 결정하는 (호스트, 프로그램, 프로세스 ID) 삼중항입니다.
/// 정렬은 `host-program-pid` 형태로 이어붙인 문자열의 사전순이며,
/// 스트림 종료 시 남은 버킷을 결정적인 순서로 내보낼 때만 사용됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingKey {
    /// 호스트명
    pub host: String,
    /// 프로그램명 (syslog 태그)
    pub program: String,
    /// 프로세스 ID (숫자 문자열)
    pub pid: String,
}

impl RoutingKey {
    /// 새 라우팅 키를 생성합니다.
    pub fn new(host: impl Into<String>, program: impl Into<String>, pid: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            program: program.into(),
            pid: pid.into(),
        }
    }

    /// 이어붙인 키의 바이트 열을 할당 없이 순회합니다.
    fn joined_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.host
            .bytes()
            .chain(iter::once(b'-'))
            .chain(self.program.bytes())
            .chain(iter::once(b'-'))
            .chain(self.pid.bytes())
    }
}

impl Ord for RoutingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // 이어붙인 문자열이 같아도 삼중항이 다르면 구분되어야 Eq와 일관됨
        self.joined_bytes()
            .cmp(other.joined_bytes())
            .then_with(|| self.host.cmp(&other.host))
            .then_with(|| self.program.cmp(&other.program))
            .then_with(|| self.pid.cmp(&other.pid))
    }
}

impl PartialOrd for RoutingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.host, self.program, self.pid)
    }
}

/// SQL 쿼리 타이밍
///
/// 쿼리 본문은 메모리 절약을 위해 저장하지 않고 라벨과 소요 시간만 보관합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTiming {
    /// 쿼리 라벨 (예: `Person Load`)
    pub label: String,
    /// 소요 시간 (초)
    pub elapsed: f64,
}

impl QueryTiming {
    /// 새 쿼리 타이밍을 생성합니다.
    pub fn new(label: impl Into<String>, elapsed: f64) -> Self {
        Self {
            label: label.into(),
            elapsed,
        }
    }
}

/// 로그 엔트리
///
/// 한 요청에 대한 요약입니다. 닫힌 라인 그룹 하나에서 정확히 한 번 만들어지며,
/// 버킷을 참조하지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// 정규화된 요청 경로 (시작 마커가 없으면 `None`)
    pub page: Option<String>,
    /// 요청 클라이언트 주소
    pub ip: Option<String>,
    /// 요청 시각 (원본 텍스트 그대로)
    pub time: Option<String>,
    /// 쿼리 타이밍 목록 (그룹 내 등장 순서)
    pub queries: Vec<QueryTiming>,
    /// 전체 요청 시간 (DB, 렌더링 등 포함)
    pub request_time: f64,
    /// 렌더링 시간
    pub render_time: f64,
    /// DB 시간
    pub db_time: f64,
}

impl LogEntry {
    /// 쿼리 소요 시간의 합계를 반환합니다.
    pub fn query_time(&self) -> f64 {
        self.queries.iter().map(|q| q.elapsed).sum()
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from {} in {} (views: {} | db: {} | queries: {})",
            self.page.as_deref().unwrap_or("-"),
            self.ip.as_deref().unwrap_or("-"),
            self.request_time,
            self.render_time,
            self.db_time,
            self.queries.len(),
        )
    }
}
