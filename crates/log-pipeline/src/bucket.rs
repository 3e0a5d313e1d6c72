//! 버킷팅 -- 인터리브된 로그 스트림을 프로세스별 라인 그룹으로 분리
//!
//! [`Bucketer`]는 라인 하나를 받을 때마다 라우팅 키(host, program, pid)를 추출하여
//! 해당 버킷에 payload(또는 원본 라인)를 추가합니다.
//!
//! # 버킷 수명
//! - 처음 보는 키의 라인이 들어오면 빈 버킷을 만듭니다.
//! - `Start rendering component `는 중첩 깊이를 1 올리고,
//!   `End of component rendering`은 1 내립니다.
//! - `Completed`로 시작하는 라인이 깊이 0에서 나오면 버킷을 맵에서 제거하고
//!   [`ClosedGroup`]으로 내보냅니다.
//! - 스트림이 끝나면 [`Bucketer::finish`]가 남은 버킷을 키 오름차순으로 내보냅니다.
//!
//! 짝이 맞지 않는 종료 마커로 깊이가 음수가 될 수 있습니다. 이는 허용되며,
//! 완료 판정은 `depth == 0`만 봅니다. 음수 깊이에 갇힌 버킷은 스트림 종료 시
//! 플러시로만 나옵니다.

use std::collections::HashMap;

use metrics::{counter, gauge};
use prodlog_core::metrics::{
    LABEL_REASON, PIPELINE_GROUPS_CLOSED_TOTAL, PIPELINE_GROUPS_FLUSHED_TOTAL,
    PIPELINE_LINES_IGNORED_TOTAL, PIPELINE_LINES_TOTAL, PIPELINE_OPEN_BUCKETS,
};
use prodlog_core::types::RoutingKey;
use tracing::{debug, warn};

use crate::config::{PipelineConfig, Retention};

/// 컴포넌트 렌더링 시작 마커 (접두어)
pub const COMPONENT_START: &str = "Start rendering component ";

/// 컴포넌트 렌더링 종료 마커 (라인 전체)
pub const COMPONENT_END: &str = "End of component rendering";

/// 요청 완료 마커 (접두어)
pub const COMPLETED: &str = "Completed";

/// 버킷터가 구분하는 구조 마커
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    ComponentStart,
    ComponentEnd,
    Completed,
    None,
}

impl Marker {
    fn of(payload: &str) -> Self {
        if payload.starts_with(COMPONENT_START) {
            Self::ComponentStart
        } else if payload == COMPONENT_END {
            Self::ComponentEnd
        } else if payload.starts_with(COMPLETED) {
            Self::Completed
        } else {
            Self::None
        }
    }
}

/// 프로세스별 누적 상태
#[derive(Debug, Default)]
struct Bucket {
    /// 도착 순서대로 쌓인 라인
    lines: Vec<String>,
    /// 컴포넌트 렌더링 중첩 깊이
    depth: i64,
}

/// 닫힌 라인 그룹
///
/// 버킷 하나가 완료 마커로 닫히거나 스트림 종료 시 플러시된 결과입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedGroup {
    /// 그룹의 라우팅 키
    pub key: RoutingKey,
    /// 도착 순서대로의 라인 (payload 또는 원본 라인)
    pub lines: Vec<String>,
    /// 완료 마커로 닫혔으면 `true`, 스트림 종료 플러시면 `false`
    pub completed: bool,
}

/// 스트리밍 버킷터
///
/// 단일 스레드에서 라인 순서대로 [`process`](Self::process)를 호출합니다.
/// 버킷 맵은 버킷터가 독점 소유하며 외부와 공유되지 않습니다.
#[derive(Debug)]
pub struct Bucketer {
    config: PipelineConfig,
    buckets: HashMap<RoutingKey, Bucket>,
    /// 임계값 초과 경고를 이미 남겼는지 여부 (임계값 아래로 내려가면 초기화)
    over_threshold: bool,
}

impl Bucketer {
    /// 설정으로 새 버킷터를 생성합니다.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            buckets: HashMap::new(),
            over_threshold: false,
        }
    }

    /// 현재 열린 버킷 수를 반환합니다.
    pub fn open_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// 라인 하나를 처리합니다.
    ///
    /// 이 라인으로 어떤 버킷이 깊이 0에서 완료되면 그 그룹을 반환합니다.
    /// 접두어가 맞지 않거나 무시 대상 프로그램의 라인은 어떤 버킷도 건드리지 않습니다.
    pub fn process(&mut self, line: &str) -> Option<ClosedGroup> {
        counter!(PIPELINE_LINES_TOTAL).increment(1);

        let Some(caps) = self.config.line_pattern.regex().captures(line) else {
            counter!(PIPELINE_LINES_IGNORED_TOTAL, LABEL_REASON => "unmatched").increment(1);
            return None;
        };

        let program = &caps[2];
        if self.config.is_ignored_program(program) {
            counter!(PIPELINE_LINES_IGNORED_TOTAL, LABEL_REASON => "ignored_program")
                .increment(1);
            return None;
        }

        let key = RoutingKey::new(&caps[1], program, &caps[3]);
        let payload = caps.get(4).map_or("", |m| m.as_str());
        let retained = match self.config.retention {
            Retention::Payload => payload,
            Retention::RawLine => line,
        };

        let bucket = self.buckets.entry(key.clone()).or_default();
        bucket.lines.push(retained.to_owned());

        let closed = match Marker::of(payload) {
            Marker::ComponentStart => {
                bucket.depth += 1;
                None
            }
            Marker::ComponentEnd => {
                bucket.depth -= 1;
                None
            }
            Marker::Completed if bucket.depth == 0 => self.close(key),
            Marker::Completed | Marker::None => None,
        };

        self.track_open_buckets();
        closed
    }

    /// 스트림 종료 시 남은 버킷을 라우팅 키 오름차순으로 모두 내보냅니다.
    pub fn finish(self) -> Vec<ClosedGroup> {
        let mut remaining: Vec<(RoutingKey, Bucket)> = self.buckets.into_iter().collect();
        remaining.sort_by(|(a, _), (b, _)| a.cmp(b));

        gauge!(PIPELINE_OPEN_BUCKETS).set(0.0);

        remaining
            .into_iter()
            .map(|(key, bucket)| {
                counter!(PIPELINE_GROUPS_FLUSHED_TOTAL).increment(1);
                debug!(
                    key = %key,
                    lines = bucket.lines.len(),
                    depth = bucket.depth,
                    "flushing incomplete bucket at end of stream"
                );
                ClosedGroup {
                    key,
                    lines: bucket.lines,
                    completed: false,
                }
            })
            .collect()
    }

    fn close(&mut self, key: RoutingKey) -> Option<ClosedGroup> {
        let bucket = self.buckets.remove(&key)?;
        counter!(PIPELINE_GROUPS_CLOSED_TOTAL).increment(1);
        debug!(key = %key, lines = bucket.lines.len(), "bucket completed");
        Some(ClosedGroup {
            key,
            lines: bucket.lines,
            completed: true,
        })
    }

    fn track_open_buckets(&mut self) {
        let open = self.buckets.len();
        gauge!(PIPELINE_OPEN_BUCKETS).set(open as f64);

        if open > self.config.max_open_buckets {
            if !self.over_threshold {
                self.over_threshold = true;
                warn!(
                    open,
                    threshold = self.config.max_open_buckets,
                    "open bucket count exceeds threshold; requests without a Completed line are accumulating"
                );
            }
        } else {
            self.over_threshold = false;
        }
    }
}

impl Default for Bucketer {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
