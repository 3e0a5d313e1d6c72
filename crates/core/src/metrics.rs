//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 파이프라인은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! 레코더가 설치되지 않으면 매크로는 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `prodlog_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(prodlog_core::metrics::PIPELINE_LINES_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 라인 무시 사유 레이블 키 (unmatched, ignored_program)
pub const LABEL_REASON: &str = "reason";

// ─── Pipeline 메트릭 ────────────────────────────────────────────────

/// Pipeline: 버킷터에 입력된 전체 라인 수 (counter)
pub const PIPELINE_LINES_TOTAL: &str = "prodlog_pipeline_lines_total";

/// Pipeline: 버킷에 들어가지 않은 라인 수 (counter, label: reason)
pub const PIPELINE_LINES_IGNORED_TOTAL: &str = "prodlog_pipeline_lines_ignored_total";

/// Pipeline: 완료 마커로 닫힌 그룹 수 (counter)
pub const PIPELINE_GROUPS_CLOSED_TOTAL: &str = "prodlog_pipeline_groups_closed_total";

/// Pipeline: 스트림 종료 시 강제로 내보낸 그룹 수 (counter)
pub const PIPELINE_GROUPS_FLUSHED_TOTAL: &str = "prodlog_pipeline_groups_flushed_total";

/// Pipeline: 추출된 로그 엔트리 수 (counter)
pub const PIPELINE_ENTRIES_TOTAL: &str = "prodlog_pipeline_entries_total";

/// Pipeline: 현재 열린 버킷 수 (gauge)
pub const PIPELINE_OPEN_BUCKETS: &str = "prodlog_pipeline_open_buckets";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        PIPELINE_LINES_TOTAL,
        "Total number of raw log lines fed to the bucketer"
    );
    describe_counter!(
        PIPELINE_LINES_IGNORED_TOTAL,
        "Lines dropped before bucketing (unmatched prefix or ignored program)"
    );
    describe_counter!(
        PIPELINE_GROUPS_CLOSED_TOTAL,
        "Line groups closed by a top-level Completed marker"
    );
    describe_counter!(
        PIPELINE_GROUPS_FLUSHED_TOTAL,
        "Partial line groups flushed at end of stream"
    );
    describe_counter!(
        PIPELINE_ENTRIES_TOTAL,
        "Log entries extracted from closed line groups"
    );
    describe_gauge!(
        PIPELINE_OPEN_BUCKETS,
        "Number of per-process buckets currently open"
    );
}
