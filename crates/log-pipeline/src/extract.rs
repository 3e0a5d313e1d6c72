//! 엔트리 추출 -- 닫힌 라인 그룹을 `LogEntry`로 변환
//!
//! 각 라인은 고정된 순서의 인식기 목록으로 분류되며, 처음 매칭된 인식기만 적용됩니다.
//!
//! | 순서 | 인식기 | 효과 |
//! |------|--------|------|
//! | 1 | 잡음 (`Parameters`, `Cookie set`, `Rendering`, `Redirected`, `*`) | 없음 |
//! | 2 | `Started <METHOD> "<path>" for <ip> at <time>` | page/ip/time (중첩 중이면 무시) |
//! | 3 | `Completed ... in <t> (Views: <t> \| ActiveRecord: <t>` | 세 타이밍, 최초 1회 (중첩 중이면 무시) |
//! | 4 | `<label> (<secs>)` + 공백 3개 | 쿼리 추가 (중첩과 무관) |
//! | 5 | `Start rendering component ` | 깊이 +1 |
//! | 6 | `End of component rendering` | 깊이 -1 |
//! | 7 | `Fragment hit: ` 및 그 외 | 없음 |

use std::sync::LazyLock;

use metrics::counter;
use prodlog_core::metrics::PIPELINE_ENTRIES_TOTAL;
use prodlog_core::types::{LogEntry, QueryTiming};
use regex::Regex;

use crate::bucket::{COMPONENT_END, COMPONENT_START};
use crate::normalize::normalize_page;

static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:Parameters|Cookie set|Rendering|Redirected|\*)").expect("invalid noise regex")
});

static STARTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^Started \w+ "(\S+)" for (.+) at (.*)"#).expect("invalid started regex")
});

static COMPLETED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Completed .+ in (\S+) \(Views: (\S+) \| ActiveRecord: (\S+)")
        .expect("invalid completed regex")
});

// 닫는 괄호 뒤 공백 3개가 쿼리 라인과 일반 괄호 텍스트를 구분한다
static QUERY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+?) \(([^)]+)\)   ").expect("invalid query regex"));

static LEADING_FLOAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][+-]?\d+)?").expect("invalid float regex")
});

/// 한 라인의 분류 결과
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind<'a> {
    /// 의미 없는 라인
    Noise,
    /// 요청 시작
    Started {
        path: &'a str,
        ip: &'a str,
        time: &'a str,
    },
    /// 타이밍이 포함된 요청 완료
    Completed {
        request: f64,
        render: f64,
        db: f64,
    },
    /// 쿼리 타이밍
    Query { label: &'a str, elapsed: f64 },
    /// 컴포넌트 렌더링 시작
    ComponentStart,
    /// 컴포넌트 렌더링 종료
    ComponentEnd,
    /// 인식되지 않는 라인 (향후 형식 호환을 위해 에러가 아님)
    Other,
}

type Recognizer = for<'a> fn(&'a str) -> Option<LineKind<'a>>;

/// 순서가 의미를 갖는 인식기 목록. 처음 `Some`을 돌려준 인식기가 이긴다.
const RECOGNIZERS: [Recognizer; 6] = [
    recognize_noise,
    recognize_started,
    recognize_completed,
    recognize_query,
    recognize_component_start,
    recognize_component_end,
];

fn recognize_noise(line: &str) -> Option<LineKind<'_>> {
    NOISE_RE.is_match(line).then_some(LineKind::Noise)
}

fn recognize_started(line: &str) -> Option<LineKind<'_>> {
    let caps = STARTED_RE.captures(line)?;
    Some(LineKind::Started {
        path: caps.get(1)?.as_str(),
        ip: caps.get(2)?.as_str(),
        time: caps.get(3)?.as_str(),
    })
}

fn recognize_completed(line: &str) -> Option<LineKind<'_>> {
    let caps = COMPLETED_RE.captures(line)?;
    Some(LineKind::Completed {
        request: parse_leading_f64(&caps[1]),
        render: parse_leading_f64(&caps[2]),
        db: parse_leading_f64(&caps[3]),
    })
}

fn recognize_query(line: &str) -> Option<LineKind<'_>> {
    let caps = QUERY_RE.captures(line)?;
    Some(LineKind::Query {
        label: caps.get(1)?.as_str(),
        elapsed: parse_leading_f64(&caps[2]),
    })
}

fn recognize_component_start(line: &str) -> Option<LineKind<'_>> {
    line.starts_with(COMPONENT_START)
        .then_some(LineKind::ComponentStart)
}

fn recognize_component_end(line: &str) -> Option<LineKind<'_>> {
    (line == COMPONENT_END).then_some(LineKind::ComponentEnd)
}

/// 라인 하나를 분류합니다.
pub fn classify(line: &str) -> LineKind<'_> {
    RECOGNIZERS
        .iter()
        .find_map(|recognize| recognize(line))
        .unwrap_or(LineKind::Other)
}

/// 문자열 앞부분의 숫자만 실수로 읽습니다.
///
/// `42ms` -> 42.0, `4.5ms)` -> 4.5, 숫자로 시작하지 않으면 0.0. 실패하지 않습니다.
pub fn parse_leading_f64(token: &str) -> f64 {
    LEADING_FLOAT_RE
        .find(token)
        .and_then(|m| m.as_str().trim_start().parse().ok())
        .unwrap_or(0.0)
}

/// 그룹 하나를 누적하는 상태
#[derive(Debug, Default)]
struct EntryBuilder {
    entry: LogEntry,
    depth: i64,
    saw_start: bool,
    timings_set: bool,
}

impl EntryBuilder {
    fn apply(&mut self, kind: LineKind<'_>) {
        match kind {
            LineKind::Started { path, ip, time } => {
                self.saw_start = true;
                if self.depth > 0 {
                    return;
                }
                self.entry.page = Some(normalize_page(path));
                self.entry.ip = Some(ip.to_owned());
                self.entry.time = Some(time.to_owned());
            }
            LineKind::Completed {
                request,
                render,
                db,
            } => {
                if self.depth > 0 || self.timings_set {
                    return;
                }
                self.timings_set = true;
                self.entry.request_time = request;
                self.entry.render_time = render;
                self.entry.db_time = db;
            }
            LineKind::Query { label, elapsed } => {
                self.entry.queries.push(QueryTiming::new(label, elapsed));
            }
            LineKind::ComponentStart => self.depth += 1,
            LineKind::ComponentEnd => self.depth -= 1,
            LineKind::Noise | LineKind::Other => {}
        }
    }

    fn build(self) -> Option<LogEntry> {
        self.saw_start.then_some(self.entry)
    }
}

/// 닫힌 라인 그룹(payload 목록)에서 로그 엔트리를 추출합니다.
///
/// 그룹에 요청 시작 라인이 하나도 없으면 요청이 아니므로 `None`을 반환합니다.
pub fn extract<S: AsRef<str>>(lines: &[S]) -> Option<LogEntry> {
    let mut builder = EntryBuilder::default();
    for line in lines {
        builder.apply(classify(line.as_ref()));
    }
    let entry = builder.build();
    if entry.is_some() {
        counter!(PIPELINE_ENTRIES_TOTAL).increment(1);
    }
    entry
}

/// 줄바꿈으로 이어진 텍스트 하나에서 로그 엔트리를 추출합니다.
pub fn extract_text(text: &str) -> Option<LogEntry> {
    let lines: Vec<&str> = text.lines().collect();
    extract(&lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTED: &str =
        r#"Started GET "/posts/5" for 1.2.3.4 at 2013-02-22 18:14:21 -0600"#;
    const COMPLETED: &str = "Completed 200 OK in 42ms (Views: 1.1ms | ActiveRecord: 4.5ms";

    #[test]
    fn classify_noise_lines() {
        for line in [
            "Parameters: {\"id\"=>\"5\"}",
            "Cookie set: _session_id=abc",
            "Rendering posts/show",
            "Redirected to http://example.com/",
            "** [Airbrake] Success",
        ] {
            assert_eq!(classify(line), LineKind::Noise, "{line}");
        }
    }

    #[test]
    fn classify_started_line() {
        assert_eq!(
            classify(STARTED),
            LineKind::Started {
                path: "/posts/5",
                ip: "1.2.3.4",
                time: "2013-02-22 18:14:21 -0600",
            }
        );
    }

    #[test]
    fn classify_completed_line() {
        assert_eq!(
            classify("Completed 404 Not Found in 9ms (Views: 2.0ms | ActiveRecord: 0.9ms | Solr: 0.0ms)"),
            LineKind::Completed {
                request: 9.0,
                render: 2.0,
                db: 0.9,
            }
        );
    }

    #[test]
    fn completed_without_timings_is_not_a_timing_line() {
        assert_eq!(classify("Completed 302 Found in 3ms"), LineKind::Other);
    }

    #[test]
    fn classify_query_line_requires_three_spaces() {
        assert_eq!(
            classify("Person Load (0.001884)   SELECT * FROM people WHERE id = 10519 LIMIT 1"),
            LineKind::Query {
                label: "Person Load",
                elapsed: 0.001884,
            }
        );
        assert_eq!(classify("Something (in parens) else"), LineKind::Other);
    }

    #[test]
    fn classify_component_markers_and_fragments() {
        assert_eq!(
            classify("Start rendering component ({:action=>\"sidebar\"})"),
            LineKind::ComponentStart
        );
        assert_eq!(classify("End of component rendering"), LineKind::ComponentEnd);
        assert_eq!(classify("Fragment hit: views/sidebar"), LineKind::Other);
        assert_eq!(classify(""), LineKind::Other);
    }

    #[test]
    fn noise_wins_over_later_recognizers() {
        // 쿼리 모양이어도 잡음 접두어가 먼저 매칭된다
        assert_eq!(classify("Rendering x (0.5)   y"), LineKind::Noise);
    }

    #[test]
    fn parse_leading_f64_is_best_effort() {
        assert_eq!(parse_leading_f64("42ms"), 42.0);
        assert_eq!(parse_leading_f64("4.5ms)"), 4.5);
        assert_eq!(parse_leading_f64("0.001884"), 0.001884);
        assert_eq!(parse_leading_f64(".5s"), 0.5);
        assert_eq!(parse_leading_f64("1e3"), 1000.0);
        assert_eq!(parse_leading_f64("-2"), -2.0);
        assert_eq!(parse_leading_f64("ms"), 0.0);
        assert_eq!(parse_leading_f64(""), 0.0);
    }

    #[test]
    fn scenario_simple_request() {
        let entry = extract(&[STARTED, COMPLETED]).expect("request entry");
        assert_eq!(entry.page.as_deref(), Some("/posts/num"));
        assert_eq!(entry.ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(entry.time.as_deref(), Some("2013-02-22 18:14:21 -0600"));
        assert_eq!(entry.request_time, 42.0);
        assert_eq!(entry.render_time, 1.1);
        assert_eq!(entry.db_time, 4.5);
        assert!(entry.queries.is_empty());
    }

    #[test]
    fn scenario_show_page_is_normalized() {
        let entry = extract(&[
            r#"Started GET "/show/77" for 1.2.3.4 at 2013-02-22 18:14:21 -0600"#,
            COMPLETED,
        ])
        .unwrap();
        assert_eq!(entry.page.as_deref(), Some("/show/num"));
    }

    #[test]
    fn scenario_nested_completion_is_ignored() {
        let entry = extract(&[
            STARTED,
            "Start rendering component X",
            "Completed 200 OK in 7ms (Views: 3.0ms | ActiveRecord: 2.0ms",
            "End of component rendering",
            COMPLETED,
        ])
        .unwrap();
        assert_eq!(entry.request_time, 42.0);
        assert_eq!(entry.render_time, 1.1);
        assert_eq!(entry.db_time, 4.5);
    }

    #[test]
    fn nested_started_is_not_authoritative() {
        let entry = extract(&[
            STARTED,
            "Start rendering component X",
            r#"Started GET "/sidebar" for 9.9.9.9 at later"#,
            "End of component rendering",
            COMPLETED,
        ])
        .unwrap();
        assert_eq!(entry.page.as_deref(), Some("/posts/num"));
        assert_eq!(entry.ip.as_deref(), Some("1.2.3.4"));
    }

    #[test]
    fn only_first_completion_sets_timings() {
        let entry = extract(&[
            STARTED,
            COMPLETED,
            "Completed 500 Internal Server Error in 99ms (Views: 9.0ms | ActiveRecord: 9.0ms",
        ])
        .unwrap();
        assert_eq!(entry.request_time, 42.0);
    }

    #[test]
    fn queries_keep_order_across_components() {
        let entry = extract(&[
            STARTED,
            "User Load (0.5)   SELECT",
            "Start rendering component X",
            "Post Load (0.25)   SELECT",
            "End of component rendering",
            "Tag Count (0.125)   SELECT",
            COMPLETED,
        ])
        .unwrap();
        assert_eq!(
            entry.queries,
            vec![
                QueryTiming::new("User Load", 0.5),
                QueryTiming::new("Post Load", 0.25),
                QueryTiming::new("Tag Count", 0.125),
            ]
        );
    }

    #[test]
    fn group_without_start_is_not_a_request() {
        assert!(extract(&["Start rendering component X", "End of component rendering"]).is_none());
        assert!(extract::<&str>(&[]).is_none());
    }

    #[test]
    fn missing_completion_leaves_zero_timings() {
        let entry = extract(&[STARTED]).unwrap();
        assert_eq!(entry.request_time, 0.0);
        assert_eq!(entry.render_time, 0.0);
        assert_eq!(entry.db_time, 0.0);
    }

    #[test]
    fn extract_text_splits_lines() {
        let text = format!("{STARTED}\n{COMPLETED}\n");
        assert_eq!(extract_text(&text), extract(&[STARTED, COMPLETED]));
    }
}
