//! 반복 API -- 라인 스트림 위의 지연 시퀀스
//!
//! [`iterate`]는 임의의 `BufRead`를 받아 [`LogEntry`]를 하나씩 돌려주는 반복자를 만듭니다.
//! 한 번만 순회할 수 있고, 스트림 끝에서 종료합니다.
//!
//! # 순서
//! 1. 완료 마커로 닫힌 그룹: 닫힌 순서대로
//! 2. 스트림 종료 시 남은 그룹: 라우팅 키 오름차순
//!
//! 요청 시작 라인이 없는 그룹은 건너뜁니다.
//!
//! # 사용 예시
//! ```no_run
//! use prodlog_pipeline::iterate_path;
//!
//! for entry in iterate_path("/var/log/production.log")? {
//!     println!("{entry}");
//! }
//! # Ok::<(), prodlog_pipeline::LogPipelineError>(())
//! ```

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use prodlog_core::types::LogEntry;
use tracing::warn;

use crate::bucket::{Bucketer, ClosedGroup};
use crate::config::{PipelineConfig, Retention};
use crate::error::LogPipelineError;
use crate::extract::extract;

/// 닫힌 라인 그룹의 지연 반복자
pub struct ClosedGroups<R> {
    reader: R,
    /// 스트림이 끝나면 `None`
    bucketer: Option<Bucketer>,
    /// 스트림 종료 시 플러시된 그룹
    flushed: VecDeque<ClosedGroup>,
    /// 재사용하는 읽기 버퍼
    buf: Vec<u8>,
    line_no: u64,
}

impl<R: BufRead> ClosedGroups<R> {
    /// 설정으로 새 반복자를 생성합니다.
    pub fn new(reader: R, config: PipelineConfig) -> Self {
        Self {
            reader,
            bucketer: Some(Bucketer::new(config)),
            flushed: VecDeque::new(),
            buf: Vec::new(),
            line_no: 0,
        }
    }

    /// 다음 라인을 읽습니다. 스트림 끝이나 읽기 에러면 `None`입니다.
    fn read_line(&mut self) -> Option<String> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_no += 1;
                let text = String::from_utf8_lossy(&self.buf);
                Some(text.trim_end_matches(['\n', '\r']).to_owned())
            }
            Err(e) => {
                warn!(
                    line = self.line_no + 1,
                    error = %e,
                    "failed to read log line, treating as end of stream"
                );
                None
            }
        }
    }
}

impl<R: BufRead> Iterator for ClosedGroups<R> {
    type Item = ClosedGroup;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(group) = self.flushed.pop_front() {
                return Some(group);
            }

            self.bucketer.as_ref()?;

            match self.read_line() {
                Some(line) => {
                    let bucketer = self.bucketer.as_mut()?;
                    if let Some(group) = bucketer.process(&line) {
                        return Some(group);
                    }
                }
                None => {
                    let bucketer = self.bucketer.take()?;
                    self.flushed.extend(bucketer.finish());
                }
            }
        }
    }
}

/// 로그 엔트리의 지연 반복자
pub struct LogEntries<R> {
    groups: ClosedGroups<R>,
}

impl<R: BufRead> LogEntries<R> {
    /// 설정으로 새 반복자를 생성합니다.
    ///
    /// 추출기는 payload를 입력으로 받으므로 보관 방식은 항상 [`Retention::Payload`]입니다.
    pub fn new(reader: R, config: PipelineConfig) -> Self {
        Self {
            groups: ClosedGroups::new(reader, config.with_retention(Retention::Payload)),
        }
    }
}

impl<R: BufRead> Iterator for LogEntries<R> {
    type Item = LogEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.groups.by_ref().find_map(|group| extract(&group.lines))
    }
}

/// 기본 설정으로 스트림의 로그 엔트리를 순회합니다.
pub fn iterate<R: BufRead>(reader: R) -> LogEntries<R> {
    LogEntries::new(reader, PipelineConfig::default())
}

/// 파일을 열어 기본 설정으로 로그 엔트리를 순회합니다.
pub fn iterate_path(
    path: impl AsRef<Path>,
) -> Result<LogEntries<BufReader<File>>, LogPipelineError> {
    iterate_path_with(path, PipelineConfig::default())
}

/// 파일을 열어 주어진 설정으로 로그 엔트리를 순회합니다.
///
/// 설정은 파일을 열기 전에 검증합니다.
pub fn iterate_path_with(
    path: impl AsRef<Path>,
    config: PipelineConfig,
) -> Result<LogEntries<BufReader<File>>, LogPipelineError> {
    config.validate()?;
    let file = open_readable(path.as_ref())?;
    Ok(LogEntries::new(BufReader::new(file), config))
}

/// 일반 파일이고 읽을 수 있는지 확인한 뒤 엽니다.
pub(crate) fn open_readable(path: &Path) -> Result<File, LogPipelineError> {
    let unreadable = |reason: String| LogPipelineError::UnreadableInput {
        path: path.display().to_string(),
        reason,
    };

    let metadata = std::fs::metadata(path).map_err(|e| unreadable(e.to_string()))?;
    if !metadata.is_file() {
        return Err(unreadable("not a regular file".to_owned()));
    }

    File::open(path).map_err(|e| unreadable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn log(lines: &[&str]) -> Cursor<Vec<u8>> {
        Cursor::new(lines.join("\n").into_bytes())
    }

    #[test]
    fn yields_entries_in_completion_order() {
        let input = log(&[
            r#"Mar  7 00:00:20 online1 rails[1]: Started GET "/a" for 1.1.1.1 at t1"#,
            r#"Mar  7 00:00:20 online1 rails[2]: Started GET "/b" for 2.2.2.2 at t2"#,
            "Mar  7 00:00:21 online1 rails[2]: Completed 200 OK in 5ms (Views: 1ms | ActiveRecord: 2ms",
            "Mar  7 00:00:22 online1 rails[1]: Completed 200 OK in 9ms (Views: 3ms | ActiveRecord: 4ms",
        ]);

        let pages: Vec<String> = iterate(input).filter_map(|e| e.page).collect();
        assert_eq!(pages, vec!["/b", "/a"]);
    }

    #[test]
    fn flushes_incomplete_requests_at_end() {
        let input = log(&[
            r#"Mar  7 00:00:20 online2 rails[7]: Started GET "/late" for 1.1.1.1 at t"#,
            r#"Mar  7 00:00:20 online1 rails[7]: Started GET "/early" for 1.1.1.1 at t"#,
            "Mar  7 00:00:20 online1 rails[7]: Post Load (0.5)   SELECT",
        ]);

        let entries: Vec<LogEntry> = iterate(input).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].page.as_deref(), Some("/early"));
        assert_eq!(entries[0].queries.len(), 1);
        assert_eq!(entries[1].page.as_deref(), Some("/late"));
        assert_eq!(entries[1].request_time, 0.0);
    }

    #[test]
    fn skips_groups_without_start() {
        let input = log(&[
            "Mar  7 00:00:20 online1 rails[1]: Processing PostsController#index",
            "Mar  7 00:00:20 online1 rails[1]: Completed 200 OK in 5ms (Views: 1ms | ActiveRecord: 2ms",
        ]);
        assert_eq!(iterate(input).count(), 0);
    }

    #[test]
    fn closed_groups_report_completion() {
        let input = log(&[
            "Mar  7 00:00:20 online1 rails[1]: Started",
            "Mar  7 00:00:20 online1 rails[1]: Completed",
            "Mar  7 00:00:20 online1 rails[2]: Started",
        ]);
        let groups: Vec<ClosedGroup> =
            ClosedGroups::new(input, PipelineConfig::default()).collect();
        assert_eq!(groups.len(), 2);
        assert!(groups[0].completed);
        assert!(!groups[1].completed);
    }

    #[test]
    fn handles_crlf_and_invalid_utf8() {
        let mut bytes = b"Mar  7 00:00:20 online1 rails[1]: Started GET \"/x\" for 1.1.1.1 at t\r\n".to_vec();
        bytes.extend_from_slice(b"Mar  7 00:00:20 online1 rails[1]: \xFF\xFE junk\r\n");
        bytes.extend_from_slice(
            b"Mar  7 00:00:20 online1 rails[1]: Completed 200 OK in 1ms (Views: 1ms | ActiveRecord: 1ms\r\n",
        );

        let entries: Vec<LogEntry> = iterate(Cursor::new(bytes)).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].time.as_deref(), Some("t"));
        assert_eq!(entries[0].request_time, 1.0);
    }

    #[test]
    fn raw_line_retention_still_extracts() {
        let input = log(&[
            r#"Mar  7 00:00:20 online1 rails[1]: Started GET "/posts/5" for 1.1.1.1 at t"#,
            "Mar  7 00:00:21 online1 rails[1]: Completed 200 OK in 5ms (Views: 1ms | ActiveRecord: 2ms",
        ]);
        let config = PipelineConfig::for_grep(&prodlog_core::config::PipelineSection::default());

        let entries: Vec<LogEntry> = LogEntries::new(input, config).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].page.as_deref(), Some("/posts/num"));
        assert_eq!(entries[0].request_time, 5.0);
    }

    #[test]
    fn iterate_path_with_rejects_invalid_config() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = PipelineConfig::default().with_max_open_buckets(0);
        assert!(matches!(
            iterate_path_with(file.path(), config),
            Err(LogPipelineError::Config { .. })
        ));
    }

    #[test]
    fn empty_stream_yields_nothing() {
        let mut entries = iterate(Cursor::new(Vec::new()));
        assert!(entries.next().is_none());
        assert!(entries.next().is_none());
    }

    #[test]
    fn open_readable_rejects_directories_and_missing_files() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            open_readable(dir.path()),
            Err(LogPipelineError::UnreadableInput { .. })
        ));
        assert!(matches!(
            iterate_path(dir.path().join("missing.log")),
            Err(LogPipelineError::UnreadableInput { .. })
        ));
    }
}
