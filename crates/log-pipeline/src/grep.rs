//! grep 프론트엔드 -- 액션 이름으로 완료된 요청의 원본 라인을 출력
//!
//! 버킷터를 원본 라인 보관 모드(고정 폭 접두어)로 돌리고, 완료 마커로 닫힌 그룹 중
//! 두 번째 라인이 `: Processing by <액션>`을 포함하는 그룹만 그대로 출력합니다.
//! 스트림 종료 시 플러시되는 미완료 그룹은 출력하지 않습니다.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::LazyLock;

use prodlog_core::config::PipelineSection;
use regex::Regex;
use tracing::info;

use crate::bucket::ClosedGroup;
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::stream::{ClosedGroups, open_readable};

/// 구분선 폭
const RULE_WIDTH: usize = 80;

/// 모든 액션을 뜻하는 예약어
const ALL: &str = "all";

/// `/messages/just_now` 형태의 URL
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/?([^/]+)/(.*)").expect("invalid action url regex"));

/// `SomeController` 또는 `SomeController#action`
static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A([A-Z][A-Za-z0-9]*)(?:#([A-Za-z][A-Za-z0-9_]*))?\z")
        .expect("invalid action name regex")
});

/// 검증된 액션 필터
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionFilter {
    /// 모든 완료 요청
    All,
    /// 특정 컨트롤러(와 액션)
    Action {
        controller: String,
        action: Option<String>,
    },
}

impl ActionFilter {
    /// 사용자 입력을 액션 필터로 변환합니다.
    ///
    /// URL 형태(`messages/just_now`)는 `MessagesController#just_now`로 바꾼 뒤 검증합니다.
    pub fn parse(input: &str) -> Result<Self, LogPipelineError> {
        let name = match URL_RE.captures(input) {
            Some(caps) => {
                let converted = format!("{}Controller#{}", capitalize(&caps[1]), &caps[2]);
                info!(url = input, action = %converted, "converted url to action name");
                converted
            }
            None => input.to_owned(),
        };

        if name == ALL {
            return Ok(Self::All);
        }

        let caps = ACTION_RE
            .captures(&name)
            .ok_or_else(|| LogPipelineError::InvalidAction {
                action: name.clone(),
            })?;

        Ok(Self::Action {
            controller: caps[1].to_owned(),
            action: caps.get(2).map(|m| m.as_str().to_owned()),
        })
    }

    /// 그룹이 필터에 맞는지 확인합니다. 두 번째 라인만 검사합니다.
    pub fn matches(&self, group: &ClosedGroup) -> bool {
        match self {
            Self::All => true,
            Self::Action { .. } => {
                let needle = format!(": Processing by {self}");
                group
                    .lines
                    .get(1)
                    .is_some_and(|line| line.contains(&needle))
            }
        }
    }
}

impl fmt::Display for ActionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL),
            Self::Action {
                controller,
                action: Some(action),
            } => write!(f, "{controller}#{action}"),
            Self::Action {
                controller,
                action: None,
            } => f.write_str(controller),
        }
    }
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn write_rule<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))
}

/// 필터에 맞는 완료 그룹의 지연 반복자
pub struct GrepMatches<R> {
    filter: ActionFilter,
    groups: ClosedGroups<R>,
}

impl<R: BufRead> GrepMatches<R> {
    /// 스트림 위에 필터를 씌웁니다.
    pub fn new(filter: ActionFilter, reader: R, config: PipelineConfig) -> Self {
        Self {
            filter,
            groups: ClosedGroups::new(reader, config),
        }
    }

    /// 적용 중인 필터
    pub fn action_filter(&self) -> &ActionFilter {
        &self.filter
    }
}

impl<R: BufRead> Iterator for GrepMatches<R> {
    type Item = ClosedGroup;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = &self.filter;
        self.groups
            .by_ref()
            .find(|group| group.completed && filter.matches(group))
    }
}

/// 액션 이름을 검증하고 파일을 연 뒤 일치하는 완료 그룹을 순회합니다.
///
/// 액션 이름과 설정은 파일을 열기 전에 검증합니다.
pub fn grep_matches(
    action: &str,
    path: impl AsRef<Path>,
    config: PipelineConfig,
) -> Result<GrepMatches<BufReader<File>>, LogPipelineError> {
    let filter = ActionFilter::parse(action)?;
    config.validate()?;
    let file = open_readable(path.as_ref())?;
    Ok(GrepMatches::new(filter, BufReader::new(file), config))
}

/// 기본 설정으로 파일에서 액션의 완료 요청을 찾아 출력합니다.
///
/// 출력한 그룹 수를 반환합니다.
pub fn grep<W: Write>(
    action: &str,
    path: impl AsRef<Path>,
    out: &mut W,
) -> Result<usize, LogPipelineError> {
    let config = PipelineConfig::for_grep(&PipelineSection::default());
    grep_with(action, path, config, out)
}

/// 주어진 버킷터 설정으로 grep을 수행합니다.
pub fn grep_with<W: Write>(
    action: &str,
    path: impl AsRef<Path>,
    config: PipelineConfig,
    out: &mut W,
) -> Result<usize, LogPipelineError> {
    let matches = grep_matches(action, path, config)?;

    writeln!(out, "Grepping for {}", matches.action_filter())?;
    write_rule(out)?;
    writeln!(out)?;

    let mut printed = 0;
    for group in matches {
        writeln!(out)?;
        write_rule(out)?;
        writeln!(out)?;
        for raw in &group.lines {
            writeln!(out, "{raw}")?;
        }
        printed += 1;
    }

    out.flush()?;
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodlog_core::types::RoutingKey;

    fn group(lines: &[&str]) -> ClosedGroup {
        ClosedGroup {
            key: RoutingKey::new("online1", "rails", "1"),
            lines: lines.iter().map(|l| (*l).to_owned()).collect(),
            completed: true,
        }
    }

    #[test]
    fn url_form_is_converted() {
        let filter = ActionFilter::parse("messages/just_now").unwrap();
        assert_eq!(
            filter,
            ActionFilter::Action {
                controller: "MessagesController".to_owned(),
                action: Some("just_now".to_owned()),
            }
        );
        assert_eq!(filter.to_string(), "MessagesController#just_now");
        assert_eq!(
            ActionFilter::parse("/posts/show").unwrap().to_string(),
            "PostsController#show"
        );
    }

    #[test]
    fn controller_only_and_all_are_accepted() {
        assert_eq!(ActionFilter::parse("all").unwrap(), ActionFilter::All);
        assert_eq!(
            ActionFilter::parse("PostsController").unwrap().to_string(),
            "PostsController"
        );
    }

    #[test]
    fn invalid_names_are_rejected() {
        for bad in [
            "not valid!!",
            "postsController",
            "Posts#1x",
            "Posts#",
            "PostsController#café",
            "",
        ] {
            let err = ActionFilter::parse(bad).unwrap_err();
            assert!(err.is_argument_error(), "{bad} should be rejected");
        }
        // URL 변환 결과에 `/`가 남으면 검증에 실패
        assert!(ActionFilter::parse("a/b/c").is_err());
    }

    #[test]
    fn matches_only_second_line() {
        let filter = ActionFilter::parse("PostsController#show").unwrap();
        let hit = group(&[
            "Mar  7 00:00:20 online1 rails[1]: Started GET \"/posts/5\"",
            "Mar  7 00:00:20 online1 rails[1]: Processing by PostsController#show as HTML",
            "Mar  7 00:00:20 online1 rails[1]: Completed 200 OK",
        ]);
        assert!(filter.matches(&hit));

        let third_line = group(&[
            "a",
            "b",
            "Mar  7 00:00:20 online1 rails[1]: Processing by PostsController#show as HTML",
        ]);
        assert!(!filter.matches(&third_line));
        assert!(!filter.matches(&group(&["only one line"])));
        assert!(ActionFilter::All.matches(&group(&[])));
    }

    #[test]
    fn controller_filter_is_a_prefix_match() {
        let filter = ActionFilter::parse("PostsController").unwrap();
        assert!(filter.matches(&group(&["x", "h rails[1]: Processing by PostsController#index"])));
        assert!(!filter.matches(&group(&["x", "h rails[1]: Processing by UsersController#index"])));
    }

    #[test]
    fn grep_matches_skips_flushed_groups() {
        let log = "\
Mar  7 00:00:20 online1 rails[1]: Started GET \"/a\" for 1.1.1.1 at t
Mar  7 00:00:20 online1 rails[2]: Started GET \"/b\" for 1.1.1.1 at t
Mar  7 00:00:21 online1 rails[1]: Completed 200 OK in 1ms
";
        let config = PipelineConfig::for_grep(&PipelineSection::default());
        let groups: Vec<ClosedGroup> =
            GrepMatches::new(ActionFilter::All, log.as_bytes(), config).collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key.pid, "1");
    }

    #[test]
    fn grep_matches_exposes_parsed_filter() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = PipelineConfig::for_grep(&PipelineSection::default());
        let matches = grep_matches("posts/show", file.path(), config).unwrap();
        assert_eq!(matches.action_filter().to_string(), "PostsController#show");
        assert_eq!(matches.count(), 0);
    }

    #[test]
    fn invalid_action_fails_before_io() {
        let mut out = Vec::new();
        let err = grep("not valid!!", "/definitely/missing.log", &mut out).unwrap_err();
        assert!(matches!(err, LogPipelineError::InvalidAction { .. }));
        assert!(out.is_empty(), "nothing should be written");
    }

    #[test]
    fn invalid_config_fails_before_io() {
        let mut config = PipelineConfig::for_grep(&PipelineSection::default());
        config.ignored_programs.push("two words".to_owned());
        let mut out = Vec::new();
        let err = grep_with("all", "/definitely/missing.log", config, &mut out).unwrap_err();
        assert!(matches!(err, LogPipelineError::Config { ref field, .. } if field == "ignored_programs"));
        assert!(out.is_empty());
    }

    #[test]
    fn missing_file_is_rejected() {
        let mut out = Vec::new();
        let err = grep("messages/just_now", "/definitely/missing.log", &mut out).unwrap_err();
        assert!(matches!(err, LogPipelineError::UnreadableInput { .. }));
    }

    #[test]
    fn prints_matching_completed_groups() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let log = [
            "Mar  7 00:00:20 online1 rails[1]: Started GET \"/messages/just_now\" for 1.1.1.1 at t",
            "Mar  7 00:00:20 online1 newsyslog[9]: logfile turned over",
            "Mar  7 00:00:20 online1 rails[2]: Started GET \"/posts\" for 1.1.1.1 at t",
            "Mar  7 00:00:20 online1 rails[1]: Processing by MessagesController#just_now as HTML",
            "Mar  7 00:00:20 online1 rails[2]: Processing by PostsController#index as HTML",
            "Mar  7 00:00:21 online1 rails[1]: Completed 200 OK in 5ms (Views: 1ms | ActiveRecord: 2ms)",
            "Mar  7 00:00:21 online1 rails[2]: Completed 200 OK in 5ms (Views: 1ms | ActiveRecord: 2ms)",
            "Mar  7 00:00:22 online1 rails[3]: Started GET \"/messages/just_now\" for 1.1.1.1 at t",
            "Mar  7 00:00:22 online1 rails[3]: Processing by MessagesController#just_now as HTML",
        ];
        writeln!(file, "{}", log.join("\n")).unwrap();

        let mut out = Vec::new();
        let printed = grep("messages/just_now", file.path(), &mut out).unwrap();
        assert_eq!(printed, 1);

        let text = String::from_utf8(out).unwrap();
        let rule = "-".repeat(80);
        let expected = format!(
            "Grepping for MessagesController#just_now\n{rule}\n\n\n{rule}\n\n{}\n{}\n{}\n",
            log[0], log[3], log[5]
        );
        assert_eq!(text, expected);
    }
}
