//! 요청 경로 정규화
//!
//! 같은 액션에 대한 요청이 같은 페이지로 집계되도록 id, 쿼리 문자열,
//! 잘못 인코딩된 URL 꼬리를 접습니다. 각 규칙은 이전 규칙의 결과에 순서대로 적용됩니다.
//!
//! 규칙 2~4는 첫 번째 발생 위치에서 자르므로, 정규화된 페이지를 다시 정규화해도
//! 결과가 바뀌지 않습니다 (`/users/12/posts/34` -> `/users/num`).

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// 정규화 규칙 하나: 패턴과 치환 문자열
struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("invalid page normalization regex"),
            replacement,
        }
    }

    fn apply(&self, page: String) -> String {
        let rewritten = match self.pattern.replace(&page, self.replacement) {
            Cow::Owned(rewritten) => Some(rewritten),
            Cow::Borrowed(_) => None,
        };
        rewritten.unwrap_or(page)
    }
}

static RULES: LazyLock<[Rule; 6]> = LazyLock::new(|| {
    [
        // show 액션의 id
        Rule::new(r"/show/.*$", "/show/num"),
        // 숫자로 시작하는 경로 세그먼트 이후 전부
        Rule::new(r"^(.+?)/\d.*$", "${1}/num"),
        // 퍼센트 인코딩이 섞인 긴 URL
        Rule::new(r"^(.*?)%.*$", "${1}/percent"),
        // 쿼리 문자열
        Rule::new(r"^(.*?)\?.*$", "${1}?args"),
        // 사용자 이름이 들어가는 편집 페이지
        Rule::new(r"/user/edit/.*$", "/user/edit/num"),
        // `/home/level...`을 `/ignored`로 접으려던 규칙. `^` 앞에 `/`가 있어 어떤 경로와도
        // 매칭되지 않으며, 기존 집계 결과를 바꾸지 않도록 그대로 둔다.
        Rule::new(r"/^(/home/level).*$", "/ignored"),
    ]
});

/// 요청 경로를 집계용 페이지 이름으로 정규화합니다.
///
/// ```
/// use prodlog_pipeline::normalize_page;
///
/// assert_eq!(normalize_page("/show/42"), "/show/num");
/// assert_eq!(normalize_page("/posts/5/comments"), "/posts/num");
/// assert_eq!(normalize_page("/search?q=rust"), "/search?args");
/// ```
pub fn normalize_page(url: &str) -> String {
    RULES
        .iter()
        .fold(url.to_owned(), |page, rule| rule.apply(page))
}
