//! 페이지별 집계
//!
//! 정규화된 페이지 이름으로 [`LogEntry`]를 묶어 요청 수와 시간 합계/평균을 계산합니다.

use std::collections::HashMap;

use prodlog_core::types::LogEntry;
use serde::Serialize;

/// 한 페이지의 집계 결과
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageStats {
    /// 정규화된 페이지 이름
    pub page: String,
    /// 요청 수
    pub count: u64,
    /// 요청 시간 합계
    pub total_request_time: f64,
    /// 렌더링 시간 합계
    pub total_render_time: f64,
    /// DB 시간 합계
    pub total_db_time: f64,
    /// 쿼리 수 합계
    pub total_queries: u64,
}

impl PageStats {
    fn new(page: &str) -> Self {
        Self {
            page: page.to_owned(),
            ..Self::default()
        }
    }

    fn record(&mut self, entry: &LogEntry) {
        self.count += 1;
        self.total_request_time += entry.request_time;
        self.total_render_time += entry.render_time;
        self.total_db_time += entry.db_time;
        self.total_queries += entry.queries.len() as u64;
    }

    /// 평균 요청 시간
    pub fn avg_request_time(&self) -> f64 {
        self.average(self.total_request_time)
    }

    /// 평균 렌더링 시간
    pub fn avg_render_time(&self) -> f64 {
        self.average(self.total_render_time)
    }

    /// 평균 DB 시간
    pub fn avg_db_time(&self) -> f64 {
        self.average(self.total_db_time)
    }

    fn average(&self, total: f64) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            total / self.count as f64
        }
    }
}

/// 페이지별 집계 리포트
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageReport {
    /// 집계에 포함된 엔트리 수
    pub entries: u64,
    /// 페이지가 없어 제외된 엔트리 수
    pub skipped: u64,
    pages: Vec<PageStats>,
}

impl PageReport {
    /// 엔트리 시퀀스를 집계합니다.
    ///
    /// 결과 페이지는 요청 시간 합계 내림차순, 같으면 이름 오름차순으로 정렬됩니다.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = LogEntry>,
    {
        let mut by_page: HashMap<String, PageStats> = HashMap::new();
        let mut counted = 0;
        let mut skipped = 0;

        for entry in entries {
            let Some(page) = entry.page.as_deref() else {
                skipped += 1;
                continue;
            };
            by_page
                .entry(page.to_owned())
                .or_insert_with(|| PageStats::new(page))
                .record(&entry);
            counted += 1;
        }

        let mut pages: Vec<PageStats> = by_page.into_values().collect();
        pages.sort_by(|a, b| {
            b.total_request_time
                .total_cmp(&a.total_request_time)
                .then_with(|| a.page.cmp(&b.page))
        });

        Self {
            entries: counted,
            skipped,
            pages,
        }
    }

    /// 정렬된 전체 페이지 목록
    pub fn pages(&self) -> &[PageStats] {
        &self.pages
    }

    /// 상위 `n`개 페이지
    pub fn top(&self, n: usize) -> &[PageStats] {
        &self.pages[..n.min(self.pages.len())]
    }

    /// 상위 `n`개 페이지만 남깁니다.
    pub fn truncate(&mut self, n: usize) {
        self.pages.truncate(n);
    }

    /// 집계된 페이지가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
