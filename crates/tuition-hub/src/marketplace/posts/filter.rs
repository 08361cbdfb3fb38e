//! Browse filter and pagination over the tuition post store.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::domain::{PostStatus, SubjectLevel, TeachingMode, TuitionPost, TuitionPostView};
use super::lifecycle::effective_status;

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

/// Optional filter parameters accepted by the public listing endpoint.
///
/// Substring matches on subject and city are case-insensitive. `status`
/// defaults to `active`, with lazy expiry applied before the comparison.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostQuery {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub min_budget: Option<u32>,
    #[serde(default)]
    pub max_budget: Option<u32>,
    #[serde(default)]
    pub teaching_mode: Option<TeachingMode>,
    #[serde(default)]
    pub level: Option<SubjectLevel>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl PostQuery {
    pub fn matches(&self, post: &TuitionPost, now: DateTime<Utc>) -> bool {
        let wanted_status = self.status.unwrap_or(PostStatus::Active);
        if effective_status(post, now) != wanted_status {
            return false;
        }

        if let Some(subject) = &self.subject {
            let needle = subject.to_lowercase();
            if !post
                .subjects
                .iter()
                .any(|entry| entry.name.to_lowercase().contains(&needle))
            {
                return false;
            }
        }

        if let Some(city) = &self.location {
            let needle = city.to_lowercase();
            let matched = post
                .location
                .city
                .as_deref()
                .is_some_and(|value| value.to_lowercase().contains(&needle));
            if !matched {
                return false;
            }
        }

        if let Some(min) = self.min_budget {
            if post.budget.min < min {
                return false;
            }
        }
        if let Some(max) = self.max_budget {
            if post.budget.max > max {
                return false;
            }
        }

        if let Some(mode) = self.teaching_mode {
            if post.requirements.teaching_mode != mode {
                return false;
            }
        }

        if let Some(level) = self.level {
            if !post.subjects.iter().any(|entry| entry.level == level) {
                return false;
            }
        }

        true
    }

    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

/// One page of matching posts plus the overall counts.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PostPage {
    pub posts: Vec<TuitionPostView>,
    pub total: usize,
    pub total_pages: usize,
    pub current_page: usize,
}

/// Sort matching posts by priority (descending) then creation time
/// (descending) and slice out the requested page. Returns the page slice
/// plus the total match count.
pub fn paginate(mut matches: Vec<TuitionPost>, query: &PostQuery) -> (Vec<TuitionPost>, usize) {
    matches.sort_by(|a, b| {
        b.priority
            .rank()
            .cmp(&a.priority.rank())
            .then(b.created_at.cmp(&a.created_at))
    });

    let total = matches.len();
    let limit = query.limit();
    let start = (query.page() - 1).saturating_mul(limit);
    let page: Vec<TuitionPost> = matches.into_iter().skip(start).take(limit).collect();
    (page, total)
}

pub fn total_pages(total: usize, limit: usize) -> usize {
    total.div_ceil(limit)
}
