//! Page-view tracking and dashboard payloads

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Dashboard window query
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<u32>,
}

impl AnalyticsQuery {
    pub fn days(&self) -> u32 {
        self.days.unwrap_or(30).clamp(1, 365)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PathCount {
    pub path: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoleCount {
    pub role: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

impl From<(String, i64)> for LabelCount {
    fn from((label, count): (String, i64)) -> Self {
        Self { label, count }
    }
}

/// Everything the admin dashboard charts
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub days: u32,
    pub views_per_day: Vec<DailyCount>,
    pub top_pages: Vec<PathCount>,
    pub views_by_role: Vec<RoleCount>,
    pub total_views: i64,
    pub unique_visitors: i64,
    pub properties_by_type: Vec<LabelCount>,
    pub properties_by_status: Vec<LabelCount>,
    pub properties_by_city: Vec<LabelCount>,
    pub total_properties: i64,
    pub total_users: i64,
    pub total_testimonials: i64,
    pub average_rating: Option<f64>,
}

/// A recorded navigation
#[derive(Debug, Clone)]
pub struct NewPageView {
    pub path: String,
    pub user_id: Option<uuid::Uuid>,
    pub user_role: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Strip query string and fragment from a beacon path.
pub fn normalize_path(raw: &str) -> String {
    let path = raw.trim();
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].to_string()
}

/// Admin and API paths are never counted.
pub fn is_trackable(path: &str) -> bool {
    let excluded = |prefix: &str| {
        path == prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    };
    path.starts_with('/') && !excluded("/admin") && !excluded("/api")
}

/// First day of a window of `days` days ending on `today`
pub fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today - Duration::days(i64::from(days.max(1)) - 1)
}

/// One entry per day from `start` for `days` days; days without rows count zero.
pub fn zero_fill(rows: &[(NaiveDate, i64)], start: NaiveDate, days: u32) -> Vec<DailyCount> {
    let counts: HashMap<NaiveDate, i64> = rows.iter().copied().collect();
    (0..i64::from(days))
        .map(|offset| {
            let date = start + Duration::days(offset);
            DailyCount {
                date,
                count: counts.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Views without a signed-in role are reported as `guest`.
pub fn label_roles(rows: Vec<(Option<String>, i64)>) -> Vec<RoleCount> {
    let mut merged: Vec<RoleCount> = Vec::new();
    for (role, count) in rows {
        let role = role
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "guest".to_string());
        match merged.iter_mut().find(|entry| entry.role == role) {
            Some(entry) => entry.count += count,
            None => merged.push(RoleCount { role, count }),
        }
    }
    merged.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.role.cmp(&b.role)));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn days_default_and_clamp() {
        assert_eq!(AnalyticsQuery::default().days(), 30);
        assert_eq!(AnalyticsQuery { days: Some(0) }.days(), 1);
        assert_eq!(AnalyticsQuery { days: Some(9999) }.days(), 365);
    }

    #[test]
    fn zero_fill_covers_whole_window() {
        let start = window_start(date("2024-03-10"), 4);
        assert_eq!(start, date("2024-03-07"));

        let filled = zero_fill(
            &[(date("2024-03-08"), 5), (date("2024-03-10"), 2)],
            start,
            4,
        );
        let counts: Vec<i64> = filled.iter().map(|d| d.count).collect();
        assert_eq!(counts, vec![0, 5, 0, 2]);
        assert_eq!(filled[0].date, date("2024-03-07"));
        assert_eq!(filled[3].date, date("2024-03-10"));
    }

    #[test]
    fn zero_fill_crosses_month_boundaries() {
        let filled = zero_fill(&[], window_start(date("2024-03-01"), 2), 2);
        assert_eq!(filled[0].date, date("2024-02-29"));
        assert_eq!(filled[1].date, date("2024-03-01"));
    }

    #[test]
    fn missing_roles_become_guest() {
        let labeled = label_roles(vec![
            (Some("admin".to_string()), 2),
            (None, 7),
            (Some("user".to_string()), 3),
            (Some(String::new()), 1),
        ]);
        assert_eq!(
            labeled,
            vec![
                RoleCount { role: "guest".to_string(), count: 8 },
                RoleCount { role: "user".to_string(), count: 3 },
                RoleCount { role: "admin".to_string(), count: 2 },
            ]
        );
    }

    #[test]
    fn admin_and_api_paths_are_not_tracked() {
        assert!(is_trackable("/"));
        assert!(is_trackable("/properties/123"));
        assert!(is_trackable("/administration-fees"));
        assert!(!is_trackable("/admin"));
        assert!(!is_trackable("/admin/properties"));
        assert!(!is_trackable("/api/track"));
        assert!(!is_trackable("relative"));
    }

    #[test]
    fn path_normalization_drops_query_and_fragment() {
        assert_eq!(normalize_path(" /properties?city=Lekki#map "), "/properties");
        assert_eq!(normalize_path("/about"), "/about");
    }
}
