//! Aggregation view
//!
//! Pure reductions over already-fetched issues, users and payments. Money is
//! summed as `Decimal` and converted to `f64` (2 dp, half away from zero) at
//! the edge. Month buckets and "today" are UTC.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Issue, IssueStatus, Payment, Priority, Role, User};
use crate::util::{millis_to_utc, utc_date};

const DECIMAL_PLACES: u32 = 2;

#[inline]
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

#[inline]
fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub closed: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn get(&self, status: IssueStatus) -> usize {
        match status {
            IssueStatus::Pending => self.pending,
            IssueStatus::InProgress => self.in_progress,
            IssueStatus::Resolved => self.resolved,
            IssueStatus::Closed => self.closed,
            IssueStatus::Rejected => self.rejected,
        }
    }

    fn add(&mut self, status: IssueStatus) {
        self.total += 1;
        match status {
            IssueStatus::Pending => self.pending += 1,
            IssueStatus::InProgress => self.in_progress += 1,
            IssueStatus::Resolved => self.resolved += 1,
            IssueStatus::Closed => self.closed += 1,
            IssueStatus::Rejected => self.rejected += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PriorityCounts {
    pub normal: usize,
    pub high: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    /// e.g. "Dec 2025"
    pub label: String,
    pub year: i32,
    pub month: u32,
    pub revenue: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CitizenStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub closed: usize,
    pub rejected: usize,
    pub total_payments: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StaffStats {
    pub total_assigned: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub closed: usize,
    pub today_tasks: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_issues: usize,
    pub pending_issues: usize,
    pub in_progress_issues: usize,
    pub resolved_issues: usize,
    pub closed_issues: usize,
    pub rejected_issues: usize,
    pub high_priority_issues: usize,
    pub total_users: usize,
    pub total_revenue: f64,
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicStats {
    pub total_users: usize,
    pub total_issues: usize,
    pub resolved_issues: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

pub fn status_distribution(issues: &[Issue]) -> StatusCounts {
    issues.iter().fold(StatusCounts::default(), |mut acc, issue| {
        acc.add(issue.status);
        acc
    })
}

pub fn priority_distribution(issues: &[Issue]) -> PriorityCounts {
    issues
        .iter()
        .fold(PriorityCounts::default(), |mut acc, issue| {
            match issue.priority {
                Priority::High => acc.high += 1,
                _ => acc.normal += 1,
            }
            acc
        })
}

pub fn total_revenue(payments: &[Payment]) -> f64 {
    to_f64(payments.iter().map(|p| to_decimal(p.amount)).sum())
}

/// Revenue per calendar month, oldest first
pub fn monthly_revenue(payments: &[Payment]) -> Vec<MonthlyRevenue> {
    let mut buckets: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();
    for payment in payments {
        let at = millis_to_utc(payment.paid_at);
        *buckets.entry((at.year(), at.month())).or_default() += to_decimal(payment.amount);
    }

    buckets
        .into_iter()
        .map(|((year, month), revenue)| MonthlyRevenue {
            label: month_label(year, month),
            year,
            month,
            revenue: to_f64(revenue),
        })
        .collect()
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_else(|| format!("{month}/{year}"))
}

pub fn citizen_stats(email: &str, issues: &[Issue], payments: &[Payment]) -> CitizenStats {
    let own: Vec<Issue> = issues
        .iter()
        .filter(|i| i.is_reported_by(email))
        .cloned()
        .collect();
    let counts = status_distribution(&own);
    let paid: Vec<Payment> = payments
        .iter()
        .filter(|p| p.email.eq_ignore_ascii_case(email))
        .cloned()
        .collect();

    CitizenStats {
        total: counts.total,
        pending: counts.pending,
        in_progress: counts.in_progress,
        resolved: counts.resolved,
        closed: counts.closed,
        rejected: counts.rejected,
        total_payments: total_revenue(&paid),
    }
}

/// `today_tasks` counts assigned issues with any timeline activity on `today`
pub fn staff_stats(email: &str, issues: &[Issue], today: NaiveDate) -> StaffStats {
    let mut stats = StaffStats::default();
    for issue in issues.iter().filter(|i| i.is_assigned_to(email)) {
        stats.total_assigned += 1;
        match issue.status {
            IssueStatus::InProgress => stats.in_progress += 1,
            IssueStatus::Resolved => stats.resolved += 1,
            IssueStatus::Closed => stats.closed += 1,
            _ => {}
        }
        if issue.timeline.iter().any(|t| utc_date(t.timestamp) == today) {
            stats.today_tasks += 1;
        }
    }
    stats
}

pub fn admin_stats(issues: &[Issue], users: &[User], payments: &[Payment]) -> AdminStats {
    let counts = status_distribution(issues);
    AdminStats {
        total_issues: counts.total,
        pending_issues: counts.pending,
        in_progress_issues: counts.in_progress,
        resolved_issues: counts.resolved,
        closed_issues: counts.closed,
        rejected_issues: counts.rejected,
        high_priority_issues: priority_distribution(issues).high,
        total_users: users.iter().filter(|u| u.role == Role::Citizen).count(),
        total_revenue: total_revenue(payments),
        monthly_revenue: monthly_revenue(payments),
    }
}

/// `total_users` counts citizens only
pub fn public_stats(issues: &[Issue], users: &[User]) -> PublicStats {
    PublicStats {
        total_users: users.iter().filter(|u| u.role == Role::Citizen).count(),
        total_issues: issues.len(),
        resolved_issues: status_distribution(issues).resolved,
    }
}

/// Case-insensitive search over payer email or transaction id, sorted by date
/// (then id)
pub fn filter_payments(payments: &[Payment], search: &str, order: SortOrder) -> Vec<Payment> {
    let needle = search.trim().to_lowercase();
    let mut matched: Vec<Payment> = payments
        .iter()
        .filter(|p| {
            needle.is_empty()
                || p.email.to_lowercase().contains(&needle)
                || p.transaction_id.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();

    match order {
        SortOrder::Asc => matched.sort_by_key(|p| (p.paid_at, p.id)),
        SortOrder::Desc => matched.sort_by_key(|p| std::cmp::Reverse((p.paid_at, p.id))),
    }
    matched
}
