//! Commit-activity statistics across all repositories.
//!
//! Collection runs on the scanner's worker pool and issues each repository's
//! two timestamp queries (short window and one year) concurrently.
//! Aggregation then happens on the calling thread over plain vectors:
//!
//! - short window: repository ranking, day-of-week histogram, latest commit
//! - one year: hour-of-day histogram, week comparison, streaks
//!
//! [`aggregate`] takes `now` as a parameter so results are reproducible for
//! any clock and time zone.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Timelike};
use serde::Serialize;

use crate::git::{GitRunner, Repository, WorkingTreeCounts};

pub mod streak;

pub use streak::StreakResult;

/// Repositories listed in [`ActivityReport::top_repos`].
const TOP_REPOS: usize = 5;

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Label for [`ActivityReport::most_active_day`] when nothing was committed.
pub const NO_COMMITS: &str = "No commits";

/// Raw per-repository data gathered before aggregation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepoActivity {
    pub name: String,
    /// Commit timestamps within the short window
    pub recent: Vec<i64>,
    /// Commit timestamps within the last year
    pub year: Vec<i64>,
    pub status: WorkingTreeCounts,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TopRepo {
    pub name: String,
    pub commits: usize,
    /// Commits per day over the rolling week ending today
    pub spark: [u32; 7],
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DayBucket {
    pub day: &'static str,
    pub count: u32,
    pub percentage: u32,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct HourBucket {
    pub hour: u32,
    pub count: u32,
    pub percentage: u32,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ActivityReport {
    pub top_repos: Vec<TopRepo>,
    /// Monday first, always 7 buckets
    pub day_distribution: Vec<DayBucket>,
    /// Always 24 buckets, from the one-year window
    pub hour_distribution: Vec<HourBucket>,
    pub most_active_day: String,
    pub most_active_percentage: u32,
    pub latest_commit: Option<String>,
    pub latest_commit_repo: Option<String>,
    pub longest_streak: u32,
    pub current_streak: u32,
    pub streak_start: Option<NaiveDate>,
    pub streak_end: Option<NaiveDate>,
    /// Indexed by days since `today - 6`
    pub this_week: [u32; 7],
    /// Indexed by days since `today - 13`
    pub last_week: [u32; 7],
    pub week_labels: Vec<String>,
    pub dirty_repos: usize,
    pub total_staged: usize,
    pub total_modified: usize,
    pub total_untracked: usize,
    pub total_commits: usize,
    pub days_period: u32,
}

/// Gather timestamps and working-tree counts for one repository.
///
/// `None` when `path` isn't a repository.
pub fn collect_repo(runner: &dyn GitRunner, path: &Path, since: &str) -> Option<RepoActivity> {
    let repo = Repository::at(runner, path);
    if !repo.has_git_metadata() {
        return None;
    }
    let ((recent, year), status) = rayon::join(
        || {
            rayon::join(
                || repo.commit_timestamps_since(since),
                || repo.commit_timestamps_since("1 year ago"),
            )
        },
        || repo.working_tree_status(),
    );
    Some(RepoActivity {
        name: repo.name(),
        recent,
        year,
        status,
    })
}

/// Collect activity for every repository in `paths`, skipping non-repositories.
pub fn collect<Tz: TimeZone>(
    runner: &dyn GitRunner,
    paths: &[PathBuf],
    days: u32,
    now: &DateTime<Tz>,
    max_workers: usize,
) -> anyhow::Result<Vec<RepoActivity>>
where
    Tz::Offset: std::fmt::Display,
{
    let since = now
        .clone()
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or_else(|| now.clone())
        .format("%Y-%m-%d")
        .to_string();
    log::debug!("Collecting activity since {since} for {} repositories", paths.len());

    let results = crate::scan::fan_out(paths, max_workers, |path| collect_repo(runner, path, &since))?;
    Ok(results.into_iter().flatten().collect())
}

/// Collect and aggregate, using the local clock.
pub fn report(
    runner: &dyn GitRunner,
    paths: &[PathBuf],
    days: u32,
    max_workers: usize,
) -> anyhow::Result<ActivityReport> {
    let now = crate::utils::local_now();
    let activity = collect(runner, paths, days, &now, max_workers)?;
    Ok(aggregate(&activity, &now, days))
}

/// Derive the report from collected activity.
pub fn aggregate<Tz: TimeZone>(activity: &[RepoActivity], now: &DateTime<Tz>, days: u32) -> ActivityReport {
    let tz = now.timezone();
    let local = |ts: i64| tz.timestamp_opt(ts, 0).single();
    let today = now.date_naive();
    let week_start = today - Days::new(6);
    let prev_start = today - Days::new(13);
    let week_index = |date: NaiveDate, start: NaiveDate| -> Option<usize> {
        let offset = (date - start).num_days();
        (0..7).contains(&offset).then_some(offset as usize)
    };

    // Short window
    let mut ranked: Vec<&RepoActivity> = activity.iter().filter(|r| !r.recent.is_empty()).collect();
    ranked.sort_by(|a, b| b.recent.len().cmp(&a.recent.len()));
    let total_commits: usize = ranked.iter().map(|r| r.recent.len()).sum();

    let mut day_counts = [0u32; 7];
    let mut latest: Option<(i64, &str)> = None;
    for repo in activity {
        for &ts in &repo.recent {
            if let Some(dt) = local(ts) {
                day_counts[dt.weekday().num_days_from_monday() as usize] += 1;
            }
            if latest.is_none_or(|(best, _)| ts > best) {
                latest = Some((ts, repo.name.as_str()));
            }
        }
    }
    let day_total: u32 = day_counts.iter().sum();
    let day_distribution = DAY_NAMES
        .iter()
        .zip(day_counts)
        .map(|(&day, count)| DayBucket {
            day,
            count,
            percentage: percentage(count, day_total),
        })
        .collect();
    let (most_active_day, most_active_percentage) = match most_active(&day_counts) {
        Some(idx) => (
            DAY_NAMES[idx].to_string(),
            percentage(day_counts[idx], day_total),
        ),
        None => (NO_COMMITS.to_string(), 0),
    };

    let top_repos = ranked
        .iter()
        .take(TOP_REPOS)
        .map(|repo| {
            let mut spark = [0u32; 7];
            for date in repo.recent.iter().filter_map(|&ts| local(ts)).map(|dt| dt.date_naive()) {
                if let Some(idx) = week_index(date, week_start) {
                    spark[idx] += 1;
                }
            }
            TopRepo {
                name: repo.name.clone(),
                commits: repo.recent.len(),
                spark,
            }
        })
        .collect();

    // One-year window
    let mut hour_counts = [0u32; 24];
    let mut this_week = [0u32; 7];
    let mut last_week = [0u32; 7];
    let mut dates = BTreeSet::new();
    for dt in activity.iter().flat_map(|r| &r.year).filter_map(|&ts| local(ts)) {
        hour_counts[dt.hour() as usize] += 1;
        let date = dt.date_naive();
        if let Some(idx) = week_index(date, week_start) {
            this_week[idx] += 1;
        } else if let Some(idx) = week_index(date, prev_start) {
            last_week[idx] += 1;
        }
        dates.insert(date);
    }
    let hour_total: u32 = hour_counts.iter().sum();
    let hour_distribution = (0u32..)
        .zip(hour_counts)
        .map(|(hour, count)| HourBucket {
            hour,
            count,
            percentage: percentage(count, hour_total),
        })
        .collect();

    let streaks = streak::compute(&dates, today);
    let week_labels = (0..7)
        .map(|i| (week_start + Days::new(i)).format("%a").to_string())
        .collect();

    let dirty: Vec<&WorkingTreeCounts> = activity
        .iter()
        .map(|r| &r.status)
        .filter(|s| s.is_dirty)
        .collect();

    ActivityReport {
        top_repos,
        day_distribution,
        hour_distribution,
        most_active_day,
        most_active_percentage,
        latest_commit: latest.map(|(ts, _)| relative_since(now.timestamp() - ts)),
        latest_commit_repo: latest.map(|(_, name)| name.to_string()),
        longest_streak: streaks.longest_run,
        current_streak: streaks.current_run,
        streak_start: streaks.longest_run_start(),
        streak_end: streaks.longest_run_end,
        this_week,
        last_week,
        week_labels,
        dirty_repos: dirty.len(),
        total_staged: dirty.iter().map(|s| s.staged).sum(),
        total_modified: dirty.iter().map(|s| s.unstaged).sum(),
        total_untracked: dirty.iter().map(|s| s.untracked).sum(),
        total_commits,
        days_period: days,
    }
}

/// `count / total` as a whole percentage, rounded half away from zero.
pub fn percentage(count: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(count) * 100.0 / f64::from(total)).round() as u32
}

/// Index of the busiest bucket; the earliest wins ties. `None` if all are zero.
fn most_active(counts: &[u32; 7]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, &count) in counts.iter().enumerate() {
        if count > 0 && best.is_none_or(|b| count > counts[b]) {
            best = Some(idx);
        }
    }
    best
}

/// Compact age: `Ns ago`, `Nm ago`, `Nh ago`, or `Nd ago`.
pub fn relative_since(elapsed_secs: i64) -> String {
    let secs = elapsed_secs.max(0);
    if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 3_600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3_600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}
