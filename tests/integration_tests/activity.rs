use chrono::{Days, Local, TimeZone};

use repodeck::activity::{NO_COMMITS, aggregate, collect, report};
use repodeck::git::SystemGit;

use crate::common::TestBase;

/// Noon, local time, `days` days before today.
fn local_noon(days: u64) -> i64 {
    let date = Local::now().date_naive() - Days::new(days);
    let noon = date.and_hms_opt(12, 0, 0).unwrap();
    Local.from_local_datetime(&noon).earliest().unwrap().timestamp()
}

#[test]
fn test_commit_outside_short_window() {
    let base = TestBase::new();
    let repo = base.repo("app");
    repo.commit_at("Old work", local_noon(10));

    let now = Local::now();
    let activity = collect(&SystemGit, &[repo.path().to_path_buf()], 7, &now, 4).unwrap();
    let report = aggregate(&activity, &now, 7);

    assert_eq!(report.total_commits, 0);
    assert_eq!(report.day_distribution.iter().map(|b| b.count).sum::<u32>(), 0);
    assert_eq!(report.most_active_day, NO_COMMITS);
    assert!(report.top_repos.is_empty());

    assert_eq!(report.hour_distribution.iter().map(|b| b.count).sum::<u32>(), 1);
    assert_eq!(report.hour_distribution[12].count, 1);
    assert_eq!(report.longest_streak, 1);
    assert_eq!(report.current_streak, 0);
}

#[test]
fn test_streak_across_repositories() {
    let base = TestBase::new();
    let app = base.repo("app");
    app.commit_at("today", Local::now().timestamp() - 60);
    app.commit_at("yesterday", local_noon(1));
    let lib = base.repo("lib");
    lib.commit_at("two days ago", local_noon(2));
    lib.commit_at("five days ago", local_noon(5));
    base.plain_dir("docs");

    let now = Local::now();
    let paths = vec![
        app.path().to_path_buf(),
        lib.path().to_path_buf(),
        base.path().join("docs"),
    ];
    let activity = collect(&SystemGit, &paths, 7, &now, 4).unwrap();
    assert_eq!(activity.len(), 2);

    let report = aggregate(&activity, &now, 7);
    assert_eq!(report.current_streak, 3);
    assert_eq!(report.longest_streak, 3);
    assert_eq!(report.streak_end, Some(now.date_naive()));
    assert_eq!(report.total_commits, 4);
    assert_eq!(report.this_week.iter().sum::<u32>(), 4);
    assert_eq!(report.this_week[6], 1);
    assert_eq!(report.latest_commit_repo.as_deref(), Some("app"));

    let names: Vec<&str> = report.top_repos.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["app", "lib"]);
}

#[test]
fn test_report_counts_dirty_repositories() {
    let base = TestBase::new();
    let repo = base.repo("app");
    repo.commit_at("first", local_noon(3));
    std::fs::write(repo.path().join("scratch.txt"), "wip").unwrap();

    let report = report(&SystemGit, &[repo.path().to_path_buf()], 7, 2).unwrap();
    assert_eq!(report.dirty_repos, 1);
    assert_eq!(report.total_untracked, 1);
    assert_eq!(report.days_period, 7);
}
