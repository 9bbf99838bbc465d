//! Test-run records: insertion, filtered listing, and per-project summaries.
//!
//! The table is append-only: rows are never updated or deleted.

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::warn;

const RUN_COLUMNS: &str =
    "id, project, spec, browser, status, pipeline_id, job_id, job_url, created_at";

/// Status value counted as a passing run. Anything else is a failure.
pub const PASSING_STATUS: &str = "success";

/// A stored test run, as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRun {
    pub id: i64,
    pub project: String,
    pub spec: String,
    pub browser: String,
    pub status: String,
    pub pipeline_id: String,
    pub job_id: String,
    pub job_url: String,
    pub created_at: String,
}

impl TestRun {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project: row.get(1)?,
            spec: row.get(2)?,
            browser: row.get(3)?,
            status: row.get(4)?,
            pipeline_id: row.get(5)?,
            job_id: row.get(6)?,
            job_url: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

/// Caller-supplied fields of a test run. `id` and `created_at` are assigned
/// by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewTestRun {
    pub project: String,
    pub spec: String,
    pub browser: String,
    pub status: String,
    pub pipeline_id: String,
    pub job_id: String,
    pub job_url: String,
}

impl NewTestRun {
    pub fn new(project: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            status: status.into(),
            ..Self::default()
        }
    }

    /// Both `project` and `status` must be non-empty.
    pub fn is_valid(&self) -> bool {
        !self.project.is_empty() && !self.status.is_empty()
    }
}

/// Per-project aggregate view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub project: String,
    pub latest_status: String,
    pub total_runs: i64,
    pub passed_runs: i64,
    pub failed_runs: i64,
    pub last_run: String,
}

/// Predicates for [`query_runs`]. `None` means "don't filter on this".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFilter {
    pub project: Option<String>,
    pub status: Option<String>,
    pub browser: Option<String>,
    /// Case-sensitive substring of `spec`.
    pub spec: Option<String>,
    pub limit: u32,
}

impl RunFilter {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            project: None,
            status: None,
            browser: None,
            spec: None,
            limit,
        }
    }
}

/// Insert one run and return it as stored.
pub fn insert_run(conn: &Connection, run: &NewTestRun) -> Result<TestRun> {
    let stored = conn
        .query_row(
            &format!(
                "INSERT INTO test_results (project, spec, browser, status, pipeline_id, job_id, job_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING {RUN_COLUMNS}"
            ),
            params![
                run.project,
                run.spec,
                run.browser,
                run.status,
                run.pipeline_id,
                run.job_id,
                run.job_url
            ],
            TestRun::from_row,
        )
        .context("failed to insert test result")?;

    Ok(stored)
}

/// List runs matching `filter`, most recent first.
///
/// Rows that cannot be decoded are logged and left out of the result rather
/// than failing the whole listing.
pub fn query_runs(conn: &Connection, filter: &RunFilter) -> Result<Vec<TestRun>> {
    let mut sql = format!("SELECT {RUN_COLUMNS} FROM test_results WHERE 1 = 1");
    let mut args: Vec<Value> = Vec::new();

    if let Some(project) = &filter.project {
        sql.push_str(" AND project = ?");
        args.push(Value::Text(project.clone()));
    }
    if let Some(status) = &filter.status {
        sql.push_str(" AND status = ?");
        args.push(Value::Text(status.clone()));
    }
    if let Some(browser) = &filter.browser {
        sql.push_str(" AND browser = ?");
        args.push(Value::Text(browser.clone()));
    }
    if let Some(spec) = &filter.spec {
        sql.push_str(" AND instr(spec, ?) > 0");
        args.push(Value::Text(spec.clone()));
    }

    sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");
    args.push(Value::Integer(i64::from(filter.limit)));

    let mut stmt = conn.prepare(&sql).context("failed to prepare results query")?;
    let rows = stmt
        .query_map(params_from_iter(args), TestRun::from_row)
        .context("failed to query results")?;

    let runs: Vec<TestRun> = rows
        .filter_map(|row| match row {
            Ok(run) => Some(run),
            Err(e) => {
                warn!(error = %e, "skipping undecodable test result row");
                None
            }
        })
        .collect();

    Ok(runs)
}

/// Status of the most recently created run for `project`.
pub fn latest_status(conn: &Connection, project: &str) -> Result<Option<String>> {
    let status = conn
        .query_row(
            "SELECT status FROM test_results WHERE project = ?1
             ORDER BY created_at DESC, id DESC LIMIT 1",
            params![project],
            |row| row.get(0),
        )
        .optional()?;
    Ok(status)
}

/// One summary per project, most recently active first.
///
/// The grouped aggregate's `status` column comes from an arbitrary row of the
/// group, so `latest_status` is replaced by an explicit [`latest_status`]
/// lookup. If that lookup fails the grouped value is kept.
pub fn project_summaries(conn: &Connection) -> Result<Vec<ProjectSummary>> {
    let mut stmt = conn
        .prepare(
            "SELECT
                project,
                status,
                COUNT(*),
                SUM(CASE WHEN status = ?1 THEN 1 ELSE 0 END),
                SUM(CASE WHEN status != ?1 THEN 1 ELSE 0 END),
                MAX(created_at) AS last_run
             FROM test_results
             GROUP BY project
             ORDER BY last_run DESC, MAX(id) DESC",
        )
        .context("failed to prepare project summary query")?;

    let rows = stmt
        .query_map(params![PASSING_STATUS], |row| {
            Ok(ProjectSummary {
                project: row.get(0)?,
                latest_status: row.get(1)?,
                total_runs: row.get(2)?,
                passed_runs: row.get(3)?,
                failed_runs: row.get(4)?,
                last_run: row.get(5)?,
            })
        })
        .context("failed to query project summaries")?;

    let mut summaries: Vec<ProjectSummary> = rows
        .filter_map(|row| match row {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(error = %e, "skipping undecodable project summary row");
                None
            }
        })
        .collect();

    for summary in &mut summaries {
        match latest_status(conn, &summary.project) {
            Ok(Some(status)) => summary.latest_status = status,
            Ok(None) => {}
            Err(e) => {
                warn!(project = %summary.project, error = %e, "keeping grouped status");
            }
        }
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::migrate(&conn).unwrap();
        conn
    }

    fn run(project: &str, spec: &str, browser: &str, status: &str) -> NewTestRun {
        NewTestRun {
            spec: spec.to_string(),
            browser: browser.to_string(),
            ..NewTestRun::new(project, status)
        }
    }

    #[test]
    fn test_insert_assigns_id_and_timestamp() {
        let conn = setup();
        let first = insert_run(&conn, &run("web", "login.cy.ts", "chrome", "success")).unwrap();
        let second = insert_run(&conn, &run("web", "login.cy.ts", "chrome", "success")).unwrap();

        assert!(second.id > first.id);
        assert!(!first.created_at.is_empty());
        assert_eq!(first.spec, "login.cy.ts");
        assert_eq!(first.browser, "chrome");
    }

    #[test]
    fn test_validation() {
        assert!(NewTestRun::new("web", "success").is_valid());
        assert!(!NewTestRun::new("", "success").is_valid());
        assert!(!NewTestRun::new("web", "").is_valid());
    }

    #[test]
    fn test_summary_counts_and_latest_status() {
        let conn = setup();
        for status in ["success", "success", "fail"] {
            insert_run(&conn, &NewTestRun::new("P", status)).unwrap();
        }

        let summaries = project_summaries(&conn).unwrap();
        assert_eq!(summaries.len(), 1);
        let p = &summaries[0];
        assert_eq!(p.project, "P");
        assert_eq!(p.total_runs, 3);
        assert_eq!(p.passed_runs, 2);
        assert_eq!(p.failed_runs, 1);
        assert_eq!(p.latest_status, "fail");
    }

    #[test]
    fn test_summary_latest_status_uses_newest_row() {
        let conn = setup();
        insert_run(&conn, &NewTestRun::new("P", "fail")).unwrap();
        insert_run(&conn, &NewTestRun::new("P", "fail")).unwrap();
        insert_run(&conn, &NewTestRun::new("P", "success")).unwrap();

        let summaries = project_summaries(&conn).unwrap();
        assert_eq!(summaries[0].latest_status, "success");
        assert_eq!(summaries[0].failed_runs, 2);
    }

    #[test]
    fn test_summaries_ordered_by_last_run() {
        let conn = setup();
        insert_run(&conn, &NewTestRun::new("old", "success")).unwrap();
        insert_run(&conn, &NewTestRun::new("new", "success")).unwrap();
        conn.execute(
            "UPDATE test_results SET created_at = '2020-01-01T00:00:00.000Z' WHERE project = 'old'",
            [],
        )
        .unwrap();

        let names: Vec<String> = project_summaries(&conn)
            .unwrap()
            .into_iter()
            .map(|s| s.project)
            .collect();
        assert_eq!(names, vec!["new", "old"]);
    }

    #[test]
    fn test_filter_by_browser_and_spec() {
        let conn = setup();
        insert_run(&conn, &run("web", "auth/login.cy.ts", "chrome", "success")).unwrap();
        insert_run(&conn, &run("web", "cart.cy.ts", "chrome", "fail")).unwrap();
        insert_run(&conn, &run("web", "auth/login.cy.ts", "firefox", "success")).unwrap();
        insert_run(&conn, &run("api", "login.rs", "chrome", "success")).unwrap();

        let chrome = query_runs(
            &conn,
            &RunFilter {
                project: Some("web".into()),
                browser: Some("chrome".into()),
                ..RunFilter::with_limit(100)
            },
        )
        .unwrap();
        assert_eq!(chrome.len(), 2);
        assert!(chrome.iter().all(|r| r.browser == "chrome" && r.project == "web"));

        let login = query_runs(
            &conn,
            &RunFilter {
                project: Some("web".into()),
                spec: Some("login".into()),
                ..RunFilter::with_limit(100)
            },
        )
        .unwrap();
        assert_eq!(login.len(), 2);
        assert!(login.iter().all(|r| r.spec.contains("login")));
    }

    #[test]
    fn test_spec_filter_is_case_sensitive_and_literal() {
        let conn = setup();
        insert_run(&conn, &run("web", "Login.cy.ts", "", "success")).unwrap();
        insert_run(&conn, &run("web", "login_page.cy.ts", "", "success")).unwrap();

        let found = query_runs(
            &conn,
            &RunFilter {
                spec: Some("login".into()),
                ..RunFilter::with_limit(100)
            },
        )
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].spec, "login_page.cy.ts");

        let wildcard = query_runs(
            &conn,
            &RunFilter {
                spec: Some("%".into()),
                ..RunFilter::with_limit(100)
            },
        )
        .unwrap();
        assert!(wildcard.is_empty());
    }

    #[test]
    fn test_filter_by_status() {
        let conn = setup();
        insert_run(&conn, &NewTestRun::new("web", "success")).unwrap();
        insert_run(&conn, &NewTestRun::new("web", "failed")).unwrap();

        let failed = query_runs(
            &conn,
            &RunFilter {
                status: Some("failed".into()),
                ..RunFilter::with_limit(100)
            },
        )
        .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].status, "failed");
    }

    #[test]
    fn test_limit_and_descending_order() {
        let conn = setup();
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(insert_run(&conn, &NewTestRun::new("web", "success")).unwrap().id);
        }

        let found = query_runs(&conn, &RunFilter::with_limit(3)).unwrap();
        let found_ids: Vec<i64> = found.iter().map(|r| r.id).collect();
        assert_eq!(found_ids, vec![ids[4], ids[3], ids[2]]);
    }

    #[test]
    fn test_undecodable_rows_are_skipped() {
        let conn = setup();
        insert_run(&conn, &NewTestRun::new("web", "success")).unwrap();
        conn.execute(
            "INSERT INTO test_results (project, spec, browser, status, pipeline_id, job_id, job_url)
             VALUES ('web', X'00FF', '', 'success', '', '', '')",
            [],
        )
        .unwrap();
        insert_run(&conn, &NewTestRun::new("web", "fail")).unwrap();

        let found = query_runs(&conn, &RunFilter::with_limit(100)).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_latest_status_unknown_project() {
        let conn = setup();
        assert_eq!(latest_status(&conn, "missing").unwrap(), None);
    }
}
