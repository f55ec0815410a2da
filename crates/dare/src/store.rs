//! Local index of the robots, executions and periodicals created from this machine
//!
//! Rows are keyed by the code extracted from the resource URL the server handed
//! back. Every operation opens its own connection to the store file and closes
//! it before returning; there are no transactions spanning several statements.

use chrono::{Local, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::code::extract_code;
use crate::error::Result;

/// Characters of a robot definition kept as its summary
pub const SUMMARY_LENGTH: usize = 100;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS robots
        (code TEXT, url TEXT, creation_date_s INTEGER, summary TEXT);

    CREATE TABLE IF NOT EXISTS executions
        (code TEXT, robot_code TEXT, url TEXT, inputs TEXT, creation_date_s INTEGER);

    CREATE TABLE IF NOT EXISTS periodicals
        (code TEXT, robot_code TEXT, url TEXT, period TEXT, inputs TEXT, creation_date_s INTEGER);
"#;

/// A robot known locally, with the executions and periodicals created from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobotRecord {
    pub code: String,
    pub url: String,
    /// Seconds since the epoch
    pub creation_time: i64,
    pub summary: String,
    pub executions: Vec<ExecutionRecord>,
    pub periodicals: Vec<PeriodicalRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    pub code: String,
    pub robot_code: String,
    pub url: String,
    pub inputs: String,
    pub creation_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodicalRecord {
    pub code: String,
    pub robot_code: String,
    pub url: String,
    pub period: String,
    pub inputs: String,
    pub creation_time: i64,
}

/// Render seconds since the epoch in local time, e.g. `Mon, 14 Mar 2011 10:20:00`
pub fn format_local_date(seconds: i64) -> String {
    match Local.timestamp_opt(seconds, 0).single() {
        Some(date) => date.format("%a, %d %b %Y %H:%M:%S").to_string(),
        None => seconds.to_string(),
    }
}

/// Textual form of an input list as stored alongside executions
pub fn format_inputs(inputs: &[String]) -> String {
    format!("{:?}", inputs)
}

fn summarize(definition: &str) -> String {
    definition.chars().take(SUMMARY_LENGTH).collect()
}

fn now_seconds() -> i64 {
    Utc::now().timestamp()
}

fn execution_from_row(row: &Row) -> rusqlite::Result<ExecutionRecord> {
    Ok(ExecutionRecord {
        code: row.get(0)?,
        robot_code: row.get(1)?,
        url: row.get(2)?,
        inputs: row.get(3)?,
        creation_time: row.get(4)?,
    })
}

fn periodical_from_row(row: &Row) -> rusqlite::Result<PeriodicalRecord> {
    Ok(PeriodicalRecord {
        code: row.get(0)?,
        robot_code: row.get(1)?,
        url: row.get(2)?,
        period: row.get(3)?,
        inputs: row.get(4)?,
        creation_time: row.get(5)?,
    })
}

/// SQLite-backed store of resource codes and URLs
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Open the store at `path`, creating the file and schema if needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let store = Self {
            path: path.to_path_buf(),
        };
        store.with_connection(|conn| conn.execute_batch(SCHEMA))?;
        tracing::debug!(path = %path.display(), "store schema ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `action` on a fresh connection that is closed on every exit path
    fn with_connection<T, F>(&self, action: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = Connection::open(&self.path)?;
        let result = action(&conn);
        drop(conn);
        Ok(result?)
    }

    /// All robots, newest first, each with its executions and periodicals
    pub fn list_robots(&self) -> Result<Vec<RobotRecord>> {
        let mut robots = self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT code, url, creation_date_s, summary FROM robots
                 ORDER BY creation_date_s DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(RobotRecord {
                        code: row.get(0)?,
                        url: row.get(1)?,
                        creation_time: row.get(2)?,
                        summary: row.get(3)?,
                        executions: Vec::new(),
                        periodicals: Vec::new(),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        for robot in &mut robots {
            robot.executions = self.executions_for(&robot.code)?;
            robot.periodicals = self.periodicals_for(&robot.code)?;
        }

        Ok(robots)
    }

    /// Executions created from a robot, newest first
    pub fn executions_for(&self, robot_code: &str) -> Result<Vec<ExecutionRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT code, robot_code, url, inputs, creation_date_s FROM executions
                 WHERE robot_code = ? ORDER BY creation_date_s DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map(params![robot_code], execution_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Periodicals created from a robot, newest first
    pub fn periodicals_for(&self, robot_code: &str) -> Result<Vec<PeriodicalRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT code, robot_code, url, period, inputs, creation_date_s FROM periodicals
                 WHERE robot_code = ? ORDER BY creation_date_s DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map(params![robot_code], periodical_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Record a robot created at `url`, returning its code
    pub fn add_robot(&self, url: &str, definition: &str) -> Result<String> {
        self.insert_robot(url, definition, now_seconds())
    }

    fn insert_robot(&self, url: &str, definition: &str, creation_time: i64) -> Result<String> {
        let code = extract_code(url)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO robots VALUES (?, ?, ?, ?)",
                params![code, url, creation_time, summarize(definition)],
            )
        })?;
        Ok(code)
    }

    /// Record an execution of `robot_code` created at `execution_url`
    pub fn add_execution(
        &self,
        robot_code: &str,
        execution_url: &str,
        inputs: &[String],
    ) -> Result<String> {
        self.insert_execution(robot_code, execution_url, inputs, now_seconds())
    }

    fn insert_execution(
        &self,
        robot_code: &str,
        execution_url: &str,
        inputs: &[String],
        creation_time: i64,
    ) -> Result<String> {
        let code = extract_code(execution_url)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO executions VALUES (?, ?, ?, ?, ?)",
                params![code, robot_code, execution_url, format_inputs(inputs), creation_time],
            )
        })?;
        Ok(code)
    }

    /// Record a periodical of `robot_code` created at `periodical_url`
    pub fn add_periodical(
        &self,
        robot_code: &str,
        periodical_url: &str,
        period: &str,
        inputs: &[String],
    ) -> Result<String> {
        self.insert_periodical(robot_code, periodical_url, period, inputs, now_seconds())
    }

    fn insert_periodical(
        &self,
        robot_code: &str,
        periodical_url: &str,
        period: &str,
        inputs: &[String],
        creation_time: i64,
    ) -> Result<String> {
        let code = extract_code(periodical_url)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO periodicals VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    code,
                    robot_code,
                    periodical_url,
                    period,
                    format_inputs(inputs),
                    creation_time
                ],
            )
        })?;
        Ok(code)
    }

    fn find_url(&self, query: &str, code: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row(query, params![code], |row| row.get(0))
                .optional()
        })
    }

    pub fn find_robot_url(&self, code: &str) -> Result<Option<String>> {
        self.find_url("SELECT url FROM robots WHERE code = ?", code)
    }

    pub fn find_execution_url(&self, code: &str) -> Result<Option<String>> {
        self.find_url("SELECT url FROM executions WHERE code = ?", code)
    }

    pub fn find_periodical_url(&self, code: &str) -> Result<Option<String>> {
        self.find_url("SELECT url FROM periodicals WHERE code = ?", code)
    }

    /// Delete a robot along with its executions and periodicals.
    ///
    /// Children go first; each delete commits on its own.
    pub fn delete_robot(&self, code: &str) -> Result<()> {
        let executions = self.with_connection(|conn| {
            conn.execute("DELETE FROM executions WHERE robot_code = ?", params![code])
        })?;
        let periodicals = self.with_connection(|conn| {
            conn.execute("DELETE FROM periodicals WHERE robot_code = ?", params![code])
        })?;
        let robots = self.with_connection(|conn| {
            conn.execute("DELETE FROM robots WHERE code = ?", params![code])
        })?;
        tracing::debug!(code, robots, executions, periodicals, "deleted robot");
        Ok(())
    }

    /// Delete a single execution, returning the number of rows removed
    pub fn delete_execution(&self, code: &str) -> Result<usize> {
        let deleted = self.with_connection(|conn| {
            conn.execute("DELETE FROM executions WHERE code = ?", params![code])
        })?;
        tracing::debug!(code, deleted, "deleted execution");
        Ok(deleted)
    }

    /// Delete a single periodical, returning the number of rows removed
    pub fn delete_periodical(&self, code: &str) -> Result<usize> {
        let deleted = self.with_connection(|conn| {
            conn.execute("DELETE FROM periodicals WHERE code = ?", params![code])
        })?;
        tracing::debug!(code, deleted, "deleted periodical");
        Ok(deleted)
    }
}
