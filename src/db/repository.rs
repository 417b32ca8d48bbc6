use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{StoredSummary, SummaryResult, SummaryStats, SummaryStatus};

use super::schema::SCHEMA;

const SUMMARY_COLUMNS: &str = "id, post_id, summary_text, api_provider, model, tokens_used, \
     input_tokens, output_tokens, generation_time, status, language, version, created_at, updated_at";

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Insert or replace the summary for `post_id`. Re-saving bumps `version`
    /// and re-activates a disabled summary. Returns the row id.
    pub async fn save_summary(&self, post_id: i64, result: &SummaryResult) -> Result<i64> {
        let result = result.clone();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO summaries (post_id, summary_text, api_provider, model, tokens_used,
                                              input_tokens, output_tokens, generation_time, status, language)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'active', ?9)
                       ON CONFLICT(post_id) DO UPDATE SET
                           summary_text = excluded.summary_text,
                           api_provider = excluded.api_provider,
                           model = excluded.model,
                           tokens_used = excluded.tokens_used,
                           input_tokens = excluded.input_tokens,
                           output_tokens = excluded.output_tokens,
                           generation_time = excluded.generation_time,
                           status = 'active',
                           language = excluded.language,
                           version = summaries.version + 1,
                           updated_at = datetime('now')"#,
                    params![
                        post_id,
                        result.summary,
                        result.provider.as_str(),
                        result.model,
                        result.tokens_used,
                        result.input_tokens,
                        result.output_tokens,
                        result.generation_time,
                        result.language,
                    ],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM summaries WHERE post_id = ?1",
                    params![post_id],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    pub async fn get_summary(&self, post_id: i64) -> Result<Option<StoredSummary>> {
        let summary = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM summaries WHERE post_id = ?1",
                    SUMMARY_COLUMNS
                ))?;
                let summary = stmt
                    .query_row(params![post_id], summary_from_row)
                    .optional()?;
                Ok(summary)
            })
            .await?;
        Ok(summary)
    }

    /// Returns whether a row was removed.
    pub async fn delete_summary(&self, post_id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .call(move |conn| {
                let n = conn.execute("DELETE FROM summaries WHERE post_id = ?1", params![post_id])?;
                Ok(n > 0)
            })
            .await?;
        Ok(deleted)
    }

    /// Returns whether a row was updated.
    pub async fn set_status(&self, post_id: i64, status: SummaryStatus) -> Result<bool> {
        let updated = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE summaries SET status = ?1, updated_at = datetime('now') WHERE post_id = ?2",
                    params![status.as_str(), post_id],
                )?;
                Ok(n > 0)
            })
            .await?;
        Ok(updated)
    }

    pub async fn list_summaries(&self) -> Result<Vec<StoredSummary>> {
        let summaries = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM summaries ORDER BY updated_at DESC, post_id",
                    SUMMARY_COLUMNS
                ))?;
                let summaries = stmt
                    .query_map([], summary_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await?;
        Ok(summaries)
    }

    pub async fn stats(&self) -> Result<SummaryStats> {
        let stats = self
            .conn
            .call(|conn| {
                let (total, active, tokens_used, average_generation_time) = conn.query_row(
                    r#"SELECT COUNT(*),
                              COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0),
                              COALESCE(SUM(tokens_used), 0),
                              COALESCE(AVG(generation_time), 0.0)
                       FROM summaries"#,
                    [],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, f64>(3)?,
                        ))
                    },
                )?;

                let mut stmt = conn.prepare(
                    "SELECT api_provider, COUNT(*) FROM summaries GROUP BY api_provider ORDER BY api_provider",
                )?;
                let by_provider = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                Ok(SummaryStats {
                    total,
                    active,
                    tokens_used,
                    average_generation_time,
                    by_provider,
                })
            })
            .await?;
        Ok(stats)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn summary_from_row(row: &Row) -> rusqlite::Result<StoredSummary> {
    let timestamp = |idx: usize| -> rusqlite::Result<DateTime<Utc>> {
        Ok(row
            .get::<_, String>(idx)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now))
    };

    Ok(StoredSummary {
        id: row.get(0)?,
        post_id: row.get(1)?,
        summary_text: row.get(2)?,
        api_provider: row.get(3)?,
        model: row.get(4)?,
        tokens_used: row.get(5)?,
        input_tokens: row.get(6)?,
        output_tokens: row.get(7)?,
        generation_time: row.get(8)?,
        status: row
            .get::<_, String>(9)?
            .parse()
            .unwrap_or_default(),
        language: row.get(10)?,
        version: row.get(11)?,
        created_at: timestamp(12)?,
        updated_at: timestamp(13)?,
    })
}
