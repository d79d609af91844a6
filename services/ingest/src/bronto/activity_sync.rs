//! Incremental sync of the recent-activity feeds.
//!
//! The feed only retains 30 days of activity and pages through a query with a
//! server-side cursor. The loop walks forward from the last bookmark in
//! one-hour windows, drains each window page by page, and persists the
//! bookmark once a window is fully drained. Restarts re-read from the last
//! completed window boundary minus a safety margin, so records may be
//! delivered more than once but a window is never skipped.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use bronto_db::sync::models::SyncState;
use bronto_db::sync::repositories::StateRepository;

use super::client::ActivityFeed;
use super::models::{ActivityQuery, FaultKind, ReadDirection};
use crate::clock::Clock;
use crate::connector::{Connector, SyncError, SyncResult};
use crate::schema::{build_selector, format_timestamp, FieldSelector, ProjectedRecord, RecordSchema};
use crate::sink::RecordSink;
use crate::streams::StreamKind;

/// Fixed limits of the activity feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// How far back the remote keeps activity.
    pub lookback_limit: Duration,
    /// Overlap subtracted from a bookmark to pick up late-arriving records.
    pub safety_margin: Duration,
    pub window: Duration,
    pub page_size: u32,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            lookback_limit: Duration::days(30),
            safety_margin: Duration::days(3),
            window: Duration::hours(1),
            page_size: 5000,
        }
    }
}

/// Parse a bookmark or configured start date. Offset-less values are UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Where the next run of `table` should begin.
///
/// Without a bookmark the configured default is used. Anything older than the
/// retention floor is clamped to exactly `now - lookback_limit`; otherwise the
/// safety margin is subtracted.
pub fn compute_start_time(
    state: &SyncState,
    table: &str,
    bookmark_key: &str,
    default_start: &str,
    now: DateTime<Utc>,
    policy: &SyncPolicy,
) -> Result<DateTime<Utc>, SyncError> {
    let earliest_available = now - policy.lookback_limit;

    let requested = state.get_bookmark(table, bookmark_key).unwrap_or(default_start);
    let start = parse_timestamp(requested)
        .ok_or_else(|| SyncError::InvalidStartDate(requested.to_owned()))?;

    if earliest_available > start {
        tracing::warn!(
            stream = table,
            requested = %format_timestamp(&start),
            clamped_to = %format_timestamp(&earliest_available),
            "start date older than retention, clamping"
        );
        return Ok(earliest_available);
    }

    Ok(start - policy.safety_margin)
}

pub struct ActivitySyncer<F, R, K, C> {
    stream: StreamKind,
    schema: RecordSchema,
    default_start_date: String,
    policy: SyncPolicy,
    feed: F,
    state_repo: R,
    sink: K,
    clock: C,
}

impl<F, R, K, C> ActivitySyncer<F, R, K, C>
where
    F: ActivityFeed,
    R: StateRepository,
    K: RecordSink,
    C: Clock,
{
    pub fn new(
        stream: StreamKind,
        schema: RecordSchema,
        default_start_date: String,
        feed: F,
        state_repo: R,
        sink: K,
        clock: C,
    ) -> Self {
        Self {
            stream,
            schema,
            default_start_date,
            policy: SyncPolicy::default(),
            feed,
            state_repo,
            sink,
            clock,
        }
    }

    #[cfg(test)]
    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn run(&self) -> Result<SyncResult, SyncError> {
        let stream = self.stream.name();
        let bookmark_key = self.stream.bookmark_key();

        self.sink
            .write_schema(stream, &self.schema, self.stream.key_properties())?;

        let mut state = self.state_repo.load().await?;
        let selector = build_selector(&self.schema);

        let mut end = compute_start_time(
            &state,
            stream,
            bookmark_key,
            &self.default_start_date,
            self.clock.now(),
            &self.policy,
        )?;

        tracing::info!(
            stream,
            start = %format_timestamp(&end),
            fields = selector.field_count(),
            "syncing activities"
        );

        let mut records = 0;
        let mut windows = 0;

        while end < self.clock.now() {
            // fresh session per window
            self.feed.login().await?;

            let start = end;
            end = start + self.policy.window;

            tracing::info!(
                stream,
                start = %format_timestamp(&start),
                end = %format_timestamp(&end),
                "window start"
            );

            let fetched = self.drain_window(start, end, &selector).await?;

            state = state.incorporate(stream, bookmark_key, format_timestamp(&start));
            self.state_repo.persist(&state).await?;
            self.sink.write_state(&state)?;

            records += fetched;
            windows += 1;

            tracing::info!(
                stream,
                start = %format_timestamp(&start),
                end = %format_timestamp(&end),
                records = fetched,
                "window done"
            );
        }

        Ok(SyncResult {
            source: stream.to_string(),
            records,
            windows,
        })
    }

    /// Read every page of `[start, end)` and emit it. Returns the record count.
    async fn drain_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        selector: &FieldSelector,
    ) -> Result<usize, SyncError> {
        let stream = self.stream.name();
        let kind = self.stream.activity_kind();
        let mut query = ActivityQuery::new(start, end, self.policy.page_size);
        let mut emitted = 0;

        loop {
            let page = match self.feed.read_activities(kind, &query).await {
                Ok(page) => page,
                Err(e) if e.kind() == FaultKind::Exhausted => {
                    tracing::debug!(stream, direction = %query.read_direction, "result set exhausted");
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            tracing::info!(
                stream,
                count = page.len(),
                direction = %query.read_direction,
                "page fetched"
            );

            if page.is_empty() {
                break;
            }

            let projected: Vec<ProjectedRecord> =
                page.iter().map(|raw| selector.project(raw)).collect();
            self.sink.write_records(stream, &projected)?;
            emitted += projected.len();

            query.read_direction = ReadDirection::Next;
        }

        Ok(emitted)
    }
}

#[async_trait]
impl<F, R, K, C> Connector for ActivitySyncer<F, R, K, C>
where
    F: ActivityFeed,
    R: StateRepository,
    K: RecordSink,
    C: Clock,
{
    fn source_name(&self) -> &str {
        self.stream.name()
    }

    async fn sync(&self) -> Result<SyncResult, SyncError> {
        match self.run().await {
            Ok(result) => {
                tracing::info!(?result, "activity sync completed");
                Ok(result)
            }
            Err(e) => {
                tracing::error!(stream = self.stream.name(), error = %e, "sync aborted");
                Err(e)
            }
        }
    }
}
