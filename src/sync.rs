//! Sync orchestration
//!
//! [`SyncRunner`] drives a full extraction run: for each stream it announces
//! the schema, then either performs a single full-table fetch or walks daily
//! time windows from the stream's bookmark (or the configured default start)
//! up to a target captured once at the start of the stream. Records are
//! forwarded to the sink as they arrive; after every fully-processed window
//! the bookmark is advanced and flushed durably, so an interrupted run
//! resumes from the last completed window.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures_util::TryStreamExt;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::client::pagination::page_records;
use crate::client::{prepare_datetime, ApiError, ShipStationClient, API_TIMEZONE};
use crate::config::{parse_api_datetime, Config, ConfigError};
use crate::output::{OutputError, RecordSink};
use crate::shutdown::SharedShutdown;
use crate::state::{StateError, SyncState};
use crate::streams::{StreamDef, StreamError};
use crate::windows::{DayWindows, Window};

/// Clock used to capture the sync target; injectable for tests
type NowFn = Box<dyn Fn() -> DateTime<Tz> + Send + Sync>;

/// Sync run errors
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// API request failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Configuration problem discovered during the run
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// State persistence failed
    #[error(transparent)]
    State(#[from] StateError),

    /// Record emission failed
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Stream definition problem
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Orchestrates a sync run over a set of streams
pub struct SyncRunner<S: RecordSink> {
    client: ShipStationClient,
    config: Config,
    state: SyncState,
    sink: S,
    state_path: Option<PathBuf>,
    now_fn: NowFn,
    shutdown: Option<SharedShutdown>,
}

impl<S: RecordSink> SyncRunner<S> {
    /// Create a runner over a client, configuration, prior state, and sink
    pub fn new(client: ShipStationClient, config: Config, state: SyncState, sink: S) -> Self {
        Self {
            client,
            config,
            state,
            sink,
            state_path: None,
            now_fn: Box::new(|| Utc::now().with_timezone(&API_TIMEZONE)),
            shutdown: None,
        }
    }

    /// Persist state to `path` after every completed window
    pub fn with_state_path(mut self, path: PathBuf) -> Self {
        self.state_path = Some(path);
        self
    }

    /// Override the clock used to capture each stream's sync target
    pub fn with_now_fn(mut self, now_fn: impl Fn() -> DateTime<Tz> + Send + Sync + 'static) -> Self {
        self.now_fn = Box::new(now_fn);
        self
    }

    /// Check this handle at window boundaries and stop early when set
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// The current in-memory state
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Consume the runner, returning the sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run a sync over `streams`, in order
    pub async fn sync<'a, I>(&mut self, streams: I) -> Result<(), SyncError>
    where
        I: IntoIterator<Item = &'a StreamDef>,
    {
        for stream in streams {
            info!(stream = stream.stream_id(), "starting stream sync");
            self.sink.write_schema(
                stream.stream_id(),
                stream.schema()?,
                stream.key_properties(),
            )?;

            if stream.incremental() {
                self.sync_incremental(stream).await?;
            } else {
                self.sync_full_table(stream).await?;
            }
            info!(stream = stream.stream_id(), "stream sync complete");
        }
        Ok(())
    }

    /// Fetch a non-incremental stream with one request per parameter set
    ///
    /// These endpoints are not paginated; the body is the records array
    /// itself rather than a paged envelope.
    async fn sync_full_table(&mut self, stream: &StreamDef) -> Result<(), SyncError> {
        for params in stream.parameters(None) {
            let body = self
                .client
                .fetch_endpoint(stream.endpoint(), &params)
                .await?;
            let records = body.as_array().ok_or_else(|| {
                ApiError::UnexpectedShape(format!(
                    "response for {} is not a records array",
                    stream.endpoint()
                ))
            })?;
            for record in records {
                self.sink.write_record(stream.stream_id(), record)?;
            }
        }
        Ok(())
    }

    /// Walk daily windows from the bookmark (or default start) to now
    async fn sync_incremental(&mut self, stream: &StreamDef) -> Result<(), SyncError> {
        let start = match self.state.bookmark(stream.stream_id()) {
            Some(bookmark) => parse_api_datetime(bookmark)?,
            None => self.config.default_start()?,
        };
        // Captured once per stream so a long run has a fixed upper bound.
        let target = (self.now_fn)();
        info!(
            stream = stream.stream_id(),
            start = %prepare_datetime(&start),
            target = %prepare_datetime(&target),
            "windowed sync range"
        );

        for window in DayWindows::new(start, target) {
            if let Some(shutdown) = &self.shutdown {
                if shutdown.is_shutdown_requested() {
                    info!(
                        stream = stream.stream_id(),
                        "shutdown requested, stopping at window boundary"
                    );
                    return Ok(());
                }
            }

            debug!(
                stream = stream.stream_id(),
                start = %prepare_datetime(&window.start),
                end = %prepare_datetime(&window.end),
                "processing window"
            );
            for params in stream.parameters(Some(&window)) {
                self.drain_pages(stream, &params).await?;
            }
            self.commit_window(stream, &window)?;
        }
        Ok(())
    }

    /// Drive one paginated query to exhaustion, forwarding records in order
    async fn drain_pages(
        &mut self,
        stream: &StreamDef,
        params: &[(String, String)],
    ) -> Result<(), SyncError> {
        let mut pages = self.client.paginate(stream.endpoint(), params);
        while let Some(body) = pages.try_next().await? {
            for record in page_records(&body, stream.endpoint())? {
                self.sink.write_record(stream.stream_id(), record)?;
            }
        }
        Ok(())
    }

    /// Advance the bookmark past a fully-processed window and flush it
    fn commit_window(&mut self, stream: &StreamDef, window: &Window) -> Result<(), SyncError> {
        self.state
            .set_bookmark(stream.stream_id(), prepare_datetime(&window.end));
        if let Some(path) = &self.state_path {
            self.state.save(path)?;
        }
        self.sink.write_state(&self.state)?;
        Ok(())
    }
}
