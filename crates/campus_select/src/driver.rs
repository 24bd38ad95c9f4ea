//! Tokio driver for debounced remote search
//!
//! Runs a [`DebouncedScheduler`] on real timers. The host sends query changes
//! through a [`SearchHandle`] and reads [`SearchEvent`]s from a channel. Fetches
//! run as separate tasks and report back to the driver loop, which applies only
//! the result for the latest token.
//!
//! Dropping the handle (or calling [`SearchHandle::shutdown`]) disposes the
//! scheduler. Results still in flight at that point are discarded.
//!
//! [`spawn_dependent_refresh`] is the dependent-field counterpart: it loads
//! candidates and exclusions for one parent on a task and hands back the
//! tagged response for [`DependentFilter::on_response`].
//!
//! [`DependentFilter::on_response`]: crate::dependent::DependentFilter::on_response

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::choice::Choice;
use crate::debounce::{DebouncedScheduler, QueryChange, ResultOutcome, ResultSet};
use crate::dependent::{fetch_dependent, CandidateSource, DependentRequest, DependentResponse};
use crate::error::{FetchError, Result, SelectError};
use crate::generation::GenerationToken;

/// Remote collaborator answering one query
pub trait RemoteSource<Q, R>: Send + Sync + 'static {
    fn fetch(&self, query: Q) -> BoxFuture<'static, std::result::Result<R, FetchError>>;
}

/// Message from the host to the driver loop
#[derive(Debug)]
enum SearchCommand<Q> {
    Query(Q),
    Cancel,
    Shutdown,
}

/// What the driver reports back to the host
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchEvent<Q, R> {
    /// A debounced fetch started
    Fetching { token: GenerationToken, query: Q },
    /// The latest fetch finished
    Applied {
        token: GenerationToken,
        result: std::result::Result<R, FetchError>,
    },
    /// The query fell below the gate; clear visible results
    Cleared,
}

/// Host side of a running search driver
#[derive(Debug)]
pub struct SearchHandle<Q> {
    commands: mpsc::UnboundedSender<SearchCommand<Q>>,
    task: JoinHandle<()>,
}

impl<Q> SearchHandle<Q> {
    /// The query text changed
    pub fn query(&self, query: Q) -> Result<()> {
        self.send(SearchCommand::Query(query))
    }

    /// Drop the pending deadline and any in-flight result
    pub fn cancel(&self) -> Result<()> {
        self.send(SearchCommand::Cancel)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the driver and wait for its loop to exit
    pub async fn shutdown(self) -> Result<()> {
        // The loop may already be gone; joining still reports how it ended
        let _ = self.commands.send(SearchCommand::Shutdown);
        self.task.await.map_err(|_| SelectError::DriverStopped)
    }

    fn send(&self, command: SearchCommand<Q>) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| SelectError::DriverStopped)
    }
}

/// Spawn a driver loop for `scheduler` on the current tokio runtime
///
/// Returns the handle and the receiving end of the event channel.
pub fn spawn_debounced_search<Q, R, S>(
    source: Arc<S>,
    scheduler: DebouncedScheduler<Q>,
) -> (SearchHandle<Q>, mpsc::UnboundedReceiver<SearchEvent<Q, R>>)
where
    Q: Clone + Send + 'static,
    R: ResultSet + Send + 'static,
    S: RemoteSource<Q, R>,
{
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(source, scheduler, commands_rx, events_tx));
    (
        SearchHandle {
            commands: commands_tx,
            task,
        },
        events_rx,
    )
}

async fn run<Q, R, S>(
    source: Arc<S>,
    mut scheduler: DebouncedScheduler<Q>,
    mut commands: mpsc::UnboundedReceiver<SearchCommand<Q>>,
    events: mpsc::UnboundedSender<SearchEvent<Q, R>>,
) where
    Q: Clone + Send + 'static,
    R: ResultSet + Send + 'static,
    S: RemoteSource<Q, R>,
{
    let origin = Instant::now();
    let now_ms = || origin.elapsed().as_millis() as u64;
    let (done_tx, mut done_rx) =
        mpsc::unbounded_channel::<(GenerationToken, std::result::Result<R, FetchError>)>();

    loop {
        let deadline = scheduler.next_deadline();
        let wake_at = origin + Duration::from_millis(deadline.unwrap_or(0));

        tokio::select! {
            command = commands.recv() => match command {
                Some(SearchCommand::Query(query)) => {
                    if scheduler.on_query_change(query, now_ms()) == QueryChange::Cleared
                        && events.send(SearchEvent::Cleared).is_err()
                    {
                        break;
                    }
                }
                Some(SearchCommand::Cancel) => scheduler.cancel(),
                Some(SearchCommand::Shutdown) | None => break,
            },

            _ = sleep_until(wake_at), if deadline.is_some() => {
                let Some(request) = scheduler.poll(now_ms()) else {
                    continue;
                };
                let fetching = SearchEvent::Fetching {
                    token: request.token,
                    query: request.query.clone(),
                };
                if events.send(fetching).is_err() {
                    break;
                }

                let source = Arc::clone(&source);
                let done = done_tx.clone();
                tokio::spawn(async move {
                    let result = source.fetch(request.query).await;
                    // The driver may have stopped while this was in flight
                    let _ = done.send((request.token, result));
                });
            }

            Some((token, result)) = done_rx.recv() => {
                match scheduler.on_result(token, result) {
                    ResultOutcome::Applied(result) => {
                        if events.send(SearchEvent::Applied { token, result }).is_err() {
                            break;
                        }
                    }
                    ResultOutcome::Stale | ResultOutcome::Disposed => {}
                }
            }
        }
    }

    scheduler.dispose();
    debug!("search driver stopped");
}

/// Load candidates and exclusions for `request` on a tokio task
pub fn spawn_dependent_refresh<P, T, S>(
    source: Arc<S>,
    request: DependentRequest<P>,
) -> JoinHandle<DependentResponse<T>>
where
    P: Send + Sync + 'static,
    T: Choice + Send + 'static,
    S: CandidateSource<P, T> + 'static,
{
    tokio::spawn(async move { fetch_dependent(source.as_ref(), &request).await })
}
