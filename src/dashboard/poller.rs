use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info};
use tokio::time::MissedTickBehavior;

use super::fetch::StatusFetcher;
use super::state::DashboardState;

/// Polls the status endpoint and owns the resulting [`DashboardState`].
///
/// Fetches are numbered in issue order. Ticks do not wait for earlier fetches,
/// so several may be in flight; whichever response is newest by sequence
/// number wins and late arrivals of older requests are dropped.
pub struct Poller {
    fetcher: StatusFetcher,
    interval: Duration,
    state: DashboardState,
    next_seq: u64,
}

impl Poller {
    pub fn new(fetcher: StatusFetcher, interval: Duration) -> Self {
        Self {
            fetcher,
            interval,
            state: DashboardState::default(),
            next_seq: 0,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    fn issue(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Runs a single fetch and applies it. Returns whether the state changed.
    pub async fn fetch_status(&mut self) -> bool {
        let seq = self.issue();
        let outcome = self.fetcher.fetch().await;
        self.state.apply(seq, outcome, Utc::now())
    }

    /// Polls every interval, calling `on_update` after each applied response,
    /// until `shutdown` resolves. In-flight fetches are dropped on return.
    pub async fn run<S, F>(mut self, shutdown: S, mut on_update: F) -> DashboardState
    where
        S: Future<Output = ()>,
        F: FnMut(&DashboardState),
    {
        info!(
            "Polling {} every {:?}",
            self.fetcher.endpoint(),
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = FuturesUnordered::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    debug!("Poller stopping with {} fetches in flight", in_flight.len());
                    break;
                }
                _ = ticker.tick() => {
                    let seq = self.issue();
                    let fetcher = self.fetcher.clone();
                    in_flight.push(async move { (seq, fetcher.fetch().await) });
                }
                Some((seq, outcome)) = in_flight.next(), if !in_flight.is_empty() => {
                    if self.state.apply(seq, outcome, Utc::now()) {
                        on_update(&self.state);
                    }
                }
            }
        }

        self.state
    }
}
