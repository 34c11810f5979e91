//! Content loader: drives a lazily-rendered listing to full materialization.
//!
//! The loop advances the page (scroll), waits, and re-counts cards until
//! growth stops for `stable_timeout`, the count reaches `max_records`, the
//! run exceeds `max_run_time`, or `max_attempts` iterations are spent.
//! Every one of those exits is a normal outcome; the caller snapshots
//! whatever loaded. Only a failure to advance the page is an error.

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ParsingConfig;

/// Page operations the loader needs.
#[async_trait]
pub trait ScrollSurface: Send {
    /// Scroll/advance to trigger loading of the next batch.
    async fn advance(&mut self) -> Result<()>;

    /// Number of cards currently rendered.
    async fn record_count(&mut self) -> Result<usize>;

    /// Click the "load more" control if present. Returns whether it was clicked.
    async fn activate_load_more(&mut self) -> Result<bool>;
}

/// Loader states. The last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Growing,
    StableWait,
    Converged,
    TimedOut,
    CountCapped,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadState::Growing => "growing",
            LoadState::StableWait => "stable-wait",
            LoadState::Converged => "converged",
            LoadState::TimedOut => "timed-out",
            LoadState::CountCapped => "count-capped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct LoaderBounds {
    pub min_records: usize,
    pub max_records: usize,
    pub scroll_delay: Duration,
    pub stable_timeout: Duration,
    pub max_run_time: Duration,
    pub max_attempts: u32,
    pub load_more_delay: Duration,
}

impl From<&ParsingConfig> for LoaderBounds {
    fn from(p: &ParsingConfig) -> Self {
        Self {
            min_records: p.min_records,
            max_records: p.max_records,
            scroll_delay: Duration::from_millis(p.scroll_delay_ms),
            stable_timeout: Duration::from_millis(p.stable_timeout_ms),
            max_run_time: Duration::from_millis(p.max_run_time_ms),
            max_attempts: p.max_attempts,
            load_more_delay: Duration::from_millis(p.load_more_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub state: LoadState,
    /// Last measured card count.
    pub count: usize,
    /// Advance iterations performed.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Run the convergence loop against `surface`.
pub async fn load_all(surface: &mut dyn ScrollSurface, bounds: &LoaderBounds) -> Result<LoadOutcome> {
    let start = Instant::now();
    let mut count = match surface.record_count().await {
        Ok(n) => n,
        Err(e) => {
            warn!("Initial record count failed: {:#}", e);
            0
        }
    };
    let mut last_growth = Instant::now();
    let mut attempts = 0u32;
    let mut state = LoadState::Growing;

    info!(initial = count, "Loading content");

    if count >= bounds.max_records {
        state = LoadState::CountCapped;
    }

    while !is_terminal(state) {
        if attempts >= bounds.max_attempts {
            debug!(attempts, "Attempt budget exhausted");
            state = LoadState::TimedOut;
            break;
        }
        if start.elapsed() >= bounds.max_run_time {
            state = LoadState::TimedOut;
            break;
        }

        attempts += 1;
        surface.advance().await?;
        tokio::time::sleep(bounds.scroll_delay).await;

        match surface.activate_load_more().await {
            Ok(true) => {
                debug!(attempts, "Clicked load-more control");
                tokio::time::sleep(bounds.load_more_delay).await;
            }
            Ok(false) => {}
            Err(e) => debug!("Load-more activation failed: {:#}", e),
        }

        let current = match surface.record_count().await {
            Ok(n) => n,
            Err(e) => {
                warn!("Record count failed, treating as no growth: {:#}", e);
                count
            }
        };

        if current > count {
            info!(count = current, attempts, "Loaded {} new records", current - count);
            count = current;
            last_growth = Instant::now();
            state = if count >= bounds.max_records {
                LoadState::CountCapped
            } else {
                LoadState::Growing
            };
        } else if last_growth.elapsed() >= bounds.stable_timeout {
            state = LoadState::Converged;
        } else {
            state = LoadState::StableWait;
        }
    }

    let outcome = LoadOutcome {
        state,
        count,
        attempts,
        elapsed: start.elapsed(),
    };

    info!(
        state = %outcome.state,
        count = outcome.count,
        attempts = outcome.attempts,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "Content loading finished"
    );
    if outcome.count < bounds.min_records {
        warn!(
            "Loaded {} records, fewer than the expected minimum of {}",
            outcome.count, bounds.min_records
        );
    }

    Ok(outcome)
}

fn is_terminal(state: LoadState) -> bool {
    matches!(
        state,
        LoadState::Converged | LoadState::TimedOut | LoadState::CountCapped
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Grows by `step` on each of the first `grow_for` advances.
    struct SimulatedSurface {
        count: usize,
        step: usize,
        grow_for: u32,
        advances: u32,
        load_more_clicks: u32,
        has_load_more: bool,
        fail_count_on: Option<u32>,
        fail_advance_on: Option<u32>,
    }

    impl SimulatedSurface {
        fn new(step: usize, grow_for: u32) -> Self {
            Self {
                count: 0,
                step,
                grow_for,
                advances: 0,
                load_more_clicks: 0,
                has_load_more: false,
                fail_count_on: None,
                fail_advance_on: None,
            }
        }
    }

    #[async_trait]
    impl ScrollSurface for SimulatedSurface {
        async fn advance(&mut self) -> Result<()> {
            self.advances += 1;
            if self.fail_advance_on == Some(self.advances) {
                anyhow::bail!("page crashed");
            }
            if self.advances <= self.grow_for {
                self.count += self.step;
            }
            Ok(())
        }

        async fn record_count(&mut self) -> Result<usize> {
            if self.fail_count_on == Some(self.advances) {
                anyhow::bail!("evaluate failed");
            }
            Ok(self.count)
        }

        async fn activate_load_more(&mut self) -> Result<bool> {
            if self.has_load_more {
                self.load_more_clicks += 1;
            }
            Ok(self.has_load_more)
        }
    }

    fn bounds() -> LoaderBounds {
        LoaderBounds {
            min_records: 0,
            max_records: 10_000,
            scroll_delay: Duration::from_millis(1500),
            stable_timeout: Duration::from_millis(6000),
            max_run_time: Duration::from_secs(600),
            max_attempts: 1000,
            load_more_delay: Duration::from_millis(1000),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_converges_after_growth_stops() {
        let mut surface = SimulatedSurface::new(12, 5);
        let b = bounds();
        let outcome = load_all(&mut surface, &b).await.unwrap();

        assert_eq!(outcome.state, LoadState::Converged);
        assert_eq!(outcome.count, 60);
        // m growth iterations plus stable_timeout / scroll_delay quiet ones.
        assert_eq!(outcome.attempts, 5 + 4);
        assert!(outcome.attempts <= 5 + (6000 / 1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_convergence_bound_with_uneven_delay() {
        let mut surface = SimulatedSurface::new(3, 7);
        let mut b = bounds();
        b.scroll_delay = Duration::from_millis(1000);
        b.stable_timeout = Duration::from_millis(2500);
        let outcome = load_all(&mut surface, &b).await.unwrap();

        assert_eq!(outcome.state, LoadState::Converged);
        assert_eq!(outcome.count, 21);
        assert_eq!(outcome.attempts, 7 + 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_cap() {
        let mut surface = SimulatedSurface::new(10, 100);
        let mut b = bounds();
        b.max_records = 35;
        let outcome = load_all(&mut surface, &b).await.unwrap();

        assert_eq!(outcome.state, LoadState::CountCapped);
        assert_eq!(outcome.count, 40);
        assert_eq!(outcome.attempts, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_run_time() {
        let mut surface = SimulatedSurface::new(1, u32::MAX);
        let mut b = bounds();
        b.max_run_time = Duration::from_millis(15_000);
        let outcome = load_all(&mut surface, &b).await.unwrap();

        assert_eq!(outcome.state, LoadState::TimedOut);
        assert_eq!(outcome.attempts, 10);
        assert_eq!(outcome.count, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_budget_is_timeout() {
        let mut surface = SimulatedSurface::new(1, u32::MAX);
        let mut b = bounds();
        b.max_attempts = 3;
        let outcome = load_all(&mut surface, &b).await.unwrap();

        assert_eq!(outcome.state, LoadState::TimedOut);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_failure_is_no_growth() {
        let mut surface = SimulatedSurface::new(5, 2);
        surface.fail_count_on = Some(2);
        let outcome = load_all(&mut surface, &bounds()).await.unwrap();

        assert_eq!(outcome.state, LoadState::Converged);
        assert_eq!(outcome.count, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_failure_is_error() {
        let mut surface = SimulatedSurface::new(5, 10);
        surface.fail_advance_on = Some(3);
        assert!(load_all(&mut surface, &bounds()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_more_clicked_each_iteration() {
        let mut surface = SimulatedSurface::new(5, 2);
        surface.has_load_more = true;
        let outcome = load_all(&mut surface, &bounds()).await.unwrap();

        assert_eq!(outcome.state, LoadState::Converged);
        assert_eq!(surface.load_more_clicks, outcome.attempts);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_full_page() {
        let mut surface = SimulatedSurface::new(0, 0);
        surface.count = 50;
        let mut b = bounds();
        b.max_records = 50;
        let outcome = load_all(&mut surface, &b).await.unwrap();

        assert_eq!(outcome.state, LoadState::CountCapped);
        assert_eq!(outcome.attempts, 0);
    }
}
