//! Keeps an aggregation result current while the period, the display
//! currency or the record set change.
//!
//! Every trigger starts a new pass tagged with a generation number. A pass
//! only publishes its result if no newer pass was started in the meantime,
//! so readers never observe a result for a request that was superseded.
use crate::core::aggregate::{AggregationRequest, AggregationResult, aggregate};
use crate::core::currency::CurrencyRateProvider;
use crate::core::period::{Calendar, Period};
use crate::core::store::ExpenseStore;
use anyhow::{Result, anyhow};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationState {
    Idle,
    Loading { generation: u64 },
    Ready(Arc<AggregationResult>),
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn ExpenseStore>,
    currency_provider: Arc<dyn CurrencyRateProvider + Send + Sync>,
    calendar: Calendar,
    user: String,
    request: Arc<Mutex<AggregationRequest>>,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<AggregationState>>,
}

/// Re-runs the current request whenever the record set changes. Dropping
/// the guard stops listening.
pub struct RecordWatch {
    handle: JoinHandle<()>,
}

impl Drop for RecordWatch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ExpenseStore>,
        currency_provider: Arc<dyn CurrencyRateProvider + Send + Sync>,
        calendar: Calendar,
        user: &str,
        request: AggregationRequest,
    ) -> Self {
        let (state, _) = watch::channel(AggregationState::Idle);
        Self {
            store,
            currency_provider,
            calendar,
            user: user.to_string(),
            request: Arc::new(Mutex::new(request)),
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
        }
    }

    pub fn request(&self) -> AggregationRequest {
        self.request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> AggregationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AggregationState> {
        self.state.subscribe()
    }

    /// Starts a pass for `request` and makes it the current request.
    pub fn trigger(&self, request: AggregationRequest) -> JoinHandle<()> {
        self.update(|current| *current = request)
    }

    /// Applies `change` to the current request and starts a pass for the
    /// result. The request lock is held until the generation is bumped, so
    /// concurrent updates are ordered by their generation.
    fn update(&self, change: impl FnOnce(&mut AggregationRequest)) -> JoinHandle<()> {
        let (request, generation) = {
            let mut current = self.request.lock().unwrap_or_else(PoisonError::into_inner);
            change(&mut current);
            let mut generation = 0;
            self.state.send_modify(|state| {
                generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                *state = AggregationState::Loading { generation };
            });
            (current.clone(), generation)
        };
        debug!("Pass {generation} started for {} in {}", request.period, request.target_currency);

        let this = self.clone();
        tokio::spawn(async move {
            let result = this.run_pass(request).await;
            let committed = this.state.send_if_modified(|state| {
                if this.generation.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *state = AggregationState::Ready(Arc::new(result));
                true
            });
            if !committed {
                debug!("Pass {generation} superseded, dropping its result");
            }
        })
    }

    async fn run_pass(&self, request: AggregationRequest) -> AggregationResult {
        let now = Utc::now();
        match self.store.list(&self.user).await {
            Ok(records) => {
                aggregate(
                    &records,
                    &request,
                    self.currency_provider.as_ref(),
                    &self.calendar,
                    now,
                )
                .await
            }
            Err(e) => {
                warn!("Failed to load expenses for aggregation: {e:#}");
                let range = self.calendar.range(&request.period, now);
                AggregationResult::empty(request, range)
            }
        }
    }

    /// Re-runs the current request.
    pub fn refresh(&self) -> JoinHandle<()> {
        self.update(|_| {})
    }

    pub fn set_currency(&self, code: &str) -> JoinHandle<()> {
        self.update(|request| *request = AggregationRequest::new(request.period, code))
    }

    pub fn set_period(&self, period: Period) -> JoinHandle<()> {
        self.update(|request| request.period = period)
    }

    pub fn next_month(&self) -> JoinHandle<()> {
        self.update(|request| request.period = self.pinned_month(request.period).next())
    }

    pub fn previous_month(&self) -> JoinHandle<()> {
        self.update(|request| request.period = self.pinned_month(request.period).previous())
    }

    /// The requested month, or the current one for rolling periods.
    fn pinned_month(&self, period: Period) -> Period {
        match period {
            month @ Period::Month { .. } => month,
            _ => self.calendar.current_month(Utc::now()),
        }
    }

    pub fn watch_records(&self) -> RecordWatch {
        let mut changes = self.store.subscribe(&self.user);
        let this = self.clone();
        let handle = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                debug!("Expenses of {} changed, refreshing", this.user);
                this.refresh();
            }
        });
        RecordWatch { handle }
    }

    /// Waits until no pass is pending and returns the published result.
    pub async fn wait_ready(&self) -> Result<Arc<AggregationResult>> {
        let mut receiver = self.state.subscribe();
        let state = receiver
            .wait_for(|state| matches!(state, AggregationState::Ready(_)))
            .await
            .map_err(|_| anyhow!("Aggregation state channel closed"))?;
        match &*state {
            AggregationState::Ready(result) => Ok(result.clone()),
            _ => Err(anyhow!("Aggregation is not ready")),
        }
    }
}
