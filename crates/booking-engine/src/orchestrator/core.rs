use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use stayline_reservation_core::types::{ReservationId, ReservationRequest, ReservationStatus};
use stayline_reservation_core::validation::ValidationEngine;

use crate::allocator::AllocationEngine;
use crate::config::BookingEngineConfig;
use crate::error::{BookingEngineError, Result};
use crate::monitoring::{BookingEvent, EventBroadcaster, MetricsCollector};
use crate::orchestrator::types::{EngineStats, FeedItem};
use crate::queue::{QueuedReservation, ReservationQueue};
use crate::staff::StaffRegistry;
use crate::store::{
    BlockStore, CalendarFeed, InMemoryBlockStore, InMemoryCalendarFeed, InMemoryPropertyCatalog,
    InMemoryReservationStore, InMemoryWorkItemStore, PropertyCatalog, ReservationStore,
    WorkItemStore,
};

/// Default priority for incoming reservations (0 = highest, 255 = lowest)
const DEFAULT_PRIORITY: u8 = 50;

/// External collaborators the engine is wired to
///
/// Everything is injected here; the engine never reaches for globals.
/// The defaults are the in-memory implementations.
pub struct Collaborators {
    pub reservations: Arc<dyn ReservationStore>,
    pub blocks: Arc<dyn BlockStore>,
    pub work_items: Arc<dyn WorkItemStore>,
    pub properties: Arc<dyn PropertyCatalog>,
    pub calendar: Arc<dyn CalendarFeed>,
    pub staff: Arc<StaffRegistry>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            reservations: Arc::new(InMemoryReservationStore::new()),
            blocks: Arc::new(InMemoryBlockStore::new()),
            work_items: Arc::new(InMemoryWorkItemStore::new()),
            properties: Arc::new(InMemoryPropertyCatalog::new()),
            calendar: Arc::new(InMemoryCalendarFeed::new()),
            staff: Arc::new(StaffRegistry::new()),
        }
    }
}

/// Pipeline coordinator
///
/// Owns the change-feed subscription, the assignment queue with its
/// in-flight guard, the bounded worker pool, and the outbound event
/// stream. Constructed once at process start and torn down with
/// [`BookingEngine::shutdown`]; there is no ambient global state.
pub struct BookingEngine {
    pub(crate) config: BookingEngineConfig,
    pub(crate) reservations: Arc<dyn ReservationStore>,
    pub(crate) blocks: Arc<dyn BlockStore>,
    pub(crate) work_items: Arc<dyn WorkItemStore>,
    pub(crate) properties: Arc<dyn PropertyCatalog>,
    pub(crate) calendar: Arc<dyn CalendarFeed>,
    pub(crate) staff: Arc<StaffRegistry>,
    pub(crate) validation: ValidationEngine,
    pub(crate) allocator: AllocationEngine,
    pub(crate) queue: Arc<RwLock<ReservationQueue>>,
    pub(crate) events: EventBroadcaster,
    pub(crate) metrics: Arc<MetricsCollector>,
    workers: Arc<Semaphore>,
    feed_tx: mpsc::UnboundedSender<FeedItem>,
    feed_rx: Mutex<Option<mpsc::UnboundedReceiver<FeedItem>>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl BookingEngine {
    /// Create an engine wired to in-memory collaborators
    pub fn new(config: BookingEngineConfig) -> Result<Arc<Self>> {
        Self::with_collaborators(config, Collaborators::default())
    }

    /// Create an engine wired to the given collaborators
    pub fn with_collaborators(
        config: BookingEngineConfig,
        collaborators: Collaborators,
    ) -> Result<Arc<Self>> {
        config
            .validate()
            .map_err(BookingEngineError::config)?;

        let Collaborators {
            reservations,
            blocks,
            work_items,
            properties,
            calendar,
            staff,
        } = collaborators;

        let allocator = AllocationEngine::new(
            staff.clone(),
            work_items.clone(),
            config.allocation.clone(),
        );
        let validation = ValidationEngine::new(config.validation.clone());
        let queue = Arc::new(RwLock::new(ReservationQueue::new(
            config.queue.max_queue_size,
            config.queue.max_wait_secs,
        )));
        let events = EventBroadcaster::new(
            config.monitoring.event_channel_capacity,
            config.monitoring.emit_events,
        );
        let workers = Arc::new(Semaphore::new(config.queue.worker_budget));
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);

        info!(
            "🎛️ Initializing {} (workers: {}, retry budget: {})",
            config.general.service_name, config.queue.worker_budget, config.queue.retry_budget
        );

        Ok(Arc::new(Self {
            config,
            reservations,
            blocks,
            work_items,
            properties,
            calendar,
            staff,
            validation,
            allocator,
            queue,
            events,
            metrics: Arc::new(MetricsCollector::new()),
            workers,
            feed_tx,
            feed_rx: Mutex::new(Some(feed_rx)),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }))
    }

    /// Start the change-feed intake and the queue drain loop
    pub fn start(self: Arc<Self>) -> Result<()> {
        let feed_rx = self
            .feed_rx
            .lock()
            .take()
            .ok_or_else(|| BookingEngineError::orchestration("engine already started"))?;

        info!("🚀 Booking engine started");

        let intake =
            tokio::spawn(Arc::clone(&self).run_intake(feed_rx, self.shutdown_tx.subscribe()));
        let drain = tokio::spawn(Arc::clone(&self).run_drain_loop(self.shutdown_tx.subscribe()));

        let mut tasks = self.tasks.lock();
        tasks.push(intake);
        tasks.push(drain);
        Ok(())
    }

    /// Stop background tasks and wait for them to finish
    pub async fn shutdown(&self) {
        info!("🛑 Booking engine shutting down");
        let _ = self.shutdown_tx.send(true);
        let handles: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Submit a reservation into the pipeline
    ///
    /// Convenience intake for in-process callers: persists the request
    /// as pending and pushes a change-feed item.
    pub async fn submit(&self, request: ReservationRequest) -> Result<ReservationId> {
        let id = request.id.clone();
        self.reservations.insert(request.clone()).await?;
        self.feed_tx
            .send(FeedItem::new(request))
            .map_err(|_| BookingEngineError::orchestration("change feed is closed"))?;
        Ok(id)
    }

    /// Sender half of the change feed, for external intake collaborators
    pub fn feed_sender(&self) -> mpsc::UnboundedSender<FeedItem> {
        self.feed_tx.clone()
    }

    /// Subscribe to outbound domain events
    pub fn subscribe_events(&self) -> broadcast::Receiver<BookingEvent> {
        self.events.subscribe()
    }

    /// Engine configuration
    pub fn config(&self) -> &BookingEngineConfig {
        &self.config
    }

    /// Staff registry handle
    pub fn staff(&self) -> &Arc<StaffRegistry> {
        &self.staff
    }

    /// Engine-wide statistics
    pub async fn stats(&self) -> EngineStats {
        EngineStats {
            queue: self.queue.read().await.stats(),
            staff: self.staff.stats(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Change-feed intake: persist unseen records and enqueue
    async fn run_intake(
        self: Arc<Self>,
        mut feed_rx: mpsc::UnboundedReceiver<FeedItem>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("Intake task stopping");
                        break;
                    }
                }
                item = feed_rx.recv() => {
                    match item {
                        Some(item) => {
                            if let Err(err) = self.ingest(item).await {
                                error!("Failed to ingest change-feed item: {}", err);
                            }
                        }
                        None => {
                            debug!("Change feed closed, intake task stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn ingest(&self, item: FeedItem) -> Result<()> {
        // Creation deliveries carry records we have not stored yet;
        // modification deliveries must not clobber newer state.
        if self.reservations.get(&item.reservation_id).await?.is_none() {
            self.reservations.insert(item.request.clone()).await?;
        }

        if item.request.status != ReservationStatus::Pending {
            if item.request.status == ReservationStatus::Confirmed {
                return self.expand_if_unexpanded(&item.reservation_id).await;
            }
            debug!(
                "⏭️ Feed item for {} is {}, nothing to enqueue",
                item.reservation_id, item.request.status
            );
            return Ok(());
        }

        let entry = QueuedReservation::new(item.reservation_id.clone(), DEFAULT_PRIORITY);
        match self.queue.write().await.enqueue(entry) {
            Ok(_) => Ok(()),
            Err(err) => {
                warn!("Queue refused reservation {}: {}", item.reservation_id, err);
                Err(err)
            }
        }
    }

    /// Confirmed records can arrive on the feed before their jobs were
    /// ever derived (an acceptance from a previous process lifetime);
    /// derive them now. Existing work items are the jobs-created marker.
    async fn expand_if_unexpanded(&self, id: &ReservationId) -> Result<()> {
        let Some(current) = self.reservations.get(id).await? else {
            return Ok(());
        };
        if current.status != ReservationStatus::Confirmed {
            return Ok(());
        }
        if !self.work_items.for_reservation(id).await?.is_empty() {
            debug!("⏭️ Reservation {} already has work items", id);
            return Ok(());
        }

        info!("🧰 Expanding work items for confirmed reservation {}", id);
        self.expand_work_items(&current).await?;
        Ok(())
    }

    /// Drain loop: dispatch queued reservations to bounded workers and
    /// run periodic queue maintenance
    async fn run_drain_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut tick =
            tokio::time::interval(Duration::from_millis(self.config.queue.drain_interval_ms));
        let mut maintenance = tokio::time::interval(Duration::from_secs(5));

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("Drain loop stopping");
                        break;
                    }
                }
                _ = tick.tick() => {
                    // Only pull what a worker can pick up right now;
                    // everything else keeps its queue position.
                    let free = self.workers.available_permits();
                    if free == 0 {
                        continue;
                    }
                    let batch = self.queue.write().await.dequeue_batch(free);
                    for entry in batch {
                        tokio::spawn(Arc::clone(&self).run_worker(entry));
                    }
                }
                _ = maintenance.tick() => {
                    self.run_maintenance().await;
                }
            }
        }
    }

    /// Expire overdue queue entries and clear stuck in-flight marks
    async fn run_maintenance(&self) {
        let expired = self.queue.write().await.remove_expired();
        for id in expired {
            self.metrics.incr_expired();
            if let Err(err) = self
                .reservations
                .set_status(&id, ReservationStatus::Error, Some("expired in queue".to_string()))
                .await
            {
                error!("Failed to expire reservation {}: {}", id, err);
            }
            self.events.emit(BookingEvent::ReservationExpired {
                reservation_id: id,
            });
        }

        let _ = self
            .queue
            .write()
            .await
            .cleanup_stuck_in_flight(self.config.queue.stuck_in_flight_secs);
    }

    /// Process one queued reservation under the worker budget and the
    /// per-item timeout, then settle retries
    async fn run_worker(self: Arc<Self>, entry: QueuedReservation) {
        let permit = match Arc::clone(&self.workers).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return, // semaphore closed, engine is going away
        };

        let id = entry.reservation_id.clone();
        let timeout = Duration::from_secs(self.config.queue.processing_timeout_secs);

        let result = match tokio::time::timeout(timeout, self.process_reservation(&entry)).await {
            Ok(result) => result,
            Err(_) => Err(BookingEngineError::timeout(format!(
                "processing exceeded {}s",
                timeout.as_secs()
            ))),
        };

        // The guard is released on every exit path before any follow-up
        // so a crash cannot wedge the identity.
        self.queue.write().await.release(&id);

        match result {
            Ok(outcome) => {
                debug!("Reservation {} settled: {:?}", id, outcome);
            }
            Err(err) if err.is_retryable() && entry.retry_count < self.config.queue.retry_budget => {
                let next_retry = entry.retry_count + 1;
                let backoff = Duration::from_millis(
                    self.config.queue.retry_backoff_base_ms << entry.retry_count,
                );
                warn!(
                    "🔁 Reservation {} hit an infrastructure fault (attempt {}): {}; retrying in {:?}",
                    id, next_retry, err, backoff
                );
                self.metrics.incr_retries();
                if let Err(err) = self.reservations.bump_retry(&id).await {
                    debug!("Could not persist retry count for {}: {}", id, err);
                }

                let engine = Arc::clone(&self);
                let mut retry_entry = QueuedReservation::new(id.clone(), entry.priority);
                retry_entry.retry_count = next_retry;
                tokio::spawn(async move {
                    tokio::time::sleep(backoff).await;
                    if let Err(err) = engine.queue.write().await.enqueue(retry_entry) {
                        error!("Failed to re-enqueue reservation {}: {}", id, err);
                    }
                });
            }
            Err(err) => {
                let reason = if err.is_retryable() {
                    format!("retry budget exhausted: {}", err)
                } else {
                    err.to_string()
                };
                error!("💥 Reservation {} failed terminally: {}", id, reason);
                if let Err(store_err) = self
                    .reservations
                    .set_status(&id, ReservationStatus::Error, Some(reason.clone()))
                    .await
                {
                    error!("Could not record error state for {}: {}", id, store_err);
                }
                self.events.emit(BookingEvent::StatusChanged {
                    reservation_id: id,
                    status: ReservationStatus::Error,
                    reason: Some(reason),
                });
                self.metrics.incr_errors();
            }
        }

        drop(permit);
    }
}
