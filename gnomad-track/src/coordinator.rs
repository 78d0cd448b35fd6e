//! Debounced tile request coordination
//!
//! [`Coordinator`] is the pure state machine: ids accumulate until no new id
//! has arrived for the debounce delay, and a zoom change throws away
//! whatever was pending. [`TileFetcher`] runs it on a task against a
//! [`WorkerHandle`].

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};

use gnomad_core::{Result, TileData, TileId, ZoomLevel};

use crate::worker::{parse_tile_ids, DatasetId, WorkerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Accumulating,
    Dispatching,
}

/// Tile ids released together once the debounce window closes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub zoom: ZoomLevel,
    pub tiles: Vec<TileId>,
}

#[derive(Debug, Clone)]
pub struct Coordinator {
    delay: Duration,
    state: CoordinatorState,
    pending: BTreeSet<TileId>,
    zoom: Option<ZoomLevel>,
    deadline: Option<Instant>,
}

impl Coordinator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: CoordinatorState::Idle,
            pending: BTreeSet::new(),
            zoom: None,
            deadline: None,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn pending(&self) -> impl Iterator<Item = &TileId> {
        self.pending.iter()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Queue a tile and re-arm the timer. Returns how many pending ids were
    /// discarded because `id` is on a different zoom level.
    pub fn push(&mut self, id: TileId, now: Instant) -> usize {
        let mut discarded = 0;
        if self.zoom.is_some_and(|zoom| zoom != id.zoom) && !self.pending.is_empty() {
            discarded = self.pending.len();
            log::debug!(
                "Zoom changed to {}, discarding {} pending tile request(s)",
                id.zoom,
                discarded
            );
            self.pending.clear();
        }

        self.zoom = Some(id.zoom);
        self.pending.insert(id);
        self.deadline = Some(now + self.delay);
        self.state = CoordinatorState::Accumulating;
        discarded
    }

    /// Release the pending set once the quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<Batch> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                let tiles: Vec<TileId> = std::mem::take(&mut self.pending).into_iter().collect();
                let zoom = self.zoom?;
                self.state = CoordinatorState::Dispatching;
                Some(Batch { zoom, tiles })
            }
            _ => None,
        }
    }

    /// Mark a released batch as handed off
    pub fn dispatched(&mut self) {
        if self.state == CoordinatorState::Dispatching {
            self.state = CoordinatorState::Idle;
        }
    }
}

/// Tiles of one batch as returned by the worker
#[derive(Debug)]
pub struct FetchedBatch {
    pub zoom: ZoomLevel,
    pub tiles: Result<HashMap<TileId, TileData>>,
}

/// Debounced front end to the worker for one dataset.
///
/// Completed batches arrive on the receiver returned by [`TileFetcher::spawn`].
/// A batch whose zoom level is no longer the latest requested one is
/// dropped; its tiles still land in the worker's cache.
#[derive(Clone)]
pub struct TileFetcher {
    requests: mpsc::UnboundedSender<Vec<TileId>>,
}

impl TileFetcher {
    pub fn spawn(
        worker: WorkerHandle,
        dataset: DatasetId,
        delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<FetchedBatch>) {
        let (requests, mut incoming) = mpsc::unbounded_channel::<Vec<TileId>>();
        let (deliver, batches) = mpsc::unbounded_channel::<FetchedBatch>();
        let latest_zoom = Arc::new(AtomicU32::new(0));

        tokio::spawn(async move {
            let mut coordinator = Coordinator::new(delay);
            loop {
                tokio::select! {
                    received = incoming.recv() => match received {
                        Some(ids) => {
                            let now = Instant::now();
                            for id in ids {
                                latest_zoom.store(id.zoom, Ordering::SeqCst);
                                coordinator.push(id, now);
                            }
                        }
                        None => break,
                    },
                    _ = wait_until(coordinator.deadline()) => {
                        if let Some(batch) = coordinator.poll(Instant::now()) {
                            dispatch(&worker, dataset, batch, &latest_zoom, &deliver);
                            coordinator.dispatched();
                        }
                    }
                }
            }
            log::debug!("Tile fetcher for dataset {} stopped", dataset);
        });

        (Self { requests }, batches)
    }

    /// Ask for tiles by `"zoom.x"` id; malformed ids are dropped with a warning.
    pub fn request<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.request_ids(parse_tile_ids(ids));
    }

    pub fn request_ids(&self, ids: Vec<TileId>) {
        if ids.is_empty() {
            return;
        }
        if self.requests.send(ids).is_err() {
            log::warn!("Tile fetcher is no longer running");
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn dispatch(
    worker: &WorkerHandle,
    dataset: DatasetId,
    batch: Batch,
    latest_zoom: &Arc<AtomicU32>,
    deliver: &mpsc::UnboundedSender<FetchedBatch>,
) {
    log::debug!("Dispatching {} tile(s) at zoom {}", batch.tiles.len(), batch.zoom);

    let worker = worker.clone();
    let latest_zoom = latest_zoom.clone();
    let deliver = deliver.clone();
    tokio::spawn(async move {
        let ids = batch.tiles.iter().map(|id| id.to_string()).collect();
        let tiles = worker.fetch_tiles(dataset, ids).await;

        if latest_zoom.load(Ordering::SeqCst) != batch.zoom {
            log::debug!("Ignoring stale batch at zoom {}", batch.zoom);
            return;
        }
        let _ = deliver.send(FetchedBatch { zoom: batch.zoom, tiles });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(200);

    #[test]
    fn test_timer_rearms_on_every_push() {
        let t0 = Instant::now();
        let mut coordinator = Coordinator::new(DELAY);
        assert_eq!(coordinator.state(), CoordinatorState::Idle);

        coordinator.push(TileId::new(3, 10), t0);
        coordinator.push(TileId::new(3, 11), t0 + Duration::from_millis(150));
        assert_eq!(coordinator.state(), CoordinatorState::Accumulating);
        assert_eq!(coordinator.deadline(), Some(t0 + Duration::from_millis(350)));

        assert_eq!(coordinator.poll(t0 + Duration::from_millis(300)), None);
        let batch = coordinator.poll(t0 + Duration::from_millis(350)).unwrap();
        assert_eq!(batch.tiles, vec![TileId::new(3, 10), TileId::new(3, 11)]);
        assert_eq!(coordinator.state(), CoordinatorState::Dispatching);

        coordinator.dispatched();
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert_eq!(coordinator.deadline(), None);
    }

    #[test]
    fn test_zoom_change_discards_pending() {
        let t0 = Instant::now();
        let mut coordinator = Coordinator::new(DELAY);
        coordinator.push(TileId::new(3, 10), t0);
        coordinator.push(TileId::new(3, 11), t0);
        assert_eq!(coordinator.push(TileId::new(5, 2), t0), 2);

        let batch = coordinator.poll(t0 + DELAY).unwrap();
        assert_eq!(batch, Batch { zoom: 5, tiles: vec![TileId::new(5, 2)] });
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let t0 = Instant::now();
        let mut coordinator = Coordinator::new(DELAY);
        coordinator.push(TileId::new(2, 1), t0);
        coordinator.push(TileId::new(2, 1), t0);
        assert_eq!(coordinator.poll(t0 + DELAY).unwrap().tiles.len(), 1);
    }

    #[test]
    fn test_push_while_dispatching_starts_new_batch() {
        let t0 = Instant::now();
        let mut coordinator = Coordinator::new(DELAY);
        coordinator.push(TileId::new(2, 1), t0);
        coordinator.poll(t0 + DELAY).unwrap();

        coordinator.push(TileId::new(2, 2), t0 + DELAY);
        assert_eq!(coordinator.state(), CoordinatorState::Accumulating);
        assert_eq!(coordinator.pending().count(), 1);
    }
}
