//! Background tile worker
//!
//! All cache, file-handle and buffer state lives inside one task. Callers
//! talk to it through a cloneable [`WorkerHandle`]; every call sends a
//! request over a channel and awaits the reply.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};

use gnomad_core::{
    ChromosomeTable, DataConfig, Result, TabixVcf, TileData, TileId, TileSource, TilesetInfo,
    TrackError, TrackOptions, VariantSource,
};
use gnomad_gpu::{EncodeOptions, RenderEncoder, RenderOutput};

/// Identifies one track/dataset session inside the worker
pub type DatasetId = u64;

const REQUEST_QUEUE: usize = 64;

/// Everything the encoder needs besides the tiles themselves
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub tile_ids: Vec<String>,
    pub domain: [f64; 2],
    pub range: [f64; 2],
    pub options: EncodeOptions,
    pub label_positions: Vec<f64>,
}

/// Parse `"zoom.x"` ids, dropping (and logging) the malformed ones
pub fn parse_tile_ids<I, S>(ids: I) -> Vec<TileId>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter()
        .filter_map(|raw| match raw.as_ref().parse::<TileId>() {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("Dropping tile request: {}", e);
                None
            }
        })
        .collect()
}

/// Dataset sessions plus the files and tables they share.
///
/// Methods take `&self`: locks guard the maps, the encoder buffers and each
/// session's cache, and none of them is held across an await. Requests on
/// the spawned worker therefore run concurrently on its task.
pub struct Worker {
    options: TrackOptions,
    sessions: RwLock<HashMap<DatasetId, Arc<TileSource>>>,
    tables: Mutex<HashMap<String, Arc<ChromosomeTable>>>,
    sources: Mutex<HashMap<(String, String), Arc<TabixVcf>>>,
    encoder: Mutex<RenderEncoder>,
}

impl Worker {
    pub fn new(options: TrackOptions) -> Self {
        Self {
            options,
            sessions: RwLock::new(HashMap::new()),
            tables: Mutex::new(HashMap::new()),
            sources: Mutex::new(HashMap::new()),
            encoder: Mutex::new(RenderEncoder::new()),
        }
    }

    pub fn options(&self) -> &TrackOptions {
        &self.options
    }

    async fn chromosome_table(&self, url: &str) -> Result<Arc<ChromosomeTable>> {
        let loaded = self.tables.lock().get(url).cloned();
        if let Some(table) = loaded {
            return Ok(table);
        }

        log::info!("Loading chromosome sizes from: {}", url);
        let table = Arc::new(ChromosomeTable::load(url).await?);
        // A concurrent init may have loaded the same file; keep the first
        Ok(self
            .tables
            .lock()
            .entry(url.to_string())
            .or_insert(table)
            .clone())
    }

    /// Open a dataset. Chromosome tables are loaded once per sizes URL and
    /// indexed files once per (vcf, tbi) pair, then shared between sessions.
    pub async fn init(&self, dataset: DatasetId, config: &DataConfig) -> Result<()> {
        let table = self.chromosome_table(&config.chrom_sizes_url).await?;

        let key = (config.vcf_url.clone(), config.tbi_url());
        let source = self
            .sources
            .lock()
            .entry(key)
            .or_insert_with_key(|(vcf, tbi)| {
                log::info!("Opening indexed VCF: {}", vcf);
                Arc::new(TabixVcf::open(vcf, tbi))
            })
            .clone();

        let mut session = TileSource::new(table, source, &self.options)
            .with_max_tile_width(config.max_tile_width(&self.options));
        if let Some(resolutions) = &config.resolutions {
            log::info!("Dataset {} uses {} explicit resolutions", dataset, resolutions.len());
            session.set_resolutions(Some(resolutions.clone()));
        }

        self.sessions.write().insert(dataset, Arc::new(session));
        log::info!("Initialised dataset {} ({})", dataset, config.vcf_url);
        Ok(())
    }

    /// Open a dataset over an already loaded table and any variant source
    pub fn register(&self, dataset: DatasetId, table: Arc<ChromosomeTable>, source: Arc<dyn VariantSource>) {
        self.sessions
            .write()
            .insert(dataset, Arc::new(TileSource::new(table, source, &self.options)));
    }

    pub fn session(&self, dataset: DatasetId) -> Result<Arc<TileSource>> {
        self.sessions
            .read()
            .get(&dataset)
            .cloned()
            .ok_or(TrackError::UnknownDataset { id: dataset })
    }

    pub fn tileset_info(&self, dataset: DatasetId) -> Result<TilesetInfo> {
        self.session(dataset).map(|session| session.tileset_info().clone())
    }

    pub fn chromosomes(&self, dataset: DatasetId) -> Result<Arc<ChromosomeTable>> {
        self.session(dataset).map(|session| session.chromosomes().clone())
    }

    pub async fn fetch_tiles<S: AsRef<str>>(
        &self,
        dataset: DatasetId,
        tile_ids: &[S],
    ) -> Result<HashMap<TileId, TileData>> {
        let ids = parse_tile_ids(tile_ids);
        let session = self.session(dataset)?;
        log::debug!("Fetching {} tiles for dataset {}", ids.len(), dataset);
        session.fetch_tiles(&ids).await
    }

    /// Fetch (or reuse) the requested tiles and encode them in one pass
    pub async fn encode_visible_tiles(&self, dataset: DatasetId, request: &EncodeRequest) -> Result<RenderOutput> {
        let ids = parse_tile_ids(&request.tile_ids);
        let tiles = self.session(dataset)?.fetch_tiles(&ids).await?;

        let visible = ids.iter().filter_map(|id| tiles.get(id)).map(|t| t.as_slice());
        Ok(self.encoder.lock().encode(
            visible,
            request.domain,
            request.range,
            &request.options,
            &request.label_positions,
        ))
    }

    async fn handle(&self, request: Request) {
        match request {
            Request::Init { dataset, config, reply } => {
                let _ = reply.send(self.init(dataset, &config).await);
            }
            Request::TilesetInfo { dataset, reply } => {
                let _ = reply.send(self.tileset_info(dataset));
            }
            Request::Chromosomes { dataset, reply } => {
                let _ = reply.send(self.chromosomes(dataset));
            }
            Request::FetchTiles { dataset, tile_ids, reply } => {
                let _ = reply.send(self.fetch_tiles(dataset, &tile_ids).await);
            }
            Request::Encode { dataset, request, reply } => {
                let _ = reply.send(self.encode_visible_tiles(dataset, &request).await);
            }
        }
    }

    /// Move the worker onto its own task. Requests are picked up as they
    /// arrive and run concurrently, so a slow decode never holds up the
    /// others.
    pub fn spawn(self) -> WorkerHandle {
        let (sender, mut receiver) = mpsc::channel::<Request>(REQUEST_QUEUE);
        tokio::spawn(async move {
            let mut in_flight = FuturesUnordered::new();
            loop {
                tokio::select! {
                    Some(request) = receiver.recv() => in_flight.push(self.handle(request)),
                    Some(()) = in_flight.next() => {}
                    else => break,
                }
            }
            log::debug!("Tile worker stopped");
        });
        WorkerHandle { sender }
    }
}

/// Start a worker with the given track options on the current runtime
pub fn spawn_worker(options: TrackOptions) -> WorkerHandle {
    Worker::new(options).spawn()
}

enum Request {
    Init {
        dataset: DatasetId,
        config: DataConfig,
        reply: oneshot::Sender<Result<()>>,
    },
    TilesetInfo {
        dataset: DatasetId,
        reply: oneshot::Sender<Result<TilesetInfo>>,
    },
    Chromosomes {
        dataset: DatasetId,
        reply: oneshot::Sender<Result<Arc<ChromosomeTable>>>,
    },
    FetchTiles {
        dataset: DatasetId,
        tile_ids: Vec<String>,
        reply: oneshot::Sender<Result<HashMap<TileId, TileData>>>,
    },
    Encode {
        dataset: DatasetId,
        request: EncodeRequest,
        reply: oneshot::Sender<Result<RenderOutput>>,
    },
}

#[derive(Clone)]
pub struct WorkerHandle {
    sender: mpsc::Sender<Request>,
}

impl WorkerHandle {
    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<Result<T>>) -> Request) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(make(reply))
            .await
            .map_err(|_| TrackError::WorkerClosed)?;
        response.await.map_err(|_| TrackError::WorkerClosed)?
    }

    pub async fn init(&self, dataset: DatasetId, config: DataConfig) -> Result<()> {
        self.call(|reply| Request::Init { dataset, config, reply }).await
    }

    pub async fn tileset_info(&self, dataset: DatasetId) -> Result<TilesetInfo> {
        self.call(|reply| Request::TilesetInfo { dataset, reply }).await
    }

    /// The chromosome table a dataset was opened with
    pub async fn chromosomes(&self, dataset: DatasetId) -> Result<Arc<ChromosomeTable>> {
        self.call(|reply| Request::Chromosomes { dataset, reply }).await
    }

    pub async fn fetch_tiles(&self, dataset: DatasetId, tile_ids: Vec<String>) -> Result<HashMap<TileId, TileData>> {
        self.call(|reply| Request::FetchTiles { dataset, tile_ids, reply }).await
    }

    pub async fn encode_visible_tiles(&self, dataset: DatasetId, request: EncodeRequest) -> Result<RenderOutput> {
        self.call(|reply| Request::Encode { dataset, request, reply }).await
    }
}
