use super::{decode, AssetError, AssetFetcher, LoadEvent, LoadRequest, LoadedAsset, TaskId};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Byte source behind the fetcher. `open` returns the reader and the total
/// size when the source knows it.
pub trait AssetSource: Send + Sync {
    fn open(&self, path: &str) -> std::io::Result<(Box<dyn Read + Send>, Option<u64>)>;
}

/// Assets on disk, resolved relative to `root`.
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for FsSource {
    fn open(&self, path: &str) -> std::io::Result<(Box<dyn Read + Send>, Option<u64>)> {
        let file = std::fs::File::open(self.root.join(path))?;
        let total = file.metadata().ok().map(|meta| meta.len()).filter(|len| *len > 0);
        Ok((Box::new(file), total))
    }
}

pub type EventSink = Arc<dyn Fn(LoadEvent) + Send + Sync>;

/// Runs each load on its own worker thread: read in chunks, report
/// progress per chunk, decode, then report the outcome.
pub struct ThreadedFetcher {
    source: Arc<dyn AssetSource>,
    notify: EventSink,
    chunk_size: usize,
}

impl ThreadedFetcher {
    pub fn new(source: Arc<dyn AssetSource>, notify: EventSink) -> Self {
        Self {
            source,
            notify,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl AssetFetcher for ThreadedFetcher {
    fn fetch(&mut self, task: TaskId, request: LoadRequest) {
        let source = Arc::clone(&self.source);
        let notify = Arc::clone(&self.notify);
        let chunk_size = self.chunk_size;
        let path = request.path.clone();

        let spawned = std::thread::Builder::new()
            .name(format!("fetch-{}", task.0))
            .spawn(move || {
                let result = read_all(source.as_ref(), &request.path, chunk_size, |loaded, total| {
                    notify(LoadEvent::Progress { task, loaded, total })
                })
                .and_then(|bytes| decode_guarded(&request, &bytes));
                notify(LoadEvent::Finished { task, result });
            });

        if let Err(source) = spawned {
            log::error!("Failed to spawn fetch worker for {}: {}", path, source);
            (self.notify)(LoadEvent::Finished {
                task,
                result: Err(AssetError::Read { path, source }),
            });
        }
    }
}

/// Decode, turning a decoder panic into an error so the load still finishes.
fn decode_guarded(request: &LoadRequest, bytes: &[u8]) -> Result<LoadedAsset, AssetError> {
    guard(request, || decode::decode(request, bytes))
}

fn guard(
    request: &LoadRequest,
    work: impl FnOnce() -> Result<LoadedAsset, AssetError> + std::panic::UnwindSafe,
) -> Result<LoadedAsset, AssetError> {
    std::panic::catch_unwind(work).unwrap_or_else(|panic| {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "decoder panicked".to_string());
        log::error!("Decoder panicked on {}: {}", request.path, reason);
        Err(AssetError::Malformed {
            path: request.path.clone(),
            reason,
        })
    })
}

fn read_all(
    source: &dyn AssetSource,
    path: &str,
    chunk_size: usize,
    mut on_progress: impl FnMut(u64, Option<u64>),
) -> Result<Vec<u8>, AssetError> {
    let read_error = |source| AssetError::Read {
        path: path.to_string(),
        source,
    };
    let (mut reader, total) = source.open(path).map_err(read_error)?;
    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; chunk_size];
    loop {
        let count = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(count) => count,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(read_error(err)),
        };
        bytes.extend_from_slice(&chunk[..count]);
        on_progress(bytes.len() as u64, total);
    }
    Ok(bytes)
}
