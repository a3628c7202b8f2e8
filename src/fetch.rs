//! Retrieving resource bytes named by URI, off the render thread.

use std::{fs, io, path::PathBuf, sync::Arc, thread};

use url::Url;

use crate::{queue::TaskSender, Result};

/// Errors related to [Fetchers](Fetcher).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("expected file, found directory: {0:?}")]
    IsADirectory(PathBuf),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error("unsupported URI scheme: {0:?}")]
    UnsupportedUriScheme(String),
    #[error("URI does not name a local path: {0}")]
    NotAPath(Url),
}

/// Retrieves the bytes behind a URI. Called from background threads.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, uri: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Reads `file:` URIs from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl Fetcher for FileFetcher {
    #[tracing::instrument(level = "debug", skip(self), fields(uri = uri.as_str()))]
    fn fetch(&self, uri: &Url) -> Result<Vec<u8>, FetchError> {
        if uri.scheme() != "file" {
            return Err(FetchError::UnsupportedUriScheme(uri.scheme().to_owned()));
        }
        let path = uri
            .to_file_path()
            .map_err(|()| FetchError::NotAPath(uri.clone()))?;
        if path.is_dir() {
            return Err(FetchError::IsADirectory(path));
        }
        let bytes = fs::read(&path)?;
        tracing::debug!(len = bytes.len(), "read file");
        Ok(bytes)
    }
}

#[inline]
pub fn parse_uri(uri: &str) -> Result<Url, FetchError> {
    Url::parse(uri).map_err(FetchError::from)
}

/// Fetch `uri` on a new thread, run `process` on the bytes there, then queue `deliver` with
/// the outcome.
///
/// # Errors
///
/// * [`Io`](FetchError::Io) if the thread couldn't be spawned.
pub fn spawn_fetch<C, T, P, D>(
    fetcher: Arc<dyn Fetcher>,
    uri: Url,
    tasks: TaskSender<C>,
    process: P,
    deliver: D,
) -> Result<(), FetchError>
where
    C: 'static,
    T: Send + 'static,
    P: FnOnce(Vec<u8>) -> Result<T> + Send + 'static,
    D: FnOnce(&mut C, Result<T>) -> Result<()> + Send + 'static,
{
    thread::Builder::new()
        .name(format!("fetch {uri}"))
        .spawn(move || {
            tracing::debug!(uri = uri.as_str(), "fetching");
            let result = fetcher
                .fetch(&uri)
                .map_err(crate::Error::from)
                .and_then(process);
            tasks.push(move |cx| deliver(cx, result));
        })?;
    Ok(())
}
