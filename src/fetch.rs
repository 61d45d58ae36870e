use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{Result, ScrapeError};

/// Source of raw page or document content, addressed by endpoint path.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<String>;
}

#[async_trait]
impl<F: Fetch + ?Sized> Fetch for Arc<F> {
    async fn fetch(&self, path: &str) -> Result<String> {
        (**self).fetch(path).await
    }
}

/// Per-path memoization of fetched content.
///
/// Content is assumed static for the life of the cache: entries are never
/// evicted or invalidated, so drop the cache to start a fresh session.
/// Concurrent first requests for one path share a single fetch; failures are
/// not cached.
pub struct FetchCache<F> {
    inner: F,
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<str>>>>>,
}

impl<F: Fetch> FetchCache<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, path: &str) -> Result<Arc<str>> {
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(entries.entry(path.to_string()).or_default())
        };
        let content = cell
            .get_or_try_init(|| async {
                let start = Instant::now();
                let body = self.inner.fetch(path).await?;
                info!(
                    path,
                    bytes = body.len(),
                    ms = start.elapsed().as_millis() as u64,
                    "fetched"
                );
                Ok::<_, ScrapeError>(Arc::from(body))
            })
            .await?;
        Ok(Arc::clone(content))
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Portal over HTTP, authenticated by the browser session cookie.
pub struct HttpFetch {
    client: reqwest::Client,
    base_url: String,
    cookie: Option<String>,
}

impl HttpFetch {
    pub fn new(base_url: &str, cookie: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ScrapeError::fetch(base_url, e))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie,
        })
    }
}

#[async_trait]
impl Fetch for HttpFetch {
    async fn fetch(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if let Some(cookie) = &self.cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        let response = request.send().await.map_err(|e| ScrapeError::fetch(path, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::fetch(path, format!("HTTP {}", status.as_u16())));
        }
        response.text().await.map_err(|e| ScrapeError::fetch(path, e))
    }
}

/// Saved pages or rendered documents on disk, one file per endpoint path.
pub struct DirFetch {
    root: PathBuf,
    extension: &'static str,
}

impl DirFetch {
    pub fn new(root: impl Into<PathBuf>, extension: &'static str) -> Self {
        Self {
            root: root.into(),
            extension,
        }
    }

    /// `/alumno/encuestas/respuestas?encuesta=1&…` → `alumno_encuestas_respuestas_encuesta=1_….html`
    pub fn file_name(&self, path: &str) -> String {
        let stem: String = path
            .trim_start_matches('/')
            .chars()
            .map(|c| if matches!(c, '/' | '?' | '&') { '_' } else { c })
            .collect();
        format!("{}.{}", stem, self.extension)
    }
}

#[async_trait]
impl Fetch for DirFetch {
    async fn fetch(&self, path: &str) -> Result<String> {
        let file = self.root.join(self.file_name(path));
        debug!(file = %file.display(), "reading");
        tokio::fs::read_to_string(&file)
            .await
            .map_err(|e| ScrapeError::fetch(path, format!("{}: {}", file.display(), e)))
    }
}

/// Fixed path → content map.
#[derive(Default)]
pub struct StaticFetch {
    pages: HashMap<String, String>,
    hits: Mutex<Vec<String>>,
}

impl StaticFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, content: impl Into<String>) -> Self {
        self.pages.insert(path.to_string(), content.into());
        self
    }

    /// Paths requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.hits.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Fetch for StaticFetch {
    async fn fetch(&self, path: &str) -> Result<String> {
        self.hits
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_string());
        self.pages
            .get(path)
            .cloned()
            .ok_or_else(|| ScrapeError::fetch(path, "no such page"))
    }
}
