use crate::error::DiscoveryError;
use crate::traits::ImageStore;
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// Shown whenever a place has no usable photo: a 100x100 orange square.
pub const PLACEHOLDER_IMAGE_URI: &str = "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' width='100' height='100'%3E%3Crect width='100' height='100' fill='%23FF4E01'/%3E%3C/svg%3E";

pub const DEFAULT_CACHE_BUDGET_BYTES: usize = 50 * 1024 * 1024;

const IMAGE_HOST: &str = "image";

/// Builds and parses `<scheme>://image/<key>` URIs pointing into an [`ImageStore`].
#[derive(Debug, Clone)]
pub struct ImageUris {
    scheme: String,
}

impl ImageUris {
    pub fn new(scheme: impl Into<String>) -> Result<Self, DiscoveryError> {
        let scheme = scheme.into();
        let parsed = Url::parse(&format!("{scheme}://{IMAGE_HOST}/"))?;
        if parsed.scheme() != scheme {
            return Err(DiscoveryError::Configuration(format!(
                "image uri scheme {scheme:?} is not a valid lowercase url scheme"
            )));
        }
        Ok(Self { scheme })
    }

    pub fn uri_for(&self, key: &str) -> String {
        let segment = utf8_percent_encode(key, NON_ALPHANUMERIC);
        format!("{}://{IMAGE_HOST}/{segment}", self.scheme)
    }

    /// Cache key referenced by `uri`, if it is one of ours.
    pub fn key_of(&self, uri: &str) -> Option<String> {
        let parsed = Url::parse(uri).ok()?;
        if parsed.scheme() != self.scheme || parsed.host_str() != Some(IMAGE_HOST) {
            return None;
        }

        let mut segments = parsed.path_segments()?;
        let segment = segments.next()?;
        if segment.is_empty() || segments.next().is_some() {
            return None;
        }

        percent_decode_str(segment)
            .decode_utf8()
            .ok()
            .map(|key| key.into_owned())
    }
}

/// In-memory photo store bounded by total byte size, evicting least recently used.
#[derive(Debug)]
pub struct MemoryImageCache {
    budget_bytes: usize,
    state: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Vec<u8>>,
    recency: VecDeque<String>,
    used_bytes: usize,
}

impl CacheState {
    fn touch(&mut self, key: &str) {
        self.recency.retain(|existing| existing != key);
        self.recency.push_back(key.to_string());
    }

    fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        let removed = self.entries.remove(key)?;
        self.used_bytes -= removed.len();
        self.recency.retain(|existing| existing != key);
        Some(removed)
    }
}

impl MemoryImageCache {
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            budget_bytes,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.lock().used_bytes
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().remove(key)
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.recency.clear();
        state.used_bytes = 0;
    }

    /// Looks up the bytes behind a cache URI produced by `uris`.
    pub fn resolve(&self, uris: &ImageUris, uri: &str) -> Option<Vec<u8>> {
        uris.key_of(uri).and_then(|key| self.get(&key))
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_BUDGET_BYTES)
    }
}

impl ImageStore for MemoryImageCache {
    fn put(&self, key: &str, bytes: Vec<u8>) {
        let mut state = self.lock();
        state.remove(key);

        if bytes.len() > self.budget_bytes {
            return;
        }

        state.used_bytes += bytes.len();
        state.entries.insert(key.to_string(), bytes);
        state.touch(key);

        while state.used_bytes > self.budget_bytes {
            let Some(oldest) = state.recency.front().cloned() else {
                break;
            };
            state.remove(&oldest);
        }
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut state = self.lock();
        let bytes = state.entries.get(key).cloned()?;
        state.touch(key);
        Some(bytes)
    }
}
