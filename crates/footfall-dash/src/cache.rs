use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use footfall_io::CsvOptions;
use lru::LruCache;
use sha2::{Digest, Sha256};

use crate::error::DashResult;
use crate::session::Session;

const DEFAULT_CAPACITY: usize = 8;

type Fingerprint = [u8; 32];

/// Loaded sessions keyed by a SHA-256 digest of the input bytes.
///
/// A given input is parsed and classified at most once while it stays cached; every caller
/// shares the same read-only [`Session`].
pub struct SessionCache {
    options: CsvOptions,
    sessions: Mutex<LruCache<Fingerprint, Arc<Session>>>,
}

impl SessionCache {
    pub fn new(options: CsvOptions) -> Self {
        Self::with_capacity(options, DEFAULT_CAPACITY)
    }

    /// A zero capacity is treated as one.
    pub fn with_capacity(options: CsvOptions, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            options,
            sessions: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get_or_load(&self, bytes: &[u8]) -> DashResult<Arc<Session>> {
        let key: Fingerprint = Sha256::digest(bytes).into();

        // Held across the load so concurrent callers with the same input parse it once.
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = sessions.get(&key) {
            log::debug!("session cache hit");
            return Ok(Arc::clone(session));
        }

        let session = Arc::new(Session::from_csv_bytes(bytes, &self.options)?);
        sessions.put(key, Arc::clone(&session));
        Ok(session)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
