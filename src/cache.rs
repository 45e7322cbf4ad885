//! Result Cache Module
//! Time-bounded memoization of loader and aggregator results.
//!
//! Entries are keyed by an operation name plus the exact parameter values and
//! expire purely by elapsed time since insertion. There is no size bound: the
//! dashboard only ever asks a handful of query shapes. The cache is an
//! ordinary value owned by the service and lives as long as the process.

use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to; used to test expiry.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// One typed parameter value taking part in a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheParam {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<bool> for CacheParam {
    fn from(v: bool) -> Self {
        CacheParam::Bool(v)
    }
}

impl From<i64> for CacheParam {
    fn from(v: i64) -> Self {
        CacheParam::Int(v)
    }
}

impl From<&str> for CacheParam {
    fn from(v: &str) -> Self {
        CacheParam::Text(v.to_string())
    }
}

impl From<String> for CacheParam {
    fn from(v: String) -> Self {
        CacheParam::Text(v)
    }
}

impl fmt::Display for CacheParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheParam::Bool(v) => write!(f, "{v}"),
            CacheParam::Int(v) => write!(f, "{v}"),
            CacheParam::Text(v) => write!(f, "{v:?}"),
        }
    }
}

/// Structural key: operation name plus ordered, typed parameters.
///
/// Keys compare by value, so `("top", [2000, 2001, 5])` and
/// `("top", [2000, 20015])` can never collide the way concatenated strings do.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: String,
    params: Vec<CacheParam>,
}

impl CacheKey {
    pub fn new(operation: &str, params: &[CacheParam]) -> Self {
        Self {
            operation: operation.to_string(),
            params: params.to_vec(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.operation)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str(")")
    }
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    inserted_at: Instant,
    ttl: Duration,
}

/// Memoizes producer results per key until their TTL runs out.
pub struct ResultCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Return the cached value for `(operation, params)` or compute it.
    ///
    /// A hit requires an entry younger than `ttl` holding a `T`. On a miss the
    /// producer runs without any lock held and its value is stored with the
    /// current time. Producer errors are returned untouched and not stored.
    /// Two racing misses may both run the producer; the later insert wins.
    pub fn get_or_compute<T, E, F>(
        &self,
        operation: &str,
        params: &[CacheParam],
        ttl: Duration,
        producer: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        let key = CacheKey::new(operation, params);

        if let Some(value) = self.lookup::<T>(&key, ttl) {
            trace!(key = %key, "cache hit");
            return Ok(value);
        }

        debug!(key = %key, "cache miss");
        let value = producer()?;

        let entry = CacheEntry {
            value: Arc::new(value.clone()),
            inserted_at: self.clock.now(),
            ttl,
        };
        self.entries.write().insert(key, entry);
        Ok(value)
    }

    fn lookup<T: Clone + 'static>(&self, key: &CacheKey, ttl: Duration) -> Option<T> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        let age = self.clock.now().saturating_duration_since(entry.inserted_at);
        if age >= ttl {
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Drop every entry of one operation. Returns how many were removed.
    pub fn invalidate(&self, operation: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| key.operation() != operation);
        before - entries.len()
    }

    /// Drop entries whose own TTL has run out.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| now.saturating_duration_since(e.inserted_at) < e.ttl);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
