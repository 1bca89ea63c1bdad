//! Key-value settings store and typed access to the stored settings.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chat_logging::chat_warn;
use chatvoice_core::{
    ExtensionEnabled, FilterStoreError, SpeechTemplate, StoredValue, TtsRate, TtsVoice, TtsVolume,
};
use serde_json::Value;
use thiserror::Error;

use crate::persist::PersistError;

pub type SubscriptionId = u64;
pub type Listener = Arc<dyn Fn(Option<&Value>) + Send + Sync>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize `{key}`: {message}")]
    Serialize { key: String, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Filters(#[from] FilterStoreError),
}

pub trait SettingsStore: Send + Sync {
    /// Current value without waiting on any pending write.
    fn get_snapshot(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// `listener` runs after every write to `key`, on the writer's thread.
    fn subscribe(&self, key: &str, listener: Listener) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}

struct Subscription {
    id: SubscriptionId,
    key: String,
    listener: Listener,
}

#[derive(Default)]
struct MemoryInner {
    values: BTreeMap<String, Value>,
    subscriptions: Vec<Subscription>,
    next_subscription: SubscriptionId,
}

/// In-process store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: BTreeMap<String, Value>) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                values,
                ..MemoryInner::default()
            }),
        }
    }

    /// Every stored key and value.
    pub fn snapshot_all(&self) -> BTreeMap<String, Value> {
        self.lock().values.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SettingsStore for MemoryStore {
    fn get_snapshot(&self, key: &str) -> Option<Value> {
        self.lock().values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let listeners: Vec<Listener> = {
            let mut inner = self.lock();
            inner.values.insert(key.to_string(), value.clone());
            inner
                .subscriptions
                .iter()
                .filter(|s| s.key == key)
                .map(|s| s.listener.clone())
                .collect()
        };
        for listener in listeners {
            listener(Some(&value));
        }
        Ok(())
    }

    fn subscribe(&self, key: &str, listener: Listener) -> SubscriptionId {
        let mut inner = self.lock();
        inner.next_subscription += 1;
        let id = inner.next_subscription;
        inner.subscriptions.push(Subscription {
            id,
            key: key.to_string(),
            listener,
        });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().subscriptions.retain(|s| s.id != id);
    }
}

/// Stored value under `T::KEY`, or the default when missing or malformed.
pub fn load<T: StoredValue>(store: &dyn SettingsStore) -> T {
    match store.get_snapshot(T::KEY) {
        Some(value) => decode_or_default(value),
        None => T::default(),
    }
}

pub fn save<T: StoredValue>(store: &dyn SettingsStore, value: &T) -> Result<(), StoreError> {
    let encoded = serde_json::to_value(value).map_err(|err| StoreError::Serialize {
        key: T::KEY.to_string(),
        message: err.to_string(),
    })?;
    store.set(T::KEY, encoded)
}

/// Subscribes with a typed callback; malformed writes arrive as the default.
pub fn subscribe_typed<T, F>(store: &dyn SettingsStore, on_change: F) -> SubscriptionId
where
    T: StoredValue,
    F: Fn(T) + Send + Sync + 'static,
{
    store.subscribe(
        T::KEY,
        Arc::new(move |value| {
            let decoded = match value {
                Some(value) => decode_or_default(value.clone()),
                None => T::default(),
            };
            on_change(decoded);
        }),
    )
}

fn decode_or_default<T: StoredValue>(value: Value) -> T {
    serde_json::from_value(value).unwrap_or_else(|err| {
        chat_warn!("Ignoring malformed `{}`: {}", T::KEY, err);
        T::default()
    })
}

/// Keeps the latest decoded value of one key. Readers get a cheap `Arc`
/// snapshot; the subscription is dropped with the cache.
pub struct SettingsCache<T: StoredValue> {
    store: Arc<dyn SettingsStore>,
    current: Arc<RwLock<Arc<T>>>,
    subscription: SubscriptionId,
}

impl<T: StoredValue> SettingsCache<T> {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        let current = Arc::new(RwLock::new(Arc::new(load::<T>(store.as_ref()))));
        let slot = current.clone();
        let subscription = subscribe_typed::<T, _>(store.as_ref(), move |value| {
            if let Ok(mut guard) = slot.write() {
                *guard = Arc::new(value);
            }
        });
        Self {
            store,
            current,
            subscription,
        }
    }

    pub fn get(&self) -> Arc<T> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl<T: StoredValue> Drop for SettingsCache<T> {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}

/// Flips the global enabled flag and returns the new state.
pub fn toggle_enabled(store: &dyn SettingsStore) -> Result<bool, StoreError> {
    let next = load::<ExtensionEnabled>(store).toggled();
    save(store, &next)?;
    Ok(next.enabled)
}

pub fn set_enabled(store: &dyn SettingsStore, enabled: bool) -> Result<(), StoreError> {
    save(store, &ExtensionEnabled { enabled })
}

/// `None` or an empty string restores the default template.
pub fn set_speech_template(store: &dyn SettingsStore, template: Option<String>) -> Result<(), StoreError> {
    let template = template.filter(|t| !t.is_empty());
    save(store, &SpeechTemplate { template })
}

pub fn set_rate(store: &dyn SettingsStore, rate: f32) -> Result<TtsRate, StoreError> {
    let rate = TtsRate::new(rate);
    save(store, &rate)?;
    Ok(rate)
}

pub fn set_volume(store: &dyn SettingsStore, volume: f32) -> Result<TtsVolume, StoreError> {
    let volume = TtsVolume::new(volume);
    save(store, &volume)?;
    Ok(volume)
}

pub fn set_voice(store: &dyn SettingsStore, uri: Option<String>) -> Result<(), StoreError> {
    save(store, &TtsVoice { uri })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn missing_and_malformed_values_fall_back() {
        let store = MemoryStore::new();
        assert_eq!(load::<TtsRate>(&store), TtsRate::default());
        store
            .set(TtsRate::KEY, serde_json::json!({"rate": "fast"}))
            .unwrap();
        assert_eq!(load::<TtsRate>(&store), TtsRate::default());
    }

    #[test]
    fn listeners_fire_for_their_key_until_unsubscribed() {
        let store = MemoryStore::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let id = store.subscribe(
            "a",
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        store.set("a", Value::from(1)).unwrap();
        store.set("b", Value::from(1)).unwrap();
        store.unsubscribe(id);
        store.set("a", Value::from(2)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cache_tracks_writes() {
        let store: Arc<dyn SettingsStore> = Arc::new(MemoryStore::new());
        let cache = SettingsCache::<SpeechTemplate>::new(store.clone());
        assert_eq!(cache.get().template, None);
        set_speech_template(store.as_ref(), Some("%(body)".into())).unwrap();
        assert_eq!(cache.get().effective(), "%(body)");
        set_speech_template(store.as_ref(), Some(String::new())).unwrap();
        assert_eq!(cache.get().template, None);
    }

    #[test]
    fn toggle_starts_from_enabled() {
        let store = MemoryStore::new();
        assert!(!toggle_enabled(&store).unwrap());
        assert!(toggle_enabled(&store).unwrap());
    }
}
