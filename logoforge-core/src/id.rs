//! # IDs
//! Two flavors of identifier live here:
//!
//! * [`FuzzID<T>`] is unique within this execution of the program, namespaced by `T`. It is a bare
//!   integer and must never be written to disk or sent anywhere. Background tasks are tracked by these.
//! * [`StableID<T>`] is an opaque string that survives serialization. Elements and layers use these,
//!   since a scene saved today has to load tomorrow with its references intact.

// Next free FuzzID value, per namespace.
static ID_SERVER: parking_lot::RwLock<
    std::collections::BTreeMap<std::any::TypeId, std::sync::atomic::AtomicU64>,
> = parking_lot::const_rwlock(std::collections::BTreeMap::new());

/// ID that is guarunteed unique within this execution of the program.
/// IDs with different types may share a value but should not be considered equal.
pub struct FuzzID<T: std::any::Any> {
    id: std::num::NonZeroU64,
    _phantom: std::marker::PhantomData<T>,
}
impl<T: std::any::Any> FuzzID<T> {
    /// Get the raw numeric value of this ID.
    /// IDs from differing namespaces may share the same numeric ID!
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id.get()
    }
    fn next() -> Self {
        let ty = std::any::TypeId::of::<T>();
        let raw = {
            let read = ID_SERVER.upgradable_read();
            if let Some(counter) = read.get(&ty) {
                counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            } else {
                // First ID of this namespace. Happens once per type, so the exclusive lock is fine.
                let mut write = parking_lot::RwLockUpgradableReadGuard::upgrade(read);
                write
                    .entry(ty)
                    .or_insert_with(|| 1.into())
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            }
        };
        // Zero is only reachable after wrapping all of u64. Not happening.
        let id = std::num::NonZeroU64::new(raw).unwrap_or(std::num::NonZeroU64::MAX);
        Self {
            id,
            _phantom: std::marker::PhantomData,
        }
    }
}
impl<T: std::any::Any> Default for FuzzID<T> {
    fn default() -> Self {
        Self::next()
    }
}
impl<T: std::any::Any> Clone for FuzzID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for FuzzID<T> {}
impl<T: std::any::Any> PartialEq for FuzzID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: std::any::Any> Eq for FuzzID<T> {}
impl<T: std::any::Any> std::hash::Hash for FuzzID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
// Safety - it's a u64 and a marker. T is never stored.
unsafe impl<T: std::any::Any> Send for FuzzID<T> {}
unsafe impl<T: std::any::Any> Sync for FuzzID<T> {}

impl<T: std::any::Any> std::fmt::Display for FuzzID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}#{}",
            std::any::type_name::<T>()
                .rsplit("::")
                .next()
                .unwrap_or_default(),
            self.id
        )
    }
}
impl<T: std::any::Any> std::fmt::Debug for FuzzID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

/// An opaque, serializable identifier namespaced by `T`.
///
/// Generated ids look like `text-4f1c...`, but nothing should parse them - ids loaded from a
/// remote store may have any shape at all.
pub struct StableID<T> {
    raw: std::sync::Arc<str>,
    _phantom: std::marker::PhantomData<fn() -> T>,
}
impl<T> StableID<T> {
    /// Generate a fresh random ID, with a human-readable prefix.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self::from_raw(format!("{prefix}-{}", uuid::Uuid::new_v4().simple()))
    }
    /// Wrap an existing ID, e.g. one read from a file.
    #[must_use]
    pub fn from_raw(raw: impl Into<std::sync::Arc<str>>) -> Self {
        Self {
            raw: raw.into(),
            _phantom: std::marker::PhantomData,
        }
    }
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}
impl<T> Clone for StableID<T> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            _phantom: std::marker::PhantomData,
        }
    }
}
impl<T> PartialEq for StableID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
impl<T> Eq for StableID<T> {}
impl<T> PartialOrd for StableID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for StableID<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}
impl<T> std::hash::Hash for StableID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}
impl<T> std::fmt::Display for StableID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
impl<T> std::fmt::Debug for StableID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", &*self.raw)
    }
}
impl<T> serde::Serialize for StableID<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}
impl<'de, T> serde::Deserialize<'de> for StableID<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = <std::borrow::Cow<'de, str> as serde::Deserialize<'de>>::deserialize(deserializer)?;
        if raw.is_empty() {
            return Err(serde::de::Error::custom("empty identifier"));
        }
        Ok(Self::from_raw(&*raw))
    }
}
