//! Identity cache between host instances and script-side proxies.
//!
//! Reference instances map to exactly one live key. Types and enum values are
//! immutable and are deduplicated the same way. Value-type copies are never
//! deduplicated; each translation boxes a fresh entry, which setters update in
//! place.
use crate::metrics::BindingMetrics;
use hostlua_types::{HostValue, ObjectRef, TypeDescription};
use hostlua_value::{CacheTag, ProxyKey, ProxyRef};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

static NEXT_TAG: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdentityKey {
    Reference(usize),
    Type(TypeDescription),
    Enum(TypeDescription, i64),
}

impl IdentityKey {
    fn of(value: &HostValue) -> Option<Self> {
        match value {
            HostValue::Object(o) => Some(IdentityKey::Reference(o.as_ptr())),
            HostValue::Type(t) => Some(IdentityKey::Type(t.clone())),
            HostValue::Enum { ty, value } => Some(IdentityKey::Enum(ty.clone(), *value)),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: HostValue,
    ty: TypeDescription,
    identity: Option<IdentityKey>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Debug)]
pub struct ObjectTranslator {
    tag: CacheTag,
    slots: Vec<Slot>,
    free: Vec<u32>,
    reverse: HashMap<IdentityKey, ProxyKey>,
    metrics: Arc<BindingMetrics>,
}

impl ObjectTranslator {
    pub fn new(metrics: Arc<BindingMetrics>) -> Self {
        Self {
            tag: CacheTag(NEXT_TAG.fetch_add(1, Ordering::Relaxed)),
            slots: vec![],
            free: vec![],
            reverse: HashMap::new(),
            metrics,
        }
    }

    pub fn tag(&self) -> CacheTag {
        self.tag
    }

    /// Returns the proxy for `value`, reusing the live key of an already
    /// translated instance. `ty` is the runtime type used for dispatch.
    pub fn translate(&mut self, value: HostValue, ty: &TypeDescription) -> ProxyRef {
        let identity = IdentityKey::of(&value);
        if let Some(key) = identity.as_ref().and_then(|id| self.reverse.get(id)).copied() {
            if let Some(entry) = self.entry(key) {
                self.metrics.record_cache_hit();
                return ProxyRef {
                    key,
                    ty: entry.ty.clone(),
                    tag: self.tag,
                };
            }
        }
        self.metrics.record_cache_miss();

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let key = ProxyKey {
            index,
            generation: slot.generation,
        };
        if let Some(id) = &identity {
            self.reverse.insert(id.clone(), key);
        }
        slot.entry = Some(Entry {
            value,
            ty: ty.clone(),
            identity,
        });
        ProxyRef {
            key,
            ty: ty.clone(),
            tag: self.tag,
        }
    }

    fn entry(&self, key: ProxyKey) -> Option<&Entry> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    /// Instance behind a key, or `None` once it has been released.
    pub fn get(&self, key: ProxyKey) -> Option<&HostValue> {
        self.entry(key).map(|e| &e.value)
    }

    /// Like [`get`](Self::get) but also checks that the proxy was minted by
    /// this cache.
    pub fn resolve(&self, proxy: &ProxyRef) -> Option<&HostValue> {
        if proxy.tag != self.tag {
            return None;
        }
        self.get(proxy.key)
    }

    pub fn owns(&self, proxy: &ProxyRef) -> bool {
        self.resolve(proxy).is_some()
    }

    /// Live key of an instance, if it has one.
    pub fn find_key(&self, value: &HostValue) -> Option<ProxyKey> {
        let key = *self.reverse.get(&IdentityKey::of(value)?)?;
        self.entry(key).map(|_| key)
    }

    /// Replaces the boxed value behind `key`. Used to write mutated value-type
    /// copies back so later reads observe the change.
    pub fn update(&mut self, key: ProxyKey, value: HostValue) -> bool {
        let Some(slot) = self.slots.get_mut(key.index as usize) else {
            return false;
        };
        if slot.generation != key.generation {
            return false;
        }
        match slot.entry.as_mut() {
            Some(entry) => {
                entry.value = value;
                true
            }
            None => false,
        }
    }

    /// Drops the entry behind `key`. Releasing a stale key is a no-op.
    pub fn release(&mut self, key: ProxyKey) -> Option<HostValue> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        if let Some(id) = &entry.identity {
            if self.reverse.get(id) == Some(&key) {
                self.reverse.remove(id);
            }
        }
        self.metrics.record_cache_release();
        tracing::trace!(key = %key, type_name = %entry.ty, "released proxy");
        Some(entry.value)
    }

    /// Host-side disposal of an instance.
    pub fn release_instance(&mut self, instance: &ObjectRef) -> bool {
        let id = IdentityKey::Reference(instance.as_ptr());
        match self.reverse.get(&id).copied() {
            Some(key) => self.release(key).is_some(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlua_types::{Object, TypeRegistry};

    fn fixture() -> (TypeRegistry, ObjectTranslator) {
        (
            TypeRegistry::new(),
            ObjectTranslator::new(Arc::new(BindingMetrics::new())),
        )
    }

    #[test]
    fn test_same_instance_same_key() {
        let (registry, mut cache) = fixture();
        let ty = registry.class_builder("Game", "Thing").build();
        let obj = ObjectRef::new(Object::new(&ty));
        let a = cache.translate(HostValue::Object(obj.clone()), &ty);
        let b = cache.translate(HostValue::Object(obj.clone()), &ty);
        assert_eq!(a.key, b.key);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.find_key(&HostValue::Object(obj)), Some(a.key));
    }

    #[test]
    fn test_released_key_resolves_absent_and_is_not_reused() {
        let (registry, mut cache) = fixture();
        let ty = registry.class_builder("Game", "Thing").build();
        let first = ObjectRef::new(Object::new(&ty));
        let proxy = cache.translate(HostValue::Object(first), &ty);
        assert!(cache.release(proxy.key).is_some());
        assert!(cache.resolve(&proxy).is_none());
        assert!(cache.release(proxy.key).is_none());

        let second = ObjectRef::new(Object::new(&ty));
        let newer = cache.translate(HostValue::Object(second), &ty);
        assert_eq!(newer.key.index, proxy.key.index);
        assert!(cache.resolve(&proxy).is_none());
        assert!(cache.resolve(&newer).is_some());
    }

    #[test]
    fn test_value_types_get_fresh_keys() {
        let (registry, mut cache) = fixture();
        let ty = registry.struct_builder("Game", "Vec2").build();
        let value = HostValue::ValueType(Box::new(Object::new(&ty)));
        let a = cache.translate(value.clone(), &ty);
        let b = cache.translate(value, &ty);
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn test_foreign_proxy_is_not_owned() {
        let (registry, mut cache) = fixture();
        let mut other = ObjectTranslator::new(Arc::new(BindingMetrics::new()));
        let ty = registry.class_builder("Game", "Thing").build();
        let proxy = other.translate(HostValue::Object(ObjectRef::new(Object::new(&ty))), &ty);
        let _ = cache.translate(HostValue::Object(ObjectRef::new(Object::new(&ty))), &ty);
        assert!(other.owns(&proxy));
        assert!(!cache.owns(&proxy));
    }

    #[test]
    fn test_update_replaces_entry() {
        let (registry, mut cache) = fixture();
        let ty = registry.struct_builder("Game", "Vec2").build();
        let proxy = cache.translate(HostValue::ValueType(Box::new(Object::new(&ty))), &ty);
        assert!(cache.update(proxy.key, HostValue::Int32(5)));
        assert_eq!(cache.get(proxy.key), Some(&HostValue::Int32(5)));
    }

    #[test]
    fn test_host_side_release() {
        let (registry, mut cache) = fixture();
        let ty = registry.class_builder("Game", "Thing").build();
        let obj = ObjectRef::new(Object::new(&ty));
        let proxy = cache.translate(HostValue::Object(obj.clone()), &ty);
        assert!(cache.release_instance(&obj));
        assert!(cache.get(proxy.key).is_none());
        assert!(!cache.release_instance(&obj));
    }
}
