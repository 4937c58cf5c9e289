//! 服务容器：按字符串 id 注册工厂，首次 get 时懒创建并缓存为单例
//!
//! 每个 id 一个槽位（slot），"查缓存 → 否则构造并缓存" 在槽位锁内完成，
//! 并发的首次 get 只会触发一次工厂调用。工厂失败不缓存，下一次 get 会重试。
//! 工厂内不能 get 自身 id（会在槽位锁上死锁）。

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::ContainerError;

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&ServiceContainer) -> anyhow::Result<Instance> + Send + Sync>;
type Slot = Arc<Mutex<Option<Instance>>>;

/// 服务容器。启动时 `register`，之后以 `&ServiceContainer` / `Arc<ServiceContainer>` 注入到调用链
///
/// 服务值需 `Clone`（通常是 `Arc<...>` 句柄），`get` 返回缓存值的克隆，
/// 因此两次 `get` 拿到的 Arc 指向同一实例。
#[derive(Default)]
pub struct ServiceContainer {
    factories: HashMap<String, Factory>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工厂；同一 id 重复注册时覆盖旧工厂，并丢弃已缓存的旧实例
    pub fn register<T, F>(&mut self, id: impl Into<String>, factory: F)
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&ServiceContainer) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let id = id.into();
        let factory: Factory = Arc::new(move |c: &ServiceContainer| {
            factory(c).map(|value| Arc::new(value) as Instance)
        });
        if self.factories.insert(id.clone(), factory).is_some() {
            tracing::debug!(service = %id, "service factory replaced");
        }
        self.slots
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// 注册已构造好的值（工厂直接返回它的克隆）
    pub fn register_instance<T>(&mut self, id: impl Into<String>, value: T)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.register(id, move |_| Ok(value.clone()));
    }

    /// 取服务：命中缓存直接返回，否则调用工厂一次并缓存
    pub fn get<T>(&self, id: &str) -> Result<T, ContainerError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let factory = self
            .factories
            .get(id)
            .cloned()
            .ok_or_else(|| ContainerError::ServiceNotFound(id.to_string()))?;

        let slot = lock(&self.slots)
            .entry(id.to_string())
            .or_default()
            .clone();

        let instance = {
            let mut cached = lock(&slot);
            match cached.as_ref() {
                Some(instance) => instance.clone(),
                None => {
                    tracing::debug!(service = %id, "instantiating service");
                    let created = factory(self).map_err(|source| ContainerError::ServiceCreation {
                        id: id.to_string(),
                        source,
                    })?;
                    *cached = Some(created.clone());
                    created
                }
            }
        };

        instance
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ContainerError::TypeMismatch {
                id: id.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// 是否已注册（无论是否已实例化），不会触发构造
    pub fn has(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// 是否已实例化
    pub fn is_instantiated(&self, id: &str) -> bool {
        let slot = lock(&self.slots).get(id).cloned();
        slot.map(|slot| lock(&slot).is_some()).unwrap_or(false)
    }

    /// 已注册的全部 id（已排序）
    pub fn service_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("services", &self.service_ids())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[derive(Debug)]
    struct Probe {
        label: String,
    }

    #[test]
    fn test_get_returns_cached_instance() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut container = ServiceContainer::new();
        container.register("probe", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Probe { label: "a".into() }))
        });

        let first: Arc<Probe> = container.get("probe").unwrap();
        let second: Arc<Probe> = container.get("probe").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.label, "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_get_unregistered_fails() {
        let container = ServiceContainer::new();
        let err = container.get::<Arc<Probe>>("missing").unwrap_err();
        assert!(matches!(err, ContainerError::ServiceNotFound(id) if id == "missing"));
    }

    #[test]
    fn test_failed_factory_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut container = ServiceContainer::new();
        container.register("flaky", move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("first attempt fails");
            }
            Ok(Arc::new(Probe { label: "ok".into() }))
        });

        let err = container.get::<Arc<Probe>>("flaky").unwrap_err();
        match err {
            ContainerError::ServiceCreation { id, source } => {
                assert_eq!(id, "flaky");
                assert!(source.to_string().contains("first attempt"));
            }
            other => panic!("Expected ServiceCreation, got {other:?}"),
        }
        assert!(!container.is_instantiated("flaky"));

        let probe: Arc<Probe> = container.get("flaky").unwrap();
        assert_eq!(probe.label, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_has_does_not_instantiate() {
        let mut container = ServiceContainer::new();
        container.register("lazy", |_| Ok(Arc::new(Probe { label: "x".into() })));
        assert!(container.has("lazy"));
        assert!(!container.has("other"));
        assert!(!container.is_instantiated("lazy"));
        let _: Arc<Probe> = container.get("lazy").unwrap();
        assert!(container.is_instantiated("lazy"));
    }

    #[test]
    fn test_register_replaces_factory_and_drops_cache() {
        let mut container = ServiceContainer::new();
        container.register("svc", |_| Ok(Arc::new(Probe { label: "old".into() })));
        let old: Arc<Probe> = container.get("svc").unwrap();
        assert_eq!(old.label, "old");

        container.register("svc", |_| Ok(Arc::new(Probe { label: "new".into() })));
        let new: Arc<Probe> = container.get("svc").unwrap();
        assert_eq!(new.label, "new");
        assert_eq!(container.service_ids(), vec!["svc".to_string()]);
    }

    #[test]
    fn test_type_mismatch() {
        let mut container = ServiceContainer::new();
        container.register_instance("name", "triage".to_string());
        let err = container.get::<Arc<Probe>>("name").unwrap_err();
        assert!(matches!(err, ContainerError::TypeMismatch { .. }));
        let name: String = container.get("name").unwrap();
        assert_eq!(name, "triage");
    }

    #[test]
    fn test_factory_can_resolve_dependencies() {
        let mut container = ServiceContainer::new();
        container.register_instance("prefix", "dep".to_string());
        container.register("composite", |c: &ServiceContainer| {
            let prefix: String = c.get("prefix")?;
            Ok(Arc::new(Probe {
                label: format!("{prefix}-composite"),
            }))
        });
        let probe: Arc<Probe> = container.get("composite").unwrap();
        assert_eq!(probe.label, "dep-composite");
    }

    #[test]
    fn test_concurrent_first_get_constructs_once() {
        const THREADS: usize = 16;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut container = ServiceContainer::new();
        container.register("gemini", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(Arc::new(Probe { label: "llm".into() }))
        });

        let barrier = Barrier::new(THREADS);
        let (barrier, container) = (&barrier, &container);
        let instances: Vec<Arc<Probe>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(move || {
                        barrier.wait();
                        container.get::<Arc<Probe>>("gemini").unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
