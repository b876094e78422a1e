use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

use super::{Endpoint, EndpointId};

/// Результат [`TriggerRegistry::unregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Unregistered {
    /// Подписчик был зарегистрирован и удалён этим вызовом.
    pub removed: bool,
    /// Триггер перешёл в состояние без подписчиков.
    pub trigger_emptied: bool,
}

/// Реестр триггеров: имя → живые подписчики в порядке регистрации.
///
/// Единственное разделяемое изменяемое состояние хаба. Блокировка берётся
/// только на изменение и снимок, доставка идёт уже без неё. Порядок
/// блокировок всегда реестр → подписчик.
#[derive(Default)]
pub struct TriggerRegistry {
    entries: Mutex<HashMap<Arc<str>, Vec<Arc<Endpoint>>>>,
    next_id: AtomicU64,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Выделяет монотонный идентификатор подписчика.
    pub fn next_endpoint_id(&self) -> EndpointId {
        EndpointId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Добавляет подписчика. Возвращает `true`, если триггер только что стал
    /// активным.
    pub fn register(
        &self,
        endpoint: Arc<Endpoint>,
    ) -> bool {
        let mut entries = self.entries.lock();
        match entries.get_mut(endpoint.trigger().as_ref()) {
            Some(list) => {
                list.push(endpoint);
                false
            }
            None => {
                entries.insert(endpoint.trigger().clone(), vec![endpoint]);
                true
            }
        }
    }

    /// Удаляет одного подписчика и гасит его в той же критической секции.
    pub fn unregister(
        &self,
        trigger: &str,
        id: EndpointId,
    ) -> Unregistered {
        let mut entries = self.entries.lock();
        let Some(list) = entries.get_mut(trigger) else {
            return Unregistered::default();
        };
        let Some(pos) = list.iter().position(|ep| ep.id() == id) else {
            return Unregistered::default();
        };

        let endpoint = list.remove(pos);
        endpoint.terminate();

        let trigger_emptied = list.is_empty();
        if trigger_emptied {
            entries.remove(trigger);
        }
        Unregistered {
            removed: true,
            trigger_emptied,
        }
    }

    /// Снимок подписчиков для рассылки.
    pub fn snapshot(
        &self,
        trigger: &str,
    ) -> Vec<Arc<Endpoint>> {
        self.entries
            .lock()
            .get(trigger)
            .cloned()
            .unwrap_or_default()
    }

    /// Удаляет запись триггера целиком, гася всех его подписчиков под
    /// блокировкой.
    pub fn remove_trigger(
        &self,
        trigger: &str,
    ) -> Vec<Arc<Endpoint>> {
        let mut entries = self.entries.lock();
        let removed = entries.remove(trigger).unwrap_or_default();
        for endpoint in &removed {
            endpoint.terminate();
        }
        removed
    }

    /// Имена активных триггеров, отсортированные.
    pub fn active_triggers(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self.entries.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(
        &self,
        trigger: &str,
    ) -> bool {
        self.entries.lock().contains_key(trigger)
    }

    pub fn subscriber_count(
        &self,
        trigger: &str,
    ) -> usize {
        self.entries.lock().get(trigger).map_or(0, Vec::len)
    }

    /// Общее количество подписчиков по всем триггерам.
    pub fn endpoint_count(&self) -> usize {
        self.entries.lock().values().map(Vec::len).sum()
    }

    /// Количество активных триггеров.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Drop for TriggerRegistry {
    fn drop(&mut self) {
        for endpoint in self.entries.get_mut().values().flatten() {
            endpoint.terminate();
        }
    }
}
