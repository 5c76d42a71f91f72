//! Change notification for the stores.
//!
//! Each store family owns a [`ChangeNotifier`]. Listeners run synchronously,
//! in subscription order, after every successful fetch or mutation. A
//! [`Subscription`] removes its listener when dropped, so UI consumers tear
//! down by simply dropping the handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Medications,
    Persons,
    Records { person: String },
}

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Listener list shared by one store family.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    inner: Arc<Mutex<Listeners>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener until the returned handle is dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let mut listeners = self.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription {
            entries: vec![(Arc::downgrade(&self.inner), id)],
        }
    }

    /// Call every listener with `event`.
    ///
    /// The list is copied first, so listeners may subscribe or unsubscribe
    /// while being notified.
    pub fn notify(&self, event: ChangeEvent) {
        let listeners: Vec<Listener> = self
            .lock()
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, Listeners> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle keeping one or more listeners registered.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    entries: Vec<(Weak<Mutex<Listeners>>, u64)>,
}

impl Subscription {
    /// Combine several handles into one.
    pub fn merge(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let mut entries = Vec::new();
        for mut sub in subscriptions {
            entries.append(&mut sub.entries);
        }
        Self { entries }
    }

    /// Remove the listener now.
    pub fn unsubscribe(self) {}

    /// Keep the listener registered for the lifetime of the notifier.
    pub fn detach(mut self) {
        self.entries.clear();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for (notifier, id) in self.entries.drain(..) {
            if let Some(inner) = notifier.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entries
                    .retain(|(entry_id, _)| *entry_id != id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_notify_and_drop() {
        let notifier = ChangeNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let sub = notifier.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        notifier.notify(ChangeEvent::Medications);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        drop(sub);
        notifier.notify(ChangeEvent::Medications);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn test_event_payload() {
        let notifier = ChangeNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _sub = notifier.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        notifier.notify(ChangeEvent::Records {
            person: "person.alice".into(),
        });

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[ChangeEvent::Records {
                person: "person.alice".into()
            }]
        );
    }

    #[test]
    fn test_merge_and_detach() {
        let a = ChangeNotifier::new();
        let b = ChangeNotifier::new();

        let merged = Subscription::merge([a.subscribe(|_| {}), b.subscribe(|_| {})]);
        assert_eq!(a.listener_count(), 1);
        assert_eq!(b.listener_count(), 1);
        merged.unsubscribe();
        assert_eq!(a.listener_count(), 0);
        assert_eq!(b.listener_count(), 0);

        a.subscribe(|_| {}).detach();
        assert_eq!(a.listener_count(), 1);
    }

    #[test]
    fn test_unsubscribe_during_notify() {
        let notifier = ChangeNotifier::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let inner_slot = Arc::clone(&slot);
        let sub = notifier.subscribe(move |_| {
            inner_slot.lock().unwrap().take();
        });
        *slot.lock().unwrap() = Some(sub);

        notifier.notify(ChangeEvent::Persons);
        assert_eq!(notifier.listener_count(), 0);
    }
}
