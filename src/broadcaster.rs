//! A registry of callbacks that can be deregistered by dropping a handle,
//! used to fan incoming packets and interface events out to subscribers
//! without the broadcaster needing to know who they are.

use std::sync::{
  Arc,
  Mutex,
  Weak,
};

struct Inner<T> {
  next_id: u64,
  listeners: Vec<(u64, Box<dyn FnMut(&T) + Send>)>,
}

/// Registry of listeners for events of type `T`. Cloning shares the same
/// underlying registry.
#[derive(Clone)]
pub struct Broadcaster<T> {
  inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Default for Broadcaster<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Broadcaster<T> {
  /// An empty registry.
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        next_id: 0,
        listeners: Vec::new(),
      })),
    }
  }

  /// Register a callback. The returned handle deregisters it on drop.
  #[must_use = "dropping the returned handle immediately deregisters the listener"]
  pub fn listen(&self, callback: impl FnMut(&T) + Send + 'static) -> ListenerHandle<T> {
    let mut inner = self.inner.lock().unwrap();
    let id = inner.next_id;
    inner.next_id += 1;
    inner.listeners.push((id, Box::new(callback)));
    ListenerHandle {
      id,
      inner: Arc::downgrade(&self.inner),
    }
  }

  /// Invoke every registered listener with `event`.
  pub fn notify(&self, event: &T) {
    let mut inner = self.inner.lock().unwrap();
    for (_, listener) in &mut inner.listeners {
      listener(event);
    }
  }

  /// Number of currently registered listeners. Exposed for tests.
  pub fn listener_count(&self) -> usize {
    self.inner.lock().unwrap().listeners.len()
  }
}

/// Deregisters its listener when dropped.
pub struct ListenerHandle<T> {
  id: u64,
  inner: Weak<Mutex<Inner<T>>>,
}

impl<T> Drop for ListenerHandle<T> {
  fn drop(&mut self) {
    if let Some(inner) = self.inner.upgrade() {
      inner.lock().unwrap().listeners.retain(|(id, _)| *id != self.id);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{
      AtomicUsize,
      Ordering,
    },
    Arc,
  };

  use pretty_assertions::assert_eq;
  use test_log::test;

  use super::Broadcaster;

  #[test]
  fn notifies_registered_listeners() {
    let broadcaster: Broadcaster<u32> = Broadcaster::new();
    let seen = Arc::new(AtomicUsize::new(0));
    let seen_clone = seen.clone();
    let handle = broadcaster.listen(move |value| {
      seen_clone.fetch_add(*value as usize, Ordering::SeqCst);
    });
    broadcaster.notify(&3);
    broadcaster.notify(&4);
    assert_eq!(seen.load(Ordering::SeqCst), 7);
    drop(handle);
    assert_eq!(broadcaster.listener_count(), 0);
  }

  #[test]
  fn dropping_handle_deregisters() {
    let broadcaster: Broadcaster<u32> = Broadcaster::new();
    let handle = broadcaster.listen(|_| {});
    assert_eq!(broadcaster.listener_count(), 1);
    drop(handle);
    assert_eq!(broadcaster.listener_count(), 0);
  }
}
