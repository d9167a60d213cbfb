//! Single-fire continuation

use parking_lot::Mutex;
use tokio::sync::oneshot;

type Continuation<T> = Box<dyn FnOnce(T) + Send>;

/// Wraps a callback so that it runs at most once
///
/// Every caller of [`Latch::fire`] after the first gets `false` and its
/// value is dropped. The callback runs outside the internal lock.
pub struct Latch<T> {
    inner: Mutex<Option<Continuation<T>>>,
}

impl<T: Send + 'static> Latch<T> {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        Self {
            inner: Mutex::new(Some(Box::new(callback))),
        }
    }

    /// Latch whose value is delivered through a oneshot channel
    pub fn channel() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let latch = Self::new(move |value| {
            let _ = tx.send(value);
        });
        (latch, rx)
    }

    pub fn fire(&self, value: T) -> bool {
        let callback = self.inner.lock().take();
        match callback {
            Some(callback) => {
                callback(value);
                true
            }
            None => false,
        }
    }

    pub fn is_fired(&self) -> bool {
        self.inner.lock().is_none()
    }
}

impl<T> std::fmt::Debug for Latch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Latch")
            .field("fired", &self.inner.lock().is_none())
            .finish()
    }
}
