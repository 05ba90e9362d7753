//! Scratch-buffer pool shared by a writer's record handles.

use std::sync::Mutex;

/// Largest buffer capacity the pool will retain.  Buffers grown past this
/// by one oversized record are dropped on release so the pool's worst-case
/// retained memory stays bounded.
pub const MAX_REUSE_SIZE: usize = 1 << 18;

/// Hand-out/return pool of record backing buffers.
///
/// Acquire and release are safe to call concurrently; an individual buffer
/// is only ever touched by one record handle between the two.
#[derive(Debug, Default)]
pub struct BufferPool {
    slots: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cleared buffer, recycled if one is available.
    pub fn acquire(&self) -> Vec<u8> {
        self.lock().pop().unwrap_or_default()
    }

    /// Returns a buffer to the pool, or drops it if its capacity exceeds
    /// [`MAX_REUSE_SIZE`].
    pub fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() > MAX_REUSE_SIZE {
            return;
        }
        buf.clear();
        self.lock().push(buf);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<u8>>> {
        // The slots are plain byte buffers; a panicking peer cannot leave
        // them inconsistent, so a poisoned lock is still usable.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recycles_small_buffers() {
        let pool = BufferPool::new();
        let mut buf = pool.acquire();
        buf.extend_from_slice(b"hello world");
        let cap = buf.capacity();
        pool.release(buf);

        let buf = pool.acquire();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), cap);
    }

    #[test]
    fn drops_oversized_buffers() {
        let pool = BufferPool::new();
        let mut buf = pool.acquire();
        buf.resize(MAX_REUSE_SIZE + 1, 0);
        pool.release(buf);

        assert!(pool.acquire().capacity() <= MAX_REUSE_SIZE);
    }

    #[test]
    fn concurrent_acquire_release() {
        use std::sync::Arc;

        let pool = Arc::new(BufferPool::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let mut buf = pool.acquire();
                        buf.extend_from_slice(&[0u8; 64]);
                        pool.release(buf);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
