use std::{sync::atomic::{AtomicUsize, Ordering}, marker::PhantomData};

/// Structure holding possibly uninitialized data.
///
/// This doesn't lock or synchronise access in any way. Instead it assumes that
/// it is safe to initialize the value multiple times, and keeps only one of
/// the results.
#[derive(Debug)]
pub struct SingleInit<T> {
    cell: AtomicUsize,
    _type: PhantomData<T>,
}

impl<T> SingleInit<T> {
    /// Create a new uninitialized atomic cell.
    pub const fn uninit() -> Self {
        SingleInit {
            cell: AtomicUsize::new(0),
            _type: PhantomData,
        }
    }
}

impl<T> SingleInit<T>
where
    T: Sync,
    Self: 'static,
{
    /// Get stored value, or `None` if it hasn't been initialized yet.
    pub fn get(&self) -> Option<&'static T> {
        let ptr = self.cell.load(Ordering::Acquire);

        if ptr != 0 {
            Some(unsafe { &*(ptr as *const T) })
        } else {
            None
        }
    }

    /// Get stored value, initializing it if necessary.
    ///
    /// If initialisation function fails, the value will be unchanged and
    /// another thread (or the same thread) can safely attempt to initialise it
    /// again.
    pub fn get_or_try_init<E, F>(&self, init: F) -> Result<&'static T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get() {
            return Ok(value);
        }

        // Place value on heap and prevent its destructor from running.
        let value = Box::leak(Box::new(init()?)) as *mut T;

        match self.cell.compare_exchange(
            0, value as usize, Ordering::AcqRel, Ordering::Acquire,
        ) {
            Ok(_) => Ok(unsafe { &*value }),
            Err(old) => {
                // Cell was initialised by another thread in the meantime.
                std::mem::drop(unsafe { Box::from_raw(value) });
                Ok(unsafe { &*(old as *const T) })
            }
        }
    }
}
