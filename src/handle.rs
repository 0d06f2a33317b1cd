//! Release-once ownership of a native handle.
//!
//! OpenCL objects are reference counted by hand. Each owning wrapper keeps
//! its handle in a [`Handle`], which performs the matching `clRelease*`
//! call exactly once: on an explicit [`Handle::release`] or on drop,
//! whichever comes first.

use crate::driver::Driver;
use crate::error::{Result, check};
use crate::sys::cl_int;
use log::{debug, error};
use std::fmt;
use std::marker::PhantomData;
use std::os::raw::c_void;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, Ordering};

/// The kind of object a handle refers to, and how to give it back.
pub(crate) trait Kind {
    const NAME: &'static str;

    unsafe fn release(driver: &dyn Driver, raw: *mut c_void) -> cl_int;
}

macro_rules! kinds {
    ($($kind:ident => $name:literal, $release:ident;)*) => {
        $(
            pub(crate) struct $kind;

            impl Kind for $kind {
                const NAME: &'static str = $name;

                unsafe fn release(driver: &dyn Driver, raw: *mut c_void) -> cl_int {
                    unsafe { driver.$release(raw) }
                }
            }
        )*
    };
}

kinds! {
    ContextKind => "context", release_context;
    QueueKind => "command queue", release_command_queue;
    MemKind => "memory object", release_mem_object;
    ProgramKind => "program", release_program;
    KernelKind => "kernel", release_kernel;
    EventKind => "event", release_event;
}

pub(crate) struct Handle<K: Kind> {
    raw: AtomicPtr<c_void>,
    driver: Arc<dyn Driver>,
    _kind: PhantomData<K>,
}

impl<K: Kind> Handle<K> {
    /// Takes ownership of one reference to `raw`, which must be non-null.
    pub(crate) fn new(driver: Arc<dyn Driver>, raw: *mut c_void) -> Self {
        debug_assert!(!raw.is_null());
        debug!("Created {} {:p}", K::NAME, raw);
        Handle {
            raw: AtomicPtr::new(raw),
            driver,
            _kind: PhantomData,
        }
    }

    /// The live native handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle was already released; a null handle is never
    /// forwarded to the runtime.
    pub(crate) fn raw(&self) -> *mut c_void {
        let raw = self.raw.load(Ordering::Acquire);
        if raw.is_null() {
            panic!("use of a released OpenCL {}", K::NAME);
        }
        raw
    }

    pub(crate) fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    #[cfg(test)]
    pub(crate) fn is_released(&self) -> bool {
        self.raw.load(Ordering::Acquire).is_null()
    }

    /// Gives the reference back to the runtime. Only the caller that swaps
    /// the live pointer out reaches the native release; everyone else
    /// returns `Ok(())`.
    pub(crate) fn release(&self) -> Result<()> {
        let raw = self.raw.swap(ptr::null_mut(), Ordering::AcqRel);
        if raw.is_null() {
            return Ok(());
        }
        debug!("Releasing {} {:p}", K::NAME, raw);
        check(unsafe { K::release(self.driver.as_ref(), raw) })
    }
}

impl<K: Kind> Drop for Handle<K> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!("Failed to release {}: {}", K::NAME, e);
        }
    }
}

impl<K: Kind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:p})", K::NAME, self.raw.load(Ordering::Acquire))
    }
}
