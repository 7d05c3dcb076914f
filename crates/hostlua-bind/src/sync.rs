//! Sharing one context between owners.
//!
//! A context is single-owner by design. Callers that must drive it from
//! several threads enable the `multithreading` feature and serialize every
//! call through the one mutex in [`SharedContext`]. Without the feature the
//! same API is backed by a `RefCell`.
use crate::context::BridgeContext;

#[cfg(not(feature = "multithreading"))]
pub mod compat {
    use std::cell::{RefCell, RefMut};
    use std::ops::{Deref, DerefMut};

    #[derive(Debug, Default)]
    pub struct Mutex<T>(RefCell<T>);

    impl<T> Mutex<T> {
        pub fn new(t: T) -> Self {
            Self(RefCell::new(t))
        }

        pub fn lock(&self) -> MutexGuard<'_, T> {
            MutexGuard(self.0.borrow_mut())
        }

        pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
            self.0.try_borrow_mut().ok().map(MutexGuard)
        }
    }

    pub struct MutexGuard<'a, T>(RefMut<'a, T>);

    impl<T> Deref for MutexGuard<'_, T> {
        type Target = T;
        fn deref(&self) -> &T {
            &self.0
        }
    }

    impl<T> DerefMut for MutexGuard<'_, T> {
        fn deref_mut(&mut self) -> &mut T {
            &mut self.0
        }
    }
}

#[cfg(not(feature = "multithreading"))]
pub use compat::{Mutex, MutexGuard};
#[cfg(feature = "multithreading")]
pub use parking_lot::{Mutex, MutexGuard};

#[cfg(not(feature = "multithreading"))]
pub type Shared<T> = std::rc::Rc<T>;
#[cfg(feature = "multithreading")]
pub type Shared<T> = std::sync::Arc<T>;

pub type SharedContext = Shared<Mutex<BridgeContext>>;

pub fn share(context: BridgeContext) -> SharedContext {
    Shared::new(Mutex::new(context))
}
