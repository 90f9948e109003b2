//! Shared rendering context.
//!
//! Hosts that run several scenes on one surface install a single drawing
//! backend here with [`init`]. Scenes then [`acquire`] it (incrementing an
//! attachment count) and [`release`] it when destroyed. [`shutdown`] refuses
//! to tear the context down while scenes are still attached.
//!
//! The engine is single-threaded, so the context lives in thread-local
//! storage of the UI thread.

use std::cell::RefCell;

use crate::backend::SharedBackend;
use crate::error::ContextError;

struct SharedContext {
    backend: SharedBackend,
    attached: usize,
}

thread_local! {
    static CONTEXT: RefCell<Option<SharedContext>> = const { RefCell::new(None) };
}

/// Install the shared backend.
pub fn init(backend: SharedBackend) -> Result<(), ContextError> {
    CONTEXT.with(|context| {
        let mut context = context.borrow_mut();
        if context.is_some() {
            return Err(ContextError::AlreadyInitialized);
        }
        *context = Some(SharedContext {
            backend,
            attached: 0,
        });
        log::info!("Shared render context initialized");
        Ok(())
    })
}

/// Attach to the shared backend.
pub fn acquire() -> Result<SharedBackend, ContextError> {
    CONTEXT.with(|context| {
        let mut context = context.borrow_mut();
        let shared = context.as_mut().ok_or(ContextError::NotInitialized)?;
        shared.attached += 1;
        log::debug!("Render context acquired ({} attached)", shared.attached);
        Ok(shared.backend.clone())
    })
}

/// Detach from the shared backend. Extra releases are ignored.
pub fn release() {
    CONTEXT.with(|context| {
        if let Some(shared) = context.borrow_mut().as_mut() {
            shared.attached = shared.attached.saturating_sub(1);
            log::debug!("Render context released ({} attached)", shared.attached);
        }
    });
}

/// Tear the context down. Fails while scenes are attached.
pub fn shutdown() -> Result<(), ContextError> {
    CONTEXT.with(|context| {
        let mut context = context.borrow_mut();
        match context.as_ref() {
            None => Err(ContextError::NotInitialized),
            Some(shared) if shared.attached > 0 => Err(ContextError::InUse {
                attached: shared.attached,
            }),
            Some(_) => {
                *context = None;
                log::info!("Shared render context shut down");
                Ok(())
            }
        }
    })
}

pub fn is_initialized() -> bool {
    CONTEXT.with(|context| context.borrow().is_some())
}

/// Number of scenes currently attached.
pub fn attached_scenes() -> usize {
    CONTEXT.with(|context| context.borrow().as_ref().map_or(0, |shared| shared.attached))
}
