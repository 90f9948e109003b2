//! Resource loading contract and a file-backed loader.
//!
//! Loading is asynchronous: [`ResourceLoader::load`] hands back a future the
//! scene polls once per frame. Retries are the loader's business; the scene
//! never retries a failed load.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use futures_lite::{FutureExt, future};

use crate::error::LoadError;

/// A decoded image as far as the engine is concerned: where it came from
/// and how big it is. Pixel data stays with the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResource {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl ImageResource {
    pub fn new(url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            url: url.into(),
            width,
            height,
        }
    }
}

/// What a load is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadHint {
    /// Needed to paint now
    #[default]
    Media,
    /// Warming the cache ahead of the first paint; not worth retrying
    Prefetch,
}

/// Options for a single load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Attempts after the first one
    pub retries: u32,
    pub hint: LoadHint,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            retries: crate::constants::DEFAULT_RESOURCE_RETRIES,
            hint: LoadHint::default(),
        }
    }
}

/// In-flight load.
pub type LoadFuture = future::BoxedLocal<Result<ImageResource, LoadError>>;

/// Loader shared between a scene and its host.
pub type SharedLoader = Rc<dyn ResourceLoader>;

/// Asset loading contract.
pub trait ResourceLoader {
    /// Start loading `url`; the future resolves once it is decoded.
    fn load(&self, url: &str, options: LoadOptions) -> LoadFuture;

    /// Start loading `url` without waiting for it. The result shows up in
    /// [`ResourceLoader::get`] once ready.
    fn load_background(&self, url: &str, options: LoadOptions);

    /// Already-loaded resource, if any.
    fn get(&self, url: &str) -> Option<ImageResource>;

    /// Forget a loaded resource.
    fn unload(&self, url: &str);
}

/// Loader for images on the local filesystem.
///
/// Only the header is decoded (to learn the dimensions), synchronously; the
/// returned future is always ready.
#[derive(Debug, Default)]
pub struct FileImageLoader {
    cache: RefCell<HashMap<String, ImageResource>>,
}

impl FileImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_dimensions(url: &str) -> Result<ImageResource, LoadError> {
        let path = Path::new(url);
        if !path.exists() {
            return Err(LoadError::NotFound {
                url: url.to_string(),
            });
        }
        let (width, height) =
            image::image_dimensions(path).map_err(|e| LoadError::decode(url, e.to_string()))?;
        Ok(ImageResource::new(url, width, height))
    }

    fn load_with_retries(&self, url: &str, options: LoadOptions) -> Result<ImageResource, LoadError> {
        if let Some(cached) = self.get(url) {
            return Ok(cached);
        }

        let attempts = match options.hint {
            LoadHint::Media => options.retries + 1,
            LoadHint::Prefetch => 1,
        };
        let mut last_error = None;
        for attempt in 1..=attempts {
            match Self::read_dimensions(url) {
                Ok(resource) => {
                    log::debug!(
                        "Loaded '{}' ({}x{}) on attempt {}",
                        url,
                        resource.width,
                        resource.height,
                        attempt
                    );
                    self.cache
                        .borrow_mut()
                        .insert(url.to_string(), resource.clone());
                    return Ok(resource);
                }
                // A missing file will not appear by retrying.
                Err(e @ LoadError::NotFound { .. }) => return Err(e),
                Err(e) => {
                    log::warn!("Load attempt {}/{} for '{}' failed: {}", attempt, attempts, url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(LoadError::RetriesExhausted {
            url: url.to_string(),
            attempts,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

impl ResourceLoader for FileImageLoader {
    fn load(&self, url: &str, options: LoadOptions) -> LoadFuture {
        future::ready(self.load_with_retries(url, options)).boxed_local()
    }

    fn load_background(&self, url: &str, options: LoadOptions) {
        if let Err(e) = self.load_with_retries(url, options) {
            log::warn!("Background load of '{}' failed: {}", url, e);
        }
    }

    fn get(&self, url: &str) -> Option<ImageResource> {
        self.cache.borrow().get(url).cloned()
    }

    fn unload(&self, url: &str) {
        if self.cache.borrow_mut().remove(url).is_some() {
            log::debug!("Unloaded '{}'", url);
        }
    }
}
