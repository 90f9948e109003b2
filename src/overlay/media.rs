//! The background media overlay.

use annoscene_core::{Rect, Size};

use crate::backend::{DrawStyle, DrawingBackend};
use crate::error::RenderError;
use crate::resources::{ImageResource, ResourceLoader};

use super::{OverlayId, RenderStep, RenderStyle};

/// Background image every spatial overlay is positioned against.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaOverlay {
    url: String,
    original_size: Option<Size>,
    rendered_bounds: Option<Rect>,
    resource: Option<ImageResource>,
    /// Bounds were set by the host and must not be re-fitted
    host_bounds: bool,
}

impl MediaOverlay {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            original_size: None,
            rendered_bounds: None,
            resource: None,
            host_bounds: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Intrinsic image dimensions, once decoded.
    pub fn original_size(&self) -> Option<Size> {
        self.original_size
    }

    /// Pixel rectangle the image is drawn into.
    pub fn rendered_bounds(&self) -> Option<Rect> {
        self.rendered_bounds
    }

    pub fn resource(&self) -> Option<&ImageResource> {
        self.resource.as_ref()
    }

    /// Pin the rendered bounds; automatic fitting stops.
    pub fn set_rendered_bounds(&mut self, bounds: Rect) {
        self.rendered_bounds = Some(bounds);
        self.host_bounds = true;
    }

    /// Largest rectangle with the image's aspect ratio that fits in the
    /// container, centred.
    pub fn fit(image: Size, container: Size) -> Rect {
        if image.is_degenerate() || container.is_degenerate() {
            return Rect::new(0.0, 0.0, container.width, container.height);
        }
        let scale = (container.width / image.width).min(container.height / image.height);
        let width = image.width * scale;
        let height = image.height * scale;
        Rect::new(
            (container.width - width) / 2.0,
            (container.height - height) / 2.0,
            width,
            height,
        )
    }

    pub(super) fn set_resource(&mut self, resource: ImageResource, container: Size) {
        let size = Size::new(resource.width as f32, resource.height as f32);
        self.original_size = Some(size);
        if !self.host_bounds {
            self.rendered_bounds = Some(Self::fit(size, container));
        }
        self.resource = Some(resource);
    }

    pub(super) fn render(
        &mut self,
        id: &OverlayId,
        backend: &mut dyn DrawingBackend,
        loader: &dyn ResourceLoader,
        style: &RenderStyle,
    ) -> Result<RenderStep, RenderError> {
        if self.resource.is_none() {
            match loader.get(&self.url) {
                Some(resource) => self.set_resource(resource, backend.get_container_dimensions()),
                None => {
                    log::debug!("Loading media '{}' for overlay {}", self.url, id);
                    return Ok(RenderStep::Pending(loader.load(&self.url, style.load_options)));
                }
            }
        } else if !self.host_bounds {
            // Follow container resizes.
            if let Some(size) = self.original_size {
                self.rendered_bounds = Some(Self::fit(size, backend.get_container_dimensions()));
            }
        }
        self.draw(id, backend, style)?;
        Ok(RenderStep::Painted)
    }

    pub(super) fn draw(
        &self,
        id: &OverlayId,
        backend: &mut dyn DrawingBackend,
        _style: &RenderStyle,
    ) -> Result<(), RenderError> {
        let (Some(resource), Some(bounds)) = (&self.resource, self.rendered_bounds) else {
            return Ok(());
        };
        backend.clear(id);
        // Media ignores the overlay alpha; it is always fully visible.
        backend.draw_image(id, bounds, resource, &DrawStyle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_wide_image() {
        let fitted = MediaOverlay::fit(Size::new(400.0, 100.0), Size::new(200.0, 200.0));
        assert_eq!(fitted, Rect::new(0.0, 75.0, 200.0, 50.0));
    }

    #[test]
    fn test_fit_tall_image() {
        let fitted = MediaOverlay::fit(Size::new(100.0, 200.0), Size::new(300.0, 100.0));
        assert_eq!(fitted, Rect::new(125.0, 0.0, 50.0, 100.0));
    }

    #[test]
    fn test_host_bounds_win_over_fitting() {
        let mut media = MediaOverlay::new("image.png");
        media.set_rendered_bounds(Rect::new(0.0, 0.0, 200.0, 100.0));
        media.set_resource(ImageResource::new("image.png", 10, 10), Size::new(50.0, 50.0));
        assert_eq!(media.rendered_bounds(), Some(Rect::new(0.0, 0.0, 200.0, 100.0)));
        assert_eq!(media.original_size(), Some(Size::new(10.0, 10.0)));
    }
}
