//! Character-grid renderer seam
//!
//! The renderer is an external component: it consumes output text, knows
//! the local grid geometry, and is created and disposed only by the
//! [`ConnectionManager`](crate::connection::ConnectionManager).

use htd_protocol::TerminalSize;

/// A live character-grid display
pub trait Renderer: Send {
    /// Draw text exactly as received
    fn write(&mut self, data: &str);

    /// Geometry as last computed
    fn size(&self) -> TerminalSize;

    /// Recompute geometry from the current viewport and return it
    fn fit(&mut self) -> TerminalSize;

    /// Release the display
    fn dispose(&mut self);
}

/// Creates a fresh renderer for every attach
pub trait RendererFactory: Send {
    /// Create a renderer sized to the viewport
    fn create(&mut self) -> Box<dyn Renderer>;
}
