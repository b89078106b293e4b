//! PDF format support
//!
//! Both rendering and rotation go through MuPDF, so a file that can be
//! rasterized for detection can also be rewritten. Rotation only touches the
//! page `/Rotate` entries.

mod renderer;
mod rotator;

pub use renderer::PdfRasterizer;
pub use rotator::{apply_page_rotations, page_rotations};
