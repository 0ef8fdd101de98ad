pub mod python;
pub mod types;

use anyhow::Result;
use std::path::Path;

pub use types::{DocDiag, LayoutIn, LayoutOut, PageOut, SpanOut};

/// Source of per-page text and layout for one PDF.
pub trait LayoutEngine {
    fn doctor(&self) -> Result<DocDiag>;
    fn extract_layout(&self, req: &LayoutIn) -> Result<LayoutOut>;
}

impl<E: LayoutEngine + ?Sized> LayoutEngine for &E {
    fn doctor(&self) -> Result<DocDiag> {
        (**self).doctor()
    }

    fn extract_layout(&self, req: &LayoutIn) -> Result<LayoutOut> {
        (**self).extract_layout(req)
    }
}

pub fn layout_request(input: &Path, max_pages: u32) -> LayoutIn {
    LayoutIn {
        input_pdf: input.display().to_string(),
        max_pages,
    }
}
