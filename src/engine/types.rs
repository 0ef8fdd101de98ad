use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocDiag {
    pub python_exe: String,
    pub python_version: String,
    pub pymupdf_version: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutIn {
    pub input_pdf: String,
    pub max_pages: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutOut {
    pub ok: bool,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub pages: Vec<PageOut>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageOut {
    /// 1-based.
    pub page: u32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<SpanOut>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanOut {
    pub text: String,
    pub size: f32,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub font: String,
    pub bbox: [f32; 4],
    #[serde(default)]
    pub block: u32,
    #[serde(default)]
    pub line: u32,
}

impl SpanOut {
    /// PyMuPDF sets bit 4 of the span flags for bold text.
    pub fn is_bold(&self) -> bool {
        self.flags & 16 != 0
    }
}
