//! PDF text extraction

use anyhow::{anyhow, Result};

/// Largest PDF accepted for extraction
pub const MAX_PDF_BYTES: usize = 50 * 1024 * 1024;

/// Extract the text layer of a PDF
///
/// Image-only and encrypted PDFs yield empty text, which callers treat as a
/// failure. This is CPU-bound; run it on a blocking thread.
pub fn pdf_text(bytes: &[u8]) -> Result<String> {
    if bytes.len() > MAX_PDF_BYTES {
        return Err(anyhow!(
            "PDF too large: {} bytes (limit: {} bytes)",
            bytes.len(),
            MAX_PDF_BYTES
        ));
    }
    if !bytes.starts_with(b"%PDF") {
        return Err(anyhow!("not a PDF file"));
    }

    pdf_extract::extract_text_from_mem(bytes).map_err(|e| anyhow!("PDF extraction failed: {}", e))
}
