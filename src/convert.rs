//! The HTML→PDF conversion facade.
//!
//! [`HtmlToPdfConverter`] is a stateless coordinator over a pool: it
//! validates the input, builds a `file://` URL, checks a session out,
//! navigates, prints, and releases the session on every exit path (the
//! [`SessionHandle`](crate::SessionHandle) RAII guard does the
//! releasing). HTML strings are materialized to a temporary file that
//! is removed when the conversion finishes.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use html2pdf_pool::{ChromePool, HtmlToPdfConverter, PdfOptions};
//!
//! # async fn demo() -> html2pdf_pool::Result<()> {
//! let pool = Arc::new(ChromePool::builder().build()?);
//! let converter = HtmlToPdfConverter::new(pool);
//!
//! // File in, file out:
//! converter.convert("report.html", "out/report.pdf", &PdfOptions::default()).await?;
//!
//! // String in, bytes out:
//! let pdf = converter
//!     .convert_html_to_bytes("<html><body>Hi</body></html>", &PdfOptions::default())
//!     .await?;
//! assert!(pdf.starts_with(b"%PDF"));
//! # Ok(())
//! # }
//! ```
//!
//! The free functions at the bottom ([`convert_file`],
//! [`convert_to_bytes`], [`convert_html_to_bytes`]) do the same through
//! the process-wide [`shared`](crate::shared) pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Html2PdfError, Result};
use crate::options::PdfOptions;
use crate::pool::ChromePool;
use crate::shared;

/// Stateless conversion coordinator over a session pool.
pub struct HtmlToPdfConverter {
    pool: Arc<ChromePool>,
}

impl HtmlToPdfConverter {
    /// Create a converter over the given pool.
    pub fn new(pool: Arc<ChromePool>) -> Self {
        Self { pool }
    }

    /// Create a converter over the process-wide shared pool.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime (shared-pool
    /// construction spawns background tasks).
    pub fn with_shared_pool() -> Self {
        Self {
            pool: shared::instance(),
        }
    }

    /// The pool this converter draws sessions from.
    pub fn pool(&self) -> &Arc<ChromePool> {
        &self.pool
    }

    /// Convert an HTML file to PDF bytes.
    ///
    /// # Errors
    ///
    /// Fails with [`Html2PdfError::Io`] when the input does not exist,
    /// plus any pool, navigation or generation error.
    pub async fn convert_to_bytes<P: AsRef<Path>>(
        &self,
        html_path: P,
        options: &PdfOptions,
    ) -> Result<Vec<u8>> {
        let html_path = html_path.as_ref();
        validate_input_file(html_path)?;
        let url = file_url(html_path)?;

        let session = self.pool.acquire().await?;
        log::info!("loading {}", url);
        session.navigate(&url).await?;
        let bytes = session.print_to_pdf(options).await?;
        // Session returns to the pool when `session` drops, also on the
        // error paths above.
        Ok(bytes)
    }

    /// Convert an HTML file to a PDF file.
    ///
    /// Missing parent directories of the output path are created.
    pub async fn convert<P, Q>(&self, html_path: P, pdf_path: Q, options: &PdfOptions) -> Result<()>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let pdf_path = pdf_path.as_ref();
        let bytes = self.convert_to_bytes(html_path, options).await?;

        if let Some(parent) = pdf_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                log::info!("creating output directory {}", parent.display());
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(pdf_path, &bytes).await?;
        log::info!("wrote {} bytes to {}", bytes.len(), pdf_path.display());
        Ok(())
    }

    /// Convert an in-memory HTML string to PDF bytes.
    ///
    /// The string is written to a temporary `html2pdf_*.html` file that
    /// is deleted when the conversion finishes, successful or not.
    ///
    /// # Errors
    ///
    /// Fails with [`Html2PdfError::Configuration`] on empty input.
    pub async fn convert_html_to_bytes(
        &self,
        html: &str,
        options: &PdfOptions,
    ) -> Result<Vec<u8>> {
        if html.trim().is_empty() {
            return Err(Html2PdfError::Configuration(
                "HTML content must not be empty".to_string(),
            ));
        }

        let temp = tempfile::Builder::new()
            .prefix("html2pdf_")
            .suffix(".html")
            .tempfile()?;
        tokio::fs::write(temp.path(), html).await?;
        log::debug!("materialized HTML to {}", temp.path().display());

        // `temp` unlinks the file when it drops, covering every path out
        // of this function.
        self.convert_to_bytes(temp.path(), options).await
    }
}

impl std::fmt::Debug for HtmlToPdfConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlToPdfConverter")
            .field("pool", &self.pool.stats())
            .finish()
    }
}

/// Check that the input path names an existing regular file.
fn validate_input_file(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        log::error!("HTML file not readable: {}", path.display());
        Html2PdfError::Io(std::io::Error::new(
            e.kind(),
            format!("HTML file not found: {}", path.display()),
        ))
    })?;
    if !metadata.is_file() {
        return Err(Html2PdfError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("not a regular file: {}", path.display()),
        )));
    }
    Ok(())
}

/// Format an absolute `file://` URL for a local path.
///
/// On platforms whose separator is a backslash the URL must start with
/// `file:///`; `Url::from_file_path` produces that form from an
/// absolute path on every platform.
pub(crate) fn file_url(path: &Path) -> Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let url = url::Url::from_file_path(&absolute).map_err(|_| {
        Html2PdfError::Configuration(format!(
            "cannot express {} as a file URL",
            absolute.display()
        ))
    })?;
    Ok(url.into())
}

// ============================================================================
// Shared-pool conveniences
// ============================================================================

/// Convert an HTML file to a PDF file using the shared pool.
pub async fn convert_file<P, Q>(html_path: P, pdf_path: Q, options: &PdfOptions) -> Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    HtmlToPdfConverter::with_shared_pool()
        .convert(html_path, pdf_path, options)
        .await
}

/// Convert an HTML file to PDF bytes using the shared pool.
pub async fn convert_to_bytes<P: AsRef<Path>>(html_path: P, options: &PdfOptions) -> Result<Vec<u8>> {
    HtmlToPdfConverter::with_shared_pool()
        .convert_to_bytes(html_path, options)
        .await
}

/// Convert an HTML string to PDF bytes using the shared pool.
pub async fn convert_html_to_bytes(html: &str, options: &PdfOptions) -> Result<Vec<u8>> {
    HtmlToPdfConverter::with_shared_pool()
        .convert_html_to_bytes(html, options)
        .await
}

/// Derive a default PDF output path from an HTML input path.
///
/// `report.html` becomes `report.pdf` next to it.
pub fn default_output_path<P: AsRef<Path>>(html_path: P) -> PathBuf {
    html_path.as_ref().with_extension("pdf")
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// file_url produces an absolute file:// URL from an absolute path.
    #[test]
    fn test_file_url_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<html></html>").unwrap();

        let url = file_url(&path).unwrap();
        assert!(url.starts_with("file://"), "got: {}", url);
        assert!(url.ends_with("page.html"), "got: {}", url);
        // On every platform the path component begins with a slash.
        assert!(url.contains("///") || url.starts_with("file:///"), "got: {}", url);
    }

    /// file_url resolves relative paths against the working directory.
    #[test]
    fn test_file_url_relative() {
        let url = file_url(Path::new("some/page.html")).unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("some/page.html"));
    }

    /// Missing input files fail before a session is ever acquired.
    #[test]
    fn test_validate_missing_input() {
        let result = validate_input_file(Path::new("/no/such/input.html"));
        assert!(matches!(result, Err(Html2PdfError::Io(_))));
        let message = result.unwrap_err().to_string();
        assert!(message.contains("/no/such/input.html"), "got: {}", message);
    }

    /// Directories are rejected as input.
    #[test]
    fn test_validate_directory_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate_input_file(dir.path());
        assert!(matches!(result, Err(Html2PdfError::Io(_))));
    }

    /// Default output path swaps the extension.
    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path("docs/report.html"),
            PathBuf::from("docs/report.pdf")
        );
        assert_eq!(default_output_path("plain"), PathBuf::from("plain.pdf"));
    }
}
