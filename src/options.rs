//! PDF generation options.
//!
//! [`PdfOptions`] is a plain value object mapping 1:1 onto the parameters
//! of the CDP `Page.printToPDF` command. Every field is always sent,
//! defaulted or not, so Chrome never falls back to its own defaults
//! behind our back.
//!
//! # Example
//!
//! ```rust
//! use html2pdf_pool::PdfOptions;
//!
//! let options = PdfOptions::builder()
//!     .landscape(true)
//!     .scale(1.2)
//!     .page_ranges("1-3")
//!     .build();
//!
//! assert!(options.landscape);
//! assert_eq!(options.paper_width, 8.5);
//! ```

use serde::Serialize;

/// Options for `Page.printToPDF`.
///
/// Units are inches for paper size and margins, matching the CDP
/// definition. The serialized form uses the camelCase names Chrome
/// expects (`printBackground`, `paperWidth`, ...).
///
/// | Field | Default |
/// |-------|---------|
/// | `landscape` | `false` |
/// | `print_background` | `true` |
/// | `scale` | `1.0` |
/// | `paper_width` | `8.5` |
/// | `paper_height` | `11.0` |
/// | `margin_top` / `bottom` / `left` / `right` | `0.4` |
/// | `page_ranges` | `""` (all pages) |
/// | `prefer_css_page_size` | `false` |
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfOptions {
    /// Paper orientation; `true` prints landscape.
    pub landscape: bool,
    /// Whether to print CSS backgrounds.
    pub print_background: bool,
    /// Page render scale factor.
    pub scale: f64,
    /// Paper width in inches.
    pub paper_width: f64,
    /// Paper height in inches.
    pub paper_height: f64,
    /// Top margin in inches.
    pub margin_top: f64,
    /// Bottom margin in inches.
    pub margin_bottom: f64,
    /// Left margin in inches.
    pub margin_left: f64,
    /// Right margin in inches.
    pub margin_right: f64,
    /// Page range selection, e.g. `"1-5, 8, 11-13"`. Empty prints all.
    pub page_ranges: String,
    /// Honor CSS-defined page size over `paper_width`/`paper_height`.
    ///
    /// Chrome spells this one `preferCSSPageSize`, which camelCase
    /// renaming alone would get wrong.
    #[serde(rename = "preferCSSPageSize")]
    pub prefer_css_page_size: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            landscape: false,
            print_background: true,
            scale: 1.0,
            paper_width: 8.5,
            paper_height: 11.0,
            margin_top: 0.4,
            margin_bottom: 0.4,
            margin_left: 0.4,
            margin_right: 0.4,
            page_ranges: String::new(),
            prefer_css_page_size: false,
        }
    }
}

impl PdfOptions {
    /// Create a builder initialized with the defaults.
    pub fn builder() -> PdfOptionsBuilder {
        PdfOptionsBuilder::new()
    }

    /// Serialize into the `params` object for `Page.printToPDF`.
    ///
    /// All eleven fields are present in the output.
    pub(crate) fn to_params(&self) -> serde_json::Value {
        // Serialization of this struct cannot fail: plain bools, floats
        // and strings only.
        serde_json::to_value(self).expect("PdfOptions serialization is infallible")
    }
}

/// Builder for [`PdfOptions`].
///
/// All setters chain. `build()` cannot fail; values are taken as given.
///
/// # Example
///
/// ```rust
/// use html2pdf_pool::PdfOptions;
///
/// let options = PdfOptions::builder()
///     .landscape(true)
///     .print_background(false)
///     .margin_top(0.0)
///     .build();
///
/// assert!(!options.print_background);
/// assert_eq!(options.margin_top, 0.0);
/// ```
#[derive(Debug, Default)]
pub struct PdfOptionsBuilder {
    options: PdfOptions,
}

impl PdfOptionsBuilder {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self {
            options: PdfOptions::default(),
        }
    }

    /// Set paper orientation (`true` = landscape).
    pub fn landscape(mut self, landscape: bool) -> Self {
        self.options.landscape = landscape;
        self
    }

    /// Set whether CSS backgrounds are printed.
    pub fn print_background(mut self, print_background: bool) -> Self {
        self.options.print_background = print_background;
        self
    }

    /// Set the render scale factor.
    pub fn scale(mut self, scale: f64) -> Self {
        self.options.scale = scale;
        self
    }

    /// Set paper width in inches.
    pub fn paper_width(mut self, inches: f64) -> Self {
        self.options.paper_width = inches;
        self
    }

    /// Set paper height in inches.
    pub fn paper_height(mut self, inches: f64) -> Self {
        self.options.paper_height = inches;
        self
    }

    /// Set the top margin in inches.
    pub fn margin_top(mut self, inches: f64) -> Self {
        self.options.margin_top = inches;
        self
    }

    /// Set the bottom margin in inches.
    pub fn margin_bottom(mut self, inches: f64) -> Self {
        self.options.margin_bottom = inches;
        self
    }

    /// Set the left margin in inches.
    pub fn margin_left(mut self, inches: f64) -> Self {
        self.options.margin_left = inches;
        self
    }

    /// Set the right margin in inches.
    pub fn margin_right(mut self, inches: f64) -> Self {
        self.options.margin_right = inches;
        self
    }

    /// Set the page range selection, e.g. `"1-5, 8, 11-13"`.
    pub fn page_ranges<S: Into<String>>(mut self, ranges: S) -> Self {
        self.options.page_ranges = ranges.into();
        self
    }

    /// Honor CSS-defined page size over the paper dimensions.
    pub fn prefer_css_page_size(mut self, prefer: bool) -> Self {
        self.options.prefer_css_page_size = prefer;
        self
    }

    /// Finish building.
    pub fn build(self) -> PdfOptions {
        self.options
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Verifies the documented default values.
    #[test]
    fn test_default_values() {
        let options = PdfOptions::default();

        assert!(!options.landscape);
        assert!(options.print_background);
        assert_eq!(options.scale, 1.0);
        assert_eq!(options.paper_width, 8.5);
        assert_eq!(options.paper_height, 11.0);
        assert_eq!(options.margin_top, 0.4);
        assert_eq!(options.margin_bottom, 0.4);
        assert_eq!(options.margin_left, 0.4);
        assert_eq!(options.margin_right, 0.4);
        assert_eq!(options.page_ranges, "");
        assert!(!options.prefer_css_page_size);
    }

    /// Verifies builder chaining sets every field.
    #[test]
    fn test_builder_chaining() {
        let options = PdfOptions::builder()
            .landscape(true)
            .print_background(false)
            .scale(1.5)
            .paper_width(11.7)
            .paper_height(16.5)
            .margin_top(0.1)
            .margin_bottom(0.2)
            .margin_left(0.3)
            .margin_right(0.4)
            .page_ranges("2-4")
            .prefer_css_page_size(true)
            .build();

        assert!(options.landscape);
        assert!(!options.print_background);
        assert_eq!(options.scale, 1.5);
        assert_eq!(options.paper_width, 11.7);
        assert_eq!(options.paper_height, 16.5);
        assert_eq!(options.margin_top, 0.1);
        assert_eq!(options.margin_bottom, 0.2);
        assert_eq!(options.margin_left, 0.3);
        assert_eq!(options.margin_right, 0.4);
        assert_eq!(options.page_ranges, "2-4");
        assert!(options.prefer_css_page_size);
    }

    /// Verifies the serialized params use Chrome's camelCase names and
    /// that every field is present.
    #[test]
    fn test_params_are_camel_case_and_complete() {
        let params = PdfOptions::default().to_params();
        let object = params.as_object().expect("params should be an object");

        for key in [
            "landscape",
            "printBackground",
            "scale",
            "paperWidth",
            "paperHeight",
            "marginTop",
            "marginBottom",
            "marginLeft",
            "marginRight",
            "pageRanges",
            "preferCSSPageSize",
        ] {
            assert!(object.contains_key(key), "missing param {}", key);
        }
        assert_eq!(object.len(), 11, "exactly the 11 documented params");

        assert_eq!(params["printBackground"], serde_json::json!(true));
        assert_eq!(params["paperWidth"], serde_json::json!(8.5));
    }
}
