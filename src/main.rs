//! Example command-line driver.
//!
//! ```text
//! html2pdf <html-path> [<pdf-path> [<browser-path>]]
//! ```
//!
//! With no output path, the PDF lands next to the input with a `.pdf`
//! extension. The optional third argument pins the browser executable;
//! otherwise auto-discovery applies.

use std::process::ExitCode;

use html2pdf_pool::convert::default_output_path;
use html2pdf_pool::{shared, Html2PdfError, PdfOptions};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let Some(html_path) = args.next() else {
        eprintln!("usage: html2pdf <html-path> [<pdf-path> [<browser-path>]]");
        return ExitCode::FAILURE;
    };
    let pdf_path = args
        .next()
        .map(Into::into)
        .unwrap_or_else(|| default_output_path(&html_path));
    let browser_path = args.next();

    log::info!("input:  {}", html_path);
    log::info!("output: {}", pdf_path.display());
    if let Some(path) = browser_path {
        log::info!("browser: {}", path);
        if let Err(e) = shared::set_chrome_path(path) {
            log::error!("could not set browser path: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let result = html2pdf_pool::convert_file(&html_path, &pdf_path, &PdfOptions::default()).await;

    let code = match result {
        Ok(()) => {
            log::info!("conversion succeeded: {}", pdf_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    };

    if let Some(stats) = shared::stats() {
        log::info!("final pool state: {}", stats);
    }
    shared::shutdown().await;
    code
}

fn report_error(error: &Html2PdfError) {
    match error {
        Html2PdfError::ChromeNotFound(_) => log::error!("browser not found: {}", error),
        Html2PdfError::Navigation(_) => log::error!("page load failed: {}", error),
        Html2PdfError::PdfGeneration(_) => log::error!("PDF generation failed: {}", error),
        Html2PdfError::PoolClosed | Html2PdfError::AcquireTimeout(_) => {
            log::error!("pool error: {}", error)
        }
        other => log::error!("conversion failed: {}", other),
    }
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        log::error!("  caused by: {}", cause);
        source = cause.source();
    }
}
