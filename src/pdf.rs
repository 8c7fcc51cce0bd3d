// src/pdf.rs - PDF page count and rasterization through poppler-utils
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, bail, Context, Result};
use image::DynamicImage;
use tracing::{debug, info, warn};

pub struct PdfDocument {
    path: PathBuf,
    page_count: usize,
    dpi: u32,
    temp_dir: PathBuf,
    // Most recently used at the back.
    cache: VecDeque<(usize, DynamicImage)>,
    cache_size: usize,
}

impl PdfDocument {
    pub fn open(path: impl AsRef<Path>, dpi: u32, cache_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_pdf_path(&path)?;

        if Command::new("pdfinfo").arg("-v").output().is_err() {
            bail!("pdfinfo is not installed or not in PATH. Please install poppler-utils to read PDFs.");
        }

        let output = Command::new("pdfinfo")
            .arg(&path)
            .output()
            .context("Failed to run pdfinfo")?;
        if !output.status.success() {
            bail!(
                "pdfinfo could not read {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let page_count = parse_page_count(&String::from_utf8_lossy(&output.stdout))?;

        let temp_dir = std::env::temp_dir().join(format!("gesture_reader_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&temp_dir)
            .with_context(|| format!("Cannot create temporary directory {}", temp_dir.display()))?;

        info!("Opened {} ({} pages)", path.display(), page_count);
        Ok(Self {
            path,
            page_count,
            dpi,
            temp_dir,
            cache: VecDeque::new(),
            cache_size: cache_size.max(2),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Renders a 0-based page, or returns it from the cache.
    pub fn page(&mut self, index: usize) -> Result<DynamicImage> {
        if index >= self.page_count {
            bail!("Page {} out of range (document has {})", index + 1, self.page_count);
        }
        if let Some(pos) = self.cache.iter().position(|(i, _)| *i == index) {
            if let Some(entry) = self.cache.remove(pos) {
                let image = entry.1.clone();
                self.cache.push_back(entry);
                return Ok(image);
            }
        }

        let image = self.render(index)?;
        if self.cache.len() >= self.cache_size {
            self.cache.pop_front();
        }
        self.cache.push_back((index, image.clone()));
        Ok(image)
    }

    fn render(&self, index: usize) -> Result<DynamicImage> {
        let number = (index + 1).to_string();
        let prefix = self.temp_dir.join(format!("page_{}", number));
        debug!("Rasterizing page {} of {}", number, self.path.display());

        let dpi = self.dpi.to_string();
        let status = Command::new("pdftoppm")
            .args(["-r", dpi.as_str(), "-png", "-f", number.as_str(), "-l", number.as_str(), "-singlefile"])
            .arg(&self.path)
            .arg(&prefix)
            .status()
            .context("Failed to run pdftoppm")?;
        if !status.success() {
            return Err(anyhow!("pdftoppm failed on page {}", number));
        }

        let png = prefix.with_extension("png");
        let image = image::open(&png)
            .with_context(|| format!("Failed to decode rendered page {}", png.display()))?;
        let _ = fs::remove_file(&png);
        Ok(image)
    }
}

impl Drop for PdfDocument {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.temp_dir) {
            warn!("Failed to remove {}: {}", self.temp_dir.display(), e);
        }
    }
}

pub type RenderedPage = (usize, Result<DynamicImage>);

/// Rasterizes pages on a worker thread so the frame loop keeps ticking.
/// Results come back in request order through `poll`.
pub struct PageRenderer {
    requests: Option<Sender<usize>>,
    results: Receiver<RenderedPage>,
    thread: Option<JoinHandle<()>>,
}

impl PageRenderer {
    pub fn spawn<F>(mut render: F) -> Result<Self>
    where
        F: FnMut(usize) -> Result<DynamicImage> + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<usize>();
        let (result_tx, result_rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("page-render".to_string())
            .spawn(move || {
                for index in request_rx {
                    if result_tx.send((index, render(index))).is_err() {
                        break;
                    }
                }
                debug!("Page renderer stopped");
            })
            .context("Failed to start page render thread")?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            thread: Some(thread),
        })
    }

    /// Renders a whole document, keeping its page cache on the worker.
    pub fn for_document(mut document: PdfDocument) -> Result<Self> {
        Self::spawn(move |index| document.page(index))
    }

    pub fn request(&self, index: usize) -> Result<()> {
        self.requests
            .as_ref()
            .ok_or_else(|| anyhow!("Page renderer is shut down"))?
            .send(index)
            .map_err(|_| anyhow!("Page render thread has stopped"))
    }

    /// Pages finished since the last call.
    pub fn poll(&self) -> Vec<RenderedPage> {
        self.results.try_iter().collect()
    }
}

impl Drop for PageRenderer {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Page render thread panicked");
            }
        }
    }
}

/// Existing file with a `.pdf` extension in any case.
pub fn check_pdf_path(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("PDF file does not exist: {}", path.display());
    }
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        bail!("Not a PDF file: {}", path.display());
    }
    Ok(())
}

fn parse_page_count(info: &str) -> Result<usize> {
    info.lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .ok_or_else(|| anyhow!("pdfinfo output has no page count"))?
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid page count in pdfinfo output"))
}
