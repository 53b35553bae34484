//! Shared test fixtures

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use pdf_parser_server::config::{Config, ConversionConfig};
use pdf_parser_server::convert::{ConversionOptions, ConversionResult, OutputFormat};
use pdf_parser_server::extractor::{ExtractionError, Extractor};

/// What the stub does when called
#[derive(Clone)]
pub enum Outcome {
    Succeed(ConversionResult),
    Fail(&'static str),
}

/// Extractor double that records calls and peak concurrency
pub struct StubExtractor {
    pub delay: Duration,
    pub outcome: Outcome,
    pub cancellable: bool,
    pub calls: AtomicUsize,
    pub running: AtomicUsize,
    pub max_running: AtomicUsize,
    /// Options seen on each call: (format, force_ocr, paginate, languages)
    pub seen: Mutex<Vec<(OutputFormat, bool, bool, Vec<String>)>>,
}

impl StubExtractor {
    pub fn succeeding(result: ConversionResult) -> Self {
        Self::new(Outcome::Succeed(result))
    }

    pub fn failing(detail: &'static str) -> Self {
        Self::new(Outcome::Fail(detail))
    }

    fn new(outcome: Outcome) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome,
            cancellable: false,
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn cancellable(mut self) -> Self {
        self.cancellable = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for StubExtractor {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn cancellable(&self) -> bool {
        self.cancellable
    }

    async fn convert(
        &self,
        _pdf: Vec<u8>,
        options: &ConversionOptions,
    ) -> Result<ConversionResult, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        self.seen.lock().unwrap().push((
            options.output_format,
            options.force_ocr,
            options.paginate_output,
            options.languages.clone(),
        ));

        tokio::time::sleep(self.delay).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Succeed(result) => Ok(result.clone()),
            Outcome::Fail(detail) => Err(ExtractionError::MuPdf(detail.to_string())),
        }
    }
}

pub fn sample_result() -> ConversionResult {
    let mut images = BTreeMap::new();
    images.insert("page_1_image_1.png".to_string(), b"\x89PNG fake".to_vec());

    let mut metadata = serde_json::Map::new();
    metadata.insert("page_count".to_string(), 1.into());

    ConversionResult {
        text: "# Hello\n\nWorld\n\n![](page_1_image_1.png)".to_string(),
        images,
        metadata,
    }
}

pub fn conversion_config(max_concurrent: usize, queue_depth: usize) -> ConversionConfig {
    ConversionConfig {
        max_concurrent,
        queue_depth,
        timeout_secs: 30,
        default_languages: vec!["en".to_string()],
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.ocr.providers.clear();
    config
}

pub fn options(format: OutputFormat) -> ConversionOptions {
    ConversionOptions {
        force_ocr: false,
        paginate_output: false,
        languages: vec!["en".to_string()],
        output_format: format,
    }
}

pub fn arc<T: Extractor>(extractor: T) -> Arc<T> {
    Arc::new(extractor)
}

/// Build a small valid PDF: one US Letter page per entry, each with one line of Helvetica text
pub fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
    let page_count = pages.len();
    let font_id = 3 + page_count * 2;

    let mut objects: Vec<String> = Vec::new();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());

    let kids = (0..page_count)
        .map(|i| format!("{} 0 R", 3 + i * 2))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, page_count));

    for (i, text) in pages.iter().enumerate() {
        let content_id = 4 + i * 2;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R \
             /Resources << /Font << /F1 {} 0 R >> >> >>",
            content_id, font_id
        ));
        let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }

    let xref_offset = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    pdf.push_str("0000000000 65535 f \n");
    for offset in offsets {
        pdf.push_str(&format!("{:010} 00000 n \n", offset));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));

    pdf.into_bytes()
}
