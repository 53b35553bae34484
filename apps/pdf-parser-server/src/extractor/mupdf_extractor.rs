//! PDF extraction using MuPDF
//!
//! Page analysis runs on the blocking pool: MuPDF documents are opened,
//! walked and dropped inside a single `spawn_blocking` closure, so nothing
//! MuPDF-owned crosses threads. OCR and rendering happen afterwards on the
//! async side.
//!
//! Per page:
//! - text blocks from the structured text API (lines joined, max glyph size)
//! - image blocks, cropped out of a page raster and encoded as PNG
//! - a PNG of the whole page when it needs OCR (no text layer, or forced)

use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;

use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use mupdf::{Colorspace, Document, Matrix, MetadataName, Page, TextBlockType, TextPageOptions};

use super::layout::{DocumentInfo, DocumentLayout, LayoutBlock, PageLayout};
use super::render::render;
use super::{ExtractionError, Extractor};
use crate::convert::{ConversionOptions, ConversionResult};
use crate::ocr::{OcrError, OcrService};

/// Raster scale for image crops and OCR input (2x = 144 dpi)
const RENDER_SCALE: f32 = 2.0;

/// OCR paragraphs carry no glyph size; zero keeps them out of heading detection
const OCR_FONT_SIZE: f32 = 0.0;

/// Image region in page space, relative to the page origin
#[derive(Debug, Clone, Copy, PartialEq)]
struct Region {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

/// Output of the blocking analysis pass
struct AnalyzedDocument {
    layout: DocumentLayout,
    images: BTreeMap<String, Vec<u8>>,
    /// (index into `layout.pages`, PNG of the page)
    ocr_inputs: Vec<(usize, Vec<u8>)>,
}

/// [`Extractor`] backed by MuPDF, with OCR through [`OcrService`]
pub struct MupdfExtractor {
    ocr: OcrService,
}

impl MupdfExtractor {
    pub fn new(ocr: OcrService) -> Self {
        Self { ocr }
    }

    async fn run_ocr(
        &self,
        layout: &mut DocumentLayout,
        inputs: Vec<(usize, Vec<u8>)>,
        options: &ConversionOptions,
    ) -> Result<(), ExtractionError> {
        let session = self.ocr.session().await;
        if session.is_empty() {
            if options.force_ocr {
                return Err(OcrError::ProviderNotAvailable(
                    "no OCR provider is reachable".to_string(),
                )
                .into());
            }
            tracing::warn!(
                pages = inputs.len(),
                "Pages without a text layer left empty: no OCR provider is reachable"
            );
            return Ok(());
        }

        for (index, png) in inputs {
            let result = session.recognize(&png, &options.languages).await?;
            let page = &mut layout.pages[index];
            tracing::debug!(
                page = page.number,
                provider = %result.provider,
                confidence = result.confidence,
                chars = result.text.len(),
                "OCR applied"
            );
            page.apply_ocr_text(&result.text, OCR_FONT_SIZE);
        }

        Ok(())
    }
}

#[async_trait]
impl Extractor for MupdfExtractor {
    fn name(&self) -> &'static str {
        "mupdf"
    }

    async fn convert(
        &self,
        pdf: Vec<u8>,
        options: &ConversionOptions,
    ) -> Result<ConversionResult, ExtractionError> {
        if options.force_ocr && !self.ocr.has_providers() {
            return Err(OcrError::ProviderNotAvailable(
                "no OCR providers configured".to_string(),
            )
            .into());
        }

        let force_ocr = options.force_ocr;
        let ocr_configured = self.ocr.has_providers();

        let analyzed = tokio::task::spawn_blocking(move || analyze(&pdf, force_ocr, ocr_configured))
            .await
            .map_err(|e| ExtractionError::Task(e.to_string()))??;

        let AnalyzedDocument {
            mut layout,
            images,
            ocr_inputs,
        } = analyzed;

        if !ocr_inputs.is_empty() {
            self.run_ocr(&mut layout, ocr_inputs, options).await?;
        }

        let text = render(&layout, options.output_format, options.paginate_output)?;

        Ok(ConversionResult {
            text,
            images,
            metadata: layout.metadata(),
        })
    }
}

/// Walk every page of the document
///
/// `rasterize_for_ocr` is false when no OCR provider is configured, in which
/// case pages without text are left empty instead of being rendered.
fn analyze(
    data: &[u8],
    force_ocr: bool,
    rasterize_for_ocr: bool,
) -> Result<AnalyzedDocument, ExtractionError> {
    let doc = Document::from_bytes(data, "application/pdf")
        .map_err(|e| ExtractionError::InvalidDocument(e.to_string()))?;
    let page_count = doc
        .page_count()
        .map_err(|e| ExtractionError::InvalidDocument(e.to_string()))? as usize;

    if page_count == 0 {
        return Err(ExtractionError::InvalidDocument(
            "document has no pages".to_string(),
        ));
    }

    let mut pages = Vec::with_capacity(page_count);
    let mut images = BTreeMap::new();
    let mut ocr_inputs = Vec::new();

    for index in 0..page_count {
        let page = doc.load_page(index as i32)?;
        let (mut layout, regions) = analyze_page(&page, index + 1)?;

        let needs_ocr = rasterize_for_ocr && (force_ocr || !layout.has_text());
        if !layout.has_text() && !needs_ocr {
            tracing::warn!(page = layout.number, "Page has no text layer and OCR is not configured");
        }

        if needs_ocr || !regions.is_empty() {
            let raster = rasterize(&page)?;

            let mut dropped = HashSet::new();
            for (id, region) in regions {
                match crop_region(&raster, region, RENDER_SCALE) {
                    Some(crop) => {
                        images.insert(id, encode_png(&crop)?);
                    }
                    None => {
                        dropped.insert(id);
                    }
                }
            }
            if !dropped.is_empty() {
                layout
                    .blocks
                    .retain(|b| !matches!(b, LayoutBlock::Image { id } if dropped.contains(id)));
            }

            if needs_ocr {
                ocr_inputs.push((pages.len(), encode_png(&raster)?));
            }
        }

        pages.push(layout);
    }

    Ok(AnalyzedDocument {
        layout: DocumentLayout {
            pages,
            info: extract_info(&doc),
        },
        images,
        ocr_inputs,
    })
}

fn analyze_page(page: &Page, number: usize) -> Result<(PageLayout, Vec<(String, Region)>), ExtractionError> {
    let bounds = page.bounds()?;
    let text_page = page.to_text_page(TextPageOptions::PRESERVE_IMAGES)?;

    let mut blocks = Vec::new();
    let mut regions = Vec::new();

    for block in text_page.blocks() {
        if matches!(block.r#type(), TextBlockType::Image) {
            let rect = block.bounds();
            let id = format!("page_{}_image_{}.png", number, regions.len() + 1);
            regions.push((
                id.clone(),
                Region {
                    x0: rect.x0 - bounds.x0,
                    y0: rect.y0 - bounds.y0,
                    x1: rect.x1 - bounds.x0,
                    y1: rect.y1 - bounds.y0,
                },
            ));
            blocks.push(LayoutBlock::Image { id });
            continue;
        }

        let mut text = String::new();
        let mut font_size = 0.0f32;

        for line in block.lines() {
            let mut line_text = String::new();
            for ch in line.chars() {
                if let Some(c) = ch.char() {
                    line_text.push(c);
                    font_size = font_size.max(ch.size());
                }
            }
            join_line(&mut text, &line_text);
        }

        if !text.is_empty() {
            blocks.push(LayoutBlock::Text { text, font_size });
        }
    }

    let layout = PageLayout {
        number,
        width: bounds.x1 - bounds.x0,
        height: bounds.y1 - bounds.y0,
        blocks,
        ocr_applied: false,
    };

    Ok((layout, regions))
}

/// Append a line to a paragraph, rejoining words hyphenated across the break
fn join_line(paragraph: &mut String, line: &str) {
    let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.is_empty() {
        return;
    }

    if paragraph.is_empty() {
        paragraph.push_str(&line);
        return;
    }

    let hyphenated = paragraph.ends_with('-')
        && paragraph
            .chars()
            .rev()
            .nth(1)
            .map_or(false, char::is_alphabetic)
        && line.chars().next().map_or(false, char::is_lowercase);

    if hyphenated {
        paragraph.pop();
    } else {
        paragraph.push(' ');
    }
    paragraph.push_str(&line);
}

/// Render the whole page to an RGB image, no alpha
fn rasterize(page: &Page) -> Result<DynamicImage, ExtractionError> {
    let matrix = Matrix::new_scale(RENDER_SCALE, RENDER_SCALE);
    let pixmap = page.to_pixmap(&matrix, &Colorspace::device_rgb(), false, false)?;

    let rgb = rgb_from_samples(
        pixmap.width() as u32,
        pixmap.height() as u32,
        pixmap.n() as usize,
        pixmap.samples(),
    )?;
    Ok(DynamicImage::ImageRgb8(rgb))
}

/// Pack `components`-per-pixel samples into an RGB buffer, dropping anything past the third channel
fn rgb_from_samples(
    width: u32,
    height: u32,
    components: usize,
    samples: &[u8],
) -> Result<RgbImage, ExtractionError> {
    let pixels = width as usize * height as usize;
    if components < 3 || samples.len() < pixels * components {
        return Err(ExtractionError::ImageExtraction(format!(
            "unexpected pixmap layout: {}x{} with {} components in {} bytes",
            width,
            height,
            components,
            samples.len()
        )));
    }

    let buffer = if components == 3 {
        samples[..pixels * 3].to_vec()
    } else {
        samples
            .chunks_exact(components)
            .take(pixels)
            .flat_map(|px| px[..3].iter().copied())
            .collect()
    };

    RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        ExtractionError::ImageExtraction("pixmap does not fill the image buffer".to_string())
    })
}

/// Crop a page-space region out of a raster rendered at `scale`.
///
/// Returns `None` when the clamped region has no area.
fn crop_region(raster: &DynamicImage, region: Region, scale: f32) -> Option<DynamicImage> {
    let (width, height) = (raster.width(), raster.height());
    let to_px = |v: f32, limit: u32| -> u32 { ((v * scale).max(0.0) as u32).min(limit) };

    let x0 = to_px(region.x0.floor(), width);
    let y0 = to_px(region.y0.floor(), height);
    let x1 = to_px(region.x1.ceil(), width);
    let y1 = to_px(region.y1.ceil(), height);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(raster.crop_imm(x0, y0, x1 - x0, y1 - y0))
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ExtractionError> {
    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| ExtractionError::ImageExtraction(e.to_string()))?;
    Ok(output)
}

/// Read the document information dictionary
fn extract_info(doc: &Document) -> DocumentInfo {
    let get_meta = |name: MetadataName| -> Option<String> {
        doc.metadata(name)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    DocumentInfo {
        title: get_meta(MetadataName::Title),
        author: get_meta(MetadataName::Author),
        subject: get_meta(MetadataName::Subject),
        keywords: get_meta(MetadataName::Keywords)
            .map(|k| {
                k.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        creator: get_meta(MetadataName::Creator),
        producer: get_meta(MetadataName::Producer),
        creation_date: get_meta(MetadataName::CreationDate),
        modification_date: get_meta(MetadataName::ModDate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use image::RgbaImage;

    use crate::ocr::provider::CountingProvider;

    fn joined(lines: &[&str]) -> String {
        let mut paragraph = String::new();
        for line in lines {
            join_line(&mut paragraph, line);
        }
        paragraph
    }

    #[test]
    fn test_join_line() {
        assert_eq!(joined(&["Hello", "  world  "]), "Hello world");
        assert_eq!(joined(&["", "only", ""]), "only");
        assert_eq!(joined(&["extrac-", "tion works"]), "extraction works");
        // Capitalized continuation keeps the hyphen: "Jean-", "Paul"
        assert_eq!(joined(&["Jean-", "Paul"]), "Jean- Paul");
        assert_eq!(joined(&["pages 3-", "5"]), "pages 3- 5");
    }

    #[test]
    fn test_crop_region_scaled() {
        let raster = DynamicImage::ImageRgba8(RgbaImage::new(200, 100));
        let crop = crop_region(
            &raster,
            Region {
                x0: 10.0,
                y0: 5.0,
                x1: 30.5,
                y1: 25.0,
            },
            2.0,
        )
        .unwrap();
        assert_eq!((crop.width(), crop.height()), (42, 40));
    }

    #[test]
    fn test_crop_region_clamped_and_empty() {
        let raster = DynamicImage::ImageRgba8(RgbaImage::new(100, 100));

        let crop = crop_region(
            &raster,
            Region {
                x0: -20.0,
                y0: 40.0,
                x1: 500.0,
                y1: 60.0,
            },
            1.0,
        )
        .unwrap();
        assert_eq!((crop.width(), crop.height()), (100, 20));

        let outside = Region {
            x0: 150.0,
            y0: 150.0,
            x1: 180.0,
            y1: 180.0,
        };
        assert!(crop_region(&raster, outside, 1.0).is_none());
    }

    #[test]
    fn test_encode_png_signature() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
        let png = encode_png(&img).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_rgb_from_samples_drops_alpha() {
        let samples = [1, 2, 3, 255, 4, 5, 6, 128];
        let rgb = rgb_from_samples(2, 1, 4, &samples).unwrap();
        assert_eq!(rgb.into_raw(), vec![1, 2, 3, 4, 5, 6]);

        let rgb = rgb_from_samples(1, 2, 3, &[9, 8, 7, 6, 5, 4]).unwrap();
        assert_eq!(rgb.into_raw(), vec![9, 8, 7, 6, 5, 4]);
    }

    #[test]
    fn test_rgb_from_samples_rejects_short_buffer() {
        assert!(matches!(
            rgb_from_samples(4, 4, 3, &[0; 10]),
            Err(ExtractionError::ImageExtraction(_))
        ));
        assert!(matches!(
            rgb_from_samples(1, 1, 1, &[0]),
            Err(ExtractionError::ImageExtraction(_))
        ));
    }

    #[test]
    fn test_rgb_from_samples_large_page_size() {
        // 20000 x 60000 px overflows u32 byte counts; the layout check must not
        assert!(matches!(
            rgb_from_samples(20_000, 60_000, 3, &[]),
            Err(ExtractionError::ImageExtraction(_))
        ));
    }

    #[tokio::test]
    async fn test_ocr_probes_providers_once_per_document() {
        let provider = Arc::new(CountingProvider::default());
        let extractor = MupdfExtractor::new(OcrService::with_providers(vec![
            provider.clone() as Arc<dyn crate::ocr::OcrProviderTrait>,
        ]));

        let blank = |number| PageLayout {
            number,
            width: 612.0,
            height: 792.0,
            blocks: Vec::new(),
            ocr_applied: false,
        };
        let mut layout = DocumentLayout {
            pages: vec![blank(1), blank(2), blank(3)],
            info: DocumentInfo::default(),
        };
        let options = ConversionOptions {
            force_ocr: false,
            paginate_output: false,
            languages: vec!["en".to_string()],
            output_format: crate::convert::OutputFormat::Markdown,
        };

        extractor
            .run_ocr(&mut layout, vec![(0, Vec::new()), (1, Vec::new()), (2, Vec::new())], &options)
            .await
            .unwrap();

        assert_eq!(provider.probes.load(Ordering::SeqCst), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert!(layout.pages.iter().all(|p| p.ocr_applied && p.has_text()));
        assert_eq!(layout.metadata()["ocr_pages"], serde_json::json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_force_ocr_without_providers_fails_fast() {
        let extractor = MupdfExtractor::new(OcrService::with_providers(Vec::new()));
        let options = ConversionOptions {
            force_ocr: true,
            paginate_output: false,
            languages: vec!["en".to_string()],
            output_format: crate::convert::OutputFormat::Markdown,
        };

        let err = extractor.convert(b"%PDF-1.4".to_vec(), &options).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Ocr(OcrError::ProviderNotAvailable(_))));
    }

    #[tokio::test]
    async fn test_garbage_is_rejected() {
        let extractor = MupdfExtractor::new(OcrService::with_providers(Vec::new()));
        let options = ConversionOptions {
            force_ocr: false,
            paginate_output: false,
            languages: vec!["en".to_string()],
            output_format: crate::convert::OutputFormat::Markdown,
        };

        let err = extractor
            .convert(b"this is not a pdf at all".to_vec(), &options)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::InvalidDocument(_) | ExtractionError::MuPdf(_)
        ));
    }
}
