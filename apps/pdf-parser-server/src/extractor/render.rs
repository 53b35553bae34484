//! Output rendering: markdown, HTML and JSON from a [`DocumentLayout`]

use serde::Serialize;

use super::layout::{DocumentLayout, LayoutBlock, PageLayout};
use super::ExtractionError;
use crate::convert::OutputFormat;

/// Blocks longer than this are never promoted to headings
const MAX_HEADING_CHARS: usize = 200;
const H1_RATIO: f32 = 1.6;
const H2_RATIO: f32 = 1.2;

/// Rendered block, with headings inferred from font size
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Block<'a> {
    Heading { level: u8, text: &'a str },
    Text { text: &'a str },
    Image { id: &'a str },
}

#[derive(Serialize)]
struct JsonPage<'a> {
    page: usize,
    width: f32,
    height: f32,
    ocr_applied: bool,
    blocks: Vec<Block<'a>>,
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    pages: Vec<JsonPage<'a>>,
}

/// Render `layout` in `format`; `paginate` marks page boundaries in markdown and HTML
pub fn render(
    layout: &DocumentLayout,
    format: OutputFormat,
    paginate: bool,
) -> Result<String, ExtractionError> {
    let classifier = HeadingClassifier {
        body_size: layout.body_font_size(),
    };

    match format {
        OutputFormat::Markdown => Ok(render_markdown(layout, &classifier, paginate)),
        OutputFormat::Html => Ok(render_html(layout, &classifier, paginate)),
        OutputFormat::Json => render_json(layout, &classifier),
    }
}

struct HeadingClassifier {
    body_size: Option<f32>,
}

impl HeadingClassifier {
    fn classify<'a>(&self, block: &'a LayoutBlock) -> Option<Block<'a>> {
        match block {
            LayoutBlock::Image { id } => Some(Block::Image { id: id.as_str() }),
            LayoutBlock::Text { text, font_size } => {
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                match self.heading_level(text, *font_size) {
                    Some(level) => Some(Block::Heading { level, text }),
                    None => Some(Block::Text { text }),
                }
            }
        }
    }

    fn heading_level(&self, text: &str, font_size: f32) -> Option<u8> {
        let body = self.body_size?;
        if text.chars().count() > MAX_HEADING_CHARS {
            return None;
        }
        if font_size >= body * H1_RATIO {
            Some(1)
        } else if font_size >= body * H2_RATIO {
            Some(2)
        } else {
            None
        }
    }

    fn page_blocks<'a>(&self, page: &'a PageLayout) -> Vec<Block<'a>> {
        page.blocks.iter().filter_map(|b| self.classify(b)).collect()
    }
}

fn render_markdown(layout: &DocumentLayout, classifier: &HeadingClassifier, paginate: bool) -> String {
    let mut pages = Vec::with_capacity(layout.pages.len());

    for page in &layout.pages {
        let body = classifier
            .page_blocks(page)
            .into_iter()
            .map(|block| match block {
                Block::Heading { level, text } => format!("{} {}", "#".repeat(level as usize), text),
                Block::Text { text } => text.to_string(),
                Block::Image { id } => format!("![]({})", id),
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        if paginate {
            pages.push(format!("{{{}}}{}\n\n{}", page.number, "-".repeat(48), body));
        } else if !body.is_empty() {
            pages.push(body);
        }
    }

    pages.join("\n\n")
}

fn render_html(layout: &DocumentLayout, classifier: &HeadingClassifier, paginate: bool) -> String {
    let mut pages = Vec::with_capacity(layout.pages.len());

    for page in &layout.pages {
        let body = classifier
            .page_blocks(page)
            .into_iter()
            .map(|block| match block {
                Block::Heading { level, text } => format!(
                    "<h{level}>{}</h{level}>",
                    html_escape::encode_text(text),
                    level = level
                ),
                Block::Text { text } => format!("<p>{}</p>", html_escape::encode_text(text)),
                Block::Image { id } => format!(
                    "<img src=\"{}\" alt=\"\"/>",
                    html_escape::encode_double_quoted_attribute(id)
                ),
            })
            .collect::<Vec<_>>()
            .join("\n");

        if paginate {
            pages.push(format!(
                "<div class=\"page\" data-page=\"{}\">\n{}\n</div>",
                page.number, body
            ));
        } else if !body.is_empty() {
            pages.push(body);
        }
    }

    pages.join("\n")
}

fn render_json(layout: &DocumentLayout, classifier: &HeadingClassifier) -> Result<String, ExtractionError> {
    let document = JsonDocument {
        pages: layout
            .pages
            .iter()
            .map(|page| JsonPage {
                page: page.number,
                width: page.width,
                height: page.height,
                ocr_applied: page.ocr_applied,
                blocks: classifier.page_blocks(page),
            })
            .collect(),
    };

    serde_json::to_string_pretty(&document).map_err(|e| ExtractionError::Render(e.to_string()))
}
