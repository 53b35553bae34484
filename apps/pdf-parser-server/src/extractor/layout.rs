//! Page layout model produced by page analysis and consumed by rendering

use serde::Serialize;

use crate::convert::Metadata;

/// Document information dictionary entries
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DocumentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_date: Option<String>,
}

impl DocumentInfo {
    pub fn is_empty(&self) -> bool {
        *self == DocumentInfo::default()
    }
}

/// A content block on a page, in reading order
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutBlock {
    Text {
        text: String,
        /// Largest glyph size in the block, in points
        font_size: f32,
    },
    Image {
        id: String,
    },
}

/// One analyzed page
#[derive(Debug, Clone)]
pub struct PageLayout {
    /// 1-indexed
    pub number: usize,
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<LayoutBlock>,
    /// Text came from OCR rather than the text layer
    pub ocr_applied: bool,
}

impl PageLayout {
    pub fn has_text(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| matches!(b, LayoutBlock::Text { text, .. } if !text.trim().is_empty()))
    }

    /// Replace the page's text blocks with OCR output, keeping image blocks
    pub fn apply_ocr_text(&mut self, text: &str, font_size: f32) {
        let mut blocks: Vec<LayoutBlock> = text
            .split("\n\n")
            .map(|para| para.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|para| !para.is_empty())
            .map(|text| LayoutBlock::Text { text, font_size })
            .collect();

        blocks.extend(
            self.blocks
                .drain(..)
                .filter(|b| matches!(b, LayoutBlock::Image { .. })),
        );

        self.blocks = blocks;
        self.ocr_applied = true;
    }
}

/// Whole-document analysis result
#[derive(Debug, Clone, Default)]
pub struct DocumentLayout {
    pub pages: Vec<PageLayout>,
    pub info: DocumentInfo,
}

impl DocumentLayout {
    /// Median glyph size over text blocks, weighted by text length
    pub fn body_font_size(&self) -> Option<f32> {
        let mut sizes: Vec<(f32, usize)> = self
            .pages
            .iter()
            .flat_map(|p| p.blocks.iter())
            .filter_map(|b| match b {
                LayoutBlock::Text { text, font_size } if *font_size > 0.0 => {
                    Some((*font_size, text.chars().count()))
                }
                _ => None,
            })
            .collect();

        let total: usize = sizes.iter().map(|(_, n)| n).sum();
        if total == 0 {
            return None;
        }

        sizes.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut seen = 0;
        for (size, count) in sizes {
            seen += count;
            if seen * 2 >= total {
                return Some(size);
            }
        }
        None
    }

    /// Metadata map: `page_count`, plus `document_info` and `ocr_pages` when present
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("page_count".to_string(), self.pages.len().into());

        if !self.info.is_empty() {
            if let Ok(info) = serde_json::to_value(&self.info) {
                metadata.insert("document_info".to_string(), info);
            }
        }

        let ocr_pages: Vec<usize> = self
            .pages
            .iter()
            .filter(|p| p.ocr_applied)
            .map(|p| p.number)
            .collect();
        if !ocr_pages.is_empty() {
            metadata.insert("ocr_pages".to_string(), ocr_pages.into());
        }

        metadata
    }
}
