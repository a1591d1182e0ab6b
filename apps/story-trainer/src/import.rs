//! Story creation: plain-text import and manual entry.

use crate::models::{Page, Story};
use crate::translate::{translate_or_original, Lang, Translator};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info, warn};

static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bpage\s*\d+\b").unwrap());
static PAGE_COUNTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\s*/\s*\d+").unwrap());
static BLANK_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

const MIN_PAGE_CHARS: usize = 3;
const MAX_PAGE_CHARS: usize = 500;
pub const MAX_MANUAL_PAGES: usize = 50;

/// Result of an import attempt, shown to the learner either way.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Imported(Story),
    Failed { error: String, details: String },
}

/// Normalize one page of extracted text. Returns `None` when too little is left.
pub fn clean_page_text(raw: &str) -> Option<String> {
    let text = collapse_whitespace(raw);
    if text.chars().count() < MIN_PAGE_CHARS {
        return None;
    }
    let text = PAGE_MARKER.replace_all(&text, "");
    let text = collapse_whitespace(&PAGE_COUNTER.replace_all(&text, ""));
    if text.chars().count() < MIN_PAGE_CHARS {
        return None;
    }
    if text.chars().count() > MAX_PAGE_CHARS {
        let mut cut: String = text.chars().take(MAX_PAGE_CHARS).collect();
        cut.push_str("...");
        return Some(cut);
    }
    Some(text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pages are separated by form feeds when present, otherwise by blank lines.
pub fn split_pages(content: &str) -> Vec<&str> {
    if content.contains('\x0c') {
        content.split('\x0c').collect()
    } else {
        BLANK_LINE.split(content).collect()
    }
}

/// Build a story from already-read text, translating every kept page.
pub fn import_text(title: &str, content: &str, translator: &dyn Translator) -> ImportOutcome {
    let pages: Vec<Page> = split_pages(content)
        .into_iter()
        .filter_map(clean_page_text)
        .map(|en| {
            let ko = translate_or_original(translator, &en, Lang::En, Lang::Ko);
            Page::new(en, ko)
        })
        .collect();

    if pages.is_empty() {
        return ImportOutcome::Failed {
            error: "No pages were extracted.".to_string(),
            details: "The file has no text blocks of at least three characters.".to_string(),
        };
    }

    info!(title, pages = pages.len(), "text imported");
    ImportOutcome::Imported(Story::new(title.trim(), "text_import", pages))
}

/// Import a UTF-8 text file. The title defaults to the file stem.
pub fn import_text_file(path: &Path, title: Option<&str>, translator: &dyn Translator) -> ImportOutcome {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "import failed");
            return ImportOutcome::Failed {
                error: format!("Could not read {}", path.display()),
                details: err.to_string(),
            };
        }
    };

    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "Untitled".to_string());

    import_text(&title, &content, translator)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("page count must be between 1 and 50, got {0}")]
    PageCount(usize),
    #[error("page text must not be empty")]
    EmptyText,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DraftProgress {
    /// Pages still to be entered.
    NeedMore(usize),
    Complete(Story),
}

/// A story being typed in page by page.
#[derive(Debug, Clone)]
pub struct StoryDraft {
    title: String,
    target_pages: usize,
    pages: Vec<Page>,
}

impl StoryDraft {
    pub fn new(title: &str, target_pages: usize) -> Result<Self, DraftError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        if !(1..=MAX_MANUAL_PAGES).contains(&target_pages) {
            return Err(DraftError::PageCount(target_pages));
        }
        Ok(Self {
            title: title.to_string(),
            target_pages,
            pages: Vec::with_capacity(target_pages),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// One-based number of the page being entered next.
    pub fn next_page_number(&self) -> usize {
        self.pages.len() + 1
    }

    pub fn target_pages(&self) -> usize {
        self.target_pages
    }

    pub fn add_page(
        &mut self,
        en: &str,
        image_url: &str,
        translator: &dyn Translator,
    ) -> Result<DraftProgress, DraftError> {
        let en = en.trim();
        if en.is_empty() {
            return Err(DraftError::EmptyText);
        }
        let ko = translate_or_original(translator, en, Lang::En, Lang::Ko);
        self.pages.push(Page::new(en, ko).with_image(image_url.trim()));
        debug!(title = %self.title, page = self.pages.len(), "draft page added");

        let remaining = self.target_pages - self.pages.len();
        if remaining > 0 {
            return Ok(DraftProgress::NeedMore(remaining));
        }
        Ok(DraftProgress::Complete(Story::new(
            self.title.clone(),
            "manual",
            std::mem::take(&mut self.pages),
        )))
    }
}
