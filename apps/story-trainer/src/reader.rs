//! Page-by-page reading of one story.

use crate::models::{Page, Story, StudyEvent};
use crate::stats::StatsTracker;
use crate::store::StoreResult;
use crate::translate::{translate_or_original, Lang, Translator};

/// Result of trying to advance a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTurn {
    /// Already on the last page (or the story has none).
    Blocked,
    Turned,
    /// Turned onto the last page; the story is now completed.
    Finished,
}

#[derive(Debug, Clone)]
pub struct ReadingSession {
    story: Story,
    current_page: usize,
    show_korean: bool,
}

impl ReadingSession {
    pub fn new(story: Story) -> Self {
        Self {
            story,
            current_page: 0,
            show_korean: false,
        }
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page(&self) -> Option<&Page> {
        self.story.pages.get(self.current_page)
    }

    pub fn page_count(&self) -> usize {
        self.story.page_count()
    }

    pub fn show_korean(&self) -> bool {
        self.show_korean
    }

    pub fn is_last_page(&self) -> bool {
        self.current_page + 1 >= self.page_count()
    }

    /// Fraction of the story reached, `0.0` for a story without pages.
    pub fn progress(&self) -> f64 {
        match self.page_count() {
            0 => 0.0,
            n => (self.current_page + 1) as f64 / n as f64,
        }
    }

    /// Advance one page, recording the read and completing the story when
    /// the last page is reached.
    ///
    /// The page only moves once the read is recorded, so a failed write
    /// leaves the session where it was and the turn can be retried.
    pub fn next_page(&mut self, tracker: &StatsTracker) -> StoreResult<PageTurn> {
        if self.is_last_page() {
            return Ok(PageTurn::Blocked);
        }
        tracker.record_event(StudyEvent::PageRead)?;
        self.current_page += 1;

        if self.is_last_page() {
            tracker.mark_completed(self.story.id, &self.story.title)?;
            return Ok(PageTurn::Finished);
        }
        Ok(PageTurn::Turned)
    }

    pub fn previous_page(&mut self) -> bool {
        if self.current_page == 0 {
            return false;
        }
        self.current_page -= 1;
        true
    }

    pub fn toggle_korean(&mut self) {
        self.show_korean = !self.show_korean;
    }

    /// Overwrite the current page after it was edited and saved.
    pub fn set_page_text(&mut self, en: &str, ko: &str) {
        if let Some(page) = self.story.pages.get_mut(self.current_page) {
            page.en = en.to_string();
            page.ko = ko.to_string();
        }
    }

    /// Replace the current page's Korean text with a fresh translation for
    /// this session only.
    pub fn retranslate(&mut self, translator: &dyn Translator) -> bool {
        let Some(page) = self.story.pages.get_mut(self.current_page) else {
            return false;
        };
        page.ko = translate_or_original(translator, &page.en, Lang::En, Lang::Ko);
        self.show_korean = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::translate::tests::fake;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn setup(pages: usize) -> (tempfile::TempDir, StatsTracker, ReadingSession) {
        let dir = tempdir().unwrap();
        let tracker = StatsTracker::with_clock(Store::open(dir.path()).unwrap(), today);
        let pages = (0..pages).map(|i| Page::new(format!("Page {i}."), "")).collect();
        let session = ReadingSession::new(Story::new("Moon", "manual", pages));
        (dir, tracker, session)
    }

    #[test]
    fn test_reading_to_the_end_completes() {
        let (_dir, tracker, mut session) = setup(3);
        assert_eq!(session.next_page(&tracker).unwrap(), PageTurn::Turned);
        assert!(!tracker.current().is_completed(session.story().id));

        assert_eq!(session.next_page(&tracker).unwrap(), PageTurn::Finished);
        let stats = tracker.current();
        assert!(stats.is_completed(session.story().id));
        assert_eq!(stats.total_pages_read, 2);
        assert_eq!(stats.study_streak, 1);

        assert_eq!(session.next_page(&tracker).unwrap(), PageTurn::Blocked);
        assert_eq!(tracker.current().total_pages_read, 2);
    }

    #[test]
    fn test_two_page_story_completes_on_first_turn() {
        let (_dir, tracker, mut session) = setup(2);
        assert_eq!(session.next_page(&tracker).unwrap(), PageTurn::Finished);
        assert_eq!(tracker.current().completed_items.len(), 1);
    }

    #[test]
    fn test_rereading_does_not_duplicate_completion() {
        let (_dir, tracker, mut session) = setup(2);
        session.next_page(&tracker).unwrap();
        session.previous_page();
        session.next_page(&tracker).unwrap();
        assert_eq!(tracker.current().completed_items.len(), 1);
        assert_eq!(tracker.current().total_pages_read, 2);
    }

    #[test]
    fn test_single_and_empty_stories_never_complete() {
        for pages in [0, 1] {
            let (_dir, tracker, mut session) = setup(pages);
            assert_eq!(session.next_page(&tracker).unwrap(), PageTurn::Blocked);
            assert!(tracker.current().completed_items.is_empty());
        }
    }

    #[test]
    fn test_failed_write_keeps_the_page() {
        let (dir, tracker, mut session) = setup(2);
        // A directory where the stats file should be makes the rename fail.
        std::fs::create_dir(dir.path().join(crate::store::STATS_FILE)).unwrap();
        assert!(session.next_page(&tracker).is_err());
        assert_eq!(session.current_page(), 0);

        std::fs::remove_dir(dir.path().join(crate::store::STATS_FILE)).unwrap();
        assert_eq!(session.next_page(&tracker).unwrap(), PageTurn::Finished);
        assert!(tracker.current().is_completed(session.story().id));
    }

    #[test]
    fn test_previous_at_start_is_no_op() {
        let (_dir, _tracker, mut session) = setup(3);
        assert!(!session.previous_page());
        assert_eq!(session.current_page(), 0);
    }

    #[test]
    fn test_progress() {
        let (_dir, tracker, mut session) = setup(4);
        assert_eq!(session.progress(), 0.25);
        session.next_page(&tracker).unwrap();
        assert_eq!(session.progress(), 0.5);
        let (_dir, _tracker, empty) = setup(0);
        assert_eq!(empty.progress(), 0.0);
        assert!(empty.page().is_none());
    }

    #[test]
    fn test_retranslate_and_toggle() {
        let (_dir, _tracker, mut session) = setup(1);
        assert!(!session.show_korean());
        session.toggle_korean();
        assert!(session.show_korean());

        let dict = fake(&[("Page 0.", "0쪽.")]);
        assert!(session.retranslate(&dict));
        assert_eq!(session.page().unwrap().ko, "0쪽.");
    }
}
