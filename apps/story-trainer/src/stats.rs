//! Learning statistics: counters, completions and the daily study streak.

use crate::models::{CompletedItem, LearningStats, StoryId, StudyEvent};
use crate::store::{Store, StoreResult};
use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

/// How a study event moved the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// First event of the day after a study day yesterday.
    Extended,
    /// First event ever, or first after a gap of two or more days.
    Started,
    /// Already counted today.
    Unchanged,
    /// The last study date lies after today; streak left alone.
    ClockSkew,
}

/// Advance the streak for a study event happening on `today`.
pub fn apply_streak(stats: &mut LearningStats, today: NaiveDate) -> StreakChange {
    let change = match stats.last_study_date {
        None => StreakChange::Started,
        Some(last) if last == today => StreakChange::Unchanged,
        Some(last) if last > today => StreakChange::ClockSkew,
        Some(last) if today.signed_duration_since(last).num_days() == 1 => StreakChange::Extended,
        Some(_) => StreakChange::Started,
    };

    match change {
        StreakChange::Extended => stats.study_streak += 1,
        StreakChange::Started => stats.study_streak = 1,
        StreakChange::Unchanged | StreakChange::ClockSkew => return change,
    }

    stats.last_study_date = Some(today);
    stats.study_dates.insert(today);
    change
}

/// Bump the counter matching `event`.
pub fn count_event(stats: &mut LearningStats, event: StudyEvent) {
    match event {
        StudyEvent::PageRead => stats.total_pages_read += 1,
        StudyEvent::SpeakingPractice => stats.total_speaking_practice += 1,
        StudyEvent::QuizAttempt { correct } => {
            stats.total_quiz_attempts += 1;
            if correct {
                stats.total_quiz_correct += 1;
            }
        }
    }
}

/// Record a completion unless `id` is already completed. Returns whether it was added.
pub fn add_completion(stats: &mut LearningStats, id: StoryId, title: &str, today: NaiveDate) -> bool {
    if stats.is_completed(id) {
        return false;
    }
    stats.completed_items.push(CompletedItem {
        id,
        title: title.to_string(),
        completed_date: today,
    });
    true
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Read-modify-write front end over the persisted statistics record.
pub struct StatsTracker {
    store: Store,
    today: fn() -> NaiveDate,
}

impl StatsTracker {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            today: local_today,
        }
    }

    /// Use a fixed calendar source instead of the local clock.
    pub fn with_clock(store: Store, today: fn() -> NaiveDate) -> Self {
        Self { store, today }
    }

    pub fn current(&self) -> LearningStats {
        self.store.load_stats()
    }

    /// Count an event, update the streak, and persist.
    pub fn record_event(&self, event: StudyEvent) -> StoreResult<LearningStats> {
        self.record_event_on(event, (self.today)())
    }

    pub fn record_event_on(&self, event: StudyEvent, today: NaiveDate) -> StoreResult<LearningStats> {
        let mut stats = self.store.load_stats();
        count_event(&mut stats, event);
        self.touch_streak(&mut stats, today);
        self.store.save_stats(&stats)?;
        debug!(?event, streak = stats.study_streak, "study event recorded");
        Ok(stats)
    }

    /// Mark a story finished. Repeat calls leave the completion list alone
    /// but still count as studying today.
    pub fn mark_completed(&self, id: StoryId, title: &str) -> StoreResult<LearningStats> {
        self.mark_completed_on(id, title, (self.today)())
    }

    pub fn mark_completed_on(
        &self,
        id: StoryId,
        title: &str,
        today: NaiveDate,
    ) -> StoreResult<LearningStats> {
        let mut stats = self.store.load_stats();
        if add_completion(&mut stats, id, title, today) {
            debug!(%id, title, "story completed");
        }
        self.touch_streak(&mut stats, today);
        self.store.save_stats(&stats)?;
        Ok(stats)
    }

    fn touch_streak(&self, stats: &mut LearningStats, today: NaiveDate) {
        if apply_streak(stats, today) == StreakChange::ClockSkew {
            warn!(
                last = ?stats.last_study_date,
                %today,
                "last study date is in the future, streak left unchanged"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn tracker() -> (tempfile::TempDir, StatsTracker) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, StatsTracker::with_clock(store, || NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()))
    }

    #[test]
    fn test_first_event_starts_streak() {
        let mut stats = LearningStats::default();
        assert_eq!(apply_streak(&mut stats, day(1)), StreakChange::Started);
        assert_eq!(stats.study_streak, 1);
        assert_eq!(stats.last_study_date, Some(day(1)));
        assert!(stats.study_dates.contains(&day(1)));
    }

    #[test]
    fn test_same_day_is_idempotent() {
        let mut stats = LearningStats::default();
        apply_streak(&mut stats, day(1));
        assert_eq!(apply_streak(&mut stats, day(1)), StreakChange::Unchanged);
        assert_eq!(stats.study_streak, 1);
        assert_eq!(stats.study_dates.len(), 1);
    }

    #[test]
    fn test_consecutive_days_extend() {
        let mut stats = LearningStats::default();
        apply_streak(&mut stats, day(1));
        assert_eq!(apply_streak(&mut stats, day(2)), StreakChange::Extended);
        apply_streak(&mut stats, day(3));
        assert_eq!(stats.study_streak, 3);
        assert_eq!(stats.study_dates.len(), 3);
    }

    #[test]
    fn test_gap_resets_to_one() {
        let mut stats = LearningStats::default();
        apply_streak(&mut stats, day(1));
        apply_streak(&mut stats, day(2));
        assert_eq!(apply_streak(&mut stats, day(5)), StreakChange::Started);
        assert_eq!(stats.study_streak, 1);
        assert_eq!(stats.last_study_date, Some(day(5)));
    }

    #[test]
    fn test_month_boundary_counts_as_consecutive() {
        let mut stats = LearningStats::default();
        apply_streak(&mut stats, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        apply_streak(&mut stats, day(1));
        assert_eq!(stats.study_streak, 2);
    }

    #[test]
    fn test_clock_rollback_is_no_op() {
        let mut stats = LearningStats::default();
        apply_streak(&mut stats, day(5));
        apply_streak(&mut stats, day(6));
        assert_eq!(apply_streak(&mut stats, day(3)), StreakChange::ClockSkew);
        assert_eq!(stats.study_streak, 2);
        assert_eq!(stats.last_study_date, Some(day(6)));
        assert!(!stats.study_dates.contains(&day(3)));
    }

    #[test]
    fn test_first_page_read_today() {
        let (_dir, tracker) = tracker();
        let stats = tracker.record_event(StudyEvent::PageRead).unwrap();
        assert_eq!(stats.study_streak, 1);
        assert_eq!(stats.total_pages_read, 1);
        assert_eq!(tracker.current(), stats);
    }

    #[test]
    fn test_quiz_attempts_count_correct_answers() {
        let (_dir, tracker) = tracker();
        tracker.record_event(StudyEvent::QuizAttempt { correct: true }).unwrap();
        tracker.record_event(StudyEvent::QuizAttempt { correct: false }).unwrap();
        let stats = tracker.record_event(StudyEvent::SpeakingPractice).unwrap();
        assert_eq!(stats.total_quiz_attempts, 2);
        assert_eq!(stats.total_quiz_correct, 1);
        assert_eq!(stats.total_speaking_practice, 1);
        assert_eq!(stats.study_streak, 1);
    }

    #[test]
    fn test_events_across_days_persist_streak() {
        let (_dir, tracker) = tracker();
        tracker.record_event_on(StudyEvent::PageRead, day(1)).unwrap();
        tracker.record_event_on(StudyEvent::PageRead, day(2)).unwrap();
        let stats = tracker.record_event_on(StudyEvent::PageRead, day(2)).unwrap();
        assert_eq!(stats.study_streak, 2);
        assert_eq!(stats.total_pages_read, 3);
    }

    #[test]
    fn test_event_keeps_history_next_to_a_bad_completion() {
        let (dir, tracker) = tracker();
        let content = serde_json::json!({
            "total_pages_read": 120,
            "total_quiz_attempts": 40,
            "study_streak": 9,
            "last_study_date": "2024-03-09",
            "completed_items": [{"id": "legacy-id", "title": "Old", "completed_date": "2024-03-01"}]
        });
        std::fs::write(dir.path().join(crate::store::STATS_FILE), content.to_string()).unwrap();

        let stats = tracker.record_event(StudyEvent::PageRead).unwrap();
        assert_eq!(stats.total_pages_read, 121);
        assert_eq!(stats.total_quiz_attempts, 40);
        assert_eq!(stats.study_streak, 10);
        assert!(stats.completed_items.is_empty());
        assert_eq!(tracker.current(), stats);
    }

    #[test]
    fn test_mark_completed_is_idempotent() {
        let (_dir, tracker) = tracker();
        let id = Uuid::new_v4();
        tracker.mark_completed_on(id, "The Cat", day(1)).unwrap();
        let stats = tracker.mark_completed_on(id, "The Cat", day(2)).unwrap();
        assert_eq!(stats.completed_items.len(), 1);
        assert_eq!(stats.completed_items[0].completed_date, day(1));
        // revisiting still counts as a study day
        assert_eq!(stats.study_streak, 2);
    }
}
