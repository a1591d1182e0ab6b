//! Application state and logic.

use crate::cards::generate_cards_with;
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::import::{import_text_file, DraftProgress, ImportOutcome, StoryDraft};
use crate::models::{LearningStats, Story, StoryId, StudyEvent};
use crate::practice::{evaluate, PracticeOutcome};
use crate::reader::{PageTurn, ReadingSession};
use crate::review::QuizDeck;
use crate::stats::StatsTracker;
use crate::store::Store;
use crate::translate::{translate_or_original, ChainTranslator, Lang};
use crate::vocab::{AiExtractor, FallbackExtractor, FrequencyExtractor};
use crossterm::event::{KeyCode, KeyEvent};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Application state.
pub struct App {
    /// Configuration.
    pub config: Config,
    /// Story and stats files.
    pub store: Store,
    /// Learning statistics front end.
    pub tracker: StatsTracker,
    gemini: GeminiClient,
    /// Current view.
    pub view: View,
    /// Stories in the library.
    pub stories: Vec<Story>,
    /// Selected story index.
    pub selected_index: usize,
    /// Latest statistics snapshot.
    pub stats: LearningStats,
    /// Open story.
    pub reader: Option<ReadingSession>,
    /// Quiz for the most recently quizzed story.
    pub quiz: Option<QuizDeck>,
    /// Speaking practice on the reader's current page.
    pub practice: Option<PracticeState>,
    /// Manual entry in progress.
    pub draft: Option<StoryDraft>,
    /// Whether the text input overlay is open.
    pub editing: bool,
    /// Input buffer for editing.
    pub input_buffer: String,
    /// What the input buffer is for.
    pub input_field: InputField,
    /// Message to display.
    pub message: Option<(String, MessageType)>,
    /// Show help popup.
    pub show_help: bool,
    /// Confirmation dialog.
    pub confirm_dialog: Option<ConfirmDialog>,
    /// Slow work to run after the next frame is drawn.
    pub pending: Option<PendingTask>,
}

/// Current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Library,
    Reader,
    Quiz,
    Practice,
    Stats,
}

/// What the text input is collecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputField {
    None,
    ImportPath,
    DraftTitle,
    DraftPageCount { title: String },
    DraftPageText,
    DraftPageImage { en: String },
    PageEnglish,
    PageKorean { en: String },
    Transcript,
}

/// Message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Warning,
    Error,
}

/// Confirmation dialog.
#[derive(Debug, Clone)]
pub struct ConfirmDialog {
    pub title: String,
    pub message: String,
    pub action: ConfirmAction,
}

/// Confirm action type.
#[derive(Debug, Clone)]
pub enum ConfirmAction {
    DeleteStory(StoryId),
}

/// Work that calls out to a translator or the generative model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingTask {
    BuildQuiz { story_id: StoryId, force: bool },
    Retranslate,
    Import(PathBuf),
    DraftPage { en: String, image_url: String },
    SavePage { en: String, ko: Option<String> },
}

impl PendingTask {
    /// Shown while the task runs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BuildQuiz { .. } => "Preparing vocabulary quiz...",
            Self::Retranslate => "Translating page...",
            Self::Import(_) => "Importing story...",
            Self::DraftPage { .. } => "Translating page...",
            Self::SavePage { .. } => "Saving page...",
        }
    }
}

/// Practice target and the latest attempt.
#[derive(Debug, Clone)]
pub struct PracticeState {
    pub page_index: usize,
    pub target: String,
    pub last: Option<PracticeOutcome>,
}

impl App {
    /// Create new application.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::open(config.data_dir())?;
        let tracker = StatsTracker::new(store.clone());
        let gemini = GeminiClient::from_config(&config.ai);
        if !gemini.is_available() {
            info!(var = %config.ai.api_key_env, "no API key, using fallback translation and vocabulary");
        }

        let mut app = Self {
            config,
            store,
            tracker,
            gemini,
            view: View::Library,
            stories: Vec::new(),
            selected_index: 0,
            stats: LearningStats::default(),
            reader: None,
            quiz: None,
            practice: None,
            draft: None,
            editing: false,
            input_buffer: String::new(),
            input_field: InputField::None,
            message: None,
            show_help: false,
            confirm_dialog: None,
            pending: None,
        };

        app.refresh();
        Ok(app)
    }

    /// Reload stories and statistics from disk.
    pub fn refresh(&mut self) {
        self.stories = self.store.list_stories();
        self.stats = self.tracker.current();

        if self.selected_index >= self.stories.len() && !self.stories.is_empty() {
            self.selected_index = self.stories.len() - 1;
        }
    }

    /// Check if in editing mode.
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Get selected story.
    pub fn selected_story(&self) -> Option<&Story> {
        self.stories.get(self.selected_index)
    }

    pub fn gemini_available(&self) -> bool {
        self.gemini.is_available()
    }

    fn translator(&self) -> ChainTranslator<'_> {
        ChainTranslator::standard(&self.gemini, Duration::from_secs(self.config.ai.timeout_secs))
    }

    fn set_message(&mut self, text: impl Into<String>, kind: MessageType) {
        self.message = Some((text.into(), kind));
    }

    /// Handle key input.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.pending.is_some() {
            return;
        }

        // Handle confirmation dialog
        if let Some(dialog) = self.confirm_dialog.clone() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.confirm_dialog = None;
                    self.execute_confirm(dialog.action);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.confirm_dialog = None;
                }
                _ => {}
            }
            return;
        }

        if self.show_help {
            self.show_help = false;
            return;
        }

        // Clear message on any key
        self.message = None;

        if self.editing {
            self.handle_edit_key(key);
            return;
        }

        if key.code == KeyCode::Char('?') {
            self.show_help = true;
            return;
        }

        match self.view {
            View::Library => self.handle_library_key(key),
            View::Reader => self.handle_reader_key(key),
            View::Quiz => self.handle_quiz_key(key),
            View::Practice => self.handle_practice_key(key),
            View::Stats => self.handle_stats_key(key),
        }
    }

    fn handle_library_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('g') => self.selected_index = 0,
            KeyCode::Char('G') => {
                if !self.stories.is_empty() {
                    self.selected_index = self.stories.len() - 1;
                }
            }
            KeyCode::Enter => self.open_reader(),
            KeyCode::Char('z') => {
                if let Some(story) = self.selected_story() {
                    self.pending = Some(PendingTask::BuildQuiz {
                        story_id: story.id,
                        force: false,
                    });
                }
            }
            KeyCode::Char('a') => self.start_input(InputField::DraftTitle, String::new()),
            KeyCode::Char('i') => self.start_input(InputField::ImportPath, String::new()),
            KeyCode::Char('d') => self.confirm_delete_story(),
            KeyCode::Char('s') => self.open_stats(),
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
    }

    fn handle_reader_key(&mut self, key: KeyEvent) {
        let Some(reader) = self.reader.as_mut() else {
            self.view = View::Library;
            return;
        };

        match key.code {
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Char(' ') => self.next_page(),
            KeyCode::Char('h') | KeyCode::Left => {
                reader.previous_page();
            }
            KeyCode::Char('t') => reader.toggle_korean(),
            KeyCode::Char('T') => {
                if reader.page().is_some() {
                    self.pending = Some(PendingTask::Retranslate);
                }
            }
            KeyCode::Char('e') => {
                if let Some(page) = reader.page() {
                    let en = page.en.clone();
                    self.start_input(InputField::PageEnglish, en);
                }
            }
            KeyCode::Char('p') => self.open_practice(),
            KeyCode::Char('z') => {
                let story_id = reader.story().id;
                self.pending = Some(PendingTask::BuildQuiz { story_id, force: false });
            }
            KeyCode::Esc | KeyCode::Char('b') => {
                self.view = View::Library;
                self.refresh();
            }
            _ => {}
        }
    }

    fn handle_quiz_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('b') => {
                self.view = if self.reader.is_some() { View::Reader } else { View::Library };
                return;
            }
            KeyCode::Char('R') => {
                if let Some(quiz) = &self.quiz {
                    self.pending = Some(PendingTask::BuildQuiz {
                        story_id: quiz.story_id,
                        force: true,
                    });
                }
                return;
            }
            KeyCode::Char('w') => {
                if let Some(quiz) = self.quiz.as_mut() {
                    quiz.toggle_word_list();
                }
                return;
            }
            _ => {}
        }

        let Some(session) = self.quiz.as_mut().and_then(|q| q.session_mut()) else {
            return;
        };

        match key.code {
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if let Some(correct) = session.select_index(index) {
                    self.record_quiz_attempt(correct);
                }
            }
            KeyCode::Char('n') | KeyCode::Right | KeyCode::Char('l') => {
                session.next();
            }
            KeyCode::Char('p') | KeyCode::Left | KeyCode::Char('h') => {
                session.previous();
            }
            KeyCode::Char('r') => {
                session.retry();
            }
            _ => {}
        }
    }

    fn handle_practice_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Char('i') => {
                self.start_input(InputField::Transcript, String::new());
            }
            KeyCode::Esc | KeyCode::Char('b') => {
                self.practice = None;
                self.view = View::Reader;
            }
            _ => {}
        }
    }

    fn handle_stats_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('s') => self.view = View::Library,
            KeyCode::Char('r') => self.stats = self.tracker.current(),
            _ => {}
        }
    }

    /// Handle editing keys.
    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.cancel_input(),
            KeyCode::Enter => self.finish_editing(),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
            }
            _ => {}
        }
    }

    fn start_input(&mut self, field: InputField, initial: String) {
        self.editing = true;
        self.input_field = field;
        self.input_buffer = initial;
    }

    fn cancel_input(&mut self) {
        if matches!(
            self.input_field,
            InputField::DraftPageText | InputField::DraftPageImage { .. }
        ) {
            self.draft = None;
            self.set_message("Story entry cancelled", MessageType::Info);
        }
        self.editing = false;
        self.input_buffer.clear();
        self.input_field = InputField::None;
    }

    /// Move selection by delta.
    fn move_selection(&mut self, delta: i32) {
        if self.stories.is_empty() {
            return;
        }

        let new_index = self.selected_index as i32 + delta;
        self.selected_index = new_index.clamp(0, self.stories.len() as i32 - 1) as usize;
    }

    fn open_reader(&mut self) {
        let Some(story) = self.selected_story().cloned() else {
            return;
        };
        info!(id = %story.id, title = %story.title, "opening story");
        self.reader = Some(ReadingSession::new(story));
        self.view = View::Reader;
    }

    fn open_stats(&mut self) {
        self.stats = self.tracker.current();
        self.view = View::Stats;
    }

    fn open_practice(&mut self) {
        let Some(reader) = &self.reader else {
            return;
        };
        let Some(page) = reader.page() else {
            self.set_message("This story has no pages", MessageType::Warning);
            return;
        };
        self.practice = Some(PracticeState {
            page_index: reader.current_page(),
            target: page.en.clone(),
            last: None,
        });
        self.view = View::Practice;
    }

    fn next_page(&mut self) {
        let Some(reader) = self.reader.as_mut() else {
            return;
        };
        match reader.next_page(&self.tracker) {
            Ok(PageTurn::Finished) => {
                let title = reader.story().title.clone();
                self.set_message(format!("You finished '{}'!", title), MessageType::Success);
            }
            Ok(PageTurn::Turned) | Ok(PageTurn::Blocked) => {}
            Err(err) => {
                error!(error = %err, "failed to record page read");
                self.set_message(format!("Could not save progress: {}", err), MessageType::Error);
            }
        }
    }

    fn record_quiz_attempt(&mut self, correct: bool) {
        match self.tracker.record_event(StudyEvent::QuizAttempt { correct }) {
            Ok(stats) => self.stats = stats,
            Err(err) => {
                error!(error = %err, "failed to record quiz attempt");
                self.set_message(format!("Could not save progress: {}", err), MessageType::Error);
            }
        }
    }

    fn submit_transcript(&mut self, transcript: &str) {
        let Some(practice) = self.practice.as_mut() else {
            return;
        };
        let outcome = evaluate(&practice.target, transcript, &self.config.practice);
        practice.last = Some(outcome.clone());

        match outcome {
            PracticeOutcome::Unrecognized => {
                self.set_message("Could not hear anything. Please try again.", MessageType::Warning);
            }
            PracticeOutcome::Scored(score) => {
                match self.tracker.record_event(StudyEvent::SpeakingPractice) {
                    Ok(stats) => self.stats = stats,
                    Err(err) => {
                        error!(error = %err, "failed to record speaking practice");
                        self.set_message(format!("Could not save progress: {}", err), MessageType::Error);
                        return;
                    }
                }
                let kind = if score.is_good() { MessageType::Success } else { MessageType::Info };
                self.set_message(score.feedback.message(), kind);
            }
        }
    }

    /// Confirm delete story.
    fn confirm_delete_story(&mut self) {
        if let Some(story) = self.selected_story() {
            self.confirm_dialog = Some(ConfirmDialog {
                title: "Delete Story".to_string(),
                message: format!("Delete '{}'? This cannot be undone. (y/n)", story.title),
                action: ConfirmAction::DeleteStory(story.id),
            });
        }
    }

    /// Execute confirmed action.
    fn execute_confirm(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::DeleteStory(id) => match self.store.delete_story(id) {
                Ok(true) => {
                    if self.quiz.as_ref().is_some_and(|q| q.story_id == id) {
                        self.quiz = None;
                    }
                    if self.reader.as_ref().is_some_and(|r| r.story().id == id) {
                        self.reader = None;
                    }
                    self.set_message("Story deleted", MessageType::Success);
                    self.refresh();
                }
                Ok(false) => self.set_message("Story not found", MessageType::Warning),
                Err(err) => {
                    error!(error = %err, "delete failed");
                    self.set_message(format!("Delete failed: {}", err), MessageType::Error);
                }
            },
        }
    }

    /// Finish editing and act on the input.
    fn finish_editing(&mut self) {
        let input = std::mem::take(&mut self.input_buffer);
        let field = std::mem::replace(&mut self.input_field, InputField::None);
        self.editing = false;

        match field {
            InputField::ImportPath => {
                let path = input.trim();
                if !path.is_empty() {
                    self.pending = Some(PendingTask::Import(PathBuf::from(path)));
                }
            }
            InputField::DraftTitle => {
                if input.trim().is_empty() {
                    self.set_message("Title must not be empty", MessageType::Warning);
                } else {
                    self.start_input(InputField::DraftPageCount { title: input }, String::new());
                }
            }
            InputField::DraftPageCount { title } => {
                let count = input.trim().parse::<usize>().unwrap_or(0);
                match StoryDraft::new(&title, count) {
                    Ok(draft) => {
                        self.draft = Some(draft);
                        self.start_input(InputField::DraftPageText, String::new());
                    }
                    Err(err) => {
                        self.set_message(err.to_string(), MessageType::Warning);
                        self.start_input(InputField::DraftPageCount { title }, input);
                    }
                }
            }
            InputField::DraftPageText => {
                if input.trim().is_empty() {
                    self.set_message("Page text must not be empty", MessageType::Warning);
                    self.start_input(InputField::DraftPageText, String::new());
                } else {
                    self.start_input(InputField::DraftPageImage { en: input }, String::new());
                }
            }
            InputField::DraftPageImage { en } => {
                self.pending = Some(PendingTask::DraftPage { en, image_url: input });
            }
            InputField::PageEnglish => {
                if input.trim().is_empty() {
                    self.set_message("Page text must not be empty", MessageType::Warning);
                    return;
                }
                let ko = self
                    .reader
                    .as_ref()
                    .and_then(|r| r.page())
                    .map(|p| p.ko.clone())
                    .unwrap_or_default();
                self.start_input(InputField::PageKorean { en: input }, ko);
            }
            InputField::PageKorean { en } => {
                // an empty translation asks for a fresh one
                let ko = Some(input.trim().to_string()).filter(|k| !k.is_empty());
                self.pending = Some(PendingTask::SavePage { en: en.trim().to_string(), ko });
            }
            InputField::Transcript => self.submit_transcript(&input),
            InputField::None => {}
        }
    }

    /// Run the queued task, if any. Called after a frame showing it was drawn.
    pub fn run_pending(&mut self) {
        let Some(task) = self.pending.take() else {
            return;
        };
        match task {
            PendingTask::BuildQuiz { story_id, force } => self.build_quiz(story_id, force),
            PendingTask::Retranslate => self.retranslate_page(),
            PendingTask::Import(path) => self.import_file(path),
            PendingTask::DraftPage { en, image_url } => self.add_draft_page(&en, &image_url),
            PendingTask::SavePage { en, ko } => self.save_page(en, ko),
        }
    }

    fn build_quiz(&mut self, story_id: StoryId, force: bool) {
        if !force && self.quiz.as_ref().is_some_and(|q| !q.is_stale_for(story_id)) {
            self.view = View::Quiz;
            return;
        }
        let Some(story) = self.store.get_story(story_id) else {
            self.set_message("Story not found", MessageType::Warning);
            return;
        };

        let deck = {
            let translator = self.translator();
            let limit = self.config.quiz.term_limit();
            let primary = self
                .gemini
                .is_available()
                .then(|| AiExtractor::new(&self.gemini, limit));
            let extractor = FallbackExtractor::new(primary, FrequencyExtractor::new(&translator, limit));
            let vocabulary = extractor.extract_or_empty(&story);
            let cards = generate_cards_with(
                &vocabulary.terms,
                self.config.quiz.distractors(),
                &mut rand::rng(),
            );
            QuizDeck::new(story.id, vocabulary, cards)
        };

        info!(story = %story.id, terms = deck.vocabulary.terms.len(), "quiz built");
        self.quiz = Some(deck);
        self.view = View::Quiz;
    }

    fn retranslate_page(&mut self) {
        let Some(mut reader) = self.reader.take() else {
            return;
        };
        reader.retranslate(&self.translator());
        self.reader = Some(reader);
    }

    fn import_file(&mut self, path: PathBuf) {
        let outcome = import_text_file(&path, None, &self.translator());
        match outcome {
            ImportOutcome::Imported(story) => self.save_new_story(story),
            ImportOutcome::Failed { error, details } => {
                self.set_message(format!("{} ({})", error, details), MessageType::Error);
            }
        }
    }

    fn add_draft_page(&mut self, en: &str, image_url: &str) {
        let Some(mut draft) = self.draft.take() else {
            return;
        };
        let progress = draft.add_page(en, image_url, &self.translator());
        match progress {
            Ok(DraftProgress::NeedMore(_)) => {
                self.draft = Some(draft);
                self.start_input(InputField::DraftPageText, String::new());
            }
            Ok(DraftProgress::Complete(story)) => self.save_new_story(story),
            Err(err) => {
                self.set_message(err.to_string(), MessageType::Warning);
                self.draft = Some(draft);
                self.start_input(InputField::DraftPageText, en.to_string());
            }
        }
    }

    fn save_new_story(&mut self, story: Story) {
        match self.store.insert_story(&story) {
            Ok(()) => {
                self.set_message(
                    format!("Added '{}' ({} pages)", story.title, story.page_count()),
                    MessageType::Success,
                );
                self.refresh();
                if let Some(index) = self.stories.iter().position(|s| s.id == story.id) {
                    self.selected_index = index;
                }
            }
            Err(err) => {
                error!(error = %err, "failed to save story");
                self.set_message(format!("Could not save story: {}", err), MessageType::Error);
            }
        }
    }

    fn save_page(&mut self, en: String, ko: Option<String>) {
        let Some(mut reader) = self.reader.take() else {
            return;
        };
        let ko = ko.unwrap_or_else(|| translate_or_original(&self.translator(), &en, Lang::En, Lang::Ko));
        let (id, index) = (reader.story().id, reader.current_page());

        match self.store.update_page(id, index, &en, &ko) {
            Ok(true) => {
                reader.set_page_text(&en, &ko);
                self.set_message("Page saved", MessageType::Success);
                self.refresh();
            }
            Ok(false) => self.set_message("Page no longer exists", MessageType::Warning),
            Err(err) => {
                error!(error = %err, "failed to save page");
                self.set_message(format!("Could not save page: {}", err), MessageType::Error);
            }
        }
        self.reader = Some(reader);
    }

    /// Get view title.
    pub fn view_title(&self) -> &str {
        match self.view {
            View::Library => "Library",
            View::Reader => "Reader",
            View::Quiz => "Vocabulary Quiz",
            View::Practice => "Speaking Practice",
            View::Stats => "Learning Stats",
        }
    }
}
