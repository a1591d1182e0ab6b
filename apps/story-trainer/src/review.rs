//! Flashcard review session.
//!
//! A session walks a fixed, already shuffled card sequence. Each visit to a
//! card starts in [`CardPhase::Viewing`]; picking a choice reveals the answer.
//! Navigation is only offered from the revealed phase and never leaves the
//! card range: out-of-range moves are ignored rather than reported.

use crate::models::{Flashcard, StoryId, Vocabulary};

/// What the learner currently sees for the active card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardPhase {
    /// Question shown, answer hidden.
    Viewing,
    /// Answer shown along with the learner's pick.
    Revealed { choice: String, correct: bool },
}

/// Review state over a non-empty card sequence.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    cards: Vec<Flashcard>,
    current_index: usize,
    phase: CardPhase,
}

impl ReviewSession {
    /// Start at the first card. Returns `None` for an empty sequence.
    pub fn new(cards: Vec<Flashcard>) -> Option<Self> {
        if cards.is_empty() {
            return None;
        }
        Some(Self {
            cards,
            current_index: 0,
            phase: CardPhase::Viewing,
        })
    }

    pub fn current_card(&self) -> &Flashcard {
        &self.cards[self.current_index]
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn phase(&self) -> &CardPhase {
        &self.phase
    }

    pub fn is_revealed(&self) -> bool {
        matches!(self.phase, CardPhase::Revealed { .. })
    }

    /// Answer the current card. Returns whether the pick was correct, or
    /// `None` when the answer is already revealed.
    pub fn select_choice(&mut self, choice: &str) -> Option<bool> {
        if self.is_revealed() {
            return None;
        }
        let correct = self.current_card().is_correct(choice);
        self.phase = CardPhase::Revealed {
            choice: choice.to_string(),
            correct,
        };
        Some(correct)
    }

    /// Answer by zero-based choice position.
    pub fn select_index(&mut self, index: usize) -> Option<bool> {
        let choice = self.current_card().choices.get(index)?.clone();
        self.select_choice(&choice)
    }

    pub fn can_next(&self) -> bool {
        self.is_revealed() && self.current_index + 1 < self.cards.len()
    }

    pub fn can_previous(&self) -> bool {
        self.is_revealed() && self.current_index > 0
    }

    /// Move to the next card. No effect unless revealed and not on the last card.
    pub fn next(&mut self) -> bool {
        if !self.can_next() {
            return false;
        }
        self.current_index += 1;
        self.phase = CardPhase::Viewing;
        true
    }

    /// Move to the previous card. No effect unless revealed and not on the first card.
    pub fn previous(&mut self) -> bool {
        if !self.can_previous() {
            return false;
        }
        self.current_index -= 1;
        self.phase = CardPhase::Viewing;
        true
    }

    /// Hide the answer again on the same card; choices keep their order.
    pub fn retry(&mut self) -> bool {
        if !self.is_revealed() {
            return false;
        }
        self.phase = CardPhase::Viewing;
        true
    }
}

/// Quiz state for one story.
#[derive(Debug, Clone)]
pub enum QuizState {
    /// Extraction produced nothing to review.
    NoCards,
    Reviewing(ReviewSession),
}

/// Vocabulary and review state bound to the story it was built from.
#[derive(Debug, Clone)]
pub struct QuizDeck {
    pub story_id: StoryId,
    pub vocabulary: Vocabulary,
    pub state: QuizState,
    /// Show the numbered word list instead of the current card.
    pub show_word_list: bool,
}

impl QuizDeck {
    pub fn new(story_id: StoryId, vocabulary: Vocabulary, cards: Vec<Flashcard>) -> Self {
        let state = match ReviewSession::new(cards) {
            Some(session) => QuizState::Reviewing(session),
            None => QuizState::NoCards,
        };
        Self {
            story_id,
            vocabulary,
            state,
            show_word_list: false,
        }
    }

    pub fn toggle_word_list(&mut self) {
        self.show_word_list = !self.show_word_list;
    }

    /// Whether this deck must be rebuilt for `story_id`.
    pub fn is_stale_for(&self, story_id: StoryId) -> bool {
        self.story_id != story_id
    }

    pub fn session_mut(&mut self) -> Option<&mut ReviewSession> {
        match &mut self.state {
            QuizState::Reviewing(session) => Some(session),
            QuizState::NoCards => None,
        }
    }

    pub fn session(&self) -> Option<&ReviewSession> {
        match &self.state {
            QuizState::Reviewing(session) => Some(session),
            QuizState::NoCards => None,
        }
    }
}
