//! UI rendering for story trainer.

use crate::app::{App, ConfirmDialog, InputField, MessageType, View};
use crate::models::Vocabulary;
use crate::practice::PracticeOutcome;
use crate::review::{CardPhase, QuizState};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

/// Draw the application.
pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer/status
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_footer(f, app, chunks[2]);

    // Draw popups
    if app.show_help {
        draw_help_popup(f);
    }

    if let Some(dialog) = &app.confirm_dialog {
        draw_confirm_dialog(f, dialog);
    }

    if app.editing {
        draw_edit_dialog(f, app);
    }

    if let Some(task) = &app.pending {
        draw_working(f, task.label());
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let title = format!(
        " Story Trainer - {} | streak {} day(s) ",
        app.view_title(),
        app.stats.study_streak
    );

    let tabs: Vec<Span> = vec![
        styled_tab("Library", app.view == View::Library),
        Span::raw(" "),
        styled_tab("Reader", app.view == View::Reader),
        Span::raw(" "),
        styled_tab("Quiz", app.view == View::Quiz),
        Span::raw(" "),
        styled_tab("Practice", app.view == View::Practice),
        Span::raw(" "),
        styled_tab("s:Stats", app.view == View::Stats),
    ];

    let header = Paragraph::new(Line::from(tabs))
        .block(Block::default().borders(Borders::ALL).title(title))
        .alignment(Alignment::Center);

    f.render_widget(header, area);
}

fn styled_tab(label: &str, active: bool) -> Span<'_> {
    if active {
        Span::styled(
            format!("[{}]", label),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(format!(" {} ", label), Style::default().fg(Color::Gray))
    }
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Library => draw_library(f, app, area),
        View::Reader => draw_reader(f, app, area),
        View::Quiz => draw_quiz(f, app, area),
        View::Practice => draw_practice(f, app, area),
        View::Stats => draw_stats(f, app, area),
    }
}

fn placeholder(f: &mut Frame, area: Rect, text: &str) {
    let msg = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(msg, area);
}

fn draw_library(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    if app.stories.is_empty() {
        placeholder(
            f,
            chunks[0],
            "No stories yet. Press 'a' to type one in or 'i' to import a text file.",
        );
    } else {
        let items: Vec<ListItem> = app
            .stories
            .iter()
            .enumerate()
            .map(|(i, story)| {
                let done = app.stats.is_completed(story.id);
                let mark = if done { "[x]" } else { "[ ]" };
                let name_style = if i == app.selected_index {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };

                let spans = vec![
                    Span::styled(
                        mark,
                        Style::default().fg(if done { Color::Green } else { Color::Gray }),
                    ),
                    Span::raw(" "),
                    Span::styled(&story.title, name_style),
                    Span::styled(
                        format!(" ({} pages)", story.page_count()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ];

                let style = if i == app.selected_index {
                    Style::default().bg(Color::DarkGray)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(spans)).style(style)
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Stories ({}) ", app.stories.len())),
        );
        f.render_widget(list, chunks[0]);
    }

    let stats = &app.stats;
    let summary = vec![
        Line::from(vec![
            Span::raw("Streak:     "),
            Span::styled(
                format!("{} day(s)", stats.study_streak),
                Style::default().fg(Color::Magenta),
            ),
        ]),
        Line::from(format!("Pages read: {}", stats.total_pages_read)),
        Line::from(format!("Completed:  {}", stats.completed_items.len())),
        Line::from(format!("Quiz score: {}%", stats.quiz_accuracy_percent())),
        Line::from(""),
        Line::from(Span::styled(
            if app.gemini_available() { "AI: on" } else { "AI: off (fallback)" },
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let summary = Paragraph::new(summary)
        .block(Block::default().borders(Borders::ALL).title(" Progress "));
    f.render_widget(summary, chunks[1]);
}

fn draw_reader(f: &mut Frame, app: &App, area: Rect) {
    let Some(reader) = &app.reader else {
        placeholder(f, area, "No story open.");
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let count = reader.page_count();
    let label = if count == 0 {
        "no pages".to_string()
    } else {
        format!("Page {} of {}", reader.current_page() + 1, count)
    };
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", reader.story().title)),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(reader.progress().clamp(0.0, 1.0))
        .label(label);
    f.render_widget(gauge, chunks[0]);

    let Some(page) = reader.page() else {
        placeholder(f, chunks[1], "This story has no pages.");
        return;
    };

    let body = if reader.show_korean() {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1])
    } else {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(100)])
            .split(chunks[1])
    };

    let mut english = vec![Line::from(page.en.as_str())];
    if !page.image_url.is_empty() {
        english.push(Line::from(""));
        english.push(Line::from(Span::styled(
            format!("image: {}", page.image_url),
            Style::default().fg(Color::DarkGray),
        )));
    }
    let english = Paragraph::new(english)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" English "))
        .wrap(Wrap { trim: true });
    f.render_widget(english, body[0]);

    if reader.show_korean() {
        let korean = Paragraph::new(page.ko.as_str())
            .style(Style::default().fg(Color::Cyan))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Korean "))
            .wrap(Wrap { trim: true });
        f.render_widget(korean, body[1]);
    }
}

fn draw_quiz(f: &mut Frame, app: &App, area: Rect) {
    let Some(quiz) = &app.quiz else {
        placeholder(f, area, "No quiz yet. Press 'z' on a story.");
        return;
    };

    let has_explanation = !quiz.vocabulary.explanation.is_empty();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(if has_explanation { 6 } else { 0 }),
            Constraint::Min(0),
        ])
        .split(area);

    if has_explanation {
        let explanation = Paragraph::new(quiz.vocabulary.explanation.as_str())
            .block(Block::default().borders(Borders::ALL).title(" About this story "))
            .wrap(Wrap { trim: true });
        f.render_widget(explanation, chunks[0]);
    }

    if quiz.show_word_list {
        draw_word_list(f, &quiz.vocabulary, chunks[1]);
        return;
    }

    let session = match &quiz.state {
        QuizState::NoCards => {
            placeholder(
                f,
                chunks[1],
                "No vocabulary could be found for this story, so there are no cards.",
            );
            return;
        }
        QuizState::Reviewing(session) => session,
    };

    let card = session.current_card();
    let inner = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
        .split(chunks[1]);

    let question = Paragraph::new(vec![
        Line::from(Span::styled(
            card.direction.instruction(),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            card.prompt.as_str(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title(format!(
        " Card {} of {} ",
        session.current_index() + 1,
        session.len()
    )));
    f.render_widget(question, inner[0]);

    let items: Vec<ListItem> = card
        .choices
        .iter()
        .enumerate()
        .map(|(i, choice)| {
            let style = match session.phase() {
                CardPhase::Viewing => Style::default(),
                CardPhase::Revealed { .. } if card.is_correct(choice) => {
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                }
                CardPhase::Revealed { choice: picked, .. } if picked == choice => {
                    Style::default().fg(Color::Red)
                }
                CardPhase::Revealed { .. } => Style::default().fg(Color::DarkGray),
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{}] ", i + 1), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(choice.as_str(), style),
            ]))
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Choices "));
    f.render_widget(list, inner[1]);

    let verdict = match session.phase() {
        CardPhase::Viewing => Span::styled("Pick an answer", Style::default().fg(Color::DarkGray)),
        CardPhase::Revealed { correct: true, .. } => {
            Span::styled("Correct!", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        }
        CardPhase::Revealed { correct: false, .. } => Span::styled(
            format!("Not quite. The answer is '{}'.", card.correct_answer),
            Style::default().fg(Color::Red),
        ),
    };
    let verdict = Paragraph::new(Line::from(verdict))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(verdict, inner[2]);
}

fn draw_word_list(f: &mut Frame, vocabulary: &Vocabulary, area: Rect) {
    if vocabulary.terms.is_empty() {
        placeholder(f, area, "No words were found for this story.");
        return;
    }

    let items: Vec<ListItem> = vocabulary
        .terms
        .iter()
        .enumerate()
        .map(|(i, term)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>2}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(term.english.as_str(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" - "),
                Span::styled(term.korean.as_str(), Style::default().fg(Color::Cyan)),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Word list ({}) ", vocabulary.terms.len())),
    );
    f.render_widget(list, area);
}

fn draw_practice(f: &mut Frame, app: &App, area: Rect) {
    let Some(practice) = &app.practice else {
        placeholder(f, area, "Open a page in the reader and press 'p' to practice it.");
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let target = Paragraph::new(practice.target.as_str())
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Read page {} aloud ", practice.page_index + 1)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(target, chunks[0]);

    let lines = match &practice.last {
        None => vec![Line::from("Press Enter and type what you said.")],
        Some(PracticeOutcome::Unrecognized) => vec![Line::from(Span::styled(
            "Nothing was heard. Try again.",
            Style::default().fg(Color::Yellow),
        ))],
        Some(PracticeOutcome::Scored(score)) => {
            let color = match score.feedback {
                crate::practice::Feedback::Great => Color::Green,
                crate::practice::Feedback::Almost => Color::Yellow,
                crate::practice::Feedback::TryAgain => Color::Red,
            };
            let mut lines = vec![
                Line::from(vec![
                    Span::raw("You said: "),
                    Span::styled(score.transcript.as_str(), Style::default().fg(Color::Cyan)),
                ]),
                Line::from(vec![
                    Span::raw("Score: "),
                    Span::styled(
                        format!("{}%", score.percent()),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(Span::styled(score.feedback.message(), Style::default().fg(color))),
            ];
            if !score.missed_words.is_empty() {
                lines.push(Line::from(""));
                lines.push(Line::from(format!("Missed: {}", score.missed_words.join(", "))));
            }
            lines
        }
    };

    let result = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Result "))
        .wrap(Wrap { trim: true });
    f.render_widget(result, chunks[1]);
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(0)])
        .split(area);

    let stats = &app.stats;
    let last = stats
        .last_study_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "never".to_string());
    let overview = format!(
        "Study streak: {} day(s)\nTotal study days: {}\nLast studied: {}\nPages read: {}\n\
         Speaking practice: {}\nQuiz: {}/{} correct ({}%)\nStories completed: {}",
        stats.study_streak,
        stats.total_study_days(),
        last,
        stats.total_pages_read,
        stats.total_speaking_practice,
        stats.total_quiz_correct,
        stats.total_quiz_attempts,
        stats.quiz_accuracy_percent(),
        stats.completed_items.len(),
    );
    let overview = Paragraph::new(overview)
        .block(Block::default().borders(Borders::ALL).title(" Overview "))
        .wrap(Wrap { trim: true });
    f.render_widget(overview, chunks[0]);

    if stats.completed_items.is_empty() {
        placeholder(f, chunks[1], "No completed stories yet. Read one to the last page!");
        return;
    }

    let items: Vec<ListItem> = stats
        .recent_completions(10)
        .iter()
        .rev()
        .map(|item| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    item.completed_date.format("%Y-%m-%d").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw("  "),
                Span::raw(item.title.as_str()),
            ]))
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Recently Completed "));
    f.render_widget(list, chunks[1]);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let (msg, style) = if let Some((ref message, msg_type)) = app.message {
        let color = match msg_type {
            MessageType::Info => Color::Blue,
            MessageType::Success => Color::Green,
            MessageType::Warning => Color::Yellow,
            MessageType::Error => Color::Red,
        };
        (message.clone(), Style::default().fg(color))
    } else {
        let help = match app.view {
            View::Library => "j/k:Navigate  Enter:Read  z:Quiz  a:Add  i:Import  d:Delete  s:Stats  ?:Help  q:Quit",
            View::Reader => "h/l:Page  t:Korean  T:Retranslate  e:Edit  p:Practice  z:Quiz  Esc:Back  q:Quit",
            View::Quiz => "1-4:Answer  n/p:Next/Prev  r:Retry  w:Words  R:New quiz  Esc:Back  q:Quit",
            View::Practice => "Enter:Speak  Esc:Back  q:Quit",
            View::Stats => "r:Reload  Esc:Back  q:Quit",
        };
        (help.to_string(), Style::default().fg(Color::DarkGray))
    };

    let footer = Paragraph::new(msg)
        .style(style)
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);

    let help_text = r#"
Story Trainer Keybindings

Library:
  j/k, Up/Down    Move selection
  Enter           Read story
  z               Vocabulary quiz
  a               Type in a new story
  i               Import a text file
  d               Delete story
  s               Learning stats

Reader:
  h/l, Left/Right Previous/next page
  t               Show/hide Korean
  T               Translate page again
  e               Edit page text
  p               Speaking practice

Quiz:
  1-4             Pick an answer
  n/p             Next/previous card
  r               Try the card again
  w               Show or hide the word list
  R               Build a new quiz

General:
  Esc             Back
  ?               Show this help
  q, Ctrl-C       Quit

Press any key to close
"#;

    let popup = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title(" Help "))
        .wrap(Wrap { trim: false });

    f.render_widget(popup, area);
}

fn draw_confirm_dialog(f: &mut Frame, dialog: &ConfirmDialog) {
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);

    let text = Paragraph::new(dialog.message.clone())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", dialog.title)),
        )
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(text, area);
}

fn input_title(app: &App) -> String {
    match &app.input_field {
        InputField::ImportPath => "Path to a .txt file".to_string(),
        InputField::DraftTitle => "Story title".to_string(),
        InputField::DraftPageCount { .. } => "Number of pages (1-50)".to_string(),
        InputField::DraftPageText => match &app.draft {
            Some(draft) => format!(
                "{}: page {} of {}, English text",
                draft.title(),
                draft.next_page_number(),
                draft.target_pages()
            ),
            None => "English text".to_string(),
        },
        InputField::DraftPageImage { .. } => "Image URL (optional)".to_string(),
        InputField::PageEnglish => "Edit English text".to_string(),
        InputField::PageKorean { .. } => "Edit Korean text (empty to auto-translate)".to_string(),
        InputField::Transcript => "Type what you said".to_string(),
        InputField::None => String::new(),
    }
}

fn draw_edit_dialog(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 20, f.area());
    f.render_widget(Clear, area);

    let input = Paragraph::new(app.input_buffer.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", input_title(app))),
        )
        .style(Style::default().fg(Color::Yellow));

    f.render_widget(input, area);

    // Show cursor
    let column = (area.x + 1).saturating_add(cursor_offset(&app.input_buffer));
    f.set_cursor_position((column, area.y + 1));
}

/// Terminal columns taken by `input`; Hangul takes two cells per syllable.
fn cursor_offset(input: &str) -> u16 {
    u16::try_from(input.width()).unwrap_or(u16::MAX)
}

fn draw_working(f: &mut Frame, label: &str) {
    let area = centered_rect(40, 15, f.area());
    f.render_widget(Clear, area);

    let text = Paragraph::new(label)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" Working "));
    f.render_widget(text, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{Page, Story};
    use crate::store::Store;
    use ratatui::{backend::TestBackend, Terminal};
    use tempfile::tempdir;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_library_renders_story_titles() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = Some(dir.path().to_path_buf());
        config.ai.api_key_env = "STORY_TRAINER_TEST_UNSET_KEY".to_string();
        Store::open(dir.path())
            .unwrap()
            .insert_story(&Story::new("Moon Walk", "manual", vec![Page::new("Hi.", "")]))
            .unwrap();
        let mut app = App::new(config).unwrap();

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Moon Walk"));
        assert!(text.contains("Library"));
    }

    #[test]
    fn test_quiz_word_list_toggle_renders_terms() {
        use crate::models::{TermPair, Vocabulary};
        use crate::review::QuizDeck;
        use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = Some(dir.path().to_path_buf());
        config.ai.api_key_env = "STORY_TRAINER_TEST_UNSET_KEY".to_string();
        let mut app = App::new(config).unwrap();

        let vocabulary = Vocabulary {
            terms: vec![
                TermPair::new("rabbit", "토끼").unwrap(),
                TermPair::new("carrot", "당근").unwrap(),
            ],
            ..Vocabulary::default()
        };
        app.quiz = Some(QuizDeck::new(uuid::Uuid::new_v4(), vocabulary, vec![]));
        app.view = View::Quiz;

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        assert!(!buffer_text(&terminal).contains("Word list"));

        app.handle_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::NONE));
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Word list (2)"));
        assert!(text.contains(" 1. rabbit - "));
        assert!(text.contains(" 2. carrot - "));

        app.handle_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::NONE));
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        assert!(!buffer_text(&terminal).contains("Word list"));
    }

    #[test]
    fn test_cursor_offset_counts_wide_characters() {
        assert_eq!(cursor_offset("cat"), 3);
        assert_eq!(cursor_offset("고양이"), 6);
        assert_eq!(cursor_offset("a 개"), 4);
        assert_eq!(cursor_offset(""), 0);
    }
}
