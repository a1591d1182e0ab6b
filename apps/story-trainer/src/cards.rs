//! Flashcard generation from term pairs.

use crate::models::{Direction, Flashcard, TermPair};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

/// Number of wrong answers offered next to the correct one.
pub const DISTRACTORS: usize = 3;

/// Build two cards per pair (one per direction) in a random order, each with
/// shuffled multiple-choice answers.
///
/// Distractors come from other pairs' answers in the same direction. Answers
/// equal to the card's own answer are never offered, and repeated answers are
/// offered once, so `choices` never holds duplicates. With fewer than
/// [`DISTRACTORS`] candidates every candidate is used.
pub fn generate_cards<R: Rng + ?Sized>(pairs: &[TermPair], rng: &mut R) -> Vec<Flashcard> {
    generate_cards_with(pairs, DISTRACTORS, rng)
}

/// [`generate_cards`] with a custom number of distractors per card.
pub fn generate_cards_with<R: Rng + ?Sized>(
    pairs: &[TermPair],
    distractors: usize,
    rng: &mut R,
) -> Vec<Flashcard> {
    let mut cards: Vec<Flashcard> = pairs
        .iter()
        .flat_map(|pair| {
            [Direction::EnToKo, Direction::KoToEn].map(|direction| Flashcard {
                direction,
                prompt: direction.prompt_of(pair).to_string(),
                correct_answer: direction.answer_of(pair).to_string(),
                choices: Vec::new(),
            })
        })
        .collect();

    cards.shuffle(rng);

    for card in &mut cards {
        let pool = distractor_pool(pairs, card.direction, &card.correct_answer);
        let mut choices: Vec<String> = pool
            .choose_multiple(rng, distractors.min(pool.len()))
            .map(|s| s.to_string())
            .collect();
        choices.push(card.correct_answer.clone());
        choices.shuffle(rng);
        card.choices = choices;
    }

    cards
}

fn distractor_pool<'a>(pairs: &'a [TermPair], direction: Direction, answer: &str) -> Vec<&'a str> {
    let mut pool: Vec<&str> = Vec::new();
    for pair in pairs {
        let candidate = direction.answer_of(pair);
        if candidate != answer && !pool.contains(&candidate) {
            pool.push(candidate);
        }
    }
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn pair(en: &str, ko: &str) -> TermPair {
        TermPair::new(en, ko).unwrap()
    }

    fn animals() -> Vec<TermPair> {
        vec![pair("cat", "고양이"), pair("dog", "개"), pair("sun", "해")]
    }

    #[test]
    fn test_two_cards_per_pair() {
        let mut rng = StdRng::seed_from_u64(7);
        let cards = generate_cards(&animals(), &mut rng);
        assert_eq!(cards.len(), 6);
        let en_to_ko = cards.iter().filter(|c| c.direction == Direction::EnToKo).count();
        assert_eq!(en_to_ko, 3);
    }

    #[test]
    fn test_cat_card_choices() {
        let mut rng = StdRng::seed_from_u64(11);
        let cards = generate_cards(&animals(), &mut rng);
        let cat = cards
            .iter()
            .find(|c| c.direction == Direction::EnToKo && c.prompt == "cat")
            .unwrap();
        assert_eq!(cat.correct_answer, "고양이");
        assert!(cat.choices.contains(&"고양이".to_string()));
        assert_eq!(cat.choices.len(), 3);
        for choice in &cat.choices {
            assert!(["고양이", "개", "해"].contains(&choice.as_str()));
        }
    }

    #[test]
    fn test_reverse_cards_use_english_answers() {
        let mut rng = StdRng::seed_from_u64(3);
        let cards = generate_cards(&animals(), &mut rng);
        let card = cards
            .iter()
            .find(|c| c.direction == Direction::KoToEn && c.prompt == "개")
            .unwrap();
        assert_eq!(card.correct_answer, "dog");
        assert!(card.choices.iter().all(|c| ["cat", "dog", "sun"].contains(&c.as_str())));
    }

    #[test]
    fn test_empty_input() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_cards(&[], &mut rng).is_empty());
    }

    #[test]
    fn test_single_pair_has_no_distractors() {
        let mut rng = StdRng::seed_from_u64(1);
        let cards = generate_cards(&[pair("moon", "달")], &mut rng);
        assert_eq!(cards.len(), 2);
        assert!(cards.iter().all(|c| c.choices == vec![c.correct_answer.clone()]));
    }

    #[test]
    fn test_shared_meanings_do_not_duplicate_choices() {
        let pairs = vec![pair("big", "큰"), pair("large", "큰"), pair("small", "작은")];
        let mut rng = StdRng::seed_from_u64(5);
        for card in generate_cards(&pairs, &mut rng) {
            let unique: HashSet<_> = card.choices.iter().collect();
            assert_eq!(unique.len(), card.choices.len());
        }
    }

    #[test]
    fn test_large_input_caps_choices() {
        let pairs: Vec<_> = (0..10).map(|i| pair(&format!("w{i}"), &format!("k{i}"))).collect();
        let mut rng = StdRng::seed_from_u64(9);
        let cards = generate_cards(&pairs, &mut rng);
        assert!(cards.iter().all(|c| c.choices.len() == DISTRACTORS + 1));
    }

    #[test]
    fn test_custom_distractor_count() {
        let pairs: Vec<_> = (0..10).map(|i| pair(&format!("w{i}"), &format!("k{i}"))).collect();
        let mut rng = StdRng::seed_from_u64(2);
        let cards = generate_cards_with(&pairs, 1, &mut rng);
        assert!(cards.iter().all(|c| c.choices.len() == 2));
    }

    proptest! {
        #[test]
        fn prop_generated_cards_hold_invariants(
            words in proptest::collection::vec(("[a-z]{1,6}", "[가-힣]{1,3}"), 0..12),
            seed in any::<u64>(),
        ) {
            let pairs: Vec<TermPair> = words
                .iter()
                .filter_map(|(en, ko)| TermPair::new(en, ko))
                .collect();
            let mut rng = StdRng::seed_from_u64(seed);
            let cards = generate_cards(&pairs, &mut rng);

            prop_assert_eq!(cards.len(), 2 * pairs.len());
            for card in &cards {
                prop_assert!(card.choices.contains(&card.correct_answer));
                prop_assert!(card.choices.len() <= DISTRACTORS + 1);
                let unique: HashSet<_> = card.choices.iter().collect();
                prop_assert_eq!(unique.len(), card.choices.len());
            }
        }
    }
}
