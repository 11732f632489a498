use rand::Rng;
use tracing::{debug, info};

use crate::{
    data::Country,
    error::QuizError,
    selection::{MIN_TEST_SIZE, SelectionEntry, SelectionStore},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guess {
    Right,
    Wrong,
}

/// Prompt and score of a running test.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuizEngine {
    picked: Option<SelectionEntry>,
    previous: Option<SelectionEntry>,
    right: u32,
    wrong: u32,
}

impl QuizEngine {
    /// Resets the score. Refuses selections too small to alternate prompts.
    pub fn start(&mut self, selection: &SelectionStore) -> Result<(), QuizError> {
        if selection.len() < MIN_TEST_SIZE {
            return Err(QuizError::NotEnoughCountries { selected: selection.len() });
        }
        *self = Self::default();
        info!(countries = selection.len(), "test started");
        Ok(())
    }

    /// Draws the next prompt. With two or more countries the draw is uniform
    /// over everything except the previous prompt; a single country is always
    /// drawn.
    pub fn pick<R: Rng>(
        &mut self,
        selection: &SelectionStore,
        rng: &mut R,
    ) -> Result<&SelectionEntry, QuizError> {
        let entries = selection.entries();
        let choice = match entries.len() {
            0 => return Err(QuizError::EmptySelection),
            1 => entries[0].clone(),
            _ => {
                let previous = self.previous.as_ref().map(|p| &p.id);
                let candidates: Vec<&SelectionEntry> =
                    entries.iter().filter(|e| Some(&e.id) != previous).collect();
                candidates[rng.random_range(0..candidates.len())].clone()
            }
        };
        debug!(a3 = %choice.a3, "prompt picked");
        self.previous = Some(choice.clone());
        Ok(self.picked.insert(choice))
    }

    /// Scores a click against the current prompt. The prompt stays after a
    /// wrong answer.
    pub fn submit(&mut self, clicked: &Country) -> Option<Guess> {
        let picked = self.picked.as_ref()?;
        let guess = if clicked.a3 == picked.a3 {
            self.right += 1;
            Guess::Right
        } else {
            self.wrong += 1;
            Guess::Wrong
        };
        info!(guess = ?guess, right = self.right, wrong = self.wrong, "answer scored");
        Some(guess)
    }

    /// Drops the prompt when the test is left. The score stays readable
    /// until the next start.
    pub fn stop(&mut self) {
        self.picked = None;
        self.previous = None;
    }

    pub fn picked(&self) -> Option<&SelectionEntry> {
        self.picked.as_ref()
    }

    pub fn right(&self) -> u32 {
        self.right
    }

    pub fn wrong(&self) -> u32 {
        self.wrong
    }
}
