//! Top-level interaction state: which mode the map is in, where clicks go,
//! and what the side panel and tooltip show. Rendering happens through
//! [`HighlightSink`], so the whole flow runs without a terminal.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{info, warn};

use crate::{
    data::{Country, CountryId},
    error::QuizError,
    quiz::{Guess, QuizEngine},
    selection::{SelectionEntry, SelectionStore, Toggle},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Selection,
    Test,
    /// Short pause after a correct answer; clicks are swallowed.
    Interim,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    ShowSelection,
    StartTest,
    CorrectGuess,
    WrongGuess,
    AdvanceDue,
}

impl Mode {
    pub fn after(self, transition: Transition) -> Mode {
        use Transition::*;
        match (self, transition) {
            (_, ShowSelection) => Mode::Selection,
            (_, StartTest) => Mode::Test,
            (Mode::Test, CorrectGuess) => Mode::Interim,
            (Mode::Interim, AdvanceDue) => Mode::Test,
            (mode, _) => mode,
        }
    }
}

/// Visual state of one country shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Fill {
    #[default]
    Neutral,
    Selected,
    Correct,
    Incorrect,
}

/// Receives highlight changes for country shapes.
pub trait HighlightSink {
    fn set_shape_fill(&mut self, id: &CountryId, fill: Fill);
    fn set_all_shapes_fill(&mut self, fill: Fill);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Panel {
    SelectionTools,
    TestTools,
}

/// Flag and name popup next to a freshly selected country.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tooltip {
    pub entry: SelectionEntry,
    /// Terminal cell the click happened on.
    pub anchor: (u16, u16),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    Toggled(Toggle),
    Guessed(Guess),
    Ignored,
}

pub struct Machine<R: Rng> {
    mode: Mode,
    selection: SelectionStore,
    quiz: QuizEngine,
    tooltip: Option<Tooltip>,
    /// When the next round starts, set only while in `Interim`.
    advance_at: Option<Instant>,
    advance_delay: Duration,
    rng: R,
}

impl<R: Rng> Machine<R> {
    pub fn new(rng: R, advance_delay: Duration) -> Self {
        Self {
            mode: Mode::Selection,
            selection: SelectionStore::default(),
            quiz: QuizEngine::default(),
            tooltip: None,
            advance_at: None,
            advance_delay,
            rng,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn panel(&self) -> Panel {
        match self.mode {
            Mode::Selection => Panel::SelectionTools,
            Mode::Test | Mode::Interim => Panel::TestTools,
        }
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn quiz(&self) -> &QuizEngine {
        &self.quiz
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    /// Country the running test asks for.
    pub fn prompt(&self) -> Option<&SelectionEntry> {
        self.quiz.picked()
    }

    pub fn start_enabled(&self) -> bool {
        self.selection.can_start_test()
    }

    /// Deadline of the scheduled round advance, if one is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.advance_at
    }

    fn enter(&mut self, transition: Transition) {
        let next = self.mode.after(transition);
        if next != self.mode {
            info!(from = ?self.mode, to = ?next, "mode changed");
        }
        if next != Mode::Interim {
            self.advance_at = None;
        }
        self.mode = next;
    }

    pub fn show_selection(&mut self, sink: &mut impl HighlightSink) {
        self.enter(Transition::ShowSelection);
        self.quiz.stop();
        self.paint_selection(sink);
    }

    /// Starts (or restarts) a test over the current selection.
    pub fn start_test(&mut self, sink: &mut impl HighlightSink) -> Result<(), QuizError> {
        if let Err(err) = self.quiz.start(&self.selection) {
            warn!(%err, "test not started");
            return Err(err);
        }
        self.enter(Transition::StartTest);
        self.tooltip = None;
        self.advance(sink);
        Ok(())
    }

    /// Empties the selection. Only available while selecting, so a running
    /// test keeps its pool.
    pub fn clear_selection(&mut self, sink: &mut impl HighlightSink) -> bool {
        if self.mode != Mode::Selection {
            return false;
        }
        self.selection.clear();
        self.tooltip = None;
        sink.set_all_shapes_fill(Fill::Neutral);
        info!("selection cleared");
        true
    }

    pub fn hide_tooltip(&mut self) {
        self.tooltip = None;
    }

    /// Routes a click on a country shape according to the current mode.
    pub fn click(
        &mut self,
        country: &Country,
        pointer: (u16, u16),
        now: Instant,
        sink: &mut impl HighlightSink,
    ) -> ClickOutcome {
        match self.mode {
            Mode::Interim => ClickOutcome::Ignored,
            Mode::Selection => {
                let toggle = self.selection.toggle(country);
                self.tooltip = match toggle {
                    Toggle::Added => Some(Tooltip {
                        entry: SelectionEntry::from(country),
                        anchor: pointer,
                    }),
                    Toggle::Removed => None,
                };
                self.paint_selection(sink);
                ClickOutcome::Toggled(toggle)
            }
            Mode::Test => {
                let Some(guess) = self.quiz.submit(country) else {
                    return ClickOutcome::Ignored;
                };
                sink.set_all_shapes_fill(Fill::Neutral);
                match guess {
                    Guess::Right => {
                        sink.set_shape_fill(&country.id, Fill::Correct);
                        self.enter(Transition::CorrectGuess);
                        self.advance_at = Some(now + self.advance_delay);
                    }
                    Guess::Wrong => {
                        sink.set_shape_fill(&country.id, Fill::Incorrect);
                        self.enter(Transition::WrongGuess);
                    }
                }
                ClickOutcome::Guessed(guess)
            }
        }
    }

    /// Fires the scheduled round advance once its deadline has passed.
    /// Returns whether a new round started.
    pub fn tick(&mut self, now: Instant, sink: &mut impl HighlightSink) -> bool {
        match self.advance_at {
            Some(due) if now >= due => {
                self.advance_at = None;
                if self.mode != Mode::Interim {
                    return false;
                }
                self.enter(Transition::AdvanceDue);
                self.advance(sink);
                true
            }
            _ => false,
        }
    }

    fn advance(&mut self, sink: &mut impl HighlightSink) {
        match self.quiz.pick(&self.selection, &mut self.rng).map(|_| ()) {
            Ok(()) => sink.set_all_shapes_fill(Fill::Neutral),
            Err(err) => {
                warn!(%err, "no prompt available, back to selection");
                self.show_selection(sink);
            }
        }
    }

    fn paint_selection(&self, sink: &mut impl HighlightSink) {
        sink.set_all_shapes_fill(Fill::Neutral);
        for entry in self.selection.entries() {
            sink.set_shape_fill(&entry.id, Fill::Selected);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::{CountrySet, fixtures};
    use pretty_assertions::assert_eq;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashMap;

    /// Keeps the last fill per shape, like the map would show it.
    #[derive(Default, Debug)]
    pub(crate) struct RecordingSink {
        pub fills: HashMap<CountryId, Fill>,
        pub repaints: usize,
    }

    impl RecordingSink {
        pub fn fill(&self, id: &str) -> Fill {
            self.fills.get(&CountryId::from(id)).copied().unwrap_or_default()
        }
    }

    impl HighlightSink for RecordingSink {
        fn set_shape_fill(&mut self, id: &CountryId, fill: Fill) {
            self.fills.insert(id.clone(), fill);
        }

        fn set_all_shapes_fill(&mut self, fill: Fill) {
            self.repaints += 1;
            for v in self.fills.values_mut() {
                *v = fill;
            }
        }
    }

    const DELAY: Duration = Duration::from_millis(200);

    fn machine() -> Machine<StdRng> {
        Machine::new(StdRng::seed_from_u64(42), DELAY)
    }

    fn click(
        m: &mut Machine<StdRng>,
        set: &CountrySet,
        id: &str,
        sink: &mut RecordingSink,
        now: Instant,
    ) -> ClickOutcome {
        m.click(set.get(&CountryId::from(id)).unwrap(), (3, 4), now, sink)
    }

    #[test]
    fn transition_table() {
        use Transition::*;
        assert_eq!(Mode::Interim.after(ShowSelection), Mode::Selection);
        assert_eq!(Mode::Selection.after(StartTest), Mode::Test);
        assert_eq!(Mode::Test.after(CorrectGuess), Mode::Interim);
        assert_eq!(Mode::Test.after(WrongGuess), Mode::Test);
        assert_eq!(Mode::Interim.after(AdvanceDue), Mode::Test);
        // stale deadline outside interim changes nothing
        assert_eq!(Mode::Selection.after(AdvanceDue), Mode::Selection);
        assert_eq!(Mode::Selection.after(CorrectGuess), Mode::Selection);
    }

    #[test]
    fn selection_clicks_toggle_highlight_and_tooltip() {
        let set = fixtures::europe();
        let mut sink = RecordingSink::default();
        let mut m = machine();
        let now = Instant::now();

        assert_eq!(
            click(&mut m, &set, "250", &mut sink, now),
            ClickOutcome::Toggled(Toggle::Added)
        );
        assert_eq!(sink.fill("250"), Fill::Selected);
        let tip = m.tooltip().unwrap();
        assert_eq!((tip.entry.a3.as_str(), tip.anchor), ("FRA", (3, 4)));
        assert!(!m.start_enabled());

        click(&mut m, &set, "276", &mut sink, now);
        assert!(m.start_enabled());

        assert_eq!(
            click(&mut m, &set, "250", &mut sink, now),
            ClickOutcome::Toggled(Toggle::Removed)
        );
        assert_eq!(sink.fill("250"), Fill::Neutral);
        assert_eq!(sink.fill("276"), Fill::Selected);
        assert!(m.tooltip().is_none());
        assert!(!m.start_enabled());
    }

    #[test]
    fn start_test_needs_two_countries() {
        let set = fixtures::europe();
        let mut sink = RecordingSink::default();
        let mut m = machine();
        click(&mut m, &set, "250", &mut sink, Instant::now());
        assert_eq!(
            m.start_test(&mut sink),
            Err(QuizError::NotEnoughCountries { selected: 1 })
        );
        assert_eq!(m.mode(), Mode::Selection);
        assert!(m.prompt().is_none());
    }

    #[test]
    fn france_germany_round() {
        let set = fixtures::europe();
        let mut sink = RecordingSink::default();
        let mut m = machine();
        let t0 = Instant::now();
        click(&mut m, &set, "250", &mut sink, t0);
        click(&mut m, &set, "276", &mut sink, t0);

        m.start_test(&mut sink).unwrap();
        assert_eq!(m.mode(), Mode::Test);
        assert_eq!(m.panel(), Panel::TestTools);
        assert!(m.tooltip().is_none());
        let prompt = m.prompt().unwrap().id.clone();
        let other = if prompt.0 == "250" { "276" } else { "250" };

        // wrong: stays in test with the same prompt
        assert_eq!(click(&mut m, &set, other, &mut sink, t0), ClickOutcome::Guessed(Guess::Wrong));
        assert_eq!((m.quiz().right(), m.quiz().wrong()), (0, 1));
        assert_eq!(m.mode(), Mode::Test);
        assert_eq!(m.prompt().map(|p| &p.id), Some(&prompt));
        assert_eq!(sink.fill(other), Fill::Incorrect);

        // right: interim, then exactly one advance to the other country
        assert_eq!(
            click(&mut m, &set, &prompt.0, &mut sink, t0),
            ClickOutcome::Guessed(Guess::Right)
        );
        assert_eq!((m.quiz().right(), m.quiz().wrong()), (1, 1));
        assert_eq!(m.mode(), Mode::Interim);
        assert_eq!(sink.fill(&prompt.0), Fill::Correct);
        assert_eq!(sink.fill(other), Fill::Neutral);
        assert_eq!(m.next_deadline(), Some(t0 + DELAY));

        assert!(!m.tick(t0 + DELAY / 2, &mut sink));
        assert_eq!(m.mode(), Mode::Interim);
        assert!(m.tick(t0 + DELAY, &mut sink));
        assert_eq!(m.mode(), Mode::Test);
        assert_eq!(m.prompt().unwrap().id.0, other);
        assert_eq!(sink.fill(&prompt.0), Fill::Neutral);
        assert!(!m.tick(t0 + DELAY * 3, &mut sink));
        assert_eq!(m.prompt().unwrap().id.0, other);
    }

    #[test]
    fn interim_swallows_clicks() {
        let set = fixtures::europe();
        let mut sink = RecordingSink::default();
        let mut m = machine();
        let t0 = Instant::now();
        for id in ["250", "276", "724"] {
            click(&mut m, &set, id, &mut sink, t0);
        }
        m.start_test(&mut sink).unwrap();
        let prompt = m.prompt().unwrap().id.0.clone();
        click(&mut m, &set, &prompt, &mut sink, t0);
        assert_eq!(m.mode(), Mode::Interim);

        let before = (m.quiz().right(), m.quiz().wrong(), m.prompt().cloned());
        for id in ["250", "276", "724", "380"] {
            assert_eq!(click(&mut m, &set, id, &mut sink, t0), ClickOutcome::Ignored);
        }
        assert_eq!((m.quiz().right(), m.quiz().wrong(), m.prompt().cloned()), before);
    }

    #[test]
    fn leaving_interim_cancels_the_pending_advance() {
        let set = fixtures::europe();
        let mut sink = RecordingSink::default();
        let mut m = machine();
        let t0 = Instant::now();
        click(&mut m, &set, "250", &mut sink, t0);
        click(&mut m, &set, "276", &mut sink, t0);
        m.start_test(&mut sink).unwrap();
        let prompt = m.prompt().unwrap().id.0.clone();
        click(&mut m, &set, &prompt, &mut sink, t0);

        m.show_selection(&mut sink);
        assert_eq!(m.next_deadline(), None);
        assert!(!m.tick(t0 + DELAY, &mut sink));
        assert_eq!(m.mode(), Mode::Selection);
        assert!(m.prompt().is_none());
        assert!(m.quiz().picked().is_none());
        assert_eq!(sink.fill("250"), Fill::Selected);
        assert_eq!(sink.fill("276"), Fill::Selected);
    }

    #[test]
    fn selection_survives_a_test_round_trip() {
        let set = fixtures::europe();
        let mut sink = RecordingSink::default();
        let mut m = machine();
        let t0 = Instant::now();
        for id in ["724", "250", "380"] {
            click(&mut m, &set, id, &mut sink, t0);
        }
        let before = m.selection().entries().to_vec();
        m.start_test(&mut sink).unwrap();
        click(&mut m, &set, "276", &mut sink, t0);
        m.show_selection(&mut sink);
        assert_eq!(m.selection().entries(), before.as_slice());
        assert_eq!(m.panel(), Panel::SelectionTools);
    }

    #[test]
    fn leaving_the_test_drops_the_prompt() {
        let set = fixtures::europe();
        let mut sink = RecordingSink::default();
        let mut m = machine();
        let t0 = Instant::now();
        click(&mut m, &set, "250", &mut sink, t0);
        click(&mut m, &set, "276", &mut sink, t0);
        m.start_test(&mut sink).unwrap();
        assert_eq!(m.prompt(), m.quiz().picked());
        assert!(m.prompt().is_some());

        m.show_selection(&mut sink);
        assert!(m.quiz().picked().is_none());
        assert_eq!(click(&mut m, &set, "724", &mut sink, t0), ClickOutcome::Toggled(Toggle::Added));
        assert_eq!(m.selection().len(), 3);
    }

    #[test]
    fn restarting_resets_the_score() {
        let set = fixtures::europe();
        let mut sink = RecordingSink::default();
        let mut m = machine();
        let t0 = Instant::now();
        click(&mut m, &set, "250", &mut sink, t0);
        click(&mut m, &set, "276", &mut sink, t0);
        m.start_test(&mut sink).unwrap();
        click(&mut m, &set, "724", &mut sink, t0);
        assert_eq!(m.quiz().wrong(), 1);
        m.show_selection(&mut sink);
        m.start_test(&mut sink).unwrap();
        assert_eq!((m.quiz().right(), m.quiz().wrong()), (0, 0));
    }

    #[test]
    fn clear_only_while_selecting() {
        let set = fixtures::europe();
        let mut sink = RecordingSink::default();
        let mut m = machine();
        let t0 = Instant::now();
        for id in ["724", "250", "380"] {
            click(&mut m, &set, id, &mut sink, t0);
        }
        m.start_test(&mut sink).unwrap();
        assert!(!m.clear_selection(&mut sink));
        assert_eq!(m.selection().len(), 3);

        m.show_selection(&mut sink);
        assert!(m.clear_selection(&mut sink));
        assert_eq!(m.selection().len(), 0);
        assert!(!m.start_enabled());
        assert!(m.tooltip().is_none());
        assert_eq!(sink.fill("724"), Fill::Neutral);
    }

    #[test]
    fn every_correct_answer_advances_exactly_once() {
        let set = fixtures::europe();
        let mut sink = RecordingSink::default();
        let mut m = machine();
        let mut now = Instant::now();
        for id in ["250", "276", "724", "380"] {
            click(&mut m, &set, id, &mut sink, now);
        }
        m.start_test(&mut sink).unwrap();
        for round in 1..=20u32 {
            let prompt = m.prompt().unwrap().id.0.clone();
            click(&mut m, &set, &prompt, &mut sink, now);
            assert_eq!(m.quiz().right(), round);
            now += DELAY;
            assert!(m.tick(now, &mut sink));
            assert!(!m.tick(now, &mut sink));
            assert_ne!(m.prompt().unwrap().id.0, prompt);
        }
        assert_eq!(m.quiz().wrong(), 0);
    }
}
