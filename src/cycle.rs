//! Display cycle coordinator
//!
//! Owns every piece of mutable state the firmware has: the catalog, the button
//! machine, what is on screen and the last rendered time. The main loop calls
//! [`DisplayCycle::tick`] at the button poll interval; each call handles the
//! button first, then the periodic catalog refresh, then the display refresh.

use log::{debug, info, warn};
use rand::rngs::StdRng;

use crate::catalog::{Catalog, ClockImage};
use crate::clock::TimeCode;
use crate::config::Config;
use crate::input::{ButtonAction, ButtonMachine, ButtonState};
use crate::layout::{self, flatten_verse_breaks};
use crate::source::{CatalogSource, ClockSource, Content, Frame, Poem, PoemSource, Renderer};

/// Poem and photograph currently on the panel
#[derive(Debug, Clone)]
struct Shown {
    image: ClockImage,
    poem: Poem,
}

pub struct DisplayCycle<C, P, K, R> {
    config: Config,
    screen_id: String,
    catalogs: C,
    poems: P,
    clock: K,
    renderer: R,
    rng: StdRng,
    button: ButtonMachine,
    catalog: Catalog,
    catalog_due_at: u64,
    render_retry_at: u64,
    last_rendered: Option<TimeCode>,
    shown: Option<Shown>,
    view: Content,
}

impl<C, P, K, R> DisplayCycle<C, P, K, R>
where
    C: CatalogSource,
    P: PoemSource,
    K: ClockSource,
    R: Renderer,
{
    pub fn new(
        config: Config,
        screen_id: String,
        catalogs: C,
        poems: P,
        clock: K,
        renderer: R,
        rng: StdRng,
    ) -> Self {
        let button = ButtonMachine::new(config.button);
        Self {
            config,
            screen_id,
            catalogs,
            poems,
            clock,
            renderer,
            rng,
            button,
            catalog: Catalog::empty(),
            catalog_due_at: 0,
            render_retry_at: 0,
            last_rendered: None,
            shown: None,
            view: Content::Poem,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn last_rendered(&self) -> Option<TimeCode> {
        self.last_rendered
    }

    pub fn is_note_shown(&self) -> bool {
        self.view == Content::Note
    }

    /// Run one loop iteration; never fails, every error is logged and absorbed
    pub fn tick(&mut self, now_ms: u64, sample: ButtonState) {
        if let Some(action) = self.button.poll(now_ms, sample, self.is_note_shown()) {
            self.handle_action(action, now_ms);
        }

        if now_ms >= self.catalog_due_at {
            self.refresh_catalog(now_ms);
        }

        // An open note is only closed by a dismiss
        if self.is_note_shown() {
            return;
        }

        self.refresh_display(now_ms);
    }

    fn handle_action(&mut self, action: ButtonAction, now_ms: u64) {
        match action {
            ButtonAction::Primary => self.show_note(),
            ButtonAction::Secondary => self.like(),
            ButtonAction::Dismiss => self.dismiss_note(now_ms),
        }
    }

    fn show_note(&mut self) {
        let Some(shown) = &self.shown else {
            info!("Nothing on screen yet");
            return;
        };
        if shown.poem.note.is_none() {
            info!("No note for this poem");
            return;
        }
        if draw(&mut self.renderer, &self.config, shown, Content::Note) {
            self.view = Content::Note;
        }
    }

    fn like(&mut self) {
        let Some(poem_id) = self.shown.as_ref().and_then(|shown| shown.poem.poem_id.as_deref()) else {
            info!("Nothing to like");
            return;
        };
        match self.poems.like(poem_id, &self.screen_id) {
            Ok(()) => info!("Liked poem {}", poem_id),
            Err(e) => warn!("Like for poem {} failed: {:#}", poem_id, e),
        }
    }

    fn dismiss_note(&mut self, now_ms: u64) {
        self.view = Content::Poem;

        // Without a clock reading the minute is assumed unchanged
        let current = self.clock.now().map(|time| time.time_code());
        let minute_changed = current.is_some() && current != self.last_rendered;
        match &self.shown {
            Some(shown) if !minute_changed => {
                if !draw(&mut self.renderer, &self.config, shown, Content::Poem) {
                    // the note is still on the panel, fetch and draw from scratch
                    self.last_rendered = None;
                }
            }
            // Minute moved on while the note was up; the refresh in this tick draws it
            _ => {
                debug!("Dismissed note at {} ms, refreshing", now_ms);
                self.render_retry_at = 0;
            }
        }
    }

    fn refresh_catalog(&mut self, now_ms: u64) {
        match self.catalogs.fetch_catalog() {
            Ok(catalog) => {
                info!("Clock index loaded: {} times", catalog.len());
                self.catalog = catalog;
                self.catalog_due_at = now_ms + self.config.catalog_refresh_ms;
            }
            Err(e) => {
                let wait = if self.catalog.is_empty() {
                    self.config.retry_ms
                } else {
                    self.config.catalog_refresh_ms
                };
                warn!(
                    "Clock index fetch failed, keeping {} times, next try in {} s: {:#}",
                    self.catalog.len(),
                    wait / 1000,
                    e
                );
                self.catalog_due_at = now_ms + wait;
            }
        }
    }

    fn refresh_display(&mut self, now_ms: u64) {
        let Some(now) = self.clock.now() else {
            debug!("Clock not set, skipping tick");
            return;
        };
        let time_code = now.time_code();
        if self.last_rendered == Some(time_code) || now_ms < self.render_retry_at {
            return;
        }

        let Some(found) = self.catalog.find_best_image(time_code, &mut self.rng) else {
            debug!("No clock for {}, keeping the screen as it is", time_code);
            return;
        };
        info!(
            "Time {}: clock {} (diff {}) {}",
            time_code,
            found.time_code,
            found.diff,
            found.image.url()
        );
        let image = found.image.clone();

        let poem = match self.poems.compose(&now.time24(), &self.screen_id) {
            Ok(poem) => poem,
            Err(e) => {
                warn!("Poem fetch failed, using placeholder: {:#}", e);
                Poem::placeholder()
            }
        };

        let shown = Shown { image, poem };
        if draw(&mut self.renderer, &self.config, &shown, Content::Poem) {
            self.last_rendered = Some(time_code);
            self.shown = Some(shown);
        } else {
            self.render_retry_at = now_ms + self.config.retry_ms;
        }
    }
}

/// Lay out and render one frame; `false` when the panel was not updated
fn draw<R: Renderer>(renderer: &mut R, config: &Config, shown: &Shown, content: Content) -> bool {
    let text = match (content, &shown.poem.note) {
        (Content::Poem, _) => flatten_verse_breaks(&shown.poem.text),
        (Content::Note, Some(note)) => note.body.clone(),
        (Content::Note, None) => return false,
    };

    let zone = config.geometry.map_zone(shown.image.rect());
    let layout = match renderer.measurer(shown.poem.font) {
        Some(measure) => layout::fit(&text, zone, measure, &config.layout),
        None => layout::fit(&text, zone, &config.fallback_font, &config.layout),
    };
    info!(
        "Drawing {:?}: size {}, {} lines",
        content,
        layout.font_size,
        layout.lines.len()
    );

    let frame = Frame {
        image: &shown.image,
        layout: &layout,
        font: shown.poem.font,
        content,
    };
    match renderer.render(&frame) {
        Ok(()) => true,
        Err(e) => {
            warn!("Render failed: {:#}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    use anyhow::{anyhow, Result};
    use rand::SeedableRng;

    use super::*;
    use crate::catalog::{CatalogLimits, ImageZone, Strip, TimeEntry};
    use crate::clock::WallTime;
    use crate::layout::{FixedCellMetrics, SizeRange, TextMeasure};
    use crate::source::{FontPreference, Note};

    #[derive(Debug, Default)]
    struct Calls {
        catalog_fetches: usize,
        composes: Vec<String>,
        likes: Vec<String>,
        /// Font asked of the renderer for each layout
        measured: Vec<FontPreference>,
        /// Every render attempt, failed ones included: content, url, lines, font size
        renders: Vec<(Content, String, Vec<String>, u32)>,
    }

    type Shared = Rc<RefCell<Calls>>;

    struct FakeCatalogs {
        calls: Shared,
        results: VecDeque<Result<Catalog>>,
    }

    impl CatalogSource for FakeCatalogs {
        fn fetch_catalog(&mut self) -> Result<Catalog> {
            self.calls.borrow_mut().catalog_fetches += 1;
            self.results.pop_front().unwrap_or_else(|| Err(anyhow!("offline")))
        }
    }

    struct FakePoems {
        calls: Shared,
        poem: Option<Poem>,
    }

    impl PoemSource for FakePoems {
        fn compose(&mut self, time24: &str, screen_id: &str) -> Result<Poem> {
            assert_eq!(screen_id, "A0B1C2D3E4F5");
            self.calls.borrow_mut().composes.push(time24.to_string());
            self.poem.clone().ok_or_else(|| anyhow!("503"))
        }

        fn like(&mut self, poem_id: &str, _screen_id: &str) -> Result<()> {
            self.calls.borrow_mut().likes.push(poem_id.to_string());
            Ok(())
        }
    }

    struct FakeClock(Rc<Cell<Option<WallTime>>>);

    impl ClockSource for FakeClock {
        fn now(&self) -> Option<WallTime> {
            self.0.get()
        }
    }

    /// Offers its own metrics for Playfair only, Inter goes to the fallback cells
    struct FakeRenderer {
        calls: Shared,
        fail: Rc<Cell<bool>>,
        serif: FixedCellMetrics,
    }

    impl Renderer for FakeRenderer {
        fn measurer(&self, font: FontPreference) -> Option<&dyn TextMeasure> {
            self.calls.borrow_mut().measured.push(font);
            match font {
                FontPreference::Playfair => Some(&self.serif),
                FontPreference::Inter => None,
            }
        }

        fn render(&mut self, frame: &Frame<'_>) -> Result<()> {
            self.calls.borrow_mut().renders.push((
                frame.content,
                frame.image.url().to_string(),
                frame.layout.lines.clone(),
                frame.layout.font_size,
            ));
            if self.fail.get() {
                Err(anyhow!("busy pin stuck"))
            } else {
                Ok(())
            }
        }
    }

    fn catalog(codes: &[u16]) -> Catalog {
        let entries = codes
            .iter()
            .map(|&code| {
                let image = ClockImage::new(
                    format!("https://example.test/{:04}.bin", code),
                    ImageZone::Strip(Strip::Middle),
                );
                TimeEntry::new(TimeCode::new(code).unwrap(), vec![image]).unwrap()
            })
            .collect();
        Catalog::from_entries(entries, &CatalogLimits::default()).unwrap()
    }

    fn poem_with_note() -> Poem {
        Poem {
            text: "Hands at rest / the station waits".to_string(),
            font: FontPreference::Playfair,
            poem_id: Some("p1".to_string()),
            note: Some(Note {
                body: "Found above platform two".to_string(),
                note_id: Some("n1".to_string()),
            }),
        }
    }

    struct Rig {
        cycle: DisplayCycle<FakeCatalogs, FakePoems, FakeClock, FakeRenderer>,
        calls: Shared,
        time: Rc<Cell<Option<WallTime>>>,
        render_fails: Rc<Cell<bool>>,
        now: u64,
    }

    impl Rig {
        fn new(catalogs: Vec<Result<Catalog>>, poem: Option<Poem>) -> Self {
            let calls = Shared::default();
            let time = Rc::new(Cell::new(WallTime::new(23, 55)));
            let render_fails = Rc::new(Cell::new(false));
            let cycle = DisplayCycle::new(
                Config::default(),
                "A0B1C2D3E4F5".to_string(),
                FakeCatalogs {
                    calls: calls.clone(),
                    results: catalogs.into(),
                },
                FakePoems {
                    calls: calls.clone(),
                    poem,
                },
                FakeClock(time.clone()),
                FakeRenderer {
                    calls: calls.clone(),
                    fail: render_fails.clone(),
                    serif: FixedCellMetrics {
                        cell_width: 1,
                        cell_height: 1,
                        line_gap: 1,
                        sizes: SizeRange::new(12, 10, 1),
                    },
                },
                StdRng::seed_from_u64(7),
            );
            Self {
                cycle,
                calls,
                time,
                render_fails,
                now: 0,
            }
        }

        fn set_time(&self, hour: u8, minute: u8) {
            self.time.set(WallTime::new(hour, minute));
        }

        fn run(&mut self, state: ButtonState, duration_ms: u64) {
            let until = self.now + duration_ms;
            while self.now < until {
                self.now += 10;
                self.cycle.tick(self.now, state);
            }
        }

        fn idle(&mut self, duration_ms: u64) {
            self.run(ButtonState::Released, duration_ms);
        }

        fn click(&mut self) {
            self.run(ButtonState::Pressed, 100);
            self.run(ButtonState::Released, 100);
        }

        fn composes(&self) -> usize {
            self.calls.borrow().composes.len()
        }

        fn renders(&self) -> usize {
            self.calls.borrow().renders.len()
        }

        fn last_content(&self) -> Option<Content> {
            self.calls.borrow().renders.last().map(|render| render.0)
        }
    }

    #[test]
    fn unchanged_minute_is_rendered_once() {
        let mut rig = Rig::new(vec![Ok(catalog(&[100, 700]))], Some(poem_with_note()));
        rig.idle(30);
        rig.idle(5_000);

        let calls = rig.calls.borrow();
        assert_eq!(calls.catalog_fetches, 1);
        assert_eq!(calls.composes, ["23:55"]);
        assert_eq!(calls.renders.len(), 1);
        // 11:55 wraps round to 1:00
        assert_eq!(calls.renders[0].1, "https://example.test/0100.bin");
        assert_eq!(rig.cycle.last_rendered(), TimeCode::new(1155));
    }

    #[test]
    fn renderer_metrics_drive_the_layout() {
        let mut rig = Rig::new(vec![Ok(catalog(&[1155]))], Some(poem_with_note()));
        rig.idle(20);

        let calls = rig.calls.borrow();
        assert_eq!(calls.measured, [FontPreference::Playfair]);
        assert_eq!(calls.renders[0].2, ["Hands at rest the", "station waits"]);
        // only the serif metrics offer size 12
        assert_eq!(calls.renders[0].3, 12);
    }

    #[test]
    fn font_without_metrics_uses_fixed_cells() {
        let mut poem = poem_with_note();
        poem.font = FontPreference::Inter;
        let mut rig = Rig::new(vec![Ok(catalog(&[1155]))], Some(poem));
        rig.idle(20);

        let calls = rig.calls.borrow();
        assert_eq!(calls.measured, [FontPreference::Inter]);
        assert_eq!(calls.renders[0].2, ["Hands at rest the", "station waits"]);
        assert_eq!(calls.renders[0].3, 2);
    }

    #[test]
    fn new_minute_renders_again() {
        let mut rig = Rig::new(vec![Ok(catalog(&[100, 700]))], Some(poem_with_note()));
        rig.idle(20);
        rig.set_time(23, 56);
        rig.idle(20);
        assert_eq!(rig.calls.borrow().composes, ["23:55", "23:56"]);
        assert_eq!(rig.renders(), 2);
    }

    #[test]
    fn poem_failure_renders_placeholder() {
        let mut rig = Rig::new(vec![Ok(catalog(&[1155]))], None);
        rig.idle(20);

        let calls = rig.calls.borrow();
        assert_eq!(calls.renders.len(), 1);
        assert_eq!(calls.renders[0].2, ["Time moves on But", "clocks stand still"]);
        drop(calls);
        assert_eq!(rig.cycle.last_rendered(), TimeCode::new(1155));
    }

    #[test]
    fn missing_clock_skips_the_tick() {
        let mut rig = Rig::new(vec![Ok(catalog(&[1155]))], Some(poem_with_note()));
        rig.time.set(None);
        rig.idle(100);
        assert_eq!(rig.composes(), 0);
        assert_eq!(rig.renders(), 0);

        rig.set_time(11, 55);
        rig.idle(10);
        assert_eq!(rig.renders(), 1);
    }

    #[test]
    fn empty_catalog_renders_nothing_and_retries() {
        let mut rig = Rig::new(vec![], Some(poem_with_note()));
        rig.idle(1_000);
        assert_eq!(rig.calls.borrow().catalog_fetches, 1);
        assert_eq!(rig.composes(), 0);
        assert_eq!(rig.renders(), 0);
        assert!(rig.cycle.last_rendered().is_none());

        rig.idle(10_000);
        assert_eq!(rig.calls.borrow().catalog_fetches, 2);
    }

    #[test]
    fn failed_refresh_keeps_previous_catalog() {
        let mut rig = Rig::new(
            vec![Ok(catalog(&[100, 700])), Err(anyhow!("truncated body"))],
            Some(poem_with_note()),
        );
        rig.idle(10);
        assert_eq!(rig.cycle.catalog().len(), 2);

        rig.now += rig.cycle.config.catalog_refresh_ms;
        rig.idle(10);
        assert_eq!(rig.calls.borrow().catalog_fetches, 2);
        assert_eq!(rig.cycle.catalog().len(), 2);
    }

    #[test]
    fn failed_render_is_retried_later() {
        let mut rig = Rig::new(vec![Ok(catalog(&[1155]))], Some(poem_with_note()));
        rig.render_fails.set(true);
        rig.idle(1_000);
        assert_eq!(rig.renders(), 1);
        assert!(rig.cycle.last_rendered().is_none());

        rig.render_fails.set(false);
        rig.idle(10_000);
        assert_eq!(rig.renders(), 2);
        assert_eq!(rig.cycle.last_rendered(), TimeCode::new(1155));
    }

    #[test]
    fn click_shows_note_and_press_dismisses_it() {
        let mut rig = Rig::new(vec![Ok(catalog(&[1155]))], Some(poem_with_note()));
        rig.idle(20);
        rig.click();
        rig.idle(500);
        assert!(rig.cycle.is_note_shown());
        assert_eq!(rig.last_content(), Some(Content::Note));
        assert_eq!(rig.calls.borrow().renders[1].2.join(" "), "Found above platform two");

        rig.run(ButtonState::Pressed, 100);
        assert!(!rig.cycle.is_note_shown());
        // same minute: the stored poem is drawn again without a new fetch
        assert_eq!(rig.composes(), 1);
        assert_eq!(rig.renders(), 3);
        assert_eq!(rig.last_content(), Some(Content::Poem));

        // the dismissing press does not turn into a click
        rig.idle(1_000);
        assert_eq!(rig.renders(), 3);
    }

    #[test]
    fn note_blocks_refresh_until_dismissed() {
        let mut rig = Rig::new(vec![Ok(catalog(&[1155, 1200]))], Some(poem_with_note()));
        rig.idle(20);
        rig.click();
        rig.idle(500);
        assert!(rig.cycle.is_note_shown());

        rig.set_time(0, 0);
        rig.idle(2_000);
        assert_eq!(rig.composes(), 1);
        assert_eq!(rig.last_content(), Some(Content::Note));

        rig.run(ButtonState::Pressed, 100);
        assert_eq!(rig.calls.borrow().composes, ["23:55", "00:00"]);
        assert_eq!(rig.last_content(), Some(Content::Poem));
        assert_eq!(rig.cycle.last_rendered(), TimeCode::new(1200));
    }

    #[test]
    fn dismiss_without_clock_redraws_poem() {
        let mut rig = Rig::new(vec![Ok(catalog(&[1155]))], Some(poem_with_note()));
        rig.idle(20);
        rig.click();
        rig.idle(500);
        assert!(rig.cycle.is_note_shown());

        rig.time.set(None);
        rig.run(ButtonState::Pressed, 100);
        assert!(!rig.cycle.is_note_shown());
        assert_eq!(rig.renders(), 3);
        assert_eq!(rig.last_content(), Some(Content::Poem));

        // clock back within the same minute: nothing left to redraw
        rig.set_time(23, 55);
        rig.idle(1_000);
        assert_eq!(rig.renders(), 3);
        assert_eq!(rig.composes(), 1);
    }

    #[test]
    fn note_closes_after_idle_timeout() {
        let mut rig = Rig::new(vec![Ok(catalog(&[1155]))], Some(poem_with_note()));
        rig.idle(20);
        rig.click();
        rig.idle(500);
        assert!(rig.cycle.is_note_shown());

        rig.idle(10_100);
        assert!(!rig.cycle.is_note_shown());
        assert_eq!(rig.last_content(), Some(Content::Poem));
    }

    #[test]
    fn click_without_note_does_nothing() {
        let mut poem = poem_with_note();
        poem.note = None;
        let mut rig = Rig::new(vec![Ok(catalog(&[1155]))], Some(poem));
        rig.idle(20);
        rig.click();
        rig.idle(500);
        assert!(!rig.cycle.is_note_shown());
        assert_eq!(rig.renders(), 1);
    }

    #[test]
    fn double_click_likes_current_poem() {
        let mut rig = Rig::new(vec![Ok(catalog(&[1155]))], Some(poem_with_note()));
        rig.idle(20);
        rig.click();
        rig.click();
        rig.idle(500);
        assert_eq!(rig.calls.borrow().likes, ["p1"]);
        assert!(!rig.cycle.is_note_shown());
        assert_eq!(rig.renders(), 1);
    }

    #[test]
    fn placeholder_cannot_be_liked() {
        let mut rig = Rig::new(vec![Ok(catalog(&[1155]))], None);
        rig.idle(20);
        rig.click();
        rig.click();
        rig.idle(500);
        assert!(rig.calls.borrow().likes.is_empty());
    }
}
