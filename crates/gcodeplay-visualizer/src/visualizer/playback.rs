//! Playback and scrub control
//!
//! A [`PlaybackController`] derives per-segment reveal state from a cursor
//! offset for one batch of segments. Small cursor moves are applied
//! incrementally and animate through a short highlight; large jumps discard
//! all transient state and recompute every segment from the offset
//! comparison alone. Every state held here can be rebuilt from the cursor.
//!
//! Revealed means `segment.stream_offset <= cursor` on both paths.

use gcodeplay_core::{Color, ToolRegistry};
use gcodeplay_settings::{ColorSettings, Config, PlaybackSettings};
use tracing::{debug, trace};

use super::segment_store::{Segment, SegmentStore};

/// Opacity of a segment when its highlight starts
const HIGHLIGHT_BASE_OPACITY: f32 = 0.9;
/// Opacity gained per highlight tick
const HIGHLIGHT_OPACITY_STEP: f32 = 0.02;

/// What a segment does to material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentRole {
    Additive,
    Subtractive,
    Travel,
}

impl SegmentRole {
    pub fn of(segment: &Segment, registry: &ToolRegistry) -> Self {
        if !segment.is_depositing {
            Self::Travel
        } else if registry.is_additive(segment.tool_index) {
            Self::Additive
        } else {
            Self::Subtractive
        }
    }
}

/// Per-segment reveal state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Hidden,
    /// Just past the cursor, pre-revealed to avoid popping
    LookAhead,
    /// Newly revealed; `remaining` ticks left before completion
    Highlight { remaining: u8 },
    Complete,
}

impl RevealState {
    pub fn is_revealed(&self) -> bool {
        matches!(self, Self::Highlight { .. } | Self::Complete)
    }
}

/// Which branch an advance took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceKind {
    Incremental,
    FullPass,
}

/// Color and opacity for the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentAppearance {
    pub color: Color,
    pub opacity: f32,
}

impl SegmentAppearance {
    const INVISIBLE: Self = Self {
        color: Color::TRANSPARENT,
        opacity: 0.0,
    };

    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0
    }
}

/// Reveal state for one batch of segments
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackController {
    offsets: Vec<u64>,
    roles: Vec<SegmentRole>,
    colors: Vec<Color>,
    states: Vec<RevealState>,
    /// Indices currently highlighted; may hold stale entries until the next tick
    animating: Vec<usize>,
    last_offset: Option<u64>,
    revealed: usize,
    look_ahead_end: usize,
    force_redraw: bool,
    settings: PlaybackSettings,
    progress_color: Color,
    travel_color: Color,
}

impl PlaybackController {
    pub fn new(
        segments: &[Segment],
        registry: &ToolRegistry,
        settings: &PlaybackSettings,
        colors: &ColorSettings,
    ) -> Self {
        Self {
            offsets: segments.iter().map(|s| s.stream_offset).collect(),
            roles: segments.iter().map(|s| SegmentRole::of(s, registry)).collect(),
            colors: segments.iter().map(|s| s.color).collect(),
            states: vec![RevealState::Hidden; segments.len()],
            animating: Vec::new(),
            last_offset: None,
            revealed: 0,
            look_ahead_end: 0,
            force_redraw: false,
            settings: settings.clone(),
            progress_color: colors.progress_color,
            travel_color: colors.travel_color,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Cursor applied by the last advance
    pub fn last_offset(&self) -> Option<u64> {
        self.last_offset
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed
    }

    pub fn state(&self, index: usize) -> Option<RevealState> {
        self.states.get(index).copied()
    }

    pub fn is_revealed(&self, index: usize) -> bool {
        self.states.get(index).is_some_and(|s| s.is_revealed())
    }

    pub fn role(&self, index: usize) -> Option<SegmentRole> {
        self.roles.get(index).copied()
    }

    /// Make the next advance take the full-pass branch.
    pub fn force_redraw(&mut self) {
        self.force_redraw = true;
    }

    fn partition(&self, offset: u64) -> usize {
        self.offsets.partition_point(|&o| o <= offset)
    }

    /// Apply a new cursor offset.
    pub fn advance(&mut self, offset: u64) -> AdvanceKind {
        let scrub = match self.last_offset {
            None => true,
            Some(last) => self.force_redraw || last.abs_diff(offset) > self.settings.scrub_distance,
        };

        if scrub {
            self.full_pass(offset);
            AdvanceKind::FullPass
        } else {
            self.incremental(offset);
            AdvanceKind::Incremental
        }
    }

    fn full_pass(&mut self, offset: u64) {
        let revealed = self.partition(offset);
        let look_ahead_end = self.partition(offset.saturating_add(self.settings.look_ahead));

        for (idx, state) in self.states.iter_mut().enumerate() {
            *state = if idx < revealed {
                RevealState::Complete
            } else if idx < look_ahead_end {
                RevealState::LookAhead
            } else {
                RevealState::Hidden
            };
        }
        self.animating.clear();
        self.revealed = revealed;
        self.look_ahead_end = look_ahead_end;
        self.last_offset = Some(offset);
        self.force_redraw = false;
        debug!(offset, revealed, "Playback full pass");
    }

    fn incremental(&mut self, offset: u64) {
        let revealed = self.partition(offset);
        let look_ahead_end = self.partition(offset.saturating_add(self.settings.look_ahead));
        let ticks = self.settings.highlight_ticks;

        for idx in self.revealed..revealed {
            self.states[idx] = if ticks == 0 || self.roles[idx] == SegmentRole::Travel {
                RevealState::Complete
            } else {
                self.animating.push(idx);
                RevealState::Highlight { remaining: ticks }
            };
        }

        let upper = look_ahead_end.max(self.look_ahead_end);
        for idx in revealed..upper {
            self.states[idx] = if idx < look_ahead_end {
                RevealState::LookAhead
            } else {
                RevealState::Hidden
            };
        }

        trace!(
            offset,
            newly_revealed = revealed.saturating_sub(self.revealed),
            "Playback incremental update"
        );
        self.revealed = revealed;
        self.look_ahead_end = look_ahead_end;
        self.last_offset = Some(offset);
    }

    /// Step highlight animations. Returns the number still animating.
    pub fn tick(&mut self) -> usize {
        // A segment hidden and revealed again between ticks is listed twice
        self.animating.sort_unstable();
        self.animating.dedup();
        let states = &mut self.states;
        self.animating.retain(|&idx| match states[idx] {
            RevealState::Highlight { remaining } if remaining > 1 => {
                states[idx] = RevealState::Highlight {
                    remaining: remaining - 1,
                };
                true
            }
            RevealState::Highlight { .. } => {
                states[idx] = RevealState::Complete;
                false
            }
            _ => false,
        });
        self.animating.len()
    }

    /// Color and opacity of segment `index` for the current state
    pub fn appearance(&self, index: usize) -> SegmentAppearance {
        let (Some(state), Some(role), Some(color)) = (
            self.states.get(index),
            self.roles.get(index),
            self.colors.get(index),
        ) else {
            return SegmentAppearance::INVISIBLE;
        };

        match (state, role) {
            (RevealState::Hidden, SegmentRole::Additive) => match self.settings.hidden_translucency
            {
                Some(opacity) => SegmentAppearance {
                    color: *color,
                    opacity,
                },
                None => SegmentAppearance::INVISIBLE,
            },
            (RevealState::LookAhead, SegmentRole::Additive) => SegmentAppearance {
                color: *color,
                opacity: 1.0,
            },
            (RevealState::Hidden | RevealState::LookAhead, _) => SegmentAppearance::INVISIBLE,
            (RevealState::Highlight { remaining }, role) => {
                let elapsed = self.settings.highlight_ticks.saturating_sub(*remaining);
                SegmentAppearance {
                    color: if *role == SegmentRole::Subtractive {
                        Color::RED
                    } else {
                        self.progress_color
                    },
                    opacity: (HIGHLIGHT_BASE_OPACITY + HIGHLIGHT_OPACITY_STEP * elapsed as f32)
                        .min(1.0),
                }
            }
            (RevealState::Complete, SegmentRole::Additive) => SegmentAppearance {
                color: *color,
                opacity: 1.0,
            },
            (RevealState::Complete, SegmentRole::Subtractive) => SegmentAppearance::INVISIBLE,
            (RevealState::Complete, SegmentRole::Travel) => {
                if self.settings.ephemeral_travels {
                    SegmentAppearance::INVISIBLE
                } else {
                    SegmentAppearance {
                        color: self.travel_color,
                        opacity: 1.0,
                    }
                }
            }
        }
    }
}

/// Drives one controller per segment batch from a single cursor
#[derive(Debug, Clone)]
pub struct PlaybackDriver {
    controllers: Vec<PlaybackController>,
    batch_size: usize,
}

impl PlaybackDriver {
    pub fn new(store: &SegmentStore, registry: &ToolRegistry, config: &Config) -> Self {
        let batch_size = config.playback.batch_size.max(1);
        let controllers = store
            .batches(batch_size)
            .map(|(_, batch)| {
                PlaybackController::new(batch, registry, &config.playback, &config.color)
            })
            .collect::<Vec<_>>();
        debug!(
            segments = store.len(),
            batches = controllers.len(),
            "Playback driver ready"
        );
        Self {
            controllers,
            batch_size,
        }
    }

    pub fn controllers(&self) -> &[PlaybackController] {
        &self.controllers
    }

    fn locate(&self, index: usize) -> Option<(&PlaybackController, usize)> {
        self.controllers
            .get(index / self.batch_size)
            .map(|c| (c, index % self.batch_size))
    }

    /// Advance every batch. Reports a full pass if any batch took one.
    pub fn advance(&mut self, offset: u64) -> AdvanceKind {
        let mut kind = AdvanceKind::Incremental;
        for controller in &mut self.controllers {
            if controller.advance(offset) == AdvanceKind::FullPass {
                kind = AdvanceKind::FullPass;
            }
        }
        kind
    }

    pub fn tick(&mut self) -> usize {
        self.controllers.iter_mut().map(|c| c.tick()).sum()
    }

    pub fn force_redraw(&mut self) {
        for controller in &mut self.controllers {
            controller.force_redraw();
        }
    }

    pub fn revealed_count(&self) -> usize {
        self.controllers.iter().map(|c| c.revealed_count()).sum()
    }

    pub fn state(&self, index: usize) -> Option<RevealState> {
        self.locate(index).and_then(|(c, i)| c.state(i))
    }

    pub fn is_revealed(&self, index: usize) -> bool {
        self.locate(index).is_some_and(|(c, i)| c.is_revealed(i))
    }

    pub fn appearance(&self, index: usize) -> SegmentAppearance {
        self.locate(index)
            .map(|(c, i)| c.appearance(i))
            .unwrap_or(SegmentAppearance::INVISIBLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::segment_store::SegmentKind;
    use gcodeplay_core::{Tool, ToolKind};
    use glam::DVec3;

    fn segments(offsets: &[u64]) -> Vec<Segment> {
        offsets
            .iter()
            .map(|&offset| Segment {
                start: DVec3::ZERO,
                end: DVec3::X,
                stream_offset: offset,
                line_number: offset as u32,
                tool_index: 0,
                color: Color::BLUE,
                is_depositing: true,
                is_perimeter: true,
                layer_height: 0.2,
                feed_rate: 1200.0,
                kind: SegmentKind::Linear,
            })
            .collect()
    }

    fn settings() -> PlaybackSettings {
        PlaybackSettings {
            scrub_distance: 100,
            look_ahead: 0,
            highlight_ticks: 3,
            ..PlaybackSettings::default()
        }
    }

    fn controller(offsets: &[u64], settings: &PlaybackSettings) -> PlaybackController {
        PlaybackController::new(
            &segments(offsets),
            &ToolRegistry::default(),
            settings,
            &ColorSettings::default(),
        )
    }

    #[test]
    fn test_first_advance_is_full_pass() {
        let mut c = controller(&[10, 20, 30], &settings());
        assert_eq!(c.advance(20), AdvanceKind::FullPass);
        assert_eq!(c.state(0), Some(RevealState::Complete));
        assert_eq!(c.state(1), Some(RevealState::Complete));
        assert_eq!(c.state(2), Some(RevealState::Hidden));
    }

    #[test]
    fn test_incremental_highlight_then_complete() {
        let mut c = controller(&[10, 20, 30], &settings());
        c.advance(0);
        assert_eq!(c.advance(20), AdvanceKind::Incremental);
        assert_eq!(c.state(1), Some(RevealState::Highlight { remaining: 3 }));
        assert_eq!(c.appearance(1).color, Color::GREEN);
        assert!((c.appearance(1).opacity - 0.9).abs() < 1e-6);

        assert_eq!(c.tick(), 2);
        assert_eq!(c.state(0), Some(RevealState::Highlight { remaining: 2 }));
        c.tick();
        assert_eq!(c.tick(), 0);
        assert_eq!(c.state(0), Some(RevealState::Complete));
        assert_eq!(c.appearance(0).color, Color::BLUE);
    }

    #[test]
    fn test_advance_is_idempotent() {
        let mut c = controller(&[10, 20, 30], &settings());
        c.advance(0);
        c.advance(25);
        let once = c.clone();
        c.advance(25);
        assert_eq!(c, once);
    }

    #[test]
    fn test_backward_scrub_clears_highlights() {
        let mut c = controller(&[10, 20, 150, 160], &settings());
        c.advance(0);
        assert_eq!(c.advance(90), AdvanceKind::Incremental);
        assert_eq!(c.advance(160), AdvanceKind::Incremental);
        assert_eq!(c.state(3), Some(RevealState::Highlight { remaining: 3 }));

        assert_eq!(c.advance(15), AdvanceKind::FullPass);
        assert_eq!(c.state(0), Some(RevealState::Complete));
        for idx in 1..4 {
            assert_eq!(c.state(idx), Some(RevealState::Hidden));
        }
        assert_eq!(c.tick(), 0);
    }

    #[test]
    fn test_small_backward_step_hides() {
        let mut c = controller(&[10, 20, 30], &settings());
        c.advance(30);
        assert_eq!(c.advance(15), AdvanceKind::Incremental);
        assert_eq!(c.revealed_count(), 1);
        assert!(!c.is_revealed(1));
        assert!(!c.is_revealed(2));
    }

    #[test]
    fn test_look_ahead_window() {
        let mut s = settings();
        s.look_ahead = 15;
        let mut c = controller(&[10, 20, 30, 40], &s);
        c.advance(10);
        assert_eq!(c.state(1), Some(RevealState::LookAhead));
        assert_eq!(c.state(2), Some(RevealState::Hidden));
        assert_eq!(c.appearance(1).opacity, 1.0);
        assert!(!c.is_revealed(1));

        c.advance(25);
        assert!(c.is_revealed(1));
        assert_eq!(c.state(2), Some(RevealState::LookAhead));
        assert_eq!(c.state(3), Some(RevealState::LookAhead));

        c.advance(12);
        assert_eq!(c.state(1), Some(RevealState::LookAhead));
        assert_eq!(c.state(2), Some(RevealState::Hidden));
        assert_eq!(c.state(3), Some(RevealState::Hidden));
    }

    #[test]
    fn test_force_redraw() {
        let mut c = controller(&[10, 20], &settings());
        c.advance(0);
        c.force_redraw();
        assert_eq!(c.advance(5), AdvanceKind::FullPass);
        assert_eq!(c.advance(6), AdvanceKind::Incremental);
    }

    #[test]
    fn test_hidden_translucency() {
        let mut s = settings();
        s.hidden_translucency = Some(0.25);
        let mut c = controller(&[10], &s);
        c.advance(0);
        assert_eq!(c.appearance(0).opacity, 0.25);
    }

    #[test]
    fn test_subtractive_and_travel_appearance() {
        let registry = ToolRegistry::new(
            vec![Tool::new("Mill", Color::WHITE, 3.0, ToolKind::Subtractive)],
            0.1,
        );
        let mut segs = segments(&[10, 20]);
        segs[1].is_depositing = false;

        let mut s = settings();
        let mut c = PlaybackController::new(&segs, &registry, &s, &ColorSettings::default());
        c.advance(0);
        c.advance(20);
        assert_eq!(c.role(0), Some(SegmentRole::Subtractive));
        assert_eq!(c.appearance(0).color, Color::RED);
        assert_eq!(c.state(1), Some(RevealState::Complete));
        assert!(!c.appearance(1).is_visible());

        s.ephemeral_travels = false;
        let mut c = PlaybackController::new(&segs, &registry, &s, &ColorSettings::default());
        c.advance(100);
        assert!(!c.appearance(0).is_visible());
        assert_eq!(c.appearance(1).color, Color::RED);
        assert!(c.appearance(1).is_visible());
    }

    #[test]
    fn test_driver_spans_batches() {
        let mut store = SegmentStore::new();
        for segment in segments(&[10, 20, 30, 40, 50]) {
            store.push(segment);
        }
        let mut config = Config::default();
        config.playback.batch_size = 2;
        config.playback.look_ahead = 0;

        let mut driver = PlaybackDriver::new(&store, &ToolRegistry::default(), &config);
        assert_eq!(driver.controllers().len(), 3);
        assert_eq!(driver.advance(35), AdvanceKind::FullPass);
        assert_eq!(driver.revealed_count(), 3);
        assert!(driver.is_revealed(2));
        assert!(!driver.is_revealed(3));
        assert!(!driver.is_revealed(99));

        assert_eq!(driver.advance(50), AdvanceKind::Incremental);
        assert_eq!(driver.state(4), Some(RevealState::Highlight { remaining: 5 }));
        assert_eq!(driver.tick(), 2);
    }
}
