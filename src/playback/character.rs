//! Character slide/fade animation.
//!
//! Each character is integrated every frame: the active speaker slides in
//! from offscreen with an ease-out-cubic curve, the other fades out and then
//! snaps back to its offscreen rest position.

use crate::core::caption::Speaker;
use crate::render::renderer::{CharacterLayer, Transform};

/// Slide progress and fade per second.
pub const TRANSITION_RATE: f32 = 3.0;

/// Decelerating interpolation curve on `[0, 1]`
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Interpolate from `start` to `end`. Exact at both endpoints.
#[inline]
fn lerp(start: f32, end: f32, t: f32) -> f32 {
    start * (1.0 - t) + end * t
}

/// Animation phase derived from a character's flags
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Hidden,
    Entering(f32),
    Visible,
    Exiting(f32),
}

/// Animation state of one on-screen character
#[derive(Debug, Clone)]
pub struct CharacterState {
    pub current_x: f32,
    pub target_x: f32,
    pub start_x: f32,
    /// Fully offscreen x position
    pub rest_x: f32,
    pub y: f32,
    pub alpha: f32,
    pub slide_progress: f32,
    pub visible: bool,
    pub sliding: bool,
    pub fading: bool,
}

impl CharacterState {
    /// A hidden character parked at `rest_x`
    pub fn new(rest_x: f32, target_x: f32, y: f32) -> Self {
        Self {
            current_x: rest_x,
            target_x,
            start_x: rest_x,
            rest_x,
            y,
            alpha: 0.0,
            slide_progress: 0.0,
            visible: false,
            sliding: false,
            fading: false,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.sliding {
            Phase::Entering(self.slide_progress)
        } else if self.fading {
            Phase::Exiting(self.alpha)
        } else if self.visible {
            Phase::Visible
        } else {
            Phase::Hidden
        }
    }

    /// Whether the character needs drawing this frame
    pub fn is_drawn(&self) -> bool {
        self.visible || self.fading
    }

    /// Start sliding in from wherever the character currently is
    pub fn enter(&mut self) {
        self.visible = true;
        self.sliding = true;
        self.fading = false;
        self.slide_progress = 0.0;
        self.start_x = self.current_x;
        self.alpha = 1.0;
    }

    /// Start fading out in place
    pub fn exit(&mut self) {
        self.visible = false;
        self.sliding = false;
        self.fading = true;
    }

    /// Advance the running transition by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        if self.sliding {
            self.slide_progress = (self.slide_progress + dt * TRANSITION_RATE).min(1.0);
            let eased = ease_out_cubic(self.slide_progress);
            self.current_x = lerp(self.start_x, self.target_x, eased);
            if self.slide_progress >= 1.0 {
                self.sliding = false;
            }
        }

        if self.fading {
            self.alpha -= dt * TRANSITION_RATE;
            if self.alpha <= 0.0 {
                self.alpha = 0.0;
                self.fading = false;
                self.current_x = self.rest_x;
            }
        }
    }
}

/// Layout of the two characters on the canvas
#[derive(Debug, Clone, Copy)]
pub struct StageLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Horizontal distance from the canvas edge when fully entered
    pub margin: f32,
    /// Distance between a character's bottom edge and the canvas bottom
    pub bottom_offset: f32,
}

/// Both characters and the speaker who currently holds the stage
#[derive(Debug, Clone)]
pub struct Stage {
    a: CharacterState,
    b: CharacterState,
    current: Speaker,
}

impl Stage {
    /// Speaker A enters from the left, speaker B from the right.
    pub fn new(layout: StageLayout, size_a: (u32, u32), size_b: (u32, u32)) -> Self {
        let width = layout.canvas_width as f32;
        let height = layout.canvas_height as f32;
        let a = CharacterState::new(
            -(size_a.0 as f32),
            layout.margin,
            height - size_a.1 as f32 - layout.bottom_offset,
        );
        let b = CharacterState::new(
            width,
            width - size_b.0 as f32 - layout.margin,
            height - size_b.1 as f32 - layout.bottom_offset,
        );
        Self {
            a,
            b,
            current: Speaker::A,
        }
    }

    pub fn current_speaker(&self) -> Speaker {
        self.current
    }

    pub fn character(&self, speaker: Speaker) -> &CharacterState {
        match speaker {
            Speaker::A => &self.a,
            Speaker::B => &self.b,
        }
    }

    fn split_mut(&mut self, active: Speaker) -> (&mut CharacterState, &mut CharacterState) {
        match active {
            Speaker::A => (&mut self.a, &mut self.b),
            Speaker::B => (&mut self.b, &mut self.a),
        }
    }

    /// Run one frame. The last speaker keeps the stage through caption gaps.
    pub fn update(&mut self, speaking: Option<Speaker>, dt: f32) {
        if let Some(speaker) = speaking {
            self.current = speaker;
        }
        let (active, other) = self.split_mut(self.current);
        if !active.visible {
            active.enter();
        }
        if other.visible {
            other.exit();
        }
        self.a.update(dt);
        self.b.update(dt);
    }

    /// Draw layers for every character that is on screen
    pub fn layers(&self) -> Vec<CharacterLayer> {
        [(Speaker::A, &self.a), (Speaker::B, &self.b)]
            .into_iter()
            .filter(|(_, state)| state.is_drawn())
            .map(|(speaker, state)| CharacterLayer {
                speaker,
                transform: Transform {
                    position: (state.current_x, state.y),
                    opacity: state.alpha,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::caption::{CaptionEntry, WordSpan};
    use crate::core::time::from_frame_index;
    use crate::core::timeline::Timeline;

    const LAYOUT: StageLayout = StageLayout {
        canvas_width: 1080,
        canvas_height: 1920,
        margin: 50.0,
        bottom_offset: 100.0,
    };

    #[test]
    fn test_ease_endpoints_and_monotonic() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        let mut prev = ease_out_cubic(0.0);
        for i in 1..=1000 {
            let v = ease_out_cubic(i as f32 / 1000.0);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn test_slide_lands_exactly_on_target() {
        let mut state = CharacterState::new(-217.0, 50.3, 0.0);
        state.enter();
        state.update(0.0);
        assert_eq!(state.current_x, -217.0);
        for _ in 0..30 {
            state.update(1.0 / 60.0);
        }
        assert_eq!(state.phase(), Phase::Visible);
        assert_eq!(state.current_x, 50.3);
    }

    #[test]
    fn test_fade_snaps_to_rest() {
        let mut state = CharacterState::new(1080.0, 880.0, 0.0);
        state.enter();
        state.update(1.0);
        state.exit();
        state.update(0.1);
        assert!(matches!(state.phase(), Phase::Exiting(a) if (a - 0.7).abs() < 1e-6));
        assert_eq!(state.current_x, 880.0);
        state.update(0.5);
        assert_eq!(state.phase(), Phase::Hidden);
        assert_eq!(state.current_x, 1080.0);
        assert!(!state.is_drawn());
    }

    #[test]
    fn test_reenter_while_fading_restarts_slide() {
        let mut state = CharacterState::new(-100.0, 50.0, 0.0);
        state.enter();
        state.update(1.0);
        state.exit();
        state.update(0.1);
        state.enter();
        assert_eq!(state.phase(), Phase::Entering(0.0));
        assert_eq!(state.alpha, 1.0);
        assert_eq!(state.start_x, 50.0);
    }

    #[test]
    fn test_stage_targets() {
        let stage = Stage::new(LAYOUT, (200, 300), (180, 320));
        let a = stage.character(Speaker::A);
        let b = stage.character(Speaker::B);
        assert_eq!((a.rest_x, a.target_x, a.y), (-200.0, 50.0, 1520.0));
        assert_eq!((b.rest_x, b.target_x, b.y), (1080.0, 850.0, 1500.0));
    }

    #[test]
    fn test_speaker_handoff_at_boundary() {
        let timeline = Timeline::new(vec![
            CaptionEntry::from_words(Speaker::A, vec![WordSpan::new("first", 0.0, 1.99)])
                .unwrap(),
            CaptionEntry::from_words(Speaker::B, vec![WordSpan::new("second", 2.0, 4.0)])
                .unwrap(),
        ]);
        let mut stage = Stage::new(LAYOUT, (150, 200), (150, 200));
        let dt = 1.0 / 60.0;

        let mut handoff = None;
        for i in 0..180 {
            let t = from_frame_index(i, 60);
            let speaking = timeline.active_entry(t).map(|e| e.speaker);
            stage.update(speaking, dt);
            if matches!(stage.character(Speaker::B).phase(), Phase::Entering(_)) {
                handoff = Some(t);
                assert!(matches!(stage.character(Speaker::A).phase(), Phase::Exiting(_)));
                break;
            }
        }
        assert_eq!(handoff, Some(2.0));
    }

    #[test]
    fn test_speaker_holds_through_gap() {
        let mut stage = Stage::new(LAYOUT, (150, 200), (150, 200));
        stage.update(Some(Speaker::B), 0.5);
        stage.update(None, 0.5);
        assert_eq!(stage.current_speaker(), Speaker::B);
        assert_eq!(stage.character(Speaker::B).phase(), Phase::Visible);
        assert_eq!(stage.layers().len(), 1);
    }
}
