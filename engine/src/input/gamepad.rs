use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// How long an unchanged, deflected axis waits before it is reported again.
pub const DIFF_REFIRE_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamepadButton {
    A,
    B,
    X,
    Y,
    LB,
    RB,
    LT,
    RT,
    Back,
    Start,
    Mid,
    LStick,
    RStick,
}

impl GamepadButton {
    pub fn index(self) -> usize {
        match self {
            GamepadButton::A => 0,
            GamepadButton::B => 1,
            GamepadButton::X => 3,
            GamepadButton::Y => 4,
            GamepadButton::LB => 6,
            GamepadButton::RB => 7,
            GamepadButton::LT => 8,
            GamepadButton::RT => 9,
            GamepadButton::Back => 10,
            GamepadButton::Start => 11,
            GamepadButton::Mid => 12,
            GamepadButton::LStick => 13,
            GamepadButton::RStick => 14,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamepadAxis {
    LStickH,
    LStickV,
    RStickH,
    RStickV,
    RT,
    LT,
    PadH,
    PadV,
}

impl GamepadAxis {
    pub fn index(self) -> usize {
        match self {
            GamepadAxis::LStickH => 0,
            GamepadAxis::LStickV => 1,
            GamepadAxis::RStickH => 2,
            GamepadAxis::RStickV => 3,
            GamepadAxis::RT => 4,
            GamepadAxis::LT => 5,
            GamepadAxis::PadH => 6,
            GamepadAxis::PadV => 7,
        }
    }

    /// The vertical partner of a horizontal stick axis.
    pub fn vertical(self) -> Option<GamepadAxis> {
        match self {
            GamepadAxis::LStickH => Some(GamepadAxis::LStickV),
            GamepadAxis::RStickH => Some(GamepadAxis::RStickV),
            GamepadAxis::PadH => Some(GamepadAxis::PadV),
            _ => None,
        }
    }
}

/// A raw device sample: axes in [-1, 1] and pressed flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamepadState {
    pub axes: Vec<f32>,
    pub buttons: Vec<bool>,
}

impl GamepadState {
    pub fn new(axes: Vec<f32>, buttons: Vec<bool>) -> Self {
        Self { axes, buttons }
    }

    pub fn axis(&self, axis: GamepadAxis) -> Option<f32> {
        self.axes.get(axis.index()).copied()
    }

    pub fn button(&self, button: GamepadButton) -> bool {
        self.buttons.get(button.index()).copied().unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty() && self.buttons.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisReport {
    pub value: f32,
    pub refired: bool,
}

/// The positions reported this frame. Absent positions are unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamepadDiff {
    axes: BTreeMap<usize, AxisReport>,
    buttons: BTreeMap<usize, bool>,
}

impl GamepadDiff {
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty() && self.buttons.is_empty()
    }

    pub fn axis(&self, axis: GamepadAxis) -> Option<f32> {
        self.axis_at(axis.index()).map(|report| report.value)
    }

    pub fn axis_at(&self, index: usize) -> Option<AxisReport> {
        self.axes.get(&index).copied()
    }

    pub fn button(&self, button: GamepadButton) -> Option<bool> {
        self.button_at(button.index())
    }

    pub fn button_at(&self, index: usize) -> Option<bool> {
        self.buttons.get(&index).copied()
    }

    /// True only when the button went down this frame.
    pub fn pressed(&self, button: GamepadButton) -> bool {
        self.button(button) == Some(true)
    }

    pub fn axes(&self) -> impl Iterator<Item = (usize, AxisReport)> + '_ {
        self.axes.iter().map(|(&index, &report)| (index, report))
    }

    pub fn buttons(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.buttons.iter().map(|(&index, &pressed)| (index, pressed))
    }

    pub fn set_axis(&mut self, index: usize, value: f32, refired: bool) {
        self.axes.insert(index, AxisReport { value, refired });
    }

    pub fn set_button(&mut self, index: usize, pressed: bool) {
        self.buttons.insert(index, pressed);
    }
}

/// Per-device differ. Buttons report on change only; a held, deflected axis
/// re-reports every `refire_delay` so sticks behave like a repeating key.
#[derive(Debug, Clone)]
pub struct GamepadSampler {
    last: GamepadState,
    // Refire clock, reset on every report of that axis.
    axes_reported_at: Vec<Option<Instant>>,
    refire_delay: Duration,
}

impl GamepadSampler {
    pub fn new(baseline: GamepadState) -> Self {
        Self::with_refire_delay(baseline, DIFF_REFIRE_DELAY)
    }

    pub fn with_refire_delay(baseline: GamepadState, refire_delay: Duration) -> Self {
        Self {
            last: baseline,
            axes_reported_at: Vec::new(),
            refire_delay,
        }
    }

    pub fn state(&self) -> &GamepadState {
        &self.last
    }

    pub fn refire_delay(&self) -> Duration {
        self.refire_delay
    }

    pub fn sample(&mut self, next: GamepadState, now: Instant) -> GamepadDiff {
        let mut diff = GamepadDiff::default();
        if self.axes_reported_at.len() < next.axes.len() {
            self.axes_reported_at.resize(next.axes.len(), None);
        }

        for (index, &value) in next.axes.iter().enumerate() {
            let changed = self.last.axes.get(index) != Some(&value);
            let refire = !changed
                && value != 0.0
                && self.axes_reported_at[index]
                    .is_some_and(|at| now.saturating_duration_since(at) > self.refire_delay);
            if changed || refire {
                diff.set_axis(index, value, refire);
                self.axes_reported_at[index] = Some(now);
            }
        }

        for (index, &pressed) in next.buttons.iter().enumerate() {
            if self.last.buttons.get(index) != Some(&pressed) {
                diff.set_button(index, pressed);
            }
        }

        self.last = next;
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(axes: &[f32], buttons: &[bool]) -> GamepadState {
        GamepadState::new(axes.to_vec(), buttons.to_vec())
    }

    #[test]
    fn identical_sample_produces_empty_diff() {
        let now = Instant::now();
        let mut sampler = GamepadSampler::new(pad(&[0.0, 0.0], &[false, false]));

        let diff = sampler.sample(pad(&[0.0, 0.0], &[false, false]), now);
        assert!(diff.is_empty());
    }

    #[test]
    fn changed_positions_are_reported_at_new_value() {
        let now = Instant::now();
        let mut sampler = GamepadSampler::new(pad(&[0.0, 0.0], &[false, false]));

        let diff = sampler.sample(pad(&[0.5, 0.0], &[false, true]), now);
        assert_eq!(
            diff.axis_at(0),
            Some(AxisReport {
                value: 0.5,
                refired: false
            })
        );
        assert_eq!(diff.axis_at(1), None);
        assert_eq!(diff.button_at(0), None);
        assert_eq!(diff.button_at(1), Some(true));
    }

    #[test]
    fn held_button_is_not_refired() {
        let start = Instant::now();
        let mut sampler = GamepadSampler::new(pad(&[], &[false]));
        let down = sampler.sample(pad(&[], &[true]), start);
        assert_eq!(down.button_at(0), Some(true));

        let later = sampler.sample(pad(&[], &[true]), start + Duration::from_secs(2));
        assert!(later.is_empty());
    }

    #[test]
    fn held_axis_refires_after_delay_and_resets_clock() {
        let start = Instant::now();
        let mut sampler = GamepadSampler::new(pad(&[0.0], &[]));

        let first = sampler.sample(pad(&[1.0], &[]), start);
        assert_eq!(first.axis(GamepadAxis::LStickH), Some(1.0));

        let early = sampler.sample(pad(&[1.0], &[]), start + Duration::from_millis(150));
        assert!(early.is_empty(), "refire needs strictly more than the delay");

        let refire = sampler.sample(pad(&[1.0], &[]), start + Duration::from_millis(160));
        assert_eq!(
            refire.axis_at(0),
            Some(AxisReport {
                value: 1.0,
                refired: true
            })
        );

        let too_soon = sampler.sample(pad(&[1.0], &[]), start + Duration::from_millis(300));
        assert!(too_soon.is_empty());

        let again = sampler.sample(pad(&[1.0], &[]), start + Duration::from_millis(311));
        assert!(again.axis_at(0).is_some_and(|r| r.refired));
    }

    #[test]
    fn resting_axis_never_refires() {
        let start = Instant::now();
        let mut sampler = GamepadSampler::new(pad(&[1.0], &[]));
        sampler.sample(pad(&[0.0], &[]), start);

        let later = sampler.sample(pad(&[0.0], &[]), start + Duration::from_secs(1));
        assert!(later.is_empty());
    }

    #[test]
    fn axis_held_since_connect_is_not_refire_eligible() {
        let start = Instant::now();
        let mut sampler = GamepadSampler::new(pad(&[-1.0], &[]));

        let later = sampler.sample(pad(&[-1.0], &[]), start + Duration::from_secs(1));
        assert!(later.is_empty());
    }
}
