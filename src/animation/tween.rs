use std::time::{Duration, Instant};

use crate::style::{StylePatch, StyleProp};

use super::{AnimationSource, TimingFunction};

/// Interpolates one numeric style property of one node.
///
/// The clock starts at the first frame the tween sees.
pub struct Tween {
    key: String,
    prop: Box<dyn Fn(f32) -> StyleProp + Send>,
    from: f32,
    to: f32,
    duration: Duration,
    timing: TimingFunction,
    repeat: bool,
    start: Option<Instant>,
    finished: bool,
}

impl Tween {
    /// `prop` builds the property from the interpolated value, for example
    /// `StyleProp::Rotation` or `StyleProp::Opacity`.
    pub fn new(
        key: impl Into<String>,
        prop: impl Fn(f32) -> StyleProp + Send + 'static,
        from: f32,
        to: f32,
        duration: Duration,
    ) -> Self {
        Self {
            key: key.into(),
            prop: Box::new(prop),
            from,
            to,
            duration,
            timing: TimingFunction::default(),
            repeat: false,
            start: None,
            finished: false,
        }
    }

    pub fn timing(mut self, timing: TimingFunction) -> Self {
        self.timing = timing;
        self
    }

    /// Start over from `from` every time the duration elapses.
    pub fn repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    fn progress(&mut self, now: Instant) -> f32 {
        let start = *self.start.get_or_insert(now);
        if self.duration.is_zero() {
            self.finished = !self.repeat;
            return 1.0;
        }

        let elapsed = now.saturating_duration_since(start).as_secs_f32();
        let total = self.duration.as_secs_f32();
        if elapsed >= total && !self.repeat {
            self.finished = true;
            return 1.0;
        }
        (elapsed % total) / total
    }
}

impl AnimationSource for Tween {
    fn frame(&mut self, now: Instant) -> Vec<(String, StylePatch)> {
        if self.finished {
            return Vec::new();
        }
        let progress = self.progress(now);
        let t = self.timing.evaluate(progress);
        let value = self.from + (self.to - self.from) * t;
        vec![(self.key.clone(), StylePatch::new().with((self.prop)(value)))]
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(patches: &[(String, StylePatch)]) -> f32 {
        match patches[0].1.props()[0] {
            StyleProp::Rotation(v) => v,
            ref other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_tween_interpolates_and_finishes() {
        let start = Instant::now();
        let mut tween = Tween::new("spinner", StyleProp::Rotation, 0.0, 90.0, Duration::from_secs(1));

        assert_eq!(value(&tween.frame(start)), 0.0);
        let mid = value(&tween.frame(start + Duration::from_millis(500)));
        assert!((mid - 45.0).abs() < 1e-3);
        assert!(!tween.is_finished());

        assert_eq!(value(&tween.frame(start + Duration::from_secs(2))), 90.0);
        assert!(tween.is_finished());
        assert!(tween.frame(start + Duration::from_secs(3)).is_empty());
    }

    #[test]
    fn test_repeating_tween_wraps() {
        let start = Instant::now();
        let mut tween = Tween::new("spinner", StyleProp::Rotation, 0.0, 100.0, Duration::from_secs(1))
            .repeat(true);
        tween.frame(start);

        let wrapped = value(&tween.frame(start + Duration::from_millis(1250)));
        assert!((wrapped - 25.0).abs() < 1e-2);
        assert!(!tween.is_finished());
    }
}
