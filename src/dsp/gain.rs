//! Gain parameter with scheduled linear ramps.
//!
//! Control operations run ahead of the render clock: they schedule a ramp
//! against an absolute sample time and return immediately, and the render
//! path evaluates the value as it reaches each sample. A new ramp always
//! starts from the value the parameter holds at schedule time, mid-ramp or
//! not, so re-fading a fading voice cannot click.

#[derive(Debug, Clone, Copy)]
struct Ramp {
    from: f64,
    to: f64,
    start: u64,
    end: u64,
}

#[derive(Debug, Clone)]
pub struct GainParam {
    value: f64,
    ramp: Option<Ramp>,
}

impl GainParam {
    pub fn new(value: f64) -> Self {
        GainParam { value, ramp: None }
    }

    /// The gain at absolute sample time `t`.
    pub fn value_at(&self, t: u64) -> f64 {
        match self.ramp {
            None => self.value,
            Some(r) => {
                if t <= r.start {
                    r.from
                } else if t >= r.end {
                    r.to
                } else {
                    let progress = (t - r.start) as f64 / (r.end - r.start) as f64;
                    r.from + (r.to - r.from) * progress
                }
            }
        }
    }

    /// Schedule a linear ramp from the current value at `now` to `target`
    /// over `duration` samples.
    pub fn ramp_to(&mut self, target: f64, now: u64, duration: u64) {
        let from = self.value_at(now);
        if duration == 0 {
            self.value = target;
            self.ramp = None;
            return;
        }
        self.value = target;
        self.ramp = Some(Ramp {
            from,
            to: target,
            start: now,
            end: now + duration,
        });
    }

    /// Set the value immediately, cancelling any ramp.
    pub fn set(&mut self, value: f64) {
        self.value = value;
        self.ramp = None;
    }
}
