//! Signal and Continuous Pattern Operations
//!
//! Continuous patterns are sampled at the midpoint of each query. The
//! random signals are not generators: every value is a hash of the
//! queried time, so the same span always gives the same numbers, on any
//! thread.

use crate::pattern::{Event, Fraction, Pattern, TimeSpan};
use std::f64::consts::TAU;

const RAND_RANGE: i64 = 536_870_912; // 2^29

/// Create a continuous signal pattern from a function of time
pub fn signal<T: Clone + Send + Sync + 'static>(
    f: impl Fn(&Fraction) -> T + Send + Sync + 'static,
) -> Pattern<T> {
    Pattern::new(move |span: &TimeSpan| {
        vec![Event::new(None, span.clone(), f(&span.midpoint()))]
    })
}

/// Sine wave signal (0 to 1)
pub fn sine() -> Pattern<f64> {
    signal(|t| ((t.to_float() * TAU).sin() + 1.0) / 2.0)
}

/// Sine wave signal (-1 to 1)
pub fn sine2() -> Pattern<f64> {
    signal(|t| (t.to_float() * TAU).sin())
}

/// Cosine wave signal (0 to 1), a quarter cycle ahead of [`sine`]
pub fn cosine() -> Pattern<f64> {
    sine().early(Fraction::new(1, 4))
}

/// Rising sawtooth (0 to 1)
pub fn saw() -> Pattern<f64> {
    signal(|t| t.cycle_pos().to_float())
}

/// Rising sawtooth (0 to 2)
pub fn saw2() -> Pattern<f64> {
    signal(|t| t.cycle_pos().to_float() * 2.0)
}

/// Falling sawtooth (1 to 0)
pub fn isaw() -> Pattern<f64> {
    signal(|t| 1.0 - t.cycle_pos().to_float())
}

/// Triangle wave (0 to 1 to 0)
pub fn tri() -> Pattern<f64> {
    Pattern::fastcat(vec![isaw(), saw()])
}

/// Square wave: 0 for the first half of each cycle, 1 for the second
pub fn square() -> Pattern<f64> {
    signal(|t| (t.cycle_pos().to_float() * 2.0).floor())
}

// ============================================
// Deterministic randomness
// ============================================

/// Reversible xorshift-style bit mixer.
pub fn xorwise(x: i64) -> i64 {
    let a = (x << 13) ^ x;
    let b = (a >> 17) ^ a;
    (b << 5) ^ b
}

/// Integer seed for a point in time. Repeats every 300 cycles.
pub fn time_to_int_seed(t: &Fraction) -> i64 {
    let pos = (t / Fraction::from_integer(300)).cycle_pos();
    xorwise((pos * Fraction::from_integer(RAND_RANGE)).floor_i64())
}

pub fn int_seed_to_rand(seed: i64) -> f64 {
    seed.rem_euclid(RAND_RANGE) as f64 / RAND_RANGE as f64
}

/// Pseudorandom number in `[0, 1)` for a point in time.
pub fn time_to_rand(t: &Fraction) -> f64 {
    int_seed_to_rand(time_to_int_seed(t))
}

/// Continuous random signal in `[0, 1)`
///
/// # Example
/// ```text
/// rand().segment(4)  =>  four stable random values per cycle
/// ```
pub fn rand() -> Pattern<f64> {
    signal(time_to_rand)
}

/// Continuous random integers in `0..n`
pub fn irand(n: i64) -> Pattern<i64> {
    rand().fmap(move |r| (r * n as f64).floor() as i64)
}

fn smoother_step(x: f64) -> f64 {
    6.0 * x.powi(5) - 15.0 * x.powi(4) + 10.0 * x.powi(3)
}

/// Smooth noise driven by `input`: random values at integer inputs,
/// interpolated with a quintic curve in between.
pub fn perlin_with(input: Pattern<f64>) -> Pattern<f64> {
    input.fmap(|p| {
        let floor = p.floor();
        let a = time_to_rand(&Fraction::from_float(floor));
        let b = time_to_rand(&Fraction::from_float(floor + 1.0));
        a + smoother_step(p - floor) * (b - a)
    })
}

/// Smooth noise with one random target per cycle
pub fn perlin() -> Pattern<f64> {
    perlin_with(signal(|t| t.to_float()))
}

impl Pattern<f64> {
    /// Scale a 0-1 pattern into `[min, max]`
    pub fn range(self, min: f64, max: f64) -> Pattern<f64> {
        self.fmap(move |v| v * (max - min) + min)
    }
}

// ============================================
// Random choice
// ============================================

/// Pick from `values` with a 0-1 signal
pub fn choose_by<T: Clone + Send + Sync + 'static>(sig: Pattern<f64>, values: Vec<T>) -> Pattern<T> {
    if values.is_empty() {
        return Pattern::silence();
    }
    let last = values.len() - 1;
    sig.range(0.0, values.len() as f64)
        .fmap(move |v| values[(v.max(0.0).floor() as usize).min(last)].clone())
}

/// Continuous random choice from `values`
pub fn choose<T: Clone + Send + Sync + 'static>(values: Vec<T>) -> Pattern<T> {
    choose_by(rand(), values)
}

/// One randomly chosen pattern per cycle, keeping that pattern's own
/// structure
///
/// # Example
/// ```text
/// "bd | sd*2"  =>  either one bd or two sd each cycle
/// ```
pub fn choose_cycles<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    choose_by(rand().segment(1), patterns).outer_join()
}

/// Weighted choice driven by a 0-1 signal
///
/// # Panics
/// Panics when the driving signal yields a value outside `[0, 1]`.
pub fn wchoose_by<T: Clone + Send + Sync + 'static>(
    sig: Pattern<f64>,
    weighted: Vec<(T, f64)>,
) -> Pattern<T> {
    if weighted.is_empty() {
        return Pattern::silence();
    }
    let mut total = 0.0;
    let mut cumulative = Vec::with_capacity(weighted.len());
    let mut values = Vec::with_capacity(weighted.len());
    for (value, weight) in weighted {
        total += weight;
        cumulative.push(total);
        values.push(value);
    }
    let last = values.len() - 1;

    sig.fmap(move |r| {
        if !(0.0..=1.0).contains(&r) {
            panic!("wchoose_by: driving value {} is outside [0, 1]", r);
        }
        let target = r * total;
        let index = cumulative.iter().position(|c| *c > target).unwrap_or(last);
        values[index].clone()
    })
}

/// Continuous weighted random choice
pub fn wchoose<T: Clone + Send + Sync + 'static>(weighted: Vec<(T, f64)>) -> Pattern<T> {
    wchoose_by(rand(), weighted)
}

/// Plays a randomly chosen cycle of `slowcat(patterns)` each cycle
pub fn randcat<T: Clone + Send + Sync + 'static>(patterns: Vec<Pattern<T>>) -> Pattern<T> {
    let n = patterns.len() as i64;
    if n == 0 {
        return Pattern::silence();
    }
    let cat = Pattern::slowcat(patterns);
    irand(n)
        .segment(1)
        .bind(move |i| cat.clone().early(Fraction::from(*i)))
}

// ============================================
// Degrading
// ============================================

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Drop events where `sig` is at or below `amount`
    pub fn degrade_by_with(self, sig: Pattern<f64>, amount: f64) -> Pattern<T> {
        self.app_left(sig.filter_values(move |v| *v > amount), |value, _| value.clone())
    }

    /// Randomly drop events with probability `amount`
    ///
    /// # Example
    /// ```text
    /// "hh*8?"  =>  each hh kept half the time
    /// ```
    pub fn degrade_by(self, amount: f64) -> Pattern<T> {
        self.degrade_by_with(rand(), amount)
    }

    /// Randomly drop half of the events.
    pub fn degrade(self) -> Pattern<T> {
        self.degrade_by(0.5)
    }

    /// Keep the events where the random signal is below `amount`, the
    /// counterpart of [`Pattern::degrade_by`].
    pub fn undegrade_by(self, amount: f64) -> Pattern<T> {
        self.app_left(rand().filter_values(move |v| *v < amount), |value, _| value.clone())
    }

    /// Apply `f` to a random share `amount` of the events.
    pub fn sometimes_by(self, amount: f64, f: impl FnOnce(Pattern<T>) -> Pattern<T>) -> Pattern<T> {
        let modified = f(self.clone().undegrade_by(amount));
        Pattern::stack(vec![self.degrade_by(amount), modified])
    }
}
