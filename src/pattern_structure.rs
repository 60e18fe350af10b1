//! Structural Pattern Operations
//!
//! Concatenation, stacking, compression into sub-cycles, reversal and
//! the higher-order helpers built from them (every, iter, off, ...).

use crate::pattern::{Event, Fraction, Pattern, TimeSpan};

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    // ============================================
    // Concatenation and layering
    // ============================================

    /// Concatenate patterns, one per cycle
    ///
    /// Pattern `i` of `n` plays in cycles `c` where `c mod n == i`, and is
    /// queried in its own local cycle `(c - i) / n`, so patterns that
    /// themselves alternate advance one step each time they are selected.
    ///
    /// # Example
    /// ```text
    /// slowcat [a, <b c>]  =>  a b a c a b ...
    /// ```
    pub fn slowcat(patterns: Vec<Pattern<T>>) -> Pattern<T> {
        if patterns.is_empty() {
            return Pattern::silence();
        }
        let n = patterns.len() as i64;

        Pattern::new(move |span: &TimeSpan| {
            let cycle = span.begin.floor_i64();
            let index = cycle.rem_euclid(n);
            let offset = Fraction::from(cycle - (cycle - index).div_euclid(n));

            patterns[index as usize]
                .query(&span.with_time(|t| t - &offset))
                .into_iter()
                .map(|event| event.with_span(|s| s.with_time(|t| t + &offset)))
                .collect()
        })
        .split_queries()
    }

    /// Concatenate patterns, all squeezed into one cycle
    pub fn fastcat(patterns: Vec<Pattern<T>>) -> Pattern<T> {
        let n = patterns.len();
        if n == 0 {
            return Pattern::silence();
        }
        Pattern::slowcat(patterns).fast(n)
    }

    /// Alias of [`Pattern::fastcat`].
    pub fn cat(patterns: Vec<Pattern<T>>) -> Pattern<T> {
        Pattern::fastcat(patterns)
    }

    /// Stack patterns to play simultaneously
    pub fn stack(patterns: Vec<Pattern<T>>) -> Pattern<T> {
        Pattern::new(move |span| {
            patterns
                .iter()
                .flat_map(|pat| pat.query(span))
                .collect()
        })
    }

    /// Concatenate with relative durations
    ///
    /// Each pattern gets a slot of `weight / total` of the cycle.
    /// Patterns with a zero or negative weight are skipped.
    ///
    /// # Example
    /// ```text
    /// timecat [(3, bd), (1, sd)]  =>  "bd@3 sd"
    /// ```
    pub fn timecat(weighted_patterns: Vec<(Fraction, Pattern<T>)>) -> Pattern<T> {
        let zero = Fraction::zero();
        let weighted: Vec<_> = weighted_patterns
            .into_iter()
            .filter(|(weight, _)| *weight > zero)
            .collect();
        let total = weighted
            .iter()
            .fold(Fraction::zero(), |acc, (weight, _)| acc + weight);
        if total.is_zero() {
            return Pattern::silence();
        }

        let mut begin = Fraction::zero();
        let mut slots = Vec::with_capacity(weighted.len());
        for (weight, pat) in weighted {
            let end = &begin + &weight;
            slots.push(pat.compress(&begin / &total, &end / &total));
            begin = end;
        }
        Pattern::stack(slots)
    }

    /// One value per step, all in one cycle.
    pub fn sequence(values: Vec<T>) -> Pattern<T> {
        Pattern::fastcat(values.into_iter().map(Pattern::pure).collect())
    }

    /// Sequences stacked at their natural speeds.
    pub fn polyrhythm(sequences: Vec<Pattern<T>>) -> Pattern<T> {
        if sequences.is_empty() {
            return Pattern::silence();
        }
        Pattern::stack(sequences)
    }

    /// Stack sequences so they all share `steps` steps per cycle
    ///
    /// Each entry is a sequence paired with its own step count. Without
    /// `steps`, the first sequence's count is used. Empty sequences are
    /// skipped.
    ///
    /// # Example
    /// ```text
    /// {a b c, d e}%2  =>  "a b" "c a" "b c" against "d e" every cycle
    /// ```
    pub fn polymeter(sequences: Vec<(Fraction, Pattern<T>)>, steps: Option<Fraction>) -> Pattern<T> {
        let Some((first_count, _)) = sequences.first() else {
            return Pattern::silence();
        };
        let steps = steps.unwrap_or_else(|| first_count.clone());
        if steps.is_zero() {
            return Pattern::silence();
        }

        let pats = sequences
            .into_iter()
            .filter(|(count, _)| !count.is_zero())
            .map(|(count, pat)| {
                if count == steps {
                    pat
                } else {
                    pat.fast(&steps / &count)
                }
            })
            .collect();
        Pattern::stack(pats)
    }

    /// Play `other` at the same time.
    pub fn overlay(self, other: Pattern<T>) -> Pattern<T> {
        Pattern::stack(vec![self, other])
    }

    /// This pattern then `other`, squeezed into one cycle.
    pub fn append(self, other: Pattern<T>) -> Pattern<T> {
        Pattern::fastcat(vec![self, other])
    }

    // ============================================
    // Compression
    // ============================================

    /// Squeeze each cycle into `[begin, end)` of the cycle
    ///
    /// Spans that are empty, inverted or outside `[0, 1]` give silence.
    pub fn compress(self, begin: impl Into<Fraction>, end: impl Into<Fraction>) -> Pattern<T> {
        let begin = begin.into();
        let end = end.into();
        let zero = Fraction::zero();
        let one = Fraction::one();
        if begin >= end || begin > one || end > one || begin < zero || end < zero {
            return Pattern::silence();
        }
        let factor = (&end - &begin).recip();
        self.fastgap(factor).late(begin)
    }

    /// Like `fast`, but each cycle keeps its start and the rest of the
    /// cycle is left empty
    ///
    /// Factors below 1 are treated as 1; zero or negative factors give
    /// silence.
    pub fn fastgap(self, factor: impl Into<Fraction>) -> Pattern<T> {
        let factor = factor.into();
        if factor <= Fraction::zero() {
            return Pattern::silence();
        }
        let factor = factor.max(Fraction::one());

        Pattern::new(move |span: &TimeSpan| {
            let cycle = span.begin.sam();
            let munge = |t: &Fraction| t.sam() + (&factor * t.cycle_pos()).min(Fraction::one());

            let begin = munge(&span.begin);
            if begin == span.begin.next_sam() {
                return Vec::new();
            }
            let inner = TimeSpan::new(begin, munge(&span.end));

            self.query(&inner)
                .into_iter()
                .map(|event| event.with_span(|s| s.with_time(|t| &cycle + (t - &cycle) / &factor)))
                .collect()
        })
        .split_queries()
    }

    /// Reverse each cycle
    ///
    /// Both the query and the resulting spans are reflected around the
    /// middle of the queried cycle.
    pub fn rev(self) -> Pattern<T> {
        Pattern::new(move |span: &TimeSpan| {
            let cycle = span.begin.sam();
            let next_cycle = span.begin.next_sam();
            let reflect = |s: &TimeSpan| {
                TimeSpan::new(&cycle + (&next_cycle - &s.end), &cycle + (&next_cycle - &s.begin))
            };

            self.query(&reflect(span))
                .into_iter()
                .map(|event| event.with_span(&reflect))
                .collect()
        })
        .split_queries()
    }

    // ============================================
    // Structure from other patterns
    // ============================================

    /// Sample this pattern `n` times per cycle
    ///
    /// Turns continuous signals into discrete events.
    pub fn segment(self, n: impl Into<Fraction>) -> Pattern<T> {
        Pattern::pure(()).fast(n).app_left(self, |_, value| value.clone())
    }

    /// New events at the `true` steps of `bools`, taking their values
    /// from this pattern.
    pub fn structure(self, bools: Pattern<bool>) -> Pattern<T> {
        bools
            .filter_values(|b| *b)
            .app_left(self, |_, value| value.clone())
    }

    /// Keep this pattern's events only where `bools` is `true`, clipping
    /// them to the `true` steps.
    pub fn mask(self, bools: Pattern<bool>) -> Pattern<T> {
        self.app_left(bools.filter_values(|b| *b), |value, _| value.clone())
    }

    // ============================================
    // Conditional and higher-order helpers
    // ============================================

    /// Apply `f` in the cycles where `pred(cycle)` holds.
    pub fn when_cycle(
        self,
        pred: impl Fn(i64) -> bool + Send + Sync + 'static,
        f: impl FnOnce(Pattern<T>) -> Pattern<T>,
    ) -> Pattern<T> {
        let transformed = f(self.clone());
        Pattern::new(move |span: &TimeSpan| {
            if pred(span.begin.floor_i64()) {
                transformed.query(span)
            } else {
                self.query(span)
            }
        })
        .split_queries()
    }

    /// Apply `f` where the boolean pattern is `true`, keep the pattern
    /// unchanged where it is `false`.
    pub fn when(self, bools: Pattern<bool>, f: impl FnOnce(Pattern<T>) -> Pattern<T>) -> Pattern<T> {
        let with_f = bools
            .clone()
            .filter_values(|b| *b)
            .app_right(f(self.clone()), |_, value| value.clone());
        let without_f = bools
            .filter_values(|b| !*b)
            .app_right(self, |_, value| value.clone());
        Pattern::stack(vec![with_f, without_f])
    }

    /// Apply `f` every `n`th cycle, starting with cycle 0
    ///
    /// # Example
    /// ```text
    /// "bd sd" every 3 rev  =>  reversed in cycles 0, 3, 6, ...
    /// ```
    pub fn every(self, n: i64, f: impl FnOnce(Pattern<T>) -> Pattern<T>) -> Pattern<T> {
        if n <= 0 {
            return self;
        }
        self.when_cycle(move |cycle| cycle.rem_euclid(n) == 0, f)
    }

    /// Play a modified copy on top of the pattern.
    pub fn superimpose(self, f: impl FnOnce(Pattern<T>) -> Pattern<T>) -> Pattern<T> {
        let modified = f(self.clone());
        Pattern::stack(vec![self, modified])
    }

    /// Stack the results of applying each function.
    pub fn layer(self, fs: &[&dyn Fn(Pattern<T>) -> Pattern<T>]) -> Pattern<T> {
        Pattern::stack(fs.iter().map(|f| f(self.clone())).collect())
    }

    /// Superimpose a copy shifted later by `offset` and modified by `f`.
    pub fn off(
        self,
        offset: impl Into<Fraction>,
        f: impl FnOnce(Pattern<T>) -> Pattern<T>,
    ) -> Pattern<T> {
        let shifted = f(self.clone().late(offset));
        Pattern::stack(vec![self, shifted])
    }

    /// Divide the cycle into `n` parts and start one part later each cycle.
    pub fn iter(self, n: i64) -> Pattern<T> {
        if n <= 0 {
            return self;
        }
        Pattern::slowcat(
            (0..n)
                .map(|i| self.clone().early(Fraction::new(i, n)))
                .collect(),
        )
    }

    /// Like [`Pattern::iter`], moving backwards.
    pub fn iter_back(self, n: i64) -> Pattern<T> {
        if n <= 0 {
            return self;
        }
        Pattern::slowcat(
            (0..n)
                .map(|i| self.clone().late(Fraction::new(i, n)))
                .collect(),
        )
    }
}

/// `0 1 .. n-1` squeezed into each cycle, with `n` patterned
///
/// # Example
/// ```text
/// run "<4 8>"  =>  "0 1 2 3" then "0 1 2 3 4 5 6 7"
/// ```
pub fn run(n: Pattern<i64>) -> Pattern<i64> {
    n.fmap(|n| Pattern::sequence((0..n).collect())).join()
}

/// `run 1`, `run 2`, .. `run n`, one per cycle.
pub fn scan(n: i64) -> Pattern<i64> {
    Pattern::slowcat((1..=n).map(|k| run(Pattern::pure(k))).collect())
}

/// Sort events into their canonical order.
pub fn sorted<T: Ord>(mut events: Vec<Event<T>>) -> Vec<Event<T>> {
    events.sort();
    events
}
