//! Core pattern types
//!
//! A [`Pattern`] is nothing more than a query function: given a span of
//! cycle time it returns the [`Event`]s active in that span. Everything
//! else (sequencing, speed changes, randomness, the mini-notation) is
//! built by wrapping one query function in another.
//!
//! Query functions capture only immutable state, so a pattern can be
//! cloned cheaply and queried from any number of threads.

pub use crate::time::{Fraction, TimeSpan};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A value active over `part`, belonging to the event occupying `whole`
///
/// `whole` is `None` for samples of continuous signals. For discrete
/// events `part` is a fragment of `whole`; the same event can come back
/// as several fragments when a query is split at cycle boundaries.
///
/// Events order by `(whole, part, value)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Event<T> {
    pub whole: Option<TimeSpan>,
    pub part: TimeSpan,
    pub value: T,
}

impl<T> Event<T> {
    pub fn new(whole: Option<TimeSpan>, part: TimeSpan, value: T) -> Self {
        Self { whole, part, value }
    }

    /// Maps `f` over the whole (if any) and the part.
    pub fn with_span(self, f: impl Fn(&TimeSpan) -> TimeSpan) -> Event<T> {
        Event {
            whole: self.whole.as_ref().map(&f),
            part: f(&self.part),
            value: self.value,
        }
    }

    pub fn with_value<U>(self, f: impl FnOnce(T) -> U) -> Event<U> {
        Event {
            whole: self.whole,
            part: self.part,
            value: f(self.value),
        }
    }

    /// True when this fragment starts where its whole starts.
    pub fn has_onset(&self) -> bool {
        match &self.whole {
            Some(whole) => whole.begin == self.part.begin,
            None => false,
        }
    }

    pub fn whole_or_part(&self) -> &TimeSpan {
        self.whole.as_ref().unwrap_or(&self.part)
    }

    /// The part lies inside the whole. Combinators preserve this but do
    /// not check it.
    pub fn is_well_formed(&self) -> bool {
        match &self.whole {
            Some(whole) => whole.contains_span(&self.part),
            None => true,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.whole {
            Some(whole) if *whole == self.part => write!(f, "{} | {}", whole, self.value),
            Some(whole) => write!(f, "{} ⇜ {} | {}", whole, self.part, self.value),
            None => write!(f, "~{} | {}", self.part, self.value),
        }
    }
}

type QueryFn<T> = dyn Fn(&TimeSpan) -> Vec<Event<T>> + Send + Sync;

/// Core Pattern type - a function from a query span to events
pub struct Pattern<T> {
    query: Arc<QueryFn<T>>,
}

impl<T> Clone for Pattern<T> {
    fn clone(&self) -> Self {
        Self {
            query: Arc::clone(&self.query),
        }
    }
}

// Manual Debug implementation for Pattern since it contains a closure
impl<T> fmt::Debug for Pattern<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("query", &"<closure>")
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Create a new pattern from a query function
    pub fn new(query: impl Fn(&TimeSpan) -> Vec<Event<T>> + Send + Sync + 'static) -> Self {
        Self {
            query: Arc::new(query),
        }
    }

    /// Query the pattern for events in a time span
    pub fn query(&self, span: &TimeSpan) -> Vec<Event<T>> {
        (self.query)(span)
    }

    /// Query `[begin, end)`.
    pub fn query_span(&self, begin: impl Into<Fraction>, end: impl Into<Fraction>) -> Vec<Event<T>> {
        self.query(&TimeSpan::new(begin, end))
    }

    /// Events of the cycle `[0, 1)`.
    pub fn first_cycle(&self) -> Vec<Event<T>> {
        self.query_span(0, 1)
    }

    /// Cuts every query at cycle boundaries and concatenates the results,
    /// so the wrapped query only ever sees spans within one cycle.
    pub fn split_queries(self) -> Self {
        Pattern::new(move |span| {
            span.span_cycles()
                .iter()
                .flat_map(|cycle| self.query(cycle))
                .collect()
        })
    }

    // ============================================
    // Query and event transformers
    // ============================================

    /// Transform the query span before querying.
    pub fn with_query_span(self, f: impl Fn(&TimeSpan) -> TimeSpan + Send + Sync + 'static) -> Self {
        Pattern::new(move |span| self.query(&f(span)))
    }

    /// Transform both ends of the query span before querying.
    pub fn with_query_time(self, f: impl Fn(&Fraction) -> Fraction + Send + Sync + 'static) -> Self {
        Pattern::new(move |span| self.query(&span.with_time(&f)))
    }

    /// Transform the whole and part of every resulting event.
    pub fn with_event_span(self, f: impl Fn(&TimeSpan) -> TimeSpan + Send + Sync + 'static) -> Self {
        Pattern::new(move |span| {
            self.query(span)
                .into_iter()
                .map(|event| event.with_span(&f))
                .collect()
        })
    }

    /// Transform every begin and end time of the resulting events.
    pub fn with_event_time(self, f: impl Fn(&Fraction) -> Fraction + Send + Sync + 'static) -> Self {
        self.with_event_span(move |span| span.with_time(&f))
    }

    // ============================================
    // Functor
    // ============================================

    /// Transform the values in a pattern
    pub fn fmap<U: Clone + Send + Sync + 'static>(
        self,
        f: impl Fn(T) -> U + Send + Sync + 'static,
    ) -> Pattern<U> {
        Pattern::new(move |span| {
            self.query(span)
                .into_iter()
                .map(|event| event.with_value(&f))
                .collect()
        })
    }

    /// Alias of [`Pattern::fmap`].
    pub fn with_value<U: Clone + Send + Sync + 'static>(
        self,
        f: impl Fn(T) -> U + Send + Sync + 'static,
    ) -> Pattern<U> {
        self.fmap(f)
    }

    // ============================================
    // Filtering
    // ============================================

    pub fn filter_events(self, pred: impl Fn(&Event<T>) -> bool + Send + Sync + 'static) -> Self {
        Pattern::new(move |span| self.query(span).into_iter().filter(|e| pred(e)).collect())
    }

    pub fn filter_values(self, pred: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.filter_events(move |event| pred(&event.value))
    }

    /// Maps values through `f`, dropping events for which it returns `None`.
    pub fn filter_map_values<U: Clone + Send + Sync + 'static>(
        self,
        f: impl Fn(&T) -> Option<U> + Send + Sync + 'static,
    ) -> Pattern<U> {
        Pattern::new(move |span| {
            self.query(span)
                .into_iter()
                .filter_map(|event| {
                    let value = f(&event.value)?;
                    Some(Event::new(event.whole, event.part, value))
                })
                .collect()
        })
    }

    /// Keeps only fragments that contain their onset.
    pub fn onsets_only(self) -> Self {
        self.filter_events(|event| event.has_onset())
    }

    /// Drops continuous (whole-less) events.
    pub fn discrete_only(self) -> Self {
        self.filter_events(|event| event.whole.is_some())
    }

    // ============================================
    // Elementary patterns
    // ============================================

    /// Create a pattern from a single value (pure)
    ///
    /// One event per cycle, with the cycle as its whole.
    pub fn pure(value: T) -> Self {
        Pattern::new(move |span| {
            span.span_cycles()
                .into_iter()
                .map(|part| Event::new(Some(part.begin.whole_cycle()), part, value.clone()))
                .collect()
        })
    }

    /// A continuous value: one whole-less event covering any query.
    pub fn steady(value: T) -> Self {
        Pattern::new(move |span| vec![Event::new(None, span.clone(), value.clone())])
    }

    /// Create a silence pattern
    pub fn silence() -> Self {
        Pattern::new(|_| Vec::new())
    }

    // ============================================
    // Applicatives
    // ============================================

    /// Combines every pair of events from both patterns whose parts meet.
    /// The new whole is the intersection of both wholes, or `None` when
    /// either side is continuous.
    pub fn app_both<U, V>(
        self,
        other: Pattern<U>,
        f: impl Fn(&T, &U) -> V + Send + Sync + 'static,
    ) -> Pattern<V>
    where
        U: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        Pattern::new(move |span| {
            let lefts = self.query(span);
            let rights = other.query(span);
            let mut events = Vec::new();
            for left in &lefts {
                for right in &rights {
                    let Some(part) = left.part.intersection(&right.part) else {
                        continue;
                    };
                    let whole = match (&left.whole, &right.whole) {
                        (Some(a), Some(b)) => Some(a.intersection_or_fail(b)),
                        _ => None,
                    };
                    events.push(Event::new(whole, part, f(&left.value, &right.value)));
                }
            }
            events
        })
    }

    /// Combines with structure from the left: each left event queries
    /// `other` over its own part and keeps its own whole.
    pub fn app_left<U, V>(
        self,
        other: Pattern<U>,
        f: impl Fn(&T, &U) -> V + Send + Sync + 'static,
    ) -> Pattern<V>
    where
        U: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        Pattern::new(move |span| {
            let mut events = Vec::new();
            for left in self.query(span) {
                for right in other.query(&left.part) {
                    if let Some(part) = left.part.intersection(&right.part) {
                        events.push(Event::new(
                            left.whole.clone(),
                            part,
                            f(&left.value, &right.value),
                        ));
                    }
                }
            }
            events
        })
    }

    /// Combines with structure from the right.
    pub fn app_right<U, V>(
        self,
        other: Pattern<U>,
        f: impl Fn(&T, &U) -> V + Send + Sync + 'static,
    ) -> Pattern<V>
    where
        U: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        Pattern::new(move |span| {
            let mut events = Vec::new();
            for right in other.query(span) {
                for left in self.query(&right.part) {
                    if let Some(part) = left.part.intersection(&right.part) {
                        events.push(Event::new(
                            right.whole.clone(),
                            part,
                            f(&left.value, &right.value),
                        ));
                    }
                }
            }
            events
        })
    }

    // ============================================
    // Monadic binds
    // ============================================

    fn bind_whole<U>(
        self,
        choose_whole: fn(&Option<TimeSpan>, Option<TimeSpan>) -> Option<TimeSpan>,
        f: impl Fn(&T) -> Pattern<U> + Send + Sync + 'static,
    ) -> Pattern<U>
    where
        U: Clone + Send + Sync + 'static,
    {
        Pattern::new(move |span| {
            let mut events = Vec::new();
            for outer in self.query(span) {
                for inner in f(&outer.value).query(&outer.part) {
                    events.push(Event::new(
                        choose_whole(&outer.whole, inner.whole),
                        inner.part,
                        inner.value,
                    ));
                }
            }
            events
        })
    }

    /// Flattens `f` applied to each value. The whole is the
    /// intersection of the outer and inner wholes.
    pub fn bind<U>(self, f: impl Fn(&T) -> Pattern<U> + Send + Sync + 'static) -> Pattern<U>
    where
        U: Clone + Send + Sync + 'static,
    {
        self.bind_whole(
            |outer, inner| match (outer, inner) {
                (Some(a), Some(b)) => Some(a.intersection_or_fail(&b)),
                _ => None,
            },
            f,
        )
    }

    /// Like [`Pattern::bind`], keeping the outer whole.
    pub fn inner_bind<U>(self, f: impl Fn(&T) -> Pattern<U> + Send + Sync + 'static) -> Pattern<U>
    where
        U: Clone + Send + Sync + 'static,
    {
        self.bind_whole(|outer, _| outer.clone(), f)
    }

    /// Like [`Pattern::bind`], keeping the inner whole.
    pub fn outer_bind<U>(self, f: impl Fn(&T) -> Pattern<U> + Send + Sync + 'static) -> Pattern<U>
    where
        U: Clone + Send + Sync + 'static,
    {
        self.bind_whole(|_, inner| inner, f)
    }

    // ============================================
    // Time transformations
    // ============================================

    /// Speed up a pattern by a factor
    ///
    /// A factor of 2 plays the pattern twice per cycle. Zero gives
    /// silence; a negative factor also reverses the pattern.
    ///
    /// # Example
    /// ```text
    /// "bd sd" fast 2  =>  "bd sd bd sd"
    /// ```
    pub fn fast(self, factor: impl Into<Fraction>) -> Self {
        let factor = factor.into();
        if factor.is_zero() {
            return Pattern::silence();
        }
        if factor.is_negative() {
            return self.fast(-factor).rev();
        }
        let inverse = factor.recip();
        self.with_query_time(move |t| t * &factor)
            .with_event_time(move |t| t * &inverse)
    }

    /// Slow down a pattern by a factor
    ///
    /// The inverse of [`Pattern::fast`]; zero gives silence.
    pub fn slow(self, factor: impl Into<Fraction>) -> Self {
        let factor = factor.into();
        if factor.is_zero() {
            return Pattern::silence();
        }
        self.fast(factor.recip())
    }

    /// Shift the pattern earlier in time by `offset` cycles.
    pub fn early(self, offset: impl Into<Fraction>) -> Self {
        let offset = offset.into();
        let back = offset.clone();
        self.with_query_time(move |t| t + &offset)
            .with_event_time(move |t| t - &back)
    }

    /// Shift the pattern later in time by `offset` cycles.
    pub fn late(self, offset: impl Into<Fraction>) -> Self {
        let offset: Fraction = offset.into();
        self.early(-offset)
    }

    // Patterned versions take their argument from a pattern; the result
    // keeps the timing of the argument's events.

    /// [`Pattern::fast`] with a patterned factor
    ///
    /// # Example
    /// ```text
    /// "bd*<2 3>"  =>  two events in even cycles, three in odd ones
    /// ```
    pub fn fast_pattern(self, factor: Pattern<Fraction>) -> Self {
        factor.fmap(move |f| self.clone().fast(f)).outer_join()
    }

    pub fn slow_pattern(self, factor: Pattern<Fraction>) -> Self {
        factor.fmap(move |f| self.clone().slow(f)).outer_join()
    }

    pub fn early_pattern(self, offset: Pattern<Fraction>) -> Self {
        offset.fmap(move |o| self.clone().early(o)).outer_join()
    }

    pub fn late_pattern(self, offset: Pattern<Fraction>) -> Self {
        offset.fmap(move |o| self.clone().late(o)).outer_join()
    }
}

impl<T: Clone + Send + Sync + 'static> Pattern<Pattern<T>> {
    /// Flattens a pattern of patterns, intersecting wholes.
    pub fn join(self) -> Pattern<T> {
        self.bind(|pat| pat.clone())
    }

    /// Flattens a pattern of patterns; timing comes from the outer pattern.
    pub fn inner_join(self) -> Pattern<T> {
        self.inner_bind(|pat| pat.clone())
    }

    /// Flattens a pattern of patterns; timing comes from the inner patterns.
    pub fn outer_join(self) -> Pattern<T> {
        self.outer_bind(|pat| pat.clone())
    }
}

impl<T: Clone + Send + Sync + 'static> From<T> for Pattern<T> {
    fn from(value: T) -> Self {
        Pattern::pure(value)
    }
}
