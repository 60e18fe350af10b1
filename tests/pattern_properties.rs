//! Algebraic properties checked over many random spans

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use vortex::mini_interpreter::compile;
use vortex::pattern::{Fraction, Pattern, TimeSpan};
use vortex::pattern_signal::{choose, perlin, rand};
use vortex::pattern_structure::sorted;
use vortex::value::Value;

const SOURCES: &[&str] = &[
    "x",
    "x y",
    "<x y>",
    "x/2",
    "x*3 y",
    "[x, y z]",
    "x(3,8) <y z>*2",
    "x@3 y? z!",
];

fn random_span(rng: &mut StdRng) -> TimeSpan {
    let denom = rng.gen_range(1..9);
    let begin = Fraction::new(rng.gen_range(-40..40), denom);
    let length = Fraction::new(rng.gen_range(1..30), rng.gen_range(1..9));
    TimeSpan::new(begin.clone(), begin + length)
}

fn compiled(source: &str) -> Pattern<Value> {
    compile(source).unwrap()
}

#[test]
fn test_span_cycles_reconstruct_the_span() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let span = random_span(&mut rng);
        let cycles = span.span_cycles();
        assert_eq!(cycles.first().unwrap().begin, span.begin);
        assert_eq!(cycles.last().unwrap().end, span.end);
        for pair in cycles.windows(2) {
            assert_eq!(pair[0].end, pair[1].begin, "gap or overlap in {}", span);
        }
        for piece in &cycles {
            assert!(piece.begin < piece.end);
            assert!(piece.end <= piece.begin.next_sam(), "{} crosses a cycle", piece);
        }
    }
}

#[test]
fn test_timecat_with_equal_weights_is_fastcat() {
    let mut rng = StdRng::seed_from_u64(11);
    for a in SOURCES.iter().take(6) {
        for b in SOURCES.iter().take(6) {
            let fast = Pattern::fastcat(vec![compiled(a), compiled(b)]);
            let time = Pattern::timecat(vec![
                (Fraction::one(), compiled(a)),
                (Fraction::one(), compiled(b)),
            ]);
            for _ in 0..10 {
                let span = random_span(&mut rng);
                assert_eq!(
                    sorted(time.query(&span)),
                    sorted(fast.query(&span)),
                    "{:?} {:?} over {}",
                    a,
                    b,
                    span
                );
            }
        }
    }
}

#[test]
fn test_queries_are_deterministic() {
    let mut rng = StdRng::seed_from_u64(13);
    let signal = rand().segment(8).add_left(perlin().segment(3));
    let picks = choose(vec!["a", "b", "c"]).segment(5);
    let degraded = compiled("hh*16?");
    for _ in 0..50 {
        let span = random_span(&mut rng);
        assert_eq!(signal.query(&span), signal.query(&span));
        assert_eq!(picks.query(&span), picks.query(&span));
        assert_eq!(degraded.query(&span), degraded.query(&span));
    }
}

#[test]
fn test_queries_agree_across_threads() {
    let pattern = compiled("[bd | sd | hh]*4 cp? <a b>(3,8)");
    let span = TimeSpan::new(Fraction::new(-3, 2), Fraction::from(9));
    let expected = pattern.query(&span);
    let results: Vec<_> = (0..16)
        .into_par_iter()
        .map(|_| pattern.query(&span))
        .collect();
    assert!(results.iter().all(|events| *events == expected));
}

#[test]
fn test_euclid_three_of_eight() {
    let events = sorted(Pattern::pure("bd").euclid(3, 8, 0).first_cycle());
    let onsets: Vec<Fraction> = events.iter().map(|e| e.part.begin.clone()).collect();
    assert_eq!(
        onsets,
        vec![Fraction::zero(), Fraction::new(3, 8), Fraction::new(6, 8)]
    );
}

#[test]
fn test_degrade_is_monotonic() {
    let base = Pattern::pure("x").fast(8);
    let span = TimeSpan::new(0, 64);
    let light = base.clone().degrade_by(0.25).query(&span);
    let heavy = base.degrade_by(0.75).query(&span);
    assert!(heavy.len() < light.len());
    assert!(heavy.iter().all(|e| light.contains(e)));
}

#[test]
fn test_rev_twice_is_identity() {
    for source in SOURCES {
        let pattern = compiled(source);
        let twice = pattern.clone().rev().rev();
        for cycle in -2..4 {
            let span = TimeSpan::new(cycle, cycle + 1);
            assert_eq!(
                sorted(twice.query(&span)),
                sorted(pattern.query(&span)),
                "{:?} cycle {}",
                source,
                cycle
            );
        }
    }
}

#[test]
fn test_parts_lie_within_wholes() {
    let mut rng = StdRng::seed_from_u64(17);
    for source in SOURCES.iter().chain(&["bd*<2 3> [sd|cp]/1.5", "{a b c}%4 . d"]) {
        let pattern = compiled(source);
        for _ in 0..20 {
            let span = random_span(&mut rng);
            for event in pattern.query(&span) {
                assert!(event.is_well_formed(), "{:?}: {}", source, event);
                assert!(span.contains_span(&event.part), "{:?}: {} outside {}", source, event, span);
            }
        }
    }
}
