//! Mini-notation compiled patterns checked against the equivalent
//! combinator expressions

use vortex::mini_interpreter::compile;
use vortex::pattern::{Fraction, Pattern, TimeSpan};
use vortex::pattern_signal::choose_cycles;
use vortex::pattern_structure::sorted;
use vortex::value::Value;

fn word(s: &str) -> Pattern<Value> {
    Pattern::pure(Value::from(s))
}

fn int(i: i64) -> Pattern<Value> {
    Pattern::pure(Value::Int(i))
}

fn cat(pats: Vec<Pattern<Value>>) -> Pattern<Value> {
    Pattern::fastcat(pats)
}

fn assert_same_over(source: &str, expected: Pattern<Value>, begin: i64, end: i64) {
    let span = TimeSpan::new(begin, end);
    let actual = sorted(compile(source).unwrap().query(&span));
    let expected = sorted(expected.query(&span));
    assert_eq!(actual, expected, "mini-notation {:?} over {}", source, span);
}

fn assert_same(source: &str, expected: Pattern<Value>) {
    assert_same_over(source, expected, 0, 1);
}

/// Onset values per cycle, in time order
fn cycle_values(source: &str, cycle: i64) -> Vec<String> {
    let events = compile(source)
        .unwrap()
        .query(&TimeSpan::new(cycle, cycle + 1));
    sorted(events)
        .into_iter()
        .filter(|e| e.has_onset())
        .map(|e| e.value.to_string())
        .collect()
}

#[test]
fn test_numbers() {
    assert_same("45", int(45));
    assert_same("-2.", Pattern::pure(Value::Float(-2.0)));
    assert_same("4.64", Pattern::pure(Value::Float(4.64)));
    assert_same("-3", int(-3));
}

#[test]
fn test_words_and_rest() {
    assert_same("foo", word("foo"));
    assert_same("Bar", word("Bar"));
    assert_same("~", Pattern::silence());
}

#[test]
fn test_modifiers() {
    assert_same("bd*2", word("bd").fast(2));
    assert_same("bd/3", word("bd").slow(3));
    assert_same("hh?", word("hh").degrade());
    assert_same(
        "hh!!??",
        cat(vec![word("hh"), word("hh"), word("hh")]).degrade_by(Fraction::new(2, 3).to_float()),
    );
}

#[test]
fn test_sequences() {
    assert_same("bd sd", cat(vec![word("bd"), word("sd")]));
    assert_same("bd hh sd", cat(vec![word("bd"), word("hh"), word("sd")]));
    assert_same("hh@2", word("hh"));
    assert_same(
        "bd hh@2",
        Pattern::timecat(vec![(Fraction::from(1), word("bd")), (Fraction::from(2), word("hh"))]),
    );
    assert_same(
        "bd hh@3 sd@2",
        Pattern::timecat(vec![
            (Fraction::from(1), word("bd")),
            (Fraction::from(3), word("hh")),
            (Fraction::from(2), word("sd")),
        ]),
    );
    assert_same("hh!", cat(vec![word("hh"), word("hh")]));
    assert_same("hh!!", cat(vec![word("hh"), word("hh"), word("hh")]));
    assert_same("bd! cp", cat(vec![word("bd"), word("bd"), word("cp")]));
}

#[test]
fn test_mixed_modifiers_in_sequence() {
    let one = Fraction::one;
    assert_same(
        "bd! hh? ~ sd/2 cp*3",
        Pattern::timecat(vec![
            (one(), word("bd")),
            (one(), word("bd")),
            (one(), word("hh").degrade()),
            (one(), Pattern::silence()),
            (one(), word("sd").slow(2)),
            (one(), word("cp").fast(3)),
        ]),
    );
}

#[test]
fn test_random_choice() {
    assert_same_over("bd | sd", choose_cycles(vec![word("bd"), word("sd")]), 0, 10);
}

#[test]
fn test_nested_brackets() {
    assert_same(
        "[bd [~ sd]] cp",
        cat(vec![
            cat(vec![word("bd"), cat(vec![Pattern::silence(), word("sd")])]),
            word("cp"),
        ]),
    );
}

#[test]
fn test_polymeter_steps() {
    let de = || cat(vec![word("D"), word("E")]);
    assert_same_over(
        "{a b c, D E}%2",
        Pattern::slowcat(vec![
            Pattern::stack(vec![cat(vec![word("a"), word("b")]), de()]),
            Pattern::stack(vec![cat(vec![word("c"), word("a")]), de()]),
            Pattern::stack(vec![cat(vec![word("b"), word("c")]), de()]),
        ]),
        0,
        3,
    );
}

#[test]
fn test_polymeter_defaults_to_first_sequence_steps() {
    assert_same_over("{a b c, d e}", compile("{a b c, d e}%3").unwrap(), 0, 4);
    let onsets = compile("{a b c, d e}")
        .unwrap()
        .first_cycle()
        .into_iter()
        .filter(|e| e.has_onset())
        .count();
    assert_eq!(onsets, 6);
    assert_eq!(cycle_values("{a b c, d e}", 1), vec!["a", "e", "b", "d", "c", "e"]);
    // steps come from slot weights
    assert_same_over("{a@2 b, c d e}", compile("{a@2 b, c d e}%3").unwrap(), 0, 4);
}

#[test]
fn test_polymeter_fractional_steps() {
    let abcd = || cat(vec![word("a"), word("b"), word("c"), word("d")]);
    assert_same_over("{a b c d}%1.5", abcd().fast(Fraction::new(3, 8)), 0, 8);
    assert_same_over("{a b c d}%2.", abcd().fast(Fraction::new(1, 2)), 0, 4);
}

#[test]
fn test_polymeter_before_cycle_zero() {
    assert_eq!(cycle_values("{a b c}%2", -1), vec!["b", "c"]);
    assert_eq!(cycle_values("{a b c}%2", -2), vec!["c", "a"]);
    let de = cat(vec![word("d"), word("e")]).fast(Fraction::new(3, 2));
    assert_same_over(
        "{a b c, d e}",
        Pattern::stack(vec![cat(vec![word("a"), word("b"), word("c")]), de]),
        -5,
        0,
    );
}

#[test]
fn test_alternation_is_one_step_polymeter() {
    assert_same_over("<a b, c d e>", compile("{a b, c d e}%1").unwrap(), 0, 3);
    assert_eq!(cycle_values("<a b c>", 0), vec!["a"]);
    assert_eq!(cycle_values("<a b c>", 1), vec!["b"]);
    assert_eq!(cycle_values("<a b c>", 2), vec!["c"]);
    assert_eq!(cycle_values("<a b c>", 3), vec!["a"]);
}

#[test]
fn test_euclid() {
    assert_same("bd(3,8)", word("bd").euclid(3, 8, 0));
    assert_same("bd(3,8,2)", word("bd").euclid(3, 8, 2));
    assert_same(
        "bd(<3 5>,8,<2 4>)",
        word("bd").euclid_pattern(
            Pattern::slowcat(vec![Pattern::pure(3), Pattern::pure(5)]),
            Pattern::pure(8),
            Pattern::slowcat(vec![Pattern::pure(2), Pattern::pure(4)]),
        ),
    );
}

#[test]
fn test_euclid_after_other_modifiers() {
    let group = cat(vec![word("bd").fast(2), word("cp")])
        .euclid(3, 8, 0)
        .degrade_by(0.5);
    assert_same_over(
        "bd sd [bd*2 cp]@2(3,8)?",
        Pattern::timecat(vec![
            (Fraction::from(1), word("bd")),
            (Fraction::from(1), word("sd")),
            (Fraction::from(2), group),
        ]),
        0,
        4,
    );
    // applied in order: fast first, then the euclid gate
    assert_same("bd*2(3,8)", word("bd").fast(2).euclid(3, 8, 0));
    assert_same(
        "bd(3,8)!",
        cat(vec![word("bd").euclid(3, 8, 0), word("bd").euclid(3, 8, 0)]),
    );
}

#[test]
fn test_oversized_inputs() {
    assert!(compile("bd(3,99999999999)").unwrap().first_cycle().is_empty());
    let err = compile("bd!5000").unwrap_err();
    assert_eq!(err.message, "too many repeats");
}

#[test]
fn test_steps_and_groups() {
    assert_same("bd _ _ sd", compile("bd@3 sd").unwrap());
    assert_same(
        "bd cp . sd",
        Pattern::polyrhythm(vec![cat(vec![cat(vec![word("bd"), word("cp")]), word("sd")])]),
    );
    assert_same("bd cp . sd", compile("[bd cp] sd").unwrap());
}

#[test]
fn test_patterned_modifier_arguments() {
    let factors = |xs: &[i64]| xs.iter().map(|x| Pattern::pure(Fraction::from(*x))).collect::<Vec<_>>();
    assert_same_over(
        "bd*<2 3 4>",
        word("bd").fast_pattern(Pattern::slowcat(factors(&[2, 3, 4]))),
        0,
        4,
    );
    assert_same_over(
        "bd/[2 3]",
        word("bd").slow_pattern(Pattern::fastcat(factors(&[2, 3]))),
        0,
        4,
    );
}

#[test]
fn test_compile_scenarios() {
    assert_same("bd sd", cat(vec![word("bd"), word("sd")]));
    assert_same("bd*2", word("bd").fast(2));
    assert_same(
        "bd@3 sd",
        Pattern::timecat(vec![(Fraction::from(3), word("bd")), (Fraction::from(1), word("sd"))]),
    );
    assert_same("~", Pattern::silence());
}

#[test]
fn test_top_level_stack() {
    assert_same(
        "bd sd, hh hh hh",
        Pattern::stack(vec![
            cat(vec![word("bd"), word("sd")]),
            cat(vec![word("hh"), word("hh"), word("hh")]),
        ]),
    );
}

#[test]
fn test_timing_across_cycles() {
    let pat = compile("bd [~ sd] hh*2").unwrap();
    for cycle in 0..3 {
        let events = sorted(pat.query(&TimeSpan::new(cycle, cycle + 1)));
        let begins: Vec<Fraction> = events.iter().map(|e| e.part.begin.clone()).collect();
        let base = Fraction::from(cycle);
        assert_eq!(
            begins,
            vec![
                base.clone(),
                &base + Fraction::new(1, 2),
                &base + Fraction::new(2, 3),
                &base + Fraction::new(5, 6),
            ]
        );
    }
}

#[test]
fn test_euclid_rotation_alternates() {
    let pat = compile("bd(3,8,<0 2>)").unwrap();
    let onsets = |cycle: i64| -> Vec<Fraction> {
        sorted(pat.query(&TimeSpan::new(cycle, cycle + 1)))
            .into_iter()
            .map(|e| e.part.begin - Fraction::from(cycle))
            .collect()
    };
    assert_eq!(onsets(0), vec![Fraction::zero(), Fraction::new(3, 8), Fraction::new(3, 4)]);
    assert_eq!(onsets(1), vec![Fraction::new(1, 8), Fraction::new(1, 2), Fraction::new(3, 4)]);
}

#[test]
fn test_sample_index() {
    let events = compile("bd:3 sd").unwrap().first_cycle();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].value.to_string(), "{n: 3, s: bd}");
    assert_eq!(events[1].value, Value::from("sd"));
}

#[test]
fn test_syntax_errors_abort() {
    for source in ["bd [sd", "bd sd]", "bd(3", "_ bd", "bd*", "[a, b | c]", "bd . . sd"] {
        let err = compile(source).unwrap_err();
        assert!(err.offset <= source.len(), "{:?}: {}", source, err);
    }
    let err = compile("bd  sd ]").unwrap_err();
    assert_eq!((err.line, err.column), (1, 8));
}
