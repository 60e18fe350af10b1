//! Control patterns built from mini-notation and combined

use vortex::control::{self, control_from, gain, n, pan, s, ControlError};
use vortex::pattern::{Fraction, Pattern, TimeSpan};
use vortex::pattern_structure::sorted;
use vortex::value::{Value, ValueMap};
use vortex::{compile, ControlPattern};

fn cycle(pat: &ControlPattern, c: i64) -> Vec<ValueMap> {
    sorted(pat.query(&TimeSpan::new(c, c + 1)))
        .into_iter()
        .filter(|e| e.has_onset())
        .map(|e| e.value)
        .collect()
}

#[test]
fn test_sound_with_alternating_index() {
    let pat = s("bd*2 sd").unwrap().union(n("<0 1>").unwrap());
    let first = cycle(&pat, 0);
    let second = cycle(&pat, 1);
    assert_eq!(first.len(), 3);
    assert!(first.iter().all(|m| m["n"] == Value::Float(0.0)));
    assert!(second.iter().all(|m| m["n"] == Value::Float(1.0)));
    assert_eq!(second[2]["s"], Value::from("sd"));
}

#[test]
fn test_structure_comes_from_the_left() {
    let pat = gain("0.5").unwrap().union(s("bd sd hh").unwrap());
    let events = sorted(pat.first_cycle());
    // one whole spanning the cycle, in three fragments
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.whole == Some(TimeSpan::new(0, 1))));
    assert_eq!(events.iter().filter(|e| e.has_onset()).count(), 1);
}

#[test]
fn test_control_from_pattern() {
    let notes = Pattern::fastcat(vec![
        Pattern::pure(Value::Int(60)),
        Pattern::pure(Value::from("rest")),
        Pattern::pure(Value::Float(62.5)),
    ]);
    let pat = control_from("note", notes).unwrap();
    let values: Vec<Value> = sorted(pat.first_cycle())
        .into_iter()
        .map(|e| e.value["note"].clone())
        .collect();
    // the string cannot become a note and is dropped
    assert_eq!(values, vec![Value::Float(60.0), Value::Float(62.5)]);

    assert_eq!(
        control_from("wobble", compile("1").unwrap()).unwrap_err(),
        ControlError::UnknownControl("wobble".to_string())
    );
}

#[test]
fn test_control_by_name_matches_function() {
    let by_name = control::control("pan", "0 0.25 1").unwrap();
    let by_fn = pan("0 0.25 1").unwrap();
    assert_eq!(sorted(by_name.first_cycle()), sorted(by_fn.first_cycle()));
}

#[test]
fn test_errors_name_the_problem() {
    let err = gain("0.5 loud").unwrap_err();
    assert_eq!(err.to_string(), "control `gain` takes a number, but `loud` is a string");

    let err = s("bd [sd").unwrap_err();
    assert!(matches!(err, ControlError::Syntax(ref e) if e.offset == 6));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_striate_then_slow() {
    let pat = s("bd").unwrap().striate(2).slow(2);
    let events = sorted(pat.query(&TimeSpan::new(0, 2)));
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].whole, Some(TimeSpan::new(0, 1)));
    assert_eq!(events[0].value["begin"], Value::Float(0.0));
    assert_eq!(events[1].whole, Some(TimeSpan::new(1, 2)));
    assert_eq!(events[1].value["begin"], Value::Float(0.5));
    assert_eq!(events[1].value["end"], Value::Float(1.0));
}

#[test]
fn test_jux_keeps_both_sides() {
    let pat = s("bd sd").unwrap().jux(|p| p.rev());
    let events = sorted(pat.first_cycle());
    assert_eq!(events.len(), 4);
    let left: Vec<_> = events
        .iter()
        .filter(|e| e.value["pan"] == Value::Float(0.0))
        .map(|e| (e.part.begin.clone(), e.value["s"].to_string()))
        .collect();
    let right: Vec<_> = events
        .iter()
        .filter(|e| e.value["pan"] == Value::Float(1.0))
        .map(|e| (e.part.begin.clone(), e.value["s"].to_string()))
        .collect();
    assert_eq!(
        left,
        vec![(Fraction::zero(), "bd".to_string()), (Fraction::new(1, 2), "sd".to_string())]
    );
    assert_eq!(
        right,
        vec![(Fraction::zero(), "sd".to_string()), (Fraction::new(1, 2), "bd".to_string())]
    );
}
