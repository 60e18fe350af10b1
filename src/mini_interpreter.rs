//! Mini-notation compiler
//!
//! Turns the parse tree from [`crate::mini_notation`] into a
//! [`Pattern<Value>`]. Words become strings, numbers become integers or
//! floats, `word:index` becomes the control map `{s: word, n: index}`
//! (`word:0` is just the word) and `~` is silence.
//!
//! Each element folds its modifiers over a list of weighted steps. `!`
//! copies the steps, `?` sets the degrade ratio `c / (c + 1)` that is
//! applied once per element, and `@` replaces the weight. A sequence then
//! places its elements with [`Pattern::timecat`].

use crate::mini_notation::{
    self, Element, Euclid, Modifier, Node, Number, Sequence, SyntaxError, MAX_REPEAT,
};
use crate::pattern::{Fraction, Pattern};
use crate::pattern_signal::choose_cycles;
use crate::value::{Value, ValueMap};
use tracing::{debug, trace};

/// Compile mini-notation source into a pattern
///
/// # Example
/// ```
/// use vortex::mini_interpreter::compile;
/// use vortex::value::Value;
///
/// let pat = compile("bd sd").unwrap();
/// let values: Vec<Value> = pat.first_cycle().into_iter().map(|e| e.value).collect();
/// assert_eq!(values, vec![Value::from("bd"), Value::from("sd")]);
/// ```
pub fn compile(source: &str) -> Result<Pattern<Value>, SyntaxError> {
    let tree = match mini_notation::parse(source) {
        Ok(tree) => tree,
        Err(err) => {
            debug!(offset = err.offset, message = %err.message, "mini-notation syntax error");
            return Err(err);
        }
    };
    trace!(?tree, "parsed mini-notation");
    debug!(len = source.len(), steps = top_level_steps(&tree), "compiled mini-notation");
    Ok(compile_tree(&tree))
}

/// Compile an already parsed tree.
pub fn compile_tree(node: &Node) -> Pattern<Value> {
    match node {
        Node::Sequence(seq) => compile_sequence(seq).1,
        Node::Word {
            value,
            index: None | Some(0),
        } => Pattern::pure(Value::from(value.as_str())),
        Node::Word {
            value,
            index: Some(index),
        } => Pattern::pure(Value::Map(sample_select(value, *index))),
        Node::Number { value } => Pattern::pure(number_value(*value)),
        Node::Rest => Pattern::silence(),
        Node::Polyrhythm { seqs } => {
            Pattern::polyrhythm(seqs.iter().map(|seq| compile_sequence(seq).1).collect())
        }
        Node::Polymeter { seqs, steps } => {
            Pattern::polymeter(seqs.iter().map(compile_sequence).collect(), steps.clone())
        }
        Node::RandomSequence { seqs } => {
            choose_cycles(seqs.iter().map(|seq| compile_sequence(seq).1).collect())
        }
    }
}

fn top_level_steps(tree: &Node) -> usize {
    match tree {
        Node::Sequence(seq) => seq.elements.len(),
        Node::Polyrhythm { seqs } | Node::RandomSequence { seqs } | Node::Polymeter { seqs, .. } => {
            seqs.len()
        }
        _ => 1,
    }
}

fn number_value(number: Number) -> Value {
    match number {
        Number::Int(i) => Value::Int(i),
        Number::Float(f) => Value::Float(f),
    }
}

fn sample_select(word: &str, index: i64) -> ValueMap {
    let mut map = ValueMap::new();
    map.insert("s".to_string(), Value::from(word));
    map.insert("n".to_string(), Value::Float(index as f64));
    map
}

/// An element's pattern with its timecat weight and pending degrade ratio
#[derive(Clone)]
struct WeightedStep {
    weight: Fraction,
    pattern: Pattern<Value>,
    degrade: Fraction,
}

/// Compiles a sequence, returning its total step count with the pattern.
fn compile_sequence(seq: &Sequence) -> (Fraction, Pattern<Value>) {
    let mut total = Fraction::zero();
    let mut slots = Vec::with_capacity(seq.elements.len());

    for element in &seq.elements {
        let steps = compile_element(element);
        let Some(first) = steps.first() else {
            continue;
        };
        let weight = &first.weight * Fraction::from(steps.len());
        let degrade = first.degrade.clone();

        let mut patterns: Vec<_> = steps.into_iter().map(|step| step.pattern).collect();
        let pattern = if patterns.len() == 1 {
            patterns.remove(0)
        } else {
            Pattern::fastcat(patterns)
        };
        let pattern = if degrade.is_zero() {
            pattern
        } else {
            pattern.degrade_by(degrade.to_float())
        };

        total = &total + &weight;
        slots.push((weight, pattern));
    }

    let pattern = if slots.len() == 1 {
        slots.remove(0).1
    } else {
        Pattern::timecat(slots)
    };
    (total, pattern)
}

fn compile_element(element: &Element) -> Vec<WeightedStep> {
    let mut steps = vec![WeightedStep {
        weight: Fraction::one(),
        pattern: compile_tree(&element.value),
        degrade: Fraction::zero(),
    }];
    for modifier in &element.modifiers {
        steps = apply_modifier(steps, modifier);
    }
    steps
}

fn apply_modifier(steps: Vec<WeightedStep>, modifier: &Modifier) -> Vec<WeightedStep> {
    match modifier {
        Modifier::Fast { value } => steps
            .into_iter()
            .map(|step| WeightedStep {
                pattern: fast_by(step.pattern, value),
                ..step
            })
            .collect(),
        Modifier::Slow { value } => steps
            .into_iter()
            .map(|step| WeightedStep {
                pattern: slow_by(step.pattern, value),
                ..step
            })
            .collect(),
        Modifier::Euclid(euclid) => steps
            .into_iter()
            .map(|step| WeightedStep {
                pattern: apply_euclid(step.pattern, euclid),
                ..step
            })
            .collect(),
        Modifier::Repeat { count } => steps
            .into_iter()
            .flat_map(|step| std::iter::repeat(step).take((*count).min(MAX_REPEAT) as usize + 1))
            .collect(),
        Modifier::Degrade { count } => {
            let ratio = Fraction::new(i64::from(*count), i64::from(*count) + 1);
            steps
                .into_iter()
                .map(|step| WeightedStep {
                    degrade: ratio.clone(),
                    ..step
                })
                .collect()
        }
        Modifier::Weight { value } => steps
            .into_iter()
            .map(|step| WeightedStep {
                weight: value.clone(),
                ..step
            })
            .collect(),
    }
}

fn fast_by(pattern: Pattern<Value>, factor: &Node) -> Pattern<Value> {
    match factor {
        Node::Number { value } => pattern.fast(value.to_fraction()),
        other => pattern.fast_pattern(fraction_pattern(other)),
    }
}

fn slow_by(pattern: Pattern<Value>, factor: &Node) -> Pattern<Value> {
    match factor {
        Node::Number { value } => pattern.slow(value.to_fraction()),
        other => pattern.slow_pattern(fraction_pattern(other)),
    }
}

/// Numeric values of a modifier argument; anything else is dropped.
fn fraction_pattern(node: &Node) -> Pattern<Fraction> {
    compile_tree(node).filter_map_values(Value::as_fraction)
}

fn int_pattern(seq: &Sequence) -> Pattern<i64> {
    compile_sequence(seq).1.filter_map_values(Value::as_int)
}

fn apply_euclid(pattern: Pattern<Value>, euclid: &Euclid) -> Pattern<Value> {
    let rotation = match &euclid.rotation {
        Some(seq) => int_pattern(seq),
        None => Pattern::pure(0),
    };
    pattern.euclid_pattern(int_pattern(&euclid.pulses), int_pattern(&euclid.steps), rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::TimeSpan;
    use crate::pattern_structure::sorted;

    fn same(src: &str, expected: Pattern<Value>, span: TimeSpan) {
        let pat = compile(src).unwrap();
        assert_eq!(sorted(pat.query(&span)), sorted(expected.query(&span)), "{}", src);
    }

    fn bd() -> Pattern<Value> {
        Pattern::pure(Value::from("bd"))
    }

    #[test]
    fn test_compile_scalars() {
        let cycle = TimeSpan::new(0, 1);
        same("45", Pattern::pure(Value::Int(45)), cycle.clone());
        same("-2.", Pattern::pure(Value::Float(-2.0)), cycle.clone());
        same("~", Pattern::silence(), cycle);
    }

    #[test]
    fn test_word_index_is_a_control_map() {
        let events = compile("bd:3").unwrap().first_cycle();
        let map = events[0].value.as_map().unwrap();
        assert_eq!(map.get("s"), Some(&Value::from("bd")));
        assert_eq!(map.get("n"), Some(&Value::Float(3.0)));

        let events = compile("bd:0").unwrap().first_cycle();
        assert_eq!(events[0].value, Value::from("bd"));
    }

    #[test]
    fn test_single_slow_step_keeps_whole_event() {
        let events = compile("bd/3").unwrap().query(&TimeSpan::new(0, 3));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].whole, Some(TimeSpan::new(0, 3)));
    }

    #[test]
    fn test_repeat_then_weight() {
        // `!` copies the step, `@` then weights the copies together.
        same(
            "bd!@3 sd",
            Pattern::timecat(vec![
                (Fraction::from(6), Pattern::fastcat(vec![bd(), bd()])),
                (Fraction::one(), Pattern::pure(Value::from("sd"))),
            ]),
            TimeSpan::new(0, 1),
        );
    }

    #[test]
    fn test_degrade_ratio() {
        same("hh???", Pattern::pure(Value::from("hh")).degrade_by(0.75), TimeSpan::new(0, 8));
    }

    #[test]
    fn test_blank_source_is_silence() {
        assert!(compile("").unwrap().query(&TimeSpan::new(0, 4)).is_empty());
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = compile("bd [sd").unwrap_err();
        assert_eq!(err.offset, 6);
    }
}
