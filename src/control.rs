//! Control patterns
//!
//! A control pattern carries maps of named synth parameters, e.g.
//! `{s: "bd", n: 3, gain: 0.8}`, the shape a sound engine expects. Each
//! known control has a value kind that mini-notation is checked against
//! before compiling, so `gain "bd"` is rejected up front rather than
//! producing events with the wrong type.

use crate::mini_interpreter::compile_tree;
use crate::mini_notation::{self, Node, Number, Sequence, SyntaxError};
use crate::pattern::Pattern;
use crate::value::{Value, ValueKind, ValueMap};
use std::fmt;
use tracing::debug;

pub type ControlPattern = Pattern<ValueMap>;

/// Known controls and the kind of value each takes
pub const CONTROLS: &[(&str, ValueKind)] = &[
    ("s", ValueKind::Str),
    ("vowel", ValueKind::Str),
    ("n", ValueKind::Float),
    ("note", ValueKind::Float),
    ("gain", ValueKind::Float),
    ("pan", ValueKind::Float),
    ("speed", ValueKind::Float),
    ("room", ValueKind::Float),
    ("size", ValueKind::Float),
    ("begin", ValueKind::Float),
    ("end", ValueKind::Float),
    ("orbit", ValueKind::Int),
    ("cut", ValueKind::Int),
];

pub fn control_kind(name: &str) -> Option<ValueKind> {
    CONTROLS
        .iter()
        .find(|(control, _)| *control == name)
        .map(|(_, kind)| *kind)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlError {
    Syntax(SyntaxError),
    UnknownControl(String),
    KindMismatch {
        control: String,
        expected: ValueKind,
        found: ValueKind,
        value: String,
    },
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::Syntax(err) => write!(f, "{}", err),
            ControlError::UnknownControl(name) => write!(f, "unknown control `{}`", name),
            ControlError::KindMismatch {
                control,
                expected,
                found,
                value,
            } => write!(
                f,
                "control `{}` takes a {}, but `{}` is a {}",
                control, expected, value, found
            ),
        }
    }
}

impl std::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControlError::Syntax(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SyntaxError> for ControlError {
    fn from(err: SyntaxError) -> Self {
        ControlError::Syntax(err)
    }
}

/// Compile mini-notation as the control `name`
///
/// # Example
/// ```
/// use vortex::control::control;
///
/// let pat = control("gain", "0.5 1").unwrap();
/// assert_eq!(pat.first_cycle().len(), 2);
/// assert!(control("gain", "bd").is_err());
/// ```
pub fn control(name: &str, source: &str) -> Result<ControlPattern, ControlError> {
    let kind = control_kind(name).ok_or_else(|| ControlError::UnknownControl(name.to_string()))?;
    let tree = mini_notation::parse(source)?;
    check_kinds(name, kind, &tree)?;
    debug!(control = name, len = source.len(), "compiled control pattern");

    let name = name.to_string();
    Ok(compile_tree(&tree).filter_map_values(move |value| to_control(&name, kind, value)))
}

/// Wraps the values of a pattern as control `name`, converting numbers
/// to the control's kind.
pub fn control_from(name: &str, pattern: Pattern<Value>) -> Result<ControlPattern, ControlError> {
    let kind = control_kind(name).ok_or_else(|| ControlError::UnknownControl(name.to_string()))?;
    let name = name.to_string();
    Ok(pattern.filter_map_values(move |value| to_control(&name, kind, value)))
}

fn to_control(name: &str, kind: ValueKind, value: &Value) -> Option<ValueMap> {
    let converted = match (kind, value) {
        // `bd:3` already carries both `s` and `n`.
        (ValueKind::Str, Value::Map(map)) if name == "s" => return Some(map.clone()),
        (ValueKind::Str, Value::Str(s)) => Value::Str(s.clone()),
        (ValueKind::Float, _) => Value::Float(value.as_number()?),
        (ValueKind::Int, Value::Int(i)) => Value::Int(*i),
        _ => return None,
    };
    let mut map = ValueMap::new();
    map.insert(name.to_string(), converted);
    Some(map)
}

fn check_kinds(control: &str, expected: ValueKind, node: &Node) -> Result<(), ControlError> {
    let mismatch = |found: ValueKind, value: String| ControlError::KindMismatch {
        control: control.to_string(),
        expected,
        found,
        value,
    };
    let check_seqs = |seqs: &[Sequence]| -> Result<(), ControlError> {
        for seq in seqs {
            for element in &seq.elements {
                check_kinds(control, expected, &element.value)?;
            }
        }
        Ok(())
    };

    match node {
        Node::Rest => Ok(()),
        Node::Sequence(seq) => check_seqs(std::slice::from_ref(seq)),
        Node::Polyrhythm { seqs } | Node::Polymeter { seqs, .. } | Node::RandomSequence { seqs } => {
            check_seqs(seqs.as_slice())
        }
        Node::Word { value, index } => {
            let found = match index {
                None | Some(0) => ValueKind::Str,
                Some(_) => ValueKind::Map,
            };
            match (expected, found) {
                (ValueKind::Str, ValueKind::Str) => Ok(()),
                (ValueKind::Str, ValueKind::Map) if control == "s" => Ok(()),
                _ => Err(mismatch(found, value.clone())),
            }
        }
        Node::Number { value } => {
            let (found, text) = match value {
                Number::Int(i) => (ValueKind::Int, i.to_string()),
                Number::Float(f) => (ValueKind::Float, f.to_string()),
            };
            match (expected, found) {
                (ValueKind::Float, _) | (ValueKind::Int, ValueKind::Int) => Ok(()),
                _ => Err(mismatch(found, text)),
            }
        }
    }
}

macro_rules! control_fns {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("The `", stringify!($name), "` control from mini-notation.")]
            pub fn $name(source: &str) -> Result<ControlPattern, ControlError> {
                control(stringify!($name), source)
            }
        )*
    };
}

control_fns!(s, vowel, n, note, gain, pan, speed, room, size, begin, end, orbit, cut);

impl Pattern<ValueMap> {
    /// Merge maps with `other`, structure from the left; on shared keys
    /// the right value wins.
    pub fn union(self, other: ControlPattern) -> ControlPattern {
        self.app_left(other, |left, right| {
            let mut merged = left.clone();
            merged.extend(right.iter().map(|(k, v)| (k.clone(), v.clone())));
            merged
        })
    }

    /// Like [`Pattern::union`], but the left value wins on shared keys.
    pub fn union_prefer_left(self, other: ControlPattern) -> ControlPattern {
        self.app_left(other, |left, right| {
            let mut merged = right.clone();
            merged.extend(left.iter().map(|(k, v)| (k.clone(), v.clone())));
            merged
        })
    }

    /// Set `name` to `value` on every event.
    pub fn set(self, name: &str, value: impl Into<Value>) -> ControlPattern {
        let name = name.to_string();
        let value = value.into();
        self.fmap(move |mut map| {
            map.insert(name.clone(), value.clone());
            map
        })
    }

    /// Play the pattern `n` times per cycle, each time through the next
    /// `1/n` slice of the sample
    ///
    /// # Example
    /// ```text
    /// striate 2 $ s "bd sd"  =>  bd[0-0.5] sd[0-0.5] bd[0.5-1] sd[0.5-1]
    /// ```
    pub fn striate(self, n: u32) -> ControlPattern {
        let slices = (0..n)
            .map(|i| {
                let begin = f64::from(i) / f64::from(n);
                let end = f64::from(i + 1) / f64::from(n);
                self.clone().set("begin", begin).set("end", end)
            })
            .collect();
        Pattern::fastcat(slices)
    }

    /// Stack the pattern panned left with `f` applied to a copy panned
    /// right, `by` apart (1 is hard left to hard right).
    pub fn jux_by(self, by: f64, f: impl FnOnce(ControlPattern) -> ControlPattern) -> ControlPattern {
        let half = by / 2.0;
        let pan = move |delta: f64| {
            move |mut map: ValueMap| {
                let centre = map.get("pan").and_then(Value::as_number).unwrap_or(0.5);
                map.insert("pan".to_string(), Value::Float(centre + delta));
                map
            }
        };
        let left = self.clone().fmap(pan(-half));
        let right = f(self.fmap(pan(half)));
        Pattern::stack(vec![left, right])
    }

    pub fn jux(self, f: impl FnOnce(ControlPattern) -> ControlPattern) -> ControlPattern {
        self.jux_by(1.0, f)
    }
}
