//! # Vortex - Cyclic Pattern Engine
//!
//! Vortex is a TidalCycles-style pattern engine. A pattern is a pure
//! function from a span of rational time to the events active in that
//! span, so patterns can be combined, transformed and queried from any
//! thread with identical results.
//!
//! ## Core Features
//!
//! - **Rational Time**: exact arbitrary precision cycle arithmetic
//! - **Pattern Algebra**: functor, applicatives, monadic binds and joins
//! - **Structure**: concatenation, stacking, polymeters, Euclidean rhythms
//! - **Deterministic Randomness**: random signals derived from time, not state
//! - **Mini-notation**: the compact rhythm language compiled to patterns
//! - **Control Patterns**: maps of named synth parameters with kind checks
//!
//! ## Quick Start
//!
//! ```rust
//! use vortex::mini_interpreter::compile;
//! use vortex::pattern::TimeSpan;
//!
//! let pattern = compile("bd*2 [~ sd] <hh oh>").unwrap();
//! for event in pattern.query(&TimeSpan::new(0, 1)) {
//!     println!("{}", event);
//! }
//! ```
//!
//! Patterns can also be built directly:
//!
//! ```rust
//! use vortex::pattern::Pattern;
//!
//! let kick = Pattern::pure("bd").euclid(3, 8, 0);
//! let snare = Pattern::sequence(vec!["~", "sd"]).filter_values(|v| *v != "~");
//! let beat = Pattern::stack(vec![kick, snare.every(4, |p| p.fast(2))]);
//! // every 4th cycle, starting with this one, the snare doubles up
//! assert_eq!(beat.first_cycle().len(), 5);
//! ```

pub mod config;
pub mod control;
pub mod euclid;
pub mod mini_interpreter;
pub mod mini_notation;
pub mod pattern;
pub mod pattern_ops;
pub mod pattern_signal;
pub mod pattern_structure;
pub mod time;
pub mod value;

pub use control::{ControlError, ControlPattern};
pub use mini_interpreter::compile;
pub use mini_notation::SyntaxError;
pub use pattern::{Event, Pattern};
pub use time::{Fraction, TimeSpan};
pub use value::{Value, ValueMap};
