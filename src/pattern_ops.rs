//! Arithmetic on numeric patterns
//!
//! `a + b` keeps the structure of `a` (Tidal's `|+`). The `_right`
//! variants take structure from the other pattern (`+|`) and `_both`
//! from both (`|+|`).

use crate::pattern::Pattern;
use std::ops::{Add, Div, Mul, Sub};

macro_rules! numeric_op {
    ($left:ident, $right:ident, $both:ident, $op:tt, $doc:literal) => {
        #[doc = concat!($doc, " with structure from the left")]
        pub fn $left(self, other: Pattern<f64>) -> Pattern<f64> {
            self.app_left(other, |a, b| a $op b)
        }

        #[doc = concat!($doc, " with structure from the right")]
        pub fn $right(self, other: Pattern<f64>) -> Pattern<f64> {
            self.app_right(other, |a, b| a $op b)
        }

        #[doc = concat!($doc, " with structure from both sides")]
        pub fn $both(self, other: Pattern<f64>) -> Pattern<f64> {
            self.app_both(other, |a, b| a $op b)
        }
    };
}

impl Pattern<f64> {
    numeric_op!(add_left, add_right, add_both, +, "Add");
    numeric_op!(sub_left, sub_right, sub_both, -, "Subtract");
    numeric_op!(mul_left, mul_right, mul_both, *, "Multiply");
    numeric_op!(div_left, div_right, div_both, /, "Divide");
}

macro_rules! impl_pattern_op {
    ($trait:ident, $method:ident, $left:ident, $op:tt) => {
        impl $trait<Pattern<f64>> for Pattern<f64> {
            type Output = Pattern<f64>;
            fn $method(self, other: Pattern<f64>) -> Pattern<f64> {
                self.$left(other)
            }
        }

        impl $trait<f64> for Pattern<f64> {
            type Output = Pattern<f64>;
            fn $method(self, other: f64) -> Pattern<f64> {
                self.fmap(move |v| v $op other)
            }
        }
    };
}

impl_pattern_op!(Add, add, add_left, +);
impl_pattern_op!(Sub, sub, sub_left, -);
impl_pattern_op!(Mul, mul, mul_left, *);
impl_pattern_op!(Div, div, div_left, /);
