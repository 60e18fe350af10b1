//! Euclidean rhythms
//!
//! `bjorklund(k, n)` spreads `k` onsets as evenly as possible over `n`
//! steps, following Bjorklund's algorithm as used by Tidal: the onset and
//! rest groups are repeatedly paired off until at most one remainder
//! group is left.

use crate::pattern::{Fraction, Pattern};

type Groups = (Vec<Vec<bool>>, Vec<Vec<bool>>);

/// Step counts above this give an empty sequence.
pub const MAX_EUCLID_STEPS: i64 = 4096;

/// Onset/rest sequence with `pulses` onsets over `steps` steps
///
/// A negative `pulses` inverts the result, so `(-3, 8)` has onsets where
/// `(3, 8)` has rests. `steps <= 0` or above [`MAX_EUCLID_STEPS`] gives
/// an empty sequence.
///
/// # Example
/// ```text
/// bjorklund(3, 8)  =>  x..x..x.
/// bjorklund(5, 8)  =>  x.xx.xx.
/// ```
pub fn bjorklund(pulses: i64, steps: i64) -> Vec<bool> {
    if steps <= 0 || steps > MAX_EUCLID_STEPS {
        return Vec::new();
    }

    let onsets = pulses.unsigned_abs().min(steps as u64) as usize;
    let rests = steps as usize - onsets;

    let groups: Groups = (vec![vec![true]; onsets], vec![vec![false]; rests]);
    let (front, back) = distribute((onsets, rests), groups);

    let sequence = front.into_iter().chain(back).flatten();
    if pulses < 0 {
        sequence.map(|on| !on).collect()
    } else {
        sequence.collect()
    }
}

fn distribute(mut counts: (usize, usize), mut groups: Groups) -> Groups {
    loop {
        let (ons, offs) = counts;
        if ons.min(offs) <= 1 {
            return groups;
        }

        let (xs, ys) = groups;
        if ons > offs {
            // Pair the first `offs` onset groups with every rest group.
            let (paired, leftover) = split_groups(xs, offs);
            counts = (offs, ons - offs);
            groups = (concat_pairs(paired, ys), leftover);
        } else {
            // Pair every onset group with the first `ons` rest groups.
            let (paired, leftover) = split_groups(ys, ons);
            counts = (ons, offs - ons);
            groups = (concat_pairs(xs, paired), leftover);
        }
    }
}

fn split_groups(mut groups: Vec<Vec<bool>>, at: usize) -> (Vec<Vec<bool>>, Vec<Vec<bool>>) {
    let rest = groups.split_off(at.min(groups.len()));
    (groups, rest)
}

fn concat_pairs(a: Vec<Vec<bool>>, b: Vec<Vec<bool>>) -> Vec<Vec<bool>> {
    a.into_iter()
        .zip(b)
        .map(|(mut x, y)| {
            x.extend(y);
            x
        })
        .collect()
}

/// The Euclidean sequence as a one-cycle boolean pattern, rotated
/// `rotation` steps to the left.
pub fn euclid_bools(pulses: i64, steps: i64, rotation: i64) -> Pattern<bool> {
    if steps <= 0 || steps > MAX_EUCLID_STEPS {
        return Pattern::silence();
    }
    let bools = Pattern::sequence(bjorklund(pulses, steps));
    if rotation == 0 {
        bools
    } else {
        bools.early(Fraction::new(rotation, steps))
    }
}

impl<T: Clone + Send + Sync + 'static> Pattern<T> {
    /// Euclidean rhythm
    ///
    /// Plays the pattern's values on the onsets of `bjorklund(pulses,
    /// steps)`, rotated left by `rotation` steps.
    ///
    /// # Example
    /// ```text
    /// "bd(3,8)"    =>  x..x..x.
    /// "bd(3,8,2)"  =>  .x..x.x.
    /// ```
    pub fn euclid(self, pulses: i64, steps: i64, rotation: i64) -> Pattern<T> {
        self.structure(euclid_bools(pulses, steps, rotation))
    }

    /// Plays on the rests of the Euclidean sequence instead.
    pub fn euclid_inv(self, pulses: i64, steps: i64, rotation: i64) -> Pattern<T> {
        self.structure(euclid_bools(-pulses, steps, rotation))
    }

    /// This pattern on the onsets, `other` on the rests.
    pub fn euclid_full(self, pulses: i64, steps: i64, rotation: i64, other: Pattern<T>) -> Pattern<T> {
        Pattern::stack(vec![
            self.euclid(pulses, steps, rotation),
            other.euclid_inv(pulses, steps, rotation),
        ])
    }

    /// [`Pattern::euclid`] with all three arguments patterned, e.g.
    /// `bd(<3 5>,8,<0 2>)`.
    pub fn euclid_pattern(
        self,
        pulses: Pattern<i64>,
        steps: Pattern<i64>,
        rotation: Pattern<i64>,
    ) -> Pattern<T> {
        pulses
            .app_both(steps, |k, n| (*k, *n))
            .app_both(rotation, |(k, n), r| (*k, *n, *r))
            .fmap(move |(k, n, r)| self.clone().euclid(k, n, r))
            .outer_join()
    }
}
