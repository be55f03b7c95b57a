//! # Random
//!
//! Random-value generators over `rand`, `uuid` and `nanoid`.
//!
//! Range helpers are total: bounds may be given in either order and a
//! degenerate range yields its single value. Only the draw helpers that can
//! genuinely run dry ([`pick_many`], with `distinct` set) return a `Result`.
//!
//! ## Example
//!
//! ```rust
//! let id = shed_random::id();
//! assert_eq!(id.len(), 21);
//!
//! let n = shed_random::int_between(1, 6);
//! assert!((1..=6).contains(&n));
//! ```

mod error;

pub use crate::error::{RandomError, RandomErrorExt};

use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::{Rng, thread_rng};
use std::collections::HashSet;

/// Default nanoid length.
const ID_LEN: usize = 21;

/// Identifier alphabet without the lookalike characters `0`, `O`, `1`, `l`
/// and `I`.
const ID_ALPHABET: [char; 57] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k',
    'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B', 'C', 'D', 'E',
    'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

/// Mobile number prefixes in the 13x/15x/17x/18x families.
const MOBILE_PREFIXES: &[&str] = &[
    "130", "131", "132", "133", "134", "135", "136", "137", "138", "139", "150", "151", "152",
    "153", "155", "156", "157", "158", "159", "170", "171", "173", "175", "176", "177", "178",
    "180", "181", "182", "183", "184", "185", "186", "187", "188", "189",
];

const MOBILE_LEN: usize = 11;

/// A hyphenated random (version 4) UUID.
#[must_use]
pub fn uuid_string() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A 21-character random identifier over an unambiguous alphabet.
#[must_use]
pub fn id() -> String {
    nanoid::nanoid!(ID_LEN, &ID_ALPHABET)
}

/// A random identifier of the given length over an unambiguous alphabet.
#[must_use]
pub fn id_with_len(len: usize) -> String {
    nanoid::nanoid!(len, &ID_ALPHABET)
}

/// A uniform integer between the bounds, both inclusive.
#[must_use]
pub fn int_between(start: i64, end: i64) -> i64 {
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    thread_rng().gen_range(lo..=hi)
}

/// A uniform value from `start`, `start + step`, ... strictly below `end`.
///
/// A zero step, or an empty progression, yields `start`.
#[must_use]
pub fn int_stepped(start: i64, end: i64, step: i64) -> i64 {
    if step == 0 {
        return start;
    }
    let span = end - start;
    if span == 0 || span.signum() != step.signum() {
        return start;
    }

    let count = span.unsigned_abs().div_ceil(step.unsigned_abs());
    let k = thread_rng().gen_range(0..count).cast_signed();
    start + k * step
}

/// A uniform float between the bounds, rounded to `scale` decimal places.
///
/// A `scale` of zero leaves the value unrounded.
#[must_use]
pub fn float_between(start: f64, end: f64, scale: u32) -> f64 {
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    let value = thread_rng().gen_range(lo..=hi);

    if scale == 0 {
        return value;
    }
    let factor = 10f64.powi(scale.min(15) as i32);
    (value * factor).round() / factor
}

/// A random element of the slice, or `None` when it is empty.
#[must_use]
pub fn pick<T>(items: &[T]) -> Option<&T> {
    items.choose(&mut thread_rng())
}

/// Draws `n` elements from the slice.
///
/// With `distinct` set, equal input values collapse first and each value
/// appears at most once in the result. Without it, elements are drawn with
/// replacement.
///
/// # Errors
/// Returns [`RandomError::Internal`] when the slice is empty (and `n > 0`)
/// or a distinct draw asks for more values than exist.
pub fn pick_many<T>(items: &[T], n: usize, distinct: bool) -> Result<Vec<T>, RandomError>
where
    T: Clone + PartialEq,
{
    if n == 0 {
        return Ok(Vec::new());
    }
    if items.is_empty() {
        return Err("cannot pick from an empty slice".into());
    }

    let mut rng = thread_rng();
    if distinct {
        let mut unique: Vec<&T> = Vec::new();
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        if n > unique.len() {
            return Err(RandomError::Internal {
                message: format!("not enough distinct items: requested {n} from {}", unique.len())
                    .into(),
                context: None,
            });
        }
        let mut drawn: Vec<T> =
            unique.choose_multiple(&mut rng, n).map(|item| (*item).clone()).collect();
        drawn.shuffle(&mut rng);
        Ok(drawn)
    } else {
        Ok((0..n).filter_map(|_| items.choose(&mut rng).cloned()).collect())
    }
}

/// A random string of the given length over `[0-9A-Za-z]`.
#[must_use]
pub fn alphanumeric(len: usize) -> String {
    thread_rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

/// A random 11-digit mobile number from the default prefix pool.
#[must_use]
pub fn mobile() -> String {
    mobile_with_prefix(MOBILE_PREFIXES)
}

/// A random 11-digit mobile number starting with one of the given prefixes.
///
/// An empty prefix list falls back to the default pool; a prefix of eleven
/// or more digits is truncated to eleven.
#[must_use]
pub fn mobile_with_prefix(prefixes: &[&str]) -> String {
    let pool = if prefixes.is_empty() { MOBILE_PREFIXES } else { prefixes };
    let prefix = pick(pool).copied().unwrap_or("1");

    if prefix.len() >= MOBILE_LEN {
        return prefix.chars().take(MOBILE_LEN).collect();
    }

    let mut rng = thread_rng();
    let mut number = String::with_capacity(MOBILE_LEN);
    number.push_str(prefix);
    while number.len() < MOBILE_LEN {
        number.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    number
}

/// A batch of `n` distinct random mobile numbers from the default pool.
#[must_use]
pub fn mobiles(n: usize) -> Vec<String> {
    let mut seen = HashSet::with_capacity(n);
    while seen.len() < n {
        seen.insert(mobile());
    }
    seen.into_iter().collect()
}
