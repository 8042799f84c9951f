use rand::seq::SliceRandom;
use rand::Rng;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const ALPHANUMERIC_WITH_SYMBOLS: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()_+-=[]{}|;:,.<>?";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alphabet {
    Alphanumeric,
    AlphanumericWithSymbols,
}

impl Alphabet {
    pub fn characters(&self) -> &'static [u8] {
        match self {
            Self::Alphanumeric => ALPHANUMERIC,
            Self::AlphanumericWithSymbols => ALPHANUMERIC_WITH_SYMBOLS,
        }
    }
}

pub fn random_item<T>(items: &[T]) -> Option<&T> {
    random_item_with(&mut rand::thread_rng(), items)
}

pub fn random_item_with<'a, T, R>(rng: &mut R, items: &'a [T]) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    if items.is_empty() {
        return None;
    }
    items.get(rng.gen_range(0..items.len()))
}

/// Inclusive on both ends. Reversed bounds are swapped.
pub fn random_int(min: i64, max: i64) -> i64 {
    random_int_with(&mut rand::thread_rng(), min, max)
}

pub fn random_int_with<R>(rng: &mut R, min: i64, max: i64) -> i64
where
    R: Rng + ?Sized,
{
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    if low == high {
        return low;
    }
    rng.gen_range(low..=high)
}

/// Fisher-Yates shuffle into a new vector; the input is left as is.
pub fn shuffle<T: Clone>(items: &[T]) -> Vec<T> {
    shuffle_with(&mut rand::thread_rng(), items)
}

pub fn shuffle_with<T, R>(rng: &mut R, items: &[T]) -> Vec<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    let mut shuffled = items.to_vec();
    for index in (1..shuffled.len()).rev() {
        let swap_with = rng.gen_range(0..=index);
        shuffled.swap(index, swap_with);
    }
    shuffled
}

pub fn random_string(length: usize, alphabet: Alphabet) -> String {
    random_string_with(&mut rand::thread_rng(), length, alphabet)
}

pub fn random_string_with<R>(rng: &mut R, length: usize, alphabet: Alphabet) -> String
where
    R: Rng + ?Sized,
{
    let characters = alphabet.characters();
    (0..length)
        .map(|_| characters.choose(rng).copied().map(char::from).unwrap_or('a'))
        .collect()
}
