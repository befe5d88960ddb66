//! Class-name hashing compatible with styled-components.
//!
//! `djb2` runs over UTF-16 code units from the end with 32-bit signed
//! wrap-around, and the result is spelled in base 52 over `a-z` then `A-Z`.

use regex::Regex;

const SEED: i32 = 5381 + 1;
const CHARS_LENGTH: u64 = 52;

lazy_static::lazy_static! {
    static ref AD_REPLACER: Regex = Regex::new(r"(?i)(a)(d)").unwrap();
}

pub fn djb2(seed: i32, input: &str) -> i32 {
    let units: Vec<u16> = input.encode_utf16().collect();
    units
        .iter()
        .rev()
        .fold(seed, |h, &unit| h.wrapping_mul(33) ^ i32::from(unit))
}

fn alphabetic_char(code: u64) -> char {
    let offset = if code > 25 { 39 } else { 97 };
    char::from((code + offset) as u8)
}

/// Base-52 spelling of `|code|`. An `ad` pair is split with a dash so the
/// class never reads as an ad-blocker target.
pub fn alphabetic_name(code: i32) -> String {
    let mut reversed = Vec::new();
    let mut x = u64::from(code.unsigned_abs());
    while x > CHARS_LENGTH {
        reversed.push(alphabetic_char(x % CHARS_LENGTH));
        x /= CHARS_LENGTH;
    }
    reversed.push(alphabetic_char(x % CHARS_LENGTH));
    let name: String = reversed.into_iter().rev().collect();
    AD_REPLACER.replace_all(&name, "$1-$2").into_owned()
}

pub fn class_name_hash(input: &str) -> String {
    alphabetic_name(djb2(SEED, input))
}
