//! Random password and username generation.

use rand::seq::SliceRandom;
use rand::Rng;

use credvault_core::{validate_generation, GenerationParameters, ValidationError};

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Length of generated usernames.
pub const USERNAME_LENGTH: usize = 20;

/// Generate a password satisfying `params`.
///
/// Every enabled character class appears at least once.
pub fn generate_password(params: &GenerationParameters) -> Result<String, ValidationError> {
    validate_generation(params)?;

    let mut classes: Vec<&[u8]> = Vec::with_capacity(4);
    if !params.exclude_upper {
        classes.push(UPPER);
    }
    if !params.exclude_lower {
        classes.push(LOWER);
    }
    if !params.exclude_number {
        classes.push(DIGITS);
    }
    if params.include_special {
        classes.push(SPECIAL);
    }

    Ok(fill(&classes, params.length))
}

/// Generate a random username of letters.
pub fn generate_username() -> String {
    fill(&[UPPER, LOWER], USERNAME_LENGTH)
}

/// One character from each class, the rest from their union, shuffled.
fn fill(classes: &[&[u8]], length: usize) -> String {
    let mut rng = rand::thread_rng();
    let charset: Vec<u8> = classes.concat();

    let mut out: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    while out.len() < length {
        out.push(charset[rng.gen_range(0..charset.len())]);
    }
    out.shuffle(&mut rng);

    out.into_iter().map(char::from).collect()
}
