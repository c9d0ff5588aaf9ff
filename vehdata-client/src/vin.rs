//! VIN normalization, validation and structure parsing
//!
//! Check digit follows ISO 3779 / 49 CFR 565: every character is
//! transliterated to a digit, multiplied by its position weight, and the sum
//! is reduced modulo 11. Remainder 10 is written as `X`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const VIN_LENGTH: usize = 17;

/// Index of the check digit (position 9)
const CHECK_DIGIT_INDEX: usize = 8;

const POSITION_WEIGHTS: [u32; VIN_LENGTH] = [8, 7, 6, 5, 4, 3, 2, 10, 0, 9, 8, 7, 6, 5, 4, 3, 2];

/// Model-year codes in order, starting at 1980 and repeating every 30 years
const MODEL_YEAR_CODES: &str = "ABCDEFGHJKLMNPRSTVWXY123456789";
const MODEL_YEAR_BASE: u16 = 1980;
const MODEL_YEAR_CYCLE: u16 = 30;
const MODEL_YEAR_MAX: u16 = 2039;

/// Reason a VIN failed validation
///
/// Checks run in declaration order; the first failing check is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VinError {
    #[error("VIN cannot be empty")]
    Empty,

    #[error("VIN must be exactly 17 characters (got {0})")]
    WrongLength(usize),

    #[error("VIN cannot contain the letters I, O, or Q")]
    ForbiddenLetters,

    #[error("VIN contains invalid character '{0}'")]
    InvalidCharacter(char),

    #[error("Invalid VIN check digit")]
    InvalidCheckDigit,
}

/// Strip whitespace and hyphens, uppercase the rest
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Validate and return the normalized VIN
pub fn validate(raw: &str) -> Result<String, VinError> {
    let vin = normalize(raw);

    if vin.is_empty() {
        return Err(VinError::Empty);
    }

    let length = vin.chars().count();
    if length != VIN_LENGTH {
        return Err(VinError::WrongLength(length));
    }

    if vin.chars().any(|c| matches!(c, 'I' | 'O' | 'Q')) {
        return Err(VinError::ForbiddenLetters);
    }

    if let Some(bad) = vin.chars().find(|c| transliterate(*c).is_none()) {
        return Err(VinError::InvalidCharacter(bad));
    }

    let expected = calculate_check_digit(&vin).ok_or(VinError::InvalidCheckDigit)?;
    if vin.chars().nth(CHECK_DIGIT_INDEX) != Some(expected) {
        return Err(VinError::InvalidCheckDigit);
    }

    Ok(vin)
}

pub fn is_valid(raw: &str) -> bool {
    validate(raw).is_ok()
}

/// First failing check for `raw`, or `None` when it is a valid VIN
pub fn validation_error(raw: &str) -> Option<VinError> {
    validate(raw).err()
}

/// Expected check character for a normalized 17-character VIN
///
/// Returns `None` when the input is not 17 transliterable characters. The
/// character currently at the check position does not affect the result
/// (its weight is zero).
pub fn calculate_check_digit(vin: &str) -> Option<char> {
    let mut sum = 0u32;
    let mut count = 0usize;

    for (c, weight) in vin.chars().zip(POSITION_WEIGHTS.iter()) {
        sum += transliterate(c)? * weight;
        count += 1;
    }

    if count != VIN_LENGTH || vin.chars().count() != VIN_LENGTH {
        return None;
    }

    match sum % 11 {
        10 => Some('X'),
        remainder => char::from_digit(remainder, 10),
    }
}

/// ISO 3779 transliteration; I, O and Q have no value
fn transliterate(c: char) -> Option<u32> {
    let value = match c {
        '0'..='9' => return c.to_digit(10),
        'A' | 'J' => 1,
        'B' | 'K' | 'S' => 2,
        'C' | 'L' | 'T' => 3,
        'D' | 'M' | 'U' => 4,
        'E' | 'N' | 'V' => 5,
        'F' | 'W' => 6,
        'G' | 'P' | 'X' => 7,
        'H' | 'Y' => 8,
        'R' | 'Z' => 9,
        _ => return None,
    };
    Some(value)
}

/// Sections of a valid VIN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VinStructure {
    /// World manufacturer identifier (positions 1-3)
    pub manufacturer_code: String,
    /// Vehicle descriptor section (positions 4-8)
    pub descriptor: String,
    /// Position 9
    pub check_digit: char,
    /// Position 10
    pub model_year_code: char,
    /// Position 11
    pub plant_code: char,
    /// Production sequence (positions 12-17)
    pub serial: String,
}

impl VinStructure {
    /// Model years the position-10 code can denote, oldest first
    pub fn model_year_candidates(&self) -> Vec<u16> {
        let Some(index) = MODEL_YEAR_CODES.find(self.model_year_code) else {
            return Vec::new();
        };

        let mut year = MODEL_YEAR_BASE + index as u16;
        let mut years = Vec::new();
        while year <= MODEL_YEAR_MAX {
            years.push(year);
            year += MODEL_YEAR_CYCLE;
        }
        years
    }
}

/// Split a VIN into its sections; `None` unless the VIN is valid
pub fn parse_structure(raw: &str) -> Option<VinStructure> {
    let vin = validate(raw).ok()?;
    let chars: Vec<char> = vin.chars().collect();

    Some(VinStructure {
        manufacturer_code: chars[0..3].iter().collect(),
        descriptor: chars[3..8].iter().collect(),
        check_digit: chars[8],
        model_year_code: chars[9],
        plant_code: chars[10],
        serial: chars[11..17].iter().collect(),
    })
}
