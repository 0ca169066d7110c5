//! Structural and checksum rules for RID and DRID values.

use crate::model::Classification;

pub const RID_LEN: usize = 10;
pub const DRID_PREFIX: char = 'D';

/// Ten ASCII digits, no leading zero, divisible by 13 and not by 11.
pub fn is_valid_rid(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != RID_LEN || bytes[0] == b'0' || !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }
    // Ten digits always fit in a u64.
    let Ok(number) = value.parse::<u64>() else {
        return false;
    };
    number % 13 == 0 && number % 11 != 0
}

/// `D` followed by exactly nine ASCII digits.
pub fn is_valid_drid(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next() == Some(DRID_PREFIX)
        && value.len() == RID_LEN
        && chars.all(|c| c.is_ascii_digit())
}

pub fn classify(value: &str) -> Classification {
    if is_valid_drid(value) {
        Classification::Drid
    } else if is_valid_rid(value) {
        Classification::Rid
    } else {
        Classification::Unknown
    }
}
