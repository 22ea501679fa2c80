//! CSV and manual-entry recipient parsing

use super::{Recipient, RecipientError};

/// Minimum length of a cleaned phone number
pub const MIN_PHONE_LENGTH: usize = 10;

const NAME_COLUMN: &str = "nama";
const NUMBER_COLUMN: &str = "nomor";

/// Keep only digits and `+`
pub fn clean_phone_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// Parse `nama,nomor` CSV text.
///
/// The header match is case-insensitive. Rows missing either cell, or whose
/// number has no digits left after cleaning, are skipped. Unlike manual entry
/// there is no minimum length. Quoted fields are not supported.
pub fn parse_csv(text: &str) -> Result<Vec<Recipient>, RecipientError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(RecipientError::EmptyInput);
    }

    let mut lines = text.lines();
    let header: Vec<String> = lines
        .next()
        .unwrap_or_default()
        .split(',')
        .map(|cell| cell.trim().to_lowercase())
        .collect();

    let name_index = header.iter().position(|h| h == NAME_COLUMN);
    let number_index = header.iter().position(|h| h == NUMBER_COLUMN);
    let (Some(name_index), Some(number_index)) = (name_index, number_index) else {
        return Err(RecipientError::MissingColumns);
    };

    let contacts: Vec<Recipient> = lines
        .filter_map(|line| {
            let row: Vec<&str> = line.split(',').map(str::trim).collect();
            let name = row.get(name_index).copied().unwrap_or_default();
            let number = row.get(number_index).copied().unwrap_or_default();
            if name.is_empty() || number.is_empty() {
                return None;
            }

            let cleaned = clean_phone_number(number);
            (!cleaned.is_empty()).then(|| Recipient::contact(name, cleaned))
        })
        .collect();

    if contacts.is_empty() {
        return Err(RecipientError::NoContacts);
    }

    tracing::debug!(contacts = contacts.len(), "Parsed CSV recipients");
    Ok(contacts)
}

/// Parse one phone number per line.
///
/// Any line that does not clean to a valid number rejects the whole input,
/// listing the offending 1-based line numbers.
pub fn parse_manual(text: &str) -> Result<Vec<Recipient>, RecipientError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(RecipientError::EmptyInput);
    }

    let mut numbers = Vec::new();
    let mut invalid = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let cleaned = clean_phone_number(trimmed);
        if cleaned.len() >= MIN_PHONE_LENGTH {
            numbers.push(Recipient::number(cleaned));
        } else {
            invalid.push(format!("line {}: \"{}\"", index + 1, trimmed));
        }
    }

    if numbers.is_empty() {
        return Err(RecipientError::NoValidNumbers);
    }

    if !invalid.is_empty() {
        return Err(RecipientError::InvalidLines(invalid));
    }

    tracing::debug!(numbers = numbers.len(), "Parsed manual recipients");
    Ok(numbers)
}
