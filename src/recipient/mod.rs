//! Recipients and the sources they are parsed from.
//!
//! Two sources are supported:
//! - CSV text with a `nama,nomor` header (personalized contacts)
//! - A manual list with one phone number per line (no display names)

mod parser;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::template::{Bindings, NAME_VARIABLE};

pub use parser::{clean_phone_number, parse_csv, parse_manual, MIN_PHONE_LENGTH};

/// Recipient source error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecipientError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("CSV must contain \"nama\" and \"nomor\" columns")]
    MissingColumns,

    #[error("No valid contacts found in CSV")]
    NoContacts,

    #[error("No valid phone numbers found")]
    NoValidNumbers,

    #[error("Invalid phone numbers: {}", .0.join(", "))]
    InvalidLines(Vec<String>),
}

/// A single message destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Phone number: digits with an optional leading `+`
    pub address: String,

    /// Only present for contacts sourced from a CSV list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Recipient {
    /// Recipient from a bare number
    pub fn number(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: None,
        }
    }

    /// Recipient with a display name
    pub fn contact(display_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: Some(display_name.into()),
        }
    }

    /// Label for progress reporting: the display name, else the address
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.address)
    }

    /// Template bindings for this recipient.
    ///
    /// Without a display name `nama` stays unbound and renders empty.
    pub fn bindings(&self) -> Bindings {
        let mut bindings = Bindings::new();
        if let Some(name) = &self.display_name {
            bindings.insert(NAME_VARIABLE.to_string(), name.clone());
        }
        bindings
    }
}
