//! Output types: the contact record and the per-scan report.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The flat contact record a scan produces.
///
/// Every field is a `String`. A field the card did not yield is `""`, never
/// missing, so callers can render or edit the record without special-casing
/// absence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub title: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: String,
}

impl ContactInfo {
    /// Value of a single field.
    pub fn get(&self, field: ContactField) -> &str {
        match field {
            ContactField::Name => &self.name,
            ContactField::Title => &self.title,
            ContactField::Company => &self.company,
            ContactField::Email => &self.email,
            ContactField::Phone => &self.phone,
            ContactField::Website => &self.website,
            ContactField::Address => &self.address,
        }
    }

    /// Replace a single field.
    pub fn set(&mut self, field: ContactField, value: impl Into<String>) {
        let slot = match field {
            ContactField::Name => &mut self.name,
            ContactField::Title => &mut self.title,
            ContactField::Company => &mut self.company,
            ContactField::Email => &mut self.email,
            ContactField::Phone => &mut self.phone,
            ContactField::Website => &mut self.website,
            ContactField::Address => &mut self.address,
        };
        *slot = value.into();
    }

    /// True when no field was extracted.
    pub fn is_empty(&self) -> bool {
        ContactField::ALL.iter().all(|f| self.get(*f).is_empty())
    }

    /// Number of non-empty fields.
    pub fn filled_count(&self) -> usize {
        ContactField::ALL
            .iter()
            .filter(|f| !self.get(**f).is_empty())
            .count()
    }
}

/// The logical fields of a [`ContactInfo`], in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactField {
    Name,
    Title,
    Company,
    Email,
    Phone,
    Website,
    Address,
}

impl ContactField {
    pub const ALL: [ContactField; 7] = [
        ContactField::Name,
        ContactField::Title,
        ContactField::Company,
        ContactField::Email,
        ContactField::Phone,
        ContactField::Website,
        ContactField::Address,
    ];

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            ContactField::Name => "Name",
            ContactField::Title => "Title",
            ContactField::Company => "Company",
            ContactField::Email => "Email",
            ContactField::Phone => "Phone",
            ContactField::Website => "Website",
            ContactField::Address => "Address",
        }
    }
}

impl fmt::Display for ContactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Detailed outcome of one successful scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// The normalized, cleaned contact record.
    pub contact: ContactInfo,
    /// Job handle the service returned for this scan.
    pub operation_location: String,
    /// Poll requests issued before the job finished.
    pub poll_attempts: u32,
    /// Size of the uploaded image body.
    pub upload_bytes: usize,
    /// Pixel dimensions of the uploaded image.
    pub upload_dimensions: (u32, u32),
    /// Time spent waiting on the analysis service.
    pub analysis_duration_ms: u64,
    /// Wall-clock time of the whole scan.
    pub total_duration_ms: u64,
}
