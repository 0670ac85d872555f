use bincode::{Decode, Encode};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ClickResult;

pub const SIGNATURE: &str = "LS";
pub const QUANTITY: i64 = 1;

/// Column order shared by the table, the listing and every export.
pub const RECORD_COLUMNS: [&str; 16] = [
    "Entry_Date",
    "Batch_Number",
    "Date_Code",
    "Product",
    "Scrap",
    "Quantity",
    "Signature",
    "Notes",
    "Casting_Clock",
    "Pinhole_Level",
    "Exact_Time",
    "Casting_Cavity_Number",
    "Core_Cavity_Number",
    "Core_Clock",
    "Shift_Class",
    "Location",
];

/// Form values that accompany every logged defect.
///
/// Defaults: the inspection date is today, every other field is empty. The
/// host form keeps whatever the operator typed last.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub inspection_date: String,
    pub part_number: String,
    pub batch_number: String,
    pub date_code: String,
    pub notes: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Batch Number is required to log defects")]
    MissingBatchNumber,
    #[error("Part Number is required to log defects")]
    MissingPartNumber,
}

impl SessionContext {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            inspection_date: date.format("%Y-%m-%d").to_string(),
            ..Self::default()
        }
    }

    pub fn today() -> Self {
        Self::for_date(Local::now().date_naive())
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.batch_number.trim().is_empty() {
            return Err(SessionError::MissingBatchNumber);
        }
        if self.part_number.trim().is_empty() {
            return Err(SessionError::MissingPartNumber);
        }
        Ok(())
    }
}

/// One row of the scrap table. Serializes with the table's column names.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DefectRecord {
    #[serde(rename = "Entry_Date")]
    pub entry_date: String,
    #[serde(rename = "Batch_Number")]
    pub batch_number: String,
    #[serde(rename = "Date_Code")]
    pub date_code: String,
    #[serde(rename = "Product")]
    pub product: String,
    #[serde(rename = "Scrap")]
    pub scrap: String,
    #[serde(rename = "Quantity")]
    pub quantity: i64,
    #[serde(rename = "Signature")]
    pub signature: String,
    #[serde(rename = "Notes")]
    pub notes: String,
    #[serde(rename = "Casting_Clock")]
    pub casting_clock: i64,
    #[serde(rename = "Pinhole_Level")]
    pub pinhole_level: i64,
    #[serde(rename = "Exact_Time")]
    pub exact_time: String,
    #[serde(rename = "Casting_Cavity_Number")]
    pub casting_cavity_number: String,
    #[serde(rename = "Core_Cavity_Number")]
    pub core_cavity_number: String,
    #[serde(rename = "Core_Clock")]
    pub core_clock: String,
    #[serde(rename = "Shift_Class")]
    pub shift_class: i64,
    #[serde(rename = "Location")]
    pub location: String,
}

impl DefectRecord {
    pub fn from_click(click: &ClickResult, session: &SessionContext) -> Result<Self, SessionError> {
        session.validate()?;
        Ok(Self {
            entry_date: session.inspection_date.trim().to_string(),
            batch_number: session.batch_number.trim().to_string(),
            date_code: session.date_code.trim().to_string(),
            product: session.part_number.trim().to_string(),
            scrap: click.defect.clone(),
            quantity: QUANTITY,
            signature: SIGNATURE.to_string(),
            notes: session.notes.clone(),
            casting_clock: i64::from(click.segment),
            pinhole_level: i64::from(click.distance),
            exact_time: click.timestamp.clone(),
            casting_cavity_number: click.cavity.clone(),
            core_cavity_number: click.cavity.clone(),
            core_clock: click.ring.clone(),
            shift_class: i64::from(click.angle),
            location: click.option.clone(),
        })
    }

    /// Values in [`RECORD_COLUMNS`] order.
    pub fn values(&self) -> [String; 16] {
        [
            self.entry_date.clone(),
            self.batch_number.clone(),
            self.date_code.clone(),
            self.product.clone(),
            self.scrap.clone(),
            self.quantity.to_string(),
            self.signature.clone(),
            self.notes.clone(),
            self.casting_clock.to_string(),
            self.pinhole_level.to_string(),
            self.exact_time.clone(),
            self.casting_cavity_number.clone(),
            self.core_cavity_number.clone(),
            self.core_clock.clone(),
            self.shift_class.to_string(),
            self.location.clone(),
        ]
    }
}
