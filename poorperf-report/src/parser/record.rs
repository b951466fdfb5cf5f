//! A single profiling sample
//!
//! A `Record` holds exactly the fields its header declared. The typed
//! accessors cover the columns the report consumes; asking for a column the
//! header did not declare is a `FormatError`, never a silent default.

use super::header::{fields, FormatHeader};
use crate::domain::{Address, FormatError, Pid, SymbolName};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Record {
    header: Arc<FormatHeader>,
    values: Vec<String>,
    source_name: Arc<str>,
    line_no: usize,
}

impl Record {
    /// Zip `values` with the header's field names. The parser has already
    /// checked that there is one value per declared field.
    pub(crate) fn new(
        header: Arc<FormatHeader>,
        values: Vec<String>,
        source_name: Arc<str>,
        line_no: usize,
    ) -> Self {
        debug_assert_eq!(values.len(), header.len());
        Self { header, values, source_name, line_no }
    }

    #[must_use]
    pub fn header(&self) -> &FormatHeader {
        &self.header
    }

    /// Input the record was read from, and its 1-based line.
    #[must_use]
    pub fn origin(&self) -> (&str, usize) {
        (&self.source_name, self.line_no)
    }

    /// Raw value of any declared field.
    ///
    /// # Errors
    /// Returns `UnknownField` if the header does not declare `field`.
    pub fn get(&self, field: &str) -> Result<&str, FormatError> {
        self.header
            .position(field)
            .map(|pos| self.values[pos].as_str())
            .ok_or_else(|| self.unknown_field(field))
    }

    /// Sample timestamp in the capture's time unit.
    ///
    /// # Errors
    /// Fails if `time` is undeclared or not an integer.
    pub fn time(&self) -> Result<i64, FormatError> {
        let raw = self.get(fields::TIME)?;
        raw.parse().map_err(|_| FormatError::InvalidField {
            source_name: self.source_name.to_string(),
            line_no: self.line_no,
            field: fields::TIME.to_string(),
            value: raw.to_string(),
        })
    }

    /// # Errors
    /// Fails if `pid` is undeclared.
    pub fn pid(&self) -> Result<Pid, FormatError> {
        self.get(fields::PID).map(Pid::from)
    }

    /// # Errors
    /// Fails if `comm` is undeclared.
    pub fn comm(&self) -> Result<&str, FormatError> {
        self.get(fields::COMM)
    }

    /// # Errors
    /// Fails if neither `pathname` nor `dso` is declared.
    pub fn pathname(&self) -> Result<&str, FormatError> {
        self.get(fields::PATHNAME)
    }

    /// # Errors
    /// Fails if `addr` is undeclared.
    pub fn addr(&self) -> Result<Address, FormatError> {
        self.get(fields::ADDR).map(Address::from)
    }

    /// # Errors
    /// Fails if neither `name` nor `sym` is declared.
    pub fn name(&self) -> Result<SymbolName, FormatError> {
        self.get(fields::NAME).map(SymbolName::from)
    }

    /// Overwrite the symbol column with a resolved name.
    ///
    /// # Errors
    /// Fails if neither `name` nor `sym` is declared.
    pub fn set_name(&mut self, name: SymbolName) -> Result<(), FormatError> {
        let pos = self.header.position(fields::NAME).ok_or_else(|| self.unknown_field(fields::NAME))?;
        self.values[pos] = name.0;
        Ok(())
    }

    fn unknown_field(&self, field: &str) -> FormatError {
        FormatError::UnknownField {
            source_name: self.source_name.to_string(),
            line_no: self.line_no,
            field: field.to_string(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (field, value) in self.header.fields().iter().zip(&self.values) {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}
