//! Workbook type - the main document structure

use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// A workbook: an ordered list of uniquely named worksheets
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
}

impl Workbook {
    /// Create a new workbook with one worksheet named "Sheet1"
    pub fn new() -> Self {
        Self {
            worksheets: vec![Worksheet::new("Sheet1")],
        }
    }

    /// Create an empty workbook with no worksheets
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Get a worksheet by index
    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Get a worksheet by name (exact, case-sensitive)
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets.iter().find(|ws| ws.name() == name)
    }

    /// Get a mutable worksheet by name (exact, case-sensitive)
    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.worksheets.iter_mut().find(|ws| ws.name() == name)
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Vec<String> {
        self.worksheets.iter().map(|ws| ws.name().to_string()).collect()
    }

    /// Iterate over all worksheets
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Append a new, empty worksheet
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.push_worksheet(Worksheet::new(name))
    }

    /// Append an existing worksheet after the last one
    pub fn push_worksheet(&mut self, worksheet: Worksheet) -> Result<usize> {
        self.validate_sheet_name(worksheet.name())?;
        self.worksheets.push(worksheet);
        Ok(self.worksheets.len() - 1)
    }

    /// Append a copy of a worksheet, renaming it the way Excel's `Worksheet.Copy`
    /// does when the name is already taken in any letter case: `Name (2)`,
    /// `Name (3)`, ... Returns the name the copy was stored under.
    pub fn push_worksheet_copy(&mut self, mut worksheet: Worksheet) -> Result<String> {
        let name = self.free_copy_name(worksheet.name());
        worksheet.set_name(name.clone());
        self.push_worksheet(worksheet)?;
        Ok(name)
    }

    fn is_taken(&self, name: &str) -> bool {
        self.worksheets.iter().any(|ws| same_sheet_name(ws.name(), name))
    }

    fn free_copy_name(&self, name: &str) -> String {
        if !self.is_taken(name) {
            return name.to_string();
        }
        let mut n = 2u32;
        loop {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
            let candidate: String = name.chars().take(keep).chain(suffix.chars()).collect();
            if !self.is_taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Check a sheet name against Excel's rules and the names already in use
    pub fn validate_sheet_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "'{name}' is longer than {MAX_SHEET_NAME_LEN} characters"
            )));
        }
        if let Some(c) = name.chars().find(|c| matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\')) {
            return Err(Error::InvalidSheetName(format!(
                "'{name}' contains invalid character '{c}'"
            )));
        }
        // Excel compares sheet names case-insensitively when creating them
        if self.is_taken(name) {
            return Err(Error::DuplicateSheetName(name.to_string()));
        }
        Ok(())
    }
}

fn same_sheet_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
