//! Declarative region descriptions and the ordered merge plan.

use std::fmt;
use std::str::FromStr;

use tracker_forge_core::CellRange;

/// Errors raised while building a merge plan
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("invalid range '{range}': {source}")]
    InvalidRange {
        range: String,
        source: tracker_forge_core::Error,
    },

    #[error("region has an empty sheet name")]
    EmptySheetName,

    #[error("regions {first} and {second} overlap")]
    Overlap { first: String, second: String },
}

/// A rectangular cell range, resolved at the same position on every sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeAddress(CellRange);

impl RangeAddress {
    /// Parse `A1:B10` or single-cell `C3` notation. `$` markers are ignored.
    pub fn parse(s: &str) -> Result<Self, PlanError> {
        CellRange::parse(s)
            .map(Self)
            .map_err(|source| PlanError::InvalidRange {
                range: s.to_string(),
                source,
            })
    }

    pub fn cell_range(&self) -> CellRange {
        self.0
    }

    /// `(rows, columns)`
    pub fn dimensions(&self) -> (u32, u16) {
        self.0.dimensions()
    }

    pub fn overlaps(&self, other: &RangeAddress) -> bool {
        self.0.overlaps(&other.0)
    }
}

impl From<CellRange> for RangeAddress {
    fn from(range: CellRange) -> Self {
        Self(range)
    }
}

impl FromStr for RangeAddress {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One copyable region: a sheet, an address, and which formatting layers to transfer.
///
/// Values are always transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSpec {
    pub sheet_name: String,
    pub address: RangeAddress,
    pub copy_formatting: bool,
    pub copy_conditional_formatting: bool,
}

impl RegionSpec {
    /// A region that copies every layer.
    pub fn new(sheet_name: impl Into<String>, address: &str) -> Result<Self, PlanError> {
        let sheet_name = sheet_name.into();
        if sheet_name.is_empty() {
            return Err(PlanError::EmptySheetName);
        }
        Ok(Self {
            sheet_name,
            address: RangeAddress::parse(address)?,
            copy_formatting: true,
            copy_conditional_formatting: true,
        })
    }

    pub fn with_formatting(mut self, copy: bool) -> Self {
        self.copy_formatting = copy;
        self
    }

    pub fn with_conditional_formatting(mut self, copy: bool) -> Self {
        self.copy_conditional_formatting = copy;
        self
    }

    /// Values only.
    pub fn data_only(self) -> Self {
        self.with_formatting(false).with_conditional_formatting(false)
    }

    fn collides_with(&self, other: &RegionSpec) -> bool {
        self.sheet_name == other.sheet_name && self.address.overlaps(&other.address)
    }
}

impl fmt::Display for RegionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layers = match (self.copy_formatting, self.copy_conditional_formatting) {
            (true, true) => "with formatting and conditional formatting",
            (true, false) => "with formatting",
            (false, true) => "with conditional formatting",
            (false, false) => "data only",
        };
        write!(f, "{}!{} ({})", self.sheet_name, self.address, layers)
    }
}

/// The ordered regions of one run. No two regions on the same sheet overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    regions: Vec<RegionSpec>,
}

impl MergePlan {
    pub fn new(regions: Vec<RegionSpec>) -> Result<Self, PlanError> {
        for (i, later) in regions.iter().enumerate() {
            if let Some(earlier) = regions[..i].iter().find(|r| r.collides_with(later)) {
                return Err(PlanError::Overlap {
                    first: format!("{}!{}", earlier.sheet_name, earlier.address),
                    second: format!("{}!{}", later.sheet_name, later.address),
                });
            }
        }
        Ok(Self { regions })
    }

    pub fn regions(&self) -> &[RegionSpec] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegionSpec> {
        self.regions.iter()
    }
}

impl<'a> IntoIterator for &'a MergePlan {
    type Item = &'a RegionSpec;
    type IntoIter = std::slice::Iter<'a, RegionSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn region(sheet: &str, range: &str) -> RegionSpec {
        RegionSpec::new(sheet, range).unwrap()
    }

    #[test]
    fn test_display_names_layers() {
        let r = region("Tracker", "A2:H100");
        assert_eq!(
            r.to_string(),
            "Tracker!A2:H100 (with formatting and conditional formatting)"
        );
        assert_eq!(
            r.clone().with_conditional_formatting(false).to_string(),
            "Tracker!A2:H100 (with formatting)"
        );
        assert_eq!(
            r.clone().with_formatting(false).to_string(),
            "Tracker!A2:H100 (with conditional formatting)"
        );
        assert_eq!(
            region("Totals", "B1").data_only().to_string(),
            "Totals!B1 (data only)"
        );
    }

    #[test]
    fn test_absolute_markers_are_dropped() {
        assert_eq!(region("Totals", "$J$6:$K$9").address.to_string(), "J6:K9");
    }

    #[test]
    fn test_invalid_range_and_sheet() {
        assert!(matches!(
            RegionSpec::new("Tracker", "A2:"),
            Err(PlanError::InvalidRange { .. })
        ));
        assert!(matches!(
            RegionSpec::new("", "A1"),
            Err(PlanError::EmptySheetName)
        ));
    }

    #[test]
    fn test_plan_keeps_declared_order() {
        let plan = MergePlan::new(vec![
            region("Tracker", "M2:N100"),
            region("Tracker", "A2:H100"),
            region("Totals", "A2:H100"),
        ])
        .unwrap();

        let sheets: Vec<String> = plan
            .iter()
            .map(|r| format!("{}!{}", r.sheet_name, r.address))
            .collect();
        assert_eq!(
            sheets,
            vec!["Tracker!M2:N100", "Tracker!A2:H100", "Totals!A2:H100"]
        );
    }

    #[test]
    fn test_plan_rejects_overlap_on_same_sheet() {
        let err = MergePlan::new(vec![
            region("Tracker", "A2:H100"),
            region("Tracker", "J2:L100"),
            region("Tracker", "H50:J60"),
        ])
        .unwrap_err();

        match err {
            PlanError::Overlap { first, second } => {
                assert_eq!(first, "Tracker!A2:H100");
                assert_eq!(second, "Tracker!H50:J60");
            }
            other => panic!("expected overlap, got {other:?}"),
        }
    }

    #[test]
    fn test_sheet_names_are_case_sensitive_for_overlap() {
        assert!(MergePlan::new(vec![region("Tracker", "A1"), region("tracker", "A1")]).is_ok());
    }
}
