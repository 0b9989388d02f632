//! Per-region transfer of values, formatting and conditional formatting.

use std::fmt;

use crate::host::{DocumentId, Host, HostError, PasteLayer, TransferScope};
use crate::region::RegionSpec;

/// Result of merging one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Every requested layer was transferred
    Merged,
    /// The region's sheet does not exist in the source document
    SheetMissingInSource,
    /// The region's sheet does not exist in the target document
    SheetMissingInTarget,
    /// At least one step failed; layers that succeeded stay applied
    PartialFailure(String),
}

impl MergeOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, MergeOutcome::Merged)
    }
}

impl fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeOutcome::Merged => f.write_str("merged"),
            MergeOutcome::SheetMissingInSource => f.write_str("sheet missing in source"),
            MergeOutcome::SheetMissingInTarget => f.write_str("sheet missing in target"),
            MergeOutcome::PartialFailure(reason) => write!(f, "partial failure: {reason}"),
        }
    }
}

/// Which side of the merge a failure was observed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Source => "source",
            Side::Target => "target",
        })
    }
}

/// Failures inside one region; recorded as [`MergeOutcome::PartialFailure`]
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("cannot resolve range on {side} sheet: {source}")]
    Resolution { side: Side, source: HostError },

    #[error("{layer} transfer failed: {source}")]
    Transfer { layer: PasteLayer, source: HostError },

    #[error("deleted {deleted} target conditional format(s), then failed: {source}")]
    ClearFailed { deleted: usize, source: HostError },

    #[error("conditional formatting was cleared from the target but could not be pasted: {source}")]
    ConditionalFormatsLost { source: HostError },
}

/// Copies one region from a source sheet to the same-named target sheet.
pub struct RegionMerger;

impl RegionMerger {
    /// Merge `spec` from `source` into `target`.
    ///
    /// Values are always transferred. Formatting and conditional formatting are
    /// transferred on request, each independently of the others. The host's
    /// transfer buffer is emptied before returning.
    pub fn merge<H: Host + ?Sized>(
        host: &mut H,
        source: DocumentId,
        target: DocumentId,
        spec: &RegionSpec,
    ) -> MergeOutcome {
        let mut host = TransferScope::new(host);

        for (side, doc) in [(Side::Source, source), (Side::Target, target)] {
            if let Err(source) = host.resolve_range(doc, &spec.sheet_name, &spec.address) {
                let err = RegionError::Resolution { side, source };
                tracing::warn!(region = %spec, error = %err, "skipping region");
                return MergeOutcome::PartialFailure(err.to_string());
            }
        }

        let mut failures = Vec::new();

        if let Err(source) = transfer_values(&mut *host, source, target, spec) {
            failures.push(RegionError::Transfer {
                layer: PasteLayer::Values,
                source,
            });
        }

        if spec.copy_formatting {
            if let Err(source) = transfer_layer(&mut *host, source, target, spec, PasteLayer::Formats)
            {
                failures.push(RegionError::Transfer {
                    layer: PasteLayer::Formats,
                    source,
                });
            }
        }

        if spec.copy_conditional_formatting {
            if let Err(err) = transfer_conditional_formats(&mut *host, source, target, spec) {
                failures.push(err);
            }
        }

        if failures.is_empty() {
            return MergeOutcome::Merged;
        }
        for err in &failures {
            tracing::warn!(region = %spec, error = %err, "region step failed");
        }
        let reason = failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        MergeOutcome::PartialFailure(reason)
    }
}

fn transfer_values<H: Host + ?Sized>(
    host: &mut H,
    source: DocumentId,
    target: DocumentId,
    spec: &RegionSpec,
) -> Result<(), HostError> {
    let rows = host.read_values(source, &spec.sheet_name, &spec.address)?;
    host.write_values(target, &spec.sheet_name, &spec.address, &rows)
}

fn transfer_layer<H: Host + ?Sized>(
    host: &mut H,
    source: DocumentId,
    target: DocumentId,
    spec: &RegionSpec,
    layer: PasteLayer,
) -> Result<(), HostError> {
    host.copy_range(source, &spec.sheet_name, &spec.address)?;
    host.paste_special(target, &spec.sheet_name, &spec.address, layer)
}

/// Replace the target's rules with the source's, unless the source has none.
///
/// Target rules are deleted from the last to the first so that the remaining
/// indices stay valid.
fn transfer_conditional_formats<H: Host + ?Sized>(
    host: &mut H,
    source: DocumentId,
    target: DocumentId,
    spec: &RegionSpec,
) -> Result<(), RegionError> {
    let (sheet, range) = (spec.sheet_name.as_str(), &spec.address);
    let transfer_error = |source| RegionError::Transfer {
        layer: PasteLayer::ConditionalFormats,
        source,
    };

    let source_rules = host
        .conditional_format_count(source, sheet, range)
        .map_err(transfer_error)?;
    if source_rules == 0 {
        tracing::debug!(region = %spec, "source has no conditional formatting");
        return Ok(());
    }

    let target_rules = host
        .conditional_format_count(target, sheet, range)
        .map_err(transfer_error)?;
    for (deleted, index) in (0..target_rules).rev().enumerate() {
        host.delete_conditional_format(target, sheet, range, index)
            .map_err(|source| RegionError::ClearFailed { deleted, source })?;
    }

    transfer_layer(host, source, target, spec, PasteLayer::ConditionalFormats)
        .map_err(|source| RegionError::ConditionalFormatsLost { source })
}
