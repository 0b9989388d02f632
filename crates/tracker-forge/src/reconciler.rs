//! Appends whole sheets that exist only in the source document.

use std::collections::HashSet;

use crate::host::{DocumentId, Host, HostError};

pub struct SheetReconciler;

impl SheetReconciler {
    /// Append every sheet of `source` whose name is absent from `target`,
    /// in source order. Returns the names the copies received in the target.
    ///
    /// Names are matched exactly. Sheets already present in the target are
    /// never touched; a copy whose name collides in another letter case is
    /// stored as `Name (n)`.
    pub fn reconcile<H: Host + ?Sized>(
        host: &mut H,
        source: DocumentId,
        target: DocumentId,
    ) -> Result<Vec<String>, HostError> {
        let existing: HashSet<String> = host.sheet_names(target)?.into_iter().collect();
        let extra: Vec<String> = host
            .sheet_names(source)?
            .into_iter()
            .filter(|name| !existing.contains(name))
            .collect();

        let mut appended = Vec::with_capacity(extra.len());
        for name in &extra {
            tracing::info!(sheet = %name, "copying additional sheet");
            let copied_as = host.append_sheet_copy(source, name, target)?;
            if copied_as != *name {
                tracing::warn!(sheet = %name, copied_as = %copied_as, "sheet name taken, copy renamed");
            }
            appended.push(copied_as);
        }
        Ok(appended)
    }
}
