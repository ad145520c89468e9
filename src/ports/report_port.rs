//! Report output port.

use crate::domain::analyzer::ResultAnalyzer;
use crate::domain::error::EquisimError;
use crate::domain::transaction::Transaction;
use std::path::Path;

/// Port for persisting a finished run.
pub trait ReportPort {
    fn write(&self, analyzer: &ResultAnalyzer, output_dir: &Path) -> Result<(), EquisimError>;

    /// Default implementation: ignores the transaction log.
    fn write_with_transactions(
        &self,
        analyzer: &ResultAnalyzer,
        _transactions: &[Transaction],
        output_dir: &Path,
    ) -> Result<(), EquisimError> {
        self.write(analyzer, output_dir)
    }
}
