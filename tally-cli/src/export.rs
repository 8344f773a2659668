use std::path::Path;

use tally_core::MainAccountTxn;
use tally_engine::{EngineError, EngineResult};

/// Write the filtered main-account listing as CSV.
pub fn write_csv(path: &Path, transactions: &[MainAccountTxn]) -> EngineResult<usize> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|err| EngineError::Internal(err.to_string()))?;
    writer
        .write_record([
            "sequence",
            "created_at",
            "direction",
            "source",
            "amount",
            "balance_after",
            "description",
        ])
        .map_err(|err| EngineError::Internal(err.to_string()))?;
    for txn in transactions {
        writer
            .write_record([
                txn.sequence.to_string(),
                txn.created_at.to_rfc3339(),
                txn.direction.to_string(),
                txn.source.to_string(),
                txn.amount.to_string(),
                txn.balance_after.to_string(),
                txn.description.clone().unwrap_or_default(),
            ])
            .map_err(|err| EngineError::Internal(err.to_string()))?;
    }
    writer
        .flush()
        .map_err(|err| EngineError::Internal(err.to_string()))?;
    Ok(transactions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tally_core::{Direction, SourceKind};
    use tempfile::tempdir;

    #[test]
    fn writes_header_and_one_row_per_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let mut txn = MainAccountTxn::new(Direction::Credit, SourceKind::Customer, dec!(60));
        txn.balance_after = dec!(60);
        let written = write_csv(&path, std::slice::from_ref(&txn)).unwrap();
        assert_eq!(written, 1);

        let raw = std::fs::read_to_string(&path).unwrap();
        let mut lines = raw.lines();
        assert!(lines.next().unwrap().starts_with("sequence,created_at"));
        let row = lines.next().unwrap();
        assert!(row.contains("credit"));
        assert!(row.contains("customer"));
        assert!(row.contains("60"));
    }
}
