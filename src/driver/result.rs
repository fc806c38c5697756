//! Result of a write.

use super::contract::ExecResult;
use crate::error::DriverError;

/// Outcome of an executed write.
///
/// The store reports neither generated ids nor affected row counts, so both
/// accessors fail with [`DriverError::NotSupported`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CqlResult;

impl ExecResult for CqlResult {
    fn last_insert_id(&self) -> Result<i64, DriverError> {
        Err(DriverError::NotSupported)
    }

    fn rows_affected(&self) -> Result<i64, DriverError> {
        Err(DriverError::NotSupported)
    }
}
