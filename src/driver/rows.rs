//! Result set iteration.

use super::contract::Rows;
use crate::error::DriverError;
use crate::native::NativeIter;
use crate::types::{cell_to_value, Value};
use async_trait::async_trait;
use tracing::debug;

/// Rows of a query, read one at a time from the native cursor.
///
/// Column names are captured when the cursor is opened. Once the cursor is
/// exhausted or closed every further [`Rows::next`] reports end of stream.
pub struct CqlRows {
    iter: Option<Box<dyn NativeIter>>,
    columns: Vec<String>,
}

impl CqlRows {
    pub(crate) fn new(iter: Box<dyn NativeIter>) -> Self {
        let columns = iter.columns().into_iter().map(|c| c.name).collect();
        Self {
            iter: Some(iter),
            columns,
        }
    }

    /// Whether the cursor has been released.
    pub fn is_closed(&self) -> bool {
        self.iter.is_none()
    }
}

#[async_trait]
impl Rows for CqlRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next(&mut self, dest: &mut [Value]) -> Result<bool, DriverError> {
        let Some(iter) = self.iter.as_mut() else {
            return Ok(false);
        };

        let mut row = match iter.row_data() {
            Ok(row) => row,
            Err(err) => {
                if let Err(close_err) = iter.close().await {
                    debug!(error = %close_err, "Rows close after row data error failed");
                }
                self.iter = None;
                return Err(DriverError::RowData(err));
            }
        };

        if row.values.is_empty() {
            self.close().await?;
            return Ok(false);
        }

        if !iter.scan(&mut row.values).await {
            self.close().await?;
            return Ok(false);
        }

        for (slot, cell) in dest.iter_mut().zip(&row.values) {
            match cell_to_value(cell) {
                Ok(value) => *slot = value,
                Err(err) => {
                    if let Err(close_err) = self.close().await {
                        debug!(error = %close_err, "Rows close after conversion error failed");
                    }
                    return Err(err.into());
                }
            }
        }

        Ok(true)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        match self.iter.take() {
            Some(mut iter) => Ok(iter.close().await?),
            None => Ok(()),
        }
    }
}
