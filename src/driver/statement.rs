//! Prepared statement execution.

use super::contract::{ExecResult, Rows, Stmt};
use super::result::CqlResult;
use super::rows::CqlRows;
use crate::context::Context;
use crate::error::DriverError;
use crate::native::NativeQuery;
use crate::types::{named_values_to_values, ColumnConverter, NamedValue, Value, ValueConverter};
use async_trait::async_trait;

/// A query bound to a connection's session.
///
/// After [`Stmt::close`] the native query is released and every execution
/// fails with [`DriverError::QueryIsNil`].
pub struct CqlStatement {
    query: Option<Box<dyn NativeQuery>>,
}

impl CqlStatement {
    pub(crate) fn new(query: Box<dyn NativeQuery>) -> Self {
        Self { query: Some(query) }
    }

    /// Whether the native query has been released.
    pub fn is_closed(&self) -> bool {
        self.query.is_none()
    }

    fn bound_query(
        &mut self,
        ctx: &Context,
        values: Vec<Value>,
    ) -> Result<&mut Box<dyn NativeQuery>, DriverError> {
        let query = self.query.as_mut().ok_or(DriverError::QueryIsNil)?;
        query.with_context(ctx);
        if !values.is_empty() {
            query.bind(values);
        }
        Ok(query)
    }

    async fn exec_values(
        &mut self,
        ctx: &Context,
        values: Vec<Value>,
    ) -> Result<Box<dyn ExecResult>, DriverError> {
        let query = self.bound_query(ctx, values)?;
        query.exec().await?;
        Ok(Box::new(CqlResult))
    }

    async fn query_values(
        &mut self,
        ctx: &Context,
        values: Vec<Value>,
    ) -> Result<Box<dyn Rows>, DriverError> {
        let query = self.bound_query(ctx, values)?;
        let iter = query.iter().await;
        Ok(Box::new(CqlRows::new(iter)))
    }
}

#[async_trait]
impl Stmt for CqlStatement {
    async fn close(&mut self) -> Result<(), DriverError> {
        if let Some(mut query) = self.query.take() {
            query.release();
        }
        Ok(())
    }

    fn num_input(&self) -> i32 {
        -1
    }

    async fn exec(&mut self, args: &[Value]) -> Result<Box<dyn ExecResult>, DriverError> {
        self.exec_values(&Context::background(), args.to_vec()).await
    }

    async fn exec_context(
        &mut self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>, DriverError> {
        let values = named_values_to_values(args)?;
        self.exec_values(ctx, values).await
    }

    async fn query(&mut self, args: &[Value]) -> Result<Box<dyn Rows>, DriverError> {
        self.query_values(&Context::background(), args.to_vec()).await
    }

    async fn query_context(
        &mut self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, DriverError> {
        let values = named_values_to_values(args)?;
        self.query_values(ctx, values).await
    }

    fn column_converter(&self, _index: usize) -> Box<dyn ValueConverter> {
        Box::new(ColumnConverter)
    }
}
