//! mockall doubles for the native client traits.

use super::{Cell, ColumnInfo, NativeIter, NativeQuery, NativeSession, RowData, SessionFactory};
use crate::config::ClusterConfig;
use crate::context::Context;
use crate::error::NativeError;
use crate::types::{CqlValue, Value};
use async_trait::async_trait;
use mockall::mock;
use std::sync::Arc;

mock! {
    pub Factory {}

    #[async_trait]
    impl SessionFactory for Factory {
        async fn create_session(
            &self,
            config: &ClusterConfig,
            ctx: &Context,
        ) -> Result<Arc<dyn NativeSession>, NativeError>;
    }
}

mock! {
    pub Session {}

    #[async_trait]
    impl NativeSession for Session {
        fn query(&self, statement: &str) -> Box<dyn NativeQuery>;
        async fn close(&self);
    }
}

mock! {
    pub Query {}

    #[async_trait]
    impl NativeQuery for Query {
        fn with_context(&mut self, ctx: &Context);
        fn bind(&mut self, values: Vec<Value>);
        async fn exec(&mut self) -> Result<(), NativeError>;
        async fn iter(&mut self) -> Box<dyn NativeIter>;
        fn release(&mut self);
    }
}

mock! {
    pub Iter {}

    #[async_trait]
    impl NativeIter for Iter {
        fn columns(&self) -> Vec<ColumnInfo>;
        fn row_data(&self) -> Result<RowData, NativeError>;
        async fn scan(&mut self, cells: &mut [Cell]) -> bool;
        async fn close(&mut self) -> Result<(), NativeError>;
    }
}

/// Cursor that yields `rows` in order, each as decode slots.
pub fn iter_over(columns: Vec<ColumnInfo>, rows: Vec<Vec<Option<CqlValue>>>) -> MockIter {
    let mut iter = MockIter::new();
    let row_columns = columns.clone();
    iter.expect_columns().returning(move || columns.clone());
    iter.expect_row_data()
        .returning(move || Ok(RowData::with_slots(&row_columns)));
    let mut remaining = rows.into_iter();
    iter.expect_scan().returning(move |cells| match remaining.next() {
        Some(row) => {
            for (cell, value) in cells.iter_mut().zip(row) {
                *cell = Cell::Slot(value);
            }
            true
        }
        None => false,
    });
    iter.expect_close().returning(|| Ok(()));
    iter
}

/// Query whose every `iter` call yields a fresh cursor from `make_iter`.
pub fn query_with<F>(make_iter: F) -> MockQuery
where
    F: Fn() -> MockIter + Send + 'static,
{
    let mut query = MockQuery::new();
    query.expect_with_context().return_const(());
    query.expect_bind().return_const(());
    query.expect_exec().returning(|| Ok(()));
    query
        .expect_iter()
        .returning(move || Box::new(make_iter()) as Box<dyn NativeIter>);
    query.expect_release().return_const(());
    query
}

/// Cursor answering the health query with a single text value.
pub fn ping_iter(version: &str) -> MockIter {
    iter_over(
        vec![ColumnInfo::new("cql_version", "text")],
        vec![vec![Some(CqlValue::Text(version.to_string()))]],
    )
}
