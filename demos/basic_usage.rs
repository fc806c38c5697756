//! Basic usage of the CQL driver adapter against a local node.
//!
//! ```bash
//! RUST_LOG=cql_driver=debug cargo run --features scylla --example basic_usage
//! ```

use cql_driver::driver::{registry, Conn, DriverContext, Stmt, DRIVER_NAME};
use cql_driver::{Context, CqlDriver, Value};
use std::error::Error;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = "127.0.0.1?consistency=one&timeout=5s&connectTimeout=5s";

/// Prints every row of a single-column query.
async fn print_rows(stmt: &mut Box<dyn Stmt>) -> Result<usize, Box<dyn Error>> {
    let mut rows = stmt.query(&[]).await?;
    println!("columns: {:?}", rows.columns());

    let mut dest = vec![Value::Null; rows.columns().len()];
    let mut count = 0;
    while rows.next(&mut dest).await? {
        println!("  {:?}", dest);
        count += 1;
    }
    rows.close().await?;
    Ok(count)
}

async fn example_registry() -> Result<(), Box<dyn Error>> {
    let mut conn = registry::open(DRIVER_NAME, CONFIG)?;
    conn.ping(&Context::background()).await?;

    let mut stmt = conn
        .prepare("select cql_version, release_version from system.local")
        .await?;
    let count = print_rows(&mut stmt).await?;
    println!("read {} row(s)", count);

    stmt.close().await?;
    conn.close().await?;
    Ok(())
}

async fn example_connector() -> Result<(), Box<dyn Error>> {
    let connector = CqlDriver::scylla().open_connector(CONFIG)?;
    let ctx = Context::background().with_timeout(Duration::from_secs(10));

    let mut conn: Box<dyn Conn> = connector.connect(&ctx).await?;
    let mut stmt = conn
        .prepare_context(&ctx, "select keyspace_name from system_schema.keyspaces")
        .await?;
    print_rows(&mut stmt).await?;

    stmt.close().await?;
    conn.close().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("registered drivers: {:?}", registry::drivers());
    example_registry().await?;
    example_connector().await?;
    Ok(())
}
