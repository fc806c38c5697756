//! Native client backed by the scylla driver.
//!
//! Statements are prepared on first execution so that bound [`Value`]s can be
//! coerced to the column types of their bind markers. Rows are streamed page
//! by page through a pager. TLS material is loaded into a rustls client
//! configuration and handed to the client, which performs the handshake.

use super::{Cell, ColumnInfo, NativeIter, NativeQuery, NativeSession, RowData, SessionFactory};
use crate::config::{ClusterConfig, Consistency, SslOptions};
use crate::context::Context;
use crate::error::NativeError;
use crate::types::{CqlDuration, CqlValue, Value};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use futures_util::StreamExt;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::pager::TypedRowStream;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::client::{PoolSize, WriteCoalescingDelay};
use scylla::cluster::metadata::{CollectionType, ColumnType, NativeType};
use scylla::statement::prepared::PreparedStatement;
use scylla::value::{
    Counter, CqlDate, CqlDuration as ScyllaDuration, CqlTimestamp, CqlTimeuuid,
    CqlValue as ScyllaValue, Row,
};
use std::num::{NonZeroU64, NonZeroUsize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// `CqlDate` counts days from 1970-01-01 shifted by 2^31.
const CQL_DATE_EPOCH_OFFSET: i64 = 1 << 31;

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// Opens scylla sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScyllaSessionFactory;

#[async_trait]
impl SessionFactory for ScyllaSessionFactory {
    async fn create_session(
        &self,
        config: &ClusterConfig,
        ctx: &Context,
    ) -> Result<Arc<dyn NativeSession>, NativeError> {
        let builder = session_builder(config)?;
        let session = ctx
            .run(builder.build())
            .await?
            .map_err(|e| NativeError::Session(e.to_string()))?;

        Ok(Arc::new(ScyllaSession {
            session: RwLock::new(Some(Arc::new(session))),
            closed: Arc::new(AtomicBool::new(false)),
        }))
    }
}

/// Translate a [`ClusterConfig`] into a session builder.
fn session_builder(config: &ClusterConfig) -> Result<SessionBuilder, NativeError> {
    if config.ignore_peer_addr || config.disable_initial_host_lookup {
        warn!(
            ignore_peer_addr = config.ignore_peer_addr,
            disable_initial_host_lookup = config.disable_initial_host_lookup,
            "Topology options are managed by the scylla client and ignored"
        );
    }

    let pool_size = NonZeroUsize::new(config.num_conns).unwrap_or(NonZeroUsize::MIN);
    let profile = ExecutionProfile::builder()
        .consistency(consistency(config.consistency))
        .request_timeout(Some(config.timeout))
        .build();

    let mut builder = SessionBuilder::new()
        .known_nodes(&config.hosts)
        .connection_timeout(config.connect_timeout)
        .pool_size(PoolSize::PerHost(pool_size))
        .default_execution_profile_handle(profile.into_handle());

    builder = match write_coalescing_delay(config.write_coalesce_wait_time) {
        Some(delay) => builder.write_coalescing(true).write_coalescing_delay(delay),
        None => builder.write_coalescing(false),
    };

    if !config.keyspace.is_empty() {
        builder = builder.use_keyspace(&config.keyspace, false);
    }
    if let Some(auth) = &config.authenticator {
        builder = builder.user(&auth.username, &auth.password);
    }
    if let Some(ssl_opts) = &config.ssl_opts {
        builder = builder.tls_context(Some(tls_config(ssl_opts)?));
    }

    Ok(builder)
}

fn tls_error(path: &str, err: impl std::fmt::Display) -> NativeError {
    NativeError::Session(format!("TLS setup failed for {:?}: {}", path, err))
}

/// Build the client TLS configuration from PEM files.
///
/// `ca_path` seeds the trust store. With host verification disabled the
/// server certificate is accepted unchecked, but handshake signatures are
/// still verified. A client certificate is presented only when both
/// `cert_path` and `key_path` are set.
fn tls_config(opts: &SslOptions) -> Result<Arc<ClientConfig>, NativeError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error("protocol versions", e))?;

    let builder = if opts.enable_host_verification {
        let mut roots = RootCertStore::empty();
        if !opts.ca_path.is_empty() {
            let certs = CertificateDer::pem_file_iter(&opts.ca_path)
                .map_err(|e| tls_error(&opts.ca_path, e))?;
            for cert in certs {
                let cert = cert.map_err(|e| tls_error(&opts.ca_path, e))?;
                roots
                    .add(cert)
                    .map_err(|e| tls_error(&opts.ca_path, e))?;
            }
        }
        builder.with_root_certificates(roots)
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
    };

    let config = match (opts.cert_path.is_empty(), opts.key_path.is_empty()) {
        (true, true) => builder.with_no_client_auth(),
        (false, false) => {
            let certs = CertificateDer::pem_file_iter(&opts.cert_path)
                .map_err(|e| tls_error(&opts.cert_path, e))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| tls_error(&opts.cert_path, e))?;
            let key = PrivateKeyDer::from_pem_file(&opts.key_path)
                .map_err(|e| tls_error(&opts.key_path, e))?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| tls_error(&opts.cert_path, e))?
        }
        (true, false) => return Err(tls_error(&opts.key_path, "key without certPath")),
        (false, true) => return Err(tls_error(&opts.cert_path, "certificate without keyPath")),
    };

    Ok(Arc::new(config))
}

/// Certificate verifier used when host verification is disabled.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

fn consistency(level: Consistency) -> scylla::statement::Consistency {
    use scylla::statement::Consistency as C;
    match level {
        Consistency::Any => C::Any,
        Consistency::One => C::One,
        Consistency::Two => C::Two,
        Consistency::Three => C::Three,
        Consistency::Quorum => C::Quorum,
        Consistency::All => C::All,
        Consistency::LocalQuorum => C::LocalQuorum,
        Consistency::EachQuorum => C::EachQuorum,
        Consistency::LocalOne => C::LocalOne,
    }
}

fn write_coalescing_delay(wait: Duration) -> Option<WriteCoalescingDelay> {
    if wait.is_zero() {
        return None;
    }
    let millis = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
    Some(match NonZeroU64::new(millis) {
        Some(millis) => WriteCoalescingDelay::Milliseconds(millis),
        None => WriteCoalescingDelay::SmallNondeterministic,
    })
}

/// Connection-owned handle on a scylla session.
///
/// Each query keeps its own reference, so the client's connections are
/// released once the session is closed and every outstanding query has been
/// dropped. Queries created before `close` fail with
/// [`NativeError::SessionClosed`] from then on.
struct ScyllaSession {
    session: RwLock<Option<Arc<Session>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl NativeSession for ScyllaSession {
    fn query(&self, statement: &str) -> Box<dyn NativeQuery> {
        let session = self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Box::new(ScyllaQuery {
            session,
            closed: Arc::clone(&self.closed),
            statement: statement.to_string(),
            prepared: None,
            values: Vec::new(),
            ctx: Context::background(),
        })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let released = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = released {
            debug!(
                outstanding_queries = Arc::strong_count(&session) - 1,
                "Scylla session handle released"
            );
        }
    }
}

struct ScyllaQuery {
    session: Option<Arc<Session>>,
    closed: Arc<AtomicBool>,
    statement: String,
    prepared: Option<PreparedStatement>,
    values: Vec<Value>,
    ctx: Context,
}

impl ScyllaQuery {
    fn session(&self) -> Result<&Session, NativeError> {
        match &self.session {
            Some(session) if !self.closed.load(Ordering::SeqCst) => Ok(session),
            _ => Err(NativeError::SessionClosed),
        }
    }

    async fn prepare(&mut self) -> Result<PreparedStatement, NativeError> {
        let session = self.session()?;
        if let Some(prepared) = &self.prepared {
            return Ok(prepared.clone());
        }
        let prepared = self
            .ctx
            .run(session.prepare(self.statement.as_str()))
            .await?
            .map_err(|e| NativeError::Execution(e.to_string()))?;
        self.prepared = Some(prepared.clone());
        Ok(prepared)
    }

    async fn open_stream(&mut self) -> Result<ScyllaIter, NativeError> {
        let prepared = self.prepare().await?;
        let values = bind_values(&prepared, &self.values)?;
        let pager = self
            .ctx
            .run(self.session()?.execute_iter(prepared, values))
            .await?
            .map_err(|e| NativeError::Execution(e.to_string()))?;

        let columns = pager
            .column_specs()
            .iter()
            .map(|spec| ColumnInfo {
                keyspace: spec.table_spec().ks_name().to_string(),
                table: spec.table_spec().table_name().to_string(),
                name: spec.name().to_string(),
                type_name: format!("{:?}", spec.typ()),
            })
            .collect();
        let stream = pager
            .rows_stream::<Row>()
            .map_err(|e| NativeError::Fetch(e.to_string()))?;

        Ok(ScyllaIter {
            columns,
            stream: Some(stream),
            error: None,
            ctx: self.ctx.clone(),
        })
    }
}

#[async_trait]
impl NativeQuery for ScyllaQuery {
    fn with_context(&mut self, ctx: &Context) {
        self.ctx = ctx.clone();
    }

    fn bind(&mut self, values: Vec<Value>) {
        self.values = values;
    }

    async fn exec(&mut self) -> Result<(), NativeError> {
        let prepared = self.prepare().await?;
        let values = bind_values(&prepared, &self.values)?;
        self.ctx
            .run(self.session()?.execute_unpaged(&prepared, values))
            .await?
            .map_err(|e| NativeError::Execution(e.to_string()))?;
        Ok(())
    }

    async fn iter(&mut self) -> Box<dyn NativeIter> {
        match self.open_stream().await {
            Ok(iter) => Box::new(iter),
            Err(err) => Box::new(ScyllaIter::failed(err)),
        }
    }

    fn release(&mut self) {
        self.session = None;
        self.prepared = None;
        self.values.clear();
    }
}

struct ScyllaIter {
    columns: Vec<ColumnInfo>,
    stream: Option<TypedRowStream<Row>>,
    error: Option<NativeError>,
    ctx: Context,
}

impl ScyllaIter {
    fn failed(error: NativeError) -> Self {
        Self {
            columns: Vec::new(),
            stream: None,
            error: Some(error),
            ctx: Context::background(),
        }
    }
}

#[async_trait]
impl NativeIter for ScyllaIter {
    fn columns(&self) -> Vec<ColumnInfo> {
        self.columns.clone()
    }

    fn row_data(&self) -> Result<RowData, NativeError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(RowData::with_slots(&self.columns)),
        }
    }

    async fn scan(&mut self, cells: &mut [Cell]) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };

        let row = match self.ctx.run(stream.next()).await {
            Ok(Some(Ok(row))) => row,
            Ok(None) => return false,
            Ok(Some(Err(e))) => {
                self.error = Some(NativeError::Fetch(e.to_string()));
                return false;
            }
            Err(e) => {
                self.error = Some(e.into());
                return false;
            }
        };

        for (cell, column) in cells.iter_mut().zip(row.columns) {
            match column.map(|v| from_scylla(&v)).transpose() {
                Ok(value) => *cell = Cell::Slot(value),
                Err(err) => {
                    self.error = Some(err);
                    return false;
                }
            }
        }
        true
    }

    async fn close(&mut self) -> Result<(), NativeError> {
        self.stream = None;
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Coerce bound values to the types of the statement's bind markers.
fn bind_values(
    prepared: &PreparedStatement,
    values: &[Value],
) -> Result<Vec<Option<ScyllaValue>>, NativeError> {
    let specs = prepared.get_variable_col_specs();
    if specs.len() != values.len() {
        return Err(NativeError::Execution(format!(
            "statement has {} bind markers but {} values were bound",
            specs.len(),
            values.len()
        )));
    }
    specs
        .iter()
        .zip(values)
        .map(|(spec, value)| to_scylla(value, spec.typ()))
        .collect()
}

fn mismatch(value: &Value, typ: &ColumnType<'_>) -> NativeError {
    NativeError::Execution(format!("cannot bind {:?} as {:?}", value, typ))
}

fn to_scylla(value: &Value, typ: &ColumnType<'_>) -> Result<Option<ScyllaValue>, NativeError> {
    let converted = match (value, typ) {
        (Value::Null, _) => return Ok(None),
        (Value::UInt64(v), _) => {
            let signed = i64::try_from(*v).map_err(|_| mismatch(value, typ))?;
            return to_scylla(&Value::Int64(signed), typ);
        }
        (Value::Bool(b), ColumnType::Native(NativeType::Boolean)) => ScyllaValue::Boolean(*b),
        (Value::Int64(v), ColumnType::Native(native)) => match native {
            NativeType::TinyInt => {
                ScyllaValue::TinyInt(i8::try_from(*v).map_err(|_| mismatch(value, typ))?)
            }
            NativeType::SmallInt => {
                ScyllaValue::SmallInt(i16::try_from(*v).map_err(|_| mismatch(value, typ))?)
            }
            NativeType::Int => {
                ScyllaValue::Int(i32::try_from(*v).map_err(|_| mismatch(value, typ))?)
            }
            NativeType::BigInt => ScyllaValue::BigInt(*v),
            NativeType::Counter => ScyllaValue::Counter(Counter(*v)),
            NativeType::Timestamp => ScyllaValue::Timestamp(CqlTimestamp(*v)),
            NativeType::Float => ScyllaValue::Float(*v as f32),
            NativeType::Double => ScyllaValue::Double(*v as f64),
            _ => return Err(mismatch(value, typ)),
        },
        (Value::Float64(f), ColumnType::Native(NativeType::Float)) => ScyllaValue::Float(*f as f32),
        (Value::Float64(f), ColumnType::Native(NativeType::Double)) => ScyllaValue::Double(*f),
        (Value::Text(s), ColumnType::Native(NativeType::Ascii)) => ScyllaValue::Ascii(s.clone()),
        (Value::Text(s), ColumnType::Native(NativeType::Text)) => ScyllaValue::Text(s.clone()),
        (Value::Bytes(b), ColumnType::Native(NativeType::Blob)) => ScyllaValue::Blob(b.clone()),
        (Value::Timestamp(ts), ColumnType::Native(NativeType::Timestamp)) => {
            ScyllaValue::Timestamp(CqlTimestamp(ts.timestamp_millis()))
        }
        (Value::Date(d), ColumnType::Native(NativeType::Date)) => {
            let days = i64::from(d.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE;
            let raw = u32::try_from(days + CQL_DATE_EPOCH_OFFSET).map_err(|_| mismatch(value, typ))?;
            ScyllaValue::Date(CqlDate(raw))
        }
        (Value::Duration(d), ColumnType::Native(NativeType::Duration)) => {
            ScyllaValue::Duration(ScyllaDuration {
                months: d.months,
                days: d.days,
                nanoseconds: d.nanoseconds,
            })
        }
        (Value::Uuid(u), ColumnType::Native(NativeType::Uuid)) => ScyllaValue::Uuid(*u),
        (Value::Uuid(u), ColumnType::Native(NativeType::Timeuuid)) => {
            ScyllaValue::Timeuuid(CqlTimeuuid::from(*u))
        }
        (Value::Inet(addr), ColumnType::Native(NativeType::Inet)) => ScyllaValue::Inet(*addr),
        (Value::List(items), ColumnType::Collection { typ: collection, .. }) => match collection {
            CollectionType::List(inner) => ScyllaValue::List(collect_items(items, inner)?),
            CollectionType::Set(inner) => ScyllaValue::Set(collect_items(items, inner)?),
            _ => return Err(mismatch(value, typ)),
        },
        (
            Value::Map(entries),
            ColumnType::Collection {
                typ: CollectionType::Map(key_type, value_type),
                ..
            },
        ) => ScyllaValue::Map(
            entries
                .iter()
                .map(|(k, v)| {
                    let key = to_scylla(k, key_type)?.ok_or_else(|| mismatch(k, key_type))?;
                    let val = to_scylla(v, value_type)?.ok_or_else(|| mismatch(v, value_type))?;
                    Ok((key, val))
                })
                .collect::<Result<_, NativeError>>()?,
        ),
        _ => return Err(mismatch(value, typ)),
    };
    Ok(Some(converted))
}

fn collect_items(items: &[Value], inner: &ColumnType<'_>) -> Result<Vec<ScyllaValue>, NativeError> {
    items
        .iter()
        .map(|item| to_scylla(item, inner)?.ok_or_else(|| mismatch(item, inner)))
        .collect()
}

fn from_scylla(value: &ScyllaValue) -> Result<CqlValue, NativeError> {
    Ok(match value {
        ScyllaValue::Ascii(s) => CqlValue::Ascii(s.clone()),
        ScyllaValue::Text(s) => CqlValue::Text(s.clone()),
        ScyllaValue::Boolean(b) => CqlValue::Boolean(*b),
        ScyllaValue::TinyInt(v) => CqlValue::TinyInt(*v),
        ScyllaValue::SmallInt(v) => CqlValue::SmallInt(*v),
        ScyllaValue::Int(v) => CqlValue::Int(*v),
        ScyllaValue::BigInt(v) => CqlValue::BigInt(*v),
        ScyllaValue::Counter(c) => CqlValue::Counter(c.0),
        ScyllaValue::Float(v) => CqlValue::Float(*v),
        ScyllaValue::Double(v) => CqlValue::Double(*v),
        ScyllaValue::Blob(b) => CqlValue::Blob(b.clone()),
        ScyllaValue::Timestamp(ts) => CqlValue::Timestamp(ts.0),
        ScyllaValue::Date(d) => {
            let days = i64::from(d.0) - CQL_DATE_EPOCH_OFFSET + UNIX_EPOCH_DAYS_FROM_CE;
            let date = i32::try_from(days)
                .ok()
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .ok_or_else(|| NativeError::Fetch(format!("date out of range: {}", d.0)))?;
            CqlValue::Date(date)
        }
        ScyllaValue::Duration(d) => {
            CqlValue::Duration(CqlDuration::new(d.months, d.days, d.nanoseconds))
        }
        ScyllaValue::Inet(addr) => CqlValue::Inet(*addr),
        ScyllaValue::Uuid(u) => CqlValue::Uuid(*u),
        ScyllaValue::Timeuuid(t) => CqlValue::Timeuuid(Uuid::from(*t)),
        ScyllaValue::List(items) => CqlValue::List(
            items
                .iter()
                .map(from_scylla)
                .collect::<Result<_, _>>()?,
        ),
        ScyllaValue::Set(items) => CqlValue::Set(
            items
                .iter()
                .map(from_scylla)
                .collect::<Result<_, _>>()?,
        ),
        ScyllaValue::Map(entries) => CqlValue::Map(
            entries
                .iter()
                .map(|(k, v)| Ok((from_scylla(k)?, from_scylla(v)?)))
                .collect::<Result<_, NativeError>>()?,
        ),
        other => {
            return Err(NativeError::Fetch(format!(
                "unsupported column value {:?}",
                other
            )))
        }
    })
}
