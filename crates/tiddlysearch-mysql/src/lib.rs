//! MySQL-specific plumbing that sits below the engine-agnostic plan: the
//! connection liveness hook (§4.5) and the DDL schema binder (§4.6).

pub mod liveness;
pub mod schema;

pub use liveness::{
    LivenessError, MysqlConnection, MysqlLivenessHook, PingFailure, PingableConnection,
    PoolEventHandler, TRANSIENT_ERROR_CODES,
};
pub use schema::{bind_schema, mapped_schema, ColumnOverride, Engine, PoolConfig, TableCatalog, TableDdl};
