//! Search Executor and Index-Query Adapter: the layer that actually runs a
//! plan against a session capability, and the re-translation path that
//! turns a `{field: value}` mapping back into a query string.

pub mod adapter;
pub mod config;
pub mod error;
pub mod search;
pub mod session;

pub use adapter::{search_by_fields, FieldFilter, TiddlerStore};
pub use config::{Config, MysqlConfig};
pub use error::{ExecutionError, FilterIndexRefused, SearchError, StoreGetError};
pub use search::search;
pub use session::{Engine, SearchResults, Session};
