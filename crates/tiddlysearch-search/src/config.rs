//! The typed shape the process-wide configuration loader deserializes into
//! (the loader itself is out of scope — see §1 — but the shape it produces
//! is ambient and in scope regardless).

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub mysql: MysqlConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MysqlConfig {
    /// Default result limit injected when `_limit:` is absent from the
    /// query (§4.2, §6). Canonical default 20.
    pub search_limit: u64,
    /// When true, the `text` table is expected to carry a fulltext index
    /// and the fulltext predicate is enabled.
    pub fulltext: bool,
}

impl Default for MysqlConfig {
    fn default() -> MysqlConfig {
        MysqlConfig {
            search_limit: 20,
            fulltext: true,
        }
    }
}
