//! Schema/Column Binder (§4.6): MySQL-specific storage properties applied
//! to the fixed five-table schema before `create_all` runs.
//!
//! [`bind_schema`] is a pure function from a small config knob to a list of
//! DDL descriptors; nothing here issues a `CREATE TABLE` itself, so it's
//! unit-testable without a server.

use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    MyIsam,
    InnoDb,
}

impl Engine {
    pub fn as_sql(self) -> &'static str {
        match self {
            Engine::MyIsam => "MyISAM",
            Engine::InnoDb => "InnoDB",
        }
    }
}

/// A column type override, load-bearing per §3/§4.6: these widths keep a
/// `utf8`-charset index under MySQL's 767-byte index-prefix budget while
/// staying binary-collated for case-sensitive comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnOverride {
    pub column: &'static str,
    pub sql_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDdl {
    pub table: &'static str,
    pub engine: Engine,
    pub charset: &'static str,
    pub column_overrides: Vec<ColumnOverride>,
}

/// The one knob the binder consults: whether the `text` table should carry
/// a fulltext index (and so needs `MyISAM`, which is the only engine MySQL
/// 5.x can build one on).
#[derive(Debug, Clone, Copy, Default)]
pub struct TableCatalog {
    pub fulltext_enabled: bool,
}

/// Produces DDL descriptors for the five tables in the data model. Charset
/// is `utf8` throughout; `text` gets `MyISAM` when fulltext is enabled,
/// else `InnoDB` like everything else.
pub fn bind_schema(catalog: &TableCatalog) -> Vec<TableDdl> {
    vec![
        TableDdl {
            table: "tiddler",
            engine: Engine::InnoDb,
            charset: "utf8",
            column_overrides: vec![ColumnOverride {
                column: "title",
                sql_type: "VARCHAR(128) BINARY",
            }],
        },
        TableDdl {
            table: "revision",
            engine: Engine::InnoDb,
            charset: "utf8",
            column_overrides: vec![ColumnOverride {
                column: "tiddler_title",
                sql_type: "VARCHAR(128) BINARY",
            }],
        },
        TableDdl {
            table: "text",
            engine: if catalog.fulltext_enabled {
                Engine::MyIsam
            } else {
                Engine::InnoDb
            },
            charset: "utf8",
            column_overrides: vec![ColumnOverride {
                column: "text",
                sql_type: "LONGTEXT",
            }],
        },
        TableDdl {
            table: "tag",
            engine: Engine::InnoDb,
            charset: "utf8",
            column_overrides: vec![ColumnOverride {
                column: "tag",
                sql_type: "VARCHAR(191) BINARY",
            }],
        },
        TableDdl {
            table: "field",
            engine: Engine::InnoDb,
            charset: "utf8",
            column_overrides: vec![ColumnOverride {
                column: "value",
                sql_type: "VARCHAR(191) BINARY",
            }],
        },
    ]
}

/// Pool-level timeouts (§5), deserialized alongside the rest of the search
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    #[serde(rename = "pool_timeout")]
    pub checkout_timeout_secs: u64,
    #[serde(rename = "pool_recycle")]
    pub recycle_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> PoolConfig {
        PoolConfig {
            checkout_timeout_secs: 2,
            recycle_secs: 3600,
        }
    }
}

impl PoolConfig {
    pub fn checkout_timeout(&self) -> Duration {
        Duration::from_secs(self.checkout_timeout_secs)
    }

    pub fn recycle(&self) -> Duration {
        Duration::from_secs(self.recycle_secs)
    }
}

static MAPPED: OnceCell<Vec<TableDdl>> = OnceCell::new();

/// The process-wide, one-shot-initialized schema binding (§5's `MAPPED`
/// guard). Idempotent: the first caller's `catalog` wins and later calls
/// with a different catalog are silently ignored, matching "callers must
/// not mutate metadata after the first initialization."
pub fn mapped_schema(catalog: &TableCatalog) -> &'static [TableDdl] {
    MAPPED.get_or_init(|| bind_schema(catalog))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fulltext_enabled_selects_myisam_for_text_only() {
        let ddl = bind_schema(&TableCatalog { fulltext_enabled: true });
        for table in &ddl {
            let expected = if table.table == "text" { Engine::MyIsam } else { Engine::InnoDb };
            assert_eq!(table.engine, expected, "table {}", table.table);
        }
    }

    #[test]
    fn fulltext_disabled_uses_innodb_everywhere() {
        let ddl = bind_schema(&TableCatalog { fulltext_enabled: false });
        assert!(ddl.iter().all(|t| t.engine == Engine::InnoDb));
    }

    #[test]
    fn pool_config_defaults_match_canonical_values() {
        let config = PoolConfig::default();
        assert_eq!(config.checkout_timeout_secs, 2);
        assert_eq!(config.recycle_secs, 3600);
    }
}
