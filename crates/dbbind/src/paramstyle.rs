//! Driver placeholder conventions.

use crate::error::DbError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The placeholder convention a driver expects.
///
/// Names follow the DB-API `paramstyle` vocabulary where one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamStyle {
    /// Fixed positional symbol: `?`
    #[default]
    Qmark,
    /// C-style positional symbol: `%s`
    Format,
    /// Renumbered named binds: `:p1, :p2, ...`
    #[serde(alias = "numbered")]
    Numeric,
    /// `:name` passed through unchanged; the driver binds by name
    Named,
    /// PostgreSQL wire placeholders: `$1, $2, ...`
    Dollar,
}

impl ParamStyle {
    /// Default style for a driver module name.
    ///
    /// Unknown drivers fall back to [`ParamStyle::Qmark`].
    pub fn for_driver(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "pymysql" | "mysql" | "mysqldb" | "psycopg2" => ParamStyle::Format,
            "cx_oracle" | "oracle" | "oracledb" => ParamStyle::Named,
            "postgres" | "postgresql" | "tokio-postgres" | "tokio_postgres" => ParamStyle::Dollar,
            "pyodbc" | "odbc" | "sqlite" | "sqlite3" | "impala" | "impala.dbapi" => {
                ParamStyle::Qmark
            }
            _ => ParamStyle::Qmark,
        }
    }

    /// The DB-API name of this style.
    pub fn as_str(self) -> &'static str {
        match self {
            ParamStyle::Qmark => "qmark",
            ParamStyle::Format => "format",
            ParamStyle::Numeric => "numeric",
            ParamStyle::Named => "named",
            ParamStyle::Dollar => "dollar",
        }
    }

    /// Write the native token for the `ordinal`-th (1-based) placeholder named `name`.
    pub(crate) fn write_placeholder(self, out: &mut String, ordinal: usize, name: &str) {
        match self {
            ParamStyle::Qmark => out.push('?'),
            ParamStyle::Format => out.push_str("%s"),
            ParamStyle::Numeric => {
                out.push_str(":p");
                out.push_str(&ordinal.to_string());
            }
            ParamStyle::Named => {
                out.push(':');
                out.push_str(name);
            }
            ParamStyle::Dollar => {
                out.push('$');
                out.push_str(&ordinal.to_string());
            }
        }
    }
}

impl fmt::Display for ParamStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamStyle {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qmark" | "?" => Ok(ParamStyle::Qmark),
            "format" | "%s" => Ok(ParamStyle::Format),
            "numeric" | "numbered" => Ok(ParamStyle::Numeric),
            "named" | ":" => Ok(ParamStyle::Named),
            "dollar" | "$" => Ok(ParamStyle::Dollar),
            other => Err(DbError::Config(format!("unknown paramstyle: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_defaults_follow_known_drivers() {
        assert_eq!(ParamStyle::for_driver("pymysql"), ParamStyle::Format);
        assert_eq!(ParamStyle::for_driver("cx_Oracle"), ParamStyle::Named);
        assert_eq!(ParamStyle::for_driver("sqlite3"), ParamStyle::Qmark);
        assert_eq!(ParamStyle::for_driver("tokio-postgres"), ParamStyle::Dollar);
        assert_eq!(ParamStyle::for_driver("somethingelse"), ParamStyle::Qmark);
    }

    #[test]
    fn parses_names_and_symbols() {
        assert_eq!("qmark".parse::<ParamStyle>().unwrap(), ParamStyle::Qmark);
        assert_eq!("%s".parse::<ParamStyle>().unwrap(), ParamStyle::Format);
        assert_eq!("Numbered".parse::<ParamStyle>().unwrap(), ParamStyle::Numeric);
        assert_eq!(":".parse::<ParamStyle>().unwrap(), ParamStyle::Named);
        assert!("pyformat".parse::<ParamStyle>().is_err());
    }

    #[test]
    fn deserializes_from_snake_case() {
        let style: ParamStyle = serde_json::from_str("\"dollar\"").unwrap();
        assert_eq!(style, ParamStyle::Dollar);
        let style: ParamStyle = serde_json::from_str("\"numbered\"").unwrap();
        assert_eq!(style, ParamStyle::Numeric);
    }
}
