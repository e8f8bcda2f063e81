use crate::BlankNodeMatchingMode;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The SQL dialects the compiler can target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SqlDialect {
    /// Plain ANSI SQL without vendor extensions. Functions that need vendor support are
    /// reported as dialect gaps.
    #[default]
    Baseline,
    PostgreSql,
    MySql,
    H2,
}

impl SqlDialect {
    pub const ALL: [SqlDialect; 4] = [Self::Baseline, Self::PostgreSql, Self::MySql, Self::H2];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::PostgreSql => "postgresql",
            Self::MySql => "mysql",
            Self::H2 => "h2",
        }
    }
}

impl Display for SqlDialect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SqlDialect {
    type Err = UnknownOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baseline" | "ansi" => Ok(Self::Baseline),
            "postgresql" | "postgres" => Ok(Self::PostgreSql),
            "mysql" => Ok(Self::MySql),
            "h2" => Ok(Self::H2),
            _ => Err(UnknownOptionError::new("dialect", s)),
        }
    }
}

/// Controls how a stored node is coerced when it is compared to a typed value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CastPolicy {
    /// Every coercion is guarded by the node kind and cast explicitly.
    #[default]
    Strict,
    /// Numeric columns fall back onto each other.
    Loose,
    /// The column of the requested type is read as is.
    None,
}

impl Display for CastPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Loose => "loose",
            Self::None => "none",
        })
    }
}

impl FromStr for CastPolicy {
    type Err = UnknownOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "loose" => Ok(Self::Loose),
            "none" => Ok(Self::None),
            _ => Err(UnknownOptionError::new("cast policy", s)),
        }
    }
}

/// Raised when a configuration value cannot be parsed.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[error("'{value}' is not a valid {option}")]
pub struct UnknownOptionError {
    option: &'static str,
    value: String,
}

impl UnknownOptionError {
    fn new(option: &'static str, value: &str) -> Self {
        Self {
            option,
            value: value.to_owned(),
        }
    }
}

/// Options of a single compilation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Independent switches that are read one by one"
)]
pub struct CompilerOptions {
    pub dialect: SqlDialect,
    pub cast_policy: CastPolicy,
    /// Resolve constants against the node table before compiling.
    pub preload_constants: bool,
    /// Translate `REDUCED` into `DISTINCT`. Otherwise `REDUCED` is ignored.
    pub reduced_as_distinct: bool,
    /// Also match triples that are flagged as deleted.
    pub include_deleted: bool,
    pub blank_node_mode: BlankNodeMatchingMode,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::default(),
            cast_policy: CastPolicy::default(),
            preload_constants: true,
            reduced_as_distinct: false,
            include_deleted: false,
            blank_node_mode: BlankNodeMatchingMode::default(),
        }
    }
}

impl CompilerOptions {
    #[must_use]
    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    #[must_use]
    pub fn with_cast_policy(mut self, cast_policy: CastPolicy) -> Self {
        self.cast_policy = cast_policy;
        self
    }

    #[must_use]
    pub fn with_preloaded_constants(mut self, preload: bool) -> Self {
        self.preload_constants = preload;
        self
    }

    #[must_use]
    pub fn with_reduced_as_distinct(mut self, reduced_as_distinct: bool) -> Self {
        self.reduced_as_distinct = reduced_as_distinct;
        self
    }

    #[must_use]
    pub fn with_deleted_triples(mut self, include_deleted: bool) -> Self {
        self.include_deleted = include_deleted;
        self
    }

    #[must_use]
    pub fn with_blank_node_mode(mut self, mode: BlankNodeMatchingMode) -> Self {
        self.blank_node_mode = mode;
        self
    }
}
