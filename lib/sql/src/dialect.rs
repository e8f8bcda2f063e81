use crate::HashAlgorithm;
use triplesql_common::SqlDialect;

/// A vendor feature that is not part of the baseline SQL translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    RegexMatch,
    RegexReplace,
    Hash(HashAlgorithm),
    Random,
}

pub trait DialectExt {
    fn supports(self, capability: Capability) -> bool;
}

impl DialectExt for SqlDialect {
    fn supports(self, capability: Capability) -> bool {
        match self {
            SqlDialect::Baseline => false,
            SqlDialect::PostgreSql | SqlDialect::MySql => true,
            SqlDialect::H2 => !matches!(capability, Capability::Hash(_)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_available_in_two_dialects() {
        let supported = SqlDialect::ALL
            .into_iter()
            .filter(|d| d.supports(Capability::Hash(HashAlgorithm::Md5)))
            .collect::<Vec<_>>();
        assert_eq!(supported, vec![SqlDialect::PostgreSql, SqlDialect::MySql]);
    }

    #[test]
    fn baseline_has_no_vendor_features() {
        assert!(!SqlDialect::Baseline.supports(Capability::RegexMatch));
        assert!(!SqlDialect::Baseline.supports(Capability::Random));
        assert!(SqlDialect::H2.supports(Capability::RegexMatch));
    }
}
