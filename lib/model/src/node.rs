use crate::{DateTimeParseError, UnknownNodeKindError};
use md5::{Digest, Md5};
use oxrdf::vocab::xsd;
use oxrdf::{LiteralRef, NamedNodeRef, TermRef};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// The identifier of a row in the node table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(i64);

impl NodeId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The storage kind of a node. Each kind keeps its value in a different column of the node table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Uri,
    BlankNode,
    String,
    Integer,
    Double,
    Date,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        Self::Uri,
        Self::BlankNode,
        Self::String,
        Self::Integer,
        Self::Double,
        Self::Date,
    ];

    /// The value of the `node_kind` column for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uri => "uri",
            Self::BlankNode => "bnode",
            Self::String => "string",
            Self::Integer => "int",
            Self::Double => "double",
            Self::Date => "date",
        }
    }

    /// Whether nodes of this kind carry a literal value.
    pub const fn is_literal(self) -> bool {
        !matches!(self, Self::Uri | Self::BlankNode)
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = UnknownNodeKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownNodeKindError(s.to_owned()))
    }
}

/// The decomposition of an RDF term into the columns of the node table.
///
/// Literals whose lexical form is valid for an integer, floating point, or date time datatype
/// are stored with the typed column filled. Everything else, booleans included, is stored as a
/// string with its datatype.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeContent {
    pub kind: NodeKind,
    pub uri: Option<String>,
    pub content: String,
    pub int_content: Option<i64>,
    pub double_content: Option<f64>,
    /// Microseconds since the Unix epoch.
    pub date_content: Option<i64>,
    pub anon_id: Option<String>,
    pub content_hash: Option<i64>,
    pub language: Option<String>,
    pub datatype: Option<String>,
}

impl NodeContent {
    pub fn from_term(term: TermRef<'_>) -> Self {
        match term {
            TermRef::NamedNode(node) => Self {
                kind: NodeKind::Uri,
                uri: Some(node.as_str().to_owned()),
                content: node.as_str().to_owned(),
                int_content: None,
                double_content: None,
                date_content: None,
                anon_id: None,
                content_hash: None,
                language: None,
                datatype: None,
            },
            TermRef::BlankNode(node) => Self {
                kind: NodeKind::BlankNode,
                uri: None,
                content: node.as_str().to_owned(),
                int_content: None,
                double_content: None,
                date_content: None,
                anon_id: Some(node.as_str().to_owned()),
                content_hash: None,
                language: None,
                datatype: None,
            },
            TermRef::Literal(literal) => Self::from_literal(literal),
            #[allow(unreachable_patterns, reason = "Only reachable with the rdf-star feature")]
            _ => Self::from_literal(LiteralRef::new_simple_literal("")),
        }
    }

    fn from_literal(literal: LiteralRef<'_>) -> Self {
        let value = literal.value();
        let mut result = Self {
            kind: NodeKind::String,
            uri: None,
            content: value.to_owned(),
            int_content: None,
            double_content: None,
            date_content: None,
            anon_id: None,
            content_hash: Some(content_hash(value)),
            language: literal.language().map(ToOwned::to_owned),
            datatype: Some(literal.datatype().as_str().to_owned()),
        };

        let datatype = literal.datatype();
        if is_integer_datatype(datatype) {
            if let Ok(value) = value.trim().parse::<i64>() {
                result.kind = NodeKind::Integer;
                result.int_content = Some(value);
            }
        } else if is_floating_datatype(datatype) {
            if let Ok(value) = value.trim().parse::<f64>() {
                result.kind = NodeKind::Double;
                result.double_content = Some(value);
            }
        } else if is_date_datatype(datatype) {
            if let Ok(value) = parse_timestamp(value) {
                result.kind = NodeKind::Date;
                result.date_content = Some(value);
            }
        }
        result
    }
}

/// The hash stored in `content_hash`: the first eight bytes of the MD5 digest of the lexical
/// form, read as a big-endian signed integer.
pub fn content_hash(content: &str) -> i64 {
    let digest = Md5::digest(content.as_bytes());
    let mut bytes = [0; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

pub fn is_integer_datatype(datatype: NamedNodeRef<'_>) -> bool {
    [
        xsd::INTEGER,
        xsd::LONG,
        xsd::INT,
        xsd::SHORT,
        xsd::BYTE,
        xsd::NON_NEGATIVE_INTEGER,
        xsd::NON_POSITIVE_INTEGER,
        xsd::NEGATIVE_INTEGER,
        xsd::POSITIVE_INTEGER,
        xsd::UNSIGNED_LONG,
        xsd::UNSIGNED_INT,
        xsd::UNSIGNED_SHORT,
        xsd::UNSIGNED_BYTE,
    ]
    .contains(&datatype)
}

pub fn is_floating_datatype(datatype: NamedNodeRef<'_>) -> bool {
    [xsd::DOUBLE, xsd::FLOAT, xsd::DECIMAL].contains(&datatype)
}

pub fn is_date_datatype(datatype: NamedNodeRef<'_>) -> bool {
    [xsd::DATE_TIME, xsd::DATE, xsd::DATE_TIME_STAMP].contains(&datatype)
}

/// Parses an `xsd:dateTime` or `xsd:date` lexical form into microseconds since the Unix epoch.
///
/// Values without a time zone are read as UTC.
pub fn parse_timestamp(value: &str) -> Result<i64, DateTimeParseError> {
    let value = value.trim();
    let date_time = OffsetDateTime::parse(value, &Rfc3339)
        .or_else(|_| PrimitiveDateTime::parse(value, &Iso8601::DEFAULT).map(|dt| dt.assume_utc()))
        .or_else(|_| {
            Date::parse(value, &Iso8601::DEFAULT).map(|date| date.midnight().assume_utc())
        })
        .map_err(|_| DateTimeParseError(value.to_owned()))?;
    i64::try_from(date_time.unix_timestamp_nanos() / 1000)
        .map_err(|_| DateTimeParseError(value.to_owned()))
}

/// Formats microseconds since the Unix epoch as an `xsd:dateTime` lexical form in UTC.
pub fn format_timestamp(micros: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1000)
        .ok()?
        .format(&Rfc3339)
        .ok()
}

/// Formats microseconds since the Unix epoch as an SQL timestamp literal body.
pub fn format_sql_timestamp(micros: i64) -> Option<String> {
    let format = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
    );
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1000)
        .ok()?
        .format(&format)
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{BlankNode, Literal, NamedNode};

    #[test]
    fn node_kind_round_trips_through_column_value() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.as_str().parse::<NodeKind>(), Ok(kind));
        }
        assert!("literal".parse::<NodeKind>().is_err());
    }

    #[test]
    fn named_node_content() {
        let node = NamedNode::new_unchecked("http://example.com/a");
        let content = NodeContent::from_term(node.as_ref().into());
        assert_eq!(content.kind, NodeKind::Uri);
        assert_eq!(content.uri.as_deref(), Some("http://example.com/a"));
        assert_eq!(content.content_hash, None);
    }

    #[test]
    fn blank_node_content() {
        let node = BlankNode::new_unchecked("b1");
        let content = NodeContent::from_term(node.as_ref().into());
        assert_eq!(content.kind, NodeKind::BlankNode);
        assert_eq!(content.anon_id.as_deref(), Some("b1"));
    }

    #[test]
    fn typed_literal_content() {
        let int = NodeContent::from_term(Literal::from(42).as_ref().into());
        assert_eq!(int.kind, NodeKind::Integer);
        assert_eq!(int.int_content, Some(42));

        let double = NodeContent::from_term(Literal::from(1.5).as_ref().into());
        assert_eq!(double.kind, NodeKind::Double);
        assert_eq!(double.double_content, Some(1.5));

        let boolean = NodeContent::from_term(Literal::from(true).as_ref().into());
        assert_eq!(boolean.kind, NodeKind::String);
        assert_eq!(boolean.datatype.as_deref(), Some(xsd::BOOLEAN.as_str()));

        let date = Literal::new_typed_literal("1970-01-02T00:00:00Z", xsd::DATE_TIME);
        let date = NodeContent::from_term(date.as_ref().into());
        assert_eq!(date.kind, NodeKind::Date);
        assert_eq!(date.date_content, Some(86_400_000_000));
    }

    #[test]
    fn invalid_typed_literal_is_a_string() {
        let literal = Literal::new_typed_literal("abc", xsd::INTEGER);
        let content = NodeContent::from_term(literal.as_ref().into());
        assert_eq!(content.kind, NodeKind::String);
        assert_eq!(content.int_content, None);
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }

    #[test]
    fn timestamps_without_zone_are_utc() {
        assert_eq!(parse_timestamp("1970-01-01T00:00:01"), Ok(1_000_000));
        assert_eq!(parse_timestamp("1970-01-02"), Ok(86_400_000_000));
        assert_eq!(
            format_timestamp(1_000_000).as_deref(),
            Some("1970-01-01T00:00:01Z")
        );
        assert_eq!(
            format_sql_timestamp(1_000_000).as_deref(),
            Some("1970-01-01 00:00:01.000000")
        );
    }
}
