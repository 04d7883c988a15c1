use std::fmt;

use crate::{FilterExpr, TimeWindow};

/// An event attribute name.
///
/// Plain identifiers (letters, digits, `_` and `.`) render bare, anything else
/// is wrapped in backticks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Attribute(String);

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    fn is_plain(&self) -> bool {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    }
}

impl From<&str> for Attribute {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Attribute {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_plain() {
            f.write_str(&self.0)
        } else {
            write!(f, "`{}`", self.0.replace('`', "\\`"))
        }
    }
}

/// A value literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write_quoted(f, s),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Writes `s` as a single quoted NRQL string.
pub(crate) fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("'")?;
    for c in s.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("'")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    NotEq,
}

impl Comparison {
    pub fn token(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::NotEq => "!=",
        }
    }
}

/// A single boolean test against one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Compare {
        attribute: Attribute,
        op: Comparison,
        value: Literal,
    },
    /// `pattern` already carries its `%` wildcards.
    Like {
        attribute: Attribute,
        negated: bool,
        pattern: String,
    },
    In {
        attribute: Attribute,
        negated: bool,
        values: Vec<Literal>,
    },
    Null {
        attribute: Attribute,
        negated: bool,
    },
}

impl Condition {
    pub fn eq(attribute: impl Into<Attribute>, value: impl Into<Literal>) -> Self {
        Condition::Compare {
            attribute: attribute.into(),
            op: Comparison::Eq,
            value: value.into(),
        }
    }

    pub fn attribute(&self) -> &Attribute {
        match self {
            Condition::Compare { attribute, .. }
            | Condition::Like { attribute, .. }
            | Condition::In { attribute, .. }
            | Condition::Null { attribute, .. } => attribute,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare {
                attribute,
                op,
                value,
            } => write!(f, "{attribute} {} {value}", op.token()),
            Condition::Like {
                attribute,
                negated,
                pattern,
            } => {
                let op = if *negated { "NOT LIKE" } else { "LIKE" };
                write!(f, "{attribute} {op} ")?;
                write_quoted(f, pattern)
            }
            Condition::In {
                attribute,
                negated,
                values,
            } => {
                let op = if *negated { "NOT IN" } else { "IN" };
                write!(f, "{attribute} {op} (")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(")")
            }
            Condition::Null { attribute, negated } => {
                let op = if *negated { "IS NOT NULL" } else { "IS NULL" };
                write!(f, "{attribute} {op}")
            }
        }
    }
}

/// One conjunct of a `WHERE` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Condition(Condition),
    /// A user built filter, parenthesized when it holds more than one condition.
    Group(FilterExpr),
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Condition(c) => write!(f, "{c}"),
            Predicate::Group(g) if g.len() > 1 => write!(f, "({g})"),
            Predicate::Group(g) => write!(f, "{g}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    Average(Attribute),
    Latest(Attribute),
    UniqueCount(Attribute),
    Uniques(Attribute),
    /// Share of events in which the attribute is set.
    PercentPresent(Attribute),
    Keyset,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Average(a) => write!(f, "average({a})"),
            Aggregate::Latest(a) => write!(f, "latest({a})"),
            Aggregate::UniqueCount(a) => write!(f, "uniqueCount({a})"),
            Aggregate::Uniques(a) => write!(f, "uniques({a})"),
            Aggregate::PercentPresent(a) => {
                write!(f, "percentage(count({a}), WHERE {a} IS NOT NULL)")
            }
            Aggregate::Keyset => f.write_str("keyset()"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub aggregate: Aggregate,
    pub alias: Option<String>,
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.aggregate)?;
        if let Some(alias) = &self.alias {
            f.write_str(" AS ")?;
            write_quoted(f, alias)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Facet {
    attribute: Attribute,
    alias: Option<String>,
}

/// A complete NRQL query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    event_type: String,
    select: Vec<SelectItem>,
    predicates: Vec<Predicate>,
    facet: Option<Facet>,
    window: TimeWindow,
    limit: Option<u32>,
    timeseries: bool,
}

impl Query {
    pub fn from(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            select: Vec::new(),
            predicates: Vec::new(),
            facet: None,
            window: TimeWindow::DEFAULT,
            limit: None,
            timeseries: false,
        }
    }

    pub fn select(mut self, aggregate: Aggregate, alias: &str) -> Self {
        self.select.push(SelectItem {
            aggregate,
            alias: Some(alias.to_string()),
        });
        self
    }

    pub fn select_bare(mut self, aggregate: Aggregate) -> Self {
        self.select.push(SelectItem {
            aggregate,
            alias: None,
        });
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.predicates.push(Predicate::Condition(condition));
        self
    }

    /// Adds a compiled user filter; empty filters add nothing.
    pub fn filter_group(mut self, expr: FilterExpr) -> Self {
        if !expr.is_empty() {
            self.predicates.push(Predicate::Group(expr));
        }
        self
    }

    pub fn facet(mut self, attribute: impl Into<Attribute>) -> Self {
        self.facet = Some(Facet {
            attribute: attribute.into(),
            alias: None,
        });
        self
    }

    pub fn facet_as(mut self, attribute: impl Into<Attribute>, alias: &str) -> Self {
        self.facet = Some(Facet {
            attribute: attribute.into(),
            alias: Some(alias.to_string()),
        });
        self
    }

    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn timeseries(mut self) -> Self {
        self.timeseries = true;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn time_window(&self) -> TimeWindow {
        self.window
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FROM {} SELECT ", self.event_type)?;
        if self.select.is_empty() {
            f.write_str("*")?;
        }
        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        for (i, predicate) in self.predicates.iter().enumerate() {
            let keyword = if i == 0 { " WHERE " } else { " AND " };
            write!(f, "{keyword}{predicate}")?;
        }
        if let Some(facet) = &self.facet {
            write!(f, " FACET {}", facet.attribute)?;
            if let Some(alias) = &facet.alias {
                f.write_str(" AS ")?;
                write_quoted(f, alias)?;
            }
        }
        write!(f, " {}", self.window)?;
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if self.timeseries {
            f.write_str(" TIMESERIES AUTO")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_quoting() {
        assert_eq!(Attribute::new("hostname").to_string(), "hostname");
        assert_eq!(Attribute::new("tags.team").to_string(), "tags.team");
        assert_eq!(Attribute::new("my attr").to_string(), "`my attr`");
        assert_eq!(Attribute::new("1st").to_string(), "`1st`");
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(Literal::from("web-01").to_string(), "'web-01'");
        assert_eq!(Literal::from("it's").to_string(), "'it\\'s'");
        assert_eq!(
            Literal::from("x' OR 1=1 --").to_string(),
            "'x\\' OR 1=1 --'"
        );
        assert_eq!(Literal::from(42i64).to_string(), "42");
        assert_eq!(Literal::from(true).to_string(), "true");
    }

    #[test]
    fn test_conditions() {
        assert_eq!(
            Condition::eq("targetHost", "example.com").to_string(),
            "targetHost = 'example.com'"
        );
        let like = Condition::Like {
            attribute: "hostname".into(),
            negated: true,
            pattern: "%web%".to_string(),
        };
        assert_eq!(like.to_string(), "hostname NOT LIKE '%web%'");
        let in_list = Condition::In {
            attribute: "protocol".into(),
            negated: false,
            values: vec!["TCP".into(), "UDP".into()],
        };
        assert_eq!(in_list.to_string(), "protocol IN ('TCP', 'UDP')");
        let null = Condition::Null {
            attribute: "error".into(),
            negated: true,
        };
        assert_eq!(null.to_string(), "error IS NOT NULL");
    }

    #[test]
    fn test_query_rendering() {
        let query = Query::from("InfrastructureEvent")
            .select(Aggregate::Average("avgLatencyMs".into()), "avg_latency")
            .select(Aggregate::PercentPresent("error".into()), "error_percentage")
            .filter(Condition::eq("summary", "NetworkPathSample"))
            .facet_as("targetHost", "target")
            .window(TimeWindow::Last { duration_ms: 3_600_000 })
            .limit(500);
        assert_eq!(
            query.to_string(),
            "FROM InfrastructureEvent SELECT average(avgLatencyMs) AS 'avg_latency', \
             percentage(count(error), WHERE error IS NOT NULL) AS 'error_percentage' \
             WHERE summary = 'NetworkPathSample' FACET targetHost AS 'target' \
             SINCE 60 MINUTES AGO LIMIT 500"
        );
    }

    #[test]
    fn test_query_timeseries_and_bare_select() {
        let query = Query::from("InfrastructureEvent")
            .select_bare(Aggregate::Keyset)
            .window(TimeWindow::Between { begin: 1, end: 2 })
            .timeseries();
        assert_eq!(
            query.to_string(),
            "FROM InfrastructureEvent SELECT keyset() SINCE 1 UNTIL 2 TIMESERIES AUTO"
        );
    }

    #[test]
    fn test_empty_filter_group_is_skipped() {
        let query = Query::from("InfrastructureEvent").filter_group(FilterExpr::default());
        assert!(query.predicates().is_empty());
    }
}
