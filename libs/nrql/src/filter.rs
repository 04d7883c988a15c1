//! Compiles rows of a user built filter into a [`FilterExpr`].
//!
//! Incomplete rows are "not ready yet" rather than errors: a row without a
//! key, an operator, a usable value, or (for every row but the last) a
//! conjunction simply contributes nothing.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Attribute, Comparison, Condition, Error, Literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "NOT LIKE")]
    NotLike,
    #[serde(rename = "STARTS WITH")]
    StartsWith,
    #[serde(rename = "ENDS WITH")]
    EndsWith,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    IsNotNull,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::Like,
        Operator::NotLike,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::StartsWith => "STARTS WITH",
            Operator::EndsWith => "ENDS WITH",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    pub fn is_multi_value(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    pub fn needs_no_value(self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    pub fn is_partial_match(self) -> bool {
        matches!(self, Operator::Like | Operator::NotLike)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        Operator::ALL
            .into_iter()
            .find(|op| op.token().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| Error::UnknownOperator(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Conjunction {
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conjunction::And => f.write_str("AND"),
            Conjunction::Or => f.write_str("OR"),
        }
    }
}

impl FromStr for Conjunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Conjunction::And),
            "OR" => Ok(Conjunction::Or),
            _ => Err(Error::UnknownConjunction(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValues {
    One(String),
    Many(Vec<String>),
}

/// One row of the filter bar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub operator: Option<Operator>,
    #[serde(default)]
    pub values: Option<FilterValues>,
    /// Links this row to the next one; ignored on the last row.
    #[serde(default)]
    pub conjunction: Option<Conjunction>,
}

impl FilterSelection {
    pub fn new(key: impl Into<String>, operator: Operator) -> Self {
        Self {
            key: Some(key.into()),
            operator: Some(operator),
            values: None,
            conjunction: None,
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.values = Some(FilterValues::One(value.into()));
        self
    }

    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(FilterValues::Many(
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn then(mut self, conjunction: Conjunction) -> Self {
        self.conjunction = Some(conjunction);
        self
    }

    /// The condition this row stands for, ignoring its conjunction.
    pub fn condition(&self) -> Option<Condition> {
        let key = self.key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let operator = self.operator?;
        let attribute = Attribute::new(key);

        if operator.is_multi_value() {
            let Some(FilterValues::Many(values)) = &self.values else {
                return None;
            };
            let values: Vec<Literal> = values
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(Literal::from)
                .collect();
            if values.is_empty() {
                return None;
            }
            return Some(Condition::In {
                attribute,
                negated: operator == Operator::NotIn,
                values,
            });
        }

        if operator.needs_no_value() {
            return Some(Condition::Null {
                attribute,
                negated: operator == Operator::IsNotNull,
            });
        }

        let value = match &self.values {
            Some(FilterValues::One(v)) => v.trim(),
            _ => "",
        };
        if value.is_empty() {
            return None;
        }
        let condition = match operator {
            Operator::Equal | Operator::NotEqual => Condition::Compare {
                attribute,
                op: if operator == Operator::Equal {
                    Comparison::Eq
                } else {
                    Comparison::NotEq
                },
                value: Literal::from(value),
            },
            Operator::Like | Operator::NotLike => Condition::Like {
                attribute,
                negated: operator == Operator::NotLike,
                pattern: format!("%{value}%"),
            },
            Operator::StartsWith => Condition::Like {
                attribute,
                negated: false,
                pattern: format!("{value}%"),
            },
            Operator::EndsWith => Condition::Like {
                attribute,
                negated: false,
                pattern: format!("%{value}"),
            },
            Operator::In | Operator::NotIn | Operator::IsNull | Operator::IsNotNull => {
                unreachable!("handled above")
            }
        };
        Some(condition)
    }
}

/// Parses `<key> <OPERATOR> [value]`; list operators take comma separated
/// values, optionally parenthesized.
impl FromStr for FilterSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (key, rest) = s
            .split_once(char::is_whitespace)
            .ok_or(Error::InvalidFilter(s.to_string(), "expected `<key> <operator> [value]`"))?;
        let rest = rest.trim_start();

        let mut operators = Operator::ALL;
        operators.sort_by_key(|op| std::cmp::Reverse(op.token().len()));
        let (operator, value) = operators
            .into_iter()
            .find_map(|op| {
                let token = op.token();
                let head = rest.get(..token.len())?;
                let tail = &rest[token.len()..];
                let at_boundary = tail.is_empty()
                    || tail.starts_with(char::is_whitespace)
                    || !token.ends_with(|c: char| c.is_ascii_alphabetic());
                (head.eq_ignore_ascii_case(token) && at_boundary).then(|| (op, tail.trim()))
            })
            .ok_or_else(|| Error::UnknownOperator(rest.to_string()))?;

        let mut selection = FilterSelection::new(key, operator);
        if operator.needs_no_value() {
            return Ok(selection);
        }
        if value.is_empty() {
            return Err(Error::InvalidFilter(s.to_string(), "missing value"));
        }
        if operator.is_multi_value() {
            let list = value
                .strip_prefix('(')
                .and_then(|v| v.strip_suffix(')'))
                .unwrap_or(value);
            selection = selection.values(list.split(',').map(|v| v.trim().to_string()));
        } else {
            selection = selection.value(value);
        }
        Ok(selection)
    }
}

/// A compiled filter: conditions in input order, each followed by the
/// conjunction linking it to the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExpr {
    terms: Vec<(Condition, Option<Conjunction>)>,
}

impl FilterExpr {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.terms.iter().map(|(c, _)| c)
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.terms.len().saturating_sub(1);
        for (i, (condition, conjunction)) in self.terms.iter().enumerate() {
            write!(f, "{condition}")?;
            // the last surviving term never emits its conjunction
            if i < last {
                write!(f, " {} ", conjunction.unwrap_or(Conjunction::And))?;
            }
        }
        Ok(())
    }
}

pub fn compile(selections: &[FilterSelection]) -> FilterExpr {
    let last = selections.len().saturating_sub(1);
    let terms = selections
        .iter()
        .enumerate()
        .filter_map(|(i, selection)| {
            let conjunction = if i == last {
                None
            } else {
                Some(selection.conjunction?)
            };
            Some((selection.condition()?, conjunction))
        })
        .collect();
    FilterExpr { terms }
}

/// Renders the compiled filter, empty when no row is complete.
pub fn filters_to_nrql(selections: &[FilterSelection]) -> String {
    compile(selections).to_string()
}
