//! Constraint expressions and their compilation into backend filters.
//!
//! Callers describe row constraints with a small JSON DSL:
//!
//! ```text
//! Expression := Comparison | Logical
//! Comparison := { "column": string, "op": "<"|"<="|">"|">="|"="|"!="|"IN", "$": scalar | array }
//! Logical    := { "AND": [Expression, ...] } | { "OR": [Expression, ...] }
//! ```
//!
//! [`ConstraintExpression::parse`] turns that JSON into a typed tree, and
//! [`FilterCompiler::compile`] lowers the tree into the backend's
//! `FilterList` / `SingleColumnValueFilter` grammar.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hbase_access::filter::{ConstraintExpression, FilterCompiler};
//! use hbase_access::schema::DataType;
//!
//! let expr = ConstraintExpression::parse(&serde_json::json!({
//!     "OR": [
//!         {"column": "status", "op": "=", "$": "open"},
//!         {"column": "level", "op": "IN", "$": [3, 4]}
//!     ]
//! }))?;
//! let filter = FilterCompiler::new(DataType::Event).compile(&expr);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::schema::{self, DataType};

/// Comparison operators of the DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `IN`, membership in a list of values.
    In,
}

impl ComparisonOp {
    fn parse(op: &str) -> Option<Self> {
        match op.trim() {
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Neq),
            other if other.eq_ignore_ascii_case("IN") => Some(Self::In),
            _ => None,
        }
    }
}

/// Logical combinators of the DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// Every child must match.
    And,
    /// At least one child must match.
    Or,
}

impl LogicalOp {
    fn parse(key: &str) -> Option<Self> {
        match key.to_ascii_uppercase().as_str() {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            _ => None,
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Single string, number or boolean.
    Scalar(Value),
    /// Values of an `IN` comparison.
    List(Vec<Value>),
}

/// Parsed constraint expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintExpression {
    /// `AND` / `OR` over ordered children.
    Logical {
        /// Combinator.
        op: LogicalOp,
        /// Child expressions, in input order.
        children: Vec<ConstraintExpression>,
    },
    /// Single-column comparison.
    Comparison {
        /// Caller-facing column name.
        column: String,
        /// Operator.
        op: ComparisonOp,
        /// Compared value(s).
        operand: Operand,
    },
}

impl ConstraintExpression {
    /// Parses the JSON DSL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] with the offending JSON fragment when a node
    /// is neither a well-formed logical node nor a well-formed comparison.
    pub fn parse(json: &Value) -> Result<Self> {
        let Value::Object(map) = json else {
            return Err(syntax_error(json));
        };

        if map.len() == 1 {
            if let Some((key, value)) = map.iter().next() {
                if let Some(op) = LogicalOp::parse(key) {
                    let Value::Array(items) = value else {
                        return Err(syntax_error(json));
                    };
                    let children = items.iter().map(Self::parse).collect::<Result<_>>()?;
                    return Ok(Self::Logical { op, children });
                }
            }
        }

        Self::parse_comparison(json)
    }

    /// Parses a JSON string holding the DSL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] for invalid JSON or an invalid expression.
    pub fn parse_str(text: &str) -> Result<Self> {
        let json: Value = serde_json::from_str(text)
            .map_err(|e| Error::Syntax(format!("{text} ({e})")))?;
        Self::parse(&json)
    }

    fn parse_comparison(json: &Value) -> Result<Self> {
        let column = json.get("column").and_then(Value::as_str);
        let op = json
            .get("op")
            .and_then(Value::as_str)
            .and_then(ComparisonOp::parse);
        let value = json.get("$");

        let (Some(column), Some(op), Some(value)) = (column, op, value) else {
            return Err(syntax_error(json));
        };
        if column.is_empty() {
            return Err(syntax_error(json));
        }

        let operand = match (op, value) {
            (ComparisonOp::In, Value::Array(items)) if items.iter().all(is_scalar) => {
                Operand::List(items.clone())
            }
            (ComparisonOp::In, _) => return Err(syntax_error(json)),
            (_, v) if is_scalar(v) => Operand::Scalar(v.clone()),
            _ => return Err(syntax_error(json)),
        };

        Ok(Self::Comparison {
            column: column.to_string(),
            op,
            operand,
        })
    }

    /// Column names referenced anywhere in the expression, first-seen order.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<String>) {
        match self {
            Self::Logical { children, .. } => {
                for child in children {
                    child.collect_columns(out);
                }
            }
            Self::Comparison { column, .. } => {
                if !out.contains(column) {
                    out.push(column.clone());
                }
            }
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn syntax_error(json: &Value) -> Error {
    Error::Syntax(json.to_string())
}

/// Renders a scalar as the comparator string the backend compares against.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_to_string(n),
        other => other.to_string(),
    }
}

/// Formats a number as stored values spell it: integral floats lose their
/// fraction and very large or small magnitudes use `e+N`/`e-N` notation.
fn number_to_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    let Some(f) = n.as_f64() else {
        return n.to_string();
    };
    if f == 0.0 {
        return "0".to_string();
    }

    let magnitude = f.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let sci = format!("{f:e}");
        return match sci.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => sci,
        };
    }
    if f.fract() == 0.0 {
        format!("{f:.0}")
    } else {
        f.to_string()
    }
}

/// `FilterList` combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListOperator {
    /// Logical AND.
    MustPassAll,
    /// Logical OR.
    MustPassOne,
}

impl From<LogicalOp> for ListOperator {
    fn from(op: LogicalOp) -> Self {
        match op {
            LogicalOp::And => Self::MustPassAll,
            LogicalOp::Or => Self::MustPassOne,
        }
    }
}

/// Backend comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompareOperator {
    /// Cell value < comparator.
    Less,
    /// Cell value <= comparator.
    LessOrEqual,
    /// Cell value > comparator.
    Greater,
    /// Cell value >= comparator.
    GreaterOrEqual,
    /// Cell value == comparator.
    Equal,
    /// Cell value != comparator.
    NotEqual,
}

impl CompareOperator {
    fn evaluate(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Less => ordering == Less,
            Self::LessOrEqual => ordering != Greater,
            Self::Greater => ordering == Greater,
            Self::GreaterOrEqual => ordering != Less,
            Self::Equal => ordering == Equal,
            Self::NotEqual => ordering != Equal,
        }
    }
}

/// Comparator kinds understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparatorKind {
    /// Lexicographic byte comparison.
    BinaryComparator,
}

/// Comparator attached to a value filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparator {
    /// Value compared against.
    pub value: String,
    /// Comparison kind.
    #[serde(rename = "type")]
    pub kind: ComparatorKind,
}

/// Filter tree in the backend's native grammar.
///
/// Serializes to the JSON the REST gateway accepts as a scanner filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CompiledFilter {
    /// Combination of child filters.
    FilterList {
        /// Combinator.
        op: ListOperator,
        /// Children, in input order.
        filters: Vec<CompiledFilter>,
    },
    /// Comparison of one column's value.
    #[serde(rename = "SingleColumnValueFilter")]
    ValueFilter {
        /// Comparison operator.
        op: CompareOperator,
        /// Base64 column family.
        family: String,
        /// Base64 column name.
        qualifier: String,
        /// Comparator.
        comparator: Comparator,
    },
}

impl CompiledFilter {
    /// Serializes the filter into the JSON string sent to the backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if encoding fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Evaluates the filter against one row (`family:column` -> value).
    ///
    /// A value filter whose column is absent from the row passes, matching
    /// the backend default for single-column value filters.
    #[must_use]
    pub fn matches(&self, row: &BTreeMap<String, String>) -> bool {
        match self {
            Self::FilterList { op, filters } => match op {
                ListOperator::MustPassAll => filters.iter().all(|f| f.matches(row)),
                ListOperator::MustPassOne => {
                    filters.is_empty() || filters.iter().any(|f| f.matches(row))
                }
            },
            Self::ValueFilter {
                op,
                family,
                qualifier,
                comparator,
            } => {
                let (Ok(family), Ok(column)) = (schema::decode(family), schema::decode(qualifier))
                else {
                    return false;
                };
                match row.get(&format!("{family}:{column}")) {
                    Some(value) => op.evaluate(value.as_bytes().cmp(comparator.value.as_bytes())),
                    None => true,
                }
            }
        }
    }
}

/// Lowers constraint expressions for one record type.
#[derive(Debug, Clone)]
pub struct FilterCompiler {
    encoded_family: String,
}

impl FilterCompiler {
    /// Creates a compiler targeting the column family of `data_type`.
    #[must_use]
    pub fn new(data_type: DataType) -> Self {
        Self {
            encoded_family: data_type.encoded_family(),
        }
    }

    /// Compiles an expression. Pure: equal input gives equal output.
    #[must_use]
    pub fn compile(&self, expr: &ConstraintExpression) -> CompiledFilter {
        match expr {
            ConstraintExpression::Logical { op, children } => CompiledFilter::FilterList {
                op: (*op).into(),
                filters: children.iter().map(|c| self.compile(c)).collect(),
            },
            ConstraintExpression::Comparison {
                column,
                op,
                operand,
            } => {
                let qualifier = schema::encode(column);
                match operand {
                    // No native IN: a disjunction of equality filters.
                    Operand::List(values) => CompiledFilter::FilterList {
                        op: ListOperator::MustPassOne,
                        filters: values
                            .iter()
                            .map(|v| self.value_filter(CompareOperator::Equal, &qualifier, v))
                            .collect(),
                    },
                    Operand::Scalar(value) => {
                        self.value_filter(compare_operator(*op), &qualifier, value)
                    }
                }
            }
        }
    }

    /// Parses and compiles the JSON DSL in one step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] for malformed expressions.
    pub fn compile_json(&self, json: &Value) -> Result<CompiledFilter> {
        Ok(self.compile(&ConstraintExpression::parse(json)?))
    }

    fn value_filter(&self, op: CompareOperator, qualifier: &str, value: &Value) -> CompiledFilter {
        CompiledFilter::ValueFilter {
            op,
            family: self.encoded_family.clone(),
            qualifier: qualifier.to_string(),
            comparator: Comparator {
                value: scalar_to_string(value),
                kind: ComparatorKind::BinaryComparator,
            },
        }
    }
}

fn compare_operator(op: ComparisonOp) -> CompareOperator {
    match op {
        ComparisonOp::Lt => CompareOperator::Less,
        ComparisonOp::Lte => CompareOperator::LessOrEqual,
        ComparisonOp::Gt => CompareOperator::Greater,
        ComparisonOp::Gte => CompareOperator::GreaterOrEqual,
        // Scalar IN is rejected at parse time.
        ComparisonOp::Eq | ComparisonOp::In => CompareOperator::Equal,
        ComparisonOp::Neq => CompareOperator::NotEqual,
    }
}
