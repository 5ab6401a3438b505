//! Filter predicate compilation for list queries
//!
//! List endpoints accept a record of optional filter fields. Each field is either
//! absent (contributes nothing) or present (contributes exactly one clause and one
//! bound argument). [`CompileFilter::compile`] turns such a record into a
//! [`Predicate`]: a parameterized fragment using named parameters (`:status`) plus
//! the name→value map.
//!
//! Clauses are emitted in field-declaration order and arguments are kept in a
//! sorted map, so two filters with the same present fields always compile to
//! byte-identical output.
//!
//! # Example
//!
//! ```rust
//! use booking_api::filter::{Field, FilterValue, PredicateBuilder};
//!
//! let status: Field<String> = Field::Present("ongoing".to_string());
//! let location: Field<String> = Field::Absent;
//!
//! let predicate = PredicateBuilder::new()
//!     .equal(&status, "b.status = :status", "status")
//!     .contains(&location, "p.location LIKE :location", "location")
//!     .build();
//!
//! assert_eq!(predicate.fragment(), "b.status = :status");
//! assert_eq!(
//!     predicate.args().get("status"),
//!     Some(&FilterValue::Text("ongoing".to_string()))
//! );
//! ```

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};

/// An optional filter field
///
/// Makes the set/unset distinction explicit instead of relying on zero values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    /// Not provided; never appears in the compiled predicate
    #[default]
    Absent,
    /// Provided; contributes one clause and one argument
    Present(T),
}

impl<T> Field<T> {
    /// Whether the field was provided
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Borrow the value if present
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }

    /// Keep the value only if `keep` accepts it
    pub fn filter(self, keep: impl FnOnce(&T) -> bool) -> Self {
        match self {
            Self::Present(value) if keep(&value) => Self::Present(value),
            _ => Self::Absent,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Present(v),
            None => Self::Absent,
        }
    }
}

/// A value bound to a named parameter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Text value
    Text(String),
    /// Integer value
    Integer(i64),
    /// Boolean value
    Bool(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveTime> for FilterValue {
    fn from(value: NaiveTime) -> Self {
        Self::Time(value)
    }
}

/// A compiled, parameterized predicate fragment
///
/// The fragment never contains the `WHERE` keyword; see [`Predicate::where_clause`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predicate {
    fragment: String,
    args: BTreeMap<&'static str, FilterValue>,
}

impl Predicate {
    /// The joined clauses, empty when no field was present
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Named arguments referenced by the fragment
    pub fn args(&self) -> &BTreeMap<&'static str, FilterValue> {
        &self.args
    }

    /// Whether no clause was emitted
    pub fn is_empty(&self) -> bool {
        self.fragment.is_empty()
    }

    /// `WHERE <fragment>`, or an empty string for an empty predicate
    pub fn where_clause(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.fragment)
        }
    }

    /// Rewrite named parameters into Postgres positional parameters
    ///
    /// Numbering starts at `$first`. A name referenced more than once reuses its
    /// position, and the returned values are ordered by position.
    pub fn to_positional(&self, first: usize) -> (String, Vec<FilterValue>) {
        let mut sql = String::with_capacity(self.fragment.len());
        let mut positions: Vec<&'static str> = Vec::new();
        let chars: Vec<char> = self.fragment.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let prev_is_colon = i > 0 && chars[i - 1] == ':';
            let next_is_ident = chars.get(i + 1).is_some_and(|n| is_ident_char(*n));

            if c == ':' && !prev_is_colon && next_is_ident {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_ident_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();

                match self.args.get_key_value(name.as_str()) {
                    Some((key, _)) => {
                        let index = match positions.iter().position(|p| p == key) {
                            Some(index) => index,
                            None => {
                                positions.push(key);
                                positions.len() - 1
                            }
                        };
                        sql.push('$');
                        sql.push_str(&(first + index).to_string());
                    }
                    None => {
                        sql.push(':');
                        sql.push_str(&name);
                    }
                }
                i = end;
                continue;
            }

            sql.push(c);
            i += 1;
        }

        let values = positions
            .iter()
            .filter_map(|name| self.args.get(name).cloned())
            .collect();

        (sql, values)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Accumulates clauses in call order
///
/// Call the builder methods in the filter's field-declaration order.
#[derive(Debug, Default)]
pub struct PredicateBuilder {
    clauses: Vec<&'static str>,
    args: BTreeMap<&'static str, FilterValue>,
}

impl PredicateBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `clause` with `param` bound to the field value, if present
    ///
    /// `clause` must reference `:param`.
    #[must_use]
    pub fn equal<T>(self, field: &Field<T>, clause: &'static str, param: &'static str) -> Self
    where
        T: Clone + Into<FilterValue>,
    {
        match field.as_option() {
            Some(value) => self.push(clause, param, value.clone().into()),
            None => self,
        }
    }

    /// Append a partial-match clause; the value is wrapped as `%value%` before binding
    #[must_use]
    pub fn contains(
        self,
        field: &Field<String>,
        clause: &'static str,
        param: &'static str,
    ) -> Self {
        match field.as_option() {
            Some(value) => self.push(clause, param, FilterValue::Text(format!("%{}%", value))),
            None => self,
        }
    }

    fn push(mut self, clause: &'static str, param: &'static str, value: FilterValue) -> Self {
        debug_assert!(
            clause.contains(&format!(":{}", param)),
            "clause `{}` does not reference :{}",
            clause,
            param
        );
        self.clauses.push(clause);
        self.args.insert(param, value);
        self
    }

    /// Join the clauses with `AND`
    pub fn build(self) -> Predicate {
        Predicate {
            fragment: self.clauses.join(" AND "),
            args: self.args,
        }
    }
}

/// A filter record that compiles into a [`Predicate`]
pub trait CompileFilter {
    /// Compile the present fields, in declaration order
    fn compile(&self) -> Predicate;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sample {
        name: Field<String>,
        min_age: Field<i32>,
        active: Field<bool>,
    }

    impl CompileFilter for Sample {
        fn compile(&self) -> Predicate {
            PredicateBuilder::new()
                .contains(&self.name, "(u.name LIKE :name OR u.alias LIKE :name)", "name")
                .equal(&self.min_age, "u.age >= :min_age", "min_age")
                .equal(&self.active, "u.active = :active", "active")
                .build()
        }
    }

    #[test]
    fn test_field_filter_drops_rejected_values() {
        assert_eq!(Field::Present(3).filter(|n| *n > 0), Field::Present(3));
        assert_eq!(Field::Present(0).filter(|n| *n > 0), Field::Absent);
        assert_eq!(Field::<i32>::Absent.filter(|_| true), Field::Absent);
    }

    #[test]
    fn test_all_absent_compiles_to_empty() {
        let predicate = Sample::default().compile();
        assert_eq!(predicate.fragment(), "");
        assert!(predicate.args().is_empty());
        assert!(predicate.is_empty());
        assert_eq!(predicate.where_clause(), "");
    }

    #[test]
    fn test_present_fields_join_with_and_in_declaration_order() {
        let filter = Sample {
            name: Field::Absent,
            min_age: Field::Present(18),
            active: Field::Present(true),
        };
        let predicate = filter.compile();
        assert_eq!(predicate.fragment(), "u.age >= :min_age AND u.active = :active");
        assert_eq!(predicate.args().len(), 2);
        assert_eq!(predicate.args().get("min_age"), Some(&FilterValue::Integer(18)));
        assert_eq!(
            predicate.where_clause(),
            "WHERE u.age >= :min_age AND u.active = :active"
        );
    }

    #[test]
    fn test_same_fields_compile_identically_regardless_of_assignment_order() {
        let mut a = Sample::default();
        a.active = Field::Present(false);
        a.name = Field::Present("ann".to_string());

        let mut b = Sample::default();
        b.name = Field::Present("ann".to_string());
        b.active = Field::Present(false);

        assert_eq!(a.compile(), b.compile());
        assert_eq!(a.compile().fragment().as_bytes(), b.compile().fragment().as_bytes());
    }

    #[test]
    fn test_contains_wraps_value_in_wildcards() {
        let filter = Sample {
            name: Field::Present("bali".to_string()),
            ..Sample::default()
        };
        let predicate = filter.compile();
        assert_eq!(
            predicate.args().get("name"),
            Some(&FilterValue::Text("%bali%".to_string()))
        );
    }

    #[test]
    fn test_present_false_still_emits_clause() {
        let filter = Sample {
            active: Field::Present(false),
            ..Sample::default()
        };
        assert_eq!(filter.compile().fragment(), "u.active = :active");
    }

    #[test]
    fn test_to_positional_reuses_repeated_names() {
        let filter = Sample {
            name: Field::Present("x".to_string()),
            min_age: Field::Present(30),
            active: Field::Absent,
        };
        let (sql, values) = filter.compile().to_positional(1);
        assert_eq!(sql, "(u.name LIKE $1 OR u.alias LIKE $1) AND u.age >= $2");
        assert_eq!(
            values,
            vec![FilterValue::Text("%x%".to_string()), FilterValue::Integer(30)]
        );
    }

    #[test]
    fn test_to_positional_respects_offset_and_casts() {
        let predicate = PredicateBuilder::new()
            .equal(&Field::Present(3_i64), "p.id::bigint = :id", "id")
            .build();
        let (sql, values) = predicate.to_positional(4);
        assert_eq!(sql, "p.id::bigint = $4");
        assert_eq!(values, vec![FilterValue::Integer(3)]);
    }

    #[test]
    fn test_field_from_option() {
        assert_eq!(Field::from(Some(1)), Field::Present(1));
        assert_eq!(Field::<i32>::from(None), Field::Absent);
        assert!(Field::Present(()).is_present());
    }
}
