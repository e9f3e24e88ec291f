use std::fmt;
use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

/// Antecedent expression tree
///
/// `&` combines with `min`, `|` with `max`; a leaf evaluates to the
/// membership degree of the named term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Is { variable: String, term: String },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// The clause `variable IS term`
    pub fn is(variable: impl Into<String>, term: impl Into<String>) -> Self {
        Self::Is {
            variable: variable.into(),
            term: term.into(),
        }
    }

    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }
}

impl BitAnd for Expr {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.and(rhs)
    }
}

impl BitOr for Expr {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.or(rhs)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Is { variable, term } => write!(f, "{variable} IS {term}"),
            Self::And(lhs, rhs) => write!(f, "({lhs} AND {rhs})"),
            Self::Or(lhs, rhs) => write!(f, "({lhs} OR {rhs})"),
        }
    }
}

/// `IF antecedent THEN consequent IS term`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub antecedent: Expr,
    /// Term of the rule base's consequent variable
    pub consequent: String,
}

impl Rule {
    pub fn new(antecedent: Expr, consequent: impl Into<String>) -> Self {
        Self {
            antecedent,
            consequent: consequent.into(),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IF {} THEN {}", self.antecedent, self.consequent)
    }
}
