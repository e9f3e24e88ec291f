use serde::{Deserialize, Serialize};

use super::membership::{TriangularMf, Universe};
use crate::error::{GradeError, Result};

/// A named linguistic term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub name: String,
    pub membership: TriangularMf,
}

/// A fuzzy variable: a universe plus named triangular terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinguisticVariable {
    pub name: String,
    pub universe: Universe,
    pub terms: Vec<Term>,
}

impl LinguisticVariable {
    pub fn new(name: impl Into<String>, universe: Universe) -> Self {
        Self {
            name: name.into(),
            universe,
            terms: Vec::new(),
        }
    }

    /// Add a term with breakpoints `(a, b, c)`
    pub fn with_term(mut self, name: impl Into<String>, a: f64, b: f64, c: f64) -> Self {
        self.terms.push(Term {
            name: name.into(),
            membership: TriangularMf::new(a, b, c),
        });
        self
    }

    /// Index of a term by name
    pub fn term_index(&self, term: &str) -> Result<usize> {
        self.terms
            .iter()
            .position(|t| t.name == term)
            .ok_or_else(|| GradeError::UnknownTerm {
                variable: self.name.clone(),
                term: term.to_string(),
            })
    }

    pub fn term(&self, term: &str) -> Result<&Term> {
        self.term_index(term).map(|i| &self.terms[i])
    }

    /// Degree of membership of `x` in every term, in declaration order
    pub fn fuzzify(&self, x: f64) -> Vec<f64> {
        let x = self.universe.clip(x);
        self.terms.iter().map(|t| t.membership.degree(x)).collect()
    }

    pub fn validate(&self) -> Result<()> {
        self.universe.validate()?;

        if self.terms.is_empty() {
            return Err(GradeError::InvalidRuleBase(format!(
                "variable '{}' has no terms",
                self.name
            )));
        }

        for (i, term) in self.terms.iter().enumerate() {
            let TriangularMf { a, b, c } = term.membership;
            if !term.membership.is_valid() {
                return Err(GradeError::InvalidMembership {
                    term: format!("{}.{}", self.name, term.name),
                    a,
                    b,
                    c,
                });
            }
            if self.terms[..i].iter().any(|t| t.name == term.name) {
                return Err(GradeError::InvalidRuleBase(format!(
                    "variable '{}' declares term '{}' twice",
                    self.name, term.name
                )));
            }
        }

        Ok(())
    }
}
