use std::collections::BTreeMap;

use serde::Serialize;

use super::rule::{Expr, Rule};
use super::variable::LinguisticVariable;
use crate::error::{GradeError, Result};

/// Crisp antecedent values keyed by variable name
pub type CrispInputs = BTreeMap<String, f64>;

/// Build [`CrispInputs`] from `(name, value)` pairs
pub fn crisp_inputs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> CrispInputs {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Expression tree with names resolved to indices
#[derive(Debug, Clone)]
enum CompiledExpr {
    Leaf { variable: usize, term: usize },
    And(Box<CompiledExpr>, Box<CompiledExpr>),
    Or(Box<CompiledExpr>, Box<CompiledExpr>),
}

impl CompiledExpr {
    fn strength(&self, degrees: &[Vec<f64>]) -> f64 {
        match self {
            Self::Leaf { variable, term } => degrees[*variable][*term],
            Self::And(lhs, rhs) => lhs.strength(degrees).min(rhs.strength(degrees)),
            Self::Or(lhs, rhs) => lhs.strength(degrees).max(rhs.strength(degrees)),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    antecedent: CompiledExpr,
    consequent_term: usize,
}

/// Result of one Mamdani evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inference {
    /// Centroid of the aggregated output set, or 0 when nothing fired
    pub output: f64,
    /// Firing strength of each rule, in declaration order
    pub firing_strengths: Vec<f64>,
    /// True when the aggregated output set was empty
    pub degenerate: bool,
}

/// A compiled, immutable Mamdani rule base
///
/// Evaluation only reads the rule base, so one instance can be shared by any
/// number of threads.
#[derive(Debug, Clone)]
pub struct RuleBase {
    antecedents: Vec<LinguisticVariable>,
    consequent: LinguisticVariable,
    rules: Vec<Rule>,
    compiled: Vec<CompiledRule>,
    /// Consequent terms sampled over the consequent universe
    consequent_samples: Vec<Vec<f64>>,
    consequent_points: Vec<f64>,
}

impl RuleBase {
    pub fn builder() -> RuleBaseBuilder {
        RuleBaseBuilder::default()
    }

    pub fn antecedents(&self) -> &[LinguisticVariable] {
        &self.antecedents
    }

    pub fn consequent(&self) -> &LinguisticVariable {
        &self.consequent
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluate and return only the defuzzified output
    pub fn evaluate(&self, inputs: &CrispInputs) -> Result<f64> {
        self.evaluate_detailed(inputs).map(|inference| inference.output)
    }

    /// Fuzzify, fire every rule, aggregate by max and defuzzify by centroid
    ///
    /// Every antecedent must have a finite crisp input; values outside a
    /// universe are clipped to it. When no rule fires the output is 0.
    pub fn evaluate_detailed(&self, inputs: &CrispInputs) -> Result<Inference> {
        let degrees = self
            .antecedents
            .iter()
            .map(|variable| {
                let value = *inputs
                    .get(&variable.name)
                    .ok_or_else(|| GradeError::MissingInput(variable.name.clone()))?;
                if !value.is_finite() {
                    return Err(GradeError::NonFiniteInput {
                        variable: variable.name.clone(),
                        value,
                    });
                }
                Ok(variable.fuzzify(value))
            })
            .collect::<Result<Vec<_>>>()?;

        let firing_strengths: Vec<f64> = self
            .compiled
            .iter()
            .map(|rule| rule.antecedent.strength(&degrees))
            .collect();

        let mut aggregated = vec![0.0_f64; self.consequent_points.len()];
        for (rule, &strength) in self.compiled.iter().zip(&firing_strengths) {
            if strength <= 0.0 {
                continue;
            }
            let samples = &self.consequent_samples[rule.consequent_term];
            for (acc, &mu) in aggregated.iter_mut().zip(samples) {
                *acc = acc.max(mu.min(strength));
            }
        }

        let area: f64 = aggregated.iter().sum();
        if area <= 0.0 {
            return Ok(Inference {
                output: 0.0,
                firing_strengths,
                degenerate: true,
            });
        }

        let moment: f64 = self
            .consequent_points
            .iter()
            .zip(&aggregated)
            .map(|(u, mu)| u * mu)
            .sum();
        let universe = &self.consequent.universe;

        Ok(Inference {
            output: (moment / area).clamp(universe.min, universe.max),
            firing_strengths,
            degenerate: false,
        })
    }
}

/// Collects variables and rules, then validates and compiles them
#[derive(Debug, Clone, Default)]
pub struct RuleBaseBuilder {
    antecedents: Vec<LinguisticVariable>,
    consequent: Option<LinguisticVariable>,
    rules: Vec<Rule>,
}

impl RuleBaseBuilder {
    pub fn antecedent(mut self, variable: LinguisticVariable) -> Self {
        self.antecedents.push(variable);
        self
    }

    pub fn consequent(mut self, variable: LinguisticVariable) -> Self {
        self.consequent = Some(variable);
        self
    }

    pub fn rule(mut self, antecedent: Expr, consequent_term: impl Into<String>) -> Self {
        self.rules.push(Rule::new(antecedent, consequent_term));
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Validate and compile the rule base
    pub fn build(self) -> Result<RuleBase> {
        let consequent = self.consequent.ok_or_else(|| {
            GradeError::InvalidRuleBase("no consequent variable declared".to_string())
        })?;
        consequent.validate()?;

        if self.antecedents.is_empty() {
            return Err(GradeError::InvalidRuleBase(
                "no antecedent variables declared".to_string(),
            ));
        }
        for (i, variable) in self.antecedents.iter().enumerate() {
            variable.validate()?;
            if self.antecedents[..i].iter().any(|v| v.name == variable.name) {
                return Err(GradeError::InvalidRuleBase(format!(
                    "antecedent '{}' declared twice",
                    variable.name
                )));
            }
        }

        if self.rules.is_empty() {
            return Err(GradeError::InvalidRuleBase("no rules declared".to_string()));
        }

        let compiled = self
            .rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    antecedent: compile(&rule.antecedent, &self.antecedents)?,
                    consequent_term: consequent.term_index(&rule.consequent)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let consequent_samples = consequent
            .terms
            .iter()
            .map(|term| term.membership.sample(&consequent.universe))
            .collect();
        let consequent_points = consequent.universe.points();

        Ok(RuleBase {
            antecedents: self.antecedents,
            consequent,
            rules: self.rules,
            compiled,
            consequent_samples,
            consequent_points,
        })
    }
}

fn compile(expr: &Expr, antecedents: &[LinguisticVariable]) -> Result<CompiledExpr> {
    match expr {
        Expr::Is { variable, term } => {
            let index = antecedents
                .iter()
                .position(|v| &v.name == variable)
                .ok_or_else(|| GradeError::UnknownVariable(variable.clone()))?;
            Ok(CompiledExpr::Leaf {
                variable: index,
                term: antecedents[index].term_index(term)?,
            })
        }
        Expr::And(lhs, rhs) => Ok(CompiledExpr::And(
            Box::new(compile(lhs, antecedents)?),
            Box::new(compile(rhs, antecedents)?),
        )),
        Expr::Or(lhs, rhs) => Ok(CompiledExpr::Or(
            Box::new(compile(lhs, antecedents)?),
            Box::new(compile(rhs, antecedents)?),
        )),
    }
}
