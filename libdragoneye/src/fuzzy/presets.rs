//! Rule bases used by the grading pipeline
//!
//! Weight dominates the size score; length, diameter and shape ratio support
//! it. The condition score combines skin colour and surface texture.

use std::sync::{Arc, OnceLock};

use super::engine::RuleBase;
use super::membership::Universe;
use super::rule::Expr;
use super::variable::LinguisticVariable;
use crate::error::Result;

pub const LENGTH: &str = "length";
pub const DIAMETER: &str = "diameter";
pub const WEIGHT: &str = "weight";
pub const RATIO: &str = "ratio";
pub const SCORE: &str = "score";

pub const COLOUR: &str = "colour";
pub const TEXTURE: &str = "texture";
pub const CONDITION: &str = "condition";

/// Low / medium / high partition of `[0, 1]` shared by the size antecedents
fn three_terms(name: &str, terms: [&str; 3]) -> LinguisticVariable {
    LinguisticVariable::new(name, Universe::unit())
        .with_term(terms[0], 0.0, 0.0, 0.4)
        .with_term(terms[1], 0.3, 0.55, 0.75)
        .with_term(terms[2], 0.6, 1.0, 1.0)
}

/// Size/weight/shape rule base producing a 0–100 score
pub fn size_rule_base() -> Result<RuleBase> {
    let is = Expr::is;

    RuleBase::builder()
        .antecedent(three_terms(LENGTH, ["small", "medium", "large"]))
        .antecedent(three_terms(DIAMETER, ["small", "medium", "large"]))
        .antecedent(three_terms(WEIGHT, ["low", "mid", "high"]))
        .antecedent(three_terms(RATIO, ["poor", "normal", "good"]))
        .consequent(
            LinguisticVariable::new(SCORE, Universe::percent())
                .with_term("low", 0.0, 0.0, 40.0)
                .with_term("mid", 30.0, 55.0, 75.0)
                .with_term("high", 65.0, 100.0, 100.0),
        )
        // heavy and large
        .rule(is(WEIGHT, "high") & is(LENGTH, "large"), "high")
        .rule(is(WEIGHT, "high") & is(DIAMETER, "large"), "high")
        .rule(is(WEIGHT, "high") & is(RATIO, "good"), "high")
        // mid weight with decent size or shape
        .rule(
            is(WEIGHT, "mid") & (is(LENGTH, "medium") | is(DIAMETER, "medium")),
            "mid",
        )
        .rule(is(WEIGHT, "mid") & is(RATIO, "normal"), "mid")
        // light fruit scores low whatever its size
        .rule(is(WEIGHT, "low"), "low")
        .rule(
            (is(DIAMETER, "large") & is(RATIO, "good")) & is(WEIGHT, "mid"),
            "high",
        )
        .rule(is(LENGTH, "small") & is(RATIO, "poor"), "low")
        .rule(is(DIAMETER, "small") & is(RATIO, "poor"), "low")
        .build()
}

/// Colour/texture rule base producing a 0–100 condition score
pub fn condition_rule_base() -> Result<RuleBase> {
    let is = Expr::is;

    RuleBase::builder()
        .antecedent(
            LinguisticVariable::new(COLOUR, Universe::unit())
                .with_term("dark", 0.0, 0.0, 0.35)
                .with_term("normal", 0.3, 0.55, 0.75)
                .with_term("bright", 0.7, 1.0, 1.0),
        )
        .antecedent(
            LinguisticVariable::new(TEXTURE, Universe::unit())
                .with_term("rough", 0.0, 0.0, 0.3)
                .with_term("normal", 0.25, 0.55, 0.75)
                .with_term("smooth", 0.6, 1.0, 1.0),
        )
        .consequent(
            LinguisticVariable::new(CONDITION, Universe::percent())
                .with_term("rotten", 0.0, 0.0, 40.0)
                .with_term("defect", 30.0, 55.0, 70.0)
                .with_term("good", 60.0, 100.0, 100.0),
        )
        .rule(is(COLOUR, "bright") & is(TEXTURE, "smooth"), "good")
        .rule(is(COLOUR, "normal") & is(TEXTURE, "normal"), "good")
        .rule(is(COLOUR, "dark") & is(TEXTURE, "smooth"), "defect")
        .rule(is(COLOUR, "normal") & is(TEXTURE, "rough"), "defect")
        .rule(is(COLOUR, "dark") & is(TEXTURE, "rough"), "rotten")
        .build()
}

/// Process-wide size rule base, compiled on first use
pub fn shared_size_rule_base() -> Arc<RuleBase> {
    static RULES: OnceLock<Arc<RuleBase>> = OnceLock::new();
    RULES
        .get_or_init(|| Arc::new(size_rule_base().expect("built-in size rule base is valid")))
        .clone()
}

/// Process-wide condition rule base, compiled on first use
pub fn shared_condition_rule_base() -> Arc<RuleBase> {
    static RULES: OnceLock<Arc<RuleBase>> = OnceLock::new();
    RULES
        .get_or_init(|| {
            Arc::new(condition_rule_base().expect("built-in condition rule base is valid"))
        })
        .clone()
}
