//! Mamdani fuzzy inference over discretized universes
//!
//! Inputs are fuzzified with triangular membership functions, rule strengths
//! come from `min`/`max` over the antecedent tree, consequent sets are
//! clipped by their rule's strength, aggregated by point-wise `max`, and the
//! result is defuzzified by its centroid. A rule base is compiled once and is
//! read-only afterwards; every evaluation owns its intermediate buffers.

pub mod engine;
pub mod membership;
pub mod presets;
pub mod rule;
pub mod variable;

pub use engine::{crisp_inputs, CrispInputs, Inference, RuleBase, RuleBaseBuilder};
pub use membership::{TriangularMf, Universe, DEFAULT_RESOLUTION};
pub use rule::{Expr, Rule};
pub use variable::{LinguisticVariable, Term};
