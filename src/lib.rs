//! gibbs - factor algebra and exact inference over discrete probabilistic
//! graphical models.
//!
//! A model is a set of [`factor::Factor`]s over discrete
//! [`variable::Variable`]s. The [`factor`] module provides the complete
//! factor algebra (evaluation, product, evidence reduction, sum-out and
//! max-out projection); [`ordering`] computes greedy elimination orderings
//! over the interaction graph; [`inference`] runs sum-product and
//! max-product variable elimination on top of both.
//!
//! The algorithms follow Koller & Friedman, *Probabilistic Graphical
//! Models: Principles and Techniques* (2009).

pub mod factor;
pub mod inference;
pub mod ordering;
pub mod util;
pub mod variable;

pub use util::{GibbsError, Result};
