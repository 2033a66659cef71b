//! examples of usage of RustedCompMath
/// one example per engine component
pub mod engine_examples;
