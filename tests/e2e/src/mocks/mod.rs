//! Test data generators

mod fixtures;

pub use fixtures::{DeckScenario, TestDataFactory};
