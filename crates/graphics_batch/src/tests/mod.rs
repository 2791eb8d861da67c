//! Cross-module tests for batch storage

mod batch_scenarios;
