//! stockfit: a stock and strategy compatibility scanner.
//!
//! Backtests a fixed set of strategies over each listed stock, scores how well
//! each stock suits each strategy, flags stocks approaching an entry signal and
//! publishes the results as a static site.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod logging;
pub mod ports;
