//! # saldo
//!
//! saldo is a parsing and registry engine for plain-text ledger files: it
//! reads directive files, resolves `include` references between them, and
//! folds everything into an immutable [`Ledger`] of options, accounts, and
//! commodities.
//!
//! The recognized directive grammar is documented in the repository README
//! and is stable: ledger files are a persisted format.
#![doc(html_root_url = "https://docs.rs/saldo/0.1.0")]

mod checker;
mod ledger;
mod options;
pub mod parse;

pub use ledger::*;
