//! # symgen
//!
//! The semantic core of a compiler front end: symbols which complete their
//! semantic facts lazily (and safely under concurrent access), and a source
//! generator pipeline which lets plugins contribute syntax to a compilation
//! before symbol binding sees it.
//!
//! The usual entry point is [`Pipeline`]: give it a [`Compilation`] and some
//! [`SourceGenerator`]s, then [bind](Pipeline::bind) to get a [`SymbolTable`]
//! whose facts are computed on demand.

// Common //////////////////////////////////////////////////////////////////////
pub mod diag;
pub mod error;
pub mod lines;
pub mod setup;
pub mod syntax;
// Core ////////////////////////////////////////////////////////////////////////
pub mod compilation;
pub mod generator;
pub mod pipeline;
pub mod sym;


use std::hash::BuildHasherDefault;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;

pub use self::{
	compilation::{Compilation, SourceFile},
	diag::{Diagnostic, Severity},
	error::Error,
	generator::{
		context::{ExecutionContext, InitializationContext},
		driver::GeneratorDriver,
		SourceGenerator,
	},
	pipeline::{Phase, Pipeline},
	setup::Config,
	sym::{completion::CompletionPart, param::Parameter, Symbol, SymbolTable},
};

pub type ErrorBox = Box<dyn std::error::Error + Send + Sync>;
/// What a [`SourceGenerator`] returns from its callbacks.
pub type UnitResult = Result<(), ErrorBox>;
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;
pub type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;
