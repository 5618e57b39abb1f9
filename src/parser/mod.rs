//! Sketch text handling
//!
//! This module turns sketch source into the flat line lists the interpreter
//! executes:
//! - [`source`]: comment stripping, `setup()`/`loop()` extraction, logical
//!   line splitting and the global declaration scan
//! - [`statement`]: classification of each logical line into a [`Statement`]
//! - [`blocks`]: brace matching used to carve block bodies out of a body
//!
//! # Supported Sketch Subset
//!
//! - Entry points: `void setup() { ... }` and `void loop() { ... }`
//! - Board calls: `pinMode`, `digitalWrite`, `digitalRead`, `delay`, `millis`
//! - Integer variables: typed declarations, assignment, `++`/`--`, `op=`
//! - Control flow: `if`/`else if`/`else`, `for`, `while`, `switch`, `break`
//! - `#define NAME value` as a global constant
//!
//! Anything else (`Serial`, `analogWrite`, user functions) is skipped.
//!
//! # Parser Implementation
//!
//! There is no syntax tree. Each logical line is classified on its own, and
//! block structure is recovered at run time by brace matching over the line
//! list.

pub mod blocks;
pub mod source;
pub mod statement;

pub use source::{parse_sketch, Sketch, SourceLine};
pub use statement::{CompoundOp, Statement};
