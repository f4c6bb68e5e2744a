//! Register map generator library: reads register declarations and renders
//! a C header plus a Markdown register table.

use clap as _;
use simple_logger as _;

/// Generator settings and TOML loading.
pub mod config;
/// Top-level extract, parse, allocate, emit, render pipeline.
pub mod generate;
/// Tokenizer for C-style declarations.
pub mod lexer;
/// Region entry and struct definition parser.
pub mod parser;
/// Header and Markdown renderers.
pub mod render;
/// Source loading and literate Markdown extraction.
pub mod source;
