//! Text description language for WDF trees.
//!
//! Descriptions are line oriented. Elements are declared children first,
//! then a single `.root` line closes the tree.
//!
//! # Grammar Overview
//!
//! ```text
//! tree        = { line }
//! line        = comment | directive | element | empty
//! comment     = ('#' | ';') { any_char }
//! element     = type name { argument }
//! directive   = '.' directive_name { argument }
//!
//! value       = number [unit_suffix]
//! number      = ['-'|'+'] digit+ ['.' digit+] [('e'|'E') ['-'|'+'] digit+]
//! unit_suffix = 'p' | 'n' | 'u' | 'm' | 'k' | 'M' | 'G'
//! ```
//!
//! # Elements
//!
//! | Type | Description | Syntax |
//! |------|-------------|--------|
//! | R | Resistor | `R <name> <ohms>` |
//! | C | Capacitor | `C <name> <farads>` |
//! | L | Inductor | `L <name> <henries>` |
//! | RV | Resistive voltage source | `RV <name> <ohms> [volts]` |
//! | SER | Series adaptor | `SER <name> <child>...` |
//! | PAR | Parallel adaptor | `PAR <name> <child>...` |
//! | INV | Polarity inverter | `INV <name> <child>` |
//! | RT | R-type adaptor | `RT <name> <junction> <child>...` |
//!
//! # Directives
//!
//! | Directive | Syntax |
//! |-----------|--------|
//! | .samplerate | `.samplerate <hz>` |
//! | .newton | `.newton [tol=<v>] [maxiter=<n>] [damping=<d>]` |
//! | .junction | `.junction <name> (<p> <n>)... [res(<p> <n> <ohms>)]...` |
//! | .root | `.root simple <subtree> vsource [v] \| isource [i] \| res <r> \| cap <c> \| ind <l> \| switch open\|closed` |
//! |  | `.root rtype <junction> <subtree>...` |
//! |  | `.root nl <junction> <subtree>... with <model>[(<key>=<value>...)]...` |
//! | .input | `.input <source>` or `.input root` |
//! | .output | `.output voltage\|current <element> [scale=<k>]` |
//!
//! Junction port 0 of an `RT` adaptor is its parent port; port `k` is the
//! `k`-th child. Root junction ports are the subtrees in order followed by
//! the ports of each model in order.
//!
//! # Example
//!
//! ```text
//! # Diode clipper
//! RV  VIN 1k
//! C   C1  10n
//! PAR P1  VIN C1
//! .junction J1 (1 0) (1 0)
//! .root nl J1 P1 with diode_pair
//! .input VIN
//! .output voltage C1
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::Result;

/// Parse a tree description into an AST.
pub fn parse(input: &str) -> Result<TreeAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

/// Parse a tree description file.
#[cfg(feature = "cli")]
pub fn parse_file(path: &std::path::Path) -> Result<TreeAst> {
    let content = std::fs::read_to_string(path).map_err(|e| crate::error::WdfError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}
