//! Parser for tree descriptions.

use super::ast::*;
use super::lexer::{parse_value, Lexer, Token, TokenKind};
use crate::error::{Result, WdfError};
use crate::tree::Quantity;

/// Parser for tree descriptions.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parse the entire description.
    pub fn parse(&mut self) -> Result<TreeAst> {
        let mut ast = TreeAst::new();

        loop {
            match self.current.kind {
                TokenKind::Newline => {
                    self.advance()?;
                    continue;
                }
                TokenKind::Eof => break,
                TokenKind::Directive => self.parse_directive(&mut ast)?,
                TokenKind::Identifier => {
                    let element = self.parse_element()?;
                    if ast.element(&element.name).is_some() {
                        return Err(WdfError::DuplicateName { name: element.name });
                    }
                    ast.elements.push(element);
                }
                _ => {
                    return Err(WdfError::parse(
                        self.current.line,
                        format!("unexpected token '{}'", self.current.text),
                    ));
                }
            }

            if !self.at_line_end() {
                return Err(WdfError::parse(
                    self.current.line,
                    format!("unexpected '{}' at end of line", self.current.text),
                ));
            }
        }

        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(WdfError::parse(
                self.current.line,
                format!("expected {:?}, got {:?}", kind, self.current.kind),
            ))
        }
    }

    fn at_line_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        self.current.kind == TokenKind::Identifier && self.current.text.eq_ignore_ascii_case(keyword)
    }

    fn expect_name(&mut self, what: &str) -> Result<String> {
        if self.current.kind != TokenKind::Identifier {
            return Err(WdfError::parse(
                self.current.line,
                format!("expected {what}, got '{}'", self.current.text),
            ));
        }
        Ok(self.expect(TokenKind::Identifier)?.text)
    }

    fn expect_value(&mut self, what: &str) -> Result<f64> {
        let line = self.current.line;
        if self.current.kind != TokenKind::Number {
            return Err(WdfError::parse(
                line,
                format!("expected {what}, got '{}'", self.current.text),
            ));
        }
        let text = self.expect(TokenKind::Number)?.text;
        parse_value(&text).ok_or_else(|| WdfError::parse(line, format!("invalid number: {text}")))
    }

    fn expect_index(&mut self) -> Result<usize> {
        let line = self.current.line;
        let text = self.current.text.clone();
        self.expect(TokenKind::Number)?;
        text.parse::<usize>()
            .map_err(|_| WdfError::parse(line, format!("expected a junction node number, got '{text}'")))
    }

    /// Names up to the end of the line or the `stop` keyword.
    fn parse_names(&mut self, stop: Option<&str>) -> Result<Vec<String>> {
        let mut names = Vec::new();
        while self.current.kind == TokenKind::Identifier {
            if stop.is_some_and(|s| self.is_keyword(s)) {
                break;
            }
            names.push(self.expect(TokenKind::Identifier)?.text);
        }
        Ok(names)
    }

    /// `key=value` pairs, keys lower-cased.
    fn parse_assignments(&mut self) -> Result<Vec<(String, f64)>> {
        let mut pairs = Vec::new();
        while self.current.kind == TokenKind::Identifier {
            let key = self.expect(TokenKind::Identifier)?.text.to_ascii_lowercase();
            self.expect(TokenKind::Equals)?;
            let value = self.expect_value("parameter value")?;
            pairs.push((key, value));
        }
        Ok(pairs)
    }

    fn parse_element(&mut self) -> Result<ElementDef> {
        let keyword = self.current.text.to_ascii_uppercase();
        let line = self.current.line;
        self.advance()?;
        let name = self.expect_name("element name")?;

        let kind = match keyword.as_str() {
            "R" => ElementKind::Resistor {
                r: self.expect_value("resistance")?,
            },
            "C" => ElementKind::Capacitor {
                c: self.expect_value("capacitance")?,
            },
            "L" => ElementKind::Inductor {
                l: self.expect_value("inductance")?,
            },
            "RV" => {
                let r = self.expect_value("source resistance")?;
                let vs = if self.current.kind == TokenKind::Number {
                    self.expect_value("source voltage")?
                } else {
                    0.0
                };
                ElementKind::ResistiveSource { r, vs }
            }
            "SER" => ElementKind::Series(self.parse_names(None)?),
            "PAR" => ElementKind::Parallel(self.parse_names(None)?),
            "INV" => ElementKind::Inverter(self.expect_name("child name")?),
            "RT" => {
                let junction = self.expect_name("junction name")?;
                ElementKind::Rtype {
                    junction,
                    children: self.parse_names(None)?,
                }
            }
            _ => {
                return Err(WdfError::parse(
                    line,
                    format!("unknown element type '{keyword}'"),
                ))
            }
        };

        Ok(ElementDef { name, kind, line })
    }

    fn parse_directive(&mut self, ast: &mut TreeAst) -> Result<()> {
        let directive = self.current.text.to_ascii_lowercase();
        let line = self.current.line;
        self.advance()?;

        match directive.as_str() {
            ".samplerate" => {
                ast.sample_rate = Some(self.expect_value("sample rate")?);
            }
            ".newton" => {
                for (key, value) in self.parse_assignments()? {
                    match key.as_str() {
                        "tol" | "tolerance" => ast.newton.tolerance = Some(value),
                        "maxiter" => {
                            if value < 0.0 || value.fract() != 0.0 {
                                return Err(WdfError::parse(
                                    line,
                                    format!("maxiter must be a whole number, got {value}"),
                                ));
                            }
                            ast.newton.max_iterations = Some(value as usize);
                        }
                        "damping" => ast.newton.damping = Some(value),
                        _ => {
                            return Err(WdfError::parse(
                                line,
                                format!("unknown .newton setting '{key}'"),
                            ))
                        }
                    }
                }
            }
            ".junction" => {
                let junction = self.parse_junction(line)?;
                if ast.junction(&junction.name).is_some() {
                    return Err(WdfError::DuplicateName {
                        name: junction.name,
                    });
                }
                ast.junctions.push(junction);
            }
            ".root" => {
                if ast.root.is_some() {
                    return Err(WdfError::parse(line, "a tree has exactly one .root"));
                }
                ast.root = Some(self.parse_root(line)?);
            }
            ".input" => {
                if ast.input.is_some() {
                    return Err(WdfError::parse(line, "duplicate .input"));
                }
                let input = if self.is_keyword("root") {
                    self.advance()?;
                    InputDef::Root { line }
                } else {
                    InputDef::Source {
                        name: self.expect_name("source name")?,
                        line,
                    }
                };
                ast.input = Some(input);
            }
            ".output" => {
                if ast.output.is_some() {
                    return Err(WdfError::parse(line, "duplicate .output"));
                }
                ast.output = Some(self.parse_output(line)?);
            }
            _ => {
                return Err(WdfError::parse(
                    line,
                    format!("unknown directive: {directive}"),
                ));
            }
        }

        Ok(())
    }

    fn parse_junction(&mut self, line: usize) -> Result<JunctionDef> {
        let name = self.expect_name("junction name")?;
        let mut ports = Vec::new();
        let mut resistors = Vec::new();

        while !self.at_line_end() {
            if self.is_keyword("res") {
                self.advance()?;
                self.expect(TokenKind::OpenParen)?;
                let p = self.expect_index()?;
                let n = self.expect_index()?;
                let r = self.expect_value("resistance")?;
                self.expect(TokenKind::CloseParen)?;
                resistors.push((p, n, r));
            } else {
                self.expect(TokenKind::OpenParen)?;
                let p = self.expect_index()?;
                let n = self.expect_index()?;
                self.expect(TokenKind::CloseParen)?;
                ports.push((p, n));
            }
        }

        if ports.is_empty() {
            return Err(WdfError::parse(line, format!("junction '{name}' has no ports")));
        }
        Ok(JunctionDef {
            name,
            ports,
            resistors,
            line,
        })
    }

    fn parse_root(&mut self, line: usize) -> Result<RootDef> {
        let variant = self.expect_name("root type")?.to_ascii_lowercase();
        let kind = match variant.as_str() {
            "simple" => {
                let subtree = self.expect_name("subtree name")?;
                RootDefKind::Simple {
                    subtree,
                    element: self.parse_root_element(line)?,
                }
            }
            "rtype" => {
                let junction = self.expect_name("junction name")?;
                RootDefKind::Rtype {
                    junction,
                    subtrees: self.parse_names(None)?,
                }
            }
            "nl" | "nonlinear" => {
                let junction = self.expect_name("junction name")?;
                let subtrees = self.parse_names(Some("with"))?;
                if !self.is_keyword("with") {
                    return Err(WdfError::parse(line, "nonlinear root needs 'with <model>...'"));
                }
                self.advance()?;
                let mut models = Vec::new();
                while self.current.kind == TokenKind::Identifier {
                    models.push(self.parse_model()?);
                }
                RootDefKind::Nonlinear {
                    junction,
                    subtrees,
                    models,
                }
            }
            _ => {
                return Err(WdfError::parse(
                    line,
                    format!("unknown root type '{variant}'"),
                ))
            }
        };
        Ok(RootDef { kind, line })
    }

    fn parse_root_element(&mut self, line: usize) -> Result<RootElementDef> {
        let element = self.expect_name("root element")?.to_ascii_lowercase();
        let optional_value = |parser: &mut Self, what: &str| -> Result<f64> {
            if parser.current.kind == TokenKind::Number {
                parser.expect_value(what)
            } else {
                Ok(0.0)
            }
        };
        Ok(match element.as_str() {
            "vsource" => RootElementDef::VoltageSource(optional_value(self, "voltage")?),
            "isource" => RootElementDef::CurrentSource(optional_value(self, "current")?),
            "res" => RootElementDef::Resistor(self.expect_value("resistance")?),
            "cap" => RootElementDef::Capacitor(self.expect_value("capacitance")?),
            "ind" => RootElementDef::Inductor(self.expect_value("inductance")?),
            "switch" => {
                let state = self.expect_name("'open' or 'closed'")?.to_ascii_lowercase();
                match state.as_str() {
                    "open" => RootElementDef::Switch(false),
                    "closed" => RootElementDef::Switch(true),
                    _ => {
                        return Err(WdfError::parse(
                            line,
                            format!("switch state must be 'open' or 'closed', got '{state}'"),
                        ))
                    }
                }
            }
            _ => {
                return Err(WdfError::parse(
                    line,
                    format!("unknown root element '{element}'"),
                ))
            }
        })
    }

    fn parse_model(&mut self) -> Result<ModelDef> {
        let line = self.current.line;
        let name = self.expect_name("model name")?;
        let mut params = Vec::new();

        if self.current.kind == TokenKind::OpenParen {
            self.advance()?;
            params = self.parse_assignments()?;
            self.expect(TokenKind::CloseParen)?;
        }

        Ok(ModelDef { name, params, line })
    }

    fn parse_output(&mut self, line: usize) -> Result<OutputDef> {
        let quantity = match self.expect_name("'voltage' or 'current'")?.to_ascii_lowercase().as_str() {
            "voltage" | "v" => Quantity::Voltage,
            "current" | "i" => Quantity::Current,
            other => {
                return Err(WdfError::parse(
                    line,
                    format!("output quantity must be 'voltage' or 'current', got '{other}'"),
                ))
            }
        };
        let node = self.expect_name("element name")?;

        let mut scale = 1.0;
        for (key, value) in self.parse_assignments()? {
            if key != "scale" {
                return Err(WdfError::parse(line, format!("unknown .output setting '{key}'")));
            }
            scale = value;
        }

        Ok(OutputDef {
            quantity,
            node,
            scale,
            line,
        })
    }
}
