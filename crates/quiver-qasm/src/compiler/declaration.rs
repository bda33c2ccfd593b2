//! `gate` and `opaque` declarations.

use super::QasmCompiler;
use crate::catalog::{CompoundGate, GateTemplate};
use crate::error::{QasmError, QasmResult};
use crate::expr::Expr;
use crate::lexer::Token;

impl QasmCompiler {
    /// `gate name [( params )] args { body }`
    ///
    /// Calls to other gates inside the body are expanded right here, so the
    /// stored body only holds `U` and `CX` terms.
    pub(super) fn gate_decl(&mut self) -> QasmResult<()> {
        self.advance();
        let name = self.expect_identifier()?;
        let params = self.formal_parameters()?;
        let args = self.identifier_list()?;
        self.expect(Token::LBrace)?;

        let mut body = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBrace) => break,
                Some(Token::GateU) => {
                    self.advance();
                    self.expect(Token::LParen)?;
                    let theta = self.expression()?;
                    self.expect(Token::Comma)?;
                    let phi = self.expression()?;
                    self.expect(Token::Comma)?;
                    let lambda = self.expression()?;
                    self.expect(Token::RParen)?;
                    let target = self.formal_argument(&name, &args)?;
                    self.expect(Token::Semicolon)?;
                    for expr in [&theta, &phi, &lambda] {
                        check_parameters(&name, &params, expr)?;
                    }
                    body.push(GateTemplate::U {
                        theta,
                        phi,
                        lambda,
                        target,
                    });
                }
                Some(Token::GateCX) => {
                    self.advance();
                    let control = self.formal_argument(&name, &args)?;
                    self.expect(Token::Comma)?;
                    let target = self.formal_argument(&name, &args)?;
                    self.expect(Token::Semicolon)?;
                    body.push(GateTemplate::Cx { control, target });
                }
                Some(Token::Identifier(_)) => {
                    let callee = self.expect_identifier()?;
                    let actual_params = self.parameter_list()?;
                    for expr in &actual_params {
                        check_parameters(&name, &params, expr)?;
                    }
                    let mut actual_args = vec![self.formal_argument(&name, &args)?];
                    while self.consume(&Token::Comma) {
                        actual_args.push(self.formal_argument(&name, &args)?);
                    }
                    self.expect(Token::Semicolon)?;
                    body.extend(self.catalog.expand(&callee, &actual_params, &actual_args)?);
                }
                Some(Token::Barrier) => {
                    self.advance();
                    self.formal_argument(&name, &args)?;
                    while self.consume(&Token::Comma) {
                        self.formal_argument(&name, &args)?;
                    }
                    self.expect(Token::Semicolon)?;
                }
                _ => return Err(self.unexpected("gate body statement")),
            }
        }
        self.expect(Token::RBrace)?;

        self.catalog.declare(
            name,
            CompoundGate {
                params,
                args,
                body,
            },
        );
        Ok(())
    }

    /// `opaque name [( params )] args ;`
    pub(super) fn opaque_decl(&mut self) -> QasmResult<()> {
        self.advance();
        let name = self.expect_identifier()?;
        let params = self.formal_parameters()?;
        let args = self.identifier_list()?;
        self.expect(Token::Semicolon)?;
        self.catalog.declare_opaque(name, params.len(), args.len());
        Ok(())
    }

    fn formal_parameters(&mut self) -> QasmResult<Vec<String>> {
        if !self.consume(&Token::LParen) {
            return Ok(Vec::new());
        }
        if self.consume(&Token::RParen) {
            return Ok(Vec::new());
        }
        let params = self.identifier_list()?;
        self.expect(Token::RParen)?;
        Ok(params)
    }

    /// An identifier that must be one of the gate's formal arguments.
    fn formal_argument(&mut self, gate: &str, args: &[String]) -> QasmResult<String> {
        let name = self.expect_identifier()?;
        if args.contains(&name) {
            Ok(name)
        } else {
            Err(QasmError::UndefinedIdentifier {
                gate: gate.to_string(),
                name,
            })
        }
    }
}

fn check_parameters(gate: &str, params: &[String], expr: &Expr) -> QasmResult<()> {
    match expr.params().into_iter().find(|p| !params.iter().any(|f| f == p)) {
        Some(unknown) => Err(QasmError::UndefinedIdentifier {
            gate: gate.to_string(),
            name: unknown.to_string(),
        }),
        None => Ok(()),
    }
}
