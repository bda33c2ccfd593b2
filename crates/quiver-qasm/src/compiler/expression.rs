//! Parameter expression parsing.
//!
//! ```text
//! exp    := ['-'] term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := atom ['^' factor]
//! atom   := real | int | pi | ident | '(' exp ')' | unaryop '(' exp ')'
//! ```
//!
//! Every node is built through the folding constructors on [`Expr`], so
//! constant subtrees never survive parsing.

use super::QasmCompiler;
use crate::error::{QasmError, QasmResult};
use crate::expr::{BinaryOp, Expr, UnaryFn};
use crate::lexer::Token;

#[allow(clippy::cast_precision_loss)]
impl QasmCompiler {
    pub(super) fn expression(&mut self) -> QasmResult<Expr> {
        let negated = self.consume(&Token::Minus);
        let mut lhs = self.term()?;
        if negated {
            lhs = Expr::negate(lhs);
        }

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn term(&mut self) -> QasmResult<Expr> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.factor()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    /// Exponentiation binds right: `2^3^2` is `2^(3^2)`.
    fn factor(&mut self) -> QasmResult<Expr> {
        let base = self.atom()?;
        if self.consume(&Token::Caret) {
            let exponent = self.factor()?;
            return Ok(Expr::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> QasmResult<Expr> {
        let Some(current) = self.advance() else {
            return Err(QasmError::UnexpectedEof("expression".into()));
        };

        let func = match current.token {
            Token::RealLiteral(v) => return Ok(Expr::number(v)),
            Token::IntLiteral(v) => return Ok(Expr::number(v as f64)),
            Token::Pi => return Ok(Expr::pi()),
            Token::Identifier(name) => return Ok(Expr::param(name)),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                return Ok(inner);
            }
            Token::Sin => UnaryFn::Sin,
            Token::Cos => UnaryFn::Cos,
            Token::Tan => UnaryFn::Tan,
            Token::Exp => UnaryFn::Exp,
            Token::Ln => UnaryFn::Ln,
            Token::Sqrt => UnaryFn::Sqrt,
            other => {
                return Err(QasmError::UnexpectedToken {
                    line: current.line,
                    column: current.column,
                    expected: "expression".into(),
                    found: other.to_string(),
                });
            }
        };

        self.expect(Token::LParen)?;
        let arg = self.expression()?;
        self.expect(Token::RParen)?;
        Ok(Expr::call(func, arg))
    }

    /// Comma-separated expressions up to (not including) the closing `)`.
    pub(super) fn expression_list(&mut self) -> QasmResult<Vec<Expr>> {
        let mut exprs = vec![self.expression()?];
        while self.consume(&Token::Comma) {
            exprs.push(self.expression()?);
        }
        Ok(exprs)
    }

    /// Optional `( exp, ... )` after a gate name.
    pub(super) fn parameter_list(&mut self) -> QasmResult<Vec<Expr>> {
        if !self.consume(&Token::LParen) {
            return Ok(Vec::new());
        }
        if self.consume(&Token::RParen) {
            return Ok(Vec::new());
        }
        let exprs = self.expression_list()?;
        self.expect(Token::RParen)?;
        Ok(exprs)
    }
}
