//! Top-level statements and their execution.

use tracing::{debug, trace};

use super::QasmCompiler;
use crate::catalog::{ElementaryGate, GateApplication, RegRange};
use crate::error::{QasmError, QasmResult};
use crate::executor::Executor;
use crate::expr::Expr;
use crate::lexer::Token;

/// A quantum operation, parsed before it is run so that `if` can decide
/// whether to run it.
#[derive(Debug)]
enum Operation {
    Gates(Vec<ElementaryGate>),
    Measure {
        qubits: RegRange,
        creg: String,
        offset: usize,
    },
    Reset(RegRange),
}

impl QasmCompiler {
    pub(super) fn statement<E: Executor>(&mut self, executor: &mut E) -> Result<(), E::Error> {
        let Some(current) = self.lookahead.clone() else {
            return Ok(());
        };

        match current.token {
            Token::Qreg => self.qreg_decl(executor),
            Token::Creg => Ok(self.creg_decl()?),
            Token::GateU | Token::GateCX | Token::Identifier(_) | Token::Measure | Token::Reset => {
                let op = self.operation()?;
                self.execute(op, executor)
            }
            Token::Gate => Ok(self.gate_decl()?),
            Token::Opaque => Ok(self.opaque_decl()?),
            Token::Include => Ok(self.include()?),
            Token::Barrier => Ok(self.barrier()?),
            Token::If => self.conditional(executor),
            Token::Snapshot => self.snapshot(executor),
            Token::ShowProbabilities => {
                self.advance();
                self.expect(Token::Semicolon)?;
                executor.show_probabilities()
            }
            other => Err(QasmError::UnexpectedStatement {
                line: current.line,
                column: current.column,
                found: other.to_string(),
            }
            .into()),
        }
    }

    /// `qreg name [ size ] ;`
    fn qreg_decl<E: Executor>(&mut self, executor: &mut E) -> Result<(), E::Error> {
        self.advance();
        let (name, width) = self.register_decl()?;
        if self.qregs.contains_key(&name) {
            return Err(QasmError::DuplicateDeclaration(name).into());
        }

        let base = executor.num_qubits();
        executor.add_qubits(width, &name)?;
        debug!(register = %name, base, width, "declared quantum register");
        self.qregs.insert(name, RegRange { base, width });
        Ok(())
    }

    /// `creg name [ size ] ;`
    fn creg_decl(&mut self) -> QasmResult<()> {
        self.advance();
        let (name, width) = self.register_decl()?;
        if self.cregs.contains_key(&name) {
            return Err(QasmError::DuplicateDeclaration(name));
        }
        self.cregs.insert(name, vec![0; width]);
        Ok(())
    }

    fn register_decl(&mut self) -> QasmResult<(String, usize)> {
        let name = self.expect_identifier()?;
        self.expect(Token::LBracket)?;
        let width = self.expect_index()?;
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;
        Ok((name, width))
    }

    /// `include "path" ;`
    ///
    /// The file is pushed before the `;` is consumed, so the token after the
    /// `;` is already the first token of the included file.
    fn include(&mut self) -> QasmResult<()> {
        self.advance();
        let path = self.expect_string()?;
        self.lexer.push_file(&path)?;
        self.expect(Token::Semicolon)?;
        Ok(())
    }

    /// `barrier args ;` is checked and otherwise ignored.
    fn barrier(&mut self) -> QasmResult<()> {
        self.advance();
        self.qubit_arguments()?;
        self.expect(Token::Semicolon)?;
        Ok(())
    }

    /// `if ( creg == int ) op`
    fn conditional<E: Executor>(&mut self, executor: &mut E) -> Result<(), E::Error> {
        self.advance();
        self.expect(Token::LParen)?;
        let name = self.expect_identifier()?;
        self.expect(Token::EqEq)?;
        let expected = self.expect_int()?;
        self.expect(Token::RParen)?;

        let bits = self
            .cregs
            .get(&name)
            .ok_or_else(|| QasmError::UndefinedRegister(name.clone()))?;
        let value = register_value(bits);

        let op = self.operation()?;
        if value == expected {
            trace!(register = %name, value, "condition holds");
            self.execute(op, executor)
        } else {
            Ok(())
        }
    }

    /// `snapshot ( int ) [args] ;`
    fn snapshot<E: Executor>(&mut self, executor: &mut E) -> Result<(), E::Error> {
        self.advance();
        self.expect(Token::LParen)?;
        let label = self.expect_index()?;
        self.expect(Token::RParen)?;
        if !self.check(&Token::Semicolon) {
            self.qubit_arguments()?;
        }
        self.expect(Token::Semicolon)?;
        executor.snapshot(&label.to_string())
    }

    /// A gate call, `measure` or `reset`.
    fn operation(&mut self) -> QasmResult<Operation> {
        match self.peek() {
            Some(Token::GateU) => {
                self.advance();
                self.expect(Token::LParen)?;
                let theta = self.expression()?;
                self.expect(Token::Comma)?;
                let phi = self.expression()?;
                self.expect(Token::Comma)?;
                let lambda = self.expression()?;
                self.expect(Token::RParen)?;
                let target = self.qubit_argument()?;
                self.expect(Token::Semicolon)?;
                Ok(Operation::Gates(vec![ElementaryGate::U {
                    theta: constant(&theta)?,
                    phi: constant(&phi)?,
                    lambda: constant(&lambda)?,
                    target,
                }]))
            }
            Some(Token::GateCX) => {
                self.advance();
                let control = self.qubit_argument()?;
                self.expect(Token::Comma)?;
                let target = self.qubit_argument()?;
                self.expect(Token::Semicolon)?;
                Ok(Operation::Gates(vec![ElementaryGate::Cx { control, target }]))
            }
            Some(Token::Identifier(_)) => {
                let name = self.expect_identifier()?;
                let params = self.parameter_list()?;
                let args = self.qubit_arguments()?;
                self.expect(Token::Semicolon)?;
                let gates = self.catalog.instantiate(&name, &params, &args)?;
                Ok(Operation::Gates(gates))
            }
            Some(Token::Measure) => {
                self.advance();
                let qubits = self.qubit_argument()?;
                self.expect(Token::Arrow)?;
                let (creg, index) = self.classical_argument()?;
                self.expect(Token::Semicolon)?;

                let width = match index {
                    Some(_) => 1,
                    None => self.cregs.get(&creg).map_or(0, Vec::len),
                };
                if qubits.width != width {
                    return Err(QasmError::SizeMismatch {
                        operation: "measure".into(),
                        left: qubits.width,
                        right: width,
                    });
                }
                Ok(Operation::Measure {
                    qubits,
                    creg,
                    offset: index.unwrap_or(0),
                })
            }
            Some(Token::Reset) => {
                self.advance();
                let qubits = self.qubit_argument()?;
                self.expect(Token::Semicolon)?;
                Ok(Operation::Reset(qubits))
            }
            _ => Err(self.unexpected("gate, measure or reset")),
        }
    }

    fn execute<E: Executor>(&mut self, op: Operation, executor: &mut E) -> Result<(), E::Error> {
        match op {
            Operation::Gates(gates) => {
                for gate in &gates {
                    for application in gate.applications()? {
                        match application {
                            GateApplication::U {
                                theta,
                                phi,
                                lambda,
                                qubit,
                            } => executor.apply_u(theta, phi, lambda, qubit)?,
                            GateApplication::Cx { control, target } => {
                                executor.apply_cx(control, target)?;
                            }
                        }
                    }
                }
            }
            Operation::Measure {
                qubits,
                creg,
                offset,
            } => {
                for i in 0..qubits.width {
                    let bit = executor.measure(qubits.base + i)?;
                    if let Some(slot) = self
                        .cregs
                        .get_mut(&creg)
                        .and_then(|bits| bits.get_mut(offset + i))
                    {
                        *slot = bit;
                    }
                }
                self.intermediate_measurement = true;
            }
            Operation::Reset(qubits) => {
                for qubit in qubits.base..qubits.base + qubits.width {
                    executor.reset(qubit)?;
                }
                self.intermediate_measurement = true;
            }
        }
        Ok(())
    }

    /// `name` or `name [ index ]` of a quantum register.
    fn qubit_argument(&mut self) -> QasmResult<RegRange> {
        let name = self.expect_identifier()?;
        let register = self
            .qregs
            .get(&name)
            .copied()
            .ok_or_else(|| QasmError::UndefinedRegister(name.clone()))?;

        if !self.consume(&Token::LBracket) {
            return Ok(register);
        }
        let index = self.expect_index()?;
        self.expect(Token::RBracket)?;
        if index >= register.width {
            return Err(QasmError::IndexOutOfBounds {
                register: name,
                index,
                size: register.width,
            });
        }
        Ok(RegRange::single(register.base + index))
    }

    fn qubit_arguments(&mut self) -> QasmResult<Vec<RegRange>> {
        let mut args = vec![self.qubit_argument()?];
        while self.consume(&Token::Comma) {
            args.push(self.qubit_argument()?);
        }
        Ok(args)
    }

    /// `name` or `name [ index ]` of a classical register.
    fn classical_argument(&mut self) -> QasmResult<(String, Option<usize>)> {
        let name = self.expect_identifier()?;
        let size = self
            .cregs
            .get(&name)
            .map(Vec::len)
            .ok_or_else(|| QasmError::UndefinedRegister(name.clone()))?;

        if !self.consume(&Token::LBracket) {
            return Ok((name, None));
        }
        let index = self.expect_index()?;
        self.expect(Token::RBracket)?;
        if index >= size {
            return Err(QasmError::IndexOutOfBounds {
                register: name,
                index,
                size,
            });
        }
        Ok((name, Some(index)))
    }
}

/// Angles of a top-level `U` must not mention parameters.
fn constant(expr: &Expr) -> QasmResult<f64> {
    expr.value().ok_or_else(|| QasmError::UnboundParameter {
        gate: "U".into(),
        name: expr.params().into_iter().next().unwrap_or_default().to_string(),
    })
}

/// Little-endian value of a classical register: bit 0 is the least
/// significant. Bits beyond the 64th are ignored.
fn register_value(bits: &[u8]) -> u64 {
    bits.iter()
        .take(64)
        .enumerate()
        .fold(0, |acc, (i, &bit)| acc | (u64::from(bit & 1) << i))
}
