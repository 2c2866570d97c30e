//! Block programs: the instruction trees a player composes, and the
//! interpreter that runs them one step unit at a time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::ProgramError;
use engine::stepper::{ExecutionState, Marker, Rotation, StepProgram, ThingAhead};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_EVALUATIONS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "block", rename_all = "snake_case")]
pub enum Statement {
    IncCounter,
    Mark {
        marker: Marker,
    },
    MoveForward,
    Turn {
        direction: Rotation,
    },
    StepBack,
    If {
        condition: Expr,
        #[serde(default)]
        then: Vec<Statement>,
        #[serde(default, rename = "else")]
        otherwise: Vec<Statement>,
    },
    Repeat {
        times: u32,
        #[serde(default)]
        body: Vec<Statement>,
    },
    While {
        condition: Expr,
        #[serde(default)]
        body: Vec<Statement>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "block", rename_all = "snake_case")]
pub enum Expr {
    Counter,
    Number { value: i64 },
    Bool { value: bool },
    /// True when `thing` is what lies one cell ahead.
    Inspect { thing: ThingAhead },
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Not { operand: Box<Expr> },
    And { lhs: Box<Expr>, rhs: Box<Expr> },
    Or { lhs: Box<Expr>, rhs: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Number(i64),
    Bool(bool),
}

impl Value {
    fn type_name(self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
        }
    }

    fn as_bool(self, context: &str) -> Result<bool, ProgramError> {
        match self {
            Value::Bool(value) => Ok(value),
            Value::Number(_) => Err(ProgramError::TypeMismatch(format!(
                "{context} expects a boolean, got a number"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub name: String,
    pub body: Vec<Statement>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read program {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid program json")]
    Json(#[from] serde_json::Error),
}

impl Program {
    pub fn new(name: impl Into<String>, body: Vec<Statement>) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Wall-follower with backtracking: try each of the four sides once,
    /// then give the cell up as a dead end and step back.
    pub fn depth_first() -> Self {
        use Statement::*;

        Program::new(
            "depth-first",
            vec![If {
                condition: Expr::Compare {
                    op: CompareOp::Lt,
                    lhs: Box::new(Expr::Counter),
                    rhs: Box::new(Expr::Number { value: 4 }),
                },
                then: vec![If {
                    condition: Expr::Inspect {
                        thing: ThingAhead::Open,
                    },
                    then: vec![MoveForward],
                    otherwise: vec![
                        IncCounter,
                        Turn {
                            direction: Rotation::Right,
                        },
                    ],
                }],
                otherwise: vec![
                    Mark {
                        marker: Marker::Blocked,
                    },
                    StepBack,
                ],
            }],
        )
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new("empty", Vec::new())
    }
}

/// Runs a [`Program`] as a step unit: from the top until the first
/// advancing statement, which acts and ends the unit.
#[derive(Debug, Clone)]
pub struct BlockInterpreter {
    program: Program,
    max_evaluations: usize,
}

impl BlockInterpreter {
    pub fn new(program: Program) -> Self {
        Self::with_limit(program, DEFAULT_MAX_EVALUATIONS)
    }

    pub fn with_limit(program: Program, max_evaluations: usize) -> Self {
        Self {
            program,
            max_evaluations,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }
}

impl StepProgram for BlockInterpreter {
    fn step(&mut self, state: &mut ExecutionState) -> Result<(), ProgramError> {
        let mut unit = Unit {
            state,
            limit: self.max_evaluations,
            evaluations: 0,
        };
        unit.block(&self.program.body).map(|_| ())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Yield,
}

struct Unit<'a> {
    state: &'a mut ExecutionState,
    limit: usize,
    evaluations: usize,
}

impl Unit<'_> {
    fn charge(&mut self) -> Result<(), ProgramError> {
        self.evaluations += 1;
        if self.evaluations > self.limit {
            return Err(ProgramError::StepLimitExceeded { limit: self.limit });
        }
        Ok(())
    }

    fn block(&mut self, statements: &[Statement]) -> Result<Flow, ProgramError> {
        for statement in statements {
            if self.statement(statement)? == Flow::Yield {
                return Ok(Flow::Yield);
            }
        }
        Ok(Flow::Next)
    }

    fn statement(&mut self, statement: &Statement) -> Result<Flow, ProgramError> {
        self.charge()?;
        match statement {
            Statement::IncCounter => self.state.increase_counter(),
            Statement::Mark { marker } => self.state.mark(*marker),
            Statement::MoveForward => {
                self.state.move_forward();
                return Ok(Flow::Yield);
            }
            Statement::Turn { direction } => {
                self.state.turn(*direction);
                return Ok(Flow::Yield);
            }
            Statement::StepBack => {
                self.state.step_back();
                return Ok(Flow::Yield);
            }
            Statement::If {
                condition,
                then,
                otherwise,
            } => {
                let branch = if self.eval(condition)?.as_bool("if")? {
                    then
                } else {
                    otherwise
                };
                return self.block(branch);
            }
            Statement::Repeat { times, body } => {
                for _ in 0..*times {
                    self.charge()?;
                    if self.block(body)? == Flow::Yield {
                        return Ok(Flow::Yield);
                    }
                }
            }
            Statement::While { condition, body } => {
                while self.eval(condition)?.as_bool("while")? {
                    if self.block(body)? == Flow::Yield {
                        return Ok(Flow::Yield);
                    }
                }
            }
        }
        Ok(Flow::Next)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ProgramError> {
        self.charge()?;
        Ok(match expr {
            Expr::Counter => Value::Number(i64::from(self.state.counter())),
            Expr::Number { value } => Value::Number(*value),
            Expr::Bool { value } => Value::Bool(*value),
            Expr::Inspect { thing } => Value::Bool(self.state.thing_ahead() == *thing),
            Expr::Compare { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                Value::Bool(compare(*op, lhs, rhs)?)
            }
            Expr::Not { operand } => Value::Bool(!self.eval(operand)?.as_bool("not")?),
            Expr::And { lhs, rhs } => {
                Value::Bool(self.eval(lhs)?.as_bool("and")? && self.eval(rhs)?.as_bool("and")?)
            }
            Expr::Or { lhs, rhs } => {
                Value::Bool(self.eval(lhs)?.as_bool("or")? || self.eval(rhs)?.as_bool("or")?)
            }
        })
    }
}

fn compare(op: CompareOp, lhs: Value, rhs: Value) -> Result<bool, ProgramError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(match op {
            CompareOp::Eq => a == b,
            CompareOp::Neq => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Lte => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Gte => a >= b,
        }),
        (Value::Bool(a), Value::Bool(b)) => match op {
            CompareOp::Eq => Ok(a == b),
            CompareOp::Neq => Ok(a != b),
            _ => Err(ProgramError::TypeMismatch(format!(
                "cannot order booleans with {op:?}"
            ))),
        },
        (lhs, rhs) => Err(ProgramError::TypeMismatch(format!(
            "cannot compare {} with {}",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}
