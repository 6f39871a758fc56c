//! The frontend hands trees over as JSON objects of the form
//! `{"kind": .., "value": .., "line": .., "children": [..]}`.

use crate::{BinOp, Command, LogicOp, Node, NodeKind, Number, RelOp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    pub kind: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub children: Vec<RawNode>,
}

#[derive(Debug, Error)]
pub enum AstError {
    #[error("unrecognized node kind `{kind}` (line {line})")]
    UnknownKind { kind: String, line: u32 },
    #[error("malformed `{kind}` node (line {line}): {reason}")]
    Malformed {
        kind: String,
        line: u32,
        reason: String,
    },
    #[error("invalid AST json: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn from_json(src: &str) -> Result<Node, AstError> {
    let raw: RawNode = serde_json::from_str(src)?;
    Node::try_from(raw)
}

pub fn to_json(node: &Node) -> Result<String, AstError> {
    Ok(serde_json::to_string_pretty(&RawNode::from(node))?)
}

impl RawNode {
    fn malformed(&self, reason: impl Into<String>) -> AstError {
        AstError::Malformed {
            kind: self.kind.clone(),
            line: self.line,
            reason: reason.into(),
        }
    }

    fn expect_children(&self, counts: &[usize]) -> Result<(), AstError> {
        if counts.contains(&self.children.len()) {
            Ok(())
        } else {
            Err(self.malformed(format!(
                "expected {} children, found {}",
                counts
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(" or "),
                self.children.len()
            )))
        }
    }

    fn value_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }

    /// Names come either as the node's value or as a leading `ID` child.
    fn ident_child(&self, index: usize) -> Result<String, AstError> {
        match self.children.get(index) {
            Some(RawNode {
                kind,
                value: Some(Value::String(name)),
                ..
            }) if kind == "ID" => Ok(name.clone()),
            _ => Err(self.malformed(format!("child {index} must be an identifier"))),
        }
    }
}

fn convert_all(children: Vec<RawNode>) -> Result<Vec<Node>, AstError> {
    children.into_iter().map(Node::try_from).collect()
}

fn boxed(raw: RawNode) -> Result<Box<Node>, AstError> {
    Node::try_from(raw).map(Box::new)
}

/// Several statements in a body position become one statement list.
fn body(line: u32, mut children: Vec<Node>) -> Node {
    if children.len() == 1 {
        children.pop().unwrap_or_else(|| Node::empty(line))
    } else {
        Node::new(NodeKind::Stmts(children), line)
    }
}

fn command_of(kind: &str) -> Option<Command> {
    use Command::*;
    Some(match kind {
        "AV" => Forward,
        "RE" => Back,
        "GD" => Right,
        "GI" => Left,
        "PONPOS" | "PONXY" => SetPos,
        "PONX" => SetX,
        "PONY" => SetY,
        "PONRUMBO" => SetHeading,
        "RUMBO" => Heading,
        "BL" => PenDown,
        "SB" => PenUp,
        "OT" => HideTurtle,
        "CENTRO" => Center,
        "PONCL" => SetColor,
        "ESPERA" => Wait,
        _ => return None,
    })
}

fn rel_op_of(s: &str) -> Option<RelOp> {
    match s.to_ascii_uppercase().as_str() {
        "IGUALES" | "IGUALES?" | "==" => Some(RelOp::Eq),
        "MENORQ" | "MENORQUE?" | "<" => Some(RelOp::Lt),
        "MAYORQ" | "MAYORQUE?" | ">" => Some(RelOp::Gt),
        _ => None,
    }
}

fn logic_op_of(s: &str) -> Option<LogicOp> {
    match s.to_ascii_uppercase().as_str() {
        "Y" | "AND" => Some(LogicOp::And),
        "O" | "OR" => Some(LogicOp::Or),
        _ => None,
    }
}

impl TryFrom<RawNode> for Node {
    type Error = AstError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let line = raw.line;
        let kind = match raw.kind.as_str() {
            "PROGRAM" => NodeKind::Program(Box::new(body(line, convert_all(raw.children)?))),
            "STMTS" => NodeKind::Stmts(convert_all(raw.children)?),
            "HAZ" => return Ok(body(line, convert_all(raw.children)?)),
            "EMPTY" => NodeKind::Empty,
            "NUM" => {
                let n = match &raw.value {
                    Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
                        (Some(i), _) => Number::Int(i),
                        (None, Some(f)) => Number::Float(f),
                        _ => return Err(raw.malformed("number out of range")),
                    },
                    _ => return Err(raw.malformed("value must be a number")),
                };
                NodeKind::Num(n)
            }
            "BOOL" => match raw.value {
                Some(Value::Bool(b)) => NodeKind::Bool(b),
                _ => return Err(raw.malformed("value must be a boolean")),
            },
            "STR" => match raw.value {
                Some(Value::String(s)) => NodeKind::Str(s),
                _ => return Err(raw.malformed("value must be a string")),
            },
            "ID" => match raw.value {
                Some(Value::String(s)) => NodeKind::Ident(s),
                _ => return Err(raw.malformed("value must be a string")),
            },
            "BINOP" | "SUMA" | "DIFERENCIA" | "PRODUCTO" | "DIVISION" => {
                raw.expect_children(&[2])?;
                let op = match (raw.kind.as_str(), raw.value_str()) {
                    ("SUMA", _) | (_, Some("+")) => BinOp::Add,
                    ("DIFERENCIA", _) | (_, Some("-")) => BinOp::Sub,
                    ("PRODUCTO", _) | (_, Some("*")) => BinOp::Mul,
                    ("DIVISION", _) | (_, Some("/")) => BinOp::Div,
                    _ => return Err(raw.malformed("unknown arithmetic operator")),
                };
                let [lhs, rhs] = two(raw.children);
                NodeKind::Binary {
                    op,
                    lhs: boxed(lhs)?,
                    rhs: boxed(rhs)?,
                }
            }
            "POW" | "POTENCIA" => {
                raw.expect_children(&[2])?;
                let [base, exponent] = two(raw.children);
                NodeKind::Pow {
                    base: boxed(base)?,
                    exponent: boxed(exponent)?,
                }
            }
            "NEG" => {
                raw.expect_children(&[1])?;
                NodeKind::Neg(boxed(one(raw.children))?)
            }
            "BOOLBIN" | "Y" | "O" => {
                raw.expect_children(&[2])?;
                let op = logic_op_of(raw.value_str().unwrap_or(raw.kind.as_str()))
                    .ok_or_else(|| raw.malformed("unknown boolean operator"))?;
                let [lhs, rhs] = two(raw.children);
                NodeKind::Logic {
                    op,
                    lhs: boxed(lhs)?,
                    rhs: boxed(rhs)?,
                }
            }
            "RELOP" | "IGUALES" | "MENORQ" | "MAYORQ" => {
                raw.expect_children(&[2])?;
                let op = rel_op_of(raw.value_str().unwrap_or(raw.kind.as_str()))
                    .ok_or_else(|| raw.malformed("unknown relational operator"))?;
                let [lhs, rhs] = two(raw.children);
                NodeKind::Relation {
                    op,
                    lhs: boxed(lhs)?,
                    rhs: boxed(rhs)?,
                }
            }
            "INIC" => {
                raw.expect_children(&[2])?;
                let name = raw.ident_child(0)?;
                let [_, value] = two(raw.children);
                NodeKind::Init {
                    name,
                    value: boxed(value)?,
                }
            }
            "INC" => {
                raw.expect_children(&[1, 2])?;
                let name = raw.ident_child(0)?;
                let by = raw.children.into_iter().nth(1).map(boxed).transpose()?;
                NodeKind::Inc { name, by }
            }
            "SI" => {
                raw.expect_children(&[2, 3])?;
                let mut it = raw.children.into_iter();
                let (condition, then_branch) = (next(&mut it)?, next(&mut it)?);
                NodeKind::If {
                    condition,
                    then_branch,
                    else_branch: it.next().map(boxed).transpose()?,
                }
            }
            "MIENTRAS" => {
                raw.expect_children(&[2])?;
                let [condition, body] = two(raw.children);
                NodeKind::While {
                    condition: boxed(condition)?,
                    body: boxed(body)?,
                }
            }
            "REPITE" => {
                raw.expect_children(&[2])?;
                let [count, body] = two(raw.children);
                NodeKind::Repeat {
                    count: boxed(count)?,
                    body: boxed(body)?,
                }
            }
            "HAZ_HASTA" | "HAZ_MIENTRAS" => {
                raw.expect_children(&[2])?;
                let until = raw.kind == "HAZ_HASTA";
                let [body, condition] = two(raw.children);
                let (body, condition) = (boxed(body)?, boxed(condition)?);
                if until {
                    NodeKind::DoUntil { body, condition }
                } else {
                    NodeKind::DoWhile { body, condition }
                }
            }
            "PARA" => {
                raw.expect_children(&[4])?;
                let var = raw.ident_child(0)?;
                let mut it = raw.children.into_iter().skip(1);
                NodeKind::For {
                    var,
                    from: next(&mut it)?,
                    to: next(&mut it)?,
                    body: next(&mut it)?,
                }
            }
            "PROC" => {
                let name = raw
                    .value_str()
                    .ok_or_else(|| raw.malformed("procedure needs a name"))?
                    .to_string();
                let mut children = raw.children;
                let params = match children.first() {
                    Some(p) if p.kind == "PARAMS" => {
                        let p = children.remove(0);
                        (0..p.children.len())
                            .map(|i| p.ident_child(i))
                            .collect::<Result<Vec<_>, _>>()?
                    }
                    _ => Vec::new(),
                };
                NodeKind::ProcDef {
                    name,
                    params,
                    body: Box::new(body(line, convert_all(children)?)),
                }
            }
            "CALL" | "EJECUTA" => {
                let mut children = raw.children;
                let name = match raw.value {
                    Some(Value::String(name)) => name,
                    _ => match children.first() {
                        Some(RawNode {
                            kind,
                            value: Some(Value::String(name)),
                            ..
                        }) if kind == "ID" => {
                            let name = name.clone();
                            children.remove(0);
                            name
                        }
                        _ => {
                            return Err(AstError::Malformed {
                                kind: raw.kind.clone(),
                                line,
                                reason: "call needs a procedure name".to_string(),
                            })
                        }
                    },
                };
                NodeKind::Call {
                    name,
                    args: convert_all(children)?,
                }
            }
            "AZAR" => {
                raw.expect_children(&[1])?;
                NodeKind::Random(boxed(one(raw.children))?)
            }
            k => match command_of(k) {
                Some(command) => {
                    raw.expect_children(&[command.arity()])?;
                    NodeKind::Command {
                        command,
                        args: convert_all(raw.children)?,
                    }
                }
                None => {
                    return Err(AstError::UnknownKind {
                        kind: raw.kind.clone(),
                        line,
                    })
                }
            },
        };
        Ok(Node::new(kind, line))
    }
}

fn one(children: Vec<RawNode>) -> RawNode {
    let [a]: [RawNode; 1] = children
        .try_into()
        .unwrap_or_else(|_| unreachable!("arity checked by the caller"));
    a
}

fn two(children: Vec<RawNode>) -> [RawNode; 2] {
    children
        .try_into()
        .unwrap_or_else(|_| unreachable!("arity checked by the caller"))
}

fn next(it: &mut impl Iterator<Item = RawNode>) -> Result<Box<Node>, AstError> {
    boxed(it.next().unwrap_or_else(|| unreachable!("arity checked by the caller")))
}

fn leaf(kind: &str, value: Value, line: u32) -> RawNode {
    RawNode {
        kind: kind.to_string(),
        value: Some(value),
        line,
        children: Vec::new(),
    }
}

impl From<&Node> for RawNode {
    fn from(node: &Node) -> Self {
        use NodeKind::*;
        let line = node.line;
        let ident = |name: &str| leaf("ID", Value::from(name), line);
        let (value, children): (Option<Value>, Vec<RawNode>) = match &node.kind {
            Num(Number::Int(i)) => (Some(Value::from(*i)), Vec::new()),
            Num(Number::Float(f)) => (Some(Value::from(*f)), Vec::new()),
            Bool(b) => (Some(Value::from(*b)), Vec::new()),
            Str(s) | Ident(s) => (Some(Value::from(s.as_str())), Vec::new()),
            Binary { op, .. } => (Some(Value::from(op.symbol())), Vec::new()),
            Logic { op, .. } => (Some(Value::from(op.keyword())), Vec::new()),
            Relation { op, .. } => (Some(Value::from(op.keyword())), Vec::new()),
            Init { name, .. } | Inc { name, .. } => (None, vec![ident(name)]),
            For { var, .. } => (None, vec![ident(var)]),
            ProcDef { name, params, .. } => (
                Some(Value::from(name.as_str())),
                vec![RawNode {
                    kind: "PARAMS".to_string(),
                    value: None,
                    line,
                    children: params.iter().map(|p| ident(p)).collect(),
                }],
            ),
            Call { name, .. } => (Some(Value::from(name.as_str())), Vec::new()),
            _ => (None, Vec::new()),
        };
        let mut children = children;
        children.extend(node.children().into_iter().map(RawNode::from));
        RawNode {
            kind: node.kind_name().to_string(),
            value,
            line,
            children,
        }
    }
}
