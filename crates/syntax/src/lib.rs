mod json;
mod pretty;

pub use json::{from_json, to_json, AstError, RawNode};
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Program(Box<Node>),
    Stmts(Vec<Node>),
    /// No operation. Only valid where a statement is expected.
    Empty,
    Num(Number),
    Bool(bool),
    Str(String),
    Ident(String),
    Binary {
        op: BinOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Pow {
        base: Box<Node>,
        exponent: Box<Node>,
    },
    Neg(Box<Node>),
    Logic {
        op: LogicOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Relation {
        op: RelOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Command {
        command: Command,
        args: Vec<Node>,
    },
    Init {
        name: String,
        value: Box<Node>,
    },
    Inc {
        name: String,
        by: Option<Box<Node>>,
    },
    If {
        condition: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    Repeat {
        count: Box<Node>,
        body: Box<Node>,
    },
    DoUntil {
        body: Box<Node>,
        condition: Box<Node>,
    },
    DoWhile {
        body: Box<Node>,
        condition: Box<Node>,
    },
    For {
        var: String,
        from: Box<Node>,
        to: Box<Node>,
        body: Box<Node>,
    },
    ProcDef {
        name: String,
        params: Vec<String>,
        body: Box<Node>,
    },
    Call {
        name: String,
        args: Vec<Node>,
    },
    Random(Box<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    Eq,
    Lt,
    Gt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Forward,
    Back,
    Right,
    Left,
    SetPos,
    SetX,
    SetY,
    SetHeading,
    Heading,
    PenDown,
    PenUp,
    HideTurtle,
    Center,
    SetColor,
    Wait,
}

impl Node {
    pub fn new(kind: NodeKind, line: u32) -> Self {
        Node { kind, line }
    }

    pub fn empty(line: u32) -> Self {
        Node::new(NodeKind::Empty, line)
    }

    pub fn int(value: i64, line: u32) -> Self {
        Node::new(NodeKind::Num(Number::Int(value)), line)
    }

    pub fn boolean(value: bool, line: u32) -> Self {
        Node::new(NodeKind::Bool(value), line)
    }

    pub fn ident(name: impl Into<String>, line: u32) -> Self {
        Node::new(NodeKind::Ident(name.into()), line)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, NodeKind::Empty)
    }

    pub fn as_number(&self) -> Option<Number> {
        match self.kind {
            NodeKind::Num(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Boolean literals, and the numeric literals 0 and 1.
    pub fn as_bool_constant(&self) -> Option<bool> {
        match self.kind {
            NodeKind::Bool(b) => Some(b),
            NodeKind::Num(n) => match n.to_i32() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            _ => None,
        }
    }

    /// Same bare identifier on both sides. Compound expressions never match.
    pub fn same_ident(&self, other: &Node) -> bool {
        matches!((self.as_ident(), other.as_ident()), (Some(a), Some(b)) if a == b)
    }

    pub fn children(&self) -> Vec<&Node> {
        use NodeKind::*;
        match &self.kind {
            Program(body) => vec![&**body],
            Stmts(nodes) | Command { args: nodes, .. } | Call { args: nodes, .. } => {
                nodes.iter().collect()
            }
            Empty | Num(_) | Bool(_) | Str(_) | Ident(_) => Vec::new(),
            Binary { lhs, rhs, .. } | Logic { lhs, rhs, .. } | Relation { lhs, rhs, .. } => {
                vec![&**lhs, &**rhs]
            }
            Pow { base, exponent } => vec![&**base, &**exponent],
            Neg(a) | Random(a) => vec![&**a],
            Init { value, .. } => vec![&**value],
            Inc { by, .. } => by.as_deref().into_iter().collect(),
            If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut v = vec![&**condition, &**then_branch];
                v.extend(else_branch.as_deref());
                v
            }
            While { condition, body } => vec![&**condition, &**body],
            Repeat { count, body } => vec![&**count, &**body],
            DoUntil { body, condition } | DoWhile { body, condition } => {
                vec![&**body, &**condition]
            }
            For { from, to, body, .. } => vec![&**from, &**to, &**body],
            ProcDef { body, .. } => vec![&**body],
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children().into_iter().map(Node::node_count).sum::<usize>()
    }

    /// Interchange tag of this node, as the frontend spells it.
    pub fn kind_name(&self) -> &'static str {
        use NodeKind::*;
        match &self.kind {
            Program(_) => "PROGRAM",
            Stmts(_) => "STMTS",
            Empty => "EMPTY",
            Num(_) => "NUM",
            Bool(_) => "BOOL",
            Str(_) => "STR",
            Ident(_) => "ID",
            Binary { .. } => "BINOP",
            Pow { .. } => "POW",
            Neg(_) => "NEG",
            Logic { .. } => "BOOLBIN",
            Relation { .. } => "RELOP",
            Command { command, .. } => command.keyword(),
            Init { .. } => "INIC",
            Inc { .. } => "INC",
            If { .. } => "SI",
            While { .. } => "MIENTRAS",
            Repeat { .. } => "REPITE",
            DoUntil { .. } => "HAZ_HASTA",
            DoWhile { .. } => "HAZ_MIENTRAS",
            For { .. } => "PARA",
            ProcDef { .. } => "PROC",
            Call { .. } => "CALL",
            Random(_) => "AZAR",
        }
    }
}

impl Number {
    /// The literal as 32-bit generated code sees it. Floats truncate toward
    /// zero; `None` if the value does not fit.
    pub fn to_i32(self) -> Option<i32> {
        match self {
            Number::Int(i) => i32::try_from(i).ok(),
            Number::Float(f) => {
                let t = f.trunc();
                (t >= f64::from(i32::MIN) && t <= f64::from(i32::MAX)).then_some(t as i32)
            }
        }
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{x:?}"),
        }
    }
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

impl LogicOp {
    pub fn keyword(self) -> &'static str {
        match self {
            LogicOp::And => "Y",
            LogicOp::Or => "O",
        }
    }
}

impl RelOp {
    pub fn keyword(self) -> &'static str {
        match self {
            RelOp::Eq => "IGUALES",
            RelOp::Lt => "MENORQ",
            RelOp::Gt => "MAYORQ",
        }
    }
}

impl Command {
    pub fn keyword(self) -> &'static str {
        use Command::*;
        match self {
            Forward => "AV",
            Back => "RE",
            Right => "GD",
            Left => "GI",
            SetPos => "PONPOS",
            SetX => "PONX",
            SetY => "PONY",
            SetHeading => "PONRUMBO",
            Heading => "RUMBO",
            PenDown => "BL",
            PenUp => "SB",
            HideTurtle => "OT",
            Center => "CENTRO",
            SetColor => "PONCL",
            Wait => "ESPERA",
        }
    }

    pub fn arity(self) -> usize {
        use Command::*;
        match self {
            SetPos => 2,
            Forward | Back | Right | Left | SetX | SetY | SetHeading | SetColor | Wait => 1,
            Heading | PenDown | PenUp | HideTurtle | Center => 0,
        }
    }
}
