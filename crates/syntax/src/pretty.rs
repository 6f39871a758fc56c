use crate::{Node, NodeKind, Number};
use itertools::Itertools;
use std::fmt::{self, Display, Write};

impl Node {
    /// Indented dump, one node per line: `KIND(value)`.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0).unwrap_or_default();
        out
    }

    fn write_pretty(&self, out: &mut String, depth: usize) -> fmt::Result {
        writeln!(out, "{:indent$}{}", "", Head(self), indent = depth * 2)?;
        for child in self.children() {
            child.write_pretty(out, depth + 1)?;
        }
        Ok(())
    }
}

struct Head<'a>(&'a Node);

impl Display for Head<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use NodeKind::*;
        let node = self.0;
        write!(f, "{}", node.kind_name())?;
        match &node.kind {
            Num(Number::Int(i)) => write!(f, "({i})"),
            Num(n) => write!(f, "({n})"),
            Bool(b) => write!(f, "({b})"),
            Str(s) => write!(f, "({s:?})"),
            Ident(name) | Init { name, .. } | Inc { name, .. } | For { var: name, .. } => {
                write!(f, "({name})")
            }
            Binary { op, .. } => write!(f, "({})", op.symbol()),
            Logic { op, .. } => write!(f, "({})", op.keyword()),
            Relation { op, .. } => write!(f, "({})", op.keyword()),
            ProcDef { name, params, .. } => write!(f, "({name} {})", params.iter().join(" ")),
            Call { name, .. } => write!(f, "({name})"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{BinOp, Command, Node, NodeKind};

    #[test]
    fn pretty_indents_children() {
        let tree = Node::new(
            NodeKind::Command {
                command: Command::Forward,
                args: vec![Node::new(
                    NodeKind::Binary {
                        op: BinOp::Add,
                        lhs: Box::new(Node::ident("x", 1)),
                        rhs: Box::new(Node::int(2, 1)),
                    },
                    1,
                )],
            },
            1,
        );
        assert_eq!(tree.pretty(), "AV\n  BINOP(+)\n    ID(x)\n    NUM(2)\n");
    }
}
