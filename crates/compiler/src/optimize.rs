use syntax::{BinOp, Command, LogicOp, Node, NodeKind, Number, RelOp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeOptions {
    /// Upper bound on full traversals before giving up on a fixed point.
    pub max_passes: usize,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        OptimizeOptions { max_passes: 64 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Optimized {
    pub tree: Node,
    /// Total rewrites over all passes.
    pub rewrites: usize,
    pub passes: usize,
}

pub fn optimize(tree: Node) -> Optimized {
    optimize_with(tree, &OptimizeOptions::default())
}

/// Runs [`pass`] until a traversal applies no rewrite.
pub fn optimize_with(mut tree: Node, options: &OptimizeOptions) -> Optimized {
    let mut rewrites = 0;
    let mut passes = 0;
    loop {
        if passes == options.max_passes {
            log::warn!("optimizer stopped after {passes} passes without reaching a fixed point");
            break;
        }
        let before = rewrites;
        tree = pass(tree, &mut rewrites);
        passes += 1;
        log::debug!("optimizer pass {passes}: {} rewrites", rewrites - before);
        if rewrites == before {
            break;
        }
    }
    Optimized {
        tree,
        rewrites,
        passes,
    }
}

fn rewrite(rewrites: &mut usize, rule: &str, line: u32) {
    log::trace!("line {line}: {rule}");
    *rewrites += 1;
}

/// One bottom-up traversal. Every change to the tree is counted in `rewrites`.
pub fn pass(node: Node, rewrites: &mut usize) -> Node {
    use NodeKind::*;
    let line = node.line;
    let kind = match node.kind {
        Binary { op, lhs, rhs } => {
            let lhs = pass(*lhs, rewrites);
            let rhs = pass(*rhs, rewrites);
            return binary(op, lhs, rhs, line, rewrites);
        }
        Pow { base, exponent } => {
            let base = pass(*base, rewrites);
            let exponent = pass(*exponent, rewrites);
            return pow(base, exponent, line, rewrites);
        }
        Neg(operand) => {
            let operand = pass(*operand, rewrites);
            return neg(operand, line, rewrites);
        }
        Logic { op, lhs, rhs } => {
            let lhs = pass(*lhs, rewrites);
            let rhs = pass(*rhs, rewrites);
            return logic(op, lhs, rhs, line, rewrites);
        }
        Relation { op, lhs, rhs } => {
            let lhs = pass(*lhs, rewrites);
            let rhs = pass(*rhs, rewrites);
            return relation(op, lhs, rhs, line, rewrites);
        }
        If {
            condition,
            then_branch,
            else_branch,
        } => {
            let condition = pass(*condition, rewrites);
            let then_branch = pass(*then_branch, rewrites);
            let else_branch = else_branch.map(|e| pass(*e, rewrites));
            match condition.as_bool_constant() {
                Some(true) => {
                    rewrite(rewrites, "constant condition takes the then branch", line);
                    return then_branch;
                }
                Some(false) => {
                    rewrite(rewrites, "constant condition takes the else branch", line);
                    return else_branch.unwrap_or_else(|| Node::empty(line));
                }
                None => If {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch: else_branch.map(Box::new),
                },
            }
        }
        While { condition, body } => {
            let condition = pass(*condition, rewrites);
            let body = pass(*body, rewrites);
            if condition.as_bool_constant() == Some(false) {
                rewrite(rewrites, "loop never runs", line);
                return Node::empty(line);
            }
            While {
                condition: Box::new(condition),
                body: Box::new(body),
            }
        }
        Repeat { count, body } => {
            let count = pass(*count, rewrites);
            let body = pass(*body, rewrites);
            match count.as_number() {
                Some(n) if n.to_i32().map_or(false, |n| n <= 0) => {
                    rewrite(rewrites, "repeat count is not positive", line);
                    return Node::empty(line);
                }
                Some(n) if n.to_i32() == Some(1) => {
                    rewrite(rewrites, "single repetition unwrapped", line);
                    return body;
                }
                _ => Repeat {
                    count: Box::new(count),
                    body: Box::new(body),
                },
            }
        }
        NodeKind::Command { command, args } => {
            let args = args.into_iter().map(|a| pass(a, rewrites)).collect();
            return turtle_command(command, args, line, rewrites);
        }
        Stmts(nodes) => {
            let mut kept = Vec::with_capacity(nodes.len());
            for n in nodes {
                let n = pass(n, rewrites);
                if n.is_empty() {
                    rewrite(rewrites, "empty statement dropped", n.line);
                } else {
                    kept.push(n);
                }
            }
            match kept.len() {
                0 => {
                    rewrite(rewrites, "empty statement list", line);
                    return Node::empty(line);
                }
                1 => {
                    rewrite(rewrites, "single statement list collapsed", line);
                    return kept.pop().unwrap_or_else(|| Node::empty(line));
                }
                _ => Stmts(kept),
            }
        }
        Program(body) => Program(Box::new(pass(*body, rewrites))),
        Init { name, value } => Init {
            name,
            value: Box::new(pass(*value, rewrites)),
        },
        Inc { name, by } => Inc {
            name,
            by: by.map(|b| Box::new(pass(*b, rewrites))),
        },
        DoUntil { body, condition } => {
            let body = pass(*body, rewrites);
            DoUntil {
                body: Box::new(body),
                condition: Box::new(pass(*condition, rewrites)),
            }
        }
        DoWhile { body, condition } => {
            let body = pass(*body, rewrites);
            DoWhile {
                body: Box::new(body),
                condition: Box::new(pass(*condition, rewrites)),
            }
        }
        For {
            var,
            from,
            to,
            body,
        } => {
            let from = pass(*from, rewrites);
            let to = pass(*to, rewrites);
            For {
                var,
                from: Box::new(from),
                to: Box::new(to),
                body: Box::new(pass(*body, rewrites)),
            }
        }
        ProcDef { name, params, body } => ProcDef {
            name,
            params,
            body: Box::new(pass(*body, rewrites)),
        },
        Call { name, args } => Call {
            name,
            args: args.into_iter().map(|a| pass(a, rewrites)).collect(),
        },
        Random(bound) => Random(Box::new(pass(*bound, rewrites))),
        k @ (Empty | Num(_) | Bool(_) | Str(_) | Ident(_)) => k,
    };
    Node::new(kind, line)
}

/// Results must fit the 32-bit target width.
fn in_range(n: i64) -> Option<Number> {
    i32::try_from(n).ok().map(|_| Number::Int(n))
}

/// Literals are folded as the generated code evaluates them: truncated to
/// `i32` first, so floats never fold with fractional precision.
fn operand(n: Number) -> Option<i64> {
    n.to_i32().map(i64::from)
}

fn fold_arith(op: BinOp, a: Number, b: Number) -> Option<Number> {
    let (a, b) = (operand(a)?, operand(b)?);
    in_range(match op {
        BinOp::Add => a.checked_add(b)?,
        BinOp::Sub => a.checked_sub(b)?,
        BinOp::Mul => a.checked_mul(b)?,
        BinOp::Div => a.checked_div(b)?,
    })
}

fn fold_pow(base: Number, exponent: Number) -> Option<Number> {
    let exponent = u32::try_from(operand(exponent)?).ok()?;
    in_range(operand(base)?.checked_pow(exponent)?)
}

fn negate(n: Number) -> Option<Number> {
    in_range(operand(n)?.checked_neg()?)
}

/// Truncating remainder: the sign of the angle is kept.
fn normalize_angle(n: Number) -> Option<Number> {
    operand(n).map(|i| Number::Int(i % 360))
}

fn literal(n: Number, line: u32) -> Node {
    Node::new(NodeKind::Num(n), line)
}

fn is_zero(node: &Node) -> bool {
    node.as_number().and_then(Number::to_i32) == Some(0)
}

fn is_one(node: &Node) -> bool {
    node.as_number().and_then(Number::to_i32) == Some(1)
}

fn binary(op: BinOp, lhs: Node, rhs: Node, line: u32, rewrites: &mut usize) -> Node {
    if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
        if let Some(n) = fold_arith(op, a, b) {
            rewrite(rewrites, "arithmetic folded", line);
            return literal(n, line);
        }
    }
    let simplified = match op {
        BinOp::Add if is_zero(&rhs) => lhs,
        BinOp::Add if is_zero(&lhs) => rhs,
        BinOp::Sub if is_zero(&rhs) => lhs,
        BinOp::Sub if lhs.same_ident(&rhs) => Node::int(0, line),
        BinOp::Mul if is_zero(&lhs) || is_zero(&rhs) => Node::int(0, line),
        BinOp::Mul if is_one(&rhs) => lhs,
        BinOp::Mul if is_one(&lhs) => rhs,
        BinOp::Div if is_one(&rhs) => lhs,
        BinOp::Div if is_zero(&lhs) && !is_zero(&rhs) => Node::int(0, line),
        _ => {
            return Node::new(
                NodeKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                line,
            )
        }
    };
    rewrite(rewrites, "algebraic identity", line);
    simplified
}

fn pow(base: Node, exponent: Node, line: u32, rewrites: &mut usize) -> Node {
    if let (Some(b), Some(e)) = (base.as_number(), exponent.as_number()) {
        if let Some(n) = fold_pow(b, e) {
            rewrite(rewrites, "power folded", line);
            return literal(n, line);
        }
    }
    let positive_exponent = exponent
        .as_number()
        .and_then(Number::to_i32)
        .map_or(false, |e| e > 0);
    let simplified = if is_zero(&exponent) {
        Node::int(1, line)
    } else if is_one(&exponent) {
        base
    } else if is_zero(&base) && positive_exponent {
        Node::int(0, line)
    } else if is_one(&base) {
        Node::int(1, line)
    } else {
        return Node::new(
            NodeKind::Pow {
                base: Box::new(base),
                exponent: Box::new(exponent),
            },
            line,
        );
    };
    rewrite(rewrites, "power identity", line);
    simplified
}

fn neg(operand: Node, line: u32, rewrites: &mut usize) -> Node {
    if let Some(n) = operand.as_number().and_then(negate) {
        rewrite(rewrites, "negation folded", line);
        return literal(n, line);
    }
    match operand.kind {
        NodeKind::Neg(inner) => {
            rewrite(rewrites, "double negation", line);
            *inner
        }
        kind => Node::new(
            NodeKind::Neg(Box::new(Node::new(kind, operand.line))),
            line,
        ),
    }
}

fn logic(op: LogicOp, lhs: Node, rhs: Node, line: u32, rewrites: &mut usize) -> Node {
    use LogicOp::*;
    let result = match (op, lhs.as_bool_constant(), rhs.as_bool_constant()) {
        (And, Some(a), Some(b)) => Node::boolean(a && b, line),
        (Or, Some(a), Some(b)) => Node::boolean(a || b, line),
        (And, Some(false), _) | (And, _, Some(false)) => Node::boolean(false, line),
        (And, Some(true), _) => rhs,
        (And, _, Some(true)) => lhs,
        (Or, Some(true), _) | (Or, _, Some(true)) => Node::boolean(true, line),
        (Or, Some(false), _) => rhs,
        (Or, _, Some(false)) => lhs,
        (_, None, None) => {
            return Node::new(
                NodeKind::Logic {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                line,
            )
        }
    };
    rewrite(rewrites, "boolean operator simplified", line);
    result
}

fn compare(op: RelOp, a: Number, b: Number) -> Option<bool> {
    let (a, b) = (operand(a)?, operand(b)?);
    Some(match op {
        RelOp::Eq => a == b,
        RelOp::Lt => a < b,
        RelOp::Gt => a > b,
    })
}

fn relation(op: RelOp, lhs: Node, rhs: Node, line: u32, rewrites: &mut usize) -> Node {
    let folded = match (lhs.as_number(), rhs.as_number()) {
        (Some(a), Some(b)) => compare(op, a, b),
        _ => None,
    };
    let result = if let Some(result) = folded {
        result
    } else if lhs.same_ident(&rhs) {
        op == RelOp::Eq
    } else {
        return Node::new(
            NodeKind::Relation {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            line,
        );
    };
    rewrite(rewrites, "comparison folded", line);
    Node::boolean(result, line)
}

fn turtle_command(command: Command, args: Vec<Node>, line: u32, rewrites: &mut usize) -> Node {
    let amount = match args.as_slice() {
        [a] => a.as_number().map(|n| (n, a.line)),
        _ => None,
    };
    let canonical = match (command, amount) {
        (Command::Forward | Command::Back | Command::Right | Command::Left, Some((n, _)))
            if n.to_i32() == Some(0) =>
        {
            rewrite(rewrites, "zero movement removed", line);
            return Node::empty(line);
        }
        (Command::Back, Some((n, arg_line))) => {
            negate(n).map(|n| (Command::Forward, literal(n, arg_line)))
        }
        (Command::Left, Some((n, arg_line))) => {
            negate(n).map(|n| (Command::Right, literal(n, arg_line)))
        }
        (Command::Right, Some((n, arg_line))) => {
            normalize_angle(n)
                .filter(|normalized| *normalized != n)
                .map(|normalized| (Command::Right, literal(normalized, arg_line)))
        }
        _ => None,
    };
    match canonical {
        Some((command, arg)) => {
            rewrite(rewrites, "turtle command canonicalized", line);
            Node::new(
                NodeKind::Command {
                    command,
                    args: vec![arg],
                },
                line,
            )
        }
        None => Node::new(NodeKind::Command { command, args }, line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(i: i64) -> Node {
        Node::int(i, 1)
    }

    fn float(f: f64) -> Node {
        literal(Number::Float(f), 1)
    }

    fn id(name: &str) -> Node {
        Node::ident(name, 1)
    }

    fn bin(op: BinOp, lhs: Node, rhs: Node) -> Node {
        Node::new(
            NodeKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            1,
        )
    }

    fn power(base: Node, exponent: Node) -> Node {
        Node::new(
            NodeKind::Pow {
                base: Box::new(base),
                exponent: Box::new(exponent),
            },
            1,
        )
    }

    fn negation(n: Node) -> Node {
        Node::new(NodeKind::Neg(Box::new(n)), 1)
    }

    fn logic_op(op: LogicOp, lhs: Node, rhs: Node) -> Node {
        Node::new(
            NodeKind::Logic {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            1,
        )
    }

    fn rel(op: RelOp, lhs: Node, rhs: Node) -> Node {
        Node::new(
            NodeKind::Relation {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            1,
        )
    }

    fn cmd(command: Command, args: Vec<Node>) -> Node {
        Node::new(NodeKind::Command { command, args }, 1)
    }

    fn stmts(nodes: Vec<Node>) -> Node {
        Node::new(NodeKind::Stmts(nodes), 1)
    }

    fn init(name: &str, value: Node) -> Node {
        Node::new(
            NodeKind::Init {
                name: name.to_string(),
                value: Box::new(value),
            },
            1,
        )
    }

    fn if_node(condition: Node, then_branch: Node, else_branch: Option<Node>) -> Node {
        Node::new(
            NodeKind::If {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: else_branch.map(Box::new),
            },
            1,
        )
    }

    fn repeat(count: Node, body: Node) -> Node {
        Node::new(
            NodeKind::Repeat {
                count: Box::new(count),
                body: Box::new(body),
            },
            1,
        )
    }

    fn while_node(condition: Node, body: Node) -> Node {
        Node::new(
            NodeKind::While {
                condition: Box::new(condition),
                body: Box::new(body),
            },
            1,
        )
    }

    fn opt(n: Node) -> Node {
        optimize(n).tree
    }

    /// Empty nodes may only sit where a statement is expected.
    fn assert_no_empty_operand(node: &Node) {
        use NodeKind::*;
        let operands: Vec<&Node> = match &node.kind {
            Binary { lhs, rhs, .. } | Logic { lhs, rhs, .. } | Relation { lhs, rhs, .. } => {
                vec![&**lhs, &**rhs]
            }
            Pow { base, exponent } => vec![&**base, &**exponent],
            Neg(a) | Random(a) => vec![&**a],
            NodeKind::Command { args, .. } | Call { args, .. } => args.iter().collect(),
            Init { value, .. } => vec![&**value],
            If { condition, .. }
            | While { condition, .. }
            | DoUntil { condition, .. }
            | DoWhile { condition, .. } => vec![&**condition],
            Repeat { count, .. } => vec![&**count],
            For { from, to, .. } => vec![&**from, &**to],
            Stmts(nodes) => nodes.iter().collect(),
            _ => Vec::new(),
        };
        for o in operands {
            assert!(!o.is_empty(), "empty operand under {}", node.kind_name());
        }
        for c in node.children() {
            assert_no_empty_operand(c);
        }
    }

    fn sample_trees() -> Vec<Node> {
        vec![
            stmts(vec![
                init("x", bin(BinOp::Add, num(2), num(3))),
                cmd(Command::Forward, vec![bin(BinOp::Mul, id("x"), num(1))]),
            ]),
            stmts(vec![
                cmd(Command::Back, vec![num(7)]),
                cmd(Command::Left, vec![num(30)]),
                cmd(Command::Right, vec![num(720)]),
                repeat(num(0), cmd(Command::Forward, vec![num(10)])),
            ]),
            if_node(
                rel(RelOp::Gt, num(3), num(7)),
                cmd(Command::Right, vec![num(45)]),
                None,
            ),
            while_node(
                logic_op(LogicOp::And, id("a"), rel(RelOp::Lt, id("x"), id("x"))),
                stmts(vec![cmd(Command::Forward, vec![num(0)]), Node::empty(1)]),
            ),
            repeat(
                num(4),
                stmts(vec![
                    cmd(
                        Command::Forward,
                        vec![bin(BinOp::Sub, id("l"), negation(negation(num(0))))],
                    ),
                    cmd(Command::Left, vec![power(num(3), num(2))]),
                ]),
            ),
            cmd(Command::Forward, vec![bin(BinOp::Div, num(5), num(0))]),
            cmd(Command::Back, vec![bin(BinOp::Mul, float(2.5), num(2))]),
        ]
    }

    #[test]
    fn folds_and_drops_identity() {
        let tree = stmts(vec![
            init("x", bin(BinOp::Add, num(2), num(3))),
            cmd(Command::Forward, vec![bin(BinOp::Mul, id("x"), num(1))]),
        ]);
        assert_eq!(
            opt(tree),
            stmts(vec![init("x", num(5)), cmd(Command::Forward, vec![id("x")])])
        );
    }

    #[test]
    fn division_by_zero_is_kept() {
        let tree = cmd(Command::Forward, vec![bin(BinOp::Div, num(5), num(0))]);
        let result = optimize(tree.clone());
        assert_eq!(result.tree, tree);
        assert_eq!(result.rewrites, 0);
        let zero_over_zero = bin(BinOp::Div, num(0), num(0));
        assert_eq!(opt(zero_over_zero.clone()), zero_over_zero);
    }

    #[test]
    fn integer_division_truncates() {
        assert_eq!(opt(bin(BinOp::Div, num(7), num(2))), num(3));
        assert_eq!(opt(bin(BinOp::Div, float(7.0), num(2))), num(3));
    }

    #[test]
    fn float_literals_fold_truncated() {
        assert_eq!(opt(bin(BinOp::Mul, float(2.5), num(2))), num(4));
        assert_eq!(opt(rel(RelOp::Gt, float(2.5), num(2))), Node::boolean(false, 1));
        assert_eq!(opt(negation(float(2.5))), num(-2));
        assert_eq!(opt(bin(BinOp::Mul, id("x"), float(1.5))), id("x"));
        let by_fraction = bin(BinOp::Div, num(0), float(0.5));
        assert_eq!(opt(by_fraction.clone()), by_fraction);
        assert!(opt(cmd(Command::Forward, vec![float(0.5)])).is_empty());
        assert_eq!(
            opt(cmd(Command::Right, vec![float(450.7)])),
            cmd(Command::Right, vec![num(90)])
        );
    }

    #[test]
    fn overflowing_fold_is_kept() {
        let big = bin(BinOp::Mul, num(100_000), num(100_000));
        assert_eq!(opt(big.clone()), big);
        let huge_power = power(num(2), num(40));
        assert_eq!(opt(huge_power.clone()), huge_power);
    }

    #[test]
    fn arithmetic_identities() {
        assert_eq!(opt(bin(BinOp::Add, id("x"), num(0))), id("x"));
        assert_eq!(opt(bin(BinOp::Add, num(0), id("x"))), id("x"));
        assert_eq!(opt(bin(BinOp::Sub, id("x"), num(0))), id("x"));
        assert_eq!(opt(bin(BinOp::Sub, id("x"), id("x"))), num(0));
        assert_eq!(opt(bin(BinOp::Mul, num(0), id("x"))), num(0));
        assert_eq!(opt(bin(BinOp::Mul, num(1), id("x"))), id("x"));
        assert_eq!(opt(bin(BinOp::Div, id("x"), num(1))), id("x"));
        assert_eq!(opt(bin(BinOp::Div, num(0), id("x"))), num(0));
    }

    #[test]
    fn same_value_rules_need_bare_identifiers() {
        let compound = bin(
            BinOp::Sub,
            bin(BinOp::Add, id("x"), id("y")),
            bin(BinOp::Add, id("x"), id("y")),
        );
        assert_eq!(opt(compound.clone()), compound);
        assert_eq!(opt(bin(BinOp::Sub, id("x"), id("y"))), bin(BinOp::Sub, id("x"), id("y")));
    }

    #[test]
    fn power_rules() {
        assert_eq!(opt(power(num(2), num(10))), num(1024));
        assert_eq!(opt(power(id("x"), num(0))), num(1));
        assert_eq!(opt(power(id("x"), num(1))), id("x"));
        assert_eq!(opt(power(num(0), id("x"))), power(num(0), id("x")));
        assert_eq!(opt(power(num(1), id("x"))), num(1));
        assert_eq!(opt(power(num(0), num(3))), num(0));
    }

    #[test]
    fn negative_integer_exponent_is_kept() {
        let tree = power(num(2), num(-1));
        let mut rewrites = 0;
        assert_eq!(pass(tree.clone(), &mut rewrites), tree);
        assert_eq!(rewrites, 0);
        assert_eq!(opt(power(float(2.0), num(-1))), power(float(2.0), num(-1)));
        assert_eq!(opt(power(num(0), num(-1))), power(num(0), num(-1)));
    }

    #[test]
    fn negation_rules() {
        assert_eq!(opt(negation(num(4))), num(-4));
        assert_eq!(opt(negation(negation(id("x")))), id("x"));
        assert_eq!(opt(negation(id("x"))), negation(id("x")));
    }

    #[test]
    fn boolean_rules() {
        use LogicOp::*;
        assert_eq!(opt(logic_op(And, num(1), Node::boolean(false, 1))), Node::boolean(false, 1));
        assert_eq!(opt(logic_op(Or, num(0), num(1))), Node::boolean(true, 1));
        assert_eq!(opt(logic_op(And, id("a"), num(0))), Node::boolean(false, 1));
        assert_eq!(opt(logic_op(And, Node::boolean(true, 1), id("a"))), id("a"));
        assert_eq!(opt(logic_op(Or, id("a"), Node::boolean(true, 1))), Node::boolean(true, 1));
        assert_eq!(opt(logic_op(Or, num(0), id("a"))), id("a"));
        let open = logic_op(Or, id("a"), id("b"));
        assert_eq!(opt(open.clone()), open);
    }

    #[test]
    fn relational_rules() {
        assert_eq!(opt(rel(RelOp::Lt, num(2), num(3))), Node::boolean(true, 1));
        assert_eq!(opt(rel(RelOp::Eq, float(2.0), num(2))), Node::boolean(true, 1));
        assert_eq!(opt(rel(RelOp::Eq, id("x"), id("x"))), Node::boolean(true, 1));
        assert_eq!(opt(rel(RelOp::Gt, id("x"), id("x"))), Node::boolean(false, 1));
        assert_eq!(opt(rel(RelOp::Lt, id("x"), id("x"))), Node::boolean(false, 1));
    }

    #[test]
    fn dead_branch_elimination() {
        let tree = if_node(
            rel(RelOp::Gt, num(3), num(7)),
            cmd(Command::Right, vec![num(45)]),
            None,
        );
        assert!(opt(tree).is_empty());
        let with_else = if_node(
            Node::boolean(false, 1),
            cmd(Command::Forward, vec![num(1)]),
            Some(cmd(Command::Forward, vec![num(2)])),
        );
        assert_eq!(opt(with_else), cmd(Command::Forward, vec![num(2)]));
        let taken = if_node(num(1), cmd(Command::Forward, vec![num(1)]), None);
        assert_eq!(opt(taken), cmd(Command::Forward, vec![num(1)]));
    }

    #[test]
    fn while_loops() {
        assert!(opt(while_node(Node::boolean(false, 1), cmd(Command::PenUp, vec![]))).is_empty());
        let forever = while_node(Node::boolean(true, 1), cmd(Command::PenUp, vec![]));
        assert_eq!(opt(forever.clone()), forever);
    }

    #[test]
    fn loop_unrolling_boundary() {
        let body = cmd(Command::Forward, vec![num(10)]);
        assert_eq!(opt(repeat(num(1), body.clone())), body);
        assert!(opt(repeat(num(0), body.clone())).is_empty());
        assert!(opt(repeat(num(-3), body.clone())).is_empty());
        assert_eq!(opt(repeat(num(2), body.clone())), repeat(num(2), body));
    }

    #[test]
    fn canonicalization() {
        assert_eq!(
            opt(cmd(Command::Back, vec![num(7)])),
            cmd(Command::Forward, vec![num(-7)])
        );
        assert_eq!(
            opt(cmd(Command::Left, vec![num(30)])),
            cmd(Command::Right, vec![num(-30)])
        );
        assert_eq!(
            opt(cmd(Command::Right, vec![num(450)])),
            cmd(Command::Right, vec![num(90)])
        );
        assert!(opt(cmd(Command::Right, vec![num(360)])).is_empty());
        assert!(opt(cmd(Command::Back, vec![num(0)])).is_empty());
        let variable = cmd(Command::Back, vec![id("d")]);
        assert_eq!(opt(variable.clone()), variable);
    }

    #[test]
    fn statement_lists_collapse() {
        let tree = stmts(vec![
            cmd(Command::Forward, vec![num(0)]),
            cmd(Command::PenDown, vec![]),
            Node::empty(1),
        ]);
        assert_eq!(opt(tree), cmd(Command::PenDown, vec![]));
        assert!(opt(stmts(vec![Node::empty(1)])).is_empty());
        assert!(opt(stmts(Vec::new())).is_empty());
    }

    #[test]
    fn idempotent() {
        for tree in sample_trees() {
            let first = optimize(tree);
            let second = optimize(first.tree.clone());
            assert_eq!(second.tree, first.tree);
            assert_eq!(second.rewrites, 0);
            assert_eq!(second.passes, 1);
        }
    }

    #[test]
    fn passes_never_grow_the_tree() {
        for mut tree in sample_trees() {
            loop {
                let before = tree.node_count();
                let mut rewrites = 0;
                tree = pass(tree, &mut rewrites);
                assert!(tree.node_count() <= before);
                if rewrites == 0 {
                    assert_eq!(tree.node_count(), before);
                    break;
                }
            }
        }
    }

    #[test]
    fn no_empty_operands_after_optimization() {
        for tree in sample_trees() {
            assert_no_empty_operand(&opt(tree));
        }
    }

    #[test]
    fn terminates_on_deep_trees() {
        let mut tree = num(1);
        for i in 0..200 {
            tree = bin(BinOp::Add, tree, if i % 2 == 0 { num(0) } else { id("x") });
        }
        let result = optimize_with(tree, &OptimizeOptions { max_passes: 1000 });
        assert!(result.passes <= 3);
    }

    #[test]
    fn pass_cap_is_respected() {
        let tree = cmd(Command::Right, vec![num(360)]);
        let result = optimize_with(tree, &OptimizeOptions { max_passes: 1 });
        assert_eq!(result.passes, 1);
        assert_eq!(result.tree, cmd(Command::Right, vec![num(0)]));
    }
}
