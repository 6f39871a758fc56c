use crate::error::GenError;
use crate::intrinsics::{palette_index, CommandExt};
use logo_ir::{
    procedure_symbol, BinaryOp, Builder, Callee, IntPredicate, Module, Primitive, Type, Value,
};
use rustc_hash::FxHashMap;
use std::mem;
use syntax::{BinOp, LogicOp, Node, NodeKind, Number, RelOp};

pub fn generate(tree: &Node) -> Result<Module, GenError> {
    generate_module(tree, "logotec")
}

pub fn generate_module(tree: &Node, name: &str) -> Result<Module, GenError> {
    let mut procedures = FxHashMap::default();
    collect_procedures(tree, &mut procedures)?;
    let mut env = Env {
        module: Module::new(name),
        builder: Builder::new("main", Vec::new()),
        scopes: vec![Scope::default()],
        procedures,
    };
    env.primitive(Primitive::RtInit, Vec::new());
    env.stmt(tree)?;
    env.primitive(Primitive::RtShutdown, Vec::new());
    env.builder.ret();
    let Env {
        mut module,
        builder,
        ..
    } = env;
    module.functions.insert(0, builder.finish());
    Ok(module)
}

#[derive(Debug, Clone)]
struct Signature {
    symbol: String,
    arity: usize,
}

/// Procedures may be called before their definition appears.
fn collect_procedures(
    node: &Node,
    procedures: &mut FxHashMap<String, Signature>,
) -> Result<(), GenError> {
    if let NodeKind::ProcDef { name, params, .. } = &node.kind {
        let signature = Signature {
            symbol: procedure_symbol(name),
            arity: params.len(),
        };
        if procedures.insert(name.clone(), signature).is_some() {
            return Err(GenError::DuplicateProcedure {
                name: name.clone(),
                line: node.line,
            });
        }
    }
    node.children()
        .into_iter()
        .try_for_each(|c| collect_procedures(c, procedures))
}

#[derive(Debug, Default)]
struct Scope {
    slots: FxHashMap<String, Value>,
}

struct Env {
    module: Module,
    builder: Builder,
    /// `scopes[0]` holds module-level variables.
    scopes: Vec<Scope>,
    procedures: FxHashMap<String, Signature>,
}

fn unsupported(node: &Node) -> GenError {
    GenError::UnsupportedNode {
        kind: node.kind_name(),
        line: node.line,
    }
}

fn binary_op(op: BinOp) -> BinaryOp {
    match op {
        BinOp::Add => BinaryOp::Add,
        BinOp::Sub => BinaryOp::Sub,
        BinOp::Mul => BinaryOp::Mul,
        BinOp::Div => BinaryOp::SDiv,
    }
}

fn predicate(op: RelOp) -> IntPredicate {
    match op {
        RelOp::Eq => IntPredicate::Eq,
        RelOp::Lt => IntPredicate::Slt,
        RelOp::Gt => IntPredicate::Sgt,
    }
}

/// Float literals are truncated toward zero. A literal outside the 32-bit
/// target width is an error rather than a wrapped constant.
fn immediate(n: Number, line: u32) -> Result<i32, GenError> {
    n.to_i32().ok_or_else(|| GenError::LiteralOutOfRange {
        value: n.to_string(),
        line,
    })
}

impl Env {
    fn with_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, GenError>,
    ) -> Result<T, GenError> {
        self.scopes.push(Scope::default());
        let r = f(self);
        self.scopes.pop();
        r
    }

    /// Generates into a fresh function; the caller's cursor and local scopes
    /// are restored afterwards whether or not `f` succeeds.
    fn with_function<T>(
        &mut self,
        builder: Builder,
        f: impl FnOnce(&mut Self) -> Result<T, GenError>,
    ) -> Result<T, GenError> {
        let saved = mem::replace(&mut self.builder, builder);
        let enclosing = self.scopes.split_off(1);
        let r = self.with_scope(f);
        self.scopes.extend(enclosing);
        let builder = mem::replace(&mut self.builder, saved);
        if r.is_ok() {
            self.module.functions.push(builder.finish());
        }
        r
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.slots.get(name))
            .cloned()
    }

    fn resolve(&self, name: &str, line: u32) -> Result<Value, GenError> {
        self.lookup(name)
            .ok_or_else(|| GenError::UndeclaredVariable {
                name: name.to_string(),
                line,
            })
    }

    /// Slot for `name` in the innermost scope, created on first use.
    fn declare(&mut self, name: &str) -> Value {
        let global = self.scopes.len() == 1;
        if let Some(slot) = self.scopes.last().and_then(|s| s.slots.get(name)) {
            return slot.clone();
        }
        let slot = if global {
            self.module.add_global(name)
        } else {
            self.builder.alloca(name)
        };
        if let Some(scope) = self.scopes.last_mut() {
            scope.slots.insert(name.to_string(), slot.clone());
        }
        slot
    }

    fn primitive(&mut self, primitive: Primitive, args: Vec<Value>) -> Option<Value> {
        self.module.declare(primitive);
        self.builder.call_primitive(primitive, args)
    }

    fn primitive_value(&mut self, primitive: Primitive, args: Vec<Value>) -> Value {
        self.module.declare(primitive);
        self.builder
            .call_value(Callee::Runtime(primitive), primitive.ret(), args)
    }

    fn to_i32(&mut self, v: Value) -> Value {
        match v {
            Value::I1(b) => Value::I32(b as i32),
            v if v.ty() == Type::I1 => self.builder.zext(v),
            v => v,
        }
    }

    fn to_i1(&mut self, v: Value) -> Value {
        match v {
            Value::I32(i) => Value::I1(i != 0),
            v if v.ty() == Type::I32 => self.builder.icmp(IntPredicate::Ne, v, Value::I32(0)),
            v => v,
        }
    }

    /// Every runtime parameter is an integer, so a string is rejected here.
    fn scalar(&mut self, node: &Node) -> Result<Value, GenError> {
        let v = self.expr(node)?;
        if v.ty() == Type::Ptr {
            return Err(unsupported(node));
        }
        Ok(v)
    }

    fn int_expr(&mut self, node: &Node) -> Result<Value, GenError> {
        let v = self.scalar(node)?;
        Ok(self.to_i32(v))
    }

    fn bool_expr(&mut self, node: &Node) -> Result<Value, GenError> {
        let v = self.scalar(node)?;
        Ok(self.to_i1(v))
    }

    fn expr(&mut self, node: &Node) -> Result<Value, GenError> {
        use NodeKind::*;
        Ok(match &node.kind {
            Num(n) => Value::I32(immediate(*n, node.line)?),
            Bool(b) => Value::I1(*b),
            Str(s) => self.module.intern_string(s),
            Ident(name) => {
                let slot = self.resolve(name, node.line)?;
                self.builder.load(slot)
            }
            Binary { op, lhs, rhs } => {
                let lhs = self.int_expr(lhs)?;
                let rhs = self.int_expr(rhs)?;
                self.builder.binary(binary_op(*op), lhs, rhs)
            }
            Pow { base, exponent } => {
                let base = self.int_expr(base)?;
                let exponent = self.int_expr(exponent)?;
                self.primitive_value(Primitive::PowInt, vec![base, exponent])
            }
            Neg(operand) => {
                let operand = self.int_expr(operand)?;
                self.builder.binary(BinaryOp::Sub, Value::I32(0), operand)
            }
            Logic { op, lhs, rhs } => {
                let lhs = self.bool_expr(lhs)?;
                let rhs = self.bool_expr(rhs)?;
                let op = match op {
                    LogicOp::And => BinaryOp::And,
                    LogicOp::Or => BinaryOp::Or,
                };
                self.builder.binary(op, lhs, rhs)
            }
            Relation { op, lhs, rhs } => {
                let lhs = self.int_expr(lhs)?;
                let rhs = self.int_expr(rhs)?;
                self.builder.icmp(predicate(*op), lhs, rhs)
            }
            Random(bound) => {
                let bound = self.int_expr(bound)?;
                self.primitive_value(Primitive::RandInt, vec![bound])
            }
            Command {
                command: syntax::Command::Heading,
                args,
            } if args.is_empty() => self.primitive_value(Primitive::GetHeading, Vec::new()),
            _ => return Err(unsupported(node)),
        })
    }

    fn stmt(&mut self, node: &Node) -> Result<(), GenError> {
        use NodeKind::*;
        match &node.kind {
            Program(body) => self.stmt(body)?,
            Stmts(nodes) => {
                for n in nodes {
                    self.stmt(n)?;
                }
            }
            Empty => (),
            Init { name, value } => {
                let value = self.int_expr(value)?;
                let slot = self.declare(name);
                self.builder.store(value, slot);
            }
            Inc { name, by } => {
                let slot = self.resolve(name, node.line)?;
                let step = match by {
                    Some(by) => self.int_expr(by)?,
                    None => Value::I32(1),
                };
                let current = self.builder.load(slot.clone());
                let next = self.builder.binary(BinaryOp::Add, current, step);
                self.builder.store(next, slot);
            }
            Command {
                command: syntax::Command::SetColor,
                args,
            } if args.len() == 1 => self.set_color(&args[0])?,
            Command { command, args } => self.command(*command, args, node.line)?,
            If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.bool_expr(condition)?;
                let then = self.builder.append_block("then");
                let otherwise = self.builder.append_block("else");
                let join = self.builder.append_block("join");
                self.builder.cond_br(cond, then, otherwise);
                self.builder.position_at_end(then);
                self.stmt(then_branch)?;
                self.branch_if_open(join);
                self.builder.position_at_end(otherwise);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch)?;
                }
                self.branch_if_open(join);
                self.builder.position_at_end(join);
            }
            While { condition, body } => {
                let cond_block = self.builder.append_block("while.cond");
                let body_block = self.builder.append_block("while.body");
                let end = self.builder.append_block("while.end");
                self.builder.br(cond_block);
                self.builder.position_at_end(cond_block);
                let cond = self.bool_expr(condition)?;
                self.builder.cond_br(cond, body_block, end);
                self.builder.position_at_end(body_block);
                self.stmt(body)?;
                self.branch_if_open(cond_block);
                self.builder.position_at_end(end);
            }
            Repeat { count, body } => {
                let bound = self.int_expr(count)?;
                let counter = self.builder.alloca("repeat");
                self.builder.store(Value::I32(0), counter.clone());
                let cond_block = self.builder.append_block("repeat.cond");
                let body_block = self.builder.append_block("repeat.body");
                let end = self.builder.append_block("repeat.end");
                self.builder.br(cond_block);
                self.builder.position_at_end(cond_block);
                let i = self.builder.load(counter.clone());
                let cond = self.builder.icmp(IntPredicate::Slt, i, bound);
                self.builder.cond_br(cond, body_block, end);
                self.builder.position_at_end(body_block);
                self.stmt(body)?;
                if !self.builder.is_terminated() {
                    self.increment(counter);
                    self.builder.br(cond_block);
                }
                self.builder.position_at_end(end);
            }
            DoUntil { body, condition } | DoWhile { body, condition } => {
                let until = matches!(node.kind, DoUntil { .. });
                let (hint_body, hint_cond, hint_end) = if until {
                    ("until.body", "until.cond", "until.end")
                } else {
                    ("dowhile.body", "dowhile.cond", "dowhile.end")
                };
                let body_block = self.builder.append_block(hint_body);
                let cond_block = self.builder.append_block(hint_cond);
                let end = self.builder.append_block(hint_end);
                self.builder.br(body_block);
                self.builder.position_at_end(body_block);
                self.stmt(body)?;
                self.branch_if_open(cond_block);
                self.builder.position_at_end(cond_block);
                let cond = self.bool_expr(condition)?;
                if until {
                    self.builder.cond_br(cond, end, body_block);
                } else {
                    self.builder.cond_br(cond, body_block, end);
                }
                self.builder.position_at_end(end);
            }
            For {
                var,
                from,
                to,
                body,
            } => {
                let start = self.int_expr(from)?;
                let bound = self.int_expr(to)?;
                let slot = self.declare(var);
                self.builder.store(start, slot.clone());
                let cond_block = self.builder.append_block("for.cond");
                let body_block = self.builder.append_block("for.body");
                let end = self.builder.append_block("for.end");
                self.builder.br(cond_block);
                self.builder.position_at_end(cond_block);
                let i = self.builder.load(slot.clone());
                let cond = self.builder.icmp(IntPredicate::Sle, i, bound);
                self.builder.cond_br(cond, body_block, end);
                self.builder.position_at_end(body_block);
                self.stmt(body)?;
                if !self.builder.is_terminated() {
                    self.increment(slot);
                    self.builder.br(cond_block);
                }
                self.builder.position_at_end(end);
            }
            ProcDef { name, params, body } => self.procedure(name, params, body)?,
            Call { name, args } => {
                let signature = self.procedures.get(name).cloned().ok_or_else(|| {
                    GenError::UnknownProcedure {
                        name: name.clone(),
                        line: node.line,
                    }
                })?;
                if signature.arity != args.len() {
                    return Err(GenError::ArityMismatch {
                        name: name.clone(),
                        expected: signature.arity,
                        found: args.len(),
                        line: node.line,
                    });
                }
                let args = args
                    .iter()
                    .map(|a| self.int_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                self.builder
                    .call(Callee::User(signature.symbol), Type::Void, args);
            }
            Num(_) | Bool(_) | Str(_) | Ident(_) | Binary { .. } | Pow { .. } | Neg(_)
            | Logic { .. } | Relation { .. } | Random(_) => return Err(unsupported(node)),
        }
        Ok(())
    }

    fn branch_if_open(&mut self, target: logo_ir::BlockId) {
        if !self.builder.is_terminated() {
            self.builder.br(target);
        }
    }

    fn increment(&mut self, slot: Value) {
        let i = self.builder.load(slot.clone());
        let next = self.builder.binary(BinaryOp::Add, i, Value::I32(1));
        self.builder.store(next, slot);
    }

    fn command(
        &mut self,
        command: syntax::Command,
        args: &[Node],
        line: u32,
    ) -> Result<(), GenError> {
        let primitive = command.primitive();
        if primitive.params().len() != args.len() {
            return Err(GenError::ArityMismatch {
                name: command.keyword().to_string(),
                expected: primitive.params().len(),
                found: args.len(),
                line,
            });
        }
        let args = args
            .iter()
            .map(|a| self.int_expr(a))
            .collect::<Result<Vec<_>, _>>()?;
        self.primitive(primitive, args);
        Ok(())
    }

    /// The pen colour is a number, a variable, or a palette name.
    fn set_color(&mut self, arg: &Node) -> Result<(), GenError> {
        let color = match &arg.kind {
            NodeKind::Str(name) => {
                let index = palette_index(name).ok_or_else(|| GenError::UnknownColor {
                    name: name.clone(),
                    line: arg.line,
                })?;
                Value::I32(index)
            }
            NodeKind::Ident(name) if self.lookup(name).is_none() => {
                let index = palette_index(name).ok_or_else(|| GenError::UndeclaredVariable {
                    name: name.clone(),
                    line: arg.line,
                })?;
                Value::I32(index)
            }
            _ => self.int_expr(arg)?,
        };
        self.primitive(Primitive::SetColor, vec![color]);
        Ok(())
    }

    fn procedure(&mut self, name: &str, params: &[String], body: &Node) -> Result<(), GenError> {
        let symbol = procedure_symbol(name);
        log::debug!("generating procedure {name} as @{symbol}");
        let args = (0..params.len()).map(|i| format!("arg.{i}")).collect();
        self.with_function(Builder::new(symbol, args), |env| {
            for (i, p) in params.iter().enumerate() {
                let slot = env.declare(p);
                let arg = env.builder.param(i);
                env.builder.store(arg, slot);
            }
            env.stmt(body)?;
            if !env.builder.is_terminated() {
                env.builder.ret();
            }
            Ok(())
        })
    }
}
