use crate::{
    BasicBlock, BinaryOp, Callee, EndInstruction, Function, Instruction, IntPredicate, Module,
    Primitive, Type, Value,
};
use itertools::Itertools;
use std::fmt::{self, Display};
use strum::IntoEnumIterator;
use stripmargin::StripMargin;

impl Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            format!(
                r#"|; ModuleID = '{0}'
                   |source_filename = "{0}"
                   |"#,
                self.name
            )
            .strip_margin()
        )?;
        for (i, s) in self.strings() {
            writeln!(
                f,
                "@.str.{i} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
                s.len() + 1,
                escape_bytes(s.as_bytes())
            )?;
        }
        for g in &self.globals {
            writeln!(f, "@{g} = internal global i32 0")?;
        }
        writeln!(
            f,
            "{}",
            Primitive::iter()
                .filter(|p| self.is_declared(*p))
                .format_with("", |p, f| f(&format_args!(
                    "\ndeclare {} @{p}({})",
                    p.ret(),
                    p.params().iter().format(", ")
                )))
        )?;
        for function in &self.functions {
            write!(f, "\n{function}")?;
        }
        Ok(())
    }
}

fn escape_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            b' '..=b'~' if *b != b'"' && *b != b'\\' => (*b as char).to_string(),
            _ => format!("\\{b:02X}"),
        })
        .collect()
}

impl Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "define void @{}({}) {{",
            self.name,
            self.params
                .iter()
                .format_with(", ", |p, f| f(&format_args!("i32 %{p}")))
        )?;
        for (i, bb) in self.basic_blocks.iter().enumerate() {
            if i != 0 {
                writeln!(f)?;
            }
            write_block(f, self, bb)?;
        }
        writeln!(f, "}}")
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, function: &Function, bb: &BasicBlock) -> fmt::Result {
    writeln!(f, "{}:", bb.label)?;
    for i in &bb.instructions {
        writeln!(f, "  {i}")?;
    }
    match &bb.end_instruction {
        Some(EndInstruction::Ret) => writeln!(f, "  ret void"),
        Some(EndInstruction::Br { label }) => {
            writeln!(f, "  br label %{}", function.block(*label).label)
        }
        Some(EndInstruction::CondBr {
            cond,
            then,
            otherwise,
        }) => writeln!(
            f,
            "  br i1 {cond}, label %{}, label %{}",
            function.block(*then).label,
            function.block(*otherwise).label
        ),
        None => writeln!(f, "  unreachable"),
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Alloca { dest } => write!(f, "%{dest} = alloca i32"),
            Instruction::Load { dest, ptr } => write!(f, "%{dest} = load i32, ptr {ptr}"),
            Instruction::Store { value, ptr } => write!(f, "store i32 {value}, ptr {ptr}"),
            Instruction::Binary { dest, op, lhs, rhs } => {
                write!(f, "%{dest} = {op} {} {lhs}, {rhs}", lhs.ty())
            }
            Instruction::Icmp {
                dest,
                predicate,
                lhs,
                rhs,
            } => write!(f, "%{dest} = icmp {predicate} i32 {lhs}, {rhs}"),
            Instruction::Zext { dest, value } => write!(f, "%{dest} = zext i1 {value} to i32"),
            Instruction::Call {
                dest,
                callee,
                ret,
                args,
            } => {
                if let Some(dest) = dest {
                    write!(f, "%{dest} = ")?;
                }
                write!(
                    f,
                    "call {ret} @{callee}({})",
                    args.iter()
                        .format_with(", ", |a, f| f(&format_args!("{} {a}", a.ty())))
                )
            }
        }
    }
}

impl Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callee::Runtime(p) => write!(f, "{p}"),
            Callee::User(name) => write!(f, "{name}"),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(i) => write!(f, "{i}"),
            Value::I1(b) => write!(f, "{b}"),
            Value::Local { name, .. } => write!(f, "%{name}"),
            Value::Global(name) => write!(f, "@{name}"),
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Type::Void => "void",
            Type::I1 => "i1",
            Type::I32 => "i32",
            Type::Ptr => "ptr",
        })
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        })
    }
}

impl Display for IntPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Slt => "slt",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sle => "sle",
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{Builder, IntPredicate, Module, Primitive, Value};

    #[test]
    fn render_small_module() {
        let mut m = Module::new("demo");
        m.declare(Primitive::MoveForward);
        let x = m.add_global("x");
        m.intern_string("café \"rojo\"");
        let mut b = Builder::new("main", Vec::new());
        b.store(Value::I32(5), x.clone());
        let v = b.load(x);
        let c = b.icmp(IntPredicate::Sgt, v.clone(), Value::I32(0));
        let then = b.append_block("then");
        let join = b.append_block("join");
        b.cond_br(c, then, join);
        b.position_at_end(then);
        b.call_primitive(Primitive::MoveForward, vec![v]);
        b.br(join);
        b.position_at_end(join);
        b.ret();
        m.functions.push(b.finish());

        let text = m.to_string();
        let expected = r#"; ModuleID = 'demo'
source_filename = "demo"
@.str.0 = private unnamed_addr constant [13 x i8] c"caf\C3\A9 \22rojo\22\00"
@g.x = internal global i32 0

declare void @move_forward(i32)

define void @main() {
entry:
  store i32 5, ptr @g.x
  %t0 = load i32, ptr @g.x
  %t1 = icmp sgt i32 %t0, 0
  br i1 %t1, label %then.0, label %join.0

then.0:
  call void @move_forward(i32 %t0)
  br label %join.0

join.0:
  ret void
}
"#;
        assert_eq!(text, expected);
    }
}
