mod builder;
mod codegen;
mod collector;
mod runtime;

pub use builder::{BlockId, Builder};
pub use collector::Collector;
pub use runtime::Primitive;
pub use strum::IntoEnumIterator;

use rustc_hash::FxHashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    I1,
    I32,
    Ptr,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    I32(i32),
    I1(bool),
    /// SSA register or stack slot of the current function.
    Local { name: String, ty: Type },
    /// Address of a module-level variable or string constant.
    Global(String),
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::I32(_) => Type::I32,
            Value::I1(_) => Type::I1,
            Value::Local { ty, .. } => *ty,
            Value::Global(_) => Type::Ptr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntPredicate {
    Eq,
    Ne,
    Slt,
    Sgt,
    Sle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Runtime(Primitive),
    User(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// An `i32` stack slot.
    Alloca {
        dest: String,
    },
    Load {
        dest: String,
        ptr: Value,
    },
    Store {
        value: Value,
        ptr: Value,
    },
    Binary {
        dest: String,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
    },
    Icmp {
        dest: String,
        predicate: IntPredicate,
        lhs: Value,
        rhs: Value,
    },
    Zext {
        dest: String,
        value: Value,
    },
    Call {
        dest: Option<String>,
        callee: Callee,
        ret: Type,
        args: Vec<Value>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EndInstruction {
    Ret,
    Br {
        label: BlockId,
    },
    CondBr {
        cond: Value,
        then: BlockId,
        otherwise: BlockId,
    },
}

impl EndInstruction {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            EndInstruction::Ret => Vec::new(),
            EndInstruction::Br { label } => vec![*label],
            EndInstruction::CondBr {
                then, otherwise, ..
            } => vec![*then, *otherwise],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub end_instruction: Option<EndInstruction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub basic_blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.basic_blocks[id.0]
    }

    pub fn block_by_label(&self, label: &str) -> Option<(BlockId, &BasicBlock)> {
        self.basic_blocks
            .iter()
            .enumerate()
            .find(|(_, b)| b.label == label)
            .map(|(i, b)| (BlockId(i), b))
    }

    /// Blocks ending in a branch to `target`.
    pub fn predecessors(&self, target: BlockId) -> Vec<BlockId> {
        self.basic_blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| {
                b.end_instruction
                    .as_ref()
                    .map_or(false, |e| e.successors().contains(&target))
            })
            .map(|(i, _)| BlockId(i))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
    /// Module-level `i32` variables, by mangled symbol.
    pub globals: Vec<String>,
    strings: Collector<String>,
    declarations: FxHashSet<Primitive>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Pointer to a read-only, nul-terminated copy of `s`. Equal strings share one constant.
    pub fn intern_string(&mut self, s: &str) -> Value {
        let id = self.strings.get_or_insert(s.to_string());
        Value::Global(format!(".str.{id}"))
    }

    pub fn strings(&self) -> impl Iterator<Item = (usize, &str)> {
        self.strings.iter().map(|(i, s)| (i, s.as_str()))
    }

    pub fn add_global(&mut self, name: &str) -> Value {
        let symbol = format!("g.{}", convert_name(name));
        if !self.globals.contains(&symbol) {
            self.globals.push(symbol.clone());
        }
        Value::Global(symbol)
    }

    pub fn declare(&mut self, primitive: Primitive) {
        self.declarations.insert(primitive);
    }

    pub fn is_declared(&self, primitive: Primitive) -> bool {
        self.declarations.contains(&primitive)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Symbol of the function generated for the user procedure `name`.
pub fn procedure_symbol(name: &str) -> String {
    format!("proc.{}", convert_name(name))
}

/// Names outside `[A-Za-z0-9_]` are spelled as hex code points.
pub fn convert_name(name: &str) -> String {
    if is_valid_name(name) {
        name.to_string()
    } else {
        use itertools::Itertools;
        "unicode".to_string() + &name.chars().map(|c| format!("_{:x}", c as u32)).join("")
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with("unicode_")
}
