use crate::{
    convert_name, BasicBlock, BinaryOp, Callee, EndInstruction, Function, Instruction,
    IntPredicate, Primitive, Type, Value,
};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

/// Insertion cursor over a single function under construction.
#[derive(Debug)]
pub struct Builder {
    function: Function,
    current: BlockId,
    entry_allocas: usize,
    temp_count: usize,
    label_counts: FxHashMap<&'static str, usize>,
    slot_count: usize,
}

impl Builder {
    /// Starts `name` with an empty `entry` block and the cursor on it.
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Self {
        Builder {
            function: Function {
                name: name.into(),
                params,
                basic_blocks: vec![BasicBlock {
                    label: "entry".to_string(),
                    instructions: Vec::new(),
                    end_instruction: None,
                }],
            },
            current: BlockId(0),
            entry_allocas: 0,
            temp_count: 0,
            label_counts: FxHashMap::default(),
            slot_count: 0,
        }
    }

    pub fn param(&self, index: usize) -> Value {
        Value::Local {
            name: self.function.params[index].clone(),
            ty: Type::I32,
        }
    }

    /// Adds a block labelled `{hint}.{n}`; the cursor does not move.
    pub fn append_block(&mut self, hint: &'static str) -> BlockId {
        let n = self.label_counts.entry(hint).or_default();
        let label = format!("{hint}.{n}");
        *n += 1;
        self.function.basic_blocks.push(BasicBlock {
            label,
            instructions: Vec::new(),
            end_instruction: None,
        });
        BlockId(self.function.basic_blocks.len() - 1)
    }

    pub fn position_at_end(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn is_terminated(&self) -> bool {
        self.function.basic_blocks[self.current.0]
            .end_instruction
            .is_some()
    }

    fn fresh_temp(&mut self, ty: Type) -> (String, Value) {
        let name = format!("t{}", self.temp_count);
        self.temp_count += 1;
        let value = Value::Local {
            name: name.clone(),
            ty,
        };
        (name, value)
    }

    fn push(&mut self, instruction: Instruction) {
        let block = &mut self.function.basic_blocks[self.current.0];
        debug_assert!(
            block.end_instruction.is_none(),
            "instruction appended after terminator in {}",
            block.label
        );
        block.instructions.push(instruction);
    }

    /// Reserves an `i32` slot for `name` at the top of the entry block.
    pub fn alloca(&mut self, name: &str) -> Value {
        let dest = format!("v.{}.{}", convert_name(name), self.slot_count);
        self.slot_count += 1;
        self.function.basic_blocks[0]
            .instructions
            .insert(self.entry_allocas, Instruction::Alloca { dest: dest.clone() });
        self.entry_allocas += 1;
        Value::Local {
            name: dest,
            ty: Type::Ptr,
        }
    }

    pub fn load(&mut self, ptr: Value) -> Value {
        let (dest, value) = self.fresh_temp(Type::I32);
        self.push(Instruction::Load { dest, ptr });
        value
    }

    pub fn store(&mut self, value: Value, ptr: Value) {
        self.push(Instruction::Store { value, ptr });
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        let (dest, value) = self.fresh_temp(lhs.ty());
        self.push(Instruction::Binary { dest, op, lhs, rhs });
        value
    }

    pub fn icmp(&mut self, predicate: IntPredicate, lhs: Value, rhs: Value) -> Value {
        let (dest, value) = self.fresh_temp(Type::I1);
        self.push(Instruction::Icmp {
            dest,
            predicate,
            lhs,
            rhs,
        });
        value
    }

    pub fn zext(&mut self, v: Value) -> Value {
        let (dest, value) = self.fresh_temp(Type::I32);
        self.push(Instruction::Zext { dest, value: v });
        value
    }

    /// Returns the result register, or `None` for `void` callees.
    pub fn call(&mut self, callee: Callee, ret: Type, args: Vec<Value>) -> Option<Value> {
        let (dest, value) = if ret == Type::Void {
            (None, None)
        } else {
            let (d, v) = self.fresh_temp(ret);
            (Some(d), Some(v))
        };
        self.push(Instruction::Call {
            dest,
            callee,
            ret,
            args,
        });
        value
    }

    pub fn call_value(&mut self, callee: Callee, ret: Type, args: Vec<Value>) -> Value {
        let (dest, value) = self.fresh_temp(ret);
        self.push(Instruction::Call {
            dest: Some(dest),
            callee,
            ret,
            args,
        });
        value
    }

    pub fn call_primitive(&mut self, primitive: Primitive, args: Vec<Value>) -> Option<Value> {
        self.call(Callee::Runtime(primitive), primitive.ret(), args)
    }

    fn terminate(&mut self, end: EndInstruction) {
        let block = &mut self.function.basic_blocks[self.current.0];
        debug_assert!(
            block.end_instruction.is_none(),
            "{} terminated twice",
            block.label
        );
        block.end_instruction = Some(end);
    }

    pub fn br(&mut self, label: BlockId) {
        self.terminate(EndInstruction::Br { label });
    }

    pub fn cond_br(&mut self, cond: Value, then: BlockId, otherwise: BlockId) {
        self.terminate(EndInstruction::CondBr {
            cond,
            then,
            otherwise,
        });
    }

    pub fn ret(&mut self) {
        self.terminate(EndInstruction::Ret);
    }

    pub fn finish(self) -> Function {
        log::debug!(
            "finished {} ({} blocks, {} temporaries)",
            self.function.name,
            self.function.basic_blocks.len(),
            self.temp_count
        );
        self.function
    }
}
