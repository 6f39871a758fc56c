mod error;
mod gen_ir;
mod intrinsics;
mod optimize;

pub use error::{Error, GenError};
pub use gen_ir::{generate, generate_module};
pub use logo_ir::Module;
pub use optimize::{optimize, optimize_with, pass, OptimizeOptions, Optimized};
use syntax::Node;

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub optimize: bool,
    pub optimizer: OptimizeOptions,
    /// Recorded as the module id and `source_filename`.
    pub module_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            optimize: true,
            optimizer: OptimizeOptions::default(),
            module_name: "logotec".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Compiled {
    /// The tree that was lowered, optimized unless disabled.
    pub tree: Node,
    pub rewrites: usize,
    pub module: Module,
}

pub fn compile(tree: &Node, options: &CompileOptions) -> Result<Compiled, Error> {
    let (tree, rewrites) = if options.optimize {
        let optimized = optimize_with(tree.clone(), &options.optimizer);
        log::info!(
            "optimizer applied {} rewrites in {} passes ({} -> {} nodes)",
            optimized.rewrites,
            optimized.passes,
            tree.node_count(),
            optimized.tree.node_count()
        );
        (optimized.tree, optimized.rewrites)
    } else {
        (tree.clone(), 0)
    };
    let module = generate_module(&tree, &options.module_name)?;
    Ok(Compiled {
        tree,
        rewrites,
        module,
    })
}

pub fn compile_json(src: &str, options: &CompileOptions) -> Result<Compiled, Error> {
    let tree = syntax::from_json(src)?;
    compile(&tree, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{"kind": "PROGRAM", "children": [{"kind": "STMTS", "children": [
        {"kind": "INIC", "children": [
            {"kind": "ID", "value": "x"},
            {"kind": "BINOP", "value": "+", "children": [
                {"kind": "NUM", "value": 2}, {"kind": "NUM", "value": 3}
            ]}
        ]},
        {"kind": "REPITE", "children": [
            {"kind": "NUM", "value": 1},
            {"kind": "AV", "children": [
                {"kind": "BINOP", "value": "*", "children": [
                    {"kind": "ID", "value": "x"}, {"kind": "NUM", "value": 1}
                ]}
            ]}
        ]}
    ]}]}"#;

    #[test]
    fn optimized_pipeline() {
        let compiled = compile_json(SQUARE, &CompileOptions::default()).unwrap();
        assert!(compiled.rewrites >= 3);
        let text = compiled.module.to_string();
        assert!(text.contains("store i32 5, ptr @g.x"));
        assert!(!text.contains("repeat.cond"));
        assert!(!text.contains("mul i32"));
    }

    #[test]
    fn unoptimized_pipeline_keeps_the_loop() {
        let options = CompileOptions {
            optimize: false,
            module_name: "square.json".to_string(),
            ..Default::default()
        };
        let compiled = compile_json(SQUARE, &options).unwrap();
        assert_eq!(compiled.rewrites, 0);
        let text = compiled.module.to_string();
        assert!(text.starts_with("; ModuleID = 'square.json'"));
        assert!(text.contains("repeat.cond.0:"));
        assert!(text.contains("add i32 2, 3"));
    }

    #[test]
    fn optimizing_float_arithmetic_keeps_the_result() {
        let src = r#"{"kind": "AV", "children": [
            {"kind": "BINOP", "value": "*", "children": [
                {"kind": "NUM", "value": 2.5}, {"kind": "NUM", "value": 2}
            ]}
        ]}"#;
        let optimized = compile_json(src, &CompileOptions::default()).unwrap();
        assert!(optimized
            .module
            .to_string()
            .contains("call void @move_forward(i32 4)"));
        let plain = CompileOptions {
            optimize: false,
            ..Default::default()
        };
        let text = compile_json(src, &plain).unwrap().module.to_string();
        assert!(text.contains("%t0 = mul i32 2, 2"), "{text}");
        assert!(text.contains("call void @move_forward(i32 %t0)"), "{text}");
    }

    #[test]
    fn decode_errors_surface() {
        let err = compile_json(r#"{"kind": "VOLAR"}"#, &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Ast(_)));
    }
}
