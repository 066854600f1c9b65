//! Text and DOT renderings of the graph.

use std::fmt::Write;

use crate::{cfg::ControlFlowGraph, utils::escape_dot};

impl ControlFlowGraph {
    /// Renders the whole graph as indented text.
    ///
    /// The dump lists entry blocks with their method, then every block ending in
    /// a call with the call instruction, then each method's blocks in order with
    /// their edges and instructions.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Graph:");
        let _ = writeln!(out);

        let _ = writeln!(out, "List of entry blocks:");
        let _ = writeln!(out, "{:<8}{}", "Node", "Method");
        for &method in self.methods() {
            if let Some(entry) = self.find_entry(method) {
                let _ = writeln!(out, "{:<8}{}", entry.to_string(), self.display_name(method));
            }
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "List of callers:");
        let _ = writeln!(out, "{:<8}{}", "Node", "Instruction");
        for block in self.blocks().filter(|b| b.is_call()) {
            if let Some(call) = block.last() {
                let _ = writeln!(out, "{:<8}{}", block.id().to_string(), call);
            }
        }
        let _ = writeln!(out);

        for &method in self.methods() {
            let Ok(layout) = self.ordered_blocks(method) else {
                continue;
            };
            for &block in layout {
                self.write_block(&mut out, block);
            }
        }
        out
    }

    fn display_name(&self, method: crate::metadata::token::Token) -> String {
        self.method_name(method)
            .map_or_else(|| method.to_string(), ToString::to_string)
    }

    fn write_block(&self, out: &mut String, id: crate::cfg::BlockId) {
        let Some(block) = self.block(id) else {
            return;
        };
        let shape = self.shape(block.method());
        let _ = writeln!(out, "Node: {id}");
        let _ = writeln!(out, "    Method {}", self.display_name(block.method()));
        let _ = writeln!(out, "    Args   {}", shape.map_or(0, |s| s.arguments));
        let _ = writeln!(out, "    Locals {}", shape.map_or(0, |s| s.locals()));
        let _ = writeln!(
            out,
            "    Return (reuse) {}",
            shape.is_some_and(|s| s.struct_return)
        );

        let from: Vec<String> = self.predecessors(id).map(|p| p.to_string()).collect();
        let to: Vec<String> = self.successors(id).map(|s| s.to_string()).collect();
        let _ = writeln!(out, "    Edges from: {}", from.join(" "));
        let _ = writeln!(out, "    Edges to: {}", to.join(" "));
        let _ = writeln!(out, "    Instructions:");
        for instruction in block.instructions() {
            let _ = writeln!(out, "        {instruction}");
        }
        let _ = writeln!(out);
    }

    /// Renders the graph in Graphviz DOT format.
    ///
    /// One `a -> b;` line per edge, then one line per block that has no edges
    /// at all, so that isolated blocks still show up.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cilflow::{cfg::{ControlFlowGraph, EdgeKind}, metadata::token::Token};
    ///
    /// let mut cfg = ControlFlowGraph::new();
    /// let a = cfg.add_vertex(Token::method(1), 0);
    /// let b = cfg.add_vertex(Token::method(1), 4);
    /// cfg.add_vertex(Token::method(2), 0);
    /// cfg.add_edge(a, b, EdgeKind::Fallthrough)?;
    /// assert_eq!(cfg.to_dot(), "digraph {\n  n0 -> n1;\n  n2;\n}\n");
    /// # Ok::<(), cilflow::Error>(())
    /// ```
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(dot, "digraph {{");
        for (from, to, _) in self.edges() {
            let _ = writeln!(dot, "  {} -> {};", escape_dot(&from.to_string()), escape_dot(&to.to_string()));
        }
        for block in self.blocks() {
            let id = block.id();
            if self.successors(id).next().is_none() && self.predecessors(id).next().is_none() {
                let _ = writeln!(dot, "  {};", escape_dot(&id.to_string()));
            }
        }
        let _ = writeln!(dot, "}}");
        dot
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        assembly::InstructionAssembler,
        cfg::{CfgBuilder, ControlFlowGraph},
        config::CompilerOptions,
        metadata::{
            signature::{MethodSignature, SourceType},
            token::Token,
            MethodBody,
        },
    };

    fn graph() -> ControlFlowGraph {
        let code = InstructionAssembler::new()
            .ldarg(0)
            .brtrue("done")
            .call(Token::method(2), 0, 0)
            .label("done")
            .ret()
            .finish()
            .unwrap();
        let body = MethodBody::new(
            Token::method(1),
            "Main",
            MethodSignature::new_static(vec![SourceType::Bool], SourceType::Void),
            vec![SourceType::I32],
            code,
        );
        let mut cfg = ControlFlowGraph::new();
        CfgBuilder::new(&mut cfg, CompilerOptions::default())
            .add_method(&body)
            .unwrap();
        cfg
    }

    #[test]
    fn test_text_dump() {
        let text = graph().to_text();
        assert!(text.starts_with("Graph:\n"));
        assert!(text.contains("List of entry blocks:\n"));
        assert!(text.contains("n0      Main\n"));
        assert!(text.contains("List of callers:\n"));
        assert!(text.contains("Node: n1\n    Method Main\n    Args   1\n    Locals 1\n"));
        assert!(text.contains("    Edges from: n0\n"));
        assert!(text.contains("    Edges to: n1 n2\n"));
        assert!(text.contains("        IL_0000: ldarg.0\n"));
    }

    #[test]
    fn test_dot_dump() {
        let dot = graph().to_dot();
        assert!(dot.starts_with("digraph {\n"));
        assert!(dot.contains("  n0 -> n1;\n"));
        assert!(dot.contains("  n0 -> n2;\n"));
        assert!(dot.contains("  n1 -> n2;\n"));
        assert!(dot.ends_with("}\n"));
    }
}
