//! Transitive callee discovery.

use std::collections::{HashSet, VecDeque};

use log::debug;

use crate::{
    cfg::{CfgBuilder, ControlFlowGraph},
    config::{CompilerOptions, TraceFlags},
    metadata::{token::Token, MethodBody},
    Result,
};

/// Methods reachable from a root through calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Methods with a body, root first, in breadth-first discovery order
    pub methods: Vec<Token>,
    /// Called methods no body was found for, in discovery order
    pub external: Vec<Token>,
    /// Caller and callee pairs, one per linked call edge
    pub calls: Vec<(Token, Token)>,
}

/// Adds `root` and every method it transitively calls to `cfg`.
///
/// `lookup` returns the body of a called method, or `None` for methods outside
/// the set being compiled. Each discovered body is partitioned with
/// `options`; once the worklist is empty every call block is linked to its
/// callee's entry and the graph's interprocedural edges are reported in
/// [`Discovery::calls`].
///
/// # Errors
///
/// Any fault from partitioning a body or linking calls.
///
/// # Examples
///
/// ```rust
/// use std::collections::HashMap;
///
/// use cilflow::{
///     assembly::InstructionAssembler,
///     cfg::ControlFlowGraph,
///     compiler::discover_callees,
///     config::CompilerOptions,
///     metadata::{signature::MethodSignature, token::Token, MethodBody},
/// };
///
/// let leaf = MethodBody::new(
///     Token::method(2),
///     "Leaf",
///     MethodSignature::default(),
///     Vec::new(),
///     InstructionAssembler::new().ret().finish()?,
/// );
/// let root = MethodBody::new(
///     Token::method(1),
///     "Root",
///     MethodSignature::default(),
///     Vec::new(),
///     InstructionAssembler::new().call(Token::method(2), 0, 0).ret().finish()?,
/// );
/// let bodies: HashMap<Token, MethodBody> =
///     [(leaf.token, leaf), (root.token, root)].into_iter().collect();
///
/// let mut cfg = ControlFlowGraph::new();
/// let found = discover_callees(&mut cfg, Token::method(1), CompilerOptions::default(), |t| bodies.get(&t))?;
/// assert_eq!(found.methods, vec![Token::method(1), Token::method(2)]);
/// assert_eq!(found.calls, vec![(Token::method(1), Token::method(2))]);
/// # Ok::<(), cilflow::Error>(())
/// ```
pub fn discover_callees<'b, F>(
    cfg: &mut ControlFlowGraph,
    root: Token,
    options: CompilerOptions,
    mut lookup: F,
) -> Result<Discovery>
where
    F: FnMut(Token) -> Option<&'b MethodBody>,
{
    let mut discovery = Discovery::default();
    let mut seen = HashSet::new();
    let mut worklist = VecDeque::new();
    seen.insert(root);
    worklist.push_back(root);

    let mut builder = CfgBuilder::new(cfg, options);
    while let Some(method) = worklist.pop_front() {
        let Some(body) = lookup(method) else {
            discovery.external.push(method);
            continue;
        };
        builder.add_method(body)?;
        discovery.methods.push(method);

        for callee in body.call_targets() {
            if seen.insert(callee) {
                worklist.push_back(callee);
            }
        }
    }
    builder.link_calls()?;

    for &caller in &discovery.methods {
        for callee_entry in cfg.interprocedural_calls(caller)? {
            let callee = cfg.get(callee_entry)?.method();
            if !discovery.calls.contains(&(caller, callee)) {
                discovery.calls.push((caller, callee));
            }
        }
    }

    if options.traces(TraceFlags::CFG_CONSTRUCTION) {
        debug!(
            "discovered {} methods ({} external) from {}",
            discovery.methods.len(),
            discovery.external.len(),
            root
        );
    }
    Ok(discovery)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{assembly::InstructionAssembler, metadata::signature::MethodSignature};

    fn method(row: u32, calls: &[u32]) -> MethodBody {
        let mut code = InstructionAssembler::new();
        for &callee in calls {
            code = code.call(Token::method(callee), 0, 0);
        }
        MethodBody::new(
            Token::method(row),
            format!("M{row}"),
            MethodSignature::default(),
            Vec::new(),
            code.ret().finish().unwrap(),
        )
    }

    #[test]
    fn test_recursion_and_externals() {
        let bodies: HashMap<Token, MethodBody> = [method(1, &[2, 3]), method(2, &[1, 2]), method(3, &[9])]
            .into_iter()
            .map(|b| (b.token, b))
            .collect();

        let mut cfg = ControlFlowGraph::new();
        let found = discover_callees(&mut cfg, Token::method(1), CompilerOptions::default(), |t| {
            bodies.get(&t)
        })
        .unwrap();

        assert_eq!(
            found.methods,
            vec![Token::method(1), Token::method(2), Token::method(3)]
        );
        assert_eq!(found.external, vec![Token::method(9)]);
        assert!(found.calls.contains(&(Token::method(2), Token::method(1))));
        assert!(found.calls.contains(&(Token::method(1), Token::method(3))));
        assert_eq!(cfg.methods().len(), 3);
    }

    #[test]
    fn test_self_call_is_not_an_edge() {
        let bodies: HashMap<Token, MethodBody> =
            [method(1, &[1])].into_iter().map(|b| (b.token, b)).collect();
        let mut cfg = ControlFlowGraph::new();
        let found =
            discover_callees(&mut cfg, Token::method(1), CompilerOptions::default(), |t| bodies.get(&t))
                .unwrap();
        assert_eq!(found.methods, vec![Token::method(1)]);
        assert!(found.calls.is_empty());
    }
}
