//! Concurrent compilation of independent methods.

use log::warn;
use rayon::prelude::*;

use crate::{
    compiler::{CompiledMethod, MethodCompiler},
    config::CompilerOptions,
    metadata::{token::Token, MethodBody},
    Result,
};

/// Compiles every body on the rayon pool, one worker per method.
///
/// Each worker builds and owns its method's graph, states and value table; the
/// bodies are the only shared data. Results come back in input order so a
/// failing method can be skipped without losing the others.
///
/// # Examples
///
/// ```rust
/// use cilflow::{
///     assembly::InstructionAssembler,
///     compiler::compile_methods,
///     config::CompilerOptions,
///     metadata::{signature::MethodSignature, token::Token, MethodBody},
/// };
///
/// let bodies: Vec<MethodBody> = (1..=4)
///     .map(|row| -> cilflow::Result<MethodBody> {
///         let code = InstructionAssembler::new().nop().ret().finish()?;
///         Ok(MethodBody::new(Token::method(row), format!("M{row}"), MethodSignature::default(), Vec::new(), code))
///     })
///     .collect::<cilflow::Result<_>>()?;
///
/// let results = compile_methods(&bodies, CompilerOptions::default());
/// assert_eq!(results.len(), 4);
/// assert!(results.iter().all(|(_, r)| r.is_ok()));
/// # Ok::<(), cilflow::Error>(())
/// ```
pub fn compile_methods(
    bodies: &[MethodBody],
    options: CompilerOptions,
) -> Vec<(Token, Result<CompiledMethod>)> {
    bodies
        .par_iter()
        .map(|body| {
            let result = MethodCompiler::new(options).compile(body);
            if let Err(error) = &result {
                warn!("skipping {} ({}): {}", body.name, body.token, error);
            }
            (body.token, result)
        })
        .collect()
}
