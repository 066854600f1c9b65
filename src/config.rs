//! Compiler configuration.
//!
//! [`CompilerOptions`] controls how blocks are partitioned, whether call edges are
//! wired between methods, whether phi operand types are checked, and which
//! diagnostic traces are emitted through the `log` facade.

use std::str::FromStr;

use bitflags::bitflags;

use crate::{Error, Result};

/// Environment variable read by [`CompilerOptions::from_env`].
pub const TRACE_ENV: &str = "CILFLOW_TRACE";

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Default, Hash)]
    /// Diagnostic trace switches.
    pub struct TraceFlags : u32 {
        /// Whole-graph text dump after construction
        const GRAPH = 0x01;
        /// Block partitioning and splitting
        const CFG_CONSTRUCTION = 0x02;
        /// Entry/exit state computation and phi fill
        const STATE = 0x04;
        /// DOT dump after construction
        const DOT = 0x08;
        /// Per-block lowering
        const JIT = 0x10;
    }
}

impl TraceFlags {
    /// Parses a comma-separated list of trace names.
    ///
    /// Recognised names are `graph`, `cfg`, `state`, `dot`, `jit` and `all`;
    /// whitespace and empty items are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for an unknown name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cilflow::config::TraceFlags;
    ///
    /// let flags = TraceFlags::from_spec("graph, state")?;
    /// assert_eq!(flags, TraceFlags::GRAPH | TraceFlags::STATE);
    /// # Ok::<(), cilflow::Error>(())
    /// ```
    pub fn from_spec(spec: &str) -> Result<Self> {
        let mut flags = TraceFlags::empty();
        for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            flags |= match item.to_ascii_lowercase().as_str() {
                "graph" => TraceFlags::GRAPH,
                "cfg" => TraceFlags::CFG_CONSTRUCTION,
                "state" => TraceFlags::STATE,
                "dot" => TraceFlags::DOT,
                "jit" => TraceFlags::JIT,
                "all" => TraceFlags::all(),
                other => return Err(malformed_error!("Unknown trace flag '{}'", other)),
            };
        }
        Ok(flags)
    }
}

impl FromStr for TraceFlags {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TraceFlags::from_spec(s)
    }
}

/// Options for building and resolving method graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct CompilerOptions {
    /// Enabled diagnostic traces
    pub trace: TraceFlags,
    /// End a block after every call and wire an explicit call-return edge
    pub split_at_calls: bool,
    /// Add interprocedural edges from call blocks to callee entries in the graph
    pub link_calls: bool,
    /// Reject phi operands whose type differs from the phi's type
    pub verify_phi_types: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            trace: TraceFlags::empty(),
            split_at_calls: false,
            link_calls: false,
            verify_phi_types: true,
        }
    }
}

impl CompilerOptions {
    /// No diagnostics, strict phi checking.
    #[must_use]
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Every trace enabled.
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            trace: TraceFlags::all(),
            ..Self::default()
        }
    }

    /// Accepts phi operands of differing types.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            verify_phi_types: false,
            ..Self::default()
        }
    }

    /// Splits at calls and links callers to callee entries, for call-graph work.
    #[must_use]
    pub fn call_graph() -> Self {
        Self {
            split_at_calls: true,
            link_calls: true,
            ..Self::default()
        }
    }

    /// Default options with traces taken from `CILFLOW_TRACE`.
    ///
    /// An unset variable means no traces.
    ///
    /// # Errors
    ///
    /// Fails if the variable names an unknown trace.
    pub fn from_env() -> Result<Self> {
        let trace = match std::env::var(TRACE_ENV) {
            Ok(spec) => TraceFlags::from_spec(&spec)?,
            Err(_) => TraceFlags::empty(),
        };
        Ok(Self {
            trace,
            ..Self::default()
        })
    }

    /// Replaces the trace flags.
    #[must_use]
    pub fn with_trace(mut self, trace: TraceFlags) -> Self {
        self.trace = trace;
        self
    }

    /// True if `flag` is enabled.
    #[must_use]
    pub fn traces(&self, flag: TraceFlags) -> bool {
        self.trace.contains(flag)
    }
}
