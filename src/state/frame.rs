//! Per-block abstract machine state.

use std::fmt::Write;

use crate::{
    ir::Value,
    state::{AbstractStack, Section},
};

/// The abstract stack at a block boundary plus its section layout.
///
/// `phis` lists the phi placeholders created when this state was the entry of
/// a join block; it is empty for every other state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    pub(crate) stack: AbstractStack,
    pub(crate) struct_ret: Section,
    pub(crate) this: Section,
    pub(crate) arguments: Section,
    pub(crate) locals: Section,
    pub(crate) phis: Vec<Value>,
}

impl State {
    /// The abstract stack.
    #[must_use]
    pub fn stack(&self) -> &AbstractStack {
        &self.stack
    }

    /// Mutable access to the abstract stack, for lowerings.
    pub fn stack_mut(&mut self) -> &mut AbstractStack {
        &mut self.stack
    }

    /// Stack depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Struct-return slot, empty unless the method returns a struct by pointer.
    #[must_use]
    pub fn struct_ret(&self) -> Section {
        self.struct_ret
    }

    /// The `this` slot, empty for static methods.
    #[must_use]
    pub fn this(&self) -> Section {
        self.this
    }

    /// Arguments as CIL numbers them; slot 0 is `this` when present.
    #[must_use]
    pub fn arguments(&self) -> Section {
        self.arguments
    }

    /// Local variables.
    #[must_use]
    pub fn locals(&self) -> Section {
        self.locals
    }

    /// Everything above the locals: the evaluation stack proper.
    #[must_use]
    pub fn rest(&self) -> Section {
        let base = self.locals.end();
        Section::new(base, self.depth().saturating_sub(base))
    }

    /// Phi placeholders owned by this state.
    #[must_use]
    pub fn phis(&self) -> &[Value] {
        &self.phis
    }

    /// True if the four sections have the same extents as `other`'s.
    #[must_use]
    pub fn same_layout(&self, other: &State) -> bool {
        self.sections() == other.sections()
    }

    pub(crate) fn sections(&self) -> [Section; 4] {
        [self.struct_ret, self.this, self.arguments, self.locals]
    }

    /// Returns a copy sharing every value handle, with the same section extents
    /// and no phis.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cilflow::{ir::Value, state::State};
    ///
    /// let mut state = State::default();
    /// state.stack_mut().push(Value::i32_zero());
    /// let mut copy = state.fork();
    /// copy.stack_mut().pop();
    /// assert_eq!(state.depth(), 1);
    /// assert_eq!(copy.depth(), 0);
    /// assert!(copy.phis().is_empty());
    /// ```
    #[must_use]
    pub fn fork(&self) -> State {
        State {
            stack: self.stack.clone(),
            struct_ret: self.struct_ret,
            this: self.this,
            arguments: self.arguments,
            locals: self.locals,
            phis: Vec::new(),
        }
    }

    /// Renders sizes and sections for diagnostics, every line prefixed by `indent`.
    #[must_use]
    pub fn trace(&self, indent: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{indent}This size = {}", self.this.len());
        let _ = writeln!(out, "{indent}Args size = {}", self.arguments.len());
        let _ = writeln!(out, "{indent}Locals size = {}", self.locals.len());
        let _ = writeln!(out, "{indent}Stack size = {}", self.depth());
        if !self.this.is_empty() {
            self.trace_section(&mut out, indent, "this", self.this);
        }
        self.trace_section(&mut out, indent, "args", self.arguments);
        self.trace_section(&mut out, indent, "locs", self.locals);
        self.trace_section(&mut out, indent, "rest of stack", self.rest());
        self.trace_section(
            &mut out,
            indent,
            "complete stack",
            Section::new(0, self.depth()),
        );
        out
    }

    fn trace_section(&self, out: &mut String, indent: &str, name: &str, section: Section) {
        let _ = writeln!(out, "{indent}[{name} (base {})", section.base());
        for value in self.stack.view(section) {
            let _ = writeln!(out, "{indent}{value}");
        }
        let _ = writeln!(out, "{indent}]");
    }
}
