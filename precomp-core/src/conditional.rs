//! The conditional-block stack (§3 "Conditional block", §4.3).
//!
//! A stack of frames, one per open `#if`, each tracking whether its branch
//! is active, whether any branch in the chain has been taken yet (so a
//! later `#elif`/`#else` knows to stay closed), and whether the parent
//! frame was active when this one was pushed (so nested directives inside
//! a dead branch don't get misread as live).

use precomp_foundation::{codes, DiagnosticSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    If,
    Ifdef,
    Ifndef,
}

#[derive(Debug, Clone)]
pub struct ConditionalBlock {
    pub parent_active: bool,
    pub branch_active: bool,
    pub in_else: bool,
    pub in_elif: bool,
    pub any_branch_taken: bool,
    pub start_line: u32,
    pub directive_kind: DirectiveKind,
}

#[derive(Debug, Clone, Default)]
pub struct ConditionalStack {
    frames: Vec<ConditionalBlock>,
}

impl ConditionalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack is empty, or every frame's `parent_active ∧ branch_active`.
    pub fn is_active(&self) -> bool {
        self.frames.iter().all(|f| f.parent_active && f.branch_active)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn unclosed(&self) -> &[ConditionalBlock] {
        &self.frames
    }

    /// Whether the current top frame's parent was active when it was
    /// pushed — used to decide whether an `#elif` condition is worth
    /// evaluating at all (§9 decision: dead branches don't get their
    /// expressions evaluated, so they can't produce spurious diagnostics).
    pub fn top_parent_active(&self) -> bool {
        self.frames.last().map(|f| f.parent_active).unwrap_or(true)
    }

    pub fn push(&mut self, condition: bool, start_line: u32, directive_kind: DirectiveKind) {
        let parent_active = self.is_active();
        let branch_active = parent_active && condition;
        self.frames.push(ConditionalBlock {
            parent_active,
            branch_active,
            in_else: false,
            in_elif: false,
            any_branch_taken: branch_active,
            start_line,
            directive_kind,
        });
    }

    pub fn elif(
        &mut self,
        condition: bool,
        line: u32,
        diagnostics: &mut dyn DiagnosticSink,
        source_file: &str,
    ) {
        let Some(top) = self.frames.last_mut() else {
            diagnostics.emit_error(
                source_file,
                line,
                1,
                1,
                "`#elif` with no matching `#if`",
                codes::par::MISMATCHED_CONDITIONAL,
            );
            return;
        };
        if top.in_else {
            diagnostics.emit_error(
                source_file,
                line,
                1,
                1,
                "`#elif` after `#else`",
                codes::par::MISMATCHED_CONDITIONAL,
            );
            return;
        }
        top.in_elif = true;
        top.branch_active = top.parent_active && !top.any_branch_taken && condition;
        if top.branch_active {
            top.any_branch_taken = true;
        }
    }

    pub fn else_(&mut self, line: u32, diagnostics: &mut dyn DiagnosticSink, source_file: &str) {
        let Some(top) = self.frames.last_mut() else {
            diagnostics.emit_error(
                source_file,
                line,
                1,
                1,
                "`#else` with no matching `#if`",
                codes::par::MISMATCHED_CONDITIONAL,
            );
            return;
        };
        if top.in_else {
            diagnostics.emit_error(
                source_file,
                line,
                1,
                1,
                "duplicate `#else`",
                codes::par::MISMATCHED_CONDITIONAL,
            );
            return;
        }
        top.in_else = true;
        top.branch_active = top.parent_active && !top.any_branch_taken;
    }

    pub fn endif(&mut self, line: u32, diagnostics: &mut dyn DiagnosticSink, source_file: &str) -> bool {
        if self.frames.pop().is_some() {
            true
        } else {
            diagnostics.emit_error(
                source_file,
                line,
                1,
                1,
                "`#endif` with no matching `#if`",
                codes::par::MISMATCHED_CONDITIONAL,
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn else_after_else_is_mismatched() {
        let mut stack = ConditionalStack::new();
        stack.push(true, 1, DirectiveKind::If);
        let mut diagnostics = Vec::new();
        stack.else_(2, &mut diagnostics, "t.lsl");
        stack.else_(3, &mut diagnostics, "t.lsl");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, Some(codes::par::MISMATCHED_CONDITIONAL));
    }

    #[test]
    fn elif_after_else_is_mismatched() {
        let mut stack = ConditionalStack::new();
        stack.push(true, 1, DirectiveKind::If);
        let mut diagnostics = Vec::new();
        stack.else_(2, &mut diagnostics, "t.lsl");
        stack.elif(true, 3, &mut diagnostics, "t.lsl");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn only_first_true_branch_is_active() {
        let mut stack = ConditionalStack::new();
        let mut diagnostics = Vec::new();
        stack.push(false, 1, DirectiveKind::If);
        assert!(!stack.is_active());
        stack.elif(true, 2, &mut diagnostics, "t.lsl");
        assert!(stack.is_active());
        stack.elif(true, 3, &mut diagnostics, "t.lsl");
        assert!(!stack.is_active());
        stack.else_(4, &mut diagnostics, "t.lsl");
        assert!(!stack.is_active());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn endif_pops_and_reports_imbalance() {
        let mut stack = ConditionalStack::new();
        let mut diagnostics = Vec::new();
        stack.push(true, 1, DirectiveKind::If);
        assert!(stack.endif(2, &mut diagnostics, "t.lsl"));
        assert!(!stack.endif(3, &mut diagnostics, "t.lsl"));
        assert_eq!(diagnostics.len(), 1);
    }
}
