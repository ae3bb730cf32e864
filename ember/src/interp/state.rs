//! Execution state and control-flow signals

use super::Value;

/// Nesting counters threaded through statement execution.
///
/// Never mutated in place: entering a loop body or a call produces a new
/// record. A call resets `loop_depth`, so `break`/`continue` inside a function
/// body cannot reach a loop in the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecState {
    pub call_depth: usize,
    pub loop_depth: usize,
}

impl ExecState {
    /// State of the top-level program block
    pub fn top_level() -> Self {
        Self::default()
    }

    pub fn enter_call(self) -> Self {
        ExecState {
            call_depth: self.call_depth + 1,
            loop_depth: 0,
        }
    }

    pub fn enter_loop(self) -> Self {
        ExecState {
            loop_depth: self.loop_depth + 1,
            ..self
        }
    }

    pub fn in_loop(self) -> bool {
        self.loop_depth > 0
    }

    pub fn in_call(self) -> bool {
        self.call_depth > 0
    }
}

/// How a statement finished.
///
/// Blocks stop at the first non-`Normal` signal. Loops consume `Break` and
/// `Continue`; calls consume `Return`.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

impl Flow {
    pub fn is_normal(&self) -> bool {
        matches!(self, Flow::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_allows_nothing() {
        let state = ExecState::top_level();
        assert!(!state.in_loop());
        assert!(!state.in_call());
    }

    #[test]
    fn test_enter_loop_nests() {
        let state = ExecState::top_level().enter_loop().enter_loop();
        assert_eq!(state.loop_depth, 2);
        assert_eq!(state.call_depth, 0);
    }

    #[test]
    fn test_enter_call_resets_loop_depth() {
        let outer = ExecState::top_level().enter_loop();
        let inner = outer.enter_call();
        assert!(!inner.in_loop());
        assert!(inner.in_call());
        // the caller's record is untouched
        assert_eq!(outer.loop_depth, 1);
        assert_eq!(outer.call_depth, 0);
    }

    #[test]
    fn test_flow_is_normal() {
        assert!(Flow::Normal.is_normal());
        assert!(!Flow::Break.is_normal());
        assert!(!Flow::Return(Value::Nil).is_normal());
    }
}
