use crate::model::Usage;

/// Vendor-neutral result of one agent invocation.
///
/// Built incrementally by the stream parser and finalized at end of stream or
/// at an explicit terminal marker.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunResult {
    pub num_turns: u32,
    pub usage: Usage,
    /// API time spent by the agent, in milliseconds.
    pub duration_ms: u64,
    pub result_text: String,
    pub session_id: String,
}

/// Capability shared by every vendor result.
///
/// Implemented for `Option<T>` and references as well, so absent results can
/// be passed around and queried without special casing: an absent result
/// reports zero turns.
pub trait UnifiedResult {
    /// The underlying run result, if there is one.
    fn run_result(&self) -> Option<&RunResult>;

    /// Number of turns the agent took.
    fn num_turns(&self) -> u32 {
        self.run_result().map_or(0, |run| run.num_turns)
    }
}

impl UnifiedResult for RunResult {
    fn run_result(&self) -> Option<&RunResult> {
        Some(self)
    }
}

impl<T: UnifiedResult + ?Sized> UnifiedResult for &T {
    fn run_result(&self) -> Option<&RunResult> {
        (**self).run_result()
    }
}

impl<T: UnifiedResult + ?Sized> UnifiedResult for Box<T> {
    fn run_result(&self) -> Option<&RunResult> {
        (**self).run_result()
    }
}

impl<T: UnifiedResult> UnifiedResult for Option<T> {
    fn run_result(&self) -> Option<&RunResult> {
        self.as_ref().and_then(UnifiedResult::run_result)
    }
}

/// Turn count of a possibly absent result.
pub fn turn_count(result: Option<&dyn UnifiedResult>) -> u32 {
    result.num_turns()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_results_report_zero_turns() {
        let missing: Option<RunResult> = None;
        assert_eq!(missing.num_turns(), 0);
        assert_eq!(turn_count(None), 0);
    }

    #[test]
    fn present_results_report_their_turns() {
        let run = RunResult {
            num_turns: 4,
            ..RunResult::default()
        };
        assert_eq!(turn_count(Some(&run)), 4);
        assert_eq!(Some(run).num_turns(), 4);
    }
}
