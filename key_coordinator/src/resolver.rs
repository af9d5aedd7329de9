use std::fmt::Debug;
use upsert_types::MessageContext;

/// Pure, total decision function for which of two contexts for the same primary key wins.
///
/// Implementations must be:
///
/// * **Deterministic** — same inputs, same output.
/// * **Antisymmetric** — not both `should_delete_first(a, b)` and `should_delete_first(b, a)`
///   can be `true`.
/// * **Stable under equality** — if `a == b`, returns `false`.
pub trait ConflictResolver: Debug + Send + Sync {
    /// Decide whether `old` should be superseded by `new`.
    fn should_delete_first(&self, old: &MessageContext, new: &MessageContext) -> bool;
}

/// The default resolver: compares `timestamp`, falling back to `source_offset` to break ties;
/// the newer occurrence wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampThenOffsetResolver;

impl ConflictResolver for TimestampThenOffsetResolver {
    fn should_delete_first(&self, old: &MessageContext, new: &MessageContext) -> bool {
        if old == new {
            return false;
        }

        (new.timestamp, new.source_offset.get()) > (old.timestamp, old.source_offset.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upsert_types::{SegmentName, SourceOffset};

    fn ctx(offset: i64, ts: i64) -> MessageContext {
        MessageContext::new(SegmentName::from("s1"), SourceOffset::new(offset), ts)
    }

    #[test]
    fn equal_contexts_never_delete_first() {
        let resolver = TimestampThenOffsetResolver;
        let a = ctx(100, 10);
        let b = ctx(100, 10);
        assert!(!resolver.should_delete_first(&a, &b));
    }

    #[test]
    fn newer_timestamp_wins() {
        let resolver = TimestampThenOffsetResolver;
        let old = ctx(100, 10);
        let new = ctx(150, 20);
        assert!(resolver.should_delete_first(&old, &new));
        assert!(!resolver.should_delete_first(&new, &old));
    }

    #[test]
    fn ties_break_on_offset() {
        let resolver = TimestampThenOffsetResolver;
        let old = ctx(100, 10);
        let new = ctx(140, 10);
        assert!(resolver.should_delete_first(&old, &new));
        assert!(!resolver.should_delete_first(&new, &old));
    }

    #[test]
    fn is_antisymmetric_across_a_sweep_of_values() {
        let resolver = TimestampThenOffsetResolver;
        let contexts = [ctx(100, 10), ctx(100, 20), ctx(150, 10), ctx(90, 30)];
        for a in &contexts {
            for b in &contexts {
                if a != b {
                    assert!(
                        !(resolver.should_delete_first(a, b) && resolver.should_delete_first(b, a)),
                        "antisymmetry violated for {a:?}, {b:?}"
                    );
                }
            }
        }
    }
}
