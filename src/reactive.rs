//! Helpers over the spark-signals reactive context.
//!
//! spark-signals parents every effect created while another effect runs to
//! that effect, and destroys those children when the parent re-runs. Slot
//! children and trigger watchers must outlive the effect that happened to
//! create them, so they are created here, outside any reaction.

use std::rc::Weak;

use spark_signals::{with_context, AnyReaction};

type ReactionRef = Option<Weak<dyn AnyReaction>>;

/// Restores the previous reaction context on drop (also on panic).
struct ContextGuard {
    reaction: ReactionRef,
    effect: ReactionRef,
    untracking: bool,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let reaction = self.reaction.take();
        let effect = self.effect.take();
        let untracking = self.untracking;
        with_context(|ctx| {
            ctx.set_active_reaction(reaction);
            ctx.set_active_effect(effect);
            ctx.set_untracking(untracking);
        });
    }
}

/// Run `f` as if no effect or derived were running.
///
/// Reads inside `f` are not tracked by the caller's reaction, and effects
/// created inside `f` are root effects owned by whoever holds their stop
/// function.
pub(crate) fn outside_reaction<R>(f: impl FnOnce() -> R) -> R {
    let _guard = with_context(|ctx| ContextGuard {
        reaction: ctx.set_active_reaction(None),
        effect: ctx.set_active_effect(None),
        untracking: ctx.set_untracking(false),
    });
    f()
}
