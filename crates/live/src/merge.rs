//! Turn Merger: collapse adjacent same-role turns.
//!
//! Same `run_id` on both sides means token-level fragments of one reply and
//! the contents are joined directly. Anything else is a distinct turn that
//! happens to share a role and is joined with a blank line. Blank turns
//! (unfilled assistant slots) never add a separator.

use turnweave_core::ConversationTurn;

pub const TURN_SEPARATOR: &str = "\n\n";

/// Single pass; each merged group keeps the id, run id and position of its
/// first turn.
pub fn merge_adjacent_turns(
    turns: impl IntoIterator<Item = ConversationTurn>,
) -> Vec<ConversationTurn> {
    let mut merged: Vec<ConversationTurn> = Vec::new();
    // Run id of the most recent fragment folded into `merged.last()`.
    let mut tail_run: Option<String> = None;

    for turn in turns {
        if let Some(last) = merged.last_mut().filter(|last| last.role == turn.role) {
            let same_run = matches!(
                (tail_run.as_deref(), turn.run_id.as_deref()),
                (Some(a), Some(b)) if a == b
            );
            if !same_run && !last.is_blank() && !turn.is_blank() {
                last.content.push_str(TURN_SEPARATOR);
            }
            last.content.push_str(&turn.content);
            tail_run = turn.run_id;
            continue;
        }
        tail_run = turn.run_id.clone();
        merged.push(turn);
    }

    merged
}
