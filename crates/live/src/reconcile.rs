//! Reconciliation Layer: three-way merge of confirmed, live and optimistic turns.
//!
//! Pure function of its inputs; every trigger (history load, live delivery,
//! local input) recomputes the whole list, so repeated calls are safe and
//! produce identical output.

use std::collections::{HashMap, HashSet, VecDeque};
use turnweave_core::{ConversationTurn, Role};

/// Merge `base` (confirmed), `live_overlay` (streamed, unconfirmed) and
/// `optimistic` (local, unacknowledged) into one ordered, id-unique list.
///
/// - `base` order and ids are kept; real base content always wins.
/// - A live turn fills the base turn with the same id if that turn is still
///   empty.
/// - Otherwise the k-th live assistant turn of a run maps to the k-th base
///   assistant turn of the same run: it fills that slot while it is empty and
///   is retired once base has content there.
/// - Remaining assistant live turns fill the next empty assistant slot in
///   `base`, in order.
/// - Optimistic entries whose id is already present only fill empty content;
///   the rest are appended.
/// - Live turns that found no slot are appended last.
/// - Blank turns are dropped and repeated ids get `:1`, `:2`, ... suffixes.
pub fn reconcile(
    base: &[ConversationTurn],
    live_overlay: &[ConversationTurn],
    optimistic: &[ConversationTurn],
) -> Vec<ConversationTurn> {
    let mut merged: Vec<ConversationTurn> = base.to_vec();
    let mut position: HashMap<String, usize> = HashMap::new();
    for (i, turn) in merged.iter().enumerate() {
        position.entry(turn.id.clone()).or_insert(i);
    }

    let mut run_slots: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, turn) in base.iter().enumerate() {
        if let (Role::Assistant, Some(run)) = (turn.role, turn.run_id.as_deref()) {
            run_slots.entry(run).or_default().push(i);
        }
    }

    let mut run_ordinal: HashMap<&str, usize> = HashMap::new();
    let mut unmatched_live = Vec::new();
    for turn in live_overlay {
        let run_slot = match (turn.role, turn.run_id.as_deref()) {
            (Role::Assistant, Some(run)) => {
                let ordinal = run_ordinal.entry(run).or_insert(0);
                let slot = run_slots.get(run).and_then(|slots| slots.get(*ordinal)).copied();
                *ordinal += 1;
                slot
            }
            _ => None,
        };
        match position.get(&turn.id).copied().or(run_slot) {
            Some(i) => fill_if_blank(&mut merged[i], turn),
            None => unmatched_live.push(turn),
        }
    }

    // Positional streaming display: the next unfilled assistant slot takes the
    // next live assistant turn.
    let mut open_slots: VecDeque<usize> = merged
        .iter()
        .enumerate()
        .filter(|(_, turn)| turn.role == Role::Assistant && turn.is_blank())
        .map(|(i, _)| i)
        .collect();
    let mut trailing_live = Vec::new();
    for turn in unmatched_live {
        if turn.role == Role::Assistant {
            if let Some(slot) = open_slots.pop_front() {
                fill_if_blank(&mut merged[slot], turn);
                continue;
            }
        }
        trailing_live.push(turn);
    }

    for entry in dedupe_last_wins(optimistic) {
        append_or_fill(&mut merged, &mut position, entry);
    }
    for turn in trailing_live {
        append_or_fill(&mut merged, &mut position, turn);
    }

    merged.retain(|turn| !turn.is_blank());
    ensure_unique_ids(&mut merged);
    merged
}

/// Drop optimistic entries whose id has been confirmed. Returns how many
/// were removed. Keyed purely by id membership, so it is safe to run on
/// every trigger.
pub fn prune_confirmed<'a>(
    optimistic: &mut Vec<ConversationTurn>,
    confirmed: impl IntoIterator<Item = &'a ConversationTurn>,
) -> usize {
    let confirmed: HashSet<&str> = confirmed.into_iter().map(|t| t.id.as_str()).collect();
    let before = optimistic.len();
    optimistic.retain(|entry| !confirmed.contains(entry.id.as_str()));
    before - optimistic.len()
}

/// Give every later occurrence of a repeated id the first free `id:N` suffix.
pub fn ensure_unique_ids(turns: &mut [ConversationTurn]) {
    let mut taken: HashSet<String> = turns.iter().map(|t| t.id.clone()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();

    for turn in turns.iter_mut() {
        if seen.insert(turn.id.clone()) {
            continue;
        }
        let counter = next_suffix.entry(turn.id.clone()).or_insert(1);
        let candidate = loop {
            let candidate = format!("{}:{}", turn.id, counter);
            *counter += 1;
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(candidate.clone());
        seen.insert(candidate.clone());
        turn.id = candidate;
    }
}

fn fill_if_blank(target: &mut ConversationTurn, source: &ConversationTurn) {
    if target.is_blank() && !source.is_blank() {
        target.content = source.content.clone();
        if target.run_id.is_none() {
            target.run_id = source.run_id.clone();
        }
    }
}

fn append_or_fill(
    merged: &mut Vec<ConversationTurn>,
    position: &mut HashMap<String, usize>,
    turn: &ConversationTurn,
) {
    match position.get(&turn.id) {
        Some(&i) => fill_if_blank(&mut merged[i], turn),
        None => {
            position.insert(turn.id.clone(), merged.len());
            merged.push(turn.clone());
        }
    }
}

/// Two optimistic entries with one id: the later one's content wins, at the
/// earlier one's position.
fn dedupe_last_wins(entries: &[ConversationTurn]) -> Vec<&ConversationTurn> {
    let mut order: Vec<&ConversationTurn> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        match index.get(entry.id.as_str()) {
            Some(&i) => order[i] = entry,
            None => {
                index.insert(entry.id.as_str(), order.len());
                order.push(entry);
            }
        }
    }
    order
}
