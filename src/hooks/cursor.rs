//! Re-entrant walk over one tag's registrations
//!
//! The cursor never holds a borrow of the table between steps, so callbacks
//! run between two steps are free to mutate it. Positioning is by key:
//!
//! - buckets that existed when the cursor opened are walked in ascending
//!   priority, each strictly after the previous one;
//! - buckets created after the cursor opened are walked afterwards, in
//!   creation order, whatever their priority, unless their priority was
//!   already walked in this pass (a bucket emptied and filled again is
//!   recreated, and must not run twice);
//! - a bucket's membership is taken when the cursor enters it, and each
//!   member is looked up again right before it is yielded, so members
//!   removed in the meantime are skipped.

use crate::hooks::{HookPriority, HookTable, Registration, RegistrationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Sorted(HookPriority),
    Appended { from_seq: u64 },
    Exhausted,
}

#[derive(Debug)]
struct BucketWalk {
    priority: HookPriority,
    ids: Vec<RegistrationId>,
    pos: usize,
}

/// Walk position over one tag for the duration of one dispatch
#[derive(Debug)]
pub struct DispatchCursor {
    tag: String,
    horizon: u64,
    phase: Phase,
    bucket: Option<BucketWalk>,
    entered: Vec<HookPriority>,
}

impl DispatchCursor {
    /// Open a cursor at the start of `tag`
    pub fn open(tag: &str, table: &HookTable) -> Self {
        Self {
            tag: tag.to_string(),
            horizon: table.horizon(),
            phase: Phase::Start,
            bucket: None,
            entered: Vec::new(),
        }
    }

    /// Step to the next registration still present in the table
    pub fn next(&mut self, table: &mut HookTable) -> Option<Registration> {
        loop {
            if let Some(walk) = self.bucket.as_mut() {
                while walk.pos < walk.ids.len() {
                    let id = &walk.ids[walk.pos];
                    walk.pos += 1;
                    if let Some(registration) = table.get(&self.tag, walk.priority, id) {
                        return Some(registration.clone());
                    }
                }
            }

            let priority = self.next_bucket(table)?;
            self.entered.push(priority);
            self.bucket = Some(BucketWalk {
                priority,
                ids: table.bucket_ids(&self.tag, priority),
                pos: 0,
            });
        }
    }

    fn next_bucket(&mut self, table: &mut HookTable) -> Option<HookPriority> {
        if let Phase::Start | Phase::Sorted(_) = self.phase {
            let after = match self.phase {
                Phase::Sorted(priority) => Some(priority),
                _ => None,
            };
            let next = table
                .ordered_priorities(&self.tag)
                .into_iter()
                .filter(|priority| after.map_or(true, |after| *priority > after))
                .find(|priority| {
                    table
                        .bucket_seq(&self.tag, *priority)
                        .is_some_and(|seq| seq < self.horizon)
                });

            match next {
                Some(priority) => {
                    self.phase = Phase::Sorted(priority);
                    return Some(priority);
                }
                None => {
                    self.phase = Phase::Appended {
                        from_seq: self.horizon,
                    }
                }
            }
        }

        while let Phase::Appended { from_seq } = self.phase {
            match table.next_bucket_created_from(&self.tag, from_seq) {
                Some((priority, seq)) => {
                    self.phase = Phase::Appended { from_seq: seq + 1 };
                    if !self.entered.contains(&priority) {
                        return Some(priority);
                    }
                }
                None => self.phase = Phase::Exhausted,
            }
        }

        None
    }
}
