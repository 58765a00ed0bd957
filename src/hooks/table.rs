//! Hook table: tag -> priority bucket -> registration
//!
//! Buckets remember the order registrations arrived in. Each bucket also
//! carries a creation sequence number so a dispatch cursor can tell which
//! buckets existed when its walk began. The ascending priority order of a
//! tag is computed on demand and cached until the tag is next mutated.

use crate::hooks::{Callback, HookError, HookPriority, HookResult, RegistrationId};
use std::collections::HashMap;

/// A callback registered at one tag and priority
#[derive(Debug, Clone)]
pub struct Registration {
    pub callback: Callback,
    pub accepted_args: usize,
}

impl Registration {
    pub fn new(callback: Callback, accepted_args: usize) -> Self {
        Self {
            callback,
            accepted_args,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    seq: u64,
    entries: Vec<(RegistrationId, Registration)>,
}

#[derive(Debug, Default)]
struct TagHooks {
    buckets: HashMap<HookPriority, Bucket>,
    sorted: Option<Vec<HookPriority>>,
}

impl TagHooks {
    fn invalidate(&mut self) {
        self.sorted = None;
    }
}

/// All registrations known to a broker
#[derive(Debug, Default)]
pub struct HookTable {
    tags: HashMap<String, TagHooks>,
    next_seq: u64,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a registration, or replace the one already stored under `id`.
    ///
    /// Replacing keeps the registration's position in its bucket. The stored
    /// callback must point at the same target as the new one.
    pub fn insert(
        &mut self,
        tag: &str,
        priority: HookPriority,
        id: RegistrationId,
        registration: Registration,
    ) -> HookResult<()> {
        let next_seq = &mut self.next_seq;
        let hooks = self.tags.entry(tag.to_string()).or_default();
        let bucket = hooks.buckets.entry(priority).or_insert_with(|| {
            let seq = *next_seq;
            *next_seq += 1;
            Bucket {
                seq,
                entries: Vec::new(),
            }
        });

        match bucket.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, current)) => {
                if current.callback.target() != registration.callback.target() {
                    return Err(HookError::conflict(tag, priority.0, id.as_str()));
                }
                *current = registration;
            }
            None => bucket.entries.push((id, registration)),
        }

        hooks.invalidate();
        Ok(())
    }

    /// Remove one registration. Empty buckets are dropped, the tag is kept.
    pub fn remove(&mut self, tag: &str, priority: HookPriority, id: &RegistrationId) -> bool {
        let Some(hooks) = self.tags.get_mut(tag) else {
            return false;
        };
        let Some(bucket) = hooks.buckets.get_mut(&priority) else {
            return false;
        };
        let Some(pos) = bucket.entries.iter().position(|(existing, _)| existing == id) else {
            return false;
        };

        bucket.entries.remove(pos);
        if bucket.entries.is_empty() {
            hooks.buckets.remove(&priority);
        }
        hooks.invalidate();
        true
    }

    /// Drop one bucket, or every bucket when `priority` is `None`
    pub fn clear(&mut self, tag: &str, priority: Option<HookPriority>) {
        if let Some(hooks) = self.tags.get_mut(tag) {
            match priority {
                Some(priority) => {
                    hooks.buckets.remove(&priority);
                }
                None => hooks.buckets.clear(),
            }
            hooks.invalidate();
        }
    }

    /// Whether the tag has at least one registration
    pub fn has_any(&self, tag: &str) -> bool {
        self.tags
            .get(tag)
            .is_some_and(|hooks| hooks.buckets.values().any(|b| !b.entries.is_empty()))
    }

    /// Whether the tag has ever been registered against, even if now empty
    pub fn contains_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    /// Lowest priority at which `id` is registered
    pub fn priority_of(&self, tag: &str, id: &RegistrationId) -> Option<HookPriority> {
        self.tags.get(tag).and_then(|hooks| {
            hooks
                .buckets
                .iter()
                .filter(|(_, bucket)| bucket.entries.iter().any(|(existing, _)| existing == id))
                .map(|(priority, _)| *priority)
                .min()
        })
    }

    /// Priorities of a tag in ascending order
    pub fn ordered_priorities(&mut self, tag: &str) -> Vec<HookPriority> {
        let Some(hooks) = self.tags.get_mut(tag) else {
            return Vec::new();
        };
        let buckets = &hooks.buckets;
        hooks
            .sorted
            .get_or_insert_with(|| {
                let mut priorities: Vec<HookPriority> = buckets.keys().copied().collect();
                priorities.sort_unstable();
                priorities
            })
            .clone()
    }

    /// Sequence number the next created bucket will receive
    pub fn horizon(&self) -> u64 {
        self.next_seq
    }

    /// Creation sequence of a bucket
    pub fn bucket_seq(&self, tag: &str, priority: HookPriority) -> Option<u64> {
        self.tags
            .get(tag)
            .and_then(|hooks| hooks.buckets.get(&priority))
            .map(|bucket| bucket.seq)
    }

    /// The earliest-created bucket whose sequence is at least `min_seq`
    pub fn next_bucket_created_from(&self, tag: &str, min_seq: u64) -> Option<(HookPriority, u64)> {
        self.tags.get(tag).and_then(|hooks| {
            hooks
                .buckets
                .iter()
                .filter(|(_, bucket)| bucket.seq >= min_seq)
                .map(|(priority, bucket)| (*priority, bucket.seq))
                .min_by_key(|(_, seq)| *seq)
        })
    }

    /// Registration ids of a bucket in insertion order
    pub fn bucket_ids(&self, tag: &str, priority: HookPriority) -> Vec<RegistrationId> {
        self.tags
            .get(tag)
            .and_then(|hooks| hooks.buckets.get(&priority))
            .map(|bucket| bucket.entries.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, tag: &str, priority: HookPriority, id: &RegistrationId) -> Option<&Registration> {
        self.tags
            .get(tag)
            .and_then(|hooks| hooks.buckets.get(&priority))
            .and_then(|bucket| {
                bucket
                    .entries
                    .iter()
                    .find(|(existing, _)| existing == id)
                    .map(|(_, registration)| registration)
            })
    }

    /// Every registration of a tag in dispatch order
    pub fn entries(&mut self, tag: &str) -> Vec<(HookPriority, RegistrationId, Registration)> {
        let priorities = self.ordered_priorities(tag);
        let Some(hooks) = self.tags.get(tag) else {
            return Vec::new();
        };

        priorities
            .into_iter()
            .filter_map(|priority| hooks.buckets.get(&priority).map(|bucket| (priority, bucket)))
            .flat_map(|(priority, bucket)| {
                bucket
                    .entries
                    .iter()
                    .map(move |(id, registration)| (priority, id.clone(), registration.clone()))
            })
            .collect()
    }

    /// Known tags, sorted by name
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.tags.keys().cloned().collect();
        tags.sort();
        tags
    }
}
