//! Time-ordered queue of "re-evaluate this facility" events.
//!
//! Backed by a binary heap. Each facility has at most one live event: when a
//! facility is scheduled again the earlier of the two times wins and the
//! other entry is left in the heap as a stale record, skipped on pop. Ties
//! pop in insertion order.

use crate::id::FacilityId;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

/// A pending evaluation of one facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationEvent {
    pub time: DateTime<Utc>,
    pub facility: FacilityId,
}

#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<(DateTime<Utc>, u64, FacilityId)>>,
    pending: BTreeMap<FacilityId, (DateTime<Utc>, u64)>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `facility` at `time`, keeping an earlier pending event if one
    /// exists. Returns whether the queue changed.
    pub fn schedule(&mut self, facility: FacilityId, time: DateTime<Utc>) -> bool {
        if let Some(&(existing, _)) = self.pending.get(&facility)
            && existing <= time
        {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(facility, (time, seq));
        self.heap.push(Reverse((time, seq, facility)));
        true
    }

    /// Pop the earliest live event.
    pub fn pop(&mut self) -> Option<SimulationEvent> {
        while let Some(Reverse((time, seq, facility))) = self.heap.pop() {
            if self.pending.get(&facility) == Some(&(time, seq)) {
                self.pending.remove(&facility);
                return Some(SimulationEvent { time, facility });
            }
        }
        None
    }

    /// The earliest live event, without removing it.
    pub fn peek(&mut self) -> Option<SimulationEvent> {
        while let Some(&Reverse((time, seq, facility))) = self.heap.peek() {
            if self.pending.get(&facility) == Some(&(time, seq)) {
                return Some(SimulationEvent { time, facility });
            }
            self.heap.pop();
        }
        None
    }

    pub fn pending_time(&self, facility: FacilityId) -> Option<DateTime<Utc>> {
        self.pending.get(&facility).map(|(t, _)| *t)
    }

    /// Number of live events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn pops_in_time_order() {
        let mut q = EventQueue::new();
        q.schedule(FacilityId(1), at(300));
        q.schedule(FacilityId(2), at(100));
        q.schedule(FacilityId(3), at(200));
        let order: Vec<FacilityId> = std::iter::from_fn(|| q.pop()).map(|e| e.facility).collect();
        assert_eq!(order, vec![FacilityId(2), FacilityId(3), FacilityId(1)]);
    }

    #[test]
    fn ties_pop_in_insertion_order() {
        let mut q = EventQueue::new();
        q.schedule(FacilityId(9), at(100));
        q.schedule(FacilityId(1), at(100));
        q.schedule(FacilityId(5), at(100));
        let order: Vec<FacilityId> = std::iter::from_fn(|| q.pop()).map(|e| e.facility).collect();
        assert_eq!(order, vec![FacilityId(9), FacilityId(1), FacilityId(5)]);
    }

    #[test]
    fn keeps_earlier_event_for_same_facility() {
        let mut q = EventQueue::new();
        assert!(q.schedule(FacilityId(1), at(200)));
        assert!(!q.schedule(FacilityId(1), at(300)));
        assert!(q.schedule(FacilityId(1), at(100)));
        assert_eq!(q.len(), 1);
        assert_eq!(q.pending_time(FacilityId(1)), Some(at(100)));

        let event = q.pop().unwrap();
        assert_eq!(event.time, at(100));
        assert!(q.pop().is_none());
    }

    #[test]
    fn rescheduling_after_pop_is_allowed() {
        let mut q = EventQueue::new();
        q.schedule(FacilityId(1), at(100));
        let event = q.pop().unwrap();
        assert!(q.schedule(event.facility, at(400)));
        assert_eq!(q.peek().map(|e| e.time), Some(at(400)));
        assert_eq!(q.len(), 1);
    }
}
