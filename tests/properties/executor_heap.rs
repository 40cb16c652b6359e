//! Property-based tests for the executor load heap.
//!
//! After any sequence of operations the heap property and the key index must hold, and the
//! head must carry the lowest load.
//!
//!   Refer to `src/domain/executor/heap.rs` for more details.
use std::collections::HashMap;

use boop_submitter::domain::IndexedMinHeap;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Push(u8, u64),
    Increment(u8),
    Decrement(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8, 0u64..20).prop_map(|(key, priority)| Op::Push(key, priority)),
        (0u8..8).prop_map(Op::Increment),
        (0u8..8).prop_map(Op::Decrement),
    ]
}

proptest! {
  #[test]
  fn prop_heap_matches_model(ops in prop::collection::vec(op(), 0..200)) {
      let mut heap = IndexedMinHeap::new();
      let mut model: HashMap<u8, u64> = HashMap::new();

      for op in ops {
          match op {
              Op::Push(key, priority) => {
                  let inserted = heap.push(key, priority);
                  prop_assert_eq!(inserted, !model.contains_key(&key));
                  model.entry(key).or_insert(priority);
              }
              Op::Increment(key) => {
                  let expected = model.get_mut(&key).map(|p| {
                      *p = p.saturating_add(1);
                      *p
                  });
                  prop_assert_eq!(heap.increment(&key), expected);
              }
              Op::Decrement(key) => {
                  let expected = model.get_mut(&key).map(|p| {
                      *p = p.saturating_sub(1);
                      *p
                  });
                  prop_assert_eq!(heap.decrement(&key), expected);
              }
          }
          prop_assert!(heap.is_consistent());
          prop_assert_eq!(heap.len(), model.len());
          prop_assert_eq!(heap.peek().map(|(_, p)| p), model.values().min().copied());
      }
  }
}
