use std::cell::Cell;
use std::collections::HashMap;

use proptest::prelude::*;
use retain_ptr::{make_retain, swap, RefCount, RefCounted, RetainPtr};

thread_local! {
    static LIVE: Cell<usize> = Cell::new(0);
    static DESTROYED: Cell<usize> = Cell::new(0);
}

struct Tracked {
    count: RefCount,
}

impl Tracked {
    fn new() -> Self {
        LIVE.with(|live| live.set(live.get() + 1));
        Tracked { count: RefCount::new() }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        LIVE.with(|live| live.set(live.get() - 1));
        DESTROYED.with(|destroyed| destroyed.set(destroyed.get() + 1));
    }
}

unsafe impl RefCounted for Tracked {
    type Counter = RefCount;

    fn ref_count(&self) -> &RefCount {
        &self.count
    }
}

const SLOTS: usize = 6;
const OBJECTS: usize = 3;

#[derive(Clone, Debug)]
enum Op {
    Clone(usize, usize),
    CloneFrom(usize, usize),
    Move(usize, usize),
    Reset(usize),
    Swap(usize, usize),
    SwapFree(usize, usize),
    ReleaseAndAdopt(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let slot = 0..SLOTS;
    prop_oneof![
        (slot.clone(), slot.clone()).prop_map(|(a, b)| Op::Clone(a, b)),
        (slot.clone(), slot.clone()).prop_map(|(a, b)| Op::CloneFrom(a, b)),
        (slot.clone(), slot.clone()).prop_map(|(a, b)| Op::Move(a, b)),
        slot.clone().prop_map(Op::Reset),
        (slot.clone(), slot.clone()).prop_map(|(a, b)| Op::Swap(a, b)),
        (slot.clone(), slot.clone()).prop_map(|(a, b)| Op::SwapFree(a, b)),
        slot.prop_map(Op::ReleaseAndAdopt),
    ]
}

/// Two distinct slots, borrowed mutably at once.
fn pair(
    slots: &mut [RetainPtr<Tracked>],
    a: usize,
    b: usize,
) -> Option<(&mut RetainPtr<Tracked>, &mut RetainPtr<Tracked>)> {
    if a == b {
        return None;
    }
    let (low, high) = (a.min(b), a.max(b));
    let (left, right) = slots.split_at_mut(high);
    Some((&mut left[low], &mut right[0]))
}

fn apply(slots: &mut [RetainPtr<Tracked>], op: &Op) {
    match *op {
        Op::Clone(from, to) => slots[to] = slots[from].clone(),
        Op::CloneFrom(from, to) => {
            let source = slots[from].clone();
            slots[to].clone_from(&source);
        }
        Op::Move(from, to) => {
            let moved = slots[from].take();
            slots[to] = moved;
        }
        Op::Reset(at) => slots[at].reset(),
        Op::Swap(a, b) => {
            if let Some((x, y)) = pair(slots, a, b) {
                x.swap(y);
            }
        }
        Op::SwapFree(a, b) => {
            if let Some((x, y)) = pair(slots, a, b) {
                swap(x, y);
            }
        }
        Op::ReleaseAndAdopt(at) => {
            let raw = slots[at].release();
            slots[at] = unsafe { RetainPtr::adopt(raw) };
        }
    }
}

/// Every live object is reachable and counts exactly the handles pointing at it.
fn check(slots: &[RetainPtr<Tracked>]) -> Result<(), TestCaseError> {
    let mut holders: HashMap<*const (), isize> = HashMap::new();
    for slot in slots.iter().filter(|slot| slot.is_owning()) {
        *holders.entry(slot.addr()).or_default() += 1;
    }
    for slot in slots {
        if slot.is_null() {
            prop_assert_eq!(slot.use_count(), 0);
        } else {
            prop_assert_eq!(slot.use_count(), holders[&slot.addr()]);
        }
    }
    prop_assert_eq!(LIVE.with(Cell::get), holders.len());
    Ok(())
}

proptest! {
    #[test]
    fn shares_are_counted_exactly(ops in prop::collection::vec(op(), 0..64)) {
        let destroyed_before = DESTROYED.with(Cell::get);

        let mut slots: Vec<RetainPtr<Tracked>> = (0..SLOTS).map(|_| RetainPtr::null()).collect();
        for slot in slots.iter_mut().take(OBJECTS) {
            *slot = make_retain(Tracked::new());
        }
        check(&slots)?;

        for op in &ops {
            apply(&mut slots, op);
            check(&slots)?;
        }

        drop(slots);
        prop_assert_eq!(LIVE.with(Cell::get), 0);
        prop_assert_eq!(DESTROYED.with(Cell::get) - destroyed_before, OBJECTS);
    }
}
