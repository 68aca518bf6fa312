//! Property tests pinning the listener registry against a sequential model.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cascade_core::{ListenerRegistry, ListenerToken};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Subscribe,
    /// Index into the issued-token list, taken modulo its length. May hit a
    /// token that was already removed.
    Unsubscribe(usize),
    Notify,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Subscribe),
        1 => (0usize..32).prop_map(Op::Unsubscribe),
        1 => Just(Op::Notify),
    ]
}

proptest! {
    /// Under any interleaving of subscribe, unsubscribe (including repeats on
    /// the same token) and notify, the registry delivers exactly one call per
    /// live listener per pass and its size tracks the model.
    #[test]
    fn registry_agrees_with_sequential_model(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let registry = ListenerRegistry::new();
        let mut model: Vec<(ListenerToken, Rc<Cell<u64>>, bool)> = Vec::new();

        for op in ops {
            match op {
                Op::Subscribe => {
                    let hits = Rc::new(Cell::new(0u64));
                    let recorder = Rc::clone(&hits);
                    let token = registry.subscribe(move || recorder.set(recorder.get() + 1));
                    model.push((token, hits, true));
                }
                Op::Unsubscribe(raw) => {
                    if !model.is_empty() {
                        let i = raw % model.len();
                        registry.unsubscribe(model[i].0);
                        model[i].2 = false;
                    }
                }
                Op::Notify => {
                    let before: Vec<u64> =
                        model.iter().map(|(_, hits, _)| hits.get()).collect();
                    registry.notify();
                    for (i, (_, hits, live)) in model.iter().enumerate() {
                        prop_assert_eq!(hits.get(), before[i] + u64::from(*live));
                    }
                }
            }
            let live = model.iter().filter(|(_, _, live)| *live).count();
            prop_assert_eq!(registry.len(), live);
        }
    }

    /// Whatever subset survives removal, a pass visits it in registration
    /// order.
    #[test]
    fn notification_respects_registration_order(keep in prop::collection::vec(any::<bool>(), 1..32)) {
        let registry = ListenerRegistry::new();
        let visited: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));

        let tokens: Vec<ListenerToken> = (0..keep.len())
            .map(|i| {
                let visited = Rc::clone(&visited);
                registry.subscribe(move || visited.borrow_mut().push(i))
            })
            .collect();
        for (token, keep) in tokens.iter().zip(&keep) {
            if !keep {
                registry.unsubscribe(*token);
            }
        }

        registry.notify();
        let expected: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect();
        prop_assert_eq!(visited.borrow().clone(), expected);
    }
}
