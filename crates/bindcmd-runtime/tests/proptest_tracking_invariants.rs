//! Property-based invariant tests for dependency tracking.
//!
//! 1. Coarse scope: one invalidation per owner notification, whichever
//!    property changed.
//! 2. Filtered scope: one invalidation per change of the guarded property.
//! 3. Observing a name list with repeats extracts once per distinct name and
//!    subscribes once per owner.
//! 3b. However many names are observed on one owner, a notification
//!    invalidates at most once.
//! 4. Unguarded commands are executable for every parameter.
//! 5. A guarded command answers exactly what its predicate answers.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use bindcmd_core::{Bindable, NotifyPropertyChanged, PropertyChangedHub};
use bindcmd_runtime::{
    BindableCommand, Command, GuardExpr, InvalidationScope, TrackingConfig,
};
use proptest::prelude::*;

// ── Helpers ──────────────────────────────────────────────────────────

const FLAGS: usize = 4;

#[derive(Default)]
struct Flags {
    hub: PropertyChangedHub,
    bits: RefCell<[bool; FLAGS]>,
}

impl Flags {
    /// Flip flag `index`; always a change.
    fn toggle(&self, index: usize) {
        {
            let mut bits = self.bits.borrow_mut();
            bits[index] = !bits[index];
        }
        self.hub.notify(&flag_name(index));
    }
}

impl Bindable for Flags {
    fn change_channel(&self) -> Option<&dyn NotifyPropertyChanged> {
        Some(&self.hub)
    }
}

fn flag_name(index: usize) -> String {
    format!("flag{index}")
}

fn flag(owner: &Rc<Flags>, index: usize) -> GuardExpr {
    GuardExpr::property(owner, flag_name(index), move |f: &Flags| f.bits.borrow()[index])
}

fn tracked(
    owner: &Rc<Flags>,
    watched: usize,
    config: TrackingConfig,
) -> (Command<()>, Rc<Cell<usize>>) {
    let command = Command::<()>::builder("flags")
        .config(config)
        .guard_expr(flag(owner, watched))
        .handler(|_| {})
        .build()
        .expect("valid guard");
    let raised = Rc::new(Cell::new(0));
    let seen = Rc::clone(&raised);
    command.invalidation().subscribe(move || seen.set(seen.get() + 1));
    (command, raised)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Coarse scope
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn coarse_scope_counts_every_notification(
        watched in 0..FLAGS,
        toggles in proptest::collection::vec(0..FLAGS, 0..64),
    ) {
        let owner = Rc::new(Flags::default());
        let (command, raised) = tracked(&owner, watched, TrackingConfig::default());

        let mut expected = false;
        for index in &toggles {
            owner.toggle(*index);
            if *index == watched {
                expected = !expected;
            }
        }

        prop_assert_eq!(raised.get(), toggles.len());
        prop_assert_eq!(command.can_execute(&()), expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Filtered scope
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn filtered_scope_counts_watched_changes_only(
        watched in 0..FLAGS,
        toggles in proptest::collection::vec(0..FLAGS, 0..64),
    ) {
        let owner = Rc::new(Flags::default());
        let config = TrackingConfig::default().with_scope(InvalidationScope::ObservedProperty);
        let (_command, raised) = tracked(&owner, watched, config);

        for index in &toggles {
            owner.toggle(*index);
        }

        let expected = toggles.iter().filter(|i| **i == watched).count();
        prop_assert_eq!(raised.get(), expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Idempotent observation
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn repeated_names_extract_once(names in proptest::collection::vec(0..FLAGS, 1..32)) {
        let owner = Rc::new(Flags::default());
        let mut builder = Command::<()>::builder("observer")
            .guard_expr(flag(&owner, names[0]))
            .handler(|_| {});
        for index in &names[1..] {
            builder = builder.observe(flag(&owner, *index));
        }
        let command = builder.build().expect("valid guards");

        let distinct: BTreeSet<_> = names.iter().copied().collect();
        let tracker = command.core().tracker();
        prop_assert_eq!(tracker.extractions(), distinct.len() as u64);
        // One owner, one subscription, however many names it serves.
        prop_assert_eq!(tracker.subscription_count(), 1);
        prop_assert_eq!(owner.hub.subscriber_count(), 1);
        prop_assert_eq!(tracker.observed_properties().len(), distinct.len());

        drop(command);
        prop_assert_eq!(owner.hub.subscriber_count(), 0);
    }

    #[test]
    fn one_invalidation_per_notification(
        names in proptest::collection::vec(0..FLAGS, 1..8),
        toggles in proptest::collection::vec(0..FLAGS, 0..64),
        filtered in any::<bool>(),
    ) {
        let owner = Rc::new(Flags::default());
        let scope = if filtered {
            InvalidationScope::ObservedProperty
        } else {
            InvalidationScope::AnyChange
        };
        let mut builder = Command::<()>::builder("observer")
            .config(TrackingConfig::default().with_scope(scope))
            .guard_expr(flag(&owner, names[0]))
            .handler(|_| {});
        for index in &names[1..] {
            builder = builder.observe(flag(&owner, *index));
        }
        let command = builder.build().expect("valid guards");
        let raised = Rc::new(Cell::new(0));
        let seen = Rc::clone(&raised);
        command.invalidation().subscribe(move || seen.set(seen.get() + 1));

        for index in &toggles {
            owner.toggle(*index);
        }

        let expected = if filtered {
            toggles.iter().filter(|i| names.contains(*i)).count()
        } else {
            toggles.len()
        };
        prop_assert_eq!(raised.get(), expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4-5. Guard evaluation
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unguarded_always_executable(value in any::<i64>()) {
        let command = Command::new(|_: &i64| {});
        prop_assert!(command.can_execute(&value));
    }

    #[test]
    fn guard_answer_matches_predicate(threshold in any::<i32>(), value in any::<i32>()) {
        let command = Command::<i32>::builder("threshold")
            .guard(move |v| *v >= threshold)
            .handler(|_| {})
            .build()
            .expect("has handler");
        prop_assert_eq!(command.can_execute(&value), value >= threshold);
    }
}
