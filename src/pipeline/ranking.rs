//! # Handler Specificity Ranking
//!
//! Orders exception handler candidates from most to least specific relative to a
//! reference failure kind, and drops candidates made redundant by another one.
//!
//! ## Algorithm
//!
//! 1. **De-duplication.** For every pair `(i, j)` with `i < j` that is still active:
//!    `i` is dropped when `j` has the same handler type or declares that it
//!    overrides `i`'s handler type; otherwise `j` is dropped when the reverse holds.
//!    Unrelated candidates all survive.
//! 2. **Ordering.** Stable sort by the position of each candidate's target kind in
//!    the reference lineage (`0` is the reference kind itself). Targets outside the
//!    lineage sort last. Equal distances keep their resolution order.

use crate::error::Result;
use crate::messages::TypeKey;
use crate::registry::Registered;

/// A candidate the ranker can order
pub trait Ranked {
    /// Concrete handler implementation type
    fn handler_type(&self) -> TypeKey;

    /// Handler types this candidate specializes
    fn overrides(&self) -> &[TypeKey];

    /// Failure kind the candidate was registered for
    fn target_type(&self) -> TypeKey;
}

/// A resolved handler together with the failure kind it matched on
pub struct Candidate<T: ?Sized> {
    pub service: Registered<T>,
    pub target: TypeKey,
    overrides: Vec<TypeKey>,
}

impl<T: ?Sized> Candidate<T> {
    pub fn new(service: Registered<T>, target: TypeKey, overrides: Vec<TypeKey>) -> Self {
        Self {
            service,
            target,
            overrides,
        }
    }
}

impl<T: ?Sized> Ranked for Candidate<T> {
    fn handler_type(&self) -> TypeKey {
        self.service.implementation()
    }

    fn overrides(&self) -> &[TypeKey] {
        &self.overrides
    }

    fn target_type(&self) -> TypeKey {
        self.target
    }
}

impl<T: ?Sized> std::fmt::Debug for Candidate<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("handler", &self.service.implementation().short_name())
            .field("target", &self.target.short_name())
            .finish()
    }
}

/// Ranks candidates against the lineage of a reference failure kind
#[derive(Debug, Clone)]
pub struct HandlerSpecificityRanker {
    lineage: Vec<TypeKey>,
}

impl HandlerSpecificityRanker {
    /// `lineage` runs from the reference kind to the root kind
    pub fn new(lineage: Vec<TypeKey>) -> Self {
        Self { lineage }
    }

    /// Distance of `target` from the reference kind; `usize::MAX` when unrelated
    pub fn distance(&self, target: TypeKey) -> usize {
        self.lineage
            .iter()
            .position(|kind| *kind == target)
            .unwrap_or(usize::MAX)
    }

    pub fn rank<T: Ranked>(&self, candidates: Vec<T>) -> Vec<T> {
        let mut survivors = Self::dedupe(candidates);
        survivors.sort_by_key(|candidate| self.distance(candidate.target_type()));
        survivors
    }

    fn dedupe<T: Ranked>(candidates: Vec<T>) -> Vec<T> {
        if candidates.len() < 2 {
            return candidates;
        }

        let mut active = vec![true; candidates.len()];
        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                if !active[i] || !active[j] {
                    continue;
                }
                if Self::supersedes(&candidates[j], &candidates[i]) {
                    active[i] = false;
                } else if Self::supersedes(&candidates[i], &candidates[j]) {
                    active[j] = false;
                }
            }
        }

        candidates
            .into_iter()
            .zip(active)
            .filter_map(|(candidate, keep)| keep.then_some(candidate))
            .collect()
    }

    /// True when `specific` makes `general` redundant
    fn supersedes<T: Ranked>(specific: &T, general: &T) -> bool {
        let general_type = general.handler_type();
        specific.handler_type() == general_type || specific.overrides().contains(&general_type)
    }
}

/// Resolve candidates for every kind of `lineage`, most specific kind first,
/// keeping only the first occurrence of each handler type.
pub fn gather_candidates<T, R, O>(
    lineage: &[TypeKey],
    mut resolve: R,
    overrides: O,
) -> Result<Vec<Candidate<T>>>
where
    T: ?Sized,
    R: FnMut(TypeKey) -> Result<Vec<Registered<T>>>,
    O: Fn(&T) -> Vec<TypeKey>,
{
    let mut candidates: Vec<Candidate<T>> = Vec::new();
    for kind in lineage {
        for service in resolve(*kind)? {
            let implementation = service.implementation();
            if candidates
                .iter()
                .any(|candidate| candidate.handler_type() == implementation)
            {
                continue;
            }
            let declared = overrides(&**service.instance());
            candidates.push(Candidate::new(service, *kind, declared));
        }
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exception;
    struct ConnectionException;
    struct TimeoutException;
    struct Unrelated;

    #[derive(Debug, Clone)]
    struct Fake {
        handler: TypeKey,
        target: TypeKey,
        overrides: Vec<TypeKey>,
    }

    impl Fake {
        fn new<H: 'static, E: 'static>() -> Self {
            Self {
                handler: TypeKey::of::<H>(),
                target: TypeKey::of::<E>(),
                overrides: Vec::new(),
            }
        }
    }

    impl Ranked for Fake {
        fn handler_type(&self) -> TypeKey {
            self.handler
        }
        fn overrides(&self) -> &[TypeKey] {
            &self.overrides
        }
        fn target_type(&self) -> TypeKey {
            self.target
        }
    }

    struct GenericHandler;
    struct ConnectionHandler;
    struct TimeoutHandler;

    fn timeout_ranker() -> HandlerSpecificityRanker {
        HandlerSpecificityRanker::new(vec![
            TypeKey::of::<TimeoutException>(),
            TypeKey::of::<ConnectionException>(),
            TypeKey::of::<Exception>(),
        ])
    }

    fn targets(ranked: &[Fake]) -> Vec<TypeKey> {
        ranked.iter().map(|candidate| candidate.target).collect()
    }

    #[test]
    fn test_orders_most_specific_first_and_keeps_all() {
        let ranked = timeout_ranker().rank(vec![
            Fake::new::<GenericHandler, Exception>(),
            Fake::new::<ConnectionHandler, ConnectionException>(),
            Fake::new::<TimeoutHandler, TimeoutException>(),
        ]);

        assert_eq!(
            targets(&ranked),
            vec![
                TypeKey::of::<TimeoutException>(),
                TypeKey::of::<ConnectionException>(),
                TypeKey::of::<Exception>(),
            ]
        );
    }

    #[test]
    fn test_duplicate_handler_types_collapse() {
        let ranked = timeout_ranker().rank(vec![
            Fake::new::<GenericHandler, Exception>(),
            Fake::new::<GenericHandler, Exception>(),
            Fake::new::<ConnectionHandler, ConnectionException>(),
        ]);

        assert_eq!(ranked.len(), 2);
        assert_eq!(
            targets(&ranked),
            vec![
                TypeKey::of::<ConnectionException>(),
                TypeKey::of::<Exception>()
            ]
        );
    }

    #[test]
    fn test_declared_override_drops_general_handler() {
        let mut specific = Fake::new::<TimeoutHandler, Exception>();
        specific.overrides = vec![TypeKey::of::<GenericHandler>()];

        let ranked = timeout_ranker().rank(vec![
            specific,
            Fake::new::<GenericHandler, Exception>(),
        ]);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].handler, TypeKey::of::<TimeoutHandler>());
    }

    #[test]
    fn test_ties_keep_resolution_order_and_unrelated_sort_last() {
        let ranked = timeout_ranker().rank(vec![
            Fake::new::<Unrelated, Unrelated>(),
            Fake::new::<GenericHandler, Exception>(),
            Fake::new::<ConnectionHandler, Exception>(),
        ]);

        let handlers: Vec<TypeKey> = ranked.iter().map(|c| c.handler).collect();
        assert_eq!(
            handlers,
            vec![
                TypeKey::of::<GenericHandler>(),
                TypeKey::of::<ConnectionHandler>(),
                TypeKey::of::<Unrelated>(),
            ]
        );
    }

    #[test]
    fn test_single_candidate_is_noop() {
        let ranked = timeout_ranker().rank(vec![Fake::new::<Unrelated, Unrelated>()]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(timeout_ranker().rank(Vec::<Fake>::new()).len(), 0);
    }

    #[test]
    fn test_gather_keeps_first_occurrence_per_handler_type() {
        use std::sync::Arc;

        let lineage = vec![
            TypeKey::of::<TimeoutException>(),
            TypeKey::of::<Exception>(),
        ];
        let gathered = gather_candidates::<str, _, _>(
            &lineage,
            |kind| {
                let shared = Registered::new(Arc::from("shared"), TypeKey::of::<GenericHandler>());
                let mut services = vec![shared];
                if kind == TypeKey::of::<Exception>() {
                    services.push(Registered::new(
                        Arc::from("base"),
                        TypeKey::of::<ConnectionHandler>(),
                    ));
                }
                Ok(services)
            },
            |_| Vec::new(),
        )
        .unwrap();

        assert_eq!(gathered.len(), 2);
        assert_eq!(gathered[0].target, TypeKey::of::<TimeoutException>());
        assert_eq!(gathered[1].handler_type(), TypeKey::of::<ConnectionHandler>());
    }
}
