//! Traversal-order properties over many generated forests.

use csm_core::{build_order, HierarchyError, ParentMap, PartHierarchy};

/// Small deterministic LCG so the generated forests are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

/// Random forest: parts are created in a shuffled id order, each attaching to an
/// earlier-created part or becoming a root.
fn random_forest(rng: &mut Lcg, n: usize) -> Vec<i64> {
    let mut ids: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = rng.below(i as u64 + 1) as usize;
        ids.swap(i, j);
    }
    let mut parents = vec![-1i64; n];
    for created in 1..n {
        if rng.below(5) == 0 {
            continue;
        }
        let parent = ids[rng.below(created as u64) as usize];
        parents[ids[created]] = parent as i64;
    }
    parents
}

#[test]
fn parent_always_precedes_child() {
    let mut rng = Lcg(7);
    for trial in 0..200 {
        let n = 1 + rng.below(24) as usize;
        let parents = random_forest(&mut rng, n);
        let map = ParentMap::from_sentinel(&parents).unwrap();
        let order = build_order(&map).unwrap();

        assert_eq!(order.len(), n, "trial {trial}: {parents:?}");
        let mut position = vec![usize::MAX; n];
        for (i, &k) in order.iter().enumerate() {
            assert_eq!(position[k], usize::MAX, "part {k} listed twice");
            position[k] = i;
        }
        for k in 0..n {
            if let Some(p) = map.parent(k) {
                assert!(
                    position[p] < position[k],
                    "trial {trial}: parent {p} after child {k} in {order:?}"
                );
            }
        }
    }
}

#[test]
fn order_is_deterministic() {
    let parents = [-1, 0, 0, 1, 1, 2, -1, 6];
    let a = PartHierarchy::from_sentinel(&parents).unwrap();
    let b = PartHierarchy::from_sentinel(&parents).unwrap();
    assert_eq!(a.order(), b.order());
    assert_eq!(a.order(), &[0, 6, 1, 2, 7, 3, 4, 5]);
}

#[test]
fn injected_cycle_is_always_reported() {
    let mut rng = Lcg(99);
    for _ in 0..100 {
        let n = 3 + rng.below(12) as usize;
        let mut parents = random_forest(&mut rng, n);
        // Point some part at one of its own descendants (or itself).
        let victim = rng.below(n as u64) as usize;
        let descendant = (0..n)
            .find(|&k| {
                let mut cur = k as i64;
                while cur != -1 {
                    if cur as usize == victim {
                        return k != victim;
                    }
                    cur = parents[cur as usize];
                }
                false
            })
            .unwrap_or(victim);
        parents[victim] = descendant as i64;

        let err = PartHierarchy::from_sentinel(&parents).unwrap_err();
        match err {
            HierarchyError::Cycle { parts } => assert!(parts.contains(&victim), "{parts:?}"),
            other => panic!("expected a cycle, got {other}"),
        }
    }
}
