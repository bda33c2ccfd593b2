//! Norm preservation of decision-diagram gate application.

use num_complex::Complex64;
use proptest::prelude::*;
use quiver_dd::{Edge, LineRole, Matrix2, Package};

fn zero_state(pkg: &mut Package, n: usize) -> Edge {
    let mut edge = Edge::ONE;
    for var in 0..n {
        edge = pkg.make_nonterminal(var, [edge, Edge::ZERO, Edge::ZERO, Edge::ZERO]);
    }
    edge
}

fn rotation(theta: f64, phi: f64, lambda: f64) -> Matrix2 {
    let (s, c) = (theta / 2.0).sin_cos();
    [
        [
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
        ],
        [
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        ],
    ]
}

fn norm(pkg: &Package, state: Edge, n: usize) -> f64 {
    pkg.amplitudes(state, n).unwrap().iter().map(|a| a.norm_sqr()).sum()
}

#[derive(Debug, Clone)]
enum Step {
    Rotate { target: usize, theta: f64, phi: f64, lambda: f64 },
    Cnot { control: usize, target: usize },
}

fn arb_step(n: usize) -> impl Strategy<Value = Step> {
    let angle = -6.3f64..6.3;
    prop_oneof![
        (0..n, angle.clone(), angle.clone(), angle).prop_map(|(target, theta, phi, lambda)| {
            Step::Rotate { target, theta, phi, lambda }
        }),
        (0..n, 0..n)
            .prop_filter("distinct lines", |(c, t)| c != t)
            .prop_map(|(control, target)| Step::Cnot { control, target }),
    ]
}

// ---------------------------------------------------------------------------
// Deterministic circuits
// ---------------------------------------------------------------------------

#[test]
fn ghz_state_has_two_equal_amplitudes() {
    let n = 5;
    let mut pkg = Package::default();
    let mut state = zero_state(&mut pkg, n);

    let mut roles = vec![LineRole::Idle; n];
    roles[n - 1] = LineRole::Target;
    let h = pkg
        .make_gate(&rotation(std::f64::consts::FRAC_PI_2, 0.0, std::f64::consts::PI), &roles)
        .unwrap();
    state = pkg.multiply(h, state);

    let x = rotation(std::f64::consts::PI, 0.0, std::f64::consts::PI);
    for target in (0..n - 1).rev() {
        let mut roles = vec![LineRole::Idle; n];
        roles[target + 1] = LineRole::Control;
        roles[target] = LineRole::Target;
        let cx = pkg.make_gate(&x, &roles).unwrap();
        state = pkg.multiply(cx, state);
    }

    let amps = pkg.amplitudes(state, n).unwrap();
    let half = 0.5f64;
    assert!((amps[0].norm_sqr() - half).abs() < 1e-9);
    assert!((amps[(1 << n) - 1].norm_sqr() - half).abs() < 1e-9);
    assert!((norm(&pkg, state, n) - 1.0).abs() < 1e-9);

    // One node per level: the GHZ diagram is linear in n.
    let root = pkg.retain(state);
    pkg.garbage_collect();
    assert!(pkg.active_nodes() <= 2 * n);
    pkg.release(root);
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn unitary_sequences_preserve_norm(steps in prop::collection::vec(arb_step(4), 1..24)) {
        let n = 4;
        let mut pkg = Package::default();
        let mut root = {
            let zero = zero_state(&mut pkg, n);
            pkg.retain(zero)
        };

        for step in &steps {
            let mut roles = vec![LineRole::Idle; n];
            let matrix = match *step {
                Step::Rotate { target, theta, phi, lambda } => {
                    roles[target] = LineRole::Target;
                    rotation(theta, phi, lambda)
                }
                Step::Cnot { control, target } => {
                    roles[control] = LineRole::Control;
                    roles[target] = LineRole::Target;
                    rotation(std::f64::consts::PI, 0.0, std::f64::consts::PI)
                }
            };
            let gate = pkg.make_gate(&matrix, &roles).unwrap();
            let next = pkg.multiply(gate, root.edge());
            pkg.replace(&mut root, next);
            pkg.garbage_collect();
        }

        let total = norm(&pkg, root.edge(), n);
        prop_assert!((total - 1.0).abs() < 1e-8, "norm drifted to {}", total);

        let mut roots = [root];
        pkg.compact_weights(&mut roots);
        let [root] = roots;
        let total = norm(&pkg, root.edge(), n);
        prop_assert!((total - 1.0).abs() < 1e-8);
        pkg.release(root);
        prop_assert_eq!(pkg.active_nodes(), 0);
    }
}
