use ndarray::{array, Array1};

use crate::core::{
    Assignment, BPConfig, FGError, FactorError, FactorGraph, FactorGraphBuilder, FactorId,
    FactorResult, InferenceState, Message, SweepEvent, Termination, VariableId,
};
use crate::factors::FnFactor;
use crate::tests::utils::{dist, init_logger};

/// X - f - Y with p(x, y) proportional to [[1, 2], [3, 4]]
fn chain() -> (FactorGraph<u8>, VariableId, VariableId, FactorId) {
    let mut fgb = FactorGraphBuilder::new();
    let x = fgb.add_variable("x", [0u8, 1]).unwrap();
    let y = fgb.add_variable("y", [0u8, 1]).unwrap();
    let f = fgb
        .add_table_factor("f", &[x, y], array![[1., 2.], [3., 4.]].into_dyn())
        .unwrap();
    (fgb.build(), x, y, f)
}

fn assert_message(message: &Message<u8>, expected: &[f64]) {
    for (state, weight) in expected.iter().enumerate() {
        assert!(
            (message.get(&(state as u8)) - weight).abs() < 1e-12,
            "{:?} != {:?}",
            message,
            expected
        );
    }
}

// ------------------------------------------------------------------------------------------

#[test]
fn chain_exact_marginals() {
    init_logger();
    let (mut fg, x, y, _) = chain();
    fg.initialize_messages();
    assert_eq!(fg.state(), InferenceState::Initialized);
    let info = fg.belief_propagation(5, 1e-9).unwrap();
    assert_eq!(info.status, Termination::Converged);
    assert!(info.converged());
    assert_eq!(info.sweeps, 2);
    assert_eq!(info.error_dynamics.len(), 2);
    assert_eq!(fg.state(), InferenceState::Converged);
    let beliefs = fg.calc_belief().unwrap();
    assert_message(&beliefs[&x].normalized().unwrap(), &[0.3, 0.7]);
    assert_message(&beliefs[&y].normalized().unwrap(), &[0.4, 0.6]);
    let marginals = fg.marginals().unwrap();
    assert!(dist(&marginals[1], &Array1::from_vec(vec![0.4, 0.6])) < 1e-12);
    assert_message(&fg.belief(x).unwrap().normalized().unwrap(), &[0.3, 0.7]);
    assert!(matches!(
        fg.belief(VariableId(9)),
        Err(FGError::OutOfRangeVariable(2, 9))
    ));
}

#[test]
fn zero_sweeps_keep_initial_messages() {
    let mut fgb = FactorGraphBuilder::new();
    let x = fgb.add_variable("x", [0u8, 1]).unwrap();
    let y = fgb.add_variable("y", [0u8, 1, 2]).unwrap();
    let f = fgb
        .add_table_factor("f", &[x, y], array![[1., 2., 3.], [4., 5., 6.]].into_dyn())
        .unwrap();
    let g = fgb
        .add_table_factor("g", &[y], array![1., 1., 2.].into_dyn())
        .unwrap();
    let mut fg = fgb.build();
    fg.initialize_messages();
    let info = fg.belief_propagation(0, 1e-9).unwrap();
    assert_eq!(info.status, Termination::Exhausted);
    assert_eq!(info.sweeps, 0);
    assert_eq!(info.last_error, None);
    assert_eq!(fg.state(), InferenceState::Exhausted);
    let x_seed = Message::uniform([0u8, 1], 0.5);
    let y_seed = Message::uniform([0u8, 1, 2], (1f64 / 3f64).powf(0.5));
    assert_eq!(fg.edge_messages(x, f), Some((&x_seed, &x_seed)));
    assert_eq!(fg.edge_messages(y, f), Some((&y_seed, &y_seed)));
    assert_eq!(fg.edge_messages(y, g), Some((&y_seed, &y_seed)));
    // the product of seeds is uniform with mass 1/n per state
    let belief = &fg.calc_belief().unwrap()[&y];
    for state in 0..3u8 {
        assert!((belief.get(&state) - 1. / 3.).abs() < 1e-12);
    }
}

#[test]
fn isolated_variable_belief() {
    let mut fgb = FactorGraphBuilder::new();
    let x = fgb.add_variable("x", [false, true]).unwrap();
    let mut fg = fgb.build();
    fg.initialize_messages();
    let before = fg.calc_belief().unwrap();
    assert_eq!(before[&x], Message::uniform([false, true], 0.5));
    let info = fg.belief_propagation(5, 1e-9).unwrap();
    assert_eq!(info.status, Termination::Converged);
    assert_eq!(fg.calc_belief().unwrap(), before);
}

#[test]
fn inference_requires_initialization() {
    let (mut fg, x, _, f) = chain();
    assert_eq!(fg.belief_propagation(5, 1e-9), Err(FGError::Uninitialized));
    assert_eq!(fg.calc_belief(), Err(FGError::Uninitialized));
    assert_eq!(fg.marginals(), Err(FGError::Uninitialized));
    assert_eq!(fg.message_from_factor_to_var(f), Err(FGError::Uninitialized));
    assert_eq!(fg.message_from_var_to_factor(x), Err(FGError::Uninitialized));
    assert_eq!(fg.normalize_messages(x), Err(FGError::Uninitialized));
}

#[test]
fn reruns_are_deterministic() {
    let mut fgb = FactorGraphBuilder::new();
    let vars: Vec<_> = (0..4)
        .map(|i| fgb.add_variable(format!("x{i}"), [0u8, 1, 2]).unwrap())
        .collect();
    let potential = |a: &Assignment<'_, u8>| -> FactorResult<f64> {
        let sum: u32 = a.iter().map(|(_, s)| *s as u32).sum();
        Ok(1. + (sum % 3) as f64)
    };
    fgb.add_factor("f012", FnFactor::new(potential), &[vars[0], vars[1], vars[2]])
        .unwrap();
    fgb.add_factor("f23", FnFactor::new(potential), &[vars[2], vars[3]])
        .unwrap();
    fgb.add_factor("f30", FnFactor::new(potential), &[vars[3], vars[0]])
        .unwrap();
    let mut fg = fgb.build();
    let config = BPConfig {
        max_iter: 20,
        normalize_outgoing: true,
        ..Default::default()
    };
    fg.initialize_messages();
    let first_info = fg.run(&config).unwrap();
    let first = fg.calc_belief().unwrap();
    fg.initialize_messages();
    let second_info = fg.run(&config).unwrap();
    let second = fg.calc_belief().unwrap();
    assert_eq!(first_info, second_info);
    assert_eq!(first, second);
}

#[test]
fn evidence_clamps_variable() {
    let mut fgb = FactorGraphBuilder::new();
    let x = fgb.add_variable("x", [0u8, 1]).unwrap();
    let y = fgb.add_variable("y", [0u8, 1]).unwrap();
    fgb.add_table_factor("f", &[x, y], array![[1., 2.], [3., 4.]].into_dyn())
        .unwrap();
    let e = fgb.add_evidence(x, 1).unwrap();
    let mut fg = fgb.build();
    assert_eq!(fg.factor_name(e), Some("evidence(x)"));
    fg.initialize_messages();
    let info = fg.belief_propagation(10, 1e-9).unwrap();
    assert_eq!(info.status, Termination::Converged);
    let marginals = fg.marginals().unwrap();
    assert!(dist(&marginals[0], &Array1::from_vec(vec![0., 1.])) < 1e-12);
    assert!(dist(&marginals[1], &Array1::from_vec(vec![3. / 7., 4. / 7.])) < 1e-12);
}

#[test]
fn ternary_factor_exact_marginals() {
    let mut fgb = FactorGraphBuilder::new();
    let a = fgb.add_variable("a", [0u8, 1]).unwrap();
    let b = fgb.add_variable("b", [0u8, 1, 2]).unwrap();
    let c = fgb.add_variable("c", [0u8, 1]).unwrap();
    let potential = move |x: &Assignment<'_, u8>| -> FactorResult<f64> {
        let (va, vb, vc) = (
            *x.value(a)? as f64,
            *x.value(b)? as f64,
            *x.value(c)? as f64,
        );
        Ok(1. + va + 2. * vb * vc + 0.5 * va * vc)
    };
    fgb.add_factor("w", FnFactor::new(potential), &[a, b, c])
        .unwrap();
    let mut fg = fgb.build();
    fg.initialize_messages();
    let info = fg.belief_propagation(10, 1e-9).unwrap();
    assert_eq!(info.status, Termination::Converged);
    let marginals = fg.marginals().unwrap();
    let total = 31.5;
    let expected = [
        vec![12. / total, 19.5 / total],
        vec![6.5 / total, 10.5 / total, 14.5 / total],
        vec![9. / total, 22.5 / total],
    ];
    for (marginal, expected) in marginals.iter().zip(expected) {
        assert!(dist(marginal, &Array1::from_vec(expected)) < 1e-12);
    }
}

#[test]
fn missing_variable_in_assignment_fails_loudly() {
    let mut fgb = FactorGraphBuilder::new();
    let x = fgb.add_variable("x", [0u8, 1]).unwrap();
    let y = fgb.add_variable("y", [0u8, 1]).unwrap();
    fgb.add_table_factor("prior", &[y], array![1., 2.].into_dyn())
        .unwrap();
    fgb.add_factor(
        "bad",
        FnFactor::new(move |a: &Assignment<'_, u8>| -> FactorResult<f64> {
            Ok(*a.value(y)? as f64 + 1.)
        }),
        &[x],
    )
    .unwrap();
    let mut fg = fgb.build();
    fg.initialize_messages();
    assert_eq!(
        fg.belief_propagation(5, 1e-9),
        Err(FGError::Factor {
            factor: "bad".to_string(),
            source: FactorError::MissingVariable(y),
        })
    );
}

#[test]
fn invalid_potential_is_an_error() {
    let mut fgb = FactorGraphBuilder::new();
    let x = fgb.add_variable("x", [0u8, 1]).unwrap();
    fgb.add_factor(
        "negative",
        FnFactor::new(|a: &Assignment<'_, u8>| -> FactorResult<f64> {
            Ok(*a.at(0).unwrap() as f64 - 0.5)
        }),
        &[x],
    )
    .unwrap();
    let mut fg = fgb.build();
    fg.initialize_messages();
    assert_eq!(
        fg.belief_propagation(5, 1e-9),
        Err(FGError::InvalidPotential {
            factor: "negative".to_string(),
            weight: -0.5,
        })
    );
}

#[test]
fn zero_potential_gives_degenerate_belief() {
    let mut fgb = FactorGraphBuilder::new();
    let x = fgb.add_variable("x", [0u8, 1]).unwrap();
    let zero = FnFactor::new(|_: &Assignment<'_, u8>| -> FactorResult<f64> { Ok(0.) });
    fgb.add_factor("zero", zero, &[x]).unwrap();
    let mut fg = fgb.build();
    fg.initialize_messages();
    let f = FactorId(0);
    let seed = Message::uniform([0u8, 1], 0.5);
    assert_eq!(
        fg.belief_propagation(5, 1e-9),
        Err(FGError::DegenerateBelief {
            variable: "x".to_string()
        })
    );
    // a failed sweep is rolled back
    assert_eq!(fg.state(), InferenceState::Initialized);
    assert_eq!(fg.edge_messages(x, f), Some((&seed, &seed)));
    assert_eq!(fg.calc_belief().unwrap()[&x], seed);
}

#[test]
fn observer_receives_every_sweep() {
    let (mut fg, ..) = chain();
    fg.initialize_messages();
    let mut events = Vec::new();
    let config = BPConfig {
        min_iter: 4,
        ..BPConfig::new(10, 1e-9)
    };
    let info = fg
        .belief_propagation_with_observer(&config, |event| events.push(*event))
        .unwrap();
    assert_eq!(info.status, Termination::Converged);
    assert_eq!(info.sweeps, 4);
    let expected: Vec<_> = info
        .error_dynamics
        .iter()
        .enumerate()
        .map(|(sweep, error)| SweepEvent {
            sweep,
            error: *error,
        })
        .collect();
    assert_eq!(events, expected);
    assert!(events[0].error > 0.);
}

#[test]
fn exhausted_budget_is_not_an_error() {
    let (mut fg, ..) = chain();
    fg.initialize_messages();
    let info = fg.belief_propagation(1, 0.).unwrap();
    assert_eq!(info.status, Termination::Exhausted);
    assert_eq!(info.sweeps, 1);
    assert!(info.last_error.unwrap() > 0.);
}

#[test]
fn single_step_updates() {
    let (mut fg, x, y, f) = chain();
    fg.initialize_messages();
    fg.message_from_factor_to_var(f).unwrap();
    // sum over y of f(x, y) * 1/2
    assert_message(fg.edge_messages(x, f).unwrap().1, &[1.5, 3.5]);
    fg.message_from_var_to_factor(x).unwrap();
    assert_message(fg.edge_messages(x, f).unwrap().0, &[1., 1.]);
    fg.normalize_messages(x).unwrap();
    assert_message(fg.edge_messages(x, f).unwrap().1, &[0.3, 0.7]);
    fg.normalize_messages(y).unwrap();
    assert_message(fg.edge_messages(y, f).unwrap().1, &[0.4, 0.6]);
    assert!(matches!(
        fg.message_from_factor_to_var(FactorId(3)),
        Err(FGError::OutOfRangeFactor(1, 3))
    ));
}

#[test]
fn config_validation_and_parsing() {
    let (mut fg, ..) = chain();
    fg.initialize_messages();
    let bad_damping = BPConfig {
        damping: 1.,
        ..Default::default()
    };
    assert!(matches!(fg.run(&bad_damping), Err(FGError::InvalidConfig(_))));
    assert!(matches!(
        fg.belief_propagation(5, -1.),
        Err(FGError::InvalidConfig(_))
    ));
    let config: BPConfig = serde_yaml::from_str("max_iter: 7\ndamping: 0.25\n").unwrap();
    assert_eq!(
        config,
        BPConfig {
            max_iter: 7,
            damping: 0.25,
            ..Default::default()
        }
    );
    let info = fg.run(&config).unwrap();
    assert!(info.sweeps <= 7);
    let marginals = fg.marginals().unwrap();
    assert!(dist(&marginals[0], &Array1::from_vec(vec![0.3, 0.7])) < 1e-6);
}
