use contextual_bayesopt::{ContextualBayesOpt, ContextualGoal, Error, ProposalSource};

use super::{one_by_one, unit};

#[test]
fn first_goal_only_sets_context() {
    let mut bo = one_by_one(2, 0);
    bo.update(&ContextualGoal::initial(vec![0.3])).unwrap();
    assert_eq!(bo.n_data(), 0);
    assert_eq!(bo.context(), Some(&[0.3][..]));
    assert!(bo.prev_context().is_none());
    assert!(bo.model().is_none());
}

#[test]
fn outcome_without_pending_point_is_ignored() {
    let mut bo = one_by_one(2, 0);
    bo.update(&ContextualGoal::new(5.0, vec![0.4])).unwrap();
    assert_eq!(bo.n_data(), 0);
    assert_eq!(bo.context(), Some(&[0.4][..]));
}

#[test]
fn propose_needs_a_context() {
    let mut bo = one_by_one(2, 0);
    assert!(matches!(bo.propose(), Err(Error::MissingContext)));
    assert!(bo.x_new().is_none());
}

#[test]
fn observation_is_stored_with_the_context_it_was_proposed_under() {
    let mut bo = one_by_one(2, 11);
    let x1 = bo
        .next(&ContextualGoal::initial(vec![0.3]))
        .unwrap()
        .unwrap()
        .x;
    assert!(x1[0] >= 0.0 && x1[0] <= 1.0);
    assert_eq!(bo.x_new(), Some(&x1[..]));

    bo.update(&ContextualGoal::new(0.5, vec![0.7])).unwrap();

    let (x, y) = bo.data().get_xy();
    assert_eq!(x, &[vec![x1[0], 0.3]]);
    assert_eq!(y, &[0.5]);
    assert_eq!(bo.prev_context(), Some(&[0.3][..]));
    assert_eq!(bo.context(), Some(&[0.7][..]));
    assert!(bo.x_new().is_none());
    assert!(bo.model().is_some());
}

#[test]
fn missing_outcome_leaves_state_untouched() {
    let mut bo = one_by_one(2, 1);
    bo.next(&ContextualGoal::initial(vec![0.3])).unwrap();
    let pending = bo.x_new().map(<[f64]>::to_vec);

    let result = bo.update(&ContextualGoal {
        y_new: None,
        c_new: vec![0.9],
    });
    assert!(matches!(result, Err(Error::Data(_))));
    assert_eq!(bo.x_new().map(<[f64]>::to_vec), pending);
    assert_eq!(bo.context(), Some(&[0.3][..]));
    assert_eq!(bo.n_data(), 0);
}

#[test]
fn non_finite_outcome_is_rejected() {
    let mut bo = one_by_one(2, 1);
    bo.next(&ContextualGoal::initial(vec![0.3])).unwrap();
    let result = bo.update(&ContextualGoal::new(f64::INFINITY, vec![0.9]));
    assert!(matches!(result, Err(Error::Data(_))));
    assert_eq!(bo.n_data(), 0);
    assert_eq!(bo.context(), Some(&[0.3][..]));
}

#[test]
fn initial_design_then_acquisition() {
    let mut bo = ContextualBayesOpt::builder(2, 1)
        .bounds(unit(2))
        .context_bounds(unit(1))
        .n_init(3)
        .seed(5)
        .build()
        .unwrap();

    let contexts = [0.1, 0.9, 0.5, 0.3, 0.7, 0.2];
    let mut goal = ContextualGoal::initial(vec![contexts[0]]);
    for (i, &c) in contexts.iter().enumerate() {
        let proposal = bo.next(&goal).unwrap().unwrap();
        assert!(bo.bounds().contains(&proposal.x));
        if i < 3 {
            assert_eq!(proposal.source, ProposalSource::Initial);
        } else {
            assert_ne!(proposal.source, ProposalSource::Initial);
        }
        let y = -(proposal.x[0] - c).powi(2) - (proposal.x[1] - 0.5).powi(2);
        let c_next = contexts.get(i + 1).copied().unwrap_or(0.5);
        goal = ContextualGoal::new(y, vec![c_next]);
    }
    bo.update(&goal).unwrap();

    // Every stored row ends with the context its decision part was proposed for.
    let (x, _) = bo.data().get_xy();
    assert_eq!(x.len(), contexts.len());
    for (row, &c) in x.iter().zip(&contexts) {
        assert_eq!(row.len(), 3);
        assert!((row[2] - c).abs() < f64::EPSILON);
    }
}

#[test]
fn best_observation_is_split() {
    let mut bo = ContextualBayesOpt::builder(2, 1)
        .bounds(unit(2))
        .context_bounds(unit(1))
        .maximize(false)
        .n_init(5)
        .seed(2)
        .build()
        .unwrap();
    assert!(matches!(
        bo.get_best_observation(),
        Err(Error::NoObservations)
    ));

    let mut goal = ContextualGoal::initial(vec![0.2]);
    let mut pending = Vec::new();
    for (y, c) in [(3.0, 0.4), (-1.0, 0.6), (2.0, 0.8)] {
        pending.push((bo.next(&goal).unwrap().unwrap().x, goal.c_new.clone()));
        goal = ContextualGoal::new(y, vec![c]);
    }
    bo.update(&goal).unwrap();

    let (x, c, y) = bo.get_best_observation().unwrap();
    assert_eq!(x, pending[1].0);
    assert_eq!(c, pending[1].1);
    assert!((y + 1.0).abs() < f64::EPSILON);
}
