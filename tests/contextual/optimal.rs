use contextual_bayesopt::gp::Surrogate;
use contextual_bayesopt::{ContextualBayesOpt, ContextualGoal, Error};

use super::{one_by_one, unit};

#[test]
fn optimal_parameters_default_to_previous_context() {
    let mut bo = one_by_one(2, 3);

    bo.update(&ContextualGoal::initial(vec![0.3])).unwrap();
    assert!(bo.model().is_none());
    let x1 = bo.propose().unwrap().x;
    assert!(x1[0] >= 0.0 && x1[0] <= 1.0);

    bo.update(&ContextualGoal::new(0.5, vec![0.7])).unwrap();
    assert_eq!(bo.prev_context(), Some(&[0.3][..]));
    assert_eq!(bo.context(), Some(&[0.7][..]));

    let (x, value) = bo.get_optimal_parameters(None).unwrap();
    assert!(x[0] >= 0.0 && x[0] <= 1.0);
    // A single standardized observation leaves the posterior mean flat at its value.
    assert!((value - 0.5).abs() < 1e-6, "value = {value}");

    let gp = bo.model().unwrap();
    assert!((gp.posterior(&[x[0], 0.3]).mean - value).abs() < 1e-6);
}

#[test]
fn optimal_parameters_are_evaluated_at_the_requested_context() {
    let mut bo = ContextualBayesOpt::builder(1, 1)
        .bounds(unit(1))
        .context_bounds(unit(1))
        .n_init(20)
        .seed(8)
        .build()
        .unwrap();

    let contexts = [0.1, 0.9, 0.3, 0.7, 0.5, 0.2, 0.8, 0.4];
    let mut goal = ContextualGoal::initial(vec![contexts[0]]);
    for (i, &c) in contexts.iter().enumerate() {
        let x = bo.next(&goal).unwrap().unwrap().x;
        let y = -(x[0] - c).powi(2);
        goal = ContextualGoal::new(y, vec![contexts[(i + 1) % contexts.len()]]);
    }
    bo.update(&goal).unwrap();
    assert_eq!(bo.prev_context(), Some(&[0.4][..]));

    let (x_prev, value_prev) = bo.get_optimal_parameters(None).unwrap();
    let (x_low, value_low) = bo.get_optimal_parameters(Some(&[0.1])).unwrap();

    let gp = bo.model().unwrap();
    assert!((gp.posterior(&[x_prev[0], 0.4]).mean - value_prev).abs() < 1e-9);
    assert!((gp.posterior(&[x_low[0], 0.1]).mean - value_low).abs() < 1e-9);
}

#[test]
fn minimization_reports_the_posterior_mean_itself() {
    let mut bo = ContextualBayesOpt::builder(1, 1)
        .bounds(unit(1))
        .context_bounds(unit(1))
        .maximize(false)
        .n_init(20)
        .seed(4)
        .build()
        .unwrap();

    let mut goal = ContextualGoal::initial(vec![0.5]);
    for _ in 0..6 {
        let x = bo.next(&goal).unwrap().unwrap().x;
        goal = ContextualGoal::new((x[0] - 0.6).powi(2), vec![0.5]);
    }
    bo.update(&goal).unwrap();

    let (x, value) = bo.get_optimal_parameters(Some(&[0.5])).unwrap();
    let mean = bo.model().unwrap().posterior(&[x[0], 0.5]).mean;
    assert!((mean - value).abs() < 1e-9, "mean = {mean}, value = {value}");

    // The reported minimum is no worse than the mean at any observed point.
    let (rows, _) = bo.data().get_xy();
    let gp = bo.model().unwrap();
    for row in rows {
        assert!(value <= gp.posterior(row).mean + 1e-6);
    }
}

#[test]
fn optimal_parameters_need_a_model_and_a_context() {
    let mut bo = one_by_one(2, 0);
    assert!(matches!(
        bo.get_optimal_parameters(None),
        Err(Error::MissingContext)
    ));
    assert!(matches!(
        bo.get_optimal_parameters(Some(&[0.5])),
        Err(Error::ModelNotFitted)
    ));
}

#[test]
fn optimal_parameters_reject_malformed_context() {
    let mut bo = one_by_one(2, 0);
    bo.next(&ContextualGoal::initial(vec![0.3])).unwrap();
    bo.update(&ContextualGoal::new(1.0, vec![0.3])).unwrap();
    assert!(matches!(
        bo.get_optimal_parameters(Some(&[0.1, 0.2])),
        Err(Error::Data(_))
    ));
}
