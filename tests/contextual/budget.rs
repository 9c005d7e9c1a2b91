use contextual_bayesopt::{ContextualBayesOpt, ContextualGoal};

use super::unit;

#[test]
fn next_returns_none_once_budget_is_spent() {
    let mut bo = ContextualBayesOpt::builder(1, 1)
        .bounds(unit(1))
        .context_bounds(unit(1))
        .n_init(2)
        .max_iter(3)
        .seed(6)
        .build()
        .unwrap();

    let mut goal = ContextualGoal::initial(vec![0.2]);
    let mut proposals = 0;
    while let Some(p) = bo.next(&goal).unwrap() {
        proposals += 1;
        goal = ContextualGoal::new(p.x[0], vec![0.6]);
    }
    assert_eq!(proposals, 3);
    assert_eq!(bo.n_data(), 3);
    assert!(bo.budget_exhausted());
    assert!(bo.x_new().is_none());

    // Further goals only move the context.
    assert!(bo.next(&ContextualGoal::new(1.0, vec![0.9])).unwrap().is_none());
    assert_eq!(bo.n_data(), 3);
    assert_eq!(bo.context(), Some(&[0.9][..]));
}

#[test]
fn zero_budget_is_unlimited() {
    let mut bo = ContextualBayesOpt::builder(1, 1)
        .bounds(unit(1))
        .context_bounds(unit(1))
        .n_init(100)
        .seed(6)
        .build()
        .unwrap();
    assert_eq!(bo.max_iter(), 0);

    let mut goal = ContextualGoal::initial(vec![0.2]);
    for _ in 0..12 {
        let p = bo.next(&goal).unwrap().unwrap();
        goal = ContextualGoal::new(p.x[0], vec![0.2]);
    }
    assert!(!bo.budget_exhausted());
}
