mod budget;
mod optimal;
mod protocol;

use contextual_bayesopt::{Bounds, ContextualBayesOpt};

fn unit(d: usize) -> Bounds {
    Bounds::new(vec![0.0; d], vec![1.0; d]).unwrap()
}

fn one_by_one(n_init: usize, seed: u64) -> ContextualBayesOpt {
    ContextualBayesOpt::builder(1, 1)
        .bounds(unit(1))
        .context_bounds(unit(1))
        .n_init(n_init)
        .seed(seed)
        .build()
        .unwrap()
}
