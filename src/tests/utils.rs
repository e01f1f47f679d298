use ndarray::{Array1, ArrayD, IxDyn};

pub(super) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(super) fn dist(lhs: &Array1<f64>, rhs: &Array1<f64>) -> f64 {
    (lhs - rhs).iter().map(|x| x.abs()).sum()
}

/// Exact marginals of a model over `usize` states obtained by enumerating
/// every joint configuration
pub(super) fn brute_force_marginals(
    domain_sizes: &[usize],
    factors: &[(Vec<usize>, ArrayD<f64>)],
) -> Vec<Array1<f64>> {
    let mut marginals: Vec<Array1<f64>> = domain_sizes
        .iter()
        .map(|n| Array1::zeros(*n))
        .collect();
    let mut config = vec![0usize; domain_sizes.len()];
    loop {
        let weight: f64 = factors
            .iter()
            .map(|(scope, table)| {
                let index: Vec<usize> = scope.iter().map(|v| config[*v]).collect();
                table[IxDyn(&index)]
            })
            .product();
        for (marginal, state) in marginals.iter_mut().zip(&config) {
            marginal[*state] += weight;
        }
        let mut i = 0;
        loop {
            if i == config.len() {
                let total: f64 = marginals[0].sum();
                return marginals.into_iter().map(|m| m / total).collect();
            }
            config[i] += 1;
            if config[i] < domain_sizes[i] {
                break;
            }
            config[i] = 0;
            i += 1;
        }
    }
}
