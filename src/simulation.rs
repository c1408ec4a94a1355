use itertools::iproduct;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Poisson};
use std::sync::Arc;

use crate::config::Parameters;
use crate::core::{MutationTables, PopulationTensor};

/// State of a single replicate.
///
/// A generation applies the four stage kernels in fixed order: mutation
/// accumulation, reassortment, selection-constrained reproduction, and
/// migration with transmission. Each kernel consumes the current buffer of
/// the tensor and writes the other one. Replicates share only the read-only
/// mutation tables; tensor and random number generator are owned per
/// replicate, so replicates can run on independent workers.
pub struct Simulation {
    parameters: Parameters,
    tables: Arc<MutationTables>,
    tensor: PopulationTensor,
    rng: StdRng,
}

impl Simulation {
    pub fn new(parameters: Parameters, tables: Arc<MutationTables>, seed: u64) -> Self {
        let tensor = PopulationTensor::new(parameters.host_num, parameters.kmax);
        let rng = StdRng::seed_from_u64(seed);
        Self {
            parameters,
            tables,
            tensor,
            rng,
        }
    }

    /// Re-seed the tensor with the initial conditions.
    pub fn reset(&mut self) {
        self.tensor.reset(
            self.parameters.n0 as f64,
            &self.parameters.pop2init,
            &self.parameters.pop1init,
        );
    }

    pub fn tensor(&self) -> &PopulationTensor {
        &self.tensor
    }

    pub fn tensor_mut(&mut self) -> &mut PopulationTensor {
        &mut self.tensor
    }

    /// Advance one generation.
    pub fn step(&mut self) {
        self.mutate();
        self.reassort();
        self.reproduce();
        self.migrate();
    }

    /// Mutation accumulation.
    ///
    /// Redistributes every source class into higher mutation classes using
    /// the precomputed transition rows; the diagonal entry keeps the mass
    /// that acquires no mutation. Mass preserving per host and arity.
    pub fn mutate(&mut self) {
        let host_num = self.parameters.host_num;
        let kmax = self.parameters.kmax;
        let mutcap = self.parameters.mutcap;
        self.tensor.assert_pool_empty();

        let n2 = self.tensor.two_seg_totals().to_vec();
        {
            let (source, destination) = self.tensor.flip_two_seg();
            for host in 1..=host_num {
                if n2[host] <= 0.0 {
                    continue;
                }
                for (class, &mass) in source[host].iter().enumerate() {
                    if mass <= 0.0 {
                        continue;
                    }
                    for &(target, weight) in self.tables.transitions(class) {
                        destination[host][target] += mass * weight;
                    }
                }
            }
        }

        let n1 = self.tensor.one_seg_totals().to_vec();
        {
            let (source, destination) = self.tensor.flip_one_seg();
            for host in 1..=host_num {
                if n1[host] <= 0.0 {
                    continue;
                }
                for j in 0..=2 * kmax {
                    let mass = source[host][j];
                    if mass <= 0.0 {
                        continue;
                    }
                    let cap = mutcap.min(2 * kmax - j);
                    let mut stay = mass;
                    for l in 1..=cap {
                        let moved = self.tables.factor(l) * mass;
                        stay -= moved;
                        destination[host][j + l] += moved;
                    }
                    destination[host][j] += stay;
                }
            }
        }
    }

    /// Reassortment.
    ///
    /// A fraction `1 - r` of each host's two-segment particles keeps its
    /// linkage; a fraction `r` is re-paired as the product of the segment
    /// marginals. Deterministic mean-field update, the stochasticity is
    /// deferred to the Poisson draws of reproduction.
    pub fn reassort(&mut self) {
        let host_num = self.parameters.host_num;
        let width = self.parameters.kmax + 1;
        let r = self.parameters.r;

        let n2 = self.tensor.two_seg_totals().to_vec();
        let (source, destination) = self.tensor.flip_two_seg();
        let mut jp = vec![0.0; width];
        let mut kp = vec![0.0; width];
        for host in 1..=host_num {
            if n2[host] <= 0.0 {
                continue;
            }
            jp.fill(0.0);
            kp.fill(0.0);
            for (j, k) in iproduct!(0..width, 0..width) {
                let mass = source[host][width * j + k];
                jp[j] += mass;
                kp[k] += mass;
            }
            for proportion in jp.iter_mut() {
                *proportion /= n2[host];
            }
            for proportion in kp.iter_mut() {
                *proportion /= n2[host];
            }
            for (j, k) in iproduct!(0..width, 0..width) {
                let class = width * j + k;
                destination[host][class] =
                    (1.0 - r) * source[host][class] + r * n2[host] * jp[j] * kp[k];
            }
        }
    }

    /// Selection-constrained reproduction.
    ///
    /// Every class count is replaced by an independent Poisson draw with
    /// mean `P (1-s)^load (1-c) 2 / (1 + N/K)`; the two-segment cost `1-c`
    /// does not apply to one-segment particles. The class at the mutation
    /// ceiling is sterile. `N` is the per-host total from before this
    /// generation's reproduction; totals are only refreshed by migration.
    pub fn reproduce(&mut self) {
        let host_num = self.parameters.host_num;
        let kmax = self.parameters.kmax;
        let width = kmax + 1;
        let s = self.parameters.s;
        let c = self.parameters.c;
        let capacity = self.parameters.capacity as f64;

        let n = self.tensor.totals().to_vec();
        let n1 = self.tensor.one_seg_totals().to_vec();
        let n2 = self.tensor.two_seg_totals().to_vec();

        {
            let (source, destination) = self.tensor.flip_two_seg();
            for host in 1..=host_num {
                if n2[host] <= 0.0 {
                    continue;
                }
                let density = 2.0 / (1.0 + n[host] / capacity);
                for (j, k) in iproduct!(0..width, 0..width) {
                    if j + k == 2 * kmax {
                        continue;
                    }
                    let class = width * j + k;
                    let mean = source[host][class]
                        * (1.0 - s).powi((j + k) as i32)
                        * (1.0 - c)
                        * density;
                    destination[host][class] = poisson_draw(&mut self.rng, mean);
                }
            }
        }

        {
            let (source, destination) = self.tensor.flip_one_seg();
            for host in 1..=host_num {
                if n1[host] <= 0.0 {
                    continue;
                }
                let density = 2.0 / (1.0 + n[host] / capacity);
                for j in 0..2 * kmax {
                    let mean = source[host][j] * (1.0 - s).powi(j as i32) * density;
                    destination[host][j] = poisson_draw(&mut self.rng, mean);
                }
            }
        }
    }

    /// Migration and transmission.
    ///
    /// First every host deposits a fraction `mig` of each class into the
    /// shared pool; then every host receives a Poisson draw with mean
    /// `pool / host_num * tr` per class. The pool is cleared afterwards and
    /// all totals are refreshed. Transmission draws are not conservative,
    /// this is the intended stochastic model.
    pub fn migrate(&mut self) {
        let host_num = self.parameters.host_num;
        let kmax = self.parameters.kmax;
        let mig = self.parameters.mig;
        let tr = self.parameters.tr;
        let hosts = host_num as f64;

        let n1 = self.tensor.one_seg_totals().to_vec();
        let n2 = self.tensor.two_seg_totals().to_vec();
        let mut new_n1 = vec![0.0; host_num + 1];
        let mut new_n2 = vec![0.0; host_num + 1];

        {
            let two_classes = (kmax + 1) * (kmax + 1);
            let (source, destination) = self.tensor.flip_two_seg();
            let (pool, hosts_out) = destination.split_at_mut(1);
            let pool = &mut pool[0];
            for host in 1..=host_num {
                if n2[host] <= 0.0 {
                    continue;
                }
                for class in 0..two_classes {
                    let mass = source[host][class];
                    hosts_out[host - 1][class] = mass - mass * mig;
                    pool[class] += mass * mig;
                }
            }
            for host in 1..=host_num {
                let mut total = 0.0;
                for class in 0..two_classes {
                    hosts_out[host - 1][class] +=
                        poisson_draw(&mut self.rng, pool[class] / hosts * tr);
                    total += hosts_out[host - 1][class];
                }
                new_n2[host] = total;
            }
            pool.fill(0.0);
        }

        {
            let one_classes = 2 * kmax + 1;
            let (source, destination) = self.tensor.flip_one_seg();
            let (pool, hosts_out) = destination.split_at_mut(1);
            let pool = &mut pool[0];
            for host in 1..=host_num {
                if n1[host] <= 0.0 {
                    continue;
                }
                for class in 0..one_classes {
                    let mass = source[host][class];
                    hosts_out[host - 1][class] = mass - mass * mig;
                    pool[class] += mass * mig;
                }
            }
            for host in 1..=host_num {
                let mut total = 0.0;
                for class in 0..one_classes {
                    hosts_out[host - 1][class] +=
                        poisson_draw(&mut self.rng, pool[class] / hosts * tr);
                    total += hosts_out[host - 1][class];
                }
                new_n1[host] = total;
            }
            pool.fill(0.0);
        }

        for host in 1..=host_num {
            self.tensor.set_host_totals(host, new_n1[host], new_n2[host]);
        }
        self.tensor.refresh_grand_totals();
    }
}

/// Poisson deviate for a non-negative mean; a mean of zero has an empty
/// draw. A negative mean cannot occur by construction.
fn poisson_draw(rng: &mut StdRng, mean: f64) -> f64 {
    debug_assert!(mean >= 0.0, "negative Poisson mean {mean}");
    if mean <= 0.0 {
        return 0.0;
    }
    match Poisson::new(mean) {
        Ok(distribution) => distribution.sample(rng),
        Err(_) => 0.0,
    }
}
