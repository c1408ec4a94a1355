//! Reductions of the population tensor into output records.

use crate::core::PopulationTensor;

/// One output record: the per-host population sizes and mutation loads of a
/// replicate at a point in time. `generation` is absent for per-replicate
/// records.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplicateRow {
    pub replicate: usize,
    pub generation: Option<usize>,
    pub values: Vec<f64>,
}

/// Trait extension to reduce the population tensor to per-host load
/// summaries.
pub trait LoadSummary {
    /// Flat record values `[N1, N2, k1, k2]` per host slot, with the global
    /// block at index 0. `minimum` selects the minimum-load statistic
    /// instead of the population mean; empty populations are marked `-1`.
    fn load_row(&self, minimum: bool) -> Vec<f64>;
}

impl LoadSummary for PopulationTensor {
    fn load_row(&self, minimum: bool) -> Vec<f64> {
        let host_num = self.host_num();
        let n1 = self.one_seg_totals();
        let n2 = self.two_seg_totals();
        let (k1, k2) = if minimum {
            minimum_loads(self)
        } else {
            mean_loads(self)
        };
        let mut values = Vec::with_capacity(4 * (host_num + 1));
        for host in 0..=host_num {
            values.extend([n1[host], n2[host], k1[host], k2[host]]);
        }
        values
    }
}

/// Population-mean mutation loads per host; the global entry weights each
/// host by its share of the grand total.
fn mean_loads(tensor: &PopulationTensor) -> (Vec<f64>, Vec<f64>) {
    let host_num = tensor.host_num();
    let kmax = tensor.kmax();
    let width = kmax + 1;
    let n1 = tensor.one_seg_totals();
    let n2 = tensor.two_seg_totals();
    let mut k1 = vec![0.0; host_num + 1];
    let mut k2 = vec![0.0; host_num + 1];
    let mut k1_total = 0.0;
    let mut k2_total = 0.0;
    for host in 1..=host_num {
        if n2[host] > 0.0 {
            let slab = &tensor.two_seg()[host];
            let mut load = 0.0;
            for j in 0..width {
                for k in 0..width {
                    load += slab[width * j + k] / n2[host] * (j + k) as f64;
                }
            }
            k2[host] = load;
            k2_total += load * n2[host] / n2[0];
        } else {
            k2[host] = -1.0;
        }
        if n1[host] > 0.0 {
            let slab = &tensor.one_seg()[host];
            let mut load = 0.0;
            for (j, &mass) in slab.iter().enumerate() {
                load += mass / n1[host] * j as f64;
            }
            k1[host] = load;
            k1_total += load * n1[host] / n1[0];
        } else {
            k1[host] = -1.0;
        }
    }
    k1[0] = if n1[0] > 0.0 { k1_total } else { -1.0 };
    k2[0] = if n2[0] > 0.0 { k2_total } else { -1.0 };
    (k1, k2)
}

/// Minimum mutation loads per host; the global entry is the minimum across
/// the non-empty hosts.
fn minimum_loads(tensor: &PopulationTensor) -> (Vec<f64>, Vec<f64>) {
    let host_num = tensor.host_num();
    let kmax = tensor.kmax();
    let width = kmax + 1;
    let unset = 2 * kmax + 1;
    let n1 = tensor.one_seg_totals();
    let n2 = tensor.two_seg_totals();
    let mut k1 = vec![0.0; host_num + 1];
    let mut k2 = vec![0.0; host_num + 1];
    let mut k1_global = unset;
    let mut k2_global = unset;
    for host in 1..=host_num {
        if n2[host] > 0.0 {
            let slab = &tensor.two_seg()[host];
            let mut minimum = unset;
            for j in 0..width {
                for k in 0..width {
                    if slab[width * j + k] > 0.0 && j + k < minimum {
                        minimum = j + k;
                    }
                }
            }
            k2[host] = minimum as f64;
            k2_global = k2_global.min(minimum);
        } else {
            k2[host] = -1.0;
        }
        if n1[host] > 0.0 {
            let slab = &tensor.one_seg()[host];
            let mut minimum = unset;
            for (j, &mass) in slab.iter().enumerate() {
                if mass > 0.0 {
                    minimum = j;
                    break;
                }
            }
            k1[host] = minimum as f64;
            k1_global = k1_global.min(minimum);
        } else {
            k1[host] = -1.0;
        }
    }
    k1[0] = if n1[0] > 0.0 { k1_global as f64 } else { -1.0 };
    k2[0] = if n2[0] > 0.0 { k2_global as f64 } else { -1.0 };
    (k1, k2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor() -> PopulationTensor {
        // two hosts, kmax = 2; host 2 left empty
        let mut tensor = PopulationTensor::new(2, 2);
        let index = tensor.class_index(1, 1);
        tensor.two_seg_slab_mut(1)[index] = 6.0;
        tensor.two_seg_slab_mut(1)[0] = 4.0;
        tensor.one_seg_slab_mut(1)[2] = 5.0;
        tensor.one_seg_slab_mut(1)[3] = 5.0;
        tensor.recompute_totals();
        tensor
    }

    #[test]
    fn mean_loads_weight_by_population() {
        let tensor = tensor();
        let (k1, k2) = mean_loads(&tensor);
        // host 1: (4 * 0 + 6 * 2) / 10 = 1.2
        assert!((k2[1] - 1.2).abs() < 1e-12);
        assert!((k1[1] - 2.5).abs() < 1e-12);
        // host 2 is empty
        assert_eq!(k2[2], -1.0);
        assert_eq!(k1[2], -1.0);
        // host 1 carries the entire population, so it is the global mean
        assert!((k2[0] - 1.2).abs() < 1e-12);
        assert!((k1[0] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn mean_loads_mark_empty_population() {
        let tensor = PopulationTensor::new(2, 2);
        let (k1, k2) = mean_loads(&tensor);
        assert_eq!(k1, vec![-1.0, -1.0, -1.0]);
        assert_eq!(k2, vec![-1.0, -1.0, -1.0]);
    }

    #[test]
    fn minimum_loads_find_smallest_class() {
        let mut tensor = tensor();
        // remove the unmutated class so the minimum is no longer zero
        tensor.two_seg_slab_mut(1)[0] = 0.0;
        tensor.recompute_totals();
        let (k1, k2) = minimum_loads(&tensor);
        assert_eq!(k2[1], 2.0);
        assert_eq!(k1[1], 2.0);
        assert_eq!(k2[2], -1.0);
        assert_eq!(k2[0], 2.0);
        assert_eq!(k1[0], 2.0);
    }

    #[test]
    fn minimum_loads_reset_between_hosts() {
        let mut tensor = PopulationTensor::new(2, 2);
        tensor.two_seg_slab_mut(1)[0] = 3.0;
        let index = tensor.class_index(2, 2);
        tensor.two_seg_slab_mut(2)[index] = 3.0;
        tensor.recompute_totals();
        let (_, k2) = minimum_loads(&tensor);
        assert_eq!(k2[1], 0.0);
        assert_eq!(k2[2], 4.0);
        assert_eq!(k2[0], 0.0);
    }

    #[test]
    fn row_layout() {
        let tensor = tensor();
        let values = tensor.load_row(false);
        assert_eq!(values.len(), 12);
        // global block first
        assert_eq!(values[0], 10.0);
        assert_eq!(values[1], 10.0);
        // host 1 block
        assert_eq!(values[4], 10.0);
        assert_eq!(values[5], 10.0);
        // host 2 block
        assert_eq!(values[8], 0.0);
        assert_eq!(values[9], 0.0);
        assert_eq!(values[11], -1.0);
    }
}
