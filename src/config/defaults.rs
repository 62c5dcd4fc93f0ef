//! Default value functions for serde deserialization.

pub fn num_background_threads() -> usize {
    4
}

pub fn optimize_every_n_nodes() -> usize {
    90
}

pub fn huber_scale() -> f64 {
    10.0
}

pub fn max_num_iterations() -> usize {
    1
}

pub fn num_range_data() -> usize {
    90
}

pub fn grid_resolution() -> f64 {
    0.05
}

pub fn min_range() -> f32 {
    0.0
}

pub fn max_range() -> f32 {
    30.0
}

pub fn fresh_submaps_count() -> usize {
    1
}

pub fn min_added_submaps_count() -> usize {
    1
}
