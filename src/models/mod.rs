// ============ Model implementations ============

pub(crate) mod modernbert;
