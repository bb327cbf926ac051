// Domain layer: parser records, graph attributes and the ports the pipeline depends on.

pub mod model;
pub mod ports;
