// Domain layer: the feature records, the raster request contract and the ports
// the enrichment core talks through.

pub mod model;
pub mod ports;
pub mod raster;
