// Adapters layer: concrete implementations of the domain ports (geocoding,
// raster analytics, run logs, storage) and the CSV table codecs.

pub mod event_log;
pub mod nominatim;
pub mod raster_http;
pub mod raster_memory;
pub mod storage;
pub mod table;
