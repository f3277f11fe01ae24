// Adapters layer: concrete implementations for external systems.
// http 對接權威存放區的 REST 介面;cache 維護本地的有界快照。

pub mod cache;
pub mod http;
