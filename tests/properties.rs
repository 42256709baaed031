//! Property tests.

#[path = "property/graph.rs"]
mod graph;

#[path = "property/coalescer.rs"]
mod coalescer;
