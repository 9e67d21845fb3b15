mod graph;

pub(crate) use graph::Graph;
