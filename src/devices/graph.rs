//! The device graph and its evaluation order.
//!
//! Devices form a directed acyclic graph; audio flows along edges from
//! voice processors through mixers and effects. The topological order is
//! computed once when the graph is sealed, never on the render path, and
//! the graph is immutable while a chunk renders.

use super::device_impl::DeviceImpl;
use crate::error::KunquatError;
use crate::limits::DEVICES_MAX;
use std::sync::Arc;

/// One node of the device graph.
pub struct DeviceNode {
    pub device_impl: Arc<dyn DeviceImpl>,
    /// Owning audio unit, if any.
    pub au_index: Option<usize>,
}

/// A sealed, walkable device graph.
#[derive(Default)]
pub struct DeviceGraph {
    nodes: Vec<DeviceNode>,
    /// Edges as `(from, to)` device id pairs.
    edges: Vec<(usize, usize)>,
    order: Vec<usize>,
    sealed: bool,
}

impl DeviceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device; returns its id.
    pub fn add_device(
        &mut self,
        device_impl: Arc<dyn DeviceImpl>,
        au_index: Option<usize>,
    ) -> Result<usize, KunquatError> {
        if self.sealed {
            return Err(KunquatError::Format(
                "device graph is sealed".to_string(),
            ));
        }
        if self.nodes.len() >= DEVICES_MAX {
            return Err(KunquatError::Format("too many devices".to_string()));
        }
        self.nodes.push(DeviceNode {
            device_impl,
            au_index,
        });
        Ok(self.nodes.len() - 1)
    }

    pub fn connect(&mut self, from: usize, to: usize) -> Result<(), KunquatError> {
        if self.sealed {
            return Err(KunquatError::Format(
                "device graph is sealed".to_string(),
            ));
        }
        if from >= self.nodes.len() || to >= self.nodes.len() || from == to {
            return Err(KunquatError::Format(format!(
                "invalid connection {} -> {}",
                from, to
            )));
        }
        if !self.edges.contains(&(from, to)) {
            self.edges.push((from, to));
        }
        Ok(())
    }

    /// Freeze the graph and compute the evaluation order.
    ///
    /// Fails when the connections contain a cycle.
    pub fn seal(&mut self) -> Result<(), KunquatError> {
        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        for &(_, to) in &self.edges {
            in_degree[to] += 1;
        }

        let mut ready: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(node) = ready.pop() {
            order.push(node);
            for &(from, to) in &self.edges {
                if from == node {
                    in_degree[to] -= 1;
                    if in_degree[to] == 0 {
                        ready.push(to);
                    }
                }
            }
        }

        if order.len() != n {
            return Err(KunquatError::Format(
                "device graph contains a cycle".to_string(),
            ));
        }

        self.order = order;
        self.sealed = true;
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn node(&self, id: usize) -> &DeviceNode {
        &self.nodes[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Device ids in evaluation order. Only valid after sealing.
    pub fn order(&self) -> &[usize] {
        debug_assert!(self.sealed);
        &self.order
    }

    /// Devices feeding into `id`.
    pub fn predecessors(&self, id: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .filter(move |&&(_, to)| to == id)
            .map(|&(from, _)| from)
    }

    /// Devices with no outgoing connection; their outputs form the final
    /// mix.
    pub fn sinks(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(move |&id| !self.edges.iter().any(|&(from, _)| from == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::processors::DebugProcessor;

    fn dummy() -> Arc<dyn DeviceImpl> {
        Arc::new(DebugProcessor::new())
    }

    #[test]
    fn test_topological_order_respects_edges() {
        let mut graph = DeviceGraph::new();
        let a = graph.add_device(dummy(), None).unwrap();
        let b = graph.add_device(dummy(), None).unwrap();
        let c = graph.add_device(dummy(), None).unwrap();
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();
        graph.seal().unwrap();

        let order = graph.order();
        let pos = |id| order.iter().position(|&x| x == id).unwrap();
        assert!(pos(a) < pos(b));
        assert!(pos(b) < pos(c));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut graph = DeviceGraph::new();
        let a = graph.add_device(dummy(), None).unwrap();
        let b = graph.add_device(dummy(), None).unwrap();
        graph.connect(a, b).unwrap();
        graph.connect(b, a).unwrap();
        assert!(graph.seal().is_err());
    }

    #[test]
    fn test_sealed_graph_rejects_changes() {
        let mut graph = DeviceGraph::new();
        let a = graph.add_device(dummy(), None).unwrap();
        graph.seal().unwrap();
        assert!(graph.add_device(dummy(), None).is_err());
        assert!(graph.connect(a, a).is_err());
    }

    #[test]
    fn test_sinks_and_predecessors() {
        let mut graph = DeviceGraph::new();
        let a = graph.add_device(dummy(), None).unwrap();
        let b = graph.add_device(dummy(), None).unwrap();
        let c = graph.add_device(dummy(), None).unwrap();
        graph.connect(a, c).unwrap();
        graph.connect(b, c).unwrap();
        graph.seal().unwrap();

        let sinks: Vec<usize> = graph.sinks().collect();
        assert_eq!(sinks, vec![c]);
        let mut preds: Vec<usize> = graph.predecessors(c).collect();
        preds.sort_unstable();
        assert_eq!(preds, vec![a, b]);
    }
}
