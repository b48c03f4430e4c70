//! Per-cargo link graphs connecting stations.
//!
//! Only membership is modelled: which stations are nodes of which cargo's
//! graph, and the edges between them. Nodes are stored densely; removing one
//! moves the last node into the freed index.

use std::collections::BTreeMap;

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::station::{CargoId, StationId};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Encode,
    Decode,
)]
pub struct LinkGraphId(pub u32);

pub type NodeId = u32;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct LinkGraph {
    pub cargo: CargoId,
    pub nodes: Vec<StationId>,
    /// Capacity of each directed edge, keyed by (from, to) node.
    pub edges: BTreeMap<(NodeId, NodeId), u32>,
}

impl LinkGraph {
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn add_node(&mut self, station: StationId) -> NodeId {
        self.nodes.push(station);
        (self.nodes.len() - 1) as NodeId
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, capacity: u32) {
        *self.edges.entry((from, to)).or_default() += capacity;
    }

    /// Remove `node` and its edges. When another node had to move into the
    /// freed index, returns that node's station so its goods entry can be
    /// repointed to `node`.
    pub fn remove_node(&mut self, node: NodeId) -> Option<StationId> {
        let idx = node as usize;
        assert!(idx < self.nodes.len(), "link graph node {node} out of range");
        let last = (self.nodes.len() - 1) as NodeId;

        self.edges.retain(|&(from, to), _| from != node && to != node);
        self.nodes.swap_remove(idx);

        if node == last {
            return None;
        }
        let edges = std::mem::take(&mut self.edges);
        self.edges = edges
            .into_iter()
            .map(|((from, to), cap)| {
                let from = if from == last { node } else { from };
                let to = if to == last { node } else { to };
                ((from, to), cap)
            })
            .collect();
        Some(self.nodes[idx])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct LinkGraphRegistry {
    graphs: BTreeMap<LinkGraphId, LinkGraph>,
    next_id: u32,
}

impl LinkGraphRegistry {
    pub fn create(&mut self, cargo: CargoId) -> LinkGraphId {
        let id = LinkGraphId(self.next_id);
        self.next_id += 1;
        self.graphs.insert(
            id,
            LinkGraph {
                cargo,
                ..Default::default()
            },
        );
        id
    }

    pub fn get(&self, id: LinkGraphId) -> Option<&LinkGraph> {
        self.graphs.get(&id)
    }

    pub fn get_mut(&mut self, id: LinkGraphId) -> Option<&mut LinkGraph> {
        self.graphs.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Remove a node, deleting the graph once it has no nodes left.
    /// Returns the station whose node moved into `node`, if any.
    pub fn remove_node(&mut self, id: LinkGraphId, node: NodeId) -> Option<StationId> {
        let graph = self.graphs.get_mut(&id)?;
        let moved = graph.remove_node(node);
        if graph.size() == 0 {
            self.graphs.remove(&id);
        }
        moved
    }
}
