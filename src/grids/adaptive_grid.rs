use std::collections::HashMap;
use std::hash::BuildHasher;

use indexmap::IndexMap;
use indexmap::map::MutableKeys;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::algorithms::evaluation::{EvaluationFilter, Evaluator};
use crate::algorithms::update::{self, FunctionSource, SelfSource, TableSource};
use crate::basis::base::Basis;
use crate::basis::linear::LinearBasis;
use crate::config::{FitOptions, PrintLevel};
use crate::errors::SGError;
use crate::storage::node::Node;
use crate::storage::node_value::NodeValue;
use crate::storage::normalizer::Normalizer;

pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

///
/// True if every node's parent in every direction is also present.
///
pub fn is_selfcontained(nodes: &FxIndexMap<Node, NodeValue>) -> bool
{
    nodes.keys().all(|node| node.parents().all(|parent| nodes.contains_key(&parent)))
}

///
/// Adaptive sparse grid on the unit cube. Nodes are kept in insertion order and
/// are never removed; fitting only overwrites their values.
///
#[serde_as]
#[derive(Clone, Serialize, Deserialize)]
pub struct AdaptiveSparseGrid
{
    pub(crate) num_inputs: usize,
    #[serde_as(as = "Vec<(_, _)>")]
    pub(crate) nodes: FxIndexMap<Node, NodeValue>,
    pub(crate) depth: usize,
    pub(crate) rtol: f64,
    pub(crate) selfcontained: bool,
}

impl AdaptiveSparseGrid
{
    pub fn new(num_inputs: usize) -> Self
    {
        Self::with_options(num_inputs, &FitOptions::default())
    }

    pub fn with_options(num_inputs: usize, options: &FitOptions) -> Self
    {
        Self { num_inputs, nodes: FxIndexMap::default(), depth: 0, rtol: options.rtol, selfcontained: true }
    }

    #[inline]
    pub fn num_inputs(&self) -> usize
    {
        self.num_inputs
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.nodes.is_empty()
    }

    /// Deepest node currently in the grid, 0 if empty.
    #[inline]
    pub fn depth(&self) -> usize
    {
        self.depth
    }

    pub fn rtol(&self) -> f64
    {
        self.rtol
    }

    pub fn set_rtol(&mut self, rtol: f64)
    {
        self.rtol = rtol;
    }

    pub fn is_selfcontained(&self) -> bool
    {
        self.selfcontained
    }

    #[inline]
    pub fn get(&self, node: &Node) -> Option<&NodeValue>
    {
        self.nodes.get(node)
    }

    #[inline]
    pub fn contains(&self, node: &Node) -> bool
    {
        self.nodes.contains_key(node)
    }

    #[inline]
    pub fn iter(&self) -> indexmap::map::Iter<'_, Node, NodeValue>
    {
        self.nodes.iter()
    }

    pub fn nodes(&self) -> indexmap::map::Keys<'_, Node, NodeValue>
    {
        self.nodes.keys()
    }

    ///
    /// Inserts a node with a not-yet-computed value and returns its position.
    /// Inserting a node that is already present leaves its value untouched.
    /// Malformed multi-indices are rejected with `InvalidIndex`.
    ///
    pub fn insert(&mut self, node: Node) -> Result<usize, SGError>
    {
        if node.num_inputs() != self.num_inputs
        {
            return Err(SGError::DimensionMismatch);
        }
        node.validate()?;
        if let Some(seq) = self.nodes.get_index_of(&node)
        {
            return Ok(seq);
        }
        let depth = node.depth();
        let has_parents = node.parents().all(|parent| self.nodes.contains_key(&parent));
        let (seq, _) = self.nodes.insert_full(node, NodeValue::default());
        self.depth = self.depth.max(depth);
        self.selfcontained = if self.selfcontained
        {
            has_parents
        }
        else
        {
            is_selfcontained(&self.nodes)
        };
        Ok(seq)
    }

    /// Marks a fitted value as stale so the next `update` refits it.
    pub fn invalidate(&mut self, node: &Node) -> Result<(), SGError>
    {
        let value = self.nodes.get_mut(node).ok_or(SGError::NodeNotFound)?;
        value.invalidate();
        Ok(())
    }

    /// Masks (or unmasks) a node so that filtered evaluation skips it.
    pub fn mask(&mut self, node: &Node, masked: bool) -> Result<(), SGError>
    {
        let (_, key, _) = self.nodes.get_full_mut2(node).ok_or(SGError::NodeNotFound)?;
        key.set_masked(masked);
        Ok(())
    }

    /// Recomputes the maximum depth and the self-contained flag from the node set.
    pub fn refresh_metadata(&mut self)
    {
        self.depth = self.nodes.keys().map(Node::depth).max().unwrap_or(0);
        self.selfcontained = is_selfcontained(&self.nodes);
    }

    ///
    /// Collocation points in insertion order, mapped to the real domain when a
    /// normalizer is given.
    ///
    pub fn points(&self, normalizer: Option<&Normalizer>) -> Vec<Vec<f64>>
    {
        self.nodes.keys().map(|node|
        {
            let point = node.unit_coordinate();
            match normalizer
            {
                Some(normalizer) => normalizer.to_real_coordinate(&point),
                None => point,
            }
        }).collect()
    }

    /// Evaluate the interpolant at a point of the unit cube. The range of `x` is not checked.
    pub fn evaluate(&self, x: &[f64], filter: EvaluationFilter) -> Result<f64, SGError>
    {
        Evaluator(self, LinearBasis).eval(x, filter)
    }

    /// Evaluate the interpolant at the collocation point of `node`.
    pub fn evaluate_node(&self, node: &Node, filter: EvaluationFilter) -> Result<f64, SGError>
    {
        Evaluator(self, LinearBasis).eval_node(node, filter)
    }

    /// Evaluate at a point of the normalizer's domain. The range of `x` is not checked.
    pub fn evaluate_normalized(&self, x: &[f64], normalizer: &Normalizer, filter: EvaluationFilter) -> Result<f64, SGError>
    {
        Evaluator(self, LinearBasis).eval_normalized(x, normalizer, filter)
    }

    /// Like `evaluate_normalized`, but points outside the domain are rejected.
    pub fn evaluate_checked(&self, x: &[f64], normalizer: &Normalizer, filter: EvaluationFilter) -> Result<f64, SGError>
    {
        Evaluator(self, LinearBasis).eval_checked(x, normalizer, filter)
    }

    /// Evaluate many points of the unit cube in parallel.
    pub fn evaluate_batch(&self, x: &[Vec<f64>], filter: EvaluationFilter) -> Vec<Result<f64, SGError>>
    {
        let evaluator = Evaluator(self, LinearBasis);
        x.par_iter().map(|point| evaluator.eval(point, filter)).collect()
    }

    ///
    /// Integral of the interpolant over the unit cube, or over the normalizer's
    /// domain when one is given.
    ///
    pub fn integrate(&self, normalizer: Option<&Normalizer>) -> f64
    {
        let basis = LinearBasis;
        let integral: f64 = self.nodes.iter().map(|(node, value)| value.alpha * basis.integral_node(node)).sum();
        integral * normalizer.map_or(1.0, Normalizer::volume)
    }

    /// Fit every node that is not valid from the grid itself.
    pub fn update(&mut self) -> Result<(), SGError>
    {
        update::update_invalid(self, &mut SelfSource)
    }

    /// Fit every node that is not valid against `f2fit`, called with unit-cube coordinates.
    pub fn update_with<F: FnMut(&[f64]) -> f64>(&mut self, mut f2fit: F) -> Result<(), SGError>
    {
        update::check_target(&mut f2fit, self.num_inputs)?;
        update::update_invalid(self, &mut FunctionSource(f2fit))
    }

    /// Refit every node against `f2fit`, keeping the node set.
    pub fn update_all<F: FnMut(&[f64]) -> f64>(&mut self, mut f2fit: F, print_level: PrintLevel) -> Result<(), SGError>
    {
        if self.is_empty()
        {
            return Err(SGError::EmptyGrid);
        }
        update::check_target(&mut f2fit, self.num_inputs)?;
        update::update_all(self, &mut FunctionSource(f2fit), print_level)
    }

    /// Refit every node from a table of values that covers every node of the grid.
    pub fn update_all_from_values<S: BuildHasher>(&mut self, values: &HashMap<Node, f64, S>, print_level: PrintLevel) -> Result<(), SGError>
    {
        update::update_all(self, &mut TableSource(values), print_level)
    }
}

///
/// Builds the regular grid holding every node down to `depth`, parents first.
///
#[cfg(test)]
pub(crate) fn regular_grid(num_inputs: usize, depth: usize) -> AdaptiveSparseGrid
{
    let mut grid = AdaptiveSparseGrid::new(num_inputs);
    let mut frontier = vec![Node::root(num_inputs)];
    while !frontier.is_empty()
    {
        let mut next = Vec::new();
        for node in frontier
        {
            if grid.contains(&node)
            {
                continue;
            }
            if node.depth() < depth
            {
                for dim in 0..num_inputs
                {
                    next.push(node.left_child(dim));
                    next.push(node.right_child(dim));
                }
            }
            grid.insert(node).unwrap();
        }
        frontier = next;
    }
    grid
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::storage::node_value::ValueState;

    #[test]
    fn regular_grid_sizes()
    {
        assert_eq!(regular_grid(1, 3).len(), 7);
        // 1 + 4 + 12
        assert_eq!(regular_grid(2, 3).len(), 17);
        let grid = regular_grid(3, 2);
        assert_eq!(grid.len(), 7);
        assert_eq!(grid.depth(), 2);
        assert!(grid.is_selfcontained());
    }

    #[test]
    fn insert_tracks_depth_and_selfcontainedness()
    {
        let mut grid = AdaptiveSparseGrid::new(2);
        let root = Node::root(2);
        let child = root.right_child(0).right_child(1);
        grid.insert(child.clone()).unwrap();
        assert_eq!(grid.depth(), 3);
        assert!(!grid.is_selfcontained());
        grid.insert(root.right_child(0)).unwrap();
        grid.insert(root.right_child(1)).unwrap();
        assert!(!grid.is_selfcontained());
        grid.insert(root.clone()).unwrap();
        assert!(grid.is_selfcontained());
        assert_eq!(grid.insert(child).unwrap(), 0);
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.nodes().next().map(Node::depth), Some(3));
        assert_eq!(grid.insert(Node::root(3)), Err(SGError::DimensionMismatch));
    }

    #[test]
    fn insert_rejects_malformed_nodes()
    {
        let mut grid = AdaptiveSparseGrid::new(1);
        grid.insert(Node::root(1)).unwrap();
        assert_eq!(grid.insert(Node::new(&[64], &[1])), Err(SGError::InvalidIndex));
        assert_eq!(grid.insert(Node::new(&[2], &[2])), Err(SGError::InvalidIndex));
        assert_eq!(grid.insert(Node::new(&[0], &[1])), Err(SGError::InvalidIndex));
        assert_eq!(grid.insert(Node::new(&[2], &[5])), Err(SGError::InvalidIndex));
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.depth(), 1);
        assert!(grid.is_selfcontained());
        assert!(grid.evaluate(&[0.5], EvaluationFilter::default()).is_ok());

        let mut grid = AdaptiveSparseGrid::new(2);
        assert_eq!(grid.insert(Node::new(&[1, 1], &[1, 2])), Err(SGError::InvalidIndex));
        assert!(grid.is_empty());
    }

    #[test]
    fn options_set_tolerance()
    {
        let options = FitOptions { rtol: 1e-8, ..Default::default() };
        let mut grid = AdaptiveSparseGrid::with_options(2, &options);
        assert_eq!(grid.rtol(), 1e-8);
        grid.set_rtol(1e-4);
        assert_eq!(grid.rtol(), 1e-4);
        assert_eq!(AdaptiveSparseGrid::new(2).rtol(), FitOptions::default().rtol);
    }

    #[test]
    fn new_nodes_start_not_computed()
    {
        let grid = regular_grid(1, 2);
        assert!(grid.iter().all(|(_, value)| value.state == ValueState::NotComputed));
        assert_eq!(grid.points(None), vec![vec![0.5], vec![0.25], vec![0.75]]);
        let normalizer = Normalizer::new(&[-2.0], &[2.0]).unwrap();
        assert_eq!(grid.points(Some(&normalizer)), vec![vec![0.0], vec![-1.0], vec![1.0]]);
    }

    #[test]
    fn invalidate_and_mask_require_known_nodes()
    {
        let mut grid = regular_grid(1, 2);
        let missing = Node::new(&[3], &[1]);
        assert_eq!(grid.invalidate(&missing), Err(SGError::NodeNotFound));
        assert_eq!(grid.mask(&missing, true), Err(SGError::NodeNotFound));
        grid.mask(&Node::root(1), true).unwrap();
        assert!(grid.nodes().next().is_some_and(Node::is_masked));
    }

    #[test]
    fn integrate_matches_trapezoid_rule()
    {
        let mut grid = regular_grid(1, 6);
        grid.update_with(|x| x[0] * (1.0 - x[0])).unwrap();
        assert!((grid.integrate(None) - 1.0 / 6.0).abs() < 1e-4);
        let normalizer = Normalizer::new(&[0.0], &[3.0]).unwrap();
        assert!((grid.integrate(Some(&normalizer)) - 0.5).abs() < 3e-4);
    }

    #[test]
    fn grid_snapshot_roundtrip()
    {
        let mut grid = regular_grid(2, 3);
        grid.update_with(|x| x[0] * x[1]).unwrap();
        grid.mask(&Node::root(2), true).unwrap();
        let config = bincode::config::standard();
        let bytes = bincode::serde::encode_to_vec(&grid, config).unwrap();
        let (restored, _): (AdaptiveSparseGrid, usize) = bincode::serde::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(restored.len(), grid.len());
        assert_eq!(restored.depth(), grid.depth());
        assert!(restored.nodes().next().is_some_and(Node::is_masked));
        for ((a, va), (b, vb)) in grid.iter().zip(restored.iter())
        {
            assert_eq!(a, b);
            assert_eq!(va, vb);
        }
    }
}
