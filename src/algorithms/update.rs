use std::collections::HashMap;
use std::hash::BuildHasher;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::algorithms::evaluation::{DepthBound, Evaluator};
use crate::basis::linear::LinearBasis;
use crate::config::PrintLevel;
use crate::errors::SGError;
use crate::grids::adaptive_grid::AdaptiveSparseGrid;
use crate::storage::node::Node;
use crate::storage::node_value::NodeValue;

///
/// Where the value `f` of a node comes from when its surplus is (re)computed.
///
pub(crate) trait SampleSource
{
    fn sample(&mut self, grid: &AdaptiveSparseGrid, node: &Node, x: &[f64]) -> Result<f64, SGError>;
}

///
/// Samples the grid itself: every valid node, at any depth.
///
pub(crate) struct SelfSource;

impl SampleSource for SelfSource
{
    fn sample(&mut self, grid: &AdaptiveSparseGrid, _node: &Node, x: &[f64]) -> Result<f64, SGError> {
        Ok(Evaluator(grid, LinearBasis).accumulate(x, DepthBound::Unrestricted, true))
    }
}

pub(crate) struct FunctionSource<F>(pub F);

impl<F: FnMut(&[f64]) -> f64> SampleSource for FunctionSource<F>
{
    #[inline]
    fn sample(&mut self, _grid: &AdaptiveSparseGrid, _node: &Node, x: &[f64]) -> Result<f64, SGError> {
        Ok((self.0)(x))
    }
}

pub(crate) struct TableSource<'a, S>(pub &'a HashMap<Node, f64, S>);

impl<S: BuildHasher> SampleSource for TableSource<'_, S>
{
    #[inline]
    fn sample(&mut self, _grid: &AdaptiveSparseGrid, node: &Node, _x: &[f64]) -> Result<f64, SGError> {
        self.0.get(node).copied().ok_or(SGError::MissingNodeValue)
    }
}

///
/// Calls `f2fit` once at the centre of the unit cube, before any node is touched.
/// A panic (e.g. a callable written for another dimension) or a non-finite value
/// rejects it.
///
/// Only the centre is sampled: a callable that returns NaN elsewhere passes and
/// the NaN is stored in the affected nodes. A panic is caught, but the process
/// panic hook still runs, so the default hook prints its message to stderr.
///
pub(crate) fn check_target<F: FnMut(&[f64]) -> f64>(f2fit: &mut F, num_inputs: usize) -> Result<(), SGError>
{
    let centre = vec![0.5; num_inputs];
    match catch_unwind(AssertUnwindSafe(|| f2fit(&centre)))
    {
        Ok(value) if value.is_finite() => Ok(()),
        _ => Err(SGError::InvalidTargetFunction),
    }
}

///
/// Residual fit of the node stored at `seq`: `alpha = f - (valid ancestors at x)`.
///
fn fit_node<SOURCE: SampleSource>(grid: &mut AdaptiveSparseGrid, seq: usize, source: &mut SOURCE) -> Result<(), SGError>
{
    let value = {
        let grid: &AdaptiveSparseGrid = grid;
        let Some((node, _)) = grid.nodes.get_index(seq) else { return Ok(()) };
        let x = node.unit_coordinate();
        let f = source.sample(grid, node, &x)?;
        let ancestors = Evaluator(grid, LinearBasis).eval_ancestors(node, &x);
        NodeValue::new(f, f - ancestors)
    };
    if let Some((_, slot)) = grid.nodes.get_index_mut(seq)
    {
        *slot = value;
    }
    Ok(())
}

///
/// Fits every node whose value is not valid. Nodes are taken shallowest first
/// (insertion order within a depth) so that a pending parent is fitted before
/// its children read it.
///
pub(crate) fn update_invalid<SOURCE: SampleSource>(grid: &mut AdaptiveSparseGrid, source: &mut SOURCE) -> Result<(), SGError>
{
    let mut pending: Vec<(usize, usize)> = grid.nodes.iter().enumerate()
        .filter(|(_, (_, value))| !value.is_valid())
        .map(|(seq, (node, _))| (node.depth(), seq))
        .collect();
    pending.sort_by_key(|&(depth, _)| depth);
    for (_, seq) in pending
    {
        fit_node(grid, seq, source)?;
    }
    Ok(())
}

///
/// Refits every node, one depth level at a time, shallowest first. Each level
/// reads the freshly fitted values of all shallower levels.
///
pub(crate) fn update_all<SOURCE: SampleSource>(grid: &mut AdaptiveSparseGrid, source: &mut SOURCE, print_level: PrintLevel) -> Result<(), SGError>
{
    if grid.is_empty()
    {
        return Err(SGError::EmptyGrid);
    }
    grid.refresh_metadata();
    let mut levels: Vec<Vec<usize>> = vec![Vec::new(); grid.depth + 1];
    for (seq, node) in grid.nodes.keys().enumerate()
    {
        levels[node.depth()].push(seq);
    }
    let mut num_fitted = 0;
    for (depth, level) in levels.iter().enumerate()
    {
        if level.is_empty()
        {
            continue;
        }
        for &seq in level
        {
            fit_node(grid, seq, source)?;
        }
        num_fitted += level.len();
        if print_level == PrintLevel::Iter
        {
            println!("update_all: depth {}/{}, {} nodes fitted", depth, grid.depth, level.len());
        }
    }
    if print_level == PrintLevel::Final
    {
        println!("update_all: {} nodes fitted up to depth {}", num_fitted, grid.depth);
    }
    Ok(())
}
