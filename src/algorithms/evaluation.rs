use crate::{basis::base::Basis, errors::SGError, grids::adaptive_grid::AdaptiveSparseGrid, storage::{node::Node, normalizer::Normalizer}};

///
/// Selects which nodes contribute to an evaluation.
///
/// `until_depth == 0` keeps every depth, otherwise only nodes with
/// `depth <= until_depth` are summed. `valid_only` drops nodes whose value is
/// not valid as well as nodes that have been masked.
///
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EvaluationFilter
{
    pub until_depth: usize,
    pub valid_only: bool,
}

impl EvaluationFilter
{
    pub fn new(until_depth: usize, valid_only: bool) -> Self
    {
        Self { until_depth, valid_only }
    }

    pub fn until_depth(until_depth: usize) -> Self
    {
        Self { until_depth, valid_only: false }
    }

    pub fn valid_only() -> Self
    {
        Self { until_depth: 0, valid_only: true }
    }

    fn depth_bound(&self) -> DepthBound
    {
        match self.until_depth
        {
            0 => DepthBound::Unrestricted,
            k => DepthBound::UpTo(k),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) enum DepthBound
{
    Unrestricted,
    /// `UpTo(0)` selects nothing.
    UpTo(usize),
}

pub struct Evaluator<'a, BASIS: Basis>(pub &'a AdaptiveSparseGrid, pub BASIS);

impl<BASIS: Basis> Evaluator<'_, BASIS>
{
    ///
    /// Full scan over the grid in insertion order, summing `alpha * phi(x)` over
    /// the nodes that pass both filters.
    ///
    #[inline]
    pub(crate) fn accumulate(&self, x: &[f64], bound: DepthBound, valid_only: bool) -> f64
    {
        let mut result = 0.0;
        for (node, value) in self.0.iter()
        {
            if let DepthBound::UpTo(max_depth) = bound
            {
                if node.depth() > max_depth
                {
                    continue;
                }
            }
            if valid_only && (!value.is_valid() || node.is_masked())
            {
                continue;
            }
            result += value.alpha * self.1.eval_node(node, x);
        }
        result
    }

    ///
    /// Interpolant formed by the valid nodes strictly shallower than `node`,
    /// evaluated at `x`. Zero for a depth-1 node.
    ///
    #[inline]
    pub(crate) fn eval_ancestors(&self, node: &Node, x: &[f64]) -> f64
    {
        match node.depth().checked_sub(1)
        {
            Some(max_depth) => self.accumulate(x, DepthBound::UpTo(max_depth), true),
            None => 0.0,
        }
    }

    pub fn eval(&self, x: &[f64], filter: EvaluationFilter) -> Result<f64, SGError>
    {
        if x.len() != self.0.num_inputs()
        {
            return Err(SGError::DimensionMismatch);
        }
        Ok(self.accumulate(x, filter.depth_bound(), filter.valid_only))
    }

    pub fn eval_node(&self, node: &Node, filter: EvaluationFilter) -> Result<f64, SGError>
    {
        self.eval(&node.unit_coordinate(), filter)
    }

    pub fn eval_normalized(&self, x: &[f64], normalizer: &Normalizer, filter: EvaluationFilter) -> Result<f64, SGError>
    {
        if x.len() != self.0.num_inputs() || normalizer.num_inputs() != self.0.num_inputs()
        {
            return Err(SGError::DimensionMismatch);
        }
        self.eval(&normalizer.to_unit_coordinate(x), filter)
    }

    pub fn eval_checked(&self, x: &[f64], normalizer: &Normalizer, filter: EvaluationFilter) -> Result<f64, SGError>
    {
        if x.len() != self.0.num_inputs() || normalizer.num_inputs() != self.0.num_inputs()
        {
            return Err(SGError::DimensionMismatch);
        }
        if !normalizer.contains(x)
        {
            return Err(SGError::OutOfDomain);
        }
        self.eval(&normalizer.to_unit_coordinate(x), filter)
    }
}
