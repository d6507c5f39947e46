use crate::storage::node::Node;

pub trait Basis
{
    /// One-dimensional basis function of `(level, index)` at `x`.
    fn eval(&self, level: u8, index: u32, x: f64) -> f64;
    /// Location of `(level, index)` in the unit interval.
    fn node(&self, level: u8, index: u32) -> f64;
    /// Integral of the one-dimensional basis function over the unit interval.
    fn integral(&self, level: u8, index: u32) -> f64;

    ///
    /// Tensor product over all dimensions of `node` at `x`. Neither the length
    /// of `x` nor its range is checked.
    ///
    #[inline]
    fn eval_node(&self, node: &Node, x: &[f64]) -> f64
    {
        let mut value = 1.0;
        for d in 0..node.level.len()
        {
            value *= self.eval(node.level[d], node.index[d], x[d]);
            if value == 0.0
            {
                break;
            }
        }
        value
    }

    #[inline]
    fn integral_node(&self, node: &Node) -> f64
    {
        (0..node.level.len()).map(|d| self.integral(node.level[d], node.index[d])).product()
    }
}
