use super::base::Basis;

/// Piecewise linear hat functions without boundary points.
#[derive(Copy, Clone, Debug, Default)]
pub struct LinearBasis;

impl Basis for LinearBasis
{
    #[inline]
    fn eval(&self, level: u8, index: u32, x: f64) -> f64 {
        0.0_f64.max(1.0-f64::abs((1_u64 << level) as f64 * x - index as f64))
    }

    #[inline]
    fn node(&self, level: u8, index: u32) -> f64
    {
        index as f64 / (1_u64 << level) as f64
    }

    #[inline]
    fn integral(&self, level: u8, _index: u32) -> f64 {
        1.0 / (1_u64 << level) as f64
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::storage::node::Node;

    #[test]
    fn hat_peaks_at_node_and_vanishes_off_support()
    {
        let basis = LinearBasis;
        assert_eq!(basis.eval(1, 1, 0.5), 1.0);
        assert_eq!(basis.eval(1, 1, 0.25), 0.5);
        assert_eq!(basis.eval(1, 1, 0.0), 0.0);
        assert_eq!(basis.eval(2, 3, basis.node(2, 3)), 1.0);
        assert_eq!(basis.eval(2, 3, 0.5), 0.0);
        assert_eq!(basis.eval(2, 3, 0.25), 0.0);
        assert_eq!(basis.eval(3, 1, 0.0625), 0.5);
    }

    #[test]
    fn tensor_product_over_dimensions()
    {
        let basis = LinearBasis;
        let node = Node::new(&[1, 2], &[1, 1]);
        assert_eq!(basis.eval_node(&node, &[0.5, 0.25]), 1.0);
        assert_eq!(basis.eval_node(&node, &[0.25, 0.125]), 0.25);
        assert_eq!(basis.eval_node(&node, &[0.25, 0.75]), 0.0);
        assert_eq!(basis.integral_node(&node), 0.125);
    }
}
