use std::hash::{Hash, Hasher};
use serde::{Deserialize, Serialize};
use bitfield_struct::bitfield;
use crate::errors::SGError;

/// Deepest level a node may carry in any dimension.
pub const MAX_LEVEL: u8 = 31;

#[bitfield(u8, new=false)]
#[derive(Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeFlags
{
    /// Set by upstream refinement to exclude the node from filtered evaluation.
    pub is_masked: bool,
    #[bits(7)]
    pub _empty: u8
}

///
/// A grid point identified by one `(level, index)` pair per dimension.
///
/// Level `l` holds the odd indices `1..2^l`, placed at `index / 2^l`. The flags are
/// not part of the node's identity: equality, hashing and ordering only look at
/// the multi-index.
///
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Node
{
    pub level: Vec<u8>,
    pub index: Vec<u32>,
    pub(crate) flags: NodeFlags,
}

impl Hash for Node
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.index.hash(state);
    }
}

impl PartialEq for Node
{
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level && self.index == other.index
    }
}
impl Eq for Node{}

impl PartialOrd for Node
{
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(std::cmp::Ord::cmp(self, other))
    }
}
impl Ord for Node{
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.index.cmp(&other.index).then(self.level.cmp(&other.level))
    }
}

impl Node
{
    /// Builds a node without checking the multi-index.
    pub fn new(level: &[u8], index: &[u32]) -> Self
    {
        Self { level: level.to_vec(), index: index.to_vec(), flags: NodeFlags::default() }
    }

    ///
    /// Builds a node, rejecting mismatched lengths, levels outside `1..=MAX_LEVEL`
    /// and indices that are even or past the end of their level.
    ///
    pub fn try_new(level: &[u8], index: &[u32]) -> Result<Self, SGError>
    {
        let node = Self::new(level, index);
        node.validate()?;
        Ok(node)
    }

    /// Checks the multi-index against the rules enforced by `try_new`.
    pub fn validate(&self) -> Result<(), SGError>
    {
        if self.level.is_empty() || self.level.len() != self.index.len()
        {
            return Err(SGError::InvalidIndex);
        }
        for (&l, &i) in self.level.iter().zip(self.index.iter())
        {
            if l == 0 || l > MAX_LEVEL || i % 2 == 0 || (i as u64) >= (1_u64 << l)
            {
                return Err(SGError::InvalidIndex);
            }
        }
        Ok(())
    }

    /// The coarsest node, `(1, 1)` in every dimension.
    pub fn root(num_inputs: usize) -> Self
    {
        Self { level: vec![1; num_inputs], index: vec![1; num_inputs], flags: NodeFlags::default() }
    }

    #[inline]
    pub fn num_inputs(&self) -> usize
    {
        self.level.len()
    }

    pub fn level_sum(&self) -> usize
    {
        self.level.iter().map(|&l| l as usize).sum()
    }

    ///
    /// Depth in the hierarchy: `sum(level) - d + 1`, so the root sits at depth 1
    /// and every ancestor of a node is strictly shallower than the node.
    ///
    #[inline]
    pub fn depth(&self) -> usize
    {
        (self.level_sum() + 1).saturating_sub(self.num_inputs())
    }

    pub fn is_masked(&self) -> bool
    {
        self.flags.is_masked()
    }

    pub fn set_masked(&mut self, masked: bool)
    {
        self.flags.set_is_masked(masked);
    }

    pub fn left_child(&self, dim: usize) -> Node
    {
        let mut r = Self::new(&self.level, &self.index);
        r.index[dim] = 2*self.index[dim] - 1;
        r.level[dim] += 1;
        r
    }

    pub fn right_child(&self, dim: usize) -> Node
    {
        let mut r = Self::new(&self.level, &self.index);
        r.index[dim] = 2*self.index[dim] + 1;
        r.level[dim] += 1;
        r
    }

    ///
    /// Parent in direction `dim`, or `None` when the node is already on level 1 there.
    ///
    pub fn parent(&self, dim: usize) -> Option<Node>
    {
        if self.level[dim] <= 1
        {
            return None;
        }
        let mut r = Self::new(&self.level, &self.index);
        r.index[dim] = (self.index[dim] >> 1) | 1;
        r.level[dim] -= 1;
        Some(r)
    }

    /// Parents in every direction that has one.
    pub fn parents(&self) -> impl Iterator<Item = Node> + '_
    {
        (0..self.num_inputs()).filter_map(|dim| self.parent(dim))
    }

    pub fn unit_coordinate(&self) -> Vec<f64>
    {
        let mut coor = vec![0.0; self.index.len()];
        #[allow(clippy::needless_range_loop)]
        for d in 0..self.index.len()
        {
            coor[d] = self.index[d] as f64 / (1_u64 << self.level[d]) as f64;
        }
        coor
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn depth_counts_levels_above_root()
    {
        assert_eq!(Node::root(3).depth(), 1);
        assert_eq!(Node::new(&[2], &[3]).depth(), 2);
        assert_eq!(Node::new(&[2, 3, 1], &[1, 5, 1]).depth(), 4);
    }

    #[test]
    fn children_and_parents_are_inverse()
    {
        let node = Node::new(&[2, 1], &[3, 1]);
        for dim in 0..2
        {
            let left = node.left_child(dim);
            let right = node.right_child(dim);
            assert_eq!(left.parent(dim), Some(node.clone()));
            assert_eq!(right.parent(dim), Some(node.clone()));
            assert_eq!(left.depth(), node.depth() + 1);
        }
        assert_eq!(node.parent(1), None);
        assert_eq!(node.parents().count(), 1);
    }

    #[test]
    fn unit_coordinate_is_dyadic()
    {
        assert_eq!(Node::root(2).unit_coordinate(), vec![0.5, 0.5]);
        assert_eq!(Node::new(&[2, 3], &[1, 5]).unit_coordinate(), vec![0.25, 0.625]);
    }

    #[test]
    fn flags_do_not_affect_identity()
    {
        let mut masked = Node::root(2);
        masked.set_masked(true);
        assert!(masked.is_masked());
        assert_eq!(masked, Node::root(2));
    }

    #[test]
    fn try_new_rejects_malformed_indices()
    {
        assert!(Node::try_new(&[2, 1], &[3, 1]).is_ok());
        assert_eq!(Node::try_new(&[2], &[2]), Err(SGError::InvalidIndex));
        assert_eq!(Node::try_new(&[2], &[5]), Err(SGError::InvalidIndex));
        assert_eq!(Node::try_new(&[0], &[1]), Err(SGError::InvalidIndex));
        assert_eq!(Node::try_new(&[1, 1], &[1]), Err(SGError::InvalidIndex));
        assert_eq!(Node::try_new(&[], &[]), Err(SGError::InvalidIndex));
    }
}
