use std::fmt::Display;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SGError
{
    DimensionMismatch,
    EmptyGrid,
    MissingNodeValue,
    InvalidTargetFunction,
    InvalidIndex,
    InvalidDomain,
    OutOfDomain,
    NodeNotFound,
}
impl std::error::Error for SGError {}

impl Display for SGError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self
        {
            SGError::EmptyGrid => write!(f, "EmptyGrid: the grid has no nodes, build it with `train` before re-fitting"),
            SGError::DimensionMismatch => write!(f, "DimensionMismatch: point length does not match the grid dimension"),
            _ => write!(f, "{:?}", *self),
        }
    }
}
