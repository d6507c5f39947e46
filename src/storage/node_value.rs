use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValueState
{
    /// Inserted, never fitted.
    #[default]
    NotComputed,
    Valid,
    /// Fitted once, then invalidated. Holds the old numbers until refit.
    Stale,
}

///
/// Payload stored per node: the sampled (or fitted) value `f` and the
/// hierarchical surplus `alpha`.
///
#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeValue
{
    pub f: f64,
    pub alpha: f64,
    pub state: ValueState,
}

impl NodeValue
{
    pub fn new(f: f64, alpha: f64) -> Self
    {
        Self { f, alpha, state: ValueState::Valid }
    }

    #[inline]
    pub fn is_valid(&self) -> bool
    {
        self.state == ValueState::Valid
    }

    pub(crate) fn invalidate(&mut self)
    {
        if self.state == ValueState::Valid
        {
            self.state = ValueState::Stale;
        }
    }
}
