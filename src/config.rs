use std::str::FromStr;
use serde::{Deserialize, Serialize};

///
/// Progress output for a full re-fit. `Iter` prints one line per depth level,
/// `Final` a single line when the re-fit completes.
///
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintLevel
{
    None,
    #[default]
    Iter,
    Final,
}

impl FromStr for PrintLevel
{
    type Err = std::convert::Infallible;

    /// Anything other than `"iter"` or `"final"` is silent.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s
        {
            "iter" => PrintLevel::Iter,
            "final" => PrintLevel::Final,
            _ => PrintLevel::None,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions
{
    /// Relative tolerance handed to the trainer. Not used by evaluation or fitting.
    pub rtol: f64,
    pub print_level: PrintLevel,
}

impl Default for FitOptions
{
    fn default() -> Self {
        Self { rtol: 1e-3, print_level: PrintLevel::Iter }
    }
}
