use std::fmt;

use ethers::abi::{Abi, ParamType, Token};
use ethers::types::U256;
use eyre::{bail, Context};
use serde::{Deserialize, Serialize};

/// Largest float that is still an exact integer, 2^53
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A literal constructor argument, encoded against the constructor ABI
/// only when the deployment is built
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstructorArg {
    Integer(u64),
    Fractional(f64),
}

impl fmt::Display for ConstructorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Fractional(value) => write!(f, "{value}"),
        }
    }
}

impl ConstructorArg {
    fn as_integer(&self) -> eyre::Result<u64> {
        let value = match *self {
            Self::Integer(value) => return Ok(value),
            Self::Fractional(value) => value,
        };

        if !value.is_finite() {
            bail!("{value} is not a finite number");
        }

        if value.fract() != 0.0 {
            bail!("underflow: {value} is not a whole number");
        }

        if value.abs() >= MAX_SAFE_INTEGER {
            bail!("overflow: {value} is not exactly representable");
        }

        if value < 0.0 {
            bail!("out of bounds: {value} is negative");
        }

        Ok(value as u64)
    }

    pub fn tokenize(&self, kind: &ParamType) -> eyre::Result<Token> {
        match kind {
            ParamType::Uint(bits) => {
                let value = self.as_integer()?;
                check_width(value, *bits, kind)?;

                Ok(Token::Uint(U256::from(value)))
            }
            ParamType::Int(bits) => {
                let value = self.as_integer()?;
                check_width(value, bits.saturating_sub(1), kind)?;

                Ok(Token::Int(U256::from(value)))
            }
            ParamType::String => Ok(Token::String(self.to_string())),
            kind => bail!("{self} cannot be encoded as {kind}"),
        }
    }
}

fn check_width(value: u64, bits: usize, kind: &ParamType) -> eyre::Result<()> {
    if bits < 64 && value >> bits != 0 {
        bail!("overflow: {value} does not fit in {kind}");
    }

    Ok(())
}

/// Encodes `args` against the constructor of `abi`, a missing constructor
/// takes no arguments
pub fn tokenize(abi: &Abi, args: &[ConstructorArg]) -> eyre::Result<Vec<Token>> {
    let inputs = abi
        .constructor()
        .map(|constructor| constructor.inputs.as_slice())
        .unwrap_or_default();

    if inputs.len() != args.len() {
        bail!(
            "Constructor takes {} arguments, {} were given",
            inputs.len(),
            args.len()
        );
    }

    inputs
        .iter()
        .zip(args)
        .map(|(input, arg)| {
            arg.tokenize(&input.kind).with_context(|| {
                format!("Encoding constructor argument {}", input.name)
            })
        })
        .collect()
}
