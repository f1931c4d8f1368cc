use serde::{Deserialize, Serialize};

use crate::estimate::EstimateError;

pub const SIZE_DELIMITER: char = 'x';

/// Piece size in centimeters, parsed from `WxLxH`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width_cm: f64,
    pub length_cm: f64,
    pub height_cm: f64,
}

impl Dimensions {
    pub fn volume_cm3(&self) -> f64 {
        self.width_cm * self.length_cm * self.height_cm
    }
}

impl std::str::FromStr for Dimensions {
    type Err = EstimateError;

    /// Exactly three tokens split on the literal `x`; each must parse as a
    /// number. Surrounding whitespace per token is ignored.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let tokens = raw.split(SIZE_DELIMITER).collect::<Vec<_>>();
        if tokens.len() != 3 {
            return Err(EstimateError::DimensionCount { raw: raw.to_string(), found: tokens.len() });
        }

        let mut values = [0.0_f64; 3];
        for (slot, token) in values.iter_mut().zip(&tokens) {
            *slot = parse_dimension(raw, token)?;
        }

        Ok(Self { width_cm: values[0], length_cm: values[1], height_cm: values[2] })
    }
}

fn parse_dimension(raw: &str, token: &str) -> Result<f64, EstimateError> {
    let invalid =
        || EstimateError::InvalidDimension { raw: raw.to_string(), token: token.to_string() };
    let value = token.trim().parse::<f64>().map_err(|_| invalid())?;
    if value.is_nan() {
        return Err(invalid());
    }
    Ok(value)
}
