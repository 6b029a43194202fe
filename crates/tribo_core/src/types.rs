//! Prediction output types

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, Result};
use crate::schema::TARGET_COLUMNS;

/// The four predicted tribology metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TribologyPrediction {
    /// SRV coefficient of friction
    #[serde(rename = "SRV_COF")]
    pub srv_cof: f64,

    /// Four-ball wear scar diameter, mm
    #[serde(rename = "FourBall_WSD_mm")]
    pub four_ball_wsd_mm: f64,

    /// EHD film thickness, nm
    #[serde(rename = "EHD_Film_Thickness_nm")]
    pub ehd_film_thickness_nm: f64,

    /// Friction torque, N·m
    #[serde(rename = "Friction_Torque_Nm")]
    pub friction_torque_nm: f64,
}

impl TribologyPrediction {
    /// Unpack one output row, positionally, in target order
    pub fn from_outputs(outputs: &[f64]) -> Result<Self> {
        match outputs {
            [cof, wsd, film, torque, ..] => Ok(Self {
                srv_cof: *cof,
                four_ball_wsd_mm: *wsd,
                ehd_film_thickness_nm: *film,
                friction_torque_nm: *torque,
            }),
            _ => Err(CoreError::Inference(format!(
                "model produced {} outputs, expected {}",
                outputs.len(),
                TARGET_COLUMNS.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_unpacking() {
        let p = TribologyPrediction::from_outputs(&[0.1, 0.5, 80.0, 1.2]).unwrap();
        assert_eq!(p.srv_cof, 0.1);
        assert_eq!(p.four_ball_wsd_mm, 0.5);
        assert_eq!(p.ehd_film_thickness_nm, 80.0);
        assert_eq!(p.friction_torque_nm, 1.2);
    }

    #[test]
    fn test_too_few_outputs() {
        assert!(TribologyPrediction::from_outputs(&[0.1, 0.5]).is_err());
    }

    #[test]
    fn test_wire_names() {
        let p = TribologyPrediction::from_outputs(&[0.1, 0.5, 80.0, 1.2]).unwrap();
        let json = serde_json::to_value(p).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        for target in TARGET_COLUMNS {
            assert!(keys.contains(&target.to_string()), "missing {target}");
        }
    }
}
