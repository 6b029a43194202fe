//! Declared input schema for tribology predictions
//!
//! Each field has an internal name and an optional external alias. The
//! alias (when present) is the column name used by the training data and
//! by clients; the internal name is accepted as an alternative key.

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::table::FeatureValue;

/// The single categorical input column
pub const CATEGORICAL_FEATURE: &str = "Base_Oil";

/// Optional identifier column dropped before training
pub const SAMPLE_ID_COLUMN: &str = "Sample ID";

/// Regression targets, in response order
pub const TARGET_COLUMNS: [&str; 4] = [
    "SRV_COF",
    "FourBall_WSD_mm",
    "EHD_Film_Thickness_nm",
    "Friction_Torque_Nm",
];

/// Kind of value a feature column holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

/// One declared input field
#[derive(Debug, Clone)]
pub struct FeatureField {
    pub name: &'static str,
    pub alias: Option<&'static str>,
    pub kind: FeatureKind,
    pub example: FeatureValue,
}

impl FeatureField {
    fn numeric(name: &'static str, alias: Option<&'static str>, example: f64) -> Self {
        Self {
            name,
            alias,
            kind: FeatureKind::Numeric,
            example: FeatureValue::Number(example),
        }
    }

    fn categorical(name: &'static str, example: &'static str) -> Self {
        Self {
            name,
            alias: None,
            kind: FeatureKind::Categorical,
            example: FeatureValue::Category(example.to_string()),
        }
    }

    /// External column name: the alias when defined, otherwise the name
    pub fn column_name(&self) -> &'static str {
        self.alias.unwrap_or(self.name)
    }
}

/// Ordered collection of declared fields
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    fields: Vec<FeatureField>,
}

impl FeatureSchema {
    pub fn new(fields: Vec<FeatureField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FeatureField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column names in declaration order, aliases where defined
    pub fn column_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| field.column_name().to_string())
            .collect()
    }

    /// Find the field whose external column name is `column`
    pub fn field_for_column(&self, column: &str) -> Option<&FeatureField> {
        self.fields.iter().find(|field| field.column_name() == column)
    }

    /// Documented example values keyed by column name
    pub fn example_record(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|field| (field.column_name().to_string(), field.example.to_json()))
            .collect()
    }
}

static TRIBOLOGY_SCHEMA: Lazy<FeatureSchema> = Lazy::new(|| {
    use FeatureField as F;

    FeatureSchema::new(vec![
        F::numeric("Viscosity_40C_cSt", None, 46.23),
        F::numeric("Viscosity_100C_cSt", None, 4.33),
        F::numeric("Viscosity_Index", None, 150.0),
        F::numeric("Density_g_per_cm3", None, 0.89),
        F::categorical(CATEGORICAL_FEATURE, "Group IV"),
        F::numeric("Flash_Point_C", None, 184.0),
        F::numeric("Pour_Point_C", None, -18.0),
        F::numeric("Shear_Stability_Index", None, 18.47),
        F::numeric("ZDDP", None, 0.0),
        F::numeric("MoDTC", None, 0.0),
        F::numeric("Calcium_Sulfonate", Some("Calcium Sulfonate"), 0.65),
        F::numeric("Magnesium_Sulfonate", Some("Magnesium Sulfonate"), 0.62),
        F::numeric("Phenolic_AO", Some("Phenolic AO"), 0.02),
        F::numeric("Amine_AO", Some("Amine AO"), 0.01),
        F::numeric("Dispersant", None, 0.86),
        F::numeric("Boron_Ester", Some("Boron Ester"), 0.02),
        F::numeric("Phosphite", None, 1.53),
        F::numeric("Sulfurized_Olefin", Some("Sulfurized Olefin"), 0.005),
        F::numeric("FM_Oleamide", Some("FM Oleamide"), 0.003),
        F::numeric("FM_Glycerol", Some("FM Glycerol"), 1.57),
        F::numeric("TCP", None, 0.01),
        F::numeric("Polymer_VM", Some("Polymer VM"), 0.05),
        F::numeric("Pour_Point_Depressant", Some("Pour Point Depressant"), 0.005),
        F::numeric("Load_N", Some("Load,N"), 200.0),
        F::numeric("Speed_rpm", Some("Speed, rpm"), 1500.0),
        // The dataset header really is spelled this way.
        F::numeric("Temperatue_C", Some("Temperatue,C"), 60.0),
        F::numeric("Time_min_1", Some("Time, min"), 60.0),
        F::numeric("Time_min_2", Some("Time,min"), 60.0),
        F::numeric("Speed_m_per_s", None, 1.57),
    ])
});

/// The lubricant tribology input schema
pub fn tribology_schema() -> &'static FeatureSchema {
    &TRIBOLOGY_SCHEMA
}
