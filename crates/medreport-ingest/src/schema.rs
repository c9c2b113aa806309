//! Column kinds of the registry export and the flag groups built from it.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use medreport_model::Value;

/// How a CSV column is typed on ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Text,
    Date,
    DateTime,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Text => "text",
            FieldKind::Date => "date",
            FieldKind::DateTime => "datetime",
        }
    }

    /// Converts a trimmed, non-null cell. `None` means the cell does not fit the kind.
    pub fn parse(&self, raw: &str) -> Option<Value> {
        match self {
            FieldKind::Bool => parse_bool(raw).map(Value::Bool),
            FieldKind::Int => parse_int(raw).map(Value::Int),
            FieldKind::Float => raw.parse::<f64>().ok().map(Value::Float),
            FieldKind::Text => Some(Value::Text(raw.to_string())),
            FieldKind::Date => parse_date(raw).map(Value::Date),
            FieldKind::DateTime => parse_datetime(raw).map(Value::DateTime),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Columns sharing a prefix whose truthy members are listed in one clause.
///
/// The label key of a column is its name without the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagGroup {
    pub prefix: &'static str,
    pub keys: &'static [&'static str],
}

impl FlagGroup {
    /// `(column, label key)` pairs in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = (String, &'static str)> + '_ {
        self.keys
            .iter()
            .map(|key| (format!("{}{key}", self.prefix), *key))
    }

    pub fn contains(&self, column: &str) -> bool {
        column
            .strip_prefix(self.prefix)
            .is_some_and(|key| self.keys.contains(&key))
    }
}

pub const OCCLUSIONS: FlagGroup = FlagGroup {
    prefix: "occlusion_",
    keys: &[
        "left_mca_m1",
        "left_mca_m2",
        "left_mca_m3",
        "left_aca",
        "left_pca_p1",
        "left_pca_p2",
        "left_cae",
        "left_cai",
        "right_mca_m1",
        "right_mca_m2",
        "right_mca_m3",
        "right_aca",
        "right_pca_p1",
        "right_pca_p2",
        "right_cae",
        "right_cai",
        "ba",
        "va",
    ],
};

pub const RISK_FACTORS: FlagGroup = FlagGroup {
    prefix: "risk_",
    keys: &[
        "hypertension",
        "diabetes",
        "hyperlipidemia",
        "smoker",
        "previous_ischemic_stroke",
        "previous_hemorrhagic_stroke",
        "coronary_artery_disease_or_myocardial_infarction",
        "hiv",
    ],
};

/// Reported in its own sentence, so kept apart from [`RISK_FACTORS`].
pub const ATRIAL_FIBRILLATION: FlagGroup = FlagGroup {
    prefix: "risk_",
    keys: &["atrial_fibrilation"],
};

const MEDICATION_KEYS: &[&str] = &[
    "antidiabetics",
    "antihypertensives",
    "asa",
    "cilostazol",
    "clopidrogel",
    "ticagrelor",
    "ticlopidine",
    "prasugrel",
    "dipyridamol",
    "warfarin",
    "dabigatran",
    "rivaroxaban",
    "apixaban",
    "edoxaban",
    "statin",
    "heparin",
    "other",
];

pub const PRIOR_TREATMENT: FlagGroup = FlagGroup {
    prefix: "before_onset_",
    keys: MEDICATION_KEYS,
};

pub const POST_TREATMENT_FINDINGS: FlagGroup = FlagGroup {
    prefix: "post_treatment_",
    keys: &[
        "infarction",
        "no_bleeding",
        "remote",
        "hi_i",
        "hi_ii",
        "ph_i",
        "ph_ii",
    ],
};

pub const POST_STROKE_COMPLICATIONS: FlagGroup = FlagGroup {
    prefix: "post_stroke_",
    keys: &[
        "pneumonia",
        "dvt",
        "embolism",
        "infection",
        "sores",
        "sepsis",
        "extension",
        "other",
    ],
};

pub const DISCHARGE_MEDICATIONS: FlagGroup = FlagGroup {
    prefix: "discharge_",
    keys: MEDICATION_KEYS,
};

pub const FLAG_GROUPS: &[FlagGroup] = &[
    OCCLUSIONS,
    RISK_FACTORS,
    ATRIAL_FIBRILLATION,
    PRIOR_TREATMENT,
    POST_TREATMENT_FINDINGS,
    POST_STROKE_COMPLICATIONS,
    DISCHARGE_MEDICATIONS,
];

const INT_COLUMNS: &[&str] = &[
    "subject_id",
    "age",
    "aspects_score",
    "nihss_score",
    "prestroke_mrs",
    "sys_blood_pressure",
    "dia_blood_pressure",
    "door_to_needle",
    "door_to_groin",
    "door_to_door",
    "discharge_nihss_score",
    "discharge_mrs",
];

const FLOAT_COLUMNS: &[&str] = &["ivt_dose"];

const BOOL_COLUMNS: &[&str] = &[
    "imaging_within_hour",
    "wake_up_stroke",
    "prenotification",
    "thrombolysis",
    "thrombectomy",
    "carotid_stenosis",
    "etiology_large_artery",
    "etiology_cardioembolism",
    "etiology_other",
    "etiology_cryptogenic_stroke",
    "etiology_small_vessel",
];

const DATETIME_COLUMNS: &[&str] = &["onset_timestamp", "imaging_timestamp", "hospital_timestamp"];

const DATE_COLUMNS: &[&str] = &["discharge_date", "contact_date"];

/// Kind of a column; columns outside the schema are text.
pub fn field_kind(column: &str) -> FieldKind {
    if INT_COLUMNS.contains(&column) {
        FieldKind::Int
    } else if FLOAT_COLUMNS.contains(&column) {
        FieldKind::Float
    } else if BOOL_COLUMNS.contains(&column)
        || FLAG_GROUPS.iter().any(|group| group.contains(column))
    {
        FieldKind::Bool
    } else if DATETIME_COLUMNS.contains(&column) {
        FieldKind::DateTime
    } else if DATE_COLUMNS.contains(&column) {
        FieldKind::Date
    } else {
        FieldKind::Text
    }
}

/// Whether the column is part of the schema at all.
pub fn is_known_column(column: &str) -> bool {
    field_kind(column) != FieldKind::Text || TEXT_COLUMNS.contains(&column)
}

const TEXT_COLUMNS: &[&str] = &[
    "patient_id",
    "sex",
    "stroke_type",
    "imaging_type",
    "hospitalized_in",
    "arrival_mode",
    "department_type",
    "ivt_treatment",
    "no_thrombolysis_reason",
    "no_thrombectomy_reason",
    "tici_score",
    "post_treatment_imaging",
    "afib_flutter",
    "dysphagia_screening_done",
    "swallowing_screening_type",
    "physiotherapy_received",
    "occup_physiotherapy_received",
    "speech_therapy_received",
    "carotid_stenosis_level",
    "carotid_stenosis_followup",
    "discharge_destination",
    "mode_contact",
];

/// Cells that stand for a missing value.
pub fn is_null_token(raw: &str) -> bool {
    raw.is_empty()
        || ["NA", "NaN", "None", "null"]
            .iter()
            .any(|token| raw.eq_ignore_ascii_case(token))
}

fn parse_bool(raw: &str) -> Option<bool> {
    let lower = raw.to_ascii_lowercase();
    match lower.as_str() {
        "t" | "true" | "1" | "yes" => Some(true),
        "f" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    // Exports widen integer columns that contain nulls to floats ("14.0").
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(value);
        }
    }
    if let Ok(value) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%#z") {
        return Some(value.naive_local());
    }
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.naive_local());
    }
    parse_date(raw).and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(value) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(value);
    }
    // Date columns are sometimes exported with a midnight time part.
    let (date, _) = raw.split_once([' ', 'T'])?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}
