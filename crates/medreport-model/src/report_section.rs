use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sections of a stroke discharge report, in the order they appear.
///
/// Each section has one top-level block in the rule file, keyed by
/// [`ReportSection::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSection {
    Diagnosis,
    Patient,
    Onset,
    Admission,
    Treatment,
    FollowUpImaging,
    PostAcuteCare,
    PostStrokeComplications,
    Etiology,
    Discharge,
}

impl ReportSection {
    /// All sections in report order.
    pub const ALL: [ReportSection; 10] = [
        ReportSection::Diagnosis,
        ReportSection::Patient,
        ReportSection::Onset,
        ReportSection::Admission,
        ReportSection::Treatment,
        ReportSection::FollowUpImaging,
        ReportSection::PostAcuteCare,
        ReportSection::PostStrokeComplications,
        ReportSection::Etiology,
        ReportSection::Discharge,
    ];

    /// Key used for this section in rule files, records and scopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportSection::Diagnosis => "diagnosis",
            ReportSection::Patient => "patient",
            ReportSection::Onset => "onset",
            ReportSection::Admission => "admission",
            ReportSection::Treatment => "treatment",
            ReportSection::FollowUpImaging => "follow_up_imaging",
            ReportSection::PostAcuteCare => "post_acute_care",
            ReportSection::PostStrokeComplications => "post_stroke_complications",
            ReportSection::Etiology => "etiology",
            ReportSection::Discharge => "discharge",
        }
    }

    /// Sections left out of the report when the patient was transported
    /// to another center for thrombectomy.
    pub fn suppressed_by_transport(&self) -> bool {
        matches!(
            self,
            ReportSection::FollowUpImaging | ReportSection::PostAcuteCare | ReportSection::Etiology
        )
    }
}

impl fmt::Display for ReportSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportSection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        ReportSection::ALL
            .into_iter()
            .find(|section| section.as_str() == key)
            .ok_or_else(|| format!("unknown report section: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for section in ReportSection::ALL {
            assert_eq!(section.as_str().parse::<ReportSection>(), Ok(section));
        }
        assert!("header".parse::<ReportSection>().is_err());
    }

    #[test]
    fn transport_suppression_set() {
        let suppressed: Vec<ReportSection> = ReportSection::ALL
            .into_iter()
            .filter(ReportSection::suppressed_by_transport)
            .collect();
        assert_eq!(
            suppressed,
            vec![
                ReportSection::FollowUpImaging,
                ReportSection::PostAcuteCare,
                ReportSection::Etiology
            ]
        );
    }
}
