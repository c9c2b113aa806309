//! Per-section record builders.
//!
//! Every section is built twice from the same source row: the condition
//! record keeps raw codes and typed times for rule evaluation, the display
//! record carries translated labels and formatted dates for substitution.
//! Both use the same field names.

use chrono::{NaiveDate, NaiveTime};
use medreport_ingest::schema::{
    ATRIAL_FIBRILLATION, DISCHARGE_MEDICATIONS, FlagGroup, OCCLUSIONS, POST_STROKE_COMPLICATIONS,
    POST_TREATMENT_FINDINGS, PRIOR_TREATMENT, RISK_FACTORS,
};
use medreport_ingest::SourceRow;
use medreport_model::{Record, RenderIssue, ReportSection, Scope, Section, Value};
use medreport_rules::RuleSet;
use tracing::warn;

use crate::join::join_into;

/// Condition and display records of one subject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectRecords {
    pub condition: Record,
    pub display: Record,
    /// Treatment ended with a transport to another center for thrombectomy.
    pub transported: bool,
}

impl SubjectRecords {
    /// Whether `section` is left out of this subject's report.
    pub fn is_suppressed(&self, section: ReportSection) -> bool {
        self.transported && section.suppressed_by_transport()
    }
}

/// Builds both records for `row`; lookup faults are appended to `issues`.
pub fn build_records(
    rules: &RuleSet,
    row: &SourceRow,
    issues: &mut Vec<RenderIssue>,
) -> SubjectRecords {
    let transported = is_transported(row);
    let mut records = SubjectRecords {
        transported,
        ..SubjectRecords::default()
    };
    for section in ReportSection::ALL {
        let mut writer = SectionWriter::new(section, rules, issues);
        if !records.is_suppressed(section) {
            match section {
                ReportSection::Diagnosis => diagnosis(&mut writer, row),
                ReportSection::Patient => patient(&mut writer, row),
                ReportSection::Onset => onset(&mut writer, row),
                ReportSection::Admission => admission(&mut writer, row),
                ReportSection::Treatment => treatment(&mut writer, row),
                ReportSection::FollowUpImaging => follow_up_imaging(&mut writer, row),
                ReportSection::PostAcuteCare => post_acute_care(&mut writer, row),
                ReportSection::PostStrokeComplications => post_stroke_complications(&mut writer, row),
                ReportSection::Etiology => etiology(&mut writer, row),
                ReportSection::Discharge => discharge(&mut writer, row),
            }
        }
        let (condition, display) = writer.finish();
        records.condition.insert_section(section.as_str(), condition);
        records.display.insert_section(section.as_str(), display);
    }
    records
}

/// Condition scopes of `rules` that no section builder produces, per section.
///
/// Such conditions can never be evaluated and always surface as
/// unresolved-scope issues at render time.
pub fn unknown_scopes(rules: &RuleSet) -> Vec<(ReportSection, Scope)> {
    let mut issues = Vec::new();
    let schema = build_records(rules, &SourceRow::new(), &mut issues);
    let mut unknown = Vec::new();
    for (section, block) in rules.blocks() {
        for scope in block.scopes() {
            let entry = (section, scope.clone());
            if schema.condition.get(scope).is_none() && !unknown.contains(&entry) {
                unknown.push(entry);
            }
        }
    }
    unknown
}

/// Writes one section into the condition and display records.
struct SectionWriter<'a> {
    section: ReportSection,
    rules: &'a RuleSet,
    issues: &'a mut Vec<RenderIssue>,
    condition: Section,
    display: Section,
}

impl<'a> SectionWriter<'a> {
    fn new(section: ReportSection, rules: &'a RuleSet, issues: &'a mut Vec<RenderIssue>) -> Self {
        Self {
            section,
            rules,
            issues,
            condition: Section::new(),
            display: Section::new(),
        }
    }

    fn finish(self) -> (Section, Section) {
        (self.condition, self.display)
    }

    /// Same value in both records.
    fn set(&mut self, field: &str, value: Value) {
        self.condition.insert(field, value.clone());
        self.display.insert(field, value);
    }

    fn copy(&mut self, field: &str, row: &SourceRow, column: &str) {
        self.set(field, row.get(column).clone());
    }

    /// Boolean with a default for missing cells.
    fn flag_or(&mut self, field: &str, row: &SourceRow, column: &str, default: bool) {
        let value = row.get(column).as_bool().unwrap_or(default);
        self.set(field, Value::Bool(value));
    }

    /// Raw code for conditions, its label for display.
    fn translated(&mut self, field: &str, table: &str, code: Value) {
        let label = self.translate(table, &code);
        self.condition.insert(field, code);
        self.display.insert(field, label);
    }

    /// Typed time for conditions, `time_format` text for display.
    fn time(&mut self, field: &str, time: Option<NaiveTime>) {
        let text = time.and_then(|time| {
            let text = self.rules.settings().format_time(time);
            if text.is_none() {
                warn!(section = %self.section, field, "time_format cannot format a time");
            }
            text
        });
        self.condition.insert(field, time);
        self.display.insert(field, text);
    }

    /// `date_format` text in both records.
    fn date(&mut self, field: &str, date: Option<NaiveDate>) {
        let text = date.and_then(|date| {
            let text = self.rules.settings().format_date(date);
            if text.is_none() {
                warn!(section = %self.section, field, "date_format cannot format a date");
            }
            text
        });
        self.set(field, Value::from(text));
    }

    /// Raw flags of a group, keyed by column name.
    fn flags(&mut self, row: &SourceRow, group: &FlagGroup) {
        for (column, _) in group.columns() {
            let value = row.get(&column).clone();
            self.set(&column, value);
        }
    }

    /// Joined labels of a group's truthy flags.
    fn joined(&mut self, table: &str, row: &SourceRow, group: &FlagGroup) -> String {
        let flags: Section = group
            .columns()
            .map(|(column, key)| (key, row.get(&column).clone()))
            .collect();
        self.join_section(table, &flags)
    }

    fn join_section(&mut self, table: &str, flags: &Section) -> String {
        let Some(labels) = self.rules.labels(table) else {
            if flags.iter().any(|(_, value)| value.is_truthy()) {
                self.missing_table(table);
            }
            return String::new();
        };
        let mut unknown = Vec::new();
        let joined = join_into(labels, flags, &mut unknown);
        for key in unknown {
            self.issues
                .push(RenderIssue::unknown_label(self.section, table, key));
        }
        joined
    }

    /// Looks `code` up in a label table. Null or empty codes stay null.
    fn translate(&mut self, table: &str, code: &Value) -> Value {
        if !code.is_truthy() && !matches!(code, Value::Bool(_) | Value::Int(_) | Value::Float(_)) {
            return Value::Null;
        }
        let Some(labels) = self.rules.labels(table) else {
            self.missing_table(table);
            return Value::from("");
        };
        let key = code.to_string();
        match labels.get(&key) {
            Some(label) => Value::from(label),
            None => {
                warn!(section = %self.section, table, "no label for code");
                self.issues
                    .push(RenderIssue::unknown_label(self.section, table, key));
                Value::from("")
            }
        }
    }

    fn missing_table(&mut self, table: &str) {
        warn!(section = %self.section, table, "rule file has no label table");
        self.issues.push(RenderIssue::missing_table(self.section, table));
    }
}

/// Any recorded door-in-door-out time, zero included, means the patient left for thrombectomy.
fn is_transported(row: &SourceRow) -> bool {
    !row.get("door_to_door").is_null()
}

fn time_of(value: &Value) -> Option<NaiveTime> {
    match value {
        Value::DateTime(datetime) => Some(datetime.time()),
        Value::Time(time) => Some(*time),
        _ => None,
    }
}

fn date_of(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::DateTime(datetime) => Some(datetime.date()),
        Value::Date(date) => Some(*date),
        _ => None,
    }
}

fn diagnosis(w: &mut SectionWriter<'_>, row: &SourceRow) {
    w.copy("stroke_type", row, "stroke_type");
    w.copy("aspects_score", row, "aspects_score");
    w.translated("imaging_type", "imaging_type", row.get("imaging_type").clone());
    w.time("imaging_timestamp", time_of(row.get("imaging_timestamp")));
    w.flag_or("imaging_within_hour", row, "imaging_within_hour", false);
    w.flags(row, &OCCLUSIONS);
    let position = w.joined("occlusion_position", row, &OCCLUSIONS);
    w.set("occlusion_position", Value::from(position));
}

fn patient(w: &mut SectionWriter<'_>, row: &SourceRow) {
    w.copy("patient_id", row, "patient_id");
    w.copy("age", row, "age");
    w.translated("sex", "sex", row.get("sex").clone());
    w.flags(row, &RISK_FACTORS);
    let risk_factors = w.joined("risk_factors", row, &RISK_FACTORS);
    w.set("risk_factors", Value::from(risk_factors));
    let prior_treatment = w.joined("prior_treatment", row, &PRIOR_TREATMENT);
    w.set("prior_treatment", Value::from(prior_treatment));
    let atrial_fibrillation = w.joined("risk_factors", row, &ATRIAL_FIBRILLATION);
    w.set("risk_atrial_fibrilation", Value::from(atrial_fibrillation));
}

fn onset(w: &mut SectionWriter<'_>, row: &SourceRow) {
    let timestamp = row.get("onset_timestamp");
    w.date("onset_date", date_of(timestamp));
    w.time("onset_time", time_of(timestamp));
    w.flag_or("wake_up_stroke", row, "wake_up_stroke", false);
}

fn admission(w: &mut SectionWriter<'_>, row: &SourceRow) {
    w.copy("admission_nihss", row, "nihss_score");
    w.copy("aspects_score", row, "aspects_score");
    w.translated("admission_type", "admission_type", row.get("hospitalized_in").clone());
    w.copy("prestroke_mrs", row, "prestroke_mrs");
    w.copy("sys_blood_pressure", row, "sys_blood_pressure");
    w.copy("dia_blood_pressure", row, "dia_blood_pressure");
    w.time("arrival_time", time_of(row.get("hospital_timestamp")));
    w.translated("arrival_mode", "arrival_mode", row.get("arrival_mode").clone());
    w.translated("department_type", "department_type", row.get("department_type").clone());
    w.copy("prenotification", row, "prenotification");
}

/// Label key of a TICI score, absent for missing or unconfirmed occlusions.
fn tici_score_key(score: &Value) -> Value {
    match score {
        Value::Null => Value::Null,
        Value::Text(text) if text.is_empty() || text == "occlusion not confirmed" => Value::Null,
        other => Value::from(format!("tici_score_{other}")),
    }
}

fn treatment(w: &mut SectionWriter<'_>, row: &SourceRow) {
    w.copy("thrombolysis_done", row, "thrombolysis");
    w.copy("thrombectomy_done", row, "thrombectomy");
    w.translated(
        "no_thrombolysis_reasons",
        "no_thrombolysis_reason",
        row.get("no_thrombolysis_reason").clone(),
    );
    w.translated(
        "no_thrombectomy_reasons",
        "no_thrombectomy_reason",
        row.get("no_thrombectomy_reason").clone(),
    );
    w.copy("dtn", row, "door_to_needle");
    w.translated("ivt_treatment", "ivt_treatment", row.get("ivt_treatment").clone());
    w.copy("ivt_dose", row, "ivt_dose");
    w.copy("dtg", row, "door_to_groin");
    w.copy("tici_score", row, "tici_score");
    w.copy("dio", row, "door_to_door");
    w.set("thrombectomy_transport", Value::Bool(is_transported(row)));
    w.translated(
        "tici_score_meaning",
        "tici_score_meaning",
        tici_score_key(row.get("tici_score")),
    );
}

fn follow_up_imaging(w: &mut SectionWriter<'_>, row: &SourceRow) {
    w.copy("imaging_type", row, "post_treatment_imaging");
    let findings = w.joined("post_treatment_findings", row, &POST_TREATMENT_FINDINGS);
    w.set("findings", Value::from(findings));
}

fn received(row: &SourceRow, column: &str) -> Value {
    Value::Bool(row.get(column).as_str() == Some("yes"))
}

fn post_acute_care(w: &mut SectionWriter<'_>, row: &SourceRow) {
    w.copy("afib_flutter", row, "afib_flutter");
    w.copy("swallowing_screening", row, "dysphagia_screening_done");
    w.translated(
        "swallowing_screening_type",
        "swallowing_screening_type",
        row.get("swallowing_screening_type").clone(),
    );
    let therapies = Section::new()
        .with("physiotherapy", received(row, "physiotherapy_received"))
        .with("ergotherapy", received(row, "occup_physiotherapy_received"))
        .with("speechtherapy", received(row, "speech_therapy_received"));
    for (field, value) in therapies.iter() {
        w.set(field, value.clone());
    }
    let joined = w.join_section("therapies", &therapies);
    w.set("therapies", Value::from(joined));
}

fn post_stroke_complications(w: &mut SectionWriter<'_>, row: &SourceRow) {
    w.flags(row, &POST_STROKE_COMPLICATIONS);
    let complications = w.joined("post_stroke_complications", row, &POST_STROKE_COMPLICATIONS);
    w.set("complications", Value::from(complications).non_empty());
}

fn etiology(w: &mut SectionWriter<'_>, row: &SourceRow) {
    w.copy("large_artery", row, "etiology_large_artery");
    w.copy("cardioembolism", row, "etiology_cardioembolism");
    w.copy("other", row, "etiology_other");
    w.copy("cryptogenic_stroke", row, "etiology_cryptogenic_stroke");
    w.copy("small_vessel", row, "etiology_small_vessel");
    w.copy("carotid_stenosis", row, "carotid_stenosis");
    w.copy("carotid_stenosis_level", row, "carotid_stenosis_level");
    w.copy("carotid_stenosis_followup", row, "carotid_stenosis_followup");
    w.copy("afib_flutter", row, "afib_flutter");
}

fn discharge(w: &mut SectionWriter<'_>, row: &SourceRow) {
    w.date("discharge_date", date_of(row.get("discharge_date")));
    w.translated(
        "discharge_destination",
        "discharge_destination",
        row.get("discharge_destination").clone(),
    );
    w.copy("nihss", row, "discharge_nihss_score");
    w.copy("discharge_mrs", row, "discharge_mrs");
    w.date("contact_date", date_of(row.get("contact_date")));
    w.copy("mode_contact", row, "mode_contact");
    let medication = w.joined("medications", row, &DISCHARGE_MEDICATIONS);
    w.set("discharge_medication", Value::from(medication));
}
