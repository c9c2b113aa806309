//! End-to-end report generation.

use medreport_core::{
    ReportGenerator, generate_batch, generate_batch_from, unknown_scopes,
};
use medreport_ingest::{SourceRow, read_rows_from_reader};
use medreport_model::{IssueKind, RenderIssue, ReportSection, Scope};
use medreport_rules::{RuleSet, default_locale_dir, load_language};

/// A rule document with `diagnosis`, `treatment` and `etiology` blocks.
/// Other sections render nothing.
fn inline_rules() -> RuleSet {
    let mut document = String::from("{");
    for section in ReportSection::ALL {
        let block = match section {
            ReportSection::Diagnosis => {
                r#"{"variants": [
                    {"condition": {"type": "VALUE", "scope": "diagnosis.stroke_type", "value": "ischemic"},
                     "text": "Cerebral Infarction"},
                    {"condition": {"type": "AND", "conditions": [
                        {"type": "VALUE", "scope": "diagnosis.stroke_type", "value": "ischemic"},
                        {"type": "EXISTENCE", "scope": "diagnosis.occlusion_position", "value": true}]},
                     "text": " due to occlusion of ${diagnosis.occlusion_position}"},
                    {"condition": {}, "text": ". "}
                ]}"#
            }
            ReportSection::Treatment => {
                r#"{"variants": [
                    {"condition": {"type": "EXISTENCE", "scope": "treatment.dio", "value": true},
                     "text": "Transferred after ${treatment.dio} minutes. "},
                    {"condition": {"type": "EXISTENCE", "scope": "treatment.not_a_field", "value": true},
                     "text": "never"}
                ]}"#
            }
            ReportSection::Etiology => r#"{"variants": [{"condition": {}, "text": "ETIO. "}]}"#,
            _ => r#"{"variants": []}"#,
        };
        document.push_str(&format!(r#""{}": {block},"#, section.as_str()));
    }
    document.push_str(
        r#""variables": {"occlusion_position": {"left_mca_m1": "left MCA", "ba": "basilar artery"}},
        "settings": {"date_format": "%m/%d/%Y", "time_format": "%H:%M"}}"#,
    );
    RuleSet::from_json_str("en_US", &document).unwrap()
}

fn bundled_rules() -> RuleSet {
    load_language(&default_locale_dir(), "en_US").unwrap()
}

#[test]
fn diagnosis_names_the_occlusion() {
    let rules = inline_rules();
    let row = SourceRow::new()
        .with("stroke_type", "ischemic")
        .with("imaging_type", "CT")
        .with("occlusion_left_mca_m1", true);
    let report = ReportGenerator::new(&rules).generate(&row);
    assert_eq!(
        report.section_text(ReportSection::Diagnosis),
        "Cerebral Infarction due to occlusion of left MCA. "
    );
}

#[test]
fn unresolved_scope_skips_only_its_variant() {
    let rules = inline_rules();
    let row = SourceRow::new().with("door_to_door", 95);
    let report = ReportGenerator::new(&rules).generate(&row);
    assert_eq!(
        report.section_text(ReportSection::Treatment),
        "Transferred after 95 minutes. "
    );
    assert_eq!(
        report.issues,
        vec![RenderIssue::unresolved_scope(
            ReportSection::Treatment,
            "treatment.not_a_field"
        )]
    );
}

#[test]
fn unknown_scopes_name_fields_no_section_builds() {
    assert_eq!(
        unknown_scopes(&inline_rules()),
        vec![(ReportSection::Treatment, Scope::new("treatment", "not_a_field"))]
    );
    let bundled = unknown_scopes(&bundled_rules());
    assert!(bundled.is_empty(), "{bundled:?}");
}

#[test]
fn transport_suppresses_follow_up_sections() {
    let rules = bundled_rules();
    let row = SourceRow::new()
        .with("subject_id", 2)
        .with("stroke_type", "ischemic")
        .with("door_to_door", 95)
        .with("post_treatment_imaging", "CT")
        .with("etiology_cardioembolism", true)
        .with("dysphagia_screening_done", "yes");
    let report = ReportGenerator::new(&rules).generate(&row);
    for section in [
        ReportSection::FollowUpImaging,
        ReportSection::PostAcuteCare,
        ReportSection::Etiology,
    ] {
        assert_eq!(report.section_text(section), "", "{section}");
    }
    assert!(report.issues.is_empty(), "{:?}", report.issues);
    assert!(report.section_text(ReportSection::Treatment).contains("door-in-door-out time of 95"));
}

#[test]
fn zero_door_to_door_still_suppresses_etiology() {
    let rules = inline_rules();
    let generator = ReportGenerator::new(&rules);
    let stayed = generator.generate(&SourceRow::new());
    assert_eq!(stayed.section_text(ReportSection::Etiology), "ETIO. ");
    let transferred = generator.generate(&SourceRow::new().with("door_to_door", 0));
    assert_eq!(transferred.section_text(ReportSection::Etiology), "");
}

#[test]
fn empty_row_renders_defaults_only() {
    let rules = bundled_rules();
    let report = ReportGenerator::new(&rules).generate(&SourceRow::new());
    assert!(report.issues.is_empty(), "{:?}", report.issues);
    assert_eq!(report.text(), "There were no post-stroke complications. ");
    assert_eq!(report.subject_id, None);
}

const REGISTRY: &str = "\
subject_id,patient_id,age,sex,stroke_type,aspects_score,imaging_type,imaging_timestamp,imaging_within_hour,occlusion_left_mca_m1,occlusion_right_mca_m2,risk_hypertension,risk_diabetes,before_onset_asa,onset_timestamp,nihss_score,hospitalized_in,prestroke_mrs,sys_blood_pressure,dia_blood_pressure,hospital_timestamp,arrival_mode,department_type,prenotification,thrombolysis,thrombectomy,door_to_needle,ivt_treatment,ivt_dose,door_to_groin,door_to_door,tici_score,post_treatment_imaging,post_treatment_infarction,afib_flutter,dysphagia_screening_done,swallowing_screening_type,physiotherapy_received,speech_therapy_received,post_stroke_pneumonia,etiology_large_artery,etiology_cardioembolism,discharge_date,discharge_destination,discharge_nihss_score,discharge_mrs,discharge_asa,discharge_statin
1,P-001,67,female,ischemic,9,CT,2023-03-14 09:20:00,true,true,false,true,true,true,2023-03-14 07:45:00,12,icu,0,160,90,2023-03-14 09:05:00,ems,neurology,true,true,true,25,alteplase,50.0,70,,2b,CT,true,detected,yes,guss,yes,yes,true,true,false,2023-03-24,home,3,1,true,true
2,P-002,81,male,ischemic,,,,,false,true,,,,,,,,,,,,,,false,true,,,,,95,,CT,,,yes,,,,true,false,true,,,,,,

3,P-003,55,x,transient ischemic,,,,,,,,,,,,,,,,,,,,,,,,,,,,,,,yes,bedside,,,,,,,,,,,
";

#[test]
fn registry_batch_renders_every_subject() {
    let rules = bundled_rules();
    let rows = read_rows_from_reader(REGISTRY.as_bytes()).unwrap();
    assert_eq!(rows.len(), 3);
    let batch = generate_batch(&rules, &rows);

    let first = &batch.reports[0];
    assert_eq!(first.subject_id, Some(1));
    insta::assert_snapshot!(first.paragraphs().collect::<Vec<_>>().join("\n"), @r"
    Cerebral Infarction due to occlusion of left MCA M1. CT imaging was performed at 09:20, within one hour of arrival, with an ASPECTS score of 9.
    The patient is a 67-year-old female. Known risk factors include hypertension, and diabetes. Before the onset of symptoms the patient was taking aspirin.
    Symptoms began on 03/14/2023 at 07:45.
    The patient arrived at the hospital at 09:05 by emergency medical services with prenotification. The patient was admitted to the intensive care unit of the neurology department. The NIHSS score on admission was 12. Blood pressure on admission was 160/90 mmHg.
    Intravenous thrombolysis with alteplase (50 mg) was administered with a door-to-needle time of 25 minutes. Mechanical thrombectomy was performed with a door-to-groin time of 70 minutes, achieving a TICI score of 2b (partial filling of more than half of the territory).
    Follow-up CT imaging showed an infarction.
    A swallowing screening was performed using the Gugging Swallowing Screen. During the hospital stay the patient received physiotherapy, and speech therapy. Atrial fibrillation or flutter was detected during monitoring.
    The hospital stay was complicated by pneumonia.
    The stroke was attributed to large artery atherosclerosis.
    The patient was discharged on 03/24/2023 home. The NIHSS score at discharge was 3. The mRS at discharge was 1. Discharge medication: aspirin, and a statin.
    ");

    let second = &batch.reports[1];
    insta::assert_snapshot!(second.paragraphs().collect::<Vec<_>>().join("\n"), @r"
    Cerebral Infarction due to occlusion of right MCA M2.
    The patient is a 81-year-old male.
    Mechanical thrombectomy was performed. The patient was transferred to another center for thrombectomy with a door-in-door-out time of 95 minutes.
    The hospital stay was complicated by pneumonia.
    ");

    assert_eq!(batch.records_with_issues(), vec![3]);
    let kinds: Vec<(usize, ReportSection, IssueKind)> = batch
        .issues
        .iter()
        .map(|(index, issue)| (*index, issue.section, issue.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (3, ReportSection::Patient, IssueKind::UnknownLabel),
            (3, ReportSection::PostAcuteCare, IssueKind::UnknownLabel),
        ]
    );
    assert_eq!(
        batch.reports[2].section_text(ReportSection::PostAcuteCare),
        "A swallowing screening was performed using . "
    );
}

#[test]
fn selected_record_keeps_its_file_index() {
    let rules = bundled_rules();
    let rows = read_rows_from_reader(REGISTRY.as_bytes()).unwrap();
    let batch = generate_batch_from(&rules, &rows[2..], 3);
    assert_eq!(batch.first_index, 3);
    assert_eq!(batch.records_with_issues(), vec![3]);
    assert_eq!(batch.report(3).and_then(|report| report.subject_id), Some(3));
    assert!(batch.report(1).is_none());
    let indices: Vec<usize> = batch.indexed_reports().map(|(index, _)| index).collect();
    assert_eq!(indices, vec![3]);
}

#[test]
fn rendering_is_repeatable() {
    let rules = bundled_rules();
    let rows = read_rows_from_reader(REGISTRY.as_bytes()).unwrap();
    let generator = ReportGenerator::new(&rules);
    for row in &rows {
        assert_eq!(generator.generate(row), generator.generate(row));
    }
}
