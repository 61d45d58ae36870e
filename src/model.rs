use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Quarter {
    #[serde(rename = "A")]
    Annual,
    #[serde(rename = "1C")]
    First,
    #[serde(rename = "2C")]
    Second,
}

impl Quarter {
    pub fn code(self) -> &'static str {
        match self {
            Quarter::Annual => "A",
            Quarter::First => "1C",
            Quarter::Second => "2C",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Branch {
    Campus,
    Medrano,
    AulaVirtual,
    #[serde(rename = "PIÑERO")]
    Pinero,
}

impl Branch {
    pub fn code(self) -> &'static str {
        match self {
            Branch::Campus => "CAMPUS",
            Branch::Medrano => "MEDRANO",
            Branch::AulaVirtual => "AULA_VIRTUAL",
            Branch::Pinero => "PIÑERO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Turn {
    Morning,
    Afternoon,
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub day: Day,
    pub turn: Turn,
    pub start_slot: u8,
    pub end_slot: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchedule {
    pub year: i32,
    pub quarter: Quarter,
    pub course_code: String,
    pub course_name: String,
    pub class_code: String,
    pub branch: Option<Branch>,
    /// `None` when the source marks the schedule as not yet defined.
    pub schedules: Option<Vec<ScheduleSlot>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoryKind {
    Signed,
    Passed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicHistoryEntry {
    pub course_code: String,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassedCourses {
    pub signed: BTreeSet<String>,
    pub passed: BTreeSet<String>,
}

impl PassedCourses {
    /// Every passed course counts as signed, whatever the source listed.
    pub fn from_entries(entries: &[AcademicHistoryEntry]) -> Self {
        let mut courses = PassedCourses::default();
        for entry in entries {
            courses.signed.insert(entry.course_code.clone());
            if entry.kind == HistoryKind::Passed {
                courses.passed.insert(entry.course_code.clone());
            }
        }
        courses
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SurveyKind {
    Docente,
    Auxiliar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyMetadata {
    pub survey_kind: SurveyKind,
    pub year: i32,
    pub quarter: Quarter,
    pub class_code: String,
    pub course_code: String,
    pub professor_name: String,
    pub professor_role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "UPPERCASE")]
pub enum AnswerValue {
    Text(Option<String>),
    Percentage(Option<i64>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurveyAnswer {
    pub question: String,
    #[serde(flatten)]
    pub value: AnswerValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TakenSurvey {
    pub survey: SurveyMetadata,
    pub answers: Vec<SurveyAnswer>,
}

/// Survey row as the adapters see it. `handle` locates the row's answers and
/// never leaves the adapter.
#[derive(Debug, Clone)]
pub(crate) struct SurveyRow<H> {
    pub metadata: SurveyMetadata,
    pub completed: bool,
    pub handle: H,
}

/// Everything one source yields, as printed or stored by the CLI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    pub student_id: String,
    pub start_year: i32,
    pub class_schedules: Vec<ClassSchedule>,
    pub passed_courses: PassedCourses,
    pub professor_classes: Vec<SurveyMetadata>,
    pub taken_surveys: Vec<TakenSurvey>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str, kind: HistoryKind) -> AcademicHistoryEntry {
        AcademicHistoryEntry {
            course_code: code.to_string(),
            kind,
            date: NaiveDate::from_ymd_opt(2021, 7, 1).unwrap(),
        }
    }

    #[test]
    fn signed_and_passed_same_course_dedupes() {
        let courses = PassedCourses::from_entries(&[
            entry("950701", HistoryKind::Signed),
            entry("950701", HistoryKind::Passed),
        ]);
        assert_eq!(courses.signed.len(), 1);
        assert!(courses.passed.contains("950701"));
    }

    #[test]
    fn passed_is_subset_of_signed() {
        let courses = PassedCourses::from_entries(&[
            entry("950701", HistoryKind::Passed),
            entry("950702", HistoryKind::Signed),
            entry("950702", HistoryKind::Signed),
            entry("950703", HistoryKind::Passed),
        ]);
        assert!(courses.passed.is_subset(&courses.signed));
        assert_eq!(courses.signed.len(), 3);
        assert_eq!(courses.passed.len(), 2);
    }

    #[test]
    fn answer_serializes_type_and_value() {
        let answer = SurveyAnswer {
            question: "Claridad".into(),
            value: AnswerValue::Percentage(Some(75)),
        };
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["type"], "PERCENTAGE");
        assert_eq!(json["value"], 75);

        let blank = SurveyAnswer {
            question: "Comentarios".into(),
            value: AnswerValue::Text(None),
        };
        let json = serde_json::to_value(&blank).unwrap();
        assert_eq!(json["type"], "TEXT");
        assert!(json["value"].is_null());
    }

    #[test]
    fn quarter_and_branch_codes() {
        assert_eq!(serde_json::to_value(Quarter::First).unwrap(), "1C");
        assert_eq!(serde_json::to_value(Branch::Pinero).unwrap(), "PIÑERO");
        assert_eq!(serde_json::to_value(Branch::AulaVirtual).unwrap(), "AULA_VIRTUAL");
        assert_eq!(Branch::AulaVirtual.code(), "AULA_VIRTUAL");
    }
}
