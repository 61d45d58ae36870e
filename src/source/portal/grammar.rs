//! Field grammars of the portal's table cells.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::model::{Branch, Quarter, SurveyKind};

static PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Anual|1er Cuatrimestre|2do Cuatrimestre) (\d{4})$").unwrap()
});
static COURSE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{6}$").unwrap());
static GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^Encuesta (Docente|Auxiliar) - (Anual|1er Cuatrimestre|2do Cuatrimestre) (\d{4}) - (\S+) - (\d{6})$",
    )
    .unwrap()
});
static HANDLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"verRespuestas\(\s*'([^']*)'\s*,\s*'([^']*)'\s*,\s*'([^']*)'\s*,\s*'([^']*)'\s*,\s*'([^']*)'\s*\)")
        .unwrap()
});

/// Enrolment states shown instead of a class code or schedule. Rows carrying
/// one have no definitive class yet.
pub const PENDING_ROW_MARKERS: &[&str] = &["Rechazada", "Aceptada", "Pendiente"];

/// Heading of one survey group: everything but the professor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyGroup {
    pub kind: SurveyKind,
    pub year: i32,
    pub quarter: Quarter,
    pub class_code: String,
    pub course_code: String,
}

/// The five arguments of a survey's "view answers" action, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyHandle {
    pub survey: String,
    pub professor: String,
    pub class: String,
    pub year: String,
    pub period: String,
}

impl SurveyHandle {
    pub fn query(&self) -> String {
        format!(
            "encuesta={}&docente={}&comision={}&anio={}&periodo={}",
            self.survey, self.professor, self.class, self.year, self.period
        )
    }
}

fn quarter(label: &str) -> Option<Quarter> {
    match label {
        "Anual" => Some(Quarter::Annual),
        "1er Cuatrimestre" => Some(Quarter::First),
        "2do Cuatrimestre" => Some(Quarter::Second),
        _ => None,
    }
}

/// `"1er Cuatrimestre 2021"` → (2021, 1C).
pub fn period(text: &str) -> Option<(i32, Quarter)> {
    let caps = PERIOD_RE.captures(text)?;
    Some((caps[2].parse().ok()?, quarter(&caps[1])?))
}

pub fn course_code(text: &str) -> Option<String> {
    COURSE_CODE_RE.is_match(text).then(|| text.to_string())
}

pub fn class_code(text: &str) -> Option<String> {
    let code = text.trim().to_uppercase();
    (!code.is_empty() && !code.contains(' ')).then_some(code)
}

/// `Some(None)` is a known "no branch yet" value.
pub fn branch(text: &str) -> Option<Option<Branch>> {
    match text {
        "Campus" => Some(Some(Branch::Campus)),
        "Medrano" => Some(Some(Branch::Medrano)),
        "Aula Virtual" => Some(Some(Branch::AulaVirtual)),
        "Piñero" => Some(Some(Branch::Pinero)),
        "" | "Sin asignar" => Some(None),
        _ => None,
    }
}

pub fn date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%d/%m/%Y").ok()
}

pub fn survey_group(label: &str) -> Option<SurveyGroup> {
    let caps = GROUP_RE.captures(label)?;
    let kind = match &caps[1] {
        "Docente" => SurveyKind::Docente,
        _ => SurveyKind::Auxiliar,
    };
    Some(SurveyGroup {
        kind,
        quarter: quarter(&caps[2])?,
        year: caps[3].parse().ok()?,
        class_code: caps[4].to_string(),
        course_code: caps[5].to_string(),
    })
}

pub fn survey_handle(onclick: &str) -> Option<SurveyHandle> {
    let caps = HANDLE_RE.captures(onclick)?;
    Some(SurveyHandle {
        survey: caps[1].to_string(),
        professor: caps[2].to_string(),
        class: caps[3].to_string(),
        year: caps[4].to_string(),
        period: caps[5].to_string(),
    })
}
