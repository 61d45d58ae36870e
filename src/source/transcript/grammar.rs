//! Field grammars of the rendered transcript documents. One function per
//! field; `None` means the token is not a valid value for that field.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::model::{
    AcademicHistoryEntry, AnswerValue, Branch, HistoryKind, Quarter, SurveyKind,
};
use crate::parser::text::group_thousands;

static STUDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3}(?:\.\d{3})*-\d)\s+(\S.*)$").unwrap());
static COURSE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{6}$").unwrap());
static PERIOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(1)er Cuat|(2)do Cuat|Anual) (\d{4})$").unwrap());
static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,3})%$").unwrap());

/// History row status keyword → entry kind.
const STATUS_KINDS: &[(&str, HistoryKind)] = &[
    ("Regularidad", HistoryKind::Signed),
    ("Examen", HistoryKind::Passed),
    ("Promoción", HistoryKind::Passed),
];

/// Grade pattern → whether it is an approved outcome.
const GRADE_OUTCOMES: &[(&str, bool)] = &[
    (r"Aprobad[oa]", true),
    (r"Promocionad[oa]", true),
    (r"(?:[6-9]|10) \([a-z]+\)", true),
    (r"Desaprobad[oa]", false),
    (r"Ausente", false),
    (r"Libre", false),
    (r"[1-5] \([a-z]+\)", false),
];

static HISTORY_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    let statuses = STATUS_KINDS
        .iter()
        .map(|(keyword, _)| regex::escape(keyword))
        .collect::<Vec<_>>()
        .join("|");
    let grades = GRADE_OUTCOMES
        .iter()
        .enumerate()
        .map(|(i, (pattern, _))| format!("(?P<g{i}>{pattern})"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"^(?P<date>\d{{2}}/\d{{2}}/\d{{4}}) (?P<code>\d{{6}}) (?P<name>.+?) (?P<status>{statuses}) (?:{grades})$"
    ))
    .unwrap()
});

/// One history line, approved or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub entry: AcademicHistoryEntry,
    pub approved: bool,
}

/// Branch column as rendered. `Escuela` wraps onto a second fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchField {
    Known(Option<Branch>),
    Continued(Option<Branch>),
}

/// `"12.345-6 Jane Doe"` → (`"12.345-6"`, `"Jane Doe"`).
pub fn student(token: &str) -> Option<(String, String)> {
    let caps = STUDENT_RE.captures(token)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

pub fn course_code(token: &str) -> Option<String> {
    COURSE_CODE_RE.is_match(token).then(|| token.to_string())
}

/// `"1er Cuat 2021"`, `"2do Cuat 2021"` or `"Anual 2021"`.
pub fn period(token: &str) -> Option<(i32, Quarter)> {
    let caps = PERIOD_RE.captures(token)?;
    let quarter = if caps.get(1).is_some() {
        Quarter::First
    } else if caps.get(2).is_some() {
        Quarter::Second
    } else {
        Quarter::Annual
    };
    Some((caps[3].parse().ok()?, quarter))
}

pub fn class_code(token: &str) -> Option<String> {
    let code = token.trim().to_uppercase();
    (!code.is_empty() && !code.contains(' ')).then_some(code)
}

pub fn branch(token: &str) -> Option<BranchField> {
    let key = token.trim().to_uppercase().replace(' ', "_");
    let field = match key.as_str() {
        "CAMPUS" => BranchField::Known(Some(Branch::Campus)),
        "MEDRANO" => BranchField::Known(Some(Branch::Medrano)),
        "AULA_VIRTUAL" | "VIRTUAL" => BranchField::Known(Some(Branch::AulaVirtual)),
        "PIÑERO" | "PIÑEYRO" => BranchField::Known(Some(Branch::Pinero)),
        "SIN_ASIGNAR" => BranchField::Known(None),
        "ESCUELA" => BranchField::Continued(Some(Branch::Campus)),
        _ => return None,
    };
    Some(field)
}

/// Raw legajo digits → grouped id with check digit: `"1234567"` → `"123.456-7"`.
pub fn student_id(token: &str) -> Option<String> {
    let digits = token.trim();
    if digits.len() < 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (number, check) = digits.split_at(digits.len() - 1);
    Some(format!("{}-{}", group_thousands(number), check))
}

pub fn history_row(line: &str) -> Option<HistoryRow> {
    let caps = HISTORY_ROW_RE.captures(line)?;
    let date = NaiveDate::parse_from_str(&caps["date"], "%d/%m/%Y").ok()?;
    let kind = STATUS_KINDS
        .iter()
        .find(|(keyword, _)| *keyword == &caps["status"])
        .map(|(_, kind)| *kind)?;
    let approved = GRADE_OUTCOMES
        .iter()
        .enumerate()
        .find(|(i, _)| caps.name(&format!("g{i}")).is_some())
        .map(|(_, (_, approved))| *approved)?;

    Some(HistoryRow {
        entry: AcademicHistoryEntry {
            course_code: caps["code"].to_string(),
            kind,
            date,
        },
        approved,
    })
}

pub fn survey_kind(token: &str) -> Option<SurveyKind> {
    match token {
        "Docente" => Some(SurveyKind::Docente),
        "Auxiliar" => Some(SurveyKind::Auxiliar),
        _ => None,
    }
}

/// `Some(true)` when the survey was completed.
pub fn survey_status(token: &str) -> Option<bool> {
    match token {
        "Completada" => Some(true),
        "Pendiente" => Some(false),
        _ => None,
    }
}

pub fn answer(token: &str) -> AnswerValue {
    if let Some(caps) = PERCENT_RE.captures(token) {
        return AnswerValue::Percentage(caps[1].parse().ok());
    }
    match token {
        "" | "No opina" => AnswerValue::Text(None),
        text => AnswerValue::Text(Some(text.to_string())),
    }
}
