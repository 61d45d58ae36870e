//! Student data read from the documents the transcript system renders as PDF.
//! Each document arrives as rendered text, one fragment per line.

pub mod grammar;

use async_trait::async_trait;
use chrono::Datelike;
use futures::future::try_join_all;
use tracing::debug;

use self::grammar::{BranchField, HistoryRow};
use super::AcademicSource;
use crate::error::{Result, ScrapeError};
use crate::fetch::{Fetch, FetchCache};
use crate::model::{
    AcademicHistoryEntry, ClassSchedule, PassedCourses, SurveyAnswer, SurveyMetadata, SurveyRow,
    TakenSurvey,
};
use crate::parser::{schedule, text, Cursor};

pub const ENROLMENT_RECEIPT: &str = "/alumno/comprobante-inscripcion";
pub const RECORD_SHEET: &str = "/alumno/ficha";
pub const ACADEMIC_HISTORY: &str = "/alumno/historia-academica";
pub const SURVEY_RECEIPT: &str = "/alumno/encuestas";

const RECEIPT_HEADER: &[&str] = &["", "RECEIPT HEADER"];
const RECEIPT_COLUMNS: &[&str] = &[
    "Código", "Actividad", "Período", "Comisión", "Ubicación", "Aula", "Horario",
];
const RECEIPT_END: &str = "Firma y Sello Departamento";

const STUDENT_ID_LABEL: &str = "Legajo:";

const HISTORY_HEADER: &[&str] = &["", "HISTORIA ACADÉMICA"];
const HISTORY_COLUMNS: &[&str] = &["Fecha", "Código", "Actividad", "Tipo", "Nota"];
const HISTORY_END: &str = "Fin del listado";

const SURVEY_HEADER: &[&str] = &["", "ENCUESTAS"];
const SURVEY_COLUMNS: &[&str] = &[
    "Encuesta", "Período", "Comisión", "Código", "Docente", "Cargo", "Estado",
];
const SURVEY_END: &str = "Fin de encuestas";

const ANSWERS_HEADER: &[&str] = &["", "RESPUESTAS"];
const ANSWERS_END: &str = "Fin de respuestas";

pub struct TranscriptSource<F> {
    cache: FetchCache<F>,
}

impl<F: Fetch> TranscriptSource<F> {
    pub fn new(fetch: F) -> Self {
        Self {
            cache: FetchCache::new(fetch),
        }
    }

    async fn fragments(&self, path: &str) -> Result<Vec<String>> {
        let rendered = self.cache.get(path).await?;
        Ok(text::fragments(&rendered))
    }

    async fn history(&self) -> Result<Vec<AcademicHistoryEntry>> {
        parse_history(&self.fragments(ACADEMIC_HISTORY).await?)
    }

    async fn survey_rows(&self) -> Result<Vec<SurveyRow<usize>>> {
        parse_survey_rows(&self.fragments(SURVEY_RECEIPT).await?)
    }

    async fn answers(&self, handle: usize) -> Result<Vec<SurveyAnswer>> {
        let path = format!("{SURVEY_RECEIPT}/{handle}");
        parse_answers(&self.fragments(&path).await?)
    }
}

#[async_trait]
impl<F: Fetch> AcademicSource for TranscriptSource<F> {
    async fn start_year(&self) -> Result<i32> {
        let history = self.history().await?;
        history
            .iter()
            .map(|entry| entry.date)
            .min()
            .map(|date| date.year())
            .ok_or_else(|| ScrapeError::malformed("academic history", "no approved entries"))
    }

    async fn student_id(&self) -> Result<String> {
        parse_student_id(&self.fragments(RECORD_SHEET).await?)
    }

    async fn class_schedules(&self) -> Result<Vec<ClassSchedule>> {
        parse_class_schedules(&self.fragments(ENROLMENT_RECEIPT).await?)
    }

    async fn passed_courses(&self) -> Result<PassedCourses> {
        Ok(PassedCourses::from_entries(&self.history().await?))
    }

    async fn professor_classes_from_surveys(&self) -> Result<Vec<SurveyMetadata>> {
        let rows = self.survey_rows().await?;
        Ok(rows.into_iter().map(|row| row.metadata).collect())
    }

    async fn taken_surveys(&self) -> Result<Vec<TakenSurvey>> {
        let completed: Vec<_> = self
            .survey_rows()
            .await?
            .into_iter()
            .filter(|row| row.completed)
            .collect();
        let answers = try_join_all(completed.iter().map(|row| self.answers(row.handle))).await?;
        Ok(completed
            .into_iter()
            .zip(answers)
            .map(|(row, answers)| TakenSurvey {
                survey: row.metadata,
                answers,
            })
            .collect())
    }
}

/// Enrolment receipt: header, student line, column row, then one record per
/// class until the signature footer.
pub fn parse_class_schedules(tokens: &[String]) -> Result<Vec<ClassSchedule>> {
    let mut cursor = Cursor::new(tokens);
    cursor.expect(RECEIPT_HEADER)?;
    let (student_id, _name) = cursor.consume_with("student", grammar::student)?;
    cursor.expect(RECEIPT_COLUMNS)?;

    let mut classes = Vec::new();
    while !cursor.is_at(RECEIPT_END) {
        if cursor.peek().is_none() {
            return Err(ScrapeError::malformed("enrolment receipt", "missing footer"));
        }
        classes.push(parse_class(&mut cursor)?);
    }
    debug!(student = %student_id, classes = classes.len(), "parsed enrolment receipt");
    Ok(classes)
}

fn parse_class(cursor: &mut Cursor) -> Result<ClassSchedule> {
    let course_code = cursor.consume_with("course code", grammar::course_code)?;

    // Long names wrap onto one extra fragment.
    let mut course_name = cursor.consume()?.to_string();
    let token = cursor.consume()?;
    let (year, quarter) = match grammar::period(token) {
        Some(period) => period,
        None => {
            course_name = format!("{course_name} {token}");
            cursor.consume_with("period", grammar::period)?
        }
    };

    let class_code = cursor.consume_with("class code", grammar::class_code)?;
    let branch = match cursor.consume_with("branch", grammar::branch)? {
        BranchField::Known(branch) => branch,
        BranchField::Continued(branch) => {
            cursor.consume()?;
            branch
        }
    };
    let _room = cursor.consume()?;
    let schedules = schedule::decode(cursor.consume()?)?;

    Ok(ClassSchedule {
        year,
        quarter,
        course_code,
        course_name,
        class_code,
        branch,
        schedules,
    })
}

/// Record sheet: the student id is the fragment after the `Legajo:` label.
pub fn parse_student_id(tokens: &[String]) -> Result<String> {
    let label = tokens
        .iter()
        .position(|t| t == STUDENT_ID_LABEL)
        .ok_or_else(|| ScrapeError::malformed("record sheet", "no student id label"))?;
    let mut cursor = Cursor::new(&tokens[label + 1..]);
    cursor
        .consume_with("student id", grammar::student_id)
        .map_err(|err| match err {
            ScrapeError::UnexpectedToken { .. } => {
                ScrapeError::malformed("student id", "missing after label")
            }
            other => other,
        })
}

/// Academic history with failed and absent outcomes left out.
pub fn parse_history(tokens: &[String]) -> Result<Vec<AcademicHistoryEntry>> {
    let mut cursor = Cursor::new(tokens);
    cursor.expect(HISTORY_HEADER)?;
    cursor.expect(HISTORY_COLUMNS)?;

    let mut entries = Vec::new();
    let mut rows = 0usize;
    while !cursor.is_at(HISTORY_END) {
        let HistoryRow { entry, approved } = cursor.consume_with("history row", grammar::history_row)?;
        rows += 1;
        if approved {
            entries.push(entry);
        }
    }
    debug!(rows, approved = entries.len(), "parsed academic history");
    Ok(entries)
}

pub(crate) fn parse_survey_rows(tokens: &[String]) -> Result<Vec<SurveyRow<usize>>> {
    let mut cursor = Cursor::new(tokens);
    cursor.expect(SURVEY_HEADER)?;
    cursor.expect(SURVEY_COLUMNS)?;

    let mut rows = Vec::new();
    while !cursor.is_at(SURVEY_END) {
        let survey_kind = cursor.consume_with("survey kind", grammar::survey_kind)?;
        let (year, quarter) = cursor.consume_with("period", grammar::period)?;
        let class_code = cursor.consume_with("class code", grammar::class_code)?;
        let course_code = cursor.consume_with("course code", grammar::course_code)?;
        let professor_name = cursor.consume()?.to_string();
        let professor_role = cursor.consume()?.to_string();
        let completed = cursor.consume_with("survey status", grammar::survey_status)?;
        let handle = rows.len() + 1;

        rows.push(SurveyRow {
            metadata: SurveyMetadata {
                survey_kind,
                year,
                quarter,
                class_code,
                course_code,
                professor_name,
                professor_role,
            },
            completed,
            handle,
        });
    }
    Ok(rows)
}

pub fn parse_answers(tokens: &[String]) -> Result<Vec<SurveyAnswer>> {
    let mut cursor = Cursor::new(tokens);
    cursor.expect(ANSWERS_HEADER)?;

    let mut answers = Vec::new();
    while !cursor.is_at(ANSWERS_END) {
        let question = cursor.consume()?.to_string();
        let value = grammar::answer(cursor.consume()?);
        answers.push(SurveyAnswer { question, value });
    }
    Ok(answers)
}
