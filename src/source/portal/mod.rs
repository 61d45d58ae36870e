//! Student data scraped from the HTML pages of the student portal.

pub mod grammar;

use async_trait::async_trait;
use chrono::Datelike;
use futures::future::try_join_all;
use tracing::debug;

use self::grammar::{SurveyGroup, SurveyHandle, PENDING_ROW_MARKERS};
use super::AcademicSource;
use crate::error::{Result, ScrapeError};
use crate::fetch::{Fetch, FetchCache};
use crate::model::{
    AcademicHistoryEntry, ClassSchedule, HistoryKind, PassedCourses, SurveyAnswer,
    SurveyMetadata, SurveyRow, TakenSurvey,
};
use crate::parser::html::{self, Element};
use crate::parser::{schedule, survey};

pub const CLASSES_PAGE: &str = "/alumno/cursadas";
pub const HISTORY_PAGE: &str = "/alumno/historia";
pub const PROFILE_PAGE: &str = "/alumno/perfil";
pub const SURVEYS_PAGE: &str = "/alumno/encuestas";
pub const ANSWERS_PAGE: &str = "/alumno/encuestas/respuestas";

/// Shown by the portal in place of any page once the login has lapsed.
pub const SESSION_EXPIRED_TEXT: &str = "Su sesión ha expirado";

const COMPLETED_MARKER: &str = "Completada";
const ANSWERS_TABLE_CLASS: &str = "respuestas";
const APPROVED: &str = "Aprobado";

pub struct PortalSource<F> {
    cache: FetchCache<F>,
}

impl<F: Fetch> PortalSource<F> {
    pub fn new(fetch: F) -> Self {
        Self {
            cache: FetchCache::new(fetch),
        }
    }

    async fn history(&self) -> Result<Vec<AcademicHistoryEntry>> {
        parse_history(&self.cache.get(HISTORY_PAGE).await?)
    }

    async fn survey_rows(&self) -> Result<Vec<SurveyRow<Option<SurveyHandle>>>> {
        parse_survey_rows(&self.cache.get(SURVEYS_PAGE).await?)
    }

    async fn answers(&self, handle: &SurveyHandle) -> Result<Vec<SurveyAnswer>> {
        let path = format!("{}?{}", ANSWERS_PAGE, handle.query());
        parse_answers(&self.cache.get(&path).await?)
    }
}

#[async_trait]
impl<F: Fetch> AcademicSource for PortalSource<F> {
    async fn start_year(&self) -> Result<i32> {
        self.history()
            .await?
            .iter()
            .map(|entry| entry.date.year())
            .min()
            .ok_or_else(|| ScrapeError::malformed("history table", "no approved rows"))
    }

    async fn student_id(&self) -> Result<String> {
        parse_student_id(&self.cache.get(PROFILE_PAGE).await?)
    }

    async fn class_schedules(&self) -> Result<Vec<ClassSchedule>> {
        parse_class_schedules(&self.cache.get(CLASSES_PAGE).await?)
    }

    async fn passed_courses(&self) -> Result<PassedCourses> {
        Ok(PassedCourses::from_entries(&self.history().await?))
    }

    async fn professor_classes_from_surveys(&self) -> Result<Vec<SurveyMetadata>> {
        let rows = self.survey_rows().await?;
        Ok(rows.into_iter().map(|row| row.metadata).collect())
    }

    async fn taken_surveys(&self) -> Result<Vec<TakenSurvey>> {
        let completed = completed_with_handles(self.survey_rows().await?)?;
        let answers =
            try_join_all(completed.iter().map(|(_, handle)| self.answers(handle))).await?;
        Ok(completed
            .into_iter()
            .zip(answers)
            .map(|((survey, _), answers)| TakenSurvey { survey, answers })
            .collect())
    }
}

/// A page lacks what it must contain: either the session lapsed and the
/// portal served its login notice, or the layout changed.
fn missing(page: &str, what: &str) -> ScrapeError {
    if html::decode_entities(page).contains(SESSION_EXPIRED_TEXT) {
        ScrapeError::SessionExpired
    } else {
        ScrapeError::malformed(what, "not found")
    }
}

fn table<'a>(page: &'a str, id: &str) -> Result<Element<'a>> {
    html::find_by_attr(page, "table", "id", id).ok_or_else(|| missing(page, id))
}

/// Data rows of a table, header row excluded.
fn data_rows<'a>(table: &Element<'a>) -> Vec<Element<'a>> {
    table.children("tr").into_iter().skip(1).collect()
}

fn cells<'a>(row: &Element<'a>, at_least: usize, what: &str) -> Result<Vec<Element<'a>>> {
    let cells = row.children("td");
    if cells.len() < at_least {
        return Err(ScrapeError::malformed(what, html::text(row.inner)));
    }
    Ok(cells)
}

fn field<T>(what: &str, text: String, parse: impl FnOnce(&str) -> Option<T>) -> Result<T> {
    parse(&text).ok_or_else(|| ScrapeError::malformed(what, text))
}

/// Completed rows paired with the handle of their answers page. A completed
/// row without one fails the whole call.
fn completed_with_handles(
    rows: Vec<SurveyRow<Option<SurveyHandle>>>,
) -> Result<Vec<(SurveyMetadata, SurveyHandle)>> {
    rows.into_iter()
        .filter(|row| row.completed)
        .map(|row| match row.handle {
            Some(handle) => Ok((row.metadata, handle)),
            None => Err(ScrapeError::malformed(
                "survey answers link",
                row.metadata.professor_name,
            )),
        })
        .collect()
}

pub fn parse_student_id(page: &str) -> Result<String> {
    let id = html::find_by_attr(page, "span", "id", "legajo")
        .map(|span| span.text())
        .unwrap_or_default();
    if id.is_empty() {
        return Err(missing(page, "student id"));
    }
    Ok(id)
}

pub fn parse_class_schedules(page: &str) -> Result<Vec<ClassSchedule>> {
    let table = table(page, "cursadas")?;
    let mut classes = Vec::new();

    for row in data_rows(&table) {
        let cells = cells(&row, 5, "class row")?;
        let class_text = cells[0].text();
        let schedule_text = cells[4].text();
        if PENDING_ROW_MARKERS.contains(&class_text.as_str())
            || PENDING_ROW_MARKERS.contains(&schedule_text.as_str())
        {
            continue;
        }

        let course_name = cells[1].leading_text();
        let period_text = cells[1]
            .children("span")
            .into_iter()
            .find(|span| span.has_class("periodo"))
            .map(|span| span.text())
            .ok_or_else(|| ScrapeError::malformed("class period", cells[1].text()))?;
        let (year, quarter) = field("class period", period_text, grammar::period)?;

        classes.push(ClassSchedule {
            year,
            quarter,
            course_code: field("course code", cells[3].text(), grammar::course_code)?,
            course_name,
            class_code: field("class code", class_text, grammar::class_code)?,
            branch: field("branch", cells[2].text(), grammar::branch)?,
            schedules: schedule::decode(&schedule_text)?,
        });
    }
    debug!(classes = classes.len(), "parsed class table");
    Ok(classes)
}

/// Approved `Final` rows become passed entries and approved `Cursada` rows
/// signed ones. Everything else in the table is ignored.
pub fn parse_history(page: &str) -> Result<Vec<AcademicHistoryEntry>> {
    let table = table(page, "historia")?;
    let mut entries = Vec::new();

    for row in data_rows(&table) {
        let cells = cells(&row, 6, "history row")?;
        if cells[5].text() != APPROVED {
            continue;
        }
        let kind = match cells[3].text().as_str() {
            "Final" => HistoryKind::Passed,
            "Cursada" => HistoryKind::Signed,
            _ => continue,
        };
        entries.push(AcademicHistoryEntry {
            course_code: field("course code", cells[1].text(), grammar::course_code)?,
            kind,
            date: field("history date", cells[0].text(), grammar::date)?,
        });
    }
    debug!(approved = entries.len(), "parsed history table");
    Ok(entries)
}

pub(crate) fn parse_survey_rows(page: &str) -> Result<Vec<SurveyRow<Option<SurveyHandle>>>> {
    let table = table(page, "encuestas")?;
    let mut group: Option<SurveyGroup> = None;
    let mut rows = Vec::new();

    for row in table.children("tr") {
        if row.has_class("grupo") {
            group = Some(field("survey group", row.text(), grammar::survey_group)?);
            continue;
        }
        if !row.has_class("docente") {
            continue;
        }
        let current = group
            .as_ref()
            .ok_or_else(|| ScrapeError::malformed("survey row outside group", row.text()))?;
        let cells = cells(&row, 3, "survey row")?;
        let completed = cells[2].inner.contains(COMPLETED_MARKER);

        let handle = if completed {
            let onclick = cells
                .get(3)
                .and_then(|cell| {
                    cell.children("a")
                        .into_iter()
                        .chain(cell.children("button"))
                        .find_map(|el| el.attr("onclick"))
                })
                .unwrap_or_default();
            Some(field("survey answers link", onclick, grammar::survey_handle)?)
        } else {
            None
        };

        rows.push(SurveyRow {
            metadata: SurveyMetadata {
                survey_kind: current.kind,
                year: current.year,
                quarter: current.quarter,
                class_code: current.class_code.clone(),
                course_code: current.course_code.clone(),
                professor_name: cells[0].text(),
                professor_role: cells[1].text(),
            },
            completed,
            handle,
        });
    }
    debug!(rows = rows.len(), "parsed survey table");
    Ok(rows)
}

/// Answers page of one survey. The answers table must be there before its
/// rows are read, so a login notice never passes for an empty survey.
pub fn parse_answers(page: &str) -> Result<Vec<SurveyAnswer>> {
    let table = html::elements(page, "table")
        .into_iter()
        .find(|table| table.has_class(ANSWERS_TABLE_CLASS))
        .ok_or_else(|| missing(page, ANSWERS_TABLE_CLASS))?;
    survey::parse_answers(table.inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Branch, Day, Quarter, SurveyKind};

    const CLASSES: &str = r#"
        <table id="cursadas">
          <tr><th>Comisión</th><th>Actividad</th><th>Sede</th><th>Código</th><th>Horario</th></tr>
          <tr><td>Z1154</td><td>Física I <span class="periodo">1er Cuatrimestre 2021</span></td>
              <td>Campus</td><td>950701</td><td>Lu(n)1:5 Mi(n)0:2</td></tr>
          <tr><td>Rechazada</td><td>Química <span class="periodo">Anual 2021</span></td>
              <td>Medrano</td><td>950703</td><td>Ma(m)0:3</td></tr>
          <tr><td>K2051</td><td>Inglés I <span class="periodo">Anual 2021</span></td>
              <td>Aula Virtual</td><td>950704</td><td>Aceptada</td></tr>
          <tr><td>k1001</td><td>Sistemas y Organizaciones <span class="periodo">Anual 2021</span></td>
              <td>Sin asignar</td><td>950705</td><td>Sin definir</td></tr>
        </table>"#;

    #[test]
    fn class_table() {
        let classes = parse_class_schedules(CLASSES).unwrap();
        assert_eq!(classes.len(), 2);

        let fisica = &classes[0];
        assert_eq!(fisica.course_name, "Física I");
        assert_eq!(fisica.year, 2021);
        assert_eq!(fisica.quarter, Quarter::First);
        assert_eq!(fisica.branch, Some(Branch::Campus));
        assert_eq!(fisica.schedules.as_ref().unwrap()[1].day, Day::Wed);

        let sistemas = &classes[1];
        assert_eq!(sistemas.class_code, "K1001");
        assert_eq!(sistemas.branch, None);
        assert_eq!(sistemas.schedules, None);
    }

    #[test]
    fn class_row_without_period_is_malformed() {
        let page = r#"<table id="cursadas"><tr><th>h</th></tr>
            <tr><td>Z1154</td><td>Física I</td><td>Campus</td><td>950701</td><td>Lu(n)1:5</td></tr></table>"#;
        let err = parse_class_schedules(page).unwrap_err();
        assert_eq!(err, ScrapeError::malformed("class period", "Física I"));
    }

    #[test]
    fn short_row_is_malformed() {
        let page = r#"<table id="cursadas"><tr><th>h</th></tr><tr><td>Z1154</td></tr></table>"#;
        assert!(parse_class_schedules(page).unwrap_err().is_malformed());
    }

    #[test]
    fn history_table() {
        let page = r#"<table id="historia">
          <tr><th>Fecha</th><th>Código</th><th>Actividad</th><th>Tipo</th><th>Nota</th><th>Estado</th></tr>
          <tr><td>05/03/2019</td><td>950701</td><td>Física I</td><td>Cursada</td><td>-</td><td>Aprobado</td></tr>
          <tr><td>20/07/2020</td><td>950701</td><td>Física I</td><td>Final</td><td>8</td><td>Aprobado</td></tr>
          <tr><td>20/07/2020</td><td>950702</td><td>Química</td><td>Final</td><td>2</td><td>Desaprobado</td></tr>
          <tr><td>01/12/2018</td><td>950703</td><td>Inglés</td><td>Equivalencia</td><td>-</td><td>Aprobado</td></tr>
        </table>"#;
        let history = parse_history(page).unwrap();
        assert_eq!(history.len(), 2);
        let courses = PassedCourses::from_entries(&history);
        assert_eq!(courses.signed.len(), 1);
        assert_eq!(courses.passed.len(), 1);
        assert!(courses.passed.is_subset(&courses.signed));
        assert_eq!(history.iter().map(|e| e.date.year()).min(), Some(2019));
    }

    #[test]
    fn student_id_span() {
        let page = r#"<div class="perfil"><span id="legajo"> 123.456-7 </span></div>"#;
        assert_eq!(parse_student_id(page).unwrap(), "123.456-7");
    }

    #[test]
    fn empty_student_id_on_expired_session() {
        let page = r#"<div class="login"><p>Su sesi&oacute;n ha expirado. Ingrese nuevamente.</p>
            <span id="legajo"></span></div>"#;
        assert_eq!(parse_student_id(page).unwrap_err(), ScrapeError::SessionExpired);
    }

    #[test]
    fn empty_student_id_otherwise_malformed() {
        let page = r#"<div><span id="legajo"></span></div>"#;
        let err = parse_student_id(page).unwrap_err();
        assert!(err.is_malformed());
    }

    const SURVEYS: &str = r##"
        <table id="encuestas">
          <tr class="grupo"><td colspan="4">Encuesta Docente - 1er Cuatrimestre 2021 - Z1154 - 950701</td></tr>
          <tr class="docente"><td>Pérez, Juan</td><td>Titular</td><td><img alt="Completada"> Completada</td>
              <td><a href="#" onclick="verRespuestas('31','8812','Z1154','2021','1')">Ver</a></td></tr>
          <tr class="docente"><td>Gómez, Ana</td><td>Adjunta</td><td>Pendiente</td><td></td></tr>
          <tr class="grupo"><td colspan="4">Encuesta Auxiliar - Anual 2021 - K2051 - 950704</td></tr>
          <tr class="docente"><td>Ruiz, Leo</td><td>Ayudante</td><td>Pendiente</td><td></td></tr>
        </table>"##;

    #[test]
    fn survey_groups_and_rows() {
        let rows = parse_survey_rows(SURVEYS).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].completed);
        assert_eq!(rows[0].handle.as_ref().unwrap().survey, "31");
        assert_eq!(rows[0].metadata.professor_name, "Pérez, Juan");
        assert!(!rows[1].completed);
        assert!(rows[1].handle.is_none());
        assert_eq!(rows[2].metadata.survey_kind, SurveyKind::Auxiliar);
        assert_eq!(rows[2].metadata.quarter, Quarter::Annual);
        assert_eq!(rows[2].metadata.class_code, "K2051");
    }

    #[test]
    fn professor_before_group_is_malformed() {
        let page = r#"<table id="encuestas">
          <tr class="docente"><td>Pérez, Juan</td><td>Titular</td><td>Pendiente</td></tr></table>"#;
        assert!(parse_survey_rows(page).unwrap_err().is_malformed());
    }

    #[test]
    fn completed_row_without_link_is_malformed() {
        let page = r#"<table id="encuestas">
          <tr class="grupo"><td>Encuesta Docente - 1er Cuatrimestre 2021 - Z1154 - 950701</td></tr>
          <tr class="docente"><td>Pérez, Juan</td><td>Titular</td><td>Completada</td><td></td></tr></table>"#;
        assert_eq!(
            parse_survey_rows(page).unwrap_err(),
            ScrapeError::malformed("survey answers link", "")
        );
    }

    #[test]
    fn completed_row_needs_a_handle() {
        let mut rows = parse_survey_rows(SURVEYS).unwrap();
        let paired = completed_with_handles(rows.clone()).unwrap();
        assert_eq!(paired.len(), 1);
        assert_eq!(paired[0].1.professor, "8812");

        rows[0].handle = None;
        assert_eq!(
            completed_with_handles(rows).unwrap_err(),
            ScrapeError::malformed("survey answers link", "Pérez, Juan")
        );
    }

    #[test]
    fn answers_page_needs_its_table() {
        let page = r#"<table class="respuestas"><tr class="pregunta"><td>Claridad</td>
            <td><select><option>0%</option><option>50%</option><option selected>75</option></select></td></tr></table>"#;
        let answers = parse_answers(page).unwrap();
        assert_eq!(answers[0].value, crate::model::AnswerValue::Percentage(Some(75)));

        let login = "<html><body><p>Su sesi&oacute;n ha expirado</p></body></html>";
        assert_eq!(parse_answers(login).unwrap_err(), ScrapeError::SessionExpired);
        assert_eq!(
            parse_answers("<html>mantenimiento</html>").unwrap_err(),
            ScrapeError::malformed("respuestas", "not found")
        );
    }

    #[test]
    fn missing_table_on_login_page_is_session_expiry() {
        let page = "<html><body><p>Su sesión ha expirado</p></body></html>";
        assert_eq!(parse_class_schedules(page).unwrap_err(), ScrapeError::SessionExpired);
        assert_eq!(parse_history(page).unwrap_err(), ScrapeError::SessionExpired);
        assert!(parse_class_schedules("<html></html>").unwrap_err().is_malformed());
    }
}
