use tracing::debug;

use super::html::{self, Element};
use crate::error::{Result, ScrapeError};
use crate::model::{AnswerValue, SurveyAnswer};

/// Label the portal uses for the "no opinion" choice of free-text questions.
pub const NO_OPINION: &str = "No opina";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Percentage,
}

/// Infer a question's field type from the label of its second option.
/// The selected option says nothing about the scale, the second one does.
pub fn field_type(question: &str, second_option: &str) -> Result<FieldType> {
    if second_option == NO_OPINION {
        Ok(FieldType::Text)
    } else if second_option.ends_with('%') {
        Ok(FieldType::Percentage)
    } else {
        Err(ScrapeError::UnsupportedSchema {
            question: question.to_string(),
            option: second_option.to_string(),
        })
    }
}

/// Parse every answered question on an answers page, in page order.
pub fn parse_answers(page: &str) -> Result<Vec<SurveyAnswer>> {
    let rows: Vec<Element> = html::elements(page, "tr")
        .into_iter()
        .filter(|row| row.has_class("pregunta"))
        .collect();

    let mut answers = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(answer) = parse_answer_row(row)? {
            answers.push(answer);
        }
    }
    debug!(questions = rows.len(), answered = answers.len(), "parsed survey answers");
    Ok(answers)
}

/// `None` when nothing was selected: unanswered questions are not reported.
fn parse_answer_row(row: &Element) -> Result<Option<SurveyAnswer>> {
    let question = row
        .first("td")
        .map(|cell| cell.text())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ScrapeError::malformed("survey question", row.inner))?;

    let options = row.children("option");
    let Some(selected) = options.iter().find(|o| o.has_attr("selected")) else {
        return Ok(None);
    };
    let raw = selected.text();

    let second = options.get(1).map(|o| o.text()).ok_or_else(|| {
        ScrapeError::UnsupportedSchema {
            question: question.clone(),
            option: String::new(),
        }
    })?;

    let value = match field_type(&question, &second)? {
        FieldType::Text => AnswerValue::Text(free_text(row)),
        FieldType::Percentage => AnswerValue::Percentage(raw.trim_end_matches('%').parse().ok()),
    };
    Ok(Some(SurveyAnswer { question, value }))
}

/// Content of the comment box next to a text question, if any was written.
fn free_text(row: &Element) -> Option<String> {
    let written = match row.first("textarea") {
        Some(area) => area.text(),
        None => html::void_elements(row.inner, "input")
            .into_iter()
            .find(|input| input.attr("type").as_deref() == Some("text"))
            .and_then(|input| input.attr("value"))
            .map(|v| html::text(&v))
            .unwrap_or_default(),
    };
    (!written.is_empty()).then_some(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(question: &str, options: &[(&str, bool)], extra: &str) -> String {
        let opts: String = options
            .iter()
            .map(|(label, sel)| {
                if *sel {
                    format!("<option selected>{label}</option>")
                } else {
                    format!("<option>{label}</option>")
                }
            })
            .collect();
        format!(
            r#"<tr class="pregunta"><td>{question}</td><td><select>{opts}</select>{extra}</td></tr>"#
        )
    }

    #[test]
    fn no_opinion_with_blank_comment_is_null_text() {
        let page = row(
            "Comentarios",
            &[("Seleccione", false), ("No opina", true)],
            "<textarea>  </textarea>",
        );
        let answers = parse_answers(&page).unwrap();
        assert_eq!(
            answers,
            vec![SurveyAnswer { question: "Comentarios".into(), value: AnswerValue::Text(None) }]
        );
    }

    #[test]
    fn no_opinion_reads_comment_box() {
        let page = row(
            "Comentarios",
            &[("Seleccione", false), ("No opina", false), ("Opina", true)],
            "<textarea>Muy buena cursada</textarea>",
        );
        let answers = parse_answers(&page).unwrap();
        assert_eq!(answers[0].value, AnswerValue::Text(Some("Muy buena cursada".into())));
    }

    #[test]
    fn text_input_fallback() {
        let page = row(
            "Sugerencias",
            &[("Seleccione", false), ("No opina", true)],
            r#"<input type="hidden" value="x"><input type="text" value="Más práctica">"#,
        );
        let answers = parse_answers(&page).unwrap();
        assert_eq!(answers[0].value, AnswerValue::Text(Some("Más práctica".into())));
    }

    #[test]
    fn percentage_scale() {
        let page = row(
            "Claridad",
            &[("0%", false), ("50%", false), ("75", true), ("100%", false)],
            "",
        );
        let answers = parse_answers(&page).unwrap();
        assert_eq!(
            answers,
            vec![SurveyAnswer { question: "Claridad".into(), value: AnswerValue::Percentage(Some(75)) }]
        );
    }

    #[test]
    fn percentage_not_a_number_is_null() {
        let page = row("Claridad", &[("Seleccione", true), ("50%", false)], "");
        let answers = parse_answers(&page).unwrap();
        assert_eq!(answers[0].value, AnswerValue::Percentage(None));
    }

    #[test]
    fn unanswered_rows_are_dropped() {
        let page = format!(
            "{}{}",
            row("Claridad", &[("0%", false), ("50%", false)], ""),
            row("Puntualidad", &[("0%", false), ("50%", true)], ""),
        );
        let answers = parse_answers(&page).unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].question, "Puntualidad");
    }

    #[test]
    fn unknown_scale_is_unsupported() {
        let page = row("Claridad", &[("Malo", false), ("Bueno", true)], "");
        let err = parse_answers(&page).unwrap_err();
        assert_eq!(
            err,
            ScrapeError::UnsupportedSchema { question: "Claridad".into(), option: "Bueno".into() }
        );
        assert!(err.is_malformed());
    }

    #[test]
    fn other_rows_are_ignored() {
        let page = format!(
            r#"<tr class="titulo"><td>Encuesta</td></tr>{}"#,
            row("Claridad", &[("0%", false), ("50%", true)], "")
        );
        assert_eq!(parse_answers(&page).unwrap().len(), 1);
    }
}
